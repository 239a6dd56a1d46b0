//! The presenter session: owns every piece of presenter state and pushes each
//! change through the sync channel.

use std::time::Instant;

use crate::deck::{Deck, DeckId, DeckLibrary};
use crate::error::{SessionError, SurfaceError};
use crate::joke::{Joke, JokeManager, JokeSet, Preloader};
use crate::keyboard::{self, Action, KeyPress};
use crate::navigation::Navigator;
use crate::slide::Slide;
use crate::surface::{OpenOutcome, SurfaceManager, SurfaceUpdate};
use crate::sync::{AudienceMessage, SendOutcome, SyncChannel, SyncSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Fade,
    Slide,
    None,
}

impl Transition {
    pub fn from_name(name: &str) -> Self {
        match name {
            "slide" => Self::Slide,
            "none" => Self::None,
            _ => Self::Fade,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Fade => Self::Slide,
            Self::Slide => Self::None,
            Self::None => Self::Fade,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Fade => "fade",
            Self::Slide => "slide",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub theme: String,
    pub transition: Transition,
    /// Accept NAVIGATE_* commands from the audience.
    pub remote_navigation: bool,
    pub start_deck: Option<DeckId>,
    /// Zero-based slide to start on.
    pub start_slide: usize,
    pub fullscreen: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            transition: Transition::Fade,
            remote_navigation: true,
            start_deck: None,
            start_slide: 0,
            fullscreen: false,
        }
    }
}

pub struct PresenterSession {
    library: DeckLibrary,
    navigator: Navigator,
    jokes: JokeManager,
    preloader: Preloader,
    channel: SyncChannel,
    surface: SurfaceManager,
    theme: String,
    transition: Transition,
    camera_overlay_visible: bool,
    fullscreen: bool,
    remote_navigation: bool,
    started_at: Option<i64>,
}

impl PresenterSession {
    pub fn new(
        library: DeckLibrary,
        surface: SurfaceManager,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let deck_id = match options.start_deck {
            Some(id) => id,
            None => library
                .first()
                .map(|d| d.id.clone())
                .ok_or_else(|| SessionError::UnknownDeck("(no decks loaded)".to_string()))?,
        };

        let mut session = Self {
            library,
            navigator: Navigator::new(),
            jokes: JokeManager::default(),
            preloader: Preloader::new(),
            channel: SyncChannel::new(),
            surface,
            theme: options.theme,
            transition: options.transition,
            camera_overlay_visible: false,
            fullscreen: options.fullscreen,
            remote_navigation: options.remote_navigation,
            started_at: None,
        };
        session.switch_deck(&deck_id)?;
        session.go_to(options.start_slide as i64);
        Ok(session)
    }

    // -- state accessors --

    pub fn library(&self) -> &DeckLibrary {
        &self.library
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn current_deck(&self) -> Option<&Deck> {
        self.navigator.deck_id().and_then(|id| self.library.get(id))
    }

    pub fn current_slide(&self) -> Option<&Slide> {
        self.current_deck()
            .and_then(|d| d.slide(self.navigator.current_index()))
    }

    pub fn active_joke(&self) -> Option<&Joke> {
        self.jokes.active_joke()
    }

    pub fn joke_shown_at(&self) -> Option<Instant> {
        self.jokes.shown_at()
    }

    pub fn preloader(&self) -> &Preloader {
        &self.preloader
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn transition(&self) -> Transition {
        self.transition
    }

    pub fn camera_overlay_visible(&self) -> bool {
        self.camera_overlay_visible
    }

    pub fn fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn started_at(&self) -> Option<i64> {
        self.started_at
    }

    pub fn is_audience_open(&self) -> bool {
        self.surface.is_open()
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot::build(
            self.current_deck(),
            &self.navigator,
            &self.theme,
            self.camera_overlay_visible,
            self.started_at,
        )
    }

    /// The earliest moment `tick` has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.jokes.next_deadline(), self.surface.next_poll()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn publish(&mut self) -> SendOutcome {
        let snapshot = self.snapshot();
        self.channel.publish(&mut self.surface, &snapshot)
    }

    // -- navigation --

    pub fn next(&mut self) -> bool {
        self.navigator.next() && self.published()
    }

    pub fn prev(&mut self) -> bool {
        self.navigator.prev() && self.published()
    }

    pub fn go_to(&mut self, index: i64) -> bool {
        self.navigator.go_to(index) && self.published()
    }

    fn published(&mut self) -> bool {
        self.publish();
        true
    }

    pub fn switch_deck(&mut self, id: &DeckId) -> Result<(), SessionError> {
        let deck = self
            .library
            .get(id)
            .ok_or_else(|| SessionError::UnknownDeck(id.to_string()))?;
        let total = deck.len();
        let jokes = deck.jokes.clone().unwrap_or_default();
        tracing::info!("switching to deck {id} ({total} slides)");

        self.preloader.preload(&jokes);
        self.navigator.select_deck(id.clone(), total);
        if self.jokes.replace_jokes(jokes) {
            self.channel.dismiss_joke(&mut self.surface);
        }
        self.publish();
        Ok(())
    }

    /// Add a deck loaded at runtime and make it active.
    pub fn add_deck(&mut self, deck: Deck) -> Result<(), SessionError> {
        let id = deck.id.clone();
        self.library.insert(deck);
        self.switch_deck(&id)
    }

    // -- presentation toggles --

    pub fn toggle_camera_overlay(&mut self) -> SendOutcome {
        self.camera_overlay_visible = !self.camera_overlay_visible;
        self.publish()
    }

    pub fn toggle_theme(&mut self) -> SendOutcome {
        self.theme = if self.theme == "dark" { "light" } else { "dark" }.to_string();
        self.publish()
    }

    pub fn cycle_transition(&mut self) -> Transition {
        self.transition = self.transition.next();
        self.transition
    }

    pub fn toggle_fullscreen(&mut self) -> bool {
        self.fullscreen = !self.fullscreen;
        self.fullscreen
    }

    // -- jokes --

    /// Show the joke bound to `hotkey`. `None` when no joke uses that key.
    pub fn trigger_joke(&mut self, hotkey: &str, now: Instant) -> Option<SendOutcome> {
        let joke = self.jokes.trigger(hotkey, now)?.clone();
        Some(self.channel.send_joke(&mut self.surface, &joke))
    }

    /// `None` when no joke was showing.
    pub fn dismiss_joke(&mut self) -> Option<SendOutcome> {
        self.jokes
            .dismiss()
            .then(|| self.channel.dismiss_joke(&mut self.surface))
    }

    pub fn jokes(&self) -> &JokeSet {
        self.jokes.jokes()
    }

    // -- audience surface --

    pub fn open_audience(&mut self, now: Instant) -> Result<OpenOutcome, SurfaceError> {
        let outcome = self.surface.open(now)?;
        if outcome == OpenOutcome::Opened {
            self.started_at = Some(chrono::Utc::now().timestamp_millis());
            self.channel.mark_ready();
            self.publish();
        }
        Ok(outcome)
    }

    pub fn close_audience(&mut self) -> bool {
        self.surface.close()
    }

    pub fn toggle_audience(&mut self, now: Instant) -> Result<bool, SurfaceError> {
        if self.surface.is_open() {
            self.close_audience();
            Ok(false)
        } else {
            self.open_audience(now)?;
            Ok(true)
        }
    }

    /// React to a command from the audience surface.
    pub fn handle_audience_message(&mut self, message: AudienceMessage, now: Instant) {
        tracing::debug!("audience sent {message:?}");
        match message {
            AudienceMessage::AudienceReady => {
                self.channel.mark_ready();
                self.publish();
            }
            AudienceMessage::TriggerJoke { hotkey } => {
                self.trigger_joke(&hotkey, now);
            }
            AudienceMessage::ResetTimer => {
                self.started_at = Some(chrono::Utc::now().timestamp_millis());
                self.channel.mark_ready();
                self.publish();
            }
            nav if !self.remote_navigation => {
                tracing::debug!("remote navigation disabled, ignoring {nav:?}");
            }
            AudienceMessage::NavigateNext => {
                self.next();
            }
            AudienceMessage::NavigatePrev => {
                self.prev();
            }
            AudienceMessage::NavigateTo { index } => {
                self.go_to(index);
            }
        }
    }

    /// Apply a presenter key press. Actions the session cannot carry out
    /// itself (fullscreen) are returned for the caller.
    pub fn handle_key(&mut self, press: &KeyPress, now: Instant) -> Option<Action> {
        let action = keyboard::action_for(press)?;
        match &action {
            Action::Next => {
                self.next();
            }
            Action::Prev => {
                self.prev();
            }
            Action::ToggleFullscreen => {
                self.toggle_fullscreen();
            }
            Action::CycleTransition => {
                self.cycle_transition();
            }
            Action::ToggleCameraOverlay => {
                self.toggle_camera_overlay();
            }
            Action::ToggleAudience => {
                if let Err(e) = self.toggle_audience(now) {
                    tracing::error!("could not open the audience window: {e}");
                }
            }
            Action::ToggleTheme => {
                self.toggle_theme();
            }
            Action::DismissJoke => {
                self.dismiss_joke();
            }
            Action::TriggerJoke(hotkey) => {
                self.trigger_joke(hotkey, now);
            }
        }
        Some(action)
    }

    /// Drive timers and inbound audience traffic.
    pub fn tick(&mut self, now: Instant) {
        for update in self.surface.tick(now) {
            match update {
                SurfaceUpdate::Message(message) => self.handle_audience_message(message, now),
                SurfaceUpdate::Closed => {
                    tracing::info!("audience window closed");
                    self.channel.mark_ready();
                }
            }
        }
        if self.jokes.tick(now) {
            self.channel.dismiss_joke(&mut self.surface);
        }
    }
}
