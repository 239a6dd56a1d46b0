//! Display-side state: what the audience window shows, rebuilt from presenter
//! messages alone.

use std::time::{Duration, Instant};

use crate::joke::Joke;
use crate::keyboard::Key;
use crate::slide::SlideView;
use crate::sync::{AudienceMessage, PresenterMessage, SyncSnapshot};

/// How often an audience that has not received any state repeats its
/// readiness announcement.
pub const READY_RETRY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default)]
pub struct AudienceState {
    snapshot: Option<SyncSnapshot>,
    active_joke: Option<Joke>,
    last_ready: Option<Instant>,
}

impl AudienceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, message: PresenterMessage) {
        match message {
            PresenterMessage::SlideState(snapshot) => self.snapshot = Some(*snapshot),
            PresenterMessage::ShowJoke { joke } => self.active_joke = Some(joke),
            PresenterMessage::DismissJoke => self.active_joke = None,
        }
    }

    pub fn has_state(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Returns `AUDIENCE_READY` when it should be (re)sent: immediately, then
    /// every [`READY_RETRY`] until the first state arrives.
    pub fn ready_ping(&mut self, now: Instant) -> Option<AudienceMessage> {
        if self.has_state() {
            return None;
        }
        match self.last_ready {
            Some(at) if now.duration_since(at) < READY_RETRY => None,
            _ => {
                self.last_ready = Some(now);
                Some(AudienceMessage::AudienceReady)
            }
        }
    }

    pub fn snapshot(&self) -> Option<&SyncSnapshot> {
        self.snapshot.as_ref()
    }

    /// The slide to draw. External decks are read from the embedded list.
    pub fn current_slide(&self) -> Option<&SlideView> {
        let snapshot = self.snapshot.as_ref()?;
        match &snapshot.external_slides {
            Some(slides) if snapshot.is_external_deck => slides
                .get(snapshot.current_index)
                .or(snapshot.current_slide.as_ref()),
            _ => snapshot.current_slide.as_ref(),
        }
    }

    pub fn active_joke(&self) -> Option<&Joke> {
        self.active_joke.as_ref()
    }

    pub fn theme(&self) -> &str {
        self.snapshot.as_ref().map_or("dark", |s| s.theme.as_str())
    }

    pub fn camera_overlay_visible(&self) -> bool {
        self.snapshot.as_ref().is_some_and(|s| s.camera_overlay_visible)
    }

    /// Slide counter text, e.g. `3 / 12`.
    pub fn progress(&self) -> Option<String> {
        self.snapshot
            .as_ref()
            .filter(|s| s.total_slides > 0)
            .map(|s| format!("{} / {}", s.current_index + 1, s.total_slides))
    }

    /// Keys pressed on the audience window act as a remote control.
    pub fn command_for_key(&self, key: Key) -> Option<AudienceMessage> {
        match key {
            Key::ArrowRight | Key::Space | Key::Char(' ') => Some(AudienceMessage::NavigateNext),
            Key::ArrowLeft => Some(AudienceMessage::NavigatePrev),
            Key::Char('t') => Some(AudienceMessage::ResetTimer),
            Key::Char(ch) if ch.is_ascii_digit() || ch.is_alphabetic() => {
                Some(AudienceMessage::TriggerJoke {
                    hotkey: ch.to_string(),
                })
            }
            _ => None,
        }
    }
}

/// Elapsed presentation time as `m:ss`, or `h:mm:ss` past the hour.
pub fn format_elapsed(elapsed_ms: i64) -> String {
    let total = elapsed_ms.max(0) / 1000;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::DeckId;
    use crate::joke::{JokeDef, JokeSet};
    use crate::slide::Layout;

    fn view(id: &str) -> SlideView {
        SlideView {
            id: id.to_string(),
            kind: "mdx".to_string(),
            layout: Layout::Center,
            html: Some(format!("<h1>{id}</h1>")),
            ..SlideView::default()
        }
    }

    fn state(index: usize, external: bool) -> PresenterMessage {
        let slides: Vec<SlideView> = (0..3).map(|i| view(&format!("s{i}"))).collect();
        PresenterMessage::SlideState(Box::new(SyncSnapshot {
            current_index: index,
            total_slides: 3,
            current_slide: Some(view("from-presenter")),
            next_slide: None,
            jokes: Vec::new(),
            presentation_start_time: Some(0),
            deck_id: Some(DeckId::parse(if external { "external-x" } else { "welcome" })),
            camera_overlay_visible: true,
            camera_overlay: None,
            theme: "light".to_string(),
            is_external_deck: external,
            external_slides: external.then_some(slides),
        }))
    }

    #[test]
    fn test_ready_ping_repeats_until_state() {
        let mut audience = AudienceState::new();
        let t0 = Instant::now();
        assert_eq!(audience.ready_ping(t0), Some(AudienceMessage::AudienceReady));
        assert_eq!(audience.ready_ping(t0 + Duration::from_millis(500)), None);
        assert_eq!(
            audience.ready_ping(t0 + Duration::from_millis(1000)),
            Some(AudienceMessage::AudienceReady)
        );
        audience.apply(state(0, false));
        assert_eq!(audience.ready_ping(t0 + Duration::from_secs(5)), None);
    }

    #[test]
    fn test_external_slides_take_precedence() {
        let mut audience = AudienceState::new();
        audience.apply(state(2, true));
        assert_eq!(audience.current_slide().map(|s| s.id.as_str()), Some("s2"));
        audience.apply(state(1, false));
        assert_eq!(audience.current_slide().map(|s| s.id.as_str()), Some("from-presenter"));
        assert_eq!(audience.progress().as_deref(), Some("2 / 3"));
        assert_eq!(audience.theme(), "light");
        assert!(audience.camera_overlay_visible());
    }

    #[test]
    fn test_joke_show_and_dismiss() {
        let set = JokeSet::from_file(
            crate::joke::JokeFile {
                jokes: vec![JokeDef {
                    id: "j".to_string(),
                    hotkey: "1".to_string(),
                    kind: "text".to_string(),
                    text: Some("ha".to_string()),
                    ..JokeDef::default()
                }],
            },
            2000,
        );
        let joke = set.jokes[0].clone();
        let mut audience = AudienceState::new();
        audience.apply(PresenterMessage::ShowJoke { joke });
        assert!(audience.active_joke().is_some());
        audience.apply(PresenterMessage::DismissJoke);
        assert!(audience.active_joke().is_none());
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "0:00");
        assert_eq!(format_elapsed(65_000), "1:05");
        assert_eq!(format_elapsed(3_725_000), "1:02:05");
        assert_eq!(format_elapsed(-10), "0:00");
    }

    #[test]
    fn test_remote_keys() {
        let audience = AudienceState::new();
        assert_eq!(audience.command_for_key(Key::ArrowRight), Some(AudienceMessage::NavigateNext));
        assert_eq!(audience.command_for_key(Key::ArrowLeft), Some(AudienceMessage::NavigatePrev));
        assert_eq!(
            audience.command_for_key(Key::Char('3')),
            Some(AudienceMessage::TriggerJoke {
                hotkey: "3".to_string()
            })
        );
        assert_eq!(audience.command_for_key(Key::Escape), None);
    }
}
