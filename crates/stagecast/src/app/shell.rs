//! Native audience windows as egui deferred viewports.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use eframe::egui::{self, ViewportBuilder, ViewportClass, ViewportCommand, ViewportId};
use serde_json::json;

use super::render::{self, TextLine};
use crate::audience::{AudienceState, format_elapsed};
use crate::deck::{DeckId, DeckLibrary};
use crate::error::SurfaceError;
use crate::joke::{JokeSet, Preloader};
use crate::slide::Layout;
use crate::surface::native::Subscription;
use crate::surface::{EventBus, NativeShell, SOURCE_LABEL, WINDOW_DESTROYED, emit_audience};
use crate::sync::{AudienceMessage, PRESENTER_EVENTS, PresenterMessage};
use crate::theme::Theme;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Creates and tracks audience viewports. The presenter app calls
/// [`EguiShell::show`] every frame to keep them alive.
pub struct EguiShell {
    bus: EventBus,
    library: Arc<DeckLibrary>,
    windows: Mutex<BTreeMap<String, Arc<Mutex<AudienceViewport>>>>,
    focus_requests: Mutex<Vec<String>>,
}

impl EguiShell {
    pub fn new(bus: EventBus, library: Arc<DeckLibrary>) -> Self {
        Self {
            bus,
            library,
            windows: Mutex::new(BTreeMap::new()),
            focus_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn open_windows(&self) -> Vec<String> {
        lock(&self.windows).keys().cloned().collect()
    }

    pub fn show(&self, ctx: &egui::Context) {
        let windows: Vec<_> = {
            let mut windows = lock(&self.windows);
            windows.retain(|_, view| !lock(view).closed);
            windows
                .iter()
                .map(|(label, view)| (label.clone(), Arc::clone(view)))
                .collect()
        };
        let focus: Vec<String> = std::mem::take(&mut *lock(&self.focus_requests));

        for (label, view) in windows {
            let id = ViewportId::from_hash_of(&label);
            if focus.contains(&label) {
                ctx.send_viewport_cmd_to(id, ViewportCommand::Focus);
            }
            let builder = ViewportBuilder::default()
                .with_title("Stagecast \u{2013} Audience")
                .with_inner_size([1280.0, 720.0]);
            ctx.show_viewport_deferred(id, builder, move |ctx, class| {
                lock(&view).update(ctx, class);
            });
        }
    }
}

impl NativeShell for EguiShell {
    fn create_window(&self, label: &str) -> Result<(), SurfaceError> {
        let view = AudienceViewport {
            label: label.to_string(),
            state: AudienceState::new(),
            inbox: self.bus.subscribe(PRESENTER_EVENTS),
            bus: self.bus.clone(),
            library: Arc::clone(&self.library),
            preloader: Preloader::new(),
            preloaded_for: None,
            textures: HashMap::new(),
            joke_shown_at: None,
            closed: false,
        };
        lock(&self.windows).insert(label.to_string(), Arc::new(Mutex::new(view)));
        Ok(())
    }

    fn focus_window(&self, label: &str) {
        lock(&self.focus_requests).push(label.to_string());
    }

    fn close_window(&self, label: &str) {
        lock(&self.windows).remove(label);
    }
}

struct AudienceViewport {
    label: String,
    state: AudienceState,
    inbox: Subscription,
    bus: EventBus,
    library: Arc<DeckLibrary>,
    preloader: Preloader,
    preloaded_for: Option<Option<DeckId>>,
    textures: HashMap<String, egui::TextureHandle>,
    joke_shown_at: Option<Instant>,
    closed: bool,
}

impl AudienceViewport {
    fn emit(&self, message: &AudienceMessage) {
        if let Err(e) = emit_audience(&self.bus, &self.label, message) {
            tracing::error!("could not encode {message:?}: {e}");
        }
    }

    fn receive(&mut self, now: Instant) {
        while let Some(event) = self.inbox.try_next() {
            let message = match PresenterMessage::from_event(&event.name, event.payload) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!("audience {} ignoring {}: {e}", self.label, event.name);
                    continue;
                }
            };
            match &message {
                PresenterMessage::ShowJoke { .. } => self.joke_shown_at = Some(now),
                PresenterMessage::SlideState(snapshot) => {
                    let deck = Some(snapshot.deck_id.clone());
                    if self.preloaded_for != deck {
                        self.preloader.preload(&JokeSet::new(snapshot.jokes.clone()));
                        self.preloaded_for = deck;
                    }
                }
                PresenterMessage::DismissJoke => self.joke_shown_at = None,
            }
            self.state.apply(message);
        }
    }

    fn slide_lines(&self) -> (Vec<TextLine>, Layout) {
        let Some(view) = self.state.current_slide() else {
            return (vec![TextLine::Body("Waiting for the presenter\u{2026}".to_string())], Layout::Center);
        };
        // Bundled markup arrives without HTML; compile it from the local deck copy.
        if view.kind == "mdx" && view.html.is_none() {
            let slide = self.state.snapshot().and_then(|s| {
                let deck = self.library.get(s.deck_id.as_ref()?)?;
                deck.slide(s.current_index)
            });
            if let Some(slide) = slide {
                return (render::slide_lines(slide), slide.layout);
            }
        }
        (render::view_lines(view), view.layout)
    }

    fn update(&mut self, ctx: &egui::Context, class: ViewportClass) {
        let now = Instant::now();
        self.receive(now);

        if ctx.input(|i| i.viewport().close_requested()) {
            self.closed = true;
            self.bus.emit(WINDOW_DESTROYED, json!({ SOURCE_LABEL: self.label }));
            return;
        }

        if let Some(ping) = self.state.ready_ping(now) {
            self.emit(&ping);
        }
        for press in super::key_presses(ctx) {
            if press.text_input_focused {
                continue;
            }
            if let Some(command) = self.state.command_for_key(press.key) {
                self.emit(&command);
            }
        }

        let theme = Theme::from_name(self.state.theme());
        let (lines, layout) = self.slide_lines();
        let joke = self.state.active_joke().cloned();
        let texture = joke
            .as_ref()
            .and_then(|j| j.content.media_src().filter(|_| j.content.is_image()).map(str::to_string))
            .and_then(|src| render::texture_for(&mut self.textures, &self.preloader, ctx, &src));
        let joke_elapsed = self
            .joke_shown_at
            .map(|at| now.duration_since(at).as_secs_f32() * 1000.0)
            .unwrap_or(0.0);

        let draw = |ui: &mut egui::Ui| {
            let rect = ui.max_rect();
            let painter = ui.painter();
            painter.rect_filled(rect, 0.0, theme.background);
            let scale = render::compute_scale(rect);
            render::draw_lines(painter, &lines, layout, &theme, rect, scale, 1.0);

            if self.state.camera_overlay_visible() {
                let config = self
                    .state
                    .snapshot()
                    .and_then(|s| s.camera_overlay.clone())
                    .unwrap_or_default();
                render::draw_camera_overlay(painter, &config, &theme, rect, scale);
            }
            if let Some(joke) = &joke {
                render::draw_joke(painter, joke, joke_elapsed, texture.as_ref(), &theme, rect, scale);
            }

            let font = egui::FontId::proportional(theme.status_size);
            if let Some(progress) = self.state.progress() {
                painter.text(
                    rect.left_bottom() + egui::vec2(16.0, -12.0),
                    egui::Align2::LEFT_BOTTOM,
                    progress,
                    font.clone(),
                    theme.muted,
                );
            }
            if let Some(start) = self.state.snapshot().and_then(|s| s.presentation_start_time) {
                let elapsed = chrono::Utc::now().timestamp_millis() - start;
                painter.text(
                    rect.right_bottom() + egui::vec2(-16.0, -12.0),
                    egui::Align2::RIGHT_BOTTOM,
                    format_elapsed(elapsed),
                    font,
                    theme.muted,
                );
            }
        };

        match class {
            ViewportClass::Embedded => {
                egui::Window::new(self.label.as_str())
                    .default_size([640.0, 360.0])
                    .show(ctx, |ui| draw(ui));
            }
            _ => {
                egui::CentralPanel::default()
                    .frame(egui::Frame::new().fill(theme.background).inner_margin(0.0))
                    .show(ctx, |ui| draw(ui));
            }
        }

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
