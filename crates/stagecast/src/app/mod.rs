mod render;
mod shell;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui;

use crate::audience::format_elapsed;
use crate::config::{AudienceHost, Config};
use crate::deck::{DeckId, DeckLibrary};
use crate::keyboard::{Action, Key, KeyPress};
use crate::session::{PresenterSession, SessionOptions, Transition};
use crate::surface::{EventBus, NativeHost, SurfaceHost, SurfaceManager};
use crate::theme::Theme;
use crate::web::WebHost;

pub use shell::EguiShell;

const TRANSITION_DURATION: f32 = 0.3;

/// Translate this frame's keyboard input into toolkit-independent presses.
pub(crate) fn key_presses(ctx: &egui::Context) -> Vec<KeyPress> {
    let text_input_focused = ctx.wants_keyboard_input();
    ctx.input(|i| {
        let mut presses = Vec::new();
        for event in &i.events {
            let key = match event {
                egui::Event::Key {
                    key,
                    pressed: true,
                    repeat: false,
                    modifiers,
                    ..
                } if !modifiers.command && !modifiers.ctrl => match key {
                    egui::Key::ArrowRight => Key::ArrowRight,
                    egui::Key::ArrowLeft => Key::ArrowLeft,
                    egui::Key::Space => Key::Space,
                    egui::Key::Escape => Key::Escape,
                    _ => continue,
                },
                // Space already arrives as a key event.
                egui::Event::Text(text) if text != " " => {
                    for ch in text.chars() {
                        presses.push(KeyPress {
                            key: Key::Char(ch),
                            text_input_focused,
                        });
                    }
                    continue;
                }
                _ => continue,
            };
            presses.push(KeyPress {
                key,
                text_input_focused,
            });
        }
        presses
    })
}

struct Toast {
    message: String,
    start: Instant,
}

impl Toast {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            start: Instant::now(),
        }
    }

    fn is_expired(&self) -> bool {
        self.start.elapsed().as_secs_f32() >= 1.5
    }
}

struct PresenterApp {
    session: PresenterSession,
    shell: Arc<EguiShell>,
    theme: Theme,
    shown: (Option<DeckId>, usize),
    changed_at: Option<Instant>,
    went_back: bool,
    textures: HashMap<String, egui::TextureHandle>,
    goto_input: String,
    load_input: String,
    default_joke_ms: u64,
    toast: Option<Toast>,
    open_audience_on_start: bool,
}

impl PresenterApp {
    fn handle_keys(&mut self, ctx: &egui::Context, now: Instant) {
        let mut viewport_cmds = Vec::new();
        for press in key_presses(ctx) {
            match self.session.handle_key(&press, now) {
                Some(Action::ToggleFullscreen) => {
                    viewport_cmds.push(egui::ViewportCommand::Fullscreen(self.session.fullscreen()));
                }
                Some(Action::ToggleAudience) => {
                    let message = if self.session.is_audience_open() {
                        "Audience window opened"
                    } else {
                        "Audience window closed"
                    };
                    self.toast = Some(Toast::new(message));
                }
                Some(Action::CycleTransition) => {
                    self.toast = Some(Toast::new(format!(
                        "Transition: {}",
                        self.session.transition().name()
                    )));
                }
                Some(Action::TriggerJoke(hotkey)) if self.session.jokes().find(&hotkey).is_none() => {
                    tracing::debug!("no joke bound to {hotkey}");
                }
                _ => {}
            }
        }
        for cmd in viewport_cmds {
            ctx.send_viewport_cmd(cmd);
        }
    }

    fn track_changes(&mut self, now: Instant) {
        let shown = (
            self.session.navigator().deck_id().cloned(),
            self.session.navigator().current_index(),
        );
        if shown != self.shown {
            self.went_back = shown.0 == self.shown.0 && shown.1 < self.shown.1;
            self.changed_at = Some(now);
            self.shown = shown;
        }
        if self.theme.name != self.session.theme() {
            self.theme = Theme::from_name(self.session.theme());
        }
        if self.toast.as_ref().is_some_and(Toast::is_expired) {
            self.toast = None;
        }
    }

    /// Opacity and horizontal offset of the incoming slide.
    fn transition_frame(&self, now: Instant, width: f32) -> (f32, f32) {
        let Some(at) = self.changed_at else {
            return (1.0, 0.0);
        };
        let t = (now.duration_since(at).as_secs_f32() / TRANSITION_DURATION).min(1.0);
        match self.session.transition() {
            Transition::Fade => (t, 0.0),
            Transition::Slide => {
                let dir = if self.went_back { -1.0 } else { 1.0 };
                (1.0, (1.0 - t) * width * dir)
            }
            Transition::None => (1.0, 0.0),
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui, now: Instant) {
        ui.horizontal(|ui| {
            let current = self.session.current_deck().map(|d| (d.id.clone(), d.name.clone()));
            let mut selected = current.as_ref().map(|(id, _)| id.clone());
            egui::ComboBox::from_id_salt("deck")
                .selected_text(current.map(|(_, name)| name).unwrap_or_default())
                .show_ui(ui, |ui| {
                    for deck in self.session.library().iter() {
                        ui.selectable_value(&mut selected, Some(deck.id.clone()), &deck.name);
                    }
                });
            if let Some(id) = selected {
                if Some(&id) != self.session.navigator().deck_id() {
                    if let Err(e) = self.session.switch_deck(&id) {
                        self.toast = Some(Toast::new(e.to_string()));
                    }
                }
            }

            ui.separator();
            ui.label("Go to");
            let response = ui.add(egui::TextEdit::singleline(&mut self.goto_input).desired_width(40.0));
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                if let Ok(n) = self.goto_input.trim().parse::<i64>() {
                    if !self.session.go_to(n - 1) {
                        self.toast = Some(Toast::new(format!("No slide {n}")));
                    }
                }
                self.goto_input.clear();
            }

            ui.separator();
            ui.add(
                egui::TextEdit::singleline(&mut self.load_input)
                    .hint_text("deck path")
                    .desired_width(160.0),
            );
            if ui.button("Load deck").clicked() && !self.load_input.trim().is_empty() {
                self.load_deck(PathBuf::from(self.load_input.trim()));
                self.load_input.clear();
            }

            ui.separator();
            let label = if self.session.is_audience_open() {
                "Close audience"
            } else {
                "Open audience"
            };
            if ui.button(label).clicked() {
                if let Err(e) = self.session.toggle_audience(now) {
                    self.toast = Some(Toast::new(e.to_string()));
                }
            }

            ui.separator();
            let nav = self.session.navigator();
            ui.label(format!("{} / {}", nav.current_index() + 1, nav.total()));
            if let Some(start) = self.session.started_at() {
                ui.label(format_elapsed(chrono::Utc::now().timestamp_millis() - start));
            }
            ui.label(format!("transition: {}", self.session.transition().name()));
            if self.session.camera_overlay_visible() {
                ui.label("camera on");
            }
            let preload = self.session.preloader();
            if preload.in_flight() > 0 {
                ui.label(format!("preloading {}", preload.in_flight()));
            }
        });
    }

    fn load_deck(&mut self, path: PathBuf) {
        let message = match crate::deck::load_path(&path, self.default_joke_ms) {
            Ok(deck) => {
                let name = deck.name.clone();
                match self.session.add_deck(deck) {
                    Ok(()) => format!("Loaded {name}"),
                    Err(e) => e.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!("could not load deck from {}: {e}", path.display());
                e.to_string()
            }
        };
        self.toast = Some(Toast::new(message));
    }

    fn draw_sidebar(&self, ui: &mut egui::Ui) {
        let deck = self.session.current_deck();
        let index = self.session.navigator().current_index();

        ui.heading("Next");
        let (rect, _) = ui.allocate_exact_size(
            egui::vec2(ui.available_width(), ui.available_width() * 9.0 / 16.0),
            egui::Sense::hover(),
        );
        ui.painter().rect_filled(rect, 4.0, self.theme.background);
        match deck.and_then(|d| d.slide(index + 1)) {
            Some(next) => render::draw_lines(
                ui.painter(),
                &render::slide_lines(next),
                next.layout,
                &self.theme,
                rect,
                render::compute_scale(rect),
                1.0,
            ),
            None => {
                ui.painter().text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "End of deck",
                    egui::FontId::proportional(self.theme.notes_size),
                    self.theme.muted,
                );
            }
        }

        ui.add_space(12.0);
        ui.heading("Notes");
        let notes = self
            .session
            .current_slide()
            .map(|s| s.notes.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("No notes for this slide.");
        egui::ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
            ui.label(egui::RichText::new(notes).size(self.theme.notes_size));
        });

        ui.add_space(12.0);
        ui.heading("Jokes");
        let jokes = self.session.jokes();
        if jokes.is_empty() {
            ui.label("No jokes in this deck.");
        }
        for joke in &jokes.jokes {
            let loaded = joke
                .content
                .media_src()
                .map(|src| self.session.preloader().get(src).is_some())
                .unwrap_or(true);
            let marker = if loaded { "" } else { " (loading)" };
            ui.label(format!("[{}] {}{marker}", joke.hotkey, joke.id));
        }
    }
}

impl eframe::App for PresenterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        if std::mem::take(&mut self.open_audience_on_start) {
            if let Err(e) = self.session.open_audience(now) {
                tracing::error!("could not open the audience window: {e}");
            }
        }

        self.session.tick(now);
        self.handle_keys(ctx, now);
        self.track_changes(now);
        self.shell.show(ctx);

        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| self.draw_controls(ui, now));
        egui::SidePanel::right("sidebar")
            .default_width(360.0)
            .show(ctx, |ui| self.draw_sidebar(ui));

        let texture = self
            .session
            .active_joke()
            .filter(|j| j.content.is_image())
            .and_then(|j| j.content.media_src())
            .map(str::to_string)
            .and_then(|src| render::texture_for(&mut self.textures, self.session.preloader(), ctx, &src));

        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(self.theme.background).inner_margin(0.0))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let scale = render::compute_scale(rect);
                let painter = ui.painter();
                let (opacity, offset) = self.transition_frame(now, rect.width());

                if let Some(slide) = self.session.current_slide() {
                    render::draw_lines(
                        painter,
                        &render::slide_lines(slide),
                        slide.layout,
                        &self.theme,
                        rect.translate(egui::vec2(offset, 0.0)),
                        scale,
                        opacity,
                    );
                }
                if self.session.camera_overlay_visible() {
                    let config = self
                        .session
                        .current_deck()
                        .and_then(|d| d.camera_overlay.clone())
                        .unwrap_or_default();
                    render::draw_camera_overlay(painter, &config, &self.theme, rect, scale);
                }
                if let (Some(joke), Some(at)) = (self.session.active_joke(), self.session.joke_shown_at()) {
                    let elapsed = now.saturating_duration_since(at).as_secs_f32() * 1000.0;
                    render::draw_joke(painter, joke, elapsed, texture.as_ref(), &self.theme, rect, scale);
                }
                if let Some(toast) = &self.toast {
                    painter.text(
                        rect.center_bottom() - egui::vec2(0.0, 40.0),
                        egui::Align2::CENTER_BOTTOM,
                        &toast.message,
                        egui::FontId::proportional(20.0),
                        self.theme.foreground,
                    );
                }
            });

        let animating = self
            .changed_at
            .is_some_and(|at| now.duration_since(at).as_secs_f32() < TRANSITION_DURATION)
            || self.session.active_joke().is_some();
        let wait = if animating {
            Duration::from_millis(16)
        } else {
            let deadline = self
                .session
                .next_deadline()
                .map(|d| d.saturating_duration_since(now))
                .unwrap_or(Duration::MAX);
            deadline.min(Duration::from_millis(250))
        };
        ctx.request_repaint_after(wait);
    }
}

/// How to launch the presenter window.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub windowed: bool,
    pub open_audience: bool,
    pub host: AudienceHost,
    pub port: u16,
    /// Deck paths, used only for the window title.
    pub sources: Vec<PathBuf>,
}

pub fn run(
    library: DeckLibrary,
    session_options: SessionOptions,
    launch: LaunchOptions,
    config: &Config,
) -> anyhow::Result<()> {
    let bus = EventBus::new();
    let shell = Arc::new(EguiShell::new(bus.clone(), Arc::new(library.clone())));
    let host: Box<dyn SurfaceHost> = match launch.host {
        AudienceHost::Native => Box::new(NativeHost::new(shell.clone(), bus)),
        AudienceHost::Browser => Box::new(WebHost::start(launch.port, &library)?),
    };
    let surface = SurfaceManager::new(host, config.poll_interval());
    let theme = Theme::from_name(&session_options.theme);
    let session = PresenterSession::new(library, surface, session_options)?;

    let title = match launch.sources.first() {
        Some(path) => format!(
            "Stagecast \u{2013} {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        ),
        None => "Stagecast".to_string(),
    };
    let viewport = if launch.windowed {
        egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title(&title)
    } else {
        egui::ViewportBuilder::default()
            .with_fullscreen(true)
            .with_title(&title)
    };
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    tracing::info!(
        "presenting {} deck(s), audience host: {}",
        session.library().len(),
        launch.host
    );
    let app = PresenterApp {
        shown: (
            session.navigator().deck_id().cloned(),
            session.navigator().current_index(),
        ),
        session,
        shell,
        theme,
        changed_at: None,
        went_back: false,
        textures: HashMap::new(),
        goto_input: String::new(),
        load_input: String::new(),
        default_joke_ms: config.default_joke_duration_ms(),
        toast: None,
        open_audience_on_start: launch.open_audience,
    };
    eframe::run_native(&title, options, Box::new(move |_cc| Ok(Box::new(app))))
        .map_err(|e| anyhow::anyhow!("{e}"))
}
