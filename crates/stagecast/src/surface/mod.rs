//! Audience surface lifecycle: open, focus, close and liveness tracking over
//! either a browser window or a native shell window.

pub mod browser;
pub mod native;
#[cfg(test)]
pub mod testing;

use std::time::{Duration, Instant};

use crate::error::{SurfaceError, TransportError};
use crate::sync::{AudienceMessage, MessageSink, PresenterMessage};

pub use browser::BrowserWindow;
pub use native::{EventBus, NativeHost, NativeShell, NativeWindow, SOURCE_LABEL, WINDOW_DESTROYED, emit_audience};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The live transport endpoint of an audience surface.
pub enum Endpoint {
    Browser(Box<dyn BrowserWindow>),
    Native(NativeWindow),
}

impl Endpoint {
    pub fn id(&self) -> &str {
        match self {
            Self::Browser(w) => w.id(),
            Self::Native(w) => w.label(),
        }
    }

    fn focus(&self) {
        match self {
            Self::Browser(w) => w.focus(),
            Self::Native(w) => w.focus(),
        }
    }

    fn close(&self) {
        match self {
            Self::Browser(w) => w.close(),
            Self::Native(w) => w.close(),
        }
    }

    fn send(&self, message: &PresenterMessage) -> Result<(), TransportError> {
        match self {
            Self::Browser(w) => w.post_message(&message.to_json()?),
            Self::Native(w) => w.emit(message),
        }
    }
}

/// Signals a host collects between ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum HostSignal {
    Message { source: String, message: AudienceMessage },
    Destroyed { source: String },
}

/// A runtime able to create audience surfaces.
pub trait SurfaceHost {
    fn open_surface(&mut self) -> Result<Endpoint, SurfaceError>;

    /// Everything received since the last call.
    fn drain_signals(&mut self) -> Vec<HostSignal>;
}

/// The single tracked audience surface.
struct ChannelHandle {
    endpoint: Endpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened,
    /// A surface already existed and was brought to the front.
    Focused,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceUpdate {
    Message(AudienceMessage),
    Closed,
}

pub struct SurfaceManager {
    host: Box<dyn SurfaceHost>,
    handle: Option<ChannelHandle>,
    poll_interval: Duration,
    next_poll: Option<Instant>,
}

impl SurfaceManager {
    pub fn new(host: Box<dyn SurfaceHost>, poll_interval: Duration) -> Self {
        Self {
            host,
            handle: None,
            poll_interval,
            next_poll: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Open the audience surface, or focus it if one is already open.
    pub fn open(&mut self, now: Instant) -> Result<OpenOutcome, SurfaceError> {
        if let Some(handle) = &self.handle {
            handle.endpoint.focus();
            return Ok(OpenOutcome::Focused);
        }
        let endpoint = self.host.open_surface()?;
        if matches!(endpoint, Endpoint::Browser(_)) {
            self.next_poll = Some(now + self.poll_interval);
        }
        self.handle = Some(ChannelHandle { endpoint });
        Ok(OpenOutcome::Opened)
    }

    /// Close the surface. Returns false when there was nothing to close.
    pub fn close(&mut self) -> bool {
        self.next_poll = None;
        match self.handle.take() {
            Some(handle) => {
                handle.endpoint.close();
                true
            }
            None => false,
        }
    }

    /// Returns whether a surface is open afterwards.
    pub fn toggle(&mut self, now: Instant) -> Result<bool, SurfaceError> {
        if self.is_open() {
            self.close();
            Ok(false)
        } else {
            self.open(now)?;
            Ok(true)
        }
    }

    /// Collect host signals and run the liveness poll.
    pub fn tick(&mut self, now: Instant) -> Vec<SurfaceUpdate> {
        let mut updates = Vec::new();
        for signal in self.host.drain_signals() {
            let current = self.handle.as_ref().map(|h| h.endpoint.id());
            match signal {
                HostSignal::Destroyed { source } if current == Some(source.as_str()) => {
                    tracing::info!("audience window {source} was destroyed");
                    self.handle = None;
                    self.next_poll = None;
                    updates.push(SurfaceUpdate::Closed);
                }
                HostSignal::Message { source, message } if current == Some(source.as_str()) => {
                    updates.push(SurfaceUpdate::Message(message));
                }
                other => tracing::debug!("ignoring signal from a stale window: {other:?}"),
            }
        }

        if let (Some(handle), Some(due)) = (&self.handle, self.next_poll) {
            if now >= due {
                if matches!(&handle.endpoint, Endpoint::Browser(w) if w.is_closed()) {
                    tracing::info!("audience window {} was closed", handle.endpoint.id());
                    self.handle = None;
                    self.next_poll = None;
                    updates.push(SurfaceUpdate::Closed);
                } else {
                    self.next_poll = Some(now + self.poll_interval);
                }
            }
        }
        updates
    }

    /// When the next liveness poll is due, if one is scheduled.
    pub fn next_poll(&self) -> Option<Instant> {
        self.next_poll
    }
}

impl MessageSink for SurfaceManager {
    fn is_open(&self) -> bool {
        SurfaceManager::is_open(self)
    }

    fn send(&mut self, message: &PresenterMessage) -> Result<(), TransportError> {
        match &self.handle {
            Some(handle) => handle.endpoint.send(message),
            None => Err(TransportError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FakeBrowserHost, FakeShell};
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn browser_manager() -> (SurfaceManager, FakeBrowserHost) {
        let host = FakeBrowserHost::default();
        (
            SurfaceManager::new(Box::new(host.clone()), DEFAULT_POLL_INTERVAL),
            host,
        )
    }

    #[test]
    fn test_open_is_idempotent() {
        let (mut surface, host) = browser_manager();
        let now = Instant::now();
        assert_eq!(surface.open(now).unwrap(), OpenOutcome::Opened);
        assert_eq!(surface.open(now).unwrap(), OpenOutcome::Focused);
        assert_eq!(host.windows().len(), 1);
        assert_eq!(host.windows()[0].focus_count(), 1);
    }

    #[test]
    fn test_close_is_safe_when_missing() {
        let (mut surface, host) = browser_manager();
        assert!(!surface.close());
        surface.open(Instant::now()).unwrap();
        assert!(surface.close());
        assert!(!surface.close());
        assert!(host.windows()[0].is_closed());
    }

    #[test]
    fn test_toggle() {
        let (mut surface, host) = browser_manager();
        let now = Instant::now();
        assert!(surface.toggle(now).unwrap());
        assert!(!surface.toggle(now).unwrap());
        assert!(surface.toggle(now).unwrap());
        assert_eq!(host.windows().len(), 2);
    }

    #[test]
    fn test_browser_close_detected_within_one_poll() {
        let (mut surface, host) = browser_manager();
        let t0 = Instant::now();
        surface.open(t0).unwrap();
        host.windows()[0].close_externally();
        assert!(surface.tick(t0 + Duration::from_millis(500)).is_empty());
        assert!(surface.is_open());
        assert_eq!(surface.tick(t0 + Duration::from_millis(1000)), vec![SurfaceUpdate::Closed]);
        assert!(!surface.is_open());
    }

    #[test]
    fn test_messages_only_from_current_window() {
        let (mut surface, host) = browser_manager();
        let now = Instant::now();
        host.push_message("nobody", AudienceMessage::AudienceReady);
        surface.open(now).unwrap();
        let id = host.windows()[0].id().to_string();
        host.push_message(&id, AudienceMessage::NavigateNext);
        assert_eq!(
            surface.tick(now),
            vec![SurfaceUpdate::Message(AudienceMessage::NavigateNext)]
        );
    }

    #[test]
    fn test_send_fails_when_window_gone() {
        let (mut surface, host) = browser_manager();
        surface.open(Instant::now()).unwrap();
        host.windows()[0].close_externally();
        assert!(surface.send(&PresenterMessage::DismissJoke).is_err());
    }

    #[test]
    fn test_native_destroy_event_closes() {
        let bus = EventBus::new();
        let shell = Arc::new(FakeShell::default());
        let host = NativeHost::new(shell.clone(), bus.clone());
        let mut surface = SurfaceManager::new(Box::new(host), DEFAULT_POLL_INTERVAL);
        let now = Instant::now();

        surface.open(now).unwrap();
        assert_eq!(surface.open(now).unwrap(), OpenOutcome::Focused);
        assert_eq!(shell.created(), vec!["audience-1".to_string()]);
        assert_eq!(shell.focused(), vec!["audience-1".to_string()]);

        let mut audience = bus.subscribe(crate::sync::PRESENTER_EVENTS);
        surface.send(&PresenterMessage::DismissJoke).unwrap();
        assert_eq!(audience.try_next().map(|e| e.name), Some("dismiss-joke".to_string()));

        emit_audience(&bus, "audience-1", &AudienceMessage::AudienceReady).unwrap();
        assert_eq!(
            surface.tick(now),
            vec![SurfaceUpdate::Message(AudienceMessage::AudienceReady)]
        );

        bus.emit(WINDOW_DESTROYED, json!({"label": "audience-1"}));
        assert_eq!(surface.tick(now), vec![SurfaceUpdate::Closed]);
        assert!(!surface.is_open());
    }

    #[test]
    fn test_stale_destroy_event_ignored() {
        let bus = EventBus::new();
        let shell = Arc::new(FakeShell::default());
        let mut surface = SurfaceManager::new(
            Box::new(NativeHost::new(shell.clone(), bus.clone())),
            DEFAULT_POLL_INTERVAL,
        );
        let now = Instant::now();
        surface.open(now).unwrap();
        surface.close();
        surface.open(now).unwrap();
        assert_eq!(shell.closed(), vec!["audience-1".to_string()]);

        bus.emit(WINDOW_DESTROYED, json!({"label": "audience-1"}));
        assert!(surface.tick(now).is_empty());
        assert!(surface.is_open());
    }

    #[test]
    fn test_commands_from_closed_native_window_ignored() {
        let bus = EventBus::new();
        let shell = Arc::new(FakeShell::default());
        let mut surface = SurfaceManager::new(
            Box::new(NativeHost::new(shell.clone(), bus.clone())),
            DEFAULT_POLL_INTERVAL,
        );
        let now = Instant::now();
        surface.open(now).unwrap();
        surface.close();
        surface.open(now).unwrap();

        emit_audience(&bus, "audience-1", &AudienceMessage::NavigateNext).unwrap();
        assert!(surface.tick(now).is_empty());

        emit_audience(&bus, "audience-2", &AudienceMessage::NavigatePrev).unwrap();
        assert_eq!(
            surface.tick(now),
            vec![SurfaceUpdate::Message(AudienceMessage::NavigatePrev)]
        );

        // Unlabelled events cannot be attributed to any window.
        bus.emit("navigate-next", json!({}));
        assert!(surface.tick(now).is_empty());
        assert!(surface.is_open());
    }
}
