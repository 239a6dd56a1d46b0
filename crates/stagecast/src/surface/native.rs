use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use super::{Endpoint, HostSignal, SurfaceHost};
use crate::error::{SurfaceError, TransportError};
use crate::sync::{AUDIENCE_EVENTS, AudienceMessage, PresenterMessage};

/// Emitted by the shell when one of its windows goes away. The payload is
/// `{"label": "<window label>"}`.
pub const WINDOW_DESTROYED: &str = "window-destroyed";

/// Payload key naming the window an audience-side event came from.
pub const SOURCE_LABEL: &str = "label";

/// Publish a command from the audience window `label` on the bus.
pub fn emit_audience(bus: &EventBus, label: &str, message: &AudienceMessage) -> Result<usize, TransportError> {
    let (name, mut payload) = message.to_event()?;
    if let Value::Object(fields) = &mut payload {
        fields.insert(SOURCE_LABEL.to_string(), Value::String(label.to_string()));
    }
    Ok(bus.emit(name, payload))
}

#[derive(Debug, Clone, PartialEq)]
pub struct BusEvent {
    pub name: String,
    pub payload: Value,
}

/// In-process publish/subscribe bus carrying named JSON events between the
/// presenter and the windows the shell hosts.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    listeners: Arc<Mutex<HashMap<String, Vec<UnboundedSender<BusEvent>>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<String, Vec<UnboundedSender<BusEvent>>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver an event to every live subscriber of `name`. Returns how many
    /// received it.
    pub fn emit(&self, name: &str, payload: Value) -> usize {
        let mut listeners = self.listeners();
        let Some(senders) = listeners.get_mut(name) else {
            return 0;
        };
        senders.retain(|tx| !tx.is_closed());
        let event = BusEvent {
            name: name.to_string(),
            payload,
        };
        senders.iter().filter(|tx| tx.send(event.clone()).is_ok()).count()
    }

    pub fn subscribe(&self, names: &[&str]) -> Subscription {
        let (tx, rx) = unbounded_channel();
        let mut listeners = self.listeners();
        for name in names {
            listeners.entry(name.to_string()).or_default().push(tx.clone());
        }
        Subscription { rx }
    }
}

/// Receiving end of [`EventBus::subscribe`]. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: UnboundedReceiver<BusEvent>,
}

impl Subscription {
    /// Next queued event, without waiting.
    pub fn try_next(&mut self) -> Option<BusEvent> {
        self.rx.try_recv().ok()
    }

    pub async fn next(&mut self) -> Option<BusEvent> {
        self.rx.recv().await
    }
}

/// The windowing side of a native shell.
pub trait NativeShell: Send + Sync {
    fn create_window(&self, label: &str) -> Result<(), SurfaceError>;

    fn focus_window(&self, label: &str);

    fn close_window(&self, label: &str);
}

/// A sibling window created by the shell. State reaches it over the bus.
#[derive(Clone)]
pub struct NativeWindow {
    label: String,
    shell: Arc<dyn NativeShell>,
    bus: EventBus,
}

impl std::fmt::Debug for NativeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeWindow").field("label", &self.label).finish()
    }
}

impl NativeWindow {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn focus(&self) {
        self.shell.focus_window(&self.label);
    }

    pub fn close(&self) {
        self.shell.close_window(&self.label);
    }

    pub fn emit(&self, message: &PresenterMessage) -> Result<(), TransportError> {
        let (name, payload) = message.to_event()?;
        let delivered = self.bus.emit(name, payload);
        tracing::trace!("{name} delivered to {delivered} listener(s)");
        Ok(())
    }
}

/// Opens audience windows through a [`NativeShell`] and listens on the bus
/// for their commands and destroy events.
pub struct NativeHost {
    shell: Arc<dyn NativeShell>,
    bus: EventBus,
    inbox: Subscription,
    generation: u64,
}

impl NativeHost {
    pub fn new(shell: Arc<dyn NativeShell>, bus: EventBus) -> Self {
        let mut names = AUDIENCE_EVENTS.to_vec();
        names.push(WINDOW_DESTROYED);
        let inbox = bus.subscribe(&names);
        Self {
            shell,
            bus,
            inbox,
            generation: 0,
        }
    }
}

impl SurfaceHost for NativeHost {
    fn open_surface(&mut self) -> Result<Endpoint, SurfaceError> {
        self.generation += 1;
        let label = format!("audience-{}", self.generation);
        self.shell.create_window(&label)?;
        tracing::info!("opened native audience window {label}");
        Ok(Endpoint::Native(NativeWindow {
            label,
            shell: Arc::clone(&self.shell),
            bus: self.bus.clone(),
        }))
    }

    fn drain_signals(&mut self) -> Vec<HostSignal> {
        let mut signals = Vec::new();
        while let Some(event) = self.inbox.try_next() {
            let mut payload = event.payload;
            let source = payload
                .as_object_mut()
                .and_then(|fields| fields.remove(SOURCE_LABEL))
                .and_then(|label| label.as_str().map(str::to_string));
            let Some(source) = source else {
                tracing::debug!("ignoring {} event without a window label", event.name);
                continue;
            };
            if event.name == WINDOW_DESTROYED {
                signals.push(HostSignal::Destroyed { source });
                continue;
            }
            match AudienceMessage::from_event(&event.name, payload) {
                Ok(message) => signals.push(HostSignal::Message { source, message }),
                Err(e) => tracing::warn!("ignoring malformed {} event: {e}", event.name),
            }
        }
        signals
    }
}
