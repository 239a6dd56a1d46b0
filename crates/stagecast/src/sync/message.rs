use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::SyncSnapshot;
use crate::error::TransportError;
use crate::joke::Joke;

/// Presenter to audience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenterMessage {
    SlideState(Box<SyncSnapshot>),
    ShowJoke { joke: Joke },
    DismissJoke,
}

/// Audience to presenter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudienceMessage {
    AudienceReady,
    TriggerJoke { hotkey: String },
    NavigateNext,
    NavigatePrev,
    NavigateTo { index: i64 },
    ResetTimer,
}

/// Event-bus names for each wire tag.
const EVENT_NAMES: &[(&str, &str)] = &[
    ("SLIDE_STATE", "slide-state"),
    ("SHOW_JOKE", "show-joke"),
    ("DISMISS_JOKE", "dismiss-joke"),
    ("AUDIENCE_READY", "audience-ready"),
    ("TRIGGER_JOKE", "trigger-joke"),
    ("NAVIGATE_NEXT", "navigate-next"),
    ("NAVIGATE_PREV", "navigate-prev"),
    ("NAVIGATE_TO", "navigate-to"),
    ("RESET_TIMER", "reset-timer"),
];

pub const PRESENTER_EVENTS: &[&str] = &["slide-state", "show-joke", "dismiss-joke"];

pub const AUDIENCE_EVENTS: &[&str] = &[
    "audience-ready",
    "trigger-joke",
    "navigate-next",
    "navigate-prev",
    "navigate-to",
    "reset-timer",
];

/// Split a tagged message into a bus event name and its payload.
fn to_event<T: Serialize>(message: &T) -> Result<(&'static str, Value), TransportError> {
    let mut value = serde_json::to_value(message)?;
    let tag = value
        .as_object_mut()
        .and_then(|obj| obj.remove("type"))
        .and_then(|t| t.as_str().map(str::to_string))
        .ok_or_else(|| TransportError::Other("message has no type tag".to_string()))?;
    let name = EVENT_NAMES
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, name)| *name)
        .ok_or_else(|| TransportError::Other(format!("no event name for {tag}")))?;
    Ok((name, value))
}

fn from_event<T: for<'de> Deserialize<'de>>(name: &str, payload: Value) -> Result<T, TransportError> {
    let tag = EVENT_NAMES
        .iter()
        .find(|(_, n)| *n == name)
        .map(|(t, _)| *t)
        .ok_or_else(|| TransportError::Other(format!("unknown event {name}")))?;
    let mut object = match payload {
        Value::Object(obj) => obj,
        Value::Null => serde_json::Map::new(),
        other => return Err(TransportError::Other(format!("event {name} carries {other}"))),
    };
    object.insert("type".to_string(), Value::String(tag.to_string()));
    Ok(serde_json::from_value(Value::Object(object))?)
}

impl PresenterMessage {
    pub fn to_json(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_event(&self) -> Result<(&'static str, Value), TransportError> {
        to_event(self)
    }

    pub fn from_event(name: &str, payload: Value) -> Result<Self, TransportError> {
        from_event(name, payload)
    }
}

impl AudienceMessage {
    pub fn from_json(text: &str) -> Result<Self, TransportError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_event(&self) -> Result<(&'static str, Value), TransportError> {
        to_event(self)
    }

    pub fn from_event(name: &str, payload: Value) -> Result<Self, TransportError> {
        from_event(name, payload)
    }
}
