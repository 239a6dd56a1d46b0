//! Recording stand-ins for the browser and native hosts.

use std::sync::{Arc, Mutex, MutexGuard};

use super::{BrowserWindow, Endpoint, HostSignal, NativeShell, SurfaceHost};
use crate::error::{SurfaceError, TransportError};
use crate::sync::{AudienceMessage, PresenterMessage};

#[derive(Default)]
struct WindowState {
    closed: bool,
    focus_count: usize,
    posted: Vec<String>,
}

#[derive(Clone)]
pub struct FakeWindow {
    id: String,
    state: Arc<Mutex<WindowState>>,
}

impl FakeWindow {
    fn state(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap()
    }

    /// The user closed the window.
    pub fn close_externally(&self) {
        self.state().closed = true;
    }

    pub fn focus_count(&self) -> usize {
        self.state().focus_count
    }

    pub fn messages(&self) -> Vec<PresenterMessage> {
        self.state()
            .posted
            .iter()
            .map(|json| serde_json::from_str(json).unwrap())
            .collect()
    }
}

impl BrowserWindow for FakeWindow {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn focus(&self) {
        self.state().focus_count += 1;
    }

    fn close(&self) {
        self.state().closed = true;
    }

    fn post_message(&self, json: &str) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.closed {
            return Err(TransportError::Disconnected);
        }
        state.posted.push(json.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct HostState {
    windows: Vec<FakeWindow>,
    inbox: Vec<HostSignal>,
    refuse: bool,
}

#[derive(Clone, Default)]
pub struct FakeBrowserHost {
    state: Arc<Mutex<HostState>>,
}

impl FakeBrowserHost {
    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap()
    }

    pub fn windows(&self) -> Vec<FakeWindow> {
        self.state().windows.clone()
    }

    pub fn last_window(&self) -> FakeWindow {
        self.state().windows.last().cloned().unwrap()
    }

    pub fn push_message(&self, source: &str, message: AudienceMessage) {
        self.state().inbox.push(HostSignal::Message {
            source: source.to_string(),
            message,
        });
    }

    /// Send a message as the most recently opened window.
    pub fn reply(&self, message: AudienceMessage) {
        let id = self.last_window().id;
        self.push_message(&id, message);
    }

    pub fn refuse_to_open(&self) {
        self.state().refuse = true;
    }
}

impl SurfaceHost for FakeBrowserHost {
    fn open_surface(&mut self) -> Result<Endpoint, SurfaceError> {
        let mut state = self.state();
        if state.refuse {
            return Err(SurfaceError::OpenFailed("popup blocked".to_string()));
        }
        let window = FakeWindow {
            id: format!("window-{}", state.windows.len() + 1),
            state: Arc::default(),
        };
        state.windows.push(window.clone());
        Ok(Endpoint::Browser(Box::new(window)))
    }

    fn drain_signals(&mut self) -> Vec<HostSignal> {
        std::mem::take(&mut self.state().inbox)
    }
}

#[derive(Default)]
pub struct FakeShell {
    created: Mutex<Vec<String>>,
    closed: Mutex<Vec<String>>,
    focused: Mutex<Vec<String>>,
}

impl FakeShell {
    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }

    pub fn focused(&self) -> Vec<String> {
        self.focused.lock().unwrap().clone()
    }
}

impl NativeShell for FakeShell {
    fn create_window(&self, label: &str) -> Result<(), SurfaceError> {
        self.created.lock().unwrap().push(label.to_string());
        Ok(())
    }

    fn focus_window(&self, label: &str) {
        self.focused.lock().unwrap().push(label.to_string());
    }

    fn close_window(&self, label: &str) {
        self.closed.lock().unwrap().push(label.to_string());
    }
}
