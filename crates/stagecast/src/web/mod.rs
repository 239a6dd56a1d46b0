//! Browser audience host: a local HTTP server serving the audience page and a
//! websocket per audience window.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{
        Path as UrlPath, Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::deck::DeckLibrary;
use crate::error::{SurfaceError, TransportError};
use crate::slide::SlideView;
use crate::surface::{BrowserWindow, Endpoint, HostSignal, SurfaceHost};
use crate::sync::AudienceMessage;

const AUDIENCE_PAGE: &str = include_str!("audience.html");

/// How long a window may go without a socket (before its first connect, or
/// between a drop and a reconnect) before it counts as closed.
pub const ATTACH_GRACE: Duration = Duration::from_secs(10);

/// Close code telling the page the presenter closed it on purpose. Any
/// other close makes the page reconnect.
const PRESENTER_CLOSED: u16 = 4000;

enum Outbound {
    Text(String),
    Close,
}

struct WindowSlot {
    outbound: Option<UnboundedSender<Outbound>>,
    /// Counts sockets attached so far; a dropping socket only detaches the
    /// slot if no newer one replaced it.
    connection: u64,
    /// Set while no socket is attached.
    detached_since: Option<Instant>,
}

impl WindowSlot {
    fn new(now: Instant) -> Self {
        Self {
            outbound: None,
            connection: 0,
            detached_since: Some(now),
        }
    }

    fn expired(&self, now: Instant, grace: Duration) -> bool {
        self.detached_since
            .is_some_and(|since| now.saturating_duration_since(since) >= grace)
    }
}

type Slots = Arc<Mutex<HashMap<String, WindowSlot>>>;

fn lock(slots: &Slots) -> MutexGuard<'_, HashMap<String, WindowSlot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Attach a new socket to `window`. `None` when the window is unknown or
/// has been gone longer than `grace`.
fn attach(
    slots: &Slots,
    window: &str,
    grace: Duration,
    now: Instant,
) -> Option<(u64, UnboundedReceiver<Outbound>)> {
    let mut slots = lock(slots);
    let slot = slots.get_mut(window)?;
    if slot.expired(now, grace) {
        return None;
    }
    let (tx, rx) = unbounded_channel();
    slot.connection += 1;
    slot.outbound = Some(tx);
    slot.detached_since = None;
    Some((slot.connection, rx))
}

/// The socket `connection` of `window` went away.
fn detach(slots: &Slots, window: &str, connection: u64, now: Instant) {
    if let Some(slot) = lock(slots).get_mut(window) {
        if slot.connection == connection {
            slot.outbound = None;
            slot.detached_since = Some(now);
        }
    }
}

#[derive(Clone)]
struct WebState {
    slots: Slots,
    grace: Duration,
    inbox: UnboundedSender<HostSignal>,
    decks: Arc<HashMap<String, Vec<SlideView>>>,
    asset_roots: Arc<Vec<PathBuf>>,
}

/// Serves audience windows in the system browser.
pub struct WebHost {
    // Owns the server task; dropping it stops the server.
    _runtime: tokio::runtime::Runtime,
    addr: SocketAddr,
    slots: Slots,
    inbox: UnboundedReceiver<HostSignal>,
    next_window: u64,
    launch_browser: bool,
    grace: Duration,
}

impl WebHost {
    /// Bind `127.0.0.1:port` and start serving in the background.
    pub fn start(port: u16, library: &DeckLibrary) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("stagecast-web")
            .enable_all()
            .build()
            .context("Failed to start the web runtime")?;

        let (inbox_tx, inbox) = unbounded_channel();
        let slots = Slots::default();
        let state = WebState {
            slots: Arc::clone(&slots),
            grace: ATTACH_GRACE,
            inbox: inbox_tx,
            decks: Arc::new(
                library
                    .iter()
                    .filter(|d| !d.is_external())
                    .map(|d| (d.id.to_string(), d.slides.iter().map(|s| s.view(true)).collect()))
                    .collect(),
            ),
            asset_roots: Arc::new(library.iter().filter_map(|d| d.base_path.clone()).collect()),
        };

        let listener = runtime
            .block_on(tokio::net::TcpListener::bind(("127.0.0.1", port)))
            .with_context(|| format!("Failed to bind 127.0.0.1:{port}"))?;
        let addr = listener.local_addr()?;
        runtime.spawn(async move {
            if let Err(e) = axum::serve(listener, router(state)).await {
                tracing::error!("audience server stopped: {e}");
            }
        });
        tracing::info!("audience server listening on http://{addr}");

        Ok(Self {
            _runtime: runtime,
            addr,
            slots,
            inbox,
            next_window: 0,
            launch_browser: true,
            grace: ATTACH_GRACE,
        })
    }

    /// Register windows without launching a browser; the URL is logged instead.
    pub fn without_browser(mut self) -> Self {
        self.launch_browser = false;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn audience_url(&self, window: &str) -> String {
        format!("http://{}/audience?window={window}", self.addr)
    }
}

impl SurfaceHost for WebHost {
    fn open_surface(&mut self) -> Result<Endpoint, SurfaceError> {
        self.next_window += 1;
        let id = format!("w{}", self.next_window);
        let now = Instant::now();
        {
            let mut slots = lock(&self.slots);
            // Windows left behind without a socket are gone for good.
            slots.retain(|_, slot| !slot.expired(now, self.grace));
            slots.insert(id.clone(), WindowSlot::new(now));
        }

        let url = self.audience_url(&id);
        if self.launch_browser {
            open_in_browser(&url)?;
        } else {
            tracing::info!("audience window ready at {url}");
        }
        Ok(Endpoint::Browser(Box::new(WebWindow {
            id,
            slots: Arc::clone(&self.slots),
            grace: self.grace,
        })))
    }

    fn drain_signals(&mut self) -> Vec<HostSignal> {
        let mut signals = Vec::new();
        while let Ok(signal) = self.inbox.try_recv() {
            signals.push(signal);
        }
        signals
    }
}

fn open_in_browser(url: &str) -> Result<(), SurfaceError> {
    let mut command = if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        std::process::Command::new("xdg-open")
    };
    command
        .arg(url)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|e| SurfaceError::OpenFailed(format!("could not launch a browser for {url}: {e}")))
}

/// One audience page, identified by the `window` query parameter it
/// connects with. A reload or a network blip detaches the socket; the window
/// stays open as long as a socket re-attaches within the grace period.
pub struct WebWindow {
    id: String,
    slots: Slots,
    grace: Duration,
}

impl WebWindow {
    fn outbound(&self) -> Result<Option<UnboundedSender<Outbound>>, TransportError> {
        match lock(&self.slots).get(&self.id) {
            Some(slot) if !slot.expired(Instant::now(), self.grace) => Ok(slot.outbound.clone()),
            _ => Err(TransportError::Disconnected),
        }
    }
}

impl BrowserWindow for WebWindow {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_closed(&self) -> bool {
        let mut slots = lock(&self.slots);
        let closed = slots
            .get(&self.id)
            .is_none_or(|slot| slot.expired(Instant::now(), self.grace));
        if closed {
            slots.remove(&self.id);
        }
        closed
    }

    fn focus(&self) {
        // Pages cannot be raised from outside the browser.
        tracing::debug!("focus requested for audience window {}", self.id);
    }

    fn close(&self) {
        if let Some(tx) = lock(&self.slots).remove(&self.id).and_then(|slot| slot.outbound) {
            let _ = tx.send(Outbound::Close);
        }
    }

    fn post_message(&self, json: &str) -> Result<(), TransportError> {
        match self.outbound()? {
            Some(tx) => tx
                .send(Outbound::Text(json.to_string()))
                .map_err(|_| TransportError::Disconnected),
            None => {
                tracing::debug!("audience window {} not connected yet, dropping message", self.id);
                Ok(())
            }
        }
    }
}

fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(|| async { Html(AUDIENCE_PAGE) }))
        .route("/audience", get(|| async { Html(AUDIENCE_PAGE) }))
        .route("/ws", get(ws_handler))
        .route("/api/decks/{id}", get(deck_handler))
        .route("/asset", get(asset_handler))
        .with_state(state)
}

#[derive(Deserialize)]
struct WindowQuery {
    window: String,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WindowQuery>,
    State(state): State<WebState>,
) -> Response {
    let Some((connection, rx)) = attach(&state.slots, &query.window, state.grace, Instant::now()) else {
        return (StatusCode::NOT_FOUND, "unknown audience window").into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.window, connection, rx))
}

async fn handle_socket(
    stream: WebSocket,
    state: WebState,
    window: String,
    connection: u64,
    mut rx: UnboundedReceiver<Outbound>,
) {
    let (mut sender, mut receiver) = stream.split();
    tracing::debug!("audience window {window} connected (socket {connection})");

    // task: push presenter messages to this window
    let send_task = tokio::spawn(async move {
        while let Some(out) = rx.recv().await {
            let message = match out {
                Outbound::Text(json) => Message::Text(json.into()),
                Outbound::Close => {
                    let frame = CloseFrame {
                        code: PRESENTER_CLOSED,
                        reason: "closed by presenter".into(),
                    };
                    let _ = sender.send(Message::Close(Some(frame))).await;
                    break;
                }
            };
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Text(text) = msg {
            match AudienceMessage::from_json(text.as_str()) {
                Ok(message) => {
                    let _ = state.inbox.send(HostSignal::Message {
                        source: window.clone(),
                        message,
                    });
                }
                Err(e) => tracing::warn!("ignoring message from audience window {window}: {e}"),
            }
        }
    }

    tracing::debug!("audience window {window} disconnected (socket {connection})");
    detach(&state.slots, &window, connection, Instant::now());
    let _ = send_task.await;
}

async fn deck_handler(UrlPath(id): UrlPath<String>, State(state): State<WebState>) -> Response {
    match state.decks.get(&id) {
        Some(slides) => Json(slides.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "unknown deck").into_response(),
    }
}

#[derive(Deserialize)]
struct AssetQuery {
    path: PathBuf,
}

async fn asset_handler(Query(query): Query<AssetQuery>, State(state): State<WebState>) -> Response {
    let Ok(path) = tokio::fs::canonicalize(&query.path).await else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !state.asset_roots.iter().any(|root| path.starts_with(root)) {
        tracing::warn!("refusing to serve {} outside deck directories", path.display());
        return StatusCode::FORBIDDEN.into_response();
    }
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type(&path))], bytes).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "html" | "htm" => "text/html; charset=utf-8",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{PresenterSession, SessionOptions};
    use crate::surface::{DEFAULT_POLL_INTERVAL, SurfaceManager};
    use crate::sync::PresenterMessage;
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    type Socket = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

    fn window(slots: &Slots, id: &str, grace: Duration) -> WebWindow {
        lock(slots).insert(id.to_string(), WindowSlot::new(Instant::now()));
        WebWindow {
            id: id.to_string(),
            slots: Arc::clone(slots),
            grace,
        }
    }

    #[test]
    fn test_unconnected_window_accepts_and_drops() {
        let slots = Slots::default();
        let w = window(&slots, "w1", ATTACH_GRACE);
        assert!(!w.is_closed());
        assert!(w.post_message("{}").is_ok());
    }

    #[test]
    fn test_connected_window_receives_until_closed() {
        let slots = Slots::default();
        let w = window(&slots, "w1", ATTACH_GRACE);
        let (_, mut rx) = attach(&slots, "w1", ATTACH_GRACE, Instant::now()).unwrap();
        w.post_message(r#"{"type":"DISMISS_JOKE"}"#).unwrap();
        assert!(matches!(rx.try_recv(), Ok(Outbound::Text(json)) if json.contains("DISMISS_JOKE")));

        w.close();
        assert!(matches!(rx.try_recv(), Ok(Outbound::Close)));
        assert!(lock(&slots).is_empty());
        assert!(w.is_closed());
        assert!(w.post_message("{}").is_err());
        assert!(attach(&slots, "w1", ATTACH_GRACE, Instant::now()).is_none());
    }

    #[test]
    fn test_dropped_socket_can_reattach() {
        let slots = Slots::default();
        let w = window(&slots, "w1", ATTACH_GRACE);
        let t0 = Instant::now();
        let (first, _old) = attach(&slots, "w1", ATTACH_GRACE, t0).unwrap();
        detach(&slots, "w1", first, t0);
        assert!(!w.is_closed());

        let (second, mut rx) = attach(&slots, "w1", ATTACH_GRACE, t0 + Duration::from_secs(2)).unwrap();
        assert_ne!(first, second);
        // A late drop of the replaced socket leaves the new one attached.
        detach(&slots, "w1", first, t0 + Duration::from_secs(3));
        w.post_message("{}").unwrap();
        assert!(matches!(rx.try_recv(), Ok(Outbound::Text(_))));
    }

    #[test]
    fn test_window_without_socket_expires() {
        let slots = Slots::default();
        let t0 = Instant::now();
        lock(&slots).insert("w1".to_string(), WindowSlot::new(t0));
        assert!(attach(&slots, "w1", ATTACH_GRACE, t0 + ATTACH_GRACE).is_none());

        // Never connected at all: closed once the grace period is over.
        let w = window(&slots, "w2", Duration::ZERO);
        assert!(w.is_closed());
        assert!(!lock(&slots).contains_key("w2"));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type(Path::new("a/b.PNG")), "image/png");
        assert_eq!(content_type(Path::new("clip.webm")), "video/webm");
        assert_eq!(content_type(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_server_serves_page_and_decks() {
        let library = DeckLibrary::bundled(2000);
        let mut host = WebHost::start(0, &library).unwrap().without_browser();
        let base = format!("http://{}", host.addr());

        let page = ureq::get(&format!("{base}/audience"))
            .call()
            .unwrap()
            .body_mut()
            .read_to_string()
            .unwrap();
        assert!(page.contains("AUDIENCE_READY"));

        let slides: Vec<SlideView> = ureq::get(&format!("{base}/api/decks/welcome"))
            .call()
            .unwrap()
            .body_mut()
            .read_json()
            .unwrap();
        assert_eq!(slides[0].id, "intro");
        assert!(slides[0].html.is_some());

        assert!(ureq::get(&format!("{base}/api/decks/nope")).call().is_err());

        let endpoint = host.open_surface().unwrap();
        assert_eq!(endpoint.id(), "w1");
        assert!(host.drain_signals().is_empty());
    }

    /// Tick the session until the socket yields a presenter message.
    fn next_message(
        rt: &tokio::runtime::Runtime,
        session: &mut PresenterSession,
        socket: &mut Socket,
    ) -> Option<PresenterMessage> {
        for _ in 0..100 {
            session.tick(Instant::now());
            let read = rt.block_on(async {
                tokio::time::timeout(Duration::from_millis(20), socket.next()).await
            });
            if let Ok(Some(Ok(WsMessage::Text(text)))) = read {
                return serde_json::from_str(&text).ok();
            }
        }
        None
    }

    #[test]
    fn test_reloaded_page_reattaches_and_resyncs() {
        let library = DeckLibrary::bundled(2000);
        let host = WebHost::start(0, &library).unwrap().without_browser();
        let url = format!("ws://{}/ws?window=w1", host.addr());
        let surface = SurfaceManager::new(Box::new(host), DEFAULT_POLL_INTERVAL);
        let mut session = PresenterSession::new(library, surface, SessionOptions::default()).unwrap();
        session.open_audience(Instant::now()).unwrap();

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let ready = || WsMessage::Text(r#"{"type":"AUDIENCE_READY"}"#.into());

        let (mut first, _) = rt.block_on(tokio_tungstenite::connect_async(url.as_str())).unwrap();
        rt.block_on(first.send(ready())).unwrap();
        assert!(matches!(
            next_message(&rt, &mut session, &mut first),
            Some(PresenterMessage::SlideState(_))
        ));
        session.next();
        match next_message(&rt, &mut session, &mut first) {
            Some(PresenterMessage::SlideState(s)) => assert_eq!(s.current_index, 1),
            other => panic!("expected slide state, got {other:?}"),
        }

        // Reload: the old page vanishes without a close handshake.
        drop(first);
        let (mut second, _) = rt.block_on(tokio_tungstenite::connect_async(url.as_str())).unwrap();
        rt.block_on(second.send(ready())).unwrap();
        match next_message(&rt, &mut session, &mut second) {
            Some(PresenterMessage::SlideState(s)) => assert_eq!(s.current_index, 1),
            other => panic!("expected slide state, got {other:?}"),
        }
        assert!(session.is_audience_open());
    }
}
