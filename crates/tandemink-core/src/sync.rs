//! Relay wire protocol and WebSocket transport.
//!
//! Every frame is a JSON text message of the form
//! `{"event": "<name>", "data": <payload>}`. Coordinates are always world
//! space so they mean the same thing to every client regardless of camera.

use crate::model::{MediaKind, MediaObject, ObjectId, RgbColor, Stroke, TextLabel};
use kurbo::Point;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors decoding or encoding frames.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors from the socket layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Not connected")]
    NotConnected,
    #[error("Invalid relay URL: {0}")]
    InvalidUrl(String),
    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// A point as it travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WirePoint {
    pub x: f64,
    pub y: f64,
}

impl From<Point> for WirePoint {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<WirePoint> for Point {
    fn from(p: WirePoint) -> Self {
        Point::new(p.x, p.y)
    }
}

/// `draw` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokePayload {
    pub from: WirePoint,
    pub to: WirePoint,
    pub size: f64,
    pub color: RgbColor,
}

impl From<&Stroke> for StrokePayload {
    fn from(s: &Stroke) -> Self {
        Self {
            from: s.from.into(),
            to: s.to.into(),
            size: s.width,
            color: s.color,
        }
    }
}

impl From<StrokePayload> for Stroke {
    fn from(p: StrokePayload) -> Self {
        Stroke::new(p.from.into(), p.to.into(), p.size, p.color)
    }
}

/// `text_add` payload, also the `texts` entries of `init`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPayload {
    pub id: ObjectId,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub color: String,
}

impl From<&TextLabel> for TextPayload {
    fn from(t: &TextLabel) -> Self {
        Self {
            id: t.id.clone(),
            text: t.content.clone(),
            x: t.position.x,
            y: t.position.y,
            size: t.font_size,
            color: t.wire_color(),
        }
    }
}

impl From<TextPayload> for TextLabel {
    fn from(p: TextPayload) -> Self {
        let mut label = TextLabel {
            id: p.id,
            content: p.text,
            position: Point::new(p.x, p.y),
            font_size: p.size,
            color: RgbColor::black(),
            color_source: None,
        };
        label.set_wire_color(p.color);
        label
    }
}

/// `text_move` payload. Only `id`, `x` and `y` are required; the sender
/// includes the rest of the object so receivers can adopt it whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMovePayload {
    pub id: ObjectId,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl From<&TextLabel> for TextMovePayload {
    fn from(t: &TextLabel) -> Self {
        Self {
            id: t.id.clone(),
            x: t.position.x,
            y: t.position.y,
            text: Some(t.content.clone()),
            size: Some(t.font_size),
            color: Some(t.wire_color()),
        }
    }
}

impl TextMovePayload {
    /// Overwrite the mutable fields of `label` with whatever this payload carries.
    pub fn apply_to(self, label: &mut TextLabel) {
        label.position = Point::new(self.x, self.y);
        if let Some(text) = self.text {
            label.content = text;
        }
        if let Some(size) = self.size {
            label.font_size = size;
        }
        if let Some(color) = self.color {
            label.set_wire_color(color);
        }
    }
}

fn default_media_scale() -> f64 {
    1.0
}

/// `media_add` payload, also the `images`/`videos` entries of `init`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPayload {
    pub id: ObjectId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MediaKind>,
    pub src: String,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_media_scale")]
    pub scale: f64,
}

impl From<&MediaObject> for MediaPayload {
    fn from(m: &MediaObject) -> Self {
        Self {
            id: m.id.clone(),
            kind: Some(m.kind),
            src: m.source.clone(),
            x: m.position.x,
            y: m.position.y,
            scale: m.scale_factor,
        }
    }
}

impl MediaPayload {
    /// Convert to a scene object; `fallback` is used when the sender omitted `type`.
    pub fn into_media(self, fallback: MediaKind) -> MediaObject {
        MediaObject {
            id: self.id,
            kind: self.kind.unwrap_or(fallback),
            source: self.src,
            position: Point::new(self.x, self.y),
            scale_factor: self.scale,
        }
    }
}

/// `media_move` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMovePayload {
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

impl From<&MediaObject> for MediaMovePayload {
    fn from(m: &MediaObject) -> Self {
        Self {
            id: m.id.clone(),
            kind: m.kind,
            x: m.position.x,
            y: m.position.y,
            scale: Some(m.scale_factor),
        }
    }
}

impl MediaMovePayload {
    pub fn apply_to(self, media: &mut MediaObject) {
        media.position = Point::new(self.x, self.y);
        if let Some(scale) = self.scale {
            media.scale_factor = scale;
        }
    }
}

/// `clear` request sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearRequest {
    pub password: String,
}

/// `clear_denied` notice sent only to the requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearDenied {
    #[serde(default)]
    pub msg: String,
}

/// `init` snapshot sent once after connecting.
///
/// A missing or `null` payload is an empty board. Missing, `null` or
/// non-list containers are empty; entries that fail to parse are skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InitPayload {
    pub lines: Vec<StrokePayload>,
    pub texts: Vec<TextPayload>,
    pub images: Vec<MediaPayload>,
    pub videos: Vec<MediaPayload>,
}

#[derive(Deserialize)]
struct InitContainers {
    #[serde(default, deserialize_with = "lenient_list")]
    lines: Vec<StrokePayload>,
    #[serde(default, deserialize_with = "lenient_list")]
    texts: Vec<TextPayload>,
    #[serde(default, deserialize_with = "lenient_list")]
    images: Vec<MediaPayload>,
    #[serde(default, deserialize_with = "lenient_list")]
    videos: Vec<MediaPayload>,
}

impl<'de> Deserialize<'de> for InitPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let Some(c) = Option::<InitContainers>::deserialize(deserializer)? else {
            log::debug!("init without payload; starting from an empty board");
            return Ok(Self::default());
        };
        Ok(Self {
            lines: c.lines,
            texts: c.texts,
            images: c.images,
            videos: c.videos,
        })
    }
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Null => return Ok(Vec::new()),
        other => {
            log::warn!("Expected a list in init, got {other}; treating as empty");
            return Ok(Vec::new());
        }
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                log::warn!("Skipping malformed init entry: {e}");
                None
            }
        })
        .collect())
}

/// Messages sent to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    Draw(StrokePayload),
    TextAdd(TextPayload),
    TextMove(TextMovePayload),
    MediaAdd(MediaPayload),
    MediaMove(MediaMovePayload),
    Clear(ClearRequest),
}

/// Messages received from the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Init(InitPayload),
    Draw(StrokePayload),
    TextAdd(TextPayload),
    TextMove(TextMovePayload),
    MediaAdd(MediaPayload),
    MediaMove(MediaMovePayload),
    /// Every client wipes its local state.
    Clear,
    ClearDenied(ClearDenied),
}

impl ServerMessage {
    /// Event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ServerMessage::Init(_) => "init",
            ServerMessage::Draw(_) => "draw",
            ServerMessage::TextAdd(_) => "text_add",
            ServerMessage::TextMove(_) => "text_move",
            ServerMessage::MediaAdd(_) => "media_add",
            ServerMessage::MediaMove(_) => "media_move",
            ServerMessage::Clear => "clear",
            ServerMessage::ClearDenied(_) => "clear_denied",
        }
    }
}

/// Parse one inbound text frame.
pub fn decode_frame(text: &str) -> Result<ServerMessage, SyncError> {
    Ok(serde_json::from_str(text)?)
}

/// Serialize one outbound message.
pub fn encode_frame(msg: &ClientMessage) -> Result<String, SyncError> {
    Ok(serde_json::to_string(msg)?)
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events from the WebSocket client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    /// A text frame from the relay, not yet decoded.
    Frame(String),
    Error { message: String },
}

impl ConnectionState {
    fn after(self, event: &TransportEvent) -> Self {
        match event {
            TransportEvent::Connected => ConnectionState::Connected,
            TransportEvent::Disconnected => ConnectionState::Disconnected,
            TransportEvent::Error { .. } => ConnectionState::Error,
            TransportEvent::Frame(_) => self,
        }
    }
}

// ============================================================================
// WASM WebSocket Client
// ============================================================================

#[cfg(target_arch = "wasm32")]
mod wasm_client {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{CloseEvent, ErrorEvent, MessageEvent, WebSocket};

    type Inbox = Rc<RefCell<Vec<TransportEvent>>>;

    /// Browser callbacks; they must outlive the socket that calls them.
    struct Callbacks {
        _open: Closure<dyn Fn()>,
        _message: Closure<dyn Fn(MessageEvent)>,
        _close: Closure<dyn Fn(CloseEvent)>,
        _error: Closure<dyn Fn(ErrorEvent)>,
    }

    impl Callbacks {
        fn attach(ws: &WebSocket, inbox: &Inbox) -> Self {
            let push = |inbox: &Inbox| {
                let inbox = Rc::clone(inbox);
                move |event: TransportEvent| inbox.borrow_mut().push(event)
            };

            let on_open = push(inbox);
            let open = Closure::wrap(Box::new(move || on_open(TransportEvent::Connected)) as Box<dyn Fn()>);

            let on_message = push(inbox);
            let message = Closure::wrap(Box::new(move |e: MessageEvent| {
                // Binary frames are not part of the protocol.
                if let Ok(text) = e.data().dyn_into::<js_sys::JsString>() {
                    on_message(TransportEvent::Frame(text.into()));
                }
            }) as Box<dyn Fn(MessageEvent)>);

            let on_close = push(inbox);
            let close = Closure::wrap(
                Box::new(move |_: CloseEvent| on_close(TransportEvent::Disconnected)) as Box<dyn Fn(CloseEvent)>,
            );

            let on_error = push(inbox);
            // The browser fires a bare Event here, so there is no message to read.
            let error = Closure::wrap(Box::new(move |_: ErrorEvent| {
                on_error(TransportEvent::Error {
                    message: "WebSocket error".to_string(),
                });
            }) as Box<dyn Fn(ErrorEvent)>);

            ws.set_onopen(Some(open.as_ref().unchecked_ref()));
            ws.set_onmessage(Some(message.as_ref().unchecked_ref()));
            ws.set_onclose(Some(close.as_ref().unchecked_ref()));
            ws.set_onerror(Some(error.as_ref().unchecked_ref()));

            Self {
                _open: open,
                _message: message,
                _close: close,
                _error: error,
            }
        }
    }

    /// WebSocket client for WASM.
    ///
    /// Events are collected by browser callbacks and drained via `poll_events()`.
    pub struct WasmWebSocket {
        socket: Option<(WebSocket, Callbacks)>,
        state: ConnectionState,
        inbox: Inbox,
    }

    impl WasmWebSocket {
        pub fn new() -> Self {
            Self {
                socket: None,
                state: ConnectionState::Disconnected,
                inbox: Rc::new(RefCell::new(Vec::new())),
            }
        }

        /// Start connecting to the relay.
        pub fn connect(&mut self, url: &str) -> Result<(), TransportError> {
            if self.socket.is_some() {
                return Err(TransportError::AlreadyConnected);
            }
            let ws = WebSocket::new(url).map_err(|e| TransportError::InvalidUrl(format!("{e:?}")))?;
            let callbacks = Callbacks::attach(&ws, &self.inbox);
            self.socket = Some((ws, callbacks));
            self.state = ConnectionState::Connecting;
            Ok(())
        }

        pub fn disconnect(&mut self) {
            if let Some((ws, _callbacks)) = self.socket.take() {
                let _ = ws.close();
            }
            self.state = ConnectionState::Disconnected;
        }

        /// Send a text frame.
        pub fn send(&self, frame: &str) -> Result<(), TransportError> {
            let (ws, _) = self.socket.as_ref().ok_or(TransportError::NotConnected)?;
            ws.send_with_str(frame)
                .map_err(|e| TransportError::SendFailed(format!("{e:?}")))
        }

        /// Drain pending events (non-blocking).
        pub fn poll_events(&mut self) -> Vec<TransportEvent> {
            let events = std::mem::take(&mut *self.inbox.borrow_mut());
            for event in &events {
                self.state = self.state.after(event);
            }
            events
        }

        pub fn state(&self) -> ConnectionState {
            self.state
        }

        pub fn is_connected(&self) -> bool {
            self.state == ConnectionState::Connected
        }
    }

    impl Default for WasmWebSocket {
        fn default() -> Self {
            Self::new()
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_client::WasmWebSocket;

// ============================================================================
// Native WebSocket Client
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
mod native_client {
    use super::*;
    use std::io::ErrorKind;
    use std::net::TcpStream;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::stream::MaybeTlsStream;
    use tungstenite::{Message, WebSocket};
    use url::Url;

    /// How long a blocking read may wait before outgoing frames are serviced.
    const READ_POLL: Duration = Duration::from_millis(50);
    const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Commands sent to the socket thread.
    enum Command {
        Send(String),
        Close,
    }

    /// Why the socket loop stopped.
    enum Exit {
        /// We asked to close, or the owner went away.
        Local,
        /// The relay closed or the link broke.
        Remote,
    }

    /// WebSocket client for native platforms.
    ///
    /// Socket I/O lives on a background thread; the event loop only ever
    /// touches the channels, so it never blocks.
    pub struct NativeWebSocket {
        state: ConnectionState,
        commands: Option<Sender<Command>>,
        events: Option<Receiver<TransportEvent>>,
        _worker: Option<JoinHandle<()>>,
    }

    impl NativeWebSocket {
        pub fn new() -> Self {
            Self {
                state: ConnectionState::Disconnected,
                commands: None,
                events: None,
                _worker: None,
            }
        }

        /// Start connecting to the relay. Progress arrives through [`poll_events`](Self::poll_events).
        pub fn connect(&mut self, url: &str) -> Result<(), TransportError> {
            if self.commands.is_some() {
                return Err(TransportError::AlreadyConnected);
            }
            let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
            if !matches!(parsed.scheme(), "ws" | "wss") {
                return Err(TransportError::InvalidUrl(format!(
                    "unsupported scheme {}",
                    parsed.scheme()
                )));
            }

            let (command_tx, command_rx) = channel();
            let (event_tx, event_rx) = channel();
            let url = url.to_string();
            let worker = thread::spawn(move || socket_thread(&url, command_rx, event_tx));

            self.state = ConnectionState::Connecting;
            self.commands = Some(command_tx);
            self.events = Some(event_rx);
            self._worker = Some(worker);
            Ok(())
        }

        pub fn disconnect(&mut self) {
            if let Some(tx) = self.commands.take() {
                let _ = tx.send(Command::Close);
            }
            self.events = None;
            self._worker = None;
            self.state = ConnectionState::Disconnected;
        }

        /// Queue a text frame for the socket thread.
        pub fn send(&self, frame: &str) -> Result<(), TransportError> {
            let tx = self.commands.as_ref().ok_or(TransportError::NotConnected)?;
            tx.send(Command::Send(frame.to_string()))
                .map_err(|e| TransportError::SendFailed(e.to_string()))
        }

        /// Drain pending events (non-blocking).
        pub fn poll_events(&mut self) -> Vec<TransportEvent> {
            let Some(rx) = self.events.as_ref() else {
                return Vec::new();
            };
            let events: Vec<TransportEvent> = rx.try_iter().collect();
            for event in &events {
                self.state = self.state.after(event);
            }
            events
        }

        pub fn state(&self) -> ConnectionState {
            self.state
        }

        pub fn is_connected(&self) -> bool {
            self.state == ConnectionState::Connected
        }
    }

    impl Default for NativeWebSocket {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for NativeWebSocket {
        fn drop(&mut self) {
            self.disconnect();
        }
    }

    fn socket_thread(url: &str, commands: Receiver<Command>, events: Sender<TransportEvent>) {
        log::info!("Connecting to relay at {}", url);
        let mut socket = match tungstenite::connect(url) {
            Ok((socket, response)) => {
                log::info!("Relay connected, status: {}", response.status());
                socket
            }
            Err(e) => {
                log::error!("Relay connection failed: {}", e);
                let _ = events.send(TransportEvent::Error {
                    message: format!("Connection failed: {}", e),
                });
                return;
            }
        };
        let _ = events.send(TransportEvent::Connected);

        if let MaybeTlsStream::Plain(tcp) = socket.get_mut() {
            configure_timeouts(tcp);
        }

        match pump(&mut socket, &commands, &events) {
            Exit::Local => {
                let _ = socket.close(None);
                let _ = socket.flush();
            }
            Exit::Remote => {}
        }
        log::info!("Relay socket closed");
        let _ = events.send(TransportEvent::Disconnected);
    }

    fn configure_timeouts(tcp: &TcpStream) {
        if let Err(e) = tcp
            .set_read_timeout(Some(READ_POLL))
            .and_then(|_| tcp.set_write_timeout(Some(WRITE_TIMEOUT)))
        {
            log::warn!("Cannot set socket timeouts: {}", e);
        }
    }

    /// Alternate between flushing queued frames and reading from the relay.
    fn pump(
        socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
        commands: &Receiver<Command>,
        events: &Sender<TransportEvent>,
    ) -> Exit {
        loop {
            loop {
                match commands.try_recv() {
                    Ok(Command::Send(frame)) => {
                        log::trace!("Sending {} bytes", frame.len());
                        if let Err(e) = socket.send(Message::Text(frame)) {
                            log::error!("Relay send error: {}", e);
                            return Exit::Remote;
                        }
                    }
                    Ok(Command::Close) | Err(TryRecvError::Disconnected) => return Exit::Local,
                    Err(TryRecvError::Empty) => break,
                }
            }

            match socket.read() {
                Ok(Message::Text(text)) => {
                    log::trace!("Received {} bytes", text.len());
                    if events.send(TransportEvent::Frame(text)).is_err() {
                        return Exit::Local;
                    }
                }
                Ok(Message::Close(_)) => {
                    log::info!("Relay sent close frame");
                    return Exit::Remote;
                }
                // Pings are answered by tungstenite on the next write or flush.
                Ok(_) => {}
                Err(tungstenite::Error::Io(e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    // Read timed out; flush any pending pong before looping.
                    let _ = socket.flush();
                }
                Err(e) => {
                    log::error!("Relay read error: {}", e);
                    return Exit::Remote;
                }
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native_client::NativeWebSocket;

/// Platform-specific WebSocket client type.
#[cfg(target_arch = "wasm32")]
pub type PlatformWebSocket = WasmWebSocket;

#[cfg(not(target_arch = "wasm32"))]
pub type PlatformWebSocket = NativeWebSocket;
