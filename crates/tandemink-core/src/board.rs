//! The board: one owned context tying viewport, gestures, scene and sync
//! together behind a single event loop entry point.

use crate::channel::{SyncChannel, SyncNotice};
use crate::config::{BoardConfig, ConfigError};
use crate::gesture::{GestureArbiter, GestureContext, GestureOutcome, GestureSettings};
use crate::inertia::Inertia;
use crate::input::{Instant, PointerEvent};
use crate::model::{Brush, MediaKind, MediaObject, ObjectId, TextLabel};
use crate::scene::Scene;
use crate::sync::{ConnectionState, TransportEvent};
use crate::viewport::Viewport;
use kurbo::Point;

/// Everything that can happen to a board.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    Pointer(PointerEvent),
    /// Animation frame: advances inertia and timers.
    Tick(Instant),
    /// A raw text frame from the relay.
    Inbound(String),
    Transport(TransportEvent),
}

/// Things the host has to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardNotice {
    /// Ask the user for text and call [`Board::create_text`] with it.
    CreateText { anchor: Point },
    ClearDenied { message: String },
    SceneReplaced,
    SceneCleared,
    ConnectionChanged(ConnectionState),
}

/// A collaborative whiteboard as seen by one client.
#[derive(Debug)]
pub struct Board {
    viewport: Viewport,
    scene: Scene,
    inertia: Inertia,
    arbiter: GestureArbiter,
    channel: SyncChannel,
    brush: Brush,
    config: BoardConfig,
    connection: ConnectionState,
    needs_redraw: bool,
}

impl Default for Board {
    fn default() -> Self {
        Self::from_valid(BoardConfig::default())
    }
}

impl Board {
    /// Build a board, rejecting configs that would break the viewport or inertia.
    pub fn new(config: BoardConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: BoardConfig) -> Self {
        Self {
            viewport: Viewport::with_bounds(config.min_scale, config.max_scale),
            scene: Scene::new(),
            inertia: Inertia::new(config.inertia_decay, config.inertia_epsilon),
            arbiter: GestureArbiter::new(GestureSettings::from(&config)),
            channel: SyncChannel::new(),
            brush: config.brush,
            config,
            connection: ConnectionState::Disconnected,
            needs_redraw: true,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        self.needs_redraw = true;
        &mut self.viewport
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn arbiter(&self) -> &GestureArbiter {
        &self.arbiter
    }

    pub fn inertia(&self) -> &Inertia {
        &self.inertia
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    /// Change stroke size, text size or color for future content.
    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = brush;
    }

    /// Dispatch one event.
    pub fn handle_event(&mut self, event: BoardEvent) -> Option<BoardNotice> {
        match event {
            BoardEvent::Pointer(pointer) => {
                self.handle_pointer(pointer);
                None
            }
            BoardEvent::Tick(now) => self.tick(now),
            BoardEvent::Inbound(frame) => self.handle_inbound(&frame),
            BoardEvent::Transport(transport) => self.handle_transport(transport),
        }
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        let mut ctx = GestureContext {
            viewport: &mut self.viewport,
            scene: &mut self.scene,
            channel: &mut self.channel,
            inertia: &mut self.inertia,
            brush: &self.brush,
        };
        self.arbiter.handle_pointer(event, &mut ctx);
        self.needs_redraw = true;
    }

    /// Advance inertia by one step and fire due timers.
    pub fn tick(&mut self, now: Instant) -> Option<BoardNotice> {
        if self.inertia.is_active() {
            self.inertia.step(&mut self.viewport);
            self.needs_redraw = true;
        }
        match self.arbiter.poll(now)? {
            GestureOutcome::CreateRequested { anchor } => Some(BoardNotice::CreateText { anchor }),
        }
    }

    /// Merge one frame from the relay. Malformed frames are logged and dropped.
    pub fn handle_inbound(&mut self, frame: &str) -> Option<BoardNotice> {
        let notice = match self.channel.apply(frame, &mut self.scene) {
            Ok(notice) => notice,
            Err(e) => {
                log::warn!("Dropping inbound frame: {e}");
                return None;
            }
        };
        match notice {
            SyncNotice::Initialized => {
                self.needs_redraw = true;
                Some(BoardNotice::SceneReplaced)
            }
            SyncNotice::Cleared => {
                self.needs_redraw = true;
                Some(BoardNotice::SceneCleared)
            }
            SyncNotice::ClearDenied { message } => Some(BoardNotice::ClearDenied { message }),
            SyncNotice::Updated => {
                self.needs_redraw = true;
                None
            }
            SyncNotice::Ignored => None,
        }
    }

    fn handle_transport(&mut self, event: TransportEvent) -> Option<BoardNotice> {
        let state = match event {
            TransportEvent::Frame(frame) => return self.handle_inbound(&frame),
            TransportEvent::Connected => {
                log::info!("Connected to relay");
                ConnectionState::Connected
            }
            TransportEvent::Disconnected => {
                log::info!("Disconnected from relay");
                ConnectionState::Disconnected
            }
            TransportEvent::Error { message } => {
                log::warn!("Relay error: {message}");
                ConnectionState::Error
            }
        };
        self.connection = state;
        Some(BoardNotice::ConnectionChanged(state))
    }

    /// Place a new text label at a world anchor using the current brush.
    ///
    /// Blank content is ignored. Returns the new label's id.
    pub fn create_text(&mut self, anchor: Point, content: &str) -> Option<ObjectId> {
        if content.trim().is_empty() {
            return None;
        }
        let label = TextLabel::new(content, anchor, self.brush.text_size, self.brush.color);
        let id = label.id.clone();
        self.scene.upsert_text(label);
        if let Some(label) = self.scene.text(&id) {
            self.channel.send_text_add(label);
        }
        self.needs_redraw = true;
        Some(id)
    }

    /// Place an image or video with its top-left corner at a world anchor.
    pub fn add_media(
        &mut self,
        kind: MediaKind,
        source: impl Into<String>,
        anchor: Point,
        scale_factor: f64,
    ) -> ObjectId {
        let media = MediaObject::new(kind, source, anchor, scale_factor);
        let id = media.id.clone();
        self.scene.upsert_media(media);
        if let Some(media) = self.scene.media(&id) {
            self.channel.send_media_add(media);
        }
        self.needs_redraw = true;
        id
    }

    /// Ask the relay to clear the board. Nothing changes locally until it agrees.
    pub fn request_clear(&mut self, password: &str) {
        self.channel.send_clear(password);
    }

    /// Take pending outgoing frames.
    pub fn take_outgoing(&mut self) -> Vec<String> {
        self.channel.take_outgoing()
    }

    pub fn has_outgoing(&self) -> bool {
        self.channel.has_outgoing()
    }

    /// Whether anything visible changed since the last call.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MouseButton;
    use crate::model::RgbColor;
    use kurbo::Vec2;
    use std::time::Duration;

    fn down(id: u64, x: f64, y: f64, time: Instant) -> BoardEvent {
        BoardEvent::Pointer(PointerEvent::Down {
            id,
            position: Point::new(x, y),
            button: MouseButton::Left,
            time,
        })
    }

    fn moved(id: u64, x: f64, y: f64, time: Instant) -> BoardEvent {
        BoardEvent::Pointer(PointerEvent::Move { id, position: Point::new(x, y), time })
    }

    fn up(id: u64, x: f64, y: f64, time: Instant) -> BoardEvent {
        BoardEvent::Pointer(PointerEvent::Up { id, position: Point::new(x, y), time })
    }

    #[test]
    fn test_long_press_to_text_flow() {
        let mut board = Board::default();
        board.set_brush(Brush { size: 2.0, text_size: 30.0, color: RgbColor::new(0, 128, 0) });
        let t0 = Instant::now();

        assert_eq!(board.handle_event(down(1, 50.0, 80.0, t0)), None);
        assert_eq!(board.handle_event(BoardEvent::Tick(t0 + Duration::from_millis(100))), None);
        let notice = board.handle_event(BoardEvent::Tick(t0 + Duration::from_millis(520)));
        assert_eq!(notice, Some(BoardNotice::CreateText { anchor: Point::new(50.0, 80.0) }));
        board.handle_event(up(1, 50.0, 80.0, t0 + Duration::from_millis(600)));

        let id = board.create_text(Point::new(50.0, 80.0), "hello").unwrap();
        let label = board.scene().text(&id).unwrap();
        assert!((label.font_size - 30.0).abs() < f64::EPSILON);
        assert_eq!(label.color, RgbColor::new(0, 128, 0));

        let frames = board.take_outgoing();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("\"text_add\""));
    }

    #[test]
    fn test_local_adds_announce_stored_state() {
        let mut board = Board::default();
        let text_id = board.create_text(Point::new(3.0, 4.0), "note").unwrap();
        let media_id = board.add_media(MediaKind::Video, "https://x/v.mp4", Point::new(7.0, 8.0), 0.5);
        assert_eq!(board.scene().text_count(), 1);
        assert_eq!(board.scene().media_count(), 1);

        let frames: Vec<serde_json::Value> = board
            .take_outgoing()
            .iter()
            .map(|f| serde_json::from_str(f).unwrap())
            .collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["event"], "text_add");
        assert_eq!(frames[0]["data"]["id"], text_id.as_str());
        assert_eq!(frames[0]["data"]["x"], 3.0);
        assert_eq!(frames[1]["event"], "media_add");
        assert_eq!(frames[1]["data"]["id"], media_id.as_str());
        assert_eq!(frames[1]["data"]["type"], "video");
        assert_eq!(frames[1]["data"]["scale"], 0.5);
    }

    #[test]
    fn test_blank_text_is_ignored() {
        let mut board = Board::default();
        assert_eq!(board.create_text(Point::ZERO, "   "), None);
        assert!(!board.has_outgoing());
        assert!(board.scene().is_empty());
    }

    #[test]
    fn test_inbound_frames_update_scene() {
        let mut board = Board::default();
        let notice = board.handle_event(BoardEvent::Inbound(
            r##"{"event":"init","data":{"lines":[{"from":{"x":0,"y":0},"to":{"x":5,"y":5},"size":3,"color":"#000"}]}}"##
                .to_string(),
        ));
        assert_eq!(notice, Some(BoardNotice::SceneReplaced));
        assert_eq!(board.scene().strokes().len(), 1);
        assert!(board.take_redraw());
        assert!(!board.take_redraw());

        let notice = board.handle_event(BoardEvent::Transport(TransportEvent::Frame(
            r#"{"event":"clear"}"#.to_string(),
        )));
        assert_eq!(notice, Some(BoardNotice::SceneCleared));
        assert!(board.scene().is_empty());
    }

    #[test]
    fn test_malformed_inbound_is_dropped() {
        let mut board = Board::default();
        assert_eq!(board.handle_event(BoardEvent::Inbound("][".to_string())), None);
        assert!(board.scene().is_empty());
    }

    #[test]
    fn test_clear_request_waits_for_relay() {
        let mut board = Board::default();
        board.add_media(MediaKind::Image, "data:,x", Point::new(1.0, 1.0), 1.0);
        board.request_clear("wrong");
        assert_eq!(board.scene().media_count(), 1);

        let frames = board.take_outgoing();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].contains("\"media_add\""));
        assert!(frames[1].contains("\"password\":\"wrong\""));

        let notice = board.handle_event(BoardEvent::Inbound(
            r#"{"event":"clear_denied","data":{"msg":"bad password"}}"#.to_string(),
        ));
        assert_eq!(notice, Some(BoardNotice::ClearDenied { message: "bad password".to_string() }));
        assert_eq!(board.scene().media_count(), 1);
    }

    #[test]
    fn test_ticks_run_inertia_after_pan() {
        let mut board = Board::default();
        let t0 = Instant::now();
        board.handle_event(BoardEvent::Pointer(PointerEvent::Down {
            id: 1,
            position: Point::ZERO,
            button: MouseButton::Middle,
            time: t0,
        }));
        board.handle_event(moved(1, 20.0, 0.0, t0 + Duration::from_millis(16)));
        board.handle_event(up(1, 20.0, 0.0, t0 + Duration::from_millis(32)));
        assert!(board.inertia().is_active());

        let before = board.viewport().translate();
        for i in 0..200 {
            board.handle_event(BoardEvent::Tick(t0 + Duration::from_millis(48 + i * 16)));
        }
        let after = board.viewport().translate();
        assert!(!board.inertia().is_active());
        assert!(after.x > before.x);
        assert!((after.y - before.y).abs() < f64::EPSILON);
        assert!((board.viewport().scale() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_bounds_reach_viewport() {
        let config = BoardConfig { min_scale: 0.5, max_scale: 2.0, ..BoardConfig::default() };
        let mut board = Board::new(config).unwrap();
        for _ in 0..20 {
            board.handle_event(BoardEvent::Pointer(PointerEvent::Wheel {
                position: Point::new(10.0, 10.0),
                delta: Vec2::new(0.0, -120.0),
            }));
        }
        assert!((board.viewport().scale() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let endless_glide = BoardConfig { inertia_decay: 1.0, ..BoardConfig::default() };
        assert!(matches!(
            Board::new(endless_glide),
            Err(ConfigError::Invalid { field: "inertia_decay", .. })
        ));

        let nan_bounds = BoardConfig { min_scale: f64::NAN, ..BoardConfig::default() };
        assert!(matches!(Board::new(nan_bounds), Err(ConfigError::Invalid { field: "min_scale", .. })));
    }

    #[test]
    fn test_connection_state_tracking() {
        let mut board = Board::default();
        assert_eq!(board.connection(), ConnectionState::Disconnected);
        let notice = board.handle_event(BoardEvent::Transport(TransportEvent::Connected));
        assert_eq!(notice, Some(BoardNotice::ConnectionChanged(ConnectionState::Connected)));
        board.handle_event(BoardEvent::Transport(TransportEvent::Error { message: "boom".to_string() }));
        assert_eq!(board.connection(), ConnectionState::Error);
    }

    #[test]
    fn test_drawing_is_sent_before_flush() {
        let mut board = Board::default();
        let t0 = Instant::now();
        board.handle_event(down(1, 0.0, 0.0, t0));
        board.handle_event(moved(1, 30.0, 0.0, t0 + Duration::from_millis(16)));
        assert_eq!(board.scene().strokes().len(), 1);
        let frames = board.take_outgoing();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].starts_with("{\"event\":\"draw\""));
    }
}
