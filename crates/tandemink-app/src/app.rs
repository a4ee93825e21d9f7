//! Headless client: connects a board to a relay and drives its event loop.

use kurbo::Size;
use std::path::PathBuf;
use std::time::Duration;
use tandemink_core::config::{BoardConfig, ConfigError};
use tandemink_core::sync::{ConnectionState, PlatformWebSocket, TransportError, TransportEvent};
use tandemink_core::{Board, BoardEvent, BoardNotice, Instant};
use tandemink_render::{DisplayListRenderer, RenderContext, Renderer, RendererError};
use thiserror::Error;

/// Environment variable holding the relay URL.
pub const ENV_RELAY_URL: &str = "TANDEMINK_RELAY_URL";
/// Environment variable holding an optional board config path.
pub const ENV_CONFIG: &str = "TANDEMINK_CONFIG";
/// Environment variable holding the tick interval in milliseconds.
pub const ENV_TICK_MS: &str = "TANDEMINK_TICK_MS";

const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:5000/ws";

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Render(#[from] RendererError),
    #[error("Invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },
    #[error("Relay connection to {url} failed")]
    ConnectionFailed { url: String },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub relay_url: String,
    pub board_config: Option<PathBuf>,
    pub tick: Duration,
    /// Size of the virtual output the display list is built for.
    pub viewport_size: Size,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            board_config: None,
            tick: Duration::from_millis(16),
            viewport_size: Size::new(1280.0, 800.0),
        }
    }
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_RELAY_URL) {
            config.relay_url = url;
        }
        config.board_config = lookup(ENV_CONFIG)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        if let Some(raw) = lookup(ENV_TICK_MS) {
            let ms: u64 = raw.trim().parse().map_err(|_| AppError::InvalidEnv {
                name: ENV_TICK_MS,
                value: raw.clone(),
            })?;
            if ms == 0 {
                return Err(AppError::InvalidEnv {
                    name: ENV_TICK_MS,
                    value: raw,
                });
            }
            config.tick = Duration::from_millis(ms);
        }
        Ok(config)
    }

    /// Load the board configuration, or defaults when none is set.
    pub fn load_board_config(&self) -> Result<BoardConfig, AppError> {
        match &self.board_config {
            Some(path) => Ok(BoardConfig::load(path)?),
            None => Ok(BoardConfig::default()),
        }
    }
}

/// Main application struct.
pub struct App {
    config: AppConfig,
    board: Board,
    renderer: DisplayListRenderer,
    frames: u64,
}

impl App {
    /// Create a new application with custom configuration.
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let board = Board::new(config.load_board_config()?)?;
        Ok(Self {
            config,
            board,
            renderer: DisplayListRenderer::new(),
            frames: 0,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn renderer(&self) -> &DisplayListRenderer {
        &self.renderer
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Connect to the relay and run until the connection ends.
    pub fn run(&mut self) -> Result<(), AppError> {
        let mut socket = PlatformWebSocket::new();
        socket.connect(&self.config.relay_url)?;
        log::info!("Connecting to {}", self.config.relay_url);

        loop {
            let events = socket.poll_events();
            self.step(events, Instant::now())?;

            for frame in self.board.take_outgoing() {
                if let Err(e) = socket.send(&frame) {
                    log::warn!("Failed to send frame: {}", e);
                }
            }

            if self.connection_ended(socket.state())? {
                return Ok(());
            }

            std::thread::sleep(self.config.tick);
        }
    }

    /// Whether the relay session is over. A failed connection is an error.
    fn connection_ended(&self, socket: ConnectionState) -> Result<bool, AppError> {
        match self.board.connection() {
            ConnectionState::Disconnected if socket == ConnectionState::Disconnected => {
                log::info!("Relay connection closed after {} frames", self.frames);
                Ok(true)
            }
            ConnectionState::Error => Err(AppError::ConnectionFailed {
                url: self.config.relay_url.clone(),
            }),
            _ => Ok(false),
        }
    }

    /// Feed transport events, advance one tick and render if needed.
    pub fn step(&mut self, events: Vec<TransportEvent>, now: Instant) -> Result<Vec<BoardNotice>, AppError> {
        let mut notices: Vec<BoardNotice> = events
            .into_iter()
            .filter_map(|event| self.board.handle_event(BoardEvent::Transport(event)))
            .collect();
        notices.extend(self.board.handle_event(BoardEvent::Tick(now)));

        for notice in &notices {
            self.report(notice);
        }

        if self.board.take_redraw() {
            let ctx = RenderContext::new(self.board.scene(), self.board.viewport(), self.config.viewport_size);
            self.renderer.build_frame(&ctx)?;
            self.frames += 1;
            log::debug!("Frame {}: {} draw commands", self.frames, self.renderer.commands().len());
        }
        Ok(notices)
    }

    fn report(&self, notice: &BoardNotice) {
        match notice {
            BoardNotice::SceneReplaced => {
                let scene = self.board.scene();
                log::info!(
                    "Board loaded: {} strokes, {} texts, {} media",
                    scene.strokes().len(),
                    scene.text_count(),
                    scene.media_count()
                );
            }
            BoardNotice::SceneCleared => log::info!("Board cleared"),
            BoardNotice::ClearDenied { message } => log::warn!("Clear denied: {}", message),
            BoardNotice::CreateText { anchor } => {
                log::info!("Text requested at ({:.1}, {:.1}); no prompt in headless mode", anchor.x, anchor.y);
            }
            BoardNotice::ConnectionChanged(state) => log::info!("Connection state: {:?}", state),
        }
    }
}
