//! TandemInk Core Library
//!
//! Platform-agnostic core of the TandemInk collaborative whiteboard client:
//! camera, gesture handling, the synchronized scene and the relay protocol.

pub mod board;
pub mod channel;
pub mod config;
pub mod gesture;
pub mod inertia;
pub mod input;
pub mod model;
pub mod scene;
pub mod sync;
pub mod viewport;

pub use board::{Board, BoardEvent, BoardNotice};
pub use channel::{SyncChannel, SyncNotice};
pub use config::{BoardConfig, ConfigError};
pub use gesture::{GestureArbiter, GestureKind, GestureOutcome, GestureSettings};
pub use inertia::Inertia;
pub use input::{Instant, MouseButton, PointerEvent, PointerId};
pub use model::{Brush, MediaKind, MediaObject, ObjectId, ObjectRef, RgbColor, Stroke, TextLabel};
pub use scene::{MediaCache, MediaData, MediaError, MediaHandle, Scene, SceneObject};
pub use sync::{
    ClientMessage, ConnectionState, PlatformWebSocket, ServerMessage, SyncError, TransportError,
    TransportEvent,
};
pub use viewport::Viewport;
