//! TandemInk Application
//!
//! Headless native client wiring the board, the relay socket and the
//! renderer into one loop.

mod app;

pub use app::{App, AppConfig, AppError, ENV_CONFIG, ENV_RELAY_URL, ENV_TICK_MS};
