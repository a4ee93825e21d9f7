//! TandemInk Render Library
//!
//! Renderer abstraction and implementations for TandemInk.
//! The bundled backend records a screen-space display list.

mod display_list;
mod renderer;

pub use display_list::{DisplayListRenderer, DrawCommand};
pub use renderer::{RenderContext, RenderResult, Renderer, RendererError};
