//! Renderer trait abstraction.

use kurbo::{Rect, Size};
use peniko::Color;
use tandemink_core::scene::Scene;
use tandemink_core::viewport::Viewport;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Viewport has no area: {width}x{height}")]
    EmptyViewport { width: f64, height: f64 },
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// The scene to render.
    pub scene: &'a Scene,
    /// Camera mapping world to screen.
    pub viewport: &'a Viewport,
    /// Output size in screen pixels.
    pub viewport_size: Size,
    /// Background color.
    pub background_color: Color,
    /// Skip strokes that fall entirely outside the output.
    pub cull_offscreen: bool,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(scene: &'a Scene, viewport: &'a Viewport, viewport_size: Size) -> Self {
        Self {
            scene,
            viewport,
            viewport_size,
            background_color: Color::from_rgba8(255, 255, 255, 255),
            cull_offscreen: true,
        }
    }

    pub fn with_culling(mut self, cull: bool) -> Self {
        self.cull_offscreen = cull;
        self
    }

    /// The visible screen area.
    pub fn screen_rect(&self) -> Rect {
        Rect::from_origin_size((0.0, 0.0), self.viewport_size)
    }
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Build the drawing commands for a frame.
    ///
    /// Called once per frame that needs a redraw.
    fn build_frame(&mut self, ctx: &RenderContext) -> RenderResult<()>;

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}
