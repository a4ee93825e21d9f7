//! Display-list backend: turns a frame into plain screen-space draw commands
//! that any 2D surface can replay.

use crate::renderer::{RenderContext, RenderResult, Renderer, RendererError};
use kurbo::{Cap, Point, Rect};
use peniko::Color;
use std::rc::Rc;
use tandemink_core::scene::{MIN_TEXT_PX, MediaHandle, SceneObject};

/// One drawing operation in screen space.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Fill the whole output.
    Clear(Color),
    Segment {
        from: Point,
        to: Point,
        width: f64,
        cap: Cap,
        color: Color,
    },
    Text {
        content: String,
        /// Baseline origin.
        origin: Point,
        font_px: f64,
        color: Color,
    },
    Media {
        handle: Rc<MediaHandle>,
        /// Top-left corner.
        origin: Point,
        /// Combined object and camera scale.
        scale: f64,
    },
}

/// Renderer that records a [`DrawCommand`] list per frame.
#[derive(Debug, Default)]
pub struct DisplayListRenderer {
    commands: Vec<DrawCommand>,
    culled: usize,
}

impl DisplayListRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands of the last frame, back to front.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Strokes skipped as offscreen in the last frame.
    pub fn culled(&self) -> usize {
        self.culled
    }

    fn render_strokes(&mut self, ctx: &RenderContext) {
        let scale = ctx.viewport.scale();
        let screen = ctx.screen_rect();
        for stroke in ctx.scene.strokes() {
            let from = ctx.viewport.world_to_screen(stroke.from);
            let to = ctx.viewport.world_to_screen(stroke.to);
            let width = stroke.width * scale;
            if ctx.cull_offscreen {
                let bounds = Rect::from_points(from, to).inflate(width / 2.0, width / 2.0);
                if !bounds.overlaps(screen) {
                    self.culled += 1;
                    continue;
                }
            }
            self.commands.push(DrawCommand::Segment {
                from,
                to,
                width,
                cap: Cap::Round,
                color: stroke.color.into(),
            });
        }
    }

    fn render_objects(&mut self, ctx: &RenderContext) {
        let scale = ctx.viewport.scale();
        for object in ctx.scene.objects_ordered() {
            match object {
                SceneObject::Text(label) => self.commands.push(DrawCommand::Text {
                    content: label.content.clone(),
                    origin: ctx.viewport.world_to_screen(label.position),
                    font_px: (label.font_size * scale).max(MIN_TEXT_PX),
                    color: label.color.into(),
                }),
                SceneObject::Media(media) => {
                    // Undecodable media is skipped; the cache already logged why.
                    if let Some(handle) = ctx.scene.media_cache().resolve(media) {
                        self.commands.push(DrawCommand::Media {
                            handle,
                            origin: ctx.viewport.world_to_screen(media.position),
                            scale: media.scale_factor * scale,
                        });
                    }
                }
            }
        }
    }
}

impl Renderer for DisplayListRenderer {
    fn build_frame(&mut self, ctx: &RenderContext) -> RenderResult<()> {
        let size = ctx.viewport_size;
        if size.width <= 0.0 || size.height <= 0.0 {
            return Err(RendererError::EmptyViewport {
                width: size.width,
                height: size.height,
            });
        }

        self.commands.clear();
        self.culled = 0;
        self.commands.push(DrawCommand::Clear(self.background_color(ctx)));
        self.render_strokes(ctx);
        self.render_objects(ctx);
        log::trace!(
            "Built frame: {} commands, {} culled",
            self.commands.len(),
            self.culled
        );
        Ok(())
    }
}
