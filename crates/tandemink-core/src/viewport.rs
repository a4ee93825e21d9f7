//! Viewport module for pan/zoom transforms.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest scale a viewport may reach.
pub const MIN_SCALE: f64 = 0.2;
/// Largest scale a viewport may reach.
pub const MAX_SCALE: f64 = 5.0;

/// Wheel factor applied when scrolling towards the user (zoom in).
pub const WHEEL_ZOOM_IN: f64 = 1.12;
/// Wheel factor applied when scrolling away from the user (zoom out).
pub const WHEEL_ZOOM_OUT: f64 = 0.9;

/// Viewport is the client-local camera over the shared surface.
///
/// It maps world coordinates to screen coordinates with a uniform scale
/// followed by a translation. It is never synchronized between clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Current zoom level.
    scale: f64,
    /// Current translation in screen pixels.
    translate: Vec2,
    /// Minimum allowed scale.
    min_scale: f64,
    /// Maximum allowed scale.
    max_scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate: Vec2::ZERO,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
        }
    }
}

impl Viewport {
    /// Create an identity viewport with the default scale bounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an identity viewport with custom scale bounds.
    ///
    /// Inverted bounds are swapped so the clamp range is always valid.
    pub fn with_bounds(min_scale: f64, max_scale: f64) -> Self {
        let (min_scale, max_scale) = if min_scale <= max_scale {
            (min_scale, max_scale)
        } else {
            (max_scale, min_scale)
        };
        Self {
            scale: 1.0_f64.clamp(min_scale, max_scale),
            translate: Vec2::ZERO,
            min_scale,
            max_scale,
        }
    }

    /// Current scale.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Current translation in screen pixels.
    pub fn translate(&self) -> Vec2 {
        self.translate
    }

    /// Scale bounds as `(min, max)`.
    pub fn bounds(&self) -> (f64, f64) {
        (self.min_scale, self.max_scale)
    }

    /// Clamp a candidate scale into this viewport's bounds.
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }

    /// Replace scale and translation at once. The scale is clamped.
    pub fn set(&mut self, scale: f64, translate: Vec2) {
        self.scale = self.clamp_scale(scale);
        self.translate = translate;
    }

    /// Get the affine transform for rendering (world to screen).
    pub fn transform(&self) -> Affine {
        Affine::translate(self.translate) * Affine::scale(self.scale)
    }

    /// Get the inverse transform for input handling (screen to world).
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.translate)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Pan the viewport by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.translate += delta;
    }

    /// Change the scale while keeping the world point under `anchor` fixed on screen.
    pub fn set_scale_anchored(&mut self, new_scale: f64, anchor: Point) {
        let reference = *self;
        self.anchor_to(&reference, anchor, new_scale, anchor);
    }

    /// Place the world point that sat under `reference_anchor` in `reference`
    /// at screen point `target`, using the clamped `new_scale`.
    ///
    /// With `target == reference_anchor` and `reference == self` this is plain
    /// anchored zoom. Pinch uses a frozen gesture-start reference and lets the
    /// target follow the live midpoint.
    pub fn anchor_to(
        &mut self,
        reference: &Viewport,
        reference_anchor: Point,
        new_scale: f64,
        target: Point,
    ) {
        let world_point = reference.screen_to_world(reference_anchor);
        self.scale = self.clamp_scale(new_scale);
        self.translate = Vec2::new(
            target.x - world_point.x * self.scale,
            target.y - world_point.y * self.scale,
        );
    }

    /// Zoom by a multiplicative factor around a screen point.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) {
        self.set_scale_anchored(self.scale * factor, anchor);
    }

    /// Apply one wheel notch. Negative `delta_y` zooms in.
    pub fn wheel_zoom(&mut self, anchor: Point, delta_y: f64, zoom_in: f64, zoom_out: f64) {
        let factor = if delta_y < 0.0 { zoom_in } else { zoom_out };
        self.zoom_at(anchor, factor);
    }

    /// Reset to identity, keeping the bounds.
    pub fn reset(&mut self) {
        self.scale = self.clamp_scale(1.0);
        self.translate = Vec2::ZERO;
    }
}
