//! Post-gesture inertial panning.

use crate::viewport::Viewport;
use kurbo::Vec2;

/// Per-tick velocity multiplier.
pub const DEFAULT_DECAY: f64 = 0.92;
/// Velocity component below which the glide stops.
pub const DEFAULT_EPSILON: f64 = 0.1;

/// Decaying pan velocity applied to a viewport once per animation tick.
///
/// Velocity is in screen pixels per tick. Inertia only ever translates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inertia {
    velocity: Vec2,
    decay: f64,
    epsilon: f64,
    active: bool,
}

impl Default for Inertia {
    fn default() -> Self {
        Self::new(DEFAULT_DECAY, DEFAULT_EPSILON)
    }
}

impl Inertia {
    pub fn new(decay: f64, epsilon: f64) -> Self {
        Self {
            velocity: Vec2::ZERO,
            decay,
            epsilon,
            active: false,
        }
    }

    /// Start gliding with the given velocity, replacing any glide in flight.
    pub fn launch(&mut self, velocity: Vec2) {
        log::debug!("inertia launched at ({:.2}, {:.2})", velocity.x, velocity.y);
        self.velocity = velocity;
        self.active = true;
    }

    /// Stop immediately and zero the velocity.
    pub fn cancel(&mut self) {
        if self.active {
            log::trace!("inertia cancelled");
        }
        self.velocity = Vec2::ZERO;
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Advance one tick. Returns true when the viewport moved.
    pub fn step(&mut self, viewport: &mut Viewport) -> bool {
        if !self.active {
            return false;
        }

        viewport.pan(self.velocity);
        self.velocity *= self.decay;

        if self.velocity.x.abs() < self.epsilon && self.velocity.y.abs() < self.epsilon {
            self.velocity = Vec2::ZERO;
            self.active = false;
        }
        true
    }
}
