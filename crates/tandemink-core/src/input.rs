//! Input events for mouse and touch, and tracking of active pointers.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

// Use web_time for WASM compatibility
#[cfg(not(target_arch = "wasm32"))]
pub use std::time::Instant;
#[cfg(target_arch = "wasm32")]
pub use web_time::Instant;

/// Identifier of one physical contact (touch id, or a fixed id for the mouse).
pub type PointerId = u64;

/// Mouse button identifiers. Touch contacts report `Left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Pointer event type for unified mouse/touch handling.
///
/// Positions are in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down {
        id: PointerId,
        position: Point,
        button: MouseButton,
        time: Instant,
    },
    Move {
        id: PointerId,
        position: Point,
        time: Instant,
    },
    Up {
        id: PointerId,
        position: Point,
        time: Instant,
    },
    /// The platform aborted the contact (touchcancel).
    Cancel { id: PointerId, time: Instant },
    Wheel { position: Point, delta: Vec2 },
}

impl PointerEvent {
    /// Pointer this event belongs to, if any.
    pub fn pointer_id(&self) -> Option<PointerId> {
        match *self {
            PointerEvent::Down { id, .. }
            | PointerEvent::Move { id, .. }
            | PointerEvent::Up { id, .. }
            | PointerEvent::Cancel { id, .. } => Some(id),
            PointerEvent::Wheel { .. } => None,
        }
    }
}

/// One pressed contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivePointer {
    pub id: PointerId,
    pub position: Point,
    pub button: MouseButton,
}

/// Pressed contacts in arrival order.
#[derive(Debug, Clone, Default)]
pub struct ActivePointers {
    pointers: Vec<ActivePointer>,
}

impl ActivePointers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press. A repeated press of the same id only updates it.
    pub fn press(&mut self, id: PointerId, position: Point, button: MouseButton) {
        match self.pointers.iter_mut().find(|p| p.id == id) {
            Some(existing) => {
                existing.position = position;
                existing.button = button;
            }
            None => self.pointers.push(ActivePointer { id, position, button }),
        }
    }

    /// Update a pressed contact's position. Returns false when it is not pressed.
    pub fn update(&mut self, id: PointerId, position: Point) -> bool {
        match self.pointers.iter_mut().find(|p| p.id == id) {
            Some(p) => {
                p.position = position;
                true
            }
            None => false,
        }
    }

    pub fn release(&mut self, id: PointerId) -> Option<ActivePointer> {
        let index = self.pointers.iter().position(|p| p.id == id)?;
        Some(self.pointers.remove(index))
    }

    pub fn get(&self, id: PointerId) -> Option<&ActivePointer> {
        self.pointers.iter().find(|p| p.id == id)
    }

    /// The two earliest contacts, used for pinch geometry.
    pub fn first_two(&self) -> Option<(&ActivePointer, &ActivePointer)> {
        match self.pointers.as_slice() {
            [a, b, ..] => Some((a, b)),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }
}

/// Distance and midpoint between two screen points.
pub fn two_finger_geometry(a: Point, b: Point) -> (f64, Point) {
    (a.distance(b), a.midpoint(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_and_release_order() {
        let mut pointers = ActivePointers::new();
        pointers.press(7, Point::new(1.0, 1.0), MouseButton::Left);
        pointers.press(3, Point::new(2.0, 2.0), MouseButton::Left);
        pointers.press(9, Point::new(3.0, 3.0), MouseButton::Left);

        let (a, b) = pointers.first_two().unwrap();
        assert_eq!((a.id, b.id), (7, 3));

        pointers.release(7);
        let (a, b) = pointers.first_two().unwrap();
        assert_eq!((a.id, b.id), (3, 9));
        assert_eq!(pointers.len(), 2);
    }

    #[test]
    fn test_repeated_press_does_not_duplicate() {
        let mut pointers = ActivePointers::new();
        pointers.press(1, Point::ZERO, MouseButton::Left);
        pointers.press(1, Point::new(5.0, 5.0), MouseButton::Middle);
        assert_eq!(pointers.len(), 1);
        assert_eq!(pointers.get(1).unwrap().button, MouseButton::Middle);
    }

    #[test]
    fn test_update_unknown_pointer() {
        let mut pointers = ActivePointers::new();
        assert!(!pointers.update(4, Point::ZERO));
        assert!(pointers.release(4).is_none());
    }

    #[test]
    fn test_two_finger_geometry() {
        let (d, m) = two_finger_geometry(Point::new(0.0, 0.0), Point::new(30.0, 40.0));
        assert!((d - 50.0).abs() < f64::EPSILON);
        assert_eq!(m, Point::new(15.0, 20.0));
    }

    #[test]
    fn test_wheel_has_no_pointer() {
        let wheel = PointerEvent::Wheel { position: Point::ZERO, delta: Vec2::new(0.0, 1.0) };
        assert_eq!(wheel.pointer_id(), None);
        let cancel = PointerEvent::Cancel { id: 2, time: Instant::now() };
        assert_eq!(cancel.pointer_id(), Some(2));
    }
}
