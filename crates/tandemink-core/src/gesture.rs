//! Gesture arbitration: turns raw pointer events into drawing, dragging,
//! panning and pinch-zoom on the board.
//!
//! One session runs at a time. It is classified when a pointer goes down,
//! in this priority order:
//!
//! 1. two or more pointers pinch (first two by arrival),
//! 2. a middle or right mouse button pans,
//! 3. a press on a text or media object drags it,
//! 4. anything else draws, with a long-press timer that turns a still press
//!    into a request to create a text label.
//!
//! A change in pointer count abandons the running session and classifies
//! again. Pointers left down after a pinch are ignored until released.

use crate::channel::SyncChannel;
use crate::config::BoardConfig;
use crate::inertia::Inertia;
use crate::input::{ActivePointers, Instant, MouseButton, PointerEvent, PointerId, two_finger_geometry};
use crate::model::{Brush, ObjectRef, Stroke};
use crate::scene::Scene;
use crate::viewport::Viewport;
use kurbo::{Point, Vec2};
use std::time::Duration;

/// Mutable board state a gesture may touch.
pub struct GestureContext<'a> {
    pub viewport: &'a mut Viewport,
    pub scene: &'a mut Scene,
    pub channel: &'a mut SyncChannel,
    pub inertia: &'a mut Inertia,
    pub brush: &'a Brush,
}

/// Something the host UI has to act on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    /// A still press was held long enough; ask the user for text at `anchor` (world space).
    CreateRequested { anchor: Point },
}

/// Coarse session state, for hosts and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Idle,
    Drawing,
    PendingCreate,
    Dragging,
    Panning,
    Pinching,
    /// Leftover pointers after a pinch.
    Inert,
}

/// Thresholds the arbiter works with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSettings {
    pub pinch_inertia_threshold: f64,
    pub pan_inertia_threshold: f64,
    pub long_press: Duration,
    pub long_press_jitter: f64,
    pub hit_radius: f64,
    pub reference_frame_ms: f64,
    pub wheel_zoom_in: f64,
    pub wheel_zoom_out: f64,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self::from(&BoardConfig::default())
    }
}

impl From<&BoardConfig> for GestureSettings {
    fn from(config: &BoardConfig) -> Self {
        Self {
            pinch_inertia_threshold: config.pinch_inertia_threshold,
            pan_inertia_threshold: config.pan_inertia_threshold,
            long_press: config.long_press(),
            long_press_jitter: config.long_press_jitter,
            hit_radius: config.hit_radius,
            reference_frame_ms: config.reference_frame_ms,
            wheel_zoom_in: config.wheel_zoom_in,
            wheel_zoom_out: config.wheel_zoom_out,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LongPress {
    deadline: Instant,
    origin_screen: Point,
    anchor_world: Point,
}

#[derive(Debug, Clone, Copy)]
struct PinchTrack {
    pointers: (PointerId, PointerId),
    start_distance: f64,
    start_midpoint: Point,
    /// Viewport as it was when the pinch began.
    reference: Viewport,
    last_midpoint: Point,
    last_time: Instant,
    velocity: Vec2,
}

#[derive(Debug, Clone)]
enum GestureMode {
    Drawing {
        pointer: PointerId,
        last_world: Point,
        long_press: Option<LongPress>,
    },
    PendingCreate {
        pointer: PointerId,
    },
    Dragging {
        pointer: PointerId,
        target: ObjectRef,
    },
    Panning {
        pointer: PointerId,
        last_screen: Point,
        velocity: Vec2,
    },
    Pinching(PinchTrack),
    Inert,
}

/// Owns pointer tracking and the current gesture session.
#[derive(Debug, Clone, Default)]
pub struct GestureArbiter {
    pointers: ActivePointers,
    session: Option<GestureMode>,
    settings: GestureSettings,
}

impl GestureArbiter {
    pub fn new(settings: GestureSettings) -> Self {
        Self {
            pointers: ActivePointers::new(),
            session: None,
            settings,
        }
    }

    pub fn settings(&self) -> &GestureSettings {
        &self.settings
    }

    pub fn kind(&self) -> GestureKind {
        match &self.session {
            None => GestureKind::Idle,
            Some(GestureMode::Drawing { .. }) => GestureKind::Drawing,
            Some(GestureMode::PendingCreate { .. }) => GestureKind::PendingCreate,
            Some(GestureMode::Dragging { .. }) => GestureKind::Dragging,
            Some(GestureMode::Panning { .. }) => GestureKind::Panning,
            Some(GestureMode::Pinching(_)) => GestureKind::Pinching,
            Some(GestureMode::Inert) => GestureKind::Inert,
        }
    }

    /// The object being dragged, if any.
    pub fn drag_target(&self) -> Option<&ObjectRef> {
        match &self.session {
            Some(GestureMode::Dragging { target, .. }) => Some(target),
            _ => None,
        }
    }

    pub fn long_press_pending(&self) -> bool {
        matches!(
            self.session,
            Some(GestureMode::Drawing { long_press: Some(_), .. })
        )
    }

    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    /// Feed one pointer event.
    pub fn handle_pointer(&mut self, event: PointerEvent, ctx: &mut GestureContext<'_>) {
        match event {
            PointerEvent::Down { id, position, button, time } => {
                self.pointer_down(id, position, button, time, ctx);
            }
            PointerEvent::Move { id, position, time } => {
                if self.pointers.update(id, position) {
                    self.pointer_move(id, position, time, ctx);
                }
            }
            PointerEvent::Up { id, position, .. } => {
                self.pointers.update(id, position);
                self.pointer_up(id, true, ctx);
            }
            PointerEvent::Cancel { id, .. } => {
                self.pointer_up(id, false, ctx);
            }
            PointerEvent::Wheel { position, delta } => {
                ctx.viewport.wheel_zoom(
                    position,
                    delta.y,
                    self.settings.wheel_zoom_in,
                    self.settings.wheel_zoom_out,
                );
            }
        }
    }

    /// Advance timers. Fires the long press once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<GestureOutcome> {
        let mode = self.session.as_mut()?;
        let GestureMode::Drawing { pointer, long_press: Some(press), .. } = *mode else {
            return None;
        };
        if now < press.deadline {
            return None;
        }
        log::debug!("Long press fired at {:?}", press.anchor_world);
        *mode = GestureMode::PendingCreate { pointer };
        Some(GestureOutcome::CreateRequested {
            anchor: press.anchor_world,
        })
    }

    fn pointer_down(
        &mut self,
        id: PointerId,
        position: Point,
        button: MouseButton,
        time: Instant,
        ctx: &mut GestureContext<'_>,
    ) {
        ctx.inertia.cancel();
        self.pointers.press(id, position, button);

        if self.pointers.len() >= 2 {
            if matches!(self.session, Some(GestureMode::Pinching(_))) {
                // Extra fingers do not disturb a running pinch.
                return;
            }
            self.start_pinch(time, ctx.viewport);
            return;
        }

        let mode = if matches!(button, MouseButton::Middle | MouseButton::Right) {
            log::debug!("Gesture: panning");
            GestureMode::Panning {
                pointer: id,
                last_screen: position,
                velocity: Vec2::ZERO,
            }
        } else if let Some(target) =
            ctx.scene
                .object_at(ctx.viewport, position, self.settings.hit_radius)
        {
            log::debug!("Gesture: dragging {}", target.id());
            GestureMode::Dragging { pointer: id, target }
        } else {
            let world = ctx.viewport.screen_to_world(position);
            log::debug!("Gesture: drawing from {:?}", world);
            GestureMode::Drawing {
                pointer: id,
                last_world: world,
                long_press: Some(LongPress {
                    deadline: time + self.settings.long_press,
                    origin_screen: position,
                    anchor_world: world,
                }),
            }
        };
        self.session = Some(mode);
    }

    fn start_pinch(&mut self, time: Instant, viewport: &Viewport) {
        let Some((a, b)) = self.pointers.first_two() else {
            return;
        };
        let (distance, midpoint) = two_finger_geometry(a.position, b.position);
        log::debug!("Gesture: pinching, start distance {:.1}", distance);
        self.session = Some(GestureMode::Pinching(PinchTrack {
            pointers: (a.id, b.id),
            start_distance: distance,
            start_midpoint: midpoint,
            reference: *viewport,
            last_midpoint: midpoint,
            last_time: time,
            velocity: Vec2::ZERO,
        }));
    }

    fn pointer_move(
        &mut self,
        id: PointerId,
        position: Point,
        time: Instant,
        ctx: &mut GestureContext<'_>,
    ) {
        let Some(mode) = self.session.as_mut() else {
            return;
        };
        let mut abandon = false;
        match mode {
            GestureMode::Drawing {
                pointer,
                last_world,
                long_press,
            } if *pointer == id => {
                if long_press.is_some_and(|p| {
                    p.origin_screen.distance(position) > self.settings.long_press_jitter
                }) {
                    log::trace!("Long press canceled by movement");
                    *long_press = None;
                }
                let world = ctx.viewport.screen_to_world(position);
                let stroke = Stroke::new(*last_world, world, ctx.brush.size, ctx.brush.color);
                ctx.scene.push_stroke(stroke);
                ctx.channel.send_draw(&stroke);
                *last_world = world;
            }
            GestureMode::Dragging { pointer, target } if *pointer == id => {
                let world = ctx.viewport.screen_to_world(position);
                if ctx.scene.set_position(target, world) {
                    ctx.channel.send_move(ctx.scene, target);
                } else {
                    log::debug!("Drag target {} vanished", target.id());
                    abandon = true;
                }
            }
            GestureMode::Panning {
                pointer,
                last_screen,
                velocity,
            } if *pointer == id => {
                let delta = position - *last_screen;
                ctx.viewport.pan(delta);
                *velocity = delta;
                *last_screen = position;
            }
            GestureMode::Pinching(track) if id == track.pointers.0 || id == track.pointers.1 => {
                let (Some(a), Some(b)) = (
                    self.pointers.get(track.pointers.0),
                    self.pointers.get(track.pointers.1),
                ) else {
                    return;
                };
                let (distance, midpoint) = two_finger_geometry(a.position, b.position);
                let new_scale = if track.start_distance > f64::EPSILON {
                    track.reference.scale() * distance / track.start_distance
                } else {
                    track.reference.scale()
                };
                ctx.viewport
                    .anchor_to(&track.reference, track.start_midpoint, new_scale, midpoint);

                let frame_delta = midpoint - track.last_midpoint;
                ctx.viewport.pan(frame_delta);

                let elapsed_ms = (time.saturating_duration_since(track.last_time).as_secs_f64()
                    * 1000.0)
                    .max(1.0);
                track.velocity = frame_delta / (elapsed_ms / self.settings.reference_frame_ms);
                track.last_midpoint = midpoint;
                track.last_time = time;
            }
            _ => {}
        }
        if abandon {
            self.session = None;
        }
    }

    fn pointer_up(&mut self, id: PointerId, allow_inertia: bool, ctx: &mut GestureContext<'_>) {
        if self.pointers.release(id).is_none() {
            return;
        }
        let remaining = self.pointers.len();
        let Some(mode) = self.session.as_ref() else {
            return;
        };

        match mode {
            GestureMode::Pinching(track) => {
                if id != track.pointers.0 && id != track.pointers.1 {
                    return;
                }
                let v = track.velocity;
                if allow_inertia && exceeds(v, self.settings.pinch_inertia_threshold) {
                    log::debug!("Pinch released, gliding at {:?}", v);
                    ctx.inertia.launch(v);
                }
                self.session = (remaining > 0).then_some(GestureMode::Inert);
            }
            GestureMode::Panning {
                pointer, velocity, ..
            } if *pointer == id => {
                let v = *velocity;
                if allow_inertia && exceeds(v, self.settings.pan_inertia_threshold) {
                    log::debug!("Pan released, gliding at {:?}", v);
                    ctx.inertia.launch(v);
                }
                self.session = None;
            }
            GestureMode::Drawing { pointer, .. }
            | GestureMode::PendingCreate { pointer }
            | GestureMode::Dragging { pointer, .. }
                if *pointer == id =>
            {
                self.session = None;
            }
            GestureMode::Inert if remaining == 0 => {
                self.session = None;
            }
            _ => {}
        }
        if self.session.is_none() {
            log::trace!("Gesture ended");
        }
    }
}

/// Per-axis threshold check used for inertia handoff.
fn exceeds(velocity: Vec2, threshold: f64) -> bool {
    velocity.x.abs() > threshold || velocity.y.abs() > threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MediaKind, MediaObject, RgbColor, TextLabel};

    struct Harness {
        viewport: Viewport,
        scene: Scene,
        channel: SyncChannel,
        inertia: Inertia,
        brush: Brush,
        arbiter: GestureArbiter,
        t0: Instant,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                viewport: Viewport::new(),
                scene: Scene::new(),
                channel: SyncChannel::new(),
                inertia: Inertia::default(),
                brush: Brush::default(),
                arbiter: GestureArbiter::new(GestureSettings::default()),
                t0: Instant::now(),
            }
        }

        fn at(&self, ms: u64) -> Instant {
            self.t0 + Duration::from_millis(ms)
        }

        fn send(&mut self, event: PointerEvent) {
            let mut ctx = GestureContext {
                viewport: &mut self.viewport,
                scene: &mut self.scene,
                channel: &mut self.channel,
                inertia: &mut self.inertia,
                brush: &self.brush,
            };
            self.arbiter.handle_pointer(event, &mut ctx);
        }

        fn down(&mut self, id: PointerId, x: f64, y: f64, ms: u64) {
            self.down_with(id, x, y, MouseButton::Left, ms);
        }

        fn down_with(&mut self, id: PointerId, x: f64, y: f64, button: MouseButton, ms: u64) {
            let time = self.at(ms);
            self.send(PointerEvent::Down { id, position: Point::new(x, y), button, time });
        }

        fn moved(&mut self, id: PointerId, x: f64, y: f64, ms: u64) {
            let time = self.at(ms);
            self.send(PointerEvent::Move { id, position: Point::new(x, y), time });
        }

        fn up(&mut self, id: PointerId, x: f64, y: f64, ms: u64) {
            let time = self.at(ms);
            self.send(PointerEvent::Up { id, position: Point::new(x, y), time });
        }

        fn events(&mut self) -> Vec<String> {
            self.channel
                .take_outgoing()
                .into_iter()
                .map(|f| {
                    let v: serde_json::Value = serde_json::from_str(&f).unwrap();
                    v["event"].as_str().unwrap().to_string()
                })
                .collect()
        }
    }

    #[test]
    fn test_drawing_appends_and_emits() {
        let mut h = Harness::new();
        h.down(1, 10.0, 10.0, 0);
        assert_eq!(h.arbiter.kind(), GestureKind::Drawing);
        h.moved(1, 20.0, 10.0, 16);
        h.moved(1, 30.0, 10.0, 32);
        h.up(1, 30.0, 10.0, 48);

        assert_eq!(h.scene.strokes().len(), 2);
        assert_eq!(h.scene.strokes()[0].from, Point::new(10.0, 10.0));
        assert_eq!(h.scene.strokes()[1].to, Point::new(30.0, 10.0));
        assert_eq!(h.events(), vec!["draw", "draw"]);
        assert_eq!(h.arbiter.kind(), GestureKind::Idle);
    }

    #[test]
    fn test_drawing_uses_world_coordinates_and_brush() {
        let mut h = Harness::new();
        h.viewport.set(2.0, Vec2::new(100.0, 0.0));
        h.brush = Brush { size: 7.0, text_size: 24.0, color: RgbColor::new(0, 0, 255) };
        h.down(1, 100.0, 0.0, 0);
        h.moved(1, 120.0, 40.0, 16);

        let stroke = h.scene.strokes()[0];
        assert_eq!(stroke.from, Point::new(0.0, 0.0));
        assert_eq!(stroke.to, Point::new(10.0, 20.0));
        assert!((stroke.width - 7.0).abs() < f64::EPSILON);
        assert_eq!(stroke.color, RgbColor::new(0, 0, 255));
    }

    #[test]
    fn test_pinch_doubles_scale() {
        let mut h = Harness::new();
        h.down(1, 100.0, 300.0, 0);
        h.down(2, 200.0, 300.0, 0);
        assert_eq!(h.arbiter.kind(), GestureKind::Pinching);

        h.moved(1, 50.0, 300.0, 16);
        h.moved(2, 250.0, 300.0, 32);

        assert!((h.viewport.scale() - 2.0).abs() < 1e-9);
        // Start midpoint (150,300) sits at world (150,300). The final frame moved
        // the midpoint by +25 in x, which is added on top of the anchoring.
        let t = h.viewport.translate();
        assert!((t.x - (150.0 - 300.0 + 25.0)).abs() < 1e-9);
        assert!((t.y - (300.0 - 600.0)).abs() < 1e-9);
        assert!(h.scene.strokes().is_empty());
    }

    #[test]
    fn test_pinch_scale_is_clamped() {
        let mut h = Harness::new();
        h.down(1, 100.0, 100.0, 0);
        h.down(2, 110.0, 100.0, 0);
        h.moved(2, 1000.0, 100.0, 16);
        assert!((h.viewport.scale() - crate::viewport::MAX_SCALE).abs() < 1e-9);
    }

    #[test]
    fn test_pinch_release_hands_off_to_inertia() {
        let mut h = Harness::new();
        h.down(1, 0.0, 0.0, 0);
        h.down(2, 100.0, 0.0, 0);
        h.moved(1, 20.0, 0.0, 17);
        h.moved(2, 120.0, 0.0, 34);
        h.up(1, 20.0, 0.0, 40);

        assert!(h.inertia.is_active());
        assert!(h.inertia.velocity().x > 0.2);
        assert_eq!(h.arbiter.kind(), GestureKind::Inert);

        // The remaining finger does nothing until lifted.
        h.moved(2, 300.0, 0.0, 50);
        assert!(h.scene.strokes().is_empty());
        h.up(2, 300.0, 0.0, 60);
        assert_eq!(h.arbiter.kind(), GestureKind::Idle);
    }

    #[test]
    fn test_slow_pinch_does_not_glide() {
        let mut h = Harness::new();
        h.down(1, 0.0, 0.0, 0);
        h.down(2, 100.0, 0.0, 0);
        h.moved(2, 100.1, 0.0, 1000);
        h.up(2, 100.1, 0.0, 1010);
        assert!(!h.inertia.is_active());
    }

    #[test]
    fn test_second_finger_abandons_drawing() {
        let mut h = Harness::new();
        h.down(1, 0.0, 0.0, 0);
        h.moved(1, 10.0, 0.0, 16);
        h.down(2, 100.0, 0.0, 20);
        assert_eq!(h.arbiter.kind(), GestureKind::Pinching);
        assert!(!h.arbiter.long_press_pending());

        h.moved(1, 0.0, 0.0, 32);
        assert_eq!(h.scene.strokes().len(), 1);
    }

    #[test]
    fn test_drag_moves_object_and_emits_full_state() {
        let mut h = Harness::new();
        let label = TextLabel::new("hello", Point::new(100.0, 100.0), 24.0, RgbColor::black());
        let id = label.id.clone();
        h.scene.upsert_text(label);

        h.down(1, 105.0, 100.0, 0);
        assert_eq!(h.arbiter.kind(), GestureKind::Dragging);
        assert_eq!(h.arbiter.drag_target(), Some(&ObjectRef::Text(id.clone())));
        h.moved(1, 200.0, 150.0, 16);

        assert_eq!(h.scene.text(&id).unwrap().position, Point::new(200.0, 150.0));
        let frames = h.channel.take_outgoing();
        let v: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(v["event"], "text_move");
        assert_eq!(v["data"]["text"], "hello");
        assert!(h.scene.strokes().is_empty());
    }

    #[test]
    fn test_topmost_media_wins_drag() {
        let mut h = Harness::new();
        let under = MediaObject::new(MediaKind::Image, "data:,a", Point::new(50.0, 50.0), 1.0);
        let over = MediaObject::new(MediaKind::Image, "data:,b", Point::new(55.0, 50.0), 1.0);
        let over_id = over.id.clone();
        h.scene.upsert_media(under);
        h.scene.upsert_media(over);

        h.down(1, 52.0, 50.0, 0);
        assert_eq!(h.arbiter.drag_target(), Some(&ObjectRef::Media(over_id)));
        h.moved(1, 60.0, 60.0, 16);
        assert_eq!(h.events(), vec!["media_move"]);
    }

    #[test]
    fn test_long_press_fires_after_hold() {
        let mut h = Harness::new();
        h.viewport.set(2.0, Vec2::ZERO);
        h.down(1, 40.0, 60.0, 0);
        assert!(h.arbiter.long_press_pending());
        assert_eq!(h.arbiter.poll(h.at(499)), None);

        let outcome = h.arbiter.poll(h.at(500));
        assert_eq!(outcome, Some(GestureOutcome::CreateRequested { anchor: Point::new(20.0, 30.0) }));
        assert_eq!(h.arbiter.kind(), GestureKind::PendingCreate);
        assert_eq!(h.arbiter.poll(h.at(600)), None);

        // Further movement no longer draws.
        h.moved(1, 80.0, 60.0, 610);
        assert!(h.scene.strokes().is_empty());
        h.up(1, 80.0, 60.0, 620);
        assert_eq!(h.arbiter.kind(), GestureKind::Idle);
    }

    #[test]
    fn test_long_press_tolerates_jitter_but_not_movement() {
        let mut h = Harness::new();
        h.down(1, 0.0, 0.0, 0);
        h.moved(1, 3.0, 3.0, 100);
        assert!(h.arbiter.long_press_pending());
        h.moved(1, 30.0, 0.0, 200);
        assert!(!h.arbiter.long_press_pending());
        assert_eq!(h.arbiter.poll(h.at(800)), None);
        assert_eq!(h.scene.strokes().len(), 2);
    }

    #[test]
    fn test_long_press_keeps_strokes_drawn_while_pending() {
        let mut h = Harness::new();
        h.down(1, 10.0, 10.0, 0);
        h.moved(1, 12.0, 11.0, 100);
        h.moved(1, 13.0, 13.0, 200);
        assert!(h.arbiter.long_press_pending());
        assert_eq!(h.scene.strokes().len(), 2);

        let outcome = h.arbiter.poll(h.at(520));
        assert_eq!(outcome, Some(GestureOutcome::CreateRequested { anchor: Point::new(10.0, 10.0) }));
        assert_eq!(h.scene.strokes().len(), 2);
        assert_eq!(h.events(), vec!["draw", "draw"]);

        // Drawing is over for this press.
        h.moved(1, 40.0, 40.0, 600);
        assert_eq!(h.scene.strokes().len(), 2);
        assert!(h.events().is_empty());
        h.up(1, 40.0, 40.0, 650);
        assert_eq!(h.arbiter.kind(), GestureKind::Idle);
    }

    #[test]
    fn test_release_cancels_long_press() {
        let mut h = Harness::new();
        h.down(1, 0.0, 0.0, 0);
        h.up(1, 0.0, 0.0, 100);
        assert_eq!(h.arbiter.poll(h.at(1000)), None);
    }

    #[test]
    fn test_mouse_pan_with_inertia() {
        let mut h = Harness::new();
        h.down_with(1, 0.0, 0.0, MouseButton::Middle, 0);
        assert_eq!(h.arbiter.kind(), GestureKind::Panning);
        h.moved(1, 10.0, 5.0, 16);
        h.moved(1, 25.0, 5.0, 32);
        assert_eq!(h.viewport.translate(), Vec2::new(25.0, 5.0));

        h.up(1, 25.0, 5.0, 48);
        assert!(h.inertia.is_active());
        assert_eq!(h.inertia.velocity(), Vec2::new(15.0, 0.0));
        assert!(h.scene.strokes().is_empty());
    }

    #[test]
    fn test_slow_pan_does_not_glide() {
        let mut h = Harness::new();
        h.down_with(1, 0.0, 0.0, MouseButton::Right, 0);
        h.moved(1, 0.5, 0.5, 16);
        h.up(1, 0.5, 0.5, 32);
        assert!(!h.inertia.is_active());
    }

    #[test]
    fn test_new_gesture_cancels_inertia() {
        let mut h = Harness::new();
        h.inertia.launch(Vec2::new(30.0, 0.0));
        h.down(1, 0.0, 0.0, 0);
        assert!(!h.inertia.is_active());
    }

    #[test]
    fn test_cancel_ends_pinch_without_inertia() {
        let mut h = Harness::new();
        h.down(1, 0.0, 0.0, 0);
        h.down(2, 100.0, 0.0, 0);
        h.moved(1, 40.0, 0.0, 17);
        let time = h.at(20);
        h.send(PointerEvent::Cancel { id: 1, time });
        assert!(!h.inertia.is_active());
        let time = h.at(21);
        h.send(PointerEvent::Cancel { id: 2, time });
        assert_eq!(h.arbiter.kind(), GestureKind::Idle);
        assert_eq!(h.arbiter.pointer_count(), 0);
    }

    #[test]
    fn test_wheel_zoom_anchored() {
        let mut h = Harness::new();
        h.send(PointerEvent::Wheel { position: Point::new(400.0, 300.0), delta: Vec2::new(0.0, -1.0) });
        assert!((h.viewport.scale() - 1.12).abs() < 1e-9);
        let world = h.viewport.screen_to_world(Point::new(400.0, 300.0));
        assert!((world - Point::new(400.0, 300.0)).hypot() < 1e-9);
    }

    #[test]
    fn test_hover_move_is_ignored() {
        let mut h = Harness::new();
        h.moved(9, 10.0, 10.0, 0);
        assert_eq!(h.arbiter.kind(), GestureKind::Idle);
        assert!(h.scene.strokes().is_empty());
    }
}
