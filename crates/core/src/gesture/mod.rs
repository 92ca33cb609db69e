//! Classifies one pointer interaction into at most one swipe direction.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::GestureConfig;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Screen-space pointer sample with a monotonic timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub pointer_id: u32,
    pub position: Point,
    pub timestamp_ms: u64,
}

impl PointerEvent {
    pub fn new(pointer_id: u32, x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self {
            pointer_id,
            position: Point::new(x, y),
            timestamp_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    None,
    Horizontal,
    Vertical,
}

/// Direction of finger travel. Screen `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
    Down,
}

/// State of a single pointer-down to pointer-up interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureSample {
    pub pointer_id: u32,
    pub start: Point,
    pub start_ms: u64,
    pub latest: Point,
    pub axis: Axis,
    /// Set once the displacement has exceeded the tap threshold.
    pub moved: bool,
}

impl GestureSample {
    fn begin(event: &PointerEvent) -> Self {
        Self {
            pointer_id: event.pointer_id,
            start: event.position,
            start_ms: event.timestamp_ms,
            latest: event.position,
            axis: Axis::None,
            moved: false,
        }
    }

    pub fn displacement(&self) -> (f32, f32) {
        (self.latest.x - self.start.x, self.latest.y - self.start.y)
    }

    fn update(&mut self, position: Point, config: &GestureConfig) {
        self.latest = position;
        let (dx, dy) = self.displacement();

        if self.axis == Axis::None
            && (dx.abs() > config.axis_lock_px || dy.abs() > config.axis_lock_px)
        {
            self.axis = dominant_axis(dx, dy);
            trace!(axis = ?self.axis, dx, dy, "gesture axis locked");
        }
        if dx.hypot(dy) > config.min_move_px {
            self.moved = true;
        }
    }

    fn classify(&self, config: &GestureConfig) -> Option<SwipeDirection> {
        if !self.moved {
            return None;
        }
        let (dx, dy) = self.displacement();
        let axis = match self.axis {
            Axis::None => dominant_axis(dx, dy),
            locked => locked,
        };
        let threshold = config.swipe_distance_px;
        match axis {
            Axis::Horizontal if dx <= -threshold => Some(SwipeDirection::Left),
            Axis::Horizontal if dx >= threshold => Some(SwipeDirection::Right),
            Axis::Vertical if dy <= -threshold => Some(SwipeDirection::Up),
            Axis::Vertical if dy >= threshold => Some(SwipeDirection::Down),
            _ => None,
        }
    }
}

/// Ties resolve to horizontal so every gesture maps to exactly one axis.
fn dominant_axis(dx: f32, dy: f32) -> Axis {
    if dx.abs() >= dy.abs() {
        Axis::Horizontal
    } else {
        Axis::Vertical
    }
}

/// Tracks one interaction at a time (`Idle -> Tracking -> Idle`).
#[derive(Debug, Clone, Default)]
pub struct GestureRouter {
    config: GestureConfig,
    active: Option<GestureSample>,
}

impl GestureRouter {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            active: None,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&GestureSample> {
        self.active.as_ref()
    }

    /// Starts tracking. Returns `false` when another pointer is already
    /// being tracked, in which case the event is ignored.
    pub fn pointer_down(&mut self, event: PointerEvent) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.active = Some(GestureSample::begin(&event));
        true
    }

    pub fn pointer_move(&mut self, event: PointerEvent) {
        let pointer_id = event.pointer_id;
        if let Some(sample) = self.active.as_mut().filter(|s| s.pointer_id == pointer_id) {
            sample.update(event.position, &self.config);
        }
    }

    /// Ends the interaction and emits its direction, if any.
    pub fn pointer_up(&mut self, event: PointerEvent) -> Option<SwipeDirection> {
        if self.tracked_mut(event.pointer_id).is_none() {
            return None;
        }
        let mut sample = self.active.take()?;
        sample.update(event.position, &self.config);
        let direction = sample.classify(&self.config);
        trace!(
            ?direction,
            duration_ms = event.timestamp_ms.saturating_sub(sample.start_ms),
            "gesture finished"
        );
        direction
    }

    /// Drops the interaction without emitting anything.
    pub fn cancel(&mut self, pointer_id: u32) {
        if self.tracked_mut(pointer_id).is_some() {
            self.active = None;
        }
    }

    fn tracked_mut(&mut self, pointer_id: u32) -> Option<&mut GestureSample> {
        self.active
            .as_mut()
            .filter(|sample| sample.pointer_id == pointer_id)
    }
}
