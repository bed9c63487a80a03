// ============================================================================
// POSE AND SHARED POSE STORE
// ============================================================================

use glam::DVec2;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::transform::FieldTransform;

/// Marker pose: position in window pixels, heading in degrees (0 = up,
/// clockwise positive). Heading is stored as written, unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: DVec2,
    pub heading: f64,
}

impl Pose {
    pub const fn new(position: DVec2, heading: f64) -> Self {
        Self { position, heading }
    }

    pub fn with_position(self, position: DVec2) -> Self {
        Self { position, ..self }
    }

    pub fn with_x(self, x: f64) -> Self {
        Self::new(DVec2::new(x, self.position.y), self.heading)
    }

    pub fn with_y(self, y: f64) -> Self {
        Self::new(DVec2::new(self.position.x, y), self.heading)
    }

    pub fn with_heading(self, heading: f64) -> Self {
        Self { heading, ..self }
    }

    /// Field-space view of this pose, as printed by the report key.
    pub fn report(&self, transform: &FieldTransform) -> PoseReport {
        let inches = transform.pixels_to_inches(self.position);
        PoseReport {
            x: inches.x,
            y: inches.y,
            theta: normalize_heading(self.heading),
        }
    }
}

/// Wraps a heading into [0, 360) with at most one turn in either
/// direction. Headings produced by dragging stay within [-360, 720).
pub fn normalize_heading(heading: f64) -> f64 {
    let mut heading = heading;
    if heading < 0.0 {
        heading += 360.0;
    }
    if heading >= 360.0 {
        heading -= 360.0;
    }
    heading
}

/// Pose in inches with a normalized heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseReport {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl fmt::Display for PoseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {:.2} {:.2}", self.x, self.y, self.theta)
    }
}

/// The one live pose, shared between the render loop and the command reader.
///
/// Every write replaces the whole `Pose` value inside a single critical
/// section, so a reader never sees x from one write and y from another.
#[derive(Debug)]
pub struct PoseStore {
    pose: Mutex<Pose>,
}

impl PoseStore {
    pub fn new(initial: Pose) -> Self {
        Self {
            pose: Mutex::new(initial),
        }
    }

    /// Store centred in the window with heading 0.
    pub fn centered(transform: &FieldTransform) -> Self {
        Self::new(Pose::new(transform.center(), 0.0))
    }

    /// Snapshot of the current pose.
    pub fn read(&self) -> Pose {
        *self.pose.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the pose with `update(current)` and returns the new value.
    pub fn write<F>(&self, update: F) -> Pose
    where
        F: FnOnce(Pose) -> Pose,
    {
        // A panic inside `update` happens before assignment, so a poisoned
        // lock still guards a whole pose.
        let mut guard = self.pose.lock().unwrap_or_else(PoisonError::into_inner);
        let next = update(*guard);
        *guard = next;
        next
    }
}
