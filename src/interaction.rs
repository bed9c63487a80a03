// ============================================================================
// POINTER GESTURES
// ============================================================================

use glam::DVec2;

use crate::pose::PoseStore;

/// Backend-neutral pointer input, already in logical window pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    LeftPressed,
    LeftReleased,
    Moved(DVec2),
    /// Rotate modifier (shift) pressed or released.
    Modifier(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Dragging,
    Rotating,
}

/// Heading that points the marker at `target` from `origin`: 0 is up,
/// clockwise positive, in window pixel space.
pub fn heading_towards(target: DVec2, origin: DVec2) -> f64 {
    let d = target - origin;
    90.0 - (-d.y).atan2(d.x).to_degrees()
}

/// Turns drag and shift-drag gestures into pose writes.
///
/// The gesture is chosen at button-down from the modifier state. Dragging
/// ignores motion while the modifier is held; rotating does not look at
/// the modifier once started.
#[derive(Debug, Default)]
pub struct InteractionController {
    gesture: Gesture,
    modifier_held: bool,
    cursor: DVec2,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn cursor(&self) -> DVec2 {
        self.cursor
    }

    pub fn handle(&mut self, event: PointerEvent, store: &PoseStore) {
        match event {
            PointerEvent::Modifier(held) => self.modifier_held = held,
            PointerEvent::LeftPressed => {
                self.gesture = if self.modifier_held {
                    Gesture::Rotating
                } else {
                    Gesture::Dragging
                };
                log::trace!("gesture {:?} started", self.gesture);
            }
            PointerEvent::LeftReleased => self.gesture = Gesture::Idle,
            PointerEvent::Moved(cursor) => {
                self.cursor = cursor;
                match self.gesture {
                    Gesture::Dragging if !self.modifier_held => {
                        store.write(|pose| pose.with_position(cursor));
                    }
                    Gesture::Rotating => {
                        store.write(|pose| {
                            pose.with_heading(heading_towards(cursor, pose.position))
                        });
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{normalize_heading, Pose};
    use approx::assert_abs_diff_eq;

    fn store() -> PoseStore {
        PoseStore::new(Pose::new(DVec2::new(100.0, 100.0), 0.0))
    }

    #[test]
    fn heading_compass_points() {
        let o = DVec2::new(100.0, 100.0);
        assert_abs_diff_eq!(heading_towards(DVec2::new(100.0, 50.0), o), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(heading_towards(DVec2::new(150.0, 100.0), o), 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(heading_towards(DVec2::new(100.0, 150.0), o), 180.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            normalize_heading(heading_towards(DVec2::new(50.0, 100.0), o)),
            270.0,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(heading_towards(DVec2::new(50.0, 150.0), o), 225.0, epsilon = 1e-9);
        // up-left falls below 0 and is only wrapped when reported
        assert!(heading_towards(DVec2::new(50.0, 50.0), o) < 0.0);
    }

    #[test]
    fn button_down_picks_gesture_from_modifier() {
        let store = store();
        let mut ctl = InteractionController::new();
        ctl.handle(PointerEvent::LeftPressed, &store);
        assert_eq!(ctl.gesture(), Gesture::Dragging);
        ctl.handle(PointerEvent::LeftReleased, &store);
        assert_eq!(ctl.gesture(), Gesture::Idle);

        ctl.handle(PointerEvent::Modifier(true), &store);
        ctl.handle(PointerEvent::LeftPressed, &store);
        assert_eq!(ctl.gesture(), Gesture::Rotating);
        ctl.handle(PointerEvent::LeftReleased, &store);
        assert_eq!(ctl.gesture(), Gesture::Idle);
    }

    #[test]
    fn idle_motion_changes_nothing() {
        let store = store();
        let before = store.read();
        let mut ctl = InteractionController::new();
        ctl.handle(PointerEvent::Moved(DVec2::new(5.0, 5.0)), &store);
        assert_eq!(store.read(), before);
        assert_eq!(ctl.cursor(), DVec2::new(5.0, 5.0));
    }

    #[test]
    fn drag_snaps_position_without_touching_heading() {
        let store = PoseStore::new(Pose::new(DVec2::new(100.0, 100.0), 37.0));
        let mut ctl = InteractionController::new();
        ctl.handle(PointerEvent::LeftPressed, &store);
        ctl.handle(PointerEvent::Moved(DVec2::new(240.0, 310.0)), &store);
        assert_eq!(store.read(), Pose::new(DVec2::new(240.0, 310.0), 37.0));
    }

    #[test]
    fn rotate_keeps_position_fixed() {
        let store = store();
        let mut ctl = InteractionController::new();
        ctl.handle(PointerEvent::Modifier(true), &store);
        ctl.handle(PointerEvent::LeftPressed, &store);
        ctl.handle(PointerEvent::Moved(DVec2::new(200.0, 100.0)), &store);
        let pose = store.read();
        assert_eq!(pose.position, DVec2::new(100.0, 100.0));
        assert_abs_diff_eq!(pose.heading, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn modifier_mid_drag_suppresses_motion() {
        let store = store();
        let mut ctl = InteractionController::new();
        ctl.handle(PointerEvent::LeftPressed, &store);
        ctl.handle(PointerEvent::Modifier(true), &store);
        ctl.handle(PointerEvent::Moved(DVec2::new(300.0, 300.0)), &store);
        assert_eq!(store.read().position, DVec2::new(100.0, 100.0));
        assert_eq!(ctl.gesture(), Gesture::Dragging);

        ctl.handle(PointerEvent::Modifier(false), &store);
        ctl.handle(PointerEvent::Moved(DVec2::new(300.0, 300.0)), &store);
        assert_eq!(store.read().position, DVec2::new(300.0, 300.0));
    }

    #[test]
    fn releasing_modifier_mid_rotate_keeps_rotating() {
        let store = store();
        let mut ctl = InteractionController::new();
        ctl.handle(PointerEvent::Modifier(true), &store);
        ctl.handle(PointerEvent::LeftPressed, &store);
        ctl.handle(PointerEvent::Modifier(false), &store);
        ctl.handle(PointerEvent::Moved(DVec2::new(100.0, 200.0)), &store);
        let pose = store.read();
        assert_eq!(pose.position, DVec2::new(100.0, 100.0));
        assert_abs_diff_eq!(pose.heading, 180.0, epsilon = 1e-9);
    }
}
