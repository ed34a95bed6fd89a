//! Pointer-driven rotation controls
//!
//! Raw pointer deltas only arrive while the pointer is captured. Each control
//! maps them onto one rotation target and clamps the result; out-of-range
//! requests are clamped, never rejected or wrapped.
//!
//! - `LookControl`: yaw/pitch pair (third-person orbit pivot, first-person body)
//! - `ClampedRotation`: one joint axis with optional coupled corrections (arms, head)

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::rig::{Joint, Pose};

/// Radians per pointer pixel for look controls
pub const LOOK_INCREMENT: f32 = 0.002;

/// Euler axis of a joint rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    #[inline]
    pub fn get(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    #[inline]
    pub fn get_mut(self, v: &mut Vec3) -> &mut f32 {
        match self {
            Axis::X => &mut v.x,
            Axis::Y => &mut v.y,
            Axis::Z => &mut v.z,
        }
    }
}

/// Closed angle interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleLimits {
    pub min: f32,
    pub max: f32,
}

impl AngleLimits {
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Pitch interval from polar bounds (0 = straight up, PI = straight down)
    pub fn from_polar(min_polar: f32, max_polar: f32) -> Self {
        Self::new(FRAC_PI_2 - max_polar, FRAC_PI_2 - min_polar)
    }

    #[inline]
    pub fn clamp(&self, angle: f32) -> f32 {
        if angle.is_nan() {
            return self.min;
        }
        angle.clamp(self.min, self.max)
    }

    /// Strictly inside; the bounds themselves do not count
    #[inline]
    pub fn strictly_contains(&self, angle: f32) -> bool {
        angle > self.min && angle < self.max
    }

    pub fn center(&self) -> f32 {
        (self.min + self.max) * 0.5
    }

    pub fn half_span(&self) -> f32 {
        (self.max - self.min) * 0.5
    }
}

/// Trig weighting for a coupled correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weight {
    One,
    Sin,
    Cos,
}

/// Nudges a secondary axis while the primary axis moves inside its bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub axis: Axis,
    pub weight: Weight,
}

/// Yaw/pitch look control (Euler YXZ)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookControl {
    pub enabled: bool,
    pub enable_horizontal: bool,
    pub enable_vertical: bool,
    pub inverted_horizontal: bool,
    pub inverted_vertical: bool,
    pub increment: f32,
    pub pitch_limits: AngleLimits,
}

/// Orientation written by a look control
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub yaw: f32,
    pub pitch: f32,
}

impl LookControl {
    /// Free look with pitch limited to straight up/down
    pub fn new() -> Self {
        Self {
            enabled: true,
            enable_horizontal: true,
            enable_vertical: true,
            inverted_horizontal: false,
            inverted_vertical: false,
            increment: LOOK_INCREMENT,
            pitch_limits: AngleLimits::from_polar(0.0, PI),
        }
    }

    /// Apply one pointer delta. Returns true if the control consumed it.
    pub fn apply(&self, target: &mut Orientation, delta: Vec2) -> bool {
        if !self.enabled {
            return false;
        }
        if self.enable_horizontal {
            let step = delta.x * self.increment;
            if self.inverted_horizontal {
                target.yaw += step;
            } else {
                target.yaw -= step;
            }
        }
        if self.enable_vertical {
            let step = delta.y * self.increment;
            if self.inverted_vertical {
                target.pitch -= step;
            } else {
                target.pitch += step;
            }
        }
        target.pitch = self.pitch_limits.clamp(target.pitch);
        true
    }
}

impl Default for LookControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded rotation of one joint axis driven by vertical pointer motion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClampedRotation {
    pub joint: Joint,
    pub axis: Axis,
    pub limits: AngleLimits,
    pub enabled: bool,
    /// Default: pointer down lowers the angle
    pub inverted: bool,
    pub increment: f32,
    pub correction: f32,
    pub corrections: Vec<Correction>,
}

impl ClampedRotation {
    pub fn new(joint: Joint, axis: Axis, limits: AngleLimits) -> Self {
        Self {
            joint,
            axis,
            limits,
            enabled: true,
            inverted: false,
            increment: LOOK_INCREMENT,
            correction: 0.001,
            corrections: Vec::new(),
        }
    }

    /// Apply one vertical pointer delta to `pose`. Returns true if consumed.
    pub fn apply(&self, pose: &mut Pose, movement_y: f32) -> bool {
        if !self.enabled {
            return false;
        }
        let rotation = pose.rotation_mut(self.joint);

        let step = movement_y * self.increment;
        let angle = self.axis.get_mut(rotation);
        if self.inverted {
            *angle += step;
        } else {
            *angle -= step;
        }
        *angle = self.limits.clamp(*angle);

        let primary = *angle;
        if self.limits.strictly_contains(primary) {
            let phase = primary + self.limits.min;
            for c in &self.corrections {
                let weight = match c.weight {
                    Weight::One => 1.0,
                    Weight::Sin => phase.sin(),
                    Weight::Cos => phase.cos(),
                };
                *c.axis.get_mut(rotation) += movement_y * self.correction * weight;
            }
            // A self-correction may not escape the primary bounds
            let angle = self.axis.get_mut(rotation);
            *angle = self.limits.clamp(*angle);
        }
        true
    }
}

/// Pointer capture state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LockState {
    #[default]
    Unlocked,
    Locked,
}

/// Identifies a control in change notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlId {
    Orbit,
    Body,
    ArmL,
    ArmR,
    Head,
}

/// Notifications emitted by the control set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlEvent {
    Changed(ControlId),
    Locked,
    Unlocked,
}

/// Targets mutated by the control set in one pointer update
pub struct ControlTargets<'a> {
    pub orbit: &'a mut Orientation,
    pub body_yaw: &'a mut f32,
    pub pose: &'a mut Pose,
}

/// Every pointer-driven control, sharing one pointer capture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Controls {
    lock: LockState,
    /// Third-person camera pivot
    pub orbit: LookControl,
    /// First-person body yaw
    pub body: LookControl,
    pub arm_left: ClampedRotation,
    pub arm_right: ClampedRotation,
    pub head: ClampedRotation,
}

impl Controls {
    /// Control set for the archer; `sensitivity` scales every increment
    pub fn archer(sensitivity: f32, invert_look: bool) -> Self {
        let mut orbit = LookControl::new();
        orbit.increment *= sensitivity;
        orbit.inverted_vertical = invert_look;
        orbit.pitch_limits = AngleLimits::new(-0.25 * PI, 0.15 * PI);

        let mut body = LookControl::new();
        body.increment *= sensitivity;
        body.enable_vertical = false;
        body.enabled = false;

        let mut arm_left =
            ClampedRotation::new(Joint::ArmL, Axis::Z, AngleLimits::new(-0.75 * PI, -0.25 * PI));
        arm_left.increment *= sensitivity;
        arm_left.inverted = invert_look;
        arm_left.enabled = false;

        let mut arm_right =
            ClampedRotation::new(Joint::ArmR, Axis::Z, AngleLimits::new(0.25 * PI, 0.75 * PI));
        arm_right.increment *= sensitivity;
        arm_right.inverted = !invert_look;
        arm_right.correction = 0.002;
        arm_right.corrections.push(Correction {
            axis: Axis::X,
            weight: Weight::Sin,
        });
        arm_right.enabled = false;

        // Head pitch follows the pointer, at half the arm rate
        let mut head =
            ClampedRotation::new(Joint::Head, Axis::X, AngleLimits::new(-0.1 * PI, 0.25 * PI));
        head.increment = 0.001 * sensitivity;
        head.inverted = !invert_look;
        head.enabled = false;

        Self {
            lock: LockState::Unlocked,
            orbit,
            body,
            arm_left,
            arm_right,
            head,
        }
    }

    pub fn lock_state(&self) -> LockState {
        self.lock
    }

    pub fn is_locked(&self) -> bool {
        self.lock == LockState::Locked
    }

    /// Record a capture change. Emits an event only on an actual transition.
    pub fn set_locked(&mut self, locked: bool) -> Option<ControlEvent> {
        let next = if locked {
            LockState::Locked
        } else {
            LockState::Unlocked
        };
        if next == self.lock {
            return None;
        }
        self.lock = next;
        Some(if locked {
            ControlEvent::Locked
        } else {
            ControlEvent::Unlocked
        })
    }

    /// Arms and head follow the pointer; the orbit pivot holds still
    pub fn enable_aim(&mut self) {
        self.orbit.enabled = false;
        self.arm_left.enabled = true;
        self.arm_right.enabled = true;
        self.head.enabled = true;
    }

    /// Back to orbiting; body turning stops with the aim
    pub fn disable_aim(&mut self) {
        self.orbit.enabled = true;
        self.body.enabled = false;
        self.arm_left.enabled = false;
        self.arm_right.enabled = false;
        self.head.enabled = false;
    }

    pub fn set_body_enabled(&mut self, enabled: bool) {
        self.body.enabled = enabled;
    }

    pub fn aim_enabled(&self) -> bool {
        self.arm_left.enabled
    }

    /// Feed one pointer delta to every enabled control. Ignored while unlocked.
    pub fn apply_pointer(
        &self,
        delta: Vec2,
        targets: ControlTargets<'_>,
        events: &mut Vec<ControlEvent>,
    ) {
        if !self.is_locked() || delta == Vec2::ZERO || !delta.is_finite() {
            return;
        }

        if self.orbit.apply(targets.orbit, delta) {
            events.push(ControlEvent::Changed(ControlId::Orbit));
        }

        let mut body = Orientation {
            yaw: *targets.body_yaw,
            pitch: 0.0,
        };
        if self.body.apply(&mut body, delta) {
            *targets.body_yaw = body.yaw;
            events.push(ControlEvent::Changed(ControlId::Body));
        }

        for (id, control) in [
            (ControlId::ArmL, &self.arm_left),
            (ControlId::ArmR, &self.arm_right),
            (ControlId::Head, &self.head),
        ] {
            if control.apply(targets.pose, delta.y) {
                events.push(ControlEvent::Changed(id));
            }
        }
    }

    /// Bow elevation implied by the left arm, relative to the middle of its range
    pub fn aim_elevation(&self, pose: &Pose) -> f32 {
        let limits = self.arm_left.limits;
        let angle = limits.clamp(self.arm_left.axis.get(pose.get(Joint::ArmL)));
        let offset = angle - limits.center();
        offset.clamp(-limits.half_span(), limits.half_span())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arm(limits: AngleLimits) -> ClampedRotation {
        ClampedRotation::new(Joint::ArmL, Axis::Z, limits)
    }

    #[test]
    fn test_clamped_rotation_direction_and_inversion() {
        let mut pose = Pose::default();
        let mut control = arm(AngleLimits::new(-1.0, 1.0));
        control.increment = 0.01;

        // Pointer up (negative y) raises the angle
        control.apply(&mut pose, -10.0);
        assert!((pose.get(Joint::ArmL).z - 0.1).abs() < 1e-6);

        control.inverted = true;
        control.apply(&mut pose, -10.0);
        assert!(pose.get(Joint::ArmL).z.abs() < 1e-6);
    }

    #[test]
    fn test_clamped_rotation_clamps_not_wraps() {
        let mut pose = Pose::default();
        let control = arm(AngleLimits::new(-0.5, 0.5));
        control.apply(&mut pose, -100_000.0);
        assert_eq!(pose.get(Joint::ArmL).z, 0.5);
        control.apply(&mut pose, 100_000.0);
        assert_eq!(pose.get(Joint::ArmL).z, -0.5);
    }

    #[test]
    fn test_disabled_control_is_inert() {
        let mut pose = Pose::default();
        let mut control = arm(AngleLimits::new(-1.0, 1.0));
        control.enabled = false;
        assert!(!control.apply(&mut pose, 50.0));
        assert_eq!(pose.get(Joint::ArmL), Vec3::ZERO);
    }

    #[test]
    fn test_correction_only_strictly_inside_bounds() {
        let mut control = arm(AngleLimits::new(0.25 * PI, 0.75 * PI));
        control.inverted = true;
        control.correction = 0.002;
        control.corrections.push(Correction {
            axis: Axis::X,
            weight: Weight::Sin,
        });

        // Inside: X gets nudged
        let mut pose = Pose::default();
        pose.set(Joint::ArmL, Vec3::new(0.0, 0.0, 0.5 * PI));
        control.apply(&mut pose, 10.0);
        assert!(pose.get(Joint::ArmL).x.abs() > 0.0);

        // Pinned at max: no correction
        let mut pose = Pose::default();
        pose.set(Joint::ArmL, Vec3::new(0.0, 0.0, 0.75 * PI));
        control.apply(&mut pose, 10.0);
        assert_eq!(pose.get(Joint::ArmL).z, 0.75 * PI);
        assert_eq!(pose.get(Joint::ArmL).x, 0.0);
    }

    #[test]
    fn test_self_correction_stays_in_bounds() {
        let mut control = arm(AngleLimits::new(-1.0, 1.0));
        control.inverted = true;
        control.increment = 0.001;
        control.correction = 1.0;
        control.corrections.push(Correction {
            axis: Axis::Z,
            weight: Weight::One,
        });
        let mut pose = Pose::default();
        pose.set(Joint::ArmL, Vec3::new(0.0, 0.0, 0.99));
        control.apply(&mut pose, 5.0);
        assert!(pose.get(Joint::ArmL).z <= 1.0);
    }

    #[test]
    fn test_look_control_pitch_from_polar() {
        let mut look = LookControl::new();
        look.pitch_limits = AngleLimits::from_polar(FRAC_PI_2 - 0.2, FRAC_PI_2 + 0.3);
        let mut o = Orientation::default();
        look.apply(&mut o, Vec2::new(0.0, 1000.0));
        assert!((o.pitch - 0.2).abs() < 1e-6);
        look.apply(&mut o, Vec2::new(0.0, -10_000.0));
        assert!((o.pitch + 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_look_control_horizontal_only() {
        let mut look = LookControl::new();
        look.enable_vertical = false;
        let mut o = Orientation::default();
        look.apply(&mut o, Vec2::new(100.0, 100.0));
        assert!((o.yaw + 0.2).abs() < 1e-6);
        assert_eq!(o.pitch, 0.0);
    }

    #[test]
    fn test_lock_transitions_emit_once() {
        let mut controls = Controls::archer(1.0, false);
        assert_eq!(controls.set_locked(true), Some(ControlEvent::Locked));
        assert_eq!(controls.set_locked(true), None);
        assert_eq!(controls.set_locked(false), Some(ControlEvent::Unlocked));
        assert_eq!(controls.lock_state(), LockState::Unlocked);
    }

    #[test]
    fn test_pointer_ignored_while_unlocked() {
        let controls = Controls::archer(1.0, false);
        let mut orbit = Orientation::default();
        let mut yaw = 0.0;
        let mut pose = Pose::default();
        let mut events = Vec::new();
        controls.apply_pointer(
            Vec2::new(50.0, 50.0),
            ControlTargets {
                orbit: &mut orbit,
                body_yaw: &mut yaw,
                pose: &mut pose,
            },
            &mut events,
        );
        assert!(events.is_empty());
        assert_eq!(orbit, Orientation::default());
    }

    #[test]
    fn test_aim_mode_drives_arms_and_notifies() {
        let mut controls = Controls::archer(1.0, false);
        controls.set_locked(true);
        controls.enable_aim();
        let mut orbit = Orientation::default();
        let mut yaw = 0.0;
        let mut pose = Pose::default();
        pose.set(Joint::ArmL, Vec3::new(0.0, 0.0, -FRAC_PI_2));
        let mut events = Vec::new();
        controls.apply_pointer(
            Vec2::new(0.0, -50.0),
            ControlTargets {
                orbit: &mut orbit,
                body_yaw: &mut yaw,
                pose: &mut pose,
            },
            &mut events,
        );
        assert!(events.contains(&ControlEvent::Changed(ControlId::ArmL)));
        assert!(events.contains(&ControlEvent::Changed(ControlId::Head)));
        // Pointer up raises the bow
        assert!(controls.aim_elevation(&pose) > 0.0);
    }

    proptest! {
        #[test]
        fn prop_rotation_always_within_limits(
            min in -3.0f32..0.0,
            span in 0.01f32..3.0,
            start in -10.0f32..10.0,
            deltas in proptest::collection::vec(-5000.0f32..5000.0, 1..64),
            inverted in any::<bool>(),
        ) {
            let limits = AngleLimits::new(min, min + span);
            let mut control = arm(limits);
            control.inverted = inverted;
            control.corrections.push(Correction { axis: Axis::Z, weight: Weight::Cos });
            let mut pose = Pose::default();
            pose.set(Joint::ArmL, Vec3::new(0.0, 0.0, start));
            for d in deltas {
                control.apply(&mut pose, d);
                let z = pose.get(Joint::ArmL).z;
                prop_assert!(z >= limits.min && z <= limits.max);
            }
        }

        #[test]
        fn prop_look_pitch_within_limits(deltas in proptest::collection::vec((-500.0f32..500.0, -500.0f32..500.0), 1..64)) {
            let mut look = LookControl::new();
            look.pitch_limits = AngleLimits::new(-0.25 * PI, 0.15 * PI);
            let mut o = Orientation::default();
            for (x, y) in deltas {
                look.apply(&mut o, Vec2::new(x, y));
                prop_assert!(o.pitch >= -0.25 * PI && o.pitch <= 0.15 * PI);
            }
        }
    }
}
