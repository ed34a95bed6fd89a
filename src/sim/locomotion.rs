//! Avatar locomotion
//!
//! Held direction keys become a normalized intent, integrated against floor
//! friction into a local-frame velocity. Collision flags from this tick's
//! probes suppress acceleration towards an obstacle without cancelling the
//! velocity already built up. Map bounds are hard: they clamp position and
//! zero the velocity on the violated axis.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::rig::{Joint, Rig, UpperOwner};
use super::tween::{Chain, Lerp, Phase, stop_slot};
use crate::consts::AVATAR_HALF_EXTENTS;
use crate::tuning::MapBounds;
use crate::{deg_to_rad, deg_to_rad3, world_to_local, yaw_forward, yaw_left};

/// Held movement keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveIntent {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveIntent {
    /// Unit direction in the local frame (`x` = left, `y` = forward), zero when idle
    /// or when opposite keys cancel
    pub fn direction(&self) -> Vec2 {
        let x = f32::from(u8::from(self.left)) - f32::from(u8::from(self.right));
        let y = f32::from(u8::from(self.forward)) - f32::from(u8::from(self.backward));
        Vec2::new(x, y).normalize_or_zero()
    }

    pub fn any(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }
}

/// Directions blocked by an obstacle this tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionFlags {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl CollisionFlags {
    const EPS: f32 = 1e-6;

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn any(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }

    /// Block the directions facing an obstacle. `push_out` is the contact
    /// normal (pointing from the obstacle to the avatar) in the avatar's
    /// local frame, `x` = left, `y` = forward.
    pub fn block_from_normal(&mut self, push_out: Vec2) {
        if push_out.y < -Self::EPS {
            self.forward = true;
        } else if push_out.y > Self::EPS {
            self.backward = true;
        }
        if push_out.x < -Self::EPS {
            self.left = true;
        } else if push_out.x > Self::EPS {
            self.right = true;
        }
    }
}

/// Local-frame velocity (`x` = left, `y` = forward)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub velocity: Vec2,
}

impl Motion {
    /// One friction + acceleration step
    pub fn integrate(
        &mut self,
        dt: f32,
        intent: &MoveIntent,
        blocked: &CollisionFlags,
        speed: f32,
        friction: f32,
    ) {
        // Decay never overshoots zero, whatever the frame time
        let decay = (friction * dt).clamp(0.0, 1.0);
        self.velocity -= self.velocity * decay;

        // Opposite keys cancel, so each axis accelerates towards one side at most
        let step = intent.direction() * speed * dt;
        if (step.y > 0.0 && !blocked.forward) || (step.y < 0.0 && !blocked.backward) {
            self.velocity.y += step.y;
        }
        if (step.x > 0.0 && !blocked.left) || (step.x < 0.0 && !blocked.right) {
            self.velocity.x += step.x;
        }
    }

    /// World-space velocity for a facing
    pub fn world_velocity(&self, yaw: f32) -> Vec3 {
        yaw_left(yaw) * self.velocity.x + yaw_forward(yaw) * self.velocity.y
    }

    /// Walking means either local axis is at or above the threshold
    pub fn is_walking(&self, threshold: f32) -> bool {
        self.velocity.x.abs() >= threshold || self.velocity.y.abs() >= threshold
    }
}

/// Clamp a ground position into the map, zeroing the world velocity on each
/// violated axis. Returns true if any bound was hit.
pub fn apply_bounds(position: &mut Vec3, motion: &mut Motion, yaw: f32, bounds: &MapBounds) -> bool {
    let mut world = motion.world_velocity(yaw);
    let mut hit = false;

    if position.z >= bounds.forward {
        position.z = bounds.forward;
        world.z = 0.0;
        hit = true;
    }
    if position.z <= bounds.backward {
        position.z = bounds.backward;
        world.z = 0.0;
        hit = true;
    }
    if position.x >= bounds.left {
        position.x = bounds.left;
        world.x = 0.0;
        hit = true;
    }
    if position.x <= bounds.right {
        position.x = bounds.right;
        world.x = 0.0;
        hit = true;
    }

    if hit {
        let (left, forward) = world_to_local(world, yaw);
        motion.velocity = Vec2::new(left, forward);
    }
    hit
}

/// X-axis offsets for the six leg joints
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LegSwing {
    pub thigh_l: f32,
    pub thigh_r: f32,
    pub shin_l: f32,
    pub shin_r: f32,
    pub foot_l: f32,
    pub foot_r: f32,
}

impl Lerp for LegSwing {
    fn lerp_to(self, to: Self, t: f32) -> Self {
        Self {
            thigh_l: self.thigh_l.lerp_to(to.thigh_l, t),
            thigh_r: self.thigh_r.lerp_to(to.thigh_r, t),
            shin_l: self.shin_l.lerp_to(to.shin_l, t),
            shin_r: self.shin_r.lerp_to(to.shin_r, t),
            foot_l: self.foot_l.lerp_to(to.foot_l, t),
            foot_r: self.foot_r.lerp_to(to.foot_r, t),
        }
    }
}

impl LegSwing {
    /// One stride, left leg leading
    fn stride(thigh: f32, shin_l: f32, shin_r: f32, foot: f32) -> Self {
        Self {
            thigh_l: deg_to_rad(thigh),
            thigh_r: deg_to_rad(-thigh),
            shin_l: deg_to_rad(shin_l),
            shin_r: deg_to_rad(shin_r),
            foot_l: deg_to_rad(foot),
            foot_r: deg_to_rad(-foot),
        }
    }

    fn read(rig: &Rig) -> Self {
        let x = |joint| rig.pose.get(joint).x;
        Self {
            thigh_l: x(Joint::ThighL),
            thigh_r: x(Joint::ThighR),
            shin_l: x(Joint::ShinL),
            shin_r: x(Joint::ShinR),
            foot_l: x(Joint::FootL),
            foot_r: x(Joint::FootR),
        }
    }
}

/// Shared swing for both arms, both forearms (Z) and the upper spine (Y)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmSwing {
    pub arm: f32,
    pub forearm: f32,
    pub spine: f32,
}

impl Lerp for ArmSwing {
    fn lerp_to(self, to: Self, t: f32) -> Self {
        Self {
            arm: self.arm.lerp_to(to.arm, t),
            forearm: self.forearm.lerp_to(to.forearm, t),
            spine: self.spine.lerp_to(to.spine, t),
        }
    }
}

impl ArmSwing {
    fn degrees(arm: f32, forearm: f32, spine: f32) -> Self {
        Self {
            arm: deg_to_rad(arm),
            forearm: deg_to_rad(forearm),
            spine: deg_to_rad(spine),
        }
    }
}

/// Upper-body angles the arm swing is applied on top of
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct UpperBase {
    arm_l: f32,
    arm_r: f32,
    forearm_l: f32,
    forearm_r: f32,
    spine: f32,
    head: f32,
}

/// Leg keyframes: stride, opposite stride, neutral
pub fn lower_keyframes(durations: [f32; 3]) -> Vec<Phase<LegSwing>> {
    vec![
        Phase::new(LegSwing::stride(30.0, 0.0, 30.0, 60.0), durations[0]),
        Phase::new(LegSwing::stride(-30.0, 30.0, 0.0, -60.0), durations[1]),
        Phase::new(LegSwing::default(), durations[2]),
    ]
}

/// Arm keyframes: swing, opposite swing, neutral
pub fn upper_keyframes(durations: [f32; 3]) -> Vec<Phase<ArmSwing>> {
    vec![
        Phase::new(ArmSwing::degrees(30.0, 15.0, 15.0), durations[0]),
        Phase::new(ArmSwing::degrees(-30.0, -15.0, -15.0), durations[1]),
        Phase::new(ArmSwing::default(), durations[2]),
    ]
}

/// Cyclic walk animation: one looping chain for the legs, one for the upper body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gait {
    durations: [f32; 3],
    lower: Option<Chain<LegSwing>>,
    lower_base: LegSwing,
    upper: Option<Chain<ArmSwing>>,
    upper_base: UpperBase,
}

impl Gait {
    pub fn new(durations: [f32; 3]) -> Self {
        Self {
            durations,
            lower: None,
            lower_base: LegSwing::default(),
            upper: None,
            upper_base: UpperBase::default(),
        }
    }

    /// Any walk chain live
    pub fn is_running(&self) -> bool {
        self.lower.is_some() || self.upper.is_some()
    }

    pub fn upper_running(&self) -> bool {
        self.upper.is_some()
    }

    /// Start walking. No-op while already running.
    pub fn start(&mut self, rig: &mut Rig, with_upper: bool) {
        if self.is_running() {
            return;
        }
        rig.restore_lower();
        self.lower_base = LegSwing::read(rig);
        self.lower = Some(Chain::new(
            LegSwing::default(),
            lower_keyframes(self.durations),
            true,
        ));
        if with_upper {
            self.start_upper(rig);
        }
        log::trace!("Gait started (upper: {})", with_upper);
    }

    /// (Re)start the arm swing from the walking posture
    pub fn start_upper(&mut self, rig: &mut Rig) {
        stop_slot(&mut self.upper);

        rig.restore_upper();
        rig.claim_upper(UpperOwner::Gait);
        rig.pose.rotation_mut(Joint::Spine3).y = 0.0;
        for (joint, offset) in [
            (Joint::ArmR, [30.0, 0.0, 90.0]),
            (Joint::ForearmR, [-60.0, 0.0, -30.0]),
            (Joint::ArmL, [30.0, 0.0, -90.0]),
            (Joint::ForearmL, [0.0, 0.0, 60.0]),
        ] {
            *rig.pose.rotation_mut(joint) += deg_to_rad3(offset);
        }

        let pose = &rig.pose;
        self.upper_base = UpperBase {
            arm_l: pose.get(Joint::ArmL).z,
            arm_r: pose.get(Joint::ArmR).z,
            forearm_l: pose.get(Joint::ForearmL).z,
            forearm_r: pose.get(Joint::ForearmR).z,
            spine: pose.get(Joint::Spine3).y,
            head: pose.get(Joint::Head).y,
        };
        self.upper = Some(Chain::new(
            ArmSwing::default(),
            upper_keyframes(self.durations),
            true,
        ));
    }

    /// Cancel every walk chain. Legs always return to rest; the upper body
    /// only when `restore_upper` (a gesture may be holding it).
    pub fn stop(&mut self, rig: &mut Rig, restore_upper: bool) {
        stop_slot(&mut self.lower);
        let had_upper = self.upper.is_some();
        stop_slot(&mut self.upper);

        rig.restore_lower();
        if had_upper {
            rig.release_upper(UpperOwner::Gait);
        }
        if restore_upper {
            rig.restore_upper();
        }
    }

    /// Advance the chains and write the pose
    pub fn advance(&mut self, dt: f32, rig: &mut Rig) {
        if let Some(lower) = self.lower.as_mut() {
            lower.advance(dt);
            let swing = lower.value();
            let base = self.lower_base;
            let pose = &mut rig.pose;
            pose.rotation_mut(Joint::ThighL).x = base.thigh_l + swing.thigh_l;
            pose.rotation_mut(Joint::ThighR).x = base.thigh_r + swing.thigh_r;
            pose.rotation_mut(Joint::ShinL).x = base.shin_l + swing.shin_l;
            pose.rotation_mut(Joint::ShinR).x = base.shin_r + swing.shin_r;
            pose.rotation_mut(Joint::FootL).x = base.foot_l + swing.foot_l;
            pose.rotation_mut(Joint::FootR).x = base.foot_r + swing.foot_r;
        }

        if let Some(upper) = self.upper.as_mut() {
            upper.advance(dt);
            if rig.upper_owner() != UpperOwner::Gait {
                return;
            }
            let swing = upper.value();
            let base = self.upper_base;
            let pose = &mut rig.pose;
            pose.rotation_mut(Joint::ArmR).z = base.arm_r + swing.arm;
            pose.rotation_mut(Joint::ArmL).z = base.arm_l + swing.arm;
            pose.rotation_mut(Joint::ForearmR).z = base.forearm_r + swing.forearm;
            pose.rotation_mut(Joint::ForearmL).z = base.forearm_l + swing.forearm;
            pose.rotation_mut(Joint::Spine3).y = base.spine + swing.spine;
            pose.rotation_mut(Joint::Head).y = base.head - swing.spine;
        }
    }

    pub fn pause(&mut self) {
        if let Some(c) = self.lower.as_mut() {
            c.pause();
        }
        if let Some(c) = self.upper.as_mut() {
            c.pause();
        }
    }

    pub fn resume(&mut self) {
        if let Some(c) = self.lower.as_mut() {
            c.resume();
        }
        if let Some(c) = self.upper.as_mut() {
            c.resume();
        }
    }
}

/// The player character on the ground plane
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Avatar {
    pub position: Vec3,
    pub yaw: f32,
    pub motion: Motion,
    /// Written by the collision probes, consumed and cleared within one tick
    pub blocked: CollisionFlags,
    pub gait: Gait,
    pub half_extents: Vec3,
}

impl Avatar {
    pub fn new(position: Vec3, gait_durations: [f32; 3]) -> Self {
        Self {
            position,
            yaw: 0.0,
            motion: Motion::default(),
            blocked: CollisionFlags::default(),
            gait: Gait::new(gait_durations),
            half_extents: AVATAR_HALF_EXTENTS,
        }
    }

    /// Integrate one frame of movement. Returns whether the avatar is walking.
    pub fn step(
        &mut self,
        dt: f32,
        intent: &MoveIntent,
        speed: f32,
        friction: f32,
        threshold: f32,
        bounds: &MapBounds,
    ) -> bool {
        self.motion
            .integrate(dt, intent, &self.blocked, speed, friction);
        self.position += self.motion.world_velocity(self.yaw) * dt;
        if apply_bounds(&mut self.position, &mut self.motion, self.yaw, bounds) {
            log::trace!("Avatar clamped to map bounds at {:?}", self.position);
        }
        self.motion.is_walking(threshold)
    }

    /// World-space box centre (the avatar stands on `position`)
    pub fn center(&self) -> Vec3 {
        self.position + Vec3::Y * self.half_extents.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;
    use proptest::prelude::*;

    fn forward() -> MoveIntent {
        MoveIntent {
            forward: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_diagonal_intent_is_unit_length() {
        let intent = MoveIntent {
            forward: true,
            left: true,
            ..Default::default()
        };
        assert!((intent.direction().length() - 1.0).abs() < 1e-6);
        let cancel = MoveIntent {
            forward: true,
            backward: true,
            ..Default::default()
        };
        assert_eq!(cancel.direction(), Vec2::ZERO);
    }

    #[test]
    fn test_friction_decays_without_intent() {
        let mut motion = Motion {
            velocity: Vec2::new(0.0, 10.0),
        };
        motion.integrate(0.05, &MoveIntent::default(), &CollisionFlags::default(), 100.0, 10.0);
        assert!((motion.velocity.y - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_blocked_direction_keeps_existing_velocity() {
        let mut motion = Motion {
            velocity: Vec2::new(0.0, 10.0),
        };
        let blocked = CollisionFlags {
            forward: true,
            ..Default::default()
        };
        motion.integrate(0.01, &forward(), &blocked, 100.0, 10.0);
        // Only friction applied: no bounce, no hard stop
        assert!((motion.velocity.y - 9.0).abs() < 1e-5);
    }

    #[test]
    fn test_block_from_normal_faces_obstacle() {
        let mut flags = CollisionFlags::default();
        // Obstacle ahead pushes back
        flags.block_from_normal(Vec2::new(0.0, -1.0));
        assert!(flags.forward && !flags.backward && !flags.left && !flags.right);
        flags.clear();
        assert!(!flags.any());
        flags.block_from_normal(Vec2::new(1.0, 0.0));
        assert!(flags.right);
    }

    #[test]
    fn test_bounds_clamp_position_and_zero_axis_velocity() {
        let bounds = MapBounds::for_terrain(500.0);
        let mut position = Vec3::new(0.0, 0.0, 12.0);
        let mut motion = Motion {
            velocity: Vec2::new(3.0, 20.0),
        };
        assert!(apply_bounds(&mut position, &mut motion, 0.0, &bounds));
        assert_eq!(position.z, 10.0);
        assert!(motion.velocity.y.abs() < 1e-6);
        assert!((motion.velocity.x - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_avatar_walks_forward_along_facing() {
        let tuning = Tuning::default();
        let mut avatar = Avatar::new(Vec3::new(0.0, 0.0, -100.0), tuning.gait_phases);
        let mut walking = false;
        for _ in 0..30 {
            walking = avatar.step(
                1.0 / 60.0,
                &forward(),
                tuning.move_speed,
                tuning.floor_friction,
                tuning.movement_threshold,
                &tuning.map_bounds,
            );
        }
        assert!(walking);
        assert!(avatar.position.z > -100.0);
        assert!(avatar.position.x.abs() < 1e-4);
    }

    #[test]
    fn test_gait_writes_mirrored_legs() {
        let mut rig = Rig::neutral();
        let mut gait = Gait::new([0.2, 0.4, 0.2]);
        gait.start(&mut rig, false);
        gait.advance(0.2 - 1e-4, &mut rig);
        let thigh_l = rig.pose.get(Joint::ThighL).x;
        let thigh_r = rig.pose.get(Joint::ThighR).x;
        assert!((thigh_l - deg_to_rad(30.0)).abs() < 1e-3);
        assert!((thigh_l + thigh_r).abs() < 1e-5);
        // Upper body untouched without the upper half
        assert_eq!(rig.upper_owner(), UpperOwner::Free);
        assert_eq!(rig.pose.get(Joint::ArmL), rig.rest(Joint::ArmL));
    }

    #[test]
    fn test_gait_stop_restores_legs_and_releases_upper() {
        let mut rig = Rig::neutral();
        let mut gait = Gait::new([0.2, 0.4, 0.2]);
        gait.start(&mut rig, true);
        assert_eq!(rig.upper_owner(), UpperOwner::Gait);
        gait.advance(0.33, &mut rig);
        gait.stop(&mut rig, true);
        gait.stop(&mut rig, true);
        assert!(!gait.is_running());
        assert_eq!(rig.upper_owner(), UpperOwner::Free);
        for joint in Joint::ALL {
            assert_eq!(rig.pose.get(joint), rig.rest(joint));
        }
    }

    #[test]
    fn test_head_counter_rotates_spine() {
        let mut rig = Rig::neutral();
        let mut gait = Gait::new([0.2, 0.4, 0.2]);
        gait.start(&mut rig, true);
        gait.advance(0.1, &mut rig);
        let spine = rig.pose.get(Joint::Spine3).y;
        let head = rig.pose.get(Joint::Head).y;
        assert!(spine > 0.0);
        assert!((spine + head).abs() < 1e-5);
    }

    #[test]
    fn test_gait_paused_holds_pose() {
        let mut rig = Rig::neutral();
        let mut gait = Gait::new([0.2, 0.4, 0.2]);
        gait.start(&mut rig, false);
        gait.advance(0.1, &mut rig);
        gait.pause();
        let held = rig.pose.get(Joint::ThighL);
        gait.advance(0.3, &mut rig);
        assert_eq!(rig.pose.get(Joint::ThighL), held);
        gait.resume();
        gait.advance(0.05, &mut rig);
        assert!(rig.pose.get(Joint::ThighL).x > held.x);
    }

    proptest! {
        #[test]
        fn prop_velocity_bounded_by_terminal_speed(
            dts in proptest::collection::vec(0.0f32..0.1, 1..200),
            keys in proptest::collection::vec(any::<(bool, bool, bool, bool)>(), 1..200),
        ) {
            let speed = 500.0;
            let friction = 10.0;
            let bound = speed / friction + 1e-2;
            let mut motion = Motion::default();
            for (i, dt) in dts.iter().enumerate() {
                let (forward, backward, left, right) = keys[i % keys.len()];
                let intent = MoveIntent { forward, backward, left, right };
                motion.integrate(*dt, &intent, &CollisionFlags::default(), speed, friction);
                prop_assert!(motion.velocity.x.abs() <= bound);
                prop_assert!(motion.velocity.y.abs() <= bound);
            }
        }
    }
}
