//! Skeleton binding and pose storage
//!
//! The asset layer hands over a loaded skeleton; `Rig::bind` resolves every
//! joint the simulation animates by bone name and records the rest pose. A
//! missing bone is a setup defect and is reported before the first frame.

use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Joints driven by the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Joint {
    Spine1,
    Spine2,
    Spine3,
    Head,
    ArmL,
    ForearmL,
    HandL,
    ArmR,
    ForearmR,
    HandR,
    ThighL,
    ShinL,
    FootL,
    ThighR,
    ShinR,
    FootR,
}

/// Joint count (length of `Joint::ALL`)
pub const JOINT_COUNT: usize = 16;

impl Joint {
    pub const ALL: [Joint; JOINT_COUNT] = [
        Joint::Spine1,
        Joint::Spine2,
        Joint::Spine3,
        Joint::Head,
        Joint::ArmL,
        Joint::ForearmL,
        Joint::HandL,
        Joint::ArmR,
        Joint::ForearmR,
        Joint::HandR,
        Joint::ThighL,
        Joint::ShinL,
        Joint::FootL,
        Joint::ThighR,
        Joint::ShinR,
        Joint::FootR,
    ];

    /// Bone name in the character asset
    pub fn bone_name(self) -> &'static str {
        match self {
            Joint::Spine1 => "spine001",
            Joint::Spine2 => "spine002",
            Joint::Spine3 => "spine003",
            Joint::Head => "spine004",
            Joint::ArmL => "upper_armL",
            Joint::ForearmL => "forearmL",
            Joint::HandL => "handL",
            Joint::ArmR => "upper_armR",
            Joint::ForearmR => "forearmR",
            Joint::HandR => "handR",
            Joint::ThighL => "thighL",
            Joint::ShinL => "shinL",
            Joint::FootL => "footL",
            Joint::ThighR => "thighR",
            Joint::ShinR => "shinR",
            Joint::FootR => "footR",
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    pub fn is_lower(self) -> bool {
        matches!(
            self,
            Joint::ThighL | Joint::ShinL | Joint::FootL | Joint::ThighR | Joint::ShinR | Joint::FootR
        )
    }
}

/// Source of bone rotations, implemented by whatever loaded the character
pub trait Skeleton {
    /// Local Euler rotation of the named bone, if present
    fn bone_rotation(&self, name: &str) -> Option<Vec3>;
}

impl Skeleton for HashMap<String, Vec3> {
    fn bone_rotation(&self, name: &str) -> Option<Vec3> {
        self.get(name).copied()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RigError {
    #[error("skeleton has no bone named `{name}`")]
    MissingJoint { name: &'static str },
}

/// Local Euler rotation (radians, XYZ) of every driven joint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    rotations: [Vec3; JOINT_COUNT],
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            rotations: [Vec3::ZERO; JOINT_COUNT],
        }
    }
}

impl Pose {
    #[inline]
    pub fn get(&self, joint: Joint) -> Vec3 {
        self.rotations[joint.index()]
    }

    #[inline]
    pub fn set(&mut self, joint: Joint, rotation: Vec3) {
        self.rotations[joint.index()] = rotation;
    }

    #[inline]
    pub fn rotation_mut(&mut self, joint: Joint) -> &mut Vec3 {
        &mut self.rotations[joint.index()]
    }
}

/// Which gesture currently writes the upper-body joints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpperOwner {
    /// Nobody; joints hold whatever was last written
    #[default]
    Free,
    /// Walk cycle arm swing
    Gait,
    /// Bow draw posture
    Draw,
}

/// The animated character: current pose, rest pose and upper-body ownership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rig {
    pub pose: Pose,
    rest: Pose,
    upper_owner: UpperOwner,
}

impl Rig {
    /// Resolve every driven joint from a loaded skeleton.
    ///
    /// Entry point for whatever loads the character: the native binary binds
    /// a bone map read from JSON, a missing bone aborts startup.
    pub fn bind(skeleton: &impl Skeleton) -> Result<Self, RigError> {
        let mut rest = Pose::default();
        for joint in Joint::ALL {
            let name = joint.bone_name();
            let rotation = skeleton
                .bone_rotation(name)
                .ok_or(RigError::MissingJoint { name })?;
            rest.set(joint, rotation);
        }
        log::debug!("Rig bound ({} joints)", JOINT_COUNT);
        Ok(Self::from_rest(rest))
    }

    /// Rig without an asset: arms held level at the middle of their aim ranges
    pub fn neutral() -> Self {
        let mut rest = Pose::default();
        rest.set(Joint::ArmL, Vec3::new(0.0, 0.0, -FRAC_PI_2));
        rest.set(Joint::ArmR, Vec3::new(0.0, 0.0, FRAC_PI_2));
        Self::from_rest(rest)
    }

    fn from_rest(rest: Pose) -> Self {
        Self {
            pose: rest.clone(),
            rest,
            upper_owner: UpperOwner::Free,
        }
    }

    pub fn rest(&self, joint: Joint) -> Vec3 {
        self.rest.get(joint)
    }

    /// Thighs, shins and feet back to rest
    pub fn restore_lower(&mut self) {
        for joint in Joint::ALL.into_iter().filter(|j| j.is_lower()) {
            self.pose.set(joint, self.rest.get(joint));
        }
    }

    /// Spine, head, arms and forearms back to rest
    pub fn restore_upper(&mut self) {
        for joint in [
            Joint::Spine1,
            Joint::Spine2,
            Joint::Spine3,
            Joint::Head,
            Joint::ArmL,
            Joint::ArmR,
            Joint::ForearmL,
            Joint::ForearmR,
        ] {
            self.pose.set(joint, self.rest.get(joint));
        }
    }

    pub fn upper_owner(&self) -> UpperOwner {
        self.upper_owner
    }

    /// Hand the upper body to `owner`. The caller must have stopped the
    /// previous owner's interpolation first.
    pub fn claim_upper(&mut self, owner: UpperOwner) {
        if self.upper_owner != owner {
            log::trace!("Upper body: {:?} -> {:?}", self.upper_owner, owner);
        }
        self.upper_owner = owner;
    }

    /// Give up the upper body if `owner` still holds it
    pub fn release_upper(&mut self, owner: UpperOwner) {
        if self.upper_owner == owner {
            self.upper_owner = UpperOwner::Free;
        }
    }
}
