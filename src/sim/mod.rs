//! Simulation module
//!
//! All gameplay logic lives here. This module stays free of rendering and
//! platform code:
//! - Time only enters through the `dt` passed to `tick`
//! - Host input arrives as one `TickInput` per frame
//! - Anything the HUD needs leaves as `GameEvent`s

pub mod aim;
pub mod ballistics;
pub mod collision;
pub mod locomotion;
pub mod rig;
pub mod rotation;
pub mod state;
pub mod target;
pub mod tick;
pub mod tween;

pub use aim::{Bow, Release, charge};
pub use ballistics::{Arrow, Attachment, LandingSite, ShotOutcome, launch_speed};
pub use collision::{Aabb, Collider, CollisionWorld, Contact, Plane, Probe};
pub use locomotion::{Avatar, CollisionFlags, Gait, Motion, MoveIntent};
pub use rig::{Joint, Pose, Rig, RigError, Skeleton, UpperOwner};
pub use rotation::{ControlEvent, ControlId, Controls, LockState, Orientation};
pub use state::{Body, CameraMode, GameEvent, GameState, Session, Wall};
pub use target::Target;
pub use tick::{ButtonEdge, TickInput, tick};
pub use tween::{Chain, Easing, Phase, Playback, Tween};
