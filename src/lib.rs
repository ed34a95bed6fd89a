//! Archery Range - a first/third-person archery game
//!
//! Core modules:
//! - `sim`: Simulation core (controls, locomotion, draw/shot choreography, flight, collisions)
//! - `tuning`: Data-driven game balance
//! - `settings`: Player preferences
//!
//! Rendering, asset loading and the DOM HUD live in the host (`main.rs`) and
//! only read the state exposed by `sim`.

pub mod settings;
pub mod sim;
pub mod tuning;

pub use settings::{Daylight, Difficulty, Settings};
pub use tuning::{Tuning, TuningError};

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    use glam::Vec3;
    use std::f32::consts::PI;

    /// Largest frame delta the host feeds into the simulation (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Terrain is a square of this width centered on the origin
    pub const TERRAIN_WIDTH: f32 = 500.0;

    /// Avatar movement
    pub const FLOOR_FRICTION: f32 = 10.0;
    pub const MOVE_SPEED: f32 = 500.0;
    /// Speed divisor while in aim mode
    pub const AIM_SPEED_DIVISOR: f32 = 5.0;

    /// Arrow physics
    pub const GRAVITY: f32 = 9.81;
    pub const ARROW_FORCE: f32 = 20.0;
    pub const ARROW_MASS: f32 = 1.0;
    /// Maximum charge (seconds of hold)
    pub const MAX_CHARGE: f32 = 2.0;
    /// Positions advance `velocity * FLIGHT_SCALE * dt` per frame
    pub const FLIGHT_SCALE: f32 = 5.0;
    /// Arrow height at which a flight counts as grounded
    pub const GROUND_LEVEL: f32 = 2.0;
    /// Delay between landing and the next nocked arrow (seconds)
    pub const REARM_DELAY: f32 = 1.0;

    /// Draw choreography
    pub const BOW_STRING_MAX_STRETCH: f32 = 10.0;
    pub const DRAW_ROTATION: f32 = 0.2 * PI;
    /// Snap-back of the string after release (seconds)
    pub const SNAP_BACK_DURATION: f32 = 0.01;

    /// Session
    pub const MAX_SHOTS: u32 = 3;

    /// Gait phase durations (seconds)
    pub const GAIT_PHASES: [f32; 3] = [0.2, 0.4, 0.2];

    /// Full loop of the moving target (seconds)
    pub const TARGET_CYCLE: f32 = 5.0;

    // Scene layout (world units, matching the scaled character and target assets)
    pub const AVATAR_START: Vec3 = Vec3::ZERO;
    pub const AVATAR_HALF_EXTENTS: Vec3 = Vec3::new(4.0, 9.0, 4.0);
    /// Nocking point relative to the avatar's feet, local frame (left, up, forward)
    pub const BOW_OFFSET: Vec3 = Vec3::new(0.0, 15.0, 2.0);
    pub const ARROW_HALF_LENGTH: f32 = 3.0;
    pub const ARROW_RADIUS: f32 = 0.3;
    pub const TARGET_START: Vec3 = Vec3::new(0.0, 0.0, 100.0);
    pub const TARGET_BODY_HALF_EXTENTS: Vec3 = Vec3::new(10.0, 15.0, 2.0);
    pub const BULLSEYE_OFFSET: Vec3 = Vec3::new(0.0, 18.0, -1.0);
    pub const BULLSEYE_HALF_EXTENTS: Vec3 = Vec3::new(4.0, 4.0, 2.0);
}

/// Degrees to radians
#[inline]
pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees.to_radians()
}

/// Component-wise degrees to radians
#[inline]
pub fn deg_to_rad3(degrees: [f32; 3]) -> Vec3 {
    Vec3::new(
        deg_to_rad(degrees[0]),
        deg_to_rad(degrees[1]),
        deg_to_rad(degrees[2]),
    )
}

/// Horizontal forward unit vector for a yaw angle (+Z at yaw 0)
#[inline]
pub fn yaw_forward(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

/// Horizontal left unit vector for a yaw angle (+X at yaw 0)
#[inline]
pub fn yaw_left(yaw: f32) -> Vec3 {
    Vec3::new(yaw.cos(), 0.0, -yaw.sin())
}

/// Rotate a world-space horizontal vector into the local frame of a yaw.
///
/// Returns `(left, forward)` components.
#[inline]
pub fn world_to_local(v: Vec3, yaw: f32) -> (f32, f32) {
    (v.dot(yaw_left(yaw)), v.dot(yaw_forward(yaw)))
}

/// Map a local `(left, up, forward)` offset into world space
#[inline]
pub fn local_to_world(local: Vec3, yaw: f32) -> Vec3 {
    yaw_left(yaw) * local.x + Vec3::Y * local.y + yaw_forward(yaw) * local.z
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_yaw_basis_at_zero() {
        assert!((yaw_forward(0.0) - Vec3::Z).length() < 1e-6);
        assert!((yaw_left(0.0) - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_world_to_local_quarter_turn() {
        // Facing +X: world +X is straight ahead
        let (left, fwd) = world_to_local(Vec3::X, FRAC_PI_2);
        assert!(left.abs() < 1e-6);
        assert!((fwd - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_local_to_world_inverts_world_to_local() {
        let yaw = 0.7;
        let world = local_to_world(Vec3::new(2.0, 5.0, -3.0), yaw);
        assert!((world.y - 5.0).abs() < 1e-6);
        let (left, fwd) = world_to_local(world, yaw);
        assert!((left - 2.0).abs() < 1e-5);
        assert!((fwd + 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_deg_to_rad3() {
        let r = deg_to_rad3([180.0, 90.0, 0.0]);
        assert!((r.x - std::f32::consts::PI).abs() < 1e-6);
        assert!((r.y - FRAC_PI_2).abs() < 1e-6);
        assert_eq!(r.z, 0.0);
    }
}
