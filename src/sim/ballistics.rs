//! Arrow launch and flight
//!
//! Launch speed is an impulse over mass: `force * charge / mass`. In flight
//! the velocity picks up gravity every frame and the position advances by a
//! scaled velocity. The per-frame ground check is what ends a flight; the
//! analytic landing time is only a prediction for the HUD and tests.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use super::tween::Delay;
use crate::consts::{ARROW_HALF_LENGTH, ARROW_RADIUS};
use crate::tuning::Tuning;

/// Initial speed for a charge (seconds of hold)
pub fn launch_speed(force: f32, charge: f32, mass: f32) -> f32 {
    if mass <= 0.0 || !mass.is_finite() {
        return 0.0;
    }
    (force * charge.max(0.0)) / mass
}

/// Aim direction from body yaw and bow elevation (radians above horizontal)
pub fn aim_direction(yaw: f32, elevation: f32) -> Vec3 {
    let (sin_e, cos_e) = elevation.sin_cos();
    Vec3::new(yaw.sin() * cos_e, sin_e, yaw.cos() * cos_e)
}

/// Seconds until an arrow launched at `height` with vertical speed `vy`
/// drops to `ground`, integrating as `y += vy * scale * dt` under `gravity`.
/// `None` if it never gets there (no gravity and not descending).
pub fn predict_landing_time(height: f32, vy: f32, gravity: f32, scale: f32, ground: f32) -> Option<f32> {
    let drop = height - ground;
    if drop <= 0.0 {
        return Some(0.0);
    }
    if gravity <= 0.0 {
        return (vy < 0.0).then(|| drop / (-vy * scale));
    }
    // drop = (g t^2 / 2 - vy t) * scale
    let disc = vy * vy + 2.0 * gravity * drop / scale;
    Some((vy + disc.sqrt()) / gravity)
}

/// Where a landed arrow came to rest
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LandingSite {
    Ground,
    /// Stuck in the target, `offset` from the target origin
    Target { offset: Vec3 },
}

/// Attachment state; the renderer parents the arrow mesh from this
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Attachment {
    /// On the bow, following the archer
    Nocked,
    Flying,
    /// Down, waiting for the re-arm delay to elapse
    Landed { site: LandingSite, rearm: Delay },
}

/// How a flight ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShotOutcome {
    Hit,
    Miss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arrow {
    /// Distinguishes successive arrows in events and logs
    pub id: u32,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Unit heading (velocity direction while flying)
    pub direction: Vec3,
    /// Nose pitch about the local X axis
    pub pitch: f32,
    pub attachment: Attachment,
}

impl Arrow {
    /// Fresh arrow on the bow
    pub fn nocked(id: u32, position: Vec3, direction: Vec3) -> Self {
        Self {
            id,
            position,
            velocity: Vec3::ZERO,
            direction: direction.normalize_or(Vec3::Z),
            pitch: 0.0,
            attachment: Attachment::Nocked,
        }
    }

    pub fn is_nocked(&self) -> bool {
        matches!(self.attachment, Attachment::Nocked)
    }

    pub fn is_flying(&self) -> bool {
        matches!(self.attachment, Attachment::Flying)
    }

    /// Detach from the bow. Returns the launch speed; zero charge gives a
    /// zero-speed arrow that simply drops.
    pub fn launch(&mut self, origin: Vec3, direction: Vec3, charge: f32, tuning: &Tuning) -> f32 {
        let speed = launch_speed(tuning.arrow_force, charge, tuning.arrow_mass);
        self.position = origin;
        self.direction = direction.normalize_or(Vec3::Z);
        self.velocity = self.direction * speed;
        self.pitch = -0.5 * std::f32::consts::PI * self.direction.y;
        self.attachment = Attachment::Flying;
        speed
    }

    /// One flight frame. Returns `Some(Miss)` on the frame the arrow drops
    /// below ground level; the caller decides when to `land` it.
    pub fn integrate(&mut self, dt: f32, tuning: &Tuning) -> Option<ShotOutcome> {
        if !self.is_flying() {
            return None;
        }
        self.velocity.y -= tuning.gravity * dt;
        self.direction = self.velocity.normalize_or(self.direction);
        self.position += self.velocity * tuning.flight_scale * dt;
        self.pitch = -0.5 * std::f32::consts::PI * self.direction.y;

        (self.position.y < tuning.ground_level).then_some(ShotOutcome::Miss)
    }

    /// End the flight. Returns false (and changes nothing) unless flying,
    /// so a second contact in the same frame cannot score twice.
    pub fn land(&mut self, site: LandingSite, rearm_delay: f32) -> bool {
        if !self.is_flying() {
            return false;
        }
        self.velocity = Vec3::ZERO;
        self.attachment = Attachment::Landed {
            site,
            rearm: Delay::seconds(rearm_delay),
        };
        true
    }

    /// Count down the re-arm delay. True on the frame it elapses.
    pub fn advance_rearm(&mut self, dt: f32) -> bool {
        match &mut self.attachment {
            Attachment::Landed { rearm, .. } => rearm.advance(dt),
            _ => false,
        }
    }

    pub fn pause(&mut self) {
        if let Attachment::Landed { rearm, .. } = &mut self.attachment {
            rearm.pause();
        }
    }

    pub fn resume(&mut self) {
        if let Attachment::Landed { rearm, .. } = &mut self.attachment {
            rearm.resume();
        }
    }

    /// Box around the shaft, oriented by the current heading
    pub fn aabb(&self) -> Aabb {
        let half = self.direction.abs() * ARROW_HALF_LENGTH + Vec3::splat(ARROW_RADIUS);
        Aabb::from_center_half_extents(self.position, half)
    }
}
