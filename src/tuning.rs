//! Data-driven game balance
//!
//! Every physics and animation constant the simulation reads lives here so a
//! balance pass only touches one JSON document.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Errors produced while loading a tuning document
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("malformed tuning document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Playable area limits on the ground plane (world X/Z)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    /// Largest Z the avatar may reach (towards the target)
    pub forward: f32,
    /// Smallest Z
    pub backward: f32,
    /// Largest X
    pub left: f32,
    /// Smallest X
    pub right: f32,
}

impl MapBounds {
    /// Bounds inset 20 units from the terrain edge, forward capped well short of the target
    pub fn for_terrain(width: f32) -> Self {
        Self {
            forward: 10.0,
            backward: -width / 2.0 + 20.0,
            left: width / 2.0 - 20.0,
            right: -width / 2.0 + 20.0,
        }
    }
}

/// Game balance parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub terrain_width: f32,
    pub map_bounds: MapBounds,

    // Locomotion
    pub floor_friction: f32,
    pub move_speed: f32,
    /// Minimum speed on either axis that counts as walking
    pub movement_threshold: f32,
    pub aim_speed_divisor: f32,
    pub gait_phases: [f32; 3],

    // Draw and flight
    pub gravity: f32,
    pub arrow_force: f32,
    pub arrow_mass: f32,
    pub max_charge: f32,
    pub string_max_stretch: f32,
    pub draw_rotation: f32,
    pub snap_back_duration: f32,
    pub flight_scale: f32,
    pub ground_level: f32,
    pub rearm_delay: f32,

    // Session
    pub max_shots: u32,
    pub target_cycle: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            terrain_width: TERRAIN_WIDTH,
            map_bounds: MapBounds::for_terrain(TERRAIN_WIDTH),

            floor_friction: FLOOR_FRICTION,
            move_speed: MOVE_SPEED,
            movement_threshold: 0.01 * MOVE_SPEED,
            aim_speed_divisor: AIM_SPEED_DIVISOR,
            gait_phases: GAIT_PHASES,

            gravity: GRAVITY,
            arrow_force: ARROW_FORCE,
            arrow_mass: ARROW_MASS,
            max_charge: MAX_CHARGE,
            string_max_stretch: BOW_STRING_MAX_STRETCH,
            draw_rotation: DRAW_ROTATION,
            snap_back_duration: SNAP_BACK_DURATION,
            flight_scale: FLIGHT_SCALE,
            ground_level: GROUND_LEVEL,
            rearm_delay: REARM_DELAY,

            max_shots: MAX_SHOTS,
            target_cycle: TARGET_CYCLE,
        }
    }
}

impl Tuning {
    /// Parse and validate a JSON tuning document. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Reject values that would make the simulation diverge or divide by zero
    pub fn validate(&self) -> Result<(), TuningError> {
        fn positive(field: &'static str, value: f32) -> Result<(), TuningError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(TuningError::Invalid {
                    field,
                    reason: "must be positive and finite",
                })
            }
        }

        positive("floor_friction", self.floor_friction)?;
        positive("move_speed", self.move_speed)?;
        positive("aim_speed_divisor", self.aim_speed_divisor)?;
        positive("arrow_mass", self.arrow_mass)?;
        positive("max_charge", self.max_charge)?;
        positive("flight_scale", self.flight_scale)?;
        positive("target_cycle", self.target_cycle)?;
        // Downward acceleration; zero or negative never lands an arrow
        positive("gravity", self.gravity)?;
        if !self.ground_level.is_finite() {
            return Err(TuningError::Invalid {
                field: "ground_level",
                reason: "must be finite",
            });
        }
        for phase in self.gait_phases {
            positive("gait_phases", phase)?;
        }

        if self.max_shots == 0 {
            return Err(TuningError::Invalid {
                field: "max_shots",
                reason: "must allow at least one shot",
            });
        }

        let b = &self.map_bounds;
        if b.backward >= b.forward || b.right >= b.left {
            return Err(TuningError::Invalid {
                field: "map_bounds",
                reason: "min bound must be below max bound",
            });
        }

        Ok(())
    }

    /// Steady-state walking speed with constant intent (`move_speed / friction`)
    pub fn terminal_speed(&self) -> f32 {
        self.move_speed / self.floor_friction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_from_json_partial_override() {
        let tuning = Tuning::from_json(r#"{ "max_shots": 5, "gravity": 3.7 }"#).unwrap();
        assert_eq!(tuning.max_shots, 5);
        assert!((tuning.gravity - 3.7).abs() < 1e-6);
        // Untouched fields keep defaults
        assert!((tuning.arrow_force - ARROW_FORCE).abs() < 1e-6);
    }

    #[test]
    fn test_from_json_rejects_zero_mass() {
        let err = Tuning::from_json(r#"{ "arrow_mass": 0.0 }"#).unwrap_err();
        assert!(matches!(
            err,
            TuningError::Invalid {
                field: "arrow_mass",
                ..
            }
        ));
    }

    #[test]
    fn test_from_json_rejects_non_positive_gravity() {
        for json in [r#"{ "gravity": -9.81 }"#, r#"{ "gravity": 0.0 }"#] {
            let err = Tuning::from_json(json).unwrap_err();
            assert!(matches!(
                err,
                TuningError::Invalid {
                    field: "gravity",
                    ..
                }
            ));
        }

        let tuning = Tuning {
            ground_level: f32::NAN,
            ..Tuning::default()
        };
        assert!(matches!(
            tuning.validate(),
            Err(TuningError::Invalid {
                field: "ground_level",
                ..
            })
        ));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            Tuning::from_json("not json"),
            Err(TuningError::Parse(_))
        ));
    }

    #[test]
    fn test_map_bounds_for_terrain() {
        let b = MapBounds::for_terrain(500.0);
        assert_eq!(b.forward, 10.0);
        assert_eq!(b.backward, -230.0);
        assert_eq!(b.left, 230.0);
        assert_eq!(b.right, -230.0);
    }

    #[test]
    fn test_map_bounds_left_is_avatar_left() {
        // At yaw 0 the avatar's left points at +X, so `left` caps the largest X
        let b = MapBounds::for_terrain(500.0);
        assert!(crate::yaw_left(0.0).x > 0.0);
        assert!(b.left > 0.0 && b.right < 0.0);
    }
}
