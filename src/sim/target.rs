//! The moving target
//!
//! Difficulty picks a looping waypoint path around the start position: none
//! on easy, a side-to-side slide on medium and a figure-eight on hard.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use super::tween::{Chain, Phase, stop_slot};
use crate::consts::{BULLSEYE_HALF_EXTENTS, BULLSEYE_OFFSET, TARGET_BODY_HALF_EXTENTS};
use crate::settings::Difficulty;

/// Waypoint path for a difficulty. `cycle` is the base loop time in seconds,
/// `width` the terrain width the path scales with.
pub fn path_for(difficulty: Difficulty, start: Vec3, width: f32, cycle: f32) -> Vec<Phase<Vec3>> {
    match difficulty {
        Difficulty::Easy => Vec::new(),
        Difficulty::Medium => {
            let x_limit = 0.1 * width;
            let at_x = |x: f32| Vec3::new(x, start.y, start.z);
            vec![
                Phase::new(at_x(-x_limit), 0.5 * cycle),
                Phase::new(at_x(x_limit), cycle),
                Phase::new(at_x(0.0), 0.5 * cycle),
            ]
        }
        Difficulty::Hard => {
            let xl = 0.25 * width;
            let zl = xl;
            let at = |dx: f32, dz: f32| start + Vec3::new(dx, 0.0, dz);

            let a = start;
            // Right loop
            let b = at(0.5 * xl, -0.5 * zl);
            let c = at(xl, 0.0);
            let d = at(0.5 * xl, 0.5 * zl);
            // Left loop
            let e = at(-0.5 * xl, -0.5 * zl);
            let f = at(-xl, 0.0);
            let g = at(-0.5 * xl, 0.5 * zl);

            let leg = 0.25 * cycle;
            [b, c, d, a, e, f, g, a]
                .into_iter()
                .map(|waypoint| Phase::new(waypoint, leg))
                .collect()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub position: Vec3,
    pub start: Vec3,
    path: Option<Chain<Vec3>>,
}

impl Target {
    pub fn new(start: Vec3, difficulty: Difficulty, width: f32, cycle: f32) -> Self {
        let phases = path_for(difficulty, start, width, cycle);
        let path = (!phases.is_empty()).then(|| Chain::new(start, phases, true));
        log::info!(
            "Difficulty {}: target {}",
            difficulty.as_str(),
            if path.is_some() { "moving" } else { "still" }
        );
        Self {
            position: start,
            start,
            path,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.path.as_ref().is_some_and(|p| p.is_live())
    }

    pub fn advance(&mut self, dt: f32) {
        if let Some(path) = self.path.as_mut() {
            path.advance(dt);
            self.position = path.value();
        }
    }

    pub fn pause(&mut self) {
        if let Some(path) = self.path.as_mut() {
            path.pause();
        }
    }

    pub fn resume(&mut self) {
        if let Some(path) = self.path.as_mut() {
            path.resume();
        }
    }

    /// Stop moving for good; the target stays where it is
    pub fn stop(&mut self) {
        stop_slot(&mut self.path);
    }

    /// Whole target stand
    pub fn body_aabb(&self) -> Aabb {
        Aabb::from_center_half_extents(
            self.position + Vec3::Y * TARGET_BODY_HALF_EXTENTS.y,
            TARGET_BODY_HALF_EXTENTS,
        )
    }

    /// Scoring face
    pub fn bullseye_aabb(&self) -> Aabb {
        Aabb::from_center_half_extents(self.position + BULLSEYE_OFFSET, BULLSEYE_HALF_EXTENTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: Vec3 = Vec3::new(0.0, 0.0, 100.0);

    #[test]
    fn test_easy_target_stands_still() {
        let mut target = Target::new(START, Difficulty::Easy, 500.0, 5.0);
        assert!(!target.is_moving());
        target.advance(3.0);
        assert_eq!(target.position, START);
    }

    #[test]
    fn test_medium_target_slides_on_x() {
        let mut target = Target::new(START, Difficulty::Medium, 500.0, 5.0);
        target.advance(2.5);
        assert!((target.position.x + 50.0).abs() < 1e-3);
        target.advance(5.0);
        assert!((target.position.x - 50.0).abs() < 1e-3);
        assert_eq!(target.position.z, START.z);
        // Full loop back to the middle
        target.advance(2.5);
        assert!(target.position.x.abs() < 1e-3);
    }

    #[test]
    fn test_hard_target_figure_eight() {
        let phases = path_for(Difficulty::Hard, START, 500.0, 5.0);
        assert_eq!(phases.len(), 8);
        assert_eq!(phases[3].target, START);
        assert_eq!(phases[7].target, START);
        assert!((phases[1].target.x - 125.0).abs() < 1e-4);
        assert!((phases[5].target.x + 125.0).abs() < 1e-4);

        let mut target = Target::new(START, Difficulty::Hard, 500.0, 5.0);
        target.advance(1.25);
        assert!((target.position - phases[0].target).length() < 1e-3);
    }

    #[test]
    fn test_paused_and_stopped_target_hold_position() {
        let mut target = Target::new(START, Difficulty::Medium, 500.0, 5.0);
        target.advance(1.0);
        target.pause();
        let held = target.position;
        target.advance(1.0);
        assert_eq!(target.position, held);
        target.resume();
        target.stop();
        target.stop();
        target.advance(1.0);
        assert_eq!(target.position, held);
        assert!(!target.is_moving());
    }

    #[test]
    fn test_bullseye_inside_body() {
        let target = Target::new(START, Difficulty::Easy, 500.0, 5.0);
        assert!(target.body_aabb().intersects(&target.bullseye_aabb()));
    }
}
