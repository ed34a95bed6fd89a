//! Draw and release choreography
//!
//! Pressing the draw button starts a single ease-in tween that pulls the
//! string back and twists the torso into the draw posture. Releasing freezes
//! the pull, measures the charge from the press/release timestamps and hands
//! back to the rest posture while the string snaps forward.

use serde::{Deserialize, Serialize};

use super::rig::{Joint, Rig, UpperOwner};
use super::tween::{Easing, Lerp, Tween};
use crate::tuning::Tuning;

/// Hold duration in seconds, clamped to `[0, max_charge]`.
///
/// Timestamps are host clock seconds. A release stamped before its press (a
/// clock anomaly) yields a zero charge instead of a negative one.
pub fn charge(pressed_at: f64, released_at: f64, max_charge: f32) -> f32 {
    let held = released_at - pressed_at;
    if held.is_nan() {
        log::warn!("Draw timestamps are not comparable, charge set to zero");
        return 0.0;
    }
    if held < 0.0 {
        log::warn!("Release stamped {:.3}s before press, charge set to zero", -held);
        return 0.0;
    }
    (held as f32).clamp(0.0, max_charge.max(0.0))
}

/// String pull and posture twist, both driven by one progress value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawPose {
    /// String displacement behind the bow
    pub dz: f32,
    /// Torso twist (radians)
    pub angle: f32,
}

impl Lerp for DrawPose {
    fn lerp_to(self, to: Self, t: f32) -> Self {
        Self {
            dz: self.dz.lerp_to(to.dz, t),
            angle: self.angle.lerp_to(to.angle, t),
        }
    }
}

/// Y rotations captured when the draw starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct DrawBase {
    spine1: f32,
    spine2: f32,
    spine3: f32,
    arm_l: f32,
    arm_r: f32,
    forearm_r: f32,
    head: f32,
}

impl DrawBase {
    fn capture(rig: &Rig) -> Self {
        let y = |joint| rig.pose.get(joint).y;
        Self {
            spine1: y(Joint::Spine1),
            spine2: y(Joint::Spine2),
            spine3: y(Joint::Spine3),
            arm_l: y(Joint::ArmL),
            arm_r: y(Joint::ArmR),
            forearm_r: y(Joint::ForearmR),
            head: y(Joint::Head),
        }
    }

    /// Spines twist back, the right arm follows, the left arm and head lead
    fn apply(&self, rig: &mut Rig, angle: f32) {
        let pose = &mut rig.pose;
        pose.rotation_mut(Joint::Spine1).y = self.spine1 - angle;
        pose.rotation_mut(Joint::Spine2).y = self.spine2 - angle;
        pose.rotation_mut(Joint::Spine3).y = self.spine3 - angle;
        pose.rotation_mut(Joint::ArmR).y = self.arm_r + angle;
        pose.rotation_mut(Joint::ForearmR).y = self.forearm_r + angle;
        pose.rotation_mut(Joint::ArmL).y = self.arm_l + 3.0 * angle;
        pose.rotation_mut(Joint::Head).y = self.head + 3.0 * angle;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum DrawState {
    Idle,
    Drawing {
        pressed_at: f64,
        tween: Tween<DrawPose>,
        base: DrawBase,
    },
}

/// Measured at release
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Release {
    /// Clamped hold duration (seconds)
    pub charge: f32,
    /// String displacement frozen at release
    pub nocking_amount: f32,
}

/// The bow and its string
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bow {
    state: DrawState,
    /// Current string displacement; the nocked arrow sits this far behind the bow
    string_offset: f32,
    snap: Option<Tween<f32>>,
}

impl Default for Bow {
    fn default() -> Self {
        Self::new()
    }
}

impl Bow {
    pub fn new() -> Self {
        Self {
            state: DrawState::Idle,
            string_offset: 0.0,
            snap: None,
        }
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, DrawState::Drawing { .. })
    }

    pub fn string_offset(&self) -> f32 {
        self.string_offset
    }

    /// Start drawing at host time `at`. The caller must have stopped any
    /// gesture holding the upper body. Returns false if already drawing.
    pub fn begin_draw(&mut self, at: f64, rig: &mut Rig, tuning: &Tuning) -> bool {
        if self.is_drawing() {
            return false;
        }
        if let Some(snap) = self.snap.as_mut() {
            snap.stop();
        }
        self.snap = None;
        self.string_offset = 0.0;

        rig.claim_upper(UpperOwner::Draw);
        let tween = Tween::new(
            DrawPose::default(),
            DrawPose {
                dz: tuning.string_max_stretch,
                angle: tuning.draw_rotation,
            },
            tuning.max_charge,
            Easing::QuadraticIn,
        );
        self.state = DrawState::Drawing {
            pressed_at: at,
            tween,
            base: DrawBase::capture(rig),
        };
        log::debug!("Draw started at {:.3}", at);
        true
    }

    /// Advance the draw or the snap-back and write the posture
    pub fn advance(&mut self, dt: f32, rig: &mut Rig) {
        if let DrawState::Drawing { tween, base, .. } = &mut self.state {
            if tween.advance(dt) {
                log::debug!("Full draw reached");
            }
            let pose = tween.value();
            self.string_offset = pose.dz;
            if rig.upper_owner() == UpperOwner::Draw {
                base.apply(rig, pose.angle);
            }
        }

        if let Some(snap) = self.snap.as_mut() {
            let done = snap.advance(dt);
            self.string_offset = snap.value();
            if done {
                self.snap = None;
            }
        }
    }

    /// Release at host time `at`. Restores the upper body and starts the
    /// string snap-back. `None` when not drawing.
    pub fn release(&mut self, at: f64, rig: &mut Rig, tuning: &Tuning) -> Option<Release> {
        let DrawState::Drawing {
            pressed_at,
            mut tween,
            ..
        } = std::mem::replace(&mut self.state, DrawState::Idle)
        else {
            return None;
        };

        tween.stop();
        let nocking_amount = tween.value().dz;
        let charge = charge(pressed_at, at, tuning.max_charge);

        self.string_offset = nocking_amount;
        self.snap = Some(Tween::new(
            nocking_amount,
            0.0,
            tuning.snap_back_duration,
            Easing::QuadraticOut,
        ));

        rig.release_upper(UpperOwner::Draw);
        rig.restore_upper();

        Some(Release {
            charge,
            nocking_amount,
        })
    }

    pub fn pause(&mut self) {
        if let DrawState::Drawing { tween, .. } = &mut self.state {
            tween.pause();
        }
        if let Some(snap) = self.snap.as_mut() {
            snap.pause();
        }
    }

    pub fn resume(&mut self) {
        if let DrawState::Drawing { tween, .. } = &mut self.state {
            tween.resume();
        }
        if let Some(snap) = self.snap.as_mut() {
            snap.resume();
        }
    }

    /// Freeze everything in place (game over). Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let DrawState::Drawing { tween, .. } = &mut self.state {
            tween.stop();
        }
        if let Some(snap) = self.snap.as_mut() {
            snap.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_charge_scenarios() {
        assert!((charge(10.0, 11.0, 2.0) - 1.0).abs() < 1e-6);
        assert_eq!(charge(10.0, 15.0, 2.0), 2.0);
        assert_eq!(charge(10.0, 10.0, 2.0), 0.0);
    }

    #[test]
    fn test_charge_clock_anomalies_clamp() {
        assert_eq!(charge(10.0, 9.0, 2.0), 0.0);
        assert_eq!(charge(f64::NAN, 9.0, 2.0), 0.0);
    }

    #[test]
    fn test_draw_posture_and_release() {
        let tuning = Tuning::default();
        let mut rig = Rig::neutral();
        let mut bow = Bow::new();

        assert!(bow.begin_draw(0.0, &mut rig, &tuning));
        assert!(!bow.begin_draw(0.1, &mut rig, &tuning));
        assert_eq!(rig.upper_owner(), UpperOwner::Draw);

        for _ in 0..60 {
            bow.advance(1.0 / 60.0, &mut rig);
        }
        // Quadratic-in over max_charge: a quarter of the way at half time
        let expected = tuning.string_max_stretch * 0.25;
        assert!((bow.string_offset() - expected).abs() < 0.05);
        let spine = rig.pose.get(Joint::Spine1).y;
        let head = rig.pose.get(Joint::Head).y;
        assert!(spine < 0.0);
        assert!((head + 3.0 * spine).abs() < 1e-5);

        let release = bow.release(1.0, &mut rig, &tuning).unwrap();
        assert!((release.charge - 1.0).abs() < 1e-6);
        assert!((release.nocking_amount - expected).abs() < 0.05);
        assert_eq!(rig.upper_owner(), UpperOwner::Free);
        assert_eq!(rig.pose.get(Joint::Spine1), rig.rest(Joint::Spine1));

        // Snap-back returns the string to rest within its duration
        bow.advance(tuning.snap_back_duration, &mut rig);
        assert_eq!(bow.string_offset(), 0.0);
        assert!(bow.release(2.0, &mut rig, &tuning).is_none());
    }

    #[test]
    fn test_full_draw_holds_at_max() {
        let tuning = Tuning::default();
        let mut rig = Rig::neutral();
        let mut bow = Bow::new();
        bow.begin_draw(0.0, &mut rig, &tuning);
        bow.advance(tuning.max_charge + 1.0, &mut rig);
        assert!((bow.string_offset() - tuning.string_max_stretch).abs() < 1e-5);
        let release = bow.release(5.0, &mut rig, &tuning).unwrap();
        assert_eq!(release.charge, tuning.max_charge);
    }

    #[test]
    fn test_paused_draw_keeps_progress() {
        let tuning = Tuning::default();
        let mut rig = Rig::neutral();
        let mut bow = Bow::new();
        bow.begin_draw(0.0, &mut rig, &tuning);
        bow.advance(0.5, &mut rig);
        let held = bow.string_offset();
        bow.pause();
        bow.advance(1.0, &mut rig);
        assert_eq!(bow.string_offset(), held);
        bow.resume();
        bow.advance(0.5, &mut rig);
        assert!(bow.string_offset() > held);
        bow.stop();
        bow.stop();
    }

    proptest! {
        #[test]
        fn prop_charge_bounded_and_monotonic(
            press in 0.0f64..1000.0,
            a in 0.0f64..10.0,
            b in 0.0f64..10.0,
            max in 0.1f32..5.0,
        ) {
            let (short, long) = if a <= b { (a, b) } else { (b, a) };
            let c_short = charge(press, press + short, max);
            let c_long = charge(press, press + long, max);
            prop_assert!(c_short >= 0.0 && c_short <= max);
            prop_assert!(c_long >= 0.0 && c_long <= max);
            prop_assert!(c_short <= c_long);
        }
    }
}
