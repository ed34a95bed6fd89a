//! Interpolation segments
//!
//! A `Tween` eases one value from a start to an end over a fixed duration. A
//! `Chain` strings several eased phases together and optionally loops, which
//! is how gait cycles and target paths are expressed. Both are plain state
//! advanced once per frame by the owner; there are no completion callbacks.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Easing curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Easing {
    #[default]
    Linear,
    QuadraticIn,
    QuadraticOut,
    QuadraticInOut,
}

impl Easing {
    /// Map linear progress in [0, 1] onto the curve
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadraticIn => t * t,
            Easing::QuadraticOut => t * (2.0 - t),
            Easing::QuadraticInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

/// Values that can be interpolated
pub trait Lerp: Copy {
    fn lerp_to(self, to: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    #[inline]
    fn lerp_to(self, to: Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for Vec3 {
    #[inline]
    fn lerp_to(self, to: Self, t: f32) -> Self {
        self.lerp(to, t)
    }
}

/// Playback status shared by tweens and chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Playback {
    Running,
    Paused,
    /// Reached the end on its own
    Finished,
    /// Cancelled by its owner
    Stopped,
}

impl Playback {
    pub fn is_live(self) -> bool {
        matches!(self, Playback::Running | Playback::Paused)
    }
}

/// A single eased interpolation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tween<T> {
    pub from: T,
    pub to: T,
    pub duration: f32,
    pub easing: Easing,
    elapsed: f32,
    status: Playback,
}

impl<T: Lerp> Tween<T> {
    /// Start a running tween
    pub fn new(from: T, to: T, duration: f32, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration: duration.max(0.0),
            easing,
            elapsed: 0.0,
            status: Playback::Running,
        }
    }

    /// Advance by `dt` seconds. Returns true on the frame the tween finishes.
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.status != Playback::Running {
            return false;
        }
        self.elapsed += dt.max(0.0);
        if self.elapsed >= self.duration {
            self.elapsed = self.duration;
            self.status = Playback::Finished;
            return true;
        }
        false
    }

    /// Linear progress in [0, 1]
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    /// Current interpolated value
    pub fn value(&self) -> T {
        self.from.lerp_to(self.to, self.easing.apply(self.progress()))
    }

    pub fn status(&self) -> Playback {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == Playback::Running
    }

    /// Freeze progress; no-op unless running
    pub fn pause(&mut self) {
        if self.status == Playback::Running {
            self.status = Playback::Paused;
        }
    }

    /// Continue from the paused fraction; no-op unless paused
    pub fn resume(&mut self) {
        if self.status == Playback::Paused {
            self.status = Playback::Running;
        }
    }

    /// Cancel; idempotent, and a finished tween stays finished
    pub fn stop(&mut self) {
        if self.status.is_live() {
            self.status = Playback::Stopped;
        }
    }
}

/// A countdown with no value, used for fixed delays
pub type Delay = Tween<f32>;

impl Delay {
    pub fn seconds(duration: f32) -> Self {
        Tween::new(0.0, 1.0, duration, Easing::Linear)
    }
}

/// One leg of a chain: ease towards `target` over `duration`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Phase<T> {
    pub target: T,
    pub duration: f32,
    pub easing: Easing,
}

impl<T> Phase<T> {
    pub fn new(target: T, duration: f32) -> Self {
        Self {
            target,
            duration,
            easing: Easing::Linear,
        }
    }

    pub fn eased(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

/// A sequence of phases; each starts from where the previous one ended.
/// When `looping`, the last phase wraps back to the first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain<T> {
    phases: Vec<Phase<T>>,
    looping: bool,
    index: usize,
    elapsed: f32,
    phase_start: T,
    current: T,
    status: Playback,
}

impl<T: Lerp> Chain<T> {
    /// Start a running chain from `start`. An empty chain is born finished.
    pub fn new(start: T, phases: Vec<Phase<T>>, looping: bool) -> Self {
        let status = if phases.is_empty() {
            Playback::Finished
        } else {
            Playback::Running
        };
        Self {
            phases,
            looping,
            index: 0,
            elapsed: 0.0,
            phase_start: start,
            current: start,
            status,
        }
    }

    /// Advance by `dt`, carrying leftover time into the following phases.
    pub fn advance(&mut self, dt: f32) {
        if self.status != Playback::Running {
            return;
        }
        let mut remaining = dt.max(0.0);
        // Bounded so a degenerate all-zero-duration loop cannot spin forever
        let mut guard = self.phases.len() * 4 + 4;

        loop {
            let phase = self.phases[self.index];
            let left_in_phase = phase.duration - self.elapsed;
            if remaining < left_in_phase {
                self.elapsed += remaining;
                let t = phase.easing.apply(self.elapsed / phase.duration);
                self.current = self.phase_start.lerp_to(phase.target, t);
                return;
            }

            remaining -= left_in_phase.max(0.0);
            self.phase_start = phase.target;
            self.current = phase.target;
            self.elapsed = 0.0;

            if self.index + 1 < self.phases.len() {
                self.index += 1;
            } else if self.looping {
                self.index = 0;
            } else {
                self.status = Playback::Finished;
                return;
            }

            guard -= 1;
            if guard == 0 {
                return;
            }
        }
    }

    pub fn value(&self) -> T {
        self.current
    }

    pub fn phase_index(&self) -> usize {
        self.index
    }

    pub fn status(&self) -> Playback {
        self.status
    }

    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    pub fn pause(&mut self) {
        if self.status == Playback::Running {
            self.status = Playback::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.status == Playback::Paused {
            self.status = Playback::Running;
        }
    }

    /// Cancel every phase at once; idempotent
    pub fn stop(&mut self) {
        if self.status.is_live() {
            self.status = Playback::Stopped;
        }
    }
}

/// Stop an optional chain slot and clear it. Safe on an empty slot.
pub fn stop_slot<T: Lerp>(slot: &mut Option<Chain<T>>) {
    if let Some(chain) = slot.as_mut() {
        chain.stop();
    }
    *slot = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_easing_endpoints() {
        for e in [
            Easing::Linear,
            Easing::QuadraticIn,
            Easing::QuadraticOut,
            Easing::QuadraticInOut,
        ] {
            assert!(e.apply(0.0).abs() < 1e-6);
            assert!((e.apply(1.0) - 1.0).abs() < 1e-6);
        }
        assert!((Easing::QuadraticIn.apply(0.5) - 0.25).abs() < 1e-6);
        assert!((Easing::QuadraticOut.apply(0.5) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_tween_finishes_once() {
        let mut tween = Tween::new(0.0_f32, 10.0, 1.0, Easing::Linear);
        assert!(!tween.advance(0.5));
        assert!((tween.value() - 5.0).abs() < 1e-5);
        assert!(tween.advance(0.6));
        assert_eq!(tween.status(), Playback::Finished);
        assert!((tween.value() - 10.0).abs() < 1e-5);
        // Further frames do nothing
        assert!(!tween.advance(1.0));
    }

    #[test]
    fn test_tween_pause_resume_keeps_progress() {
        let mut tween = Tween::new(0.0_f32, 1.0, 2.0, Easing::Linear);
        tween.advance(0.5);
        tween.pause();
        tween.advance(10.0);
        assert!((tween.progress() - 0.25).abs() < 1e-6);
        tween.resume();
        tween.advance(0.5);
        assert!((tween.progress() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_tween_stop_idempotent() {
        let mut tween = Tween::new(0.0_f32, 1.0, 1.0, Easing::QuadraticIn);
        tween.advance(0.3);
        let value = tween.value();
        tween.stop();
        tween.stop();
        assert_eq!(tween.status(), Playback::Stopped);
        tween.advance(1.0);
        assert_eq!(tween.value(), value);
        // Resume cannot revive a stopped tween
        tween.resume();
        assert_eq!(tween.status(), Playback::Stopped);
    }

    #[test]
    fn test_stop_after_finish_is_noop() {
        let mut tween = Tween::new(0.0_f32, 1.0, 0.1, Easing::Linear);
        tween.advance(1.0);
        tween.stop();
        assert_eq!(tween.status(), Playback::Finished);
    }

    #[test]
    fn test_chain_carries_leftover_time() {
        let mut chain = Chain::new(
            0.0_f32,
            vec![Phase::new(1.0, 1.0), Phase::new(3.0, 1.0)],
            false,
        );
        chain.advance(1.5);
        assert_eq!(chain.phase_index(), 1);
        assert!((chain.value() - 2.0).abs() < 1e-5);
        chain.advance(5.0);
        assert_eq!(chain.status(), Playback::Finished);
        assert!((chain.value() - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_chain_loops_back_to_first_phase() {
        let phases = vec![
            Phase::new(1.0_f32, 0.2),
            Phase::new(-1.0, 0.4),
            Phase::new(0.0, 0.2),
        ];
        let mut chain = Chain::new(0.0, phases, true);
        chain.advance(0.85);
        assert_eq!(chain.phase_index(), 0);
        assert!((chain.value() - 0.25).abs() < 1e-3);
        chain.advance(0.1);
        assert!((chain.value() - 0.75).abs() < 1e-3);
        assert!(chain.is_live());
    }

    #[test]
    fn test_empty_chain_is_finished() {
        let mut chain: Chain<f32> = Chain::new(2.0, Vec::new(), true);
        chain.advance(1.0);
        assert_eq!(chain.status(), Playback::Finished);
        assert_eq!(chain.value(), 2.0);
    }

    #[test]
    fn test_zero_duration_loop_terminates() {
        let mut chain = Chain::new(0.0_f32, vec![Phase::new(1.0, 0.0)], true);
        chain.advance(1.0);
        assert_eq!(chain.value(), 1.0);
    }

    #[test]
    fn test_stop_slot_on_empty() {
        let mut slot: Option<Chain<f32>> = None;
        stop_slot(&mut slot);
        stop_slot(&mut slot);
        assert!(slot.is_none());
    }

    proptest! {
        #[test]
        fn prop_stop_twice_is_same_as_once(steps in proptest::collection::vec(0.0f32..0.5, 0..20)) {
            let mut a = Chain::new(0.0_f32, vec![Phase::new(1.0, 0.3), Phase::new(-1.0, 0.3)], true);
            for dt in &steps {
                a.advance(*dt);
            }
            a.stop();
            let once = (a.status(), a.value(), a.phase_index());
            a.stop();
            a.advance(0.25);
            prop_assert_eq!(once, (a.status(), a.value(), a.phase_index()));
        }

        #[test]
        fn prop_linear_chain_stays_within_keyframes(steps in proptest::collection::vec(0.0f32..0.3, 1..50)) {
            let mut chain = Chain::new(0.0_f32, vec![Phase::new(2.0, 0.2), Phase::new(-2.0, 0.4), Phase::new(0.0, 0.2)], true);
            for dt in steps {
                chain.advance(dt);
                prop_assert!(chain.value() >= -2.0 - 1e-4 && chain.value() <= 2.0 + 1e-4);
            }
        }
    }
}
