//! Prize wheel
//!
//! The outcome is committed the moment the spin starts and only revealed once
//! the spin animation has run its full duration, so the visible motion can
//! never disagree with the declared result.
//!
//! Angles are in degrees, clockwise, with the pointer fixed at the top. Segment
//! `i` spans `[i * seg, (i + 1) * seg)` at rest.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::wrap_degrees;

/// Uniform random draws, injectable so tests can pin outcomes
pub trait RandomSource {
    /// Uniform integer in `[0, upper)`; `upper` is at least 1
    fn next_index(&mut self, upper: usize) -> usize;
}

impl<R: Rng> RandomSource for R {
    fn next_index(&mut self, upper: usize) -> usize {
        self.random_range(0..upper)
    }
}

/// Always returns the same index (clamped into range)
#[derive(Debug, Clone, Copy)]
pub struct FixedIndex(pub usize);

impl RandomSource for FixedIndex {
    fn next_index(&mut self, upper: usize) -> usize {
        self.0.min(upper.saturating_sub(1))
    }
}

/// Outcome of one spin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpinResult {
    pub chosen_index: usize,
    pub terminal_rotation_degrees: f32,
}

/// Angular size of one segment
#[inline]
pub fn segment_degrees(option_count: usize) -> f32 {
    360.0 / option_count.max(1) as f32
}

/// Rotation that parks the center of `index` under the top pointer
pub fn terminal_rotation(index: usize, option_count: usize, extra_spins: u32) -> f32 {
    let segment = segment_degrees(option_count);
    extra_spins as f32 * 360.0 - (index as f32 * segment + segment / 2.0)
}

/// Which segment sits under the top pointer at `rotation`
pub fn segment_under_pointer(rotation: f32, option_count: usize) -> usize {
    let count = option_count.max(1);
    let angle = wrap_degrees(-rotation);
    ((angle / segment_degrees(count)) as usize).min(count - 1)
}

/// Fair selection plus terminal rotation
pub struct WheelRandomizer {
    source: Box<dyn RandomSource>,
    extra_spins: u32,
}

impl WheelRandomizer {
    pub fn new(seed: u64, extra_spins: u32) -> Self {
        Self::with_source(Box::new(Pcg32::seed_from_u64(seed)), extra_spins)
    }

    pub fn with_source(source: Box<dyn RandomSource>, extra_spins: u32) -> Self {
        Self { source, extra_spins }
    }

    /// Draw an option uniformly and compute where the wheel must stop
    pub fn spin(&mut self, option_count: usize) -> SpinResult {
        let count = option_count.max(1);
        let chosen_index = self.source.next_index(count).min(count - 1);
        SpinResult {
            chosen_index,
            terminal_rotation_degrees: terminal_rotation(chosen_index, count, self.extra_spins),
        }
    }
}

/// Ease-out cubic, approximating the CSS curve used by the wheel
#[inline]
fn ease_out(t: f32) -> f32 {
    let inv = 1.0 - t.clamp(0.0, 1.0);
    1.0 - inv * inv * inv
}

/// An in-flight spin animation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelSpin {
    result: SpinResult,
    elapsed_ms: f64,
    duration_ms: f64,
}

impl WheelSpin {
    pub fn new(result: SpinResult, duration_ms: f64) -> Self {
        Self {
            result,
            elapsed_ms: 0.0,
            duration_ms: duration_ms.max(0.0),
        }
    }

    /// Advance the animation
    pub fn simulate(mut self, dt_ms: f64) -> Self {
        self.elapsed_ms = (self.elapsed_ms + dt_ms).min(self.duration_ms);
        self
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }

    /// Current displayed rotation
    pub fn rotation(&self) -> f32 {
        if self.duration_ms <= 0.0 {
            return self.result.terminal_rotation_degrees;
        }
        let t = (self.elapsed_ms / self.duration_ms) as f32;
        self.result.terminal_rotation_degrees * ease_out(t)
    }

    /// The outcome, withheld until the animation has finished
    pub fn revealed(&self) -> Option<SpinResult> {
        self.is_finished().then_some(self.result)
    }

    /// The committed outcome regardless of progress
    pub(crate) fn committed(&self) -> SpinResult {
        self.result
    }
}

/// Wheel lifecycle within one Wheel stage entry
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WheelState {
    #[default]
    Idle,
    Spinning(WheelSpin),
    Settled(SpinResult),
    Accepted(SpinResult),
}

impl WheelState {
    /// Only an idle wheel may be spun
    pub fn can_spin(&self) -> bool {
        matches!(self, WheelState::Idle)
    }

    /// Rotation to display
    pub fn rotation(&self) -> f32 {
        match self {
            WheelState::Idle => 0.0,
            WheelState::Spinning(spin) => spin.rotation(),
            WheelState::Settled(r) | WheelState::Accepted(r) => r.terminal_rotation_degrees,
        }
    }

    /// Outcome visible to the viewer
    pub fn result(&self) -> Option<SpinResult> {
        match self {
            WheelState::Settled(r) | WheelState::Accepted(r) => Some(*r),
            _ => None,
        }
    }

    /// Advance the animation; returns the result on the frame it settles
    pub fn simulate(&mut self, dt_ms: f64) -> Option<SpinResult> {
        let WheelState::Spinning(spin) = self else {
            return None;
        };
        *spin = spin.simulate(dt_ms);
        let result = spin.revealed()?;
        *self = WheelState::Settled(result);
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_six_options_index_zero() {
        let mut wheel = WheelRandomizer::with_source(Box::new(FixedIndex(0)), 5);
        let result = wheel.spin(6);
        assert_eq!(result.chosen_index, 0);
        // 1800 - (0 * 60 + 30)
        assert_eq!(result.terminal_rotation_degrees, 1770.0);
        // Segment 0 spans 0..60 at rest; its center (30) lands under the pointer
        assert_eq!(wrap_degrees(result.terminal_rotation_degrees + 30.0), 0.0);
        assert_eq!(segment_under_pointer(result.terminal_rotation_degrees, 6), 0);
    }

    #[test]
    fn test_single_option() {
        let mut wheel = WheelRandomizer::new(7, 5);
        let result = wheel.spin(1);
        assert_eq!(result.chosen_index, 0);
        assert_eq!(result.terminal_rotation_degrees, 1620.0);
    }

    #[test]
    fn test_fixed_index_clamps() {
        let mut wheel = WheelRandomizer::with_source(Box::new(FixedIndex(99)), 5);
        assert_eq!(wheel.spin(4).chosen_index, 3);
    }

    #[test]
    fn test_draws_are_roughly_uniform() {
        let mut wheel = WheelRandomizer::new(12345, 5);
        let mut counts = [0u32; 6];
        for _ in 0..6000 {
            counts[wheel.spin(6).chosen_index] += 1;
        }
        for c in counts {
            assert!((800..1200).contains(&c), "skewed counts: {counts:?}");
        }
    }

    #[test]
    fn test_commit_early_reveal_late() {
        let mut wheel = WheelRandomizer::with_source(Box::new(FixedIndex(2)), 5);
        let result = wheel.spin(6);
        let mut state = WheelState::Spinning(WheelSpin::new(result, 3500.0));

        assert_eq!(state.simulate(3499.0), None);
        assert_eq!(state.result(), None);
        if let WheelState::Spinning(spin) = &state {
            assert_eq!(spin.committed().chosen_index, 2);
            assert!(spin.rotation() < result.terminal_rotation_degrees);
        } else {
            panic!("wheel should still be spinning");
        }

        assert_eq!(state.simulate(1.0), Some(result));
        assert_eq!(state.result(), Some(result));
        assert!(!state.can_spin());
        assert_eq!(state.rotation(), result.terminal_rotation_degrees);
    }

    #[test]
    fn test_simulate_is_noop_when_not_spinning() {
        let result = SpinResult {
            chosen_index: 1,
            terminal_rotation_degrees: 1710.0,
        };
        let mut state = WheelState::Idle;
        assert_eq!(state.simulate(16.0), None);
        assert_eq!(state, WheelState::Idle);

        let mut state = WheelState::Settled(result);
        assert_eq!(state.simulate(16.0), None);
        assert_eq!(state, WheelState::Settled(result));
    }

    #[test]
    fn test_rotation_is_monotonic() {
        let spin = WheelSpin::new(
            SpinResult {
                chosen_index: 0,
                terminal_rotation_degrees: 1770.0,
            },
            3500.0,
        );
        let mut last = spin.rotation();
        let mut spin = spin;
        for _ in 0..220 {
            spin = spin.simulate(16.0);
            assert!(spin.rotation() >= last);
            last = spin.rotation();
        }
        assert_eq!(last, 1770.0);
    }

    proptest! {
        #[test]
        fn prop_spin_centers_on_chosen_segment(count in 1usize..=36, seed in any::<u64>()) {
            let mut wheel = WheelRandomizer::new(seed, 5);
            let result = wheel.spin(count);
            prop_assert!(result.chosen_index < count);

            let segment = segment_degrees(count);
            let center = result.chosen_index as f32 * segment + segment / 2.0;
            let under_pointer = wrap_degrees(-result.terminal_rotation_degrees);
            prop_assert!((under_pointer - center).abs() < 1e-2);
            prop_assert_eq!(
                segment_under_pointer(result.terminal_rotation_degrees, count),
                result.chosen_index
            );
        }

        #[test]
        fn prop_forced_index_lands(count in 1usize..=24, pick in 0usize..24) {
            let index = pick % count;
            let rotation = terminal_rotation(index, count, 5);
            prop_assert_eq!(segment_under_pointer(rotation, count), index);
            prop_assert!(rotation > 360.0 * 4.0);
        }
    }
}
