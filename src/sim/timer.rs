//! Cancellable stage timers
//!
//! Every delay and interval in the experience lives here so a stage exit can
//! cancel everything it started in one call. Timers are advanced by the frame
//! loop and dispatched one at a time, so a handler may cancel or start timers
//! before the next due one is popped.

use super::stage::ExperienceStage;

/// Shortest interval period; smaller periods are raised to this
pub const MIN_INTERVAL_MS: f64 = 1.0;

/// What a timer is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Reveal one more character of the intro message
    Typewriter,
    /// Hold after the intro message is fully shown
    IntroHold,
    /// Poll the microphone for a blow
    BlowPoll,
    /// Delay between blowing the candles and cake cutting
    Celebration,
    /// Delay between the cut and the gift becoming available
    GiftReveal,
}

#[derive(Debug, Clone)]
struct Timer {
    kind: TimerKind,
    stage: ExperienceStage,
    remaining_ms: f64,
    /// Some for repeating timers
    period_ms: Option<f64>,
}

/// Active timers, at most one per kind
#[derive(Debug, Clone, Default)]
pub struct TimerSet {
    timers: Vec<Timer>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self { timers: Vec::new() }
    }

    /// Start (or restart) a one-shot timer
    pub fn start_once(&mut self, kind: TimerKind, stage: ExperienceStage, delay_ms: f64) {
        self.insert(Timer {
            kind,
            stage,
            remaining_ms: delay_ms.max(0.0),
            period_ms: None,
        });
    }

    /// Start (or restart) a repeating timer; the first fire is one period out
    pub fn start_interval(&mut self, kind: TimerKind, stage: ExperienceStage, period_ms: f64) {
        // f64::max also maps NaN to the minimum
        let period_ms = period_ms.max(MIN_INTERVAL_MS);
        self.insert(Timer {
            kind,
            stage,
            remaining_ms: period_ms,
            period_ms: Some(period_ms),
        });
    }

    fn insert(&mut self, timer: Timer) {
        self.cancel(timer.kind);
        self.timers.push(timer);
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.timers.retain(|t| t.kind != kind);
    }

    /// Cancel every timer started by `stage`
    pub fn cancel_stage(&mut self, stage: ExperienceStage) {
        self.timers.retain(|t| t.stage != stage);
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn is_active(&self, kind: TimerKind) -> bool {
        self.timers.iter().any(|t| t.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Advance all timers by elapsed wall-clock time
    pub fn advance(&mut self, dt_ms: f64) {
        for timer in &mut self.timers {
            timer.remaining_ms -= dt_ms;
        }
    }

    /// Pop the most overdue timer, if any is due.
    ///
    /// One-shot timers are removed; intervals are rescheduled by one period
    /// and may be returned again by the next call if still overdue.
    pub fn next_due(&mut self) -> Option<(TimerKind, ExperienceStage)> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.remaining_ms <= 0.0)
            .min_by(|(_, a), (_, b)| {
                a.remaining_ms
                    .partial_cmp(&b.remaining_ms)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)?;

        let Timer {
            kind,
            stage,
            period_ms,
            ..
        } = self.timers[idx];
        let fired = (kind, stage);
        match period_ms {
            Some(period) => self.timers[idx].remaining_ms += period,
            None => {
                self.timers.swap_remove(idx);
            }
        }
        Some(fired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGE: ExperienceStage = ExperienceStage::IntroAnimation;

    fn drain(timers: &mut TimerSet) -> Vec<TimerKind> {
        std::iter::from_fn(|| timers.next_due().map(|(k, _)| k)).collect()
    }

    #[test]
    fn test_one_shot_fires_once_after_delay() {
        let mut timers = TimerSet::new();
        timers.start_once(TimerKind::IntroHold, STAGE, 3000.0);

        timers.advance(2999.0);
        assert!(drain(&mut timers).is_empty());

        timers.advance(1.0);
        assert_eq!(drain(&mut timers), vec![TimerKind::IntroHold]);
        assert!(timers.is_empty());

        timers.advance(10_000.0);
        assert!(drain(&mut timers).is_empty());
    }

    #[test]
    fn test_interval_catches_up_on_long_frames() {
        let mut timers = TimerSet::new();
        timers.start_interval(TimerKind::Typewriter, STAGE, 50.0);

        timers.advance(160.0);
        assert_eq!(drain(&mut timers).len(), 3);
        assert!(timers.is_active(TimerKind::Typewriter));

        timers.advance(40.0);
        assert_eq!(drain(&mut timers).len(), 1);
    }

    #[test]
    fn test_cancel_between_dispatches() {
        let mut timers = TimerSet::new();
        timers.start_interval(TimerKind::Typewriter, STAGE, 50.0);
        timers.advance(500.0);

        assert!(timers.next_due().is_some());
        timers.cancel(TimerKind::Typewriter);
        assert!(timers.next_due().is_none());
    }

    #[test]
    fn test_cancel_stage_only_touches_that_stage() {
        let mut timers = TimerSet::new();
        timers.start_interval(TimerKind::Typewriter, STAGE, 50.0);
        timers.start_once(TimerKind::Celebration, ExperienceStage::Candles, 2000.0);

        timers.cancel_stage(STAGE);
        assert!(!timers.is_active(TimerKind::Typewriter));
        assert!(timers.is_active(TimerKind::Celebration));
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn test_restart_replaces_existing() {
        let mut timers = TimerSet::new();
        timers.start_once(TimerKind::GiftReveal, ExperienceStage::CakeCutting, 100.0);
        timers.advance(90.0);
        timers.start_once(TimerKind::GiftReveal, ExperienceStage::CakeCutting, 100.0);
        timers.advance(20.0);
        assert!(timers.next_due().is_none());
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn test_zero_period_interval_is_clamped() {
        let mut timers = TimerSet::new();
        timers.start_interval(TimerKind::BlowPoll, ExperienceStage::Candles, 0.0);
        timers.advance(10.0);
        assert_eq!(drain(&mut timers).len(), 10);

        timers.start_interval(TimerKind::BlowPoll, ExperienceStage::Candles, f64::NAN);
        timers.advance(3.0);
        assert_eq!(drain(&mut timers).len(), 3);
    }

    #[test]
    fn test_most_overdue_first() {
        let mut timers = TimerSet::new();
        timers.start_once(TimerKind::GiftReveal, ExperienceStage::CakeCutting, 30.0);
        timers.start_once(TimerKind::Celebration, ExperienceStage::Candles, 10.0);
        timers.advance(50.0);
        assert_eq!(
            drain(&mut timers),
            vec![TimerKind::Celebration, TimerKind::GiftReveal]
        );
    }
}
