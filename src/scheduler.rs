//! SM-2 review scheduling.
//!
//! `schedule` is a pure function: it takes a quality score, the item's current
//! state and the review time, and returns the next state. No I/O happens here.

use crate::rating::Quality;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ease factor assigned to an item that has never been reviewed
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// Ease factor never drops below this
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Interval after the first successful review (days)
const FIRST_INTERVAL: u32 = 1;

/// Interval after the second consecutive successful review (days)
const SECOND_INTERVAL: u32 = 6;

/// Interval after a lapse (days)
const LAPSE_INTERVAL: u32 = 1;

/// Longest interval ever scheduled (days), roughly a century
pub const MAX_INTERVAL: u32 = 36_500;

/// Scheduling state for one (user, item) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingState {
    /// Consecutive successful reviews since the last lapse
    pub repetitions: u32,
    pub ease_factor: f64,
    /// Days until the next review; 0 only for an item never reviewed
    pub interval: u32,
    pub next_review_date: DateTime<Utc>,
    pub last_review_date: DateTime<Utc>,
    pub last_quality: Quality,
}

impl SchedulingState {
    /// State for an item reviewed for the first time at `now`
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            repetitions: 0,
            ease_factor: INITIAL_EASE_FACTOR,
            interval: 0,
            next_review_date: now,
            last_review_date: now,
            last_quality: Quality::BLACKOUT,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }
}

/// What a single review produced, as returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub next_review_date: DateTime<Utc>,
    pub interval: u32,
    pub ease_factor: f64,
    pub repetitions: u32,
    /// True when this review moved the item out of the "new" state
    pub is_graduated: bool,
}

/// Next state plus the caller-facing summary of the transition
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: SchedulingState,
    pub outcome: ReviewOutcome,
}

/// SM-2 ease factor update, floored at `MIN_EASE_FACTOR`
pub fn next_ease_factor(ease_factor: f64, quality: Quality) -> f64 {
    let miss = 5.0 - f64::from(quality.value());
    (ease_factor + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASE_FACTOR)
}

/// Schedule an item based on a review of the given quality at `now`
pub fn schedule(quality: Quality, current: &SchedulingState, now: DateTime<Utc>) -> Transition {
    let ease_factor = next_ease_factor(current.ease_factor, quality);
    let mut is_graduated = false;

    let (interval, repetitions) = if quality.is_pass() {
        let interval = match current.repetitions {
            0 => {
                is_graduated = true;
                FIRST_INTERVAL
            }
            1 => SECOND_INTERVAL,
            _ => grown_interval(current.interval, ease_factor),
        };
        (interval, current.repetitions.saturating_add(1))
    } else {
        (LAPSE_INTERVAL, 0)
    };

    let next_review_date = now
        .checked_add_signed(Duration::days(i64::from(interval)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    debug!(
        quality = quality.value(),
        repetitions,
        interval,
        ease_factor,
        is_graduated,
        "scheduled review"
    );

    Transition {
        state: SchedulingState {
            repetitions,
            ease_factor,
            interval,
            next_review_date,
            last_review_date: now,
            last_quality: quality,
        },
        outcome: ReviewOutcome {
            next_review_date,
            interval,
            ease_factor,
            repetitions,
            is_graduated,
        },
    }
}

/// Geometric growth for the third and later successes
fn grown_interval(previous: u32, ease_factor: f64) -> u32 {
    let grown = (f64::from(previous) * ease_factor).round();
    // interval >= 1 after any pass, even for a corrupt row with interval 0
    (grown.min(f64::from(MAX_INTERVAL)) as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
    }

    fn state(repetitions: u32, ease_factor: f64, interval: u32) -> SchedulingState {
        SchedulingState {
            repetitions,
            ease_factor,
            interval,
            ..SchedulingState::initial(now())
        }
    }

    #[test]
    fn test_initial_state() {
        let s = SchedulingState::initial(now());
        assert_eq!(s.repetitions, 0);
        assert_eq!(s.ease_factor, 2.5);
        assert_eq!(s.interval, 0);
        assert_eq!(s.next_review_date, now());
        assert_eq!(s.last_review_date, now());
        assert_eq!(s.last_quality, Quality::BLACKOUT);
    }

    #[test]
    fn test_first_success_graduates() {
        let t = schedule(Quality::EASY, &state(0, 2.5, 0), now());
        assert_eq!(t.outcome.repetitions, 1);
        assert_eq!(t.outcome.interval, 1);
        assert!(t.outcome.is_graduated);
        // q=4 leaves the ease factor unchanged: 0.1 - 1 * (0.08 + 0.02) == 0
        let expected = 2.5 + (0.1 - 1.0 * (0.08 + 1.0 * 0.02));
        assert!((t.outcome.ease_factor - expected).abs() < 1e-9);
    }

    #[test]
    fn test_second_success_six_days() {
        let t = schedule(Quality::EASY, &state(1, 2.5, 1), now());
        assert_eq!(t.outcome.repetitions, 2);
        assert_eq!(t.outcome.interval, 6);
        assert!(!t.outcome.is_graduated);
    }

    #[test]
    fn test_third_success_multiplies_by_new_ease() {
        let t = schedule(Quality::PERFECT, &state(2, 2.5, 6), now());
        assert_eq!(t.outcome.repetitions, 3);
        // ease 2.5 -> 2.6, 6 * 2.6 = 15.6 -> 16
        assert!((t.outcome.ease_factor - 2.6).abs() < 1e-9);
        assert_eq!(t.outcome.interval, 16);
    }

    #[test]
    fn test_later_success_rounds() {
        let t = schedule(Quality::MEDIUM, &state(4, 2.0, 10), now());
        let ease = next_ease_factor(2.0, Quality::MEDIUM);
        assert_eq!(t.outcome.interval, (10.0 * ease).round() as u32);
        assert_eq!(t.outcome.repetitions, 5);
    }

    #[test]
    fn test_lapse_resets() {
        let t = schedule(Quality::HARD, &state(2, 2.5, 6), now());
        assert_eq!(t.outcome.repetitions, 0);
        assert_eq!(t.outcome.interval, 1);
        assert!(t.outcome.ease_factor < 2.5);
        assert!(!t.outcome.is_graduated);
    }

    #[test]
    fn test_lapse_resets_from_any_state() {
        for q in 0..3 {
            for reps in [0, 1, 2, 7] {
                let t = schedule(Quality::clamped(q), &state(reps, 2.1, 40), now());
                assert_eq!(t.state.repetitions, 0);
                assert_eq!(t.state.interval, 1);
            }
        }
    }

    #[test]
    fn test_ease_floor() {
        for q in 0..=5 {
            for ease in [1.3, 1.35, 1.5, 2.5, 3.1] {
                let t = schedule(Quality::clamped(q), &state(3, ease, 5), now());
                assert!(t.state.ease_factor >= MIN_EASE_FACTOR);
            }
        }
        assert_eq!(next_ease_factor(1.3, Quality::BLACKOUT), MIN_EASE_FACTOR);
    }

    #[test]
    fn test_next_review_date_is_whole_days_from_review() {
        let t = schedule(Quality::EASY, &state(1, 2.5, 1), now());
        assert_eq!(t.state.last_review_date, now());
        assert_eq!(t.state.next_review_date, now() + Duration::days(6));
        assert_eq!(t.outcome.next_review_date, t.state.next_review_date);
    }

    #[test]
    fn test_records_last_quality() {
        let t = schedule(Quality::HARD, &state(0, 2.5, 0), now());
        assert_eq!(t.state.last_quality, Quality::HARD);
    }

    #[test]
    fn test_zero_interval_with_streak_still_advances() {
        let t = schedule(Quality::EASY, &state(2, 2.5, 0), now());
        assert_eq!(t.state.interval, 1);
    }

    #[test]
    fn test_long_easy_streak_is_capped() {
        let mut current = SchedulingState::initial(now());
        for _ in 0..40 {
            let reviewed_at = current.next_review_date;
            let t = schedule(Quality::EASY, &current, reviewed_at);
            assert!(t.state.interval >= 1 && t.state.interval <= MAX_INTERVAL);
            assert_eq!(
                t.state.next_review_date,
                t.state.last_review_date + Duration::days(i64::from(t.state.interval))
            );
            current = t.state;
        }
        assert_eq!(current.interval, MAX_INTERVAL);
        assert_eq!(current.repetitions, 40);
    }

    #[test]
    fn test_review_at_end_of_time_does_not_panic() {
        let t = schedule(Quality::PERFECT, &state(3, 2.5, 30), DateTime::<Utc>::MAX_UTC);
        assert_eq!(t.state.next_review_date, DateTime::<Utc>::MAX_UTC);
    }
}
