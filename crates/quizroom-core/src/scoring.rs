//! Round scoring.
//!
//! A correct answer earns up to 100 points, scaled by the share of the
//! round's time that was still on the clock. Asking for a hint halves that
//! base, and short time limits carry a speed multiplier:
//!
//! | Time limit | Tier     | Multiplier |
//! |------------|----------|------------|
//! | 20 s       | Quick    | 1.5        |
//! | 10 s       | Blitz    | 2.0        |
//! | other      | Standard | 1.0        |
//!
//! The tier is keyed on the literal time limit, not on a difficulty setting.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Points for a correct answer with the full time limit remaining.
pub const MAX_BASE_POINTS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedTier {
    Standard,
    Quick,
    Blitz,
}

impl SpeedTier {
    pub fn from_time_limit(time_limit_secs: u32) -> Self {
        match time_limit_secs {
            20 => SpeedTier::Quick,
            10 => SpeedTier::Blitz,
            _ => SpeedTier::Standard,
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            SpeedTier::Standard => 1.0,
            SpeedTier::Quick => 1.5,
            SpeedTier::Blitz => 2.0,
        }
    }
}

/// Score a single round.
///
/// `time_remaining_secs` is the countdown value captured when the answer
/// locked. Values above the limit are clamped to it.
pub fn compute_round_score(
    correct: bool,
    time_limit_secs: u32,
    time_remaining_secs: u32,
    hint_used: bool,
) -> u32 {
    if !correct || time_limit_secs == 0 {
        return 0;
    }

    if time_remaining_secs > time_limit_secs {
        debug!(
            remaining = time_remaining_secs,
            limit = time_limit_secs,
            "remaining time exceeds limit, clamping"
        );
    }
    let remaining = time_remaining_secs.min(time_limit_secs);
    let mut base = remaining as f64 / time_limit_secs as f64 * MAX_BASE_POINTS;
    if hint_used {
        base /= 2.0;
    }

    let score = (base * SpeedTier::from_time_limit(time_limit_secs).multiplier()).round();
    score.max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn full_time_quick_tier() {
        assert_eq!(compute_round_score(true, 20, 20, false), 150);
    }

    #[test]
    fn full_time_blitz_tier_with_hint() {
        assert_eq!(compute_round_score(true, 10, 10, true), 100);
    }

    #[test]
    fn standard_tier_full_time_is_one_hundred() {
        assert_eq!(compute_round_score(true, 180, 180, false), 100);
        assert_eq!(compute_round_score(true, 180, 180, true), 50);
    }

    #[test]
    fn rounds_half_up() {
        // 1/8 * 100 = 12.5
        assert_eq!(compute_round_score(true, 8, 1, false), 13);
        // 1/3 * 100 = 33.33
        assert_eq!(compute_round_score(true, 3, 1, false), 33);
    }

    #[test]
    fn timed_out_round_scores_zero_even_when_correct() {
        assert_eq!(compute_round_score(true, 180, 0, false), 0);
    }

    #[test]
    fn overrun_remaining_is_clamped_to_limit() {
        assert_eq!(
            compute_round_score(true, 20, 45, false),
            compute_round_score(true, 20, 20, false)
        );
    }

    #[test]
    fn zero_limit_scores_zero() {
        assert_eq!(compute_round_score(true, 0, 0, false), 0);
    }

    #[test]
    fn tier_from_limit() {
        assert_eq!(SpeedTier::from_time_limit(20), SpeedTier::Quick);
        assert_eq!(SpeedTier::from_time_limit(10), SpeedTier::Blitz);
        assert_eq!(SpeedTier::from_time_limit(30), SpeedTier::Standard);
        assert_eq!(SpeedTier::from_time_limit(180), SpeedTier::Standard);
    }

    proptest! {
        #[test]
        fn incorrect_always_scores_zero(
            limit in 0u32..1000,
            remaining in 0u32..1000,
            hint in any::<bool>(),
        ) {
            prop_assert_eq!(compute_round_score(false, limit, remaining, hint), 0);
        }

        #[test]
        fn standard_tier_is_linear_share_of_time(
            limit in 1u32..1000,
            frac in 0.0f64..=1.0,
        ) {
            prop_assume!(limit != 10 && limit != 20);
            let remaining = (limit as f64 * frac).floor() as u32;
            let expected = (remaining as f64 / limit as f64 * 100.0).round() as u32;
            prop_assert_eq!(compute_round_score(true, limit, remaining, false), expected);
        }

        #[test]
        fn hint_never_increases_score(
            limit in 1u32..1000,
            remaining in 0u32..1000,
        ) {
            prop_assert!(
                compute_round_score(true, limit, remaining, true)
                    <= compute_round_score(true, limit, remaining, false)
            );
        }

        #[test]
        fn deterministic(
            correct in any::<bool>(),
            limit in 0u32..1000,
            remaining in 0u32..1000,
            hint in any::<bool>(),
        ) {
            prop_assert_eq!(
                compute_round_score(correct, limit, remaining, hint),
                compute_round_score(correct, limit, remaining, hint)
            );
        }
    }
}
