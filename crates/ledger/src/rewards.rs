//! # Epoch Reward Computation
//!
//! Pure arithmetic for the weekly payout. The payout is proportional to
//! stake, with one ordering rule that is load-bearing for exactness:
//!
//! ```text
//! scale           = weekly_payout / total_staked      (one truncating division)
//! entity_reward   = entity.staked * scale             (truncating multiply)
//! node_cut        = delegator_reward * cut            (truncating multiply)
//! delegator_keeps = delegator_reward - node_cut
//! ```
//!
//! The scale is computed **once** per payout and every entity's reward is a
//! single multiplication against it. Multiplying first and dividing per
//! entity produces different trailing decimals and does not match the
//! verified payout history (see the tests).
//!
//! `total_staked == 0` skips the division entirely; every reward is zero.

use staketable_common::{fix_div, fix_mul, Amount};

/// Payout scale for one reward run: `weekly_payout / total_staked`,
/// truncated to 8 decimals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewardScale {
    scale: Amount,
}

impl RewardScale {
    /// Computes the scale for a payout run.
    #[must_use]
    pub fn new(total_payout: Amount, total_staked: Amount) -> Self {
        let scale = if total_staked == 0 {
            0
        } else {
            fix_div(total_payout, total_staked)
        };
        RewardScale { scale }
    }

    /// Gross reward for an entity with the given staked balance.
    #[must_use]
    pub fn reward_for(&self, staked: Amount) -> Amount {
        fix_mul(staked, self.scale)
    }
}

/// Splits a delegator's gross reward between the node operator and the
/// delegator. `cut` is a fraction of 1.0 in 8-decimal units.
///
/// Returns `(to_node, to_delegator)`; the two always sum to `gross`.
#[must_use]
pub fn split_delegator_reward(gross: Amount, cut: Amount) -> (Amount, Amount) {
    let to_node = fix_mul(gross, cut);
    (to_node, gross - to_node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use staketable_common::tokens;

    // Reference payout run: weekly payout 1 250 000.0 over a total stake of
    // 3 720 000.0 at an 8% cut. The expected values are the verified payout
    // history literals.

    const PAYOUT: Amount = tokens(1_250_000);
    const TOTAL_STAKED: Amount = tokens(3_720_000);
    const CUT: Amount = 8_000_000; // 0.08

    #[test]
    fn test_scale_truncates_at_eight_decimals() {
        let scale = RewardScale::new(PAYOUT, TOTAL_STAKED);
        // 1 250 000 / 3 720 000 = 0.336021505376... -> 0.33602150
        assert_eq!(scale, RewardScale { scale: 33_602_150 });
    }

    #[test]
    fn test_node_own_stake_reward() {
        let scale = RewardScale::new(PAYOUT, TOTAL_STAKED);
        // 1 400 000.0 * 0.33602150 = 470 430.10000000
        assert_eq!(scale.reward_for(tokens(1_400_000)), 47_043_010_000_000);
    }

    #[test]
    fn test_delegator_gross_reward() {
        let scale = RewardScale::new(PAYOUT, TOTAL_STAKED);
        // 100 000.0 * 0.33602150 = 33 602.15000000
        assert_eq!(scale.reward_for(tokens(100_000)), 3_360_215_000_000);
    }

    #[test]
    fn test_delegator_split_at_eight_percent() {
        let scale = RewardScale::new(PAYOUT, TOTAL_STAKED);
        let gross = scale.reward_for(tokens(100_000));
        let (to_node, to_delegator) = split_delegator_reward(gross, CUT);
        // node cut: 33 602.15 * 0.08 = 2 688.17200000
        assert_eq!(to_node, 268_817_200_000);
        // delegator keeps 30 913.97800000
        assert_eq!(to_delegator, 3_091_397_800_000);
        assert_eq!(to_node + to_delegator, gross);
    }

    #[test]
    fn test_second_delegator_double_stake() {
        let scale = RewardScale::new(PAYOUT, TOTAL_STAKED);
        let gross = scale.reward_for(tokens(200_000));
        let (_, to_delegator) = split_delegator_reward(gross, CUT);
        // 61 827.95600000
        assert_eq!(to_delegator, 6_182_795_600_000);
    }

    #[test]
    fn test_scale_first_ordering_is_load_bearing() {
        // The naive multiply-then-divide order yields 30 913.97849462 for
        // the 100 000 delegator; the verified history says 30 913.978.
        let naive_gross = PAYOUT * tokens(100_000) / TOTAL_STAKED;
        let (_, naive_net) = split_delegator_reward(naive_gross, CUT);
        assert_eq!(naive_net, 3_091_397_849_462);

        let scale = RewardScale::new(PAYOUT, TOTAL_STAKED);
        let (_, net) = split_delegator_reward(scale.reward_for(tokens(100_000)), CUT);
        assert_ne!(net, naive_net);
        assert_eq!(net, 3_091_397_800_000);
    }

    #[test]
    fn test_zero_total_staked_pays_nothing() {
        let scale = RewardScale::new(PAYOUT, 0);
        assert_eq!(scale.reward_for(tokens(1_000_000)), 0);
    }

    #[test]
    fn test_zero_stake_earns_nothing() {
        let scale = RewardScale::new(PAYOUT, TOTAL_STAKED);
        assert_eq!(scale.reward_for(0), 0);
    }

    #[test]
    fn test_full_cut_and_no_cut() {
        let (all, none) = split_delegator_reward(1_000, 100_000_000);
        assert_eq!((all, none), (1_000, 0));
        let (zero, full) = split_delegator_reward(1_000, 0);
        assert_eq!((zero, full), (0, 1_000));
    }
}
