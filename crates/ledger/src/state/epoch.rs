//! # Epoch Controller
//!
//! The three epoch phases, each an externally invoked operation:
//!
//! 1. `end_staking_auction` fixes the active table for the coming epoch
//!    as `proposed ∩ approved` and refunds every proposed node that was not
//!    approved (staked → requested, committed → unstaked, cascading to its
//!    delegators).
//! 2. `pay_rewards` credits the stake-proportional payout to every
//!    staked node and delegator, with the operator cut taken out of each
//!    delegator's gross reward.
//! 3. `move_tokens` applies the bucket rotation to every entity exactly
//!    once and recomputes the stake totals, completing the cycle back to
//!    the open auction.
//!
//! Sweeps iterate the node `BTreeMap`, so visit order is deterministic.
//! The per-entity updates are independent; the aggregate totals are
//! recomputed only after the full sweep, never incrementally mid-pass.

use std::collections::BTreeSet;

use staketable_common::{Amount, LedgerError};

use crate::node::NodeId;
use crate::rewards::{split_delegator_reward, RewardScale};
use crate::vault::{EventSink, LedgerEvent, TokenVault};

use super::{EpochPhase, Ledger};

impl<V: TokenVault, E: EventSink> Ledger<V, E> {
    /// Ends the staking auction: `current_table := proposed ∩ approved`.
    ///
    /// Every node that was proposed but is absent from `approved` is
    /// dropped and refunded: its entire staked balance moves to
    /// `requested_unstaking` (flowing out through the normal delay) and its
    /// committed balance goes straight to `unstaked`; the same refund is
    /// applied to each of its delegators. The proposed table is then
    /// recomputed for the next epoch and the stake totals are refreshed.
    ///
    /// Only valid while the auction is open.
    pub fn end_staking_auction(&mut self, approved: &[NodeId]) -> Result<(), LedgerError> {
        if self.state.phase != EpochPhase::AuctionOpen {
            return Err(LedgerError::WrongEpochPhase {
                operation: "end_staking_auction".into(),
                phase: self.state.phase.name().into(),
            });
        }

        let approved: BTreeSet<NodeId> = approved.iter().copied().collect();
        let proposed = self.state.proposed_table.clone();

        let mut excluded: Vec<NodeId> = Vec::new();
        for id in &proposed {
            if approved.contains(id) {
                continue;
            }
            excluded.push(*id);
            let node = self.state.require_node_mut(id)?;
            node.buckets.request_unstake_all();
            for delegator in node.delegators.values_mut() {
                delegator.buckets.request_unstake_all();
            }
        }

        self.state.current_table = proposed
            .intersection(&approved)
            .copied()
            .collect();
        self.state.rebuild_proposed_table();
        self.state.recompute_totals();
        self.state.phase = EpochPhase::Finalized;

        tracing::info!(
            current = self.state.current_table.len(),
            excluded = excluded.len(),
            "staking auction ended"
        );
        self.events.emit(LedgerEvent::AuctionEnded {
            current_table: self.state.current_table.iter().copied().collect(),
            excluded,
        });
        Ok(())
    }

    /// Pays the weekly rewards against the current stake totals.
    ///
    /// The payout scale is one truncating division of the configured
    /// payout by `total_staked`; each staked entity then receives
    /// `staked × scale`. A delegator's gross reward is split with its node
    /// operator according to the node's cut. Entities with zero staked
    /// balance are not visited. With `total_staked == 0` the run is a
    /// no-op apart from the phase change.
    ///
    /// Only valid once the table is finalized, so a week's rewards cannot
    /// be paid twice.
    pub fn pay_rewards(&mut self) -> Result<(), LedgerError> {
        if self.state.phase != EpochPhase::Finalized {
            return Err(LedgerError::WrongEpochPhase {
                operation: "pay_rewards".into(),
                phase: self.state.phase.name().into(),
            });
        }

        let scale = RewardScale::new(self.state.config.weekly_payout, self.state.total_staked);
        let mut total_paid: Amount = 0;

        for node in self.state.nodes.values_mut() {
            if node.buckets.staked > 0 {
                let reward = scale.reward_for(node.buckets.staked);
                node.buckets.credit_reward(reward);
                total_paid += reward;
            }
            for delegator in node.delegators.values_mut() {
                if delegator.buckets.staked == 0 {
                    continue;
                }
                let gross = scale.reward_for(delegator.buckets.staked);
                let (to_node, to_delegator) =
                    split_delegator_reward(gross, node.delegation_cut);
                node.buckets.credit_reward(to_node);
                delegator.buckets.credit_reward(to_delegator);
                total_paid += gross;
            }
        }

        self.state.phase = EpochPhase::RewardsPaid;

        tracing::info!(
            total_paid,
            total_staked = self.state.total_staked,
            "rewards paid"
        );
        self.events.emit(LedgerEvent::RewardsPaid {
            total_paid,
            total_staked: self.state.total_staked,
        });
        Ok(())
    }

    /// Moves every entity's tokens across the epoch boundary:
    ///
    /// ```text
    /// staked'              = staked - requested_unstaking + committed
    /// unstaked'            = unstaked + unstaking
    /// unstaking'           = requested_unstaking
    /// requested_unstaking' = 0
    /// committed'           = 0
    /// ```
    ///
    /// Visits every node and delegator exactly once, then recomputes the
    /// stake totals and the proposed table from the new balances.
    ///
    /// Accepted from any phase: `end_epoch` legitimately skips
    /// `pay_rewards`, and an idle repeat call converges: it only drains the
    /// remaining `unstaking` balance into `unstaked` and then changes
    /// nothing further. Always returns the controller to the open auction.
    pub fn move_tokens(&mut self) {
        for node in self.state.nodes.values_mut() {
            node.buckets.move_tokens();
            for delegator in node.delegators.values_mut() {
                delegator.buckets.move_tokens();
            }
        }

        self.state.recompute_totals();
        self.state.rebuild_proposed_table();
        self.state.phase = EpochPhase::AuctionOpen;

        tracing::info!(total_staked = self.state.total_staked, "tokens moved");
        self.events.emit(LedgerEvent::TokensMoved {
            total_staked: self.state.total_staked,
        });
    }

    /// Composite transition: `end_staking_auction` followed immediately by
    /// `move_tokens`.
    pub fn end_epoch(&mut self, approved: &[NodeId]) -> Result<(), LedgerError> {
        self.end_staking_auction(approved)?;
        self.move_tokens();
        Ok(())
    }

    /// [`end_epoch`](Self::end_epoch) plus an atomic update of the weekly
    /// payout: the new payout takes effect only if the auction transition
    /// succeeds.
    pub fn end_epoch_set_payout(
        &mut self,
        approved: &[NodeId],
        new_payout: Amount,
    ) -> Result<(), LedgerError> {
        self.end_staking_auction(approved)?;
        self.state.config.weekly_payout = new_payout;
        self.move_tokens();
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use staketable_common::{tokens, ErrorKind, NodeRole};

    use crate::node::NodeId;
    use crate::state::EpochPhase;
    use crate::testing::{funded_ledger, node_id_str, owner_addr, TestLedger};

    fn register(ledger: &mut TestLedger, fill: u8, role: u8, commit: u128) -> NodeId {
        ledger
            .register_node(
                &node_id_str(fill),
                role,
                &format!("node-{fill}.example.org:3569"),
                &format!("netkey-{fill}"),
                &format!("stakekey-{fill}"),
                owner_addr(fill),
                tokens(commit),
            )
            .expect("registration")
    }

    #[test]
    fn test_phase_cycle() {
        let mut ledger = funded_ledger();
        assert_eq!(ledger.state().phase(), EpochPhase::AuctionOpen);

        ledger.end_staking_auction(&[]).unwrap();
        assert_eq!(ledger.state().phase(), EpochPhase::Finalized);

        ledger.pay_rewards().unwrap();
        assert_eq!(ledger.state().phase(), EpochPhase::RewardsPaid);

        ledger.move_tokens();
        assert_eq!(ledger.state().phase(), EpochPhase::AuctionOpen);
    }

    #[test]
    fn test_auction_requires_open_phase() {
        let mut ledger = funded_ledger();
        ledger.end_staking_auction(&[]).unwrap();
        let err = ledger.end_staking_auction(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyViolation);
    }

    #[test]
    fn test_rewards_cannot_be_paid_twice() {
        let mut ledger = funded_ledger();
        ledger.end_staking_auction(&[]).unwrap();
        ledger.pay_rewards().unwrap();
        let err = ledger.pay_rewards().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyViolation);
    }

    #[test]
    fn test_commitment_becomes_stake_at_epoch_end() {
        let mut ledger = funded_ledger();
        let id = register(&mut ledger, 1, 1, 250_000);

        ledger.end_epoch(&[id]).unwrap();

        let node = ledger.state().node(&id).unwrap();
        assert_eq!(node.buckets.staked, tokens(250_000));
        assert_eq!(node.buckets.committed, 0);
        assert_eq!(ledger.state().total_staked(), tokens(250_000));
        assert_eq!(
            ledger.state().total_staked_for_role(NodeRole::Collector),
            tokens(250_000)
        );
        assert!(ledger.state().current_table().contains(&id));
    }

    #[test]
    fn test_unapproved_node_refunded_and_dropped() {
        let mut ledger = funded_ledger();
        let approved = register(&mut ledger, 1, 1, 250_000);
        let rejected = register(&mut ledger, 2, 1, 300_000);

        ledger.end_staking_auction(&[approved]).unwrap();

        assert!(ledger.state().current_table().contains(&approved));
        assert!(!ledger.state().current_table().contains(&rejected));
        let node = ledger.state().node(&rejected).unwrap();
        // Never-staked commitment is released immediately.
        assert_eq!(node.buckets.committed, 0);
        assert_eq!(node.buckets.unstaked, tokens(300_000));
    }

    #[test]
    fn test_unapproved_staked_node_flows_out_through_delay() {
        let mut ledger = funded_ledger();
        let a = register(&mut ledger, 1, 1, 250_000);
        let b = register(&mut ledger, 2, 1, 300_000);
        ledger.end_epoch(&[a, b]).unwrap();
        assert_eq!(ledger.state().node(&b).unwrap().buckets.staked, tokens(300_000));

        // Next epoch: b is not approved.
        ledger.end_staking_auction(&[a]).unwrap();
        let node = ledger.state().node(&b).unwrap();
        assert_eq!(node.buckets.requested_unstaking, tokens(300_000));

        ledger.move_tokens();
        let node = ledger.state().node(&b).unwrap();
        assert_eq!(node.buckets.staked, 0);
        assert_eq!(node.buckets.unstaking, tokens(300_000));

        ledger.end_epoch(&[a]).unwrap();
        let node = ledger.state().node(&b).unwrap();
        assert_eq!(node.buckets.unstaking, 0);
        assert_eq!(node.buckets.unstaked, tokens(300_000));
    }

    #[test]
    fn test_exclusion_refunds_delegators() {
        let mut ledger = funded_ledger();
        let a = register(&mut ledger, 1, 1, 250_000);
        let b = register(&mut ledger, 2, 3, 1_400_000);
        let seq = ledger.register_delegator(&b, owner_addr(10)).unwrap();
        ledger.delegator_commit_new(&b, seq, tokens(100_000)).unwrap();
        ledger.end_epoch(&[a, b]).unwrap();

        // b's delegator now has 100 000 staked; exclude b.
        ledger.delegator_commit_new(&b, seq, tokens(2_000)).unwrap();
        ledger.end_staking_auction(&[a]).unwrap();

        let delegator = ledger.state().delegator(&b, seq).unwrap();
        assert_eq!(delegator.buckets.requested_unstaking, tokens(100_000));
        assert_eq!(delegator.buckets.unstaked, tokens(2_000));
    }

    #[test]
    fn test_totals_recomputed_not_drifted() {
        let mut ledger = funded_ledger();
        let a = register(&mut ledger, 1, 1, 250_000);
        let b = register(&mut ledger, 2, 3, 1_400_000);
        let seq = ledger.register_delegator(&b, owner_addr(10)).unwrap();
        ledger.delegator_commit_new(&b, seq, tokens(100_000)).unwrap();

        ledger.end_epoch(&[a, b]).unwrap();
        assert_eq!(ledger.state().total_staked(), tokens(1_750_000));
        assert_eq!(
            ledger.state().total_staked(),
            ledger.state().recomputed_total_staked()
        );
        // Delegator stake counts toward the parent's role.
        assert_eq!(
            ledger.state().total_staked_for_role(NodeRole::Execution),
            tokens(1_500_000)
        );

        ledger.request_unstaking(&a, tokens(50_000)).unwrap();
        ledger.end_epoch(&[a, b]).unwrap();
        assert_eq!(ledger.state().total_staked(), tokens(1_700_000));
        assert_eq!(
            ledger.state().total_staked(),
            ledger.state().recomputed_total_staked()
        );
    }

    #[test]
    fn test_idle_move_tokens_converges() {
        let mut ledger = funded_ledger();
        let a = register(&mut ledger, 1, 1, 250_000);
        ledger.end_epoch(&[a]).unwrap();
        ledger.request_unstaking(&a, tokens(100_000)).unwrap();
        ledger.move_tokens();

        let after_first = ledger.state().node(&a).unwrap().buckets;
        assert_eq!(after_first.unstaking, tokens(100_000));

        ledger.move_tokens();
        let after_second = ledger.state().node(&a).unwrap().buckets;
        assert_eq!(after_second.unstaking, 0);
        assert_eq!(after_second.unstaked, tokens(100_000));

        ledger.move_tokens();
        assert_eq!(ledger.state().node(&a).unwrap().buckets, after_second);
    }

    #[test]
    fn test_end_epoch_set_payout_is_atomic() {
        let mut ledger = funded_ledger();
        let a = register(&mut ledger, 1, 1, 250_000);
        ledger.end_epoch_set_payout(&[a], tokens(4_000_000)).unwrap();
        assert_eq!(ledger.state().config().weekly_payout, tokens(4_000_000));

        // Wrong phase: the payout must not change.
        ledger.end_staking_auction(&[a]).unwrap();
        let err = ledger.end_epoch_set_payout(&[a], tokens(9)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyViolation);
        assert_eq!(ledger.state().config().weekly_payout, tokens(4_000_000));
        ledger.move_tokens();
    }

    #[test]
    fn test_pay_rewards_with_zero_stake_is_noop() {
        let mut ledger = funded_ledger();
        let a = register(&mut ledger, 1, 1, 200_000); // below minimum, never staked
        ledger.end_staking_auction(&[a]).unwrap();
        ledger.pay_rewards().unwrap();
        assert_eq!(ledger.state().node(&a).unwrap().buckets.rewards, 0);
    }
}
