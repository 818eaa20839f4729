//! # Stake Operations
//!
//! Routes the primitive bucket mutations to node and delegator records,
//! enforcing the policy gates that only exist at the ledger level:
//!
//! - a node hosting active delegated capital may not partially unstake
//!   below its role minimum (the full `unstake_all` exit is always allowed
//!   and cascades);
//! - deposits and withdrawals go through the token vault *before* any
//!   bucket is written, so a vault failure aborts with no state change.
//!
//! Every operation re-derives the node's proposed-table membership when it
//! can have changed the node's active commitment.

use staketable_common::{Amount, BucketKind, LedgerError};

use crate::node::NodeId;
use crate::vault::{EntityRef, EventSink, LedgerEvent, OperationKind, TokenVault};

use super::Ledger;

impl<V: TokenVault, E: EventSink> Ledger<V, E> {
    // ──────────────────────────────────────────────────────────────────────
    // NODE OPERATIONS
    // ──────────────────────────────────────────────────────────────────────

    /// Deposits `amount` from the node owner's account into `committed`.
    pub fn commit_new(&mut self, id: &NodeId, amount: Amount) -> Result<(), LedgerError> {
        let owner = self.state.require_node(id)?.owner;
        self.vault.deposit(&owner, amount)?;

        let node = self.state.require_node_mut(id)?;
        node.buckets.commit_new(amount);
        let resulting = node.buckets;
        self.state.refresh_proposed_membership(id);

        tracing::debug!(node = %id, amount, "tokens committed");
        self.events.emit(LedgerEvent::BucketsChanged {
            entity: EntityRef::Node { id: *id },
            operation: OperationKind::CommitNew,
            amount,
            bucket: BucketKind::Committed,
            resulting,
        });
        Ok(())
    }

    /// Moves `amount` from the node's `unstaked` bucket back to `committed`.
    pub fn commit_unstaked(&mut self, id: &NodeId, amount: Amount) -> Result<(), LedgerError> {
        let node = self.state.require_node_mut(id)?;
        node.buckets.commit_unstaked(amount)?;
        let resulting = node.buckets;
        self.state.refresh_proposed_membership(id);

        self.events.emit(LedgerEvent::BucketsChanged {
            entity: EntityRef::Node { id: *id },
            operation: OperationKind::CommitUnstaked,
            amount,
            bucket: BucketKind::Unstaked,
            resulting,
        });
        Ok(())
    }

    /// Moves `amount` from the node's `rewards` bucket to `committed`.
    pub fn commit_rewarded(&mut self, id: &NodeId, amount: Amount) -> Result<(), LedgerError> {
        let node = self.state.require_node_mut(id)?;
        node.buckets.commit_rewarded(amount)?;
        let resulting = node.buckets;
        self.state.refresh_proposed_membership(id);

        self.events.emit(LedgerEvent::BucketsChanged {
            entity: EntityRef::Node { id: *id },
            operation: OperationKind::CommitRewarded,
            amount,
            bucket: BucketKind::Rewards,
            resulting,
        });
        Ok(())
    }

    /// Requests a partial unstake of the node's own tokens.
    ///
    /// While any delegator has committed or staked tokens, the request must
    /// leave the node at or above its role minimum; `unstake_all` is the
    /// escape hatch for a full exit.
    pub fn request_unstaking(&mut self, id: &NodeId, amount: Amount) -> Result<(), LedgerError> {
        let node = self.state.require_node(id)?;
        self.state.config.minimums.check_partial_unstake(
            node.role,
            &node.buckets,
            amount,
            node.has_active_delegators(),
        )?;

        let node = self.state.require_node_mut(id)?;
        node.buckets.request_unstaking(amount)?;
        let resulting = node.buckets;
        self.state.refresh_proposed_membership(id);

        tracing::debug!(node = %id, amount, "unstake requested");
        self.events.emit(LedgerEvent::BucketsChanged {
            entity: EntityRef::Node { id: *id },
            operation: OperationKind::RequestUnstaking,
            amount,
            bucket: BucketKind::Staked,
            resulting,
        });
        Ok(())
    }

    /// Requests the full exit for a node and every one of its delegators.
    ///
    /// Always permitted: the minimum-stake floor protects delegators from a
    /// partial drawdown, not from a symmetric full exit.
    pub fn unstake_all(&mut self, id: &NodeId) -> Result<(), LedgerError> {
        let node = self.state.require_node_mut(id)?;
        node.buckets.request_unstake_all();
        let node_resulting = node.buckets;
        let node_requested = node_resulting.requested_unstaking;

        let mut delegator_changes = Vec::with_capacity(node.delegators.len());
        for (seq, delegator) in node.delegators.iter_mut() {
            delegator.buckets.request_unstake_all();
            delegator_changes.push((*seq, delegator.buckets));
        }
        self.state.refresh_proposed_membership(id);

        tracing::info!(node = %id, requested = node_requested, "full unstake requested");
        self.events.emit(LedgerEvent::BucketsChanged {
            entity: EntityRef::Node { id: *id },
            operation: OperationKind::UnstakeAll,
            amount: node_requested,
            bucket: BucketKind::Staked,
            resulting: node_resulting,
        });
        for (seq, resulting) in delegator_changes {
            self.events.emit(LedgerEvent::BucketsChanged {
                entity: EntityRef::Delegator { id: *id, seq },
                operation: OperationKind::UnstakeAll,
                amount: resulting.requested_unstaking,
                bucket: BucketKind::Staked,
                resulting,
            });
        }
        Ok(())
    }

    /// Withdraws `amount` from the node's `unstaked` bucket to its owner.
    pub fn withdraw_unstaked(&mut self, id: &NodeId, amount: Amount) -> Result<(), LedgerError> {
        let node = self.state.require_node(id)?;
        if node.buckets.unstaked < amount {
            return Err(LedgerError::InsufficientBalance {
                bucket: BucketKind::Unstaked,
                requested: amount,
                available: node.buckets.unstaked,
            });
        }
        let owner = node.owner;
        self.vault.withdraw(&owner, amount)?;

        let node = self.state.require_node_mut(id)?;
        node.buckets.withdraw_unstaked(amount)?;
        let resulting = node.buckets;

        self.events.emit(LedgerEvent::BucketsChanged {
            entity: EntityRef::Node { id: *id },
            operation: OperationKind::WithdrawUnstaked,
            amount,
            bucket: BucketKind::Unstaked,
            resulting,
        });
        Ok(())
    }

    /// Withdraws `amount` from the node's `rewards` bucket to its owner.
    pub fn withdraw_rewards(&mut self, id: &NodeId, amount: Amount) -> Result<(), LedgerError> {
        let node = self.state.require_node(id)?;
        if node.buckets.rewards < amount {
            return Err(LedgerError::InsufficientBalance {
                bucket: BucketKind::Rewards,
                requested: amount,
                available: node.buckets.rewards,
            });
        }
        let owner = node.owner;
        self.vault.withdraw(&owner, amount)?;

        let node = self.state.require_node_mut(id)?;
        node.buckets.withdraw_rewards(amount)?;
        let resulting = node.buckets;

        self.events.emit(LedgerEvent::BucketsChanged {
            entity: EntityRef::Node { id: *id },
            operation: OperationKind::WithdrawRewards,
            amount,
            bucket: BucketKind::Rewards,
            resulting,
        });
        Ok(())
    }

    // ──────────────────────────────────────────────────────────────────────
    // DELEGATOR OPERATIONS
    // ──────────────────────────────────────────────────────────────────────

    /// Deposits `amount` from the delegator's account into its `committed`.
    pub fn delegator_commit_new(
        &mut self,
        id: &NodeId,
        seq: u32,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let owner = self.require_delegator(id, seq)?.owner;
        self.vault.deposit(&owner, amount)?;

        let delegator = self.require_delegator_mut(id, seq)?;
        delegator.buckets.commit_new(amount);
        let resulting = delegator.buckets;

        self.events.emit(LedgerEvent::BucketsChanged {
            entity: EntityRef::Delegator { id: *id, seq },
            operation: OperationKind::CommitNew,
            amount,
            bucket: BucketKind::Committed,
            resulting,
        });
        Ok(())
    }

    /// Moves `amount` from the delegator's `unstaked` bucket to `committed`.
    pub fn delegator_commit_unstaked(
        &mut self,
        id: &NodeId,
        seq: u32,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let delegator = self.require_delegator_mut(id, seq)?;
        delegator.buckets.commit_unstaked(amount)?;
        let resulting = delegator.buckets;

        self.events.emit(LedgerEvent::BucketsChanged {
            entity: EntityRef::Delegator { id: *id, seq },
            operation: OperationKind::CommitUnstaked,
            amount,
            bucket: BucketKind::Unstaked,
            resulting,
        });
        Ok(())
    }

    /// Requests a partial unstake of the delegator's tokens. Never
    /// policy-gated: the minimum-stake floor binds node operators only.
    pub fn delegator_request_unstaking(
        &mut self,
        id: &NodeId,
        seq: u32,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let delegator = self.require_delegator_mut(id, seq)?;
        delegator.buckets.request_unstaking(amount)?;
        let resulting = delegator.buckets;

        self.events.emit(LedgerEvent::BucketsChanged {
            entity: EntityRef::Delegator { id: *id, seq },
            operation: OperationKind::RequestUnstaking,
            amount,
            bucket: BucketKind::Staked,
            resulting,
        });
        Ok(())
    }

    /// Withdraws `amount` from the delegator's `unstaked` bucket.
    pub fn delegator_withdraw_unstaked(
        &mut self,
        id: &NodeId,
        seq: u32,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let delegator = self.require_delegator(id, seq)?;
        if delegator.buckets.unstaked < amount {
            return Err(LedgerError::InsufficientBalance {
                bucket: BucketKind::Unstaked,
                requested: amount,
                available: delegator.buckets.unstaked,
            });
        }
        let owner = delegator.owner;
        self.vault.withdraw(&owner, amount)?;

        let delegator = self.require_delegator_mut(id, seq)?;
        delegator.buckets.withdraw_unstaked(amount)?;
        let resulting = delegator.buckets;

        self.events.emit(LedgerEvent::BucketsChanged {
            entity: EntityRef::Delegator { id: *id, seq },
            operation: OperationKind::WithdrawUnstaked,
            amount,
            bucket: BucketKind::Unstaked,
            resulting,
        });
        Ok(())
    }

    /// Withdraws `amount` from the delegator's `rewards` bucket.
    pub fn delegator_withdraw_rewards(
        &mut self,
        id: &NodeId,
        seq: u32,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let delegator = self.require_delegator(id, seq)?;
        if delegator.buckets.rewards < amount {
            return Err(LedgerError::InsufficientBalance {
                bucket: BucketKind::Rewards,
                requested: amount,
                available: delegator.buckets.rewards,
            });
        }
        let owner = delegator.owner;
        self.vault.withdraw(&owner, amount)?;

        let delegator = self.require_delegator_mut(id, seq)?;
        delegator.buckets.withdraw_rewards(amount)?;
        let resulting = delegator.buckets;

        self.events.emit(LedgerEvent::BucketsChanged {
            entity: EntityRef::Delegator { id: *id, seq },
            operation: OperationKind::WithdrawRewards,
            amount,
            bucket: BucketKind::Rewards,
            resulting,
        });
        Ok(())
    }

    // ──────────────────────────────────────────────────────────────────────
    // HELPERS
    // ──────────────────────────────────────────────────────────────────────

    fn require_delegator(
        &self,
        id: &NodeId,
        seq: u32,
    ) -> Result<&crate::node::DelegatorRecord, LedgerError> {
        let node = self.state.require_node(id)?;
        node.delegators
            .get(&seq)
            .ok_or_else(|| LedgerError::DelegatorNotFound { id: id.to_hex(), seq })
    }

    fn require_delegator_mut(
        &mut self,
        id: &NodeId,
        seq: u32,
    ) -> Result<&mut crate::node::DelegatorRecord, LedgerError> {
        let node = self.state.require_node_mut(id)?;
        node.delegators
            .get_mut(&seq)
            .ok_or_else(|| LedgerError::DelegatorNotFound { id: id.to_hex(), seq })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════
