//! # Stake Policy
//!
//! Per-role minimum stake thresholds and the eligibility rules built on
//! them. All checks are pure functions of a role, a [`TokenBuckets`]
//! record, and the configured minimums, with no side effects and no
//! external state.
//!
//! ## Rules
//!
//! - A node *meets its minimum* when
//!   `committed + staked - requested_unstaking >= minimum[role]`.
//! - A node *can accept delegators* when it meets its minimum and its role
//!   is not Access. The Access minimum is zero, so every Access node meets
//!   the arithmetic check; the role test is what excludes it.
//! - A node hosting delegated capital may only *partially* unstake down to
//!   its minimum. The full exit (`unstake_all`) is always permitted and
//!   cascades to the delegators instead.

use serde::{Deserialize, Serialize};

use crate::amount::{tokens, Amount};
use crate::buckets::TokenBuckets;
use crate::error::LedgerError;
use crate::role::{NodeRole, ROLE_COUNT};

/// Per-role minimum stake requirements, in smallest on-chain units.
///
/// Defaults are the network launch parameters:
///
/// | Role | Minimum |
/// |------|---------|
/// | Collector | 250 000.0 |
/// | Consensus | 500 000.0 |
/// | Execution | 1 250 000.0 |
/// | Verification | 135 000.0 |
/// | Access | 0.0 |
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimumStakeTable {
    minimums: [Amount; ROLE_COUNT],
}

impl Default for MinimumStakeTable {
    fn default() -> Self {
        MinimumStakeTable {
            minimums: [
                tokens(250_000),
                tokens(500_000),
                tokens(1_250_000),
                tokens(135_000),
                0,
            ],
        }
    }
}

impl MinimumStakeTable {
    /// Builds a table from explicit per-role values, in wire order.
    #[must_use]
    pub const fn new(minimums: [Amount; ROLE_COUNT]) -> Self {
        MinimumStakeTable { minimums }
    }

    /// Minimum stake for `role`.
    #[must_use]
    pub const fn minimum_for(&self, role: NodeRole) -> Amount {
        self.minimums[role.index()]
    }

    /// Replaces all five minimums atomically, in wire order.
    pub fn set_all(&mut self, minimums: [Amount; ROLE_COUNT]) {
        self.minimums = minimums;
    }

    /// `true` iff the record's active commitment satisfies the role
    /// minimum.
    #[must_use]
    pub fn meets_minimum(&self, role: NodeRole, buckets: &TokenBuckets) -> bool {
        buckets.active_commitment() >= self.minimum_for(role)
    }

    /// `true` iff a node with this role and these balances may accept
    /// delegators.
    #[must_use]
    pub fn can_delegate(&self, role: NodeRole, buckets: &TokenBuckets) -> bool {
        role != NodeRole::Access && self.meets_minimum(role, buckets)
    }

    /// Validates a partial unstake request against the minimum-stake floor.
    ///
    /// The floor only binds while the node hosts active delegated capital
    /// (`has_active_delegators`). If `amount` exceeds the node's active
    /// commitment the balance check in the bucket operation reports it;
    /// this function defers to that and returns `Ok`.
    pub fn check_partial_unstake(
        &self,
        role: NodeRole,
        buckets: &TokenBuckets,
        amount: Amount,
        has_active_delegators: bool,
    ) -> Result<(), LedgerError> {
        if !has_active_delegators {
            return Ok(());
        }
        let Some(resulting) = buckets.active_commitment().checked_sub(amount) else {
            return Ok(());
        };
        let minimum = self.minimum_for(role);
        if resulting < minimum {
            return Err(LedgerError::BelowMinimumStake {
                role,
                minimum,
                resulting,
            });
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════
