//! # Token Buckets
//!
//! [`TokenBuckets`] is the per-entity balance record: five lifecycle buckets
//! plus accumulated rewards. The same record is attached to every node and
//! every delegator, and the primitive mutations here apply identically to
//! both.
//!
//! ## Lifecycle
//!
//! ```text
//!             commit_new
//!                 │
//!                 ▼
//!  committed ──move_tokens──▶ staked ──request_unstaking──▶ requested_unstaking
//!      │                                                          │
//!      │ request_unstaking                            move_tokens │
//!      ▼                                                          ▼
//!  unstaked ◀──────────────move_tokens────────────────────── unstaking
//! ```
//!
//! Tokens requested for unstaking surface in `unstaking` after one
//! `move_tokens` and land in `unstaked` after the next: a two-cycle delay.
//! Committed tokens that never entered the staked set skip the delay and
//! drain straight to `unstaked`.
//!
//! ## Invariants
//!
//! - `requested_unstaking <= staked` before and after every operation.
//! - Balances are `u128` and cannot go negative; any operation that would
//!   overdraw a bucket fails with [`LedgerError::InsufficientBalance`] and
//!   changes nothing.
//!
//! Every mutation validates all preconditions before writing any field, so
//! a failed operation is a complete no-op.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::amount::Amount;
use crate::error::LedgerError;

// ════════════════════════════════════════════════════════════════════════════════
// BUCKET KIND
// ════════════════════════════════════════════════════════════════════════════════

/// Names one of the six balances, for error reporting and events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BucketKind {
    Committed,
    Staked,
    RequestedUnstaking,
    Unstaking,
    Unstaked,
    Rewards,
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BucketKind::Committed => "committed",
            BucketKind::Staked => "staked",
            BucketKind::RequestedUnstaking => "requested unstaking",
            BucketKind::Unstaking => "unstaking",
            BucketKind::Unstaked => "unstaked",
            BucketKind::Rewards => "rewards",
        };
        f.write_str(name)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TOKEN BUCKETS
// ════════════════════════════════════════════════════════════════════════════════

/// Per-entity balance record.
///
/// All fields are smallest on-chain units (8 decimals). The struct is plain
/// data; the ledger state machine decides *when* each mutation may run, the
/// methods here decide *whether* the balances allow it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBuckets {
    /// Tokens committed for the next epoch but not yet staked.
    pub committed: Amount,
    /// Tokens actively staked for the current epoch.
    pub staked: Amount,
    /// Portion of `staked` requested to leave at the next epoch boundary.
    pub requested_unstaking: Amount,
    /// Tokens in the one-epoch unstaking holding period.
    pub unstaking: Amount,
    /// Tokens free to withdraw or re-commit.
    pub unstaked: Amount,
    /// Accumulated reward payout, withdrawable at any time.
    pub rewards: Amount,
}

impl TokenBuckets {
    /// An all-zero record.
    #[must_use]
    pub const fn new() -> Self {
        TokenBuckets {
            committed: 0,
            staked: 0,
            requested_unstaking: 0,
            unstaking: 0,
            unstaked: 0,
            rewards: 0,
        }
    }

    /// Tokens counted toward the role minimum and available to unstake:
    /// `committed + staked - requested_unstaking`.
    #[must_use]
    pub const fn active_commitment(&self) -> Amount {
        self.committed + self.staked - self.requested_unstaking
    }

    /// Sum of the tokens this record holds in escrow. `requested_unstaking`
    /// is a marker inside `staked`, not a separate pool, so it is excluded.
    #[must_use]
    pub const fn total(&self) -> Amount {
        self.committed + self.staked + self.unstaking + self.unstaked + self.rewards
    }

    // ──────────────────────────────────────────────────────────────────────
    // COMMITS
    // ──────────────────────────────────────────────────────────────────────

    /// Adds newly deposited tokens to `committed`. Always succeeds; the
    /// matching vault deposit is the caller's responsibility.
    pub fn commit_new(&mut self, amount: Amount) {
        self.committed += amount;
    }

    /// Moves tokens from `unstaked` back to `committed`.
    pub fn commit_unstaked(&mut self, amount: Amount) -> Result<(), LedgerError> {
        if self.unstaked < amount {
            return Err(LedgerError::InsufficientBalance {
                bucket: BucketKind::Unstaked,
                requested: amount,
                available: self.unstaked,
            });
        }
        self.unstaked -= amount;
        self.committed += amount;
        Ok(())
    }

    /// Moves tokens from `rewards` to `committed`.
    pub fn commit_rewarded(&mut self, amount: Amount) -> Result<(), LedgerError> {
        if self.rewards < amount {
            return Err(LedgerError::InsufficientBalance {
                bucket: BucketKind::Rewards,
                requested: amount,
                available: self.rewards,
            });
        }
        self.rewards -= amount;
        self.committed += amount;
        Ok(())
    }

    // ──────────────────────────────────────────────────────────────────────
    // UNSTAKING
    // ──────────────────────────────────────────────────────────────────────

    /// Requests `amount` tokens out of the active commitment.
    ///
    /// Committed tokens are drained first: they never entered the staked
    /// set, so they go straight to `unstaked`. The remainder is recorded in
    /// `requested_unstaking` and leaves through the two-cycle delay.
    ///
    /// Fails if `amount` exceeds `committed + staked - requested_unstaking`.
    pub fn request_unstaking(&mut self, amount: Amount) -> Result<(), LedgerError> {
        let available = self.active_commitment();
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                bucket: BucketKind::Staked,
                requested: amount,
                available,
            });
        }

        let from_committed = amount.min(self.committed);
        let remainder = amount - from_committed;

        self.committed -= from_committed;
        self.unstaked += from_committed;
        self.requested_unstaking += remainder;
        Ok(())
    }

    /// Requests the full exit: every staked token is marked for unstaking
    /// and every committed token is released immediately.
    ///
    /// Cascading to a node's delegators is the ledger's job, not this
    /// record's.
    pub fn request_unstake_all(&mut self) {
        self.unstaked += self.committed;
        self.committed = 0;
        self.requested_unstaking = self.staked;
    }

    // ──────────────────────────────────────────────────────────────────────
    // WITHDRAWALS
    // ──────────────────────────────────────────────────────────────────────

    /// Removes tokens from `unstaked` for an external withdrawal.
    pub fn withdraw_unstaked(&mut self, amount: Amount) -> Result<(), LedgerError> {
        if self.unstaked < amount {
            return Err(LedgerError::InsufficientBalance {
                bucket: BucketKind::Unstaked,
                requested: amount,
                available: self.unstaked,
            });
        }
        self.unstaked -= amount;
        Ok(())
    }

    /// Removes tokens from `rewards` for an external withdrawal.
    pub fn withdraw_rewards(&mut self, amount: Amount) -> Result<(), LedgerError> {
        if self.rewards < amount {
            return Err(LedgerError::InsufficientBalance {
                bucket: BucketKind::Rewards,
                requested: amount,
                available: self.rewards,
            });
        }
        self.rewards -= amount;
        Ok(())
    }

    /// Credits an epoch reward payout.
    pub fn credit_reward(&mut self, amount: Amount) {
        self.rewards += amount;
    }

    // ──────────────────────────────────────────────────────────────────────
    // EPOCH TRANSITION
    // ──────────────────────────────────────────────────────────────────────

    /// Applies the per-entity epoch token movement:
    ///
    /// ```text
    /// staked'              = staked - requested_unstaking + committed
    /// unstaked'            = unstaked + unstaking
    /// unstaking'           = requested_unstaking
    /// requested_unstaking' = 0
    /// committed'           = 0
    /// ```
    ///
    /// Infallible: `requested_unstaking <= staked` always holds on entry.
    pub fn move_tokens(&mut self) {
        let new_staked = self.staked - self.requested_unstaking + self.committed;
        self.unstaked += self.unstaking;
        self.unstaking = self.requested_unstaking;
        self.requested_unstaking = 0;
        self.staked = new_staked;
        self.committed = 0;
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════
