//! # Collaborator Boundary
//!
//! The ledger does not mint, burn, or hold tokens itself (custody belongs
//! to an external vault), and it does not publish its own events. Both
//! collaborators are reached through object-safe traits:
//!
//! - [`TokenVault`]: moves real tokens between an owner account and the
//!   ledger's escrow. Called only from `commit_new` (deposit) and the two
//!   withdrawal operations.
//! - [`EventSink`]: receives a typed [`LedgerEvent`] for every
//!   registration, bucket-changing operation, and epoch-phase transition.
//!
//! Call ordering matters for atomicity: the ledger validates every
//! precondition first, then makes the vault call (which may still fail),
//! and only mutates its own state after the vault has succeeded. A failed
//! vault call therefore aborts the operation with zero state change on
//! either side.
//!
//! [`InMemoryVault`] and [`RecordingSink`] are the test doubles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use staketable_common::{Amount, BucketKind, LedgerError, NodeRole, TokenBuckets};

use crate::node::{Address, NodeId};

// ════════════════════════════════════════════════════════════════════════════════
// TOKEN VAULT
// ════════════════════════════════════════════════════════════════════════════════

/// External token custody.
pub trait TokenVault {
    /// Pulls `amount` from `owner`'s account into the ledger escrow.
    ///
    /// Fails with [`LedgerError::VaultInsufficientFunds`] if the account
    /// does not hold `amount`.
    fn deposit(&mut self, owner: &Address, amount: Amount) -> Result<(), LedgerError>;

    /// Releases `amount` from the ledger escrow back to `owner`.
    ///
    /// The ledger only calls this after its own bucket checks have passed,
    /// so a correctly implemented vault cannot run dry here.
    fn withdraw(&mut self, owner: &Address, amount: Amount) -> Result<(), LedgerError>;
}

/// In-memory vault double: external balances plus one escrow counter.
#[derive(Debug, Default)]
pub struct InMemoryVault {
    balances: BTreeMap<Address, Amount>,
    escrowed: Amount,
}

impl InMemoryVault {
    pub fn new() -> Self {
        InMemoryVault::default()
    }

    /// Credits an external account, test setup only.
    pub fn fund(&mut self, owner: Address, amount: Amount) {
        *self.balances.entry(owner).or_insert(0) += amount;
    }

    /// Credits the escrow directly, standing in for the external reward
    /// minter: the ledger credits reward buckets without moving real
    /// tokens, and the host funds the escrow when the payout settles.
    pub fn fund_escrow(&mut self, amount: Amount) {
        self.escrowed += amount;
    }

    /// External (non-escrowed) balance of an account.
    pub fn balance_of(&self, owner: &Address) -> Amount {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    /// Total tokens currently held in ledger escrow.
    pub fn escrowed(&self) -> Amount {
        self.escrowed
    }
}

impl TokenVault for InMemoryVault {
    fn deposit(&mut self, owner: &Address, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.balances.entry(*owner).or_insert(0);
        if *balance < amount {
            return Err(LedgerError::VaultInsufficientFunds {
                owner: owner.to_hex(),
                requested: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        self.escrowed += amount;
        Ok(())
    }

    fn withdraw(&mut self, owner: &Address, amount: Amount) -> Result<(), LedgerError> {
        if self.escrowed < amount {
            return Err(LedgerError::VaultInsufficientFunds {
                owner: owner.to_hex(),
                requested: amount,
                available: self.escrowed,
            });
        }
        self.escrowed -= amount;
        *self.balances.entry(*owner).or_insert(0) += amount;
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// LEDGER EVENTS
// ════════════════════════════════════════════════════════════════════════════════

/// Which entity a bucket-changing operation touched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityRef {
    Node { id: NodeId },
    Delegator { id: NodeId, seq: u32 },
}

/// Kind of bucket-changing operation, for event consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    CommitNew,
    CommitUnstaked,
    CommitRewarded,
    RequestUnstaking,
    UnstakeAll,
    WithdrawUnstaked,
    WithdrawRewards,
}

/// Notification emitted to the [`EventSink`].
///
/// Bucket-changing operations carry the entity reference, the operation
/// kind, and the resulting balances; epoch transitions carry phase-level
/// summaries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    NodeRegistered {
        id: NodeId,
        role: NodeRole,
        owner: Address,
    },
    NodeRemoved {
        id: NodeId,
    },
    DelegatorRegistered {
        id: NodeId,
        seq: u32,
        owner: Address,
    },
    BucketsChanged {
        entity: EntityRef,
        operation: OperationKind,
        /// Amount the operation moved.
        amount: Amount,
        /// The bucket primarily affected.
        bucket: BucketKind,
        /// Balances after the operation.
        resulting: TokenBuckets,
    },
    AuctionEnded {
        /// Node ids staked for the new epoch.
        current_table: Vec<NodeId>,
        /// Proposed nodes that were not approved and were refunded.
        excluded: Vec<NodeId>,
    },
    RewardsPaid {
        total_paid: Amount,
        total_staked: Amount,
    },
    TokensMoved {
        total_staked: Amount,
    },
}

/// Event consumer. The exact downstream schema belongs to the host
/// environment's logging layer, not to this crate.
pub trait EventSink {
    fn emit(&mut self, event: LedgerEvent);
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: LedgerEvent) {}
}

/// Buffers every event in order, for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<LedgerEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        RecordingSink::default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════
