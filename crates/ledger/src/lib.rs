//! # StakeTable Ledger
//!
//! A proof-of-stake participation ledger for a node-operator network. The
//! ledger tracks committed, staked, and unstaking token balances for nodes
//! and the delegators who back them, runs the periodic epoch transition
//! that promotes and demotes stake between lifecycle buckets, and computes
//! a deterministic stake-proportional reward payout.
//!
//! ## Module Overview
//!
//! | Module | Contents |
//! |--------|----------|
//! | `node` | `NodeId`, `Address`, `NodeRecord`, `DelegatorRecord` |
//! | `vault` | `TokenVault` / `EventSink` collaborator traits and test doubles |
//! | `rewards` | `RewardScale`: the payout computation |
//! | `state` | `Ledger`, `LedgerState`, `StakingConfig`, the epoch machine |
//! | `query` | read-only query functions over `&LedgerState` |
//!
//! ## Execution model
//!
//! Serialized single writer: the host environment applies mutating
//! operations one at a time, and each is all-or-nothing: every
//! precondition is validated before anything (ledger state or vault) is
//! written, so a rejected operation has no observable effect.
//!
//! ## Example
//!
//! ```rust,ignore
//! use staketable_ledger::{Ledger, StakingConfig, InMemoryVault, NullSink};
//!
//! let mut ledger = Ledger::new(StakingConfig::default(), vault, NullSink);
//! let id = ledger.register_node(id_hex, 1, addr, netkey, stakekey, owner, commit)?;
//! ledger.end_staking_auction(&approved)?;
//! ledger.pay_rewards()?;
//! ledger.move_tokens();
//! ```

pub mod node;
pub mod query;
pub mod rewards;
pub mod state;
pub mod vault;

#[cfg(test)]
pub(crate) mod testing;

pub use node::{Address, DelegatorRecord, NodeId, NodeRecord};
pub use rewards::{split_delegator_reward, RewardScale};
pub use state::{EpochPhase, Ledger, LedgerState, StakingConfig};
pub use vault::{
    EntityRef, EventSink, InMemoryVault, LedgerEvent, NullSink, OperationKind, RecordingSink,
    TokenVault,
};

pub use staketable_common::{
    tokens, Amount, BucketKind, ErrorKind, LedgerError, MinimumStakeTable, NodeRole,
    TokenBuckets, SCALE,
};
