//! # Ledger Error Types
//!
//! Defines [`LedgerError`], the public error contract for every fallible
//! ledger operation, and [`ErrorKind`], the four-category taxonomy callers
//! branch on.
//!
//! ## Overview
//!
//! Every precondition that can reject an operation produces a specific
//! variant. The variants are non-overlapping and group into four kinds:
//!
//! | Kind | Variants |
//! |------|----------|
//! | Validation | `InvalidNodeId`, `InvalidRole`, `EmptyNetworkingAddress`, `InvalidAccountAddress`, `InvalidFraction`, `DuplicateNodeId`, `DuplicateNetworkingAddress`, `DuplicateNetworkingKey`, `DuplicateStakingKey` |
//! | InsufficientBalance | `InsufficientBalance`, `VaultInsufficientFunds` |
//! | PolicyViolation | `BelowMinimumStake`, `DelegationTargetAccessRole`, `DelegationTargetBelowMinimum`, `DelegationTargetRetired`, `WrongEpochPhase` |
//! | NotFound | `NodeNotFound`, `DelegatorNotFound` |
//!
//! A rejected operation leaves no observable state change; the error is the
//! only effect.
//!
//! ## Properties
//!
//! - `LedgerError` is a value type: `Clone`, `Debug`, `PartialEq`, `Eq`.
//! - `Display` messages are deterministic and contain no debug formatting.
//! - Implements `std::fmt::Display` and `std::error::Error`.
//! - No `thiserror`, `anyhow`, or implicit error wrapping: the variants are
//!   the contract, and they stay serializable and comparable.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::amount::Amount;
use crate::buckets::BucketKind;
use crate::role::NodeRole;

// ════════════════════════════════════════════════════════════════════════════════
// ERROR KIND
// ════════════════════════════════════════════════════════════════════════════════

/// Coarse classification of a [`LedgerError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed or duplicate registration input.
    Validation,
    /// A bucket did not hold enough tokens for the requested movement.
    InsufficientBalance,
    /// The operation is well-formed but forbidden by staking policy or
    /// epoch phase.
    PolicyViolation,
    /// The referenced node or delegator does not exist.
    NotFound,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::InsufficientBalance => "insufficient balance",
            ErrorKind::PolicyViolation => "policy violation",
            ErrorKind::NotFound => "not found",
        };
        f.write_str(name)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// LEDGER ERROR
// ════════════════════════════════════════════════════════════════════════════════

/// Error produced by a rejected ledger operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerError {
    /// The node identifier is not exactly 64 hexadecimal characters.
    InvalidNodeId {
        /// The identifier as supplied.
        id: String,
    },

    /// The role wire value is outside 1..=5.
    InvalidRole {
        /// The value as supplied.
        value: u8,
    },

    /// The networking address is empty.
    EmptyNetworkingAddress,

    /// An account address could not be parsed as 20 hex-encoded bytes.
    InvalidAccountAddress {
        /// The address as supplied.
        value: String,
    },

    /// A cut percentage or reward ratio is outside the range 0.0..=1.0.
    InvalidFraction {
        /// The fraction in 8-decimal units.
        value: Amount,
    },

    /// The node identifier is already registered.
    DuplicateNodeId {
        id: String,
    },

    /// The networking address is already in use by another node.
    DuplicateNetworkingAddress {
        address: String,
    },

    /// The networking public key is already in use by another node.
    DuplicateNetworkingKey {
        key: String,
    },

    /// The staking public key is already in use by another node.
    DuplicateStakingKey {
        key: String,
    },

    /// The external token vault rejected a deposit for lack of funds.
    VaultInsufficientFunds {
        /// Account the deposit was drawn from, as hex.
        owner: String,
        /// Amount the operation asked for.
        requested: Amount,
        /// Amount the vault reported available.
        available: Amount,
    },

    /// A bucket held fewer tokens than the operation required.
    InsufficientBalance {
        /// The bucket the tokens were to be taken from.
        bucket: BucketKind,
        /// Amount the operation asked for.
        requested: Amount,
        /// Amount actually available.
        available: Amount,
    },

    /// A partial unstake would drop the node below its role minimum while
    /// it still hosts delegated capital.
    BelowMinimumStake {
        role: NodeRole,
        /// Minimum stake for the role.
        minimum: Amount,
        /// Node stake that would remain after the request.
        resulting: Amount,
    },

    /// Delegation was attempted against an Access-role node.
    DelegationTargetAccessRole {
        id: String,
    },

    /// Delegation was attempted against a node below its role minimum.
    DelegationTargetBelowMinimum {
        id: String,
    },

    /// Delegation was attempted against a node that has been removed from
    /// candidacy.
    DelegationTargetRetired {
        id: String,
    },

    /// The operation is not valid in the current epoch phase.
    WrongEpochPhase {
        /// Name of the attempted operation.
        operation: String,
        /// Current phase name.
        phase: String,
    },

    /// No node with the given identifier is registered.
    NodeNotFound {
        id: String,
    },

    /// The node exists but has no delegator with the given sequence number.
    DelegatorNotFound {
        id: String,
        seq: u32,
    },
}

impl LedgerError {
    /// The taxonomy category this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidNodeId { .. }
            | LedgerError::InvalidRole { .. }
            | LedgerError::EmptyNetworkingAddress
            | LedgerError::InvalidAccountAddress { .. }
            | LedgerError::InvalidFraction { .. }
            | LedgerError::DuplicateNodeId { .. }
            | LedgerError::DuplicateNetworkingAddress { .. }
            | LedgerError::DuplicateNetworkingKey { .. }
            | LedgerError::DuplicateStakingKey { .. } => ErrorKind::Validation,

            LedgerError::VaultInsufficientFunds { .. }
            | LedgerError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,

            LedgerError::BelowMinimumStake { .. }
            | LedgerError::DelegationTargetAccessRole { .. }
            | LedgerError::DelegationTargetBelowMinimum { .. }
            | LedgerError::DelegationTargetRetired { .. }
            | LedgerError::WrongEpochPhase { .. } => ErrorKind::PolicyViolation,

            LedgerError::NodeNotFound { .. }
            | LedgerError::DelegatorNotFound { .. } => ErrorKind::NotFound,
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::InvalidNodeId { id } => {
                write!(f, "node id must be exactly 64 hexadecimal characters, got {:?}", id)
            }
            LedgerError::InvalidRole { value } => {
                write!(f, "node role must be between 1 and 5, got {}", value)
            }
            LedgerError::EmptyNetworkingAddress => {
                write!(f, "networking address must not be empty")
            }
            LedgerError::InvalidAccountAddress { value } => {
                write!(f, "account address must be 20 hex-encoded bytes, got {:?}", value)
            }
            LedgerError::InvalidFraction { value } => {
                write!(f, "fraction must be between 0.0 and 1.0, got {} units", value)
            }
            LedgerError::DuplicateNodeId { id } => {
                write!(f, "node id {} is already registered", id)
            }
            LedgerError::DuplicateNetworkingAddress { address } => {
                write!(f, "networking address {} is already in use", address)
            }
            LedgerError::DuplicateNetworkingKey { key } => {
                write!(f, "networking key {} is already in use", key)
            }
            LedgerError::DuplicateStakingKey { key } => {
                write!(f, "staking key {} is already in use", key)
            }
            LedgerError::VaultInsufficientFunds {
                owner,
                requested,
                available,
            } => {
                write!(
                    f,
                    "token vault has insufficient funds for account {}: requested {}, available {}",
                    owner, requested, available
                )
            }
            LedgerError::InsufficientBalance {
                bucket,
                requested,
                available,
            } => {
                write!(
                    f,
                    "insufficient {} balance: requested {}, available {}",
                    bucket, requested, available
                )
            }
            LedgerError::BelowMinimumStake {
                role,
                minimum,
                resulting,
            } => {
                write!(
                    f,
                    "unstake request would leave {} node below the role minimum: minimum {}, resulting {}",
                    role, minimum, resulting
                )
            }
            LedgerError::DelegationTargetAccessRole { id } => {
                write!(f, "node {} has the Access role and cannot accept delegators", id)
            }
            LedgerError::DelegationTargetBelowMinimum { id } => {
                write!(f, "node {} is below its role minimum and cannot accept delegators", id)
            }
            LedgerError::DelegationTargetRetired { id } => {
                write!(f, "node {} has been removed and cannot accept delegators", id)
            }
            LedgerError::WrongEpochPhase { operation, phase } => {
                write!(f, "operation {} is not valid in epoch phase {}", operation, phase)
            }
            LedgerError::NodeNotFound { id } => {
                write!(f, "no node registered with id {}", id)
            }
            LedgerError::DelegatorNotFound { id, seq } => {
                write!(f, "node {} has no delegator with sequence number {}", id, seq)
            }
        }
    }
}

impl std::error::Error for LedgerError {}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════
