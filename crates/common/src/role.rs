//! # Node Roles
//!
//! Every registered node operates in exactly one of five roles. Roles are
//! identified on the wire by the integers 1 through 5; anything outside that
//! range is rejected at registration.
//!
//! | Wire value | Role |
//! |------------|--------------|
//! | 1 | Collector |
//! | 2 | Consensus |
//! | 3 | Execution |
//! | 4 | Verification |
//! | 5 | Access |
//!
//! The Access role is special only in policy terms: its minimum stake is
//! zero and it can never be a delegation target. The role enum itself
//! carries no behavior beyond identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LedgerError;

/// Number of node roles. Per-role tables are indexed by [`NodeRole::index`].
pub const ROLE_COUNT: usize = 5;

/// Operating role of a registered node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    Collector,
    Consensus,
    Execution,
    Verification,
    Access,
}

impl NodeRole {
    /// All roles in wire order.
    pub const ALL: [NodeRole; ROLE_COUNT] = [
        NodeRole::Collector,
        NodeRole::Consensus,
        NodeRole::Execution,
        NodeRole::Verification,
        NodeRole::Access,
    ];

    /// Zero-based index for per-role tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            NodeRole::Collector => 0,
            NodeRole::Consensus => 1,
            NodeRole::Execution => 2,
            NodeRole::Verification => 3,
            NodeRole::Access => 4,
        }
    }

    /// Wire value (1..=5).
    #[must_use]
    pub const fn wire_value(self) -> u8 {
        self.index() as u8 + 1
    }
}

impl TryFrom<u8> for NodeRole {
    type Error = LedgerError;

    /// Parses a wire value. Values outside 1..=5 fail with a validation
    /// error, matching the registration contract.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(NodeRole::Collector),
            2 => Ok(NodeRole::Consensus),
            3 => Ok(NodeRole::Execution),
            4 => Ok(NodeRole::Verification),
            5 => Ok(NodeRole::Access),
            other => Err(LedgerError::InvalidRole { value: other }),
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeRole::Collector => "Collector",
            NodeRole::Consensus => "Consensus",
            NodeRole::Execution => "Execution",
            NodeRole::Verification => "Verification",
            NodeRole::Access => "Access",
        };
        f.write_str(name)
    }
}
