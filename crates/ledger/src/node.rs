//! # Node and Delegator Records
//!
//! On-ledger state for registered participants: [`NodeRecord`] is the
//! source of truth for a node operator, and each node exclusively owns its
//! [`DelegatorRecord`]s, keyed by a per-node sequence number that starts at
//! 1 and only ever counts up.
//!
//! Identifiers:
//!
//! - [`NodeId`]: 32 bytes, supplied at registration as exactly 64
//!   hexadecimal characters.
//! - [`Address`]: 20 bytes, the external account reference used by the
//!   token vault boundary and the by-address queries.
//!
//! Both serialize as hex strings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use staketable_common::{Amount, LedgerError, NodeRole, TokenBuckets};

// ════════════════════════════════════════════════════════════════════════════════
// NODE ID
// ════════════════════════════════════════════════════════════════════════════════

/// 32-byte node identifier, registered as a 64-character hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub [u8; 32]);

impl NodeId {
    /// Parses a registration identifier.
    ///
    /// Accepts exactly 64 hexadecimal characters, upper or lower case; any
    /// other length or character fails with a validation error.
    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        if s.len() != 64 {
            return Err(LedgerError::InvalidNodeId { id: s.to_string() });
        }
        let bytes = hex::decode(s).map_err(|_| LedgerError::InvalidNodeId { id: s.to_string() })?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(NodeId(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeId").field(&self.to_hex()).finish()
    }
}

impl FromStr for NodeId {
    type Err = LedgerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeId::parse(s)
    }
}

impl Serialize for NodeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> Result<NodeId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NodeId::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// ACCOUNT ADDRESS
// ════════════════════════════════════════════════════════════════════════════════

/// 20-byte external account reference.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn from_bytes(b: [u8; 20]) -> Self {
        Address(b)
    }

    /// Parses 40 hex characters, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, LedgerError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|_| LedgerError::InvalidAccountAddress { value: s.to_string() })?;
        if bytes.len() != 20 {
            return Err(LedgerError::InvalidAccountAddress { value: s.to_string() });
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Address(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Address").field(&self.to_hex()).finish()
    }
}

impl FromStr for Address {
    type Err = LedgerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Address, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// DELEGATOR RECORD
// ════════════════════════════════════════════════════════════════════════════════

/// A participant staking through a node without operating it.
///
/// Identified by `(parent node id, sequence number)`; the record itself
/// carries no keys. Once created it is never destroyed; a delegator with
/// zero balances stays addressable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatorRecord {
    /// External account of the delegator.
    pub owner: Address,
    /// The delegator's balance record.
    pub buckets: TokenBuckets,
}

impl DelegatorRecord {
    pub fn new(owner: Address) -> Self {
        DelegatorRecord {
            owner,
            buckets: TokenBuckets::new(),
        }
    }

    /// `true` while the delegator has capital in play (committed or
    /// staked). Used by the node-operator partial-unstake gate.
    pub fn is_active(&self) -> bool {
        self.buckets.committed + self.buckets.staked > 0
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// NODE RECORD
// ════════════════════════════════════════════════════════════════════════════════

/// On-ledger record for a registered node operator.
///
/// The registry guarantees that `id`, `networking_address`,
/// `networking_key` and `staking_key` are each unique across all records,
/// and keeps its reverse-lookup indexes in lockstep with the primary map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Unique node identifier (primary key).
    pub id: NodeId,

    /// External account of the operator.
    pub owner: Address,

    /// Operating role, fixed at registration.
    pub role: NodeRole,

    /// Network endpoint the node serves on. Unique, non-empty.
    pub networking_address: String,

    /// Networking public key. Unique; opaque to the ledger.
    pub networking_key: String,

    /// Staking public key. Unique; opaque to the ledger.
    pub staking_key: String,

    /// The node's own balance record.
    pub buckets: TokenBuckets,

    /// Fraction of each delegator's gross reward redirected to this node,
    /// in 8-decimal units of 1.0.
    pub delegation_cut: Amount,

    /// Set by `remove_node`. A retired node never re-enters the proposed
    /// table, but its balances remain addressable so they can drain through
    /// the ordinary bucket operations.
    pub retired: bool,

    /// Delegators staking through this node, keyed by sequence number.
    /// Exclusively owned: no delegator outlives this record.
    pub delegators: BTreeMap<u32, DelegatorRecord>,

    /// Next sequence number to assign, starting at 1, monotonic.
    pub next_delegator_seq: u32,
}

impl NodeRecord {
    pub fn new(
        id: NodeId,
        owner: Address,
        role: NodeRole,
        networking_address: String,
        networking_key: String,
        staking_key: String,
        delegation_cut: Amount,
    ) -> Self {
        NodeRecord {
            id,
            owner,
            role,
            networking_address,
            networking_key,
            staking_key,
            buckets: TokenBuckets::new(),
            delegation_cut,
            retired: false,
            delegators: BTreeMap::new(),
            next_delegator_seq: 1,
        }
    }

    /// `true` iff any delegator currently has committed or staked tokens.
    pub fn has_active_delegators(&self) -> bool {
        self.delegators.values().any(DelegatorRecord::is_active)
    }

    /// Sum of the delegators' staked balances.
    pub fn delegated_staked(&self) -> Amount {
        self.delegators.values().map(|d| d.buckets.staked).sum()
    }

    /// Active commitment including delegators:
    /// node `committed + staked - requested_unstaking` plus the same for
    /// every delegator.
    pub fn total_commitment(&self) -> Amount {
        self.buckets.active_commitment()
            + self
                .delegators
                .values()
                .map(|d| d.buckets.active_commitment())
                .sum::<Amount>()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════
