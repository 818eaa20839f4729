//! # Query Surface
//!
//! Read-only, deterministic query functions over [`LedgerState`].
//!
//! ## Design
//!
//! All functions take `&LedgerState`: no mutation, no side effects, safe
//! for concurrent read access. Lookups go through the primary node map and
//! return `None` for unknown ids or sequence numbers; nothing here falls
//! back to scanning when a keyed lookup misses. The two by-owner lookups
//! are deliberate full scans: the registry keeps no owner index, and the
//! listings are sorted by construction (`BTreeMap` iteration).

use serde::{Deserialize, Serialize};

use staketable_common::{Amount, NodeRole, TokenBuckets};

use crate::node::{Address, NodeId};
use crate::state::LedgerState;

// ══════════════════════════════════════════════════════════════════════════════
// INFO VIEWS
// ══════════════════════════════════════════════════════════════════════════════

/// Full snapshot of a node: identity fields plus balances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: NodeId,
    pub owner: Address,
    pub role: NodeRole,
    pub networking_address: String,
    pub networking_key: String,
    pub staking_key: String,
    pub buckets: TokenBuckets,
    /// Operator cut of delegator rewards, 8-decimal fraction of 1.0.
    pub delegation_cut: Amount,
    pub retired: bool,
    /// Sequence numbers of this node's delegators, ascending.
    pub delegator_seqs: Vec<u32>,
}

/// Full snapshot of a delegator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatorInfo {
    pub node_id: NodeId,
    pub seq: u32,
    pub owner: Address,
    pub buckets: TokenBuckets,
}

// ══════════════════════════════════════════════════════════════════════════════
// BALANCES
// ══════════════════════════════════════════════════════════════════════════════

/// Balance record of a node, or `None` if the id is unknown.
#[must_use]
pub fn node_buckets(state: &LedgerState, id: &NodeId) -> Option<TokenBuckets> {
    state.node(id).map(|n| n.buckets)
}

/// Balance record of a delegator, or `None` if the id or sequence number
/// is unknown.
#[must_use]
pub fn delegator_buckets(state: &LedgerState, id: &NodeId, seq: u32) -> Option<TokenBuckets> {
    state.delegator(id, seq).map(|d| d.buckets)
}

/// A node's total commitment (`committed + staked - requested_unstaking`),
/// including every delegator's.
#[must_use]
pub fn total_commitment(state: &LedgerState, id: &NodeId) -> Option<Amount> {
    state.node(id).map(|n| n.total_commitment())
}

/// A node's own total commitment, delegators excluded.
#[must_use]
pub fn total_commitment_without_delegators(
    state: &LedgerState,
    id: &NodeId,
) -> Option<Amount> {
    state.node(id).map(|n| n.buckets.active_commitment())
}

// ══════════════════════════════════════════════════════════════════════════════
// CONFIG AND TOTALS
// ══════════════════════════════════════════════════════════════════════════════

/// Minimum stake requirement for a role.
#[must_use]
pub fn stake_minimum(state: &LedgerState, role: NodeRole) -> Amount {
    state.config().minimums.minimum_for(role)
}

/// Stored per-role reward ratio. Display data: not an input to the payout.
#[must_use]
pub fn reward_ratio(state: &LedgerState, role: NodeRole) -> Amount {
    state.config().reward_ratios[role.index()]
}

/// Default operator cut of delegator rewards.
#[must_use]
pub fn cut_percentage(state: &LedgerState) -> Amount {
    state.config().delegation_cut
}

/// Configured total payout per reward run.
#[must_use]
pub fn weekly_payout(state: &LedgerState) -> Amount {
    state.config().weekly_payout
}

/// Total staked across all nodes and delegators.
#[must_use]
pub fn total_staked(state: &LedgerState) -> Amount {
    state.total_staked()
}

/// Total staked for one role; delegator stake counts toward the parent
/// node's role.
#[must_use]
pub fn total_staked_by_role(state: &LedgerState, role: NodeRole) -> Amount {
    state.total_staked_for_role(role)
}

// ══════════════════════════════════════════════════════════════════════════════
// TABLES
// ══════════════════════════════════════════════════════════════════════════════

/// Node ids proposed for the next epoch, ascending.
#[must_use]
pub fn proposed_table(state: &LedgerState) -> Vec<NodeId> {
    state.proposed_table().iter().copied().collect()
}

/// Node ids actively staked for the current epoch, ascending.
#[must_use]
pub fn current_table(state: &LedgerState) -> Vec<NodeId> {
    state.current_table().iter().copied().collect()
}

// ══════════════════════════════════════════════════════════════════════════════
// INFO RECORDS
// ══════════════════════════════════════════════════════════════════════════════

/// Full info record for a node.
#[must_use]
pub fn node_info(state: &LedgerState, id: &NodeId) -> Option<NodeInfo> {
    state.node(id).map(|n| NodeInfo {
        id: n.id,
        owner: n.owner,
        role: n.role,
        networking_address: n.networking_address.clone(),
        networking_key: n.networking_key.clone(),
        staking_key: n.staking_key.clone(),
        buckets: n.buckets,
        delegation_cut: n.delegation_cut,
        retired: n.retired,
        delegator_seqs: n.delegators.keys().copied().collect(),
    })
}

/// Full info record for a delegator.
#[must_use]
pub fn delegator_info(state: &LedgerState, id: &NodeId, seq: u32) -> Option<DelegatorInfo> {
    state.delegator(id, seq).map(|d| DelegatorInfo {
        node_id: *id,
        seq,
        owner: d.owner,
        buckets: d.buckets,
    })
}

/// All nodes registered by an external account, ascending by id.
#[must_use]
pub fn nodes_by_owner(state: &LedgerState, owner: &Address) -> Vec<NodeInfo> {
    state
        .nodes_iter()
        .filter(|n| n.owner == *owner)
        .filter_map(|n| node_info(state, &n.id))
        .collect()
}

/// All delegator positions held by an external account, ascending by
/// `(node id, sequence number)`.
#[must_use]
pub fn delegators_by_owner(state: &LedgerState, owner: &Address) -> Vec<DelegatorInfo> {
    state
        .nodes_iter()
        .flat_map(|n| {
            n.delegators
                .iter()
                .filter(|(_, d)| d.owner == *owner)
                .map(|(seq, d)| DelegatorInfo {
                    node_id: n.id,
                    seq: *seq,
                    owner: d.owner,
                    buckets: d.buckets,
                })
        })
        .collect()
}

// ══════════════════════════════════════════════════════════════════════════════
// TESTS
// ══════════════════════════════════════════════════════════════════════════════
