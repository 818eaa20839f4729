//! # Ledger State
//!
//! [`LedgerState`] holds the participation table: every node record (each
//! exclusively owning its delegators), the uniqueness indexes, the epoch
//! tables, the staking configuration, and the cached stake totals.
//!
//! [`Ledger`] wraps the state together with the two external collaborators
//! (token vault, event sink) and carries every mutating operation. The
//! operations are split across this module's submodules the way the state
//! grows: `registry` (who exists), `staking` (bucket movements), `epoch`
//! (the phase machine), `admin` (configuration writes).
//!
//! ## Epoch phase machine
//!
//! ```text
//! AuctionOpen ──end_staking_auction──▶ Finalized ──pay_rewards──▶ RewardsPaid
//!      ▲                                   │                          │
//!      │                                   └───────── move_tokens ────┤
//!      └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! `move_tokens` always completes the cycle back to `AuctionOpen`. It is
//! accepted from any phase: the composite `end_epoch` legitimately skips
//! `pay_rewards`, and repeated idle calls must converge to a fixed point.
//!
//! ## Aggregate totals
//!
//! `total_staked` and the per-role totals are cached projections of the
//! bucket sets, recomputed in full after `end_staking_auction` and after
//! `move_tokens`, never adjusted incrementally mid-sweep. Delegator stake
//! counts toward its parent node's role.
//!
//! ## Execution model
//!
//! Single writer, serialized: every operation runs to completion against
//! `&mut self`, validates all preconditions before writing anything, and
//! aborts with zero observable change on any error.

mod admin;
mod epoch;
mod registry;
mod staking;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use staketable_common::{
    tokens, Amount, LedgerError, MinimumStakeTable, NodeRole, ROLE_COUNT,
};

use crate::node::{DelegatorRecord, NodeId, NodeRecord};
use crate::vault::{EventSink, TokenVault};

// ════════════════════════════════════════════════════════════════════════════════
// STAKING CONFIG
// ════════════════════════════════════════════════════════════════════════════════

/// Network staking parameters.
///
/// Defaults are the launch parameters. The per-role reward ratios are
/// stored and queryable but are not an input to the payout computation,
/// which is purely stake-proportional.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingConfig {
    /// Per-role minimum stake requirements.
    pub minimums: MinimumStakeTable,
    /// Per-role reward-ratio fractions (8-decimal units of 1.0), in wire
    /// order. Display data only.
    pub reward_ratios: [Amount; ROLE_COUNT],
    /// Total tokens paid out per reward run.
    pub weekly_payout: Amount,
    /// Default operator cut of delegator rewards, copied onto each node at
    /// registration (8-decimal units of 1.0).
    pub delegation_cut: Amount,
}

impl Default for StakingConfig {
    fn default() -> Self {
        StakingConfig {
            minimums: MinimumStakeTable::default(),
            reward_ratios: [16_800_000, 51_800_000, 7_800_000, 23_600_000, 0],
            weekly_payout: tokens(1_250_000),
            delegation_cut: 8_000_000,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// EPOCH PHASE
// ════════════════════════════════════════════════════════════════════════════════

/// Observable state of the epoch controller between operations.
///
/// The transient tokens-moved state inside `move_tokens` is never
/// observable: the operation finishes the cycle and leaves the controller
/// back at `AuctionOpen`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpochPhase {
    /// Nodes register and stake toward the next epoch.
    AuctionOpen,
    /// The active table is fixed; rewards have not been paid.
    Finalized,
    /// Rewards are paid; the token movement is still pending.
    RewardsPaid,
}

impl EpochPhase {
    /// Stable phase name for errors and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            EpochPhase::AuctionOpen => "AuctionOpen",
            EpochPhase::Finalized => "Finalized",
            EpochPhase::RewardsPaid => "RewardsPaid",
        }
    }
}

impl fmt::Display for EpochPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// LEDGER STATE
// ════════════════════════════════════════════════════════════════════════════════

/// The participation table and everything derived from it.
///
/// Maps are `BTreeMap`/`BTreeSet` so that sweeps, events, and query
/// listings are deterministic. The three reverse-lookup indexes are
/// maintained transactionally with the primary map: registration checks
/// all of them and inserts into all of them as one unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerState {
    pub(crate) nodes: BTreeMap<NodeId, NodeRecord>,
    pub(crate) address_index: HashMap<String, NodeId>,
    pub(crate) networking_key_index: HashMap<String, NodeId>,
    pub(crate) staking_key_index: HashMap<String, NodeId>,
    pub(crate) proposed_table: BTreeSet<NodeId>,
    pub(crate) current_table: BTreeSet<NodeId>,
    pub(crate) config: StakingConfig,
    pub(crate) phase: EpochPhase,
    pub(crate) total_staked: Amount,
    pub(crate) total_staked_by_role: [Amount; ROLE_COUNT],
}

impl LedgerState {
    #[must_use]
    pub fn new(config: StakingConfig) -> Self {
        LedgerState {
            nodes: BTreeMap::new(),
            address_index: HashMap::new(),
            networking_key_index: HashMap::new(),
            staking_key_index: HashMap::new(),
            proposed_table: BTreeSet::new(),
            current_table: BTreeSet::new(),
            config,
            phase: EpochPhase::AuctionOpen,
            total_staked: 0,
            total_staked_by_role: [0; ROLE_COUNT],
        }
    }

    // ──────────────────────────────────────────────────────────────────────
    // READ ACCESS
    // ──────────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn delegator(&self, id: &NodeId, seq: u32) -> Option<&DelegatorRecord> {
        self.nodes.get(id).and_then(|n| n.delegators.get(&seq))
    }

    /// All node records, ascending by id.
    pub fn nodes_iter(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    #[must_use]
    pub fn proposed_table(&self) -> &BTreeSet<NodeId> {
        &self.proposed_table
    }

    #[must_use]
    pub fn current_table(&self) -> &BTreeSet<NodeId> {
        &self.current_table
    }

    #[must_use]
    pub fn config(&self) -> &StakingConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> EpochPhase {
        self.phase
    }

    /// Cached total of all staked buckets, nodes and delegators alike.
    #[must_use]
    pub fn total_staked(&self) -> Amount {
        self.total_staked
    }

    /// Cached staked total for one role. Delegator stake counts toward the
    /// parent node's role.
    #[must_use]
    pub fn total_staked_for_role(&self, role: NodeRole) -> Amount {
        self.total_staked_by_role[role.index()]
    }

    /// Independent recomputation of the staked total, bypassing the cache.
    /// The two must agree after every epoch phase; tests rely on this.
    #[must_use]
    pub fn recomputed_total_staked(&self) -> Amount {
        self.nodes
            .values()
            .map(|n| {
                n.buckets.staked
                    + n.delegators.values().map(|d| d.buckets.staked).sum::<Amount>()
            })
            .sum()
    }

    // ──────────────────────────────────────────────────────────────────────
    // INTERNAL HELPERS
    // ──────────────────────────────────────────────────────────────────────

    pub(crate) fn require_node(&self, id: &NodeId) -> Result<&NodeRecord, LedgerError> {
        self.nodes
            .get(id)
            .ok_or_else(|| LedgerError::NodeNotFound { id: id.to_hex() })
    }

    pub(crate) fn require_node_mut(
        &mut self,
        id: &NodeId,
    ) -> Result<&mut NodeRecord, LedgerError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| LedgerError::NodeNotFound { id: id.to_hex() })
    }

    /// Re-derives one node's proposed-table membership from its balances.
    /// Called after every mutation that can change the node's active
    /// commitment.
    pub(crate) fn refresh_proposed_membership(&mut self, id: &NodeId) {
        let Some(node) = self.nodes.get(id) else {
            self.proposed_table.remove(id);
            return;
        };
        let eligible =
            !node.retired && self.config.minimums.meets_minimum(node.role, &node.buckets);
        if eligible {
            self.proposed_table.insert(*id);
        } else {
            self.proposed_table.remove(id);
        }
    }

    /// Rebuilds the proposed table for every node.
    pub(crate) fn rebuild_proposed_table(&mut self) {
        self.proposed_table = self
            .nodes
            .values()
            .filter(|n| !n.retired && self.config.minimums.meets_minimum(n.role, &n.buckets))
            .map(|n| n.id)
            .collect();
    }

    /// Recomputes the cached stake totals from the bucket sets. This is the
    /// only place the caches are written.
    pub(crate) fn recompute_totals(&mut self) {
        let mut total: Amount = 0;
        let mut by_role = [0; ROLE_COUNT];
        for node in self.nodes.values() {
            let node_total = node.buckets.staked
                + node.delegators.values().map(|d| d.buckets.staked).sum::<Amount>();
            total += node_total;
            by_role[node.role.index()] += node_total;
        }
        self.total_staked = total;
        self.total_staked_by_role = by_role;
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// LEDGER
// ════════════════════════════════════════════════════════════════════════════════

/// The participation ledger: state plus the two external collaborators.
///
/// All mutating operations live here (see the `registry`, `staking`,
/// `epoch`, and `admin` submodules); the read-only query surface takes
/// [`LedgerState`] directly via [`Ledger::state`].
pub struct Ledger<V: TokenVault, E: EventSink> {
    pub(crate) state: LedgerState,
    pub(crate) vault: V,
    pub(crate) events: E,
}

impl<V: TokenVault, E: EventSink> Ledger<V, E> {
    pub fn new(config: StakingConfig, vault: V, events: E) -> Self {
        Ledger {
            state: LedgerState::new(config),
            vault,
            events,
        }
    }

    #[must_use]
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    #[must_use]
    pub fn vault(&self) -> &V {
        &self.vault
    }

    /// Mutable vault access, for test setup (funding accounts).
    pub fn vault_mut(&mut self) -> &mut V {
        &mut self.vault
    }

    #[must_use]
    pub fn events(&self) -> &E {
        &self.events
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════
