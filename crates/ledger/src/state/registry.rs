//! # Identity Registry
//!
//! Registration and removal of nodes, and delegator creation.
//!
//! ## Index invariants
//!
//! 1. Every `NodeRecord` in `nodes` has exactly one entry in each of
//!    `address_index`, `networking_key_index`, and `staking_key_index`.
//! 2. Each index entry points back at the record that owns the field.
//! 3. No two records share a node id, networking address, networking key,
//!    or staking key.
//!
//! All validations run before any mutation; a rejected registration
//! touches neither the primary map, the indexes, nor the vault.

use staketable_common::{Amount, LedgerError, NodeRole};

use crate::node::{Address, DelegatorRecord, NodeId, NodeRecord};
use crate::vault::{EventSink, LedgerEvent, TokenVault};

use super::Ledger;

impl<V: TokenVault, E: EventSink> Ledger<V, E> {
    /// Registers a new node and commits its initial deposit.
    ///
    /// ## Validations, in order
    ///
    /// 1. `id` is exactly 64 hexadecimal characters.
    /// 2. `role_value` is 1..=5.
    /// 3. `networking_address` is non-empty.
    /// 4. None of id / networking address / networking key / staking key is
    ///    already registered, and the two keys do not collide with each
    ///    other within this call.
    /// 5. The vault can cover `initial_commit` from `owner`.
    ///
    /// On success the node starts with `committed = initial_commit` and
    /// joins the proposed table iff that commitment already satisfies its
    /// role minimum.
    #[allow(clippy::too_many_arguments)]
    pub fn register_node(
        &mut self,
        id: &str,
        role_value: u8,
        networking_address: &str,
        networking_key: &str,
        staking_key: &str,
        owner: Address,
        initial_commit: Amount,
    ) -> Result<NodeId, LedgerError> {
        let node_id = NodeId::parse(id)?;
        let role = NodeRole::try_from(role_value)?;
        if networking_address.is_empty() {
            return Err(LedgerError::EmptyNetworkingAddress);
        }

        if self.state.nodes.contains_key(&node_id) {
            return Err(LedgerError::DuplicateNodeId { id: node_id.to_hex() });
        }
        if self.state.address_index.contains_key(networking_address) {
            return Err(LedgerError::DuplicateNetworkingAddress {
                address: networking_address.to_string(),
            });
        }
        if self.state.networking_key_index.contains_key(networking_key) {
            return Err(LedgerError::DuplicateNetworkingKey {
                key: networking_key.to_string(),
            });
        }
        if self.state.staking_key_index.contains_key(staking_key)
            || staking_key == networking_key
        {
            return Err(LedgerError::DuplicateStakingKey {
                key: staking_key.to_string(),
            });
        }

        self.vault.deposit(&owner, initial_commit)?;

        let mut record = NodeRecord::new(
            node_id,
            owner,
            role,
            networking_address.to_string(),
            networking_key.to_string(),
            staking_key.to_string(),
            self.state.config.delegation_cut,
        );
        record.buckets.commit_new(initial_commit);

        self.state
            .address_index
            .insert(networking_address.to_string(), node_id);
        self.state
            .networking_key_index
            .insert(networking_key.to_string(), node_id);
        self.state
            .staking_key_index
            .insert(staking_key.to_string(), node_id);
        self.state.nodes.insert(node_id, record);
        self.state.refresh_proposed_membership(&node_id);

        tracing::info!(node = %node_id, %role, commit = initial_commit, "node registered");
        self.events.emit(LedgerEvent::NodeRegistered {
            id: node_id,
            role,
            owner,
        });
        Ok(node_id)
    }

    /// Removes a node from candidacy.
    ///
    /// The record is retired, not destroyed: it leaves the proposed table
    /// and never re-enters it, its identity and keys stay reserved, and its
    /// balances remain addressable so they can drain through the ordinary
    /// bucket operations. Fails with a not-found error for an unknown id.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<(), LedgerError> {
        let node = self.state.require_node_mut(id)?;
        node.retired = true;
        self.state.proposed_table.remove(id);

        tracing::info!(node = %id, "node removed from candidacy");
        self.events.emit(LedgerEvent::NodeRemoved { id: *id });
        Ok(())
    }

    /// Creates a delegator under `node_id`, returning its sequence number.
    ///
    /// The target must be an eligible delegation target: registered, not
    /// retired, not an Access node, and at or above its role minimum.
    /// Sequence numbers start at 1 and are never reused; the record is
    /// never destroyed once created.
    pub fn register_delegator(
        &mut self,
        node_id: &NodeId,
        owner: Address,
    ) -> Result<u32, LedgerError> {
        let node = self.state.require_node(node_id)?;
        if node.retired {
            return Err(LedgerError::DelegationTargetRetired { id: node_id.to_hex() });
        }
        if node.role == NodeRole::Access {
            return Err(LedgerError::DelegationTargetAccessRole { id: node_id.to_hex() });
        }
        if !self
            .state
            .config
            .minimums
            .meets_minimum(node.role, &node.buckets)
        {
            return Err(LedgerError::DelegationTargetBelowMinimum { id: node_id.to_hex() });
        }

        let node = self.state.require_node_mut(node_id)?;
        let seq = node.next_delegator_seq;
        node.delegators.insert(seq, DelegatorRecord::new(owner));
        node.next_delegator_seq += 1;

        tracing::debug!(node = %node_id, seq, "delegator registered");
        self.events.emit(LedgerEvent::DelegatorRegistered {
            id: *node_id,
            seq,
            owner,
        });
        Ok(seq)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════
