//! # Admin Configuration Operations
//!
//! Single atomic configuration writes, valid in any epoch phase. Bounds
//! are checked before anything is written; amounts are unsigned by type.

use staketable_common::{is_fraction, Amount, LedgerError, ROLE_COUNT};

use crate::vault::{EventSink, TokenVault};

use super::Ledger;

impl<V: TokenVault, E: EventSink> Ledger<V, E> {
    /// Changes the operator cut of delegator rewards.
    ///
    /// `value` is a fraction of 1.0 in 8-decimal units and must not exceed
    /// 1.0. There is no per-node override operation, so the new cut is
    /// applied to the default *and* to every existing node record.
    pub fn change_cut_percentage(&mut self, value: Amount) -> Result<(), LedgerError> {
        if !is_fraction(value) {
            return Err(LedgerError::InvalidFraction { value });
        }
        self.state.config.delegation_cut = value;
        for node in self.state.nodes.values_mut() {
            node.delegation_cut = value;
        }
        tracing::info!(cut = value, "delegation cut changed");
        Ok(())
    }

    /// Changes the total payout of future reward runs. Takes effect at the
    /// next `pay_rewards`.
    pub fn change_weekly_payout(&mut self, value: Amount) {
        self.state.config.weekly_payout = value;
        tracing::info!(payout = value, "weekly payout changed");
    }

    /// Replaces all five per-role minimums atomically, in wire order, and
    /// re-derives the proposed table under the new floors.
    pub fn change_minimums(&mut self, minimums: [Amount; ROLE_COUNT]) {
        self.state.config.minimums.set_all(minimums);
        self.state.rebuild_proposed_table();
        tracing::info!(?minimums, "stake minimums changed");
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════
