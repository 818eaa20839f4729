//! Shared helpers for the crate's unit tests.

use staketable_common::tokens;

use crate::node::Address;
use crate::state::{Ledger, StakingConfig};
use crate::vault::{InMemoryVault, RecordingSink};

pub(crate) type TestLedger = Ledger<InMemoryVault, RecordingSink>;

/// Deterministic owner account for a small test index.
pub(crate) fn owner_addr(fill: u8) -> Address {
    Address([fill; 20])
}

/// A 64-hex-character node id string built from one repeated byte.
pub(crate) fn node_id_str(fill: u8) -> String {
    format!("{:02x}", fill).repeat(32)
}

/// Ledger with the default config and generously funded owner accounts
/// 0..50.
pub(crate) fn funded_ledger() -> TestLedger {
    let mut vault = InMemoryVault::new();
    for fill in 0..50 {
        vault.fund(owner_addr(fill), tokens(10_000_000));
    }
    Ledger::new(StakingConfig::default(), vault, RecordingSink::new())
}
