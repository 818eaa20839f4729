//! End-to-end epoch lifecycle scenarios: the unstaking delay, the
//! minimum-stake gate, auction exclusion, convergence of idle token
//! movements, and conservation of escrowed tokens.

use staketable_ledger::{
    query, tokens, Address, Amount, EpochPhase, ErrorKind, InMemoryVault, Ledger, LedgerError,
    NodeRole, RecordingSink, StakingConfig,
};

type TestLedger = Ledger<InMemoryVault, RecordingSink>;

fn owner(fill: u8) -> Address {
    Address([fill; 20])
}

fn id_str(fill: u8) -> String {
    format!("{:02x}", fill).repeat(32)
}

fn ledger() -> TestLedger {
    let mut vault = InMemoryVault::new();
    for fill in 0..20 {
        vault.fund(owner(fill), tokens(5_000_000));
    }
    Ledger::new(StakingConfig::default(), vault, RecordingSink::new())
}

/// Tokens the ledger owes through the vault: every bucket except rewards,
/// which are minted externally and settle into escrow separately.
fn escrow_owed(l: &TestLedger) -> Amount {
    l.state()
        .nodes_iter()
        .map(|n| {
            let own = n.buckets.total() - n.buckets.rewards;
            let delegated: Amount = n
                .delegators
                .values()
                .map(|d| d.buckets.total() - d.buckets.rewards)
                .sum();
            own + delegated
        })
        .sum()
}

#[test]
fn unstaking_delay_takes_two_token_movements() {
    let mut l = ledger();
    // Access role: minimum zero, so arbitrary stake sizes pass the auction.
    let id = l
        .register_node(&id_str(1), 5, "addr-1", "nk-1", "sk-1", owner(1), tokens(1_000))
        .unwrap();
    l.end_epoch(&[id]).unwrap();
    assert_eq!(query::node_buckets(l.state(), &id).unwrap().staked, tokens(1_000));

    l.request_unstaking(&id, tokens(600)).unwrap();

    l.move_tokens();
    let b = query::node_buckets(l.state(), &id).unwrap();
    assert_eq!(b.staked, tokens(400));
    assert_eq!(b.unstaking, tokens(600));
    assert_eq!(b.requested_unstaking, 0);
    assert_eq!(b.unstaked, 0);

    l.move_tokens();
    let b = query::node_buckets(l.state(), &id).unwrap();
    assert_eq!(b.staked, tokens(400));
    assert_eq!(b.unstaking, 0);
    assert_eq!(b.unstaked, tokens(600));

    // Converged: further idle movements change nothing.
    l.move_tokens();
    assert_eq!(query::node_buckets(l.state(), &id).unwrap(), b);
}

#[test]
fn minimum_stake_gate_blocks_partial_exit_but_not_full_exit() {
    let mut l = ledger();
    // Collector at exactly its 250 000 minimum, with one staked delegator.
    let id = l
        .register_node(&id_str(1), 1, "addr-1", "nk-1", "sk-1", owner(1), tokens(250_000))
        .unwrap();
    let seq = l.register_delegator(&id, owner(10)).unwrap();
    l.delegator_commit_new(&id, seq, tokens(50_000)).unwrap();
    l.end_epoch(&[id]).unwrap();

    assert_eq!(query::node_buckets(l.state(), &id).unwrap().staked, tokens(250_000));
    assert_eq!(
        query::delegator_buckets(l.state(), &id, seq).unwrap().staked,
        tokens(50_000)
    );

    // Any partial request dips below the floor.
    for amount in [1, tokens(1), tokens(250_000)] {
        let err = l.request_unstaking(&id, amount).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyViolation, "amount {amount}");
    }

    // The symmetric full exit is always allowed and cascades.
    l.unstake_all(&id).unwrap();
    let node = query::node_buckets(l.state(), &id).unwrap();
    assert_eq!(node.requested_unstaking, tokens(250_000));
    let delegator = query::delegator_buckets(l.state(), &id, seq).unwrap();
    assert_eq!(delegator.requested_unstaking, tokens(50_000));

    // Everything drains over the two-cycle delay.
    l.end_epoch(&[]).unwrap();
    l.end_epoch(&[]).unwrap();
    let node = query::node_buckets(l.state(), &id).unwrap();
    assert_eq!(node.staked, 0);
    assert_eq!(node.unstaked, tokens(250_000));
    let delegator = query::delegator_buckets(l.state(), &id, seq).unwrap();
    assert_eq!(delegator.unstaked, tokens(50_000));
}

#[test]
fn auction_exclusion_refunds_node_and_delegators() {
    let mut l = ledger();
    let keep = l
        .register_node(&id_str(1), 1, "addr-1", "nk-1", "sk-1", owner(1), tokens(250_000))
        .unwrap();
    let drop = l
        .register_node(&id_str(2), 3, "addr-2", "nk-2", "sk-2", owner(2), tokens(1_400_000))
        .unwrap();
    let seq = l.register_delegator(&drop, owner(10)).unwrap();
    l.delegator_commit_new(&drop, seq, tokens(100_000)).unwrap();
    l.end_epoch(&[keep, drop]).unwrap();

    // New commitment that will be released immediately on exclusion.
    l.delegator_commit_new(&drop, seq, tokens(2_000)).unwrap();

    l.end_staking_auction(&[keep]).unwrap();

    assert_eq!(query::current_table(l.state()), vec![keep]);
    assert!(!query::proposed_table(l.state()).contains(&drop));

    let node = query::node_buckets(l.state(), &drop).unwrap();
    assert_eq!(node.requested_unstaking, tokens(1_400_000));
    let delegator = query::delegator_buckets(l.state(), &drop, seq).unwrap();
    assert_eq!(delegator.requested_unstaking, tokens(100_000));
    assert_eq!(delegator.unstaked, tokens(2_000));

    // The forced request becomes visible as unstaking after the movement.
    l.move_tokens();
    let node = query::node_buckets(l.state(), &drop).unwrap();
    assert_eq!(node.staked, 0);
    assert_eq!(node.unstaking, tokens(1_400_000));
    let delegator = query::delegator_buckets(l.state(), &drop, seq).unwrap();
    assert_eq!(delegator.unstaking, tokens(100_000));
}

#[test]
fn totals_match_independent_recomputation_every_phase() {
    let mut l = ledger();
    let a = l
        .register_node(&id_str(1), 1, "addr-1", "nk-1", "sk-1", owner(1), tokens(250_000))
        .unwrap();
    let b = l
        .register_node(&id_str(2), 2, "addr-2", "nk-2", "sk-2", owner(2), tokens(500_000))
        .unwrap();
    let seq = l.register_delegator(&b, owner(10)).unwrap();
    l.delegator_commit_new(&b, seq, tokens(75_000)).unwrap();

    let check = |l: &TestLedger| {
        assert_eq!(
            l.state().total_staked(),
            l.state().recomputed_total_staked(),
            "cached total diverged from the bucket sets"
        );
        let by_role_sum: Amount = NodeRole::ALL
            .iter()
            .map(|r| query::total_staked_by_role(l.state(), *r))
            .sum();
        assert_eq!(by_role_sum, l.state().total_staked());
    };

    check(&l);
    l.end_staking_auction(&[a, b]).unwrap();
    check(&l);
    l.pay_rewards().unwrap();
    check(&l);
    l.move_tokens();
    check(&l);
    assert_eq!(l.state().total_staked(), tokens(825_000));

    l.request_unstaking(&a, tokens(100_000)).unwrap();
    l.end_epoch(&[a, b]).unwrap();
    check(&l);
    assert_eq!(l.state().total_staked(), tokens(725_000));
}

#[test]
fn escrow_matches_non_reward_balances_throughout() {
    let mut l = ledger();
    let a = l
        .register_node(&id_str(1), 1, "addr-1", "nk-1", "sk-1", owner(1), tokens(250_000))
        .unwrap();
    assert_eq!(l.vault().escrowed(), escrow_owed(&l));

    let seq = l.register_delegator(&a, owner(10)).unwrap();
    l.delegator_commit_new(&a, seq, tokens(10_000)).unwrap();
    assert_eq!(l.vault().escrowed(), escrow_owed(&l));

    l.end_epoch(&[a]).unwrap();
    assert_eq!(l.vault().escrowed(), escrow_owed(&l));

    l.request_unstaking(&a, tokens(1)).unwrap_err(); // gated, no change
    l.delegator_request_unstaking(&a, seq, tokens(4_000)).unwrap();
    l.end_epoch(&[a]).unwrap();
    l.end_epoch(&[a]).unwrap();
    l.delegator_withdraw_unstaked(&a, seq, tokens(4_000)).unwrap();
    assert_eq!(l.vault().escrowed(), escrow_owed(&l));
    assert_eq!(
        l.vault().balance_of(&owner(10)),
        tokens(5_000_000) - tokens(10_000) + tokens(4_000)
    );
}

#[test]
fn wrong_phase_operations_are_rejected_cleanly() {
    let mut l = ledger();
    let a = l
        .register_node(&id_str(1), 1, "addr-1", "nk-1", "sk-1", owner(1), tokens(250_000))
        .unwrap();

    // Rewards before the table is finalized.
    let err = l.pay_rewards().unwrap_err();
    assert_eq!(
        err,
        LedgerError::WrongEpochPhase {
            operation: "pay_rewards".into(),
            phase: "AuctionOpen".into(),
        }
    );

    l.end_staking_auction(&[a]).unwrap();
    assert_eq!(l.state().phase(), EpochPhase::Finalized);

    // A second auction before the cycle completes.
    let err = l.end_staking_auction(&[a]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyViolation);

    // move_tokens is valid here (end_epoch legitimately skips rewards) and
    // reopens the auction.
    l.move_tokens();
    assert_eq!(l.state().phase(), EpochPhase::AuctionOpen);
    l.end_staking_auction(&[a]).unwrap();
}

#[test]
fn full_week_in_the_life() {
    let mut l = ledger();
    let collector = l
        .register_node(&id_str(1), 1, "addr-1", "nk-1", "sk-1", owner(1), tokens(250_000))
        .unwrap();
    let execution = l
        .register_node(&id_str(2), 3, "addr-2", "nk-2", "sk-2", owner(2), tokens(1_400_000))
        .unwrap();
    let seq = l.register_delegator(&execution, owner(10)).unwrap();
    l.delegator_commit_new(&execution, seq, tokens(100_000)).unwrap();

    // Epoch 1: stake everything.
    l.end_epoch(&[collector, execution]).unwrap();
    assert_eq!(l.state().total_staked(), tokens(1_750_000));

    // Epoch 2: finalize, pay, move.
    l.end_staking_auction(&[collector, execution]).unwrap();
    l.pay_rewards().unwrap();
    l.move_tokens();

    // Scale: 1 250 000 / 1 750 000 = 0.71428571 (truncated).
    // Collector: 250 000 * 0.71428571 = 178 571.4275.
    assert_eq!(
        query::node_buckets(l.state(), &collector).unwrap().rewards,
        17_857_142_750_000
    );
    // Delegator gross: 100 000 * 0.71428571 = 71 428.571, keeps 92%
    // = 65 714.28532.
    assert_eq!(
        query::delegator_buckets(l.state(), &execution, seq).unwrap().rewards,
        6_571_428_532_000
    );
    // Execution operator: own 1 400 000 * 0.71428571 = 999 999.994 plus
    // the 8% cut 5 714.28568.
    assert_eq!(
        query::node_buckets(l.state(), &execution).unwrap().rewards,
        99_999_999_400_000 + 571_428_568_000
    );

    // The tables carried over unchanged.
    assert_eq!(query::current_table(l.state()), vec![collector, execution]);
    assert_eq!(query::proposed_table(l.state()), vec![collector, execution]);
}
