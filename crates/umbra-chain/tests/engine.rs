//! Engine integration tests: emission, transparent and anonymous transfers,
//! halving, rebuild determinism and chain replacement.
//!
//! All chains run at difficulty 1 so proof-of-work is instant.

use umbra_chain::Blockchain;
use umbra_core::constants::{DEFAULT_REWARD, GENESIS_SUPPLY};
use umbra_core::error::UmbraError;
use umbra_core::transaction::{Transaction, TxInput, TxOutput};
use umbra_core::types::{unix_now, Address, UtxoQuery};
use umbra_crypto::ring::KeyDirectory;
use umbra_crypto::sender_address;
use umbra_wallet::Wallet;

fn miner_address() -> Address {
    Address::new("a".repeat(64))
}

/// Mine `n` empty blocks to `miner`.
fn mine_empty(bc: &mut Blockchain, miner: &Address, n: usize) {
    for _ in 0..n {
        bc.mine_pending(miner, None).unwrap();
    }
}

#[test]
fn mining_three_blocks_pays_three_rewards() {
    let mut bc = Blockchain::new(1);
    let miner = miner_address();
    mine_empty(&mut bc, &miner, 3);

    assert_eq!(bc.height(), 4);
    assert_eq!(bc.balance(&miner), 3.0 * DEFAULT_REWARD);
    assert_eq!(bc.total_supply(), GENESIS_SUPPLY + 3.0 * DEFAULT_REWARD);
    assert!(bc.is_chain_valid());
}

#[test]
fn transparent_transfer_moves_balance() {
    let mut bc = Blockchain::new(1);
    let directory = KeyDirectory::new();

    let alice = Wallet::generate().unwrap();
    let bob = Wallet::generate().unwrap();
    mine_empty(&mut bc, &alice.address(), 3);

    let mut tx = Transaction::standard(bob.address(), 30.0, None, unix_now());
    alice.sign_transaction(&mut tx);
    bc.add_transaction(tx, &directory).unwrap();
    bc.mine_pending(&alice.address(), None).unwrap();

    assert_eq!(bc.balance(&bob.address()), 30.0);
    assert_eq!(bc.balance(&alice.address()), 3.0 * DEFAULT_REWARD - 30.0 + DEFAULT_REWARD);
}

#[test]
fn transparent_transfer_requires_funds() {
    let mut bc = Blockchain::new(1);
    let directory = KeyDirectory::new();
    let pauper = Wallet::generate().unwrap();

    let mut tx = Transaction::standard("b".repeat(64).as_str().into(), 10.0, None, unix_now());
    pauper.sign_transaction(&mut tx);
    let err = bc.add_transaction(tx, &directory).unwrap_err();
    assert!(matches!(err, UmbraError::InsufficientFunds { .. }));
}

#[test]
fn anonymous_transfer_registers_key_image() {
    let mut bc = Blockchain::new(1);

    // Four registered wallets so rings have company.
    let alice = Wallet::generate().unwrap();
    let carol = Wallet::generate().unwrap();
    let mut directory = KeyDirectory::new();
    directory.register(&alice.public_key_hex()).unwrap();
    directory.register(&carol.public_key_hex()).unwrap();
    directory.register(&Wallet::generate().unwrap().public_key_hex()).unwrap();
    directory.register(&Wallet::generate().unwrap().public_key_hex()).unwrap();

    mine_empty(&mut bc, &alice.address(), 2);

    let tx = alice
        .create_anonymous_transaction(&bc, &directory, carol.address(), 20.0, None)
        .unwrap();
    let image = tx.key_image.clone().unwrap();
    assert_eq!(sender_address(&tx).unwrap().as_str(), "ANONYMOUS");

    let resubmit = tx.clone();
    bc.add_transaction(tx, &directory).unwrap();
    bc.mine_pending(&alice.address(), None).unwrap();

    assert!(bc.key_images().contains(&image));
    assert_eq!(bc.balance(&carol.address()), 20.0);

    // Replaying the exact same spend must be rejected.
    let err = bc.add_transaction(resubmit, &directory).unwrap_err();
    assert!(matches!(
        err,
        UmbraError::DuplicateTransaction(_) | UmbraError::DoubleSpendKeyImage(_)
    ));
}

#[test]
fn anonymous_change_returns_to_sender() {
    let mut bc = Blockchain::new(1);
    let directory = KeyDirectory::new();
    let alice = Wallet::generate().unwrap();
    mine_empty(&mut bc, &alice.address(), 1);

    // 50-unit coinbase output, 20 spent: 30 comes back as a fresh UTXO.
    let tx = alice
        .create_anonymous_transaction(&bc, &directory, "c".repeat(64).as_str().into(), 20.0, None)
        .unwrap();
    bc.add_transaction(tx, &directory).unwrap();
    bc.mine_pending(&"m".repeat(64).as_str().into(), None).unwrap();

    let change: f64 = bc
        .unspent_outputs(&alice.address())
        .iter()
        .map(|o| o.amount)
        .sum();
    assert!((change - 30.0).abs() < 1e-9);
}

#[test]
fn halving_schedule_floors_at_one() {
    let mut bc = Blockchain::new(1);
    bc.halving_interval = 4;
    let miner = miner_address();

    let mut rewards = Vec::new();
    for _ in 0..10 {
        let block = bc.mine_pending(&miner, None).unwrap();
        rewards.push(block.transactions[0].amount);
    }

    // Blocks 1-3 pay 50; the boundary at block 4 halves to 25, block 8 to 12.
    assert_eq!(&rewards[..3], &[50.0, 50.0, 50.0]);
    assert_eq!(&rewards[3..7], &[25.0, 25.0, 25.0, 25.0]);
    assert_eq!(&rewards[7..], &[12.0, 12.0, 12.0]);

    // Exhaust the schedule: the subsidy floors at 1.
    bc.halving_interval = 1;
    for _ in 0..10 {
        bc.mine_pending(&miner, None).unwrap();
    }
    let floor_block = bc.mine_pending(&miner, None).unwrap();
    assert_eq!(floor_block.transactions[0].amount, 1.0);
}

#[test]
fn utxo_validation_resolves_inputs_and_key_images() {
    let mut bc = Blockchain::new(1);
    let directory = KeyDirectory::new();
    let alice = Wallet::generate().unwrap();
    mine_empty(&mut bc, &alice.address(), 1);

    let good = alice
        .create_anonymous_transaction(&bc, &directory, "d".repeat(64).as_str().into(), 10.0, None)
        .unwrap();
    assert!(bc.validate_transaction_utxo(&good, &directory).is_ok());

    // An input referencing nothing in the UTXO set.
    let mut phantom = good.clone();
    phantom.inputs[0].prev_txid = "0".repeat(64).as_str().into();
    assert!(matches!(
        bc.validate_transaction_utxo(&phantom, &directory),
        Err(UmbraError::UnknownOutpoint { .. })
    ));

    // Outputs exceeding the resolved inputs.
    let mut greedy = good.clone();
    greedy.outputs[0].amount = 90.0;
    assert!(matches!(
        bc.validate_transaction_utxo(&greedy, &directory),
        Err(UmbraError::InsufficientFunds { .. })
    ));

    // Burn the key image, then try to reuse it on a fresh outpoint.
    bc.add_transaction(good.clone(), &directory).unwrap();
    bc.mine_pending(&alice.address(), None).unwrap();

    let mut reuse = alice
        .create_anonymous_transaction(&bc, &directory, "e".repeat(64).as_str().into(), 5.0, None)
        .unwrap();
    reuse.key_image = good.key_image.clone();
    assert!(matches!(
        bc.validate_transaction_utxo(&reuse, &directory),
        Err(UmbraError::DoubleSpendKeyImage(_))
    ));
}

#[test]
fn standard_spend_must_own_its_inputs() {
    let mut bc = Blockchain::new(1);
    let directory = KeyDirectory::new();
    let alice = Wallet::generate().unwrap();
    let bob = Wallet::generate().unwrap();
    mine_empty(&mut bc, &bob.address(), 1);

    // Alice references Bob's coinbase output as her own input.
    let theirs = bc.unspent_outputs(&bob.address())[0].clone();
    let mut tx = Transaction::standard("d".repeat(64).as_str().into(), 10.0, None, unix_now());
    tx.inputs.push(TxInput::new(theirs.txid.clone(), theirs.index));
    tx.outputs.push(TxOutput::unassigned("d".repeat(64).as_str().into(), 10.0));
    alice.sign_transaction(&mut tx);

    assert!(matches!(
        bc.validate_transaction_utxo(&tx, &directory),
        Err(UmbraError::ForeignOutpoint { .. })
    ));

    // The same shape spending Bob's own output passes for Bob.
    let mut own = Transaction::standard("d".repeat(64).as_str().into(), 10.0, None, unix_now());
    own.inputs.push(TxInput::new(theirs.txid, theirs.index));
    own.outputs.push(TxOutput::unassigned("d".repeat(64).as_str().into(), 10.0));
    bob.sign_transaction(&mut own);
    assert!(bc.validate_transaction_utxo(&own, &directory).is_ok());
}

#[test]
fn rebuild_reproduces_spend_state() {
    let mut bc = Blockchain::new(1);
    let directory = KeyDirectory::new();
    let alice = Wallet::generate().unwrap();
    mine_empty(&mut bc, &alice.address(), 2);

    let tx = alice
        .create_anonymous_transaction(&bc, &directory, "d".repeat(64).as_str().into(), 15.0, None)
        .unwrap();
    bc.add_transaction(tx, &directory).unwrap();
    bc.mine_pending(&alice.address(), None).unwrap();

    let utxos_before = bc.utxos().clone();
    let images_before = bc.key_images().clone();
    let supply_before = bc.total_supply();

    bc.rebuild_state().unwrap();

    assert_eq!(bc.utxos(), &utxos_before);
    assert_eq!(bc.key_images(), &images_before);
    assert_eq!(bc.total_supply(), supply_before);
}

#[test]
fn duplicate_transaction_rejected_from_mempool() {
    let mut bc = Blockchain::new(1);
    let directory = KeyDirectory::new();
    let alice = Wallet::generate().unwrap();
    mine_empty(&mut bc, &alice.address(), 1);

    let mut tx = Transaction::standard("b".repeat(64).as_str().into(), 5.0, None, unix_now());
    alice.sign_transaction(&mut tx);
    bc.add_transaction(tx.clone(), &directory).unwrap();

    let err = bc.add_transaction(tx, &directory).unwrap_err();
    assert!(matches!(err, UmbraError::DuplicateTransaction(_)));
}

#[test]
fn tampered_block_invalidates_chain() {
    let mut bc = Blockchain::new(1);
    mine_empty(&mut bc, &miner_address(), 2);
    assert!(bc.is_chain_valid());

    bc.chain[1].transactions[0].amount += 1.0;
    assert!(!bc.is_chain_valid());
}

#[test]
fn longer_valid_chain_replaces_local() {
    let mut local = Blockchain::new(1);
    let mut remote = Blockchain::from_parts(local.chain.clone(), Vec::new(), 1).unwrap();
    let directory = KeyDirectory::new();

    mine_empty(&mut local, &miner_address(), 1);
    mine_empty(&mut remote, &"b".repeat(64).as_str().into(), 3);

    // Local has a pending transaction that dies with the replacement.
    let alice = Wallet::generate().unwrap();
    mine_empty(&mut local, &alice.address(), 1);
    let mut tx = Transaction::standard("c".repeat(64).as_str().into(), 1.0, None, unix_now());
    alice.sign_transaction(&mut tx);
    local.add_transaction(tx, &directory).unwrap();

    local.replace_chain(remote.chain.clone()).unwrap();

    assert_eq!(local.height(), remote.height());
    assert_eq!(local.total_supply(), remote.total_supply());
    assert_eq!(local.utxos(), remote.utxos());
    assert!(local.pending.is_empty());
}

#[test]
fn shorter_or_equal_chain_rejected() {
    let mut local = Blockchain::new(1);
    let remote_genesis = local.chain.clone();
    mine_empty(&mut local, &miner_address(), 2);

    let err = local.replace_chain(remote_genesis).unwrap_err();
    assert!(matches!(err, UmbraError::ChainTooShort { ours: 3, theirs: 1 }));
    assert_eq!(local.height(), 3);
}

#[test]
fn foreign_chain_with_bad_pow_rejected() {
    let mut local = Blockchain::new(1);
    let mut candidate = local.chain.clone();

    // Forge two blocks without mining them.
    let mut forged = candidate[0].clone();
    forged.index = 1;
    forged.previous_hash = candidate[0].hash.clone();
    forged.hash = "deadbeef".into();
    candidate.push(forged.clone());
    let mut forged2 = forged;
    forged2.index = 2;
    candidate.push(forged2);

    let err = local.replace_chain(candidate).unwrap_err();
    assert!(matches!(err, UmbraError::MalformedBlock(_)));
    assert_eq!(local.height(), 1);
}
