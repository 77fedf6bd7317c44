//! Handler-level sync tests: gossip acceptance, fork adoption and the
//! no-rebroadcast rule for rejected blocks.

use umbra_chain::Blockchain;
use umbra_core::transaction::Transaction;
use umbra_core::types::{unix_now, Address};
use umbra_crypto::ring::KeyDirectory;
use umbra_p2p::{handle_peer_message, NodeHandle, PeerMessage};
use umbra_wallet::Wallet;

fn miner() -> Address {
    Address::new("f".repeat(64))
}

/// A node plus one registered observer session and one origin session.
fn node_with_peers() -> (
    NodeHandle,
    u64,
    tokio::sync::mpsc::UnboundedReceiver<String>,
    tokio::sync::mpsc::UnboundedReceiver<String>,
) {
    let node = NodeHandle::new(Blockchain::new(1), KeyDirectory::new());
    let (origin, origin_rx) = node.hub.register();
    let (_observer, observer_rx) = node.hub.register();
    (node, origin, origin_rx, observer_rx)
}

/// A second chain sharing the node's genesis, for producing gossipable
/// successors.
fn fork_of(node: &NodeHandle) -> Blockchain {
    let chain = node.chain.read().unwrap().chain.clone();
    Blockchain::from_parts(chain, Vec::new(), 1).unwrap()
}

#[test]
fn valid_block_is_appended_and_rebroadcast() {
    let (node, origin, mut origin_rx, mut observer_rx) = node_with_peers();

    let mut remote = fork_of(&node);
    let block = remote.mine_pending(&miner(), None).unwrap();

    let reply = handle_peer_message(&node, origin, PeerMessage::NewBlock { block });
    assert!(reply.is_none());
    assert_eq!(node.chain.read().unwrap().height(), 2);

    // Rebroadcast reaches the observer but never echoes to the origin.
    let forwarded = observer_rx.try_recv().unwrap();
    assert!(forwarded.contains(r#""type":"new_block""#));
    assert!(origin_rx.try_recv().is_err());
}

#[test]
fn block_off_tip_is_dropped_without_rebroadcast() {
    let (node, origin, _origin_rx, mut observer_rx) = node_with_peers();

    let mut remote = fork_of(&node);
    remote.mine_pending(&miner(), None).unwrap();
    // Height 2's successor does not extend our height-1 tip.
    let orphan = remote.mine_pending(&miner(), None).unwrap();

    handle_peer_message(&node, origin, PeerMessage::NewBlock { block: orphan });

    assert_eq!(node.chain.read().unwrap().height(), 1);
    assert!(observer_rx.try_recv().is_err());
}

#[test]
fn longer_chain_is_adopted_and_mempool_cleared() {
    let (node, origin, _origin_rx, _observer_rx) = node_with_peers();

    // Local progress: one block and one pending transaction.
    let alice = Wallet::generate().unwrap();
    {
        let mut bc = node.chain.write().unwrap();
        bc.mine_pending(&alice.address(), None).unwrap();
        let mut tx = Transaction::standard("b".repeat(64).as_str().into(), 2.0, None, unix_now());
        alice.sign_transaction(&mut tx);
        let directory = node.directory.read().unwrap();
        bc.add_transaction(tx, &directory).unwrap();
    }

    // A peer presents a strictly longer fork from the same genesis.
    let mut remote = fork_of(&node);
    for _ in 0..3 {
        remote.mine_pending(&miner(), None).unwrap();
    }
    handle_peer_message(&node, origin, PeerMessage::Blockchain { chain: remote.chain.clone() });

    let bc = node.chain.read().unwrap();
    assert_eq!(bc.height(), 4);
    assert!(bc.pending.is_empty());
    assert_eq!(bc.utxos(), remote.utxos());
    assert_eq!(bc.total_supply(), remote.total_supply());
}

#[test]
fn shorter_chain_is_discarded() {
    let (node, origin, _origin_rx, _observer_rx) = node_with_peers();
    {
        let mut bc = node.chain.write().unwrap();
        bc.mine_pending(&miner(), None).unwrap();
        bc.mine_pending(&miner(), None).unwrap();
    }
    let tip_before = node.chain.read().unwrap().latest_block().hash.clone();

    let remote = fork_of(&node);
    handle_peer_message(
        &node,
        origin,
        PeerMessage::Blockchain { chain: remote.chain[..1].to_vec() },
    );

    let bc = node.chain.read().unwrap();
    assert_eq!(bc.height(), 3);
    assert_eq!(bc.latest_block().hash, tip_before);
}

#[test]
fn gossiped_transaction_is_admitted_and_forwarded() {
    let (node, origin, mut origin_rx, mut observer_rx) = node_with_peers();

    let alice = Wallet::generate().unwrap();
    node.chain.write().unwrap().mine_pending(&alice.address(), None).unwrap();

    let mut tx = Transaction::standard("b".repeat(64).as_str().into(), 3.0, None, unix_now());
    alice.sign_transaction(&mut tx);

    handle_peer_message(&node, origin, PeerMessage::NewTransaction { transaction: tx.clone() });

    assert_eq!(node.chain.read().unwrap().pending.len(), 1);
    assert!(observer_rx.try_recv().unwrap().contains(r#""type":"new_transaction""#));
    assert!(origin_rx.try_recv().is_err());

    // The same gossip arriving again is rejected and not forwarded.
    handle_peer_message(&node, origin, PeerMessage::NewTransaction { transaction: tx });
    assert_eq!(node.chain.read().unwrap().pending.len(), 1);
    assert!(observer_rx.try_recv().is_err());
}

#[test]
fn request_blockchain_returns_full_chain() {
    let (node, origin, _origin_rx, _observer_rx) = node_with_peers();
    node.chain.write().unwrap().mine_pending(&miner(), None).unwrap();

    let reply = handle_peer_message(&node, origin, PeerMessage::RequestBlockchain);
    match reply {
        Some(PeerMessage::Blockchain { chain }) => assert_eq!(chain.len(), 2),
        other => panic!("expected blockchain reply, got {other:?}"),
    }
}
