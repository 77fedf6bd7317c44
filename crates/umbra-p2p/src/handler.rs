use tracing::{debug, info, warn};

use crate::hub::PeerId;
use crate::message::PeerMessage;
use crate::state::NodeHandle;

/// Apply one peer message to node state, per the sync protocol:
///
/// - `new_block`: append if it extends the local tip; rebroadcast and
///   persist on success, drop silently otherwise;
/// - `new_transaction`: run mempool admission; rebroadcast on success;
/// - `blockchain`: adopt the chain if internally valid and strictly longer,
///   rebuilding all spend state from it;
/// - `request_blockchain`: answer with the full local chain.
///
/// Returns the direct reply to send back on the same session, if any.
pub fn handle_peer_message(
    node: &NodeHandle,
    origin: PeerId,
    message: PeerMessage,
) -> Option<PeerMessage> {
    match message {
        PeerMessage::NewBlock { block } => {
            let index = block.index;
            let mut bc = node.chain.write().expect("engine lock poisoned");
            match bc.try_append_block(block) {
                Ok(()) => {
                    info!(peer = origin, index, "appended gossiped block");
                    node.persist(&bc);
                    let applied = bc.latest_block().clone();
                    drop(bc);
                    node.hub
                        .broadcast(&PeerMessage::NewBlock { block: applied }, Some(origin));
                }
                Err(e) => debug!(peer = origin, index, error = %e, "dropped gossiped block"),
            }
            None
        }

        PeerMessage::NewTransaction { transaction } => {
            let directory = node.directory.read().expect("directory lock poisoned");
            let mut bc = node.chain.write().expect("engine lock poisoned");
            match bc.add_transaction(transaction.clone(), &directory) {
                Ok(txid) => {
                    debug!(peer = origin, txid = %txid, "admitted gossiped transaction");
                    drop(bc);
                    node.hub
                        .broadcast(&PeerMessage::NewTransaction { transaction }, Some(origin));
                }
                Err(e) => debug!(peer = origin, error = %e, "rejected gossiped transaction"),
            }
            None
        }

        PeerMessage::Blockchain { chain } => {
            let mut bc = node.chain.write().expect("engine lock poisoned");
            match bc.replace_chain(chain) {
                Ok(()) => {
                    info!(peer = origin, height = bc.height(), "adopted longer peer chain");
                    node.persist(&bc);
                }
                Err(e) => debug!(peer = origin, error = %e, "kept local chain"),
            }
            None
        }

        PeerMessage::RequestBlockchain => {
            let bc = node.chain.read().expect("engine lock poisoned");
            Some(PeerMessage::Blockchain { chain: bc.chain.clone() })
        }
    }
}

/// Decode and dispatch a raw frame; protocol violations are logged and
/// swallowed so one malformed peer cannot disturb the session loop.
pub fn handle_raw_frame(node: &NodeHandle, origin: PeerId, raw: &str) -> Option<PeerMessage> {
    match PeerMessage::from_json(raw) {
        Ok(message) => handle_peer_message(node, origin, message),
        Err(e) => {
            warn!(peer = origin, error = %e, "ignoring malformed peer frame");
            None
        }
    }
}
