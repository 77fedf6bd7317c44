use serde::{Deserialize, Serialize};

use umbra_core::block::Block;
use umbra_core::error::UmbraError;
use umbra_core::transaction::Transaction;

/// Messages exchanged over a peer session. The wire form is a JSON object
/// with a `type` discriminator, e.g. `{"type":"new_block","block":{…}}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMessage {
    /// A full chain — sent as the hello on connect and in answer to
    /// `request_blockchain`.
    Blockchain { chain: Vec<Block> },

    /// Ask the peer for its full chain.
    RequestBlockchain,

    /// Gossip: a freshly mined block.
    NewBlock { block: Block },

    /// Gossip: a transaction admitted to the sender's mempool.
    NewTransaction { transaction: Transaction },
}

impl PeerMessage {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("peer message serialization is infallible")
    }

    pub fn from_json(raw: &str) -> Result<Self, UmbraError> {
        serde_json::from_str(raw).map_err(|e| UmbraError::PeerProtocol(e.to_string()))
    }
}
