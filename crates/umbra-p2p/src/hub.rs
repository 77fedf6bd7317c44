use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use crate::message::PeerMessage;

pub type PeerId = u64;

/// Registry of live peer sessions and their outbound queues.
///
/// Sessions register on connect and drain their receiver into the socket;
/// gossip fans out here, optionally skipping the session a message arrived
/// on so it is never echoed back.
#[derive(Clone, Default)]
pub struct PeerHub {
    inner: Arc<Mutex<HubInner>>,
}

#[derive(Default)]
struct HubInner {
    next_id: PeerId,
    peers: HashMap<PeerId, mpsc::UnboundedSender<String>>,
}

impl PeerHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session; returns its id and the queue to drain into the socket.
    pub fn register(&self) -> (PeerId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().expect("peer hub lock poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.peers.insert(id, tx);
        (id, rx)
    }

    pub fn unregister(&self, id: PeerId) {
        self.inner.lock().expect("peer hub lock poisoned").peers.remove(&id);
    }

    /// Queue `message` for every session except `exclude` (the origin of a
    /// rebroadcast, if any).
    pub fn broadcast(&self, message: &PeerMessage, exclude: Option<PeerId>) {
        let json = message.to_json();
        let inner = self.inner.lock().expect("peer hub lock poisoned");
        for (id, tx) in &inner.peers {
            if Some(*id) == exclude {
                continue;
            }
            if tx.send(json.clone()).is_err() {
                debug!(peer = id, "dropping message for dead peer session");
            }
        }
    }

    pub fn peer_count(&self) -> usize {
        self.inner.lock().expect("peer hub lock poisoned").peers.len()
    }
}
