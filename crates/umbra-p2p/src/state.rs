use std::sync::{Arc, RwLock};

use tracing::warn;

use umbra_chain::{Blockchain, ChainDocument, ChainStore};
use umbra_crypto::ring::KeyDirectory;

use crate::hub::PeerHub;

/// Shared node state handed to peer sessions and the management API.
///
/// The engine sits behind one `RwLock`; every mutation takes the write lock,
/// which serializes peer submissions exactly as arrival order dictates.
#[derive(Clone)]
pub struct NodeHandle {
    pub chain: Arc<RwLock<Blockchain>>,
    pub directory: Arc<RwLock<KeyDirectory>>,
    pub hub: PeerHub,
    store: Option<Arc<ChainStore>>,
}

impl NodeHandle {
    pub fn new(chain: Blockchain, directory: KeyDirectory) -> Self {
        Self {
            chain: Arc::new(RwLock::new(chain)),
            directory: Arc::new(RwLock::new(directory)),
            hub: PeerHub::new(),
            store: None,
        }
    }

    /// Attach the chain store so state changes land on disk.
    pub fn with_store(mut self, store: Arc<ChainStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Persist a snapshot of `bc`. Storage trouble is reported, never
    /// propagated — the in-memory chain stays authoritative.
    pub fn persist(&self, bc: &Blockchain) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&ChainDocument::snapshot(bc)) {
                warn!(error = %e, "failed to persist chain");
            }
        }
    }
}
