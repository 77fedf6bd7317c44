use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use umbra_core::error::UmbraError;
use umbra_crypto::ring::KeyDirectory;

use crate::wallet::Wallet;

/// One persisted wallet. The legacy file shape used `private_key` /
/// `public_key` keys and carried extra fields (`aes_key`, `seed_phrase`);
/// aliases and serde's unknown-field tolerance keep those loadable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalletRecord {
    #[serde(alias = "private_key")]
    pub private_key_hex: String,
    #[serde(alias = "public_key")]
    pub public_key_hex: String,
}

/// The `wallets.json` registry: `address → WalletRecord`, written as a
/// whole-file replacement on every change.
pub struct WalletStore {
    path: PathBuf,
    records: BTreeMap<String, WalletRecord>,
}

impl WalletStore {
    /// Load the store at `path`; a missing or empty file is fresh state.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, UmbraError> {
        let path = path.as_ref().to_path_buf();
        let records = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, records })
    }

    /// Register a wallet and persist.
    pub fn insert(&mut self, wallet: &Wallet) -> Result<(), UmbraError> {
        self.records.insert(
            wallet.address().to_string(),
            WalletRecord {
                private_key_hex: wallet.private_key_hex(),
                public_key_hex: wallet.public_key_hex(),
            },
        );
        self.save()
    }

    pub fn get(&self, address: &str) -> Option<&WalletRecord> {
        self.records.get(address)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Feed every stored public key into a [`KeyDirectory`]. Records whose
    /// key material no longer parses are skipped with a warning rather than
    /// poisoning startup.
    pub fn populate_directory(&self, directory: &mut KeyDirectory) {
        for (address, record) in &self.records {
            if let Err(e) = directory.register(&record.public_key_hex) {
                warn!(address = %address, error = %e, "skipping unparseable wallet record");
            }
        }
    }

    fn save(&self) -> Result<(), UmbraError> {
        let json = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}
