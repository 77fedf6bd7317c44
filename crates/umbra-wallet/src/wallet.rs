use bip39::{Language, Mnemonic, MnemonicType, Seed};
use tracing::debug;
use zeroize::Zeroizing;

use umbra_core::constants::{AMOUNT_EPSILON, RING_SIZE};
use umbra_core::error::UmbraError;
use umbra_core::transaction::{Transaction, TxInput, TxOutput};
use umbra_core::types::{unix_now, Address, Amount, UtxoQuery};
use umbra_crypto::ring::{create_ring_signature, key_image, KeyDirectory};
use umbra_crypto::{verify_ecdsa, KeyPair};

/// P-384 scalar width; the signing key takes this many bytes of the BIP-39
/// seed.
const SCALAR_BYTES: usize = 48;

/// A spending identity: keypair plus the mnemonic that produced it (absent
/// when restored from a bare private key).
pub struct Wallet {
    keypair: KeyPair,
    seed_phrase: Option<String>,
}

impl Wallet {
    /// Generate a fresh wallet from a new 24-word mnemonic. The phrase
    /// recovers this exact wallet via [`Wallet::from_seed`].
    pub fn generate() -> Result<Self, UmbraError> {
        let mnemonic = Mnemonic::new(MnemonicType::Words24, Language::English);
        Self::from_mnemonic(mnemonic)
    }

    /// Restore a wallet from a BIP-39 English phrase.
    pub fn from_seed(phrase: &str) -> Result<Self, UmbraError> {
        let mnemonic = Mnemonic::from_phrase(phrase, Language::English)
            .map_err(|e| UmbraError::Crypto(format!("invalid seed phrase: {e}")))?;
        Self::from_mnemonic(mnemonic)
    }

    fn from_mnemonic(mnemonic: Mnemonic) -> Result<Self, UmbraError> {
        let seed = Seed::new(&mnemonic, "");
        // The signing scalar takes the full curve-order width of the PBKDF2
        // seed. A slice landing outside the group order is vanishingly rare
        // but surfaced rather than wrapped.
        let scalar = Zeroizing::new(seed.as_bytes()[..SCALAR_BYTES].to_vec());
        let keypair = KeyPair::from_secret_bytes(&scalar)
            .map_err(|e| UmbraError::Crypto(e.to_string()))?;
        Ok(Self { keypair, seed_phrase: Some(mnemonic.phrase().to_string()) })
    }

    /// Restore from a hex private scalar. No seed phrase is recoverable.
    pub fn from_private_key(private_key_hex: &str) -> Result<Self, UmbraError> {
        let keypair = KeyPair::from_secret_hex(private_key_hex)
            .map_err(|e| UmbraError::Crypto(e.to_string()))?;
        Ok(Self { keypair, seed_phrase: None })
    }

    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    pub fn public_key_hex(&self) -> String {
        self.keypair.public_key_hex()
    }

    pub fn private_key_hex(&self) -> String {
        self.keypair.secret_hex()
    }

    pub fn seed_phrase(&self) -> Option<&str> {
        self.seed_phrase.as_deref()
    }

    /// Sign arbitrary bytes; base64 `r‖s`.
    pub fn sign(&self, message: &[u8]) -> String {
        self.keypair.sign(message)
    }

    /// Stateless signature check, the counterpart of [`Wallet::sign`].
    pub fn verify(message: &[u8], signature_b64: &str, pubkey_hex: &str) -> bool {
        verify_ecdsa(pubkey_hex, message, signature_b64).is_ok()
    }

    /// Authorize a transparent transaction: set the sender key, then sign
    /// the canonical payload (signature fields excluded from the preimage).
    pub fn sign_transaction(&self, tx: &mut Transaction) {
        tx.sender_pubkey = Some(self.public_key_hex());
        let signature = self.sign(&tx.signing_bytes());
        tx.signature = Some(signature);
    }

    /// Assemble an anonymous transfer of `amount` to `receiver`.
    ///
    /// Unspent outputs of this wallet are consumed first-fit until they
    /// cover the amount; any excess returns to the wallet as change. The
    /// key image always binds the spend; the ring signature is attached
    /// only when the directory offers at least two keys to hide among —
    /// its absence is not fatal.
    pub fn create_anonymous_transaction(
        &self,
        utxos: &dyn UtxoQuery,
        directory: &KeyDirectory,
        receiver: Address,
        amount: Amount,
        metadata: Option<String>,
    ) -> Result<Transaction, UmbraError> {
        let available = utxos.unspent_outputs(&self.address());

        let mut selected: Vec<&TxOutput> = Vec::new();
        let mut gathered: Amount = 0.0;
        for output in &available {
            if gathered + AMOUNT_EPSILON >= amount {
                break;
            }
            selected.push(output);
            gathered += output.amount;
        }
        if gathered + AMOUNT_EPSILON < amount {
            return Err(UmbraError::InsufficientFunds { need: amount, have: gathered });
        }

        let mut tx = Transaction::anonymous(receiver.clone(), amount, metadata, unix_now());
        tx.inputs = selected
            .iter()
            .map(|o| TxInput::new(o.txid.clone(), o.index))
            .collect();
        tx.outputs.push(TxOutput::unassigned(receiver, amount));
        let change = gathered - amount;
        if change > AMOUNT_EPSILON {
            tx.outputs.push(TxOutput::unassigned(self.address(), change));
        }

        let secret = Zeroizing::new(self.keypair.secret_bytes());
        tx.key_image = Some(key_image(&secret, &tx.inputs));

        if directory.len() >= 2 {
            let ring = create_ring_signature(&tx.signing_bytes(), &self.keypair, RING_SIZE);
            tx.ring_signature = Some(ring);
        } else {
            debug!(
                wallets = directory.len(),
                "directory too small for a ring; relying on key image only"
            );
        }
        Ok(tx)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Wallet {{ address: {} }}", self.address())
    }
}
