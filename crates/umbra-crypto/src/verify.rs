//! Transaction signature dispatch.

use umbra_core::constants::ANONYMOUS_SENDER;
use umbra_core::error::UmbraError;
use umbra_core::transaction::{Transaction, TxType};
use umbra_core::types::Address;

use crate::keys::{address_from_pubkey_hex, verify_ecdsa};
use crate::ring::{verify_ring_signature, KeyDirectory};

/// Verify whatever authorization a transaction carries.
///
/// - coinbase: accepted unconditionally;
/// - anonymous: the ring signature must verify if present — a ring-less
///   anonymous transaction is allowed, its double-spend defence is the key
///   image plus outpoint consumption;
/// - standard: the per-transaction ECDSA signature over the canonical
///   signing payload must verify against the declared sender key.
pub fn verify_transaction(tx: &Transaction, directory: &KeyDirectory) -> Result<(), UmbraError> {
    match tx.tx_type {
        TxType::Coinbase => Ok(()),
        TxType::Anonymous => match &tx.ring_signature {
            Some(ring) => verify_ring_signature(&tx.signing_bytes(), ring, directory),
            None => Ok(()),
        },
        TxType::Standard => {
            let pubkey = tx
                .sender_pubkey
                .as_deref()
                .ok_or(UmbraError::MalformedTransaction("missing sender_pubkey"))?;
            let signature = tx
                .signature
                .as_deref()
                .ok_or(UmbraError::MalformedTransaction("missing signature"))?;
            verify_ecdsa(pubkey, &tx.signing_bytes(), signature)
                .map_err(|_| UmbraError::InvalidSignature)
        }
    }
}

/// The sender's address as the ledger sees it: the `"ANONYMOUS"` sentinel
/// for ring-signed transfers, the key-derived address for standard ones,
/// absent for coinbase.
pub fn sender_address(tx: &Transaction) -> Option<Address> {
    match tx.tx_type {
        TxType::Anonymous => Some(Address::new(ANONYMOUS_SENDER.to_string())),
        TxType::Standard => tx
            .sender_pubkey
            .as_deref()
            .and_then(|pk| address_from_pubkey_hex(pk).ok()),
        TxType::Coinbase => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;
    use umbra_core::types::unix_now;

    fn signed_standard(kp: &KeyPair) -> Transaction {
        let mut tx = Transaction::standard("ab".into(), 10.0, None, unix_now());
        tx.sender_pubkey = Some(kp.public_key_hex());
        tx.signature = Some(kp.sign(&tx.signing_bytes()));
        tx
    }

    #[test]
    fn standard_round_trip() {
        let kp = KeyPair::generate();
        let tx = signed_standard(&kp);
        assert!(verify_transaction(&tx, &KeyDirectory::new()).is_ok());
        assert_eq!(sender_address(&tx), Some(kp.address()));
    }

    #[test]
    fn standard_tamper_detected() {
        let kp = KeyPair::generate();
        let mut tx = signed_standard(&kp);
        tx.amount += 1.0;
        assert!(matches!(
            verify_transaction(&tx, &KeyDirectory::new()),
            Err(UmbraError::InvalidSignature)
        ));
    }

    #[test]
    fn standard_without_signature_rejected() {
        let tx = Transaction::standard("ab".into(), 10.0, None, unix_now());
        assert!(verify_transaction(&tx, &KeyDirectory::new()).is_err());
    }

    #[test]
    fn coinbase_accepted_unconditionally() {
        let tx = Transaction::coinbase("ab".into(), 50.0, None, unix_now());
        assert!(verify_transaction(&tx, &KeyDirectory::new()).is_ok());
        assert_eq!(sender_address(&tx), None);
    }

    #[test]
    fn ringless_anonymous_accepted() {
        let tx = Transaction::anonymous("ab".into(), 10.0, None, unix_now());
        assert!(verify_transaction(&tx, &KeyDirectory::new()).is_ok());
        assert_eq!(sender_address(&tx).unwrap().as_str(), ANONYMOUS_SENDER);
    }
}
