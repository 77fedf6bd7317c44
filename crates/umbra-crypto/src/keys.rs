use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use p384::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p384::ecdsa::{Signature, SigningKey, VerifyingKey};
use p384::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use thiserror::Error;

use umbra_core::types::Address;

use crate::hash::sha256_hex;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid public key encoding")]
    InvalidPublicKey,
    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),
}

/// An Umbra keypair: NIST P-384 signing + verifying keys.
///
/// Signing is ECDSA with a SHA-256 prehash; signatures travel as base64 of
/// the raw `r‖s` encoding. The secret scalar zeroizes on drop (the `p384`
/// signing key wipes its own memory).
pub struct KeyPair {
    signing: SigningKey,
    verifying: VerifyingKey,
}

impl KeyPair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        let signing = SigningKey::random(&mut OsRng);
        let verifying = *signing.verifying_key();
        Self { signing, verifying }
    }

    /// Restore from raw scalar bytes (48 for P-384; shorter slices are
    /// rejected by the curve arithmetic).
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        let signing = SigningKey::from_slice(bytes)
            .map_err(|e| SignatureError::InvalidSecretKey(e.to_string()))?;
        let verifying = *signing.verifying_key();
        Ok(Self { signing, verifying })
    }

    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(secret_hex)
            .map_err(|e| SignatureError::InvalidSecretKey(e.to_string()))?;
        Self::from_secret_bytes(&bytes)
    }

    pub fn secret_bytes(&self) -> Vec<u8> {
        self.signing.to_bytes().to_vec()
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing.to_bytes())
    }

    /// SEC1 uncompressed point encoding of the public key.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.verifying.to_encoded_point(false).as_bytes().to_vec()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    /// The account address: SHA-256 hex of the raw public-key bytes.
    pub fn address(&self) -> Address {
        address_from_pubkey_bytes(&self.public_key_bytes())
    }

    /// Sign `message`: SHA-256 prehash, ECDSA, base64 `r‖s`.
    pub fn sign(&self, message: &[u8]) -> String {
        let digest = Sha256::digest(message);
        let sig: Signature = self
            .signing
            .sign_prehash(&digest)
            .expect("signing with a valid secret key is infallible");
        BASE64.encode(sig.to_bytes())
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ address: {} }}", self.address())
    }
}

/// Derive an address from raw public-key bytes.
pub fn address_from_pubkey_bytes(pubkey_bytes: &[u8]) -> Address {
    Address::new(sha256_hex(pubkey_bytes))
}

/// Derive an address from a hex-encoded public key.
pub fn address_from_pubkey_hex(pubkey_hex: &str) -> Result<Address, SignatureError> {
    let bytes = hex::decode(pubkey_hex).map_err(|_| SignatureError::InvalidPublicKey)?;
    Ok(address_from_pubkey_bytes(&bytes))
}

/// Verify a base64 `r‖s` ECDSA signature over `message` against a hex SEC1
/// public key.
pub fn verify_ecdsa(
    pubkey_hex: &str,
    message: &[u8],
    signature_b64: &str,
) -> Result<(), SignatureError> {
    let pk_bytes = hex::decode(pubkey_hex).map_err(|_| SignatureError::InvalidPublicKey)?;
    let verifying =
        VerifyingKey::from_sec1_bytes(&pk_bytes).map_err(|_| SignatureError::InvalidPublicKey)?;
    let sig_bytes = BASE64
        .decode(signature_b64)
        .map_err(|_| SignatureError::InvalidSignature)?;
    let sig = Signature::from_slice(&sig_bytes).map_err(|_| SignatureError::InvalidSignature)?;
    let digest = Sha256::digest(message);
    verifying
        .verify_prehash(&digest, &sig)
        .map_err(|_| SignatureError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let kp = KeyPair::generate();
        let sig = kp.sign(b"value moves in the dark");
        assert!(verify_ecdsa(&kp.public_key_hex(), b"value moves in the dark", &sig).is_ok());
    }

    #[test]
    fn tampered_message_fails() {
        let kp = KeyPair::generate();
        let sig = kp.sign(b"original");
        assert!(verify_ecdsa(&kp.public_key_hex(), b"tampered", &sig).is_err());
    }

    #[test]
    fn wrong_key_fails() {
        let kp = KeyPair::generate();
        let other = KeyPair::generate();
        let sig = kp.sign(b"message");
        assert!(verify_ecdsa(&other.public_key_hex(), b"message", &sig).is_err());
    }

    #[test]
    fn secret_hex_round_trip() {
        let kp = KeyPair::generate();
        let restored = KeyPair::from_secret_hex(&kp.secret_hex()).unwrap();
        assert_eq!(restored.address(), kp.address());
        assert_eq!(restored.public_key_hex(), kp.public_key_hex());
    }

    #[test]
    fn address_is_sha256_of_pubkey() {
        let kp = KeyPair::generate();
        assert_eq!(kp.address().as_str().len(), 64);
        assert_eq!(kp.address(), address_from_pubkey_hex(&kp.public_key_hex()).unwrap());
    }
}
