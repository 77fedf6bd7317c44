use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::{Address, Amount, Hash256, Timestamp};

// ── TxType ───────────────────────────────────────────────────────────────────

/// Transfer kinds supported by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    /// Transparent transfer authorized by a per-transaction ECDSA signature.
    Standard,
    /// Ring-signed transfer; the sender is hidden and double spends are
    /// prevented by the key image plus outpoint consumption.
    Anonymous,
    /// Minting transaction: no inputs, credits the miner.
    Coinbase,
}

// ── Ring signature ───────────────────────────────────────────────────────────

/// A set of ECDSA signatures over the same message, one of which was made by
/// the real spender. `sigs[i]` verifies against `pubkeys[i]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RingSignature {
    /// Base64 `r‖s` signatures, one per ring member.
    pub sigs: Vec<String>,
    /// Hex SEC1 public keys, positionally paired with `sigs`.
    pub pubkeys: Vec<String>,
}

impl RingSignature {
    pub fn len(&self) -> usize {
        self.pubkeys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pubkeys.is_empty()
    }
}

// ── Inputs / outputs ─────────────────────────────────────────────────────────

/// Reference to a previously created output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TxInput {
    pub prev_txid: Hash256,
    pub output_index: u32,
    /// Present on transparent spends, absent on anonymous ones.
    pub signature: Option<String>,
}

impl TxInput {
    pub fn new(prev_txid: Hash256, output_index: u32) -> Self {
        Self { prev_txid, output_index, signature: None }
    }
}

/// A spendable output. `txid` and `index` are placeholders until block
/// application assigns them (§ output identity is a property of inclusion,
/// not authorship).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TxOutput {
    pub txid: Hash256,
    pub index: u32,
    pub address: Address,
    pub amount: Amount,
}

impl TxOutput {
    /// An output as authored by a wallet, identity unassigned.
    pub fn unassigned(address: Address, amount: Amount) -> Self {
        Self { txid: Hash256::placeholder(), index: 0, address, amount }
    }
}

// ── Transaction ──────────────────────────────────────────────────────────────

/// A value transfer. Mutated only by signing (sets `sender_pubkey` and
/// `signature`) and by block application (assigns output identities); treated
/// as immutable everywhere else.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Hex SEC1 public key of the sender; `None` for anonymous and coinbase.
    #[serde(default)]
    pub sender_pubkey: Option<String>,
    pub receiver_address: Address,
    pub amount: Amount,
    /// Base64 ECDSA signature over the canonical signing payload.
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub metadata: Option<String>,
    pub tx_type: TxType,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub ring_signature: Option<RingSignature>,
    #[serde(default)]
    pub inputs: Vec<TxInput>,
    #[serde(default)]
    pub outputs: Vec<TxOutput>,
    #[serde(default)]
    pub key_image: Option<Hash256>,
}

impl Transaction {
    /// A transparent transfer, unsigned. `sign_transaction` on a wallet fills
    /// in `sender_pubkey` and `signature`.
    pub fn standard(
        receiver_address: Address,
        amount: Amount,
        metadata: Option<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            sender_pubkey: None,
            receiver_address,
            amount,
            signature: None,
            metadata,
            tx_type: TxType::Standard,
            timestamp,
            ring_signature: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            key_image: None,
        }
    }

    /// An anonymous transfer skeleton; the wallet attaches inputs, outputs,
    /// key image and (optionally) the ring signature.
    pub fn anonymous(
        receiver_address: Address,
        amount: Amount,
        metadata: Option<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            sender_pubkey: None,
            receiver_address,
            amount,
            signature: None,
            metadata,
            tx_type: TxType::Anonymous,
            timestamp,
            ring_signature: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            key_image: None,
        }
    }

    /// A coinbase minting `amount` to `miner`. Outputs are left undeclared;
    /// block application synthesizes the single credited output.
    pub fn coinbase(
        miner: Address,
        amount: Amount,
        metadata: Option<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            sender_pubkey: None,
            receiver_address: miner,
            amount,
            signature: None,
            metadata,
            tx_type: TxType::Coinbase,
            timestamp,
            ring_signature: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            key_image: None,
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.tx_type == TxType::Coinbase
    }

    pub fn is_anonymous(&self) -> bool {
        self.tx_type == TxType::Anonymous
    }

    // ── Canonical encodings ──────────────────────────────────────────────────
    //
    // serde_json's default map is BTree-backed, so `Value` objects serialize
    // with ascending keys and compact separators — the canonical form all
    // hashing operates on.

    /// Full canonical JSON value (the wire shape).
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("transaction serialization is infallible")
    }

    /// Full canonical JSON string.
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    /// The payload covered by the ECDSA signature and by ring signatures:
    /// the canonical form with `signature` and `ring_signature` removed.
    pub fn signing_value(&self) -> Value {
        let mut v = self.to_value();
        if let Value::Object(map) = &mut v {
            map.remove("signature");
            map.remove("ring_signature");
        }
        v
    }

    pub fn signing_bytes(&self) -> Vec<u8> {
        self.signing_value().to_string().into_bytes()
    }

    /// The transaction-ID preimage. Covers identity-bearing fields only:
    /// signatures are excluded so signing does not perturb the ID, and output
    /// `txid`/`index` are excluded because block application assigns them.
    pub fn id_value(&self) -> Value {
        json!({
            "sender_pubkey": self.sender_pubkey,
            "receiver_address": self.receiver_address,
            "amount": self.amount,
            "timestamp": self.timestamp,
            "tx_type": self.tx_type,
            "metadata": self.metadata,
            "key_image": self.key_image,
            "inputs": self.inputs.iter().map(|i| {
                json!({ "prev_txid": i.prev_txid, "output_index": i.output_index })
            }).collect::<Vec<_>>(),
            "outputs": self.outputs.iter().map(|o| {
                json!({ "address": o.address, "amount": o.amount })
            }).collect::<Vec<_>>(),
        })
    }

    pub fn id_bytes(&self) -> Vec<u8> {
        self.id_value().to_string().into_bytes()
    }

    /// The per-transaction contribution to the block-hash preimage: the full
    /// canonical form with output identities reduced to `(address, amount)`.
    /// Block application may rewrite output `txid`/`index` after the block is
    /// mined, so they cannot be covered by the block hash.
    pub fn consensus_json(&self) -> String {
        let mut v = self.to_value();
        if let Value::Object(map) = &mut v {
            let outputs = self
                .outputs
                .iter()
                .map(|o| json!({ "address": o.address, "amount": o.amount }))
                .collect::<Vec<_>>();
            map.insert("outputs".to_string(), Value::Array(outputs));
        }
        v.to_string()
    }
}
