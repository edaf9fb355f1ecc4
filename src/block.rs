//! Block and transfer data model.
//!
//! A [`Block`] links to its predecessor by SHA-256 digest and carries the
//! batch of [`Transfer`]s that were pending when it was mined. The digest is
//! computed over a canonical JSON form so that two logically identical
//! blocks hash identically regardless of incidental field order.

use sha2::{Digest, Sha256};

/// A value movement between two string-identified parties.
///
/// Immutable once created. Owned by the ledger's pending pool until a block
/// consumes it; the block receives its own copy, so later pool mutation can
/// never alter mined history.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transfer {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
}

impl Transfer {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: u64) -> Self {
        Transfer {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }
}

/// One link of the chain.
///
/// `index` is 1-based and contiguous; `previous_hash` is the digest of the
/// preceding block (the genesis block carries a fixed sentinel instead).
/// Wire peers exchange exactly these field names, since chain validation
/// re-derives digests from this structure.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64,
    pub transfers: Vec<Transfer>,
    pub proof: u64,
    pub previous_hash: String,
}

impl Block {
    /// SHA-256 of the block's canonical JSON form, as 64 lowercase hex chars.
    ///
    /// `serde_json` object maps are key-sorted, so the serialization is
    /// canonical: field order in memory or on the wire cannot change the
    /// digest. Pure function of the block's fields.
    pub fn digest(&self) -> String {
        let canonical = serde_json::to_value(self)
            .expect("block fields always serialize")
            .to_string();
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }
}
