//! Proof-of-work predicate and search.
//!
//! A proof is an integer nonce such that
//! `sha256("{last_proof}{proof}{last_hash}")` renders to a hex digest with
//! [`DEFAULT_DIFFICULTY`] leading zero characters. Expected search cost is
//! ~16^difficulty / 2 attempts, so the search loop is kept tight: one
//! reused string buffer, and the difficulty check reads raw digest bytes
//! instead of hex-encoding each candidate.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};

/// Required count of leading zero hex characters in a proof digest.
pub const DEFAULT_DIFFICULTY: usize = 4;

/// How many candidate proofs to try between cancellation checks.
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// True iff the digest of `"{last_proof}{proof}{last_hash}"` starts with
/// `difficulty` zero hex characters.
pub fn validate(last_proof: u64, proof: u64, last_hash: &str, difficulty: usize) -> bool {
    let guess = format!("{last_proof}{proof}{last_hash}");
    let digest: [u8; 32] = Sha256::digest(guess.as_bytes()).into();
    has_leading_zero_chars(&digest, difficulty)
}

/// `difficulty` leading zero hex chars == `difficulty / 2` zero bytes, plus
/// a zero high nibble when the count is odd.
fn has_leading_zero_chars(digest: &[u8], difficulty: usize) -> bool {
    let full_bytes = difficulty / 2;
    if digest.len() * 2 < difficulty {
        return false;
    }
    if digest[..full_bytes].iter().any(|b| *b != 0) {
        return false;
    }
    difficulty % 2 == 0 || digest[full_bytes] & 0xf0 == 0
}

/// Exhaustive search for the smallest proof satisfying [`validate`] against
/// the previous block's proof and digest.
///
/// Deterministic: two nodes racing over the same predecessor find the same
/// minimal proof. Returns `None` if `cancel` is raised; the flag is checked
/// once per [`CANCEL_CHECK_INTERVAL`] candidates so a shutdown or an
/// incoming longer chain can stop wasted work.
pub fn search(
    last_proof: u64,
    last_hash: &str,
    difficulty: usize,
    cancel: &AtomicBool,
) -> Option<u64> {
    let mut guess = String::with_capacity(last_hash.len() + 40);
    let mut proof: u64 = 0;
    loop {
        if proof % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
            return None;
        }
        guess.clear();
        let _ = write!(guess, "{last_proof}{proof}{last_hash}");
        let digest: [u8; 32] = Sha256::digest(guess.as_bytes()).into();
        if has_leading_zero_chars(&digest, difficulty) {
            return Some(proof);
        }
        proof += 1;
    }
}
