//! Chain and pending-pool ownership.
//!
//! The [`Ledger`] owns the ordered block sequence and the pool of transfers
//! not yet folded into a block. It is the single exclusivity scope for both:
//! callers share it behind one lock, so a submitted transfer lands in the
//! next mined block or a later one, never split across two.

use crate::block::{Block, Transfer};
use crate::error::{ChainError, Result};
use crate::pow;

/// Proof carried by the genesis block. Agreed out-of-band; the genesis
/// block itself is not covered by [`validate_chain`].
pub const GENESIS_PROOF: u64 = 42;

/// Sentinel `previous_hash` of the genesis block. Not a digest of anything.
pub const GENESIS_PREVIOUS_HASH: &str = "genesis";

/// Current wall-clock time as fractional epoch seconds.
fn unix_time_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Walk `chain` pairwise and check both the digest linkage and the
/// proof-of-work of every adjacent pair. Empty chains are invalid. The
/// genesis entry is only used as the anchor of the first pair; its own
/// `previous_hash` and proof are not verifiable.
pub fn validate_chain(chain: &[Block], difficulty: usize) -> bool {
    let mut blocks = chain.iter();
    let Some(mut prev) = blocks.next() else {
        return false;
    };
    for block in blocks {
        let prev_digest = prev.digest();
        if block.previous_hash != prev_digest {
            return false;
        }
        if !pow::validate(prev.proof, block.proof, &prev_digest, difficulty) {
            return false;
        }
        prev = block;
    }
    true
}

pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transfer>,
    difficulty: usize,
}

impl Ledger {
    /// Create a ledger with the genesis block already appended, so
    /// [`Ledger::last_block`] never observes an empty chain.
    pub fn new(difficulty: usize) -> Self {
        let mut ledger = Ledger {
            chain: Vec::new(),
            pending: Vec::new(),
            difficulty,
        };
        ledger.mine(GENESIS_PROOF, Some(GENESIS_PREVIOUS_HASH.to_string()));
        ledger
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn pending(&self) -> &[Transfer] {
        &self.pending
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn last_block(&self) -> Result<&Block> {
        self.chain.last().ok_or(ChainError::EmptyChain)
    }

    /// Queue a transfer for the next mined block. Returns the index of the
    /// block it is expected to land in. This is a best-effort hint, not a
    /// commitment: the pool can be consumed by another miner call before
    /// this transfer's block is produced.
    pub fn submit_transfer(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: u64,
    ) -> u64 {
        self.pending.push(Transfer::new(sender, recipient, amount));
        self.chain.last().map_or(0, |b| b.index) + 1
    }

    /// Append a block carrying the entire pending pool and the given proof.
    ///
    /// The pool is drained unconditionally; a block with zero transfers is
    /// valid. `previous_hash` falls back to the digest of the current tip.
    /// Timestamps are clamped to be non-decreasing along the chain.
    pub fn mine(&mut self, proof: u64, previous_hash: Option<String>) -> Block {
        let previous_hash = previous_hash.unwrap_or_else(|| {
            self.chain
                .last()
                .map(Block::digest)
                .unwrap_or_else(|| GENESIS_PREVIOUS_HASH.to_string())
        });
        let timestamp = match self.chain.last() {
            Some(last) => unix_time_secs().max(last.timestamp),
            None => unix_time_secs(),
        };
        let block = Block {
            index: self.chain.len() as u64 + 1,
            timestamp,
            transfers: std::mem::take(&mut self.pending),
            proof,
            previous_hash,
        };
        self.chain.push(block.clone());
        block
    }

    /// True iff `candidate` is internally consistent under this ledger's
    /// difficulty. Tampering with any field of any block changes its digest
    /// and breaks the next link.
    pub fn is_valid_chain(&self, candidate: &[Block]) -> bool {
        validate_chain(candidate, self.difficulty)
    }

    /// Wholesale chain swap, used only by consensus resolution. The pending
    /// pool is left untouched: transfers not present in the adopted chain
    /// remain eligible for the next mined block.
    pub fn replace_chain(&mut self, chain: Vec<Block>) {
        self.chain = chain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    const TEST_DIFFICULTY: usize = 2;

    /// Extend `ledger` by one block with a real proof over the current tip.
    fn mine_next(ledger: &mut Ledger) -> Block {
        let (last_proof, last_hash) = {
            let last = ledger.last_block().unwrap();
            (last.proof, last.digest())
        };
        let proof = pow::search(
            last_proof,
            &last_hash,
            ledger.difficulty(),
            &AtomicBool::new(false),
        )
        .unwrap();
        ledger.mine(proof, None)
    }

    #[test]
    fn new_ledger_has_genesis() {
        let ledger = Ledger::new(TEST_DIFFICULTY);
        assert_eq!(ledger.len(), 1);
        let genesis = ledger.last_block().unwrap();
        assert_eq!(genesis.index, 1);
        assert_eq!(genesis.proof, GENESIS_PROOF);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(genesis.transfers.is_empty());
    }

    #[test]
    fn submit_returns_next_index_hint() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        assert_eq!(ledger.submit_transfer("alice", "bob", 10), 2);
        assert_eq!(ledger.submit_transfer("bob", "carol", 5), 2);
        assert_eq!(ledger.pending().len(), 2);
    }

    #[test]
    fn mining_drains_pool_into_block() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        ledger.submit_transfer("alice", "bob", 10);
        ledger.submit_transfer("bob", "carol", 5);

        let block = mine_next(&mut ledger);
        assert_eq!(block.index, 2);
        assert_eq!(
            block.transfers,
            vec![
                Transfer::new("alice", "bob", 10),
                Transfer::new("bob", "carol", 5),
            ]
        );
        assert!(ledger.pending().is_empty());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn empty_pool_blocks_are_valid() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        let block = mine_next(&mut ledger);
        assert!(block.transfers.is_empty());
        assert!(ledger.is_valid_chain(ledger.chain()));
    }

    #[test]
    fn mined_block_links_to_predecessor() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        let genesis_digest = ledger.last_block().unwrap().digest();
        let genesis_proof = ledger.last_block().unwrap().proof;
        let block = mine_next(&mut ledger);
        assert_eq!(block.previous_hash, genesis_digest);
        assert!(pow::validate(
            genesis_proof,
            block.proof,
            &genesis_digest,
            TEST_DIFFICULTY
        ));
    }

    #[test]
    fn timestamps_never_decrease() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        mine_next(&mut ledger);
        mine_next(&mut ledger);
        let stamps: Vec<f64> = ledger.chain().iter().map(|b| b.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn valid_chain_passes_validation() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        ledger.submit_transfer("alice", "bob", 10);
        mine_next(&mut ledger);
        mine_next(&mut ledger);
        assert!(ledger.is_valid_chain(ledger.chain()));
    }

    #[test]
    fn empty_chain_is_invalid() {
        let ledger = Ledger::new(TEST_DIFFICULTY);
        assert!(!ledger.is_valid_chain(&[]));
    }

    #[test]
    fn tampered_transfer_invalidates_chain() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        ledger.submit_transfer("alice", "bob", 10);
        mine_next(&mut ledger);
        mine_next(&mut ledger);

        let mut chain = ledger.chain().to_vec();
        chain[1].transfers[0].amount = 1_000_000;
        assert!(!ledger.is_valid_chain(&chain));
    }

    #[test]
    fn tampered_proof_invalidates_chain() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        mine_next(&mut ledger);
        let mut chain = ledger.chain().to_vec();
        chain[1].proof += 1;
        assert!(!ledger.is_valid_chain(&chain));
    }

    #[test]
    fn tampered_previous_hash_invalidates_chain() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        mine_next(&mut ledger);
        let mut chain = ledger.chain().to_vec();
        chain[1].previous_hash = "00".repeat(32);
        assert!(!ledger.is_valid_chain(&chain));
    }

    #[test]
    fn omitted_block_invalidates_chain() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        mine_next(&mut ledger);
        mine_next(&mut ledger);
        mine_next(&mut ledger);

        let mut chain = ledger.chain().to_vec();
        chain.remove(1);
        assert!(!ledger.is_valid_chain(&chain));
    }

    #[test]
    fn replace_chain_swaps_wholesale_and_keeps_pool() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        ledger.submit_transfer("alice", "bob", 10);

        let mut other = Ledger::new(TEST_DIFFICULTY);
        mine_next(&mut other);
        let longer = other.chain().to_vec();

        ledger.replace_chain(longer.clone());
        assert_eq!(ledger.chain(), &longer[..]);
        assert_eq!(ledger.pending().len(), 1);
    }
}
