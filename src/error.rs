//! Error types for tallychain

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// Last-block access on an empty chain. The `Ledger` constructor always
    /// appends a genesis block, so this is a defensive contract only.
    #[error("chain is empty")]
    EmptyChain,

    /// Peer registration with neither a network location nor a usable path.
    #[error("invalid peer address: {0}")]
    InvalidAddress(String),

    /// The chain tip moved while a proof was being searched; the proof no
    /// longer extends the current tip.
    #[error("chain tip changed during proof search")]
    StaleTip,

    /// The proof search observed its cancellation flag and stopped.
    #[error("mining was cancelled")]
    MiningCancelled,

    #[error("network error: {0}")]
    Network(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
