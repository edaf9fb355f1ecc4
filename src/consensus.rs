//! Peer conflict resolution.
//!
//! Pull-based longest-valid-chain rule: poll every known peer for its full
//! chain, keep the longest candidate that passes validation, and adopt it
//! only on a strict length improvement. Unreachable peers are skipped
//! silently. This is best-effort, not a quorum protocol: validity checks
//! internal proof-of-work linkage, not the authenticity of participants.

use crate::block::Block;
use crate::ledger::{validate_chain, Ledger};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Wire shape of a peer's `/chain` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("peer returned status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Injected capability for pulling a peer's chain.
#[async_trait]
pub trait ChainFetcher: Send + Sync {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot, FetchError>;
}

/// [`ChainFetcher`] over plain HTTP: `GET http://{peer}/chain`.
pub struct HttpChainFetcher {
    client: reqwest::Client,
}

impl HttpChainFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client with static config");
        HttpChainFetcher { client }
    }
}

impl Default for HttpChainFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl ChainFetcher for HttpChainFetcher {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot, FetchError> {
        let url = format!("http://{peer}/chain");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        response
            .json::<ChainSnapshot>()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

/// Poll `peers` and replace the local chain if a strictly longer valid one
/// is found. Returns whether a replacement happened.
///
/// Fetches fan out concurrently and complete before any lock is taken; the
/// write lock is held only for the final swap. Selection compares the
/// actual fetched chain length, not the peer's self-reported `length`
/// field. Ties never replace, and the iteration order over equally long
/// peers is unspecified.
pub async fn resolve<F: ChainFetcher>(
    ledger: &RwLock<Ledger>,
    peers: &[String],
    fetcher: &F,
) -> bool {
    let (mut max_length, difficulty) = {
        let ledger = ledger.read().await;
        (ledger.len(), ledger.difficulty())
    };

    let fetches = peers.iter().map(|peer| async move {
        match fetcher.fetch_chain(peer).await {
            Ok(snapshot) => Some((peer.as_str(), snapshot)),
            Err(err) => {
                debug!(peer = %peer, error = %err, "peer skipped during resolution");
                None
            }
        }
    });
    let snapshots = join_all(fetches).await;

    let mut best: Option<Vec<Block>> = None;
    for (peer, snapshot) in snapshots.into_iter().flatten() {
        let length = snapshot.chain.len();
        if length > max_length && validate_chain(&snapshot.chain, difficulty) {
            debug!(peer = %peer, length, "longer valid candidate chain");
            max_length = length;
            best = Some(snapshot.chain);
        }
    }

    let Some(chain) = best else {
        return false;
    };

    let mut ledger = ledger.write().await;
    // The local chain may have grown while the fetches were in flight;
    // replacement still requires a strict improvement.
    if chain.len() > ledger.len() {
        info!(length = chain.len(), "adopting longer valid peer chain");
        ledger.replace_chain(chain);
        true
    } else {
        false
    }
}
