//! Node orchestration.
//!
//! Owns the shared ledger and peer registry handles, the process-lifetime
//! node identifier (the mining-reward recipient), and the entry points the
//! API adapter calls into: mining and consensus resolution.

use crate::block::Block;
use crate::config::Config;
use crate::consensus::{self, HttpChainFetcher};
use crate::error::{ChainError, Result};
use crate::ledger::Ledger;
use crate::peers::PeerRegistry;
use crate::pow;
use rand::rngs::OsRng;
use rand::RngCore;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Sender id carried by reward transfers, marking newly created value.
const REWARD_SENDER: &str = "0";

pub struct Node {
    pub config: Config,
    /// Random per-process identifier; rewards for blocks mined by this node
    /// are credited to it.
    pub node_id: String,
    pub ledger: Arc<RwLock<Ledger>>,
    pub peers: Arc<RwLock<PeerRegistry>>,
    fetcher: HttpChainFetcher,
    shutdown: Arc<AtomicBool>,
}

impl Node {
    pub fn new(config: Config) -> Self {
        let mut id = [0u8; 16];
        OsRng.fill_bytes(&mut id);
        let node_id = hex::encode(id);

        let mut peers = PeerRegistry::new();
        for address in &config.network.bootstrap_peers {
            match peers.register(address) {
                Ok(stored) => info!(peer = %stored, "bootstrap peer registered"),
                Err(e) => warn!(peer = %address, error = %e, "bootstrap peer skipped"),
            }
        }

        let fetcher =
            HttpChainFetcher::new(Duration::from_secs(config.network.fetch_timeout_secs));
        let ledger = Ledger::new(config.mining.difficulty);

        Node {
            config,
            node_id,
            ledger: Arc::new(RwLock::new(ledger)),
            peers: Arc::new(RwLock::new(peers)),
            fetcher,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Raise the cooperative cancellation flag; an in-flight proof search
    /// observes it on its next batch boundary.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Mine the next block: search for a proof over a snapshot of the tip,
    /// then commit the pending pool plus this node's reward transfer.
    ///
    /// The search runs on a blocking thread with no lock held, so transfer
    /// submissions and chain reads proceed during it. If consensus swaps
    /// the chain mid-search the commit fails with [`ChainError::StaleTip`]
    /// rather than appending a block that no longer extends the tip.
    pub async fn mine_next_block(&self) -> Result<Block> {
        let (last_proof, last_hash) = {
            let ledger = self.ledger.read().await;
            let last = ledger.last_block()?;
            (last.proof, last.digest())
        };

        let difficulty = self.config.mining.difficulty;
        let cancel = Arc::clone(&self.shutdown);
        let search_hash = last_hash.clone();
        let proof = tokio::task::spawn_blocking(move || {
            pow::search(last_proof, &search_hash, difficulty, &cancel)
        })
        .await
        .map_err(|e| ChainError::Internal(e.to_string()))?
        .ok_or(ChainError::MiningCancelled)?;

        let mut ledger = self.ledger.write().await;
        if ledger.last_block()?.digest() != last_hash {
            return Err(ChainError::StaleTip);
        }
        ledger.submit_transfer(REWARD_SENDER, self.node_id.clone(), self.config.mining.reward);
        let block = ledger.mine(proof, Some(last_hash));
        info!(index = block.index, proof = block.proof, "mined new block");
        Ok(block)
    }

    /// Register each address, failing on the first invalid one. Returns the
    /// stored forms.
    pub async fn register_peers(&self, addresses: &[String]) -> Result<Vec<String>> {
        let mut registry = self.peers.write().await;
        let mut stored = Vec::with_capacity(addresses.len());
        for address in addresses {
            stored.push(registry.register(address)?);
        }
        info!(count = stored.len(), "peers registered");
        Ok(stored)
    }

    /// Poll every known peer and adopt a strictly longer valid chain if one
    /// exists. Returns whether the local chain was replaced.
    pub async fn resolve_consensus(&self) -> bool {
        let peers = self.peers.read().await.snapshot();
        consensus::resolve(&self.ledger, &peers, &self.fetcher).await
    }

    /// Bind the API port and serve until ctrl-c. Shutdown raises the mining
    /// cancellation flag so an in-flight proof search stops too.
    pub async fn serve(self: Arc<Self>) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.network.api_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ChainError::Network(format!("cannot bind {addr}: {e}")))?;
        info!(%addr, node_id = %self.node_id, "ledger node listening");

        let app = crate::api::build_router(Arc::clone(&self));
        let shutdown = Arc::clone(&self.shutdown);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = tokio::signal::ctrl_c().await;
                shutdown.store(true, Ordering::Relaxed);
            })
            .await
            .map_err(|e| ChainError::Network(e.to_string()))
    }
}
