//! Known-peer bookkeeping.
//!
//! Pure set semantics over normalized addresses: a URL with a network
//! location is stored as `host` or `host:port`; a host-less URL keeps its
//! path; anything unparseable is rejected. Re-registering is a no-op.

use crate::error::{ChainError, Result};
use std::collections::HashSet;
use url::Url;

#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashSet<String>,
}

/// Reduce a peer URL to the form stored in the registry.
pub fn normalize_address(address: &str) -> Result<String> {
    let parsed =
        Url::parse(address).map_err(|_| ChainError::InvalidAddress(address.to_string()))?;
    if let Some(host) = parsed.host_str() {
        Ok(match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    } else {
        let path = parsed.path();
        if path.is_empty() {
            Err(ChainError::InvalidAddress(address.to_string()))
        } else {
            Ok(path.to_string())
        }
    }
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and insert. Returns the stored form.
    pub fn register(&mut self, address: &str) -> Result<String> {
        let normalized = normalize_address(address)?;
        self.peers.insert(normalized.clone());
        Ok(normalized)
    }

    /// All known peers, sorted for stable output. The underlying set has no
    /// ordering semantics.
    pub fn list(&self) -> Vec<String> {
        let mut peers: Vec<String> = self.peers.iter().cloned().collect();
        peers.sort();
        peers
    }

    /// Unordered snapshot, for callers that fan out over every peer.
    pub fn snapshot(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, peer: &str) -> bool {
        self.peers.contains(peer)
    }
}
