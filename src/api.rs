//! REST API server for tallychain.
//!
//! Thin adapter over [`crate::node::Node`]: JSON marshaling, status codes,
//! and request logging live here; all ledger logic stays in the core. The
//! wire representation of blocks preserves field names exactly, since peers
//! re-derive digests from the fetched structure.

use axum::{
    extract::{Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::block::{Block, Transfer};
use crate::consensus::ChainSnapshot;
use crate::error::ChainError;
use crate::node::Node;

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Chain(ChainError),
    InvalidInput(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Chain(ChainError::InvalidAddress(addr)) => (
                StatusCode::BAD_REQUEST,
                format!("invalid peer address: {addr}"),
            ),
            ApiError::Chain(ChainError::StaleTip) => (
                StatusCode::CONFLICT,
                "chain tip changed while mining; retry".to_string(),
            ),
            ApiError::Chain(ChainError::MiningCancelled) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "node is shutting down".to_string(),
            ),
            ApiError::Chain(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::Chain(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct TransferRequest {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
}

#[derive(Serialize)]
pub struct TransferResponse {
    pub message: String,
    /// Best-effort hint of the block this transfer will land in.
    pub index: u64,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub message: String,
    pub index: u64,
    pub transfers: Vec<Transfer>,
    pub proof: u64,
    pub previous_hash: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub peers: Vec<String>,
}

#[derive(Serialize)]
pub struct ResolveResponse {
    pub message: String,
    pub replaced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<Vec<Block>>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration for every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the router with all endpoints (also used directly by tests).
pub fn build_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![http::Method::GET, http::Method::POST])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        .route("/chain", get(full_chain))
        .route("/transactions/new", post(new_transfer))
        .route("/mine", get(mine))
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/resolve", get(resolve_conflicts))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(node)
        .layer(cors)
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn full_chain(State(node): State<Arc<Node>>) -> Json<ChainSnapshot> {
    let ledger = node.ledger.read().await;
    Json(ChainSnapshot {
        chain: ledger.chain().to_vec(),
        length: ledger.len() as u64,
    })
}

async fn new_transfer(
    State(node): State<Arc<Node>>,
    Json(req): Json<TransferRequest>,
) -> (StatusCode, Json<TransferResponse>) {
    let mut ledger = node.ledger.write().await;
    let index = ledger.submit_transfer(req.sender, req.recipient, req.amount);
    (
        StatusCode::CREATED,
        Json(TransferResponse {
            message: format!("Transfer queued for block {index}"),
            index,
        }),
    )
}

async fn mine(State(node): State<Arc<Node>>) -> Result<Json<MineResponse>, ApiError> {
    let block = node.mine_next_block().await?;
    Ok(Json(MineResponse {
        message: "New block mined".to_string(),
        index: block.index,
        transfers: block.transfers,
        proof: block.proof,
        previous_hash: block.previous_hash,
    }))
}

async fn register_nodes(
    State(node): State<Arc<Node>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    if req.nodes.is_empty() {
        return Err(ApiError::InvalidInput("no peer addresses supplied".to_string()));
    }
    node.register_peers(&req.nodes).await?;
    let peers = node.peers.read().await.list();
    Ok(Json(RegisterResponse {
        message: "Peers registered".to_string(),
        peers,
    }))
}

async fn resolve_conflicts(State(node): State<Arc<Node>>) -> Json<ResolveResponse> {
    let replaced = node.resolve_consensus().await;
    if replaced {
        let ledger = node.ledger.read().await;
        Json(ResolveResponse {
            message: "Chain was replaced".to_string(),
            replaced,
            chain: Some(ledger.chain().to_vec()),
        })
    } else {
        Json(ResolveResponse {
            message: "Chain is authoritative".to_string(),
            replaced,
            chain: None,
        })
    }
}
