#![forbid(unsafe_code)]
//! Ledger node entrypoint: config, logging, serve.

use clap::Parser;
use std::sync::Arc;
use tallychain::config::load_config;
use tallychain::node::Node;

#[derive(Parser)]
#[command(name = "tally-node", about = "Run a tallychain ledger node")]
struct Args {
    /// Override the API port from config.toml
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut config = load_config()?;
    if let Some(port) = args.port {
        config.network.api_port = port;
    }

    let node = Arc::new(Node::new(config));
    tracing::info!(node_id = %node.node_id, "node identifier assigned");
    node.serve().await?;
    Ok(())
}
