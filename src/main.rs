//! Clearing-house liquidation scanner.
//!
//! One-shot invocation: enumerate every protocol account from the subgraph,
//! evaluate liquidation eligibility against the clearing house, and emit
//! ready-to-submit liquidation instructions for the external executor. The
//! scanner itself never signs or sends a transaction.

use std::sync::Arc;

use alloy::providers::ProviderBuilder;
use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use liquidator_api::{HttpGraphTransport, SubgraphClient};
use liquidator_chain::ClearingHouse;
use liquidator_core::{BatchDispatcher, Liquidator, LiquidatorConfig};

/// Environment variable names owned by the binary.
mod env {
    pub const RPC_URL: &str = "RPC_URL";
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,liquidator_core=debug,liquidator_api=debug")
        }))
        .init();

    let config = LiquidatorConfig::from_env()?;
    config.log_config();

    let rpc_url = std::env::var(env::RPC_URL)
        .map_err(|_| anyhow::anyhow!("Missing env var: {}", env::RPC_URL))?;

    // Ledger access (read-only provider handle, shared by all evaluations)
    let provider = Arc::new(ProviderBuilder::new().on_http(rpc_url.parse()?));
    let clearing_house = ClearingHouse::connect(config.clearing_house, provider).await?;

    // Account enumeration
    let transport =
        HttpGraphTransport::with_timeout(&config.subgraph_endpoint, config.request_timeout)?;
    let subgraph = SubgraphClient::with_transport(transport).with_page_size(config.page_size);

    // Scanner
    let dispatcher =
        BatchDispatcher::new(Arc::new(clearing_house)).with_chunk_size(config.chunk_size);
    let liquidator = Liquidator::new(Arc::new(subgraph), dispatcher)
        .with_retry_delay(config.retry_delay)
        .with_max_enumeration_attempts(config.max_enumeration_attempts);

    info!("Starting liquidation scan");
    let outcome = liquidator.run().await?;

    for instruction in &outcome.instructions {
        info!(to = %instruction.to, data = %instruction.data, "Liquidation instruction");
    }

    info!(
        should_exec = outcome.should_exec(),
        message = %outcome.summary(),
        "Scan finished"
    );

    Ok(())
}

/// Print startup banner.
fn print_banner() {
    println!(
        r#"
    ╦  ╦┌─┐ ┬ ┬┬┌┬┐┌─┐┌┬┐┌─┐┬─┐
    ║  ║│─┼┐│ ││ ││├─┤ │ │ │├┬┘
    ╩═╝╩└─┘└└─┘┴─┴┘┴ ┴ ┴ └─┘┴└─
    Clearing-House Scanner v0.1.0
    "#
    );
}
