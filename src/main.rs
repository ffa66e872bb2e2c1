use anyhow::{Context, Result};
use ethers::providers::{Provider, Ws};
use log::info;
use std::sync::Arc;

use nft_stats::{
    chain::ChainSaleExtractor,
    config::Env,
    marketplace::{LooksRareClient, OpenSeaClient},
    orchestrator::Orchestrator,
    rate_limit::RateLimiter,
    registry::CollectionRegistry,
    report::ReportWriter,
    utils::setup_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    dotenv::dotenv().ok();
    let env = Env::new()?;
    setup_logger(env.level_filter()?)?;

    let registry = CollectionRegistry::load(&env.collections_path)?;

    // Node connection for the on-chain sales
    let ws = Ws::connect(env.wss_url.as_str())
        .await
        .context("Failed to connect to the node")?;
    let provider = Arc::new(Provider::new(ws));

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let opensea_limit = RateLimiter::new(env.opensea_rate_limit);
    info!("OpenSea requests spaced {:?} apart", opensea_limit.interval());

    let orchestrator = Orchestrator::new(
        registry,
        LooksRareClient::new(http.clone(), &env.looksrare_base_url),
        ChainSaleExtractor::new(provider, env.lookback_blocks),
        OpenSeaClient::new(http, &env.opensea_base_url, &env.opensea_api_key),
        opensea_limit,
        ReportWriter::new(&env.report_path),
    );

    let records = orchestrator.run().await?;
    info!(
        "Wrote {} collections to {}",
        records.len(),
        env.report_path
    );

    Ok(())
}
