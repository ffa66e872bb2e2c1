use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::Deserialize;

use super::{Figure, MarketplaceStats, StatsSource};
use crate::registry::CollectionEntry;
use crate::utils::{parse_wei, wei_to_ether};

#[derive(Debug, Deserialize)]
struct StatsResponse {
    data: Option<RawStats>,
    message: Option<String>,
}

// floorPrice and volume24h are wei amounts as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStats {
    floor_price: Option<String>,
    count24h: Option<u64>,
    volume24h: Option<String>,
    floor_change24h: Option<f64>,
}

/// LooksRare collection stats, keyed by contract address.
#[derive(Debug, Clone)]
pub struct LooksRareClient {
    http: Client,
    base_url: String,
}

impl LooksRareClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn stats_url(&self, address: &str) -> String {
        format!("{}/collections/stats?address={}", self.base_url, address)
    }

    async fn try_fetch(&self, address: &str) -> Result<MarketplaceStats> {
        let url = self.stats_url(address);
        debug!("GET {}", url);
        let body = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("LooksRare request failed for {}", address))?
            .error_for_status()?
            .text()
            .await?;
        parse_stats(&body)
    }
}

#[async_trait]
impl StatsSource for LooksRareClient {
    async fn fetch_stats(&self, entry: &CollectionEntry) -> MarketplaceStats {
        match self.try_fetch(&entry.address).await {
            Ok(stats) => stats,
            Err(e) => {
                error!("LooksRare stats for {} unavailable: {:?}", entry.address, e);
                MarketplaceStats::default()
            }
        }
    }
}

fn ether_figure(raw: Option<String>) -> Result<Option<Figure>> {
    match raw {
        Some(raw) => Ok(Some(Figure::exact(wei_to_ether(parse_wei(&raw)?)?))),
        None => Ok(None),
    }
}

/// Floor and volume are scaled from wei to ether, change is rounded to 2 decimals.
pub fn parse_stats(body: &str) -> Result<MarketplaceStats> {
    let response: StatsResponse =
        serde_json::from_str(body).context("Malformed LooksRare stats body")?;
    let stats = response.data.ok_or_else(|| {
        anyhow!(
            "LooksRare returned no data: {}",
            response.message.unwrap_or_default()
        )
    })?;

    Ok(MarketplaceStats {
        floor_price: ether_figure(stats.floor_price)?,
        sales_count_24h: stats.count24h,
        volume_24h: ether_figure(stats.volume24h)?,
        price_change_24h: stats.floor_change24h.map(|c| Figure::rounded(c, 2)),
    })
}
