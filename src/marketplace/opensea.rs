use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, error};
use reqwest::{header, Client};
use serde::Deserialize;

use super::{Figure, MarketplaceStats, StatsSource};
use crate::registry::CollectionEntry;

#[derive(Debug, Deserialize)]
struct StatsResponse {
    stats: RawStats,
}

// Amounts are already in ether.
#[derive(Debug, Deserialize)]
struct RawStats {
    floor_price: Option<f64>,
    one_day_sales: Option<f64>,
    one_day_volume: Option<f64>,
    one_day_change: Option<f64>,
}

/// OpenSea collection stats, keyed by slug.
#[derive(Debug, Clone)]
pub struct OpenSeaClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OpenSeaClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn stats_url(&self, slug: &str) -> String {
        format!("{}/collection/{}/stats", self.base_url, slug)
    }

    async fn try_fetch(&self, slug: &str) -> Result<MarketplaceStats> {
        let url = self.stats_url(slug);
        debug!("GET {}", url);
        let body = self
            .http
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .header("X-API-KEY", self.api_key.as_str())
            .send()
            .await
            .with_context(|| format!("OpenSea request failed for {}", slug))?
            .error_for_status()?
            .text()
            .await?;
        parse_stats(&body)
    }
}

#[async_trait]
impl StatsSource for OpenSeaClient {
    async fn fetch_stats(&self, entry: &CollectionEntry) -> MarketplaceStats {
        match self.try_fetch(&entry.slug).await {
            Ok(stats) => stats,
            Err(e) => {
                error!("OpenSea stats for {} unavailable: {:?}", entry.slug, e);
                MarketplaceStats::default()
            }
        }
    }
}

/// Volume and change are rounded to 2 decimals, floor is kept as sent.
pub fn parse_stats(body: &str) -> Result<MarketplaceStats> {
    let response: StatsResponse =
        serde_json::from_str(body).context("Malformed OpenSea stats body")?;
    let stats = response.stats;

    Ok(MarketplaceStats {
        floor_price: stats.floor_price.map(Figure::exact),
        sales_count_24h: stats.one_day_sales.map(|n| n.max(0.0) as u64),
        volume_24h: stats.one_day_volume.map(|v| Figure::rounded(v, 2)),
        price_change_24h: stats.one_day_change.map(|c| Figure::rounded(c, 2)),
    })
}
