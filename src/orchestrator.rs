use anyhow::{anyhow, Result};
use log::{error, info, warn};

use crate::chain::SaleSource;
use crate::marketplace::StatsSource;
use crate::rate_limit::RateLimiter;
use crate::registry::{CollectionEntry, CollectionRegistry};
use crate::report::{CombinedRecord, ReportWriter};

/// Drives one run: every collection is processed in registry order, one
/// network call at a time, then the report is written in the same order.
pub struct Orchestrator<L, C, O> {
    registry: CollectionRegistry,
    looksrare: L,
    chain: C,
    opensea: O,
    opensea_limit: RateLimiter,
    writer: ReportWriter,
}

impl<L, C, O> Orchestrator<L, C, O>
where
    L: StatsSource,
    C: SaleSource,
    O: StatsSource,
{
    pub fn new(
        registry: CollectionRegistry,
        looksrare: L,
        chain: C,
        opensea: O,
        opensea_limit: RateLimiter,
        writer: ReportWriter,
    ) -> Self {
        Self {
            registry,
            looksrare,
            chain,
            opensea,
            opensea_limit,
            writer,
        }
    }

    async fn collect_one(&self, address: &str) -> Result<CombinedRecord> {
        let slug = self
            .registry
            .slug_for(address)
            .ok_or_else(|| anyhow!("No slug registered for {}", address))?;
        let entry = CollectionEntry {
            slug: slug.to_string(),
            address: address.to_string(),
        };
        info!("Processing {} ({})", entry.slug, entry.address);

        let lr_stats = self.looksrare.fetch_stats(&entry).await;
        let top_sales = self.chain.recent_top_sales(&entry.address).await;
        // Only the OpenSea API is throttled.
        self.opensea_limit.acquire().await;
        let os_stats = self.opensea.fetch_stats(&entry).await;
        if lr_stats.is_empty() && os_stats.is_empty() {
            warn!("No marketplace stats for {}", entry.slug);
        }

        Ok(CombinedRecord {
            name: entry.slug,
            address: entry.address,
            os_stats,
            lr_stats,
            top_sales,
        })
    }

    pub async fn collect(&self) -> Result<Vec<CombinedRecord>> {
        let mut records = Vec::with_capacity(self.registry.len());
        for address in self.registry.addresses() {
            records.push(self.collect_one(address).await?);
        }
        Ok(records)
    }

    /// Resets the report file, gathers every record, then appends them.
    pub async fn run(&self) -> Result<Vec<CombinedRecord>> {
        if let Err(e) = self.writer.reset().await {
            error!("{:?}", e);
        }

        let records = self.collect().await?;
        for record in &records {
            self.writer.write_record(record).await;
        }
        Ok(records)
    }
}
