use anyhow::{Context, Result};
use log::{error, info};
use std::{fmt::Display, path::PathBuf};
use tokio::{fs, io::AsyncWriteExt};

use crate::chain::{SaleRecord, TOP_SALES};
use crate::marketplace::{Figure, MarketplaceStats};

pub const REPORT_HEADER: &str = "Collection Analysis\n";
pub const ASSET_URL: &str = "https://opensea.io/assets/ethereum";
pub const NO_SALES: &str = "No sales found!";

/// Everything known about one collection after a run.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedRecord {
    pub name: String,
    pub address: String,
    pub os_stats: MarketplaceStats,
    pub lr_stats: MarketplaceStats,
    pub top_sales: Vec<SaleRecord>,
}

impl CombinedRecord {
    pub fn asset_link(&self, token_id: &str) -> String {
        format!("{}/{}/{}", ASSET_URL, self.address, token_id)
    }

    pub fn render(&self) -> String {
        let mut out = format!("\t\t\t{}\n", self.name.to_uppercase());
        out.push_str(&stats_line("OPENSEA:  ", &self.os_stats));
        out.push_str(&stats_line("LOOKSRARE: ", &self.lr_stats));

        if self.top_sales.is_empty() {
            out.push_str(NO_SALES);
            out.push_str("\n\n\n");
            return out;
        }

        out.push_str("Top OS Sales: \n");
        for (rank, sale) in self.top_sales.iter().take(TOP_SALES).enumerate() {
            out.push_str(&format!(
                "#{}: Price: {}, OpenSea: {}\n",
                rank + 1,
                Figure::rounded(sale.price, 2),
                self.asset_link(&sale.token_id)
            ));
        }
        out.push_str("\n\n");
        out
    }
}

// Missing values print as a bare N/A.
fn field<T: Display>(value: Option<T>, suffix: &str) -> String {
    match value {
        Some(value) => format!("{}{}", value, suffix),
        None => "N/A".to_string(),
    }
}

fn stats_line(label: &str, stats: &MarketplaceStats) -> String {
    format!(
        "{}Floor: {}  Sales: {}  Volume: {}  24HR Change: {}\n",
        label,
        field(stats.floor_price, "E"),
        field(stats.sales_count_24h, ""),
        field(stats.volume_24h, "E"),
        field(stats.price_change_24h, "%"),
    )
}

/// Plain-text report file. `reset` truncates it and writes the header,
/// records are appended after that, so every run adds a fresh section.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    path: PathBuf,
}

impl ReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn reset(&self) -> Result<()> {
        fs::write(&self.path, REPORT_HEADER)
            .await
            .with_context(|| format!("Failed to create {}", self.path.display()))?;
        info!("Report file {} created", self.path.display());
        Ok(())
    }

    pub async fn append(&self, text: &str) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Renders and appends one record. Write failures are logged only.
    pub async fn write_record(&self, record: &CombinedRecord) {
        match self.append(&record.render()).await {
            Ok(()) => info!("Added {} to {}", record.name, self.path.display()),
            Err(e) => error!("Failed to write {}: {:?}", record.name, e),
        }
    }
}
