use async_trait::async_trait;
use std::fmt;

use crate::registry::CollectionEntry;
use crate::utils::round_to;

pub mod looksrare;
pub mod opensea;

pub use looksrare::LooksRareClient;
pub use opensea::OpenSeaClient;

/// A decimal figure together with how it should be printed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Figure {
    value: f64,
    places: Option<u32>,
}

impl Figure {
    /// Printed in shortest form (`1.4`).
    pub fn exact(value: f64) -> Self {
        Self { value, places: None }
    }

    /// Rounded now and printed with exactly `places` decimals (`2.10`).
    pub fn rounded(value: f64, places: u32) -> Self {
        Self {
            value: round_to(value, places),
            places: Some(places),
        }
    }

    #[cfg(test)]
    pub fn value(&self) -> f64 {
        self.value
    }
}

impl fmt::Display for Figure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.places {
            Some(places) => write!(f, "{:.*}", places as usize, self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

/// Normalized 24h statistics of one collection on one marketplace.
/// Every field is optional: a failed fetch yields `MarketplaceStats::default()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketplaceStats {
    pub floor_price: Option<Figure>,
    pub sales_count_24h: Option<u64>,
    pub volume_24h: Option<Figure>,
    pub price_change_24h: Option<Figure>,
}

impl MarketplaceStats {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One marketplace statistics endpoint. Implementations pick the key they
/// need from the entry and never fail: errors are logged and degrade to an
/// empty record.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsSource {
    async fn fetch_stats(&self, entry: &CollectionEntry) -> MarketplaceStats;
}
