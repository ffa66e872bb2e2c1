use anyhow::{anyhow, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub slug: String,
    pub address: String,
}

/// Static list of tracked collections. Keeps the load order for iteration
/// and two maps for slug <-> address lookups, both filled at construction.
#[derive(Debug, Clone, Default)]
pub struct CollectionRegistry {
    entries: Vec<CollectionEntry>,
    address_by_slug: HashMap<String, String>,
    slug_by_address: HashMap<String, String>,
}

impl CollectionRegistry {
    pub fn new(entries: Vec<CollectionEntry>) -> Result<Self> {
        let mut address_by_slug = HashMap::with_capacity(entries.len());
        let mut slug_by_address = HashMap::with_capacity(entries.len());

        for entry in &entries {
            if slug_by_address
                .insert(entry.address.clone(), entry.slug.clone())
                .is_some()
            {
                return Err(anyhow!("Duplicate collection address: {}", entry.address));
            }
            if address_by_slug
                .insert(entry.slug.clone(), entry.address.clone())
                .is_some()
            {
                return Err(anyhow!("Duplicate collection slug: {}", entry.slug));
            }
        }

        Ok(Self {
            entries,
            address_by_slug,
            slug_by_address,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<CollectionEntry> =
            serde_json::from_str(json).context("Failed to parse collection registry")?;
        Self::new(entries)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read collections file {}", path.display()))?;
        let registry = Self::from_json(&json)?;
        info!("Loaded {} collections from {}", registry.len(), path.display());
        Ok(registry)
    }

    pub fn entries(&self) -> &[CollectionEntry] {
        &self.entries
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.address.as_str())
    }

    pub fn slug_for(&self, address: &str) -> Option<&str> {
        self.slug_by_address.get(address).map(String::as_str)
    }

    pub fn address_for(&self, slug: &str) -> Option<&str> {
        self.address_by_slug.get(slug).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
