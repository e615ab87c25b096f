/// Historical USD prices consumed by the ledger
///
/// The ledger only sees `PriceResolver`. `PriceTable` is a CSV-backed resolver
/// for offline runs: columns `asset,timestamp,usd_price`, lookups return the
/// latest quote at or before the requested time.
use crate::errors::PersistenceError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

pub trait PriceResolver {
    fn price(&self, timestamp: i64, asset: &str) -> Option<f64>;
}

impl<F> PriceResolver for F
where
    F: Fn(i64, &str) -> Option<f64>,
{
    fn price(&self, timestamp: i64, asset: &str) -> Option<f64> {
        self(timestamp, asset)
    }
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    asset: String,
    timestamp: i64,
    usd_price: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    quotes: HashMap<String, BTreeMap<i64, f64>>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: &str, timestamp: i64, usd_price: f64) {
        self.quotes
            .entry(asset.to_string())
            .or_default()
            .insert(timestamp, usd_price);
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PersistenceError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut table = Self::new();
        for (idx, row) in csv_reader.deserialize::<PriceRow>().enumerate() {
            let row = row.map_err(|e| PersistenceError::Serialization {
                message: format!("price row {}: {}", idx + 2, e),
            })?;
            table.insert(&row.asset, row.timestamp, row.usd_price);
        }
        Ok(table)
    }

    pub fn from_path(path: &Path) -> Result<Self, PersistenceError> {
        let file = std::fs::File::open(path).map_err(|e| PersistenceError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_reader(file)
    }

    pub fn len(&self) -> usize {
        self.quotes.values().map(|q| q.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PriceResolver for PriceTable {
    fn price(&self, timestamp: i64, asset: &str) -> Option<f64> {
        self.quotes
            .get(asset)?
            .range(..=timestamp)
            .next_back()
            .map(|(_, price)| *price)
    }
}
