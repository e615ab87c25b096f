/// Durable store for processed transactions
///
/// Everything goes through `PersistenceSink::upsert`, keyed by signature:
/// re-submitting a signature replaces its row, never duplicates it. Ledger
/// output is not stored here; it is recomputed from the transaction history.
pub mod memory;
pub mod sqlite;

use crate::errors::PersistenceError;
use crate::transactions::types::ClassifiedTransaction;
use async_trait::async_trait;

pub use memory::MemorySink;
pub use sqlite::SqliteSink;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertReport {
    /// Rows inserted or replaced
    pub written: usize,
}

#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn upsert(&self, transactions: &[ClassifiedTransaction]) -> Result<UpsertReport, PersistenceError>;

    /// Stored history for one wallet, ascending by timestamp
    async fn load_wallet(&self, wallet: &str) -> Result<Vec<ClassifiedTransaction>, PersistenceError>;

    async fn count(&self) -> Result<usize, PersistenceError>;
}
