use super::{PersistenceSink, UpsertReport};
use crate::errors::PersistenceError;
use crate::transactions::types::{sort_chronologically, ClassifiedTransaction};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Signature-keyed map; used by tests and `--no-persist` runs
#[derive(Default)]
pub struct MemorySink {
    rows: RwLock<HashMap<String, ClassifiedTransaction>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    async fn upsert(&self, transactions: &[ClassifiedTransaction]) -> Result<UpsertReport, PersistenceError> {
        let mut rows = self.rows.write();
        for tx in transactions {
            rows.insert(tx.signature.clone(), tx.clone());
        }
        Ok(UpsertReport {
            written: transactions.len(),
        })
    }

    async fn load_wallet(&self, wallet: &str) -> Result<Vec<ClassifiedTransaction>, PersistenceError> {
        let mut history: Vec<ClassifiedTransaction> = self
            .rows
            .read()
            .values()
            .filter(|tx| tx.wallet_address == wallet)
            .cloned()
            .collect();
        sort_chronologically(&mut history);
        Ok(history)
    }

    async fn count(&self) -> Result<usize, PersistenceError> {
        Ok(self.rows.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::fixtures::transaction;

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let sink = MemorySink::new();
        let batch = vec![transaction("a", "W", 20, 1), transaction("b", "W", 10, 2)];
        sink.upsert(&batch).await.unwrap();
        sink.upsert(&batch).await.unwrap();
        assert_eq!(sink.count().await.unwrap(), 2);

        let history = sink.load_wallet("W").await.unwrap();
        assert_eq!(history[0].signature, "b");
    }
}
