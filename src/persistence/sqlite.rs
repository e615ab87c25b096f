//! SQLite-backed sink
//!
//! One row per signature. Indexed columns mirror the fields queries filter on;
//! the full record is kept as JSON in `payload` so reloading never loses data.

use super::{PersistenceSink, UpsertReport};
use crate::errors::PersistenceError;
use crate::logger::{self, LogTag};
use crate::transactions::types::ClassifiedTransaction;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    signature TEXT PRIMARY KEY,
    wallet_address TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    slot INTEGER,
    transaction_type TEXT NOT NULL,
    native_amount_delta INTEGER NOT NULL,
    fee_amount INTEGER NOT NULL,
    success INTEGER NOT NULL,
    counterparty_address TEXT,
    is_internal_transfer INTEGER NOT NULL,
    asset_mint TEXT,
    payload TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_transactions_wallet_time ON transactions(wallet_address, timestamp);
"#;

fn db_error(operation: &str) -> impl Fn(rusqlite::Error) -> PersistenceError + '_ {
    move |e| PersistenceError::Database {
        operation: operation.to_string(),
        message: e.to_string(),
    }
}

pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PersistenceError::Io {
                path: parent.display().to_string(),
                message: e.to_string(),
            })?;
        }
        let conn = Connection::open(path).map_err(db_error("open database"))?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory().map_err(db_error("open in-memory database"))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute_batch(SCHEMA).map_err(db_error("create tables"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl PersistenceSink for SqliteSink {
    async fn upsert(&self, transactions: &[ClassifiedTransaction]) -> Result<UpsertReport, PersistenceError> {
        if transactions.is_empty() {
            return Ok(UpsertReport::default());
        }

        let mut conn = self.conn.lock();
        let db_tx = conn.transaction().map_err(db_error("begin upsert"))?;
        let now = Utc::now().to_rfc3339();
        {
            let mut stmt = db_tx
                .prepare(
                    "INSERT INTO transactions (
                        signature, wallet_address, timestamp, slot, transaction_type,
                        native_amount_delta, fee_amount, success, counterparty_address,
                        is_internal_transfer, asset_mint, payload, updated_at
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                     ON CONFLICT(signature) DO UPDATE SET
                        wallet_address = excluded.wallet_address,
                        timestamp = excluded.timestamp,
                        slot = excluded.slot,
                        transaction_type = excluded.transaction_type,
                        native_amount_delta = excluded.native_amount_delta,
                        fee_amount = excluded.fee_amount,
                        success = excluded.success,
                        counterparty_address = excluded.counterparty_address,
                        is_internal_transfer = excluded.is_internal_transfer,
                        asset_mint = excluded.asset_mint,
                        payload = excluded.payload,
                        updated_at = excluded.updated_at",
                )
                .map_err(db_error("prepare upsert"))?;

            for tx in transactions {
                let payload = serde_json::to_string(tx)?;
                stmt.execute(params![
                    tx.signature,
                    tx.wallet_address,
                    tx.timestamp,
                    tx.slot.map(|s| s as i64),
                    tx.type_label(),
                    tx.native_amount_delta,
                    tx.fee_amount as i64,
                    tx.success,
                    tx.counterparty_address,
                    tx.is_internal_transfer,
                    tx.asset_info.as_ref().map(|a| a.mint.clone()),
                    payload,
                    now,
                ])
                .map_err(db_error("upsert transaction"))?;
            }
        }
        db_tx.commit().map_err(db_error("commit upsert"))?;

        logger::debug(
            LogTag::Persistence,
            &format!("Upserted {} transactions", transactions.len()),
        );
        Ok(UpsertReport {
            written: transactions.len(),
        })
    }

    async fn load_wallet(&self, wallet: &str) -> Result<Vec<ClassifiedTransaction>, PersistenceError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT payload FROM transactions
                 WHERE wallet_address = ?1
                 ORDER BY timestamp ASC, signature ASC",
            )
            .map_err(db_error("prepare load"))?;
        let payloads = stmt
            .query_map(params![wallet], |row| row.get::<_, String>(0))
            .map_err(db_error("load wallet"))?;

        let mut history = Vec::new();
        for payload in payloads {
            let payload = payload.map_err(db_error("read row"))?;
            history.push(serde_json::from_str(&payload)?);
        }
        Ok(history)
    }

    async fn count(&self) -> Result<usize, PersistenceError> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))
            .map_err(db_error("count"))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::fixtures::transaction;

    #[tokio::test]
    async fn test_resubmitting_signature_does_not_duplicate() {
        let sink = SqliteSink::in_memory().unwrap();
        sink.upsert(&[transaction("a", "W", 10, 100), transaction("b", "W", 20, -50)])
            .await
            .unwrap();

        let mut changed = transaction("a", "W", 10, 999);
        changed.is_internal_transfer = true;
        let report = sink.upsert(&[changed]).await.unwrap();
        assert_eq!(report.written, 1);
        assert_eq!(sink.count().await.unwrap(), 2);

        let history = sink.load_wallet("W").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].native_amount_delta, 999);
        assert!(history[0].is_internal_transfer);
        assert!(sink.load_wallet("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("transactions.db");
        {
            let sink = SqliteSink::open(&path).unwrap();
            sink.upsert(&[transaction("a", "W", 10, 1)]).await.unwrap();
        }
        let reopened = SqliteSink::open(&path).unwrap();
        assert_eq!(reopened.load_wallet("W").await.unwrap()[0].signature, "a");
    }
}
