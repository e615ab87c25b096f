//! Drives the state machine: one ingestion task at a time, the next queued
//! wallet promoted as soon as the current one finishes or fails.

use super::state::{EnqueueOutcome, WalletProcessingState};
use crate::errors::{ValidationError, WalletLedgerError};
use crate::logger::{self, LogTag};
use crate::persistence::PersistenceSink;
use crate::transactions::ingest::{CancelFlag, IngestOptions, IngestSummary, IngestUpdate, WalletIngestor};
use crate::utils::{format_address_short, validate_wallet_address};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone)]
pub enum QueueEvent {
    Started { wallet: String },
    Update { wallet: String, update: IngestUpdate },
    Completed { wallet: String, summary: IngestSummary },
    /// The wallet still moved to completed; this is the status to surface
    Failed { wallet: String, error: WalletLedgerError },
    Idle,
}

pub struct WalletQueue {
    ingestor: Arc<WalletIngestor>,
    sink: Option<Arc<dyn PersistenceSink>>,
    options: IngestOptions,
    state: Mutex<WalletProcessingState>,
    cancel: Mutex<Option<CancelFlag>>,
    events: mpsc::UnboundedSender<QueueEvent>,
    idle: watch::Sender<bool>,
}

impl WalletQueue {
    pub fn new(
        ingestor: Arc<WalletIngestor>,
        sink: Option<Arc<dyn PersistenceSink>>,
        options: IngestOptions,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<QueueEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (idle, _) = watch::channel(true);
        let queue = Arc::new(Self {
            ingestor,
            sink,
            options,
            state: Mutex::new(WalletProcessingState::new()),
            cancel: Mutex::new(None),
            events,
            idle,
        });
        (queue, rx)
    }

    pub fn snapshot(&self) -> WalletProcessingState {
        self.state.lock().clone()
    }

    /// Add a wallet. Starts it right away if nothing is running.
    pub fn enqueue(self: &Arc<Self>, wallet: &str) -> Result<EnqueueOutcome, ValidationError> {
        self.admit(wallet, false)
    }

    /// Run a completed wallet again
    pub fn requeue(self: &Arc<Self>, wallet: &str) -> Result<EnqueueOutcome, ValidationError> {
        self.admit(wallet, true)
    }

    fn admit(self: &Arc<Self>, wallet: &str, again: bool) -> Result<EnqueueOutcome, ValidationError> {
        let wallet = validate_wallet_address(wallet)?;
        let outcome = {
            let mut state = self.state.lock();
            let outcome = if again {
                state.requeue(wallet)
            } else {
                state.enqueue(wallet)
            };
            // Flipped under the lock so a finishing drive cannot overwrite it
            if outcome == EnqueueOutcome::Started {
                self.idle.send_replace(false);
            }
            outcome
        };

        match &outcome {
            EnqueueOutcome::Started => {
                let queue = Arc::clone(self);
                let wallet = wallet.to_string();
                tokio::spawn(async move { queue.drive(wallet).await });
            }
            EnqueueOutcome::Queued(position) => logger::info(
                LogTag::Queue,
                &format!("{} queued at position {}", format_address_short(wallet), position + 1),
            ),
            EnqueueOutcome::AlreadyActive | EnqueueOutcome::AlreadyCompleted => logger::debug(
                LogTag::Queue,
                &format!("{} already {:?}, ignoring", format_address_short(wallet), outcome),
            ),
        }
        Ok(outcome)
    }

    /// Stop the running wallet; it fails with `Cancelled` and the queue moves on
    pub fn cancel_current(&self) {
        if let Some(flag) = self.cancel.lock().as_ref() {
            flag.cancel();
        }
    }

    pub async fn wait_idle(&self) {
        let mut idle = self.idle.subscribe();
        // Sender lives in self, so this only ends when idle
        let _ = idle.wait_for(|is_idle| *is_idle).await;
    }

    async fn drive(self: Arc<Self>, first: String) {
        let mut next = Some(first);
        while let Some(wallet) = next.take() {
            self.emit(QueueEvent::Started { wallet: wallet.clone() });
            logger::info(LogTag::Queue, &format!("{} ingesting", format_address_short(&wallet)));

            let result = self.ingest_one(&wallet).await;
            next = {
                let mut state = self.state.lock();
                match &result {
                    Ok(_) => state.complete(&wallet),
                    Err(_) => state.fail(&wallet),
                }
            };

            match result {
                Ok(summary) => self.emit(QueueEvent::Completed { wallet, summary }),
                Err(error) => {
                    logger::error(
                        LogTag::Queue,
                        &format!("{} failed: {}", format_address_short(&wallet), error),
                    );
                    self.emit(QueueEvent::Failed { wallet, error });
                }
            }
        }

        // An enqueue may have started a new drive since the last complete/fail
        let state = self.state.lock();
        if state.is_idle() {
            self.emit(QueueEvent::Idle);
            self.idle.send_replace(true);
        }
    }

    async fn ingest_one(&self, wallet: &str) -> Result<IngestSummary, WalletLedgerError> {
        let cancel = CancelFlag::new();
        *self.cancel.lock() = Some(cancel.clone());

        let (tx, mut rx) = mpsc::channel(64);
        let events = self.events.clone();
        let forward_wallet = wallet.to_string();
        let forwarder = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                let _ = events.send(QueueEvent::Update {
                    wallet: forward_wallet.clone(),
                    update,
                });
            }
        });

        let result = self.ingestor.run(wallet, self.options.clone(), &cancel, &tx).await;
        drop(tx);
        let _ = forwarder.await;
        {
            let mut slot = self.cancel.lock();
            if slot.as_ref().is_some_and(|flag| flag.is_same(&cancel)) {
                *slot = None;
            }
        }

        let summary = result?;
        if let Some(sink) = &self.sink {
            sink.upsert(&summary.transactions).await?;
        }
        Ok(summary)
    }

    fn emit(&self, event: QueueEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }
}
