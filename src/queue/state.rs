//! Single-active-wallet state machine
//!
//! At most one wallet is `Current`. `current`, `queued` and `completed` are
//! pairwise disjoint; every transition below keeps them that way. Failure is
//! a completion too, so the queue never sticks on a wallet.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletState {
    Idle,
    Queued,
    Current,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Nothing was running; the wallet is now current and should start
    Started,
    /// Waiting behind the current wallet at this 0-based position
    Queued(usize),
    /// Already current or queued; nothing changed
    AlreadyActive,
    /// Finished earlier; use `requeue` to run it again
    AlreadyCompleted,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletProcessingState {
    current: Option<String>,
    queued: VecDeque<String>,
    completed: Vec<String>,
}

impl WalletProcessingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn queued(&self) -> impl Iterator<Item = &str> {
        self.queued.iter().map(String::as_str)
    }

    pub fn completed(&self) -> &[String] {
        &self.completed
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    pub fn state_of(&self, wallet: &str) -> WalletState {
        if self.current.as_deref() == Some(wallet) {
            WalletState::Current
        } else if self.queued.iter().any(|w| w == wallet) {
            WalletState::Queued
        } else if self.completed.iter().any(|w| w == wallet) {
            WalletState::Completed
        } else {
            WalletState::Idle
        }
    }

    pub fn enqueue(&mut self, wallet: &str) -> EnqueueOutcome {
        match self.state_of(wallet) {
            WalletState::Current | WalletState::Queued => EnqueueOutcome::AlreadyActive,
            WalletState::Completed => EnqueueOutcome::AlreadyCompleted,
            WalletState::Idle => self.admit(wallet),
        }
    }

    /// Explicitly run a completed wallet again
    pub fn requeue(&mut self, wallet: &str) -> EnqueueOutcome {
        if self.state_of(wallet) == WalletState::Completed {
            self.completed.retain(|w| w != wallet);
            return self.admit(wallet);
        }
        self.enqueue(wallet)
    }

    fn admit(&mut self, wallet: &str) -> EnqueueOutcome {
        if self.current.is_none() {
            self.current = Some(wallet.to_string());
            EnqueueOutcome::Started
        } else {
            self.queued.push_back(wallet.to_string());
            EnqueueOutcome::Queued(self.queued.len() - 1)
        }
    }

    /// Current -> Completed, then promote the queue head. Returns the wallet
    /// that became current, if any. A wallet that is not current is ignored.
    pub fn complete(&mut self, wallet: &str) -> Option<String> {
        if self.current.as_deref() != Some(wallet) {
            return None;
        }
        self.current = None;
        self.completed.push(wallet.to_string());
        self.current = self.queued.pop_front();
        self.current.clone()
    }

    /// Failed ingestion still completes the wallet
    pub fn fail(&mut self, wallet: &str) -> Option<String> {
        self.complete(wallet)
    }
}
