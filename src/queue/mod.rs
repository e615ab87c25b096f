/// Wallet processing queue
///
/// `state` holds the transitions, `runner` executes them: exactly one wallet
/// ingests at a time so all wallets share the provider's rate budget.
pub mod runner;
pub mod state;

pub use runner::{QueueEvent, WalletQueue};
pub use state::{EnqueueOutcome, WalletProcessingState, WalletState};
