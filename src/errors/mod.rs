/// Error taxonomy for walletledger
///
/// Each subsystem has its own enum with struct variants; `WalletLedgerError`
/// wraps them for callers that cross subsystem boundaries.
pub mod ledger;
pub mod rpc;

pub use ledger::LedgerInputError;
pub use rpc::{classify_http_status, classify_json_rpc_error, FailureClass, ItemFailure, RpcError};

// =============================================================================
// MAIN ERROR TYPE
// =============================================================================

#[derive(Debug, Clone)]
pub enum WalletLedgerError {
    /// Provider calls (after retry/backoff)
    Rpc(RpcError),

    /// Rejected before any network call
    Validation(ValidationError),

    /// Malformed or out-of-order event stream handed to the ledger
    Ledger(LedgerInputError),

    Persistence(PersistenceError),

    Configuration(ConfigurationError),

    /// Ingestion stopped by its cancel flag
    Cancelled { wallet: String },
}

impl std::fmt::Display for WalletLedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletLedgerError::Rpc(e) => write!(f, "RPC Error: {}", e),
            WalletLedgerError::Validation(e) => write!(f, "Validation Error: {}", e),
            WalletLedgerError::Ledger(e) => write!(f, "Ledger Input Error: {}", e),
            WalletLedgerError::Persistence(e) => write!(f, "Persistence Error: {}", e),
            WalletLedgerError::Configuration(e) => write!(f, "Configuration Error: {}", e),
            WalletLedgerError::Cancelled { wallet } => {
                write!(f, "Ingestion cancelled for wallet {}", wallet)
            }
        }
    }
}

impl std::error::Error for WalletLedgerError {}

impl From<RpcError> for WalletLedgerError {
    fn from(err: RpcError) -> Self {
        WalletLedgerError::Rpc(err)
    }
}

impl From<ValidationError> for WalletLedgerError {
    fn from(err: ValidationError) -> Self {
        WalletLedgerError::Validation(err)
    }
}

impl From<LedgerInputError> for WalletLedgerError {
    fn from(err: LedgerInputError) -> Self {
        WalletLedgerError::Ledger(err)
    }
}

impl From<PersistenceError> for WalletLedgerError {
    fn from(err: PersistenceError) -> Self {
        WalletLedgerError::Persistence(err)
    }
}

impl From<ConfigurationError> for WalletLedgerError {
    fn from(err: ConfigurationError) -> Self {
        WalletLedgerError::Configuration(err)
    }
}

impl From<String> for WalletLedgerError {
    fn from(err: String) -> Self {
        WalletLedgerError::Rpc(RpcError::Unexpected {
            endpoint: String::new(),
            message: err,
        })
    }
}

// =============================================================================
// VALIDATION ERROR TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InvalidWalletAddress { address: String, reason: String },
    InvalidSignature { signature: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidWalletAddress { address, reason } => {
                write!(f, "Invalid wallet address '{}': {}", address, reason)
            }
            ValidationError::InvalidSignature { signature } => {
                write!(f, "Invalid transaction signature '{}'", signature)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

// =============================================================================
// PERSISTENCE ERROR TYPES
// =============================================================================

#[derive(Debug, Clone)]
pub enum PersistenceError {
    Database { operation: String, message: String },
    Serialization { message: String },
    Io { path: String, message: String },
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceError::Database { operation, message } => {
                write!(f, "Database error during {}: {}", operation, message)
            }
            PersistenceError::Serialization { message } => {
                write!(f, "Serialization failed: {}", message)
            }
            PersistenceError::Io { path, message } => write!(f, "I/O error on {}: {}", path, message),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        PersistenceError::Database {
            operation: "query".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization {
            message: err.to_string(),
        }
    }
}

// =============================================================================
// CONFIGURATION ERROR TYPES
// =============================================================================

#[derive(Debug, Clone)]
pub enum ConfigurationError {
    FileRead { path: String, error: String },
    Parse { path: String, error: String },
    InvalidValue { field: String, reason: String },
    Write { path: String, error: String },
}

impl std::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationError::FileRead { path, error } => {
                write!(f, "Failed to read config file {}: {}", path, error)
            }
            ConfigurationError::Parse { path, error } => {
                write!(f, "Failed to parse config file {}: {}", path, error)
            }
            ConfigurationError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for {}: {}", field, reason)
            }
            ConfigurationError::Write { path, error } => {
                write!(f, "Failed to write config file {}: {}", path, error)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapping_and_display() {
        let err: WalletLedgerError = ValidationError::InvalidSignature {
            signature: "abc".to_string(),
        }
        .into();
        assert!(err.to_string().contains("Validation Error"));
        assert!(err.to_string().contains("abc"));

        let cancelled = WalletLedgerError::Cancelled {
            wallet: "W1".to_string(),
        };
        assert_eq!(cancelled.to_string(), "Ingestion cancelled for wallet W1");
    }
}
