use thiserror::Error;

/// Ledger input failures. The ledger never reorders or guesses; it stops.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerInputError {
    #[error("Event {signature} at {timestamp} is earlier than the previous event at {previous}")]
    NonMonotonicTimestamp {
        signature: String,
        timestamp: i64,
        previous: i64,
    },

    #[error("Event {signature} has invalid quantity {quantity}")]
    InvalidQuantity { signature: String, quantity: f64 },

    #[error("No price for {asset} at {timestamp}")]
    PriceUnavailable { asset: String, timestamp: i64 },

    #[error("Invalid price {price} for {asset} at {timestamp}")]
    InvalidPrice {
        asset: String,
        timestamp: i64,
        price: f64,
    },

    /// Disposal exceeds tracked lots under the reject policy
    #[error("Disposal {signature} of {requested} {asset} exceeds open lots ({available} available)")]
    ShortfallRejected {
        asset: String,
        signature: String,
        requested: f64,
        available: f64,
    },
}
