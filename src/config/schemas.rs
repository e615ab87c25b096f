use crate::config_struct;
use crate::constants::{DEFAULT_DUST_THRESHOLD_LAMPORTS, DEFAULT_LONG_TERM_DAYS};
use crate::errors::ConfigurationError;
use crate::ledger::{HoldingPeriodPolicy, ShortfallPolicy};
use std::time::Duration;

// ============================================================================
// RPC
// ============================================================================

config_struct! {
    /// Provider endpoints and call pacing
    pub struct RpcConfig {
        /// Primary JSON-RPC endpoint
        primary_url: String = "https://api.mainnet-beta.solana.com".to_string(),

        /// Generic RPC endpoint used once when the primary fails; empty disables it
        fallback_url: String = String::new(),

        /// Per-request timeout, independent of backoff
        request_timeout_secs: u64 = 60,

        /// Minimum spacing between any two calls on one connection
        min_request_interval_ms: u64 = 100,

        /// Retries after the first attempt for page-level calls
        max_retries: u32 = 5,

        initial_retry_delay_ms: u64 = 1000,

        commitment: String = "confirmed".to_string(),
    }
}

impl RpcConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn initial_retry_delay(&self) -> Duration {
        Duration::from_millis(self.initial_retry_delay_ms)
    }
}

// ============================================================================
// INGESTION
// ============================================================================

/// Upper bound on in-flight detail requests
pub const MAX_DETAIL_FAN_OUT: usize = 10;

config_struct! {
    pub struct IngestionConfig {
        page_size: usize = 50,

        /// Hard cap on signatures per wallet run
        max_signatures: usize = 5000,

        /// Pages contributing nothing new before pagination stops
        max_consecutive_empty_pages: u32 = 3,

        detail_max_retries: u32 = 3,
        detail_retry_delay_ms: u64 = 1000,

        /// Pause before each detail request
        detail_request_delay_ms: u64 = 50,

        max_concurrent_details: usize = MAX_DETAIL_FAN_OUT,
    }
}

impl IngestionConfig {
    /// Fan-out clamped to 1..=10
    pub fn fan_out(&self) -> usize {
        self.max_concurrent_details.clamp(1, MAX_DETAIL_FAN_OUT)
    }

    pub fn detail_retry_delay(&self) -> Duration {
        Duration::from_millis(self.detail_retry_delay_ms)
    }

    pub fn detail_request_delay(&self) -> Duration {
        Duration::from_millis(self.detail_request_delay_ms)
    }
}

config_struct! {
    pub struct ClassifierConfig {
        /// Balance changes at or below this are fee noise
        dust_threshold_lamports: u64 = DEFAULT_DUST_THRESHOLD_LAMPORTS,
    }
}

config_struct! {
    pub struct CacheConfig {
        key_prefix: String = "walletledger_".to_string(),
        ttl_secs: u64 = 86_400,

        /// JSON snapshot path; empty keeps the cache in memory only
        snapshot_path: String = String::new(),
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

config_struct! {
    pub struct LedgerConfig {
        shortfall_policy: ShortfallPolicy = ShortfallPolicy::ZeroGain,
        holding_period_policy: HoldingPeriodPolicy = HoldingPeriodPolicy::EarliestLot,
        long_term_threshold_days: i64 = DEFAULT_LONG_TERM_DAYS,

        /// Illustrative rates only
        short_term_rate: f64 = 0.37,
        long_term_rate: f64 = 0.20,
    }
}

config_struct! {
    pub struct PersistenceConfig {
        enabled: bool = true,
        database_path: String = "data/transactions.db".to_string(),
    }
}

config_struct! {
    pub struct WalletsConfig {
        /// Every wallet owned by the user; transfers between them are internal
        own_wallets: Vec<String> = Vec::new(),
    }
}

// ============================================================================
// ROOT
// ============================================================================

config_struct! {
    pub struct Config {
        rpc: RpcConfig = RpcConfig::default(),
        ingestion: IngestionConfig = IngestionConfig::default(),
        classifier: ClassifierConfig = ClassifierConfig::default(),
        cache: CacheConfig = CacheConfig::default(),
        ledger: LedgerConfig = LedgerConfig::default(),
        persistence: PersistenceConfig = PersistenceConfig::default(),
        wallets: WalletsConfig = WalletsConfig::default(),
    }
}

impl Config {
    /// Reject values no component can run with
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        fn invalid(field: &str, reason: &str) -> ConfigurationError {
            ConfigurationError::InvalidValue {
                field: field.to_string(),
                reason: reason.to_string(),
            }
        }

        if self.rpc.primary_url.trim().is_empty() {
            return Err(invalid("rpc.primary_url", "must not be empty"));
        }
        if self.rpc.request_timeout_secs == 0 {
            return Err(invalid("rpc.request_timeout_secs", "must be positive"));
        }
        if self.ingestion.page_size == 0 || self.ingestion.page_size > 1000 {
            return Err(invalid("ingestion.page_size", "must be within 1..=1000"));
        }
        if self.ingestion.max_signatures == 0 {
            return Err(invalid("ingestion.max_signatures", "must be positive"));
        }
        if self.cache.ttl_secs == 0 {
            return Err(invalid("cache.ttl_secs", "must be positive"));
        }
        for (field, rate) in [
            ("ledger.short_term_rate", self.ledger.short_term_rate),
            ("ledger.long_term_rate", self.ledger.long_term_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(invalid(field, "must be between 0 and 1"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.rpc.request_timeout_secs, 60);
        assert_eq!(config.rpc.max_retries, 5);
        assert_eq!(config.rpc.commitment, "confirmed");
        assert_eq!(config.ingestion.page_size, 50);
        assert_eq!(config.ingestion.max_signatures, 5000);
        assert_eq!(config.ingestion.detail_max_retries, 3);
        assert_eq!(config.classifier.dust_threshold_lamports, 5000);
        assert_eq!(config.cache.ttl(), Duration::from_secs(24 * 60 * 60));
        assert_eq!(config.ledger.shortfall_policy, ShortfallPolicy::ZeroGain);
        assert_eq!(config.ledger.holding_period_policy, HoldingPeriodPolicy::EarliestLot);
        assert_eq!(config.ledger.long_term_threshold_days, 365);
        assert!(config.persistence.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml_str = r#"
            [ingestion]
            page_size = 25
            max_concurrent_details = 40

            [ledger]
            shortfall_policy = "reject"
            holding_period_policy = "split_per_lot"

            [wallets]
            own_wallets = ["A", "B"]
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.ingestion.page_size, 25);
        assert_eq!(config.ingestion.max_signatures, 5000);
        assert_eq!(config.ingestion.fan_out(), MAX_DETAIL_FAN_OUT);
        assert_eq!(config.ledger.shortfall_policy, ShortfallPolicy::Reject);
        assert_eq!(config.ledger.holding_period_policy, HoldingPeriodPolicy::SplitPerLot);
        assert_eq!(config.wallets.own_wallets, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(config.rpc, RpcConfig::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.rpc.fallback_url = "https://fallback.example".to_string();
        config.ledger.long_term_rate = 0.15;
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.ingestion.page_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { .. })
        ));

        let mut config = Config::default();
        config.ledger.short_term_rate = 1.5;
        assert!(config.validate().is_err());
    }
}
