/// Global constants used across walletledger
///
/// System-wide values that are not configurable. Tunables live in
/// `config::schemas` instead.

// ============================================================================
// SOLANA BLOCKCHAIN CONSTANTS
// ============================================================================

/// SOL token mint address (wrapped SOL / WSOL)
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// Asset key used by the ledger for the chain's native asset
pub const NATIVE_ASSET: &str = "SOL";

/// Number of decimal places for SOL
pub const SOL_DECIMALS: u8 = 9;

/// Lamports per SOL (10^9)
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Decoded length of a wallet address (ed25519 public key)
pub const PUBKEY_BYTES: usize = 32;

/// Decoded length of a transaction signature
pub const SIGNATURE_BYTES: usize = 64;

// ============================================================================
// CLASSIFICATION DEFAULTS
// ============================================================================

/// Balance changes at or below this magnitude are fee noise
pub const DEFAULT_DUST_THRESHOLD_LAMPORTS: u64 = 5_000;

// ============================================================================
// LEDGER CONSTANTS
// ============================================================================

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Holding period at or above which a disposal is long-term
pub const DEFAULT_LONG_TERM_DAYS: i64 = 365;

/// Quantities below this are treated as fully consumed
pub const QUANTITY_EPSILON: f64 = 1e-12;
