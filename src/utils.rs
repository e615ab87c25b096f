/// Shared helpers: address/signature validation, unit conversion and
/// short display formatting for log lines.
use crate::constants::{LAMPORTS_PER_SOL, PUBKEY_BYTES, SIGNATURE_BYTES};
use crate::errors::ValidationError;
use chrono::{DateTime, TimeZone, Utc};

// =============================================================================
// VALIDATION
// =============================================================================

/// Validate a base58 wallet address (32 decoded bytes)
///
/// Runs before any network call so malformed input never reaches the provider.
/// Returns the trimmed address that passed.
pub fn validate_wallet_address(address: &str) -> Result<&str, ValidationError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidWalletAddress {
            address: address.to_string(),
            reason: "address is empty".to_string(),
        });
    }

    match bs58::decode(trimmed).into_vec() {
        Ok(bytes) if bytes.len() == PUBKEY_BYTES => Ok(trimmed),
        Ok(bytes) => Err(ValidationError::InvalidWalletAddress {
            address: address.to_string(),
            reason: format!("decoded to {} bytes, expected {}", bytes.len(), PUBKEY_BYTES),
        }),
        Err(e) => Err(ValidationError::InvalidWalletAddress {
            address: address.to_string(),
            reason: format!("not base58: {}", e),
        }),
    }
}

/// Check that a signature string decodes to a full 64-byte signature
pub fn is_valid_signature(signature: &str) -> bool {
    matches!(bs58::decode(signature).into_vec(), Ok(bytes) if bytes.len() == SIGNATURE_BYTES)
}

pub fn validate_signature(signature: &str) -> Result<(), ValidationError> {
    if is_valid_signature(signature) {
        Ok(())
    } else {
        Err(ValidationError::InvalidSignature {
            signature: signature.to_string(),
        })
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

pub fn lamports_to_sol(lamports: i64) -> f64 {
    (lamports as f64) / (LAMPORTS_PER_SOL as f64)
}

pub fn sol_to_lamports(sol_amount: f64) -> i64 {
    (sol_amount * (LAMPORTS_PER_SOL as f64)).round() as i64
}

/// Unix seconds to UTC, clamping out-of-range values to the epoch
pub fn timestamp_to_datetime(timestamp: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH)
}

// =============================================================================
// DISPLAY FORMATTING
// =============================================================================

/// `7xKXtg2C...sAsU`
pub fn format_address_short(address: &str) -> String {
    if address.len() <= 12 {
        return address.to_string();
    }
    format!("{}...{}", &address[..8], &address[address.len() - 4..])
}

pub fn format_signature_short(signature: &str) -> String {
    if signature.len() <= 20 {
        return signature.to_string();
    }
    format!("{}...{}", &signature[..12], &signature[signature.len() - 8..])
}

pub fn format_usd(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

    #[test]
    fn test_validate_wallet_address() {
        assert!(validate_wallet_address(WALLET).is_ok());
        assert!(validate_wallet_address("").is_err());
        assert!(validate_wallet_address("not-base58-0OIl").is_err());
        // Valid base58 but wrong length
        assert!(validate_wallet_address("3yZe7d").is_err());
        assert_eq!(validate_wallet_address(&format!(" {}\t", WALLET)).unwrap(), WALLET);
    }

    #[test]
    fn test_signature_validation() {
        let sig = bs58::encode([7u8; 64]).into_string();
        assert!(is_valid_signature(&sig));
        assert!(!is_valid_signature(WALLET));
        assert!(validate_signature("abc").is_err());
    }

    #[test]
    fn test_lamport_conversion() {
        assert_eq!(sol_to_lamports(1.5), 1_500_000_000);
        assert!((lamports_to_sol(-2_500_000_000) + 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_short_formatting() {
        assert_eq!(format_address_short(WALLET), "7xKXtg2C...sAsU");
        assert_eq!(format_usd(-3.5), "-$3.50");
        assert_eq!(format_usd(34.0), "$34.00");
    }
}
