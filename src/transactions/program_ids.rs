/// Program ids the classifier recognises

// =============================================================================
// SYSTEM PROGRAMS
// =============================================================================

pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const TOKEN_2022_PROGRAM_ID: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";
pub const COMPUTE_BUDGET_PROGRAM_ID: &str = "ComputeBudget111111111111111111111111111111";

// =============================================================================
// DEX PROGRAM IDS
// =============================================================================

pub const JUPITER_V6_PROGRAM_ID: &str = "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4";
pub const JUPITER_V4_PROGRAM_ID: &str = "JUP4Fb2cqiRUcaTHdrPC8h2gNsA2ETXiPDD33WcGuJB";
pub const RAYDIUM_LEGACY_AMM_PROGRAM_ID: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
pub const RAYDIUM_CPMM_PROGRAM_ID: &str = "CPMMoo8L3F4NbTegBCKVNunggL7H1ZpdTHKxQB5qKP1C";
pub const RAYDIUM_CLMM_PROGRAM_ID: &str = "CAMMCzo5YL8w4VFF8KVHrK22GGUsp5VTaW7grrKgrWqK";
pub const ORCA_WHIRLPOOL_PROGRAM_ID: &str = "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc";
pub const METEORA_DLMM_PROGRAM_ID: &str = "LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo";
pub const METEORA_DAMM_PROGRAM_ID: &str = "cpamdpZCGKUy5JxQXB4dcpGPiikHawvSWAd6mEn1sGG";
pub const PUMP_FUN_PROGRAM_ID: &str = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P";
pub const PUMP_FUN_AMM_PROGRAM_ID: &str = "pAMMBay6oceH9fJKBRHGP5D4bD4sWpmSwMn52FMfXEA";

// =============================================================================
// DERIVATIVE PROGRAM IDS
// =============================================================================

pub const JUPITER_PERPS_PROGRAM_ID: &str = "PERPHjGBqRHArX4DySjwM6UJHiR3sWAatqfdBS2qQJu";
pub const DRIFT_V2_PROGRAM_ID: &str = "dRiftyHA39MWEi3m9aunc5MzRF1JYuBsbn6VPcn33UH";
pub const MANGO_V4_PROGRAM_ID: &str = "4MangoMjqJ2firMokCjjGgoK8d4MXcrgL7XJaL3w6fVg";
pub const ZETA_PROGRAM_ID: &str = "ZETAxsqBRek56DhiGXrn75yj2NHU3aYUnxvHXpkf3aD";

/// Venue name for a DEX program
pub fn detect_dex(program_id: &str) -> Option<&'static str> {
    match program_id {
        JUPITER_V6_PROGRAM_ID | JUPITER_V4_PROGRAM_ID => Some("jupiter"),
        RAYDIUM_LEGACY_AMM_PROGRAM_ID | RAYDIUM_CPMM_PROGRAM_ID | RAYDIUM_CLMM_PROGRAM_ID => {
            Some("raydium")
        }
        ORCA_WHIRLPOOL_PROGRAM_ID => Some("orca"),
        METEORA_DLMM_PROGRAM_ID | METEORA_DAMM_PROGRAM_ID => Some("meteora"),
        PUMP_FUN_PROGRAM_ID | PUMP_FUN_AMM_PROGRAM_ID => Some("pumpfun"),
        _ => None,
    }
}

/// Venue name for a perpetuals/margin program
pub fn detect_derivative_venue(program_id: &str) -> Option<&'static str> {
    match program_id {
        JUPITER_PERPS_PROGRAM_ID => Some("jupiter_perps"),
        DRIFT_V2_PROGRAM_ID => Some("drift"),
        MANGO_V4_PROGRAM_ID => Some("mango"),
        ZETA_PROGRAM_ID => Some("zeta"),
        _ => None,
    }
}

pub fn is_dex_program(program_id: &str) -> bool {
    detect_dex(program_id).is_some()
}

pub fn is_derivative_program(program_id: &str) -> bool {
    detect_derivative_venue(program_id).is_some()
}
