/// Centralized command-line argument handling
///
/// Debug flags follow the `--debug-<module>` convention and are read by the
/// logger at startup. Value flags (`--wallet`, `--own`, ...) may repeat.
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
/// Tests and embedding binaries override it through `set_cmd_args`
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Returns a copy to avoid holding the mutex
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Value following the first occurrence of `flag`
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .filter(|v| !v.starts_with("--"))
        .cloned()
}

/// Every value following `flag`, also splitting comma-separated lists
pub fn get_arg_values(flag: &str) -> Vec<String> {
    let args = get_cmd_args();
    let mut values = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        if arg != flag {
            continue;
        }
        if let Some(value) = args.get(i + 1).filter(|v| !v.starts_with("--")) {
            values.extend(
                value
                    .split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string()),
            );
        }
    }
    values
}

/// All `--<prefix><name>` flags, returning the `<name>` parts
pub fn get_prefixed_flags(prefix: &str) -> Vec<String> {
    get_cmd_args()
        .iter()
        .filter_map(|a| a.strip_prefix(prefix))
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .collect()
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

pub fn is_debug_rpc_enabled() -> bool {
    has_arg("--debug-rpc")
}

pub fn is_debug_ingest_enabled() -> bool {
    has_arg("--debug-ingest")
}

pub fn is_debug_classify_enabled() -> bool {
    has_arg("--debug-classify")
}

pub fn is_debug_ledger_enabled() -> bool {
    has_arg("--debug-ledger")
}

pub fn is_verbose_enabled() -> bool {
    has_arg("--verbose")
}

pub fn is_quiet_enabled() -> bool {
    has_arg("--quiet")
}

// =============================================================================
// BINARY PATTERNS
// =============================================================================

pub mod patterns {
    use super::has_arg;

    pub fn is_help_requested() -> bool {
        has_arg("--help") || has_arg("-h")
    }

    pub fn is_refresh_requested() -> bool {
        has_arg("--refresh")
    }

    pub fn is_dry_run() -> bool {
        has_arg("--no-persist")
    }
}

pub fn print_help() {
    println!("walletledger - wallet transaction ingestion and FIFO cost-basis ledger");
    println!();
    println!("USAGE:");
    println!("    walletledger --wallet <ADDRESS> [--wallet <ADDRESS>...] [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --wallet <ADDRESS>     Wallet to ingest (repeatable or comma-separated)");
    println!("    --own <ADDRESS>        Additional wallet owned by the same user");
    println!("    --config <PATH>        Configuration file (default: data/config.toml)");
    println!("    --prices <PATH>        CSV price table: asset,timestamp,usd_price");
    println!("    --refresh              Ignore cached transaction history");
    println!("    --no-persist           Skip the persistence sink");
    println!("    --debug-<module>       Debug logs for rpc, backoff, ingest, classify, cache, queue, ledger, persistence");
    println!("    --verbose              Verbose logs for every module");
    println!("    --quiet                Only warnings and errors");
    println!("    -h, --help             Print this help");
}
