/// Derivative-position detection from program ids and log lines
///
/// Pure: takes the log lines and invoked programs, returns a structured event
/// or None. Fields that cannot be extracted stay neutral/zero.
use super::program_ids::{detect_derivative_venue, is_dex_program};
use super::types::{DerivativeEvent, DerivativeKind, PositionDirection};
use crate::logger::{self, LogTag};
use once_cell::sync::Lazy;
use regex::Regex;

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            logger::error(LogTag::Classify, &format!("Invalid pattern {}: {}", pattern, e));
            None
        }
    }
}

/// Checked in order; liquidation wins over the position verbs it usually accompanies
static KIND_PATTERNS: Lazy<Vec<(DerivativeKind, Regex)>> = Lazy::new(|| {
    [
        (DerivativeKind::Liquidation, r"(?i)\bliquidat(e|ed|ion)"),
        (DerivativeKind::Close, r"(?i)\bclose[_ ]?(perp[_ ]?)?position"),
        (DerivativeKind::Decrease, r"(?i)\bdecrease[_ ]?(perp[_ ]?)?position"),
        (DerivativeKind::Increase, r"(?i)\bincrease[_ ]?(perp[_ ]?)?position"),
        (DerivativeKind::Open, r"(?i)\bopen[_ ]?(perp[_ ]?)?position"),
        (
            DerivativeKind::Margin,
            r"(?i)\b((add|remove|deposit|withdraw)[_ ]?(margin|collateral)|margin[_ ]?(deposit|withdraw))",
        ),
    ]
    .into_iter()
    .filter_map(|(kind, pattern)| compile(pattern).map(|regex| (kind, regex)))
    .collect()
});

static MARKET_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r#"(?i)\bmarket(?:[_ ]?(?:index|name))?\s*[:=]\s*"?([A-Za-z0-9_/\-]+)"#));

static SIZE_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    compile(r"(?i)\b(?:size(?:[_ ]?usd)?|base[_ ]?asset[_ ]?amount)\s*[:=]\s*(-?\d+(?:\.\d+)?)")
});

static SIDE_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r"(?i)\b(?:side|direction)\s*[:=]\s*(long|short|buy|sell)\b"));

static BARE_SIDE_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| compile(r"(?i)\b(long|short)\b"));

static PNL_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r"(?i)\b(?:realized[_ ]?)?pnl\s*[:=]\s*(-?\d+(?:\.\d+)?)"));

pub fn detect_kind(logs: &[String]) -> Option<DerivativeKind> {
    KIND_PATTERNS
        .iter()
        .find(|(_, regex)| logs.iter().any(|line| regex.is_match(line)))
        .map(|(kind, _)| *kind)
}

fn first_capture(pattern: &Lazy<Option<Regex>>, logs: &[String]) -> Option<String> {
    let regex = Lazy::force(pattern).as_ref()?;
    logs.iter()
        .find_map(|line| regex.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn parse_direction(logs: &[String]) -> PositionDirection {
    let side = first_capture(&SIDE_PATTERN, logs).or_else(|| first_capture(&BARE_SIDE_PATTERN, logs));
    match side.map(|s| s.to_lowercase()).as_deref() {
        Some("long") | Some("buy") => PositionDirection::Long,
        Some("short") | Some("sell") => PositionDirection::Short,
        _ => PositionDirection::Neutral,
    }
}

/// A derivative program with no recognisable action yields kind `Other`.
/// Keywords alone count only when no spot DEX was invoked, since AMM
/// liquidity positions use the same verbs.
pub fn parse_derivative_event(logs: &[String], invoked_programs: &[&str]) -> Option<DerivativeEvent> {
    let venue = invoked_programs
        .iter()
        .find_map(|program| detect_derivative_venue(program));
    let kind = detect_kind(logs);

    let kind = match (venue, kind) {
        (Some(_), kind) => kind.unwrap_or(DerivativeKind::Other),
        (None, Some(kind)) if !invoked_programs.iter().any(|p| is_dex_program(p)) => kind,
        _ => return None,
    };

    Some(DerivativeEvent {
        kind,
        venue: venue.map(String::from),
        market: first_capture(&MARKET_PATTERN, logs),
        size: first_capture(&SIZE_PATTERN, logs)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0),
        direction: parse_direction(logs),
        pnl: first_capture(&PNL_PATTERN, logs)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0),
    })
}
