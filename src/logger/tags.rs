/// Log tags identify the subsystem that emitted a line. The debug key of a
/// tag is what `--debug-<key>` matches against.
use colored::{Color, ColoredString, Colorize};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Rpc,
    Backoff,
    Ingest,
    Classify,
    Cache,
    Queue,
    Ledger,
    Persistence,
    Config,
    Test,
    Other(String),
}

impl LogTag {
    /// Key used by `--debug-<key>` / `--verbose-<key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Rpc => "rpc".to_string(),
            LogTag::Backoff => "backoff".to_string(),
            LogTag::Ingest => "ingest".to_string(),
            LogTag::Classify => "classify".to_string(),
            LogTag::Cache => "cache".to_string(),
            LogTag::Queue => "queue".to_string(),
            LogTag::Ledger => "ledger".to_string(),
            LogTag::Persistence => "persistence".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::Test => "test".to_string(),
            LogTag::Other(name) => name.to_lowercase(),
        }
    }

    /// Short uppercase label for console and file lines
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::System => "SYSTEM".to_string(),
            LogTag::Rpc => "RPC".to_string(),
            LogTag::Backoff => "BACKOFF".to_string(),
            LogTag::Ingest => "INGEST".to_string(),
            LogTag::Classify => "CLASSIFY".to_string(),
            LogTag::Cache => "CACHE".to_string(),
            LogTag::Queue => "QUEUE".to_string(),
            LogTag::Ledger => "LEDGER".to_string(),
            LogTag::Persistence => "PERSIST".to_string(),
            LogTag::Config => "CONFIG".to_string(),
            LogTag::Test => "TEST".to_string(),
            LogTag::Other(name) => name.to_uppercase(),
        }
    }

    fn color(&self) -> Color {
        match self {
            LogTag::System => Color::BrightYellow,
            LogTag::Rpc => Color::BrightCyan,
            LogTag::Backoff => Color::BrightRed,
            LogTag::Ingest => Color::BrightBlue,
            LogTag::Classify => Color::BrightMagenta,
            LogTag::Cache => Color::Cyan,
            LogTag::Queue => Color::BrightWhite,
            LogTag::Ledger => Color::BrightGreen,
            LogTag::Persistence => Color::Blue,
            LogTag::Config => Color::Yellow,
            LogTag::Test => Color::White,
            LogTag::Other(_) => Color::White,
        }
    }

    /// Padded, colored label
    pub fn colored_label(&self, width: usize) -> ColoredString {
        format!("{:<width$}", self.to_plain_string(), width = width)
            .color(self.color())
            .bold()
    }
}
