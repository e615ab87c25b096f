//! Console and file line formatting
//!
//! Console: `HH:MM:SS [TAG] [LEVEL] message` with colors.
//! File: `YYYY-MM-DD HH:MM:SS [TAG] [LEVEL] message`, one line per message line.

use super::file::write_to_file;
use super::levels::LogLevel;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

const TAG_WIDTH: usize = 9;
const LEVEL_WIDTH: usize = 7;

pub fn format_and_log(tag: &LogTag, level: LogLevel, message: &str) {
    let now = Local::now();
    let time = now.format("%H:%M:%S").to_string().dimmed();
    let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let tag_label = tag.colored_label(TAG_WIDTH);
    let level_label = format_level(level);
    let tag_plain = tag.to_plain_string();

    let continuation = " ".repeat(8 + 1 + TAG_WIDTH + 3 + LEVEL_WIDTH + 3);

    for (idx, line) in message.split('\n').enumerate() {
        if idx == 0 {
            print_stdout_safe(&format!("{} [{}] [{}] {}", time, tag_label, level_label, line));
        } else {
            print_stdout_safe(&format!("{}{}", continuation, line));
        }
        write_to_file(&format!("{} [{}] [{}] {}", timestamp, tag_plain, level, line));
    }
}

fn format_level(level: LogLevel) -> ColoredString {
    let padded = format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH);
    match level {
        LogLevel::Error => padded.bright_red().bold(),
        LogLevel::Warning => padded.yellow().bold(),
        LogLevel::Info => padded.white().bold(),
        LogLevel::Debug => padded.purple(),
        LogLevel::Verbose => padded.dimmed(),
    }
}

/// Piped output (e.g. `| head`) closes stdout early; exit quietly then
fn print_stdout_safe(line: &str) {
    let mut out = stdout();
    if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        let _ = writeln!(std::io::stderr(), "Logger stdout error: {}", e);
    }
}
