/// Append-only log file shared by the whole process
use super::config::get_logger_config;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

const LOG_FILE_NAME: &str = "walletledger.log";

static LOG_WRITER: Lazy<Mutex<Option<BufWriter<File>>>> = Lazy::new(|| Mutex::new(None));

/// `./logs`, falling back to the platform data dir when the working dir is read-only
pub fn get_logs_dir() -> PathBuf {
    let local = PathBuf::from("logs");
    if fs::create_dir_all(&local).is_ok() {
        return local;
    }
    dirs::data_local_dir()
        .map(|dir| dir.join("walletledger").join("logs"))
        .unwrap_or(local)
}

pub fn init_file_logging() {
    if !get_logger_config().file_logging {
        return;
    }

    let dir = get_logs_dir();
    if let Err(e) = fs::create_dir_all(&dir) {
        eprintln!("⚠️  Failed to create log directory {}: {}", dir.display(), e);
        return;
    }

    let path = dir.join(LOG_FILE_NAME);
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            *LOG_WRITER.lock() = Some(BufWriter::new(file));
        }
        Err(e) => {
            eprintln!("⚠️  Failed to open log file {}: {}", path.display(), e);
        }
    }
}

/// Write errors disable file logging instead of failing the caller
pub fn write_to_file(line: &str) {
    let mut guard = LOG_WRITER.lock();
    if let Some(writer) = guard.as_mut() {
        if let Err(e) = writeln!(writer, "{}", line) {
            eprintln!("⚠️  Log file write failed, disabling file logging: {}", e);
            *guard = None;
        }
    }
}

pub fn flush_file_logging() {
    if let Some(writer) = LOG_WRITER.lock().as_mut() {
        let _ = writer.flush();
    }
}
