use crate::error::{DevLogsError, Result};
use crate::logs::reader::read_lossy;
use crate::logs::LogRecord;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Default maximum log file size before rotation (5MB)
pub const DEFAULT_MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;

/// Default number of lines kept when a file is rotated
pub const DEFAULT_KEEP_LINES: usize = 1000;

/// Append one record as a JSON line, rotating the file first if it is too large
///
/// Rotation failures are logged and otherwise ignored so that the file
/// simply keeps growing; only the append itself can fail.
///
/// # Arguments
/// * `file_path` - Log file to append to (created if missing)
/// * `record` - Record to serialize as one line
/// * `max_size` - Size in bytes above which the file is rotated first
/// * `keep_lines` - Lines kept by a rotation
///
/// # Returns
/// * `Ok(())` - The line was appended
/// * `Err(DevLogsError)` - Serialization or the append failed
pub fn append_record(
    file_path: &Path,
    record: &LogRecord,
    max_size: u64,
    keep_lines: usize,
) -> Result<()> {
    let line = serde_json::to_string(record).map_err(|e| {
        DevLogsError::SerializationError(format!("Failed to serialize record: {}", e))
    })?;

    if needs_rotation(file_path, max_size) {
        if let Err(e) = rotate_log(file_path, keep_lines) {
            tracing::warn!("{}", e);
        }
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)
        .map_err(|e| DevLogsError::LogFileError(format!("Failed to open log file: {}", e)))?;

    // Single write so a crash leaves at most one partial trailing line
    let mut entry = Vec::with_capacity(line.len() + 1);
    entry.extend_from_slice(line.as_bytes());
    entry.push(b'\n');

    file.write_all(&entry)
        .map_err(|e| DevLogsError::LogError(format!("Failed to write to log: {}", e)))?;

    Ok(())
}

fn needs_rotation(file_path: &Path, max_size: u64) -> bool {
    fs::metadata(file_path)
        .map(|m| m.len() > max_size)
        .unwrap_or(false)
}

/// Rotate a log file in place by keeping only its last `keep_lines` lines
///
/// # Arguments
/// * `file_path` - Log file to rotate
/// * `keep_lines` - Number of trailing non-empty lines to keep
///
/// # Returns
/// * `Ok(())` - The file was rewritten with its tail
/// * `Err(DevLogsError::LogRotationError)` - The file could not be read or rewritten
pub fn rotate_log(file_path: &Path, keep_lines: usize) -> Result<()> {
    let content = read_lossy(file_path).map_err(|e| {
        DevLogsError::LogRotationError(format!(
            "Failed to read {} for rotation: {}",
            file_path.display(),
            e
        ))
    })?;

    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(keep_lines);

    let mut kept = lines[start..].join("\n");
    if !kept.is_empty() {
        kept.push('\n');
    }

    fs::write(file_path, kept).map_err(|e| {
        DevLogsError::LogRotationError(format!(
            "Failed to rewrite {} during rotation: {}",
            file_path.display(),
            e
        ))
    })?;

    tracing::debug!(
        "Rotated {} down to {} lines",
        file_path.display(),
        lines.len() - start
    );

    Ok(())
}

/// Truncate a log file to empty, creating it if needed
pub fn truncate_log(file_path: &Path) -> Result<()> {
    fs::write(file_path, b"")
        .map_err(|e| DevLogsError::LogFileError(format!("Failed to clear log file: {}", e)))
}
