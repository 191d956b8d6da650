use crate::error::{DevLogsError, Result};
use crate::logs::LogRecord;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Read the last `count` records from a log file, newest first
///
/// Empty lines and lines that do not parse as a record (for example a
/// partially written final line) are skipped. Invalid UTF-8 only spoils the
/// line it appears in.
///
/// # Arguments
/// * `file_path` - Path to the JSON-lines log file
/// * `count` - Maximum number of trailing lines to consider
///
/// # Returns
/// * `Ok(Vec<LogRecord>)` - Parsed records, newest first; empty if the file is missing
/// * `Err(DevLogsError)` - The file exists but could not be read
pub fn read_last_records(file_path: &Path, count: usize) -> Result<Vec<LogRecord>> {
    let content = match read_lossy(file_path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(DevLogsError::LogFileError(format!(
                "Failed to read {}: {}",
                file_path.display(),
                e
            )))
        }
    };

    Ok(parse_tail(&content, count))
}

/// Read a whole file as text, replacing invalid UTF-8 sequences
pub(crate) fn read_lossy(file_path: &Path) -> std::io::Result<String> {
    let bytes = fs::read(file_path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Parse the trailing `count` non-empty lines of `content`, newest first
pub fn parse_tail(content: &str, count: usize) -> Vec<LogRecord> {
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(count);

    lines[start..]
        .iter()
        .rev()
        .filter_map(|line| serde_json::from_str::<LogRecord>(line).ok())
        .collect()
}

/// Count the non-empty lines of a log file; missing files count as zero
pub fn count_lines(file_path: &Path) -> Result<usize> {
    match read_lossy(file_path) {
        Ok(content) => Ok(content.lines().filter(|l| !l.trim().is_empty()).count()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(DevLogsError::Io(e)),
    }
}
