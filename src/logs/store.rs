use crate::error::{DevLogsError, Result};
use crate::logs::reader::{count_lines, read_last_records};
use crate::logs::writer::{append_record, truncate_log, DEFAULT_KEEP_LINES, DEFAULT_MAX_LOG_SIZE};
use crate::logs::{LogRecord, Source};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

/// Rotation settings for a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Size in bytes above which a file is rotated before the next append
    pub max_file_size: u64,
    /// Number of trailing lines kept by a rotation
    pub keep_lines: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_LOG_SIZE,
            keep_lines: DEFAULT_KEEP_LINES,
        }
    }
}

/// Size information about one store file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub source: Source,
    pub path: PathBuf,
    pub exists: bool,
    pub size: u64,
    pub lines: usize,
}

/// Append-only JSON-lines storage for both capture sources
///
/// One directory holds `browser.log` and `server.log`, rotated independently.
/// The write and read paths never return errors; failures are logged and
/// degrade to "nothing captured" or "nothing found".
#[derive(Debug)]
pub struct LogStore {
    /// Directory where both log files are stored
    log_dir: PathBuf,
    options: StoreOptions,
}

impl LogStore {
    /// Open a store with default rotation settings
    pub fn open<P: AsRef<Path>>(log_dir: P) -> Result<Self> {
        Self::with_options(log_dir, StoreOptions::default())
    }

    /// Open a store, creating the directory and its `.gitignore` entry if needed
    ///
    /// # Arguments
    /// * `log_dir` - Directory that holds `browser.log` and `server.log`
    /// * `options` - Rotation threshold and number of lines kept
    ///
    /// # Returns
    /// * `Ok(LogStore)` - Store ready for writes and reads
    /// * `Err(DevLogsError)` - The directory could not be created
    pub fn with_options<P: AsRef<Path>>(log_dir: P, options: StoreOptions) -> Result<Self> {
        let log_dir = log_dir.as_ref().to_path_buf();

        fs::create_dir_all(&log_dir).map_err(|e| {
            DevLogsError::LogError(format!(
                "Failed to create log directory {}: {}",
                log_dir.display(),
                e
            ))
        })?;

        if let Err(e) = ensure_gitignore(&log_dir) {
            tracing::warn!("Could not update .gitignore for {}: {}", log_dir.display(), e);
        }

        Ok(Self { log_dir, options })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Path of the file backing `source`
    pub fn path(&self, source: Source) -> PathBuf {
        self.log_dir.join(source.file_name())
    }

    /// Append a record to the file for `source`
    ///
    /// The record's `source` is overwritten with `source`. Failures are
    /// logged and dropped; capturing must never fail the caller.
    ///
    /// # Arguments
    /// * `source` - File the record goes to
    /// * `record` - Record to append
    pub fn write(&self, source: Source, mut record: LogRecord) {
        record.source = source;
        let path = self.path(source);

        if let Err(e) = append_record(
            &path,
            &record,
            self.options.max_file_size,
            self.options.keep_lines,
        ) {
            tracing::warn!("Dropped {} log record: {}", source, e);
        }
    }

    /// Most recent `count` records for `source`, newest first; empty on any failure
    pub fn read(&self, source: Source, count: usize) -> Vec<LogRecord> {
        self.try_read(source, count).unwrap_or_else(|e| {
            tracing::warn!("Failed to read {} logs: {}", source, e);
            Vec::new()
        })
    }

    /// Like [`LogStore::read`] but reports I/O failures
    pub fn try_read(&self, source: Source, count: usize) -> Result<Vec<LogRecord>> {
        read_last_records(&self.path(source), count)
    }

    /// Truncate the file for `source`
    pub fn clear(&self, source: Source) -> Result<()> {
        truncate_log(&self.path(source))
    }

    pub fn stats(&self, source: Source) -> Result<StoreStats> {
        let path = self.path(source);
        let (exists, size) = match fs::metadata(&path) {
            Ok(meta) => (true, meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (false, 0),
            Err(e) => return Err(DevLogsError::Io(e)),
        };
        let lines = count_lines(&path)?;

        Ok(StoreStats {
            source,
            path,
            exists,
            size,
            lines,
        })
    }
}

/// Make sure the parent directory's `.gitignore` lists the storage directory
pub fn ensure_gitignore(log_dir: &Path) -> Result<()> {
    let name = match log_dir.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return Ok(()),
    };
    let parent = match log_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let gitignore = parent.join(".gitignore");

    let existing = match fs::read_to_string(&gitignore) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(DevLogsError::Io(e)),
    };

    let already_listed = existing.lines().any(|line| {
        let entry = line.trim().trim_start_matches('/').trim_end_matches('/');
        entry == name
    });
    if already_listed {
        return Ok(());
    }

    let mut file = OpenOptions::new().create(true).append(true).open(&gitignore)?;
    if !existing.is_empty() && !existing.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    writeln!(file, "{}/", name)?;

    tracing::debug!("Added {}/ to {}", name, gitignore.display());
    Ok(())
}

/// Cache of the store for one resolved directory
///
/// Asking for a different directory replaces the cached store.
#[derive(Debug, Default)]
pub struct StoreCache {
    current: Mutex<Option<(PathBuf, Arc<LogStore>)>>,
}

impl StoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache instance
    pub fn global() -> &'static StoreCache {
        static GLOBAL: OnceLock<StoreCache> = OnceLock::new();
        GLOBAL.get_or_init(StoreCache::new)
    }

    /// Return the cached store for `log_dir`, opening (and replacing) it if needed
    pub fn get_or_open<P: AsRef<Path>>(
        &self,
        log_dir: P,
        options: StoreOptions,
    ) -> Result<Arc<LogStore>> {
        let key = resolve_dir(log_dir.as_ref())?;
        let mut current = self
            .current
            .lock()
            .map_err(|_| DevLogsError::Other("store cache lock poisoned".to_string()))?;

        if let Some((path, store)) = current.as_ref() {
            if *path == key && store.options() == options {
                return Ok(Arc::clone(store));
            }
            tracing::debug!("Replacing cached log store {}", path.display());
        }

        let store = Arc::new(LogStore::with_options(&key, options)?);
        *current = Some((key, Arc::clone(&store)));
        Ok(store)
    }

    /// Drop the cached store
    pub fn invalidate(&self) {
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
    }

    /// Directory of the cached store, if any
    pub fn cached_dir(&self) -> Option<PathBuf> {
        self.current
            .lock()
            .ok()
            .and_then(|current| current.as_ref().map(|(path, _)| path.clone()))
    }
}

fn resolve_dir(log_dir: &Path) -> Result<PathBuf> {
    if log_dir.is_absolute() {
        Ok(log_dir.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(log_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::{Arg, Level, RecordType};
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("nested").join(".devlogs");

        let store = LogStore::open(&log_dir).unwrap();
        assert!(log_dir.is_dir());
        assert_eq!(store.path(Source::Browser), log_dir.join("browser.log"));
    }

    #[test]
    fn test_write_overrides_source() {
        let temp_dir = TempDir::new().unwrap();
        let store = LogStore::open(temp_dir.path().join("logs")).unwrap();

        store.write(
            Source::Browser,
            LogRecord::new(Source::Server, RecordType::Error, "from the page"),
        );

        assert!(store.read(Source::Server, 10).is_empty());
        let records = store.read(Source::Browser, 10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, Source::Browser);
    }

    #[test]
    fn test_sources_are_independent() {
        let temp_dir = TempDir::new().unwrap();
        let store = LogStore::open(temp_dir.path().join("logs")).unwrap();

        store.write(Source::Server, LogRecord::console(Source::Server, Level::Info, &[Arg::text("a")]));
        store.write(Source::Browser, LogRecord::console(Source::Browser, Level::Info, &[Arg::text("b")]));
        store.clear(Source::Server).unwrap();

        assert!(store.read(Source::Server, 10).is_empty());
        assert_eq!(store.read(Source::Browser, 10).len(), 1);
    }

    #[test]
    fn test_gitignore_created_once() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join(".devlogs");

        LogStore::open(&log_dir).unwrap();
        LogStore::open(&log_dir).unwrap();

        let content = fs::read_to_string(temp_dir.path().join(".gitignore")).unwrap();
        assert_eq!(content, ".devlogs/\n");
    }

    #[test]
    fn test_gitignore_appended_and_respected() {
        let temp_dir = TempDir::new().unwrap();
        let gitignore = temp_dir.path().join(".gitignore");

        fs::write(&gitignore, "target").unwrap();
        ensure_gitignore(&temp_dir.path().join("logs")).unwrap();
        assert_eq!(fs::read_to_string(&gitignore).unwrap(), "target\nlogs/\n");

        fs::write(&gitignore, "/logs\n").unwrap();
        ensure_gitignore(&temp_dir.path().join("logs")).unwrap();
        assert_eq!(fs::read_to_string(&gitignore).unwrap(), "/logs\n");
    }

    #[test]
    fn test_stats() {
        let temp_dir = TempDir::new().unwrap();
        let store = LogStore::open(temp_dir.path().join("logs")).unwrap();

        let before = store.stats(Source::Server).unwrap();
        assert!(!before.exists);
        assert_eq!(before.lines, 0);

        store.write(Source::Server, LogRecord::new(Source::Server, RecordType::Error, "x"));
        let after = store.stats(Source::Server).unwrap();
        assert!(after.exists);
        assert_eq!(after.lines, 1);
        assert!(after.size > 0);
    }

    #[test]
    fn test_cache_reuses_and_replaces() {
        let temp_dir = TempDir::new().unwrap();
        let cache = StoreCache::new();
        let first_dir = temp_dir.path().join("one");
        let second_dir = temp_dir.path().join("two");

        let a = cache.get_or_open(&first_dir, StoreOptions::default()).unwrap();
        let b = cache.get_or_open(&first_dir, StoreOptions::default()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let c = cache.get_or_open(&second_dir, StoreOptions::default()).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.cached_dir(), Some(second_dir));

        cache.invalidate();
        assert_eq!(cache.cached_dir(), None);
    }
}
