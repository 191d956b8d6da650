use crate::logs::{normalize_args, Arg, Level, LogRecord, LogStore, Source};
use std::sync::{Arc, OnceLock, RwLock};

/// Destination of console calls made by host code
pub trait ConsoleSink: Send + Sync {
    fn write(&self, level: Level, args: &[Arg]);
}

/// Plain console: info-ish levels to stdout, warnings and errors to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl ConsoleSink for StdConsole {
    fn write(&self, level: Level, args: &[Arg]) {
        let (message, _) = normalize_args(args);
        match level {
            Level::Warn | Level::Error => eprintln!("{}", message),
            Level::Log | Level::Info | Level::Debug => println!("{}", message),
        }
    }
}

/// Decorator that persists every call before delegating to the wrapped sink
pub struct CapturingConsole {
    inner: Arc<dyn ConsoleSink>,
    store: Arc<LogStore>,
}

impl CapturingConsole {
    pub fn new(inner: Arc<dyn ConsoleSink>, store: Arc<LogStore>) -> Self {
        Self { inner, store }
    }
}

impl ConsoleSink for CapturingConsole {
    fn write(&self, level: Level, args: &[Arg]) {
        self.store
            .write(Source::Server, LogRecord::console(Source::Server, level, args));
        self.inner.write(level, args);
    }
}

fn slot() -> &'static RwLock<Arc<dyn ConsoleSink>> {
    static SLOT: OnceLock<RwLock<Arc<dyn ConsoleSink>>> = OnceLock::new();
    SLOT.get_or_init(|| RwLock::new(Arc::new(StdConsole)))
}

/// The sink console calls currently go to
pub fn current() -> Arc<dyn ConsoleSink> {
    match slot().read() {
        Ok(sink) => Arc::clone(&*sink),
        Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
    }
}

/// Install `sink` and return the one it replaced
pub fn replace(sink: Arc<dyn ConsoleSink>) -> Arc<dyn ConsoleSink> {
    let mut guard = match slot().write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    std::mem::replace(&mut *guard, sink)
}

/// Wrap the current sink under a single write lock; returns the wrapped original
pub fn intercept<F>(wrap: F) -> Arc<dyn ConsoleSink>
where
    F: FnOnce(Arc<dyn ConsoleSink>) -> Arc<dyn ConsoleSink>,
{
    let mut guard = match slot().write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let original = Arc::clone(&*guard);
    *guard = wrap(Arc::clone(&original));
    original
}

pub fn emit(level: Level, args: &[Arg]) {
    current().write(level, args);
}

pub fn log(args: &[Arg]) {
    emit(Level::Log, args);
}

pub fn info(args: &[Arg]) {
    emit(Level::Info, args);
}

pub fn warn(args: &[Arg]) {
    emit(Level::Warn, args);
}

pub fn error(args: &[Arg]) {
    emit(Level::Error, args);
}

pub fn debug(args: &[Arg]) {
    emit(Level::Debug, args);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::GLOBAL_STATE_LOCK;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recording(Mutex<Vec<(Level, String)>>);

    impl ConsoleSink for Recording {
        fn write(&self, level: Level, args: &[Arg]) {
            let (message, _) = normalize_args(args);
            self.0.lock().unwrap().push((level, message));
        }
    }

    #[test]
    fn test_capturing_console_persists_then_delegates() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(LogStore::open(temp_dir.path().join("logs")).unwrap());
        let recording = Arc::new(Recording::default());

        let console = CapturingConsole::new(recording.clone(), store.clone());
        console.write(Level::Info, &[Arg::text("ready on"), Arg::json(&5173)]);

        let records = store.read(Source::Server, 10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "ready on 5173");
        assert_eq!(records[0].level, Some(Level::Info));

        let seen = recording.0.lock().unwrap();
        assert_eq!(seen.as_slice(), &[(Level::Info, "ready on 5173".to_string())]);
    }

    #[test]
    fn test_replace_and_intercept_return_original() {
        let _guard = GLOBAL_STATE_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let recording = Arc::new(Recording::default());

        let original = replace(recording.clone());
        debug(&[Arg::text("one")]);
        error(&[Arg::text("two")]);

        let wrapped = intercept(|inner| inner);
        assert!(Arc::ptr_eq(&wrapped, &current()));

        replace(original);
        log(&[Arg::text("not recorded")]);

        let seen = recording.0.lock().unwrap();
        assert_eq!(
            seen.as_slice(),
            &[(Level::Debug, "one".to_string()), (Level::Error, "two".to_string())]
        );
    }
}
