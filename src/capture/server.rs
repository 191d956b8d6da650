use crate::capture::console::{self, CapturingConsole, ConsoleSink};
use crate::error::{DevLogsError, Result};
use crate::logs::{Arg, LogRecord, LogStore, RecordType, Source};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::PanicHookInfo;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set while a [`ServerCapture`] is active
static INSTALLED: AtomicBool = AtomicBool::new(false);

type PanicHook = dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static;

/// Which server-side hooks to install
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Wrap the process console
    pub console: bool,
    /// Record panics as unhandled failures
    pub panics: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            console: true,
            panics: true,
        }
    }
}

/// A build or transform failure as reported by the build tool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildError {
    pub message: String,
    pub stack: Option<String>,
    /// Module id the failure happened in
    pub id: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub plugin: Option<String>,
    /// Code frame around the failure
    pub frame: Option<String>,
}

/// The build tool's error logger
pub trait ErrorReporter {
    fn error(&self, message: &str, error: Option<&BuildError>);
}

/// Source-maps stack traces of request errors; supplied by the host
pub trait StackMapper: Send + Sync {
    fn map_stack(&self, stack: &str) -> String;
}

/// Leaves stacks untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityStackMapper;

impl StackMapper for IdentityStackMapper {
    fn map_stack(&self, stack: &str) -> String {
        stack.to_string()
    }
}

/// Server-side capture, installed once per process
///
/// Holds what is needed to undo the installation. Dropping the guard
/// restores the original console and panic hook.
pub struct ServerCapture {
    store: Arc<LogStore>,
    previous_console: Option<Arc<dyn ConsoleSink>>,
    previous_hook: Option<Arc<PanicHook>>,
    active: bool,
}

impl ServerCapture {
    /// Install console and panic capture writing into `store`
    pub fn install(store: Arc<LogStore>) -> Result<Self> {
        Self::install_with(store, CaptureOptions::default())
    }

    pub fn install_with(store: Arc<LogStore>, options: CaptureOptions) -> Result<Self> {
        if INSTALLED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DevLogsError::AlreadyInstalled);
        }

        let previous_console = options.console.then(|| {
            let store = Arc::clone(&store);
            console::intercept(move |inner| -> Arc<dyn ConsoleSink> {
                Arc::new(CapturingConsole::new(inner, store))
            })
        });

        let previous_hook = options.panics.then(|| {
            let previous: Arc<PanicHook> = Arc::from(std::panic::take_hook());
            let chained = Arc::clone(&previous);
            let hook_store = Arc::clone(&store);
            std::panic::set_hook(Box::new(move |info| {
                hook_store.write(Source::Server, panic_record(info));
                chained(info);
            }));
            previous
        });

        tracing::debug!(
            "Server capture installed (console: {}, panics: {})",
            options.console,
            options.panics
        );

        Ok(Self {
            store,
            previous_console,
            previous_hook,
            active: true,
        })
    }

    /// Whether a capture is currently installed in this process
    pub fn is_installed() -> bool {
        INSTALLED.load(Ordering::SeqCst)
    }

    pub fn store(&self) -> &Arc<LogStore> {
        &self.store
    }

    /// Wrap the build tool's error reporter so reported errors are persisted
    pub fn wrap_reporter<R: ErrorReporter>(&self, reporter: R) -> CapturingReporter<R> {
        CapturingReporter::new(reporter, Arc::clone(&self.store))
    }

    /// Middleware recording request-cycle errors
    pub fn request_middleware<M: StackMapper>(&self, mapper: M) -> RequestErrorMiddleware<M> {
        RequestErrorMiddleware::new(Arc::clone(&self.store), mapper)
    }

    /// Put the original console and panic hook back
    pub fn restore(&mut self) {
        if !self.active {
            return;
        }

        if let Some(original) = self.previous_console.take() {
            console::replace(original);
        }

        // Swapping hooks while unwinding would abort the process
        if let Some(previous) = self.previous_hook.take() {
            if !std::thread::panicking() {
                let _ = std::panic::take_hook();
                std::panic::set_hook(Box::new(move |info| previous(info)));
            }
        }

        self.active = false;
        INSTALLED.store(false, Ordering::SeqCst);
        tracing::debug!("Server capture restored");
    }
}

impl Drop for ServerCapture {
    fn drop(&mut self) {
        self.restore();
    }
}

fn panic_record(info: &PanicHookInfo<'_>) -> LogRecord {
    let payload = info
        .payload()
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Box<dyn Any>".to_string());

    let thread = std::thread::current();
    let message = format!(
        "panic in thread '{}': {}",
        thread.name().unwrap_or("<unnamed>"),
        payload
    );

    let mut stack = info
        .location()
        .map(|l| format!("at {}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_default();
    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        stack.push('\n');
        stack.push_str(&backtrace.to_string());
    }

    LogRecord::new(Source::Server, RecordType::UnhandledRejection, message).with_stack(Some(stack))
}

/// Decorator over the build tool's error reporter
pub struct CapturingReporter<R> {
    inner: R,
    store: Arc<LogStore>,
}

impl<R: ErrorReporter> CapturingReporter<R> {
    pub fn new(inner: R, store: Arc<LogStore>) -> Self {
        Self { inner, store }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: ErrorReporter> ErrorReporter for CapturingReporter<R> {
    fn error(&self, message: &str, error: Option<&BuildError>) {
        self.store
            .write(Source::Server, build_error_record(message, error));
        self.inner.error(message, error);
    }
}

fn build_error_record(message: &str, error: Option<&BuildError>) -> LogRecord {
    let Some(error) = error else {
        return LogRecord::new(Source::Server, RecordType::Error, message);
    };

    let mut text = if message.trim().is_empty() {
        error.message.clone()
    } else {
        message.to_string()
    };
    if let Some(ref plugin) = error.plugin {
        text = format!("[plugin {}] {}", plugin, text);
    }
    if let Some(ref id) = error.id {
        match (error.line, error.column) {
            (Some(line), Some(column)) => text.push_str(&format!("\n  in {}:{}:{}", id, line, column)),
            _ => text.push_str(&format!("\n  in {}", id)),
        }
    }

    LogRecord::new(Source::Server, RecordType::Error, text)
        .with_stack(error.stack.clone().or_else(|| error.frame.clone()))
}

/// Records request-handling errors and hands them back unchanged
pub struct RequestErrorMiddleware<M = IdentityStackMapper> {
    store: Arc<LogStore>,
    mapper: M,
}

impl<M: StackMapper> RequestErrorMiddleware<M> {
    pub fn new(store: Arc<LogStore>, mapper: M) -> Self {
        Self { store, mapper }
    }

    /// Persist `err` and return it so normal error handling continues
    pub fn forward<E>(&self, err: E) -> E
    where
        E: std::error::Error + 'static,
    {
        let stack = match Arg::error(&err) {
            Arg::Error {
                stack: Some(stack), ..
            } => Some(self.mapper.map_stack(&stack)),
            _ => None,
        };

        self.store.write(
            Source::Server,
            LogRecord::new(Source::Server, RecordType::Error, err.to_string()).with_stack(stack),
        );
        err
    }
}
