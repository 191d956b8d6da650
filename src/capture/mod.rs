// Capture module - Entry injection, browser payload and server-side collectors

pub mod console;
pub mod injector;
pub mod payload;
pub mod server;

pub use console::{CapturingConsole, ConsoleSink, StdConsole};
pub use injector::{EntryMatcher, Injector, RESOLVED_VIRTUAL_MODULE_ID, VIRTUAL_MODULE_ID};
pub use server::{
    BuildError, CaptureOptions, CapturingReporter, ErrorReporter, IdentityStackMapper,
    RequestErrorMiddleware, ServerCapture, StackMapper,
};

/// Serializes tests that touch the process console or panic hook
#[cfg(test)]
pub(crate) static GLOBAL_STATE_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
