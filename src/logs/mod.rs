// Logs module - Record model and the rotating JSON-lines store

mod reader;
mod record;
mod store;
mod writer;

pub use reader::{parse_tail, read_last_records};
pub use record::{
    normalize_args, Arg, Level, LogRecord, RecordType, Source, EMPTY_MESSAGE, UNSERIALIZABLE,
};
pub use store::{ensure_gitignore, LogStore, StoreCache, StoreOptions, StoreStats};
pub use writer::{append_record, rotate_log, DEFAULT_KEEP_LINES, DEFAULT_MAX_LOG_SIZE};
