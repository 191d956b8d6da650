use crate::error::DevLogsError;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Substituted for any argument whose serialization fails
pub const UNSERIALIZABLE: &str = "[unserializable]";

/// Used when every argument of a call renders to nothing
pub const EMPTY_MESSAGE: &str = "(empty message)";

/// Which collector produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Browser,
    Server,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Browser, Source::Server];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Browser => "browser",
            Source::Server => "server",
        }
    }

    /// Name of the file this source is appended to
    pub fn file_name(&self) -> &'static str {
        match self {
            Source::Browser => "browser.log",
            Source::Server => "server.log",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = DevLogsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "browser" => Ok(Source::Browser),
            "server" => Ok(Source::Server),
            other => Err(DevLogsError::InvalidQuery(format!(
                "unknown source '{}', expected 'browser' or 'server'",
                other
            ))),
        }
    }
}

/// Origin category of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordType {
    Console,
    Error,
    UnhandledRejection,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Console => "console",
            RecordType::Error => "error",
            RecordType::UnhandledRejection => "unhandledRejection",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Console severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl Level {
    pub const ALL: [Level; 5] = [Level::Log, Level::Info, Level::Warn, Level::Error, Level::Debug];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Log => "log",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Debug => "debug",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = DevLogsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DevLogsError::InvalidQuery(format!(
                    "unknown level '{}', expected one of: log, info, warn, error, debug",
                    s
                ))
            })
    }
}

/// A raw argument handed to a collector, before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Plain text, rendered verbatim
    Text(String),
    /// Error-like value; rendered as its stack, falling back to its message
    Error {
        message: String,
        stack: Option<String>,
    },
    /// Structured value; objects and arrays render as indented JSON
    Json(serde_json::Value),
    /// A value whose serialization failed
    Unserializable,
}

impl Arg {
    pub fn text(value: impl Into<String>) -> Self {
        Arg::Text(value.into())
    }

    /// Capture any serializable value; serializer failures become `Unserializable`
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Arg::Json(value),
            Err(_) => Arg::Unserializable,
        }
    }

    /// Capture an error together with its `source()` chain as stack text
    pub fn error(err: &(dyn std::error::Error + 'static)) -> Self {
        let message = err.to_string();
        let mut stack = message.clone();
        let mut has_chain = false;
        let mut source = err.source();
        while let Some(cause) = source {
            stack.push_str("\n    caused by: ");
            stack.push_str(&cause.to_string());
            has_chain = true;
            source = cause.source();
        }

        Arg::Error {
            message,
            stack: has_chain.then_some(stack),
        }
    }

    /// Best-effort string form of the argument; never fails
    pub fn render(&self) -> String {
        match self {
            Arg::Text(text) => text.clone(),
            Arg::Error { message, stack } => match stack {
                Some(stack) if !stack.is_empty() => stack.clone(),
                _ => message.clone(),
            },
            Arg::Json(serde_json::Value::String(s)) => s.clone(),
            Arg::Json(value @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| UNSERIALIZABLE.to_string())
            }
            Arg::Json(value) => value.to_string(),
            Arg::Unserializable => UNSERIALIZABLE.to_string(),
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Text(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Text(value)
    }
}

impl From<serde_json::Value> for Arg {
    fn from(value: serde_json::Value) -> Self {
        Arg::Json(value)
    }
}

/// Render every argument and join them into a message.
///
/// Returns the space-joined message together with the individual rendered
/// arguments. The message is never empty.
pub fn normalize_args(args: &[Arg]) -> (String, Vec<String>) {
    let rendered: Vec<String> = args.iter().map(Arg::render).collect();
    let message = rendered.join(" ");
    (non_empty(message), rendered)
}

fn non_empty(message: String) -> String {
    if message.trim().is_empty() {
        EMPTY_MESSAGE.to_string()
    } else {
        message
    }
}

/// One captured diagnostic event, as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub source: Source,
    #[serde(rename = "type")]
    pub kind: RecordType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl LogRecord {
    /// Create a record stamped with the current time
    pub fn new(source: Source, kind: RecordType, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().trunc_subsecs(3),
            source,
            kind,
            level: None,
            message: non_empty(message.into()),
            args: None,
            stack: None,
            filename: None,
            line: None,
            column: None,
        }
    }

    /// Build a console record from raw call arguments
    pub fn console(source: Source, level: Level, args: &[Arg]) -> Self {
        let (message, rendered) = normalize_args(args);
        let mut record = Self::new(source, RecordType::Console, message);
        record.level = Some(level);
        record.args = Some(rendered);
        record
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_stack(mut self, stack: Option<String>) -> Self {
        self.stack = stack.filter(|s| !s.is_empty());
        self
    }

    pub fn with_location(
        mut self,
        filename: Option<String>,
        line: Option<u32>,
        column: Option<u32>,
    ) -> Self {
        self.filename = filename.filter(|f| !f.is_empty());
        self.line = line;
        self.column = column;
        self
    }

    /// Effective severity; records without a level count as errors
    pub fn effective_level(&self) -> Level {
        self.level.unwrap_or(Level::Error)
    }

    /// Format the record for display
    pub fn format(&self) -> String {
        let label = match (self.kind, self.level) {
            (RecordType::Console, Some(level)) => format!("console.{}", level),
            (kind, _) => kind.to_string(),
        };

        let mut out = format!(
            "[{}] [{}] {}",
            self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            label,
            self.message
        );

        if let Some(ref filename) = self.filename {
            out.push_str(&format!(
                "\n    at {}:{}:{}",
                filename,
                self.line.unwrap_or(0),
                self.column.unwrap_or(0)
            ));
        }

        // Error arguments already carry their stack in the message
        if let Some(ref stack) = self.stack {
            if !self.message.contains(stack.as_str()) {
                for line in stack.lines() {
                    out.push_str("\n    ");
                    out.push_str(line.trim_start());
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serializer;
    use std::collections::HashMap;

    struct Cyclic;

    impl Serialize for Cyclic {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("circular reference"))
        }
    }

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "request failed")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_render_text_and_scalars() {
        assert_eq!(Arg::text("hello").render(), "hello");
        assert_eq!(Arg::json(&42).render(), "42");
        assert_eq!(Arg::json(&true).render(), "true");
        assert_eq!(Arg::json(&"quoted").render(), "quoted");
        assert_eq!(Arg::Json(serde_json::Value::Null).render(), "null");
    }

    #[test]
    fn test_render_structured_is_indented_json() {
        let value = serde_json::json!({ "user": { "id": 7 } });
        let rendered = Arg::json(&value).render();
        assert!(rendered.contains('\n'));
        assert!(rendered.contains("  \"user\""));
    }

    #[test]
    fn test_failed_serialization_becomes_placeholder() {
        assert_eq!(Arg::json(&Cyclic), Arg::Unserializable);

        let mut tuple_keys = HashMap::new();
        tuple_keys.insert((1, 2), "x");
        assert_eq!(Arg::json(&tuple_keys).render(), UNSERIALIZABLE);
    }

    #[test]
    fn test_error_arg_prefers_stack() {
        let err = Outer(std::io::Error::new(std::io::ErrorKind::NotFound, "missing file"));
        let rendered = Arg::error(&err).render();
        assert!(rendered.starts_with("request failed"));
        assert!(rendered.contains("caused by: missing file"));

        let plain = std::io::Error::new(std::io::ErrorKind::Other, "plain");
        assert_eq!(Arg::error(&plain).render(), "plain");
    }

    #[test]
    fn test_console_record_joins_args() {
        let record = LogRecord::console(
            Source::Server,
            Level::Warn,
            &[Arg::text("count"), Arg::json(&3), Arg::json(&Cyclic)],
        );

        assert_eq!(record.message, "count 3 [unserializable]");
        assert_eq!(record.level, Some(Level::Warn));
        assert_eq!(
            record.args,
            Some(vec!["count".to_string(), "3".to_string(), UNSERIALIZABLE.to_string()])
        );
    }

    #[test]
    fn test_message_never_empty() {
        let record = LogRecord::console(Source::Browser, Level::Log, &[]);
        assert_eq!(record.message, EMPTY_MESSAGE);

        let record = LogRecord::new(Source::Server, RecordType::Error, "   ");
        assert_eq!(record.message, EMPTY_MESSAGE);
    }

    #[test]
    fn test_json_shape() {
        let record = LogRecord::new(Source::Browser, RecordType::UnhandledRejection, "boom");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["type"], "unhandledRejection");
        assert_eq!(json["source"], "browser");
        assert!(json.get("level").is_none());
        assert!(json.get("args").is_none());
    }

    #[test]
    fn test_parse_level_and_source() {
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warn);
        assert!("fatal".parse::<Level>().is_err());
        assert_eq!("server".parse::<Source>().unwrap(), Source::Server);
        assert!("worker".parse::<Source>().is_err());
    }

    #[test]
    fn test_format_includes_location_and_stack() {
        let record = LogRecord::new(Source::Browser, RecordType::Error, "x is undefined")
            .with_location(Some("app.js".to_string()), Some(10), Some(4))
            .with_stack(Some("TypeError: x is undefined\n  at main (app.js:10:4)".to_string()));

        let formatted = record.format();
        assert!(formatted.contains("[error] x is undefined"));
        assert!(formatted.contains("at app.js:10:4"));
        assert!(formatted.contains("at main (app.js:10:4)"));
    }
}
