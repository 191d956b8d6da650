// Channel protocol - Browser events and the relay wire format

use crate::logs::{Level, LogRecord, RecordType, Source};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default name of the channel event carrying browser diagnostics
pub const DEFAULT_EVENT: &str = "devlogs:log";

/// Used when a payload carries no usable message
pub const MISSING_MESSAGE: &str = "(no message)";

/// One message on the relay: a named event and its payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl ChannelMessage {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// A diagnostic event pushed by the browser payload, keyed by its `type`
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserEvent {
    Console {
        level: Level,
        message: String,
        args: Vec<String>,
    },
    Error {
        message: String,
        filename: Option<String>,
        line: Option<u32>,
        column: Option<u32>,
        stack: Option<String>,
    },
    UnhandledRejection {
        message: String,
        stack: Option<String>,
    },
}

impl BrowserEvent {
    /// Decode a payload leniently: unknown fields are ignored, missing ones defaulted
    pub fn from_payload(payload: &Value) -> Self {
        let Some(obj) = payload.as_object() else {
            let message = match payload {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            return BrowserEvent::Console {
                level: Level::Log,
                message: or_missing(message),
                args: Vec::new(),
            };
        };

        let kind = obj.get("type").and_then(Value::as_str).unwrap_or("console");
        let message = text_field(obj, "message");
        let stack = text_field(obj, "stack").filter(|s| !s.is_empty());

        match kind {
            "error" => BrowserEvent::Error {
                message: or_missing(message.unwrap_or_default()),
                filename: text_field(obj, "filename").filter(|f| !f.is_empty()),
                line: number_field(obj, "lineno"),
                column: number_field(obj, "colno"),
                stack,
            },
            "unhandledRejection" => BrowserEvent::UnhandledRejection {
                message: or_missing(message.unwrap_or_default()),
                stack,
            },
            _ => {
                let args: Vec<String> = obj
                    .get("args")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().map(value_text).collect())
                    .unwrap_or_default();
                let message = message.unwrap_or_else(|| args.join(" "));
                let level = obj
                    .get("level")
                    .and_then(Value::as_str)
                    .and_then(|l| l.parse().ok())
                    .unwrap_or(Level::Log);

                BrowserEvent::Console {
                    level,
                    message: or_missing(message),
                    args,
                }
            }
        }
    }

    /// Wire payload for this event, as the browser payload sends it
    pub fn to_payload(&self) -> Value {
        let mut obj = Map::new();
        match self {
            BrowserEvent::Console {
                level,
                message,
                args,
            } => {
                obj.insert("type".into(), "console".into());
                obj.insert("level".into(), level.as_str().into());
                obj.insert("message".into(), message.as_str().into());
                obj.insert("args".into(), args.clone().into());
            }
            BrowserEvent::Error {
                message,
                filename,
                line,
                column,
                stack,
            } => {
                obj.insert("type".into(), "error".into());
                obj.insert("message".into(), message.as_str().into());
                insert_opt(&mut obj, "filename", filename.clone().map(Value::from));
                insert_opt(&mut obj, "lineno", line.map(Value::from));
                insert_opt(&mut obj, "colno", column.map(Value::from));
                insert_opt(&mut obj, "stack", stack.clone().map(Value::from));
            }
            BrowserEvent::UnhandledRejection { message, stack } => {
                obj.insert("type".into(), "unhandledRejection".into());
                obj.insert("message".into(), message.as_str().into());
                insert_opt(&mut obj, "stack", stack.clone().map(Value::from));
            }
        }
        Value::Object(obj)
    }

    /// Record for this event, stamped with the arrival time
    pub fn into_record(self) -> LogRecord {
        match self {
            BrowserEvent::Console {
                level,
                message,
                args,
            } => {
                let mut record =
                    LogRecord::new(Source::Browser, RecordType::Console, message).with_level(level);
                record.args = Some(args);
                record
            }
            BrowserEvent::Error {
                message,
                filename,
                line,
                column,
                stack,
            } => LogRecord::new(Source::Browser, RecordType::Error, message)
                .with_location(filename, line, column)
                .with_stack(stack),
            BrowserEvent::UnhandledRejection { message, stack } => {
                LogRecord::new(Source::Browser, RecordType::UnhandledRejection, message)
                    .with_stack(stack)
            }
        }
    }
}

fn or_missing(message: String) -> String {
    if message.trim().is_empty() {
        MISSING_MESSAGE.to_string()
    } else {
        message
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::Null => None,
        value => Some(value_text(value)),
    }
}

fn number_field(obj: &Map<String, Value>, key: &str) -> Option<u32> {
    match obj.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn insert_opt(obj: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        obj.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_console_payload() {
        let event = BrowserEvent::from_payload(&json!({
            "type": "console",
            "level": "warn",
            "message": "slow render",
            "args": ["slow render", 42],
        }));

        assert_eq!(
            event,
            BrowserEvent::Console {
                level: Level::Warn,
                message: "slow render".to_string(),
                args: vec!["slow render".to_string(), "42".to_string()],
            }
        );
    }

    #[test]
    fn test_error_payload_maps_location() {
        let record = BrowserEvent::from_payload(&json!({
            "type": "error",
            "message": "x is not defined",
            "filename": "http://localhost:5173/src/App.tsx",
            "lineno": 14,
            "colno": "9",
            "stack": "ReferenceError: x is not defined",
        }))
        .into_record();

        assert_eq!(record.kind, RecordType::Error);
        assert_eq!(record.source, Source::Browser);
        assert_eq!(record.level, None);
        assert_eq!(record.line, Some(14));
        assert_eq!(record.column, Some(9));
        assert_eq!(record.filename.as_deref(), Some("http://localhost:5173/src/App.tsx"));
    }

    #[test]
    fn test_malformed_payloads_get_defaults() {
        let event = BrowserEvent::from_payload(&json!({ "type": "unhandledRejection" }));
        assert_eq!(
            event,
            BrowserEvent::UnhandledRejection {
                message: MISSING_MESSAGE.to_string(),
                stack: None,
            }
        );

        let event = BrowserEvent::from_payload(&json!({ "type": "mystery", "level": "loud", "args": ["a", "b"] }));
        assert_eq!(
            event,
            BrowserEvent::Console {
                level: Level::Log,
                message: "a b".to_string(),
                args: vec!["a".to_string(), "b".to_string()],
            }
        );

        let event = BrowserEvent::from_payload(&json!(["not", "an", "object"]));
        assert!(matches!(event, BrowserEvent::Console { ref message, .. } if message == r#"["not","an","object"]"#));

        let event = BrowserEvent::from_payload(&Value::Null);
        assert!(matches!(event, BrowserEvent::Console { ref message, .. } if message == MISSING_MESSAGE));
    }

    #[test]
    fn test_payload_round_trips_through_decoder() {
        let event = BrowserEvent::Error {
            message: "boom".to_string(),
            filename: Some("main.js".to_string()),
            line: Some(1),
            column: None,
            stack: None,
        };
        assert_eq!(BrowserEvent::from_payload(&event.to_payload()), event);
    }

    #[test]
    fn test_channel_message_data_defaults_to_null() {
        let message: ChannelMessage = serde_json::from_str(r#"{"event":"devlogs:log"}"#).unwrap();
        assert_eq!(message.event, DEFAULT_EVENT);
        assert_eq!(message.data, Value::Null);
    }
}
