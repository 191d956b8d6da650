// Channel module - Live channel seam, browser event bridge and relay

pub mod bridge;
pub mod client;
pub mod protocol;
pub mod server;

pub use bridge::ChannelBridge;
pub use client::ChannelClient;
pub use protocol::{BrowserEvent, ChannelMessage, DEFAULT_EVENT};
pub use server::ChannelServer;

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Callback invoked with the payload of a channel event
pub type EventHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// The host's live client/server channel, as far as capture needs it
pub trait LiveChannel {
    /// Register `handler` for messages named `event`
    fn on(&self, event: &str, handler: EventHandler);
}

/// In-process channel routing named events to registered handlers
#[derive(Default)]
pub struct Dispatcher {
    handlers: RwLock<HashMap<String, Vec<EventHandler>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `data` to every handler of `event`; returns how many ran
    pub fn dispatch(&self, event: &str, data: Value) -> usize {
        let handlers: Vec<EventHandler> = match self.handlers.read() {
            Ok(map) => map.get(event).cloned().unwrap_or_default(),
            Err(poisoned) => poisoned.into_inner().get(event).cloned().unwrap_or_default(),
        };

        if handlers.is_empty() {
            tracing::debug!("No handler for channel event {}", event);
            return 0;
        }

        for handler in &handlers {
            handler(data.clone());
        }
        handlers.len()
    }

    pub fn has_handlers(&self, event: &str) -> bool {
        self.handlers
            .read()
            .map(|map| map.get(event).is_some_and(|h| !h.is_empty()))
            .unwrap_or(false)
    }
}

impl LiveChannel for Dispatcher {
    fn on(&self, event: &str, handler: EventHandler) {
        let mut map = match self.handlers.write() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.entry(event.to_string()).or_default().push(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_dispatch_to_named_handlers() {
        let dispatcher = Dispatcher::new();
        let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        dispatcher.on(
            "devlogs:log",
            Arc::new(move |data: Value| sink.lock().unwrap().push(data)),
        );

        assert!(dispatcher.has_handlers("devlogs:log"));
        assert_eq!(dispatcher.dispatch("devlogs:log", Value::from("hi")), 1);
        assert_eq!(dispatcher.dispatch("other", Value::from("ignored")), 0);

        assert_eq!(seen.lock().unwrap().as_slice(), &[Value::from("hi")]);
    }
}
