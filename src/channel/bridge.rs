use crate::channel::protocol::BrowserEvent;
use crate::channel::LiveChannel;
use crate::logs::{LogStore, Source};
use serde_json::Value;
use std::sync::Arc;

/// Routes browser events arriving on the live channel into the store
#[derive(Debug, Clone)]
pub struct ChannelBridge {
    store: Arc<LogStore>,
    event: String,
}

impl ChannelBridge {
    pub fn new(store: Arc<LogStore>, event: impl Into<String>) -> Self {
        Self {
            store,
            event: event.into(),
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    /// Start listening for browser events on `channel`
    pub fn attach(&self, channel: &dyn LiveChannel) {
        let bridge = self.clone();
        channel.on(&self.event, Arc::new(move |data: Value| bridge.handle(data)));
        tracing::debug!("Channel bridge listening on {}", self.event);
    }

    /// Record one payload; malformed payloads are stored with defaults
    pub fn handle(&self, payload: Value) {
        let record = BrowserEvent::from_payload(&payload).into_record();
        self.store.write(Source::Browser, record);
    }
}
