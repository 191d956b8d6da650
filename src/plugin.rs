// Plugin facade - The hook points a host build tool drives

use crate::capture::payload;
use crate::capture::{
    CaptureOptions, EntryMatcher, Injector, ServerCapture, RESOLVED_VIRTUAL_MODULE_ID,
    VIRTUAL_MODULE_ID,
};
use crate::channel::{ChannelBridge, LiveChannel};
use crate::config::DevLogsConfig;
use crate::error::Result;
use crate::logs::{LogStore, StoreCache};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const PLUGIN_NAME: &str = "devlogs";

/// Dev-server plugin wiring injection, the payload module and both collectors
#[derive(Debug, Clone)]
pub struct DevLogsPlugin {
    config: DevLogsConfig,
    root: PathBuf,
    injector: Injector,
}

impl DevLogsPlugin {
    pub fn new(config: DevLogsConfig, root: impl Into<PathBuf>) -> Result<Self> {
        config.validate()?;
        let root = root.into();
        let injector = Injector::new(EntryMatcher::new(&root, &config.entries)?);

        Ok(Self {
            config,
            root,
            injector,
        })
    }

    pub fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    pub fn config(&self) -> &DevLogsConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve_id(&self, id: &str) -> Option<&'static str> {
        (id == VIRTUAL_MODULE_ID).then_some(RESOLVED_VIRTUAL_MODULE_ID)
    }

    pub fn load(&self, id: &str) -> Option<String> {
        (id == RESOLVED_VIRTUAL_MODULE_ID)
            .then(|| payload::module_source(self.config.browser, &self.config.event))
    }

    pub fn transform(&self, code: &str, id: &str) -> Option<String> {
        if !self.config.browser {
            return None;
        }
        self.injector.transform(id, code)
    }

    /// Shared store for the configured directory
    pub fn store(&self) -> Result<Arc<LogStore>> {
        StoreCache::global().get_or_open(
            self.config.resolved_log_dir(&self.root),
            self.config.store_options(),
        )
    }

    /// Hook run when the dev server starts
    ///
    /// Attaches the channel bridge when browser capture is on and installs
    /// the server collector when server capture is on. The returned guard
    /// must be kept alive for as long as server capture should run.
    pub fn configure_server(&self, channel: &dyn LiveChannel) -> Result<Option<ServerCapture>> {
        if !self.config.browser && !self.config.server {
            tracing::info!("Browser and server capture are both disabled");
            return Ok(None);
        }

        let store = self.store()?;

        // Nothing is attached unless the whole setup succeeds
        let capture = if self.config.server {
            Some(ServerCapture::install_with(
                Arc::clone(&store),
                CaptureOptions::default(),
            )?)
        } else {
            None
        };

        if self.config.browser {
            ChannelBridge::new(Arc::clone(&store), self.config.event.as_str()).attach(channel);
        }

        tracing::info!("Capturing dev logs into {}", store.log_dir().display());
        Ok(capture)
    }
}
