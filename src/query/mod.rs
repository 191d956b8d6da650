// Query module - Reads back recent records for an agent and renders them as text

use crate::error::{DevLogsError, Result};
use crate::logs::{Level, LogRecord, LogStore, Source};
use std::sync::Arc;

/// Number of entries returned when the caller does not ask for a count
pub const DEFAULT_ENTRIES: usize = 20;

/// Largest number of entries a single query may return
pub const MAX_ENTRIES: usize = 100;

/// A request for the most recent records of one source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogQuery {
    pub source: Source,
    pub entries: usize,
    pub level: Option<Level>,
}

impl LogQuery {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            entries: DEFAULT_ENTRIES,
            level: None,
        }
    }

    pub fn entries(mut self, entries: usize) -> Self {
        self.entries = entries;
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Build a query from loosely typed input, validating every field
    pub fn parse(source: &str, entries: Option<usize>, level: Option<&str>) -> Result<Self> {
        let query = Self {
            source: source.parse()?,
            entries: entries.unwrap_or(DEFAULT_ENTRIES),
            level: level.map(str::parse).transpose()?,
        };
        query.validate()?;
        Ok(query)
    }

    pub fn validate(&self) -> Result<()> {
        if self.entries == 0 || self.entries > MAX_ENTRIES {
            return Err(DevLogsError::InvalidQuery(format!(
                "entries must be between 1 and {}, got {}",
                MAX_ENTRIES, self.entries
            )));
        }
        Ok(())
    }
}

/// Answer to a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Matching records, newest first
    Records {
        query: LogQuery,
        records: Vec<LogRecord>,
    },
    /// Nothing matched; `guidance` tells the caller what to check
    Empty { query: LogQuery, guidance: String },
    /// The store could not be read
    Failed { query: LogQuery, message: String },
}

impl QueryOutcome {
    pub fn records(&self) -> &[LogRecord] {
        match self {
            QueryOutcome::Records { records, .. } => records,
            _ => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        !matches!(self, QueryOutcome::Records { .. })
    }

    /// Human-readable answer for the consuming agent
    pub fn render(&self) -> String {
        match self {
            QueryOutcome::Records { query, records } => {
                let noun = if records.len() == 1 { "entry" } else { "entries" };
                let mut out = format!(
                    "Showing {} {} log {} (newest first)",
                    records.len(),
                    query.source,
                    noun
                );
                if let Some(level) = query.level {
                    out.push_str(&format!(", level = {}", level));
                }
                out.push_str(":\n");

                for record in records {
                    out.push('\n');
                    out.push_str(&record.format());
                    out.push('\n');
                }
                out
            }
            QueryOutcome::Empty { guidance, .. } => guidance.clone(),
            QueryOutcome::Failed { query, message } => {
                format!("Error reading {} logs: {}", query.source, message)
            }
        }
    }
}

/// Answers queries against a store
#[derive(Debug, Clone)]
pub struct QueryService {
    store: Arc<LogStore>,
}

impl QueryService {
    pub fn new(store: Arc<LogStore>) -> Self {
        Self { store }
    }

    /// Run `query`; only invalid input is an error, store failures become [`QueryOutcome::Failed`]
    pub fn query(&self, query: &LogQuery) -> Result<QueryOutcome> {
        query.validate()?;

        // A level filter looks through the whole retained tail so that other
        // levels cannot crowd out the requested one
        let window = match query.level {
            Some(_) => self.store.options().keep_lines.max(query.entries),
            None => query.entries,
        };

        let records = match self.store.try_read(query.source, window) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Query on {} logs failed: {}", query.source, e);
                return Ok(QueryOutcome::Failed {
                    query: *query,
                    message: e.to_string(),
                });
            }
        };

        let records: Vec<LogRecord> = records
            .into_iter()
            .filter(|record| query.level.map_or(true, |level| record.level == Some(level)))
            .take(query.entries)
            .collect();

        if records.is_empty() {
            return Ok(QueryOutcome::Empty {
                query: *query,
                guidance: guidance(query),
            });
        }

        Ok(QueryOutcome::Records {
            query: *query,
            records,
        })
    }
}

fn guidance(query: &LogQuery) -> String {
    if let Some(level) = query.level {
        return format!(
            "No {} log entries with level '{}' found. Try again without a level filter.",
            query.source, level
        );
    }

    match query.source {
        Source::Browser => "No browser log entries found. Make sure the dev server is running \
             with browser capture enabled and the app is open in a browser, then reload the page."
            .to_string(),
        Source::Server => "No server log entries found. Make sure the dev server is running \
             with server capture enabled."
            .to_string(),
    }
}
