use crate::error::{DevLogsError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Import specifier of the instrumentation payload
pub const VIRTUAL_MODULE_ID: &str = "virtual:devlogs/capture";

/// Resolved id of the payload; the `\0` prefix keeps other plugins away from it
pub const RESOLVED_VIRTUAL_MODULE_ID: &str = "\0virtual:devlogs/capture";

/// Common framework entry-point conventions, used when no explicit entries are given
const FALLBACK_ENTRY_PATTERNS: &[&str] = &[
    r"(^|/)entry[.-]client\.[cm]?[jt]sx?$",
    r"(^|/)client\.[cm]?[jt]sx?$",
    r"(^|/)src/(main|index)\.[cm]?[jt]sx?$",
    r"(^|/)app/(entry\.)?client\.[cm]?[jt]sx?$",
];

/// Strip query/hash suffixes and normalize separators of a module id
pub fn normalize_id(id: &str) -> String {
    let end = id.find(|c: char| c == '?' || c == '#').unwrap_or(id.len());
    id[..end].replace('\\', "/")
}

/// Node internals, dependencies and virtual modules never receive the payload
fn is_excluded(id: &str) -> bool {
    id.starts_with('\0')
        || id.starts_with("virtual:")
        || id.starts_with("node:")
        || id.contains("/node_modules/")
}

/// Decides which loaded modules are browser entry points
#[derive(Debug, Clone)]
pub struct EntryMatcher {
    root: String,
    entries: Vec<String>,
    fallbacks: Vec<Regex>,
}

impl EntryMatcher {
    /// Create a matcher for a project `root` and explicit entry paths
    pub fn new<I, S>(root: &Path, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fallbacks = FALLBACK_ENTRY_PATTERNS
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    DevLogsError::ConfigError(format!("Invalid entry pattern {}: {}", pattern, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let entries = entries
            .into_iter()
            .map(|entry| trim_relative(&normalize_id(entry.as_ref())).to_string())
            .filter(|entry| !entry.is_empty())
            .collect();

        Ok(Self {
            root: normalize_id(&root.to_string_lossy()).trim_end_matches('/').to_string(),
            entries,
            fallbacks,
        })
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Whether `id` is a browser entry that should receive the payload
    pub fn is_entry(&self, id: &str) -> bool {
        let id = normalize_id(id);
        if id.is_empty() || is_excluded(&id) {
            return false;
        }

        let relative = self.relative(&id);
        if !self.entries.is_empty() {
            return self.entries.iter().any(|entry| entry == relative);
        }

        self.fallbacks.iter().any(|pattern| pattern.is_match(relative))
    }

    fn relative<'a>(&self, id: &'a str) -> &'a str {
        let stripped = if self.root.is_empty() {
            id
        } else {
            id.strip_prefix(self.root.as_str())
                .filter(|rest| rest.starts_with('/'))
                .unwrap_or(id)
        };
        trim_relative(stripped)
    }
}

fn trim_relative(path: &str) -> &str {
    let path = path.strip_prefix("./").unwrap_or(path);
    path.trim_start_matches('/')
}

/// Prepends the payload import to matched entry modules
#[derive(Debug, Clone)]
pub struct Injector {
    matcher: EntryMatcher,
    import_line: String,
}

impl Injector {
    pub fn new(matcher: EntryMatcher) -> Self {
        Self {
            matcher,
            import_line: format!("import \"{}\";\n", VIRTUAL_MODULE_ID),
        }
    }

    pub fn matcher(&self) -> &EntryMatcher {
        &self.matcher
    }

    /// Whether `code` already imports the payload
    pub fn is_injected(code: &str) -> bool {
        code.contains(&format!("\"{}\"", VIRTUAL_MODULE_ID))
            || code.contains(&format!("'{}'", VIRTUAL_MODULE_ID))
    }

    /// New source for `id` with the payload import prepended, or `None` to leave it alone
    pub fn transform(&self, id: &str, code: &str) -> Option<String> {
        if !self.matcher.is_entry(id) || Self::is_injected(code) {
            return None;
        }

        tracing::debug!("Injecting capture payload into {}", normalize_id(id));
        let mut out = String::with_capacity(self.import_line.len() + code.len());
        out.push_str(&self.import_line);
        out.push_str(code);
        Some(out)
    }
}

/// Project root to match module ids against
pub fn project_root(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(root) => Ok(root),
        None => Ok(std::env::current_dir()?),
    }
}
