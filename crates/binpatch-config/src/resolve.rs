//! Placeholder expansion for configuration values.
//!
//! Two placeholder forms are recognized:
//!
//! - `$(key\path\name)` is answered by an [`ExternalSource`]; a failed lookup
//!   expands to the empty string.
//! - `%NAME%` is answered by variables defined in the config file
//!   (`;@NAME=value` comments), then by the process environment; an unknown
//!   name expands to the empty string.
//!
//! Expansion repeats until no placeholder is left, so a value may expand into
//! further placeholders. The number of passes is bounded by `max_depth`.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::debug;

use binpatch_core::{Error, Result};

pub const DEFAULT_MAX_DEPTH: usize = 32;

/// A key-value store consulted for `$(...)` placeholders.
pub trait ExternalSource {
    fn lookup(&self, path: &str) -> Option<String>;
}

/// Answers every lookup with nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSource;

impl ExternalSource for NullSource {
    fn lookup(&self, _path: &str) -> Option<String> {
        None
    }
}

/// In-memory lookup table. A lookup path is split at its last `\` or `/`
/// into a key and a value name, the way registry paths are written.
#[derive(Debug, Default, Clone)]
pub struct MapSource {
    entries: HashMap<(String, String), String>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert((key.into(), name.into()), value.into());
    }

    pub fn with(mut self, key: &str, name: &str, value: &str) -> Self {
        self.insert(key, name, value);
        self
    }
}

impl ExternalSource for MapSource {
    fn lookup(&self, path: &str) -> Option<String> {
        let (key, name) = path.rsplit_once(['\\', '/'])?;
        if key.is_empty() {
            return None;
        }
        self.entries.get(&(key.to_string(), name.to_string())).cloned()
    }
}

fn lookup_pattern() -> &'static Regex {
    static LOOKUP_RE: OnceLock<Regex> = OnceLock::new();
    // Innermost first: the body may not contain parentheses.
    LOOKUP_RE.get_or_init(|| Regex::new(r"\$\(([^()]*)\)").expect("lookup pattern"))
}

fn env_pattern() -> &'static Regex {
    static ENV_RE: OnceLock<Regex> = OnceLock::new();
    ENV_RE.get_or_init(|| Regex::new(r"%([^%\s]+)%").expect("env pattern"))
}

pub struct VariableResolver {
    source: Box<dyn ExternalSource>,
    defines: HashMap<String, String>,
    max_depth: usize,
}

impl Default for VariableResolver {
    fn default() -> Self {
        Self::new(Box::new(NullSource))
    }
}

impl VariableResolver {
    pub fn new(source: Box<dyn ExternalSource>) -> Self {
        Self {
            source,
            defines: HashMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Define `%name%` for this resolver, shadowing the process environment.
    pub fn define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.defines.insert(name.into(), value.into());
    }

    /// Pick up `@NAME=value` definitions from config comments.
    pub fn define_from_comments<'a>(&mut self, comments: impl IntoIterator<Item = &'a str>) {
        for comment in comments {
            let Some(def) = comment.trim_start().strip_prefix('@') else {
                continue;
            };
            if let Some((name, value)) = def.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    debug!("config defines %{}%", name);
                    self.define(name, value.trim());
                }
            }
        }
    }

    fn env(&self, name: &str) -> String {
        self.defines
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
            .unwrap_or_default()
    }

    pub fn has_placeholder(value: &str) -> bool {
        lookup_pattern().is_match(value) || env_pattern().is_match(value)
    }

    pub fn resolve(&self, raw: &str) -> Result<String> {
        let mut value = raw.to_string();
        let mut passes = 0;

        while Self::has_placeholder(&value) {
            if passes == self.max_depth {
                return Err(Error::ResolutionDepthExceeded {
                    value: raw.to_string(),
                    depth: self.max_depth,
                });
            }
            passes += 1;

            value = lookup_pattern()
                .replace_all(&value, |caps: &Captures| {
                    self.source.lookup(&caps[1]).unwrap_or_default()
                })
                .into_owned();
            value = env_pattern()
                .replace_all(&value, |caps: &Captures| self.env(&caps[1]))
                .into_owned();
        }

        Ok(value)
    }
}
