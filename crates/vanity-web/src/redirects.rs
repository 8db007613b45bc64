//! Path and prefix redirect tables.
//!
//! Exact entries map one path to one URL. Prefix entries map `/<prefix>/<id>`
//! onto a URL template in which `%s` is replaced by `<id>`. Exact entries take
//! precedence, then the longest matching prefix.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::WebError;

/// Placeholder replaced by the identifier in prefix templates.
pub const ID_PLACEHOLDER: &str = "%s";

/// Identifiers accepted after a prefix.
pub static ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]*/?$").expect("Invalid regex"));

/// Outcome of looking a path up in the tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// Temporary redirect to the given location.
    Found(String),
    /// The path matched a prefix but the identifier is not acceptable.
    InvalidId(String),
}

/// Immutable redirect configuration, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RedirectTable {
    /// Exact path redirects, e.g. `/issue` to an issue tracker.
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
    /// Prefix templates keyed by prefix without slashes, e.g. `issue`.
    #[serde(default)]
    pub prefixes: BTreeMap<String, String>,
}

impl RedirectTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exact path redirect.
    pub fn with_path(mut self, path: impl Into<String>, target: impl Into<String>) -> Self {
        self.paths.insert(path.into(), target.into());
        self
    }

    /// Adds a prefix redirect.
    pub fn with_prefix(mut self, prefix: impl Into<String>, template: impl Into<String>) -> Self {
        self.prefixes.insert(prefix.into(), template.into());
        self
    }

    /// Checks every entry for a usable shape.
    pub fn validate(&self) -> Result<(), WebError> {
        for (path, target) in &self.paths {
            if !path.starts_with('/') || path.len() < 2 || path.ends_with('/') {
                return Err(WebError::InvalidRedirect(format!(
                    "path {:?} must start with '/' and not end with one",
                    path
                )));
            }
            if target.is_empty() {
                return Err(WebError::InvalidRedirect(format!(
                    "path {:?} has an empty target",
                    path
                )));
            }
        }

        for (prefix, template) in &self.prefixes {
            if prefix.is_empty() || prefix.starts_with('/') || prefix.ends_with('/') {
                return Err(WebError::InvalidRedirect(format!(
                    "prefix {:?} must not be empty or start or end with '/'",
                    prefix
                )));
            }
            if template.matches(ID_PLACEHOLDER).count() != 1 {
                return Err(WebError::InvalidRedirect(format!(
                    "template for prefix {:?} must contain exactly one {}",
                    prefix, ID_PLACEHOLDER
                )));
            }
        }

        Ok(())
    }

    /// Looks `path` up, appending `query` to the target when present.
    pub fn resolve(&self, path: &str, query: Option<&str>) -> Option<Redirect> {
        if let Some(target) = self.paths.get(path) {
            return Some(Redirect::Found(with_query(target, query)));
        }

        let (prefix, template) = self
            .prefixes
            .iter()
            .filter(|(prefix, _)| {
                path.strip_prefix('/')
                    .and_then(|rest| rest.strip_prefix(prefix.as_str()))
                    .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|(prefix, _)| prefix.len())?;

        // "/<prefix>/" + id
        let id = &path[prefix.len() + 2..];
        if id.is_empty() {
            return Some(Redirect::Found(format!("/{}", prefix)));
        }
        if !ID_REGEX.is_match(id) {
            return Some(Redirect::InvalidId(id.to_string()));
        }

        let target = template.replacen(ID_PLACEHOLDER, id, 1);
        Some(Redirect::Found(with_query(&target, query)))
    }
}

fn with_query(target: &str, query: Option<&str>) -> String {
    match query {
        Some(query) if !query.is_empty() => format!("{}?{}", target, query),
        _ => target.to_string(),
    }
}
