//! `go get` meta page responder.
//!
//! The Go toolchain resolves vanity import paths by fetching `?go-get=1` and
//! reading the `go-import` meta tag, so every site path answers with the same
//! page pointing at the repository root.

use serde::{Deserialize, Serialize};

/// The `go-import` declaration served to the Go toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GoImport {
    /// Import path prefix, e.g. `example.dev/project`.
    pub prefix: String,
    /// Version control system.
    #[serde(default = "default_vcs")]
    pub vcs: String,
    /// Repository root URL cloned by the toolchain.
    pub repo_url: String,
}

fn default_vcs() -> String {
    "git".to_string()
}

impl GoImport {
    /// Creates a git import declaration.
    pub fn new(prefix: impl Into<String>, repo_url: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            vcs: default_vcs(),
            repo_url: repo_url.into(),
        }
    }

    /// Renders the meta tag.
    pub fn meta_tag(&self) -> String {
        format!(
            r#"<meta name="go-import" content="{} {} {}">"#,
            self.prefix, self.vcs, self.repo_url
        )
    }

    /// Renders the full HTML5 page.
    pub fn page(&self) -> String {
        format!(
            "<!doctype html><html><head><meta charset=utf-8>{}<title>Go-get</title></head><body></html>",
            self.meta_tag()
        )
    }
}

/// Returns true when the query carries exactly one `go-get=1` parameter.
pub fn is_go_get(query: Option<&str>) -> bool {
    let Some(query) = query else {
        return false;
    };

    let mut values = url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key == "go-get")
        .map(|(_, value)| value);

    matches!((values.next(), values.next()), (Some(value), None) if value == "1")
}
