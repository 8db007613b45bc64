//! # Input Validation
//!
//! Checks applied to configuration values before the server starts.
//!
//! ```rust,no_run
//! use vanity_node::validation::validate_ref_name;
//!
//! if let Err(e) = validate_ref_name("refs/heads/main") {
//!     println!("Invalid reference: {}", e);
//! }
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

/// Regex for fully qualified reference names: `refs/` followed by characters
/// `git check-ref-format` accepts (no controls, space, `~^:?*[\`).
pub static REF_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^refs/[^\x00-\x20\x7f~^:?*\[\\]+$").expect("Invalid regex"));

/// Regex for valid repository mount paths.
pub static MOUNT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/[a-zA-Z0-9][a-zA-Z0-9_.-]*)+$").expect("Invalid regex"));

/// Maximum length of a reference name.
pub const MAX_REF_LENGTH: usize = 255;

/// Validate a git reference name (branch/tag).
pub fn validate_ref_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        let mut err = ValidationError::new("length");
        err.message = Some("Reference name cannot be empty".into());
        return Err(err);
    }

    if name.len() > MAX_REF_LENGTH {
        let mut err = ValidationError::new("length");
        err.message = Some(
            format!(
                "Reference name must be at most {} characters",
                MAX_REF_LENGTH
            )
            .into(),
        );
        return Err(err);
    }

    if !REF_NAME_REGEX.is_match(name) {
        let mut err = ValidationError::new("pattern");
        err.message = Some("Reference name must be fully qualified, e.g. refs/heads/main".into());
        return Err(err);
    }

    // Git-specific restrictions
    if name.contains("..") || name.contains("@{") || name.ends_with('.') {
        let mut err = ValidationError::new("git_restriction");
        err.message = Some("Reference name contains invalid Git sequences".into());
        return Err(err);
    }

    let bad_component = name
        .split('/')
        .any(|c| c.is_empty() || c.starts_with('.') || c.ends_with(".lock"));
    if bad_component {
        let mut err = ValidationError::new("git_restriction");
        err.message = Some(
            "Reference name components cannot be empty, start with '.' or end with .lock".into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validate the path a repository is served under.
pub fn validate_mount(path: &str) -> Result<(), ValidationError> {
    if !MOUNT_REGEX.is_match(path) {
        let mut err = ValidationError::new("pattern");
        err.message = Some("Mount must look like /name, without a trailing slash".into());
        return Err(err);
    }

    if path.ends_with(".git") {
        let mut err = ValidationError::new("suffix");
        err.message = Some("Mount must not end with .git; the suffix is served as well".into());
        return Err(err);
    }

    Ok(())
}

/// Renders a validation error for logs and startup failures.
pub fn describe(err: &ValidationError) -> String {
    err.message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| err.code.to_string())
}
