//! Node configuration types.
//!
//! Configuration comes from an optional YAML file, with command line flags and
//! environment variables layered on top in `main`. Once validated it is frozen
//! and shared read-only by every request.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;
use vanity_web::{GoImport, RedirectTable};

use crate::validation::{describe, validate_mount, validate_ref_name};

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid YAML for [`Config`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// A value is out of range or malformed.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for the Vanity node.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listen address.
    pub http: SocketAddr,
    /// Directory served for paths without a redirect.
    pub static_dir: PathBuf,
    /// Log level.
    pub log_level: String,
    /// Log format (`pretty` or `json`).
    pub log_format: String,
    /// Proxied repository.
    pub repo: RepoConfig,
    /// Redirects and go-get declaration.
    pub site: SiteConfig,
    /// Optional CI rebuild trigger.
    pub rebuild: Option<RebuildConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: SocketAddr::from(([0, 0, 0, 0], 8080)),
            static_dir: PathBuf::from("static"),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            repo: RepoConfig::default(),
            site: SiteConfig::default(),
            rebuild: None,
        }
    }
}

/// The repository served through the git proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Path the repository is served under, e.g. `/project`.
    pub mount: String,
    /// Upstream repository URL, e.g. `https://github.com/org/project.git`.
    pub upstream: String,
    /// Reference advertised as the default branch.
    pub target_ref: String,
    /// Largest upstream advertisement buffered before giving up.
    pub max_advertisement_bytes: usize,
    /// Total time allowed for fetching an advertisement.
    pub timeout_secs: u64,
    /// Time allowed for connecting to the upstream.
    pub connect_timeout_secs: u64,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            mount: "/repo".to_string(),
            upstream: String::new(),
            target_ref: "refs/heads/main".to_string(),
            max_advertisement_bytes: 32 * 1024 * 1024,
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

impl RepoConfig {
    /// Upstream URL serving the reference advertisement.
    pub fn info_refs_url(&self) -> Result<Url, ConfigError> {
        self.upstream_url("info/refs?service=git-upload-pack")
    }

    /// Upstream URL serving pack negotiation.
    pub fn upload_pack_url(&self) -> Result<Url, ConfigError> {
        self.upstream_url("git-upload-pack")
    }

    /// Timeout for advertisement fetches.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Timeout for establishing upstream connections.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    fn upstream_url(&self, suffix: &str) -> Result<Url, ConfigError> {
        let raw = format!("{}/{}", self.upstream.trim_end_matches('/'), suffix);
        Url::parse(&raw)
            .map_err(|e| ConfigError::Invalid(format!("upstream url {:?}: {}", self.upstream, e)))
    }
}

/// Site surfaces.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Declaration returned to `go get`; go-get requests fall through when unset.
    pub go_import: Option<GoImport>,
    /// Path and prefix redirects.
    #[serde(flatten)]
    pub redirects: RedirectTable,
}

/// CI rebuild trigger.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RebuildConfig {
    /// Webhook receiving the trigger request.
    pub url: String,
    /// Bearer token sent with the trigger.
    #[serde(default)]
    pub token: Option<String>,
    /// Branch to rebuild.
    #[serde(default = "default_rebuild_branch")]
    pub branch: String,
}

fn default_rebuild_branch() -> String {
    "main".to_string()
}

impl Config {
    /// Loads configuration from a YAML file.
    pub fn load_yaml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let repo = &self.repo;

        if repo.upstream.is_empty() {
            return Err(ConfigError::Invalid("repo.upstream is not set".into()));
        }
        let url = repo.info_refs_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "repo.upstream must be http or https, got {}",
                url.scheme()
            )));
        }

        validate_mount(&repo.mount)
            .map_err(|e| ConfigError::Invalid(format!("repo.mount: {}", describe(&e))))?;
        validate_ref_name(&repo.target_ref)
            .map_err(|e| ConfigError::Invalid(format!("repo.target_ref: {}", describe(&e))))?;

        if repo.max_advertisement_bytes == 0 {
            return Err(ConfigError::Invalid(
                "repo.max_advertisement_bytes must be positive".into(),
            ));
        }
        if repo.timeout_secs == 0 || repo.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid("repo timeouts must be positive".into()));
        }

        self.site
            .redirects
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if let Some(rebuild) = &self.rebuild {
            Url::parse(&rebuild.url)
                .map_err(|e| ConfigError::Invalid(format!("rebuild.url: {}", e)))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid() -> Config {
        let mut config = Config::default();
        config.repo.upstream = "https://github.com/org/project.git".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.http.port(), 8080);
        assert_eq!(config.repo.mount, "/repo");
        assert!(config.rebuild.is_none());
        // No upstream configured yet.
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_upstream_urls() {
        let mut config = valid();
        config.repo.upstream = "https://github.com/org/project.git/".to_string();
        assert_eq!(
            config.repo.info_refs_url().unwrap().as_str(),
            "https://github.com/org/project.git/info/refs?service=git-upload-pack"
        );
        assert_eq!(
            config.repo.upload_pack_url().unwrap().as_str(),
            "https://github.com/org/project.git/git-upload-pack"
        );
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());

        let mut config = valid();
        config.repo.upstream = "ftp://example.com/repo".to_string();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.repo.target_ref = "main".to_string();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.repo.mount = "repo/".to_string();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.repo.max_advertisement_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.site.redirects = RedirectTable::new().with_prefix("issue", "https://x/");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
http: "127.0.0.1:9999"
static_dir: "public"
repo:
  mount: /project
  upstream: https://github.com/org/project.git
  target_ref: refs/heads/go
site:
  go_import:
    prefix: example.dev/project
    repo_url: https://example.dev/project
  paths:
    /issue: https://github.com/org/project/issues
  prefixes:
    issue: https://github.com/org/project/issues/%s
rebuild:
  url: https://ci.example.com/hooks/rebuild
"#
        )
        .unwrap();

        let config = Config::load_yaml(file.path()).unwrap();
        assert_eq!(config.http.port(), 9999);
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert_eq!(config.repo.target_ref, "refs/heads/go");
        assert_eq!(config.repo.timeout_secs, 30);
        assert_eq!(config.site.go_import.as_ref().unwrap().vcs, "git");
        assert_eq!(config.site.redirects.paths.len(), 1);
        assert_eq!(config.site.redirects.prefixes.len(), 1);
        assert_eq!(config.rebuild.as_ref().unwrap().branch, "main");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../vanity.example.yaml");
        let config = Config::load_yaml(path).unwrap();
        config.validate().unwrap();
        assert_eq!(config.repo.mount, "/project");
        assert!(config.rebuild.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load_yaml("/nonexistent/vanity.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "repo: [not, a, map]").unwrap();
        assert!(matches!(
            Config::load_yaml(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
