//! Vanity Node - vanity domain server with a default-branch git proxy.

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use vanity_node::observability::{init_logging, LogFormat};
use vanity_node::{create_router, AppState, Config};

/// Vanity Node - redirects, static files and a default-branch git proxy
#[derive(Parser, Debug)]
#[command(name = "vanity-node")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "VANITY_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP listen address
    #[arg(long, env = "HTTP")]
    http: Option<String>,

    /// Directory of static files
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Upstream repository URL
    #[arg(long, env = "VANITY_UPSTREAM")]
    upstream: Option<String>,

    /// Reference advertised as the default branch
    #[arg(long, env = "VANITY_TARGET_REF")]
    target_ref: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "VANITY_LOG")]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long)]
    log_format: Option<String>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_yaml(path)?,
            None => Config::default(),
        };

        if let Some(http) = self.http {
            config.http = parse_listen_addr(&http)?;
        }
        if let Some(static_dir) = self.static_dir {
            config.static_dir = static_dir;
        }
        if let Some(upstream) = self.upstream {
            config.repo.upstream = upstream;
        }
        if let Some(target_ref) = self.target_ref {
            config.repo.target_ref = target_ref;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Accepts `host:port` or the `:port` shorthand for all interfaces.
fn parse_listen_addr(raw: &str) -> anyhow::Result<SocketAddr> {
    let full = match raw.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => raw.to_string(),
    };
    full.parse()
        .with_context(|| format!("invalid listen address {:?}", raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Args::parse().into_config()?;

    init_logging(&config.log_level, LogFormat::parse(&config.log_format));

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Vanity node");
    tracing::info!(
        http = %config.http,
        static_dir = %config.static_dir.display(),
        mount = %config.repo.mount,
        upstream = %config.repo.upstream,
        target_ref = %config.repo.target_ref,
        "Node configuration"
    );

    let state = AppState::from_config(&config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.http)
        .await
        .with_context(|| format!("failed to bind {}", config.http))?;
    tracing::info!(addr = %config.http, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Vanity node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listen_addr() {
        assert_eq!(
            parse_listen_addr(":8080").unwrap(),
            SocketAddr::from(([0, 0, 0, 0], 8080))
        );
        assert_eq!(
            parse_listen_addr("127.0.0.1:9000").unwrap(),
            SocketAddr::from(([127, 0, 0, 1], 9000))
        );
        assert!(parse_listen_addr("nope").is_err());
    }

    #[test]
    fn test_args_override_config() {
        let args = Args::parse_from([
            "vanity-node",
            "--http",
            ":9090",
            "--upstream",
            "https://github.com/org/project.git",
            "--target-ref",
            "refs/heads/go",
        ]);
        let config = args.into_config().unwrap();
        assert_eq!(config.http.port(), 9090);
        assert_eq!(config.repo.target_ref, "refs/heads/go");
    }
}
