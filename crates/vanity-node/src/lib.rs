//! # Vanity Node
//!
//! Web server for a project's vanity domain.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Vanity Node                      │
//! ├──────────────────────────────────────────────────────┤
//! │  Git proxy      <mount>/info/refs      (rewritten)   │
//! │                 <mount>/git-upload-pack (streamed)   │
//! │  Site           redirects, go-get, static files      │
//! │  Operations     /health, /rebuild                    │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Clones through the proxy check out the configured target branch instead
//! of the upstream default, while objects still come from the upstream.
//!
//! ## Quick Start
//!
//! ```bash
//! vanity-node --config vanity.yaml --http 0.0.0.0:8080
//! ```
//!
//! ## Modules
//!
//! - [`api`] - Router assembly and health check
//! - [`proxy_api`] - Git smart-HTTP proxy endpoints
//! - [`rebuild_api`] - CI rebuild trigger
//! - [`upstream`] - HTTP client for the upstream git host
//! - [`config`] - Node configuration
//! - [`observability`] - Logging and request IDs
//! - [`validation`] - Configuration value checks

pub mod api;
pub mod config;
pub mod observability;
pub mod proxy_api;
pub mod rebuild_api;
pub mod upstream;
pub mod validation;

pub use api::{create_router, AppState};
pub use config::{Config, ConfigError};
