//! HTTP API for the Vanity node.
//!
//! ## Endpoints
//!
//! - `GET  /health` - Health check
//! - `POST /rebuild` - Trigger a site rebuild
//! - `GET  <mount>/info/refs?service=git-upload-pack` - Rewritten advertisement
//! - `POST <mount>/git-upload-pack` - Forwarded pack negotiation
//! - everything else - redirects, go-get page and static files

use axum::{middleware, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use vanity_git::DefaultBranch;
use vanity_web::{site_routes, www_redirect, SiteState};

use crate::config::{Config, ConfigError};
use crate::observability::request_id_layer;
use crate::proxy_api::{proxy_routes, ProxyState};
use crate::rebuild_api::{rebuild_routes, RebuildTrigger};
use crate::upstream::Upstream;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Path the repository is mounted under.
    pub mount: String,
    /// Git proxy state.
    pub proxy: ProxyState,
    /// Site state.
    pub site: SiteState,
    /// CI rebuild trigger, if configured.
    pub rebuild: Option<Arc<RebuildTrigger>>,
}

impl AppState {
    /// Builds the state from validated configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let upstream = Upstream::new(&config.repo)?;
        let rebuild = config
            .rebuild
            .as_ref()
            .map(RebuildTrigger::new)
            .transpose()?
            .map(Arc::new);

        Ok(Self {
            mount: config.repo.mount.clone(),
            proxy: ProxyState {
                upstream: Arc::new(upstream),
                default_branch: Arc::new(DefaultBranch::new(config.repo.target_ref.clone())),
            },
            site: SiteState {
                redirects: Arc::new(config.site.redirects.clone()),
                go_import: config.site.go_import.clone().map(Arc::new),
                static_dir: config.static_dir.clone(),
            },
            rebuild,
        })
    }
}

/// Creates the HTTP router.
pub fn create_router(state: AppState) -> Router {
    let git = proxy_routes(&state.mount, state.proxy).layer(middleware::from_fn(www_redirect));

    Router::new()
        .route("/health", get(health_check))
        .merge(rebuild_routes(state.rebuild))
        .merge(git)
        // Has a fallback, so it goes last.
        .merge(site_routes(state.site))
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
