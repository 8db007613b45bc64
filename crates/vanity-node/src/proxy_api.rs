//! Git smart-HTTP proxy endpoints.
//!
//! - `GET  <mount>/info/refs?service=git-upload-pack` - rewritten advertisement
//! - `POST <mount>/git-upload-pack` - pack negotiation, forwarded as is
//!
//! Both are also served under `<mount>.git`.

use axum::{
    extract::{RawQuery, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use vanity_git::{Advertisement, DefaultBranch, GitError, UPLOAD_PACK_SERVICE};

use crate::upstream::Upstream;

/// Content type of an upload-pack advertisement.
pub const ADVERTISEMENT_CONTENT_TYPE: &str = "application/x-git-upload-pack-advertisement";

/// Proxy errors.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The advertisement request did not ask for upload-pack.
    #[error("invalid query: {0:?}")]
    InvalidQuery(String),
    /// The upstream could not be reached.
    #[error("upstream get error: {0}")]
    UpstreamGet(#[source] reqwest::Error),
    /// The upstream body could not be read.
    #[error("upstream read error: {0}")]
    UpstreamRead(#[source] reqwest::Error),
    /// The upstream advertisement exceeds the configured bound.
    #[error("upstream read error: advertisement exceeds {0} bytes")]
    TooLarge(usize),
    /// The advertisement could not be decoded or rewritten.
    #[error(transparent)]
    Git(#[from] GitError),
    /// Pack negotiation could not be forwarded.
    #[error("upstream forward error: {0}")]
    Forward(#[source] reqwest::Error),
}

impl ProxyError {
    /// Status returned to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidQuery(_) => StatusCode::FORBIDDEN,
            ProxyError::Forward(_) => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamGet(_)
            | ProxyError::UpstreamRead(_)
            | ProxyError::TooLarge(_)
            | ProxyError::Git(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Git proxy request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Git proxy request rejected");
        }
        (status, self.to_string()).into_response()
    }
}

/// Shared state for proxy routes.
#[derive(Clone)]
pub struct ProxyState {
    /// Upstream repository client.
    pub upstream: Arc<Upstream>,
    /// Rewrite applied to every advertisement.
    pub default_branch: Arc<DefaultBranch>,
}

/// Create the proxy router for a repository mounted at `mount`.
pub fn proxy_routes<S>(mount: &str, state: ProxyState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let mut router = Router::new();
    for base in [mount.to_string(), format!("{}.git", mount)] {
        router = router
            .route(&format!("{}/info/refs", base), get(info_refs))
            .route(&format!("{}/git-upload-pack", base), any(upload_pack));
    }
    router.with_state(state)
}

/// Checks that the query is exactly `service=git-upload-pack`.
pub fn check_service_query(query: Option<&str>) -> Result<(), ProxyError> {
    let raw = query.unwrap_or_default();
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect();

    match pairs.as_slice() {
        [(key, value)] if key == "service" && value == UPLOAD_PACK_SERVICE => Ok(()),
        _ => Err(ProxyError::InvalidQuery(raw.to_string())),
    }
}

/// Serves the upstream advertisement with the default branch rewritten.
async fn info_refs(
    State(state): State<ProxyState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ProxyError> {
    check_service_query(query.as_deref())?;

    let fetched = state.upstream.fetch_advertisement().await?;
    if fetched.status != StatusCode::OK {
        tracing::warn!(status = %fetched.status, "Relaying upstream advertisement failure");
        return Ok((fetched.status, fetched.body).into_response());
    }

    let advertisement = Advertisement::decode(&fetched.body, UPLOAD_PACK_SERVICE)?;
    let advertisement = state.default_branch.apply(advertisement)?;
    let body = advertisement.encode()?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, ADVERTISEMENT_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

/// Forwards pack negotiation to the upstream.
async fn upload_pack(
    State(state): State<ProxyState>,
    request: Request,
) -> Result<Response, ProxyError> {
    state.upstream.forward_upload_pack(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_service_query() {
        assert!(check_service_query(Some("service=git-upload-pack")).is_ok());
        assert!(check_service_query(Some("service=git-upload-pack&")).is_ok());

        for query in [
            None,
            Some(""),
            Some("service=git-receive-pack"),
            Some("service=git-upload-pack&x=1"),
            Some("service=git-upload-pack&service=git-upload-pack"),
            Some("x=1"),
        ] {
            let err = check_service_query(query).unwrap_err();
            assert_eq!(err.status(), StatusCode::FORBIDDEN, "{:?}", query);
            assert!(err.to_string().starts_with("invalid query: "));
        }
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(
            ProxyError::TooLarge(10).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let err = ProxyError::from(GitError::TargetNotFound("refs/heads/go".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "invalid target reference: refs/heads/go"
        );
    }
}
