//! Site rebuild trigger.
//!
//! `POST /rebuild` asks the configured CI webhook to rebuild the site from
//! its branch. Nothing is rebuilt in-process.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::{ConfigError, RebuildConfig};
use crate::upstream::USER_AGENT;

const TRIGGER_TIMEOUT: Duration = Duration::from_secs(30);

/// Rebuild errors.
#[derive(Debug, thiserror::Error)]
pub enum RebuildError {
    /// No webhook is configured.
    #[error("rebuild is not configured")]
    NotConfigured,
    /// The webhook could not be reached.
    #[error("trigger error: {0}")]
    Request(#[from] reqwest::Error),
    /// The webhook answered with a failure.
    #[error("trigger error: webhook returned {0}")]
    Rejected(reqwest::StatusCode),
}

impl IntoResponse for RebuildError {
    fn into_response(self) -> Response {
        let status = match &self {
            RebuildError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            RebuildError::Request(_) | RebuildError::Rejected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        tracing::error!(error = %self, "Rebuild failed");
        (status, self.to_string()).into_response()
    }
}

#[derive(Serialize)]
struct TriggerRequest<'a> {
    branch: &'a str,
}

/// Client for the CI webhook.
#[derive(Debug, Clone)]
pub struct RebuildTrigger {
    client: reqwest::Client,
    url: Url,
    token: Option<String>,
    branch: String,
}

impl RebuildTrigger {
    /// Creates a trigger from configuration.
    pub fn new(config: &RebuildConfig) -> Result<Self, ConfigError> {
        let url = Url::parse(&config.url)
            .map_err(|e| ConfigError::Invalid(format!("rebuild.url: {}", e)))?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(TRIGGER_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            token: config.token.clone(),
            branch: config.branch.clone(),
        })
    }

    /// Fires the webhook once.
    pub async fn trigger(&self) -> Result<(), RebuildError> {
        let mut request = self.client.post(self.url.clone()).json(&TriggerRequest {
            branch: &self.branch,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RebuildError::Rejected(response.status()));
        }

        tracing::info!(branch = %self.branch, "Rebuild triggered");
        Ok(())
    }
}

/// Create the rebuild router.
pub fn rebuild_routes<S>(trigger: Option<Arc<RebuildTrigger>>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/rebuild", post(rebuild))
        .with_state(trigger)
}

async fn rebuild(
    State(trigger): State<Option<Arc<RebuildTrigger>>>,
) -> Result<impl IntoResponse, RebuildError> {
    let trigger = trigger.ok_or(RebuildError::NotConfigured)?;
    trigger.trigger().await?;
    Ok((StatusCode::OK, "rebuild triggered"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::Request};
    use tower::ServiceExt;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: String) -> RebuildConfig {
        RebuildConfig {
            url,
            token: Some("secret".to_string()),
            branch: "main".to_string(),
        }
    }

    fn post_rebuild() -> Request {
        Request::builder()
            .method("POST")
            .uri("/rebuild")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_trigger_sends_branch_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/rebuild"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(serde_json::json!({"branch": "main"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let trigger = RebuildTrigger::new(&config(format!("{}/hooks/rebuild", server.uri()))).unwrap();
        let app: Router = rebuild_routes(Some(Arc::new(trigger)));
        let response = app.oneshot(post_rebuild()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_trigger_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let trigger = RebuildTrigger::new(&config(server.uri())).unwrap();
        let app: Router = rebuild_routes(Some(Arc::new(trigger)));
        let response = app.oneshot(post_rebuild()).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&body).starts_with("trigger error: "));
    }

    #[tokio::test]
    async fn test_not_configured() {
        let app: Router = rebuild_routes(None);
        let response = app.oneshot(post_rebuild()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
