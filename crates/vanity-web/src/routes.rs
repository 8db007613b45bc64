//! Site router: redirects, go-get responder and static files.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::error::WebError;
use crate::go_get::{is_go_get, GoImport};
use crate::host::www_redirect;
use crate::redirects::{Redirect, RedirectTable};

/// Shared, read-only state for site routes.
#[derive(Clone)]
pub struct SiteState {
    /// Path and prefix redirects.
    pub redirects: Arc<RedirectTable>,
    /// Declaration served to `go get`, if any.
    pub go_import: Option<Arc<GoImport>>,
    /// Directory served for every other path.
    pub static_dir: PathBuf,
}

/// Create the site router.
///
/// The router has a fallback, so it must be merged last.
pub fn site_routes<S>(state: SiteState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let files = ServeDir::new(&state.static_dir);

    Router::new()
        .fallback_service(files)
        .layer(middleware::from_fn_with_state(state, site_middleware))
        .layer(middleware::from_fn(www_redirect))
}

async fn site_middleware(State(state): State<SiteState>, request: Request, next: Next) -> Response {
    let query = request.uri().query();

    if let Some(go_import) = state.go_import.as_deref() {
        if is_go_get(query) {
            return Html(go_import.page()).into_response();
        }
    }

    match state.redirects.resolve(request.uri().path(), query) {
        Some(Redirect::Found(location)) => {
            tracing::debug!(path = %request.uri().path(), location = %location, "Redirecting");
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
        Some(Redirect::InvalidId(id)) => WebError::NotFound(id).into_response(),
        None => next.run(request).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use tower::ServiceExt;

    fn app(static_dir: PathBuf) -> Router {
        let state = SiteState {
            redirects: Arc::new(
                RedirectTable::new()
                    .with_path("/issue", "https://tracker.example.com/issues")
                    .with_prefix("issue", "https://tracker.example.com/issues/%s"),
            ),
            go_import: Some(Arc::new(GoImport::new(
                "example.dev/project",
                "https://example.dev/project",
            ))),
            static_dir,
        };
        site_routes(state)
    }

    async fn body_string(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_redirect_with_query() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path().to_path_buf())
            .oneshot(get("/issue/7?utm=x"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://tracker.example.com/issues/7?utm=x"
        );
    }

    #[tokio::test]
    async fn test_invalid_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path().to_path_buf())
            .oneshot(get("/issue/a.b"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_go_get_page() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path().to_path_buf())
            .oneshot(get("/issue/7?go-get=1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains(r#"content="example.dev/project git https://example.dev/project""#));
    }

    #[tokio::test]
    async fn test_www_redirect() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder()
            .uri("/docs/?a=b")
            .header(header::HOST, "www.example.dev")
            .body(Body::empty())
            .unwrap();
        let response = app(dir.path().to_path_buf()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://example.dev/docs/?a=b"
        );
    }

    #[tokio::test]
    async fn test_static_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/page.txt"), "page").unwrap();

        let response = app(dir.path().to_path_buf()).oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "<h1>home</h1>");

        let response = app(dir.path().to_path_buf())
            .oneshot(get("/docs/page.txt"))
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "page");

        let response = app(dir.path().to_path_buf())
            .oneshot(get("/missing"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
