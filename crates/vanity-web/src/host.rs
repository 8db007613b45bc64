//! Canonical host redirect.

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

const WWW_PREFIX: &str = "www.";

/// Returns the bare domain for a `www.` host.
pub fn strip_www(host: &str) -> Option<&str> {
    host.strip_prefix(WWW_PREFIX).filter(|rest| !rest.is_empty())
}

/// Redirects `www.<domain>` requests to `https://<domain>` permanently.
pub async fn www_redirect(request: Request, next: Next) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().host());

    if let Some(bare) = host.and_then(strip_www) {
        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let location = format!("https://{}{}", bare, path_and_query);

        tracing::debug!(location = %location, "Redirecting to bare domain");
        return (
            StatusCode::MOVED_PERMANENTLY,
            [(header::LOCATION, location)],
        )
            .into_response();
    }

    next.run(request).await
}
