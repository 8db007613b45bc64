//! HTTP client for the upstream git host.
//!
//! Advertisements are fetched whole, under a size bound and a request
//! timeout, because they are rewritten before being returned. Pack
//! negotiation is streamed in both directions without buffering and without
//! a total timeout, since clones of large repositories run for minutes.

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::Response,
};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use std::time::Duration;
use url::Url;

use crate::config::{ConfigError, RepoConfig};
use crate::proxy_api::ProxyError;

/// User agent sent upstream.
pub const USER_AGENT: &str = concat!("vanity-node/", env!("CARGO_PKG_VERSION"));

/// Headers that describe a single connection and are never forwarded.
static HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// A buffered upstream response.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Upstream status.
    pub status: StatusCode,
    /// Complete upstream body.
    pub body: Bytes,
}

/// Client for one upstream repository.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: reqwest::Client,
    info_refs_url: Url,
    upload_pack_url: Url,
    max_advertisement_bytes: usize,
    timeout: Duration,
}

impl Upstream {
    /// Creates a client from repository configuration.
    pub fn new(config: &RepoConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.connect_timeout())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            info_refs_url: config.info_refs_url()?,
            upload_pack_url: config.upload_pack_url()?,
            max_advertisement_bytes: config.max_advertisement_bytes,
            timeout: config.timeout(),
        })
    }

    /// URL the advertisement is fetched from.
    pub fn info_refs_url(&self) -> &Url {
        &self.info_refs_url
    }

    /// Fetches the upload-pack reference advertisement.
    ///
    /// The body is read completely whatever the status, so that non-200
    /// answers can be relayed as they are.
    pub async fn fetch_advertisement(&self) -> Result<Fetched, ProxyError> {
        let response = self
            .client
            .get(self.info_refs_url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(ProxyError::UpstreamGet)?;

        let status = response.status();
        if let Some(len) = response.content_length() {
            if len > self.max_advertisement_bytes as u64 {
                return Err(ProxyError::TooLarge(self.max_advertisement_bytes));
            }
        }

        let mut body = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(ProxyError::UpstreamRead)?;
            if body.len() + chunk.len() > self.max_advertisement_bytes {
                return Err(ProxyError::TooLarge(self.max_advertisement_bytes));
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(
            url = %self.info_refs_url,
            status = %status,
            bytes = body.len(),
            "Fetched upstream advertisement"
        );

        Ok(Fetched {
            status,
            body: body.freeze(),
        })
    }

    /// Forwards an upload-pack exchange, streaming both bodies.
    ///
    /// Method, query, headers and body reach the upstream unchanged apart
    /// from hop-by-hop headers and `Host`.
    pub async fn forward_upload_pack(&self, request: Request) -> Result<Response, ProxyError> {
        let (parts, body) = request.into_parts();

        let mut url = self.upload_pack_url.clone();
        url.set_query(parts.uri.query());

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);

        let upstream = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(reqwest::Body::wrap_stream(body.into_data_stream()))
            .send()
            .await
            .map_err(ProxyError::Forward)?;

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);

        tracing::debug!(status = %status, "Forwarding upload-pack response");

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// Removes hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}
