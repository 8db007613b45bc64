//! # Observability Module
//!
//! Structured logging and request tracking for the Vanity node.
//!
//! - **Structured Logging**: pretty or JSON logs filtered by `RUST_LOG`
//! - **Request Tracing**: request IDs propagated into spans and responses
//!
//! ## Usage
//!
//! ```rust,ignore
//! use axum::Router;
//! use vanity_node::observability::{init_logging, request_id_layer, LogFormat};
//!
//! init_logging("info", LogFormat::Json);
//!
//! let app: Router<()> = Router::new()
//!     .layer(request_id_layer());
//! ```

mod logging;
pub mod middleware;

pub use logging::{init_logging, LogFormat};
pub use middleware::{request_id_layer, RequestId, REQUEST_ID_HEADER};
