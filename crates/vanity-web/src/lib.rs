//! # Vanity Web
//!
//! Site surfaces served next to the git proxy.
//!
//! ## Features
//!
//! - **Redirects**: exact path redirects and `/<prefix>/<id>` templates
//! - **go-get**: `go-import` meta page for vanity import paths
//! - **Canonical host**: `www.` requests are sent to the bare domain
//! - **Static files**: everything else is served from a directory
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vanity_web::{site_routes, SiteState};
//!
//! let app = Router::new()
//!     .merge(git_routes)
//!     .merge(site_routes(site_state));
//! ```

pub mod error;
pub mod go_get;
pub mod host;
pub mod redirects;
pub mod routes;

pub use error::WebError;
pub use go_get::{is_go_get, GoImport};
pub use host::{strip_www, www_redirect};
pub use redirects::{Redirect, RedirectTable};
pub use routes::{site_routes, SiteState};
