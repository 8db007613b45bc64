//! Git protocol support for Vanity.
//!
//! This crate decodes the smart HTTP reference advertisement served by an
//! upstream git host, rewrites which branch it presents as the default, and
//! encodes the result back into pkt-lines that stock git clients accept.
//!
//! ```
//! use vanity_git::{Advertisement, DefaultBranch, UPLOAD_PACK_SERVICE};
//!
//! # fn run(body: &[u8]) -> vanity_git::Result<bytes::Bytes> {
//! let adv = Advertisement::decode(body, UPLOAD_PACK_SERVICE)?;
//! let adv = DefaultBranch::new("refs/heads/go").apply(adv)?;
//! adv.encode()
//! # }
//! ```

mod advertisement;
mod error;
mod pktline;
mod rewrite;

pub use advertisement::{
    Advertisement, Record, RecordReader, RefEntry, HEAD, SYMREF_PREFIX, UPLOAD_PACK_SERVICE,
};
pub use error::GitError;
pub use pktline::{PktLine, PktLineCursor, PktLineWriter, FLUSH_PKT, MAX_PAYLOAD_LEN};
pub use rewrite::DefaultBranch;

/// Result type for git protocol operations.
pub type Result<T> = std::result::Result<T, GitError>;
