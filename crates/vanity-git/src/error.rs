//! Git protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding or rewriting a reference advertisement.
#[derive(Debug, Error)]
pub enum GitError {
    /// The buffer ended before a complete pkt-line could be read.
    #[error("truncated pkt-line: need {needed} bytes, {available} available")]
    Truncated {
        /// Bytes required to finish the current pkt-line.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// Invalid pkt-line length prefix.
    #[error("invalid pkt-line: {0}")]
    InvalidPktLine(String),

    /// The advertisement did not start with the expected service header.
    #[error("invalid upstream header: {0}")]
    UnexpectedHeader(String),

    /// A reference record could not be parsed.
    #[error("invalid reference: {0}")]
    MalformedRef(String),

    /// The configured rewrite target is not advertised by the upstream.
    #[error("invalid target reference: {0}")]
    TargetNotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
