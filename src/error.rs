//! Error taxonomy for the client.
//!
//! Four failure classes cover every path:
//! - [`ClientError::Validation`] — a local precondition failed; no request
//!   was (or will be) sent.
//! - [`ClientError::Transport`] — the request never produced an HTTP
//!   response (connection refused, DNS, timeout).
//! - [`ClientError::Server`] — a non-2xx response; status and body are both
//!   carried into the message.
//! - [`ClientError::MalformedResponse`] — a 2xx response whose body does not
//!   parse as the expected shape.
//!
//! [`IngestError`] wraps these for the pipeline and adds the two outcomes
//! that are not service failures: a busy pipeline and a superseded run.

use thiserror::Error;

/// Failure talking to (or refusing to talk to) the Lexica backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Local precondition failure. Never reaches the network.
    #[error("{0}")]
    Validation(String),

    /// Network-level failure: the request could not be completed.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status. The body is the
    /// implementation-defined error detail, surfaced verbatim.
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    /// A 2xx response whose body could not be decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Terminal outcome of a pipeline run that did not reach `Ready`.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A run is already in flight; concurrent starts are rejected, not
    /// interleaved.
    #[error("ingestion already in progress")]
    Busy,

    /// The run was abandoned by a `reset` (or a newer run) while a request
    /// was in flight. No state was touched by the late response.
    #[error("ingestion superseded by reset")]
    Superseded,

    /// A stage failed; the pipeline is in `Failed` until reset.
    #[error(transparent)]
    Client(#[from] ClientError),
}
