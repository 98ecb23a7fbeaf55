//! # Error Types
//!
//! Every failure the engine can surface, as one typed enum. Non-2xx
//! responses are deliberately absent: they are returned as data and judged
//! by the assertion engine, not raised here.

use std::path::PathBuf;

use crate::assertions::AssertionFailure;
use crate::http::method::HttpMethod;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The environment configuration file does not exist.
    #[error("configuration file not found: {path}")]
    ConfigMissing { path: PathBuf },

    /// The configuration file exists but cannot be used as loaded.
    #[error("invalid configuration ({context}): {reason}")]
    ConfigInvalid { context: String, reason: String },

    /// An endpoint template still contains a placeholder after substitution.
    #[error("unresolved placeholder `{{{placeholder}}}` in endpoint `{endpoint}`")]
    UrlTemplate {
        endpoint: String,
        placeholder: String,
    },

    /// A header name or value cannot be put on the wire.
    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The request timed out and the retry budget is spent.
    #[error("{method} {url} timed out after {attempts} attempt(s)")]
    TransportTimeout {
        method: HttpMethod,
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// Connection-level failure that survived the retry budget.
    #[error("{method} {url} failed after {attempts} attempt(s)")]
    TransportConnection {
        method: HttpMethod,
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not decode as JSON.
    #[error("response body is not valid JSON: {reason}")]
    NonJsonBody { reason: String },

    /// A call was made on a client after `close()`.
    #[error("client is closed; no further requests are possible")]
    ClientClosed,

    /// An assertion in a `verify` chain failed.
    #[error(transparent)]
    Assertion(#[from] AssertionFailure),
}
