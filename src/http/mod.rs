//! # HTTP Execution
//!
//! The resilient request path: URL templating, retry policy, redaction,
//! the session-scoped client, and the response view assertions run against.

pub mod client;
pub mod method;
pub mod redact;
pub mod request;
pub mod response;
pub mod retry;
pub mod url;

pub use client::ApiClient;
pub use method::HttpMethod;
pub use request::{RequestBody, RequestSpec};
pub use response::ApiResponse;
pub use retry::{AttemptOutcome, RetryPolicy};
