//! # Gatecheck
//!
//! Engine for behavioral API-test scenarios against a payment-gateway
//! backend. Scenario runners feed it an environment name and a tag filter;
//! it hands back a configured, retrying, redacting HTTP client per
//! scenario, a fluent assertion evaluator per response, and structured
//! result records for report generation.
//!
//! The scenario DSL parser, report writers, and test-data generation live
//! outside this crate.

pub mod assertions;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod report;
pub mod scenario;

pub use assertions::{AssertionFailure, JsonType, Verify, verify};
pub use auth::{AuthSettings, TokenCache, TokenSet};
pub use config::Config;
pub use error::{Error, Result};
pub use http::{ApiClient, ApiResponse, HttpMethod, RequestBody, RequestSpec, RetryPolicy};
pub use report::{RunSummary, ScenarioResult};
pub use scenario::{Harness, RunOptions, ScenarioContext};
