//! # Request Specification
//!
//! Everything a single HTTP call needs, assembled with builder-style
//! setters. The body is a tagged variant so exactly one of
//! JSON / raw bytes / form-encoding is ever populated.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use super::method::HttpMethod;

/// The mutually exclusive body variants of a request.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Raw(Vec<u8>),
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub endpoint: String,
    pub path_params: HashMap<String, String>,
    /// Ordered pairs; ordering is preserved so logs and any request
    /// signing see the same query string.
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    pub timeout: Option<Duration>,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            path_params: HashMap::new(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            timeout: None,
        }
    }

    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    pub fn raw(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = RequestBody::Raw(bytes.into());
        self
    }

    pub fn form(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(pairs);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
