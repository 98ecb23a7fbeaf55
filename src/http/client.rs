//! # HTTP Client
//!
//! Session-scoped executor for Request Specifications: owns the connection
//! pool, carries the session's default headers (auth included), templates
//! URLs, logs redacted copies of everything it sends and receives, and
//! retries transient failures under the configured policy. Non-2xx
//! responses are returned as data; judging them is the assertion engine's
//! job.

use std::thread;
use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};

use crate::auth::AuthSettings;
use crate::config::Config;
use crate::error::{Error, Result};

use super::method::HttpMethod;
use super::redact;
use super::request::{RequestBody, RequestSpec};
use super::response::ApiResponse;
use super::retry::{AttemptOutcome, RetryPolicy};
use super::url::build_url;

/// Characters of response body shown in log previews.
const BODY_PREVIEW_CHARS: usize = 512;

#[derive(Debug)]
pub struct ApiClient {
    inner: Option<reqwest::blocking::Client>,
    base_url: String,
    default_headers: HeaderMap,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Build a client from the `api.*`, `headers`, and `auth.*` sections.
    /// A configured auth credential lands in the session's default headers.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = config.get_str("api.base_url", "");
        let timeout_secs = config.get_u64("api.timeout", 30);
        if timeout_secs == 0 {
            return Err(Error::ConfigInvalid {
                context: "api.timeout".to_string(),
                reason: "must be a positive number of seconds".to_string(),
            });
        }

        let retry_count =
            u32::try_from(config.get_u64("api.retry_count", 3)).unwrap_or(u32::MAX);
        let retry = RetryPolicy::new(retry_count, config.get_f64("api.retry_delay", 2.0));

        let mut default_headers = HeaderMap::new();
        for (name, value) in config.get_string_map("headers") {
            insert_header(&mut default_headers, &name, &value)?;
        }
        AuthSettings::from_config(config).apply(&mut default_headers)?;

        let inner = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| Error::ConfigInvalid {
                context: "api".to_string(),
                reason: format!("failed to build HTTP client: {err}"),
            })?;

        Ok(Self {
            inner: Some(inner),
            base_url,
            default_headers,
            timeout: Duration::from_secs(timeout_secs),
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Replace the bearer token in the session defaults. Callers must not
    /// invoke this while a request on the same client is in flight.
    pub fn update_token(&mut self, token: &str) -> Result<()> {
        let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|err| {
            Error::InvalidHeader {
                name: AUTHORIZATION.as_str().to_string(),
                reason: err.to_string(),
            }
        })?;
        self.default_headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    /// Release the connection pool. Every later call on this client fails
    /// with [`Error::ClientClosed`].
    pub fn close(&mut self) {
        self.inner = None;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    pub fn get(&self, endpoint: &str) -> Result<ApiResponse> {
        self.request(&RequestSpec::new(HttpMethod::Get, endpoint))
    }

    pub fn post(&self, endpoint: &str, body: RequestBody) -> Result<ApiResponse> {
        let mut spec = RequestSpec::new(HttpMethod::Post, endpoint);
        spec.body = body;
        self.request(&spec)
    }

    pub fn put(&self, endpoint: &str, body: RequestBody) -> Result<ApiResponse> {
        let mut spec = RequestSpec::new(HttpMethod::Put, endpoint);
        spec.body = body;
        self.request(&spec)
    }

    pub fn patch(&self, endpoint: &str, body: RequestBody) -> Result<ApiResponse> {
        let mut spec = RequestSpec::new(HttpMethod::Patch, endpoint);
        spec.body = body;
        self.request(&spec)
    }

    pub fn delete(&self, endpoint: &str) -> Result<ApiResponse> {
        self.request(&RequestSpec::new(HttpMethod::Delete, endpoint))
    }

    pub fn head(&self, endpoint: &str) -> Result<ApiResponse> {
        self.request(&RequestSpec::new(HttpMethod::Head, endpoint))
    }

    pub fn options(&self, endpoint: &str) -> Result<ApiResponse> {
        self.request(&RequestSpec::new(HttpMethod::Options, endpoint))
    }

    /// Execute one Request Specification: build the URL, merge headers,
    /// log a redacted copy, send under the retry policy, log the response,
    /// return it. Elapsed time spans the first send through the final
    /// receive, backoff sleeps included.
    pub fn request(&self, spec: &RequestSpec) -> Result<ApiResponse> {
        let client = self.inner.as_ref().ok_or(Error::ClientClosed)?;

        if self.base_url.is_empty()
            && !spec.endpoint.starts_with("http://")
            && !spec.endpoint.starts_with("https://")
        {
            return Err(Error::ConfigInvalid {
                context: "api.base_url".to_string(),
                reason: format!(
                    "required for relative endpoint `{}`",
                    spec.endpoint
                ),
            });
        }

        let url = build_url(&self.base_url, &spec.endpoint, &spec.path_params)?;
        let headers = self.effective_headers(&spec.headers)?;
        let timeout = spec.timeout.unwrap_or(self.timeout);

        tracing::info!(
            method = %spec.method,
            url = %url,
            headers = ?redact::redact_headers(&headers),
            query = ?spec.query,
            body = %loggable_body(&spec.body),
            "request"
        );

        let start = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            let mut builder = client
                .request(spec.method.into(), &url)
                .headers(headers.clone())
                .timeout(timeout);
            if !spec.query.is_empty() {
                builder = builder.query(&spec.query);
            }
            builder = match &spec.body {
                RequestBody::Empty => builder,
                RequestBody::Json(value) => builder.json(value),
                RequestBody::Raw(bytes) => builder.body(bytes.clone()),
                RequestBody::Form(pairs) => builder.form(pairs),
            };

            match builder.send() {
                Ok(response) => {
                    let status = response.status();
                    let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
                    let response_headers = response.headers().clone();
                    let bytes = response.bytes().map_err(|err| {
                        Error::TransportConnection {
                            method: spec.method,
                            url: url.clone(),
                            attempts: attempt + 1,
                            source: err,
                        }
                    })?;

                    let outcome = AttemptOutcome::Status(status.as_u16());
                    if let Some(delay) = self.retry.should_retry(attempt, spec.method, outcome) {
                        tracing::warn!(
                            status = status.as_u16(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "transient status, retrying"
                        );
                        thread::sleep(delay);
                        attempt += 1;
                        continue;
                    }

                    let api_response = ApiResponse::new(
                        status.as_u16(),
                        reason,
                        response_headers,
                        bytes.to_vec(),
                        start.elapsed(),
                    );
                    tracing::info!(
                        status = api_response.status(),
                        reason = api_response.reason(),
                        elapsed_ms = api_response.elapsed_ms() as u64,
                        headers = ?redact::redact_headers(api_response.headers()),
                        body = %loggable_response_body(&api_response),
                        "response"
                    );
                    return Ok(api_response);
                }
                Err(err) => {
                    let outcome = if err.is_timeout() {
                        AttemptOutcome::Timeout
                    } else {
                        AttemptOutcome::ConnectionError
                    };
                    if let Some(delay) = self.retry.should_retry(attempt, spec.method, outcome) {
                        tracing::warn!(
                            error = %err,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "transport failure, retrying"
                        );
                        thread::sleep(delay);
                        attempt += 1;
                        continue;
                    }
                    return Err(match outcome {
                        AttemptOutcome::Timeout => Error::TransportTimeout {
                            method: spec.method,
                            url,
                            attempts: attempt + 1,
                            source: err,
                        },
                        _ => Error::TransportConnection {
                            method: spec.method,
                            url,
                            attempts: attempt + 1,
                            source: err,
                        },
                    });
                }
            }
        }
    }

    /// Session defaults overlaid by per-call headers.
    fn effective_headers(&self, extra: &[(String, String)]) -> Result<HeaderMap> {
        let mut headers = self.default_headers.clone();
        for (name, value) in extra {
            insert_header(&mut headers, name, value)?;
        }
        Ok(headers)
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<()> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|err| Error::InvalidHeader {
            name: name.to_string(),
            reason: err.to_string(),
        })?;
    let header_value = HeaderValue::from_str(value).map_err(|err| Error::InvalidHeader {
        name: name.to_string(),
        reason: err.to_string(),
    })?;
    headers.insert(header_name, header_value);
    Ok(())
}

/// Redacted rendering of a request body for the request log entry.
fn loggable_body(body: &RequestBody) -> String {
    match body {
        RequestBody::Empty => String::new(),
        RequestBody::Json(value) => redact::redact_json(value).to_string(),
        RequestBody::Raw(bytes) => format!("<{} raw bytes>", bytes.len()),
        RequestBody::Form(pairs) => pairs
            .iter()
            .map(|(key, value)| {
                if redact::is_sensitive(key) {
                    format!("{key}={}", redact::MASK)
                } else {
                    format!("{key}={value}")
                }
            })
            .collect::<Vec<_>>()
            .join("&"),
    }
}

/// JSON bodies log as their redacted decode; anything else logs as a
/// bounded text prefix.
fn loggable_response_body(response: &ApiResponse) -> String {
    match serde_json::from_slice::<serde_json::Value>(response.body_bytes()) {
        Ok(value) => redact::redact_json(&value).to_string(),
        Err(_) => response.body_preview(BODY_PREVIEW_CHARS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(tree: serde_json::Value) -> Config {
        Config::from_value("qa", tree)
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ApiClient::from_config(&config(json!({
            "api": { "base_url": "https://h", "timeout": 0 }
        })))
        .unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn retry_settings_come_from_config() {
        let client = ApiClient::from_config(&config(json!({
            "api": { "base_url": "https://h", "retry_count": 5, "retry_delay": 0.5 }
        })))
        .unwrap();
        assert_eq!(client.retry_policy().max_attempts, 5);
        assert_eq!(client.retry_policy().backoff_factor, 0.5);
    }

    #[test]
    fn oversized_retry_count_saturates() {
        let client = ApiClient::from_config(&config(json!({
            "api": { "base_url": "https://h", "retry_count": 10_000_000_000u64 }
        })))
        .unwrap();
        assert_eq!(client.retry_policy().max_attempts, u32::MAX);
    }

    #[test]
    fn bearer_auth_installs_default_header() {
        let client = ApiClient::from_config(&config(json!({
            "api": { "base_url": "https://h" },
            "auth": { "type": "bearer", "token": "T" }
        })))
        .unwrap();
        assert_eq!(
            client.default_headers.get(AUTHORIZATION).unwrap(),
            "Bearer T"
        );
    }

    #[test]
    fn update_token_replaces_bearer_value() {
        let mut client = ApiClient::from_config(&config(json!({
            "api": { "base_url": "https://h" },
            "auth": { "type": "bearer", "token": "old" }
        })))
        .unwrap();
        client.update_token("new").unwrap();
        assert_eq!(
            client.default_headers.get(AUTHORIZATION).unwrap(),
            "Bearer new"
        );
    }

    #[test]
    fn client_is_debug_printable() {
        let client = ApiClient::from_config(&config(json!({
            "api": { "base_url": "https://h" }
        })))
        .unwrap();
        let rendered = format!("{client:?}");
        assert!(rendered.contains("ApiClient"));
    }

    #[test]
    fn closed_client_refuses_requests() {
        let mut client = ApiClient::from_config(&config(json!({
            "api": { "base_url": "https://h" }
        })))
        .unwrap();
        client.close();
        assert!(client.is_closed());
        let err = client.get("v1/devices").unwrap_err();
        assert!(matches!(err, Error::ClientClosed));
    }

    #[test]
    fn relative_endpoint_without_base_url_fails() {
        let client =
            ApiClient::from_config(&config(json!({ "api": { "timeout": 5 } }))).unwrap();
        let err = client.get("v1/devices").unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn loggable_body_masks_sensitive_fields() {
        let body = RequestBody::Json(json!({"password": "pw", "amount": 10}));
        let rendered = loggable_body(&body);
        assert!(rendered.contains(redact::MASK));
        assert!(!rendered.contains("\"pw\""));
        assert!(rendered.contains("10"));
    }

    #[test]
    fn loggable_form_masks_sensitive_keys() {
        let body = RequestBody::Form(vec![
            ("client_secret".to_string(), "s".to_string()),
            ("grant_type".to_string(), "password_grant".to_string()),
        ]);
        let rendered = loggable_body(&body);
        assert!(rendered.starts_with(&format!("client_secret={}", redact::MASK)));
        assert!(rendered.contains("grant_type=password_grant"));
    }
}
