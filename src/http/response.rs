//! # Response View
//!
//! What a finished call hands back: status, reason phrase, headers, raw
//! body bytes, and the wall-clock elapsed time measured by the client.
//! JSON decoding is memoized; it runs at most once and a decode failure is
//! replayed identically on every later access.

use std::cell::OnceCell;
use std::time::Duration;

use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct ApiResponse {
    status: u16,
    reason: String,
    headers: HeaderMap,
    body: Vec<u8>,
    elapsed: Duration,
    json: OnceCell<std::result::Result<Value, String>>,
}

impl ApiResponse {
    pub fn new(
        status: u16,
        reason: impl Into<String>,
        headers: HeaderMap,
        body: Vec<u8>,
        elapsed: Duration,
    ) -> Self {
        Self {
            status,
            reason: reason.into(),
            headers,
            body,
            elapsed,
            json: OnceCell::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// 2xx.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header lookup; names are case-insensitive. Non-UTF-8 values read as
    /// absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Bounded lossy prefix of the body, for diagnostics and logs.
    pub fn body_preview(&self, max_chars: usize) -> String {
        let text = String::from_utf8_lossy(&self.body);
        if text.chars().count() <= max_chars {
            text.into_owned()
        } else {
            let prefix: String = text.chars().take(max_chars).collect();
            format!("{prefix}…")
        }
    }

    /// Decode the body as JSON exactly once. Repeated calls return the same
    /// value; a failed decode yields the same `NonJsonBody` error each time.
    pub fn json(&self) -> Result<&Value> {
        self.json
            .get_or_init(|| {
                serde_json::from_slice(&self.body).map_err(|err| err.to_string())
            })
            .as_ref()
            .map_err(|reason| Error::NonJsonBody {
                reason: reason.clone(),
            })
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}
