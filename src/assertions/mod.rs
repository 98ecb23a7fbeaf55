//! # Assertion Engine
//!
//! Fluent checks over a response view. Every check returns `Result<&Self>`
//! so chains compose with `?`: a failing check halts the chain with an
//! [`AssertionFailure`], a passing one hands back the same evaluator.
//!
//! ```no_run
//! # use gatecheck::assertions::verify;
//! # fn demo(response: &gatecheck::http::ApiResponse) -> Result<(), gatecheck::Error> {
//! verify(response)
//!     .status_is(200)?
//!     .json_has_key("devices")?
//!     .json_path_equals("devices.0.id", &serde_json::json!("d1"))?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::fmt::{self, Display};

use serde_json::Value;

use crate::http::ApiResponse;

/// Characters of response body carried in a failure diagnostic.
const DIAGNOSTIC_PREVIEW_CHARS: usize = 200;

/// A failed check, with the expectation, the observation, and a bounded
/// body preview for context.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{check} failed: expected {expected}, got {actual} (body: {body_preview})")]
pub struct AssertionFailure {
    pub check: String,
    pub expected: String,
    pub actual: String,
    pub body_preview: String,
}

/// Semantic JSON types for `json_is_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
}

impl JsonType {
    fn matches(self, value: &Value) -> bool {
        match self {
            JsonType::Object => value.is_object(),
            JsonType::Array => value.is_array(),
            JsonType::String => value.is_string(),
            JsonType::Number => value.is_number(),
            JsonType::Boolean => value.is_boolean(),
            JsonType::Null => value.is_null(),
        }
    }
}

impl Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::String => "string",
            JsonType::Number => "number",
            JsonType::Boolean => "boolean",
            JsonType::Null => "null",
        };
        write!(f, "{label}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null => "null",
    }
}

/// Start a fluent assertion chain over a response.
pub fn verify(response: &ApiResponse) -> Verify<'_> {
    Verify { response }
}

#[derive(Debug)]
pub struct Verify<'a> {
    response: &'a ApiResponse,
}

type Check<'a, 'b> = Result<&'b Verify<'a>, AssertionFailure>;

impl<'a> Verify<'a> {
    fn fail(
        &self,
        check: &str,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> AssertionFailure {
        AssertionFailure {
            check: check.to_string(),
            expected: expected.into(),
            actual: actual.into(),
            body_preview: self.response.body_preview(DIAGNOSTIC_PREVIEW_CHARS),
        }
    }

    fn body_json(&self, check: &str) -> Result<&'a Value, AssertionFailure> {
        self.response
            .json()
            .map_err(|err| self.fail(check, "a JSON body", err.to_string()))
    }

    fn top_level(&self, check: &str, key: &str) -> Result<&'a Value, AssertionFailure> {
        let body = self.body_json(check)?;
        let object = body
            .as_object()
            .ok_or_else(|| self.fail(check, "a JSON object", type_name(body)))?;
        object
            .get(key)
            .ok_or_else(|| self.fail(check, format!("key `{key}`"), "key absent"))
    }

    pub fn status_is(&self, expected: u16) -> Check<'a, '_> {
        if self.response.status() == expected {
            Ok(self)
        } else {
            Err(self.fail(
                "status_is",
                expected.to_string(),
                format!("{} {}", self.response.status(), self.response.reason()),
            ))
        }
    }

    pub fn status_in(&self, expected: &[u16]) -> Check<'a, '_> {
        let set: HashSet<u16> = expected.iter().copied().collect();
        if set.contains(&self.response.status()) {
            Ok(self)
        } else {
            Err(self.fail(
                "status_in",
                format!("one of {expected:?}"),
                self.response.status().to_string(),
            ))
        }
    }

    pub fn ok(&self) -> Check<'a, '_> {
        if self.response.ok() {
            Ok(self)
        } else {
            Err(self.fail(
                "ok",
                "a 2xx status",
                format!("{} {}", self.response.status(), self.response.reason()),
            ))
        }
    }

    pub fn header_exists(&self, name: &str) -> Check<'a, '_> {
        if self.response.header(name).is_some() {
            Ok(self)
        } else {
            Err(self.fail("header_exists", format!("header `{name}`"), "absent"))
        }
    }

    pub fn header_equals(&self, name: &str, expected: &str) -> Check<'a, '_> {
        match self.response.header(name) {
            Some(actual) if actual == expected => Ok(self),
            Some(actual) => Err(self.fail(
                "header_equals",
                format!("`{name}: {expected}`"),
                format!("`{actual}`"),
            )),
            None => Err(self.fail(
                "header_equals",
                format!("`{name}: {expected}`"),
                "header absent",
            )),
        }
    }

    pub fn content_type_is(&self, fragment: &str) -> Check<'a, '_> {
        match self.response.header("content-type") {
            Some(actual) if actual.contains(fragment) => Ok(self),
            Some(actual) => Err(self.fail(
                "content_type_is",
                format!("Content-Type containing `{fragment}`"),
                format!("`{actual}`"),
            )),
            None => Err(self.fail(
                "content_type_is",
                format!("Content-Type containing `{fragment}`"),
                "header absent",
            )),
        }
    }

    pub fn json_has_key(&self, key: &str) -> Check<'a, '_> {
        self.top_level("json_has_key", key)?;
        Ok(self)
    }

    pub fn json_has_keys(&self, keys: &[&str]) -> Check<'a, '_> {
        for key in keys {
            self.json_has_key(key)?;
        }
        Ok(self)
    }

    pub fn json_equals(&self, key: &str, expected: &Value) -> Check<'a, '_> {
        let actual = self.top_level("json_equals", key)?;
        if actual == expected {
            Ok(self)
        } else {
            Err(self.fail(
                "json_equals",
                format!("`{key}` = {expected}"),
                actual.to_string(),
            ))
        }
    }

    pub fn json_not_null(&self, key: &str) -> Check<'a, '_> {
        let actual = self.top_level("json_not_null", key)?;
        if actual.is_null() {
            Err(self.fail("json_not_null", format!("`{key}` non-null"), "null"))
        } else {
            Ok(self)
        }
    }

    pub fn json_is_type(&self, key: &str, expected: JsonType) -> Check<'a, '_> {
        let actual = self.top_level("json_is_type", key)?;
        if expected.matches(actual) {
            Ok(self)
        } else {
            Err(self.fail(
                "json_is_type",
                format!("`{key}` of type {expected}"),
                type_name(actual),
            ))
        }
    }

    /// Navigate a dot-separated path and compare. Object segments are
    /// case-sensitive keys; numeric segments index into arrays.
    pub fn json_path_equals(&self, path: &str, expected: &Value) -> Check<'a, '_> {
        self.json_path_equals_sep(path, ".", expected)
    }

    pub fn json_path_equals_sep(
        &self,
        path: &str,
        separator: &str,
        expected: &Value,
    ) -> Check<'a, '_> {
        let actual = self.navigate("json_path_equals", path, separator)?;
        if actual == expected {
            Ok(self)
        } else {
            Err(self.fail(
                "json_path_equals",
                format!("`{path}` = {expected}"),
                actual.to_string(),
            ))
        }
    }

    fn navigate(
        &self,
        check: &str,
        path: &str,
        separator: &str,
    ) -> Result<&'a Value, AssertionFailure> {
        let mut current = self.body_json(check)?;
        for segment in path.split(separator) {
            current = match current {
                Value::Object(map) => map.get(segment).ok_or_else(|| {
                    self.fail(
                        check,
                        format!("value at `{path}`"),
                        format!("no key `{segment}` along the path"),
                    )
                })?,
                Value::Array(items) => {
                    let index: usize = segment.parse().map_err(|_| {
                        self.fail(
                            check,
                            format!("value at `{path}`"),
                            format!("array reached but `{segment}` is not an index"),
                        )
                    })?;
                    items.get(index).ok_or_else(|| {
                        self.fail(
                            check,
                            format!("value at `{path}`"),
                            format!("index {index} out of bounds at `{segment}`"),
                        )
                    })?
                }
                other => {
                    return Err(self.fail(
                        check,
                        format!("value at `{path}`"),
                        format!("{} reached at `{segment}`", type_name(other)),
                    ));
                }
            };
        }
        Ok(current)
    }

    pub fn json_list_len(&self, key: &str, expected: usize) -> Check<'a, '_> {
        let actual = self.top_level("json_list_len", key)?;
        let items = actual.as_array().ok_or_else(|| {
            self.fail(
                "json_list_len",
                format!("`{key}` as array"),
                type_name(actual),
            )
        })?;
        if items.len() == expected {
            Ok(self)
        } else {
            Err(self.fail(
                "json_list_len",
                format!("`{key}` of length {expected}"),
                format!("length {}", items.len()),
            ))
        }
    }

    pub fn json_list_non_empty(&self, key: &str) -> Check<'a, '_> {
        let actual = self.top_level("json_list_non_empty", key)?;
        let items = actual.as_array().ok_or_else(|| {
            self.fail(
                "json_list_non_empty",
                format!("`{key}` as array"),
                type_name(actual),
            )
        })?;
        if items.is_empty() {
            Err(self.fail(
                "json_list_non_empty",
                format!("`{key}` non-empty"),
                "empty array",
            ))
        } else {
            Ok(self)
        }
    }

    /// Validate the body against a JSON-schema document. Failures carry the
    /// validator's own message untransformed.
    pub fn matches_schema(&self, schema: &Value) -> Check<'a, '_> {
        let validator = jsonschema::validator_for(schema).map_err(|err| {
            self.fail("matches_schema", "a compilable schema", err.to_string())
        })?;
        let body = self.body_json("matches_schema")?;
        if let Some(first_error) = validator.iter_errors(body).next() {
            return Err(self.fail(
                "matches_schema",
                "a schema-conformant body",
                first_error.to_string(),
            ));
        }
        Ok(self)
    }

    pub fn latency_under(&self, max_ms: u128) -> Check<'a, '_> {
        let elapsed = self.response.elapsed_ms();
        if elapsed < max_ms {
            Ok(self)
        } else {
            Err(self.fail(
                "latency_under",
                format!("less than {max_ms} ms"),
                format!("{elapsed} ms"),
            ))
        }
    }

    /// Non-asserting read of a top-level value, for steps that capture data
    /// for later checks.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.response
            .json()
            .ok()
            .and_then(Value::as_object)
            .and_then(|object| object.get(key))
    }
}
