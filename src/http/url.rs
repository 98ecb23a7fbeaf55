//! # URL Builder
//!
//! Resolves endpoint templates against a base URL. Query-string
//! composition stays with the client so query pairs are logged and signed
//! from one place.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Build the final request URL.
///
/// Absolute endpoints (`http://` / `https://`) pass through verbatim.
/// `{name}` placeholders substitute from `path_params`; any placeholder
/// left unresolved fails with [`Error::UrlTemplate`] naming the segment.
pub fn build_url(
    base_url: &str,
    endpoint: &str,
    path_params: &HashMap<String, String>,
) -> Result<String> {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return Ok(endpoint.to_string());
    }

    let mut resolved = endpoint.to_string();
    for (name, value) in path_params {
        resolved = resolved.replace(&format!("{{{name}}}"), value);
    }

    if let Some(placeholder) = first_placeholder(&resolved) {
        return Err(Error::UrlTemplate {
            endpoint: endpoint.to_string(),
            placeholder,
        });
    }

    Ok(format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        resolved.trim_start_matches('/')
    ))
}

fn first_placeholder(endpoint: &str) -> Option<String> {
    let start = endpoint.find('{')?;
    let rest = &endpoint[start + 1..];
    let end = rest.find('}')?;
    Some(rest[..end].to_string())
}
