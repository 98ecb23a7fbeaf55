//! # Authentication
//!
//! Credential settings read from configuration, plus the process-lifetime
//! token cache. The cache is write-once: global setup may populate it
//! exactly once, and every scenario afterwards reads the same tokens.

use std::sync::OnceLock;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};

use crate::config::Config;
use crate::error::{Error, Result};

/// How the session authenticates, from the `auth.*` configuration keys.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthSettings {
    #[default]
    None,
    Bearer {
        token: String,
    },
    ApiKey {
        header: String,
        value: String,
    },
}

impl AuthSettings {
    pub fn from_config(config: &Config) -> Self {
        match config.get_str("auth.type", "").as_str() {
            "bearer" => {
                let token = config.get_str("auth.token", "");
                if token.is_empty() {
                    AuthSettings::None
                } else {
                    AuthSettings::Bearer { token }
                }
            }
            "api_key" => {
                let header = config.get_str("auth.api_key_header", "X-Api-Key");
                let value = config.get_str("auth.api_key_value", "");
                if value.is_empty() {
                    AuthSettings::None
                } else {
                    AuthSettings::ApiKey { header, value }
                }
            }
            _ => AuthSettings::None,
        }
    }

    /// Install the credential into a header map.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<()> {
        match self {
            AuthSettings::None => {}
            AuthSettings::Bearer { token } => {
                let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(
                    |err| Error::InvalidHeader {
                        name: AUTHORIZATION.as_str().to_string(),
                        reason: err.to_string(),
                    },
                )?;
                headers.insert(AUTHORIZATION, value);
            }
            AuthSettings::ApiKey { header, value } => {
                let name = HeaderName::from_bytes(header.as_bytes()).map_err(|err| {
                    Error::InvalidHeader {
                        name: header.clone(),
                        reason: err.to_string(),
                    }
                })?;
                let value =
                    HeaderValue::from_str(value).map_err(|err| Error::InvalidHeader {
                        name: header.clone(),
                        reason: err.to_string(),
                    })?;
                headers.insert(name, value);
            }
        }
        Ok(())
    }
}

/// The tokens produced by global authentication.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenSet {
    pub app_token: Option<String>,
    pub user_token: Option<String>,
}

/// Process-lifetime token store. `store` succeeds once; every later call
/// is a no-op returning `false`, leaving the first value in place.
#[derive(Debug, Default)]
pub struct TokenCache {
    tokens: OnceLock<TokenSet>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, tokens: TokenSet) -> bool {
        self.tokens.set(tokens).is_ok()
    }

    pub fn get(&self) -> Option<&TokenSet> {
        self.tokens.get()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.get().is_some()
    }
}
