//! # Scenario Lifecycle
//!
//! The harness resources around the HTTP core: a process-lifetime
//! [`Harness`] owning configuration and the token cache, and a short-lived
//! [`ScenarioContext`] created fresh for every scenario so nothing leaks
//! between them. Scenarios run sequentially; nothing here is shared across
//! threads.

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;

use crate::auth::{TokenCache, TokenSet};
use crate::config::Config;
use crate::error::Result;
use crate::http::{ApiClient, ApiResponse};
use crate::logging;

/// Per-run inputs handed over by the scenario runner.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config_dir: PathBuf,
    pub environment: String,
    pub tags: Vec<String>,
}

impl RunOptions {
    pub fn new(config_dir: impl Into<PathBuf>, environment: impl Into<String>) -> Self {
        Self {
            config_dir: config_dir.into(),
            environment: environment.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Process-lifetime state: the loaded configuration and the write-once
/// token cache. Created once in global setup and threaded through the
/// runner explicitly.
pub struct Harness {
    config: Config,
    token_cache: TokenCache,
    tags: Vec<String>,
}

impl Harness {
    /// Load the environment configuration and install logging. The
    /// returned harness drives every scenario of the run.
    pub fn bootstrap(options: &RunOptions) -> Result<Self> {
        let config = Config::load(&options.config_dir, &options.environment)?;
        logging::init(&config)?;
        tracing::info!(environment = %options.environment, tags = ?options.tags, "harness ready");
        Ok(Self {
            config,
            token_cache: TokenCache::new(),
            tags: options.tags.clone(),
        })
    }

    /// Build a harness from an already-loaded configuration. Skips logging
    /// setup; used by tests and embedding runners.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            token_cache: TokenCache::new(),
            tags: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn token_cache(&self) -> &TokenCache {
        &self.token_cache
    }

    /// Run global authentication at most once per process. The eligibility
    /// flag comes from the runner's tag filter; when it is off the cache
    /// stays empty and each scenario authenticates on its own. The fetch
    /// closure receives a throwaway client and returns the token pair.
    pub fn global_auth<F>(&self, eligible: bool, fetch: F) -> Result<bool>
    where
        F: FnOnce(&ApiClient) -> Result<TokenSet>,
    {
        if !eligible || self.token_cache.is_authenticated() {
            return Ok(false);
        }
        let mut client = ApiClient::from_config(&self.config)?;
        let tokens = fetch(&client)?;
        client.close();
        let stored = self.token_cache.store(tokens);
        tracing::info!(stored, "global authentication finished");
        Ok(stored)
    }

    /// Start a scenario: a fresh client (its bearer header refreshed from
    /// the cache when tokens exist; user token preferred over app token)
    /// and an empty context.
    pub fn begin_scenario(&self) -> Result<ScenarioContext> {
        let mut client = ApiClient::from_config(&self.config)?;
        let tokens = self.token_cache.get().cloned();
        if let Some(tokens) = &tokens {
            if let Some(token) = tokens.user_token.as_ref().or(tokens.app_token.as_ref()) {
                client.update_token(token)?;
            }
        }
        Ok(ScenarioContext::new(client, tokens))
    }

    /// Tear a scenario down, closing its client.
    pub fn end_scenario(&self, context: ScenarioContext) {
        context.finish();
    }
}

/// Per-scenario scratchpad plus the slots every step needs: the scenario's
/// client, the most recent response, and the token snapshot.
pub struct ScenarioContext {
    client: ApiClient,
    response: Option<ApiResponse>,
    tokens: Option<TokenSet>,
    values: HashMap<String, Value>,
}

impl ScenarioContext {
    pub fn new(client: ApiClient, tokens: Option<TokenSet>) -> Self {
        Self {
            client,
            response: None,
            tokens,
            values: HashMap::new(),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut ApiClient {
        &mut self.client
    }

    pub fn tokens(&self) -> Option<&TokenSet> {
        self.tokens.as_ref()
    }

    /// Override the scenario's tokens without touching the shared cache.
    pub fn set_tokens(&mut self, tokens: TokenSet) {
        self.tokens = Some(tokens);
    }

    pub fn record_response(&mut self, response: ApiResponse) {
        self.response = Some(response);
    }

    pub fn response(&self) -> Option<&ApiResponse> {
        self.response.as_ref()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Close the client and drop everything the scenario accumulated.
    pub fn finish(mut self) {
        self.client.close();
    }
}
