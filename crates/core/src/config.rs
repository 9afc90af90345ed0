//! Scanner configuration.
//!
//! Supplied once at setup and read-only for the lifetime of a run. The
//! binary loads it from the environment; library callers construct it
//! directly and inject their own provider handle.

use alloy::primitives::Address;
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::dispatcher::DEFAULT_CHUNK_SIZE;
use crate::runner::DEFAULT_RETRY_DELAY;
use liquidator_api::MAX_PAGE_SIZE;

/// Default per-request subgraph timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable names.
pub mod env {
    pub const SUBGRAPH_ENDPOINT: &str = "SUBGRAPH_ENDPOINT";
    pub const CLEARING_HOUSE: &str = "CLEARING_HOUSE";
    pub const PAGE_SIZE: &str = "PAGE_SIZE";
    pub const CHUNK_SIZE: &str = "CHUNK_SIZE";
    pub const RETRY_DELAY_SECS: &str = "RETRY_DELAY_SECS";
    pub const MAX_ENUMERATION_ATTEMPTS: &str = "MAX_ENUMERATION_ATTEMPTS";
    pub const REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";
}

/// Scanner configuration.
#[derive(Debug, Clone)]
pub struct LiquidatorConfig {
    /// Subgraph endpoint for account enumeration.
    pub subgraph_endpoint: String,
    /// Deployed clearing house address.
    pub clearing_house: Address,
    /// Subgraph page size, capped at the backend limit.
    pub page_size: usize,
    /// Accounts evaluated concurrently per chunk.
    pub chunk_size: usize,
    /// Delay between enumeration attempts.
    pub retry_delay: Duration,
    /// Enumeration attempt cap; `None` retries until the service answers.
    pub max_enumeration_attempts: Option<u32>,
    /// Per-request subgraph timeout.
    pub request_timeout: Duration,
}

impl LiquidatorConfig {
    /// Create a configuration with default tuning.
    pub fn new(subgraph_endpoint: impl Into<String>, clearing_house: Address) -> Self {
        Self {
            subgraph_endpoint: subgraph_endpoint.into(),
            clearing_house,
            page_size: MAX_PAGE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_enumeration_attempts: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Load the configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let subgraph_endpoint = std::env::var(env::SUBGRAPH_ENDPOINT)
            .with_context(|| format!("missing env var: {}", env::SUBGRAPH_ENDPOINT))?;
        let clearing_house: Address = std::env::var(env::CLEARING_HOUSE)
            .with_context(|| format!("missing env var: {}", env::CLEARING_HOUSE))?
            .parse()
            .with_context(|| format!("invalid address in {}", env::CLEARING_HOUSE))?;

        let mut config = Self::new(subgraph_endpoint, clearing_house);

        if let Some(page_size) = parse_env(env::PAGE_SIZE)? {
            config.page_size = page_size;
        }
        if let Some(chunk_size) = parse_env(env::CHUNK_SIZE)? {
            config.chunk_size = chunk_size;
        }
        if let Some(secs) = parse_env::<u64>(env::RETRY_DELAY_SECS)? {
            config.retry_delay = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_env(env::MAX_ENUMERATION_ATTEMPTS)? {
            config.max_enumeration_attempts = Some(attempts);
        }
        if let Some(secs) = parse_env::<u64>(env::REQUEST_TIMEOUT_SECS)? {
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate();
        Ok(config)
    }

    /// Clamp tunables to sane bounds.
    fn validate(&mut self) {
        if self.page_size > MAX_PAGE_SIZE {
            warn!(
                page_size = self.page_size,
                cap = MAX_PAGE_SIZE,
                "Page size exceeds the backend cap, clamping"
            );
            self.page_size = MAX_PAGE_SIZE;
        }
        self.page_size = self.page_size.max(1);
        self.chunk_size = self.chunk_size.max(1);
    }

    /// Log the effective configuration at startup.
    pub fn log_config(&self) {
        info!(
            subgraph = %self.subgraph_endpoint,
            clearing_house = %self.clearing_house,
            page_size = self.page_size,
            chunk_size = self.chunk_size,
            retry_delay = ?self.retry_delay,
            max_enumeration_attempts = ?self.max_enumeration_attempts,
            request_timeout = ?self.request_timeout,
            "Scanner configuration"
        );
    }
}

/// Parse an optional env var, erroring only when it is set but malformed.
fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .with_context(|| format!("invalid value for {name}")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_remote_budgets() {
        let config = LiquidatorConfig::new("http://localhost:8000/subgraph", Address::ZERO);
        assert_eq!(config.page_size, 1000);
        assert_eq!(config.chunk_size, 25);
        assert_eq!(config.retry_delay, Duration::from_secs(3));
        assert_eq!(config.max_enumeration_attempts, None);
    }

    #[test]
    fn validate_clamps_the_page_size() {
        let mut config = LiquidatorConfig::new("http://localhost", Address::ZERO);
        config.page_size = 5000;
        config.chunk_size = 0;
        config.validate();
        assert_eq!(config.page_size, MAX_PAGE_SIZE);
        assert_eq!(config.chunk_size, 1);
    }
}
