//! The read capability consumers depend on, and the lazily built default
//! client.
//!
//! # Design
//! Request handlers take `&dyn ConfigSource` (or a generic bound) instead of
//! reaching for a global. The process builds one [`LazyEdgeConfig`] at
//! startup and passes it down; the underlying client is created from the
//! environment on first use, so a missing variable surfaces as
//! `NoConnectionString` from the first call rather than at startup.

use std::sync::OnceLock;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::client::{create_client, EdgeConfigClient};
use crate::error::EdgeConfigError;

/// Environment variable holding the default connection string.
pub const CONNECTION_STRING_ENV: &str = "EDGE_CONFIG";

/// Read-only access to an Edge Config store.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, EdgeConfigError>;

    async fn get_all(&self, keys: &[&str]) -> Result<Map<String, Value>, EdgeConfigError>;

    async fn has(&self, key: &str) -> Result<bool, EdgeConfigError>;

    async fn digest(&self) -> Result<String, EdgeConfigError>;
}

#[async_trait]
impl ConfigSource for EdgeConfigClient {
    async fn get(&self, key: &str) -> Result<Option<Value>, EdgeConfigError> {
        EdgeConfigClient::get(self, key).await
    }

    async fn get_all(&self, keys: &[&str]) -> Result<Map<String, Value>, EdgeConfigError> {
        EdgeConfigClient::get_all(self, keys).await
    }

    async fn has(&self, key: &str) -> Result<bool, EdgeConfigError> {
        EdgeConfigClient::has(self, key).await
    }

    async fn digest(&self) -> Result<String, EdgeConfigError> {
        EdgeConfigClient::digest(self).await
    }
}

/// An [`EdgeConfigClient`] built from an environment variable on first use
/// and reused afterwards.
///
/// A failed build is not cached: once the variable is set, the next call
/// succeeds.
#[derive(Debug)]
pub struct LazyEdgeConfig {
    var: String,
    client: OnceLock<EdgeConfigClient>,
}

impl LazyEdgeConfig {
    /// Reads [`CONNECTION_STRING_ENV`].
    pub fn from_env() -> Self {
        Self::new(CONNECTION_STRING_ENV)
    }

    pub fn new(var: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            client: OnceLock::new(),
        }
    }

    pub fn client(&self) -> Result<&EdgeConfigClient, EdgeConfigError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let connection_string = std::env::var(&self.var).ok();
        let client = create_client(connection_string.as_deref())?;
        // A concurrent first use may have won; keep whichever landed first.
        Ok(self.client.get_or_init(|| client))
    }
}

/// The process-wide default source, reading [`CONNECTION_STRING_ENV`].
pub fn default_source() -> &'static LazyEdgeConfig {
    static DEFAULT: OnceLock<LazyEdgeConfig> = OnceLock::new();
    DEFAULT.get_or_init(LazyEdgeConfig::from_env)
}

#[async_trait]
impl ConfigSource for LazyEdgeConfig {
    async fn get(&self, key: &str) -> Result<Option<Value>, EdgeConfigError> {
        self.client()?.get(key).await
    }

    async fn get_all(&self, keys: &[&str]) -> Result<Map<String, Value>, EdgeConfigError> {
        self.client()?.get_all(keys).await
    }

    async fn has(&self, key: &str) -> Result<bool, EdgeConfigError> {
        self.client()?.has(key).await
    }

    async fn digest(&self) -> Result<String, EdgeConfigError> {
        self.client()?.digest().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test owns its variable name so parallel tests never race on it.

    #[test]
    fn missing_variable_fails_at_first_use() {
        let lazy = LazyEdgeConfig::new("EDGE_CONFIG_TEST_MISSING");
        let err = lazy.client().unwrap_err();
        assert!(matches!(err, EdgeConfigError::NoConnectionString));
    }

    #[tokio::test]
    async fn operations_surface_the_missing_variable() {
        let lazy = LazyEdgeConfig::new("EDGE_CONFIG_TEST_MISSING_OPS");
        let source: &dyn ConfigSource = &lazy;
        assert!(matches!(
            source.get("foo").await,
            Err(EdgeConfigError::NoConnectionString)
        ));
        assert!(matches!(
            source.digest().await,
            Err(EdgeConfigError::NoConnectionString)
        ));
    }

    #[test]
    fn invalid_variable_fails_at_first_use() {
        std::env::set_var("EDGE_CONFIG_TEST_INVALID", "https://edge-config.vercel.com/ecfg-1");
        let lazy = LazyEdgeConfig::new("EDGE_CONFIG_TEST_INVALID");
        assert!(matches!(
            lazy.client(),
            Err(EdgeConfigError::NoConnectionString)
        ));
    }

    #[test]
    fn client_is_built_once_and_reused() {
        let var = "EDGE_CONFIG_TEST_REUSED";
        let lazy = LazyEdgeConfig::new(var);
        assert!(lazy.client().is_err());

        std::env::set_var(var, "https://edge-config.vercel.com/ecfg-3?token=token-3");
        let first = lazy.client().unwrap();
        assert_eq!(first.descriptor().id(), "ecfg-3");

        std::env::set_var(var, "https://edge-config.vercel.com/ecfg-4?token=token-4");
        let second = lazy.client().unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(second.descriptor().id(), "ecfg-3");
    }

    #[test]
    fn default_source_is_a_singleton() {
        assert!(std::ptr::eq(default_source(), default_source()));
    }
}
