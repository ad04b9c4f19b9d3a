//! Building clients, caches and loaders from configuration.
//!
//! Credentials are resolved here: `endpoint.auth` only names environment
//! variables, which are read when the client is created.

use std::sync::Arc;

use cubefetch_client::{Auth, HttpClientConfig, HttpSparqlClient, Operation};
use cubefetch_config::{
    AuthConfig, BatchConfig, CacheConfig, CacheKind, EndpointConfig, FetchConfig, QueryOperation,
};
use tracing::debug;

use crate::cache::{LruQueryCache, MemoryCache, QueryCache};
use crate::error::CoreError;
use crate::loader::BatchLoader;
use crate::Result;

/// Map the configured protocol operation onto the client's.
pub fn operation(op: QueryOperation) -> Operation {
    match op {
        QueryOperation::Get => Operation::Get,
        QueryOperation::PostUrlencoded => Operation::PostUrlencoded,
        QueryOperation::PostDirect => Operation::PostDirect,
    }
}

/// Resolve `auth` against the environment.
///
/// A bearer token wins over basic auth when both are configured.
pub fn resolve_auth(auth: &AuthConfig) -> Result<Option<Auth>> {
    resolve_auth_with(auth, |var| std::env::var(var).ok())
}

fn resolve_auth_with(
    auth: &AuthConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<Auth>> {
    if let Some(var) = &auth.token_env {
        let token = lookup(var).ok_or_else(|| CoreError::missing_credential(var))?;
        return Ok(Some(Auth::Bearer(token)));
    }

    let Some(username) = &auth.username else {
        return Ok(None);
    };
    let password = match &auth.password_env {
        Some(var) => Some(lookup(var).ok_or_else(|| CoreError::missing_credential(var))?),
        None => None,
    };
    Ok(Some(Auth::Basic {
        username: username.clone(),
        password,
    }))
}

/// Create an HTTP client for `endpoint`.
pub fn create_client(endpoint: &EndpointConfig) -> Result<HttpSparqlClient> {
    let mut config = HttpClientConfig::new(endpoint.url.clone())
        .with_timeout(endpoint.timeout_secs)
        .with_max_retries(endpoint.max_retries);
    if let Some(user_agent) = &endpoint.user_agent {
        config = config.with_user_agent(user_agent.clone());
    }
    if let Some(auth) = &endpoint.auth {
        if let Some(auth) = resolve_auth(auth)? {
            config = config.with_auth(auth);
        }
    }
    Ok(HttpSparqlClient::new(config)?)
}

/// Create the configured cache, `None` for [`CacheKind::None`].
pub fn create_cache(cache: &CacheConfig) -> Result<Option<Arc<dyn QueryCache>>> {
    let cache: Option<Arc<dyn QueryCache>> = match cache.kind {
        CacheKind::None => None,
        CacheKind::Memory => Some(Arc::new(MemoryCache::new())),
        CacheKind::Lru => {
            let lru = LruQueryCache::with_capacity(cache.capacity).ok_or_else(|| {
                cubefetch_config::ConfigError::invalid_value(
                    "cache.capacity",
                    "must be greater than 0 for the lru cache",
                )
            })?;
            Some(Arc::new(lru))
        }
    };
    Ok(cache)
}

/// Apply `[batch]` settings to a loader.
pub fn configure_loader<C>(loader: BatchLoader<C>, batch: &BatchConfig) -> BatchLoader<C>
where
    C: cubefetch_client::QueryClient + ?Sized + 'static,
{
    loader
        .with_batch_size(batch.batch_size)
        .with_max_concurrent_batches(batch.max_concurrent_batches)
        .with_coalescing(batch.coalesce)
}

/// Validate `config` and build a loader backed by an HTTP client.
pub fn create_loader(config: &FetchConfig) -> Result<BatchLoader<HttpSparqlClient>> {
    config.validate()?;

    let client = create_client(&config.endpoint)?;
    let mut loader = configure_loader(BatchLoader::new(Arc::new(client)), &config.batch);
    if let Some(cache) = create_cache(&config.cache)? {
        loader = loader.with_cache(cache);
    }

    debug!("Created loader: {:?}", loader);
    Ok(loader)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(var: &str) -> Option<String> {
        match var {
            "SPARQL_PASSWORD" => Some("hunter2".to_string()),
            "SPARQL_TOKEN" => Some("tok".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_operation_mapping() {
        assert_eq!(operation(QueryOperation::Get), Operation::Get);
        assert_eq!(operation(QueryOperation::PostDirect), Operation::PostDirect);
        assert_eq!(
            operation(QueryOperation::default()),
            Operation::PostUrlencoded
        );
    }

    #[test]
    fn test_resolve_basic_auth() {
        let auth = AuthConfig {
            username: Some("reader".into()),
            password_env: Some("SPARQL_PASSWORD".into()),
            token_env: None,
        };
        match resolve_auth_with(&auth, lookup).unwrap() {
            Some(Auth::Basic { username, password }) => {
                assert_eq!(username, "reader");
                assert_eq!(password.as_deref(), Some("hunter2"));
            }
            other => panic!("expected basic auth, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_token_wins() {
        let auth = AuthConfig {
            username: Some("reader".into()),
            password_env: None,
            token_env: Some("SPARQL_TOKEN".into()),
        };
        assert!(matches!(
            resolve_auth_with(&auth, lookup).unwrap(),
            Some(Auth::Bearer(t)) if t == "tok"
        ));
    }

    #[test]
    fn test_resolve_missing_variable() {
        let auth = AuthConfig {
            username: None,
            password_env: None,
            token_env: Some("NOT_SET_ANYWHERE".into()),
        };
        let err = resolve_auth_with(&auth, lookup).unwrap_err();
        assert!(matches!(err, CoreError::MissingCredential { var } if var == "NOT_SET_ANYWHERE"));
    }

    #[test]
    fn test_resolve_empty_auth() {
        assert!(resolve_auth_with(&AuthConfig::default(), lookup)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_create_cache_kinds() {
        let mut config = CacheConfig::default();
        assert!(create_cache(&config).unwrap().is_some());

        config.kind = CacheKind::None;
        assert!(create_cache(&config).unwrap().is_none());

        config.kind = CacheKind::Lru;
        config.capacity = 0;
        assert!(matches!(create_cache(&config), Err(CoreError::Config(_))));
    }

    #[tokio::test]
    async fn test_create_loader_from_config() {
        let mut config = FetchConfig::default();
        config.batch.batch_size = 50;
        config.batch.max_concurrent_batches = 2;
        config.batch.coalesce = false;

        let loader = create_loader(&config).unwrap();
        assert_eq!(loader.batch_size(), 50);
        assert_eq!(loader.max_concurrent_batches(), 2);
        assert!(!loader.is_coalescing());
        assert!(loader.cache().is_some());
    }

    #[test]
    fn test_create_loader_rejects_invalid_config() {
        let mut config = FetchConfig::default();
        config.batch.batch_size = 0;
        assert!(matches!(create_loader(&config), Err(CoreError::Config(_))));
    }
}
