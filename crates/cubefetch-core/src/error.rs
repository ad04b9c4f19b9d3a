//! Core error types.

use thiserror::Error;

/// Errors raised while assembling a loader from configuration.
///
/// Failures of individual batches are not errors at this level; they are
/// reported through [`BatchOutcome`](crate::BatchOutcome).
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration was invalid
    #[error("configuration error: {0}")]
    Config(#[from] cubefetch_config::ConfigError),

    /// Client construction or a strict fetch failed
    #[error(transparent)]
    Fetch(#[from] cubefetch_client::FetchError),

    /// A credential was referenced by environment variable but not set
    #[error("environment variable '{var}' referenced by endpoint.auth is not set")]
    MissingCredential { var: String },
}

impl CoreError {
    /// Create a MissingCredential error.
    pub fn missing_credential(var: impl Into<String>) -> Self {
        Self::MissingCredential { var: var.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubefetch_client::FetchError;

    #[test]
    fn test_fetch_error_is_transparent() {
        let err: CoreError = FetchError::PartialFailure { failed: 1, total: 3 }.into();
        assert_eq!(err.to_string(), "1 of 3 batches failed");
    }

    #[test]
    fn test_missing_credential_names_variable() {
        let err = CoreError::missing_credential("SPARQL_TOKEN");
        assert!(err.to_string().contains("SPARQL_TOKEN"));
    }
}
