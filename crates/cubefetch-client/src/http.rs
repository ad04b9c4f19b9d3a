//! SPARQL 1.1 protocol client over HTTP
//!
//! # Endpoint Format
//!
//! - `GET {endpoint}?query=...`
//! - `POST {endpoint}` with `query=...` (form-encoded)
//! - `POST {endpoint}` with the raw query (`application/sparql-query`)
//!
//! Every request asks for `application/sparql-results+json`.
//!
//! # Example
//!
//! ```ignore
//! use cubefetch_client::{HttpClientConfig, HttpSparqlClient, Query, QueryClient};
//!
//! let client = HttpSparqlClient::new(HttpClientConfig::new("https://lindas.admin.ch/query"))?;
//! let rows = client.execute(&Query::new("SELECT * WHERE { ?s ?p ?o } LIMIT 1")).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use tracing::{debug, warn};

use crate::error::{FetchError, Result};
use crate::query::{Operation, Query};
use crate::results::{parse_json_results, Row};
use crate::traits::QueryClient;

/// Default timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default max retries
const DEFAULT_MAX_RETRIES: u32 = 2;

/// Base delay for exponential backoff (milliseconds)
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Upper bound for a server supplied Retry-After
const MAX_RETRY_AFTER_SECS: u64 = 30;

/// Error bodies are cut to this many characters
const MAX_ERROR_BODY_CHARS: usize = 512;

const ACCEPT_SPARQL_JSON: &str = "application/sparql-results+json";

/// Credentials sent with every request.
#[derive(Clone)]
pub enum Auth {
    /// HTTP basic auth
    Basic {
        username: String,
        password: Option<String>,
    },
    /// `Authorization: Bearer <token>`
    Bearer(String),
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Auth::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
        }
    }
}

/// Configuration for [`HttpSparqlClient`]
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Query endpoint URL
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// First backoff delay; doubled after each attempt
    pub retry_base_delay: Duration,
    /// Custom User-Agent header
    pub user_agent: Option<String>,
    /// Credentials
    pub auth: Option<Auth>,
}

impl HttpClientConfig {
    /// Config with defaults for `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            user_agent: None,
            auth: None,
        }
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set max retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }
}

/// SPARQL endpoint client.
#[derive(Clone)]
pub struct HttpSparqlClient {
    client: Client,
    url: Url,
    config: HttpClientConfig,
}

impl HttpSparqlClient {
    /// Create a new client.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let url = Url::parse(&config.endpoint).map_err(|e| {
            FetchError::InvalidConfig(format!("invalid endpoint '{}': {}", config.endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidConfig(format!(
                "endpoint '{}' is not an http(s) URL",
                config.endpoint
            )));
        }

        if config.timeout_secs == 0 {
            return Err(FetchError::InvalidConfig(
                "timeout must be at least one second".to_string(),
            ));
        }

        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if let Some(ref agent) = config.user_agent {
            builder = builder.user_agent(agent.clone());
        } else {
            builder = builder.user_agent(concat!("cubefetch/", env!("CARGO_PKG_VERSION")));
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::InvalidConfig(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            client,
            url,
            config,
        })
    }

    fn build_request(&self, query: &Query) -> RequestBuilder {
        let request = match query.operation() {
            Operation::Get => {
                let mut url = self.url.clone();
                url.query_pairs_mut().append_pair("query", query.text());
                self.client.get(url)
            }
            Operation::PostUrlencoded => self
                .client
                .post(self.url.clone())
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(form_encode_query(&self.url, query.text())),
            Operation::PostDirect => self
                .client
                .post(self.url.clone())
                .header("Content-Type", "application/sparql-query")
                .body(query.text().to_string()),
        };

        let request = request.header("Accept", ACCEPT_SPARQL_JSON);

        match self.config.auth {
            Some(Auth::Basic {
                ref username,
                ref password,
            }) => request.basic_auth(username, password.as_ref()),
            Some(Auth::Bearer(ref token)) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send request with retry logic
    async fn request_with_retry(&self, query: &Query) -> Result<Vec<Row>> {
        let mut retry_delay = self.config.retry_base_delay;

        for attempt in 0..=self.config.max_retries {
            match self.send_request(query).await {
                Ok(rows) => return Ok(rows),
                Err(e) if !e.is_retryable() || attempt == self.config.max_retries => {
                    return Err(e);
                }
                Err(e) => {
                    let delay = match e {
                        FetchError::RateLimited {
                            retry_after: Some(secs),
                        } => Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)),
                        _ => retry_delay,
                    };
                    warn!(
                        "Query against {} failed (attempt {}/{}): {}; retrying in {:?}",
                        self.config.endpoint,
                        attempt + 1,
                        self.config.max_retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    retry_delay *= 2;
                }
            }
        }

        Err(FetchError::connection("request failed after retries"))
    }

    /// Send a single request to the endpoint
    async fn send_request(&self, query: &Query) -> Result<Vec<Row>> {
        debug!(
            "Sending {} query ({} bytes) to {}",
            query.operation(),
            query.text().len(),
            self.config.endpoint
        );

        let response = self.build_request(query).send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            return parse_json_results(&body);
        }

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok());

                Err(FetchError::RateLimited { retry_after })
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(FetchError::http(status.as_u16(), truncate_body(&body)))
            }
        }
    }
}

#[async_trait]
impl QueryClient for HttpSparqlClient {
    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    async fn execute(&self, query: &Query) -> Result<Vec<Row>> {
        self.request_with_retry(query).await
    }
}

impl std::fmt::Debug for HttpSparqlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSparqlClient")
            .field("endpoint", &self.config.endpoint)
            .field("timeout_secs", &self.config.timeout_secs)
            .field("max_retries", &self.config.max_retries)
            .field("auth", &self.config.auth)
            .finish()
    }
}

/// `application/x-www-form-urlencoded` body carrying `query=<text>`.
fn form_encode_query(base: &Url, text: &str) -> String {
    // Url's query serializer is the form-urlencoded serializer
    let mut scratch = base.clone();
    scratch.set_query(None);
    scratch.query_pairs_mut().append_pair("query", text);
    scratch.query().unwrap_or_default().to_string()
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body.to_string()
    } else {
        let mut cut: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        cut.push_str("...");
        cut
    }
}
