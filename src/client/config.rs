//! Client configuration options.

use std::collections::HashMap;
use std::time::Duration;

use url::Url;

use crate::models::{Environment, Service};
use crate::{Error, Result};

/// Configuration for a Globus client.
///
/// Configuration is an explicit value handed to each client; nothing is
/// read from the process environment unless [`from_env`](Self::from_env)
/// is called.
///
/// # Example
///
/// ```
/// use globus_sdk::{ClientConfig, Environment};
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_environment(Environment::Sandbox)
///     .with_timeout(Duration::from_secs(120))
///     .with_user_agent("my-app/1.0");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
    /// Retry configuration for transient failures
    pub retry: RetryConfig,
    /// Globus deployment to talk to
    pub environment: Environment,
    /// Per-service base URL overrides
    pub service_urls: HashMap<Service, Url>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            user_agent: format!("globus-sdk-rust/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryConfig::default(),
            environment: Environment::default(),
            service_urls: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `GLOBUS_SDK_*` environment variables.
    ///
    /// Recognized variables:
    /// - `GLOBUS_SDK_ENVIRONMENT`: deployment name (`production`, `sandbox`, ...)
    /// - `GLOBUS_SDK_HTTP_TIMEOUT`: request timeout in seconds
    /// - `GLOBUS_SDK_SERVICE_URL_<SERVICE>`: base URL override, e.g.
    ///   `GLOBUS_SDK_SERVICE_URL_TRANSFER`
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("GLOBUS_SDK_ENVIRONMENT") {
            config.environment = name.parse()?;
        }

        if let Some(raw) = lookup("GLOBUS_SDK_HTTP_TIMEOUT") {
            let secs: f64 = raw.trim().parse().map_err(|_| {
                Error::Config(format!("GLOBUS_SDK_HTTP_TIMEOUT must be a number, got {raw:?}"))
            })?;
            if !secs.is_finite() || secs <= 0.0 {
                return Err(Error::Config(format!(
                    "GLOBUS_SDK_HTTP_TIMEOUT must be positive, got {raw:?}"
                )));
            }
            config.timeout = Duration::try_from_secs_f64(secs).map_err(|_| {
                Error::Config(format!("GLOBUS_SDK_HTTP_TIMEOUT is out of range, got {raw:?}"))
            })?;
        }

        for service in Service::ALL {
            let key = format!("GLOBUS_SDK_SERVICE_URL_{}", service.as_str().to_ascii_uppercase());
            if let Some(raw) = lookup(&key) {
                let url = Url::parse(raw.trim())
                    .map_err(|e| Error::Config(format!("{key} is not a valid URL: {e}")))?;
                config = config.with_service_url(service, url);
            }
        }

        Ok(config)
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Select the Globus deployment.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Override the base URL of one service.
    ///
    /// A trailing `/` is added if missing so request paths join beneath it.
    pub fn with_service_url(mut self, service: Service, mut url: Url) -> Self {
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.service_urls.insert(service, url);
        self
    }

    /// Resolve the base URL of a service.
    pub fn service_url(&self, service: Service) -> Result<Url> {
        match self.service_urls.get(&service) {
            Some(url) => Ok(url.clone()),
            None => self.environment.service_url(service),
        }
    }
}

/// Configuration for automatic retries of transient failures.
///
/// Responses whose status is listed in `retry_statuses` are retried with
/// exponential backoff. A `Retry-After` header, when present, replaces the
/// computed delay (capped at `max_backoff`). 401 responses are never
/// retried here; they belong to the authorizer.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// HTTP status codes to retry on
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            retry_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// Create a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Set the initial backoff duration.
    pub fn with_initial_backoff(mut self, duration: Duration) -> Self {
        self.initial_backoff = duration;
        self
    }

    /// Set the maximum backoff duration.
    pub fn with_max_backoff(mut self, duration: Duration) -> Self {
        self.max_backoff = duration;
        self
    }

    /// Calculate the backoff duration for a given attempt.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let backoff_millis =
            (self.initial_backoff.as_millis() as u64).saturating_mul(2u64.saturating_pow(attempt));
        let max_millis = self.max_backoff.as_millis() as u64;
        Duration::from_millis(backoff_millis.min(max_millis))
    }

    /// Check if a status code should be retried.
    pub fn should_retry_status(&self, status: u16) -> bool {
        status != 401 && self.retry_statuses.contains(&status)
    }
}
