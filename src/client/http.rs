//! HTTP client implementation for the Globus APIs.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use url::Url;

use crate::api::TransferService;
use crate::auth::{AuthClient, Authorizer, RefreshTokenAuthorizer, RefreshTokenSource};
use crate::error::error_fields;
use crate::models::Service;
use crate::{Error, Result};

use super::config::ClientConfig;

/// The main client for calling Globus services.
///
/// The client owns one [`Authorizer`], consulted by every request it
/// issues, and hands out service structs that share it.
///
/// # Example
///
/// ```no_run
/// use futures_util::TryStreamExt;
/// use globus_sdk::{AccessTokenAuthorizer, GlobusClient};
///
/// # async fn example() -> globus_sdk::Result<()> {
/// let client = GlobusClient::new(AccessTokenAuthorizer::new("transfer-token"))?;
///
/// let tasks: Vec<_> = client
///     .transfer()
///     .task_list(None, Some(50))
///     .await?
///     .try_collect()
///     .await?;
/// println!("{} recent tasks", tasks.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GlobusClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) authorizer: Arc<dyn Authorizer>,
    pub(crate) config: ClientConfig,
}

impl GlobusClient {
    /// Create a client with the default configuration.
    pub fn new(authorizer: impl Authorizer + 'static) -> Result<Self> {
        Self::with_config(authorizer, ClientConfig::default())
    }

    /// Create a client with a custom configuration.
    pub fn with_config(authorizer: impl Authorizer + 'static, config: ClientConfig) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(ClientInner::new(Arc::new(authorizer), config)?),
        })
    }

    /// Create a client that renews its token with a refresh-token grant.
    ///
    /// `client_id` is a native (public) app registered with Globus Auth.
    /// The first access token is fetched before this returns.
    pub async fn from_refresh_token(
        client_id: impl Into<String>,
        refresh_token: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let auth = AuthClient::native(client_id, config.clone())?;
        let authorizer =
            RefreshTokenAuthorizer::new(RefreshTokenSource::new(auth, refresh_token)).await?;
        Self::with_config(authorizer, config)
    }

    /// Get the Transfer service.
    pub fn transfer(&self) -> TransferService {
        TransferService::new(self.inner.clone())
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}

impl ClientInner {
    pub(crate) fn new(authorizer: Arc<dyn Authorizer>, config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            http,
            authorizer,
            config,
        })
    }

    /// Resolve a path relative to a service's base URL.
    pub(crate) fn url(&self, service: Service, path: &str) -> Result<Url> {
        let base = self.config.service_url(service)?;
        Ok(base.join(path.trim_start_matches('/'))?)
    }

    /// Make a GET request.
    pub(crate) async fn get<T: DeserializeOwned>(&self, service: Service, path: &str) -> Result<T> {
        let request = self.request(Method::GET, service, path)?;
        self.execute(request).await
    }

    /// Make a GET request with query parameters.
    pub(crate) async fn get_with_query<T, Q>(&self, service: Service, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self.request(Method::GET, service, path)?.query(query);
        self.execute(request).await
    }

    /// Make a POST request with a JSON body.
    pub(crate) async fn post<T, B>(&self, service: Service, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.request(Method::POST, service, path)?.json(body);
        self.execute(request).await
    }

    /// Make a POST request with a form-encoded body.
    pub(crate) async fn post_form<T, F>(&self, service: Service, path: &str, form: &F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Serialize + ?Sized,
    {
        let request = self.request(Method::POST, service, path)?.form(form);
        self.execute(request).await
    }

    /// Make a PUT request with a JSON body.
    pub(crate) async fn put<T, B>(&self, service: Service, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.request(Method::PUT, service, path)?.json(body);
        self.execute(request).await
    }

    /// Make a DELETE request.
    pub(crate) async fn delete<T: DeserializeOwned>(&self, service: Service, path: &str) -> Result<T> {
        let request = self.request(Method::DELETE, service, path)?;
        self.execute(request).await
    }

    fn request(&self, method: Method, service: Service, path: &str) -> Result<RequestBuilder> {
        Ok(self.http.request(method, self.url(service, path)?))
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        self.handle_response(response).await
    }

    /// Send a request, resending it once with a renewed header if the
    /// server answers 401 and the authorizer can recover.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.send_with_retries(&request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if !self.authorizer.notify_authorization_failed().await {
            return Ok(response);
        }

        debug!(url = %response.url(), "got 401; retrying once with renewed authorization");
        self.send_with_retries(&request).await
    }

    async fn send_with_retries(&self, request: &RequestBuilder) -> Result<Response> {
        let retry = &self.config.retry;
        let mut attempt = 0;

        loop {
            let mut outgoing = request
                .try_clone()
                .ok_or_else(|| Error::InvalidInput("request body cannot be replayed".to_string()))?;
            if let Some(value) = self.authorizer.get_authorization_header().await? {
                outgoing = outgoing.header(AUTHORIZATION, value);
            }

            let response = outgoing.send().await?;
            let status = response.status().as_u16();

            if attempt >= retry.max_retries || !retry.should_retry_status(status) {
                return Ok(response);
            }

            let delay = retry_after(&response)
                .map(|d| d.min(retry.max_backoff))
                .unwrap_or_else(|| retry.backoff_for_attempt(attempt));
            debug!(status, attempt, ?delay, url = %response.url(), "transient error; retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Handle an API response.
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let status_code = status.as_u16();
        let retry_after_secs = retry_after(&response).map(|d| d.as_secs());
        let body: serde_json::Value = response.json().await.unwrap_or_default();

        match status_code {
            429 => Err(Error::RateLimited {
                retry_after_secs: retry_after_secs.unwrap_or(60),
            }),
            401 => Err(Error::Unauthorized {
                message: error_fields(&body)
                    .1
                    .unwrap_or_else(|| "Authorization rejected".to_string()),
            }),
            404 => Err(Error::NotFound(
                error_fields(&body)
                    .1
                    .unwrap_or_else(|| "Resource not found".to_string()),
            )),
            _ => Err(Error::from_api_response(status_code, body)),
        }
    }
}

/// Parse a `Retry-After` header given in seconds.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

impl std::fmt::Debug for GlobusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobusClient")
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::NullAuthorizer;

    #[test]
    fn test_url_joins_under_service_prefix() {
        let inner = ClientInner::new(Arc::new(NullAuthorizer), ClientConfig::default()).unwrap();
        assert_eq!(
            inner.url(Service::Transfer, "/task_list").unwrap().as_str(),
            "https://transfer.api.globus.org/v0.10/task_list"
        );
        assert_eq!(
            inner.url(Service::Auth, "v2/oauth2/token").unwrap().as_str(),
            "https://auth.globus.org/v2/oauth2/token"
        );
    }

    #[test]
    fn test_url_respects_override() {
        let config = ClientConfig::default().with_service_url(
            Service::Transfer,
            Url::parse("http://127.0.0.1:9999").unwrap(),
        );
        let inner = ClientInner::new(Arc::new(NullAuthorizer), config).unwrap();
        assert_eq!(
            inner.url(Service::Transfer, "endpoint_search").unwrap().as_str(),
            "http://127.0.0.1:9999/endpoint_search"
        );
    }
}
