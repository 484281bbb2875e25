//! Access-token authorizer that renews its credential on demand.
//!
//! A [`RenewingAuthorizer`] holds one access token and its expiration. The
//! token is refreshed when it is missing, when its (skew-adjusted)
//! expiration has passed, and on the next use after the server rejected it
//! with a 401. How a new token is obtained is delegated to a
//! [`TokenSource`], so the same state machine serves refresh-token and
//! client-credentials grants alike.
//!
//! # Example
//!
//! ```no_run
//! use globus_sdk::auth::{AuthClient, RefreshTokenAuthorizer, RefreshTokenSource};
//! use globus_sdk::{ClientConfig, GlobusClient};
//!
//! # async fn example() -> globus_sdk::Result<()> {
//! let auth = AuthClient::native("my-client-id", ClientConfig::default())?;
//! let source = RefreshTokenSource::new(auth, "my-refresh-token");
//!
//! // No initial token: the first access token is fetched right away.
//! let authorizer = RefreshTokenAuthorizer::builder(source)
//!     .with_on_refresh(|outcome: &globus_sdk::auth::TokenRefreshOutcome| -> globus_sdk::Result<()> {
//!         println!("new token expires at {}", outcome.expires_at);
//!         Ok(())
//!     })
//!     .build()
//!     .await?;
//!
//! let client = GlobusClient::new(authorizer)?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::authorizer::Authorizer;
use super::token::{OAuthTokenResponse, TokenRefreshOutcome};
use crate::{Error, Result};

/// Seconds subtracted from every stored expiration, so tokens are renewed
/// slightly before the server would reject them.
pub const EXPIRES_ADJUST_SECONDS: i64 = 60;

/// Obtains new tokens for a [`RenewingAuthorizer`].
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Perform one grant. Errors are returned as-is and never retried.
    async fn fetch_token(&self) -> Result<OAuthTokenResponse>;

    /// Resource server whose token to use from the grant response.
    ///
    /// `None` requires the response to carry exactly one token.
    fn resource_server(&self) -> Option<&str> {
        None
    }
}

/// Called with every successful refresh, typically to persist tokens.
///
/// An error returned here propagates to whichever call triggered the
/// refresh. The authorizer has already adopted the new token by then.
#[async_trait]
pub trait RefreshHandler: Send + Sync {
    /// Handle a refresh result.
    async fn on_refresh(&self, outcome: &TokenRefreshOutcome) -> Result<()>;
}

#[async_trait]
impl<F> RefreshHandler for F
where
    F: Fn(&TokenRefreshOutcome) -> Result<()> + Send + Sync,
{
    async fn on_refresh(&self, outcome: &TokenRefreshOutcome) -> Result<()> {
        (self)(outcome)
    }
}

/// Freshness of the held credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    /// No token; the next use fetches one.
    Empty,
    /// Token present and not yet past its adjusted expiration.
    Fresh,
    /// Token present but expired, or invalidated by a 401.
    Stale,
}

#[derive(Default)]
struct AccessCredential {
    access_token: Option<SecretString>,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessCredential {
    fn from_outcome(outcome: &TokenRefreshOutcome) -> Self {
        Self {
            access_token: Some(outcome.access_token.clone()),
            expires_at: Some(adjust(outcome.expires_at)),
        }
    }

    fn state(&self, now: DateTime<Utc>) -> CredentialState {
        match (&self.access_token, self.expires_at) {
            (None, _) => CredentialState::Empty,
            (Some(_), Some(expires_at)) if now <= expires_at => CredentialState::Fresh,
            (Some(_), _) => CredentialState::Stale,
        }
    }
}

fn adjust(expires_at: DateTime<Utc>) -> DateTime<Utc> {
    expires_at
        .checked_sub_signed(Duration::seconds(EXPIRES_ADJUST_SECONDS))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// An [`Authorizer`] that keeps a bearer token valid by re-running a grant.
///
/// Credential states move `Empty → Fresh` on refresh, `Fresh → Stale` on
/// expiry or [`notify_authorization_failed`](Authorizer::notify_authorization_failed),
/// and `Stale → Fresh` on the next refresh. The check-refresh-store sequence
/// runs under a lock, so concurrent callers sharing one authorizer trigger a
/// single refresh.
pub struct RenewingAuthorizer<S> {
    source: S,
    credential: Mutex<AccessCredential>,
    on_refresh: Option<Arc<dyn RefreshHandler>>,
}

/// Builder for [`RenewingAuthorizer`].
pub struct RenewingAuthorizerBuilder<S> {
    source: S,
    access_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    on_refresh: Option<Arc<dyn RefreshHandler>>,
}

impl<S: TokenSource> RenewingAuthorizerBuilder<S> {
    /// Start from a previously issued token.
    ///
    /// A token without an expiration cannot be judged fresh and is dropped
    /// when the authorizer is built.
    pub fn with_access_token(
        mut self,
        access_token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.access_token = Some(access_token.into());
        self.expires_at = expires_at;
        self
    }

    /// Set only the initial expiration.
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Register a handler invoked after every successful refresh.
    pub fn with_on_refresh<H: RefreshHandler + 'static>(mut self, handler: H) -> Self {
        self.on_refresh = Some(Arc::new(handler));
        self
    }

    /// Build the authorizer.
    ///
    /// If no usable initial token was given, a refresh runs before this
    /// returns, so a built authorizer always holds a credential.
    pub async fn build(self) -> Result<RenewingAuthorizer<S>> {
        let mut credential = AccessCredential::default();

        match (self.access_token, self.expires_at) {
            (Some(_), None) => {
                warn!("access token supplied without an expiration time; it will be ignored");
            }
            (Some(token), Some(expires_at)) => {
                credential.access_token = Some(SecretString::from(token));
                credential.expires_at = Some(adjust(expires_at));
            }
            (None, _) => {}
        }

        let authorizer = RenewingAuthorizer {
            source: self.source,
            credential: Mutex::new(credential),
            on_refresh: self.on_refresh,
        };

        let refreshed = {
            let mut credential = authorizer.credential.lock().await;
            if credential.access_token.is_none() {
                Some(authorizer.refresh_locked(&mut credential).await?)
            } else {
                None
            }
        };
        if let Some(outcome) = refreshed {
            authorizer.notify_refresh(&outcome).await?;
        }

        Ok(authorizer)
    }
}

impl<S: TokenSource> RenewingAuthorizer<S> {
    /// Start building an authorizer around a token source.
    pub fn builder(source: S) -> RenewingAuthorizerBuilder<S> {
        RenewingAuthorizerBuilder {
            source,
            access_token: None,
            expires_at: None,
            on_refresh: None,
        }
    }

    /// Build an authorizer with no initial token, fetching one immediately.
    pub async fn new(source: S) -> Result<Self> {
        Self::builder(source).build().await
    }

    /// The token source backing this authorizer.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Refresh the token if it is missing or stale. Otherwise a no-op.
    pub async fn ensure_valid_token(&self) -> Result<()> {
        let refreshed = {
            let mut credential = self.credential.lock().await;
            self.ensure_locked(&mut credential).await?
        };
        if let Some(outcome) = refreshed {
            self.notify_refresh(&outcome).await?;
        }
        Ok(())
    }

    /// Current freshness of the credential.
    pub async fn state(&self) -> CredentialState {
        self.credential.lock().await.state(Utc::now())
    }

    /// Stored (skew-adjusted) expiration, if any.
    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.credential.lock().await.expires_at
    }

    async fn ensure_locked(
        &self,
        credential: &mut AccessCredential,
    ) -> Result<Option<TokenRefreshOutcome>> {
        match credential.state(Utc::now()) {
            CredentialState::Fresh => Ok(None),
            state => {
                debug!(?state, "access token needs renewal");
                self.refresh_locked(credential).await.map(Some)
            }
        }
    }

    async fn refresh_locked(&self, credential: &mut AccessCredential) -> Result<TokenRefreshOutcome> {
        let response = self.source.fetch_token().await?;
        let outcome = TokenRefreshOutcome::from_response(response, self.source.resource_server())?;
        *credential = AccessCredential::from_outcome(&outcome);
        debug!(expires_at = %outcome.expires_at, "access token renewed");
        Ok(outcome)
    }

    async fn notify_refresh(&self, outcome: &TokenRefreshOutcome) -> Result<()> {
        match &self.on_refresh {
            Some(handler) => handler.on_refresh(outcome).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<S: TokenSource> Authorizer for RenewingAuthorizer<S> {
    async fn get_authorization_header(&self) -> Result<Option<String>> {
        let (header, refreshed) = {
            let mut credential = self.credential.lock().await;
            let refreshed = self.ensure_locked(&mut credential).await?;
            let token = credential
                .access_token
                .as_ref()
                .ok_or_else(|| Error::TokenGrant("no access token after renewal".to_string()))?;
            (format!("Bearer {}", token.expose_secret()), refreshed)
        };
        if let Some(outcome) = refreshed {
            self.notify_refresh(&outcome).await?;
        }
        Ok(Some(header))
    }

    async fn notify_authorization_failed(&self) -> bool {
        debug!("authorization rejected; access token marked stale");
        self.credential.lock().await.expires_at = None;
        true
    }
}

impl<S> fmt::Debug for RenewingAuthorizer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenewingAuthorizer")
            .field("access_token", &"[REDACTED]")
            .field("on_refresh", &self.on_refresh.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        expires_in: i64,
    }

    impl CountingSource {
        fn new(expires_in: i64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                expires_in,
            }
        }
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch_token(&self) -> Result<OAuthTokenResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(serde_json::from_value(serde_json::json!({
                "access_token": format!("token-{n}"),
                "expires_in": self.expires_in,
                "resource_server": "transfer.api.globus.org",
            }))?)
        }
    }

    #[test]
    fn test_credential_states() {
        let now = Utc::now();
        let mut credential = AccessCredential::default();
        assert_eq!(credential.state(now), CredentialState::Empty);

        credential.access_token = Some(SecretString::from("t".to_string()));
        assert_eq!(credential.state(now), CredentialState::Stale);

        credential.expires_at = Some(now + Duration::seconds(10));
        assert_eq!(credential.state(now), CredentialState::Fresh);

        credential.expires_at = Some(now - Duration::seconds(1));
        assert_eq!(credential.state(now), CredentialState::Stale);
    }

    #[tokio::test]
    async fn test_initial_token_is_adjusted_for_skew() {
        let given = Utc::now() + Duration::seconds(3600);
        let authorizer = RenewingAuthorizer::builder(CountingSource::new(3600))
            .with_access_token("initial", Some(given))
            .build()
            .await
            .unwrap();

        assert_eq!(authorizer.source().calls.load(Ordering::SeqCst), 0);
        assert_eq!(authorizer.expires_at().await, Some(given - Duration::seconds(60)));
        assert_eq!(
            authorizer.get_authorization_header().await.unwrap().as_deref(),
            Some("Bearer initial")
        );
    }

    #[tokio::test]
    async fn test_short_lived_token_is_always_stale() {
        // Lifetime shorter than the skew buffer: every use refreshes.
        let authorizer = RenewingAuthorizer::new(CountingSource::new(30)).await.unwrap();
        assert_eq!(authorizer.state().await, CredentialState::Stale);

        authorizer.get_authorization_header().await.unwrap();
        assert_eq!(authorizer.source().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unrepresentable_lifetime_fails_refresh() {
        let err = RenewingAuthorizer::new(CountingSource::new(i64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TokenGrant(_)));

        let authorizer = RenewingAuthorizer::builder(CountingSource::new(i64::MAX))
            .with_access_token("initial", Some(Utc::now() + Duration::seconds(3600)))
            .build()
            .await
            .unwrap();
        authorizer.notify_authorization_failed().await;
        assert!(matches!(
            authorizer.get_authorization_header().await,
            Err(Error::TokenGrant(_))
        ));
    }

    #[tokio::test]
    async fn test_debug_redacts() {
        let authorizer = RenewingAuthorizer::new(CountingSource::new(3600)).await.unwrap();
        let debug_str = format!("{:?}", authorizer);
        assert!(!debug_str.contains("token-1"));
        assert!(debug_str.contains("REDACTED"));
    }
}
