//! The [`Authorizer`] trait and its static implementations.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};

use crate::Result;

/// Produces the `Authorization` header for each outgoing request.
///
/// The HTTP layer calls [`get_authorization_header`](Self::get_authorization_header)
/// before every send. When the server answers 401 it calls
/// [`notify_authorization_failed`](Self::notify_authorization_failed) and, if
/// that returns `true`, resends the request exactly once.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Header value to send, or `None` to send no `Authorization` header.
    async fn get_authorization_header(&self) -> Result<Option<String>>;

    /// React to a 401 response.
    ///
    /// Returns `true` if the authorizer may be able to supply a working
    /// credential on the next attempt.
    async fn notify_authorization_failed(&self) -> bool {
        false
    }
}

#[async_trait]
impl<A: Authorizer + ?Sized> Authorizer for Arc<A> {
    async fn get_authorization_header(&self) -> Result<Option<String>> {
        (**self).get_authorization_header().await
    }

    async fn notify_authorization_failed(&self) -> bool {
        (**self).notify_authorization_failed().await
    }
}

/// Sends no `Authorization` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuthorizer;

#[async_trait]
impl Authorizer for NullAuthorizer {
    async fn get_authorization_header(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Sends a fixed bearer token. Cannot recover from a 401.
#[derive(Clone)]
pub struct AccessTokenAuthorizer {
    access_token: SecretString,
}

impl AccessTokenAuthorizer {
    /// Create an authorizer for a bearer token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
        }
    }
}

#[async_trait]
impl Authorizer for AccessTokenAuthorizer {
    async fn get_authorization_header(&self) -> Result<Option<String>> {
        Ok(Some(format!("Bearer {}", self.access_token.expose_secret())))
    }
}

impl fmt::Debug for AccessTokenAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenAuthorizer")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Sends HTTP Basic credentials, as confidential clients do against the
/// Auth token endpoint.
#[derive(Clone)]
pub struct BasicAuthorizer {
    header: SecretString,
}

impl BasicAuthorizer {
    /// Create an authorizer for a username/password pair.
    pub fn new(username: &str, password: &str) -> Self {
        let encoded = STANDARD.encode(format!("{username}:{password}"));
        Self {
            header: SecretString::from(format!("Basic {encoded}")),
        }
    }
}

#[async_trait]
impl Authorizer for BasicAuthorizer {
    async fn get_authorization_header(&self) -> Result<Option<String>> {
        Ok(Some(self.header.expose_secret().to_string()))
    }
}

impl fmt::Debug for BasicAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthorizer")
            .field("header", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_authorizer_sends_nothing() {
        assert_eq!(NullAuthorizer.get_authorization_header().await.unwrap(), None);
        assert!(!NullAuthorizer.notify_authorization_failed().await);
    }

    #[tokio::test]
    async fn test_access_token_authorizer() {
        let authorizer = AccessTokenAuthorizer::new("tok");
        assert_eq!(
            authorizer.get_authorization_header().await.unwrap().as_deref(),
            Some("Bearer tok")
        );
        assert!(!authorizer.notify_authorization_failed().await);
        assert!(format!("{:?}", authorizer).contains("REDACTED"));
    }

    #[tokio::test]
    async fn test_basic_authorizer_encodes_credentials() {
        let authorizer = BasicAuthorizer::new("client-id", "s3cret");
        // base64("client-id:s3cret")
        assert_eq!(
            authorizer.get_authorization_header().await.unwrap().as_deref(),
            Some("Basic Y2xpZW50LWlkOnMzY3JldA==")
        );
    }

    #[tokio::test]
    async fn test_arc_forwards() {
        let shared: Arc<dyn Authorizer> = Arc::new(AccessTokenAuthorizer::new("abc"));
        assert_eq!(
            shared.get_authorization_header().await.unwrap().as_deref(),
            Some("Bearer abc")
        );
    }
}
