//! Globus Auth token endpoint client and the token sources built on it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use super::authorizer::{Authorizer, BasicAuthorizer, NullAuthorizer};
use super::renewing::{RenewingAuthorizer, TokenSource};
use super::token::OAuthTokenResponse;
use crate::client::{ClientConfig, ClientInner};
use crate::models::Service;
use crate::{Error, Result};

const TOKEN_PATH: &str = "v2/oauth2/token";
const REVOKE_PATH: &str = "v2/oauth2/token/revoke";

/// Client for the Globus Auth OAuth2 token endpoints.
///
/// A native (public) app identifies itself with `client_id` in the form
/// body. A confidential app authenticates with HTTP Basic credentials.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<ClientInner>,
    client_id: String,
    confidential: bool,
}

#[derive(Serialize)]
struct GrantForm<'a> {
    grant_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_id: Option<&'a str>,
}

#[derive(Serialize)]
struct RevokeForm<'a> {
    token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_id: Option<&'a str>,
}

impl AuthClient {
    /// Client for a native app, which has no secret.
    pub fn native(client_id: impl Into<String>, config: ClientConfig) -> Result<Self> {
        Self::build(client_id.into(), false, Arc::new(NullAuthorizer), config)
    }

    /// Client for a confidential app.
    pub fn confidential(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let client_id = client_id.into();
        let client_secret: String = client_secret.into();
        let authorizer = BasicAuthorizer::new(&client_id, &client_secret);
        Self::build(client_id, true, Arc::new(authorizer), config)
    }

    fn build(
        client_id: String,
        confidential: bool,
        authorizer: Arc<dyn Authorizer>,
        config: ClientConfig,
    ) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(ClientInner::new(authorizer, config)?),
            client_id,
            confidential,
        })
    }

    /// The app's client ID.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Whether this client authenticates with a secret.
    pub fn is_confidential(&self) -> bool {
        self.confidential
    }

    /// Exchange a refresh token for new tokens.
    pub async fn refresh_token_grant(&self, refresh_token: &str) -> Result<OAuthTokenResponse> {
        debug!(client_id = %self.client_id, "requesting refresh_token grant");
        let form = GrantForm {
            grant_type: "refresh_token",
            refresh_token: Some(refresh_token),
            scope: None,
            client_id: self.form_client_id(),
        };
        self.inner.post_form(Service::Auth, TOKEN_PATH, &form).await
    }

    /// Obtain tokens for the app itself. Only confidential apps may do this.
    pub async fn client_credentials_grant(&self, scopes: &[String]) -> Result<OAuthTokenResponse> {
        if !self.confidential {
            return Err(Error::InvalidInput(
                "client_credentials grant requires a confidential client".to_string(),
            ));
        }
        debug!(client_id = %self.client_id, ?scopes, "requesting client_credentials grant");
        let form = GrantForm {
            grant_type: "client_credentials",
            refresh_token: None,
            scope: Some(scopes.join(" ")),
            client_id: None,
        };
        self.inner.post_form(Service::Auth, TOKEN_PATH, &form).await
    }

    /// Revoke an access or refresh token.
    pub async fn revoke_token(&self, token: &str) -> Result<()> {
        let form = RevokeForm {
            token,
            client_id: self.form_client_id(),
        };
        let _: serde_json::Value = self.inner.post_form(Service::Auth, REVOKE_PATH, &form).await?;
        Ok(())
    }

    fn form_client_id(&self) -> Option<&str> {
        (!self.confidential).then_some(self.client_id.as_str())
    }
}

impl fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthClient")
            .field("client_id", &self.client_id)
            .field("confidential", &self.confidential)
            .finish()
    }
}

/// Renews tokens with a refresh-token grant.
///
/// When Globus Auth rotates the refresh token, the new one is used for
/// every later grant.
pub struct RefreshTokenSource {
    auth: AuthClient,
    refresh_token: Mutex<SecretString>,
    resource_server: Option<String>,
}

impl RefreshTokenSource {
    /// Create a source from an auth client and a refresh token.
    pub fn new(auth: AuthClient, refresh_token: impl Into<String>) -> Self {
        Self {
            auth,
            refresh_token: Mutex::new(SecretString::from(refresh_token.into())),
            resource_server: None,
        }
    }

    /// Use the token for this resource server from multi-token responses.
    pub fn with_resource_server(mut self, resource_server: impl Into<String>) -> Self {
        self.resource_server = Some(resource_server.into());
        self
    }

    /// The refresh token the next grant will use.
    pub async fn refresh_token(&self) -> String {
        self.refresh_token.lock().await.expose_secret().to_string()
    }
}

#[async_trait]
impl TokenSource for RefreshTokenSource {
    async fn fetch_token(&self) -> Result<OAuthTokenResponse> {
        let mut refresh_token = self.refresh_token.lock().await;
        let response = self
            .auth
            .refresh_token_grant(refresh_token.expose_secret())
            .await?;

        let rotated = response
            .token_for(self.resource_server.as_deref())
            .ok()
            .and_then(|token| token.refresh_token)
            .filter(|new| new.as_str() != refresh_token.expose_secret());
        if let Some(new) = rotated {
            debug!("refresh token rotated");
            *refresh_token = SecretString::from(new);
        }

        Ok(response)
    }

    fn resource_server(&self) -> Option<&str> {
        self.resource_server.as_deref()
    }
}

impl fmt::Debug for RefreshTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshTokenSource")
            .field("auth", &self.auth)
            .field("refresh_token", &"[REDACTED]")
            .field("resource_server", &self.resource_server)
            .finish()
    }
}

/// Renews tokens with a client-credentials grant.
#[derive(Debug)]
pub struct ClientCredentialsSource {
    auth: AuthClient,
    scopes: Vec<String>,
    resource_server: Option<String>,
}

impl ClientCredentialsSource {
    /// Create a source requesting `scopes` for a confidential client.
    pub fn new<I, T>(auth: AuthClient, scopes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            auth,
            scopes: scopes.into_iter().map(Into::into).collect(),
            resource_server: None,
        }
    }

    /// Use the token for this resource server from multi-token responses.
    pub fn with_resource_server(mut self, resource_server: impl Into<String>) -> Self {
        self.resource_server = Some(resource_server.into());
        self
    }
}

#[async_trait]
impl TokenSource for ClientCredentialsSource {
    async fn fetch_token(&self) -> Result<OAuthTokenResponse> {
        self.auth.client_credentials_grant(&self.scopes).await
    }

    fn resource_server(&self) -> Option<&str> {
        self.resource_server.as_deref()
    }
}

/// Authorizer renewed through a refresh-token grant.
pub type RefreshTokenAuthorizer = RenewingAuthorizer<RefreshTokenSource>;

/// Authorizer renewed through a client-credentials grant.
pub type ClientCredentialsAuthorizer = RenewingAuthorizer<ClientCredentialsSource>;
