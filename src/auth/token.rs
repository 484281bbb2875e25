//! Token grant responses and per-resource-server token data.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One token as it appears in a Globus Auth token response, either at the
/// top level or inside `other_tokens`.
#[derive(Clone, Deserialize)]
struct GrantedToken {
    access_token: String,
    expires_in: i64,
    resource_server: String,
    #[serde(default)]
    scope: String,
    #[serde(default = "bearer")]
    token_type: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

fn bearer() -> String {
    "Bearer".to_string()
}

/// Response from the Globus Auth token endpoint.
///
/// A single grant may yield tokens for several resource servers: the
/// primary one at the top level and the rest in `other_tokens`.
/// [`by_resource_server`](Self::by_resource_server) flattens both.
#[derive(Clone, Deserialize)]
pub struct OAuthTokenResponse {
    #[serde(flatten)]
    primary: GrantedToken,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    other_tokens: Vec<GrantedToken>,
    #[serde(skip, default = "Utc::now")]
    received_at: DateTime<Utc>,
}

impl OAuthTokenResponse {
    /// Instant the response was parsed; `expires_in` counts from here.
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Override the receipt time (useful when replaying stored responses).
    pub fn with_received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = received_at;
        self
    }

    /// OpenID Connect ID token, when the grant requested `openid`.
    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    /// Resource servers this response carries tokens for.
    pub fn resource_servers(&self) -> impl Iterator<Item = &str> {
        self.tokens().map(|t| t.resource_server.as_str())
    }

    /// All tokens in the response, keyed by resource server.
    ///
    /// Fails when any token's lifetime cannot be represented as a timestamp.
    pub fn by_resource_server(&self) -> Result<HashMap<String, TokenData>> {
        self.tokens()
            .map(|t| Ok((t.resource_server.clone(), self.token_data(t)?)))
            .collect()
    }

    /// Select the token an authorizer should use.
    ///
    /// With a resource server name, that server's token is returned. Without
    /// one, the response must carry exactly one token.
    pub fn token_for(&self, resource_server: Option<&str>) -> Result<TokenData> {
        match resource_server {
            Some(name) => self.token_data(self.granted(name)?),
            None if self.other_tokens.is_empty() => self.token_data(&self.primary),
            None => Err(Error::TokenGrant(format!(
                "token response holds {} tokens; a resource server must be chosen",
                self.other_tokens.len() + 1
            ))),
        }
    }

    fn tokens(&self) -> impl Iterator<Item = &GrantedToken> {
        std::iter::once(&self.primary).chain(self.other_tokens.iter())
    }

    fn granted(&self, resource_server: &str) -> Result<&GrantedToken> {
        self.tokens()
            .find(|t| t.resource_server == resource_server)
            .ok_or_else(|| {
                Error::TokenGrant(format!("token response has no token for {resource_server:?}"))
            })
    }

    fn token_data(&self, token: &GrantedToken) -> Result<TokenData> {
        Ok(TokenData {
            resource_server: token.resource_server.clone(),
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at_seconds: self.expires_at(token)?.timestamp(),
            scope: token.scope.clone(),
            token_type: token.token_type.clone(),
        })
    }

    fn expires_at(&self, token: &GrantedToken) -> Result<DateTime<Utc>> {
        TimeDelta::try_seconds(token.expires_in)
            .and_then(|lifetime| self.received_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                Error::TokenGrant(format!(
                    "expires_in {} for {:?} is out of range",
                    token.expires_in, token.resource_server
                ))
            })
    }
}

impl fmt::Debug for OAuthTokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokenResponse")
            .field("resource_servers", &self.resource_servers().collect::<Vec<_>>())
            .field("received_at", &self.received_at)
            .finish_non_exhaustive()
    }
}

/// Token data for a single resource server, in the shape token storages
/// persist.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    /// Resource server the token is valid for
    pub resource_server: String,
    /// Bearer access token
    pub access_token: String,
    /// Refresh token, when the grant issued one
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Absolute expiration as a unix timestamp
    pub expires_at_seconds: i64,
    /// Space-separated scope string
    #[serde(default)]
    pub scope: String,
    /// Token type, normally `Bearer`
    #[serde(default = "bearer")]
    pub token_type: String,
}

impl TokenData {
    /// Absolute expiration time.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at_seconds, 0)
    }
}

impl fmt::Debug for TokenData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenData")
            .field("resource_server", &self.resource_server)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at_seconds", &self.expires_at_seconds)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Result of one successful refresh performed by a
/// [`RenewingAuthorizer`](super::RenewingAuthorizer).
///
/// `expires_at` is the server-reported lifetime added to the time the grant
/// response arrived, without any skew adjustment.
pub struct TokenRefreshOutcome {
    /// The new access token
    pub access_token: SecretString,
    /// When the new token expires
    pub expires_at: DateTime<Utc>,
    /// The full grant response, for persisting every issued token
    pub response: OAuthTokenResponse,
}

impl TokenRefreshOutcome {
    /// Build an outcome from a grant response for the given resource server.
    pub fn from_response(
        response: OAuthTokenResponse,
        resource_server: Option<&str>,
    ) -> Result<Self> {
        let token = response.token_for(resource_server)?;
        let expires_at = response.expires_at(response.granted(&token.resource_server)?)?;
        Ok(Self {
            access_token: SecretString::from(token.access_token),
            expires_at,
            response,
        })
    }
}

impl fmt::Debug for TokenRefreshOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRefreshOutcome")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("response", &self.response)
            .finish()
    }
}
