//! Authorization for Globus API requests.
//!
//! Every request made by a [`GlobusClient`](crate::GlobusClient) asks its
//! [`Authorizer`] for an `Authorization` header. Static authorizers cover
//! fixed bearer tokens and HTTP Basic credentials; a [`RenewingAuthorizer`]
//! keeps a bearer token valid by re-running an OAuth2 grant.
//!
//! # Refresh tokens
//!
//! ```no_run
//! use globus_sdk::auth::{AuthClient, JsonTokenStorage, RefreshTokenAuthorizer, RefreshTokenSource};
//! use globus_sdk::ClientConfig;
//!
//! # async fn example() -> globus_sdk::Result<()> {
//! let auth = AuthClient::native("my-client-id", ClientConfig::default())?;
//! let source = RefreshTokenSource::new(auth, "my-refresh-token")
//!     .with_resource_server("transfer.api.globus.org");
//!
//! let authorizer = RefreshTokenAuthorizer::builder(source)
//!     .with_on_refresh(JsonTokenStorage::new("tokens.json"))
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Client credentials
//!
//! ```no_run
//! use globus_sdk::auth::{AuthClient, ClientCredentialsAuthorizer, ClientCredentialsSource};
//! use globus_sdk::ClientConfig;
//!
//! # async fn example() -> globus_sdk::Result<()> {
//! let auth = AuthClient::confidential("client-id", "client-secret", ClientConfig::default())?;
//! let source = ClientCredentialsSource::new(
//!     auth,
//!     ["urn:globus:auth:scope:transfer.api.globus.org:all"],
//! );
//! let authorizer = ClientCredentialsAuthorizer::new(source).await?;
//! # Ok(())
//! # }
//! ```

mod authorizer;
mod client;
mod renewing;
mod storage;
mod token;

pub use authorizer::{AccessTokenAuthorizer, Authorizer, BasicAuthorizer, NullAuthorizer};
pub use client::{
    AuthClient, ClientCredentialsAuthorizer, ClientCredentialsSource, RefreshTokenAuthorizer,
    RefreshTokenSource,
};
pub use renewing::{
    CredentialState, RefreshHandler, RenewingAuthorizer, RenewingAuthorizerBuilder, TokenSource,
    EXPIRES_ADJUST_SECONDS,
};
pub use storage::{JsonTokenStorage, MemoryTokenStorage, TokenStorage};
pub use token::{OAuthTokenResponse, TokenData, TokenRefreshOutcome};
