//! # globus-sdk
//!
//! An async Rust client for the Globus REST APIs.
//!
//! The crate takes care of request construction, authorization headers,
//! JSON decoding, pagination and error mapping so that applications can
//! work with typed results.
//!
//! ## Features
//!
//! - **Authorizers**: static bearer/basic credentials, and renewing
//!   authorizers that refresh access tokens through Globus Auth
//! - **401 recovery**: a rejected token is renewed and the request resent once
//! - **Uniform pagination**: offset, total, marker and last-key list APIs all
//!   surface as a single item [`Stream`](futures_util::Stream)
//! - **Token storage**: in-memory and JSON-file storages that persist every
//!   refreshed token
//! - **Async-first**: built on Tokio and reqwest
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures_util::TryStreamExt;
//! use globus_sdk::{ClientConfig, GlobusClient};
//!
//! #[tokio::main]
//! async fn main() -> globus_sdk::Result<()> {
//!     let client = GlobusClient::from_refresh_token(
//!         "my-native-app-client-id",
//!         "my-refresh-token",
//!         ClientConfig::from_env()?,
//!     )
//!     .await?;
//!
//!     let tasks: Vec<_> = client
//!         .transfer()
//!         .task_list(None, Some(10))
//!         .await?
//!         .try_collect()
//!         .await?;
//!
//!     for task in tasks {
//!         println!("{} {:?}", task.task_id, task.status);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod models;

// Re-export primary types at crate root for convenience
pub use error::{Error, Result};
pub use models::{EndpointId, Environment, Service, TaskId};
pub use client::{ClientConfig, GlobusClient, RetryConfig};
pub use auth::{AccessTokenAuthorizer, Authorizer, RefreshTokenAuthorizer};

/// Prelude module for convenient imports.
///
/// ```rust
/// use globus_sdk::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::models::{
        Endpoint, EndpointId, Environment, Service, SuccessfulTransfer, Task, TaskId, TaskStatus,
        TaskType,
    };
    pub use crate::client::{
        ClientConfig, GlobusClient, PaginatedCall, PaginatedStream, PagingLimits, PagingStrategy,
        RetryConfig,
    };
    pub use crate::auth::{
        AccessTokenAuthorizer, Authorizer, ClientCredentialsAuthorizer, RefreshTokenAuthorizer,
        RenewingAuthorizer, TokenRefreshOutcome,
    };
}
