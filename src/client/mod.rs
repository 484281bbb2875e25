//! HTTP client, configuration and pagination.
//!
//! [`GlobusClient`] is the entry point; it owns the transport, the
//! [`Authorizer`](crate::auth::Authorizer) and the [`ClientConfig`], and
//! hands out service structs such as
//! [`TransferService`](crate::api::TransferService).
//!
//! # Example
//!
//! ```no_run
//! use globus_sdk::{AccessTokenAuthorizer, ClientConfig, GlobusClient};
//!
//! # async fn example() -> globus_sdk::Result<()> {
//! let client = GlobusClient::with_config(
//!     AccessTokenAuthorizer::new("transfer-token"),
//!     ClientConfig::from_env()?,
//! )?;
//!
//! let task = client.transfer().get_task(&"some-task-id".into()).await?;
//! println!("{:?}", task.status);
//! # Ok(())
//! # }
//! ```

mod config;
mod http;
pub mod paginated;

pub use config::{ClientConfig, RetryConfig};
pub use http::GlobusClient;
pub use paginated::{
    Page, PageRequest, PaginatedCall, PaginatedStream, PagingLimits, PagingStrategy,
    DEFAULT_MAX_RESULTS_PER_CALL,
};
pub(crate) use http::ClientInner;
