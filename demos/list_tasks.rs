//! List recent Transfer tasks using a refresh token.
//!
//! The renewed tokens are saved to `tokens.json` so the next run can reuse
//! the rotated refresh token.
//!
//! Run with:
//! GLOBUS_CLIENT_ID=... GLOBUS_REFRESH_TOKEN=... cargo run --example list_tasks

use futures_util::StreamExt;
use tracing_subscriber::EnvFilter;

use globus_sdk::api::TaskListQuery;
use globus_sdk::auth::{
    AuthClient, JsonTokenStorage, RefreshTokenAuthorizer, RefreshTokenSource, TokenStorage,
};
use globus_sdk::{ClientConfig, GlobusClient};

const TRANSFER: &str = "transfer.api.globus.org";

#[tokio::main]
async fn main() -> globus_sdk::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client_id = std::env::var("GLOBUS_CLIENT_ID")
        .expect("GLOBUS_CLIENT_ID environment variable required");

    let storage = JsonTokenStorage::new("tokens.json");
    let stored = storage
        .get_token_data(TRANSFER)
        .await?
        .and_then(|data| data.refresh_token);
    let refresh_token = match stored {
        Some(refresh_token) => refresh_token,
        None => std::env::var("GLOBUS_REFRESH_TOKEN")
            .expect("GLOBUS_REFRESH_TOKEN environment variable required"),
    };

    let config = ClientConfig::from_env()?;
    let auth = AuthClient::native(client_id, config.clone())?;
    let source = RefreshTokenSource::new(auth, refresh_token).with_resource_server(TRANSFER);
    let authorizer = RefreshTokenAuthorizer::builder(source)
        .with_on_refresh(storage.clone())
        .build()
        .await?;

    let client = GlobusClient::with_config(authorizer, config)?;
    println!("Connected to {} environment", client.config().environment);

    let query = TaskListQuery {
        orderby: Some("request_time DESC".to_string()),
        ..Default::default()
    };
    let mut tasks = client.transfer().task_list(Some(query), Some(20)).await?;

    println!("\nRecent tasks:");
    while let Some(task) = tasks.next().await {
        let task = task?;
        println!(
            "  {} {:?} {:?} ({} files)",
            task.task_id,
            task.status,
            task.label.as_deref().unwrap_or("untitled"),
            task.files_transferred
        );
    }

    println!("\nDone!");
    Ok(())
}
