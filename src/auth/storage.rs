//! Persistence for tokens, keyed by resource server.
//!
//! Both storages implement [`RefreshHandler`], so one can be passed straight
//! to [`RenewingAuthorizerBuilder::with_on_refresh`](super::RenewingAuthorizerBuilder::with_on_refresh)
//! to save every renewed token.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::renewing::RefreshHandler;
use super::token::{OAuthTokenResponse, TokenData, TokenRefreshOutcome};
use crate::{Error, Result};

const FORMAT_VERSION: &str = "1.0";

/// Storage for [`TokenData`] keyed by resource server.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Save every token in a grant response.
    ///
    /// A stored refresh token survives when the new response omits one.
    async fn store(&self, response: &OAuthTokenResponse) -> Result<()>;

    /// Token data for one resource server.
    async fn get_token_data(&self, resource_server: &str) -> Result<Option<TokenData>>;

    /// Forget one resource server's token. Returns whether one was stored.
    async fn remove_token_data(&self, resource_server: &str) -> Result<bool>;
}

fn merge(
    existing: &mut HashMap<String, TokenData>,
    response: &OAuthTokenResponse,
) -> Result<()> {
    for (resource_server, mut token) in response.by_resource_server()? {
        if token.refresh_token.is_none() {
            token.refresh_token = existing
                .get(&resource_server)
                .and_then(|old| old.refresh_token.clone());
        }
        existing.insert(resource_server, token);
    }
    Ok(())
}

/// In-process token storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStorage {
    tokens: Arc<RwLock<HashMap<String, TokenData>>>,
}

impl MemoryTokenStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn store(&self, response: &OAuthTokenResponse) -> Result<()> {
        merge(&mut *self.tokens.write().await, response)
    }

    async fn get_token_data(&self, resource_server: &str) -> Result<Option<TokenData>> {
        Ok(self.tokens.read().await.get(resource_server).cloned())
    }

    async fn remove_token_data(&self, resource_server: &str) -> Result<bool> {
        Ok(self.tokens.write().await.remove(resource_server).is_some())
    }
}

#[async_trait]
impl RefreshHandler for MemoryTokenStorage {
    async fn on_refresh(&self, outcome: &TokenRefreshOutcome) -> Result<()> {
        self.store(&outcome.response).await
    }
}

#[derive(Serialize, Deserialize)]
struct TokenFile {
    format_version: String,
    #[serde(default)]
    data: HashMap<String, TokenData>,
}

/// Token storage backed by a JSON file.
///
/// Writes go to a temporary file that is then renamed over the target, so
/// a crash never leaves a half-written file behind.
#[derive(Debug, Clone)]
pub struct JsonTokenStorage {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonTokenStorage {
    /// Storage at `path`. The file is created on the first store.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<HashMap<String, TokenData>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };
        let file: TokenFile = serde_json::from_slice(&raw)?;
        if file.format_version != FORMAT_VERSION {
            return Err(Error::Config(format!(
                "unsupported token file format {:?} in {}",
                file.format_version,
                self.path.display()
            )));
        }
        Ok(file.data)
    }

    async fn write(&self, data: HashMap<String, TokenData>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = TokenFile {
            format_version: FORMAT_VERSION.to_string(),
            data,
        };
        let contents = serde_json::to_vec_pretty(&file)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, contents).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            tokio::fs::remove_file(&tmp).await.ok();
            return Err(e.into());
        }
        debug!(path = %self.path.display(), "token file written");
        Ok(())
    }
}

#[async_trait]
impl TokenStorage for JsonTokenStorage {
    async fn store(&self, response: &OAuthTokenResponse) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut data = self.read().await?;
        merge(&mut data, response)?;
        self.write(data).await
    }

    async fn get_token_data(&self, resource_server: &str) -> Result<Option<TokenData>> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.remove(resource_server))
    }

    async fn remove_token_data(&self, resource_server: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut data = self.read().await?;
        let removed = data.remove(resource_server).is_some();
        if removed {
            self.write(data).await?;
        }
        Ok(removed)
    }
}

#[async_trait]
impl RefreshHandler for JsonTokenStorage {
    async fn on_refresh(&self, outcome: &TokenRefreshOutcome) -> Result<()> {
        self.store(&outcome.response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(access_token: &str, refresh_token: Option<&str>) -> OAuthTokenResponse {
        let mut body = serde_json::json!({
            "access_token": access_token,
            "expires_in": 3600,
            "resource_server": "transfer.api.globus.org",
            "scope": "urn:globus:auth:scope:transfer.api.globus.org:all",
        });
        if let Some(rt) = refresh_token {
            body["refresh_token"] = rt.into();
        }
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn test_memory_storage_keeps_refresh_token() {
        let storage = MemoryTokenStorage::new();
        storage.store(&response("at-1", Some("rt-1"))).await.unwrap();
        storage.store(&response("at-2", None)).await.unwrap();

        let data = storage
            .get_token_data("transfer.api.globus.org")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(data.access_token, "at-2");
        assert_eq!(data.refresh_token.as_deref(), Some("rt-1"));

        assert!(storage.remove_token_data("transfer.api.globus.org").await.unwrap());
        assert!(!storage.remove_token_data("transfer.api.globus.org").await.unwrap());
    }

    #[tokio::test]
    async fn test_json_storage_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tokens.json");
        let storage = JsonTokenStorage::new(&path);

        assert!(storage.get_token_data("transfer.api.globus.org").await.unwrap().is_none());
        storage.store(&response("at-1", Some("rt-1"))).await.unwrap();

        let reopened = JsonTokenStorage::new(&path);
        let data = reopened
            .get_token_data("transfer.api.globus.org")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(data.access_token, "at-1");

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["format_version"], "1.0");
    }

    #[tokio::test]
    async fn test_json_storage_rejects_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, r#"{"format_version": "9.9", "data": {}}"#).unwrap();

        let err = JsonTokenStorage::new(&path)
            .get_token_data("auth.globus.org")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_json_storage_removes_tmp_file_when_rename_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        // a non-empty directory at the target makes the rename fail
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), b"x").unwrap();

        let storage = JsonTokenStorage::new(&path);
        assert!(storage.write(HashMap::new()).await.is_err());
        assert!(!dir.path().join("tokens.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_memory_storage_rejects_unrepresentable_expiry() {
        let storage = MemoryTokenStorage::new();
        storage.store(&response("at-1", Some("rt-1"))).await.unwrap();

        let mut body = serde_json::json!({
            "access_token": "at-2",
            "expires_in": i64::MAX,
            "resource_server": "transfer.api.globus.org",
        });
        body["refresh_token"] = "rt-2".into();
        let overflowing: OAuthTokenResponse = serde_json::from_value(body).unwrap();
        let err = storage.store(&overflowing).await.unwrap_err();
        assert!(matches!(err, Error::TokenGrant(_)));

        let data = storage
            .get_token_data("transfer.api.globus.org")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(data.access_token, "at-1");
    }
}
