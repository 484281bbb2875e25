//! Behavior of the renewing authorizer against a scripted token source.
//!
//! Run with: cargo test --test renewing_authorizer

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing_subscriber::EnvFilter;

use globus_sdk::auth::{
    Authorizer, CredentialState, MemoryTokenStorage, OAuthTokenResponse, RenewingAuthorizer,
    TokenRefreshOutcome, TokenSource, TokenStorage, EXPIRES_ADJUST_SECONDS,
};
use globus_sdk::{Error, Result};

static INIT: Once = Once::new();

fn init_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

const RESOURCE_SERVER: &str = "transfer.api.globus.org";

/// Issues `token-1`, `token-2`, ... and counts grants.
struct ScriptedSource {
    calls: AtomicUsize,
    expires_in: i64,
    fail: bool,
}

impl ScriptedSource {
    fn new(expires_in: i64) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            expires_in,
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(3600)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for ScriptedSource {
    async fn fetch_token(&self) -> Result<OAuthTokenResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(Error::Api {
                status: 400,
                code: Some("invalid_grant".to_string()),
                message: "refresh token expired".to_string(),
                body: serde_json::Value::Null,
            });
        }
        // Yield so concurrent callers get a chance to interleave.
        tokio::task::yield_now().await;
        Ok(serde_json::from_value(serde_json::json!({
            "access_token": format!("token-{n}"),
            "expires_in": self.expires_in,
            "resource_server": RESOURCE_SERVER,
            "refresh_token": format!("refresh-{n}"),
        }))?)
    }
}

async fn header(authorizer: &impl Authorizer) -> String {
    authorizer
        .get_authorization_header()
        .await
        .unwrap()
        .unwrap_or_default()
}

#[tokio::test]
async fn token_without_expiration_is_discarded() {
    init_logging();
    let authorizer = RenewingAuthorizer::builder(ScriptedSource::new(3600))
        .with_access_token("caller-token", None)
        .build()
        .await
        .unwrap();

    // Treated as if no token were given: one grant during construction.
    assert_eq!(authorizer.source().calls(), 1);
    assert_eq!(header(&authorizer).await, "Bearer token-1");
    assert_eq!(authorizer.source().calls(), 1);
}

#[tokio::test]
async fn construction_without_token_refreshes_immediately() {
    init_logging();
    let authorizer = RenewingAuthorizer::new(ScriptedSource::new(3600)).await.unwrap();
    assert_eq!(authorizer.source().calls(), 1);
    assert_eq!(authorizer.state().await, CredentialState::Fresh);
}

#[tokio::test]
async fn refreshed_expiration_includes_skew_buffer() {
    init_logging();
    let before = Utc::now();
    let authorizer = RenewingAuthorizer::new(ScriptedSource::new(3600)).await.unwrap();
    let after = Utc::now();

    let stored = authorizer.expires_at().await.unwrap();
    let skew = Duration::seconds(EXPIRES_ADJUST_SECONDS);
    assert!(stored >= before + Duration::seconds(3600) - skew - Duration::seconds(1));
    assert!(stored <= after + Duration::seconds(3600) - skew + Duration::seconds(1));
    assert!(stored < before + Duration::seconds(3600));
}

#[tokio::test]
async fn fresh_token_is_not_refreshed_again() {
    init_logging();
    let authorizer = RenewingAuthorizer::new(ScriptedSource::new(3600)).await.unwrap();

    assert_eq!(header(&authorizer).await, "Bearer token-1");
    assert_eq!(header(&authorizer).await, "Bearer token-1");
    assert_eq!(authorizer.source().calls(), 1);
}

#[tokio::test]
async fn authorization_failure_forces_one_refresh() {
    init_logging();
    let authorizer = RenewingAuthorizer::new(ScriptedSource::new(3600)).await.unwrap();

    assert!(authorizer.notify_authorization_failed().await);
    assert_eq!(authorizer.state().await, CredentialState::Stale);

    assert_eq!(header(&authorizer).await, "Bearer token-2");
    assert_eq!(authorizer.source().calls(), 2);

    assert_eq!(header(&authorizer).await, "Bearer token-2");
    assert_eq!(authorizer.source().calls(), 2);
}

#[tokio::test]
async fn expired_initial_token_is_refreshed_on_use() {
    init_logging();
    let authorizer = RenewingAuthorizer::builder(ScriptedSource::new(3600))
        .with_access_token("old", Some(Utc::now() - Duration::seconds(5)))
        .build()
        .await
        .unwrap();

    assert_eq!(authorizer.source().calls(), 0);
    assert_eq!(authorizer.state().await, CredentialState::Stale);
    assert_eq!(header(&authorizer).await, "Bearer token-1");
}

#[tokio::test]
async fn on_refresh_receives_every_outcome() {
    init_logging();
    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let recorder = seen.clone();

    let authorizer = RenewingAuthorizer::builder(ScriptedSource::new(3600))
        .with_on_refresh(move |outcome: &TokenRefreshOutcome| -> Result<()> {
            let token = outcome.response.token_for(Some(RESOURCE_SERVER))?;
            recorder.lock().unwrap().push(token.access_token);
            Ok(())
        })
        .build()
        .await
        .unwrap();

    authorizer.notify_authorization_failed().await;
    authorizer.ensure_valid_token().await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["token-1", "token-2"]);
}

#[tokio::test]
async fn on_refresh_error_propagates_after_token_is_adopted() {
    init_logging();
    let authorizer = RenewingAuthorizer::builder(ScriptedSource::new(3600))
        .with_access_token("initial", Some(Utc::now() + Duration::seconds(3600)))
        .with_on_refresh(|_: &TokenRefreshOutcome| -> Result<()> {
            Err(Error::Config("storage unavailable".to_string()))
        })
        .build()
        .await
        .unwrap();

    authorizer.notify_authorization_failed().await;
    let err = authorizer.get_authorization_header().await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    // The new credential was stored before the handler ran.
    assert_eq!(authorizer.state().await, CredentialState::Fresh);
    assert_eq!(authorizer.source().calls(), 1);
}

#[tokio::test]
async fn refresh_failure_propagates_unchanged() {
    init_logging();
    let err = RenewingAuthorizer::new(ScriptedSource::failing())
        .await
        .unwrap_err();
    match err {
        Error::Api { status, code, .. } => {
            assert_eq!(status, 400);
            assert_eq!(code.as_deref(), Some("invalid_grant"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_callers_share_one_refresh() {
    init_logging();
    let authorizer = Arc::new(
        RenewingAuthorizer::builder(ScriptedSource::new(3600))
            .with_access_token("stale", Some(Utc::now() - Duration::seconds(1)))
            .build()
            .await
            .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let authorizer = authorizer.clone();
            tokio::spawn(async move { header(&authorizer).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), "Bearer token-1");
    }
    assert_eq!(authorizer.source().calls(), 1);
}

#[tokio::test]
async fn memory_storage_persists_refreshes() {
    init_logging();
    let storage = MemoryTokenStorage::new();
    let authorizer = RenewingAuthorizer::builder(ScriptedSource::new(3600))
        .with_on_refresh(storage.clone())
        .build()
        .await
        .unwrap();

    authorizer.notify_authorization_failed().await;
    authorizer.ensure_valid_token().await.unwrap();

    let stored = storage.get_token_data(RESOURCE_SERVER).await.unwrap().unwrap();
    assert_eq!(stored.access_token, "token-2");
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh-2"));
}
