mod auth_support;

use std::sync::Arc;
use std::time::Duration;

use armt_auth::auth::{TokenRefreshGuard, TokenStore};
use armt_auth::error::AuthError;
use armt_auth::storage::MemoryStore;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_support::{auth_config, expired_tokens, now, token_response, valid_tokens, TOKEN_PATH};

fn guard(server: &MockServer) -> (Arc<TokenStore>, Arc<TokenRefreshGuard>) {
    guard_with_secret(server, None)
}

fn guard_with_secret(
    server: &MockServer,
    secret: Option<&str>,
) -> (Arc<TokenStore>, Arc<TokenRefreshGuard>) {
    let mut realm = auth_config(&server.uri()).realm;
    realm.client_secret = secret.map(ToString::to_string);
    let store = Arc::new(TokenStore::new(Arc::new(MemoryStore::new())));
    let guard = Arc::new(TokenRefreshGuard::new(
        reqwest::Client::new(),
        Arc::new(realm),
        store.clone(),
    ));
    (store, guard)
}

#[tokio::test]
async fn valid_tokens_make_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("A2", "R2")))
        .expect(0)
        .mount(&server)
        .await;

    let (store, guard) = guard(&server);
    let tokens = valid_tokens("A1");
    store.set(&tokens).await.unwrap();

    assert_eq!(guard.ensure_fresh().await.unwrap(), tokens);
}

#[tokio::test]
async fn empty_store_is_not_authenticated() {
    let server = MockServer::start().await;
    let (_store, guard) = guard(&server);

    let result = guard.ensure_fresh().await;

    assert_eq!(result, Err(AuthError::NotAuthenticated));
    assert!(result.unwrap_err().requires_login());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn expired_tokens_are_refreshed_and_stored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .and(body_string_contains("client_id=armt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("A2", "R2")))
        .expect(1)
        .mount(&server)
        .await;

    let (store, guard) = guard(&server);
    store.set(&expired_tokens("A1")).await.unwrap();

    let refreshed = guard.ensure_fresh().await.unwrap();

    assert_eq!(refreshed.access_token, "A2");
    assert_eq!(refreshed.refresh_token, "R2");
    assert!((now() - 10.0 - refreshed.issued_at).abs() < 5.0);
    assert_eq!(store.get().await.unwrap(), Some(refreshed));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_response("A2", "R2"))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (store, guard) = guard(&server);
    store.set(&expired_tokens("A1")).await.unwrap();

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let guard = guard.clone();
            tokio::spawn(async move { guard.ensure_fresh().await })
        })
        .collect();
    let results = futures::future::join_all(handles).await;

    let stored = store.get().await.unwrap().unwrap();
    assert_eq!(stored.access_token, "A2");
    for result in results {
        assert_eq!(result.unwrap().unwrap(), stored);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "invalid_grant"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (store, guard) = guard(&server);
    let stale = expired_tokens("A1");
    store.set(&stale).await.unwrap();

    let results = futures::future::join_all((0..5).map(|_| guard.ensure_fresh())).await;

    for result in results {
        assert!(matches!(result, Err(AuthError::TokenRefreshFailed(_))));
    }
    assert_eq!(store.get().await.unwrap(), Some(stale));
}

#[tokio::test]
async fn rejected_refresh_keeps_stored_set_and_allows_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let (store, guard) = guard(&server);
    let stale = expired_tokens("A1");
    store.set(&stale).await.unwrap();

    let first = guard.ensure_fresh().await;
    assert!(
        matches!(&first, Err(AuthError::TokenRefreshFailed(message)) if message.contains("invalid_grant"))
    );
    assert!(first.unwrap_err().requires_login());
    assert_eq!(store.get().await.unwrap(), Some(stale.clone()));

    // The failed attempt must not stay cached.
    assert!(matches!(
        guard.ensure_fresh().await,
        Err(AuthError::TokenRefreshFailed(_))
    ));
    assert_eq!(store.get().await.unwrap(), Some(stale));
}

#[tokio::test]
async fn confidential_refresh_sends_basic_auth() {
    let server = MockServer::start().await;
    let expected = format!("Basic {}", STANDARD.encode("armt:s3cret"));
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("authorization", expected.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("A2", "R2")))
        .expect(1)
        .mount(&server)
        .await;

    let (store, guard) = guard_with_secret(&server, Some("s3cret"));
    store.set(&expired_tokens("A1")).await.unwrap();

    assert_eq!(guard.ensure_fresh().await.unwrap().access_token, "A2");
}

#[tokio::test]
async fn refreshed_set_is_reused_without_second_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("A2", "R2")))
        .expect(1)
        .mount(&server)
        .await;

    let (store, guard) = guard(&server);
    store.set(&expired_tokens("A1")).await.unwrap();

    let first = guard.ensure_fresh().await.unwrap();
    let second = guard.ensure_fresh().await.unwrap();
    assert_eq!(first, second);
}

fn delayed_refresh(delay_ms: u64) -> Mock {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_response("A2", "R2"))
                .set_delay(Duration::from_millis(delay_ms)),
        )
        .expect(1)
}

#[tokio::test]
async fn logout_during_refresh_is_not_undone() {
    let server = MockServer::start().await;
    delayed_refresh(300).mount(&server).await;

    let (store, guard) = guard(&server);
    store.set(&expired_tokens("A1")).await.unwrap();

    let pending = tokio::spawn({
        let guard = guard.clone();
        async move { guard.ensure_fresh().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    store.clear().await.unwrap();

    assert_eq!(pending.await.unwrap(), Err(AuthError::NotAuthenticated));
    assert_eq!(store.get().await.unwrap(), None);
}

#[tokio::test]
async fn login_during_refresh_keeps_new_set() {
    let server = MockServer::start().await;
    delayed_refresh(300).mount(&server).await;

    let (store, guard) = guard(&server);
    store.set(&expired_tokens("A1")).await.unwrap();

    let pending = tokio::spawn({
        let guard = guard.clone();
        async move { guard.ensure_fresh().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    let mut logged_in = valid_tokens("L1");
    logged_in.refresh_token = "login-refresh".to_string();
    store.set(&logged_in).await.unwrap();

    assert_eq!(pending.await.unwrap(), Ok(logged_in.clone()));
    assert_eq!(store.get().await.unwrap(), Some(logged_in));
}
