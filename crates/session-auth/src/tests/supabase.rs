//! SupabaseAuthProvider against wiremock GoTrue endpoints.

use super::harness::{direct_client, session};
use crate::provider::{AuthChangeEvent, IdentityProvider};
use crate::session::Session;
use crate::store::{MemorySessionStore, SessionStore};
use crate::supabase::{RefreshConfig, SupabaseAuthProvider};
use crate::AuthError;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockBuilder, MockServer, Request, ResponseTemplate};

const TOKEN_PATH: &str = "/auth/v1/token";
const SIGNUP_PATH: &str = "/auth/v1/signup";
const LOGOUT_PATH: &str = "/auth/v1/logout";
const API_KEY: &str = "publishable-test-key";

fn token_body() -> Value {
    json!({
        "access_token": "access-1",
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "refresh-1",
        "user": {"id": "user-1", "email": "ada@example.com"}
    })
}

/// Store shared between the provider and the test.
#[derive(Clone, Default)]
struct SharedStore(Arc<MemorySessionStore>);

impl SessionStore for SharedStore {
    fn load(&self) -> crate::AuthResult<Option<Session>> {
        self.0.load()
    }

    fn save(&self, session: &Session) -> crate::AuthResult<()> {
        self.0.save(session)
    }

    fn clear(&self) -> crate::AuthResult<()> {
        self.0.clear()
    }
}

struct Fixture {
    server: MockServer,
    store: SharedStore,
    provider: SupabaseAuthProvider,
    events: Arc<Mutex<Vec<(AuthChangeEvent, Option<String>)>>>,
}

impl Fixture {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let store = SharedStore::default();
        let provider = SupabaseAuthProvider::new(
            &format!("{}/", server.uri()),
            API_KEY,
            Box::new(store.clone()),
        )
        .with_http_client(direct_client())
        .with_refresh_config(RefreshConfig {
            max_retries: 2,
            initial_delay_ms: 1,
            max_delay_ms: 1,
        });

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        // Standing subscription for the lifetime of the fixture.
        let _ = provider.subscribe(Arc::new(move |event, session: Option<Session>| {
            sink.lock()
                .unwrap()
                .push((event, session.and_then(|s| s.access_token)));
        }));

        Self {
            server,
            store,
            provider,
            events,
        }
    }

    fn events(&self) -> Vec<(AuthChangeEvent, Option<String>)> {
        self.events.lock().unwrap().clone()
    }

    /// Requests received on `request_path`, in arrival order.
    async fn requests_to(&self, request_path: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == request_path)
            .collect()
    }

    async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}

/// `POST /auth/v1/token?grant_type=...` carrying the project key.
fn grant(grant_type: &str) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(query_param("grant_type", grant_type))
        .and(header("apikey", API_KEY))
}

fn expired(id: &str, token: &str) -> Session {
    session(id, token).with_expires_at(Utc::now() - Duration::minutes(5))
}

// =============================================================================
// Sign-in
// =============================================================================

#[tokio::test]
async fn test_sign_in_posts_credentials_and_stores_session() {
    let fx = Fixture::new().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", API_KEY))
        .and(body_json(json!({"email": "ada@example.com", "password": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&fx.server)
        .await;

    let outcome = fx
        .provider
        .sign_in_with_password("ada@example.com", "hunter2")
        .await
        .unwrap();

    assert_eq!(outcome.user.id, "user-1");
    let issued = outcome.session.unwrap();
    assert_eq!(issued.bearer_token(), Some("access-1"));
    assert_eq!(issued.refresh_token.as_deref(), Some("refresh-1"));
    assert!(issued.expires_at.unwrap() > Utc::now() + Duration::minutes(59));

    assert_eq!(fx.store.load().unwrap(), Some(issued));
    assert_eq!(
        fx.events(),
        vec![(AuthChangeEvent::SignedIn, Some("access-1".to_string()))]
    );
}

#[tokio::test]
async fn test_sign_in_rejection_is_verbatim() {
    let fx = Fixture::new().await;
    grant("password")
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&fx.server)
        .await;

    let err = fx
        .provider
        .sign_in_with_password("ada@example.com", "wrong")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Provider(_)));
    assert_eq!(err.to_string(), "Invalid login credentials");
    assert!(fx.store.load().unwrap().is_none());
    assert!(fx.events().is_empty());
}

#[tokio::test]
async fn test_sign_in_server_error_is_transient_with_provider_message() {
    let fx = Fixture::new().await;
    grant("password")
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"msg": "Service temporarily unavailable"})),
        )
        .mount(&fx.server)
        .await;

    let err = fx
        .provider
        .sign_in_with_password("ada@example.com", "pw")
        .await
        .unwrap_err();

    assert!(err.is_transient());
    assert!(matches!(err, AuthError::Unavailable { status: 503, .. }));
    assert_eq!(err.to_string(), "Service temporarily unavailable");
}

#[tokio::test]
async fn test_sign_in_server_error_without_body() {
    let fx = Fixture::new().await;
    grant("password")
        .respond_with(ResponseTemplate::new(502))
        .mount(&fx.server)
        .await;

    let err = fx
        .provider
        .sign_in_with_password("ada@example.com", "pw")
        .await
        .unwrap_err();

    assert!(err.is_transient());
    assert_eq!(err.to_string(), "Request failed with status 502");
}

// =============================================================================
// Sign-up
// =============================================================================

#[tokio::test]
async fn test_sign_up_with_immediate_session() {
    let fx = Fixture::new().await;
    Mock::given(method("POST"))
        .and(path(SIGNUP_PATH))
        .and(header("apikey", API_KEY))
        .and(body_json(json!({"email": "ada@example.com", "password": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&fx.server)
        .await;

    let outcome = fx
        .provider
        .sign_up("ada@example.com", "hunter2")
        .await
        .unwrap();

    assert!(outcome.session.is_some());
    assert!(fx.store.load().unwrap().is_some());
    assert_eq!(fx.events().len(), 1);
}

#[tokio::test]
async fn test_sign_up_pending_confirmation() {
    let fx = Fixture::new().await;
    Mock::given(method("POST"))
        .and(path(SIGNUP_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-2",
            "email": "new@example.com",
            "confirmation_sent_at": "2024-05-01T10:00:00Z"
        })))
        .mount(&fx.server)
        .await;

    let outcome = fx.provider.sign_up("new@example.com", "pw").await.unwrap();

    assert_eq!(outcome.user.id, "user-2");
    assert_eq!(outcome.user.email.as_deref(), Some("new@example.com"));
    assert!(outcome.session.is_none());
    assert!(fx.store.load().unwrap().is_none());
    assert!(fx.events().is_empty());
}

#[tokio::test]
async fn test_sign_up_rejection_is_verbatim() {
    let fx = Fixture::new().await;
    Mock::given(method("POST"))
        .and(path(SIGNUP_PATH))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "code": 422,
            "error_code": "user_already_exists",
            "msg": "User already registered"
        })))
        .mount(&fx.server)
        .await;

    let err = fx.provider.sign_up("ada@example.com", "pw").await.unwrap_err();
    assert_eq!(err.to_string(), "User already registered");
}

// =============================================================================
// Restore and refresh
// =============================================================================

#[tokio::test]
async fn test_current_session_none_without_stored_session() {
    let fx = Fixture::new().await;
    assert!(fx.provider.get_current_session().await.unwrap().is_none());
    assert_eq!(fx.request_count().await, 0);
}

#[tokio::test]
async fn test_current_session_restores_valid_session_without_network() {
    let fx = Fixture::new().await;
    let stored = session("ada", "t1").with_expires_at(Utc::now() + Duration::hours(1));
    fx.store.save(&stored).unwrap();

    assert_eq!(fx.provider.get_current_session().await.unwrap(), Some(stored));
    assert_eq!(fx.request_count().await, 0);
}

#[tokio::test]
async fn test_current_session_refreshes_expired_session() {
    let fx = Fixture::new().await;
    fx.store.save(&expired("ada", "t1")).unwrap();
    grant("refresh_token")
        .and(body_json(json!({"refresh_token": "refresh-t1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&fx.server)
        .await;

    let restored = fx.provider.get_current_session().await.unwrap().unwrap();

    assert_eq!(restored.bearer_token(), Some("access-1"));
    assert_eq!(fx.store.load().unwrap(), Some(restored));
    assert_eq!(
        fx.events(),
        vec![(AuthChangeEvent::TokenRefreshed, Some("access-1".to_string()))]
    );
}

#[tokio::test]
async fn test_current_session_clears_expired_without_refresh_token() {
    let fx = Fixture::new().await;
    let mut stale = expired("ada", "t1");
    stale.refresh_token = None;
    fx.store.save(&stale).unwrap();

    assert!(fx.provider.get_current_session().await.unwrap().is_none());
    assert!(fx.store.load().unwrap().is_none());
    assert_eq!(fx.request_count().await, 0);
}

#[tokio::test]
async fn test_current_session_clears_on_rejected_refresh() {
    let fx = Fixture::new().await;
    fx.store.save(&expired("ada", "t1")).unwrap();
    grant("refresh_token")
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid Refresh Token: Already Used"
        })))
        .expect(1)
        .mount(&fx.server)
        .await;

    assert!(fx.provider.get_current_session().await.unwrap().is_none());
    assert!(fx.store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_current_session_retries_transient_refresh_failures() {
    let fx = Fixture::new().await;
    fx.store.save(&expired("ada", "t1")).unwrap();
    grant("refresh_token")
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&fx.server)
        .await;

    let err = fx.provider.get_current_session().await.unwrap_err();

    assert!(matches!(err, AuthError::RefreshExhausted(2)));
    assert!(fx.store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_current_session_recovers_after_transient_failure() {
    let fx = Fixture::new().await;
    fx.store.save(&expired("ada", "t1")).unwrap();
    grant("refresh_token")
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&fx.server)
        .await;
    grant("refresh_token")
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&fx.server)
        .await;

    let restored = fx.provider.get_current_session().await.unwrap();

    assert_eq!(
        restored.and_then(|s| s.access_token),
        Some("access-1".to_string())
    );
    assert_eq!(fx.requests_to(TOKEN_PATH).await.len(), 2);
}

// =============================================================================
// Sign-out
// =============================================================================

#[tokio::test]
async fn test_sign_out_revokes_and_clears() {
    let fx = Fixture::new().await;
    fx.store.save(&session("ada", "t1")).unwrap();
    Mock::given(method("POST"))
        .and(path(LOGOUT_PATH))
        .and(header("authorization", "Bearer t1"))
        .and(header("apikey", API_KEY))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&fx.server)
        .await;

    fx.provider.sign_out().await.unwrap();

    assert!(fx.store.load().unwrap().is_none());
    assert_eq!(fx.events(), vec![(AuthChangeEvent::SignedOut, None)]);
}

#[tokio::test]
async fn test_sign_out_failure_still_clears_locally() {
    let fx = Fixture::new().await;
    fx.store.save(&session("ada", "t1")).unwrap();
    Mock::given(method("POST"))
        .and(path(LOGOUT_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "JWT expired"})))
        .mount(&fx.server)
        .await;

    let err = fx.provider.sign_out().await.unwrap_err();

    assert_eq!(err.to_string(), "JWT expired");
    assert!(fx.store.load().unwrap().is_none());
    assert_eq!(fx.events(), vec![(AuthChangeEvent::SignedOut, None)]);
    assert_eq!(fx.requests_to(LOGOUT_PATH).await.len(), 1);
}

#[tokio::test]
async fn test_sign_out_without_session_skips_network() {
    let fx = Fixture::new().await;

    fx.provider.sign_out().await.unwrap();

    assert_eq!(fx.request_count().await, 0);
    assert_eq!(fx.events(), vec![(AuthChangeEvent::SignedOut, None)]);
}
