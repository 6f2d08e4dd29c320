//! Supabase (GoTrue) identity provider.
//!
//! Talks to the GoTrue REST API directly with reqwest. The current session is
//! kept in a [`SessionStore`] so it survives between runs, and restored
//! sessions that have expired are refreshed with exponential backoff.

use crate::provider::{AuthChangeEvent, AuthOutcome, IdentityProvider, ListenerRegistry, SessionListener, Subscription};
use crate::session::{Session, User};
use crate::store::SessionStore;
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Error body fields GoTrue uses for a human-readable message, in priority order.
const MESSAGE_FIELDS: &[&str] = &["msg", "error_description", "message", "error"];

/// Configuration for token refresh retry behavior.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Maximum number of attempts.
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

impl RefreshConfig {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .initial_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserResponse> for User {
    fn from(user: UserResponse) -> Self {
        User::new(user.id, user.email)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Unix timestamp in seconds.
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserResponse,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| now + ChronoDuration::seconds(secs)));

        Session {
            user: self.user.into(),
            access_token: Some(self.access_token),
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

/// Sign-up answers with a full session when email confirmation is off and
/// with the bare user record while confirmation is pending.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(UserResponse),
}

/// Extract the provider's own message from an error body.
fn provider_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        for key in MESSAGE_FIELDS {
            if let Some(Value::String(msg)) = fields.get(*key) {
                if !msg.trim().is_empty() {
                    return msg.clone();
                }
            }
        }
    }

    let body = body.trim();
    if body.is_empty() {
        format!("Request failed with status {}", status.as_u16())
    } else {
        body.to_string()
    }
}

/// Pass successful responses through; turn failures into `AuthError`.
///
/// Server errors become `AuthError::Unavailable` so callers can retry them.
async fn check_response(response: Response) -> AuthResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = provider_message(status, &body);

    if status.is_server_error() {
        warn!(status = %status, message = %message, "Identity provider server error");
        return Err(AuthError::Unavailable {
            status: status.as_u16(),
            message,
        });
    }

    warn!(status = %status, message = %message, "Identity provider rejected request");
    Err(AuthError::Provider(message))
}

/// Identity provider backed by a Supabase project.
pub struct SupabaseAuthProvider {
    http_client: Client,
    supabase_url: String,
    publishable_key: String,
    store: Box<dyn SessionStore>,
    listeners: ListenerRegistry,
    refresh_config: RefreshConfig,
}

impl SupabaseAuthProvider {
    pub fn new(supabase_url: &str, publishable_key: &str, store: Box<dyn SessionStore>) -> Self {
        Self {
            http_client: Client::new(),
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            publishable_key: publishable_key.to_string(),
            store,
            listeners: ListenerRegistry::new(),
            refresh_config: RefreshConfig::default(),
        }
    }

    pub fn with_refresh_config(mut self, refresh_config: RefreshConfig) -> Self {
        self.refresh_config = refresh_config;
        self
    }

    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.supabase_url, path)
    }

    async fn exchange_password(&self, path: &str, email: &str, password: &str) -> AuthResult<Response> {
        let url = self.endpoint(path);
        debug!(url = %url, email = %email, "Sending credentials to identity provider");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .json(&PasswordCredentials { email, password })
            .send()
            .await?;

        check_response(response).await
    }

    fn accept_session(&self, session: &Session, event: AuthChangeEvent) -> AuthResult<()> {
        self.store.save(session)?;
        self.listeners.emit(event, Some(session.clone()));
        Ok(())
    }

    /// Single attempt to refresh the session.
    async fn try_refresh(&self, refresh_token: &str) -> AuthResult<Session> {
        let url = self.endpoint("token?grant_type=refresh_token");
        debug!(url = %url, "Refreshing token");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let data: TokenResponse = check_response(response).await?.json().await?;
        Ok(data.into_session(Utc::now()))
    }

    /// Refresh the session with exponential backoff retry.
    async fn refresh_with_backoff(&self, refresh_token: &str) -> AuthResult<Session> {
        let max_retries = self.refresh_config.max_retries;

        for attempt in 0..max_retries {
            match self.try_refresh(refresh_token).await {
                Ok(session) => return Ok(session),
                Err(e) if e.is_transient() => {
                    if attempt + 1 < max_retries {
                        let delay = self.refresh_config.delay_for_attempt(attempt);
                        debug!(
                            attempt = attempt + 1,
                            max_retries,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Refresh failed with transient error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(AuthError::RefreshExhausted(max_retries))
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuthProvider {
    async fn get_current_session(&self) -> AuthResult<Option<Session>> {
        let Some(session) = self.store.load()? else {
            debug!("No stored session");
            return Ok(None);
        };

        if !session.is_expired(Utc::now()) {
            debug!(user_id = %session.user.id, "Restored stored session");
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.clone() else {
            info!(user_id = %session.user.id, "Stored session expired without refresh token, clearing");
            self.store.clear()?;
            return Ok(None);
        };

        info!(user_id = %session.user.id, "Stored session expired, attempting refresh");
        match self.refresh_with_backoff(&refresh_token).await {
            Ok(refreshed) => {
                self.accept_session(&refreshed, AuthChangeEvent::TokenRefreshed)?;
                info!(user_id = %refreshed.user.id, "Token refreshed successfully");
                Ok(Some(refreshed))
            }
            Err(AuthError::RefreshExhausted(attempts)) => {
                warn!(attempts, "Token refresh retries exhausted, clearing session");
                self.store.clear()?;
                Err(AuthError::RefreshExhausted(attempts))
            }
            Err(e) => {
                warn!(error = %e, "Token refresh rejected, clearing session");
                self.store.clear()?;
                Ok(None)
            }
        }
    }

    fn subscribe(&self, listener: SessionListener) -> Subscription {
        self.listeners.subscribe(listener)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<AuthOutcome> {
        let response = self
            .exchange_password("token?grant_type=password", email, password)
            .await?;
        let session = response.json::<TokenResponse>().await?.into_session(Utc::now());

        self.accept_session(&session, AuthChangeEvent::SignedIn)?;
        info!(user_id = %session.user.id, "Signed in");

        Ok(AuthOutcome {
            user: session.user.clone(),
            session: Some(session),
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthOutcome> {
        let response = self.exchange_password("signup", email, password).await?;

        match response.json::<SignUpResponse>().await? {
            SignUpResponse::Session(data) => {
                let session = data.into_session(Utc::now());
                self.accept_session(&session, AuthChangeEvent::SignedIn)?;
                info!(user_id = %session.user.id, "Signed up");

                Ok(AuthOutcome {
                    user: session.user.clone(),
                    session: Some(session),
                })
            }
            SignUpResponse::User(user) => {
                info!(user_id = %user.id, "Signed up, email confirmation pending");
                Ok(AuthOutcome {
                    user: user.into(),
                    session: None,
                })
            }
        }
    }

    async fn sign_out(&self) -> AuthResult<()> {
        let access_token = match self.store.load() {
            Ok(session) => session.and_then(|s| s.access_token),
            Err(e) => {
                warn!(error = %e, "Could not read stored session before sign-out");
                None
            }
        };

        let remote = match access_token {
            Some(token) => {
                let url = self.endpoint("logout");
                debug!(url = %url, "Revoking session");
                match self
                    .http_client
                    .post(&url)
                    .header("apikey", &self.publishable_key)
                    .bearer_auth(token)
                    .send()
                    .await
                {
                    Ok(response) => check_response(response).await.map(|_| ()),
                    Err(e) => Err(AuthError::Http(e)),
                }
            }
            None => Ok(()),
        };

        let cleared = self.store.clear();
        self.listeners.emit(AuthChangeEvent::SignedOut, None);
        info!("Signed out");

        remote.and(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_config_default() {
        let config = RefreshConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay_ms, 500);
        assert_eq!(config.max_delay_ms, 5000);
    }

    #[test]
    fn test_refresh_config_delay_exponential_backoff() {
        let config = RefreshConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(4000));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(5000));
        assert_eq!(config.delay_for_attempt(40), Duration::from_millis(5000));
    }

    #[test]
    fn test_provider_message_field_priority() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(
            provider_message(status, r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(
            provider_message(status, r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#),
            "Email not confirmed"
        );
        assert_eq!(
            provider_message(status, r#"{"message":"User already registered"}"#),
            "User already registered"
        );
        assert_eq!(provider_message(status, r#"{"error":"invalid_grant"}"#), "invalid_grant");
    }

    #[test]
    fn test_provider_message_fallbacks() {
        assert_eq!(
            provider_message(StatusCode::UNPROCESSABLE_ENTITY, "  "),
            "Request failed with status 422"
        );
        assert_eq!(
            provider_message(StatusCode::BAD_REQUEST, "plain text failure"),
            "plain text failure"
        );
        assert_eq!(
            provider_message(StatusCode::BAD_REQUEST, r#"{"msg":""}"#),
            r#"{"msg":""}"#
        );
    }

    #[test]
    fn test_token_response_prefers_absolute_expiry() {
        let now = Utc::now();
        let data: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":3600,"expires_at":2000000000,"user":{"id":"u1","email":"ada@example.com"}}"#,
        )
        .unwrap();
        let session = data.into_session(now);
        assert_eq!(session.expires_at, DateTime::from_timestamp(2_000_000_000, 0));
        assert_eq!(session.user.email.as_deref(), Some("ada@example.com"));

        let data: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","expires_in":60,"user":{"id":"u1"}}"#).unwrap();
        let session = data.into_session(now);
        assert_eq!(session.expires_at, Some(now + ChronoDuration::seconds(60)));
        assert!(session.refresh_token.is_none());
    }

    #[test]
    fn test_sign_up_response_shapes() {
        let with_session: SignUpResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":3600,"user":{"id":"u1"}}"#,
        )
        .unwrap();
        assert!(matches!(with_session, SignUpResponse::Session(_)));

        let pending: SignUpResponse = serde_json::from_str(
            r#"{"id":"u2","email":"new@example.com","confirmation_sent_at":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(matches!(pending, SignUpResponse::User(ref u) if u.id == "u2"));
    }
}
