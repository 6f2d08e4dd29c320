//! Shortening endpoint contract and its HTTP client.

use crate::{ShortenError, ShortenResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Remote service that turns a long URL into a short one.
#[async_trait]
pub trait ShortenEndpoint: Send + Sync {
    /// Shorten `url`, authorizing with `access_token`. Returns the short URL.
    async fn shorten(&self, url: &str, access_token: &str) -> ShortenResult<String>;
}

#[derive(Serialize)]
struct ShortenBody<'a> {
    url: &'a str,
}

/// `POST {base_url}/url/shorten` with a bearer credential.
pub struct HttpShortenClient {
    http_client: Client,
    endpoint: String,
}

impl HttpShortenClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            endpoint: format!("{}/url/shorten", base_url.trim_end_matches('/')),
        }
    }

    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ShortenEndpoint for HttpShortenClient {
    async fn shorten(&self, url: &str, access_token: &str) -> ShortenResult<String> {
        debug!(endpoint = %self.endpoint, url = %url, "Requesting short URL");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(access_token)
            .json(&ShortenBody { url })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Shortening request rejected");
            return Err(ShortenError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|_| ShortenError::MalformedResponse)?;

        match body.get("short_url").and_then(Value::as_str) {
            Some(short_url) if !short_url.trim().is_empty() => Ok(short_url.to_string()),
            _ => {
                warn!(body = %body, "Shortening response missing short_url");
                Err(ShortenError::MalformedResponse)
            }
        }
    }
}
