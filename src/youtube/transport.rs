use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::{Error, Result};

/// One GET against the provider. Implementations add authentication; callers
/// pass only the resource name (`playlists`, `playlistItems`, `videos`) and
/// its query parameters.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, resource: &str, params: &[(&str, String)]) -> Result<Value>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn get(&self, resource: &str, params: &[(&str, String)]) -> Result<Value> {
        (**self).get(resource, params).await
    }
}

/// `reqwest`-backed transport for the YouTube Data API v3.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("tubestats/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, resource: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}/{resource}", self.base_url);
        log::debug!("GET {url} {params:?}");

        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                resource: resource.to_string(),
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| Error::Decode(format!("{resource}: {e}")))
    }
}

/// Pull `error.message` out of a Google API error body, falling back to the
/// (truncated) raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}
