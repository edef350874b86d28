//! Repository contents API client
//!
//! Talks to `GET/PUT /repos/{owner}/{repo}/contents/{path}` on GitHub or any
//! compatible service. Reads use the raw media type; writes fetch the file's
//! `sha` first and send it back with the new base64 content.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::store::{DocumentStore, WriteOutcome};

pub use config::settings::DEFAULT_API_BASE_URL as DEFAULT_API_BASE;

const RAW_MEDIA_TYPE: &str = "application/vnd.github.v3.raw";
const JSON_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
const CLIENT_USER_AGENT: &str = concat!("v1-services/", env!("CARGO_PKG_VERSION"));

/// Contents API client bound to one repository
pub struct ContentsClient {
    http_client: Client,
    base_url: String,
    owner: String,
    repo: String,
    token: String,
}

/// Body of a contents PUT
#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

/// The fields we use from a contents metadata response
#[derive(Debug, Deserialize)]
struct ContentMetadata {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    #[serde(default)]
    content: Option<ContentMetadata>,
}

/// Pretty-print `document` (two-space indent) and base64 it for a PUT body
pub fn encode_document(document: &Value) -> Result<String, serde_json::Error> {
    let text = serde_json::to_string_pretty(document)?;
    Ok(BASE64.encode(text.as_bytes()))
}

impl ContentsClient {
    /// Create a client for `owner/repo` against the public GitHub API
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: DEFAULT_API_BASE.to_string(),
            owner: owner.into(),
            repo: repo.into(),
            token: token.into(),
        }
    }

    /// Use a preconfigured HTTP client (proxy, timeouts, TLS settings)
    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// Point the client at a different API root (GitHub Enterprise, a proxy, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build a client from stored settings and a bearer token
    pub fn from_settings(settings: &config::Settings, token: impl Into<String>) -> Result<Self, String> {
        let owner = settings.require_owner()?;
        Ok(Self::new(owner, settings.repo.clone(), token).with_base_url(settings.api_base_url.clone()))
    }

    /// Endpoint for `path`; each path segment is percent-encoded
    pub fn contents_url(&self, path: &str) -> String {
        let encoded: Vec<_> = path
            .trim_start_matches('/')
            .split('/')
            .map(urlencoding::encode)
            .collect();
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.base_url,
            self.owner,
            self.repo,
            encoded.join("/")
        )
    }

    fn authorized(&self, builder: RequestBuilder, accept: &str) -> RequestBuilder {
        builder
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, accept)
            .header(USER_AGENT, CLIENT_USER_AGENT)
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> StoreResult<Response> {
        builder.send().await.map_err(|e| {
            tracing::error!("Contents API request for {} failed: {}", path, e);
            StoreError::transport(path, None, e.to_string())
        })
    }

    /// Map a non-success response to the matching error
    async fn status_error(path: &str, response: Response) -> StoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::error!("Contents API error for {} ({}): {}", path, status, body);

        match status {
            StatusCode::NOT_FOUND => StoreError::NotFound(path.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                StoreError::Unauthorized(path.to_string())
            }
            _ => StoreError::transport(path, Some(status.as_u16()), body),
        }
    }
}

#[async_trait]
impl DocumentStore for ContentsClient {
    async fn read(&self, path: &str) -> StoreResult<Value> {
        let url = self.contents_url(path);
        tracing::debug!("read: GET {}", url);

        let response = self
            .send(self.authorized(self.http_client.get(&url), RAW_MEDIA_TYPE), path)
            .await?;
        tracing::debug!("read: {} -> {}", path, response.status());

        if !response.status().is_success() {
            return Err(Self::status_error(path, response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| StoreError::transport(path, None, e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("read: {} is not valid JSON: {}", path, e);
            StoreError::decode(path, e)
        })
    }

    async fn version(&self, path: &str) -> StoreResult<Option<String>> {
        let url = self.contents_url(path);
        tracing::debug!("version: GET {}", url);

        let response = self
            .send(self.authorized(self.http_client.get(&url), JSON_MEDIA_TYPE), path)
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::status_error(path, response).await);
        }

        let metadata: ContentMetadata = response
            .json()
            .await
            .map_err(|e| StoreError::decode(path, e))?;
        Ok(Some(metadata.sha))
    }

    async fn write(&self, path: &str, document: &Value, message: &str) -> StoreResult<WriteOutcome> {
        let sha = self.version(path).await?;
        let content = encode_document(document).map_err(|e| StoreError::decode(path, e))?;

        let url = self.contents_url(path);
        tracing::debug!("write: PUT {} (sha={:?})", url, sha);

        let body = PutContents {
            message,
            content,
            sha,
        };
        let response = self
            .send(
                self.authorized(self.http_client.put(&url), JSON_MEDIA_TYPE).json(&body),
                path,
            )
            .await?;

        let status = response.status();
        if status == StatusCode::CONFLICT || status == StatusCode::PRECONDITION_FAILED {
            tracing::warn!("write: {} changed concurrently ({}), write rejected", path, status);
            return Ok(WriteOutcome::Conflict);
        }
        if !status.is_success() {
            return Err(Self::status_error(path, response).await);
        }

        let version = response
            .json::<PutResponse>()
            .await
            .ok()
            .and_then(|r| r.content)
            .map(|c| c.sha);
        tracing::info!("write: committed {} ({})", path, message);
        Ok(WriteOutcome::Committed { version })
    }
}
