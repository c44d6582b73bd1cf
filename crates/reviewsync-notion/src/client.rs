//! Notion API client
//!
//! Uses the secrecy crate to protect the integration token in memory.

use async_trait::async_trait;
use reviewsync_core::error::{Error, Result};
use reviewsync_core::{NotionConfig, QueryPage, RecordStore, WriteOutcome};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Notion API client bound to one database
#[derive(Clone)]
pub struct NotionClient {
    token: SecretString,
    database_id: String,
    base_url: String,
    version: String,
    dump_path: Option<PathBuf>,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_cursor: Option<&'a str>,
}

impl NotionClient {
    /// Create a new Notion client from its configuration
    pub fn new(config: &NotionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("reviewsync")
            .build()
            .map_err(|e| Error::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            token: config.token.clone(),
            database_id: config.database_id.clone(),
            base_url: config.base_url.clone(),
            version: config.version.clone(),
            dump_path: config.dump_path.clone(),
            client,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(self.token.expose_secret())
            .header("Notion-Version", &self.version)
            .header("content-type", "application/json")
    }

    /// Send a write; a non-2xx answer is returned, not raised
    async fn write(&self, request: reqwest::RequestBuilder, action: &str) -> Result<WriteOutcome> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        info!(action, status, "Notion write");
        Ok(WriteOutcome::new(status, body))
    }

    async fn dump(&self, raw: &Value) -> Result<()> {
        if let Some(path) = &self.dump_path {
            tokio::fs::write(path, serde_json::to_string_pretty(raw)?).await?;
            debug!(path = %path.display(), "Wrote first query page");
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for NotionClient {
    async fn query(&self, page_size: u32, start_cursor: Option<&str>) -> Result<QueryPage> {
        let path = format!("/v1/databases/{}/query", self.database_id);
        let response = self
            .request(reqwest::Method::POST, &path)
            .json(&QueryRequest {
                page_size,
                start_cursor,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            return Err(Error::Api {
                service: "Notion",
                status,
                body,
            });
        }

        let raw: Value = response.json().await?;
        if start_cursor.is_none() {
            self.dump(&raw).await?;
        }
        Ok(serde_json::from_value(raw)?)
    }

    async fn create(&self, properties: &Value) -> Result<WriteOutcome> {
        let payload = json!({
            "parent": {"database_id": self.database_id},
            "properties": properties,
        });
        let request = self.request(reqwest::Method::POST, "/v1/pages").json(&payload);
        self.write(request, "create").await
    }

    async fn update(&self, page_id: &str, properties: &Value) -> Result<WriteOutcome> {
        let request = self
            .request(reqwest::Method::PATCH, &format!("/v1/pages/{}", page_id))
            .json(&json!({"properties": properties}));
        self.write(request, "update").await
    }

    async fn archive(&self, page_id: &str) -> Result<WriteOutcome> {
        let request = self
            .request(reqwest::Method::PATCH, &format!("/v1/pages/{}", page_id))
            .json(&json!({"archived": true}));
        self.write(request, "archive").await
    }
}
