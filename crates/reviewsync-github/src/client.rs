//! GitHub API client (REST search)

use async_trait::async_trait;
use reviewsync_core::error::{Error, Result};
use reviewsync_core::{GitHubConfig, ReviewSource, SearchItem};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// GitHub client for review-request search
#[derive(Clone)]
pub struct GitHubClient {
    token: SecretString,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    items: Vec<SearchItem>,
}

impl GitHubClient {
    /// Create a new GitHub client from its configuration
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("reviewsync")
            .build()
            .map_err(|e| Error::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            token: config.token.clone(),
            base_url: config.base_url.clone(),
            client,
        })
    }

    /// Search query selecting pull requests that request `user`'s review
    pub fn review_query(user: &str) -> String {
        format!("is:pr review-requested:{}", user)
    }
}

#[async_trait]
impl ReviewSource for GitHubClient {
    /// Only the first page of search results is read
    async fn search_review_requests(&self, user: &str) -> Result<Vec<SearchItem>> {
        let response = self
            .client
            .get(format!("{}/search/issues", self.base_url))
            .query(&[("q", Self::review_query(user))])
            .bearer_auth(self.token.expose_secret())
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(Error::Api {
                service: "GitHub",
                status: status.as_u16(),
                body,
            });
        }

        let search: SearchResponse = response.json().await?;
        debug!(
            status = status.as_u16(),
            total = search.total_count,
            returned = search.items.len(),
            "GitHub search"
        );
        Ok(search.items)
    }
}
