//! Review-request source abstraction

use crate::error::Result;
use crate::record::ReviewRequest;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Open review requests keyed by pull request title
pub type ReviewRequests = BTreeMap<String, ReviewRequest>;

/// One entry of the issue search response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchItem {
    pub title: String,
    pub html_url: String,
    pub user: SearchUser,
    pub created_at: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchUser {
    pub login: String,
}

/// Trait that all review-request sources must implement
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Pull requests in which `user` is a requested reviewer
    async fn search_review_requests(&self, user: &str) -> Result<Vec<SearchItem>>;
}

/// Fetch the open review requests for `user`, keyed by title.
///
/// Items not in the `open` state are dropped even though the search is
/// expected to return open pull requests only. A later item with a
/// duplicate title replaces the earlier one.
pub async fn fetch_open_review_requests<R>(source: &R, user: &str) -> Result<ReviewRequests>
where
    R: ReviewSource + ?Sized,
{
    let items = source.search_review_requests(user).await?;
    let total = items.len();

    let mut requests = ReviewRequests::new();
    for item in items.into_iter().filter(|i| i.state == "open") {
        let request = ReviewRequest::new(item.html_url, item.user.login, &item.created_at)?;
        requests.insert(item.title, request);
    }

    debug!(total, open = requests.len(), "Fetched review requests");
    Ok(requests)
}
