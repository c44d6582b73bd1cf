//! Store records and review requests
//!
//! A [`StorePage`] is one row of the Notion database as returned by the
//! query endpoint. A [`ReviewRequest`] is one open pull request awaiting
//! review; it only lives for the duration of a run.

use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Wire format of GitHub's `created_at` field
pub const GITHUB_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Human-readable creation time kept on a review request
pub const DISPLAY_TIMESTAMP_FORMAT: &str = "%B %d, %Y %H:%M";

/// Property names of the tracking database
pub mod property {
    pub const TITLE: &str = "Title";
    pub const PUBLISHED: &str = "Published";
    pub const REQUESTOR: &str = "Requestor";
    pub const URL: &str = "URL";
}

/// A page in the remote store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorePage {
    pub id: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub properties: Value,
}

impl StorePage {
    /// The URL stored in the title-type `URL` property.
    ///
    /// Returns `None` when the property is missing or its title array is
    /// empty, which is how Notion represents a blank title cell.
    pub fn url(&self) -> Option<&str> {
        first_text(&self.properties, property::URL, "title")
    }

    pub fn title(&self) -> Option<&str> {
        first_text(&self.properties, property::TITLE, "rich_text")
    }

    pub fn requestor(&self) -> Option<&str> {
        first_text(&self.properties, property::REQUESTOR, "rich_text")
    }
}

fn first_text<'a>(properties: &'a Value, name: &str, kind: &str) -> Option<&'a str> {
    properties
        .get(name)?
        .get(kind)?
        .get(0)?
        .pointer("/text/content")?
        .as_str()
}

/// An open pull request that requests the user's review
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    pub url: String,
    pub requestor: String,
    /// Creation time in [`DISPLAY_TIMESTAMP_FORMAT`]
    pub created: String,
}

impl ReviewRequest {
    /// Build a review request from GitHub's `created_at` wire value
    pub fn new(
        url: impl Into<String>,
        requestor: impl Into<String>,
        created_at: &str,
    ) -> crate::Result<Self> {
        let created = NaiveDateTime::parse_from_str(created_at, GITHUB_TIMESTAMP_FORMAT)?;
        Ok(Self {
            url: url.into(),
            requestor: requestor.into(),
            created: created.format(DISPLAY_TIMESTAMP_FORMAT).to_string(),
        })
    }

    /// ISO-8601 UTC start of the `Published` date property
    pub fn published_start(&self) -> crate::Result<String> {
        let naive = NaiveDateTime::parse_from_str(&self.created, DISPLAY_TIMESTAMP_FORMAT)?;
        Ok(Utc.from_utc_datetime(&naive).to_rfc3339())
    }
}

/// Fields of a record about to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub title: String,
    pub url: String,
    pub requestor: String,
    pub published_start: String,
}

impl NewRecord {
    pub fn from_request(title: &str, request: &ReviewRequest) -> crate::Result<Self> {
        Ok(Self {
            title: title.to_string(),
            url: request.url.clone(),
            requestor: request.requestor.clone(),
            published_start: request.published_start()?,
        })
    }

    /// Notion property object for `POST /v1/pages`
    pub fn to_properties(&self) -> Value {
        json!({
            (property::TITLE): rich_text(&self.title),
            (property::PUBLISHED): {"date": {"start": self.published_start, "end": null}},
            (property::REQUESTOR): rich_text(&self.requestor),
            (property::URL): {"title": [{"text": {"content": self.url}}]},
        })
    }
}

/// Properties sent when an existing record is refreshed
pub fn refresh_properties(title: &str, requestor: &str) -> Value {
    json!({
        (property::TITLE): rich_text(title),
        (property::REQUESTOR): rich_text(requestor),
    })
}

fn rich_text(content: &str) -> Value {
    json!({"rich_text": [{"text": {"content": content}}]})
}
