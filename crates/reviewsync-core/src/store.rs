//! Remote store abstraction
//!
//! Provides the capability trait the reconciler writes through, and the
//! cursor-following [`list_all`] built on top of it.

use crate::error::Result;
use crate::record::StorePage;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// One page of results from the store's query endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryPage {
    pub results: Vec<StorePage>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Result of a create, update or archive call.
///
/// A non-2xx status is not an error: the caller decides what to do with it.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub status: u16,
    pub body: Value,
}

impl WriteOutcome {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait that all record stores must implement
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch one page of records, starting at `start_cursor` when given
    async fn query(&self, page_size: u32, start_cursor: Option<&str>) -> Result<QueryPage>;

    /// Create a record from a property object
    async fn create(&self, properties: &Value) -> Result<WriteOutcome>;

    /// Partially update the properties of a record
    async fn update(&self, page_id: &str, properties: &Value) -> Result<WriteOutcome>;

    /// Soft-delete a record
    async fn archive(&self, page_id: &str) -> Result<WriteOutcome>;
}

/// Read every record, following the pagination cursor.
///
/// With `max_count` set, stops as soon as that many records are collected
/// and returns exactly that many (or fewer if the store runs out).
pub async fn list_all<S>(store: &S, page_size: u32, max_count: Option<usize>) -> Result<Vec<StorePage>>
where
    S: RecordStore + ?Sized,
{
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = store.query(page_size, cursor.as_deref()).await?;
        pages += 1;
        records.extend(page.results);

        if let Some(max) = max_count {
            if records.len() >= max {
                records.truncate(max);
                break;
            }
        }

        match (page.has_more, page.next_cursor) {
            (true, Some(next)) => cursor = Some(next),
            _ => break,
        }
    }

    debug!(pages, records = records.len(), "Listed store records");
    Ok(records)
}
