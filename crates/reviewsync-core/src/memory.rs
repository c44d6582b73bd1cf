//! In-memory implementations of `RecordStore` and `ReviewSource`.
//!
//! These hold everything in process memory and record every call made
//! against them, so the reconciler can be exercised without a network.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::record::{property, StorePage};
use crate::review::{ReviewSource, SearchItem, SearchUser};
use crate::store::{QueryPage, RecordStore, WriteOutcome};

/// A call received by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Query {
        page_size: u32,
        start_cursor: Option<String>,
    },
    Create(Value),
    Update(String, Value),
    Archive(String),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory record store.
///
/// The cursor handed out by `query` is the index of the next record
/// among the non-archived pages.
pub struct MemoryStore {
    pages: Mutex<Vec<StorePage>>,
    calls: Mutex<Vec<StoreCall>>,
    next_id: Mutex<u64>,
    /// Status returned by writes; non-2xx writes leave the pages untouched
    write_status: Mutex<u16>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            next_id: Mutex::new(1),
            write_status: Mutex::new(200),
        }
    }

    fn allocate_id(&self) -> String {
        let mut next = lock(&self.next_id);
        let id = format!("page-{}", *next);
        *next += 1;
        id
    }

    /// Insert a page with arbitrary properties, returning its id
    pub fn insert_properties(&self, properties: Value) -> String {
        let id = self.allocate_id();
        lock(&self.pages).push(StorePage {
            id: id.clone(),
            archived: false,
            properties,
        });
        id
    }

    /// Insert a page that only carries a URL
    pub fn insert_url(&self, url: &str) -> String {
        self.insert_properties(json!({
            (property::URL): {"title": [{"text": {"content": url}}]}
        }))
    }

    /// Insert a fully populated record
    pub fn insert_record(&self, title: &str, url: &str, requestor: &str) -> String {
        self.insert_properties(json!({
            (property::TITLE): {"rich_text": [{"text": {"content": title}}]},
            (property::REQUESTOR): {"rich_text": [{"text": {"content": requestor}}]},
            (property::URL): {"title": [{"text": {"content": url}}]}
        }))
    }

    /// Make subsequent writes answer with `status`
    pub fn set_write_status(&self, status: u16) {
        *lock(&self.write_status) = status;
    }

    /// Sorted URLs of the non-archived pages
    pub fn active_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = lock(&self.pages)
            .iter()
            .filter(|p| !p.archived)
            .filter_map(|p| p.url().map(str::to_string))
            .collect();
        urls.sort();
        urls
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    pub fn query_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::Query { .. }))
            .count()
    }

    /// Every non-query call
    pub fn write_calls(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, StoreCall::Query { .. }))
            .collect()
    }

    pub fn created(&self) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Create(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn archived_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Archive(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn updated(&self) -> Vec<(String, Value)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Update(id, p) => Some((id, p)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: StoreCall) {
        lock(&self.calls).push(call);
    }

    fn status(&self) -> u16 {
        *lock(&self.write_status)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(page_id: &str) -> WriteOutcome {
    WriteOutcome::new(
        404,
        json!({"object": "error", "code": "object_not_found", "message": page_id}),
    )
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn query(&self, page_size: u32, start_cursor: Option<&str>) -> Result<QueryPage> {
        self.record(StoreCall::Query {
            page_size,
            start_cursor: start_cursor.map(str::to_string),
        });

        let start = match start_cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| Error::Other(format!("Invalid cursor: {}", c)))?,
            None => 0,
        };

        let active: Vec<StorePage> = lock(&self.pages)
            .iter()
            .filter(|p| !p.archived)
            .cloned()
            .collect();
        let end = (start + page_size as usize).min(active.len());
        let has_more = end < active.len();

        Ok(QueryPage {
            results: active.get(start..end).map(<[_]>::to_vec).unwrap_or_default(),
            has_more,
            next_cursor: has_more.then(|| end.to_string()),
        })
    }

    async fn create(&self, properties: &Value) -> Result<WriteOutcome> {
        self.record(StoreCall::Create(properties.clone()));

        let status = self.status();
        if !(200..300).contains(&status) {
            return Ok(WriteOutcome::new(status, json!({"object": "error"})));
        }

        let id = self.insert_properties(properties.clone());
        Ok(WriteOutcome::new(status, json!({"object": "page", "id": id})))
    }

    async fn update(&self, page_id: &str, properties: &Value) -> Result<WriteOutcome> {
        self.record(StoreCall::Update(page_id.to_string(), properties.clone()));

        let status = self.status();
        if !(200..300).contains(&status) {
            return Ok(WriteOutcome::new(status, json!({"object": "error"})));
        }

        let mut pages = lock(&self.pages);
        let Some(page) = pages.iter_mut().find(|p| p.id == page_id) else {
            return Ok(not_found(page_id));
        };
        if let (Some(existing), Some(changes)) =
            (page.properties.as_object_mut(), properties.as_object())
        {
            for (key, value) in changes {
                existing.insert(key.clone(), value.clone());
            }
        }
        Ok(WriteOutcome::new(status, json!({"object": "page", "id": page_id})))
    }

    async fn archive(&self, page_id: &str) -> Result<WriteOutcome> {
        self.record(StoreCall::Archive(page_id.to_string()));

        let status = self.status();
        if !(200..300).contains(&status) {
            return Ok(WriteOutcome::new(status, json!({"object": "error"})));
        }

        let mut pages = lock(&self.pages);
        let Some(page) = pages.iter_mut().find(|p| p.id == page_id) else {
            return Ok(not_found(page_id));
        };
        page.archived = true;
        Ok(WriteOutcome::new(
            status,
            json!({"object": "page", "id": page_id, "archived": true}),
        ))
    }
}

/// In-memory review-request source
pub struct MemorySource {
    items: Mutex<Vec<SearchItem>>,
    searched: Mutex<Vec<String>>,
    failure: Mutex<Option<u16>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            searched: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    pub fn push(&self, title: &str, url: &str, login: &str, created_at: &str, state: &str) {
        lock(&self.items).push(SearchItem {
            title: title.to_string(),
            html_url: url.to_string(),
            user: SearchUser {
                login: login.to_string(),
            },
            created_at: created_at.to_string(),
            state: state.to_string(),
        });
    }

    /// Push an open request created at a fixed time
    pub fn push_open(&self, title: &str, url: &str, login: &str) {
        self.push(title, url, login, "2024-01-05T10:30:00Z", "open");
    }

    /// Make subsequent searches fail as if the API answered `status`
    pub fn fail_with(&self, status: u16) {
        *lock(&self.failure) = Some(status);
    }

    pub fn searched_users(&self) -> Vec<String> {
        lock(&self.searched).clone()
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReviewSource for MemorySource {
    async fn search_review_requests(&self, user: &str) -> Result<Vec<SearchItem>> {
        lock(&self.searched).push(user.to_string());

        if let Some(status) = *lock(&self.failure) {
            return Err(Error::Api {
                service: "GitHub",
                status,
                body: "simulated failure".to_string(),
            });
        }

        Ok(lock(&self.items).clone())
    }
}
