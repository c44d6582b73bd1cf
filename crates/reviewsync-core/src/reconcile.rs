//! Store reconciliation
//!
//! Makes the store mirror the open review requests, using the pull request
//! URL as the join key:
//! - requests with an unseen URL get a new record
//! - records whose URL is no longer requested are archived
//! - optionally, records whose title or requestor drifted are refreshed
//!
//! The diff is computed up front as a [`SyncPlan`] and applied in order,
//! one call at a time. A failed write is logged and counted, never retried.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SyncOptions;
use crate::error::Result;
use crate::record::{refresh_properties, NewRecord, StorePage};
use crate::review::{fetch_open_review_requests, ReviewRequests, ReviewSource};
use crate::store::{list_all, RecordStore, WriteOutcome};

/// A store record that carries a readable URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedRecord {
    pub id: String,
    pub title: Option<String>,
    pub requestor: Option<String>,
}

/// Current store contents keyed by URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub records: BTreeMap<String, TrackedRecord>,
    /// Pages whose URL property could not be read
    pub skipped: usize,
}

impl StoreSnapshot {
    pub fn from_pages(pages: &[StorePage]) -> Self {
        let mut snapshot = Self::default();
        for page in pages {
            let Some(url) = page.url() else {
                debug!(page_id = %page.id, "Skipping record without URL");
                snapshot.skipped += 1;
                continue;
            };
            snapshot.records.insert(
                url.to_string(),
                TrackedRecord {
                    id: page.id.clone(),
                    title: page.title().map(str::to_string),
                    requestor: page.requestor().map(str::to_string),
                },
            );
        }
        snapshot
    }
}

/// Refresh of an existing record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUpdate {
    pub page_id: String,
    pub url: String,
    pub title: String,
    pub requestor: String,
}

/// Record to archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordArchive {
    pub page_id: String,
    pub url: String,
}

/// Writes needed to bring the store in line with the review requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub creates: Vec<NewRecord>,
    pub updates: Vec<RecordUpdate>,
    pub archives: Vec<RecordArchive>,
    pub unchanged: usize,
}

impl SyncPlan {
    /// Diff incoming review requests against the store snapshot
    pub fn compute(
        incoming: &ReviewRequests,
        snapshot: &StoreSnapshot,
        refresh_changed: bool,
    ) -> Result<Self> {
        let mut plan = Self::default();

        for (title, request) in incoming {
            match snapshot.records.get(&request.url) {
                None => plan.creates.push(NewRecord::from_request(title, request)?),
                Some(existing) => {
                    let drifted = existing.title.as_deref() != Some(title.as_str())
                        || existing.requestor.as_deref() != Some(request.requestor.as_str());
                    if refresh_changed && drifted {
                        plan.updates.push(RecordUpdate {
                            page_id: existing.id.clone(),
                            url: request.url.clone(),
                            title: title.clone(),
                            requestor: request.requestor.clone(),
                        });
                    } else {
                        plan.unchanged += 1;
                    }
                }
            }
        }

        let incoming_urls: HashSet<&str> = incoming.values().map(|r| r.url.as_str()).collect();
        for (url, record) in &snapshot.records {
            if !incoming_urls.contains(url.as_str()) {
                plan.archives.push(RecordArchive {
                    page_id: record.id.clone(),
                    url: url.clone(),
                });
            }
        }

        Ok(plan)
    }

    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.archives.is_empty()
    }
}

/// Outcome of one synchronization run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub archived: usize,
    /// Writes answered with a non-2xx status
    pub failed: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub dry_run: bool,
}

/// Store reconciler
pub struct Reconciler<S, R> {
    store: S,
    source: R,
    user: String,
    page_size: u32,
    options: SyncOptions,
}

impl<S, R> Reconciler<S, R>
where
    S: RecordStore,
    R: ReviewSource,
{
    /// Create a reconciler for the review requests of `user`
    pub fn new(store: S, source: R, user: impl Into<String>) -> Self {
        Self {
            store,
            source,
            user: user.into(),
            page_size: crate::config::MAX_PAGE_SIZE,
            options: SyncOptions::default(),
        }
    }

    /// Set the query page size
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    /// Compute the writes a run would issue, without issuing them
    pub async fn plan(&self) -> Result<(SyncPlan, StoreSnapshot)> {
        let incoming = fetch_open_review_requests(&self.source, &self.user).await?;
        // A partial listing would make unseen records look absent
        let pages = list_all(&self.store, self.page_size, None).await?;
        let snapshot = StoreSnapshot::from_pages(&pages);

        info!(
            requests = incoming.len(),
            records = snapshot.records.len(),
            skipped = snapshot.skipped,
            "Loaded review requests and store records"
        );

        let plan = SyncPlan::compute(&incoming, &snapshot, self.options.refresh_changed)?;
        Ok((plan, snapshot))
    }

    /// Run one synchronization pass
    pub async fn synchronize(&self) -> Result<SyncReport> {
        let (plan, snapshot) = self.plan().await?;

        let mut report = SyncReport {
            unchanged: plan.unchanged,
            skipped: snapshot.skipped,
            dry_run: self.options.dry_run,
            ..Default::default()
        };

        if self.options.dry_run {
            for record in &plan.creates {
                info!(url = %record.url, title = %record.title, "Would create record");
            }
            for update in &plan.updates {
                info!(url = %update.url, page_id = %update.page_id, "Would refresh record");
            }
            for archive in &plan.archives {
                info!(url = %archive.url, page_id = %archive.page_id, "Would archive record");
            }
            report.created = plan.creates.len();
            report.updated = plan.updates.len();
            report.archived = plan.archives.len();
            return Ok(report);
        }

        for record in &plan.creates {
            let outcome = self.store.create(&record.to_properties()).await?;
            if tally(&outcome, &mut report.created, &mut report.failed) {
                info!(url = %record.url, title = %record.title, "Created record");
            } else {
                warn_failed("create", &record.url, &outcome);
            }
        }

        for update in &plan.updates {
            let properties: Value = refresh_properties(&update.title, &update.requestor);
            let outcome = self.store.update(&update.page_id, &properties).await?;
            if tally(&outcome, &mut report.updated, &mut report.failed) {
                info!(url = %update.url, page_id = %update.page_id, "Refreshed record");
            } else {
                warn_failed("update", &update.url, &outcome);
            }
        }

        for archive in &plan.archives {
            let outcome = self.store.archive(&archive.page_id).await?;
            if tally(&outcome, &mut report.archived, &mut report.failed) {
                info!(url = %archive.url, page_id = %archive.page_id, "Archived record");
            } else {
                warn_failed("archive", &archive.url, &outcome);
            }
        }

        info!(
            created = report.created,
            updated = report.updated,
            archived = report.archived,
            failed = report.failed,
            unchanged = report.unchanged,
            "Synchronization complete"
        );
        Ok(report)
    }
}

fn tally(outcome: &WriteOutcome, ok: &mut usize, failed: &mut usize) -> bool {
    if outcome.is_success() {
        *ok += 1;
        true
    } else {
        *failed += 1;
        false
    }
}

fn warn_failed(action: &str, url: &str, outcome: &WriteOutcome) {
    warn!(action, url, status = outcome.status, body = %outcome.body, "Store write rejected");
}
