//! Reviewsync Core - domain types and reconciliation
//!
//! This crate provides everything that does not talk to the network:
//! - Store records and review requests
//! - Capability traits for the record store and the review source
//! - Cursor pagination over the store
//! - The reconciler that diffs and applies
//! - Layered configuration
//! - In-memory stores for tests

pub mod config;
pub mod error;
pub mod memory;
pub mod reconcile;
pub mod record;
pub mod review;
pub mod store;

pub use config::{ConfigFile, GitHubConfig, NotionConfig, SyncConfig, SyncOptions};
pub use error::{Error, Result};
pub use reconcile::{Reconciler, StoreSnapshot, SyncPlan, SyncReport};
pub use record::{NewRecord, ReviewRequest, StorePage};
pub use review::{fetch_open_review_requests, ReviewRequests, ReviewSource, SearchItem};
pub use store::{list_all, QueryPage, RecordStore, WriteOutcome};
