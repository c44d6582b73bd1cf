//! Reviewsync Notion - Notion database integration
//!
//! This crate provides the record store backed by a Notion database:
//! - Cursor-paginated database queries
//! - Page creation, property updates and archival

pub mod client;

pub use client::NotionClient;
