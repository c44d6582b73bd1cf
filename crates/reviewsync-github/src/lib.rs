//! Reviewsync GitHub - GitHub API integration
//!
//! This crate provides the review-request source:
//! - Issue search for pull requests awaiting the user's review

pub mod client;

pub use client::GitHubClient;
