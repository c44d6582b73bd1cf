//! Run configuration
//!
//! Configuration is layered: an optional TOML file is read into a
//! [`ConfigFile`] where every field is optional, command-line and
//! environment overrides are merged on top, and [`ConfigFile::resolve`]
//! validates the result into a [`SyncConfig`] the clients are built from.

use crate::error::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_NOTION_URL: &str = "https://api.notion.com";
pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
pub const DEFAULT_GITHUB_URL: &str = "https://api.github.com";
pub const DEFAULT_DUMP_PATH: &str = "db.json";

/// Largest page size the Notion query endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 100;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Notion client settings
#[derive(Debug, Clone)]
pub struct NotionConfig {
    pub token: SecretString,
    pub database_id: String,
    pub base_url: String,
    pub version: String,
    pub page_size: u32,
    /// Where the raw first query page is written; `None` disables the dump
    pub dump_path: Option<PathBuf>,
    pub timeout_secs: u64,
}

/// GitHub client settings
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub token: SecretString,
    pub username: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Reconciliation behaviour
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Update title/requestor of records whose URL is still open
    pub refresh_changed: bool,
    /// Compute and report the plan without writing to the store
    pub dry_run: bool,
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub notion: NotionConfig,
    pub github: GitHubConfig,
    pub sync: SyncOptions,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotionSection {
    pub token: Option<SecretString>,
    pub database_id: Option<String>,
    pub base_url: Option<String>,
    pub version: Option<String>,
    pub page_size: Option<u32>,
    pub dump_path: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubSection {
    pub token: Option<SecretString>,
    pub username: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Configuration as written in the TOML file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub notion: NotionSection,
    pub github: GitHubSection,
    pub sync: SyncOptions,
}

impl ConfigFile {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file, expanding `~`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand(&path.as_ref().to_string_lossy());
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Validate and fill defaults
    pub fn resolve(self) -> Result<SyncConfig> {
        let notion = self.notion;
        let github = self.github;

        let page_size = notion.page_size.unwrap_or(MAX_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "notion.page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, page_size
            )));
        }

        // An empty dump path switches the dump off
        let dump_path = match notion.dump_path {
            None => Some(PathBuf::from(DEFAULT_DUMP_PATH)),
            Some(p) if p.is_empty() => None,
            Some(p) => Some(expand(&p)),
        };

        Ok(SyncConfig {
            notion: NotionConfig {
                token: required(notion.token, "notion.token", "NOTION_TOKEN")?,
                database_id: required(
                    notion.database_id.filter(|s| !s.is_empty()),
                    "notion.database_id",
                    "NOTION_DATABASE_ID",
                )?,
                base_url: trim_url(notion.base_url.as_deref().unwrap_or(DEFAULT_NOTION_URL)),
                version: notion
                    .version
                    .unwrap_or_else(|| DEFAULT_NOTION_VERSION.to_string()),
                page_size,
                dump_path,
                timeout_secs: notion.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            },
            github: GitHubConfig {
                token: required(github.token, "github.token", "GITHUB_TOKEN")?,
                username: required(
                    github.username.filter(|s| !s.is_empty()),
                    "github.username",
                    "GITHUB_USERNAME",
                )?,
                base_url: trim_url(github.base_url.as_deref().unwrap_or(DEFAULT_GITHUB_URL)),
                timeout_secs: github.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            },
            sync: self.sync,
        })
    }
}

fn required<T>(value: Option<T>, field: &str, env: &str) -> Result<T> {
    value.ok_or_else(|| {
        Error::Config(format!("{} is not set (config file or {})", field, env))
    })
}

fn trim_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}
