//! Reviewsync CLI

use anyhow::Result;
use clap::Parser;
use reviewsync_core::{ConfigFile, Reconciler, SyncReport};
use reviewsync_github::GitHubClient;
use reviewsync_notion::NotionClient;
use secrecy::SecretString;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// Initialize logging with the specified verbosity level
fn init_logging(verbose: u8, quiet: bool, json: bool) -> Result<()> {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter =
        EnvFilter::from_default_env().add_directive(format!("reviewsync={}", level).parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2) // Show module path at debug+
        .with_file(verbose >= 3) // Show file:line at trace
        .with_line_number(verbose >= 3);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "reviewsync")]
#[command(about = "Mirror open GitHub review requests into a Notion database")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "REVIEWSYNC_CONFIG")]
    config: Option<String>,

    /// Notion integration token
    #[arg(long, env = "NOTION_TOKEN", hide_env_values = true)]
    notion_token: Option<String>,

    /// Notion database holding the review records
    #[arg(long, env = "NOTION_DATABASE_ID")]
    database_id: Option<String>,

    /// GitHub user whose review requests are tracked
    #[arg(long, env = "GITHUB_USERNAME")]
    github_user: Option<String>,

    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Notion API base URL
    #[arg(long)]
    notion_url: Option<String>,

    /// GitHub API base URL
    #[arg(long)]
    github_url: Option<String>,

    /// Where to write the raw first page of the database query
    #[arg(long, conflicts_with = "no_dump")]
    dump_path: Option<String>,

    /// Do not write the raw query dump
    #[arg(long)]
    no_dump: bool,

    /// Show what would change without writing to Notion
    #[arg(long)]
    dry_run: bool,

    /// Refresh title and requestor of records that are still open
    #[arg(long)]
    refresh: bool,

    /// Increase verbosity (-v: info, including the Notion write status lines; -vv: debug; -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long)]
    quiet: bool,

    /// Output logs as JSON (for machine parsing)
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// Layer command-line and environment values over the file
    fn apply(self, mut file: ConfigFile) -> ConfigFile {
        if let Some(token) = self.notion_token {
            file.notion.token = Some(SecretString::new(token));
        }
        if let Some(id) = self.database_id {
            file.notion.database_id = Some(id);
        }
        if let Some(url) = self.notion_url {
            file.notion.base_url = Some(url);
        }
        if let Some(user) = self.github_user {
            file.github.username = Some(user);
        }
        if let Some(token) = self.github_token {
            file.github.token = Some(SecretString::new(token));
        }
        if let Some(url) = self.github_url {
            file.github.base_url = Some(url);
        }
        if self.no_dump {
            file.notion.dump_path = Some(String::new());
        } else if let Some(path) = self.dump_path {
            file.notion.dump_path = Some(path);
        }
        file.sync.dry_run |= self.dry_run;
        file.sync.refresh_changed |= self.refresh;
        file
    }
}

fn print_report(report: &SyncReport) {
    let prefix = if report.dry_run { "Dry run: would have " } else { "" };
    println!(
        "{}created {}, updated {}, archived {} ({} unchanged, {} failed, {} skipped)",
        prefix,
        report.created,
        report.updated,
        report.archived,
        report.unchanged,
        report.failed,
        report.skipped
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with CLI options
    init_logging(cli.verbose, cli.quiet, cli.log_json)?;

    let file = match &cli.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let quiet = cli.quiet;
    let config = cli.apply(file).resolve()?;

    info!(
        user = %config.github.username,
        database = %config.notion.database_id,
        dry_run = config.sync.dry_run,
        "Starting synchronization"
    );

    let store = NotionClient::new(&config.notion)?;
    let source = GitHubClient::new(&config.github)?;
    let reconciler = Reconciler::new(store, source, config.github.username.clone())
        .with_page_size(config.notion.page_size)
        .with_options(config.sync.clone());

    let report = reconciler.synchronize().await?;
    if !quiet {
        print_report(&report);
    }

    Ok(())
}
