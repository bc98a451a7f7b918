//! CMS Entries CLI
//!
//! Lists, publishes or deletes every entry of a content type using the
//! management API. Credentials come from flags, environment variables
//! or a JSON file.
//!
//! # Usage
//! ```bash
//! # List entries
//! cms-entries list --content-type article --max 20
//!
//! # Publish all entries, retrying each up to 5 times
//! cms-entries publish --content-type article --max-retries 5
//!
//! # Delete entries (requires --yes)
//! cms-entries delete --content-type draftPage --language en-GB --yes
//! ```

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cms_entries::{CmsError, Credentials, Entry, EntryManager, ListOptions, RetryPolicy};

// ============================================================
// CLI Definition
// ============================================================

#[derive(Parser)]
#[command(name = "cms-entries")]
#[command(about = "Bulk entry operations against a CMS management API", long_about = None)]
#[command(version)]
struct Cli {
    /// Management API root URL
    #[arg(long, env = "CMS_ROOT_URL")]
    root_url: Option<String>,

    /// API client id
    #[arg(long, env = "CMS_CLIENT_ID")]
    client_id: Option<String>,

    /// API shared secret
    #[arg(long, env = "CMS_SHARED_SECRET", hide_env_values = true)]
    shared_secret: Option<String>,

    /// Project id
    #[arg(long, env = "CMS_PROJECT")]
    project: Option<String>,

    /// JSON credentials file (clientId, rootUrl, sharedSecret, projectName)
    #[arg(long, conflicts_with_all = ["root_url", "client_id", "shared_secret", "project"])]
    credentials: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Selection {
    /// Content type id (e.g., article)
    #[arg(long)]
    content_type: String,

    /// Entries requested per page
    #[arg(long, default_value = "25")]
    page_size: u32,

    /// Entry language (default: project language)
    #[arg(long)]
    language: Option<String>,

    /// Stop after this many entries (0 = all)
    #[arg(long, default_value = "0")]
    max: usize,
}

impl Selection {
    fn options(&self) -> ListOptions {
        let options = ListOptions::default()
            .page_size(self.page_size)
            .max_number(self.max);
        match &self.language {
            Some(language) => options.language(language.clone()),
            None => options,
        }
    }
}

#[derive(Args)]
struct RetryArgs {
    /// Retries per entry after the first attempt
    #[arg(long, default_value = "10")]
    max_retries: u32,

    /// Pause between attempts in milliseconds
    #[arg(long, default_value = "0")]
    retry_delay_ms: u64,
}

impl RetryArgs {
    fn policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::new(self.max_retries);
        if self.retry_delay_ms > 0 {
            policy.with_delay(Duration::from_millis(self.retry_delay_ms))
        } else {
            policy
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List entries of a content type
    List {
        #[command(flatten)]
        selection: Selection,
    },

    /// Save and publish every selected entry
    Publish {
        #[command(flatten)]
        selection: Selection,

        #[command(flatten)]
        retry: RetryArgs,
    },

    /// Delete every selected entry
    Delete {
        #[command(flatten)]
        selection: Selection,

        #[command(flatten)]
        retry: RetryArgs,

        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs)?;

    if matches!(cli.command, Commands::Delete { yes: false, .. }) {
        bail!("Refusing to delete without --yes");
    }

    let credentials = load_credentials(&cli)?;
    info!(
        "Connecting to {} (project: {})",
        credentials.root_url, credentials.project_name
    );

    let manager = EntryManager::connect(&credentials)
        .await
        .context("Failed to connect to the management API")?;

    match cli.command {
        Commands::List { selection } => {
            info!("Listing entries of type: {}", selection.content_type);
            let entries = manager
                .collect_all_entries(&selection.content_type, selection.options())
                .await
                .context("Failed to list entries")?;

            println!("\n{:<36} {:<8} {:<8} {:<12} {:<30}", "ID", "LANG", "VERSION", "STATE", "TITLE");
            println!("{}", "-".repeat(98));

            for entry in &entries {
                println!(
                    "{:<36} {:<8} {:<8} {:<12} {:<30}",
                    entry.id().unwrap_or("-"),
                    entry.language().unwrap_or("-"),
                    entry.version_no().unwrap_or("-"),
                    entry.workflow_state().unwrap_or("-"),
                    truncate(&title(entry), 30)
                );
            }

            info!("Listed {} entries", entries.len());
        }

        Commands::Publish { selection, retry } => {
            // Collect first so publishing cannot shift later pages
            let entries = manager
                .collect_all_entries(&selection.content_type, selection.options())
                .await
                .context("Failed to list entries")?;
            info!("Publishing {} entries of type {}", entries.len(), selection.content_type);

            let policy = retry.policy();
            let mut failed = 0;
            for entry in &entries {
                let outcome = manager.publish_entry_with(entry, policy).await;
                report(entry, "Published", outcome.attempts(), outcome.last_error());
                if !outcome.succeeded() {
                    failed += 1;
                }
            }

            summarize("published", entries.len(), failed)?;
        }

        Commands::Delete { selection, retry, .. } => {
            // Deleting while paging would skip entries
            let entries = manager
                .collect_all_entries(&selection.content_type, selection.options())
                .await
                .context("Failed to list entries")?;
            warn!("Deleting {} entries of type {}", entries.len(), selection.content_type);

            let policy = retry.policy();
            let mut failed = 0;
            for entry in &entries {
                let outcome = manager.delete_entry_with(entry, policy).await;
                report(entry, "Deleted", outcome.attempts(), outcome.last_error());
                if !outcome.succeeded() {
                    failed += 1;
                }
            }

            summarize("deleted", entries.len(), failed)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    Ok(())
}

fn load_credentials(cli: &Cli) -> Result<Credentials> {
    if let Some(path) = &cli.credentials {
        return Credentials::from_file(path)
            .with_context(|| format!("Failed to load credentials from {}", path.display()));
    }

    let required = |value: &Option<String>, flag: &str, var: &str| {
        value
            .clone()
            .with_context(|| format!("Missing --{} (or {})", flag, var))
    };

    let credentials = Credentials::new(
        required(&cli.root_url, "root-url", "CMS_ROOT_URL")?,
        required(&cli.client_id, "client-id", "CMS_CLIENT_ID")?,
        required(&cli.shared_secret, "shared-secret", "CMS_SHARED_SECRET")?,
        required(&cli.project, "project", "CMS_PROJECT")?,
    );
    credentials.validate()?;

    Ok(credentials)
}

fn report(entry: &Entry, verb: &str, attempts: u32, failure: Option<&CmsError>) {
    let id = entry.id().unwrap_or("<unsaved>");
    match failure {
        None => println!("✅ {} {} ({} attempt(s))", verb, id, attempts),
        Some(e) => {
            println!("❌ {} failed after {} attempt(s): {}", id, attempts, e);
            error!("Entry {} failed: {}", id, e);
        }
    }
}

fn summarize(action: &str, total: usize, failed: usize) -> Result<()> {
    info!("{} of {} entries {}", total - failed, total, action);
    if failed > 0 {
        bail!("{} of {} entries could not be {}", failed, total, action);
    }
    Ok(())
}

fn title(entry: &Entry) -> String {
    entry
        .field("entryTitle")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Café society evening", 10), "Café so...");
    }

    #[test]
    fn test_cli_parses_publish() {
        let cli = Cli::try_parse_from([
            "cms-entries",
            "--root-url",
            "https://cms.example.com",
            "--client-id",
            "id",
            "--shared-secret",
            "secret",
            "--project",
            "website",
            "publish",
            "--content-type",
            "article",
            "--max-retries",
            "2",
        ])
        .unwrap();

        match cli.command {
            Commands::Publish { selection, retry } => {
                assert_eq!(selection.options().page_size, 25);
                assert_eq!(retry.policy(), RetryPolicy::new(2));
            }
            _ => panic!("expected publish"),
        }
    }

    #[test]
    fn test_credentials_file_conflicts_with_flags() {
        let result = Cli::try_parse_from([
            "cms-entries",
            "--credentials",
            "creds.json",
            "--project",
            "website",
            "list",
            "--content-type",
            "article",
        ]);
        assert!(result.is_err());
    }
}
