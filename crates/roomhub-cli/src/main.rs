//! Roomhub CLI: drive the media pipeline from a shell.
//!
//! Configuration comes from the environment (see `Config::from_env`). Set
//! CACHE_BACKEND=filesystem so cached media and drafts persist between runs.

use anyhow::Context;
use clap::{Parser, Subcommand};
use roomhub_cli::{error_body, init_tracing, preview_data_url};
use roomhub_client::{create_cache_storage, DraftStore, MediaFetchCache};
use roomhub_core::{AppError, Clock, Config, SystemClock};
use roomhub_storage::{create_signer, SignedUrlCache};
use serde::Serialize;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "roomhub", about = "Roomhub media pipeline CLI")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a media URL to a cached data URL
    Fetch {
        url: String,
        /// Send the configured bearer token
        #[arg(long)]
        auth: bool,
        /// Print the whole data URL instead of a preview
        #[arg(long)]
        full: bool,
    },
    /// Issue a signed read URL for a storage key
    Sign {
        path: String,
        /// Request the URL this many times to show reuse
        #[arg(long, default_value = "1")]
        repeat: u32,
    },
    /// Remove expired or unreadable entries from the media cache
    Sweep,
    /// Drop cached media for the given URLs
    Invalidate {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Draft operations
    Drafts {
        #[command(subcommand)]
        sub: DraftCommands,
    },
}

#[derive(Subcommand)]
enum DraftCommands {
    /// List saved drafts
    List,
    /// Print a draft
    Show { key: String },
    /// Save a JSON file as a new draft
    Save { file: std::path::PathBuf },
    /// Delete a draft
    Delete { key: String },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Print the error body for a failed pipeline command and hand the error
/// back so the process still exits non-zero.
fn report(err: AppError) -> anyhow::Error {
    if let Err(e) = print_json(&error_body(&err)) {
        return e;
    }
    err.into()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = Config::from_env().context("Invalid configuration")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let storage = create_cache_storage(&config);

    match cli.command {
        Commands::Fetch { url, auth, full } => {
            let media = MediaFetchCache::from_config(&config, storage.as_ref(), clock).await?;
            let data_url = media
                .fetch_as_data_url(&url, auth)
                .await
                .map_err(|e| report(e.into()))?;
            let shown = if full {
                data_url
            } else {
                preview_data_url(&data_url, 48)
            };
            print_json(&serde_json::json!({ "url": url, "data_url": shown }))?;
        }
        Commands::Sign { path, repeat } => {
            let signer = create_signer(&config, clock.clone())?;
            let cache = SignedUrlCache::from_config(signer, clock, &config);
            let mut urls = Vec::new();
            for _ in 0..repeat.max(1) {
                urls.push(cache.get(&path).await.map_err(report)?);
            }
            let signings = urls.windows(2).filter(|w| w[0] != w[1]).count() + 1;
            print_json(&serde_json::json!({
                "path": path,
                "url": urls.last(),
                "requests": urls.len(),
                "signings": signings,
            }))?;
        }
        Commands::Sweep => {
            let media = MediaFetchCache::from_config(&config, storage.as_ref(), clock).await?;
            let removed = media.sweep_expired().await.map_err(|e| report(e.into()))?;
            print_json(&serde_json::json!({ "removed": removed }))?;
        }
        Commands::Invalidate { urls } => {
            let media = MediaFetchCache::from_config(&config, storage.as_ref(), clock).await?;
            let removed = media.invalidate(urls).await.map_err(|e| report(e.into()))?;
            print_json(&serde_json::json!({ "removed": removed }))?;
        }
        Commands::Drafts { sub } => {
            let drafts = DraftStore::open(storage.as_ref(), &config.draft_cache_name).await?;
            match sub {
                DraftCommands::List => {
                    print_json(&drafts.list_drafts().await?)?;
                }
                DraftCommands::Show { key } => {
                    let draft: Option<serde_json::Value> = drafts.load_draft(&key).await?;
                    let draft = draft.with_context(|| format!("Draft {} not found", key))?;
                    print_json(&draft)?;
                }
                DraftCommands::Save { file } => {
                    let raw = tokio::fs::read_to_string(&file)
                        .await
                        .with_context(|| format!("Read {}", file.display()))?;
                    let snapshot: serde_json::Value =
                        serde_json::from_str(&raw).context("Draft file is not valid JSON")?;
                    let key = drafts.save_new_draft(&snapshot).await?;
                    print_json(&serde_json::json!({ "key": key }))?;
                }
                DraftCommands::Delete { key } => {
                    let deleted = drafts.delete_draft(&key).await?;
                    print_json(&serde_json::json!({ "key": key, "deleted": deleted }))?;
                }
            }
        }
    }

    Ok(())
}
