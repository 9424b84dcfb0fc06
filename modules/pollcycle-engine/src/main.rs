use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use llm_client::OpenAiClient;
use mastodon_client::MastodonClient;
use pollcycle_common::{AppSettings, Config, PollStatus};
use pollcycle_engine::{CycleRunner, LifecycleController};
use pollcycle_store::{PgPollStore, PollStore};

#[derive(Parser)]
#[command(name = "pollcycle", about = "Mastodon poll pipeline: fetch posts, generate poll candidates, moderate, publish")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one news cycle: fetch, filter, generate, build.
    Cycle {
        /// Comma-separated hashtags overriding the stored watchlist.
        #[arg(long, value_delimiter = ',')]
        hashtags: Option<Vec<String>>,
        /// Override the per-hashtag fetch limit.
        #[arg(long)]
        post_limit: Option<u32>,
    },
    /// Publish an approved poll to Mastodon.
    Publish {
        #[arg(long)]
        poll_id: String,
    },
    /// Show poll counts by status.
    Stats,
    /// Create database tables and indexes.
    Migrate,
    /// Maintenance: forget which posts have been used as grounding.
    ClearUsedPosts,
    /// Seed stored settings from a TOML file.
    SeedSettings {
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = PgPool::connect(&config.database_url).await?;
    let store = PgPollStore::new(pool);
    store.migrate().await?;

    match cli.command {
        Command::Cycle {
            hashtags,
            post_limit,
        } => {
            let mastodon = MastodonClient::new(
                &config.mastodon_instance_url,
                &config.mastodon_access_token,
            );
            let bot_handle = resolve_bot_handle(&config, &mastodon).await;
            let generator = OpenAiClient::new(&config.openai_api_key);

            let runner = CycleRunner::new(store, mastodon, generator, bot_handle);
            let report = runner.run(hashtags, post_limit).await;
            println!("{report}");
            if !report.success {
                std::process::exit(1);
            }
        }
        Command::Publish { poll_id } => {
            let mastodon = MastodonClient::new(
                &config.mastodon_instance_url,
                &config.mastodon_access_token,
            );
            let controller = LifecycleController::new(store);
            let poll = controller.publish(&poll_id, &mastodon).await?;
            match poll.status {
                PollStatus::Posted => {
                    info!(poll_id = %poll.id, url = ?poll.published_url, "Poll published");
                }
                _ => {
                    eprintln!(
                        "Publish failed: {}",
                        poll.publish_error.as_deref().unwrap_or("unknown error")
                    );
                    std::process::exit(1);
                }
            }
        }
        Command::Stats => {
            let stats = store.statistics().await?;
            println!("Total polls: {}", stats.total_polls);
            for status in PollStatus::ALL {
                println!("  {:<9} {}", status, stats.count_for(status));
            }
        }
        Command::Migrate => {
            info!("Migration complete");
        }
        Command::ClearUsedPosts => {
            store.clear_used_posts().await?;
            info!("Used-post set cleared");
        }
        Command::SeedSettings { file } => {
            let settings = AppSettings::from_toml(&file)?;
            store.save_settings(&settings).await?;
            info!(file = %file.display(), "Settings saved");
        }
    }

    Ok(())
}

/// Prefer the configured handle; otherwise ask the API whose token this is.
/// Self-exclusion degrades gracefully when neither works.
async fn resolve_bot_handle(config: &Config, mastodon: &MastodonClient) -> String {
    if !config.bot_handle.is_empty() {
        return config.bot_handle.clone();
    }
    match mastodon.verify_credentials().await {
        Ok(account) => {
            let handle = if account.acct.is_empty() {
                account.username
            } else {
                account.acct
            };
            info!(handle = %handle, "Resolved bot handle from credentials");
            handle
        }
        Err(e) => {
            warn!(error = %e, "Could not resolve bot handle; self-exclusion disabled");
            String::new()
        }
    }
}
