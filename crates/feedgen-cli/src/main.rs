mod feed;
mod history;
mod pipeline;
mod queue;
mod store;
mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use feedgen_core::AppConfig;
use feedgen_engine::PlacementResolver;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use crate::feed::{build_merchant_feed, FeedPaths};
use crate::history::History;
use crate::pipeline::Pipeline;
use crate::queue::{RegenerateRequest, RegenerationQueue};

#[derive(Debug, Parser)]
#[command(name = "feedgen")]
#[command(about = "Regenerate merchant product feeds from Connexity exports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download exports, rebuild and upload feeds, one merchant at a time
    Regenerate {
        /// Merchant to regenerate as `<id>:<name>`; repeat for several
        #[arg(long = "merchant", value_parser = parse_merchant_arg, required = true)]
        merchants: Vec<RegenerateRequest>,
        /// Rebuild from the files already under the root path
        #[arg(long)]
        no_refetch: bool,
    },
    /// Build one feed from local files without uploading
    Assemble {
        #[arg(long)]
        merchant_id: String,
        /// PLA source file (defaults to `feeds/combined_<id>.csv`)
        #[arg(long)]
        source: Option<PathBuf>,
        /// Output file (defaults to `feeds/<merchant name>.txt`)
        #[arg(long)]
        destination: Option<PathBuf>,
    },
    /// Show recent regeneration requests
    History {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

/// Parses `<id>:<name>`, splitting on the first colon.
fn parse_merchant_arg(value: &str) -> Result<RegenerateRequest, String> {
    let (id, name) = value
        .split_once(':')
        .ok_or_else(|| format!("expected <id>:<name>, got '{value}'"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("missing merchant id in '{value}'"));
    }
    Ok(RegenerateRequest {
        merchant_id: id.to_string(),
        merchant_name: name.trim().to_string(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Arc::new(feedgen_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::Regenerate {
            merchants,
            no_refetch,
        } => {
            let resolver = load_resolver(&config)?;
            let history = History::new(connect_history(&config).await);
            let pipeline =
                Pipeline::from_config(Arc::clone(&config), resolver, history, !no_refetch)?;

            let queue = RegenerationQueue::spawn(Arc::new(pipeline));
            for request in merchants {
                queue.enqueue(request)?;
            }
            let summary = queue.shutdown().await?;
            tracing::info!(
                succeeded = summary.succeeded,
                failed = summary.failed.len(),
                "regeneration queue drained"
            );
            if !summary.failed.is_empty() {
                anyhow::bail!(
                    "regeneration failed for merchants: {}",
                    summary.failed.join(", ")
                );
            }
        }
        Commands::Assemble {
            merchant_id,
            source,
            destination,
        } => {
            let resolver = load_resolver(&config)?;
            let built = build_merchant_feed(
                &config,
                resolver,
                &merchant_id,
                FeedPaths {
                    source,
                    destination,
                },
            )
            .await?;
            let report = &built.report;
            println!(
                "{} ({}): {} rows from {} offers, {} rejected -> {}",
                built.merchant.name,
                built.merchant.id,
                report.rows_written,
                report.offers_read,
                report.rejected_ids.len(),
                built.path.display()
            );
            println!(
                "multipliers: exact={} placement={} merchant_average={} fallback={}",
                report.adjustments.exact,
                report.adjustments.placement,
                report.adjustments.merchant_average,
                report.adjustments.fallback
            );
        }
        Commands::History { limit } => {
            let pool = feedgen_db::connect_from_app_config(&config)
                .await
                .context("history requires a reachable DATABASE_URL")?;
            feedgen_db::run_migrations(&pool).await?;
            let rows = feedgen_db::list_recent_regenerations(&pool, limit).await?;
            if rows.is_empty() {
                println!("no regeneration requests recorded");
            }
            for row in rows {
                println!(
                    "{}  {:<12} {:<8} {}",
                    row.requested_at.format("%Y-%m-%d %H:%M:%S"),
                    row.status,
                    row.merchant_id,
                    row.merchant_name
                );
            }
        }
    }

    Ok(())
}

fn load_resolver(config: &AppConfig) -> anyhow::Result<Arc<PlacementResolver>> {
    let placements = feedgen_core::load_placements(&config.placements_path)?;
    Ok(Arc::new(PlacementResolver::new(placements)))
}

/// Connects and migrates the history database. History is optional, so
/// failures are logged and the run continues without it.
async fn connect_history(config: &AppConfig) -> Option<PgPool> {
    config.database_url.as_ref()?;
    let pool = match feedgen_db::connect_from_app_config(config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(error = %e, "history database unavailable; continuing without it");
            return None;
        }
    };
    if let Err(e) = feedgen_db::run_migrations(&pool).await {
        tracing::warn!(error = %e, "history migrations failed; continuing without it");
        return None;
    }
    Some(pool)
}
