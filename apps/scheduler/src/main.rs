//! # hearth-scheduler
//!
//! Command-line trigger for the standing order engine.
//!
//! ## Subcommands
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  regenerate-all [--horizon N]     daily cron entrypoint                 │
//! │  regenerate <id> [--horizon N]    one template, active only             │
//! │  create-template --file draft.json --by <admin>                         │
//! │  update-template <id> --file patch.json                                 │
//! │  cancel <id> / delete <id>        with future-instance cleanup          │
//! │  instances <id>                   generated instances for a template    │
//! │  submit-order --file order.json   manual (phone) order with override    │
//! │  delivery-date [--at RFC3339]     cutoff preview, no database needed    │
//! │  init-counter                     raise the order counter to its floor  │
//! │  write-config                     save the effective config as TOML     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Results go to stdout as JSON. Logs go to stderr, filtered by `RUST_LOG`.

mod app;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use hearth_core::{ManualOrderRequest, TemplateDraft, TemplatePatch};
use hearth_schedule::ScheduleConfig;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::app::App;

#[derive(Debug, Parser)]
#[command(name = "hearth-scheduler", version, about = "Standing order scheduler for Hearth Wholesale")]
struct Cli {
    /// Path to hearth.toml (defaults to the platform config directory)
    #[arg(long, env = "HEARTH_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Materialize every active standing order over the horizon
    RegenerateAll {
        /// Days ahead to materialize (defaults to the configured horizon)
        #[arg(long)]
        horizon: Option<u32>,
    },

    /// Materialize a single active standing order
    Regenerate {
        template_id: String,
        #[arg(long)]
        horizon: Option<u32>,
    },

    /// Create a standing order from a JSON draft
    CreateTemplate {
        #[arg(long)]
        file: PathBuf,
        /// Admin username recorded on the template
        #[arg(long)]
        by: String,
    },

    /// Apply a JSON patch to a standing order
    UpdateTemplate {
        template_id: String,
        #[arg(long)]
        file: PathBuf,
    },

    /// Cancel a standing order and remove its future instances
    Cancel { template_id: String },

    /// Delete a standing order and its future instances
    Delete { template_id: String },

    /// List instances generated from a standing order
    Instances { template_id: String },

    /// Submit a manual order from a JSON request
    SubmitOrder {
        #[arg(long)]
        file: PathBuf,
    },

    /// Show which date an order placed now (or at --at) is delivered
    DeliveryDate {
        /// Submission instant, RFC 3339 (e.g. 2024-06-03T03:30:00+05:30)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Raise the order counter so the next number is at least the floor
    InitCounter,

    /// Write the effective configuration back to hearth.toml
    WriteConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = ScheduleConfig::load(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::DeliveryDate { at } => {
            let resolver = config.resolver()?;
            print_json(&resolver.describe(at.unwrap_or_else(Utc::now)))
        }
        Command::WriteConfig => {
            config.save(cli.config)?;
            Ok(())
        }
        command => {
            let app = App::open(config).await?;
            let result = run(&app, command).await;
            app.close().await;
            result
        }
    }
}

async fn run(app: &App, command: Command) -> anyhow::Result<()> {
    let now = Utc::now();

    match command {
        Command::RegenerateAll { horizon } => {
            let horizon = horizon.unwrap_or_else(|| app.config.horizon_days());
            let report = app.materializer.regenerate_all_at(horizon, now).await?;
            print_json(&report)?;
            if !report.is_clean() {
                error!(failed = report.errors.len(), "Some standing orders failed to regenerate");
                anyhow::bail!("{} standing order(s) failed", report.errors.len());
            }
            Ok(())
        }
        Command::Regenerate {
            template_id,
            horizon,
        } => {
            let horizon = horizon.unwrap_or_else(|| app.config.horizon_days());
            let created = app
                .service
                .regenerate_template(&template_id, horizon, now)
                .await?;
            print_json(&created)
        }
        Command::CreateTemplate { file, by } => {
            let draft: TemplateDraft = read_json(&file)?;
            let change = app.service.create_template(draft, &by, now).await?;
            print_json(&change)
        }
        Command::UpdateTemplate { template_id, file } => {
            let patch: TemplatePatch = read_json(&file)?;
            let change = app.service.update_template(&template_id, patch, now).await?;
            print_json(&change)
        }
        Command::Cancel { template_id } => {
            let removed = app.service.cancel_template(&template_id, now).await?;
            print_json(&serde_json::json!({ "template_id": template_id, "removed": removed }))
        }
        Command::Delete { template_id } => {
            let removed = app.service.delete_template(&template_id, now).await?;
            print_json(&serde_json::json!({ "template_id": template_id, "removed": removed }))
        }
        Command::Instances { template_id } => {
            let instances = app.service.generated_instances(&template_id).await?;
            print_json(&instances)
        }
        Command::SubmitOrder { file } => {
            let request: ManualOrderRequest = read_json(&file)?;
            let order = app.intake.submit_at(request, now).await?;
            print_json(&order)
        }
        Command::InitCounter => {
            let value = app.sequence.initialize().await?;
            info!(next = value + 1, "Order counter ready");
            print_json(&serde_json::json!({
                "counter": app.sequence.counter_key(),
                "value": value,
            }))
        }
        Command::DeliveryDate { .. } | Command::WriteConfig => Ok(()),
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=hearth_schedule=trace` - Engine internals only
/// - Default: info, with debug for hearth crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hearth_schedule=debug,hearth_db=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
