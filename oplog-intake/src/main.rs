//! oplog-intake - OP log batch intake client
//!
//! Queues OP log photos, sends them one at a time to the recognition
//! service, applies field edits and saves the records in surgery date order.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use oplog_common::config::{write_toml_config, ServiceOverrides, TomlConfig};
use oplog_common::events::{EventBus, FailureStage, IntakeEvent, ItemStatus};
use oplog_common::fields::FIELD_CATALOG;
use oplog_intake::config::{default_log_filter, load_settings, IntakeSettings};
use oplog_intake::{FieldEdit, ImagePayload, IntakeController, ItemSummary, ScanServiceClient};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for oplog-intake
#[derive(Parser, Debug)]
#[command(name = "oplog-intake")]
#[command(about = "Batch intake of OP log images")]
#[command(version)]
struct Args {
    /// Config file (default: <config dir>/oplog/oplog-intake.toml)
    #[arg(long, global = true, env = "OPLOG_CONFIG")]
    config: Option<PathBuf>,

    /// Recognition service host ("localhost" means 127.0.0.1)
    #[arg(long, global = true, env = "OPLOG_SERVICE_HOST")]
    host: Option<String>,

    /// Recognition service port
    #[arg(long, global = true, env = "OPLOG_SERVICE_PORT")]
    port: Option<u16>,

    /// HTTP request timeout in seconds
    #[arg(long, global = true, env = "OPLOG_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan images, optionally edit and save the records
    Scan {
        /// Image files, processed in the order given
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Field edit as N:FIELD=VALUE (N is the 1-based image number)
        #[arg(long = "edit", value_name = "N:FIELD=VALUE")]
        edits: Vec<FieldEdit>,

        /// Retry failed scans once before editing
        #[arg(long)]
        retry_failed: bool,

        /// Save all recognized records, oldest surgery date first
        #[arg(long)]
        save: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the service answers
    Check,

    /// Write a config file with the resolved settings
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let overrides = ServiceOverrides {
        host: args.host.clone(),
        port: args.port,
        timeout_secs: args.timeout_secs,
    };
    let settings = load_settings(args.config.as_deref(), &overrides)
        .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_log_filter(&settings.logging).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("oplog-intake {}", env!("CARGO_PKG_VERSION"));
    info!(
        config = %settings.config_path.display(),
        found = settings.config_path.exists(),
        "Configuration file"
    );
    info!(
        url = %settings.service.endpoint().base_url(),
        timeout_secs = settings.service.timeout_secs,
        "Service configuration resolved"
    );

    match args.command {
        Command::Scan {
            images,
            edits,
            retry_failed,
            save,
            json,
        } => run_scan(&settings, images, edits, retry_failed, save, json).await,
        Command::Check => run_check(&settings).await,
        Command::InitConfig { force } => run_init_config(&settings, force),
    }
}

async fn run_scan(
    settings: &IntakeSettings,
    paths: Vec<PathBuf>,
    edits: Vec<FieldEdit>,
    retry_failed: bool,
    save: bool,
    json: bool,
) -> Result<()> {
    let images = paths
        .iter()
        .map(|path| {
            ImagePayload::from_path(path).with_context(|| format!("Cannot load {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let client =
        ScanServiceClient::from_config(&settings.service).context("Failed to create HTTP client")?;
    let controller = IntakeController::new(Arc::new(client), EventBus::new(256));
    spawn_progress_logger(&controller);

    let ids = controller.enqueue(images)?;
    controller.wait_until_idle().await;

    if retry_failed {
        let failed_scans: Vec<_> = controller
            .items()
            .into_iter()
            .filter(|item| item.failed_stage == Some(FailureStage::Scan))
            .map(|item| item.id)
            .collect();
        for id in failed_scans {
            controller.retry(id).await?;
        }
        controller.wait_until_idle().await;
    }

    for edit in &edits {
        let Some(id) = ids.get(edit.index - 1) else {
            bail!(
                "--edit {}: only {} image(s) were given",
                edit.index,
                ids.len()
            );
        };
        if let Err(e) = controller.update_field(*id, &edit.field, edit.value.as_str()) {
            warn!("--edit {}:{} not applied: {}", edit.index, edit.field, e);
        }
    }

    if save {
        let report = controller.persist_all_editing().await;
        info!(
            "Saved {} record(s), {} failed, {} skipped",
            report.persisted(),
            report.failed(),
            report.skipped()
        );
    }

    let summaries: Vec<ItemSummary> = controller.items().iter().map(ItemSummary::from).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print_table(&summaries);
    }

    let failed = summaries
        .iter()
        .filter(|s| s.status == ItemStatus::Failed)
        .count();
    if failed > 0 {
        bail!("{} of {} item(s) failed", failed, summaries.len());
    }
    Ok(())
}

/// Log item transitions as they happen
fn spawn_progress_logger(controller: &IntakeController) {
    let mut rx = controller.event_bus().subscribe();
    let controller = controller.clone();

    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if let IntakeEvent::ItemStatusChanged {
                item_id,
                new_status,
                error_message,
                ..
            } = event
            {
                let file = controller
                    .item(item_id)
                    .map(|item| item.image.file_name)
                    .unwrap_or_default();
                match error_message {
                    Some(message) => warn!("{}: {} ({})", file, new_status, message),
                    None => info!("{}: {}", file, new_status),
                }
            }
        }
    });
}

fn print_table(summaries: &[ItemSummary]) {
    for (n, summary) in summaries.iter().enumerate() {
        match &summary.error {
            Some(error) => println!("#{} {} [{}] {}", n + 1, summary.file, summary.status, error),
            None => println!("#{} {} [{}]", n + 1, summary.file, summary.status),
        }

        for spec in FIELD_CATALOG.iter() {
            if let Some(value) = summary.fields.get(spec.key) {
                println!("    {:<9} {}", spec.label, value);
            }
        }
        for (key, value) in summary.fields.iter() {
            if oplog_common::fields::field_spec(key).is_none() {
                println!("    {:<9} {}", key, value);
            }
        }
    }
}

async fn run_check(settings: &IntakeSettings) -> Result<()> {
    let client =
        ScanServiceClient::from_config(&settings.service).context("Failed to create HTTP client")?;
    client
        .health()
        .await
        .with_context(|| format!("Service at {} is not reachable", client.base_url()))?;

    println!("Service reachable at {}", client.base_url());
    Ok(())
}

fn run_init_config(settings: &IntakeSettings, force: bool) -> Result<()> {
    let path = &settings.config_path;
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let config = TomlConfig {
        service: settings.service.clone(),
        logging: settings.logging.clone(),
    };
    write_toml_config(&config, path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote {}", path.display());
    Ok(())
}
