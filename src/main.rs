// src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

mod config;
mod credits;
mod db;
mod logging;
mod pipeline;
mod queue;
mod s3;
#[cfg(test)]
mod test_utils;

use crate::credits::DynamoCreditLedger;
use crate::db::backend::ProjectBackend;
use crate::db::dynamo::DynamoProjectBackend;
use crate::db::sqlite::SqliteProjectBackend;
use crate::db::{ProjectState, ProjectStore};
use crate::pipeline::ProjectService;
use crate::queue::SqsJobQueue;
use crate::s3::S3ObjectStorage;

type Service = ProjectService<SqsJobQueue, S3ObjectStorage, DynamoCreditLedger>;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.toml",
        global = true
    )]
    config: String,

    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List an owner's projects, most recently modified first
    List {
        /// Owner whose projects to list
        #[arg(long)]
        owner_id: String,
    },
    /// Submit the crop job for a project
    Submit {
        #[arg(long)]
        owner_id: String,

        #[arg(long)]
        project_id: String,
    },
    /// Check processing projects for finished output and mark them Completed
    Reconcile {
        #[arg(long)]
        owner_id: String,

        /// Reconcile a single project instead of all of them
        #[arg(long)]
        project_id: Option<String>,

        /// Keep polling instead of a single pass
        #[arg(long)]
        watch: bool,

        /// Seconds between polling passes
        #[arg(long, default_value_t = 10)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match config::load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {e}", cli.config);
            process::exit(1);
        }
    };

    let _log_guard = logging::init_logging(config.logging.as_ref(), cli.verbose)?;
    info!("clip-cropper v{}", env!("CARGO_PKG_VERSION"));

    let service = build_service(&config).await?;

    let result = match cli.command {
        Commands::List { owner_id } => list_projects(&service, &owner_id).await,
        Commands::Submit {
            owner_id,
            project_id,
        } => submit(&service, &owner_id, &project_id).await,
        Commands::Reconcile {
            owner_id,
            project_id,
            watch,
            interval_secs,
        } => {
            if watch {
                loop {
                    if let Err(e) =
                        reconcile_pass(&service, &owner_id, project_id.as_deref()).await
                    {
                        error!("Reconcile pass failed: {e}");
                    }
                    tokio::time::sleep(Duration::from_secs(interval_secs)).await;
                }
            } else {
                reconcile_pass(&service, &owner_id, project_id.as_deref()).await
            }
        }
    };

    if let Err(e) = result {
        error!("Command failed: {e}");
        process::exit(1);
    }
    Ok(())
}

async fn build_service(config: &config::Config) -> Result<Service> {
    let backend: Arc<dyn ProjectBackend> = match &config.store.sqlite_path {
        Some(path) => Arc::new(
            SqliteProjectBackend::new(path).context("Failed to open SQLite project store")?,
        ),
        None => Arc::new(
            DynamoProjectBackend::new(&config.store)
                .await
                .context("Failed to connect to project table")?,
        ),
    };
    let store = ProjectStore::new(backend, config.limits.max_track_hints);

    let queue = SqsJobQueue::new(&config.queue)
        .await
        .context("Failed to connect to job queue")?;
    let storage = S3ObjectStorage::new(&config.storage)
        .await
        .context("Failed to connect to object storage")?;
    let credits = DynamoCreditLedger::new(&config.credits)
        .await
        .context("Failed to connect to credit ledger")?;

    Ok(ProjectService::new(
        store,
        queue,
        storage,
        credits,
        config.submit.clone(),
    ))
}

async fn list_projects(service: &Service, owner_id: &str) -> Result<()> {
    let projects = service.list_projects(owner_id).await?;
    if projects.is_empty() {
        println!("No projects for owner {owner_id}");
        return Ok(());
    }
    for project in projects {
        println!(
            "{}  {:<10}  {}  (modified {})",
            project.id, project.state, project.title, project.last_modified_at
        );
    }
    Ok(())
}

async fn submit(service: &Service, owner_id: &str, project_id: &str) -> Result<()> {
    let (project, receipt) = service.submit(owner_id, project_id).await?;
    println!(
        "Submitted project {} (state {}, message id {})",
        project.id, project.state, receipt.message_id
    );
    Ok(())
}

async fn reconcile_pass(
    service: &Service,
    owner_id: &str,
    project_id: Option<&str>,
) -> Result<()> {
    let projects = match project_id {
        Some(id) => vec![service.get_project(owner_id, id).await?],
        None => service.list_projects(owner_id).await?,
    };

    for project in projects {
        if project.state != ProjectState::Processing {
            continue;
        }
        let reconciled = service.reconcile(owner_id, &project.id).await?;
        if reconciled.state == ProjectState::Completed {
            info!("Project {} completed", reconciled.id);
        }
    }
    Ok(())
}
