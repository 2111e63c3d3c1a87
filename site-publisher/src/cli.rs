///
/// This module implements the CLI interface for site-publisher: command parsing,
/// argument validation and the user-visible output of each subcommand.
///
/// Hierarchy building, publishing and job orchestration live in
/// [`site-publisher-core`]. This module is strictly CLI glue.
///
/// ## How To Use
/// - For command-line users: run the `site-publisher` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`site-publisher-core`]: ../../site-publisher-core/
use crate::load_config::{apply_overrides, load_config};
use crate::sharepoint::SharePointClient;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use site_publisher_core::config::PublishJob;
use site_publisher_core::contract::{RemoteStore, SiteConnection};
use site_publisher_core::hierarchy::{build_hierarchy, render_hierarchy, HierarchyOptions};
use site_publisher_core::jobs::{publish_jobs, JobStatus, RunReport};
use site_publisher_core::memory::MemoryStore;
use site_publisher_core::session::RemoteSession;
use std::path::PathBuf;
use std::time::Duration;

/// CLI for site-publisher: mirror local folders onto a SharePoint site.
#[derive(Parser)]
#[clap(
    name = "site-publisher",
    version,
    about = "Publish local folders to a SharePoint site, preserving the folder hierarchy"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Publish every path listed in the config file
    Publish {
        /// Path to the YAML or JSON publish config
        #[clap(long)]
        config: PathBuf,
        /// Site user, overrides config file and environment
        #[clap(long)]
        user: Option<String>,
        /// Site password (or access token for hosted sites)
        #[clap(long)]
        password: Option<String>,
        /// Replay into an in-memory site and list what would change
        #[clap(long)]
        dry_run: bool,
    },
    /// Print the local hierarchy a publish would walk
    Tree {
        /// Local file or folder
        #[clap(long)]
        source: PathBuf,
        /// Glob applied to file names
        #[clap(long, default_value = "*")]
        filter: String,
        /// Only list direct children
        #[clap(long)]
        no_recursive: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Publish {
            config,
            user,
            password,
            dry_run,
        } => {
            let mut config = load_config(config)?;
            apply_overrides(&mut config, user, password);

            let report = if dry_run {
                if config.user.is_none() {
                    config.user = Some("dry-run".to_string());
                }
                if config.password.is_none() {
                    config.password = Some("dry-run".to_string());
                }
                let site = connection(&config)?;
                let store = MemoryStore::new();
                let report = publish_with(store.clone(), site, &config.jobs).await?;
                for folder in store.folders() {
                    println!("would create folder {folder}");
                }
                for file in store.files() {
                    println!("would upload {file}");
                }
                report
            } else {
                let site = connection(&config)?;
                let client = SharePointClient::new(config.timeout_secs.map(Duration::from_secs))
                    .map_err(|e| anyhow::anyhow!("Failed to construct SharePoint client: {e}"))?;
                publish_with(client, site, &config.jobs).await?
            };

            print_summary(&report);
            if report.is_success() {
                tracing::info!(command = "publish", jobs = report.jobs.len(), "Publish complete");
                Ok(())
            } else {
                let failed = report.failed().count();
                tracing::error!(command = "publish", failed, "Publish finished with failures");
                anyhow::bail!("{failed} of {} publish jobs failed", report.jobs.len())
            }
        }
        Commands::Tree {
            source,
            filter,
            no_recursive,
        } => {
            let options = HierarchyOptions::new(!no_recursive, &filter)?;
            let node = build_hierarchy(&source, &options, true)?;
            for line in render_hierarchy(&node) {
                println!("{line}");
            }
            Ok(())
        }
    }
}

fn connection(config: &site_publisher_core::config::PublishConfig) -> Result<SiteConnection> {
    config.connection().context(
        "Site credentials missing: set user/password in the config, \
         SITE_PUBLISHER_USER/SITE_PUBLISHER_PASSWORD, or --user/--password",
    )
}

async fn publish_with<S: RemoteStore>(
    store: S,
    site: SiteConnection,
    jobs: &[PublishJob],
) -> Result<RunReport> {
    let site_url = site.site_url.clone();
    let mut session = RemoteSession::connect(store, site)
        .await
        .with_context(|| format!("Failed to connect to site {site_url}"))?;
    Ok(publish_jobs(&mut session, jobs).await)
}

fn print_summary(report: &RunReport) {
    if report.jobs.is_empty() {
        println!("No publish paths configured.");
        return;
    }
    for job in &report.jobs {
        match &job.status {
            JobStatus::Published(published) => println!(
                "published {} -> {}: {} folders, {} files ({} bytes)",
                job.source.display(),
                published.destination_url,
                published.folders_created,
                published.files_uploaded,
                published.bytes_uploaded
            ),
            JobStatus::Failed { error } => {
                println!("FAILED {} -> {}: {error}", job.source.display(), job.destination)
            }
        }
    }
}
