//! Top-level driver: runs every configured [`PublishJob`] against one session.
//!
//! Jobs run strictly one after another. A failing job is logged and recorded
//! in the [`RunReport`], then the next job starts; jobs never see each other's
//! failures. Whether the run as a whole succeeded is decided by the caller
//! from [`RunReport::is_success`].

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::PublishJob;
use crate::contract::RemoteStore;
use crate::publish::{publish_folder, PublishReport};
use crate::session::RemoteSession;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatus {
    Published(PublishReport),
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub source: PathBuf,
    pub destination: String,
    pub status: JobStatus,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, JobStatus::Published(_))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub jobs: Vec<JobOutcome>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.jobs.iter().all(JobOutcome::is_success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &JobOutcome> {
        self.jobs.iter().filter(|job| !job.is_success())
    }
}

pub async fn publish_jobs<S: RemoteStore>(
    session: &mut RemoteSession<S>,
    jobs: &[PublishJob],
) -> RunReport {
    let mut report = RunReport::default();
    if jobs.is_empty() {
        warn!("No publish path configured, nothing to publish");
        return report;
    }

    info!(
        site_url = session.base_url(),
        site_type = %session.site_type(),
        jobs = jobs.len(),
        "Publishing to site"
    );
    for job in jobs {
        info!(destination = %job.destination, job = %job, "Start to publish");
        let status = match publish_folder(
            session,
            &job.source,
            &job.destination,
            job.recursive,
            job.filter(),
        )
        .await
        {
            Ok(published) => {
                info!(destination = %job.destination, "Published successfully");
                JobStatus::Published(published)
            }
            Err(e) => {
                error!(destination = %job.destination, source = %job.source.display(), error = %e, "Publish failed");
                JobStatus::Failed {
                    error: e.to_string(),
                }
            }
        };
        report.jobs.push(JobOutcome {
            source: job.source.clone(),
            destination: job.destination.clone(),
            status,
        });
    }

    match serde_json::to_string_pretty(&report) {
        Ok(json) => debug!(json = %json, "Run report"),
        Err(e) => error!(error = ?e, "Failed to serialize run report"),
    }
    info!(
        jobs = report.jobs.len(),
        failed = report.failed().count(),
        "All publish jobs processed"
    );
    report
}
