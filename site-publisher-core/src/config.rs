use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::contract::{SiteConnection, SiteType};

/// The publish document: one site, any number of jobs.
///
/// Field names follow the on-disk format (`spSiteUrl`, `pubPaths`, ...).
/// Credentials are optional here so they can come from the environment or
/// the command line instead.
#[derive(Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(rename = "spSiteUrl")]
    pub site_url: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(rename = "spSiteType")]
    pub site_type: SiteType,
    #[serde(rename = "pubPaths", default)]
    pub jobs: Vec<PublishJob>,
    /// Per-request timeout for the HTTP store, in seconds.
    #[serde(rename = "timeoutSecs", default)]
    pub timeout_secs: Option<u64>,
}

impl PublishConfig {
    pub fn trace_loaded(&self) {
        info!(
            site_url = %self.site_url,
            site_type = %self.site_type,
            user = self.user.as_deref().unwrap_or("<unset>"),
            jobs = self.jobs.len(),
            "Loaded publish config"
        );
        for job in &self.jobs {
            job.trace_loaded();
        }
        debug!(config = ?self, "Publish config (full debug)");
    }

    /// Connection parameters, if both credentials are present.
    pub fn connection(&self) -> Option<SiteConnection> {
        Some(SiteConnection {
            site_url: self.site_url.clone(),
            username: self.user.clone()?,
            password: self.password.clone()?,
            site_type: self.site_type,
        })
    }
}

impl fmt::Debug for PublishConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishConfig")
            .field("site_url", &self.site_url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("site_type", &self.site_type)
            .field("jobs", &self.jobs)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// One `source -> destination` publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishJob {
    #[serde(rename = "src")]
    pub source: PathBuf,
    #[serde(rename = "dest")]
    pub destination: String,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default = "default_recursive")]
    pub recursive: bool,
}

fn default_recursive() -> bool {
    true
}

impl PublishJob {
    pub fn new(source: impl Into<PathBuf>, destination: &str) -> Self {
        Self {
            source: source.into(),
            destination: destination.to_string(),
            filter: None,
            recursive: true,
        }
    }

    /// The glob to apply, `*` when none was configured.
    pub fn filter(&self) -> &str {
        self.filter.as_deref().unwrap_or("*")
    }

    pub fn trace_loaded(&self) {
        info!(
            source = %self.source.display(),
            destination = %self.destination,
            recursive = self.recursive,
            filter = self.filter(),
            "Loaded publish job"
        );
    }
}

impl fmt::Display for PublishJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "recursive={}, filter={}, {} -> {}",
            self.recursive,
            self.filter(),
            self.source.display(),
            self.destination
        )
    }
}
