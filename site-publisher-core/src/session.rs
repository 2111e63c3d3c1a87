//! Connected session state: site address, credentials, the pending mutation
//! queue and the folders this session knows to exist.

use std::collections::HashSet;

use tracing::{debug, error, info};

use crate::contract::{Mutation, RemoteStore, SiteConnection, SiteType};
use crate::error::{PublishError, Result};

/// Handle to a remote folder. Obtaining one performs no remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHandle {
    pub url: String,
    /// Whether the session had already created or loaded this folder.
    pub known: bool,
}

/// What a single [`RemoteSession::commit`] sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub folders: usize,
    pub files: usize,
    pub bytes: u64,
}

impl CommitSummary {
    /// False when the queue was empty and no round trip happened.
    pub fn round_trip(&self) -> bool {
        self.folders + self.files > 0
    }
}

/// A connected session owning a [`RemoteStore`].
///
/// Mutations are buffered until [`commit`](Self::commit), which sends them as
/// one batch. Folder existence is answered from session-local knowledge only:
/// folders committed (or queued) through this session, plus any marked with
/// [`mark_known`](Self::mark_known).
pub struct RemoteSession<S> {
    site: SiteConnection,
    base_url: String,
    store: S,
    pending: Vec<Mutation>,
    queued_folders: HashSet<String>,
    known_folders: HashSet<String>,
}

impl<S: RemoteStore> RemoteSession<S> {
    pub async fn connect(store: S, site: SiteConnection) -> Result<Self> {
        let base_url = site.site_url.trim().trim_end_matches('/').to_string();
        for (field, value) in [
            ("site url", base_url.as_str()),
            ("username", site.username.as_str()),
            ("password", site.password.as_str()),
        ] {
            if value.trim().is_empty() {
                error!(field, "Session is missing a required field");
                return Err(PublishError::Connection(format!("{field} must not be empty")));
            }
        }

        info!(site_url = %base_url, site_type = %site.site_type, user = %site.username, "Connecting to site");
        if let Err(e) = store.connect(&site).await {
            error!(site_url = %base_url, error = %e, "Site handshake failed");
            return Err(PublishError::Connection(e.to_string()));
        }
        info!(site_url = %base_url, "Connected to site");

        Ok(Self {
            site,
            base_url,
            store,
            pending: Vec::new(),
            queued_folders: HashSet::new(),
            known_folders: HashSet::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn site_type(&self) -> SiteType {
        self.site.site_type
    }

    /// Absolute URL of `relative` under the site: both sides trimmed of
    /// separators and joined by exactly one `/`.
    pub fn resolve(&self, relative: &str) -> String {
        join_url(&self.base_url, relative)
    }

    pub fn get_folder(&self, url: &str) -> FolderHandle {
        FolderHandle {
            url: normalize(url).to_string(),
            known: self.folder_exists(url),
        }
    }

    pub fn folder_exists(&self, url: &str) -> bool {
        let url = normalize(url);
        self.known_folders.contains(url) || self.queued_folders.contains(url)
    }

    /// Record a folder as existing without queuing anything.
    pub fn mark_known(&mut self, url: &str) {
        self.known_folders.insert(normalize(url).to_string());
    }

    /// Queue creation of `url`. Returns false if the folder is already known
    /// or queued, in which case nothing is added.
    pub fn create_folder(&mut self, url: &str) -> bool {
        if self.folder_exists(url) {
            return false;
        }
        let url = normalize(url).to_string();
        debug!(url = %url, "Queue folder creation");
        self.queued_folders.insert(url.clone());
        self.pending.push(Mutation::CreateFolder { url });
        true
    }

    /// Queue an overwriting upload of `content` to `url`.
    pub fn upload_file(&mut self, url: &str, content: Vec<u8>) {
        debug!(url, bytes = content.len(), "Queue file upload");
        self.pending.push(Mutation::UploadFile {
            url: url.to_string(),
            content,
            overwrite: true,
        });
    }

    pub fn pending(&self) -> &[Mutation] {
        &self.pending
    }

    /// Drop the queue without sending it.
    pub fn discard_pending(&mut self) {
        if !self.pending.is_empty() {
            debug!(dropped = self.pending.len(), "Discarding uncommitted mutations");
        }
        self.pending.clear();
        self.queued_folders.clear();
    }

    /// Send every queued mutation as one batch.
    ///
    /// An empty queue costs no round trip. On failure the batch is dropped
    /// and folders it would have created are forgotten again; anything sent
    /// by earlier commits stays on the remote.
    pub async fn commit(&mut self) -> Result<CommitSummary> {
        if self.pending.is_empty() {
            return Ok(CommitSummary::default());
        }

        let batch = std::mem::take(&mut self.pending);
        let queued = std::mem::take(&mut self.queued_folders);
        let summary = summarize(&batch);

        debug!(
            folders = summary.folders,
            files = summary.files,
            bytes = summary.bytes,
            "Committing batch"
        );
        match self.store.execute(batch).await {
            Ok(()) => {
                self.known_folders.extend(queued);
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, folders = summary.folders, files = summary.files, "Commit failed");
                Err(PublishError::Remote(e.to_string()))
            }
        }
    }
}

fn summarize(batch: &[Mutation]) -> CommitSummary {
    batch.iter().fold(CommitSummary::default(), |mut acc, m| {
        match m {
            Mutation::CreateFolder { .. } => acc.folders += 1,
            Mutation::UploadFile { content, .. } => {
                acc.files += 1;
                acc.bytes += content.len() as u64;
            }
        }
        acc
    })
}

fn normalize(url: &str) -> &str {
    url.trim_end_matches('/')
}

pub(crate) fn join_url(base: &str, relative: &str) -> String {
    let base = base.trim_end_matches('/');
    let relative = relative.trim_matches('/');
    if relative.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{relative}")
    }
}
