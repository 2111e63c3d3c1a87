//! Publishing engine: replays a local hierarchy onto a remote session.
//!
//! A publish runs in three commitment phases:
//!   1. build the local tree (no remote traffic, so a bad source costs nothing),
//!   2. ensure every segment of the destination exists, flushed as one commit,
//!   3. walk the tree depth-first, queuing folder creations and overwriting
//!      uploads, and flush once each subtree has been queued.
//!
//! The first failing commit aborts the job. Batches already committed stay on
//! the remote; there is no rollback.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::contract::RemoteStore;
use crate::error::{PublishError, Result};
use crate::hierarchy::{build_hierarchy, render_hierarchy, FileNode, HierarchyOptions};
use crate::session::{CommitSummary, RemoteSession};

/// Counts for one published job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub destination_url: String,
    pub folders_created: usize,
    pub files_uploaded: usize,
    pub bytes_uploaded: u64,
    pub commits: usize,
}

impl PublishReport {
    fn record(&mut self, summary: CommitSummary) {
        if summary.round_trip() {
            self.commits += 1;
        }
        self.folders_created += summary.folders;
        self.files_uploaded += summary.files;
        self.bytes_uploaded += summary.bytes;
    }
}

/// Publish `source` under `destination` (relative to the session's site).
///
/// The top node of `source` is never created remotely; its children land
/// directly below the destination. Existing remote files are replaced.
pub async fn publish_folder<S: RemoteStore>(
    session: &mut RemoteSession<S>,
    source: impl AsRef<Path>,
    destination: &str,
    recursive: bool,
    filter: &str,
) -> Result<PublishReport> {
    let source = source.as_ref();
    let relative = destination
        .trim()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if relative.is_empty() {
        error!(destination, "Destination path is empty");
        return Err(PublishError::InvalidDestination(destination.to_string()));
    }
    let destination_url = session.resolve(&relative);

    let options = HierarchyOptions::new(recursive, filter)?;
    let root = build_hierarchy(source, &options, true)?;
    for line in render_hierarchy(&root) {
        info!("{line}");
    }

    let mut report = PublishReport {
        destination_url: destination_url.clone(),
        ..PublishReport::default()
    };
    report.record(ensure_cascading_folders(session, &relative).await?);

    if let Err(e) = replay(session, &root, &destination_url, &mut report).await {
        session.discard_pending();
        return Err(e);
    }

    info!(
        destination = %destination_url,
        folders = report.folders_created,
        files = report.files_uploaded,
        bytes = report.bytes_uploaded,
        commits = report.commits,
        "Publish finished"
    );
    Ok(report)
}

/// Make sure every prefix of `destination` (`a`, `a/b`, `a/b/c`) exists under
/// the site, queuing creation for the ones the session does not know, and
/// commit them together.
pub async fn ensure_cascading_folders<S: RemoteStore>(
    session: &mut RemoteSession<S>,
    destination: &str,
) -> Result<CommitSummary> {
    let mut prefix = String::new();
    for segment in destination.split('/').filter(|s| !s.is_empty()) {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(segment);

        let url = session.resolve(&prefix);
        if session.create_folder(&url) {
            debug!(url = %url, "Destination segment queued for creation");
        }
    }
    session.commit().await
}

enum Step<'a> {
    Visit { node: &'a FileNode, parent: String },
    Flush,
}

/// Depth-first, pre-order replay. Each visited node pushes a `Flush` that
/// pops only after its whole subtree has been queued.
async fn replay<S: RemoteStore>(
    session: &mut RemoteSession<S>,
    root: &FileNode,
    destination_url: &str,
    report: &mut PublishReport,
) -> Result<()> {
    let mut stack = vec![Step::Visit {
        node: root,
        parent: destination_url.to_string(),
    }];

    while let Some(step) = stack.pop() {
        let (node, parent) = match step {
            Step::Flush => {
                report.record(session.commit().await?);
                continue;
            }
            Step::Visit { node, parent } => (node, parent),
        };
        stack.push(Step::Flush);

        if node.is_directory() {
            let url = if node.is_root {
                parent
            } else {
                let url = format!("{parent}/{}", node.name);
                session.create_folder(&url);
                url
            };
            for child in node.children().iter().rev() {
                stack.push(Step::Visit {
                    node: child,
                    parent: url.clone(),
                });
            }
        } else {
            let url = format!("{parent}/{}", node.name);
            let content = fs::read(&node.full_path).map_err(|e| {
                error!(path = %node.full_path.display(), error = %e, "Failed to read file content");
                PublishError::path_access(&node.full_path, e)
            })?;
            session.upload_file(&url, content);
        }
    }
    Ok(())
}
