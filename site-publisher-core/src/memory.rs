//! In-memory [`RemoteStore`]: a stand-in site used by `publish --dry-run`
//! and by tests that need to inspect the resulting remote tree.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::contract::{Mutation, RemoteStore, SiteConnection, StoreError};

#[derive(Debug, Default)]
struct MemoryState {
    connected: bool,
    folders: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    batches: Vec<Vec<Mutation>>,
    reject_connect: Option<String>,
    reject_url: Option<String>,
}

/// Records folders and files keyed by absolute URL.
///
/// Clones share state, so a test can keep one handle while the session owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the handshake with `reason`.
    pub fn reject_connect(self, reason: &str) -> Self {
        self.lock().reject_connect = Some(reason.to_string());
        self
    }

    /// Fail any batch containing a mutation targeting `url`.
    pub fn reject_url(self, url: &str) -> Self {
        self.lock().reject_url = Some(url.to_string());
        self
    }

    /// Pre-populate a file, as if it existed before this run.
    pub fn seed_file(&self, url: &str, content: &[u8]) {
        self.lock().files.insert(url.to_string(), content.to_vec());
    }

    pub fn folders(&self) -> Vec<String> {
        self.lock().folders.iter().cloned().collect()
    }

    pub fn files(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }

    pub fn file(&self, url: &str) -> Option<Vec<u8>> {
        self.lock().files.get(url).cloned()
    }

    /// Every batch received, in order.
    pub fn batches(&self) -> Vec<Vec<Mutation>> {
        self.lock().batches.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.lock().batches.iter().map(Vec::len).sum()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock only happens in a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn connect(&self, site: &SiteConnection) -> Result<(), StoreError> {
        let mut state = self.lock();
        if let Some(reason) = &state.reject_connect {
            return Err(reason.clone().into());
        }
        state.connected = true;
        info!(site_url = %site.site_url, "Connected to in-memory store");
        Ok(())
    }

    async fn execute(&self, batch: Vec<Mutation>) -> Result<(), StoreError> {
        let mut state = self.lock();
        if !state.connected {
            return Err("in-memory store used before connect".into());
        }
        if let Some(url) = &state.reject_url {
            if batch.iter().any(|m| m.url() == url) {
                return Err(format!("rejected mutation for {url}").into());
            }
        }

        for mutation in &batch {
            match mutation {
                Mutation::CreateFolder { url } => {
                    debug!(url = %url, "Create folder");
                    state.folders.insert(url.clone());
                }
                Mutation::UploadFile {
                    url,
                    content,
                    overwrite,
                } => {
                    if !overwrite && state.files.contains_key(url) {
                        return Err(format!("file already exists: {url}").into());
                    }
                    debug!(url = %url, bytes = content.len(), "Upload file");
                    state.files.insert(url.clone(), content.clone());
                }
            }
        }
        state.batches.push(batch);
        Ok(())
    }
}
