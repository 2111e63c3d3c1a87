//! # contract: the seam between the publishing engine and a remote store
//!
//! The engine never talks HTTP itself. It queues [`Mutation`]s on a
//! [`crate::session::RemoteSession`] and hands each flushed batch to a
//! [`RemoteStore`] implementation:
//! - the SharePoint REST client in the `site-publisher` crate,
//! - [`crate::memory::MemoryStore`] for dry runs and tests,
//! - `MockRemoteStore` (generated by `mockall`) for call-level assertions.
//!
//! Store errors are boxed trait objects; the session converts them into
//! [`crate::error::PublishError`] variants.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Error type returned by [`RemoteStore`] implementations.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Deployment target of the remote site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteType {
    #[serde(rename = "on-premises", alias = "OnPremise", alias = "onpremise")]
    OnPremises,
    #[serde(rename = "hosted", alias = "Office365", alias = "office365")]
    Hosted,
}

impl fmt::Display for SiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteType::OnPremises => f.write_str("on-premises"),
            SiteType::Hosted => f.write_str("hosted"),
        }
    }
}

/// Everything needed to open a session against one site.
#[derive(Clone, PartialEq, Eq)]
pub struct SiteConnection {
    pub site_url: String,
    pub username: String,
    pub password: String,
    pub site_type: SiteType,
}

impl fmt::Debug for SiteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteConnection")
            .field("site_url", &self.site_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("site_type", &self.site_type)
            .finish()
    }
}

/// A queued remote change. URLs are absolute (`<site url>/<relative path>`).
#[derive(Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateFolder {
        url: String,
    },
    /// Replaces any existing file at `url` in full when `overwrite` is set.
    UploadFile {
        url: String,
        content: Vec<u8>,
        overwrite: bool,
    },
}

impl Mutation {
    pub fn url(&self) -> &str {
        match self {
            Mutation::CreateFolder { url } | Mutation::UploadFile { url, .. } => url,
        }
    }
}

impl fmt::Debug for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::CreateFolder { url } => f.debug_struct("CreateFolder").field("url", url).finish(),
            Mutation::UploadFile {
                url,
                content,
                overwrite,
            } => f
                .debug_struct("UploadFile")
                .field("url", url)
                .field("bytes", &content.len())
                .field("overwrite", overwrite)
                .finish(),
        }
    }
}

/// A remote hierarchical content store.
///
/// `execute` receives one flushed batch and must apply it in order. The
/// engine calls it sequentially and never from more than one task at a time.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Perform whatever handshake the store needs before accepting batches.
    async fn connect(&self, site: &SiteConnection) -> Result<(), StoreError>;

    /// Apply every mutation of `batch`, stopping at the first failure.
    async fn execute(&self, batch: Vec<Mutation>) -> Result<(), StoreError>;
}
