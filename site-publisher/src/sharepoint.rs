#![doc = "SharePoint REST implementation of the core `RemoteStore` trait."]
//
//! # SharePoint store
//!
//! Bridges the publishing engine to a SharePoint site over its REST API:
//!
//! - `connect` fetches a form digest from `/_api/contextinfo`, which also
//!   proves the credentials work.
//! - `CreateFolder` → `POST /_api/web/folders/add('<server relative url>')`
//! - `UploadFile` → `POST /_api/web/GetFolderByServerRelativeUrl('<parent>')/Files/add(url='<name>',overwrite=true)`
//!
//! On-premises sites get HTTP Basic credentials. Hosted sites get the
//! password sent as a bearer access token; obtaining that token is left to
//! whoever writes the config.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;

use site_publisher_core::contract::{Mutation, RemoteStore, SiteConnection, SiteType, StoreError};

const ODATA_JSON: &str = "application/json;odata=nometadata";

#[derive(Clone)]
enum Auth {
    Basic { user: String, password: String },
    Bearer(String),
}

#[derive(Clone)]
struct Connected {
    site_url: String,
    origin: String,
    auth: Auth,
    digest: String,
}

#[derive(Deserialize)]
struct ContextInfo {
    #[serde(rename = "FormDigestValue")]
    form_digest_value: String,
}

pub struct SharePointClient {
    http: Client,
    connected: Mutex<Option<Connected>>,
}

impl SharePointClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self, StoreError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| {
            tracing::error!(error = ?e, "Failed to build HTTP client");
            e
        })?;
        Ok(SharePointClient {
            http,
            connected: Mutex::new(None),
        })
    }

    fn connection(&self) -> Result<Connected, StoreError> {
        let guard = self
            .connected
            .lock()
            .map_err(|_| -> StoreError { "SharePoint client state poisoned".into() })?;
        guard
            .clone()
            .ok_or_else(|| "SharePoint client used before connect".into())
    }

    fn post(&self, conn: &Connected, endpoint: &str) -> RequestBuilder {
        let req = self
            .http
            .post(endpoint)
            .header("Accept", ODATA_JSON)
            .header("X-RequestDigest", &conn.digest);
        with_auth(req, &conn.auth)
    }

    async fn create_folder(&self, conn: &Connected, url: &str) -> Result<(), StoreError> {
        let relative = server_relative(conn, url)?;
        let endpoint = format!(
            "{}/_api/web/folders/add('{}')",
            conn.site_url,
            odata_literal(relative)
        );
        tracing::info!(folder = relative, "Creating folder");
        let resp = self.post(conn, &endpoint).body(Vec::new()).send().await?;
        check(resp, "create folder", url).await
    }

    async fn upload_file(
        &self,
        conn: &Connected,
        url: &str,
        content: &[u8],
        overwrite: bool,
    ) -> Result<(), StoreError> {
        let relative = server_relative(conn, url)?;
        let (parent, name) = relative
            .rsplit_once('/')
            .ok_or_else(|| -> StoreError { format!("file url has no parent folder: {url}").into() })?;
        let endpoint = format!(
            "{}/_api/web/GetFolderByServerRelativeUrl('{}')/Files/add(url='{}',overwrite={})",
            conn.site_url,
            odata_literal(parent),
            odata_literal(name),
            overwrite
        );
        tracing::info!(file = relative, bytes = content.len(), "Uploading file");
        let resp = self
            .post(conn, &endpoint)
            .body(content.to_vec())
            .send()
            .await?;
        check(resp, "upload file", url).await
    }
}

#[async_trait]
impl RemoteStore for SharePointClient {
    async fn connect(&self, site: &SiteConnection) -> Result<(), StoreError> {
        let site_url = site.site_url.trim().trim_end_matches('/').to_string();
        let parsed = Url::parse(&site_url)?;
        let origin = parsed.origin().ascii_serialization();
        let auth = match site.site_type {
            SiteType::OnPremises => Auth::Basic {
                user: site.username.clone(),
                password: site.password.clone(),
            },
            SiteType::Hosted => Auth::Bearer(site.password.clone()),
        };

        tracing::info!(site_url = %site_url, site_type = %site.site_type, "Requesting form digest");
        let req = self
            .http
            .post(format!("{site_url}/_api/contextinfo"))
            .header("Accept", ODATA_JSON)
            .body(Vec::new());
        let resp = with_auth(req, &auth).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, "Context info request rejected");
            return Err(format!("context info request failed with {status}: {body}").into());
        }
        let info: ContextInfo = resp.json().await?;

        let mut guard = self
            .connected
            .lock()
            .map_err(|_| -> StoreError { "SharePoint client state poisoned".into() })?;
        *guard = Some(Connected {
            site_url,
            origin,
            auth,
            digest: info.form_digest_value,
        });
        Ok(())
    }

    async fn execute(&self, batch: Vec<Mutation>) -> Result<(), StoreError> {
        let conn = self.connection()?;
        tracing::debug!(mutations = batch.len(), "Executing batch");
        for mutation in &batch {
            match mutation {
                Mutation::CreateFolder { url } => self.create_folder(&conn, url).await?,
                Mutation::UploadFile {
                    url,
                    content,
                    overwrite,
                } => self.upload_file(&conn, url, content, *overwrite).await?,
            }
        }
        Ok(())
    }
}

fn with_auth(req: RequestBuilder, auth: &Auth) -> RequestBuilder {
    match auth {
        Auth::Basic { user, password } => req.basic_auth(user, Some(password)),
        Auth::Bearer(token) => req.bearer_auth(token),
    }
}

async fn check(resp: Response, action: &str, url: &str) -> Result<(), StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::error!(%status, url, body = %body, "SharePoint rejected {action}");
    Err(format!("{action} {url} failed with {status}: {body}").into())
}

/// Path part of an absolute URL on the connected site's host.
fn server_relative<'a>(conn: &Connected, url: &'a str) -> Result<&'a str, StoreError> {
    url.strip_prefix(conn.origin.as_str())
        .filter(|rest| rest.starts_with('/'))
        .ok_or_else(|| format!("{url} is not on site {}", conn.site_url).into())
}

/// Quote a value for an OData string literal inside a URL path.
fn odata_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '%' => out.push_str("%25"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            other => out.push(other),
        }
    }
    out
}
