//! HTTP binding of the grant table for a PostgREST-style endpoint.

use async_trait::async_trait;
use chrono::Utc;
use grantfinder_core::GrantRecord;
use grantfinder_store::{DOCUMENT_ROW_ID, RemoteError, RemoteStore, StoredRow};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum RestError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<RestError> for RemoteError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Http(e) if e.is_decode() => RemoteError::Malformed(e.to_string()),
            RestError::Http(e) => RemoteError::Unreachable(e.to_string()),
            RestError::Server { status, body } => RemoteError::Rejected { status, body },
            RestError::Json(e) => RemoteError::Malformed(e.to_string()),
        }
    }
}

/// Upsert body for the document row.
#[derive(Serialize)]
struct DocumentRow<'a> {
    id: &'a str,
    data: &'a [GrantRecord],
    updated_at: String,
}

/// The grant table behind `{base_url}/rest/v1/{table}`.
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    table: String,
    api_key: String,
}

impl RestStore {
    /// `base_url` should be like `https://project.example.co` (a trailing
    /// slash is trimmed).
    pub fn new(base_url: &str, api_key: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            table: table.into(),
            api_key: api_key.into(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn read_request(&self) -> RequestBuilder {
        self.request(Method::GET)
            .query(&[("select", "*"), ("order", "created_at.asc")])
    }

    fn upsert_request(&self, grants: &[GrantRecord], updated_at: String) -> RequestBuilder {
        self.request(Method::POST)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&DocumentRow {
                id: DOCUMENT_ROW_ID,
                data: grants,
                updated_at,
            })
    }

    /// Drops every row other than the document row.
    fn prune_request(&self) -> RequestBuilder {
        self.request(Method::DELETE)
            .query(&[("id", format!("neq.{DOCUMENT_ROW_ID}"))])
    }

    /// All rows, oldest first.
    pub async fn fetch(&self) -> Result<Vec<StoredRow>, RestError> {
        info!(url = %self.table_url(), "fetching grant rows");
        let resp = check(self.read_request().send().await?).await?;
        let body = resp.bytes().await?;
        let rows: Vec<StoredRow> = serde_json::from_slice(&body)?;
        info!(rows = rows.len(), "fetched grant rows");
        Ok(rows)
    }

    /// Upsert the document row with `grants`, then delete any other rows.
    ///
    /// The upsert runs first so readers never observe an empty table.
    pub async fn replace(&self, grants: &[GrantRecord]) -> Result<(), RestError> {
        info!(url = %self.table_url(), count = grants.len(), "writing grant list");
        let stamp = Utc::now().to_rfc3339();
        check(self.upsert_request(grants, stamp).send().await?).await?;
        check(self.prune_request().send().await?).await?;
        debug!("pruned stray rows");
        Ok(())
    }
}

async fn check(resp: Response) -> Result<Response, RestError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(RestError::Server {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn fetch_rows(&self) -> Result<Vec<StoredRow>, RemoteError> {
        Ok(self.fetch().await?)
    }

    async fn replace_all(&self, grants: &[GrantRecord]) -> Result<(), RemoteError> {
        Ok(self.replace(grants).await?)
    }
}
