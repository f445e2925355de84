//! REST document endpoint
//!
//! - `GET  {base}/collections/{c}/documents` returns `{"documents": [{id, fields}]}`
//! - `PUT  {base}/collections/{c}/documents/{id}` with the fields as body
//! - `POST {base}/collections/{c}:commit` with `{"writes": [{id, fields}]}`
//!
//! The server applies a commit all-or-nothing.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{RemoteError, RemoteStore, SetOp, WriteBatch};
use crate::document::{Record, RemoteDocument};

#[derive(Deserialize)]
struct DocumentsResponse {
    #[serde(default)]
    documents: Vec<RemoteDocument>,
}

#[derive(Serialize)]
struct CommitRequest<'a> {
    writes: &'a [SetOp],
}

/// Remote store reached over HTTP
pub struct HttpRemote {
    base_url: String,
    base: Url,
    client: Client,
}

impl HttpRemote {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url).map_err(|e| RemoteError::InvalidUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl {
                url: base_url,
                reason: "cannot hold path segments".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("quizsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url,
            base,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn documents_url(&self, collection: &str) -> Url {
        self.endpoint(&["collections", collection, "documents"])
    }

    fn document_url(&self, collection: &str, id: &str) -> Url {
        self.endpoint(&["collections", collection, "documents", id])
    }

    fn commit_url(&self, collection: &str) -> Url {
        self.endpoint(&["collections", &format!("{}:commit", collection)])
    }

    /// Base URL extended by percent-encoded path segments
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Checked in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Turn a non-success response into a status error
async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        status: status.as_u16(),
        url,
        body,
    })
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<RemoteDocument>, RemoteError> {
        let url = self.documents_url(collection);
        debug!("GET {}", url);

        let response = check_status(self.client.get(url).send().await?).await?;
        let bytes = response.bytes().await?;
        let parsed: DocumentsResponse = serde_json::from_slice(&bytes)?;
        Ok(parsed.documents)
    }

    async fn set(&self, collection: &str, id: &str, fields: Record) -> Result<(), RemoteError> {
        let url = self.document_url(collection, id);
        debug!("PUT {}", url);

        check_status(self.client.put(url).json(&fields).send().await?).await?;
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), RemoteError> {
        let url = self.commit_url(batch.collection());
        debug!("POST {} ({} write(s))", url, batch.len());

        let body = CommitRequest {
            writes: batch.writes(),
        };
        check_status(self.client.post(url).json(&body).send().await?).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}
