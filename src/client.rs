//! HTTP client for the Lexica backend.
//!
//! [`LexicaClient`] wraps the backend's endpoints behind typed methods. It
//! owns no session state beyond the base URL and the connection pool — the
//! pipeline and dispatcher layer their state machines on top of it.
//!
//! Status handling is uniform: a non-2xx response becomes
//! [`ClientError::Server`] carrying the status and the raw body, a 2xx body
//! that fails to decode becomes [`ClientError::MalformedResponse`], and
//! anything below HTTP becomes [`ClientError::Transport`]. The client never
//! retries; ingestion failures are terminal by contract.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::error::ClientError;
use crate::models::{
    ConversationView, IndexStats, ParseStats, RawSearchResponse, UploadReceipt,
};

/// Upload bodies are streamed in 64 KiB chunks so progress can be observed.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct LexicaClient {
    http: reqwest::Client,
    base_url: String,
}

impl LexicaClient {
    /// Build a client from configuration. The timeout applies per request.
    pub fn new(config: &ServiceConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Health check: `GET /ping`.
    pub async fn ping(&self) -> Result<(), ClientError> {
        let resp = self.http.get(self.url("/ping")).send().await?;
        decode::<serde_json::Value>(resp).await?;
        Ok(())
    }

    /// Upload an export file as `POST /upload` (multipart, field `file`).
    ///
    /// `on_progress` is called with a percentage in [0, 100] as chunks of the
    /// body are handed to the transport. Reporting is best-effort: for an
    /// empty file nothing is reported until completion.
    pub async fn upload(
        &self,
        path: &Path,
        on_progress: Arc<dyn Fn(u8) + Send + Sync>,
    ) -> Result<UploadReceipt, ClientError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::Validation(format!("cannot read {}: {}", path.display(), e)))?;
        let total = bytes.len() as u64;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.json")
            .to_string();

        debug!(file = %file_name, size = total, "uploading export");

        let sent = AtomicU64::new(0);
        let chunks: Vec<Bytes> = bytes
            .chunks(UPLOAD_CHUNK_SIZE)
            .map(Bytes::copy_from_slice)
            .collect();
        let stream = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
            let done = sent.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
            if total > 0 {
                on_progress(((done * 100) / total) as u8);
            }
            Ok::<Bytes, std::io::Error>(chunk)
        }));

        let part = reqwest::multipart::Part::stream_with_length(
            reqwest::Body::wrap_stream(stream),
            total,
        )
        .file_name(file_name)
        .mime_str("application/octet-stream")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;
        decode(resp).await
    }

    /// `POST /datasets/{id}/parse` — turn the raw export into message rows.
    pub async fn parse(&self, dataset_id: &str) -> Result<ParseStats, ClientError> {
        debug!(dataset_id, "requesting parse");
        let resp = self
            .http
            .post(self.url(&format!("/datasets/{}/parse", dataset_id)))
            .send()
            .await?;
        decode(resp).await
    }

    /// `POST /datasets/{id}/index/bm25` — build the lexical index.
    pub async fn build_index(&self, dataset_id: &str) -> Result<IndexStats, ClientError> {
        debug!(dataset_id, "requesting index build");
        let resp = self
            .http
            .post(self.url(&format!("/datasets/{}/index/bm25", dataset_id)))
            .send()
            .await?;
        decode(resp).await
    }

    /// `GET /datasets/{id}/search` with prebuilt query parameters.
    pub async fn search(
        &self,
        dataset_id: &str,
        params: &[(&str, String)],
    ) -> Result<RawSearchResponse, ClientError> {
        debug!(dataset_id, ?params, "dispatching search");
        let resp = self
            .http
            .get(self.url(&format!("/datasets/{}/search", dataset_id)))
            .query(params)
            .send()
            .await?;
        decode(resp).await
    }

    /// `GET /datasets/{id}/conversation/{conv_id}` — fetch a conversation, or
    /// a window of it centered on one message.
    pub async fn conversation(
        &self,
        dataset_id: &str,
        conv_id: &str,
        center_msg: Option<i64>,
        window: Option<u32>,
    ) -> Result<ConversationView, ClientError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(center) = center_msg {
            params.push(("center_msg", center.to_string()));
        }
        if let Some(window) = window {
            params.push(("window", window.to_string()));
        }
        let resp = self
            .http
            .get(self.url(&format!(
                "/datasets/{}/conversation/{}",
                dataset_id, conv_id
            )))
            .query(&params)
            .send()
            .await?;
        decode(resp).await
    }
}

/// Shared status/body handling for every endpoint.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(ClientError::Server {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|e| ClientError::MalformedResponse(e.to_string()))
}
