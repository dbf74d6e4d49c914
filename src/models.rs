//! Core data types shared by the ingestion pipeline, search dispatcher, and
//! presenter.
//!
//! Wire names follow the Lexica backend: search hits arrive with `conv_id`,
//! `msg`, `ts` and friends; the Rust-side names spell them out.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Recognized upload formats: a ChatGPT export archive or a bare
/// `conversations.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Json,
}

impl ArchiveKind {
    /// Classify a path by its extension (case-insensitive).
    /// Returns `None` for anything the backend would reject.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "zip" => Some(ArchiveKind::Zip),
            "json" => Some(ArchiveKind::Json),
            _ => None,
        }
    }
}

/// One discrete step of the ingestion sequence.
///
/// Transitions are strictly sequential: Idle → Uploading → Parsing → Indexing
/// → Ready, with Failed reachable from any in-flight stage. The only regress
/// is an explicit reset back to Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Idle,
    Uploading,
    Parsing,
    Indexing,
    Ready,
    Failed,
}

impl PipelineStage {
    /// True while a run is in flight and a new `start` must be rejected.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            PipelineStage::Uploading | PipelineStage::Parsing | PipelineStage::Indexing
        )
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Uploading => "uploading",
            PipelineStage::Parsing => "parsing",
            PipelineStage::Indexing => "indexing",
            PipelineStage::Ready => "ready",
            PipelineStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// An uploaded chat archive and where it currently sits in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub id: String,
    pub stage: PipelineStage,
}

/// Role filter for search: restrict hits to one side of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RoleFilter {
    #[default]
    Any,
    User,
    Assistant,
}

impl RoleFilter {
    /// Wire value, or `None` when the filter should be omitted entirely.
    pub fn as_param(self) -> Option<&'static str> {
        match self {
            RoleFilter::Any => None,
            RoleFilter::User => Some("user"),
            RoleFilter::Assistant => Some("assistant"),
        }
    }
}

impl fmt::Display for RoleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param().unwrap_or("any"))
    }
}

/// Code-presence filter. The wire representation is the literal strings
/// `"true"` / `"false"`; `Either` omits the parameter (empty-string filter
/// semantics are undefined server-side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CodeFilter {
    #[default]
    Either,
    True,
    False,
}

impl CodeFilter {
    pub fn as_param(self) -> Option<&'static str> {
        match self {
            CodeFilter::Either => None,
            CodeFilter::True => Some("true"),
            CodeFilter::False => Some("false"),
        }
    }
}

impl fmt::Display for CodeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param().unwrap_or("either"))
    }
}

/// User-chosen search filters, translated into query parameters by
/// [`SearchFilters::query_params`].
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Query text. Must be non-empty to dispatch.
    pub query: String,
    /// Result count cap, clamped to [1, 100]. `None` uses the configured default.
    pub top_k: Option<u32>,
    pub role: RoleFilter,
    pub has_code: CodeFilter,
    /// Only hits on or after this date (YYYY-MM-DD).
    pub after: Option<chrono::NaiveDate>,
    /// Only hits on or before this date (YYYY-MM-DD).
    pub before: Option<chrono::NaiveDate>,
    /// Restrict hits to a single conversation.
    pub conversation: Option<String>,
}

impl SearchFilters {
    pub fn new(query: impl Into<String>) -> Self {
        SearchFilters {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Effective `k`: caller value or default, clamped to the service bounds.
    pub fn effective_top_k(&self, default_top_k: u32) -> u32 {
        self.top_k.unwrap_or(default_top_k).clamp(1, 100)
    }

    /// Build the search query string pairs. Default-valued filters are
    /// omitted — omission means "no filter" server-side.
    pub fn query_params(&self, default_top_k: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.query.clone()),
            ("k", self.effective_top_k(default_top_k).to_string()),
        ];
        if let Some(role) = self.role.as_param() {
            params.push(("role", role.to_string()));
        }
        if let Some(has_code) = self.has_code.as_param() {
            params.push(("has_code", has_code.to_string()));
        }
        if let Some(after) = self.after {
            params.push(("after", after.format("%Y-%m-%d").to_string()));
        }
        if let Some(before) = self.before {
            params.push(("before", before.format("%Y-%m-%d").to_string()));
        }
        if let Some(conv) = &self.conversation {
            params.push(("conv_id", conv.clone()));
        }
        params
    }
}

/// A single search hit as returned by the backend.
///
/// `score` is kept as raw JSON: the backend normally sends a number, but
/// non-numeric values have been observed and must pass through unchanged
/// rather than being coerced to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(rename = "conv_id", default)]
    pub conversation_id: Option<String>,
    #[serde(rename = "msg")]
    pub message_index: i64,
    #[serde(rename = "ts", default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub score: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Canonical, normalized search response. Result order is exactly as
/// received — the backend ranks, the client never re-sorts.
#[derive(Debug, Clone, Serialize)]
pub struct ResultSet {
    pub ok: bool,
    pub results: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultSet {
    /// An error result set that never left the client (local rejection or a
    /// failed request), carrying a user-observable message.
    pub fn rejected(message: impl Into<String>) -> Self {
        ResultSet {
            ok: false,
            results: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// Search response as it arrives off the wire, before normalization.
/// Every field is optional: partial shapes are normalized, not faulted.
#[derive(Debug, Default, Deserialize)]
pub struct RawSearchResponse {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<SearchResult>>,
}

impl RawSearchResponse {
    /// Collapse the raw shape into the [`ResultSet`] guaranteed to callers.
    /// A missing `ok` means success (the backend only sets it explicitly);
    /// a missing `results` array is an empty sequence, not a fault.
    pub fn normalize(self) -> ResultSet {
        ResultSet {
            ok: self.ok.unwrap_or(true),
            results: self.results.unwrap_or_default(),
            error: self.error,
        }
    }
}

/// Receipt for a successful upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    pub dataset_id: String,
    #[serde(default)]
    pub path: Option<String>,
}

/// Counts reported by the parse step. Informational only.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ParseStats {
    pub messages: u64,
    pub conversations: u64,
}

/// Statistics reported by the BM25 index build. Informational only.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IndexStats {
    pub docs: u64,
    pub terms: u64,
    pub avg_len: f64,
}

/// One message of a fetched conversation window.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationMessage {
    #[serde(default)]
    pub msg: Option<i64>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
}

/// A conversation (or a window of it) fetched for context around a hit.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationView {
    pub conv_id: String,
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
}
