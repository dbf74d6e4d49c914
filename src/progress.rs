//! Ingestion progress reporting.
//!
//! The pipeline emits a stream of [`IngestEvent`]s (stage changes, upload
//! percentage, per-stage statistics, and a terminal ready/failed event) so
//! users can see where their upload is. Progress is emitted on **stderr** so
//! stdout remains parseable for scripts.

use std::io::Write;
use std::sync::Arc;

use crate::models::PipelineStage;

/// A single progress event for one pipeline run.
#[derive(Clone, Debug)]
pub enum IngestEvent {
    /// The pipeline entered a new stage.
    Stage(PipelineStage),
    /// Upload percentage in [0, 100], non-decreasing within one upload.
    UploadProgress { percent: u8 },
    /// Parse finished; counts are informational.
    Parsed { messages: u64, conversations: u64 },
    /// Index build finished; statistics are informational.
    Indexed { docs: u64, terms: u64, avg_len: f64 },
    /// Terminal: the dataset is searchable under this id.
    Ready { dataset_id: String },
    /// Terminal: the run stopped at the named failure.
    Failed { message: String },
}

/// Reports ingestion progress. Implementations write to stderr (human or JSON).
pub trait IngestReporter: Send + Sync {
    /// Emit a progress event. Called from the ingestion pipeline.
    fn report(&self, event: IngestEvent);
}

/// Human-friendly progress on stderr: "ingest  uploading  42%".
pub struct StderrReporter;

impl IngestReporter for StderrReporter {
    fn report(&self, event: IngestEvent) {
        let line = match &event {
            IngestEvent::Stage(stage) => format!("ingest  {}...\n", stage),
            IngestEvent::UploadProgress { percent } => {
                format!("ingest  uploading  {}%\n", percent)
            }
            IngestEvent::Parsed {
                messages,
                conversations,
            } => format!(
                "ingest  parsed  {} messages in {} conversations\n",
                format_number(*messages),
                format_number(*conversations)
            ),
            IngestEvent::Indexed {
                docs,
                terms,
                avg_len,
            } => format!(
                "ingest  indexed  {} docs, {} terms, avg len {:.2}\n",
                format_number(*docs),
                format_number(*terms),
                avg_len
            ),
            IngestEvent::Ready { dataset_id } => {
                format!("ingest  ready  dataset {}\n", dataset_id)
            }
            IngestEvent::Failed { message } => format!("ingest  failed  {}\n", message),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonReporter;

impl IngestReporter for JsonReporter {
    fn report(&self, event: IngestEvent) {
        let obj = match &event {
            IngestEvent::Stage(stage) => serde_json::json!({
                "event": "stage",
                "stage": stage.to_string(),
            }),
            IngestEvent::UploadProgress { percent } => serde_json::json!({
                "event": "upload_progress",
                "percent": percent,
            }),
            IngestEvent::Parsed {
                messages,
                conversations,
            } => serde_json::json!({
                "event": "parsed",
                "messages": messages,
                "conversations": conversations,
            }),
            IngestEvent::Indexed {
                docs,
                terms,
                avg_len,
            } => serde_json::json!({
                "event": "indexed",
                "docs": docs,
                "terms": terms,
                "avg_len": avg_len,
            }),
            IngestEvent::Ready { dataset_id } => serde_json::json!({
                "event": "ready",
                "dataset_id": dataset_id,
            }),
            IngestEvent::Failed { message } => serde_json::json!({
                "event": "failed",
                "error": message,
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoReporter;

impl IngestReporter for NoReporter {
    fn report(&self, _event: IngestEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. The pipeline shares it across the
    /// upload body stream, hence `Arc`.
    pub fn reporter(&self) -> Arc<dyn IngestReporter> {
        match self {
            ProgressMode::Off => Arc::new(NoReporter),
            ProgressMode::Human => Arc::new(StderrReporter),
            ProgressMode::Json => Arc::new(JsonReporter),
        }
    }
}
