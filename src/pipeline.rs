//! The ingestion pipeline: upload → parse → index → ready.
//!
//! One [`IngestionPipeline`] drives one dataset at a time through the
//! backend's three ingestion calls, strictly in sequence and fail-fast. The
//! pipeline owns the dataset id and stage for the lifetime of the run;
//! everything else only reads them.
//!
//! Every run carries a generation token. `reset` (which does not cancel an
//! in-flight request) bumps the generation, so a late response from an
//! abandoned run is dropped instead of overwriting newer state.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::client::LexicaClient;
use crate::error::{ClientError, IngestError};
use crate::models::{ArchiveKind, Dataset, PipelineStage};
use crate::progress::{IngestEvent, IngestReporter};

#[derive(Debug, Clone)]
struct PipelineState {
    stage: PipelineStage,
    dataset_id: Option<String>,
    progress: u8,
    generation: u64,
    error: Option<String>,
}

impl PipelineState {
    fn new() -> Self {
        PipelineState {
            stage: PipelineStage::Idle,
            dataset_id: None,
            progress: 0,
            generation: 0,
            error: None,
        }
    }
}

pub struct IngestionPipeline {
    client: LexicaClient,
    state: Arc<Mutex<PipelineState>>,
}

impl IngestionPipeline {
    pub fn new(client: LexicaClient) -> Self {
        IngestionPipeline {
            client,
            state: Arc::new(Mutex::new(PipelineState::new())),
        }
    }

    /// Drive one export file through upload, parse, and index build.
    ///
    /// Returns the dataset id once the dataset is searchable — this is the
    /// sole completion signal; no earlier stage implies searchability.
    /// Progress and terminal events are emitted through `reporter`.
    ///
    /// Preconditions: the file must be a `.zip` or `.json` (rejected with a
    /// validation error before any network call, without touching the
    /// stage), and no other run may be in flight (`Busy`).
    pub async fn start(
        &self,
        path: &Path,
        reporter: Arc<dyn IngestReporter>,
    ) -> Result<String, IngestError> {
        if ArchiveKind::from_path(path).is_none() {
            return Err(ClientError::Validation(format!(
                "unsupported file '{}': upload a ChatGPT export .zip or conversations.json",
                path.display()
            ))
            .into());
        }

        let generation = self.begin()?;
        info!(file = %path.display(), "ingestion started");
        reporter.report(IngestEvent::Stage(PipelineStage::Uploading));

        // Upload. The progress callback runs inside the request body stream,
        // so it re-checks the generation before touching state.
        let progress_state = Arc::clone(&self.state);
        let progress_reporter = Arc::clone(&reporter);
        let on_progress = Arc::new(move |percent: u8| {
            let mut s = progress_state.lock();
            if s.generation != generation || s.stage != PipelineStage::Uploading {
                return;
            }
            if percent > s.progress {
                s.progress = percent;
                progress_reporter.report(IngestEvent::UploadProgress { percent });
            }
        });

        let receipt = match self.client.upload(path, on_progress).await {
            Ok(receipt) => receipt,
            Err(e) => return self.fail(generation, &reporter, e),
        };
        let dataset_id = receipt.dataset_id;

        if !self.advance(generation, |s| {
            s.dataset_id = Some(dataset_id.clone());
            s.stage = PipelineStage::Parsing;
        }) {
            return Err(IngestError::Superseded);
        }
        info!(dataset_id = %dataset_id, "upload complete");
        reporter.report(IngestEvent::Stage(PipelineStage::Parsing));

        let parse_stats = match self.client.parse(&dataset_id).await {
            Ok(stats) => stats,
            Err(e) => return self.fail(generation, &reporter, e),
        };
        reporter.report(IngestEvent::Parsed {
            messages: parse_stats.messages,
            conversations: parse_stats.conversations,
        });

        if !self.advance(generation, |s| s.stage = PipelineStage::Indexing) {
            return Err(IngestError::Superseded);
        }
        info!(
            dataset_id = %dataset_id,
            messages = parse_stats.messages,
            conversations = parse_stats.conversations,
            "parse complete"
        );
        reporter.report(IngestEvent::Stage(PipelineStage::Indexing));

        let index_stats = match self.client.build_index(&dataset_id).await {
            Ok(stats) => stats,
            Err(e) => return self.fail(generation, &reporter, e),
        };
        reporter.report(IngestEvent::Indexed {
            docs: index_stats.docs,
            terms: index_stats.terms,
            avg_len: index_stats.avg_len,
        });

        if !self.advance(generation, |s| s.stage = PipelineStage::Ready) {
            return Err(IngestError::Superseded);
        }
        info!(dataset_id = %dataset_id, docs = index_stats.docs, "dataset ready");
        reporter.report(IngestEvent::Stage(PipelineStage::Ready));
        reporter.report(IngestEvent::Ready {
            dataset_id: dataset_id.clone(),
        });

        Ok(dataset_id)
    }

    /// Return the pipeline to `Idle`, clearing progress, dataset id, and the
    /// recorded error. Permitted from any stage; an in-flight request is not
    /// cancelled, but its late response will be dropped.
    pub fn reset(&self) {
        let mut s = self.state.lock();
        s.generation += 1;
        s.stage = PipelineStage::Idle;
        s.dataset_id = None;
        s.progress = 0;
        s.error = None;
        info!("pipeline reset");
    }

    pub fn stage(&self) -> PipelineStage {
        self.state.lock().stage
    }

    pub fn dataset_id(&self) -> Option<String> {
        self.state.lock().dataset_id.clone()
    }

    /// The active dataset, once an upload has assigned an id.
    pub fn dataset(&self) -> Option<Dataset> {
        let s = self.state.lock();
        s.dataset_id.as_ref().map(|id| Dataset {
            id: id.clone(),
            stage: s.stage,
        })
    }

    /// Dataset id only when the pipeline has reached `Ready` — the value the
    /// search dispatcher requires.
    pub fn ready_dataset(&self) -> Option<String> {
        let s = self.state.lock();
        if s.stage == PipelineStage::Ready {
            s.dataset_id.clone()
        } else {
            None
        }
    }

    /// Upload percentage of the current (or last) run.
    pub fn progress(&self) -> u8 {
        self.state.lock().progress
    }

    /// Message of the failure that put the pipeline into `Failed`, if any.
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    /// Claim the pipeline for a new run, or reject if one is in flight.
    fn begin(&self) -> Result<u64, IngestError> {
        let mut s = self.state.lock();
        if s.stage.is_active() {
            return Err(IngestError::Busy);
        }
        s.generation += 1;
        s.stage = PipelineStage::Uploading;
        s.dataset_id = None;
        s.progress = 0;
        s.error = None;
        Ok(s.generation)
    }

    /// Apply a state change if this run is still the current generation.
    fn advance(&self, generation: u64, apply: impl FnOnce(&mut PipelineState)) -> bool {
        let mut s = self.state.lock();
        if s.generation != generation {
            return false;
        }
        apply(&mut s);
        true
    }

    /// Record a terminal failure. If the run was superseded in the meantime,
    /// the failure is dropped silently and not reported.
    fn fail(
        &self,
        generation: u64,
        reporter: &Arc<dyn IngestReporter>,
        error: ClientError,
    ) -> Result<String, IngestError> {
        let message = error.to_string();
        if self.advance(generation, |s| {
            s.stage = PipelineStage::Failed;
            s.error = Some(message.clone());
        }) {
            info!(error = %message, "ingestion failed");
            reporter.report(IngestEvent::Stage(PipelineStage::Failed));
            reporter.report(IngestEvent::Failed { message });
            Err(error.into())
        } else {
            Err(IngestError::Superseded)
        }
    }
}
