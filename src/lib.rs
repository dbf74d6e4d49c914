//! # Lexica Client
//!
//! Client-side ingestion and search pipeline for Lexica chat-archive
//! datasets.
//!
//! The Lexica backend parses uploaded chat exports and serves BM25 search
//! over them. This crate is the client half: it drives an export through the
//! backend's ingestion sequence, dispatches validated search queries, and
//! turns the responses into display-ready models.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌──────────────┐
//! │ IntakeHandle │──▶│ Ingestion      │──▶│ dataset id    │
//! │ (file drop)  │   │ Pipeline       │   │ (Ready)       │
//! └──────────────┘   │ upload→parse→  │   └──────┬───────┘
//!                    │ index→ready    │          │
//!                    └────────────────┘          ▼
//!                                        ┌──────────────┐   ┌───────────┐
//!                                        │ Search       │──▶│ Result    │
//!                                        │ Dispatcher   │   │ Presenter │
//!                                        └──────────────┘   └───────────┘
//! ```
//!
//! Data flows one way: the pipeline produces a ready dataset id, the
//! dispatcher consumes it plus the user's filters and yields a normalized
//! [`models::ResultSet`], and [`present::present`] renders that without any
//! state of its own.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration (backend address, timeout, search defaults) |
//! | [`error`] | Error taxonomy: validation, transport, server, malformed response |
//! | [`models`] | Core data types and wire shapes |
//! | [`client`] | HTTP client for the backend endpoints |
//! | [`pipeline`] | Ingestion state machine with generation-token guards |
//! | [`progress`] | Progress reporter trait and stderr/JSON reporters |
//! | [`search`] | Search dispatcher with stale-response guarding |
//! | [`present`] | Pure result-set presentation |
//! | [`intake`] | Scoped file-intake capability |

pub mod client;
pub mod config;
pub mod error;
pub mod intake;
pub mod models;
pub mod pipeline;
pub mod present;
pub mod progress;
pub mod search;

pub use client::LexicaClient;
pub use error::{ClientError, IngestError};
pub use models::{
    ArchiveKind, CodeFilter, Dataset, PipelineStage, ResultSet, RoleFilter, SearchFilters,
    SearchResult,
};
pub use pipeline::IngestionPipeline;
pub use present::{present, DisplayModel, DisplayRow};
pub use search::{SearchDispatcher, SearchOutcome};
