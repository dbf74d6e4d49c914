//! The search dispatcher: filters in, normalized result sets out.
//!
//! [`SearchDispatcher::search`] never panics and never returns a transport
//! error: every failure — local rejection, network error, non-2xx status,
//! unparseable body — is folded into a `ResultSet { ok: false, error }` the
//! presenter can render.
//!
//! Searches are not cancelled when superseded. Instead each dispatch carries
//! a sequence token, and a response that arrives after a later-dispatched
//! search has already committed is reported as [`SearchOutcome::Superseded`]
//! so callers never paint stale results over fresh ones.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::client::LexicaClient;
use crate::models::{ResultSet, SearchFilters};

/// Outcome of one dispatched search.
#[derive(Debug)]
pub enum SearchOutcome {
    /// The newest response seen so far; safe to render.
    Fresh(ResultSet),
    /// A later search already committed; discard this one.
    Superseded,
}

impl SearchOutcome {
    /// The result set, unless this outcome was superseded.
    pub fn into_result_set(self) -> Option<ResultSet> {
        match self {
            SearchOutcome::Fresh(set) => Some(set),
            SearchOutcome::Superseded => None,
        }
    }
}

pub struct SearchDispatcher {
    client: LexicaClient,
    default_top_k: u32,
    /// Token handed to the next dispatched search.
    next_seq: AtomicU64,
    /// Highest token whose response has been committed.
    committed: AtomicU64,
}

impl SearchDispatcher {
    pub fn new(client: LexicaClient, default_top_k: u32) -> Self {
        SearchDispatcher {
            client,
            default_top_k,
            next_seq: AtomicU64::new(0),
            committed: AtomicU64::new(0),
        }
    }

    /// Issue one search against a ready dataset.
    ///
    /// Local preconditions — a dataset id and a non-empty query — are
    /// enforced before anything is sent; violations come back as an error
    /// result set, not a request.
    pub async fn search(
        &self,
        dataset_id: Option<&str>,
        filters: &SearchFilters,
    ) -> SearchOutcome {
        let Some(dataset_id) = dataset_id else {
            return SearchOutcome::Fresh(ResultSet::rejected(
                "no dataset is ready — ingest an export first",
            ));
        };
        if filters.query.trim().is_empty() {
            return SearchOutcome::Fresh(ResultSet::rejected("enter a search query"));
        }

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let params = filters.query_params(self.default_top_k);

        let set = match self.client.search(dataset_id, &params).await {
            Ok(raw) => raw.normalize(),
            // Search failures are local to this call; the dataset stays Ready.
            Err(e) => ResultSet::rejected(e.to_string()),
        };

        if self.commit(seq) {
            SearchOutcome::Fresh(set)
        } else {
            debug!(seq, "discarding stale search response");
            SearchOutcome::Superseded
        }
    }

    /// Commit a response token. Returns false when a later-dispatched search
    /// already committed, in which case this response must be discarded.
    fn commit(&self, seq: u64) -> bool {
        let mut current = self.committed.load(Ordering::SeqCst);
        loop {
            if seq <= current {
                return false;
            }
            match self
                .committed
                .compare_exchange(current, seq, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }
}
