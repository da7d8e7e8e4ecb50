//! Helpdesk facade: the operations an outer HTTP or CLI layer exposes.
//!
//! `Helpdesk` owns the active searcher behind a [`SearcherHandle`], the
//! feedback log and the settings it was opened with. Queries take a snapshot
//! of the current searcher, so a concurrent [`Helpdesk::reindex`] never
//! disturbs a query in flight.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use helpdesk_core::config::Settings;
use helpdesk_core::data_processor::DataProcessor;
use helpdesk_core::error::{Error, Result};
use helpdesk_core::traits::Embedder;
use helpdesk_core::types::SearchHit;
use helpdesk_embed::get_default_embedder;
use helpdesk_eval::{observed_rank, stamped_record, FeedbackStore, MetricsReport};
use helpdesk_vector::{persist, BuildOptions, Index, PersistOptions, PersistReport, Searcher, SearcherHandle};

/// Longest answer returned by [`Helpdesk::ask`], in characters.
pub const MAX_ANSWER_CHARS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub contexts: Vec<SearchHit>,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    pub rank: Option<i64>,
    pub hit_at_k: bool,
    pub saved: bool,
}

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub persisted: PersistReport,
}

/// Load `paths.raw_dir`, build the index and persist it to `paths.index_dir`.
pub async fn ingest(settings: &Settings, embedder: Arc<dyn Embedder>, show_progress: bool) -> Result<IngestReport> {
    let raw_dir = settings.paths.raw_dir();
    let documents = DataProcessor::new(settings.chunking).load_documents(&raw_dir)?;
    let doc_count = documents.len();
    let options = BuildOptions { show_progress, ..BuildOptions::from_settings(settings) };
    let index = tokio::task::spawn_blocking(move || Index::build(&documents, embedder.as_ref(), &options))
        .await
        .map_err(|e| Error::Operation(format!("index build task failed: {}", e)))??;
    let persisted = persist(&index, &settings.paths.index_dir(), &PersistOptions::from_settings(settings)).await?;
    info!(documents = doc_count, chunks = index.len(), "ingest complete");
    Ok(IngestReport { documents: doc_count, chunks: index.len(), persisted })
}

/// Metrics over the feedback log at `path`; needs no loaded index.
pub fn metrics_report(path: &Path, k: usize) -> Result<MetricsReport> {
    if k < 1 { return Err(Error::InvalidArgument(format!("k must be at least 1, got {}", k))); }
    let scan = FeedbackStore::new(path).scan()?;
    Ok(MetricsReport::from_scan(&scan, k))
}

pub struct Helpdesk {
    settings: Settings,
    embedder: Arc<dyn Embedder>,
    searcher: SearcherHandle,
    feedback: FeedbackStore,
    reindex_lock: Mutex<()>,
}

impl Helpdesk {
    /// Open with the embedder selected by `settings.embedder`.
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let embedder = get_default_embedder(&settings.embedder).map_err(Error::Embedding)?;
        Self::open(settings, embedder).await
    }

    /// Load the persisted index from `paths.index_dir`.
    pub async fn open(settings: Settings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        settings.validate()?;
        let searcher = Searcher::load(&settings.paths.index_dir(), Arc::clone(&embedder)).await?;
        Ok(Self::assemble(settings, embedder, searcher))
    }

    /// Serve from an already constructed searcher.
    pub fn with_searcher(settings: Settings, searcher: Searcher) -> Self {
        let embedder = Arc::clone(searcher.embedder());
        Self::assemble(settings, embedder, searcher)
    }

    fn assemble(settings: Settings, embedder: Arc<dyn Embedder>, searcher: Searcher) -> Self {
        let feedback = FeedbackStore::new(settings.paths.feedback_path());
        Self { settings, embedder, searcher: SearcherHandle::new(searcher), feedback, reindex_lock: Mutex::new(()) }
    }

    pub fn settings(&self) -> &Settings { &self.settings }
    pub fn searcher(&self) -> Arc<Searcher> { self.searcher.current() }
    pub fn files(&self) -> Vec<String> { self.searcher.current().files() }

    fn check_k(&self, k: usize) -> Result<()> {
        let max_k = self.settings.search.max_k;
        if k < 1 || k > max_k {
            return Err(Error::InvalidArgument(format!("k must be between 1 and {}, got {}", max_k, k)));
        }
        Ok(())
    }

    pub async fn ask(&self, question: &str, k: usize) -> Result<Answer> {
        self.check_k(k)?;
        let started = Instant::now();
        let contexts = self.searcher.current().search(question, k).await?;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let joined = contexts.iter().map(|h| h.text.as_str()).collect::<Vec<_>>().join(" ");
        let answer = joined.chars().take(MAX_ANSWER_CHARS).collect();
        Ok(Answer { answer, contexts, latency_ms })
    }

    /// Search `question` and record where `answer_file` ranked.
    pub async fn feedback(&self, question: &str, answer_file: &str, k: usize, persist: bool) -> Result<FeedbackOutcome> {
        self.check_k(k)?;
        let hits = self.searcher.current().search(question, k).await?;
        let rank = observed_rank(&hits, answer_file);
        if persist {
            self.feedback.append(&stamped_record(question, answer_file, k, rank))?;
        }
        let hit_at_k = rank.is_some_and(|r| usize::try_from(r).is_ok_and(|r| r <= k));
        Ok(FeedbackOutcome { rank, hit_at_k, saved: persist })
    }

    pub fn metrics(&self, k: usize) -> Result<MetricsReport> {
        metrics_report(self.feedback.path(), k)
    }

    /// Rebuild from `paths.raw_dir` and swap the fresh searcher in.
    ///
    /// Calls are serialized. On failure the previous index and searcher stay active.
    pub async fn reindex(&self) -> Result<IngestReport> {
        let _guard = self.reindex_lock.lock().await;
        let report = match ingest(&self.settings, Arc::clone(&self.embedder), false).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "reindex failed; keeping the current index");
                return Err(e);
            }
        };
        let searcher = Searcher::load(&report.persisted.location, Arc::clone(&self.embedder)).await?;
        self.searcher.replace(searcher);
        info!(chunks = report.chunks, "searcher reloaded");
        Ok(report)
    }
}
