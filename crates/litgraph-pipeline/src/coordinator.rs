//! The pipeline coordinator (C5): wires discovery, fetch, analysis, and
//! persistence into a four-stage dataflow joined by bounded queues, with
//! run-control (`start`/`stop`/`status`), checkpointing, and cooperative
//! cancellation (spec §4.5).
//!
//! ```text
//! seeds ─► [Discover] ─Qa─► [Fetch] ─Qb─► [Analyze] ─Qc─► [Persist]
//! ```
//!
//! Discover pops the frontier and, as a side effect, fetches citation/
//! reference edges to expand the frontier further (grounded on
//! `litgraph_discovery::discover_next`); Fetch resolves full paper metadata
//! plus first-page citation contexts; Analyze and Persist are thin wrappers
//! around `litgraph_analyzer::Analyzer` and `litgraph_store::StoreWriter`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use litgraph_analyzer::{Analyzer, CitationContext, ContentExtractor, EdgeLabel, EnrichmentRecord};
use litgraph_common::config::RunConfig;
use litgraph_common::entities::{CitationEdge, Concept, ConceptKind, MentionsEdge, Paper};
use litgraph_common::{CoreError, PaperId};
use litgraph_discovery::{discover_next, Frontier, FrontierItem, FrontierLimits};
use litgraph_providers::model::{CitationRef, Cursor, PaperRecord, SummaryLevel};
use litgraph_providers::retry::RetryObserver;
use litgraph_providers::{AnalysisProvider, MetadataProvider, ProviderError};
use litgraph_store::{GraphStore, PersistOutcome, StoreWriter, VectorStore};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::checkpoint::{self, Checkpoint};
use crate::dedup_index::DuplicateIndex;
use crate::progress::{ProgressEvent, StatusSnapshot};
use crate::state::RunState;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("a run is already active")]
    AlreadyRunning,
}

/// Run-scoped counters backing `status()`, and the observability sink for
/// provider retries (spec §4.1/§4.8: a rate-limit storm that is internally
/// retried and eventually succeeds still shows up in `errors_by_kind`).
/// Shared with the providers passed to [`PipelineCoordinator::new`] so a
/// retry anywhere in the run lands here.
#[derive(Default)]
pub struct RunStats {
    discovered: AtomicUsize,
    fetched: AtomicUsize,
    analyzed: AtomicUsize,
    persisted: AtomicUsize,
    errors_by_kind: std::sync::Mutex<HashMap<String, usize>>,
}

impl RetryObserver for RunStats {
    fn record_retry(&self, _provider: &str, kind: &str) {
        self.record_error(kind);
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&self) {
        self.discovered.store(0, Ordering::SeqCst);
        self.fetched.store(0, Ordering::SeqCst);
        self.analyzed.store(0, Ordering::SeqCst);
        self.persisted.store(0, Ordering::SeqCst);
        *self.errors_by_kind.lock().expect("error map poisoned") = HashMap::new();
    }

    fn record_error(&self, kind: &str) {
        *self.errors_by_kind.lock().expect("error map poisoned").entry(kind.to_string()).or_insert(0) += 1;
    }

    fn errors_snapshot(&self) -> HashMap<String, usize> {
        self.errors_by_kind.lock().expect("error map poisoned").clone()
    }

    fn total_errors(&self) -> usize {
        self.errors_snapshot().values().sum()
    }
}

struct FetchedPaper {
    item: FrontierItem,
    record: PaperRecord,
    /// This paper's own references (outgoing edges), used to build its
    /// citation-context labels.
    references: Vec<CitationRef>,
}

struct AnalyzedPaper {
    fetched: FetchedPaper,
    record: EnrichmentRecord,
}

/// The pipeline coordinator. Generic over the provider and store
/// implementations so production code wires real clients while tests wire
/// stubs (spec §8).
pub struct PipelineCoordinator<M, A, E, G, V> {
    metadata: Arc<M>,
    analysis: Arc<A>,
    extractor: Arc<E>,
    store: Arc<StoreWriter<G, V>>,
    embedding_model_id: String,
    checkpoint_path: PathBuf,
    state: Arc<AsyncMutex<RunState>>,
    cancel: Arc<AsyncMutex<CancellationToken>>,
    stats: Arc<RunStats>,
    started_at: Arc<AsyncMutex<Option<DateTime<Utc>>>>,
    progress_tx: broadcast::Sender<ProgressEvent>,
    run_handle: AsyncMutex<Option<JoinHandle<()>>>,
}

impl<M, A, E, G, V> PipelineCoordinator<M, A, E, G, V>
where
    M: MetadataProvider + 'static,
    A: AnalysisProvider + 'static,
    E: ContentExtractor + 'static,
    G: GraphStore + 'static,
    V: VectorStore + 'static,
{
    /// `stats` is shared with the caller so it can be threaded into the
    /// providers' `with_observer` constructors before this call — retries
    /// issued by `metadata`/`analysis` then land in this coordinator's
    /// `status().errors_by_kind` (spec §4.1/§4.8).
    pub fn new(
        metadata: Arc<M>,
        analysis: Arc<A>,
        extractor: Arc<E>,
        store: Arc<StoreWriter<G, V>>,
        embedding_model_id: String,
        checkpoint_path: PathBuf,
        stats: Arc<RunStats>,
    ) -> Self {
        let (progress_tx, _) = crate::progress::progress_channel();
        Self {
            metadata,
            analysis,
            extractor,
            store,
            embedding_model_id,
            checkpoint_path,
            state: Arc::new(AsyncMutex::new(RunState::Idle)),
            cancel: Arc::new(AsyncMutex::new(CancellationToken::new())),
            stats,
            started_at: Arc::new(AsyncMutex::new(None)),
            progress_tx,
            run_handle: AsyncMutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.progress_tx.subscribe()
    }

    /// Rejects if a run is already active (spec §4.5 `start(config)`).
    #[instrument(skip(self, config))]
    pub async fn start(&self, config: RunConfig) -> Result<(), CoordinatorError> {
        let mut state = self.state.lock().await;
        if !state.can_transition_to(&RunState::Starting) {
            return Err(CoordinatorError::AlreadyRunning);
        }
        *state = RunState::Starting;
        drop(state);

        let cancel = CancellationToken::new();
        *self.cancel.lock().await = cancel.clone();
        *self.started_at.lock().await = Some(Utc::now());
        self.stats.reset();

        let frontier = Arc::new(Frontier::new(FrontierLimits {
            max_depth: config.max_depth,
            max_papers: config.max_papers,
            max_fanout_per_paper: config.max_fanout_per_paper,
        }));

        if config.resume {
            if let Ok(Some(checkpoint)) = checkpoint::load(&self.checkpoint_path).await {
                frontier.mark_visited_from_store(checkpoint.visited);
                frontier.seed_pending(checkpoint.pending);
                info!(pending = frontier.pending_count(), "resumed frontier from checkpoint");
            }
        }
        frontier.seed(config.seeds.iter().cloned().map(PaperId::new));

        *self.state.lock().await = RunState::Running;

        let state = self.state.clone();
        let metadata = self.metadata.clone();
        let analysis = self.analysis.clone();
        let extractor = self.extractor.clone();
        let store = self.store.clone();
        let stats = self.stats.clone();
        let embedding_model_id = self.embedding_model_id.clone();
        let checkpoint_path = self.checkpoint_path.clone();
        let progress_tx = self.progress_tx.clone();

        let run_id = Uuid::new_v4().to_string();

        let handle = tokio::spawn(async move {
            run_dataflow(
                metadata,
                analysis,
                extractor,
                store,
                embedding_model_id,
                config,
                frontier,
                cancel.clone(),
                stats,
                progress_tx,
                checkpoint_path,
                run_id,
            )
            .await;

            let mut state = state.lock().await;
            *state = if cancel.is_cancelled() { RunState::Stopped } else { RunState::Completed };
        });

        *self.run_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Idempotent: calling on an already-stopped run returns success (spec §6).
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<(), CoordinatorError> {
        let state = self.state.lock().await.clone();
        if state.is_terminal() || state == RunState::Idle {
            return Ok(());
        }
        *self.state.lock().await = RunState::Stopping;
        self.cancel.lock().await.cancel();

        let handle = self.run_handle.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        Ok(())
    }

    pub async fn status(&self) -> StatusSnapshot {
        let state = self.state.lock().await.clone();
        let discovered = self.stats.discovered.load(Ordering::SeqCst);
        let fetched = self.stats.fetched.load(Ordering::SeqCst);
        let analyzed = self.stats.analyzed.load(Ordering::SeqCst);
        let persisted = self.stats.persisted.load(Ordering::SeqCst);
        let progress_percentage = if discovered == 0 { 0.0 } else { (persisted as f64 / discovered as f64) * 100.0 };
        StatusSnapshot {
            running: matches!(state, RunState::Starting | RunState::Running | RunState::Stopping),
            discovered,
            fetched,
            analyzed,
            persisted,
            errors_by_kind: self.stats.errors_snapshot(),
            started_at: *self.started_at.lock().await,
            progress_percentage: progress_percentage.min(100.0),
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_dataflow<M, A, E, G, V>(
    metadata: Arc<M>,
    analysis: Arc<A>,
    extractor: Arc<E>,
    store: Arc<StoreWriter<G, V>>,
    embedding_model_id: String,
    config: RunConfig,
    frontier: Arc<Frontier>,
    cancel: CancellationToken,
    stats: Arc<RunStats>,
    progress_tx: broadcast::Sender<ProgressEvent>,
    checkpoint_path: PathBuf,
    run_id: String,
) where
    M: MetadataProvider + 'static,
    A: AnalysisProvider + 'static,
    E: ContentExtractor + 'static,
    G: GraphStore + 'static,
    V: VectorStore + 'static,
{
    let (tx_a, rx_a) = mpsc::channel::<FrontierItem>(config.queue_capacities.qa.max(1));
    let (tx_b, rx_b) = mpsc::channel::<FetchedPaper>(config.queue_capacities.qb.max(1));
    let (tx_c, rx_c) = mpsc::channel::<AnalyzedPaper>(config.queue_capacities.qc.max(1));

    let rx_a = Arc::new(AsyncMutex::new(rx_a));
    let rx_b = Arc::new(AsyncMutex::new(rx_b));
    let rx_c = Arc::new(AsyncMutex::new(rx_c));
    let duplicate_index = Arc::new(DuplicateIndex::new());

    let config_for_checkpoint = config.clone();
    let checkpoint_every_n = config.checkpoint_every_n;

    let mut handles: Vec<JoinHandle<()>> = Vec::new();

    handles.push(tokio::spawn(discover_worker(
        frontier,
        metadata.clone(),
        cancel.clone(),
        tx_a,
        stats.clone(),
        progress_tx.clone(),
        checkpoint_path,
        checkpoint_every_n,
        run_id,
        config_for_checkpoint,
    )));

    for _ in 0..config.stage_worker_counts.fetch.max(1) {
        handles.push(tokio::spawn(fetch_worker(
            metadata.clone(),
            rx_a.clone(),
            tx_b.clone(),
            cancel.clone(),
            stats.clone(),
            config.use_metadata,
        )));
    }
    drop(tx_b);

    for _ in 0..config.stage_worker_counts.analyze.max(1) {
        handles.push(tokio::spawn(analyze_worker(
            analysis.clone(),
            extractor.clone(),
            rx_b.clone(),
            tx_c.clone(),
            cancel.clone(),
            stats.clone(),
            config.analyze_enabled,
            config.embed_enabled,
        )));
    }
    drop(tx_c);

    for _ in 0..config.stage_worker_counts.persist.max(1) {
        handles.push(tokio::spawn(persist_worker(
            store.clone(),
            embedding_model_id.clone(),
            rx_c.clone(),
            stats.clone(),
            progress_tx.clone(),
            duplicate_index.clone(),
        )));
    }

    for handle in handles {
        let _ = handle.await;
    }
}

#[instrument(skip_all)]
#[allow(clippy::too_many_arguments)]
async fn discover_worker<M: MetadataProvider>(
    frontier: Arc<Frontier>,
    metadata: Arc<M>,
    cancel: CancellationToken,
    tx: mpsc::Sender<FrontierItem>,
    stats: Arc<RunStats>,
    progress_tx: broadcast::Sender<ProgressEvent>,
    checkpoint_path: PathBuf,
    checkpoint_every_n: usize,
    run_id: String,
    run_config: RunConfig,
) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        match discover_next(&frontier, metadata.as_ref(), &cancel).await {
            Ok(Some(outcome)) => {
                let discovered = stats.discovered.fetch_add(1, Ordering::SeqCst) + 1;
                let _ = progress_tx.send(ProgressEvent::new("discover", format!("discovered {}", outcome.item.id)));

                if checkpoint_every_n > 0 && discovered % checkpoint_every_n == 0 {
                    let checkpoint = Checkpoint::new(
                        run_id.clone(),
                        run_config.clone(),
                        frontier.visited_snapshot(),
                        frontier.pending_snapshot().into_iter().map(|i| (i.id, i.depth)).collect(),
                        stats.persisted.load(Ordering::SeqCst),
                        stats.total_errors(),
                        Utc::now(),
                    );
                    if let Err(e) = checkpoint::save(&checkpoint_path, &checkpoint).await {
                        warn!(error = %e, "failed to write checkpoint");
                    }
                }

                if tx.send(outcome.item).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                // Frontier momentarily empty; downstream stages may still
                // enqueue more work indirectly, but with nothing pending
                // and nothing in flight there is nothing left to discover.
                if frontier.pending_count() == 0 {
                    break;
                }
            }
            Err(e) => {
                stats.record_error(e.kind_tag());
                warn!(error = %e, "discover step failed");
            }
        }
    }
}

async fn fetch_worker<M: MetadataProvider>(
    metadata: Arc<M>,
    rx: Arc<AsyncMutex<mpsc::Receiver<FrontierItem>>>,
    tx: mpsc::Sender<FetchedPaper>,
    cancel: CancellationToken,
    stats: Arc<RunStats>,
    use_metadata: bool,
) {
    if !use_metadata {
        return;
    }
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let item = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(item) = item else { break };

        let record = match metadata.get_paper(&item.id, &cancel).await {
            Ok(record) => record,
            Err(e) => {
                stats.record_error(e.kind_tag());
                warn!(id = item.id.as_str(), error = %e, "fetch failed");
                continue;
            }
        };

        // Outgoing edges (this paper's own references), not incoming
        // citations — `edge_labels_to_citation_edges` builds `src=this,
        // dst=other` below, so `other` must be something `this` cites.
        let references = match metadata.get_references(&item.id, Cursor(None), &cancel).await {
            Ok(page) => page.items,
            Err(ProviderError::NotFound) => Vec::new(),
            Err(e) => {
                stats.record_error(e.kind_tag());
                Vec::new()
            }
        };

        stats.fetched.fetch_add(1, Ordering::SeqCst);
        if tx.send(FetchedPaper { item, record, references }).await.is_err() {
            break;
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn analyze_worker<A: AnalysisProvider, E: ContentExtractor>(
    analysis: Arc<A>,
    extractor: Arc<E>,
    rx: Arc<AsyncMutex<mpsc::Receiver<FetchedPaper>>>,
    tx: mpsc::Sender<AnalyzedPaper>,
    cancel: CancellationToken,
    stats: Arc<RunStats>,
    analyze_enabled: bool,
    embed_enabled: bool,
) {
    let analyzer = Analyzer::new(analysis.as_ref(), extractor.as_ref(), SummaryLevel::Standard);
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let fetched = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(fetched) = fetched else { break };

        let record = if analyze_enabled {
            let contexts: Vec<CitationContext> = fetched
                .references
                .iter()
                .map(|c| CitationContext { other_id: c.other_id.clone(), text: c.context.clone().unwrap_or_default() })
                .collect();
            let mut record = analyzer.analyze(&fetched.record, &contexts, None, &cancel).await;
            if !embed_enabled {
                record.embedding = None;
            }
            record
        } else {
            EnrichmentRecord { paper_id: Some(fetched.record.id.clone()), ..Default::default() }
        };

        stats.analyzed.fetch_add(1, Ordering::SeqCst);
        if tx.send(AnalyzedPaper { fetched, record }).await.is_err() {
            break;
        }
    }
}

async fn persist_worker<G: GraphStore, V: VectorStore>(
    store: Arc<StoreWriter<G, V>>,
    embedding_model_id: String,
    rx: Arc<AsyncMutex<mpsc::Receiver<AnalyzedPaper>>>,
    stats: Arc<RunStats>,
    progress_tx: broadcast::Sender<ProgressEvent>,
    duplicate_index: Arc<DuplicateIndex>,
) {
    loop {
        let analyzed = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(analyzed) = analyzed else { break };

        let paper_id = analyzed.fetched.record.id.clone();
        let duplicate_of = analyzed
            .fetched
            .record
            .abstract_text
            .as_deref()
            .and_then(|text| duplicate_index.check_and_insert(&paper_id, text));
        let paper = paper_record_to_entity(&analyzed.fetched.record, &analyzed.record, duplicate_of);
        let edges = edge_labels_to_citation_edges(&paper_id, &analyzed.record.edge_labels);
        let (concepts, mentions) = concepts_to_graph_entities(&paper_id, &analyzed.record);
        let embedding = analyzed.record.embedding.clone().map(|v| (v, embedding_model_id.clone()));

        match store.persist_paper(&paper, &edges, &concepts, &mentions, embedding).await {
            Ok(outcome) => {
                stats.persisted.fetch_add(1, Ordering::SeqCst);
                let note = match outcome {
                    PersistOutcome::Complete => "persisted",
                    PersistOutcome::GraphOnlyNoEmbedding => "persisted (no embedding)",
                    PersistOutcome::GraphPersistedEmbeddingMissing => "persisted (embedding write failed)",
                };
                let _ = progress_tx.send(ProgressEvent::new("persist", format!("{paper_id} {note}")));
            }
            Err(e) => {
                stats.record_error(core_error_kind(&e));
                warn!(paper_id = paper_id.as_str(), error = %e, "persist failed");
            }
        }
    }
}

fn paper_record_to_entity(record: &PaperRecord, enrichment: &EnrichmentRecord, duplicate_of: Option<PaperId>) -> Paper {
    Paper {
        id: Some(record.id.clone()),
        title: record.title.clone(),
        abstract_text: record.abstract_text.clone(),
        authors: record.authors.clone(),
        categories: record.categories.clone(),
        published_date: record.published_date,
        citation_count: record.citation_count,
        tl_dr: None,
        summary: enrichment.summary.clone(),
        embedding: enrichment.embedding.clone(),
        duplicate_of,
    }
}

fn edge_labels_to_citation_edges(paper_id: &PaperId, labels: &[EdgeLabel]) -> Vec<CitationEdge> {
    labels
        .iter()
        .map(|l| CitationEdge { src: paper_id.clone(), dst: l.other_id.clone(), intent: l.intent, position: l.position, context: None })
        .collect()
}

fn concepts_to_graph_entities(paper_id: &PaperId, enrichment: &EnrichmentRecord) -> (Vec<Concept>, Vec<MentionsEdge>) {
    let mut concepts = Vec::with_capacity(enrichment.concepts.len());
    let mut mentions = Vec::with_capacity(enrichment.concepts.len());
    for c in &enrichment.concepts {
        let kind = concept_kind_from_str(&c.kind);
        concepts.push(Concept { name: c.name.clone(), kind, embedding: None });
        mentions.push(MentionsEdge { paper: paper_id.clone(), concept_name: c.name.clone(), concept_kind: kind, confidence: c.confidence });
    }
    (concepts, mentions)
}

fn concept_kind_from_str(s: &str) -> ConceptKind {
    match s.to_lowercase().as_str() {
        "method" => ConceptKind::Method,
        "theorem" => ConceptKind::Theorem,
        "dataset" => ConceptKind::Dataset,
        "equation" => ConceptKind::Equation,
        "constant" => ConceptKind::Constant,
        "conjecture" => ConceptKind::Conjecture,
        _ => ConceptKind::Other,
    }
}

fn core_error_kind(e: &CoreError) -> &'static str {
    match e {
        CoreError::Database(_) => "database",
        CoreError::Http(_) => "http",
        CoreError::Serialization(_) => "serialization",
        CoreError::NotFound(_) => "not_found",
        CoreError::InvalidId(_) => "invalid_id",
        CoreError::StoreBusy => "store_busy",
        CoreError::SchemaMismatch(_) => "schema_mismatch",
        CoreError::Config(_) => "config",
        CoreError::Cancelled => "cancelled",
        CoreError::Other(_) => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use litgraph_common::config::{QueueCapacities, StageWorkerCounts};
    use litgraph_providers::testing::{StubAnalysisProvider, StubMetadataProvider, StubOutcome};
    use litgraph_store::{EmbeddedPaper, VectorMatch};
    use std::collections::HashMap as StdHashMap;
    use std::sync::Mutex as StdMutex;

    struct StubGraphStore {
        papers: StdMutex<StdHashMap<PaperId, Paper>>,
    }

    impl StubGraphStore {
        fn new() -> Self {
            Self { papers: StdMutex::new(StdHashMap::new()) }
        }
    }

    #[async_trait]
    impl GraphStore for StubGraphStore {
        async fn upsert_paper(&self, paper: &Paper) -> litgraph_common::Result<()> {
            let id = paper.id.clone().ok_or_else(|| CoreError::InvalidId("no id".to_string()))?;
            self.papers.lock().unwrap().insert(id, paper.clone());
            Ok(())
        }
        async fn get_paper(&self, id: &PaperId) -> litgraph_common::Result<Option<Paper>> {
            Ok(self.papers.lock().unwrap().get(id).cloned())
        }
        async fn upsert_citation_edge(&self, _edge: &CitationEdge) -> litgraph_common::Result<()> {
            Ok(())
        }
        async fn upsert_concept(&self, _concept: &Concept) -> litgraph_common::Result<()> {
            Ok(())
        }
        async fn upsert_mention(&self, _mention: &MentionsEdge) -> litgraph_common::Result<()> {
            Ok(())
        }
        async fn citation_neighborhood(&self, _id: &PaperId, _depth: u32, _limit: usize) -> litgraph_common::Result<Vec<PaperId>> {
            Ok(vec![])
        }
        async fn export_edges(&self) -> litgraph_common::Result<Vec<(PaperId, PaperId)>> {
            Ok(vec![])
        }
        async fn list_papers(&self, _offset: i64, _limit: i64, _category: Option<&str>) -> litgraph_common::Result<(Vec<Paper>, i64)> {
            Ok((vec![], 0))
        }
        async fn outgoing_citations(&self, _id: &PaperId) -> litgraph_common::Result<Vec<PaperId>> {
            Ok(vec![])
        }
        async fn incoming_citations(&self, _id: &PaperId) -> litgraph_common::Result<Vec<PaperId>> {
            Ok(vec![])
        }
    }

    struct StubVectorStore {
        stored: StdMutex<StdHashMap<PaperId, EmbeddedPaper>>,
    }

    impl StubVectorStore {
        fn new() -> Self {
            Self { stored: StdMutex::new(StdHashMap::new()) }
        }
    }

    #[async_trait]
    impl VectorStore for StubVectorStore {
        async fn upsert(&self, paper: &EmbeddedPaper) -> litgraph_common::Result<()> {
            self.stored.lock().unwrap().insert(paper.id.clone(), paper.clone());
            Ok(())
        }
        async fn embedding_model_id(&self, id: &PaperId) -> litgraph_common::Result<Option<String>> {
            Ok(self.stored.lock().unwrap().get(id).map(|p| p.embedding_model_id.clone()))
        }
        async fn query(&self, _query: &[f32], _k: usize, _filter: Option<&str>) -> litgraph_common::Result<Vec<VectorMatch>> {
            Ok(vec![])
        }
    }

    fn test_config(seeds: Vec<String>) -> RunConfig {
        RunConfig {
            seeds,
            max_depth: 2,
            max_papers: None,
            max_fanout_per_paper: 20,
            analyze_enabled: true,
            embed_enabled: true,
            use_metadata: true,
            use_full_text: false,
            stage_worker_counts: StageWorkerCounts { discover: 1, fetch: 1, analyze: 1, persist: 1 },
            queue_capacities: QueueCapacities { qa: 8, qb: 8, qc: 8 },
            checkpoint_every_n: 500,
            resume: false,
        }
    }

    fn coordinator_for_test(
        tmp_checkpoint: &std::path::Path,
    ) -> PipelineCoordinator<StubMetadataProvider, StubAnalysisProvider, litgraph_analyzer::AbstractOnlyExtractor, StubGraphStore, StubVectorStore>
    {
        let metadata = StubMetadataProvider::new().with_paper(PaperRecord {
            id: PaperId::new("a"),
            title: "A".to_string(),
            abstract_text: Some("an abstract about gravity".to_string()),
            authors: vec![],
            categories: vec!["gr-qc".to_string()],
            published_date: None,
            citation_count: Some(3),
        });
        let analysis = StubAnalysisProvider::new(StubOutcome::Summary("summary".to_string()));
        let store = StoreWriter::new(StubGraphStore::new(), StubVectorStore::new());
        PipelineCoordinator::new(
            Arc::new(metadata),
            Arc::new(analysis),
            Arc::new(litgraph_analyzer::AbstractOnlyExtractor),
            Arc::new(store),
            "test-model-v1".to_string(),
            tmp_checkpoint.to_path_buf(),
            Arc::new(RunStats::default()),
        )
    }

    #[tokio::test]
    async fn idle_status_reports_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator_for_test(&dir.path().join("checkpoint.json"));
        let status = coordinator.status().await;
        assert!(!status.running);
        assert_eq!(status.persisted, 0);
    }

    #[tokio::test]
    async fn start_processes_seed_through_to_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator_for_test(&dir.path().join("checkpoint.json"));
        coordinator.start(test_config(vec!["a".to_string()])).await.unwrap();

        for _ in 0..50 {
            if coordinator.status().await.persisted >= 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        let status = coordinator.status().await;
        assert_eq!(status.persisted, 1);
        assert_eq!(status.discovered, 1);
    }

    #[tokio::test]
    async fn start_twice_while_running_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator_for_test(&dir.path().join("checkpoint.json"));
        coordinator.start(test_config(vec!["a".to_string()])).await.unwrap();
        let second = coordinator.start(test_config(vec!["a".to_string()])).await;
        assert_eq!(second, Err(CoordinatorError::AlreadyRunning));
        coordinator.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_on_idle_run_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator_for_test(&dir.path().join("checkpoint.json"));
        assert!(coordinator.stop().await.is_ok());
    }
}
