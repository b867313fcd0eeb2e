//! Primary/fallback provider selection with a rolling budget window.
//!
//! When the primary analysis provider's failure rate exceeds a threshold
//! within `budget_window`, calls are routed to the fallback provider for the
//! remainder of that window. This bounds the cost of a flaky primary without
//! needing an external circuit-breaker crate.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::ProviderError;
use crate::model::{CitationClassification, ConceptRecord, SummaryLevel};
use crate::traits::AnalysisProvider;

pub struct FallbackAnalysisProvider<P, F> {
    primary: P,
    fallback: F,
    budget_window: Duration,
    failure_threshold: u32,
    window_start: Mutex<Instant>,
    failures: AtomicU32,
    window_epoch: AtomicU64,
}

impl<P, F> FallbackAnalysisProvider<P, F>
where
    P: AnalysisProvider,
    F: AnalysisProvider,
{
    pub fn new(primary: P, fallback: F, budget_window: Duration, failure_threshold: u32) -> Self {
        Self {
            primary,
            fallback,
            budget_window,
            failure_threshold,
            window_start: Mutex::new(Instant::now()),
            failures: AtomicU32::new(0),
            window_epoch: AtomicU64::new(0),
        }
    }

    fn roll_window_if_expired(&self) {
        let mut start = self.window_start.lock().expect("budget window mutex poisoned");
        if start.elapsed() >= self.budget_window {
            *start = Instant::now();
            self.failures.store(0, Ordering::SeqCst);
            self.window_epoch.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn primary_tripped(&self) -> bool {
        self.roll_window_if_expired();
        self.failures.load(Ordering::SeqCst) >= self.failure_threshold
    }

    fn record_primary_failure(&self) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    async fn run<T, FutP, FutF>(
        &self,
        op_name: &str,
        primary_call: impl FnOnce() -> FutP,
        fallback_call: impl FnOnce() -> FutF,
    ) -> Result<T, ProviderError>
    where
        FutP: std::future::Future<Output = Result<T, ProviderError>>,
        FutF: std::future::Future<Output = Result<T, ProviderError>>,
    {
        if self.primary_tripped() {
            warn!(op_name, "primary analysis provider over budget, routing to fallback");
            return fallback_call().await;
        }
        match primary_call().await {
            Ok(v) => Ok(v),
            Err(e) if e.is_retryable() => {
                self.record_primary_failure();
                fallback_call().await
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<P, F> AnalysisProvider for FallbackAnalysisProvider<P, F>
where
    P: AnalysisProvider,
    F: AnalysisProvider,
{
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn summarize(&self, text: &str, level: SummaryLevel, cancel: &CancellationToken) -> Result<String, ProviderError> {
        self.run(
            "summarize",
            || self.primary.summarize(text, level, cancel),
            || self.fallback.summarize(text, level, cancel),
        )
        .await
    }

    async fn extract_entities(&self, text: &str, cancel: &CancellationToken) -> Result<Vec<ConceptRecord>, ProviderError> {
        self.run(
            "extract_entities",
            || self.primary.extract_entities(text, cancel),
            || self.fallback.extract_entities(text, cancel),
        )
        .await
    }

    async fn classify_citation(&self, context: &str, cancel: &CancellationToken) -> Result<CitationClassification, ProviderError> {
        self.run(
            "classify_citation",
            || self.primary.classify_citation(context, cancel),
            || self.fallback.classify_citation(context, cancel),
        )
        .await
    }

    async fn embed(&self, text: &str, cancel: &CancellationToken) -> Result<Vec<f32>, ProviderError> {
        self.run("embed", || self.primary.embed(text, cancel), || self.fallback.embed(text, cancel))
            .await
    }
}
