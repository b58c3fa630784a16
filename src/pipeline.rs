// src/pipeline.rs
//! `ReviewAnalyzer`: constructed once, read-only afterwards, shared across requests.
//!
//! Per batch:
//! 1) normalize + minimum-length filter (+ optional near-duplicate drop)
//! 2) classifier calls fan out on the blocking pool, at most `max_concurrency` at once,
//!    each bounded by `inference_timeout_ms`
//! 3) lexicon score + fusion per review, in input order
//! 4) aggregate + insights (for `build_report`)

use crate::aggregate::aggregate;
use crate::analyze::classifier::{ClassifierOutcome, InferenceFailure, StatisticalClassifier};
use crate::analyze::fusion::fuse;
use crate::analyze::lexicon::Lexicon;
use crate::config::AnalyzerConfig;
use crate::dedup::DuplicateFilter;
use crate::normalize::{meaningful_len, normalize};
use crate::review::{AggregateReport, RawReview, ReviewVerdict};
use crate::telemetry::{self, anon_hash};
use anyhow::{Context, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Caller-held abort switch for a batch. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Only the cancellable entry points return this; nothing else in a batch is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// Aborted by the caller after `completed` verdicts were produced (and discarded).
    Cancelled { completed: usize },
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled { completed } => {
                write!(f, "batch cancelled after {completed} review(s)")
            }
        }
    }
}

impl std::error::Error for BatchError {}

/// One review that survived the filters.
struct Prepared {
    cleaned: String,
    source_text: String,
    rating: Option<f32>,
}

#[derive(Debug, Default)]
struct Prepass {
    filtered: usize,
    duplicates: usize,
}

#[derive(Debug, Clone)]
pub struct ReviewAnalyzer {
    config: AnalyzerConfig,
    lexicon: Arc<Lexicon>,
    classifier: StatisticalClassifier,
}

impl ReviewAnalyzer {
    pub fn new(mut config: AnalyzerConfig, lexicon: Lexicon, classifier: StatisticalClassifier) -> Self {
        config.sanitize();
        Self {
            config,
            lexicon: Arc::new(lexicon),
            classifier,
        }
    }

    /// Build from config: keyword lexicon (embedded unless overridden) and the
    /// classifier artifact. A broken lexicon override is an error; a broken model
    /// only degrades to lexicon-only.
    pub fn from_config(config: AnalyzerConfig) -> Result<Self> {
        let lexicon = match &config.lexicon_path {
            Some(path) => Lexicon::load_from_file(path)
                .with_context(|| format!("loading lexicon override {}", path.display()))?,
            None => Lexicon::embedded().clone(),
        };
        let classifier = StatisticalClassifier::load(config.model_dir.as_deref());
        info!(
            target: "pipeline",
            keywords = lexicon.len(),
            classifier = classifier.is_available(),
            "review analyzer ready"
        );
        Ok(Self::new(config, lexicon, classifier))
    }

    /// Embedded lexicon, default config, no classifier.
    pub fn lexicon_only() -> Self {
        Self::new(
            AnalyzerConfig::default(),
            Lexicon::embedded().clone(),
            StatisticalClassifier::unavailable("lexicon-only analyzer"),
        )
    }

    pub fn with_classifier(mut self, classifier: StatisticalClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn classifier(&self) -> &StatisticalClassifier {
        &self.classifier
    }

    /// Fused verdicts for every review that survives the filters, in input order.
    pub async fn classify_reviews(&self, raw_reviews: &[RawReview]) -> Vec<ReviewVerdict> {
        // Without a token the batch cannot be cancelled.
        self.run(raw_reviews, None).await.unwrap_or_default()
    }

    pub async fn classify_reviews_cancellable(
        &self,
        raw_reviews: &[RawReview],
        cancel: &CancelToken,
    ) -> Result<Vec<ReviewVerdict>, BatchError> {
        self.run(raw_reviews, Some(cancel)).await
    }

    /// classify + aggregate + insights. Never fails; no survivors gives the empty report.
    pub async fn build_report(&self, raw_reviews: &[RawReview]) -> AggregateReport {
        let verdicts = self.classify_reviews(raw_reviews).await;
        self.finish_report(verdicts)
    }

    pub async fn build_report_cancellable(
        &self,
        raw_reviews: &[RawReview],
        cancel: &CancelToken,
    ) -> Result<AggregateReport, BatchError> {
        let verdicts = self.classify_reviews_cancellable(raw_reviews, cancel).await?;
        Ok(self.finish_report(verdicts))
    }

    fn finish_report(&self, verdicts: Vec<ReviewVerdict>) -> AggregateReport {
        let report = aggregate(verdicts);
        telemetry::record_report(report.total);
        info!(
            target: "pipeline",
            total = report.total,
            overall = %report.overall_label,
            score = report.overall_score,
            "report built"
        );
        report
    }

    fn prepare(&self, raw_reviews: &[RawReview]) -> (Vec<Prepared>, Prepass) {
        let mut stats = Prepass::default();
        let mut dedup = self.config.duplicate_similarity.map(DuplicateFilter::new);
        let mut kept = Vec::with_capacity(raw_reviews.len());

        for review in raw_reviews {
            let cleaned = normalize(&review.text);
            if cleaned.is_empty() || meaningful_len(&cleaned) < self.config.min_review_chars {
                stats.filtered += 1;
                continue;
            }
            if let Some(filter) = dedup.as_mut() {
                if filter.is_duplicate(&cleaned) {
                    debug!(target: "pipeline", review = %anon_hash(&cleaned), "near-duplicate dropped");
                    stats.duplicates += 1;
                    continue;
                }
            }
            kept.push(Prepared {
                cleaned,
                source_text: review.text.clone(),
                rating: review.rating_value(),
            });
        }
        (kept, stats)
    }

    fn spawn_inference(&self, items: &[Prepared]) -> Vec<JoinHandle<ClassifierOutcome>> {
        if !self.classifier.is_available() {
            return Vec::new();
        }
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let timeout = self.config.inference_timeout();

        items
            .iter()
            .map(|item| {
                let permits = Arc::clone(&permits);
                let classifier = self.classifier.clone();
                let text = item.cleaned.clone();
                tokio::spawn(async move {
                    let permit = permits.acquire_owned().await.ok();
                    classifier.classify_holding(text, timeout, permit).await
                })
            })
            .collect()
    }

    async fn run(
        &self,
        raw_reviews: &[RawReview],
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<ReviewVerdict>, BatchError> {
        telemetry::ensure_metrics_described();
        let cancelled = || cancel.is_some_and(CancelToken::is_cancelled);
        if cancelled() {
            return Err(BatchError::Cancelled { completed: 0 });
        }

        let (items, prepass) = self.prepare(raw_reviews);
        let mut pending = self.spawn_inference(&items).into_iter();
        let mut verdicts = Vec::with_capacity(items.len());

        for item in items {
            let outcome = match pending.next() {
                None if cancelled() => None,
                None => Some(ClassifierOutcome::Unavailable),
                Some(mut handle) => {
                    let joined = join_outcome(&mut handle, cancel).await;
                    if joined.is_none() {
                        handle.abort();
                    }
                    joined
                }
            };
            let Some(outcome) = outcome else {
                pending.for_each(|h| h.abort());
                info!(target: "pipeline", completed = verdicts.len(), "batch cancelled");
                return Err(BatchError::Cancelled {
                    completed: verdicts.len(),
                });
            };

            if let Some(reason) = outcome.fallback_reason() {
                telemetry::record_fallback(reason);
            }
            if let ClassifierOutcome::Failed(failure) = &outcome {
                debug!(
                    target: "pipeline",
                    review = %anon_hash(&item.cleaned),
                    error = %failure,
                    "classifier call failed; lexicon-only verdict"
                );
            }

            let lexicon = self.lexicon.score(&item.cleaned);
            let fused = fuse(&lexicon, outcome.verdict());
            verdicts.push(fused.into_review(item.source_text, item.rating));
        }

        telemetry::record_batch(verdicts.len(), prepass.filtered, prepass.duplicates);
        info!(
            target: "pipeline",
            received = raw_reviews.len(),
            classified = verdicts.len(),
            filtered = prepass.filtered,
            duplicates = prepass.duplicates,
            classifier = self.classifier.is_available(),
            "batch classified"
        );
        Ok(verdicts)
    }
}

/// `None` when the token fires first.
async fn join_outcome(
    handle: &mut JoinHandle<ClassifierOutcome>,
    cancel: Option<&CancelToken>,
) -> Option<ClassifierOutcome> {
    let joined = match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => return None,
            joined = &mut *handle => joined,
        },
        None => handle.await,
    };
    Some(joined.unwrap_or(ClassifierOutcome::Failed(InferenceFailure::Panicked)))
}
