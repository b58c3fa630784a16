//! Statistical classifier wrapper.
//!
//! Two failure modes, both non-fatal:
//! - `ClassifierUnavailable`: the artifact failed to load. Permanent for the life of
//!   the wrapper, reported once at construction. Every call answers `Unavailable`.
//! - `InferenceFailure`: one call errored, panicked or overran its deadline. Only that
//!   review falls back to lexicon-only.
//!
//! Neither crosses this boundary as an error; callers match on `ClassifierOutcome`.

use crate::analyze::model::{LinearModel, SentimentModel};
use crate::review::{ClassProbabilities, ClassifierVerdict};
use crate::telemetry;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, info, warn};

/// Artifact missing or corrupt at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierUnavailable {
    pub reason: String,
}

impl fmt::Display for ClassifierUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "classifier unavailable: {}", self.reason)
    }
}

impl std::error::Error for ClassifierUnavailable {}

/// Per-call inference failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceFailure {
    Timeout(Duration),
    Model(String),
    Panicked,
}

impl InferenceFailure {
    /// Label used for the fallback metric.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Model(_) => "model",
            Self::Panicked => "panicked",
        }
    }
}

impl fmt::Display for InferenceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(d) => write!(f, "inference exceeded {} ms", d.as_millis()),
            Self::Model(msg) => write!(f, "inference error: {msg}"),
            Self::Panicked => f.write_str("inference panicked"),
        }
    }
}

impl std::error::Error for InferenceFailure {}

/// Result of one classifier call.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierOutcome {
    Verdict(ClassifierVerdict),
    /// Classifier permanently unavailable.
    Unavailable,
    /// This call failed; fall back for this review only.
    Failed(InferenceFailure),
}

impl ClassifierOutcome {
    pub fn verdict(&self) -> Option<&ClassifierVerdict> {
        match self {
            Self::Verdict(v) => Some(v),
            _ => None,
        }
    }

    /// Metric label when the outcome forces a lexicon-only verdict.
    pub fn fallback_reason(&self) -> Option<&'static str> {
        match self {
            Self::Verdict(_) => None,
            Self::Unavailable => Some("unavailable"),
            Self::Failed(f) => Some(f.kind()),
        }
    }
}

#[derive(Clone)]
enum State {
    Ready(Arc<dyn SentimentModel>),
    Unavailable(ClassifierUnavailable),
}

/// Loaded-once, read-only classifier handle. Cheap to clone.
#[derive(Clone)]
pub struct StatisticalClassifier {
    state: State,
}

impl fmt::Debug for StatisticalClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            State::Ready(m) => f
                .debug_struct("StatisticalClassifier")
                .field("model", &m.name())
                .finish(),
            State::Unavailable(u) => f
                .debug_struct("StatisticalClassifier")
                .field("unavailable", &u.reason)
                .finish(),
        }
    }
}

impl StatisticalClassifier {
    /// Load the artifact at `model_dir`. Any failure (including no path) yields a
    /// permanently unavailable classifier; the reason is logged here, once.
    pub fn load(model_dir: Option<&Path>) -> Self {
        let Some(dir) = model_dir else {
            return Self::unavailable("no model directory configured");
        };
        match LinearModel::load(dir) {
            Ok(model) => {
                info!(
                    target: "classifier",
                    path = %dir.display(),
                    max_length = model.max_length(),
                    "sentiment model loaded"
                );
                Self::from_model(Arc::new(model))
            }
            Err(e) => Self::unavailable(format!("{e:#}")),
        }
    }

    pub fn from_model(model: Arc<dyn SentimentModel>) -> Self {
        Self {
            state: State::Ready(model),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(target: "classifier", %reason, "statistical classifier unavailable; lexicon-only mode");
        Self {
            state: State::Unavailable(ClassifierUnavailable { reason }),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    pub fn unavailable_reason(&self) -> Option<&ClassifierUnavailable> {
        match &self.state {
            State::Unavailable(u) => Some(u),
            State::Ready(_) => None,
        }
    }

    /// Synchronous inference on cleaned text. Never panics past this call.
    pub fn classify(&self, clean_text: &str) -> ClassifierOutcome {
        let model = match &self.state {
            State::Ready(m) => m,
            State::Unavailable(_) => return ClassifierOutcome::Unavailable,
        };

        let started = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| model.predict(clean_text)));
        telemetry::record_inference(started.elapsed());

        match result {
            Ok(Ok(probs)) => match validate(probs) {
                Some(p) => ClassifierOutcome::Verdict(ClassifierVerdict::from_probabilities(p)),
                None => ClassifierOutcome::Failed(InferenceFailure::Model(format!(
                    "invalid probabilities {probs:?}"
                ))),
            },
            Ok(Err(e)) => ClassifierOutcome::Failed(InferenceFailure::Model(format!("{e:#}"))),
            Err(_) => ClassifierOutcome::Failed(InferenceFailure::Panicked),
        }
    }

    /// Run inference on the blocking pool, giving up after `timeout` (if any).
    /// An overrun is a per-call failure; the detached computation finishes unobserved.
    pub async fn classify_within(
        &self,
        clean_text: String,
        timeout: Option<Duration>,
    ) -> ClassifierOutcome {
        self.classify_holding(clean_text, timeout, None).await
    }

    /// `classify_within` that keeps `permit` until the blocking computation itself
    /// returns, so a timed-out call still counts against the caller's limit.
    pub async fn classify_holding(
        &self,
        clean_text: String,
        timeout: Option<Duration>,
        permit: Option<OwnedSemaphorePermit>,
    ) -> ClassifierOutcome {
        if !self.is_available() {
            return ClassifierOutcome::Unavailable;
        }

        let this = self.clone();
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            this.classify(&clean_text)
        });

        let joined = match timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    debug!(
                        target: "classifier",
                        timeout_ms = limit.as_millis() as u64,
                        "inference timed out"
                    );
                    return ClassifierOutcome::Failed(InferenceFailure::Timeout(limit));
                }
            },
            None => task.await,
        };

        joined.unwrap_or(ClassifierOutcome::Failed(InferenceFailure::Panicked))
    }
}

/// Reject non-finite/negative output; renormalize to sum 1.
fn validate(p: ClassProbabilities) -> Option<ClassProbabilities> {
    let vals = [p.negative, p.neutral, p.positive];
    if vals.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return None;
    }
    let sum: f32 = vals.iter().sum();
    if sum <= 0.0 {
        return None;
    }
    Some(ClassProbabilities {
        negative: p.negative / sum,
        neutral: p.neutral / sum,
        positive: p.positive / sum,
    })
}
