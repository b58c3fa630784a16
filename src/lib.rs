// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod analyze;
pub mod config;
pub mod dedup;
pub mod insights;
pub mod normalize;
pub mod pipeline;
pub mod review;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::aggregate;
pub use crate::analyze::{
    fuse, ClassifierOutcome, ClassifierUnavailable, InferenceFailure, Lexicon, SentimentModel,
    StatisticalClassifier,
};
pub use crate::config::AnalyzerConfig;
pub use crate::pipeline::{BatchError, CancelToken, ReviewAnalyzer};
pub use crate::review::{
    parse_review_batch, AggregateReport, ClassProbabilities, ClassifierVerdict, LabelCounts, LabelPercentages,
    LexiconVerdict, RawReview, ReviewVerdict, SentimentLabel, VerdictBasis,
};
