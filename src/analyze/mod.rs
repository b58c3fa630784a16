// src/analyze/mod.rs
//! Per-review scoring stages: keyword lexicon, statistical classifier, fusion.

pub mod classifier;
pub mod fusion;
pub mod lexicon;
pub mod model;

pub use crate::analyze::classifier::{
    ClassifierOutcome, ClassifierUnavailable, InferenceFailure, StatisticalClassifier,
};
pub use crate::analyze::fusion::{fuse, FusedVerdict};
pub use crate::analyze::lexicon::Lexicon;
pub use crate::analyze::model::{LinearModel, SentimentModel};
