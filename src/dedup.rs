//! Near-duplicate suppression within one batch.
//!
//! A cleaned review is dropped when its normalized Levenshtein similarity to an
//! earlier *kept* review is >= the threshold. Scope is a single batch; nothing is
//! remembered across calls.

use strsim::normalized_levenshtein;

#[derive(Debug, Clone)]
pub struct DuplicateFilter {
    threshold: f64,
    kept: Vec<String>,
}

impl DuplicateFilter {
    pub fn new(similarity_threshold: f32) -> Self {
        let threshold = if similarity_threshold.is_finite() {
            f64::from(similarity_threshold.clamp(0.0, 1.0))
        } else {
            1.0
        };
        Self {
            threshold,
            kept: Vec::new(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// `true` if `clean_text` should be dropped; otherwise it is remembered.
    pub fn is_duplicate(&mut self, clean_text: &str) -> bool {
        let dup = self
            .kept
            .iter()
            .any(|seen| normalized_levenshtein(seen, clean_text) >= self.threshold);
        if !dup {
            self.kept.push(clean_text.to_string());
        }
        dup
    }

    pub fn kept_len(&self) -> usize {
        self.kept.len()
    }
}
