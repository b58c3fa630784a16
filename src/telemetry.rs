// src/telemetry.rs
//! Log/metric helpers. The library only emits through the `tracing` and `metrics`
//! facades; installing a subscriber or recorder is the binary's (or test's) job.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use std::time::Duration;

/// One-time metrics registration (so series show up on a scrape even before use).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "reviews_classified_total",
            "Reviews that produced a fused verdict."
        );
        describe_counter!(
            "reviews_filtered_total",
            "Reviews dropped by the minimum-length filter."
        );
        describe_counter!(
            "reviews_duplicate_total",
            "Reviews dropped as near-duplicates within a batch."
        );
        describe_counter!(
            "classifier_fallback_total",
            "Reviews scored lexicon-only, by reason."
        );
        describe_histogram!(
            "inference_duration_ms",
            "Statistical classifier inference time in milliseconds."
        );
        describe_gauge!(
            "report_total_reviews",
            "Review count of the most recent report."
        );
    });
}

pub fn record_inference(elapsed: Duration) {
    histogram!("inference_duration_ms").record(elapsed.as_secs_f64() * 1000.0);
}

pub fn record_fallback(reason: &'static str) {
    counter!("classifier_fallback_total", "reason" => reason).increment(1);
}

pub fn record_batch(classified: usize, filtered: usize, duplicates: usize) {
    counter!("reviews_classified_total").increment(classified as u64);
    counter!("reviews_filtered_total").increment(filtered as u64);
    counter!("reviews_duplicate_total").increment(duplicates as u64);
}

pub fn record_report(total: usize) {
    gauge!("report_total_reviews").set(total as f64);
}

/// Short anonymized id for log lines: first 6 bytes of SHA-256, hex. Raw review
/// text never goes to the logs.
pub fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anon_hash_is_short_stable_hex() {
        let a = anon_hash("great product");
        assert_eq!(a.len(), 12);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, anon_hash("great product"));
        assert_ne!(a, anon_hash("great product!"));
    }
}
