// tests/metrics_pipeline.rs
#![cfg(feature = "strict-metrics")]
mod common;

use common::reviews;
use metrics_exporter_prometheus::PrometheusBuilder;
use review_sentiment_analyzer::ReviewAnalyzer;

#[tokio::test]
async fn metrics_exposed_after_report() {
    // Install a local recorder for the test
    let handle = PrometheusBuilder::new().install_recorder().expect("recorder");

    let analyzer = ReviewAnalyzer::lexicon_only();
    let report = analyzer
        .build_report(&reviews(&["great product", "terrible", "ok", ""]))
        .await;
    assert_eq!(report.total, 2);

    // Scrape metrics text and check series presence by substring
    let out = handle.render();
    assert!(out.contains("reviews_classified_total"));
    assert!(out.contains("reviews_filtered_total"));
    assert!(out.contains("classifier_fallback_total"));
    assert!(out.contains("reason=\"unavailable\""));
    assert!(out.contains("report_total_reviews"));
}
