//! Aggregator: pure reduction of fused per-review verdicts into set-level statistics.
//! Never re-derives a verdict; the input list is moved into the report unchanged.

use crate::insights;
use crate::review::{AggregateReport, LabelCounts, LabelPercentages, ReviewVerdict, SentimentLabel};

/// Confidence (percent) above which a review counts as high-confidence.
pub const HIGH_CONFIDENCE_THRESHOLD: f32 = 80.0;

/// Overall score of a batch with no reviews (midpoint of the 0..=100 scale).
pub const EMPTY_OVERALL_SCORE: f32 = 50.0;

/// Statistics the insight rules read. A subset of `AggregateReport`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportStats {
    pub total: usize,
    pub counts: LabelCounts,
    pub percentages: LabelPercentages,
    pub overall_label: SentimentLabel,
    pub overall_score: f32,
    pub average_confidence: f32,
    pub high_confidence_count: usize,
    pub average_rating: Option<f32>,
}

impl ReportStats {
    pub fn empty() -> Self {
        Self {
            total: 0,
            counts: LabelCounts::default(),
            percentages: LabelPercentages {
                positive: 0.0,
                negative: 0.0,
                neutral: 100.0,
            },
            overall_label: SentimentLabel::Neutral,
            overall_score: EMPTY_OVERALL_SCORE,
            average_confidence: 0.0,
            high_confidence_count: 0,
            average_rating: None,
        }
    }

    /// Reduce verdicts to statistics. Empty input gives `ReportStats::empty()`.
    pub fn from_verdicts(verdicts: &[ReviewVerdict]) -> Self {
        if verdicts.is_empty() {
            return Self::empty();
        }

        let total = verdicts.len();
        let n = total as f32;
        let mut counts = LabelCounts::default();
        let mut score_sum = 0.0f32;
        let mut conf_sum = 0.0f32;
        let mut high_confidence_count = 0usize;
        let mut rating_sum = 0.0f32;
        let mut rated = 0usize;

        for v in verdicts {
            counts.record(v.label);
            score_sum += (v.polarity.clamp(-1.0, 1.0) + 1.0) / 2.0 * 100.0;
            conf_sum += v.confidence_percent;
            if v.confidence_percent > HIGH_CONFIDENCE_THRESHOLD {
                high_confidence_count += 1;
            }
            if let Some(r) = v.rating {
                rating_sum += r;
                rated += 1;
            }
        }

        let pct = |c: usize| round_to(c as f32 / n * 100.0, 1);
        let percentages = LabelPercentages {
            positive: pct(counts.positive),
            negative: pct(counts.negative),
            neutral: pct(counts.neutral),
        };

        Self {
            total,
            counts,
            percentages,
            overall_label: overall_label(&counts),
            overall_score: round_to(score_sum / n, 1),
            average_confidence: round_to(conf_sum / n, 2),
            high_confidence_count,
            average_rating: (rated > 0).then(|| round_to(rating_sum / rated as f32, 2)),
        }
    }
}

/// The strictly largest share wins; any tie at the top resolves to neutral.
pub fn overall_label(counts: &LabelCounts) -> SentimentLabel {
    let (p, n, u) = (counts.positive, counts.negative, counts.neutral);
    if p > n && p > u {
        SentimentLabel::Positive
    } else if n > p && n > u {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// Build the report for already-fused verdicts (insights included).
pub fn aggregate(verdicts: Vec<ReviewVerdict>) -> AggregateReport {
    let stats = ReportStats::from_verdicts(&verdicts);
    AggregateReport {
        total: stats.total,
        counts: stats.counts,
        percentages: stats.percentages,
        overall_label: stats.overall_label,
        overall_score: stats.overall_score,
        average_confidence: stats.average_confidence,
        high_confidence_count: stats.high_confidence_count,
        average_rating: stats.average_rating,
        headline: insights::headline(&stats),
        insights: insights::generate_insights(&stats),
        per_review: verdicts,
    }
}

/// Report for a batch with no surviving reviews.
pub fn empty_report() -> AggregateReport {
    aggregate(Vec::new())
}

fn round_to(x: f32, decimals: i32) -> f32 {
    let f = 10f32.powi(decimals);
    (x * f).round() / f
}
