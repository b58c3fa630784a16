//! Insight generator: fixed-order rules over `ReportStats`, each adding at most one line.
//! Pure functions of the statistics; no randomness, no I/O.

use crate::aggregate::{ReportStats, HIGH_CONFIDENCE_THRESHOLD};
use crate::review::SentimentLabel;

pub const NO_REVIEWS_INSIGHT: &str = "No reviews available for analysis";

pub const STRONG_POSITIVE_SCORE: f32 = 70.0;
pub const SIGNIFICANT_NEGATIVE_SCORE: f32 = 30.0;
pub const SMALL_SAMPLE: usize = 5;
pub const LARGE_SAMPLE: usize = 20;

type Rule = fn(&ReportStats) -> Option<String>;

const RULES: &[Rule] = &[strength, distribution, volume, confidence, rating_gap];

/// Human-readable statements about a batch. Empty batch → exactly one line.
pub fn generate_insights(stats: &ReportStats) -> Vec<String> {
    if stats.total == 0 {
        return vec![NO_REVIEWS_INSIGHT.to_string()];
    }
    RULES.iter().filter_map(|rule| rule(stats)).collect()
}

/// One-line summary for dashboards.
pub fn headline(stats: &ReportStats) -> String {
    let s = match (stats.total, stats.overall_label) {
        (0, _) => "No reviews available",
        (_, SentimentLabel::Positive) if stats.overall_score > 85.0 => {
            "Highly positive customer feedback"
        }
        (_, SentimentLabel::Positive) => "Generally positive customer feedback",
        (_, SentimentLabel::Negative) if stats.overall_score < 15.0 => {
            "Strongly negative customer feedback"
        }
        (_, SentimentLabel::Negative) => "Generally negative customer feedback",
        (_, SentimentLabel::Neutral) => "Mixed customer feedback with neutral overall sentiment",
    };
    s.to_string()
}

fn strength(stats: &ReportStats) -> Option<String> {
    let score = stats.overall_score;
    let line = if score >= STRONG_POSITIVE_SCORE {
        format!("Strong positive sentiment with an overall score of {score:.1}/100")
    } else if score <= SIGNIFICANT_NEGATIVE_SCORE {
        format!("Significant negative sentiment with an overall score of {score:.1}/100")
    } else {
        format!("Moderate sentiment with an overall score of {score:.1}/100")
    };
    Some(line)
}

fn distribution(stats: &ReportStats) -> Option<String> {
    let c = stats.counts;
    let neutral_majority = c.neutral > c.positive.max(c.negative);
    let line = match stats.overall_label {
        SentimentLabel::Positive => format!(
            "{} out of {} reviews are positive ({:.1}%)",
            c.positive, stats.total, stats.percentages.positive
        ),
        SentimentLabel::Negative => format!(
            "{} out of {} reviews express concerns ({:.1}%)",
            c.negative, stats.total, stats.percentages.negative
        ),
        SentimentLabel::Neutral if neutral_majority => format!(
            "Most reviews are neutral ({:.1}%) with no strong opinion either way",
            stats.percentages.neutral
        ),
        SentimentLabel::Neutral => {
            "Mixed customer opinions with no clear sentiment direction".to_string()
        }
    };
    Some(line)
}

fn volume(stats: &ReportStats) -> Option<String> {
    if stats.total < SMALL_SAMPLE {
        Some(format!(
            "Only {} review(s) analyzed; treat these results as indicative",
            stats.total
        ))
    } else if stats.total > LARGE_SAMPLE {
        Some(format!(
            "Based on {} reviews, a large sample for this product",
            stats.total
        ))
    } else {
        None
    }
}

fn confidence(stats: &ReportStats) -> Option<String> {
    if stats.average_confidence > HIGH_CONFIDENCE_THRESHOLD {
        Some(format!(
            "High average confidence of {:.1}% across predictions",
            stats.average_confidence
        ))
    } else if stats.high_confidence_count > 0 {
        Some(format!(
            "{} reviews have high confidence (>{HIGH_CONFIDENCE_THRESHOLD:.0}%) predictions",
            stats.high_confidence_count
        ))
    } else {
        None
    }
}

/// Star ratings that contradict the text sentiment are worth a look.
fn rating_gap(stats: &ReportStats) -> Option<String> {
    let rating = stats.average_rating?;
    match stats.overall_label {
        SentimentLabel::Positive if rating < 3.0 => Some(format!(
            "Average star rating ({rating:.1}/5) is lower than the positive review text suggests"
        )),
        SentimentLabel::Negative if rating > 3.5 => Some(format!(
            "Average star rating ({rating:.1}/5) is higher than the negative review text suggests"
        )),
        _ => None,
    }
}
