//! Data model shared by every stage of the pipeline.
//!
//! Inputs (`RawReview`) are immutable; per-review results (`ReviewVerdict`) and the
//! batch summary (`AggregateReport`) are produced once and never mutated afterwards.
//! Everything serializes with snake_case labels so the API layer can ship it as-is.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One scraped review. Only `text` takes part in classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReview {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl RawReview {
    /// Review with text only (no rating/reviewer/date).
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_rating(mut self, rating: impl Into<String>) -> Self {
        self.rating = Some(rating.into());
        self
    }

    /// Star rating on a 0..=5 scale, parsed from strings like `"5/5"`, `"4.0 out of 5"`,
    /// `"4 stars"` or `"3.5"`. Ratings on another denominator are rescaled to 5.
    pub fn rating_value(&self) -> Option<f32> {
        parse_rating(self.rating.as_deref()?)
    }
}

static RE_RATING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*(?:/\s*(\d+(?:\.\d+)?)|out\s+of\s+(\d+(?:\.\d+)?))?")
        .expect("rating regex")
});

fn parse_rating(raw: &str) -> Option<f32> {
    let caps = RE_RATING.captures(raw)?;
    let value: f32 = caps.get(1)?.as_str().parse().ok()?;
    let denom: f32 = match caps.get(2).or_else(|| caps.get(3)) {
        Some(m) => m.as_str().parse().ok()?,
        None => 5.0,
    };
    if denom <= 0.0 {
        return None;
    }
    let scaled = value / denom * 5.0;
    (0.0..=5.0).contains(&scaled).then_some(scaled)
}

/// Batch input element: a bare string or a full review object.
#[derive(Deserialize)]
#[serde(untagged)]
enum InputReview {
    Text(String),
    Full(RawReview),
}

impl From<InputReview> for RawReview {
    fn from(input: InputReview) -> Self {
        match input {
            InputReview::Text(text) => RawReview::from_text(text),
            InputReview::Full(review) => review,
        }
    }
}

/// Parse a JSON array of reviews. Elements may be plain strings or
/// `{"text", "rating", "reviewer", "date"}` objects, mixed freely.
pub fn parse_review_batch(raw: &str) -> anyhow::Result<Vec<RawReview>> {
    use anyhow::Context;

    let parsed: Vec<InputReview> =
        serde_json::from_str(raw).context("reviews must be a JSON array of strings or objects")?;
    Ok(parsed.into_iter().map(RawReview::from).collect())
}

/// Three-way sentiment label. Discriminants follow the classifier's class-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Negative = 0,
    Neutral = 1,
    Positive = 2,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [Self::Negative, Self::Neutral, Self::Positive];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Positive => "positive",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "negative" | "neg" | "label_0" => Ok(Self::Negative),
            "neutral" | "neu" | "label_1" => Ok(Self::Neutral),
            "positive" | "pos" | "label_2" => Ok(Self::Positive),
            other => anyhow::bail!("unknown sentiment label: {other}"),
        }
    }
}

/// Keyword-based verdict. Always computable; no hits means neutral with score 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LexiconVerdict {
    pub label: SentimentLabel,
    /// Bounded keyword polarity in [-1, 1].
    pub score: f32,
    pub positive_hits: u32,
    pub negative_hits: u32,
}

impl LexiconVerdict {
    /// Absolute hit difference; the fusion tie-break keys on it.
    pub fn hit_margin(&self) -> u32 {
        self.positive_hits.abs_diff(self.negative_hits)
    }
}

/// Per-class probabilities from the statistical classifier.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub negative: f32,
    pub neutral: f32,
    pub positive: f32,
}

impl ClassProbabilities {
    pub fn get(&self, label: SentimentLabel) -> f32 {
        match label {
            SentimentLabel::Negative => self.negative,
            SentimentLabel::Neutral => self.neutral,
            SentimentLabel::Positive => self.positive,
        }
    }

    /// Arg-max label and its probability. Ties favour the lower class index.
    pub fn arg_max(&self) -> (SentimentLabel, f32) {
        let mut best = (SentimentLabel::Negative, self.negative);
        for label in [SentimentLabel::Neutral, SentimentLabel::Positive] {
            let p = self.get(label);
            if p > best.1 {
                best = (label, p);
            }
        }
        best
    }
}

/// Output of the statistical classifier for one text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierVerdict {
    pub label: SentimentLabel,
    pub probabilities: ClassProbabilities,
    /// Probability of `label`, in [0, 1].
    pub confidence: f32,
}

impl ClassifierVerdict {
    pub fn from_probabilities(probabilities: ClassProbabilities) -> Self {
        let (label, confidence) = probabilities.arg_max();
        Self {
            label,
            probabilities,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Signed strength in [-1, 1]: P(positive) - P(negative). Neutral mass pulls it to 0.
    pub fn polarity_proxy(&self) -> f32 {
        (self.probabilities.positive - self.probabilities.negative).clamp(-1.0, 1.0)
    }
}

/// Which fusion branch produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictBasis {
    /// Classifier absent (unavailable or failed for this call).
    LexiconOnly,
    /// Both signals agreed on the label.
    Agreement,
    /// Signals disagreed; strong keyword margin won.
    LexiconOverride,
    /// Signals disagreed; decisive classifier polarity won.
    ClassifierOverride,
    /// Signals disagreed and neither was decisive.
    NeutralFallback,
}

/// Final fused result for one review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewVerdict {
    pub label: SentimentLabel,
    /// Signed polarity in [-1, 1].
    pub polarity: f32,
    /// Confidence in [0, 100].
    pub confidence_percent: f32,
    pub source_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    pub basis: VerdictBasis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl LabelCounts {
    pub fn get(&self, label: SentimentLabel) -> usize {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Negative => self.negative,
            SentimentLabel::Neutral => self.neutral,
        }
    }

    pub fn record(&mut self, label: SentimentLabel) {
        match label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Negative => self.negative += 1,
            SentimentLabel::Neutral => self.neutral += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

/// Label shares in percent, rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelPercentages {
    pub positive: f32,
    pub negative: f32,
    pub neutral: f32,
}

impl LabelPercentages {
    pub fn get(&self, label: SentimentLabel) -> f32 {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Negative => self.negative,
            SentimentLabel::Neutral => self.neutral,
        }
    }

    pub fn sum(&self) -> f32 {
        self.positive + self.negative + self.neutral
    }
}

/// Batch summary for one product's reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub total: usize,
    pub counts: LabelCounts,
    pub percentages: LabelPercentages,
    pub overall_label: SentimentLabel,
    /// Mean polarity rescaled to [0, 100]; 50 for an empty batch.
    pub overall_score: f32,
    pub average_confidence: f32,
    /// Reviews with confidence above 80%.
    pub high_confidence_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f32>,
    pub headline: String,
    pub insights: Vec<String>,
    #[serde(default)]
    pub per_review: Vec<ReviewVerdict>,
}

impl AggregateReport {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_of_plain_strings() {
        let batch = parse_review_batch(r#"["Great phone", "  "]"#).unwrap();
        assert_eq!(
            batch,
            vec![RawReview::from_text("Great phone"), RawReview::from_text("  ")]
        );
    }

    #[test]
    fn batch_of_objects_keeps_metadata() {
        let raw = r#"[
            {"text": "Battery died", "rating": "1/5", "reviewer": "a.k.", "date": "2024-03-01"},
            {"rating": "4 stars"}
        ]"#;
        let batch = parse_review_batch(raw).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].text, "Battery died");
        assert_eq!(batch[0].rating_value(), Some(1.0));
        assert_eq!(batch[0].reviewer.as_deref(), Some("a.k."));
        assert_eq!(batch[0].date.as_deref(), Some("2024-03-01"));
        assert_eq!(batch[1].text, "");
        assert_eq!(batch[1].rating_value(), Some(4.0));
    }

    #[test]
    fn batch_may_mix_strings_and_objects() {
        let batch = parse_review_batch(r#"["love it", {"text": "meh", "rating": "3"}]"#).unwrap();
        assert_eq!(batch[0], RawReview::from_text("love it"));
        assert_eq!(batch[1], RawReview::from_text("meh").with_rating("3"));
    }

    #[test]
    fn batch_must_be_an_array() {
        for raw in [r#"{"text": "x"}"#, r#""just text""#, "[1, 2]", "not json", ""] {
            let err = parse_review_batch(raw).unwrap_err();
            assert!(err.to_string().contains("JSON array"), "{raw}: {err}");
        }
    }

    #[test]
    fn rating_formats_parse() {
        let r = |s: &str| RawReview::from_text("x").with_rating(s).rating_value();
        assert_eq!(r("5/5"), Some(5.0));
        assert_eq!(r("4.0 out of 5"), Some(4.0));
        assert_eq!(r("4 stars"), Some(4.0));
        assert_eq!(r("3.5"), Some(3.5));
        assert_eq!(r("8/10"), Some(4.0));
        assert_eq!(r("7"), None);
        assert_eq!(r("n/a"), None);
        assert_eq!(RawReview::from_text("x").rating_value(), None);
    }

    #[test]
    fn arg_max_ties_pick_lower_index() {
        let p = ClassProbabilities {
            negative: 0.4,
            neutral: 0.4,
            positive: 0.2,
        };
        assert_eq!(p.arg_max().0, SentimentLabel::Negative);
    }

    #[test]
    fn neutral_verdict_polarity_stays_small() {
        let v = ClassifierVerdict::from_probabilities(ClassProbabilities {
            negative: 0.1,
            neutral: 0.8,
            positive: 0.1,
        });
        assert_eq!(v.label, SentimentLabel::Neutral);
        assert!(v.polarity_proxy().abs() < 1e-6);
    }

    #[test]
    fn labels_serialize_snake_case() {
        let v = serde_json::to_value(SentimentLabel::Positive).unwrap();
        assert_eq!(v, serde_json::json!("positive"));
        assert_eq!("LABEL_0".parse::<SentimentLabel>().unwrap(), SentimentLabel::Negative);
    }
}
