//! # Fusion Engine
//! Pure decision table combining the lexicon and classifier verdicts for one review.
//! No I/O, no shared state: safe to run for every review of a batch in parallel.
//!
//! Rules:
//! 1. classifier absent → lexicon label/score, confidence = min(|score|·100, 95)
//! 2. labels agree → max(classifier, lexicon) confidence, polarity = 0.7·classifier + 0.3·lexicon
//! 3. labels disagree →
//!    a. keyword margin ≥ 2 → lexicon label, lexicon confidence − 10
//!    b. |P(pos) − P(neg)| > 0.3 → classifier label, classifier confidence − 10
//!    c. otherwise → neutral at 60
//!
//! Polarity is shaped so positive labels are ≥ 0, negative ≤ 0 and neutral stays
//! within ±0.1. Confidence is clamped to [0, 100], polarity to [-1, 1].

use crate::review::{
    ClassifierVerdict, LexiconVerdict, ReviewVerdict, SentimentLabel, VerdictBasis,
};

pub const CLASSIFIER_WEIGHT: f32 = 0.7;
pub const LEXICON_WEIGHT: f32 = 0.3;
pub const LEXICON_CONFIDENCE_CAP: f32 = 95.0;
pub const DISAGREEMENT_PENALTY: f32 = 10.0;
pub const STRONG_LEXICAL_MARGIN: u32 = 2;
pub const DECISIVE_CLASSIFIER_POLARITY: f32 = 0.3;
pub const NEUTRAL_FALLBACK_CONFIDENCE: f32 = 60.0;
pub const NEUTRAL_POLARITY_BAND: f32 = 0.1;

/// Fused label/polarity/confidence, before the review text is attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedVerdict {
    pub label: SentimentLabel,
    pub polarity: f32,
    pub confidence_percent: f32,
    pub basis: VerdictBasis,
}

impl FusedVerdict {
    fn new(label: SentimentLabel, polarity: f32, confidence: f32, basis: VerdictBasis) -> Self {
        Self {
            label,
            polarity: shape_polarity(label, polarity),
            confidence_percent: clamp_percent(confidence),
            basis,
        }
    }

    pub fn into_review(self, source_text: String, rating: Option<f32>) -> ReviewVerdict {
        ReviewVerdict {
            label: self.label,
            polarity: self.polarity,
            confidence_percent: self.confidence_percent,
            source_text,
            rating,
            basis: self.basis,
        }
    }
}

/// Lexicon-derived confidence in percent.
pub fn lexicon_confidence(lexicon: &LexiconVerdict) -> f32 {
    (lexicon.score.abs() * 100.0).min(LEXICON_CONFIDENCE_CAP)
}

/// Combine both signals. `classifier` is `None` when unavailable or failed for this call.
pub fn fuse(lexicon: &LexiconVerdict, classifier: Option<&ClassifierVerdict>) -> FusedVerdict {
    let lex_conf = lexicon_confidence(lexicon);

    let Some(cls) = classifier else {
        return FusedVerdict::new(
            lexicon.label,
            lexicon.score,
            lex_conf,
            VerdictBasis::LexiconOnly,
        );
    };

    let cls_conf = cls.confidence * 100.0;
    let proxy = cls.polarity_proxy();

    if cls.label == lexicon.label {
        let blended = (CLASSIFIER_WEIGHT * proxy + LEXICON_WEIGHT * lexicon.score)
            / (CLASSIFIER_WEIGHT + LEXICON_WEIGHT);
        return FusedVerdict::new(
            cls.label,
            blended,
            cls_conf.max(lex_conf),
            VerdictBasis::Agreement,
        );
    }

    if lexicon.hit_margin() >= STRONG_LEXICAL_MARGIN {
        FusedVerdict::new(
            lexicon.label,
            lexicon.score,
            lex_conf - DISAGREEMENT_PENALTY,
            VerdictBasis::LexiconOverride,
        )
    } else if proxy.abs() > DECISIVE_CLASSIFIER_POLARITY {
        FusedVerdict::new(
            cls.label,
            proxy,
            cls_conf - DISAGREEMENT_PENALTY,
            VerdictBasis::ClassifierOverride,
        )
    } else {
        FusedVerdict::new(
            SentimentLabel::Neutral,
            0.0,
            NEUTRAL_FALLBACK_CONFIDENCE,
            VerdictBasis::NeutralFallback,
        )
    }
}

/// Force the polarity sign to agree with the label.
fn shape_polarity(label: SentimentLabel, raw: f32) -> f32 {
    let raw = if raw.is_finite() { raw.clamp(-1.0, 1.0) } else { 0.0 };
    match label {
        SentimentLabel::Positive => raw.abs(),
        SentimentLabel::Negative => -raw.abs(),
        SentimentLabel::Neutral => raw.clamp(-NEUTRAL_POLARITY_BAND, NEUTRAL_POLARITY_BAND),
    }
}

fn clamp_percent(x: f32) -> f32 {
    if x.is_finite() {
        x.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
