//! Lexicon scorer: counts positive/negative keyword hits in cleaned review text
//! and derives a bounded polarity.
//!
//! score = (pos - neg) / (pos + neg), or 0.0 with no hits.
//! A keyword within 1..=3 tokens after a negator counts for the opposite side
//! ("not good" is a negative hit, "no problem" a positive one). Negation never
//! reaches past a clause break (`, . ! ? ;`): in "no complaints, excellent" the
//! `no` does not touch `excellent`.

use crate::review::{LexiconVerdict, SentimentLabel};
use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// |score| above this is a polar label; at or below it is neutral.
pub const LABEL_THRESHOLD: f32 = 0.1;

/// How far back (in tokens) a negator reaches.
const NEGATION_WINDOW: usize = 3;

/// Punctuation that closes a negation scope.
const CLAUSE_BREAKS: [char; 5] = [',', '.', '!', '?', ';'];

static EMBEDDED: Lazy<Lexicon> = Lazy::new(|| {
    let raw = include_str!("../../data/review_lexicon.json");
    Lexicon::from_json(raw).expect("valid embedded review lexicon")
});

#[derive(Debug, Deserialize)]
struct LexiconFile {
    positive: Vec<String>,
    negative: Vec<String>,
}

/// Fixed positive/negative keyword sets. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexicon {
    positive: HashSet<String>,
    negative: HashSet<String>,
}

impl Lexicon {
    /// The keyword lists shipped with the crate.
    pub fn embedded() -> &'static Lexicon {
        &EMBEDDED
    }

    /// Build from word lists. Words are trimmed and lower-cased; blanks dropped.
    pub fn from_words<I, J, S, T>(positive: I, negative: J) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let positive = clean_set(positive);
        let negative = clean_set(negative);
        if positive.is_empty() || negative.is_empty() {
            bail!("lexicon needs at least one positive and one negative keyword");
        }
        if let Some(dup) = positive.intersection(&negative).next() {
            bail!("keyword {dup:?} is listed as both positive and negative");
        }
        Ok(Self { positive, negative })
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: LexiconFile = serde_json::from_str(raw).context("parsing lexicon json")?;
        Self::from_words(file.positive, file.negative)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading lexicon from {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid lexicon {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.positive.len() + self.negative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Score cleaned text. Pure and deterministic for a given lexicon.
    pub fn score(&self, clean_text: &str) -> LexiconVerdict {
        let mut positive_hits = 0u32;
        let mut negative_hits = 0u32;

        for clause in clean_text.split(CLAUSE_BREAKS) {
            let tokens: Vec<&str> = tokenize(clause).collect();
            for (i, tok) in tokens.iter().enumerate() {
                let polarity = if self.positive.contains(*tok) {
                    1
                } else if self.negative.contains(*tok) {
                    -1
                } else {
                    continue;
                };

                let negated = (1..=NEGATION_WINDOW).any(|k| i >= k && is_negator(tokens[i - k]));
                let adj = if negated { -polarity } else { polarity };
                if adj > 0 {
                    positive_hits += 1;
                } else {
                    negative_hits += 1;
                }
            }
        }

        let score = polarity_score(positive_hits, negative_hits);
        LexiconVerdict {
            label: label_for_score(score),
            score,
            positive_hits,
            negative_hits,
        }
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Lexicon::embedded().clone()
    }
}

/// (pos - neg) / (pos + neg), bounded to [-1, 1]; 0.0 when nothing matched.
pub fn polarity_score(positive_hits: u32, negative_hits: u32) -> f32 {
    let total = positive_hits + negative_hits;
    if total == 0 {
        return 0.0;
    }
    let diff = positive_hits as f32 - negative_hits as f32;
    (diff / total as f32).clamp(-1.0, 1.0)
}

/// Map a polarity score to a label using `LABEL_THRESHOLD`.
pub fn label_for_score(score: f32) -> SentimentLabel {
    if score > LABEL_THRESHOLD {
        SentimentLabel::Positive
    } else if score < -LABEL_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// Word tokens: runs of alphanumerics and apostrophes, outer apostrophes trimmed.
/// Input is expected to be case-folded already.
fn tokenize(s: &str) -> impl Iterator<Item = &str> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "don't"
            | "doesn't"
            | "didn't"
            | "won't"
            | "can't"
            | "cannot"
            | "without"
            | "nothing"
    )
}

fn clean_set<I, S>(items: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lx() -> &'static Lexicon {
        Lexicon::embedded()
    }

    #[test]
    fn no_hits_is_neutral_zero() {
        let v = lx().score("it's okay i guess");
        assert_eq!(v.label, SentimentLabel::Neutral);
        assert_eq!(v.score, 0.0);
        assert_eq!((v.positive_hits, v.negative_hits), (0, 0));
    }

    #[test]
    fn counts_every_occurrence() {
        let v = lx().score("excellent excellent, amazing!");
        assert_eq!(v.positive_hits, 3);
        assert_eq!(v.negative_hits, 0);
        assert_eq!(v.score, 1.0);
        assert_eq!(v.label, SentimentLabel::Positive);
        assert_eq!(v.hit_margin(), 3);
    }

    #[test]
    fn mixed_hits_give_fractional_score() {
        // 2 positive, 1 negative → 1/3
        let v = lx().score("good and nice but slow");
        assert!((v.score - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(v.label, SentimentLabel::Positive);
    }

    #[test]
    fn balanced_hits_are_neutral() {
        let v = lx().score("good but broken");
        assert_eq!(v.score, 0.0);
        assert_eq!(v.label, SentimentLabel::Neutral);
    }

    #[test]
    fn negation_flips_polarity() {
        let v = lx().score("disappointed with the product, not good quality");
        assert_eq!((v.positive_hits, v.negative_hits), (0, 2));
        assert_eq!(v.label, SentimentLabel::Negative);

        let v = lx().score("no problem at all");
        assert_eq!((v.positive_hits, v.negative_hits), (1, 0));
    }

    #[test]
    fn negation_window_is_three_tokens() {
        let v = lx().score("not at all really good");
        assert_eq!(v.positive_hits, 1, "negator four tokens back must not apply");
    }

    #[test]
    fn negation_stops_at_clause_breaks() {
        let v = lx().score("no complaints, excellent product");
        assert_eq!((v.positive_hits, v.negative_hits), (1, 0));
        assert_eq!(v.label, SentimentLabel::Positive);

        for text in ["not sure. great phone", "never again! good though", "no; excellent"] {
            let v = lx().score(text);
            assert_eq!(v.negative_hits, 0, "{text}");
            assert_eq!(v.positive_hits, 1, "{text}");
        }

        let v = lx().score("works fine, not good though");
        assert_eq!(v.negative_hits, 1, "negation inside a later clause still applies");
    }

    #[test]
    fn thresholds_are_exclusive() {
        assert_eq!(label_for_score(0.1), SentimentLabel::Neutral);
        assert_eq!(label_for_score(0.11), SentimentLabel::Positive);
        assert_eq!(label_for_score(-0.1), SentimentLabel::Neutral);
        assert_eq!(label_for_score(-0.11), SentimentLabel::Negative);
    }

    #[test]
    fn rejects_overlapping_lists() {
        assert!(Lexicon::from_words(["good"], ["good"]).is_err());
        assert!(Lexicon::from_words(Vec::<String>::new(), ["bad"]).is_err());
    }

    #[test]
    fn custom_lexicon_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("lex.json");
        fs::write(&p, r#"{"positive":[" Shiny "],"negative":["dull"]}"#).unwrap();
        let lex = Lexicon::load_from_file(&p).unwrap();
        assert_eq!(lex.len(), 2);
        assert_eq!(lex.score("so shiny").label, SentimentLabel::Positive);
        assert_eq!(lex.score("great").label, SentimentLabel::Neutral);
    }
}
