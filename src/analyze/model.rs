//! Pre-trained three-class text classifier loaded from an artifact directory.
//!
//! Directory contract:
//! - `config.json`    : `{"labels": [...3 labels in class-index order], "max_length": 512, "lowercase": true}`
//! - `tokenizer.json` : `{"vocab": {token: id}, "unk_token", "pad_token", "cls_token", "sep_token"}`
//! - `weights.json`   : `{"weights": [[f32; vocab]; 3], "bias": [f32; 3]}`
//!
//! Inference: `[CLS] tokens… [SEP]` truncated and padded to `max_length`, then
//! logits = bias + Σ weights[class][id] over unmasked positions, softmax over classes.
//! The loaded model is read-only and shared across threads.

use crate::review::{ClassProbabilities, SentimentLabel};
use anyhow::{anyhow, bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

pub const DEFAULT_MAX_LENGTH: usize = 512;
pub const REQUIRED_FILES: [&str; 3] = ["config.json", "tokenizer.json", "weights.json"];

/// Anything that turns cleaned text into three class probabilities.
/// Implementations must be stateless per call; the pipeline calls them concurrently.
pub trait SentimentModel: Send + Sync {
    fn predict(&self, text: &str) -> Result<ClassProbabilities>;

    /// Short identifier for logs.
    fn name(&self) -> &str;
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}
fn default_true() -> bool {
    true
}
fn default_unk() -> String {
    "[UNK]".to_string()
}
fn default_pad() -> String {
    "[PAD]".to_string()
}
fn default_cls() -> String {
    "[CLS]".to_string()
}
fn default_sep() -> String {
    "[SEP]".to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    labels: Vec<String>,
    #[serde(default = "default_max_length")]
    max_length: usize,
    #[serde(default = "default_true")]
    lowercase: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct TokenizerFile {
    vocab: HashMap<String, u32>,
    #[serde(default = "default_unk")]
    unk_token: String,
    #[serde(default = "default_pad")]
    pad_token: String,
    #[serde(default = "default_cls")]
    cls_token: String,
    #[serde(default = "default_sep")]
    sep_token: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WeightsFile {
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

/// Fixed-length model input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding {
    pub ids: Vec<u32>,
    pub attention_mask: Vec<u8>,
}

impl Encoding {
    /// Positions that take part in inference.
    pub fn active_len(&self) -> usize {
        self.attention_mask.iter().filter(|m| **m == 1).count()
    }
}

/// Bag-of-tokens linear classifier read from an artifact directory.
#[derive(Debug, Clone)]
pub struct LinearModel {
    name: String,
    max_length: usize,
    lowercase: bool,
    vocab: HashMap<String, u32>,
    unk_id: u32,
    pad_id: u32,
    cls_id: Option<u32>,
    sep_id: Option<u32>,
    /// Label of each class row, in artifact order.
    class_order: [SentimentLabel; 3],
    weights: [Vec<f32>; 3],
    bias: [f32; 3],
}

static RE_PRETOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?u)\w+(?:'\w+)?|[^\w\s]").expect("pretoken regex"));

impl LinearModel {
    /// Load and validate an artifact directory.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            bail!("model path not found or not a directory: {}", dir.display());
        }
        let missing: Vec<&str> = REQUIRED_FILES
            .iter()
            .copied()
            .filter(|f| !dir.join(f).is_file())
            .collect();
        if !missing.is_empty() {
            bail!("missing model files in {}: {:?}", dir.display(), missing);
        }

        let config: ConfigFile = read_json(&dir.join("config.json"))?;
        let tokenizer: TokenizerFile = read_json(&dir.join("tokenizer.json"))?;
        let weights: WeightsFile = read_json(&dir.join("weights.json"))?;

        let name = dir
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("model")
            .to_string();
        Self::from_parts(name, config, tokenizer, weights)
            .with_context(|| format!("invalid model artifact in {}", dir.display()))
    }

    fn from_parts(
        name: String,
        config: ConfigFile,
        tokenizer: TokenizerFile,
        weights: WeightsFile,
    ) -> Result<Self> {
        let class_order = parse_labels(&config.labels)?;

        if config.max_length < 2 {
            bail!("max_length must be at least 2, got {}", config.max_length);
        }
        if tokenizer.vocab.is_empty() {
            bail!("tokenizer vocab is empty");
        }
        let lookup = |tok: &str| tokenizer.vocab.get(tok).copied();
        let unk_id = lookup(&tokenizer.unk_token)
            .ok_or_else(|| anyhow!("unk token {:?} not in vocab", tokenizer.unk_token))?;
        let pad_id = lookup(&tokenizer.pad_token)
            .ok_or_else(|| anyhow!("pad token {:?} not in vocab", tokenizer.pad_token))?;
        let cls_id = lookup(&tokenizer.cls_token);
        let sep_id = lookup(&tokenizer.sep_token);

        let vocab_size = tokenizer.vocab.values().copied().max().unwrap_or(0) as usize + 1;
        if weights.weights.len() != 3 || weights.bias.len() != 3 {
            bail!(
                "expected 3 weight rows and 3 biases, got {} and {}",
                weights.weights.len(),
                weights.bias.len()
            );
        }
        for (i, row) in weights.weights.iter().enumerate() {
            if row.len() < vocab_size {
                bail!("weight row {i} has {} entries, vocab needs {vocab_size}", row.len());
            }
            if row.iter().any(|w| !w.is_finite()) {
                bail!("weight row {i} contains non-finite values");
            }
        }
        if weights.bias.iter().any(|b| !b.is_finite()) {
            bail!("bias contains non-finite values");
        }

        let WeightsFile { weights, bias } = weights;
        let mut rows = weights.into_iter();
        let (Some(w0), Some(w1), Some(w2)) = (rows.next(), rows.next(), rows.next()) else {
            bail!("expected 3 weight rows");
        };

        Ok(Self {
            name,
            max_length: config.max_length,
            lowercase: config.lowercase,
            vocab: tokenizer.vocab,
            unk_id,
            pad_id,
            cls_id,
            sep_id,
            class_order,
            weights: [w0, w1, w2],
            bias: [bias[0], bias[1], bias[2]],
        })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Tokenize, wrap in `[CLS]`/`[SEP]` when the vocab has them, truncate to
    /// `max_length` and pad the rest. Always returns exactly `max_length` ids.
    pub fn encode(&self, text: &str) -> Encoding {
        let folded;
        let text = if self.lowercase {
            folded = text.to_lowercase();
            folded.as_str()
        } else {
            text
        };

        let specials = usize::from(self.cls_id.is_some()) + usize::from(self.sep_id.is_some());
        let budget = self.max_length.saturating_sub(specials);

        let mut ids = Vec::with_capacity(self.max_length);
        ids.extend(self.cls_id);
        ids.extend(
            RE_PRETOKEN
                .find_iter(text)
                .take(budget)
                .map(|m| self.vocab.get(m.as_str()).copied().unwrap_or(self.unk_id)),
        );
        ids.extend(self.sep_id);

        let active = ids.len();
        ids.resize(self.max_length, self.pad_id);
        let mut attention_mask = vec![1u8; active];
        attention_mask.resize(self.max_length, 0);

        Encoding {
            ids,
            attention_mask,
        }
    }

    fn logits(&self, enc: &Encoding) -> Result<[f32; 3]> {
        let mut logits = self.bias;
        for (id, mask) in enc.ids.iter().zip(&enc.attention_mask) {
            if *mask == 0 {
                continue;
            }
            let idx = *id as usize;
            for (class, row) in self.weights.iter().enumerate() {
                let w = row
                    .get(idx)
                    .ok_or_else(|| anyhow!("token id {idx} outside weight row"))?;
                logits[class] += w;
            }
        }
        Ok(logits)
    }
}

impl SentimentModel for LinearModel {
    fn predict(&self, text: &str) -> Result<ClassProbabilities> {
        let enc = self.encode(text);
        let probs = softmax(self.logits(&enc)?)?;

        let mut out = ClassProbabilities::default();
        for (label, p) in self.class_order.iter().zip(probs) {
            match label {
                SentimentLabel::Negative => out.negative = p,
                SentimentLabel::Neutral => out.neutral = p,
                SentimentLabel::Positive => out.positive = p,
            }
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Numerically stable softmax over three logits.
fn softmax(logits: [f32; 3]) -> Result<[f32; 3]> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps = logits.map(|l| (l - max).exp());
    let sum: f32 = exps.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        bail!("softmax diverged for logits {logits:?}");
    }
    Ok(exps.map(|e| e / sum))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn parse_labels(labels: &[String]) -> Result<[SentimentLabel; 3]> {
    if labels.len() != 3 {
        bail!("expected exactly 3 labels, got {}", labels.len());
    }
    let parsed: Vec<SentimentLabel> = labels
        .iter()
        .map(|l| l.parse())
        .collect::<Result<_>>()?;
    let distinct: HashSet<SentimentLabel> = parsed.iter().copied().collect();
    if distinct.len() != 3 {
        bail!("labels must name negative, neutral and positive once each: {labels:?}");
    }
    Ok([parsed[0], parsed[1], parsed[2]])
}
