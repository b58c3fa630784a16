// tests/common/mod.rs
#![allow(dead_code)]

use review_sentiment_analyzer::{AnalyzerConfig, RawReview};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::{env, fs};

/// Tokens the test artifact knows about, with (negative, neutral, positive) weights.
const VOCAB: &[(&str, [f32; 3])] = &[
    ("[PAD]", [0.0, 0.0, 0.0]),
    ("[UNK]", [0.0, 0.0, 0.0]),
    ("[CLS]", [0.0, 0.0, 0.0]),
    ("[SEP]", [0.0, 0.0, 0.0]),
    ("excellent", [0.0, 0.0, 2.5]),
    ("amazing", [0.0, 0.0, 2.5]),
    ("great", [0.0, 0.0, 2.0]),
    ("recommend", [0.0, 0.0, 2.0]),
    ("terrible", [2.5, 0.0, 0.0]),
    ("broke", [2.0, 0.0, 0.0]),
    ("awful", [2.5, 0.0, 0.0]),
    ("okay", [0.0, 1.0, 0.0]),
];

/// Write a small but valid classifier artifact into `dir`.
pub fn write_artifact(dir: &Path, max_length: usize) {
    let vocab: serde_json::Map<String, serde_json::Value> = VOCAB
        .iter()
        .enumerate()
        .map(|(id, (tok, _))| (tok.to_string(), json!(id)))
        .collect();
    let rows: Vec<Vec<f32>> = (0..3)
        .map(|class| VOCAB.iter().map(|(_, w)| w[class]).collect())
        .collect();

    fs::write(
        dir.join("config.json"),
        json!({ "labels": ["negative", "neutral", "positive"], "max_length": max_length, "lowercase": true })
            .to_string(),
    )
    .unwrap();
    fs::write(dir.join("tokenizer.json"), json!({ "vocab": vocab }).to_string()).unwrap();
    fs::write(
        dir.join("weights.json"),
        json!({ "weights": rows, "bias": [0.0, 0.5, 0.0] }).to_string(),
    )
    .unwrap();
}

pub fn config_for(model_dir: &Path) -> AnalyzerConfig {
    AnalyzerConfig {
        model_dir: Some(model_dir.to_path_buf()),
        ..Default::default()
    }
}

pub fn reviews(texts: &[&str]) -> Vec<RawReview> {
    texts.iter().map(|t| RawReview::from_text(*t)).collect()
}

/// Sets/removes env vars for the lifetime of the guard.
pub struct EnvSnapshot {
    saved: Vec<(String, Option<String>)>,
}

impl EnvSnapshot {
    /// Provide a list of (KEY, Some(VALUE)) to set, or (KEY, None) to remove.
    pub fn set(pairs: &[(&str, Option<&str>)]) -> Self {
        let mut saved = Vec::with_capacity(pairs.len());
        for (k, v) in pairs {
            saved.push((k.to_string(), env::var(k).ok()));
            match v {
                Some(val) => env::set_var(k, val),
                None => env::remove_var(k),
            }
        }
        Self { saved }
    }
}

impl Drop for EnvSnapshot {
    fn drop(&mut self) {
        for (k, maybe_v) in self.saved.drain(..) {
            match maybe_v {
                Some(v) => env::set_var(&k, v),
                None => env::remove_var(&k),
            }
        }
    }
}

/// Switches the process CWD and puts the old one back on drop, panics included.
/// Declare it after any tempdir it points into so it drops first.
pub struct CwdGuard {
    old: PathBuf,
}

impl CwdGuard {
    pub fn enter(path: &Path) -> Self {
        let old = env::current_dir().expect("current dir");
        env::set_current_dir(path).expect("enter dir");
        Self { old }
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.old);
    }
}
