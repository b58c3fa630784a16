// src/config/analyzer.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};
use tracing::{info, warn};

pub const ENV_CONFIG_PATH: &str = "REVIEW_ANALYZER_CONFIG";
pub const ENV_MODEL_DIR: &str = "REVIEW_MODEL_DIR";
pub const ENV_INFERENCE_TIMEOUT_MS: &str = "REVIEW_INFERENCE_TIMEOUT_MS";

pub const DEFAULT_CONFIG_TOML: &str = "config/analyzer.toml";
pub const DEFAULT_CONFIG_JSON: &str = "config/analyzer.json";

const DEFAULT_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_MAX_CONCURRENCY: usize = 8;
const DEFAULT_MIN_REVIEW_CHARS: usize = 3;

/// Runtime settings for `ReviewAnalyzer`. Every field has a default, so a partial
/// file (or none at all) is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Classifier artifact directory; `None` means lexicon-only.
    pub model_dir: Option<PathBuf>,
    /// Per-review inference budget; 0 disables the deadline.
    pub inference_timeout_ms: u64,
    pub max_concurrency: usize,
    /// Reviews with fewer non-whitespace chars after cleaning are dropped.
    pub min_review_chars: usize,
    /// Keyword lexicon override (JSON `{"positive": [...], "negative": [...]}`).
    pub lexicon_path: Option<PathBuf>,
    /// Enables near-duplicate suppression at this similarity (0..=1).
    pub duplicate_similarity: Option<f32>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            inference_timeout_ms: DEFAULT_TIMEOUT_MS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            min_review_chars: DEFAULT_MIN_REVIEW_CHARS,
            lexicon_path: None,
            duplicate_similarity: None,
        }
    }
}

impl AnalyzerConfig {
    /// Load from an explicit TOML or JSON file (chosen by extension, then by content).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading analyzer config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let mut cfg = parse(&data, &ext)
            .with_context(|| format!("parsing analyzer config {}", path.display()))?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Resolve config using env var + fallbacks, then apply env overrides:
    /// 1) $REVIEW_ANALYZER_CONFIG
    /// 2) config/analyzer.toml
    /// 3) config/analyzer.json
    /// 4) defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_CONFIG_TOML).exists() {
            Self::load_from_file(DEFAULT_CONFIG_TOML)?
        } else if Path::new(DEFAULT_CONFIG_JSON).exists() {
            Self::load_from_file(DEFAULT_CONFIG_JSON)?
        } else {
            Self::default()
        };

        cfg.apply_env_overrides();
        cfg.sanitize();
        info!(
            target: "config",
            model_dir = ?cfg.model_dir,
            timeout_ms = cfg.inference_timeout_ms,
            max_concurrency = cfg.max_concurrency,
            "analyzer config resolved"
        );
        Ok(cfg)
    }

    /// `REVIEW_MODEL_DIR` and `REVIEW_INFERENCE_TIMEOUT_MS` win over file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var(ENV_MODEL_DIR) {
            let dir = dir.trim();
            self.model_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
        }
        if let Ok(raw) = env::var(ENV_INFERENCE_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.inference_timeout_ms = ms,
                Err(_) => warn!(
                    target: "config",
                    value = %raw,
                    "ignoring non-numeric {ENV_INFERENCE_TIMEOUT_MS}"
                ),
            }
        }
    }

    /// Clamp out-of-range values instead of failing.
    pub fn sanitize(&mut self) {
        if self.max_concurrency == 0 {
            self.max_concurrency = 1;
        }
        if let Some(sim) = self.duplicate_similarity {
            self.duplicate_similarity = if sim.is_finite() {
                Some(sim.clamp(0.0, 1.0))
            } else {
                None
            };
        }
    }

    pub fn inference_timeout(&self) -> Option<Duration> {
        (self.inference_timeout_ms > 0).then(|| Duration::from_millis(self.inference_timeout_ms))
    }
}

fn parse(data: &str, hint_ext: &str) -> Result<AnalyzerConfig> {
    match hint_ext {
        "toml" => Ok(toml::from_str(data)?),
        "json" => Ok(serde_json::from_str(data)?),
        _ => serde_json::from_str(data)
            .or_else(|_| toml::from_str(data))
            .map_err(|e| anyhow!("unsupported analyzer config format: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = parse("inference_timeout_ms = 250\nmodel_dir = \"models/rev\"", "toml").unwrap();
        assert_eq!(cfg.inference_timeout_ms, 250);
        assert_eq!(cfg.model_dir, Some(PathBuf::from("models/rev")));
        assert_eq!(cfg.min_review_chars, DEFAULT_MIN_REVIEW_CHARS);
        assert_eq!(cfg.max_concurrency, DEFAULT_MAX_CONCURRENCY);
    }

    #[test]
    fn json_without_extension_hint() {
        let cfg = parse(r#"{"max_concurrency": 2, "duplicate_similarity": 0.9}"#, "").unwrap();
        assert_eq!(cfg.max_concurrency, 2);
        assert_eq!(cfg.duplicate_similarity, Some(0.9));
    }

    #[test]
    fn sanitize_clamps() {
        let mut cfg = AnalyzerConfig {
            max_concurrency: 0,
            duplicate_similarity: Some(1.7),
            ..Default::default()
        };
        cfg.sanitize();
        assert_eq!(cfg.max_concurrency, 1);
        assert_eq!(cfg.duplicate_similarity, Some(1.0));

        cfg.duplicate_similarity = Some(f32::NAN);
        cfg.sanitize();
        assert_eq!(cfg.duplicate_similarity, None);
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let cfg = AnalyzerConfig {
            inference_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(cfg.inference_timeout(), None);
        assert_eq!(
            AnalyzerConfig::default().inference_timeout(),
            Some(Duration::from_millis(DEFAULT_TIMEOUT_MS))
        );
    }

    #[test]
    fn load_from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("analyzer.toml");
        fs::write(&p, "min_review_chars = 5\nmax_concurrency = 0").unwrap();
        let cfg = AnalyzerConfig::load_from_file(&p).unwrap();
        assert_eq!(cfg.min_review_chars, 5);
        assert_eq!(cfg.max_concurrency, 1);
    }
}
