// tests/analyzer_config.rs
mod common;

use common::{CwdGuard, EnvSnapshot};
use review_sentiment_analyzer::AnalyzerConfig;
use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs};

const KEYS: [&str; 3] = [
    "REVIEW_ANALYZER_CONFIG",
    "REVIEW_MODEL_DIR",
    "REVIEW_INFERENCE_TIMEOUT_MS",
];

fn clear_env() -> EnvSnapshot {
    EnvSnapshot::set(&KEYS.map(|k| (k, None::<&str>)))
}

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("analyzer.toml");
    fs::write(
        &p_toml,
        r#"
model_dir = "models/reviews"
inference_timeout_ms = 750
max_concurrency = 0
"#,
    )
    .unwrap();
    let cfg = AnalyzerConfig::load_from_file(&p_toml).unwrap();
    assert_eq!(cfg.model_dir, Some(PathBuf::from("models/reviews")));
    assert_eq!(cfg.inference_timeout(), Some(Duration::from_millis(750)));
    assert_eq!(cfg.max_concurrency, 1);

    let p_json = dir.path().join("analyzer.json");
    fs::write(&p_json, r#"{"min_review_chars": 10, "duplicate_similarity": -0.5}"#).unwrap();
    let cfg = AnalyzerConfig::load_from_file(&p_json).unwrap();
    assert_eq!(cfg.min_review_chars, 10);
    assert_eq!(cfg.duplicate_similarity, Some(0.0));
    assert_eq!(cfg.model_dir, None);
}

#[test]
fn malformed_file_is_an_error_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("analyzer.toml");
    fs::write(&p, "inference_timeout_ms = \"soon\"").unwrap();
    let err = AnalyzerConfig::load_from_file(&p).unwrap_err();
    assert!(format!("{err:#}").contains("analyzer.toml"));
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    let _env = clear_env();
    // Isolate CWD so the test never reads a real config/ directory.
    let tmp = tempfile::tempdir().unwrap();
    let _cwd = CwdGuard::enter(tmp.path());

    // 1) nothing anywhere → defaults
    assert_eq!(AnalyzerConfig::load_default().unwrap(), AnalyzerConfig::default());

    // 2) JSON fallback
    fs::create_dir_all("config").unwrap();
    fs::write("config/analyzer.json", r#"{"max_concurrency": 3}"#).unwrap();
    assert_eq!(AnalyzerConfig::load_default().unwrap().max_concurrency, 3);

    // 3) TOML wins over JSON
    fs::write("config/analyzer.toml", "max_concurrency = 5").unwrap();
    assert_eq!(AnalyzerConfig::load_default().unwrap().max_concurrency, 5);

    // 4) explicit env path wins over both
    let custom = tmp.path().join("custom.json");
    fs::write(&custom, r#"{"max_concurrency": 7}"#).unwrap();
    env::set_var("REVIEW_ANALYZER_CONFIG", &custom);
    assert_eq!(AnalyzerConfig::load_default().unwrap().max_concurrency, 7);

    // 5) env path to nowhere is an error
    env::set_var("REVIEW_ANALYZER_CONFIG", tmp.path().join("missing.toml"));
    assert!(AnalyzerConfig::load_default().is_err());
}

#[serial_test::serial]
#[test]
fn cwd_is_restored_when_a_config_assertion_fails() {
    let before = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let inside = tmp.path().to_path_buf();

    let outcome = std::panic::catch_unwind(move || {
        let _cwd = CwdGuard::enter(&inside);
        assert_eq!(AnalyzerConfig::load_default().unwrap().max_concurrency, 0);
    });

    assert!(outcome.is_err());
    assert_eq!(env::current_dir().unwrap(), before);
}

#[serial_test::serial]
#[test]
fn env_overrides_apply_after_file() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("analyzer.toml");
    fs::write(&p, "model_dir = \"from-file\"\ninference_timeout_ms = 100").unwrap();

    let _env = EnvSnapshot::set(&[
        ("REVIEW_ANALYZER_CONFIG", Some(p.to_str().unwrap())),
        ("REVIEW_MODEL_DIR", Some("from-env")),
        ("REVIEW_INFERENCE_TIMEOUT_MS", Some("0")),
    ]);
    let cfg = AnalyzerConfig::load_default().unwrap();
    assert_eq!(cfg.model_dir, Some(PathBuf::from("from-env")));
    assert_eq!(cfg.inference_timeout(), None);

    // garbage timeout keeps the file value; blank model dir disables the model
    let _env = EnvSnapshot::set(&[
        ("REVIEW_MODEL_DIR", Some("  ")),
        ("REVIEW_INFERENCE_TIMEOUT_MS", Some("fast")),
    ]);
    let cfg = AnalyzerConfig::load_default().unwrap();
    assert_eq!(cfg.model_dir, None);
    assert_eq!(cfg.inference_timeout_ms, 100);
}
