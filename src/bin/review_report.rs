//! Builds a sentiment report from a JSON file of reviews (or stdin) and prints it.
//!
//! Usage: review_report [--config PATH] [REVIEWS.json]
//!
//! Input is a JSON array of review objects (`{"text": ..., "rating": ...}`) or of
//! plain strings. Logs go to stderr; stdout carries only the report.

use anyhow::{bail, Context, Result};
use review_sentiment_analyzer::{parse_review_batch, AnalyzerConfig, RawReview, ReviewAnalyzer};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    input: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = it.next().context("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--help" | "-h" => {
                eprintln!("usage: review_report [--config PATH] [REVIEWS.json]");
                std::process::exit(0);
            }
            other if other.starts_with('-') => bail!("unknown flag {other}"),
            other => {
                if args.input.is_some() {
                    bail!("only one input file is accepted");
                }
                args.input = Some(PathBuf::from(other));
            }
        }
    }
    Ok(args)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("review_sentiment_analyzer=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn read_reviews(input: Option<&PathBuf>) -> Result<Vec<RawReview>> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading reviews from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading reviews from stdin")?;
            buf
        }
    };
    parse_review_batch(&raw)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Picks up REVIEW_MODEL_DIR etc. from .env in local runs.
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => {
            let mut cfg = AnalyzerConfig::load_from_file(path)?;
            cfg.apply_env_overrides();
            cfg.sanitize();
            cfg
        }
        None => AnalyzerConfig::load_default()?,
    };

    let analyzer = ReviewAnalyzer::from_config(config)?;
    let reviews = read_reviews(args.input.as_ref())?;
    let report = analyzer.build_report(&reviews).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
