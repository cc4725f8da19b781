//! Batch debate evaluation CLI.
//!
//! Loads a JSONL dataset of question/answer records, runs one
//! multi-agent debate per question against a chat-completion endpoint,
//! and reports how many final answers matched the ground truth.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use debate::{
    load_jsonl, slice, BatchRunner, DebateConfig, OpenAiBackend, PromptTemplates, RunnerConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSONL dataset of {"question", "answer"} records
    #[arg(short = 'i', long)]
    input_file: PathBuf,

    /// Directory to write results.json into (stdout summary only if unset)
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// API key for the completion endpoint (falls back to OPENAI_API_KEY)
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// Model served by the completion endpoint
    #[arg(short = 'm', long, default_value = "gpt-3.5-turbo")]
    model_name: String,

    /// Sampling temperature
    #[arg(short = 't', long, default_value_t = 0.0)]
    temperature: f32,

    /// Nucleus sampling cutoff (0 leaves the endpoint default)
    #[arg(short = 'p', long, default_value_t = 0.0)]
    top_p: f32,

    /// Index of the first dataset item to evaluate
    #[arg(short = 's', long, default_value_t = 0)]
    start: usize,

    /// Number of items to evaluate (0 = all remaining)
    #[arg(short = 'n', long, default_value_t = 0)]
    number: usize,

    /// Maximum debate rounds, opening included
    #[arg(long, default_value_t = 3)]
    max_round: u32,

    /// Delay in seconds before each generation call
    #[arg(long, default_value_t = 0.0, value_parser = non_negative_secs)]
    sleep_secs: f64,

    /// JSON file holding {"megaprompt": "..."} to extend debater instructions
    #[arg(long)]
    mega: Option<PathBuf>,

    /// Wrap each question in the persona/format framing
    #[arg(long, default_value_t = false)]
    pre_post: bool,

    /// JSON file overriding the built-in prompt templates
    #[arg(long)]
    templates: Option<PathBuf>,
}

/// `Duration::from_secs_f64` panics on negative or non-finite input,
/// so reject those at the flag boundary.
fn non_negative_secs(s: &str) -> Result<f64, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err("delay must be a non-negative number of seconds".to_string());
    }
    Ok(secs)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let api_key = match args.api_key {
        Some(key) => key,
        None => std::env::var("OPENAI_API_KEY")
            .context("no API key given and OPENAI_API_KEY is not set")?,
    };

    let items = load_jsonl(&args.input_file)
        .with_context(|| format!("failed to load {}", args.input_file.display()))?;
    let window = slice(&items, args.start, args.number);
    info!(
        total = items.len(),
        selected = window.len(),
        start = args.start,
        "dataset loaded"
    );

    let templates = match &args.templates {
        Some(path) => PromptTemplates::from_json_file(path)
            .with_context(|| format!("failed to load templates from {}", path.display()))?,
        None => PromptTemplates::default(),
    };

    let mega = match &args.mega {
        Some(path) => Some(
            PromptTemplates::load_megaprompt(path)
                .with_context(|| format!("failed to load megaprompt from {}", path.display()))?,
        ),
        None => None,
    };

    let config = RunnerConfig {
        debate: DebateConfig {
            model: args.model_name,
            temperature: args.temperature,
            top_p: args.top_p,
            max_round: args.max_round,
            sleep: Duration::from_secs_f64(args.sleep_secs),
        },
        mega,
        frame_topics: args.pre_post,
    };

    let backend = Arc::new(OpenAiBackend::new(api_key));
    let runner = BatchRunner::new(backend, templates, config);
    let ledger = runner.run(window).await;

    println!("{}", ledger.summary_line());

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join("results.json");
        let json = serde_json::to_string_pretty(&ledger)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "results written");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_sleep_rejected_at_parse() {
        let err = Args::try_parse_from(["debate-cli", "-i", "data.jsonl", "--sleep-secs=-1"])
            .unwrap_err();
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn test_non_finite_sleep_rejected() {
        assert!(non_negative_secs("NaN").is_err());
        assert!(non_negative_secs("inf").is_err());
        assert!(non_negative_secs("not a number").is_err());
    }

    #[test]
    fn test_valid_sleep_parses() {
        let args = Args::try_parse_from([
            "debate-cli",
            "-i",
            "data.jsonl",
            "--sleep-secs",
            "1.5",
        ])
        .unwrap();
        assert_eq!(args.sleep_secs, 1.5);
        assert_eq!(args.max_round, 3);
        assert_eq!(args.model_name, "gpt-3.5-turbo");
    }
}
