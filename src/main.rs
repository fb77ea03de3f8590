use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use word_ranker::client::{OpenAiClient, RetryingService};
use word_ranker::config::Config;
use word_ranker::controller::run_pipeline;
use word_ranker::dashboard;
use word_ranker::error::ConfigError;
use word_ranker::extractor::extract_words;
use word_ranker::ranker::rank;
use word_ranker::sink::{append_run_record, write_failed_batches, write_ranked, RunRecord};

/// Ranks candidate words by semantic similarity to a phrase.
#[derive(Parser, Debug)]
#[command(name = "word-ranker", version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Phrase to score against; prompted for when omitted
    #[arg(long, env = "WORD_RANKER_PHRASE")]
    phrase: Option<String>,

    /// Directory containing the word files
    #[arg(long, env = "WORD_RANKER_INPUT_DIR")]
    input_dir: Option<PathBuf>,

    /// File name prefix of word files (must also end in .txt)
    #[arg(long, env = "WORD_RANKER_PREFIX")]
    prefix: Option<String>,

    #[arg(long, env = "WORD_RANKER_BATCH_SIZE")]
    batch_size: Option<usize>,

    /// Re-requests allowed per batch after a malformed response
    #[arg(long, env = "WORD_RANKER_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Estimated dollars per accepted API call
    #[arg(long, env = "WORD_RANKER_COST_PER_CALL")]
    cost_per_call: Option<f64>,

    /// Also reject responses whose scores are not numbers
    #[arg(long, env = "WORD_RANKER_STRICT")]
    strict: bool,

    #[arg(long, env = "WORD_RANKER_MODEL")]
    model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "WORD_RANKER_API_BASE")]
    api_base: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "WORD_RANKER_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Retry network failures with backoff instead of aborting the run
    #[arg(long, env = "WORD_RANKER_TRANSPORT_RETRIES")]
    transport_retries: Option<u32>,

    /// Ranked results file
    #[arg(long, env = "WORD_RANKER_OUTPUT")]
    output: Option<PathBuf>,

    /// Log of batches that never got a valid response
    #[arg(long, env = "WORD_RANKER_FAILED_LOG")]
    failed_log: Option<PathBuf>,

    /// CSV ledger of completed runs
    #[arg(long, env = "WORD_RANKER_LEDGER")]
    ledger: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Browse past runs from the ledger
    Dashboard,
}

impl Args {
    fn into_config(self) -> Config {
        let defaults = Config::default();
        Config {
            input_dir: self.input_dir.unwrap_or(defaults.input_dir),
            file_prefix: self.prefix.unwrap_or(defaults.file_prefix),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            cost_per_call: self.cost_per_call.unwrap_or(defaults.cost_per_call),
            strict: self.strict || defaults.strict,
            api_base: self.api_base.unwrap_or(defaults.api_base),
            api_key: self.api_key.or(defaults.api_key),
            model: self.model.unwrap_or(defaults.model),
            request_timeout: self
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            transport_retries: self.transport_retries.unwrap_or(defaults.transport_retries),
            results_path: self.output.unwrap_or(defaults.results_path),
            failed_log_path: self.failed_log.unwrap_or(defaults.failed_log_path),
            ledger_path: self.ledger.unwrap_or(defaults.ledger_path),
        }
    }
}

fn read_phrase(from_args: Option<String>) -> anyhow::Result<String> {
    let phrase = match from_args {
        Some(phrase) => phrase,
        None => {
            print!("Please enter the compare phrase: ");
            io::stdout().flush()?;
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            input
        }
    };

    let phrase = phrase.trim_end_matches(['\r', '\n']).to_string();
    if phrase.trim().is_empty() {
        return Err(ConfigError::EmptyPhrase.into());
    }
    Ok(phrase)
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the prompt and progress lines
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("word_ranker=info")),
        )
        .with_writer(io::stderr)
        .init();

    let mut args = Args::parse();
    let command = args.command.take();
    let phrase_arg = args.phrase.take();
    let config = args.into_config();

    if let Some(Command::Dashboard) = command {
        return dashboard::run_dashboard(&config.ledger_path);
    }

    config.validate().context("Invalid configuration")?;
    let compare_phrase = read_phrase(phrase_arg)?;

    let words = extract_words(&config.input_dir, &config.file_prefix)?;
    info!(
        words = words.len(),
        dir = %config.input_dir.display(),
        prefix = %config.file_prefix,
        "Extracted candidate words"
    );
    if words.is_empty() {
        warn!("No candidate words found; results will be empty");
    }

    let api_key = config.api_key.clone().unwrap_or_default();
    let client = OpenAiClient::new(&config.api_base, api_key, config.model.clone(), config.request_timeout)
        .context("Failed to build scoring client")?;
    if config.transport_retries > 0 {
        info!(
            transport_retries = config.transport_retries,
            "Transport retries enabled: network failures are retried instead of ending the run"
        );
    }
    let service = RetryingService::new(client, config.retry_policy());

    let settings = config.controller_settings();
    let state = run_pipeline(&words, &compare_phrase, &service, &settings)
        .context("Scoring run aborted; no results were written")?;

    let ranked = rank(&state.scores);
    write_ranked(&config.results_path, &ranked)?;
    println!("Results saved to {}", config.results_path.display());

    if write_failed_batches(&config.failed_log_path, &state.failed)? {
        println!("Failed batches saved to {}", config.failed_log_path.display());
    }

    let now = Local::now();
    let record = RunRecord {
        run_id: now.format("%Y%m%d%H%M%S").to_string(),
        date: now.format("%Y-%m-%d").to_string(),
        phrase: compare_phrase,
        total_words: words.len(),
        scored_words: ranked.len(),
        failed_batches: state.failed.len(),
        api_calls: state.telemetry.api_calls,
        requests: state.telemetry.requests,
        estimated_cost: state.telemetry.estimated_cost(settings.cost_per_call),
        elapsed_secs: state.telemetry.elapsed().as_secs_f64(),
    };
    append_run_record(&config.ledger_path, &record)?;
    info!(
        scored = record.scored_words,
        failed_batches = record.failed_batches,
        requests = record.requests,
        ledger = %config.ledger_path.display(),
        "Run complete"
    );

    Ok(())
}
