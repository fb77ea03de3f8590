//! Run configuration.
//!
//! Defaults reproduce the classic behaviour: read `w0rds*.txt` from the
//! current directory, batches of 300, five retries, results in the current
//! directory. `main` overrides fields from CLI flags / `WORD_RANKER_*`
//! environment variables and then calls [`Config::validate`].

use std::path::PathBuf;
use std::time::Duration;

use crate::client::TransportRetryPolicy;
use crate::controller::ControllerSettings;
use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory scanned for word files. Default: `.`.
    pub input_dir: PathBuf,

    /// Word files must start with this and end with `.txt`. Default: `w0rds`.
    pub file_prefix: String,

    /// Words per scoring request. Default: `300`.
    pub batch_size: usize,

    /// Re-requests of a batch after malformed responses. Default: `5`.
    pub max_retries: u32,

    /// Estimated dollars per accepted call. Default: `0.003`.
    pub cost_per_call: f64,

    /// Reject responses whose scores are not numeric. Default: off.
    pub strict: bool,

    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
    pub request_timeout: Duration,

    /// Extra attempts for transport failures. Default: `0` (a transport
    /// failure ends the run).
    pub transport_retries: u32,

    pub results_path: PathBuf,
    pub failed_log_path: PathBuf,
    pub ledger_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            file_prefix: "w0rds".to_string(),
            batch_size: 300,
            max_retries: 5,
            cost_per_call: 0.003,
            strict: false,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(120),
            transport_retries: 0,
            results_path: PathBuf::from("sorted_words_scores.txt"),
            failed_log_path: PathBuf::from("failed_batches.log"),
            ledger_path: PathBuf::from("scoring_runs.csv"),
        }
    }
}

impl Config {
    /// Checks invariants the pipeline relies on (does not touch the network).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize { value: self.batch_size });
        }

        if !self.cost_per_call.is_finite() || self.cost_per_call < 0.0 {
            return Err(ConfigError::InvalidCost { value: self.cost_per_call });
        }

        if !self.input_dir.is_dir() {
            return Err(ConfigError::NotADirectory { path: self.input_dir.clone() });
        }

        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(()),
            _ => Err(ConfigError::MissingSetting { name: "OPENAI_API_KEY" }),
        }
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            batch_size: self.batch_size,
            max_retries: self.max_retries,
            cost_per_call: self.cost_per_call,
            strict: self.strict,
        }
    }

    pub fn retry_policy(&self) -> TransportRetryPolicy {
        TransportRetryPolicy {
            max_retries: self.transport_retries,
            ..Default::default()
        }
    }
}
