//! Batch retry controller.
//!
//! Each batch goes `PENDING -> REQUESTED -> {ACCEPTED | RETRY | EXHAUSTED}`.
//! All mutable run state lives in [`RunState`], which [`process_batch`] takes
//! and hands back, so one transition can be driven and inspected on its own.
//! Batches are strictly sequential.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::client::ScoringService;
use crate::error::ServiceError;
use crate::prompt::build_prompt;
use crate::ranker::WordScores;
use crate::response::parse_response;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    pub batch_size: usize,
    /// Re-requests allowed after the first malformed response.
    pub max_retries: u32,
    /// Estimated dollars per accepted call.
    pub cost_per_call: f64,
    pub strict: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            batch_size: 300,
            max_retries: 5,
            cost_per_call: 0.003,
            strict: false,
        }
    }
}

/// A batch that never produced a valid response, with the last prompt sent.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedBatch {
    pub words: Vec<String>,
    pub prompt: String,
}

#[derive(Debug, Clone)]
pub struct Telemetry {
    /// Accepted responses. Drives the cost estimate.
    pub api_calls: u64,
    /// Every request sent, including ones whose response was rejected.
    pub requests: u64,
    started: Instant,
}

impl Telemetry {
    fn new() -> Self {
        Self {
            api_calls: 0,
            requests: 0,
            started: Instant::now(),
        }
    }

    pub fn estimated_cost(&self, cost_per_call: f64) -> f64 {
        self.api_calls as f64 * cost_per_call
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

pub fn progress_line(
    processed: usize,
    total: usize,
    api_calls: u64,
    estimated_cost: f64,
    elapsed: Duration,
) -> String {
    format!(
        "Processed {} out of {} words. API calls made: {}. Estimated cost: ${:.2}. Elapsed time: {:.2} seconds.",
        processed,
        total,
        api_calls,
        estimated_cost,
        elapsed.as_secs_f64()
    )
}

#[derive(Debug, Clone)]
pub struct RunState {
    /// Start of the batch currently being worked on.
    pub offset: usize,
    /// Malformed responses seen so far for the current batch.
    pub retries: u32,
    pub scores: WordScores,
    pub failed: Vec<FailedBatch>,
    pub telemetry: Telemetry,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            offset: 0,
            retries: 0,
            scores: WordScores::new(),
            failed: Vec::new(),
            telemetry: Telemetry::new(),
        }
    }

    pub fn is_done(&self, total_words: usize) -> bool {
        self.offset >= total_words
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened to the batch at the offset on one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// Response validated and merged. `pairs` lines were parsed.
    Accepted { pairs: usize },
    /// Response rejected, the same batch will be requested again.
    Retry { attempt: u32 },
    /// Retry budget spent. The batch was recorded and skipped.
    Exhausted,
}

/// Performs one request for the batch at `state.offset`.
///
/// A service error is returned as-is and ends the run; only malformed
/// responses are retried here.
pub fn process_batch<S: ScoringService + ?Sized>(
    mut state: RunState,
    words: &[String],
    compare_phrase: &str,
    service: &S,
    settings: &ControllerSettings,
) -> Result<(RunState, BatchOutcome), ServiceError> {
    let start = state.offset.min(words.len());
    let end = (start + settings.batch_size).min(words.len());
    let batch = &words[start..end];

    let prompt = build_prompt(compare_phrase, batch);
    state.telemetry.requests += 1;
    let response = service.complete(&prompt)?;

    match parse_response(&response, settings.strict) {
        Ok(pairs) => {
            let count = pairs.len();
            for pair in pairs {
                state.scores.insert(pair.word, pair.raw_score);
            }
            state.telemetry.api_calls += 1;
            state.retries = 0;
            state.offset += settings.batch_size;
            debug!(offset = start, batch_len = batch.len(), pairs = count, "Batch accepted");
            Ok((state, BatchOutcome::Accepted { pairs: count }))
        }
        Err(reason) if state.retries < settings.max_retries => {
            state.retries += 1;
            warn!(offset = start, attempt = state.retries, %reason, "Unexpected response format. Retrying...");
            let attempt = state.retries;
            Ok((state, BatchOutcome::Retry { attempt }))
        }
        Err(reason) => {
            warn!(offset = start, batch_len = batch.len(), %reason, "Maximum retries reached. Skipping this batch.");
            state.failed.push(FailedBatch {
                words: batch.to_vec(),
                prompt,
            });
            state.retries = 0;
            state.offset += settings.batch_size;
            Ok((state, BatchOutcome::Exhausted))
        }
    }
}

/// Drives every batch to completion and returns the final state.
///
/// Prints a progress line to stdout after each accepted batch.
pub fn run_pipeline<S: ScoringService + ?Sized>(
    words: &[String],
    compare_phrase: &str,
    service: &S,
    settings: &ControllerSettings,
) -> Result<RunState, ServiceError> {
    let total = words.len();
    let mut state = RunState::new();

    while !state.is_done(total) {
        let batch_start = state.offset;
        let (next, outcome) = process_batch(state, words, compare_phrase, service, settings)?;
        state = next;

        if let BatchOutcome::Accepted { .. } = outcome {
            println!(
                "{}",
                progress_line(
                    (batch_start + settings.batch_size).min(total),
                    total,
                    state.telemetry.api_calls,
                    state.telemetry.estimated_cost(settings.cost_per_call),
                    state.telemetry.elapsed(),
                )
            );
        }
    }

    Ok(state)
}
