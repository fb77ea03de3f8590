use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::controller::FailedBatch;
use crate::error::SinkError;
use crate::ranker::RankedEntry;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> SinkError + '_ {
    move |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes `word: raw_score` lines in rank order, replacing any previous file.
pub fn write_ranked(path: &Path, entries: &[RankedEntry]) -> Result<(), SinkError> {
    let file = File::create(path).map_err(io_err(path))?;
    let mut out = BufWriter::new(file);
    for entry in entries {
        writeln!(out, "{}: {}", entry.word, entry.raw_score).map_err(io_err(path))?;
    }
    out.flush().map_err(io_err(path))
}

/// Writes the failed-batch log. Nothing is written when `failed` is empty.
///
/// Returns whether a file was written.
pub fn write_failed_batches(path: &Path, failed: &[FailedBatch]) -> Result<bool, SinkError> {
    if failed.is_empty() {
        return Ok(false);
    }

    let file = File::create(path).map_err(io_err(path))?;
    let mut out = BufWriter::new(file);
    for batch in failed {
        writeln!(out, "Words: {}", batch.words.join(", ")).map_err(io_err(path))?;
        writeln!(out, "Prompt: {}", batch.prompt).map_err(io_err(path))?;
        writeln!(out).map_err(io_err(path))?;
    }
    out.flush().map_err(io_err(path))?;
    Ok(true)
}

/// One row of the run ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    #[serde(rename = "RunId")]
    pub run_id: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Phrase")]
    pub phrase: String,
    #[serde(rename = "TotalWords")]
    pub total_words: usize,
    #[serde(rename = "ScoredWords")]
    pub scored_words: usize,
    #[serde(rename = "FailedBatches")]
    pub failed_batches: usize,
    #[serde(rename = "ApiCalls")]
    pub api_calls: u64,
    #[serde(rename = "Requests")]
    pub requests: u64,
    #[serde(rename = "EstimatedCost")]
    pub estimated_cost: f64,
    #[serde(rename = "ElapsedSecs")]
    pub elapsed_secs: f64,
}

/// Appends a row to the run ledger, writing the header only for a new file.
pub fn append_run_record(path: &Path, record: &RunRecord) -> Result<(), SinkError> {
    let file_exists = path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err(path))?;

    let csv_err = |source| SinkError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    wtr.serialize(record).map_err(csv_err)?;
    wtr.flush().map_err(io_err(path))
}

/// Reads every run from the ledger. A missing ledger has no runs.
pub fn read_run_records(path: &Path) -> Result<Vec<RunRecord>, SinkError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path).map_err(io_err(path))?;
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: RunRecord = result.map_err(|source| SinkError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}
