//! Batched semantic scoring of candidate words against a reference phrase.
//!
//! Pipeline: [`extractor`] reads word files, [`controller`] sends batches
//! through a [`client::ScoringService`] and validates replies with
//! [`response`], [`ranker`] orders the scores and [`sink`] writes the results.

pub mod client;
pub mod config;
pub mod controller;
pub mod dashboard;
pub mod error;
pub mod extractor;
pub mod prompt;
pub mod ranker;
pub mod response;
pub mod sink;
