//! multisum library crate
//!
//! Walks a directory tree once, computes several digests per regular file and
//! writes one `<ALGO>SUMS` manifest per algorithm into a managed target
//! directory, while a background scanner and a progress line report
//! "processed / discovered".

pub mod algorithm;
pub mod broadcast;
pub mod cli;
pub mod config;
pub mod error;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod repo_guard;
pub mod scanner;
pub mod walk;

pub use algorithm::DigestAlgorithm;
pub use config::{Config, PrintMode};
pub use error::{ConfigError, MultisumError};
pub use pipeline::{ChecksumPipeline, RunSummary};
