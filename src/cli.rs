use clap::{ArgAction, Parser};
use indicatif::ProgressBar;
use std::path::PathBuf;
use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::algorithm::DigestAlgorithm;
use crate::config::{Config, PrintMode};
use crate::error::ConfigError;
use crate::output::{self, OutputMode};
use crate::pipeline::ChecksumPipeline;
use crate::progress::{self, StatusLineLog};

#[derive(Parser, Debug)]
#[command(name = "multisum")]
#[command(version)]
#[command(about = "Write one checksum manifest per digest algorithm for a directory tree")]
#[command(long_about = "multisum walks SOURCE once, hashes every regular file with each requested \
    algorithm and writes MD5SUMS, SHA256SUMS, ... into the target directory.\n\n\
    The target directory is managed: it may only contain manifests, a .git directory \
    and a .gitattributes file, and it is cleared before every run.\n\n\
    Examples:\n  \
    multisum --md5 --sha256 --target ./sums ./data\n  \
    multisum --text --algorithm sha-512 --target ./sums ./data")]
pub struct Cli {
    /// Directory of files to checksum
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Directory where the checksum files are written
    #[arg(long, value_name = "DIR")]
    pub target: PathBuf,

    /// Write manifest lines in text mode ("<hash>  <path>")
    #[arg(long)]
    pub text: bool,

    /// Write manifest lines in binary mode ("<hash> *<path>", default)
    #[arg(long)]
    pub binary: bool,

    /// Calculate MD5 sums
    #[arg(long)]
    pub md5: bool,

    /// Calculate SHA1 sums
    #[arg(long)]
    pub sha1: bool,

    /// Calculate SHA224 sums
    #[arg(long)]
    pub sha224: bool,

    /// Calculate SHA256 sums
    #[arg(long)]
    pub sha256: bool,

    /// Calculate SHA384 sums
    #[arg(long)]
    pub sha384: bool,

    /// Calculate SHA512 sums
    #[arg(long)]
    pub sha512: bool,

    /// Additional algorithm by name (repeatable, e.g. sha-256)
    #[arg(long = "algorithm", value_name = "NAME")]
    pub algorithms: Vec<String>,

    /// Increase output verbosity (-v, -vv for more)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn output_mode(&self) -> OutputMode {
        OutputMode::from_flags(self.quiet, self.verbose)
    }

    /// Requested algorithms: flags in canonical order, then `--algorithm` values.
    pub fn selected_algorithms(&self) -> Result<Vec<DigestAlgorithm>, ConfigError> {
        let flags = [self.md5, self.sha1, self.sha224, self.sha256, self.sha384, self.sha512];
        let mut selected: Vec<DigestAlgorithm> = DigestAlgorithm::ALL
            .into_iter()
            .zip(flags)
            .filter_map(|(algo, on)| on.then_some(algo))
            .collect();

        for name in &self.algorithms {
            selected.push(name.parse()?);
        }

        Ok(selected)
    }

    /// Turn the parsed arguments into a validated configuration.
    pub fn to_config(&self) -> Result<Config, ConfigError> {
        let mode = PrintMode::from_flags(self.text, self.binary)?;
        let algorithms = self.selected_algorithms()?;
        Config::new(mode, algorithms, &self.source, &self.target)
    }

    /// Status line for this run, hidden when progress is not shown.
    pub fn status_line(&self) -> ProgressBar {
        if self.output_mode().shows_progress() {
            progress::create_status_line()
        } else {
            ProgressBar::hidden()
        }
    }

    /// Install the tracing subscriber, writing through `bar` so log lines
    /// and the status line never share a terminal row.
    pub fn init_logging(&self, bar: &ProgressBar) {
        // Priority: RUST_LOG env var > -v/-q
        let default_filter = self.output_mode().log_filter();
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(StatusLineLog::stderr(bar.clone()))
                    .without_time()
                    .with_target(false),
            )
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
            .init();
    }

    pub fn run(self, bar: ProgressBar) -> anyhow::Result<()> {
        let mode = self.output_mode();
        let config = self.to_config().context("invalid arguments")?;

        output::print_config(&config, mode);

        let summary = ChecksumPipeline::new(config)
            .with_progress_bar(bar)
            .run()
            .context("failed")?;

        output::print_summary(&summary, mode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_algorithm_flags_in_canonical_order() {
        let cli = parse(&["multisum", "--sha512", "--md5", "--target", "out", "src"]);
        assert_eq!(
            cli.selected_algorithms().unwrap(),
            vec![DigestAlgorithm::Md5, DigestAlgorithm::Sha512]
        );
        assert_eq!(cli.source, PathBuf::from("src"));
        assert_eq!(cli.target, PathBuf::from("out"));
    }

    #[test]
    fn test_named_algorithms_follow_flags() {
        let cli = parse(&[
            "multisum", "--sha1", "--algorithm", "sha-384", "--algorithm", "MD5", "--target", "out", "src",
        ]);
        assert_eq!(
            cli.selected_algorithms().unwrap(),
            vec![DigestAlgorithm::Sha1, DigestAlgorithm::Sha384, DigestAlgorithm::Md5]
        );
    }

    #[test]
    fn test_unknown_algorithm_name() {
        let cli = parse(&["multisum", "--algorithm", "crc32", "--target", "out", "src"]);
        assert_eq!(
            cli.selected_algorithms(),
            Err(ConfigError::UnknownAlgorithm("crc32".to_string()))
        );
    }

    #[test]
    fn test_config_errors_surface() {
        let cli = parse(&["multisum", "--text", "--binary", "--md5", "--target", "out", "src"]);
        assert_eq!(cli.to_config().unwrap_err(), ConfigError::ConflictingModes);

        let cli = parse(&["multisum", "--target", "out", "src"]);
        assert_eq!(cli.to_config().unwrap_err(), ConfigError::NoAlgorithms);
    }

    #[test]
    fn test_target_required() {
        assert!(Cli::try_parse_from(["multisum", "--md5", "src"]).is_err());
    }

    #[test]
    fn test_quiet_hides_status_line() {
        assert!(parse(&["multisum", "-q", "--target", "o", "s"]).status_line().is_hidden());
    }

    #[test]
    fn test_output_mode() {
        assert_eq!(parse(&["multisum", "-q", "--target", "o", "s"]).output_mode(), OutputMode::Quiet);
        assert_eq!(parse(&["multisum", "-vv", "--target", "o", "s"]).output_mode(), OutputMode::VeryVerbose);
    }
}
