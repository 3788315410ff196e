use crate::config::Config;
use crate::pipeline::RunSummary;
use colored::*;

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Quiet,       // Only errors
    Normal,      // Standard output
    Verbose,     // More details
    VeryVerbose, // All details including manifest paths
}

impl OutputMode {
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            OutputMode::Quiet
        } else if verbose >= 2 {
            OutputMode::VeryVerbose
        } else if verbose == 1 {
            OutputMode::Verbose
        } else {
            OutputMode::Normal
        }
    }

    /// Default `tracing` filter for this verbosity when `RUST_LOG` is unset
    pub fn log_filter(self) -> &'static str {
        match self {
            OutputMode::Quiet => "error",
            OutputMode::Normal => "warn",
            OutputMode::Verbose => "info",
            OutputMode::VeryVerbose => "debug",
        }
    }

    pub fn shows_progress(self) -> bool {
        self != OutputMode::Quiet
    }
}

/// One-line description of what a run is about to do
pub fn config_banner(config: &Config) -> String {
    let algorithms: Vec<_> = config.algorithms().iter().map(|a| a.name()).collect();
    format!(
        "creating checksum files ({}) in {} mode for directory \"{}\" writing to \"{}\"",
        algorithms.join(","),
        config.mode(),
        config.source_dir().display(),
        config.target_dir().display()
    )
}

pub fn print_config(config: &Config, mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }
    eprintln!("{}", config_banner(config).dimmed());
}

/// Human-readable summary of a finished run
pub fn print_summary(summary: &RunSummary, mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }

    println!(
        "{} {} files ({}) in {:.2?}",
        "Checksummed".green().bold(),
        summary.processed.to_string().bold(),
        bytesize::to_string(summary.bytes_hashed, true),
        summary.duration
    );

    if summary.skipped > 0 {
        println!(
            "{} {} entries skipped (see warnings)",
            "Warning:".yellow(),
            summary.skipped
        );
    }

    if mode == OutputMode::Verbose || mode == OutputMode::VeryVerbose {
        for manifest in &summary.manifests {
            println!("  {}", manifest.display().to_string().dimmed());
        }
    }
}
