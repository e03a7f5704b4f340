use std::path::PathBuf;

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};

/// Past this many free buttons the toggle search logs a warning.
pub const LIGHT_FREE_WARNING: usize = 20;

const DEFAULT_MAX_LIGHT_FREE: usize = 24;
const DEFAULT_MAX_JOLTAGE_FREE: usize = 12;

/// Knobs shared by both solvers and the aggregation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverConfig {
    /// Largest free-button count the toggle search enumerates (`2^k` steps).
    pub max_light_free: usize,
    /// Largest free-button count the joltage search enumerates.
    pub max_joltage_free: usize,
    /// Solve machines on the rayon pool instead of one after another.
    pub parallel: bool,
    /// Draw a progress bar while solving.
    pub progress: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_light_free: DEFAULT_MAX_LIGHT_FREE,
            max_joltage_free: DEFAULT_MAX_JOLTAGE_FREE,
            parallel: true,
            progress: false,
        }
    }
}

#[derive(Debug, Parser)]
#[command(about = "Minimum button presses for every factory machine")]
pub struct Args {
    /// Puzzle input, one machine per line
    pub input: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_MAX_LIGHT_FREE)]
    pub max_light_free: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_JOLTAGE_FREE)]
    pub max_joltage_free: usize,

    /// Solve machines one at a time
    #[arg(long)]
    pub sequential: bool,

    #[arg(long)]
    pub progress: bool,
}

impl Args {
    pub fn config(&self) -> SolverConfig {
        SolverConfig {
            max_light_free: self.max_light_free,
            max_joltage_free: self.max_joltage_free,
            parallel: !self.sequential,
            progress: self.progress,
        }
    }

    /// Reads the input file, falling back to `default` when no path was given.
    pub fn read_input(&self, default: &str) -> Result<String> {
        let path = self
            .input
            .clone()
            .unwrap_or_else(|| PathBuf::from(default));
        std::fs::read_to_string(&path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", path.display()))
    }
}
