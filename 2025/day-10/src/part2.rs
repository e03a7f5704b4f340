use miette::*;

use crate::aggregate::{total_presses, Mode};
use crate::config::SolverConfig;
use crate::parser::parse_machines;

/// Fewest presses to bring every machine's joltage counters to their requirements.
#[tracing::instrument(skip(input))]
pub fn process(input: &str) -> Result<String> {
    process_with(input, &SolverConfig::default())
}

#[tracing::instrument(skip(input))]
pub fn process_with(input: &str, config: &SolverConfig) -> Result<String> {
    let machines = parse_machines(input)?;
    let total = total_presses(&machines, Mode::Joltage, config)?;
    Ok(total.to_string())
}
