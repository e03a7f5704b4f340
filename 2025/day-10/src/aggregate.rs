use indicatif::{ParallelProgressIterator, ProgressBar, ProgressIterator};
use rayon::prelude::*;

use crate::config::SolverConfig;
use crate::error::{Day10Error, SearchError};
use crate::machine::{Machine, Solution};
use crate::{accumulate, gf2};

/// Which panel of the machine is being configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Indicator lights, toggled over GF(2)
    Lights,
    /// Joltage counters, incremented per press
    Joltage,
}

fn solve_machine(
    mode: Mode,
    machine: &Machine,
    config: &SolverConfig,
) -> Result<Option<Solution>, SearchError> {
    match mode {
        Mode::Lights => gf2::solve(machine, config.max_light_free),
        Mode::Joltage => accumulate::solve(machine, config.max_joltage_free),
    }
}

fn presses(
    index: usize,
    machine: &Machine,
    mode: Mode,
    config: &SolverConfig,
) -> Result<u64, Day10Error> {
    if mode == Mode::Joltage && machine.joltage().is_none() {
        tracing::debug!(machine = index, "no joltage requirements, skipping");
        return Ok(0);
    }

    solve_machine(mode, machine, config)
        .map_err(|source| Day10Error::Search {
            machine: index,
            source,
        })?
        .map(|solution| solution.total())
        .ok_or(Day10Error::Unreachable { machine: index })
}

/// Sums the fewest presses of every machine.
///
/// A machine that can not reach its target fails the whole batch.
#[tracing::instrument(skip(machines, config), fields(count = machines.len()))]
pub fn total_presses(
    machines: &[Machine],
    mode: Mode,
    config: &SolverConfig,
) -> Result<u64, Day10Error> {
    let bar = if config.progress {
        ProgressBar::new(machines.len() as u64)
    } else {
        ProgressBar::hidden()
    };

    let total = if config.parallel {
        machines
            .par_iter()
            .enumerate()
            .progress_with(bar.clone())
            .map(|(i, m)| presses(i, m, mode, config))
            .try_reduce(|| 0, |a, b| a.checked_add(b).ok_or(Day10Error::TotalOverflow))
    } else {
        machines
            .iter()
            .enumerate()
            .progress_with(bar.clone())
            .try_fold(0u64, |acc, (i, m)| {
                acc.checked_add(presses(i, m, mode, config)?)
                    .ok_or(Day10Error::TotalOverflow)
            })
    };

    bar.finish_and_clear();
    total
}
