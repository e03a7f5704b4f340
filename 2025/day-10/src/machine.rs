use bitvec::prelude::*;

/// A bit vector backed by `usize` words with Least Significant Bit first ordering.
/// This aligns with standard CPU integer operations for maximum performance.
pub type Row = BitVec<usize, Lsb0>;

/// One factory machine as read from the manual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    /// Indicator light diagram (`#` = on)
    lights: Row,
    /// Sorted, de-duplicated indices touched by each button
    buttons: Vec<Vec<usize>>,
    /// Joltage requirements, one per counter
    joltage: Option<Vec<u64>>,
}

impl Machine {
    pub fn new(lights: Row, buttons: Vec<Vec<usize>>, joltage: Option<Vec<u64>>) -> Self {
        let buttons = buttons
            .into_iter()
            .map(|mut indices| {
                indices.sort_unstable();
                indices.dedup();
                indices
            })
            .collect();
        Self {
            lights,
            buttons,
            joltage,
        }
    }

    /// Builds a machine from a `.#` diagram. Handy for tests and benches.
    pub fn from_diagram(diagram: &str, buttons: &[&[usize]], joltage: Option<&[u64]>) -> Self {
        let lights = diagram.chars().map(|c| c == '#').collect::<Row>();
        Self::new(
            lights,
            buttons.iter().map(|b| b.to_vec()).collect(),
            joltage.map(<[u64]>::to_vec),
        )
    }

    pub fn buttons(&self) -> &[Vec<usize>] {
        &self.buttons
    }

    pub fn joltage(&self) -> Option<&[u64]> {
        self.joltage.as_deref()
    }

    /// Number of lights the toggle system has to track.
    ///
    /// Buttons may reference lights past the end of the diagram; those lights
    /// exist and must end up off.
    pub fn light_count(&self) -> usize {
        self.buttons
            .iter()
            .filter_map(|b| b.last())
            .map(|&i| i + 1)
            .fold(self.lights.len(), usize::max)
    }

    /// The diagram padded with `off` up to [`Machine::light_count`].
    pub fn target_lights(&self) -> Row {
        let mut target = self.lights.clone();
        target.resize(self.light_count(), false);
        target
    }

    /// Replays `presses` on an all-off panel. Only the parity of each count matters.
    pub fn toggle(&self, presses: &[u64]) -> Row {
        let mut state = Row::repeat(false, self.light_count());
        for (button, &count) in self.buttons.iter().zip(presses) {
            if count % 2 == 0 {
                continue;
            }
            for &i in button {
                let lit = state[i];
                state.set(i, !lit);
            }
        }
        state
    }

    /// Replays `presses` on zeroed joltage counters.
    ///
    /// Indices outside the counter list are ignored. A machine without joltage
    /// requirements has no counters.
    pub fn accumulate(&self, presses: &[u64]) -> Vec<u64> {
        let mut counters = vec![0; self.joltage.as_ref().map_or(0, Vec::len)];
        for (button, &count) in self.buttons.iter().zip(presses) {
            for &i in button {
                if let Some(counter) = counters.get_mut(i) {
                    *counter += count;
                }
            }
        }
        counters
    }
}

/// Press counts for every button of a machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    presses: Vec<u64>,
}

impl Solution {
    pub fn new(presses: Vec<u64>) -> Self {
        Self { presses }
    }

    pub fn presses(&self) -> &[u64] {
        &self.presses
    }

    pub fn total(&self) -> u64 {
        self.presses.iter().sum()
    }
}
