//! Minimum-weight solutions of the light toggling system over GF(2).
//!
//! Pressing a button twice is a no-op, so every button is pressed either zero
//! or one times and the machine reduces to `A x = b` over GF(2), with one
//! equation per light and one variable per button.

use crate::config::LIGHT_FREE_WARNING;
use crate::error::SearchError;
use crate::machine::{Machine, Row, Solution};

/// Toggle counts above this can not be enumerated with a `u64` Gray code.
const GRAY_CODE_CEILING: usize = 63;

pub struct LightSystem {
    /// Augmented matrix [A | b], reduced in place by [`LightSystem::rref`]
    matrix: Vec<Row>,
    num_vars: usize,
    num_eqs: usize,
    /// Maps column index (variable) to pivot row index
    col_to_pivot: Vec<Option<usize>>,
    /// Indices of free variables (columns without pivots)
    free_vars: Vec<usize>,
}

impl LightSystem {
    pub fn new(machine: &Machine) -> Self {
        let target = machine.target_lights();
        let num_eqs = target.len();
        let num_vars = machine.buttons().len();

        // Matrix dimensions: num_eqs x (num_vars + 1)
        let mut matrix = vec![Row::repeat(false, num_vars + 1); num_eqs];

        for (c, button) in machine.buttons().iter().enumerate() {
            for &r in button {
                matrix[r].set(c, true);
            }
        }
        for r in target.iter_ones() {
            matrix[r].set(num_vars, true);
        }

        Self {
            matrix,
            num_vars,
            num_eqs,
            col_to_pivot: vec![None; num_vars],
            free_vars: Vec::new(),
        }
    }

    /// Performs Gauss-Jordan elimination, leaving the matrix in Reduced Row Echelon Form.
    ///
    /// Returns `false` when the system is inconsistent.
    pub fn rref(&mut self) -> bool {
        self.col_to_pivot.fill(None);
        self.free_vars.clear();

        let mut pivot_row = 0;

        for c in 0..self.num_vars {
            if pivot_row >= self.num_eqs {
                self.free_vars.push(c);
                continue;
            }

            let Some(r) = (pivot_row..self.num_eqs).find(|&r| self.matrix[r][c]) else {
                self.free_vars.push(c);
                continue;
            };

            self.matrix.swap(pivot_row, r);
            self.col_to_pivot[c] = Some(pivot_row);

            // Clone pivot row to avoid multiple mutable borrows
            let pivot_vec = self.matrix[pivot_row].clone();

            // XOR eliminate other rows (both below AND above for RREF)
            for i in 0..self.num_eqs {
                if i != pivot_row && self.matrix[i][c] {
                    self.matrix[i] ^= &pivot_vec;
                }
            }
            pivot_row += 1;
        }

        // Rows below the last pivot have no coefficients left: 0 = 1 means no solution.
        (pivot_row..self.num_eqs).all(|r| !self.matrix[r][self.num_vars])
    }

    pub fn pivot_columns(&self) -> Vec<usize> {
        self.col_to_pivot
            .iter()
            .enumerate()
            .filter_map(|(c, row)| row.map(|_| c))
            .collect()
    }

    pub fn free_columns(&self) -> &[usize] {
        &self.free_vars
    }

    /// Solution with every free variable cleared, plus one null-space vector per free variable.
    ///
    /// In RREF each pivot variable equals its row's augmented bit XOR the free
    /// variables set in that row, so no back-substitution is needed.
    fn solution_space(&self) -> (Row, Vec<Row>) {
        let mut particular = Row::repeat(false, self.num_vars);
        for (c, &pivot_row) in self.col_to_pivot.iter().enumerate() {
            if let Some(r) = pivot_row {
                particular.set(c, self.matrix[r][self.num_vars]);
            }
        }

        let basis = self
            .free_vars
            .iter()
            .map(|&f| {
                let mut v = Row::repeat(false, self.num_vars);
                v.set(f, true);
                for (c, &pivot_row) in self.col_to_pivot.iter().enumerate() {
                    if let Some(r) = pivot_row {
                        v.set(c, self.matrix[r][f]);
                    }
                }
                v
            })
            .collect();

        (particular, basis)
    }

    /// Finds the assignment with the fewest pressed buttons.
    ///
    /// `Ok(None)` means the lights can not be reached. Walks the `2^k`
    /// free-variable assignments in Gray code order so every step is a single
    /// XOR with one null-space vector.
    pub fn solve_min_weight(&mut self, max_free: usize) -> Result<Option<Row>, SearchError> {
        if !self.rref() {
            return Ok(None);
        }

        let k = self.free_vars.len();
        let limit = max_free.min(GRAY_CODE_CEILING);
        if k > limit {
            return Err(SearchError::TooManyFreeButtons { free: k, limit });
        }
        if k > LIGHT_FREE_WARNING {
            tracing::warn!(free = k, "exhaustive toggle search over 2^{k} assignments");
        }

        let (mut current, null_basis) = self.solution_space();
        let mut best = current.clone();
        let mut min_weight = current.count_ones();

        // The bit that changes between gray(i-1) and gray(i) is the lowest set bit of i.
        for i in 1..(1u64 << k) {
            current ^= &null_basis[i.trailing_zeros() as usize];

            let weight = current.count_ones();
            if weight < min_weight {
                min_weight = weight;
                best.copy_from_bitslice(&current);
            }
        }

        Ok(Some(best))
    }
}

/// Fewest presses that light up exactly the machine's diagram.
#[tracing::instrument(skip_all, fields(buttons = machine.buttons().len()))]
pub fn solve(machine: &Machine, max_free: usize) -> Result<Option<Solution>, SearchError> {
    let mut system = LightSystem::new(machine);
    let pressed = system.solve_min_weight(max_free)?;
    tracing::debug!(
        rank = system.pivot_columns().len(),
        free = system.free_columns().len(),
        solvable = pressed.is_some()
    );
    Ok(pressed.map(|bits| Solution::new(bits.iter().by_vals().map(u64::from).collect())))
}
