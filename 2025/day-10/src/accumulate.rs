//! Minimum total presses that drive the joltage counters to their exact targets.
//!
//! Every press adds one to each counter the button is wired to, so the machine
//! is `A x = b` over the non-negative integers. The system is reduced exactly
//! over the rationals, then the free buttons are enumerated within per-button
//! bounds while the pivot buttons are derived from them.

use std::iter::Rev;
use std::ops::RangeInclusive;

use itertools::Either;
use nalgebra::DMatrix;
use num::{BigInt, BigRational, One, Signed, ToPrimitive, Zero};
use num_integer::Integer;

use crate::error::SearchError;
use crate::machine::{Machine, Solution};

pub struct CounterSystem {
    /// Augmented matrix [A | b] with exact entries
    matrix: DMatrix<BigRational>,
    num_vars: usize,
    num_eqs: usize,
    /// Maps column index (variable) to pivot row index
    col_to_pivot: Vec<Option<usize>>,
    /// Indices of free variables (columns without pivots)
    free_vars: Vec<usize>,
    /// Largest useful press count per button
    bounds: Vec<u64>,
}

/// A free button together with how the search walks its values.
#[derive(Debug, Clone, Copy)]
struct FreeButton {
    button: usize,
    bound: i64,
    /// Pressing it lowers the total, so large values are tried first.
    descending: bool,
}

impl FreeButton {
    fn candidates(&self) -> Either<Rev<RangeInclusive<i64>>, RangeInclusive<i64>> {
        if self.descending {
            Either::Left((0..=self.bound).rev())
        } else {
            Either::Right(0..=self.bound)
        }
    }
}

/// `button = (constant - Σ coefficients[i] * free[i]) / denominator`, all scaled to integers.
#[derive(Debug, Clone)]
struct PivotEquation {
    button: usize,
    denominator: i64,
    constant: i64,
    coefficients: Vec<i64>,
}

impl PivotEquation {
    /// Exact press count for `values`, or `None` when it is negative or fractional.
    fn value(&self, values: &[i64]) -> Option<i64> {
        let rhs = self
            .coefficients
            .iter()
            .zip(values)
            .fold(i128::from(self.constant), |acc, (&a, &x)| {
                acc - i128::from(a) * i128::from(x)
            });
        let denominator = i128::from(self.denominator);
        if rhs < 0 || rhs % denominator != 0 {
            return None;
        }
        i64::try_from(rhs / denominator).ok()
    }
}

fn to_i64(value: &BigInt) -> Result<i64, SearchError> {
    value.to_i64().ok_or(SearchError::CoefficientOverflow)
}

impl CounterSystem {
    pub fn new(buttons: &[Vec<usize>], targets: &[u64]) -> Self {
        let num_eqs = targets.len();
        let num_vars = buttons.len();

        let mut matrix = DMatrix::from_element(num_eqs, num_vars + 1, BigRational::zero());
        let mut bounds = vec![0; num_vars];

        for (c, button) in buttons.iter().enumerate() {
            // A button never needs more presses than its smallest counter allows.
            let counters = button.iter().copied().filter(|&r| r < num_eqs);
            bounds[c] = counters.clone().map(|r| targets[r]).min().unwrap_or(0);
            for r in counters {
                matrix[(r, c)] = BigRational::one();
            }
        }
        for (r, &target) in targets.iter().enumerate() {
            matrix[(r, num_vars)] = BigRational::from_integer(BigInt::from(target));
        }

        Self {
            matrix,
            num_vars,
            num_eqs,
            col_to_pivot: vec![None; num_vars],
            free_vars: Vec::new(),
            bounds,
        }
    }

    /// Performs Gauss-Jordan elimination over the rationals.
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

            let Some(r) = (pivot_row..self.num_eqs).find(|&r| !self.matrix[(r, c)].is_zero())
            else {
                self.free_vars.push(c);
                continue;
            };

            self.matrix.swap_rows(pivot_row, r);
            self.col_to_pivot[c] = Some(pivot_row);

            // Columns left of `c` are already zero in the pivot row.
            let inv = self.matrix[(pivot_row, c)].recip();
            for k in c..=self.num_vars {
                let scaled = &self.matrix[(pivot_row, k)] * &inv;
                self.matrix[(pivot_row, k)] = scaled;
            }

            for i in 0..self.num_eqs {
                if i == pivot_row {
                    continue;
                }
                let factor = self.matrix[(i, c)].clone();
                if factor.is_zero() {
                    continue;
                }
                for k in c..=self.num_vars {
                    let delta = &factor * &self.matrix[(pivot_row, k)];
                    self.matrix[(i, k)] -= delta;
                }
            }
            pivot_row += 1;
        }

        (pivot_row..self.num_eqs).all(|r| self.matrix[(r, self.num_vars)].is_zero())
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

    /// Free buttons ordered by their effect on the total, most negative first.
    ///
    /// The total is `Σ free + Σ pivots`, and each pivot loses its row
    /// coefficient per unit of a free button, so the net effect of one press
    /// is `1 - Σ column coefficients`.
    fn free_buttons(&self) -> Result<Vec<FreeButton>, SearchError> {
        let mut ranked = self
            .free_vars
            .iter()
            .map(|&f| {
                let column_sum = (0..self.num_eqs)
                    .map(|r| &self.matrix[(r, f)])
                    .fold(BigRational::zero(), |acc, q| acc + q);
                let effect = BigRational::one() - column_sum;
                let bound = i64::try_from(self.bounds[f])
                    .map_err(|_| SearchError::CoefficientOverflow)?;
                Ok::<_, SearchError>((effect, bound, f))
            })
            .collect::<Result<Vec<_>, SearchError>>()?;
        ranked.sort();

        Ok(ranked
            .into_iter()
            .map(|(effect, bound, button)| FreeButton {
                button,
                bound,
                descending: effect.is_negative(),
            })
            .collect())
    }

    /// Scales each pivot row by the LCM of its denominators.
    fn pivot_equations(&self, free: &[FreeButton]) -> Result<Vec<PivotEquation>, SearchError> {
        self.col_to_pivot
            .iter()
            .enumerate()
            .filter_map(|(c, row)| row.map(|r| (c, r)))
            .map(|(button, r)| {
                let constant = &self.matrix[(r, self.num_vars)];
                let coefficients = free
                    .iter()
                    .map(|f| &self.matrix[(r, f.button)])
                    .collect::<Vec<_>>();
                let denominator = coefficients
                    .iter()
                    .fold(constant.denom().clone(), |acc, q| acc.lcm(q.denom()));
                let scale = |q: &BigRational| to_i64(&(q.numer() * (&denominator / q.denom())));

                Ok::<_, SearchError>(PivotEquation {
                    button,
                    denominator: to_i64(&denominator)?,
                    constant: scale(constant)?,
                    coefficients: coefficients
                        .into_iter()
                        .map(scale)
                        .collect::<Result<_, _>>()?,
                })
            })
            .collect()
    }

    /// Finds the non-negative integer assignment with the smallest total.
    ///
    /// `Ok(None)` means the counters can not be reached.
    pub fn solve_min_sum(&mut self, max_free: usize) -> Result<Option<Vec<u64>>, SearchError> {
        if !self.rref() {
            return Ok(None);
        }

        let k = self.free_vars.len();
        if k > max_free {
            return Err(SearchError::TooManyFreeButtons {
                free: k,
                limit: max_free,
            });
        }

        let free = self.free_buttons()?;
        let equations = self.pivot_equations(&free)?;

        let mut search = Search::new(&free, &equations);
        search.run();

        let Some(values) = search.best_values else {
            return Ok(None);
        };
        reconstruct(self.num_vars, &free, &equations, &values).map(Some)
    }
}

/// Expands a free assignment into press counts for every button.
fn reconstruct(
    num_vars: usize,
    free: &[FreeButton],
    equations: &[PivotEquation],
    values: &[i64],
) -> Result<Vec<u64>, SearchError> {
    let mut presses = vec![0; num_vars];
    for (f, &v) in free.iter().zip(values) {
        presses[f.button] = u64::try_from(v).map_err(|_| SearchError::InvalidAssignment)?;
    }
    for eq in equations {
        let v = eq.value(values).ok_or(SearchError::InvalidAssignment)?;
        presses[eq.button] = v.unsigned_abs();
    }
    Ok(presses)
}

/// Branch-and-bound state for one machine.
struct Search<'a> {
    free: &'a [FreeButton],
    equations: &'a [PivotEquation],
    /// Scratch assignment for the general recursion
    values: Vec<i64>,
    /// Smallest total found so far
    best: Option<i64>,
    best_values: Option<Vec<i64>>,
}

impl<'a> Search<'a> {
    fn new(free: &'a [FreeButton], equations: &'a [PivotEquation]) -> Self {
        Self {
            free,
            equations,
            values: vec![0; free.len()],
            best: None,
            best_values: None,
        }
    }

    /// Whether `total` is strictly below the best total found so far.
    fn beats(&self, total: i64) -> bool {
        self.best.is_none_or(|best| total < best)
    }

    /// Total presses for a full free assignment, abandoned as soon as it can not win.
    fn evaluate(&self, values: &[i64], free_sum: i64) -> Option<i64> {
        if !self.beats(free_sum) {
            return None;
        }
        let mut total = free_sum;
        for eq in self.equations {
            total = total.checked_add(eq.value(values)?)?;
            if !self.beats(total) {
                return None;
            }
        }
        Some(total)
    }

    fn offer(&mut self, values: &[i64], free_sum: i64) {
        if let Some(total) = self.evaluate(values, free_sum) {
            self.best = Some(total);
            self.best_values = Some(values.to_vec());
        }
    }

    /// `partial + value` when it still beats the best total.
    fn extend(&self, partial: i64, value: i64) -> Option<i64> {
        partial.checked_add(value).filter(|&sum| self.beats(sum))
    }

    fn run(&mut self) {
        let free = self.free;
        match *free {
            [] => self.offer(&[], 0),
            [f0] => self.search_one(f0),
            [f0, f1] => self.search_two(f0, f1),
            [f0, f1, f2] => self.search_three(f0, f1, f2),
            _ => self.search_from(0, 0),
        }
    }

    fn search_one(&mut self, f0: FreeButton) {
        for x0 in f0.candidates() {
            if !self.beats(x0) {
                if f0.descending {
                    continue;
                }
                break;
            }
            self.offer(&[x0], x0);
        }
    }

    fn search_two(&mut self, f0: FreeButton, f1: FreeButton) {
        for x0 in f0.candidates() {
            if !self.beats(x0) {
                if f0.descending {
                    continue;
                }
                break;
            }
            for x1 in f1.candidates() {
                let Some(sum) = self.extend(x0, x1) else {
                    if f1.descending {
                        continue;
                    }
                    break;
                };
                self.offer(&[x0, x1], sum);
            }
        }
    }

    fn search_three(&mut self, f0: FreeButton, f1: FreeButton, f2: FreeButton) {
        for x0 in f0.candidates() {
            if !self.beats(x0) {
                if f0.descending {
                    continue;
                }
                break;
            }
            for x1 in f1.candidates() {
                let Some(s01) = self.extend(x0, x1) else {
                    if f1.descending {
                        continue;
                    }
                    break;
                };
                for x2 in f2.candidates() {
                    let Some(sum) = self.extend(s01, x2) else {
                        if f2.descending {
                            continue;
                        }
                        break;
                    };
                    self.offer(&[x0, x1, x2], sum);
                }
            }
        }
    }

    /// Depth-first enumeration for four or more free buttons.
    fn search_from(&mut self, i: usize, free_sum: i64) {
        if !self.beats(free_sum) {
            return;
        }
        if i == self.free.len() {
            if let Some(total) = self.evaluate(&self.values, free_sum) {
                self.best = Some(total);
                self.best_values = Some(self.values.clone());
            }
            return;
        }

        let f = self.free[i];
        for v in f.candidates() {
            let Some(sum) = self.extend(free_sum, v) else {
                if f.descending {
                    continue;
                }
                break;
            };
            self.values[i] = v;
            self.search_from(i + 1, sum);
        }
    }
}

/// Fewest total presses that bring every joltage counter to its requirement.
///
/// A machine without joltage requirements has no counters and needs no presses.
#[tracing::instrument(skip_all, fields(buttons = machine.buttons().len()))]
pub fn solve(machine: &Machine, max_free: usize) -> Result<Option<Solution>, SearchError> {
    let targets = machine.joltage().unwrap_or_default();
    let mut system = CounterSystem::new(machine.buttons(), targets);
    let presses = system.solve_min_sum(max_free)?;
    tracing::debug!(
        counters = targets.len(),
        rank = system.pivot_columns().len(),
        free = system.free_columns().len(),
        solvable = presses.is_some()
    );
    Ok(presses.map(Solution::new))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::machine::Row;
    use proptest::prelude::*;
    use rstest::rstest;

    const LIMIT: usize = 12;

    fn counters(buttons: &[&[usize]], targets: &[u64]) -> Machine {
        let lights = ".".repeat(targets.len());
        Machine::from_diagram(&lights, buttons, Some(targets))
    }

    fn min_presses(machine: &Machine) -> Option<u64> {
        solve(machine, LIMIT).unwrap().map(|s| s.total())
    }

    /// Depth-first over every button, pruning once a counter overshoots.
    fn brute_force(machine: &Machine) -> Option<u64> {
        fn go(buttons: &[Vec<usize>], targets: &[u64], state: &mut [u64], presses: u64) -> Option<u64> {
            let Some((button, rest)) = buttons.split_first() else {
                return (*state == *targets).then_some(presses);
            };
            let wired = button
                .iter()
                .copied()
                .filter(|&i| i < targets.len())
                .collect::<Vec<_>>();
            let mut best = None;
            for n in 0u64.. {
                let fits = wired.iter().all(|&i| state[i] + n <= targets[i]);
                if !fits || (wired.is_empty() && n > 0) {
                    break;
                }
                wired.iter().for_each(|&i| state[i] += n);
                let found = go(rest, targets, state, presses + n);
                wired.iter().for_each(|&i| state[i] -= n);
                best = match (best, found) {
                    (Some(a), Some(b)) => Some(u64::min(a, b)),
                    (a, b) => a.or(b),
                };
            }
            best
        }

        let targets = machine.joltage().unwrap_or_default();
        go(machine.buttons(), targets, &mut vec![0; targets.len()], 0)
    }

    #[rstest]
    #[case(vec![vec![0], vec![1], vec![0, 1]], vec![5, 3], Some(5))]
    #[case(vec![vec![3], vec![1, 3], vec![2], vec![2, 3], vec![0, 2], vec![0, 1]], vec![3, 5, 4, 7], Some(10))]
    #[case(vec![vec![0, 2, 3, 4], vec![2, 3], vec![0, 4], vec![0, 1, 2], vec![1, 2, 3, 4]], vec![7, 5, 12, 7, 2], Some(12))]
    #[case(vec![vec![0, 1, 2, 3, 4], vec![0, 3, 4], vec![0, 1, 2, 4, 5], vec![1, 2]], vec![10, 11, 11, 5, 10, 5], Some(11))]
    #[case(vec![vec![0, 1], vec![0, 2]], vec![0, 0, 0], Some(0))]
    #[case(vec![vec![0, 1], vec![1, 2], vec![0, 2]], vec![1, 1, 1], None)]
    #[case(vec![vec![0, 1], vec![1]], vec![2, 1], None)]
    #[case(vec![vec![1]], vec![1, 1], None)]
    #[case(vec![vec![0, 7]], vec![3], Some(3))]
    #[case(vec![vec![0]], vec![i64::MAX as u64], Some(i64::MAX as u64))]
    fn minimum_presses(
        #[case] buttons: Vec<Vec<usize>>,
        #[case] targets: Vec<u64>,
        #[case] expected: Option<u64>,
    ) {
        let lights = Row::repeat(false, targets.len());
        let machine = Machine::new(lights, buttons, Some(targets));
        assert_eq!(expected, min_presses(&machine));
    }

    #[test]
    fn shared_button_carries_the_overlap() {
        let machine = counters(&[&[0], &[1], &[0, 1]], &[5, 3]);
        let solution = solve(&machine, LIMIT).unwrap().unwrap();
        assert_eq!(&[2, 0, 3], solution.presses());
    }

    #[test]
    fn unwired_buttons_are_never_pressed() {
        let machine = counters(&[&[], &[0]], &[2]);
        let solution = solve(&machine, LIMIT).unwrap().unwrap();
        assert_eq!(&[0, 2], solution.presses());
    }

    #[test]
    fn machine_without_joltage_needs_nothing() {
        let machine = Machine::from_diagram("#.", &[&[0], &[1]], None);
        assert_eq!(Some(0), min_presses(&machine));
    }

    #[test]
    fn reduction_is_deterministic() {
        let machine = counters(
            &[&[3], &[1, 3], &[2], &[2, 3], &[0, 2], &[0, 1]],
            &[3, 5, 4, 7],
        );
        let mut system = CounterSystem::new(machine.buttons(), machine.joltage().unwrap());
        let first = system.solve_min_sum(LIMIT).unwrap();
        let pivots = system.pivot_columns();
        let free = system.free_columns().to_vec();

        let mut again = CounterSystem::new(machine.buttons(), machine.joltage().unwrap());
        let second = again.solve_min_sum(LIMIT).unwrap();
        assert_eq!(pivots, again.pivot_columns());
        assert_eq!(free, again.free_columns());
        assert_eq!(first, second);
    }

    #[test]
    fn too_many_free_buttons_is_reported() {
        let machine = counters(&[&[0], &[0], &[0]], &[4]);
        assert_eq!(
            Err(SearchError::TooManyFreeButtons { free: 2, limit: 1 }),
            solve(&machine, 1)
        );
    }

    #[test]
    fn general_search_handles_many_free_buttons() {
        // Six ways to feed one counter: five free buttons, one of them worth two.
        let machine = counters(&[&[0], &[0], &[0], &[0, 1], &[0], &[1]], &[6, 2]);
        let solution = solve(&machine, LIMIT).unwrap().unwrap();
        assert_eq!(6, solution.total());
        assert_eq!(vec![6, 2], machine.accumulate(solution.presses()));
    }

    #[test]
    fn equations_are_scaled_to_integers() {
        let machine = counters(&[&[0, 1], &[1, 2], &[0, 2], &[0]], &[3, 2, 3]);
        let mut system = CounterSystem::new(machine.buttons(), machine.joltage().unwrap());
        assert!(system.rref());
        let free = system.free_buttons().unwrap();
        let equations = system.pivot_equations(&free).unwrap();
        assert_eq!(1, free.len());
        assert!(equations.iter().all(|eq| eq.denominator == 2));
        assert_eq!(Some(4), min_presses(&machine));
    }

    #[test]
    fn reconstruction_rejects_negative_pivots() {
        let machine = counters(&[&[0], &[1], &[0, 1]], &[5, 3]);
        let mut system = CounterSystem::new(machine.buttons(), machine.joltage().unwrap());
        assert!(system.rref());
        let free = system.free_buttons().unwrap();
        let equations = system.pivot_equations(&free).unwrap();

        // Four presses of the shared button would need button 1 at -1.
        assert_eq!(
            Err(SearchError::InvalidAssignment),
            reconstruct(3, &free, &equations, &[4])
        );
        assert_eq!(Ok(vec![2, 0, 3]), reconstruct(3, &free, &equations, &[3]));
    }

    #[test]
    fn search_accepts_the_largest_total() {
        let free: [FreeButton; 0] = [];
        let equations = [PivotEquation {
            button: 0,
            denominator: 1,
            constant: i64::MAX,
            coefficients: Vec::new(),
        }];
        let mut search = Search::new(&free, &equations);
        search.run();
        assert_eq!(Some(i64::MAX), search.best);
    }

    fn wiring_strategy() -> impl Strategy<Value = (usize, Vec<Vec<usize>>)> {
        (1usize..=4, 0usize..=5).prop_flat_map(|(n, buttons)| {
            prop::collection::vec(prop::collection::vec(any::<bool>(), n), buttons).prop_map(
                move |masks| {
                    let buttons = masks
                        .into_iter()
                        .map(|mask| (0..n).filter(|&i| mask[i]).collect())
                        .collect::<Vec<Vec<usize>>>();
                    (n, buttons)
                },
            )
        })
    }

    fn reachable_strategy() -> impl Strategy<Value = Machine> {
        wiring_strategy().prop_flat_map(|(n, buttons)| {
            prop::collection::vec(0u64..=2, buttons.len()).prop_map(move |presses| {
                let blank = Machine::new(Row::repeat(false, n), buttons.clone(), Some(vec![0; n]));
                let targets = blank.accumulate(&presses);
                Machine::new(Row::repeat(false, n), buttons.clone(), Some(targets))
            })
        })
    }

    fn arbitrary_strategy() -> impl Strategy<Value = Machine> {
        wiring_strategy().prop_flat_map(|(n, buttons)| {
            prop::collection::vec(0u64..=6, n).prop_map(move |targets| {
                Machine::new(Row::repeat(false, n), buttons.clone(), Some(targets))
            })
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn reachable_targets_replay(machine in reachable_strategy()) {
            let solution = solve(&machine, LIMIT).unwrap();
            prop_assert!(solution.is_some());
            let solution = solution.unwrap();
            let counters = machine.accumulate(solution.presses());
            prop_assert_eq!(machine.joltage().unwrap(), counters.as_slice());
            prop_assert_eq!(brute_force(&machine), Some(solution.total()));
        }

        #[test]
        fn matches_brute_force(machine in arbitrary_strategy()) {
            prop_assert_eq!(brute_force(&machine), min_presses(&machine));
        }

        #[test]
        fn zero_targets_need_no_presses(machine in arbitrary_strategy()) {
            let n = machine.joltage().unwrap().len();
            let idle = Machine::new(Row::repeat(false, n), machine.buttons().to_vec(), Some(vec![0; n]));
            prop_assert_eq!(Some(0), min_presses(&idle));
        }
    }
}
