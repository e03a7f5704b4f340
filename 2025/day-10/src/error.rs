use miette::Diagnostic;
use thiserror::Error;

/// Reasons a single machine's search refuses to run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum SearchError {
    #[error("{free} free buttons exceed the search limit of {limit}")]
    #[diagnostic(
        code(day10::search::too_many_free_buttons),
        help("raise the limit if you are willing to wait for an exhaustive search")
    )]
    TooManyFreeButtons { free: usize, limit: usize },

    #[error("a value in the reduced system does not fit in 64 bits")]
    #[diagnostic(code(day10::search::coefficient_overflow))]
    CoefficientOverflow,

    #[error("the chosen free presses do not give every button a whole, non-negative count")]
    #[diagnostic(code(day10::search::invalid_assignment))]
    InvalidAssignment,
}

#[derive(Debug, Error, Diagnostic)]
pub enum Day10Error {
    #[error("machine {machine} cannot reach its target")]
    #[diagnostic(
        code(day10::unreachable),
        help("every machine in the manual is expected to be solvable")
    )]
    Unreachable { machine: usize },

    #[error("could not search machine {machine}")]
    #[diagnostic(code(day10::search))]
    Search {
        machine: usize,
        #[source]
        #[diagnostic_source]
        source: SearchError,
    },

    #[error("the total number of presses does not fit in 64 bits")]
    #[diagnostic(code(day10::total_overflow))]
    TotalOverflow,
}
