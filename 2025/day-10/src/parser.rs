use chumsky::prelude::*;
use miette::{miette, Result};

use crate::machine::{Machine, Row};

fn number<'a, T>() -> impl Parser<'a, &'a str, T, extra::Err<Rich<'a, char>>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    text::int(10).try_map(|digits: &str, span| {
        digits
            .parse::<T>()
            .map_err(|e| Rich::custom(span, format!("invalid number {digits}: {e}")))
    })
}

fn parser<'a>() -> impl Parser<'a, &'a str, Vec<Machine>, extra::Err<Rich<'a, char>>> {
    // Custom whitespace parser that excludes newlines
    let hspace = one_of(" \t").repeated();

    let light = choice((just('.').to(false), just('#').to(true)));

    // [.##.]
    let diagram = light
        .repeated()
        .collect::<Vec<bool>>()
        .map(|v| v.into_iter().collect::<Row>())
        .delimited_by(just('['), just(']'));

    // (0,2,3)
    let button = number::<usize>()
        .separated_by(just(','))
        .collect::<Vec<usize>>()
        .delimited_by(just('('), just(')'));

    // (0,2) (1,3) ...
    let buttons = button.padded_by(hspace).repeated().collect::<Vec<_>>();

    // {3,5,4,7}
    let joltage = number::<u64>()
        .separated_by(just(','))
        .collect::<Vec<u64>>()
        .delimited_by(just('{'), just('}'));

    let machine = diagram
        .then_ignore(hspace)
        .then(buttons)
        .then(joltage.or_not())
        .then_ignore(hspace)
        .map(|((lights, buttons), joltage)| Machine::new(lights, buttons, joltage));

    // Lines holding only spaces count as blank.
    let separator = text::newline().then(hspace).repeated().at_least(1);

    hspace.ignore_then(
        machine
            .separated_by(separator)
            .allow_leading()
            .allow_trailing()
            .collect::<Vec<_>>(),
    )
}

/// Parses one machine per line. Blank lines are skipped.
pub fn parse_machines(input: &str) -> Result<Vec<Machine>> {
    parser()
        .parse(input)
        .into_result()
        .map_err(|e| miette!("Parse failed: {:?}", e))
}
