use clap::Parser;
use miette::*;

use aoc2025_day_10::config::Args;
use aoc2025_day_10::part1;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let input = args.read_input("input1.txt")?;
    let result = part1::process_with(&input, &args.config())?;
    println!("Result: {}", result);
    Ok(())
}
