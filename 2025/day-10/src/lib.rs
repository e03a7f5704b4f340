pub mod accumulate;
pub mod aggregate;
pub mod config;
pub mod error;
pub mod gf2;
pub mod machine;
pub mod parser;
pub mod part1;
pub mod part2;
