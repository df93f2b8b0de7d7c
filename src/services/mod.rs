pub mod assembler;
pub mod classifier;
pub mod counters;
pub mod engine;
pub mod metrics;
pub mod player_accumulator;
pub mod team_accumulator;

#[cfg(test)]
pub(crate) mod fixtures;

pub use assembler::RowAssembler;
pub use classifier::{classify, ClassifiedPlay, Contribution, PlayCategory, Stat};
pub use engine::{aggregate_game, StatsEngine};
