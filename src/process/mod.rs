//! External process execution.
//!
//! `CommandSpec`/`SystemRunner` cover a single bounded invocation;
//! `StrategyRunner` tries ordered alternatives for one logical action until
//! one of them exits zero.

mod runner;
mod strategy;

pub use runner::{CommandOutput, CommandSpec, ProcessRunner, SystemRunner};
pub use strategy::{CommandStrategy, StrategyOutcome, StrategyRunner};

#[cfg(test)]
pub(crate) use runner::testing;
