//! Command-line interface: clap definitions and terminal output.

mod commands;
mod display;

pub use commands::{Cli, Commands, OutputFormat};
pub use display::Display;
