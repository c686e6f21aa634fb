use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "warship")]
#[command(
    author,
    version,
    about = "Multi-site release deployment for servlet containers",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Deployment settings file
    #[arg(long, global = true, default_value = "warship.toml", env = "WARSHIP_CONFIG")]
    pub config: PathBuf,

    #[arg(short, long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy every site listed in the sites file, one after another
    Deploy {
        /// CSV file with one row per site
        sites: PathBuf,

        /// Only deploy sites whose name matches
        #[arg(long)]
        site: Option<String>,
    },

    /// Validate settings and site rows without touching svn, maven, or the
    /// container
    Check {
        /// CSV file with one row per site
        sites: PathBuf,
    },

    /// Write a settings file with default values
    Init,
}
