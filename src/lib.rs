pub mod build;
pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod process;
pub mod service;
pub mod vcs;

pub use build::{ArtifactBuilder, MavenBuilder};
pub use config::{DeployConfig, SiteConfig};
pub use deploy::{DeploymentResult, Orchestrator, StepResult};
pub use error::{DeployError, Result};
pub use process::{CommandSpec, CommandStrategy, ProcessRunner, StrategyRunner, SystemRunner};
pub use service::{ServiceLifecycle, SwapReport, TomcatManager};
pub use vcs::{CounterStore, FileCounterStore, SvnManager, VersionControl, VersionTag};
