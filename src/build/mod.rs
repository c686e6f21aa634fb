//! Build-tool invocation and artifact discovery.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::config::BuildConfig;
use crate::error::{DeployError, Result};
use crate::process::{CommandSpec, ProcessRunner};

/// Collaborator seam: turn a checked-out project into a deployable artifact.
#[async_trait]
pub trait ArtifactBuilder: Send + Sync {
    async fn build(&self, project_path: &Path, artifact_name: &str) -> Result<PathBuf>;
}

/// Runs Maven with an explicitly assembled environment so the build does not
/// depend on whatever JAVA_HOME/M2_HOME the orchestrator inherited.
pub struct MavenBuilder {
    config: BuildConfig,
    runner: Arc<dyn ProcessRunner>,
}

impl MavenBuilder {
    pub fn new(config: BuildConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { config, runner }
    }

    fn command(&self, project_path: &Path) -> CommandSpec {
        let program = match &self.config.maven_home {
            Some(home) => home.join("bin").join("mvn").to_string_lossy().into_owned(),
            None => "mvn".to_string(),
        };

        let mut spec = CommandSpec::new(program)
            .args(self.config.goals.iter().cloned())
            .cwd(project_path)
            .timeout(Duration::from_secs(self.config.timeout_secs));

        if let Some(java_home) = &self.config.java_home {
            spec = spec.env("JAVA_HOME", java_home.to_string_lossy().into_owned());
        }
        if let Some(maven_home) = &self.config.maven_home {
            spec = spec.env("M2_HOME", maven_home.to_string_lossy().into_owned());
            let bin = maven_home.join("bin");
            let ambient = std::env::var("PATH").unwrap_or_default();
            spec = spec.env("PATH", format!("{}:{}", bin.to_string_lossy(), ambient));
        }

        spec
    }

    /// Locate the produced artifact: exact conventional name first, then any
    /// `.war` in the output directory that is not a pre-packaging
    /// intermediate. Multiple candidates resolve to the most recently
    /// modified one.
    fn find_artifact(&self, target_dir: &Path, artifact_name: &str) -> Result<PathBuf> {
        let exact = target_dir.join(format!("{artifact_name}.war"));
        if exact.is_file() {
            return Ok(exact);
        }

        let entries = std::fs::read_dir(target_dir)
            .map_err(|e| DeployError::fs("scan build output directory", e))?;

        let mut best: Option<(std::time::SystemTime, PathBuf)> = None;
        for entry in entries {
            let entry = entry.map_err(|e| DeployError::fs("scan build output directory", e))?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();

            if !path.is_file() || !name.ends_with(".war") {
                continue;
            }
            if self
                .config
                .exclude_suffixes
                .iter()
                .any(|suffix| name.ends_with(suffix))
            {
                debug!(file = %name, "Skipping pre-packaging intermediate");
                continue;
            }

            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            if best.as_ref().map_or(true, |(t, _)| modified > *t) {
                best = Some((modified, path));
            }
        }

        match best {
            Some((_, path)) => {
                info!(artifact = %path.display(), "Resolved artifact by directory scan");
                Ok(path)
            }
            None => Err(DeployError::ArtifactNotFound(target_dir.to_path_buf())),
        }
    }
}

#[async_trait]
impl ArtifactBuilder for MavenBuilder {
    async fn build(&self, project_path: &Path, artifact_name: &str) -> Result<PathBuf> {
        if !project_path.join("pom.xml").is_file() {
            return Err(DeployError::Build(format!(
                "no pom.xml in {}",
                project_path.display()
            )));
        }

        let spec = self.command(project_path);
        info!(project = %project_path.display(), command = %spec.display_line(), "Running build");

        let output = self.runner.run(&spec).await?;
        debug!(stdout = %output.stdout, stderr = %output.stderr, "Build output");

        if !output.success() {
            error!(output = %output.tail(30), "Build failed");
            return Err(DeployError::Build(output.tail(30)));
        }

        self.find_artifact(&project_path.join("target"), artifact_name)
    }
}
