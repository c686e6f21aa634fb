use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{DeployError, Result};

/// Process-wide deployment settings, loaded from `warship.toml`.
///
/// Every section has working defaults so a missing file yields a usable
/// (localhost-flavored) configuration; `validate` rejects values the
/// pipeline cannot run with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub svn: SvnConfig,
    pub tag: TagConfig,
    pub build: BuildConfig,
    pub service: ServiceConfig,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            svn: SvnConfig::default(),
            tag: TagConfig::default(),
            build: BuildConfig::default(),
            service: ServiceConfig::default(),
        }
    }
}

impl DeployConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = fs::read_to_string(path).await?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content =
            toml::to_string_pretty(self).map_err(|e| DeployError::Config(e.to_string()))?;
        fs::write(path, content).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.svn.url.trim().is_empty() {
            return Err(DeployError::Config("svn.url must not be empty".into()));
        }
        if self.svn.branch.trim().is_empty() {
            return Err(DeployError::Config("svn.branch must not be empty".into()));
        }
        if self.tag.step == 0 {
            return Err(DeployError::Config("tag.step must be at least 1".into()));
        }
        if self.tag.prefix.trim().is_empty() {
            return Err(DeployError::Config("tag.prefix must not be empty".into()));
        }
        if self.build.timeout_secs == 0 {
            return Err(DeployError::Config(
                "build.timeout_secs must be at least 1".into(),
            ));
        }
        if self.service.command_timeout_secs == 0 {
            return Err(DeployError::Config(
                "service.command_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Repository access and working-copy layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SvnConfig {
    /// Repository root URL, e.g. `https://localhost/svn/repo`.
    pub url: String,
    /// Branch path under the root, e.g. `branches/main`.
    pub branch: String,
    /// Tag directory under the root.
    pub tags_dir: String,
    pub username: String,
    pub password: String,
    pub trust_server_cert: bool,
    pub timeout_secs: u64,
    /// Local working copy kept in sync with the branch.
    pub working_copy: PathBuf,
    /// Parent directory for per-project fresh checkouts.
    pub projects_dir: PathBuf,
}

impl Default for SvnConfig {
    fn default() -> Self {
        Self {
            url: "https://localhost/svn/repo".into(),
            branch: "branches/main".into(),
            tags_dir: "tags".into(),
            username: String::new(),
            password: String::new(),
            trust_server_cert: true,
            timeout_secs: 120,
            working_copy: PathBuf::from("svn_work"),
            projects_dir: PathBuf::from("projects"),
        }
    }
}

impl SvnConfig {
    pub fn branch_url(&self) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), self.branch)
    }

    pub fn tag_url(&self, tag_name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.url.trim_end_matches('/'),
            self.tags_dir,
            tag_name
        )
    }
}

/// Release-tag naming and counter policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TagConfig {
    pub prefix: String,
    /// Counter increment per release.
    pub step: u64,
    /// Counter value assumed when the store is missing or unreadable.
    pub baseline: u64,
    /// Plain text file holding the last-used version number.
    pub counter_file: PathBuf,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            prefix: "RELEASE_".into(),
            step: 2,
            baseline: 39,
            counter_file: PathBuf::from("last_tag_version.txt"),
        }
    }
}

/// Build-tool invocation. The environment is assembled explicitly so the
/// build does not depend on whatever the orchestrator inherited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub maven_home: Option<PathBuf>,
    pub java_home: Option<PathBuf>,
    pub goals: Vec<String>,
    pub timeout_secs: u64,
    /// Artifact names ending in one of these are pre-packaging intermediates.
    pub exclude_suffixes: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            maven_home: None,
            java_home: None,
            goals: vec!["clean".into(), "package".into()],
            timeout_secs: 600,
            exclude_suffixes: vec![".war.original".into()],
        }
    }
}

/// How aggressively service-control failures are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceControlMode {
    /// Stop/start exhaustion fails the deployment step.
    Strict,
    /// Stop/start exhaustion is logged and the swap proceeds; keeps the
    /// pipeline moving at the cost of swapping under a live process.
    BestEffort,
}

/// Target container and swap behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub catalina_home: PathBuf,
    /// Defaults to `<catalina_home>/webapps`.
    pub webapps_dir: Option<PathBuf>,
    /// Service-manager unit/service name.
    pub service_name: String,
    pub mode: ServiceControlMode,
    /// Restore the backup and retry start once when start fails after a swap.
    pub rollback_on_start_failure: bool,
    pub command_timeout_secs: u64,
    /// Override the built-in stop strategy; each entry is one argument vector.
    pub stop_commands: Vec<Vec<String>>,
    /// Override the built-in start strategy.
    pub start_commands: Vec<Vec<String>>,
    /// Probe run before stopping; exit zero means the service is running.
    pub liveness_command: Option<Vec<String>>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            catalina_home: PathBuf::from("/opt/tomcat"),
            webapps_dir: None,
            service_name: "tomcat".into(),
            mode: ServiceControlMode::BestEffort,
            rollback_on_start_failure: true,
            command_timeout_secs: 30,
            stop_commands: Vec::new(),
            start_commands: Vec::new(),
            liveness_command: None,
        }
    }
}

impl ServiceConfig {
    pub fn webapps_dir(&self) -> PathBuf {
        self.webapps_dir
            .clone()
            .unwrap_or_else(|| self.catalina_home.join("webapps"))
    }
}
