//! Service lifecycle: stop the container, back up and swap the deployed
//! artifact, start the container again.
//!
//! Stop and start go through ordered command strategies because no single
//! control mechanism is reliable on every host. Whether strategy exhaustion
//! is fatal depends on the configured `ServiceControlMode`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use tracing::{info, warn};

use crate::config::{ServiceConfig, ServiceControlMode};
use crate::error::{DeployError, Result};
use crate::process::{CommandSpec, CommandStrategy, ProcessRunner, StrategyRunner};

/// What the swap did: where the new artifact landed and where the previous
/// one was preserved, if there was one.
#[derive(Debug, Clone)]
pub struct SwapReport {
    pub deployed: PathBuf,
    pub backup: Option<PathBuf>,
    /// Start succeeded only after restoring the backup.
    pub rolled_back: bool,
}

/// Collaborator seam: install an artifact into the running host.
#[async_trait]
pub trait ServiceLifecycle: Send + Sync {
    async fn install(&self, artifact: &Path, deployed_name: &str) -> Result<SwapReport>;
}

pub struct TomcatManager {
    config: ServiceConfig,
    runner: Arc<dyn ProcessRunner>,
    strategies: StrategyRunner,
}

impl TomcatManager {
    pub fn new(config: ServiceConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        let strategies = StrategyRunner::new(runner.clone());
        Self {
            config,
            runner,
            strategies,
        }
    }

    fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.config.command_timeout_secs)
    }

    fn specs_from_override(&self, commands: &[Vec<String>]) -> Vec<CommandSpec> {
        commands
            .iter()
            .filter_map(|argv| CommandSpec::from_argv(argv))
            .map(|spec| spec.timeout(self.command_timeout()))
            .collect()
    }

    fn stop_strategy(&self) -> CommandStrategy {
        let mut strategy = CommandStrategy::new("stop service");
        let attempts = if self.config.stop_commands.is_empty() {
            self.default_stop_attempts()
        } else {
            self.specs_from_override(&self.config.stop_commands)
        };
        strategy.attempts = attempts;
        strategy
    }

    fn start_strategy(&self) -> CommandStrategy {
        let mut strategy = CommandStrategy::new("start service");
        let attempts = if self.config.start_commands.is_empty() {
            self.default_start_attempts()
        } else {
            self.specs_from_override(&self.config.start_commands)
        };
        strategy.attempts = attempts;
        strategy
    }

    /// Graceful shutdown script first, then the service manager, then
    /// forceful process termination.
    fn default_stop_attempts(&self) -> Vec<CommandSpec> {
        let bin = self.config.catalina_home.join("bin");
        let timeout = self.command_timeout();

        if cfg!(windows) {
            vec![
                CommandSpec::new(bin.join("shutdown.bat").to_string_lossy().into_owned())
                    .timeout(timeout),
                CommandSpec::new("net")
                    .arg("stop")
                    .arg(&self.config.service_name)
                    .timeout(timeout),
                CommandSpec::new("taskkill")
                    .args(["/F", "/IM", "catalina.exe"])
                    .timeout(timeout),
            ]
        } else {
            vec![
                CommandSpec::new(bin.join("shutdown.sh").to_string_lossy().into_owned())
                    .timeout(timeout),
                CommandSpec::new("systemctl")
                    .arg("stop")
                    .arg(&self.config.service_name)
                    .timeout(timeout),
                CommandSpec::new("pkill")
                    .args(["-f", "org.apache.catalina"])
                    .timeout(timeout),
            ]
        }
    }

    fn default_start_attempts(&self) -> Vec<CommandSpec> {
        let bin = self.config.catalina_home.join("bin");
        let timeout = self.command_timeout();

        if cfg!(windows) {
            vec![
                CommandSpec::new(bin.join("startup.bat").to_string_lossy().into_owned())
                    .timeout(timeout),
                CommandSpec::new("net")
                    .arg("start")
                    .arg(&self.config.service_name)
                    .timeout(timeout),
            ]
        } else {
            vec![
                CommandSpec::new(bin.join("startup.sh").to_string_lossy().into_owned())
                    .timeout(timeout),
                CommandSpec::new("systemctl")
                    .arg("start")
                    .arg(&self.config.service_name)
                    .timeout(timeout),
            ]
        }
    }

    /// Probe whether the service process is present. No probe configured
    /// means we assume it is running.
    async fn is_running(&self) -> bool {
        let Some(argv) = &self.config.liveness_command else {
            return true;
        };
        let Some(spec) = CommandSpec::from_argv(argv) else {
            return true;
        };
        match self.runner.run(&spec.timeout(self.command_timeout())).await {
            Ok(output) => output.success(),
            Err(e) => {
                warn!(error = %e, "Liveness probe could not run, assuming service is up");
                true
            }
        }
    }

    /// Apply the configured mode to an exhausted strategy: strict raises,
    /// best-effort logs and carries on.
    fn exhausted(&self, action: &str, attempts: usize) -> Result<bool> {
        match self.config.mode {
            ServiceControlMode::Strict => Err(DeployError::ServiceControl {
                action: action.to_string(),
                attempts,
            }),
            ServiceControlMode::BestEffort => {
                warn!(action, "Every control command failed, continuing anyway");
                Ok(false)
            }
        }
    }

    /// Returns whether the service was confirmed stopped. Exhaustion is an
    /// error only in strict mode.
    pub async fn stop(&self) -> Result<bool> {
        if !self.is_running().await {
            info!("Service not running, skipping stop");
            return Ok(true);
        }

        let strategy = self.stop_strategy();
        let outcome = self.strategies.run(&strategy).await;
        if outcome.success {
            return Ok(true);
        }
        self.exhausted(&strategy.action, outcome.attempts_run)
    }

    /// Run the start strategy; exhaustion is reported, not raised, so the
    /// caller can attempt a rollback before the mode decides severity.
    async fn try_start(&self) -> bool {
        let strategy = self.start_strategy();
        self.strategies.run(&strategy).await.success
    }

    /// Backup the deployed artifact, remove it and its expanded directory,
    /// copy the new artifact in. Any filesystem failure aborts the swap.
    pub async fn swap_artifact(&self, artifact: &Path, deployed_name: &str) -> Result<SwapReport> {
        let webapps = self.config.webapps_dir();
        let destination = webapps.join(format!("{deployed_name}.war"));
        let expanded = webapps.join(deployed_name);

        let backup = if destination.exists() {
            let stamp = Local::now().format("%Y%m%d_%H%M%S");
            let backup = webapps.join(format!("{deployed_name}.war.{stamp}.bak"));
            info!(backup = %backup.display(), "Backing up deployed artifact");
            tokio::fs::copy(&destination, &backup)
                .await
                .map_err(|e| DeployError::fs("backup deployed artifact", e))?;
            Some(backup)
        } else {
            info!("No deployed artifact present, skipping backup");
            None
        };

        if destination.exists() {
            tokio::fs::remove_file(&destination)
                .await
                .map_err(|e| DeployError::fs("remove stale artifact", e))?;
        }
        if expanded.is_dir() {
            tokio::fs::remove_dir_all(&expanded)
                .await
                .map_err(|e| DeployError::fs("remove expanded directory", e))?;
        }

        info!(from = %artifact.display(), to = %destination.display(), "Installing new artifact");
        tokio::fs::copy(artifact, &destination)
            .await
            .map_err(|e| DeployError::fs("copy new artifact", e))?;

        Ok(SwapReport {
            deployed: destination,
            backup,
            rolled_back: false,
        })
    }

    async fn restore_backup(&self, report: &SwapReport) -> Result<()> {
        let Some(backup) = &report.backup else {
            return Ok(());
        };
        warn!(backup = %backup.display(), "Restoring previous artifact");
        tokio::fs::copy(backup, &report.deployed)
            .await
            .map_err(|e| DeployError::fs("restore backup artifact", e))?;
        Ok(())
    }
}

#[async_trait]
impl ServiceLifecycle for TomcatManager {
    async fn install(&self, artifact: &Path, deployed_name: &str) -> Result<SwapReport> {
        let stopped = self.stop().await?;
        if !stopped {
            warn!("Swapping files under a possibly live process");
        }

        let mut report = self.swap_artifact(artifact, deployed_name).await?;

        let mut started = self.try_start().await;
        if !started && self.config.rollback_on_start_failure && report.backup.is_some() {
            // The new artifact would not start; put the old one back and try
            // once more rather than leaving the service down.
            self.restore_backup(&report).await?;
            report.rolled_back = true;
            started = self.try_start().await;
            if started {
                info!("Service started on rolled-back artifact");
            } else {
                warn!("Service still down after rollback");
            }
        }

        if !started {
            self.exhausted("start service", self.start_strategy().attempts.len())?;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::ScriptedRunner;
    use std::fs;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> ServiceConfig {
        ServiceConfig {
            webapps_dir: Some(dir.path().join("webapps")),
            ..ServiceConfig::default()
        }
    }

    fn new_artifact(dir: &TempDir, bytes: &str) -> PathBuf {
        let path = dir.path().join("build/siteA.war");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn swap_backs_up_then_replaces_destination() {
        let dir = TempDir::new().unwrap();
        let webapps = dir.path().join("webapps");
        fs::create_dir_all(webapps.join("siteA")).unwrap();
        fs::write(webapps.join("siteA.war"), "old bytes").unwrap();
        let artifact = new_artifact(&dir, "new bytes");

        let mgr = TomcatManager::new(config(&dir), Arc::new(ScriptedRunner::new(vec![])));
        let report = mgr.swap_artifact(&artifact, "siteA").await.unwrap();

        let backup = report.backup.expect("backup taken");
        assert_ne!(backup, report.deployed);
        assert_eq!(fs::read_to_string(&backup).unwrap(), "old bytes");
        assert_eq!(fs::read_to_string(&report.deployed).unwrap(), "new bytes");
        // Expanded directory of the old deployment is gone.
        assert!(!webapps.join("siteA").exists());
    }

    #[tokio::test]
    async fn swap_without_existing_artifact_skips_backup() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("webapps")).unwrap();
        let artifact = new_artifact(&dir, "new bytes");

        let mgr = TomcatManager::new(config(&dir), Arc::new(ScriptedRunner::new(vec![])));
        let report = mgr.swap_artifact(&artifact, "siteA").await.unwrap();

        assert!(report.backup.is_none());
        assert_eq!(fs::read_to_string(&report.deployed).unwrap(), "new bytes");
    }

    #[tokio::test]
    async fn swap_fails_when_webapps_missing() {
        let dir = TempDir::new().unwrap();
        let artifact = new_artifact(&dir, "new bytes");

        let mgr = TomcatManager::new(config(&dir), Arc::new(ScriptedRunner::new(vec![])));
        let err = mgr.swap_artifact(&artifact, "siteA").await.unwrap_err();
        assert!(matches!(err, DeployError::Filesystem { .. }));
    }

    fn override_commands(n: usize) -> Vec<Vec<String>> {
        (0..n).map(|i| vec![format!("cmd{i}")]).collect()
    }

    #[tokio::test]
    async fn stop_skipped_when_liveness_probe_says_down() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(&dir);
        cfg.liveness_command = Some(vec!["pgrep".into(), "-f".into(), "catalina".into()]);
        cfg.stop_commands = override_commands(2);

        // Probe exits nonzero: not running. No stop attempt is launched.
        let runner = Arc::new(ScriptedRunner::new(vec![ScriptedRunner::exit(1)]));
        let mgr = TomcatManager::new(cfg, runner.clone());

        assert!(mgr.stop().await.unwrap());
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn best_effort_stop_exhaustion_is_soft() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(&dir);
        cfg.stop_commands = override_commands(2);

        let runner = Arc::new(ScriptedRunner::new(vec![
            ScriptedRunner::exit(1),
            ScriptedRunner::exit(1),
        ]));
        let mgr = TomcatManager::new(cfg, runner);

        assert!(!mgr.stop().await.unwrap());
    }

    #[tokio::test]
    async fn strict_stop_exhaustion_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(&dir);
        cfg.mode = ServiceControlMode::Strict;
        cfg.stop_commands = override_commands(2);

        let runner = Arc::new(ScriptedRunner::new(vec![
            ScriptedRunner::exit(1),
            ScriptedRunner::exit(1),
        ]));
        let mgr = TomcatManager::new(cfg, runner);

        let err = mgr.stop().await.unwrap_err();
        assert!(matches!(
            err,
            DeployError::ServiceControl { attempts: 2, .. }
        ));
    }

    #[tokio::test]
    async fn install_rolls_back_when_start_fails() {
        let dir = TempDir::new().unwrap();
        let webapps = dir.path().join("webapps");
        fs::create_dir_all(&webapps).unwrap();
        fs::write(webapps.join("siteA.war"), "old bytes").unwrap();
        let artifact = new_artifact(&dir, "new bytes");

        let mut cfg = config(&dir);
        cfg.stop_commands = override_commands(1);
        cfg.start_commands = override_commands(1);

        // stop ok, start fails, start-after-rollback ok.
        let runner = Arc::new(ScriptedRunner::new(vec![
            ScriptedRunner::exit(0),
            ScriptedRunner::exit(1),
            ScriptedRunner::exit(0),
        ]));
        let mgr = TomcatManager::new(cfg, runner);

        let report = mgr.install(&artifact, "siteA").await.unwrap();
        assert!(report.rolled_back);
        // Destination holds the previous bytes again.
        assert_eq!(
            fs::read_to_string(&report.deployed).unwrap(),
            "old bytes"
        );
    }

    #[tokio::test]
    async fn strict_install_errors_when_start_fails_even_after_rollback() {
        let dir = TempDir::new().unwrap();
        let webapps = dir.path().join("webapps");
        fs::create_dir_all(&webapps).unwrap();
        fs::write(webapps.join("siteA.war"), "old bytes").unwrap();
        let artifact = new_artifact(&dir, "new bytes");

        let mut cfg = config(&dir);
        cfg.mode = ServiceControlMode::Strict;
        cfg.stop_commands = override_commands(1);
        cfg.start_commands = override_commands(1);

        // stop ok, start fails, start-after-rollback fails too.
        let runner = Arc::new(ScriptedRunner::new(vec![
            ScriptedRunner::exit(0),
            ScriptedRunner::exit(1),
            ScriptedRunner::exit(1),
        ]));
        let mgr = TomcatManager::new(cfg, runner);

        let err = mgr.install(&artifact, "siteA").await.unwrap_err();
        assert!(matches!(
            err,
            DeployError::ServiceControl { attempts: 1, .. }
        ));
        assert!(err.to_string().contains("start service"));
        // The rollback still happened before the error surfaced.
        assert_eq!(
            fs::read_to_string(webapps.join("siteA.war")).unwrap(),
            "old bytes"
        );
    }

    #[tokio::test]
    async fn install_without_backup_cannot_roll_back() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("webapps")).unwrap();
        let artifact = new_artifact(&dir, "new bytes");

        let mut cfg = config(&dir);
        cfg.stop_commands = override_commands(1);
        cfg.start_commands = override_commands(1);

        let runner = Arc::new(ScriptedRunner::new(vec![
            ScriptedRunner::exit(0),
            ScriptedRunner::exit(1),
        ]));
        let mgr = TomcatManager::new(cfg, runner);

        let report = mgr.install(&artifact, "siteA").await.unwrap();
        assert!(!report.rolled_back);
        assert_eq!(
            fs::read_to_string(&report.deployed).unwrap(),
            "new bytes"
        );
    }
}
