//! Exercises the service lifecycle against real processes (`true`/`false`)
//! and a temporary webapps directory.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use warship::config::{ServiceConfig, ServiceControlMode};
use warship::service::ServiceLifecycle;
use warship::process::SystemRunner;
use warship::TomcatManager;

fn config(dir: &TempDir, stop: &[&str], start: &[&str]) -> ServiceConfig {
    ServiceConfig {
        webapps_dir: Some(dir.path().join("webapps")),
        stop_commands: vec![stop.iter().map(|s| s.to_string()).collect()],
        start_commands: vec![start.iter().map(|s| s.to_string()).collect()],
        ..ServiceConfig::default()
    }
}

fn artifact(dir: &TempDir, bytes: &str) -> PathBuf {
    let path = dir.path().join("build/siteA.war");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, bytes).unwrap();
    path
}

#[tokio::test]
async fn install_swaps_artifact_with_working_commands() {
    let dir = TempDir::new().unwrap();
    let webapps = dir.path().join("webapps");
    fs::create_dir_all(&webapps).unwrap();
    fs::write(webapps.join("siteA.war"), "previous release").unwrap();
    let new = artifact(&dir, "new release");

    let mgr = TomcatManager::new(config(&dir, &["true"], &["true"]), Arc::new(SystemRunner));
    let report = mgr.install(&new, "siteA").await.unwrap();

    assert_eq!(
        fs::read_to_string(&report.deployed).unwrap(),
        "new release"
    );
    let backup = report.backup.unwrap();
    assert_eq!(fs::read_to_string(backup).unwrap(), "previous release");
    assert!(!report.rolled_back);
}

#[tokio::test]
async fn best_effort_install_survives_failing_service_commands() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("webapps")).unwrap();
    let new = artifact(&dir, "new release");

    // Both stop and start fail; best-effort mode still swaps the artifact.
    let mgr = TomcatManager::new(config(&dir, &["false"], &["false"]), Arc::new(SystemRunner));
    let report = mgr.install(&new, "siteA").await.unwrap();

    assert_eq!(
        fs::read_to_string(&report.deployed).unwrap(),
        "new release"
    );
    // No backup existed, so there was nothing to roll back to.
    assert!(!report.rolled_back);
}

#[tokio::test]
async fn strict_install_fails_when_stop_is_exhausted() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("webapps")).unwrap();
    let new = artifact(&dir, "new release");

    let mut cfg = config(&dir, &["false"], &["true"]);
    cfg.mode = ServiceControlMode::Strict;

    let mgr = TomcatManager::new(cfg, Arc::new(SystemRunner));
    let err = mgr.install(&new, "siteA").await.unwrap_err();
    assert!(err.to_string().contains("stop service"));

    // The swap never ran.
    assert!(!dir.path().join("webapps/siteA.war").exists());
}
