//! Version-control operations: branch sync, release tagging, per-project
//! fresh checkouts. All subprocess work goes through the `ProcessRunner`
//! seam so tag and counter semantics stay testable without a live server.

mod counter;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use crate::config::{SvnConfig, TagConfig};
use crate::error::{DeployError, Result};
use crate::process::{CommandSpec, ProcessRunner};

pub use counter::{CounterStore, FileCounterStore};

/// An immutable release tag: base prefix plus the counter value it was
/// created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag {
    pub prefix: String,
    pub version: u64,
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.version)
    }
}

/// Collaborator seam the orchestrator drives.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Checkout or update the shared working copy. A failed command is a
    /// `false` return, not an error.
    async fn sync_working_copy(&self) -> Result<bool>;

    /// Create the next release tag. The persisted counter only advances on a
    /// confirmed copy, so a failed attempt reuses the same version on retry.
    async fn create_release_tag(&self) -> Result<(bool, VersionTag)>;

    /// Fresh, clean checkout of one project under the branch root. Fails
    /// loudly when the tool reports success but produced nothing.
    async fn checkout_project(&self, project: &str) -> Result<PathBuf>;
}

pub struct SvnManager {
    svn: SvnConfig,
    tag: TagConfig,
    runner: Arc<dyn ProcessRunner>,
    counter: Arc<dyn CounterStore>,
}

impl SvnManager {
    pub fn new(
        svn: SvnConfig,
        tag: TagConfig,
        runner: Arc<dyn ProcessRunner>,
        counter: Arc<dyn CounterStore>,
    ) -> Self {
        Self {
            svn,
            tag,
            runner,
            counter,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.svn.timeout_secs)
    }

    /// Common credential/interaction flags for every svn invocation.
    fn with_auth(&self, spec: CommandSpec) -> CommandSpec {
        let mut spec = spec
            .arg("--username")
            .arg(&self.svn.username)
            .arg("--password")
            .arg(&self.svn.password)
            .arg("--non-interactive");
        if self.svn.trust_server_cert {
            spec = spec.arg("--trust-server-cert");
        }
        spec.timeout(self.timeout())
    }
}

#[async_trait]
impl VersionControl for SvnManager {
    async fn sync_working_copy(&self) -> Result<bool> {
        let local = &self.svn.working_copy;
        tokio::fs::create_dir_all(local)
            .await
            .map_err(|e| DeployError::fs("create working copy directory", e))?;

        let local_str = local.to_string_lossy().into_owned();
        let spec = if local.join(".svn").exists() {
            info!(path = %local.display(), "Updating working copy");
            CommandSpec::new("svn").arg("update").arg(&local_str)
        } else {
            info!(path = %local.display(), branch = %self.svn.branch_url(), "Checking out working copy");
            CommandSpec::new("svn")
                .arg("checkout")
                .arg(self.svn.branch_url())
                .arg(&local_str)
        };

        let output = self.runner.run(&self.with_auth(spec)).await?;
        if !output.success() {
            error!(output = %output.tail(20), "Working copy sync failed");
            return Ok(false);
        }

        info!("Working copy in sync");
        Ok(true)
    }

    async fn create_release_tag(&self) -> Result<(bool, VersionTag)> {
        let stored = self.counter.read().await?;
        let current = stored.unwrap_or(self.tag.baseline);
        let next = current + self.tag.step;
        let tag = VersionTag {
            prefix: self.tag.prefix.clone(),
            version: next,
        };

        info!(tag = %tag, "Creating release tag");

        let spec = CommandSpec::new("svn")
            .arg("copy")
            .arg(self.svn.branch_url())
            .arg(self.svn.tag_url(&tag.to_string()))
            .arg("-m")
            .arg(format!("Creating release tag {tag}"));

        let output = self.runner.run(&self.with_auth(spec)).await?;
        if !output.success() {
            // Counter untouched: a retry will reuse this version number.
            error!(tag = %tag, output = %output.tail(20), "Tag copy failed");
            return Ok((false, tag));
        }

        let written = self.counter.write_if_unchanged(stored, next).await?;
        if !written {
            return Err(DeployError::VersionControl(format!(
                "tag {tag} was created but the counter store changed underneath; \
                 refusing to persist {next}"
            )));
        }

        info!(tag = %tag, "Release tag created");
        Ok((true, tag))
    }

    async fn checkout_project(&self, project: &str) -> Result<PathBuf> {
        let local = self.svn.projects_dir.join(project);

        // A stale checkout would poison the build; always start clean.
        if local.exists() {
            tokio::fs::remove_dir_all(&local)
                .await
                .map_err(|e| DeployError::fs(format!("remove stale checkout {project}"), e))?;
        }
        tokio::fs::create_dir_all(&local)
            .await
            .map_err(|e| DeployError::fs(format!("create checkout directory {project}"), e))?;

        let url = format!("{}/{}", self.svn.branch_url(), project);
        info!(project, url = %url, "Checking out project");

        let spec = CommandSpec::new("svn")
            .arg("checkout")
            .arg(&url)
            .arg(local.to_string_lossy().into_owned());
        let output = self.runner.run(&self.with_auth(spec)).await?;
        if !output.success() {
            return Err(DeployError::VersionControl(format!(
                "checkout of {project} failed: {}",
                output.tail(10)
            )));
        }

        if checkout_is_empty(&local).await? {
            return Err(DeployError::EmptyCheckout {
                project: project.to_string(),
                path: local,
            });
        }

        Ok(local)
    }
}

/// True when the directory holds nothing besides svn metadata, i.e. the tool
/// reported success but delivered no sources.
async fn checkout_is_empty(path: &std::path::Path) -> Result<bool> {
    let mut entries = tokio::fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name() != ".svn" {
            return Ok(false);
        }
    }
    Ok(true)
}
