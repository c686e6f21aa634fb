//! Deployment orchestration: one site in, one structured result out.
//!
//! Each phase is caught locally and recorded; a failed phase never prevents
//! the later phases from producing their own record, and the orchestrator
//! itself never returns an error for a site that passed upstream validation.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::build::ArtifactBuilder;
use crate::config::SiteConfig;
use crate::error::{DeployError, Result};
use crate::service::ServiceLifecycle;
use crate::vcs::VersionControl;

/// Outcome of one deployment phase.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    pub fn ok(detail: impl Into<String>) -> Self {
        Self {
            success: true,
            detail: Some(detail.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            detail: None,
            error: Some(error.into()),
        }
    }
}

impl From<Result<String>> for StepResult {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(detail) => Self::ok(detail),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

/// Aggregate result for one site. Overall success is the conjunction of the
/// three step results, computed once all three have run.
#[derive(Debug, Serialize)]
pub struct DeploymentResult {
    pub site: String,
    pub success: bool,
    pub version_control: StepResult,
    pub preparation: StepResult,
    pub service: StepResult,
}

/// Sequences version control, preparation, and service lifecycle for one
/// site. Collaborators are trait objects so the pipeline can be exercised
/// end to end without svn, maven, or a container.
pub struct Orchestrator {
    vcs: Arc<dyn VersionControl>,
    builder: Arc<dyn ArtifactBuilder>,
    service: Arc<dyn ServiceLifecycle>,
}

impl Orchestrator {
    pub fn new(
        vcs: Arc<dyn VersionControl>,
        builder: Arc<dyn ArtifactBuilder>,
        service: Arc<dyn ServiceLifecycle>,
    ) -> Self {
        Self {
            vcs,
            builder,
            service,
        }
    }

    pub async fn deploy(&self, site: &SiteConfig) -> DeploymentResult {
        let name = site.name();
        info!(site = %name, "Starting deployment");

        let version_control = StepResult::from(self.version_control_phase().await);
        let preparation = StepResult::from(self.preparation_phase(site).await);
        let service = StepResult::from(self.service_phase(site).await);

        let success = version_control.success && preparation.success && service.success;
        if success {
            info!(site = %name, "Deployment completed");
        } else {
            error!(site = %name, "Deployment finished with errors");
        }

        DeploymentResult {
            site: name,
            success,
            version_control,
            preparation,
            service,
        }
    }

    /// Branch sync plus release tagging. Both run; either failing fails the
    /// step.
    async fn version_control_phase(&self) -> Result<String> {
        let synced = self.vcs.sync_working_copy().await?;
        let (tagged, tag) = self.vcs.create_release_tag().await?;

        if !synced {
            return Err(DeployError::VersionControl(
                "working copy sync failed".into(),
            ));
        }
        if !tagged {
            return Err(DeployError::VersionControl(format!(
                "release tag {tag} could not be created"
            )));
        }
        Ok(format!("working copy synced, release tag {tag}"))
    }

    /// Parameter extraction only: confirm the target parameters exist and
    /// log where the deployment is headed. No mutation.
    async fn preparation_phase(&self, site: &SiteConfig) -> Result<String> {
        let host = site.require("tomcat.host")?;
        let url = site.require("tomcat.url")?;
        let modules = site.require("tomcat.modules")?;
        let war_name = site.require("war.name")?;

        info!(host, url, modules, artifact = %format!("{war_name}.war"), "Deployment target");
        Ok(format!("target {host}, artifact {war_name}.war, modules {modules}"))
    }

    /// Checkout, build, and swap. Depends on the artifacts of the earlier
    /// phases, so an upstream failure surfaces here as a missing
    /// precondition rather than the step being skipped.
    async fn service_phase(&self, site: &SiteConfig) -> Result<String> {
        let war_name = site.require("war.name")?;
        let project = site.get("project").unwrap_or(war_name).to_string();

        let project_path = self.vcs.checkout_project(&project).await?;
        let artifact = self.builder.build(&project_path, war_name).await?;
        let report = self.service.install(&artifact, war_name).await?;

        let mut detail = format!("deployed {}", report.deployed.display());
        if let Some(backup) = &report.backup {
            detail.push_str(&format!(", backup {}", backup.display()));
        }
        if report.rolled_back {
            detail.push_str(", rolled back to previous artifact after start failure");
        }
        Ok(detail)
    }
}
