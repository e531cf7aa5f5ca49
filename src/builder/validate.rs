//! Stage 1: local preconditions

use super::{BuildContext, CloudBuilder};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::types::Stage;
use crate::utils::derive_repo_name;
use std::path::{Path, PathBuf};

/// Directory the project generator writes to, relative to the working directory
pub(crate) const PROJECT_DIR: &str = "output";

/// Workflow directory inside the generated project
pub(crate) fn workflows_dir(project: &Path) -> PathBuf {
    project.join(".github").join("workflows")
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

impl CloudBuilder {
    /// Check the generated project, the VCS and the app config; no network calls
    ///
    /// Also settles the repository name, deriving it from the app name when the
    /// request left it unset.
    pub(crate) async fn validate(&self, ctx: &mut BuildContext) -> Result<()> {
        let stage = Stage::Validate;
        self.start_stage(stage);

        let project = ctx.working_dir.join(PROJECT_DIR);
        if !is_dir(&project).await {
            return Err(Error::MissingOutput { path: project });
        }

        let workflows = workflows_dir(&project);
        if !is_dir(&workflows).await {
            return Err(Error::MissingWorkflows { path: workflows });
        }

        self.vcs.check_available().await?;

        let config = AppConfig::load(&ctx.working_dir).await?;
        let app_name = config
            .as_ref()
            .and_then(|c| c.app_name())
            .ok_or_else(|| Error::MissingConfig {
                path: AppConfig::path(&ctx.working_dir),
            })?;
        ctx.app_name = app_name.to_string();

        let repo_name = ctx
            .repo_name
            .get_or_insert_with(|| derive_repo_name(app_name))
            .clone();

        tracing::debug!(app = %ctx.app_name, repo = %repo_name, "project validated");
        self.success(stage, "Project validated");
        self.info(stage, format!("App: {}", ctx.app_name));
        Ok(())
    }
}
