//! Stage 4: stage the generated project and force-push it

use super::validate::PROJECT_DIR;
use super::{BuildContext, CloudBuilder};
use crate::error::{Error, Result};
use crate::types::Stage;
use crate::vcs::PushRequest;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use url::Url;
use walkdir::WalkDir;

/// Scratch directory for one push, removed by [`StagingDir::remove`] or on drop
#[derive(Debug)]
pub(crate) struct StagingDir {
    path: PathBuf,
    removed: bool,
}

impl StagingDir {
    /// Create an empty staging directory at `path`, discarding leftovers from an
    /// interrupted earlier run
    pub(crate) async fn create(path: PathBuf) -> Result<Self> {
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "removed stale staging directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_context(e, "remove stale staging directory", &path)),
        }
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| io_context(e, "create staging directory", &path))?;
        Ok(Self {
            path,
            removed: false,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory without blocking the runtime
    ///
    /// Drop only falls back to a blocking removal when this was never reached.
    pub(crate) async fn remove(mut self) -> Result<()> {
        self.removed = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_context(e, "remove staging directory", &self.path)),
        }
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove staging directory");
        }
    }
}

fn io_context(e: std::io::Error, action: &str, path: &Path) -> Error {
    Error::Io(std::io::Error::new(
        e.kind(),
        format!("Failed to {} '{}': {}", action, path.display(), e),
    ))
}

/// Lay out `project` inside `staging` the way the CI host expects it
///
/// Everything except `.github` goes under `staging/output/`; `.github` moves to
/// the staging root so its workflows are picked up. Returns the number of files
/// copied.
pub(crate) fn stage_project(project: &Path, staging: &Path) -> Result<usize> {
    let mut copied = 0;

    for entry in WalkDir::new(project).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_default();
            let io = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
            io_context(io, "read", &path)
        })?;

        let relative = entry
            .path()
            .strip_prefix(project)
            .map_err(|e| Error::Other(format!("unexpected path outside project: {e}")))?;

        let target = if relative.starts_with(".github") {
            staging.join(relative)
        } else {
            staging.join(PROJECT_DIR).join(relative)
        };

        if entry.file_type().is_symlink() {
            copy_symlink(entry.path(), &target)?;
            copied += 1;
        } else if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| io_context(e, "create", &target))?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| io_context(e, "create", parent))?;
            }
            std::fs::copy(entry.path(), &target)
                .map_err(|e| io_context(e, "copy", entry.path()))?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Recreate a link with the same target instead of copying what it points at
#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> Result<()> {
    let link = std::fs::read_link(source).map_err(|e| io_context(e, "read link", source))?;
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_context(e, "create", parent))?;
    }
    std::os::unix::fs::symlink(&link, target).map_err(|e| io_context(e, "create link", target))
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, _target: &Path) -> Result<()> {
    Err(Error::Other(format!(
        "symbolic links in the generated project are not supported on this platform: {}",
        source.display()
    )))
}

/// `https://<token>@host/owner/repo.git`
fn authenticated_remote(
    git_base_url: &str,
    token: &SecretString,
    owner: &str,
    repo: &str,
) -> Result<SecretString> {
    let mut url = Url::parse(git_base_url)?;
    url.set_username(token.expose_secret())
        .map_err(|()| Error::Config {
            message: format!("git_base_url cannot carry credentials: {git_base_url}"),
            key: Some("git_base_url".to_string()),
        })?;
    let path = format!("{}/{}/{}.git", url.path().trim_end_matches('/'), owner, repo);
    url.set_path(&path);
    Ok(SecretString::from(url.to_string()))
}

impl CloudBuilder {
    pub(crate) async fn push_source(&self, ctx: &mut BuildContext) -> Result<()> {
        let stage = Stage::PushSource;
        self.start_stage(stage);

        // Runs created shortly before this instant still count as ours
        ctx.push_started_at = Some(Utc::now());

        let project = ctx.working_dir.join(PROJECT_DIR);
        let staging = StagingDir::create(ctx.working_dir.join(&self.config.push.staging_dir)).await?;

        let (source, dest) = (project.clone(), staging.path().to_path_buf());
        let copied = tokio::task::spawn_blocking(move || stage_project(&source, &dest))
            .await
            .map_err(|e| Error::Other(format!("staging task failed: {e}")))??;
        tracing::debug!(files = copied, staging = %staging.path().display(), "project staged");

        let request = PushRequest {
            remote_url: authenticated_remote(
                &self.config.api.git_base_url,
                &ctx.token,
                &ctx.owner,
                ctx.repo_name(),
            )?,
            author_name: ctx.author_name.clone(),
            author_email: ctx.author_email.clone(),
            message: self.config.push.commit_message.clone(),
            branch: self.config.push.branch.clone(),
        };

        self.vcs.push(staging.path(), &request).await?;
        if let Err(e) = staging.remove().await {
            self.warning(stage, format!("Could not remove staging directory: {e}"));
        }

        tracing::info!(repo = %ctx.repo_full_name, branch = %request.branch, "source pushed");
        self.success(stage, format!("Code pushed to {} branch", request.branch));
        self.info(stage, ctx.repo_url.clone());
        Ok(())
    }
}
