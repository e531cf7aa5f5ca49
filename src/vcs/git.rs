//! `git` CLI implementation of [`VersionControl`]

use super::traits::{PushRequest, VersionControl};
use crate::error::{Error, Result, VcsError};
use crate::utils::redact;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;
use url::Url;

/// Push implementation using the external `git` binary
///
/// # Examples
///
/// ```no_run
/// use storefront2app::vcs::GitCli;
/// use std::path::PathBuf;
///
/// // Explicit binary
/// let git = GitCli::new(PathBuf::from("/usr/bin/git"));
///
/// // Or auto-discover from PATH
/// let git = GitCli::from_path().expect("git not found in PATH");
/// ```
#[derive(Clone, Debug)]
pub struct GitCli {
    binary_path: PathBuf,
}

impl GitCli {
    /// Create a handler with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find `git` in PATH
    pub fn from_path() -> Option<Self> {
        which::which("git").ok().map(Self::new)
    }

    /// Run one git command in `dir`, failing on a non-zero exit
    ///
    /// Every entry of `secrets` is scrubbed from the reported command line and output.
    async fn run(&self, dir: &Path, args: &[&str], secrets: &[String]) -> Result<String> {
        let command = scrub(&format!("git {}", args.join(" ")), secrets);
        debug!(%command, dir = %dir.display(), "running git");

        let output = Command::new(&self.binary_path)
            .args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|e| VcsError::SpawnFailed {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let combined = format!("{}{}", stderr.trim(), stdout.trim());
            return Err(VcsError::CommandFailed {
                command,
                code: output.status.code(),
                output: scrub(&combined, secrets),
            }
            .into());
        }

        Ok(scrub(stdout.trim(), secrets))
    }
}

/// The full remote URL followed by any credentials embedded in it
fn remote_secrets(remote: &str) -> Vec<String> {
    let mut secrets = vec![remote.to_string()];
    if let Ok(url) = Url::parse(remote) {
        if !url.username().is_empty() {
            secrets.push(url.username().to_string());
        }
        if let Some(password) = url.password() {
            secrets.push(password.to_string());
        }
    }
    secrets
}

fn scrub(text: &str, secrets: &[String]) -> String {
    secrets
        .iter()
        .filter(|s| !s.is_empty())
        .fold(text.to_string(), |acc, secret| redact(&acc, secret))
}

#[async_trait]
impl VersionControl for GitCli {
    async fn check_available(&self) -> Result<()> {
        let output = Command::new(&self.binary_path)
            .arg("--version")
            .output()
            .await
            .map_err(|e| {
                Error::VcsUnavailable(format!(
                    "failed to execute {}: {}",
                    self.binary_path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(Error::VcsUnavailable(format!(
                "{} --version exited with {}",
                self.binary_path.display(),
                output.status
            )));
        }

        debug!(
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "git available"
        );
        Ok(())
    }

    async fn push(&self, staging: &Path, request: &PushRequest) -> Result<()> {
        let remote = request.remote_url.expose_secret();
        let secrets = remote_secrets(remote);

        self.run(staging, &["init"], &secrets).await?;
        self.run(staging, &["checkout", "-b", &request.branch], &secrets)
            .await?;
        self.run(
            staging,
            &["config", "user.email", &request.author_email],
            &secrets,
        )
        .await?;
        self.run(staging, &["config", "user.name", &request.author_name], &secrets)
            .await?;
        self.run(staging, &["config", "commit.gpgsign", "false"], &secrets)
            .await?;
        self.run(staging, &["add", "-A"], &secrets).await?;
        self.run(staging, &["commit", "-m", &request.message], &secrets)
            .await?;
        self.run(staging, &["remote", "add", "origin", remote], &secrets)
            .await?;
        self.run(
            staging,
            &["push", "--force", "origin", &request.branch],
            &secrets,
        )
        .await?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "git-cli"
    }
}
