//! Per-build state threaded through the stages

use crate::error::{Error, Result};
use crate::types::{RunId, WorkflowRun};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// What the caller asks to build
#[derive(Debug)]
pub struct BuildRequest {
    /// Directory containing `output/` and `app.config.json`
    pub working_dir: PathBuf,
    /// Access token for the API and the push
    pub token: SecretString,
    /// Repository name; derived from the app name when unset
    pub repo: Option<String>,
    /// Where downloaded artifacts are written
    pub output_dir: PathBuf,
    /// Create the repository public instead of private
    pub public: bool,
}

/// Mutable record of one build
///
/// Created fresh for every run and dropped at the end. Fields are filled in by
/// the stage that resolves them; later stages rely on earlier ones having run.
#[derive(Debug)]
pub struct BuildContext {
    /// Directory containing `output/` and `app.config.json`
    pub working_dir: PathBuf,
    /// Access token, never logged
    pub(crate) token: SecretString,
    /// Target repository name, stable once set
    pub repo_name: Option<String>,
    /// Create the repository public instead of private
    pub public: bool,
    /// Where downloaded artifacts are written
    pub output_dir: PathBuf,
    /// App display name from the config store
    pub app_name: String,
    /// Login owning the repository
    pub owner: String,
    /// Commit author name
    pub author_name: String,
    /// Commit author email
    pub author_email: String,
    /// `owner/repo`
    pub repo_full_name: String,
    /// Web URL of the repository
    pub repo_url: String,
    /// When the push stage began; runs created well before this are ignored
    pub push_started_at: Option<DateTime<Utc>>,
    /// Completed runs in discovery order, each at most once
    pub completed_runs: Vec<WorkflowRun>,
    pub(crate) cancel: CancellationToken,
}

impl BuildContext {
    /// Start a build context, rejecting a blank token before any network call
    pub fn new(request: BuildRequest, cancel: CancellationToken) -> Result<Self> {
        if request.token.expose_secret().trim().is_empty() {
            return Err(Error::MissingToken);
        }

        let repo_name = request
            .repo
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        Ok(Self {
            working_dir: request.working_dir,
            token: request.token,
            repo_name,
            public: request.public,
            output_dir: request.output_dir,
            app_name: String::new(),
            owner: String::new(),
            author_name: String::new(),
            author_email: String::new(),
            repo_full_name: String::new(),
            repo_url: String::new(),
            push_started_at: None,
            completed_runs: Vec::new(),
            cancel,
        })
    }

    /// Repository name, empty until validation resolved it
    pub fn repo_name(&self) -> &str {
        self.repo_name.as_deref().unwrap_or_default()
    }

    /// Record a completed run; returns false if it was already recorded
    pub fn record_completed(&mut self, run: WorkflowRun) -> bool {
        if self.is_recorded(run.id) {
            return false;
        }
        self.completed_runs.push(run);
        true
    }

    /// Whether a run has been recorded as completed
    pub fn is_recorded(&self, id: RunId) -> bool {
        self.completed_runs.iter().any(|r| r.id == id)
    }

    /// Completed runs that concluded with success
    pub fn succeeded_runs(&self) -> impl Iterator<Item = &WorkflowRun> {
        self.completed_runs.iter().filter(|r| r.succeeded())
    }

    pub(crate) fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}
