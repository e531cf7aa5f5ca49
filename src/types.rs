//! Core types for storefront2app

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Unique identifier for a remote workflow run
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl From<u64> for RunId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a build artifact
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(pub u64);

impl From<u64> for ArtifactId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a workflow run, as polled from the API
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Waiting for a runner
    Queued,
    /// Currently executing
    InProgress,
    /// Finished (see the run's conclusion)
    Completed,
    /// Waiting on an environment protection rule
    Waiting,
    /// Requested but not yet queued
    Requested,
    /// Pending concurrency group
    Pending,
    /// Any status this client does not know about
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether the run has reached its terminal state
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }

    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Waiting => "waiting",
            RunStatus::Requested => "requested",
            RunStatus::Pending => "pending",
            RunStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal conclusion of a completed workflow run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunConclusion {
    /// All jobs succeeded
    Success,
    /// At least one job failed
    Failure,
    /// Cancelled by a user or the system
    Cancelled,
    /// Skipped
    Skipped,
    /// A job exceeded its time limit
    TimedOut,
    /// Manual action is required
    ActionRequired,
    /// Neutral result
    Neutral,
    /// Marked stale
    Stale,
    /// The workflow failed to start
    StartupFailure,
    /// Any conclusion this client does not know about
    #[serde(other)]
    Other,
}

impl RunConclusion {
    /// Only a `success` conclusion produces downloadable artifacts
    pub fn is_success(&self) -> bool {
        matches!(self, RunConclusion::Success)
    }

    /// Wire name of the conclusion
    pub fn as_str(&self) -> &'static str {
        match self {
            RunConclusion::Success => "success",
            RunConclusion::Failure => "failure",
            RunConclusion::Cancelled => "cancelled",
            RunConclusion::Skipped => "skipped",
            RunConclusion::TimedOut => "timed_out",
            RunConclusion::ActionRequired => "action_required",
            RunConclusion::Neutral => "neutral",
            RunConclusion::Stale => "stale",
            RunConclusion::StartupFailure => "startup_failure",
            RunConclusion::Other => "other",
        }
    }
}

impl std::fmt::Display for RunConclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single CI execution record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Run identifier
    pub id: RunId,
    /// Workflow name (may be absent)
    #[serde(default)]
    pub name: Option<String>,
    /// Lifecycle status
    pub status: RunStatus,
    /// Conclusion, present once the run has completed
    #[serde(default)]
    pub conclusion: Option<RunConclusion>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Web page for the run
    #[serde(default)]
    pub html_url: Option<String>,
}

impl WorkflowRun {
    /// Human-readable name, falling back to `Run #<id>`
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("Run #{}", self.id),
        }
    }

    /// Whether the run completed with a `success` conclusion
    pub fn succeeded(&self) -> bool {
        self.status.is_completed() && self.conclusion.is_some_and(|c| c.is_success())
    }
}

/// A named build output owned by a workflow run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Artifact identifier
    pub id: ArtifactId,
    /// Artifact name as uploaded by the workflow
    pub name: String,
    /// Expired artifacts are listed but cannot be downloaded
    #[serde(default)]
    pub expired: bool,
    /// Size of the zipped artifact as reported by the API
    #[serde(default)]
    pub size_in_bytes: u64,
}

/// Authenticated account on the remote host
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Account login (repository owner)
    pub login: String,
    /// Display name, if the account has one set
    #[serde(default)]
    pub name: Option<String>,
    /// Public email, if the account exposes one
    #[serde(default)]
    pub email: Option<String>,
}

impl Identity {
    /// Display name for commits, falling back to the login
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.login,
        }
    }

    /// Commit email, falling back to `<login>@<noreply_domain>`
    pub fn commit_email(&self, noreply_domain: &str) -> String {
        match self.email.as_deref() {
            Some(email) if !email.is_empty() => email.to_string(),
            _ => format!("{}@{}", self.login, noreply_domain),
        }
    }
}

/// Repository record returned by the API
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Short repository name
    pub name: String,
    /// `owner/name`
    pub full_name: String,
    /// Visibility
    #[serde(default)]
    pub private: bool,
    /// Web page for the repository
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Orchestrator stage, executed strictly in declaration order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Check local preconditions
    Validate,
    /// Resolve the account behind the token
    Authenticate,
    /// Reuse or create the remote repository
    EnsureRepo,
    /// Stage, commit and force-push the generated project
    PushSource,
    /// Poll workflow runs until they complete
    WaitForBuilds,
    /// Download, extract and save artifacts
    DownloadArtifacts,
}

impl Stage {
    /// Number of stages in a build
    pub const TOTAL: usize = 6;

    /// All stages in execution order
    pub const ALL: [Stage; Stage::TOTAL] = [
        Stage::Validate,
        Stage::Authenticate,
        Stage::EnsureRepo,
        Stage::PushSource,
        Stage::WaitForBuilds,
        Stage::DownloadArtifacts,
    ];

    /// 1-based position of the stage
    pub fn number(&self) -> usize {
        match self {
            Stage::Validate => 1,
            Stage::Authenticate => 2,
            Stage::EnsureRepo => 3,
            Stage::PushSource => 4,
            Stage::WaitForBuilds => 5,
            Stage::DownloadArtifacts => 6,
        }
    }

    /// Title shown in progress output
    pub fn title(&self) -> &'static str {
        match self {
            Stage::Validate => "Validate project",
            Stage::Authenticate => "Authenticate",
            Stage::EnsureRepo => "Create repository",
            Stage::PushSource => "Push code",
            Stage::WaitForBuilds => "Wait for workflow builds",
            Stage::DownloadArtifacts => "Download build artifacts",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}/{}] {}", self.number(), Stage::TOTAL, self.title())
    }
}

/// A file written to the output directory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedArtifact {
    /// Name of the artifact it came from
    pub artifact: String,
    /// Where it was written
    pub path: PathBuf,
    /// Bytes written
    pub size_bytes: u64,
    /// False when the raw ZIP was saved because no entry could be extracted
    pub extracted: bool,
}

/// Outcome of a completed build
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    /// `owner/name` of the build repository
    pub repo_full_name: String,
    /// Web URL of the build repository
    pub repo_url: String,
    /// Output directory the artifacts were written to
    pub output_dir: PathBuf,
    /// Runs that completed with `success`
    pub runs_succeeded: usize,
    /// Runs that completed with any other conclusion
    pub runs_failed: usize,
    /// Files written, in download order
    pub saved: Vec<SavedArtifact>,
}

/// Event emitted during a build
///
/// Events are informational; their text is not a stable contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A stage has started
    StageStarted {
        /// The stage
        stage: Stage,
    },

    /// Informational progress line
    Info {
        /// Stage emitting the line
        stage: Stage,
        /// Message text
        message: String,
    },

    /// A step finished successfully
    Success {
        /// Stage emitting the line
        stage: Stage,
        /// Message text
        message: String,
    },

    /// Something non-fatal went wrong
    Warning {
        /// Stage emitting the line
        stage: Stage,
        /// Message text
        message: String,
    },

    /// A polled run reported its status
    RunUpdate {
        /// Run ID
        run_id: RunId,
        /// Run display name
        name: String,
        /// Current status
        status: RunStatus,
        /// Conclusion, once completed
        #[serde(skip_serializing_if = "Option::is_none")]
        conclusion: Option<RunConclusion>,
    },

    /// An artifact was written to disk
    ArtifactSaved {
        /// The saved file
        saved: SavedArtifact,
    },

    /// The whole build finished
    BuildComplete {
        /// Final summary
        summary: BuildSummary,
    },
}
