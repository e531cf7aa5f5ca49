//! Error types for storefront2app
//!
//! This module provides the error taxonomy for the library:
//! - Precondition errors raised before any network call (missing output, config, VCS)
//! - Remote API errors carrying the HTTP status and server message ([`ApiError`])
//! - Version control command failures with captured output ([`VcsError`])
//! - Archive parsing failures, which never escape as errors (see [`ArchiveError`])
//! - Machine-readable error codes for scripting around the CLI

use crate::types::{ArtifactId, RunId};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for storefront2app operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for storefront2app
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api_base_url")
        key: Option<String>,
    },

    /// The generated project directory does not exist
    #[error("{} not found, generate the project first", .path.display())]
    MissingOutput {
        /// Expected location of the generated project
        path: PathBuf,
    },

    /// The generated project has no CI workflow directory
    #[error("no workflows found in {}, generate the project first", .path.display())]
    MissingWorkflows {
        /// Expected location of the workflow files
        path: PathBuf,
    },

    /// The version control binary cannot be invoked
    #[error("version control unavailable: {0}")]
    VcsUnavailable(String),

    /// No saved project configuration with an app name
    #[error("no app config with an app name found at {}", .path.display())]
    MissingConfig {
        /// Expected location of the config file
        path: PathBuf,
    },

    /// No access token was supplied
    #[error("an access token is required (flag, GITHUB_TOKEN or saved config)")]
    MissingToken,

    /// Remote workflow API call failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Version control command failed
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// No workflow runs appeared before the build deadline
    #[error("no workflow runs detected after {}s, check the repository workflows", .waited.as_secs())]
    NoRunsDetected {
        /// How long discovery waited
        waited: Duration,
    },

    /// Workflow runs did not complete before the build deadline
    #[error("build timed out after {} minutes with {pending} run(s) still incomplete", .elapsed.as_secs() / 60)]
    BuildTimeout {
        /// Time spent waiting
        elapsed: Duration,
        /// Runs that had not completed
        pending: usize,
    },

    /// The build was cancelled
    #[error("build cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error (connection failure, request timeout)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed URL
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Remote workflow API errors
///
/// Every variant carries the HTTP status and the server-provided message (or a
/// default when the body had none).
#[derive(Debug, Error)]
pub enum ApiError {
    /// The token was rejected while resolving the current user
    #[error("authentication failed (HTTP {status}): {message}")]
    AuthenticationFailed {
        /// HTTP status code
        status: u16,
        /// Server message
        message: String,
    },

    /// Repository lookup returned something other than 200 or 404
    #[error("failed to look up repository {repo} (HTTP {status}): {message}")]
    RepoLookupFailed {
        /// `owner/name` that was looked up
        repo: String,
        /// HTTP status code
        status: u16,
        /// Server message
        message: String,
    },

    /// Repository creation did not return 201
    #[error("failed to create repository {name} (HTTP {status}): {message}")]
    RepoCreationFailed {
        /// Requested repository name
        name: String,
        /// HTTP status code
        status: u16,
        /// Server message
        message: String,
    },

    /// Listing workflow runs failed
    #[error("failed to list workflow runs (HTTP {status}): {message}")]
    RunListFailed {
        /// HTTP status code
        status: u16,
        /// Server message
        message: String,
    },

    /// Fetching a single workflow run failed
    #[error("failed to fetch workflow run {run_id} (HTTP {status}): {message}")]
    RunFetchFailed {
        /// Run that was fetched
        run_id: RunId,
        /// HTTP status code
        status: u16,
        /// Server message
        message: String,
    },

    /// Listing a run's artifacts failed
    #[error("failed to list artifacts for run {run_id} (HTTP {status}): {message}")]
    ArtifactListFailed {
        /// Run whose artifacts were listed
        run_id: RunId,
        /// HTTP status code
        status: u16,
        /// Server message
        message: String,
    },

    /// The artifact endpoint did not answer with a redirect
    #[error("failed to download artifact {artifact_id} (HTTP {status}): expected redirect")]
    ExpectedRedirect {
        /// Artifact that was requested
        artifact_id: ArtifactId,
        /// HTTP status code actually returned
        status: u16,
    },

    /// Fetching the signed download URL failed
    #[error("failed to download artifact {artifact_id} from signed URL (HTTP {status})")]
    DownloadFailed {
        /// Artifact that was requested
        artifact_id: ArtifactId,
        /// HTTP status code
        status: u16,
    },
}

impl ApiError {
    /// HTTP status code of the failed call
    pub fn status(&self) -> u16 {
        match self {
            ApiError::AuthenticationFailed { status, .. }
            | ApiError::RepoLookupFailed { status, .. }
            | ApiError::RepoCreationFailed { status, .. }
            | ApiError::RunListFailed { status, .. }
            | ApiError::RunFetchFailed { status, .. }
            | ApiError::ArtifactListFailed { status, .. }
            | ApiError::ExpectedRedirect { status, .. }
            | ApiError::DownloadFailed { status, .. } => *status,
        }
    }
}

/// Version control command errors
#[derive(Debug, Error)]
pub enum VcsError {
    /// The command could not be started
    #[error("failed to run `{command}`: {reason}")]
    SpawnFailed {
        /// Command line (secrets redacted)
        command: String,
        /// Underlying reason
        reason: String,
    },

    /// The command exited with a non-zero status
    #[error("`{command}` failed with exit code {code:?}: {output}")]
    CommandFailed {
        /// Command line (secrets redacted)
        command: String,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Captured stderr/stdout (secrets redacted)
        output: String,
    },
}

/// Reasons an archive yielded no entry
///
/// The archive reader reports these inside `Extraction::NotFound` instead of
/// returning them as errors; callers fall back to keeping the raw archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ArchiveError {
    /// Shorter than an end-of-central-directory record
    #[error("archive is smaller than the 22-byte end-of-central-directory record")]
    ArchiveTooSmall,

    /// No end-of-central-directory signature in the trailing 64 KiB
    #[error("end-of-central-directory record not found")]
    NoCentralDirectory,

    /// Central directory lists no entries
    #[error("archive has no entries")]
    EmptyArchive,

    /// A central directory record is truncated or has a bad signature
    #[error("corrupt central directory record")]
    CorruptCentralDirectory,

    /// A local file header has a bad signature
    #[error("corrupt local file header")]
    CorruptLocalHeader,

    /// Entry data extends past the end of the buffer
    #[error("entry data is truncated")]
    Truncated,

    /// Every entry is a directory marker
    #[error("archive contains only directory entries")]
    NoFileEntries,
}

impl Error {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::MissingOutput { .. } => "missing_output",
            Error::MissingWorkflows { .. } => "missing_workflows",
            Error::VcsUnavailable(_) => "vcs_unavailable",
            Error::MissingConfig { .. } => "missing_config",
            Error::MissingToken => "missing_token",
            Error::Api(e) => match e {
                ApiError::AuthenticationFailed { .. } => "authentication_failed",
                ApiError::RepoLookupFailed { .. } => "repo_lookup_failed",
                ApiError::RepoCreationFailed { .. } => "repo_creation_failed",
                ApiError::RunListFailed { .. } => "run_list_failed",
                ApiError::RunFetchFailed { .. } => "run_fetch_failed",
                ApiError::ArtifactListFailed { .. } => "artifact_list_failed",
                ApiError::ExpectedRedirect { .. } => "expected_redirect",
                ApiError::DownloadFailed { .. } => "download_failed",
            },
            Error::Vcs(_) => "vcs_error",
            Error::NoRunsDetected { .. } => "no_runs_detected",
            Error::BuildTimeout { .. } => "build_timeout",
            Error::Cancelled => "cancelled",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::InvalidUrl(_) => "invalid_url",
            Error::Other(_) => "internal_error",
        }
    }

    /// Whether the error was raised before any network call
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::MissingOutput { .. }
                | Error::MissingWorkflows { .. }
                | Error::VcsUnavailable(_)
                | Error::MissingConfig { .. }
                | Error::MissingToken
                | Error::Config { .. }
        )
    }
}
