//! Trait and request type for pushing staged sources

use crate::error::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use std::path::Path;

/// Everything needed to turn a staged tree into a pushed commit
#[derive(Debug)]
pub struct PushRequest {
    /// Remote URL with embedded credentials
    pub remote_url: SecretString,
    /// Commit author name
    pub author_name: String,
    /// Commit author email
    pub author_email: String,
    /// Commit message
    pub message: String,
    /// Branch created locally and force-pushed
    pub branch: String,
}

/// Interface to a version control system
///
/// Implementations must treat the remote URL as a secret: it never appears in
/// logs or error messages.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Check that the tool can be invoked
    ///
    /// Returns [`crate::Error::VcsUnavailable`] otherwise.
    async fn check_available(&self) -> Result<()>;

    /// Initialize a repository in `staging`, commit its whole contents as one
    /// commit and force-push it to the remote branch
    ///
    /// `staging` must not already be a repository.
    async fn push(&self, staging: &Path, request: &PushRequest) -> Result<()>;

    /// Name of the implementation for logging
    fn name(&self) -> &'static str;
}
