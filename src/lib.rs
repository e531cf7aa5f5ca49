//! # storefront2app
//!
//! Cloud build orchestration for storefront mobile app shells.
//!
//! A generated Android/iOS project is pushed to a fresh repository on a
//! GitHub-compatible host, the host's workflow runner builds it, and the
//! resulting artifacts are downloaded and unpacked into named files.
//!
//! ## Design
//!
//! - **Linear pipeline** - Six stages, validate through download, each aborting on error
//! - **Injected configuration** - [`BuildConfig`] is loaded once and passed in
//! - **Pluggable VCS** - The push goes through the [`VersionControl`] trait
//! - **Event-driven** - Progress is published on a broadcast channel
//!
//! ## Quick Start
//!
//! ```no_run
//! use storefront2app::{BuildConfig, BuildRequest, CloudBuilder, GitCli, run_with_cancellation};
//! use secrecy::SecretString;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let git = GitCli::from_path().ok_or("git not found")?;
//!     let builder = CloudBuilder::new(BuildConfig::default(), Box::new(git))?;
//!
//!     let mut events = builder.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let request = BuildRequest {
//!         working_dir: PathBuf::from("."),
//!         token: SecretString::from(std::env::var("GITHUB_TOKEN")?),
//!         repo: None,
//!         output_dir: PathBuf::from("builds"),
//!         public: false,
//!     };
//!     let summary = run_with_cancellation(&builder, request).await?;
//!     println!("{} artifact(s) saved", summary.saved.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Six-stage cloud build orchestrator
pub mod builder;
/// Configuration types and the project config store
pub mod config;
/// Cancellable wall-clock budget
pub mod deadline;
/// Error types
pub mod error;
/// ZIP artifact extraction
pub mod extraction;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types and events
pub mod types;
/// Naming and formatting helpers
pub mod utils;
/// Version control used for the source push
pub mod vcs;
/// Workflow runner API client
pub mod workflow_api;

// Re-export commonly used types
pub use builder::{BuildContext, BuildRequest, CloudBuilder};
pub use config::{AppConfig, BuildConfig};
pub use deadline::Deadline;
pub use error::{ApiError, ArchiveError, Error, Result, VcsError};
pub use extraction::{ArchiveEntry, Extraction, extract_first_entry};
pub use types::{
    Artifact, ArtifactId, BuildSummary, Event, Identity, RunConclusion, RunId, RunStatus,
    SavedArtifact, Stage, WorkflowRun,
};
pub use vcs::{GitCli, PushRequest, VersionControl};
pub use workflow_api::{DownloadLocation, WorkflowClient};

use tokio_util::sync::CancellationToken;

/// Run a build, cancelling it when the process receives a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// A signal cancels the build's token; the build then stops at its next
/// suspension point and this returns [`Error::Cancelled`].
pub async fn run_with_cancellation(
    builder: &CloudBuilder,
    request: BuildRequest,
) -> Result<BuildSummary> {
    let cancel = CancellationToken::new();
    let build = builder.run(request, cancel.clone());
    tokio::pin!(build);

    tokio::select! {
        result = &mut build => result,
        _ = wait_for_signal() => {
            cancel.cancel();
            build.await
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                ctrl_c_or_pending().await;
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                ctrl_c_or_pending().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c_or_pending().await;
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed
async fn ctrl_c_or_pending() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
