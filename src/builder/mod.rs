//! Cloud build orchestrator split into one submodule per stage.
//!
//! A build is a strictly linear pipeline; each stage reads and extends the
//! [`BuildContext`] and any error aborts the build:
//! - [`validate`] - Local preconditions (generated project, VCS, app config)
//! - [`authenticate`] - Resolve the token's account and commit identity
//! - [`repository`] - Reuse or create the remote repository
//! - [`push`] - Stage the project and force-push it as a single commit
//! - [`wait`] - Discover the triggered workflow runs and poll them to completion
//! - [`artifacts`] - Download, extract and name the build outputs
//!
//! Progress is published on a broadcast channel (see [`CloudBuilder::subscribe`]);
//! structured diagnostics go through `tracing`.

mod artifacts;
mod authenticate;
mod context;
mod push;
mod repository;
mod validate;
mod wait;


pub use context::{BuildContext, BuildRequest};

use crate::config::BuildConfig;
use crate::error::Result;
use crate::types::{BuildSummary, Event, Stage};
use crate::vcs::VersionControl;
use crate::workflow_api::WorkflowClient;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Drives one storefront project through a remote CI build
pub struct CloudBuilder {
    /// Timings, endpoints and retry policy
    pub(crate) config: BuildConfig,
    /// Workflow runner API binding
    pub(crate) client: WorkflowClient,
    /// Version control used for the source push
    pub(crate) vcs: Box<dyn VersionControl>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
}

impl CloudBuilder {
    /// Create a builder from validated configuration and a VCS implementation
    pub fn new(config: BuildConfig, vcs: Box<dyn VersionControl>) -> Result<Self> {
        config.validate()?;
        let client = WorkflowClient::new(&config.api)?;

        // Buffer sized for a whole build's worth of progress lines
        let (event_tx, _rx) = broadcast::channel(1000);

        tracing::debug!(
            vcs = vcs.name(),
            api = %config.api.api_base_url,
            "cloud builder initialized"
        );

        Ok(Self {
            config,
            client,
            vcs,
            event_tx,
        })
    }

    /// Subscribe to build events
    ///
    /// Each subscriber receives every event emitted after it subscribed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use storefront2app::{BuildConfig, CloudBuilder, GitCli};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let git = GitCli::from_path().expect("git not found");
    /// let builder = CloudBuilder::new(BuildConfig::default(), Box::new(git))?;
    ///
    /// let mut events = builder.subscribe();
    /// tokio::spawn(async move {
    ///     while let Ok(event) = events.recv().await {
    ///         println!("{:?}", event);
    ///     }
    /// });
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Configuration the builder was created with
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Run all six stages
    ///
    /// `cancel` aborts the build with [`crate::Error::Cancelled`] at the next
    /// stage boundary or poll sleep. Remote state created before a failure (the
    /// repository, the pushed commit) is left in place and reused by the next run.
    pub async fn run(&self, request: BuildRequest, cancel: CancellationToken) -> Result<BuildSummary> {
        let mut ctx = BuildContext::new(request, cancel)?;

        self.validate(&mut ctx).await?;
        ctx.check_cancelled()?;
        self.authenticate(&mut ctx).await?;
        ctx.check_cancelled()?;
        self.ensure_repository(&mut ctx).await?;
        ctx.check_cancelled()?;
        self.push_source(&mut ctx).await?;
        ctx.check_cancelled()?;
        self.wait_for_builds(&mut ctx).await?;
        ctx.check_cancelled()?;
        let saved = self.download_artifacts(&ctx).await?;

        let summary = BuildSummary {
            repo_full_name: ctx.repo_full_name.clone(),
            repo_url: ctx.repo_url.clone(),
            output_dir: ctx.output_dir.clone(),
            runs_succeeded: ctx.succeeded_runs().count(),
            runs_failed: ctx.completed_runs.len() - ctx.succeeded_runs().count(),
            saved,
        };

        tracing::info!(
            repo = %summary.repo_full_name,
            artifacts = summary.saved.len(),
            runs_succeeded = summary.runs_succeeded,
            runs_failed = summary.runs_failed,
            "build complete"
        );
        self.emit_event(Event::BuildComplete {
            summary: summary.clone(),
        });

        Ok(summary)
    }

    /// Emit an event to all subscribers
    ///
    /// With no subscribers the event is dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    pub(crate) fn start_stage(&self, stage: Stage) {
        tracing::info!(stage = stage.number(), title = stage.title(), "stage started");
        self.emit_event(Event::StageStarted { stage });
    }

    pub(crate) fn info(&self, stage: Stage, message: impl Into<String>) {
        self.emit_event(Event::Info {
            stage,
            message: message.into(),
        });
    }

    pub(crate) fn success(&self, stage: Stage, message: impl Into<String>) {
        self.emit_event(Event::Success {
            stage,
            message: message.into(),
        });
    }

    pub(crate) fn warning(&self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(stage = stage.number(), %message);
        self.emit_event(Event::Warning { stage, message });
    }
}
