//! Stage 5: discover the runs triggered by the push and poll them to completion

use super::{BuildContext, CloudBuilder};
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::retry::IsRetryable;
use crate::types::{Event, RunId, Stage, WorkflowRun};
use chrono::{DateTime, Utc};

/// IDs of runs created strictly after `cutoff`, in listing order
pub(crate) fn runs_created_after(runs: &[WorkflowRun], cutoff: DateTime<Utc>) -> Vec<RunId> {
    runs.iter()
        .filter(|run| run.created_at > cutoff)
        .map(|run| run.id)
        .collect()
}

impl CloudBuilder {
    /// Wait for every run triggered by the push to complete
    ///
    /// Failed runs are reported but are not an error. Transient API failures
    /// are logged and retried on the next interval; any other API failure
    /// aborts the stage.
    pub(crate) async fn wait_for_builds(&self, ctx: &mut BuildContext) -> Result<()> {
        let stage = Stage::WaitForBuilds;
        self.start_stage(stage);

        let polling = &self.config.polling;
        let deadline = Deadline::new(polling.build_timeout, ctx.cancel.clone());
        self.info(
            stage,
            format!(
                "Polling every {}s (timeout: {} min)...",
                polling.poll_interval.as_secs(),
                deadline.budget().as_secs() / 60
            ),
        );

        deadline.sleep(polling.settle_delay).await?;

        let pushed_at = ctx.push_started_at.unwrap_or_else(Utc::now);
        let grace = chrono::Duration::from_std(polling.discovery_grace)
            .map_err(|e| Error::Other(format!("discovery grace out of range: {e}")))?;
        let run_ids = self.discover_runs(ctx, &deadline, pushed_at - grace).await?;
        self.info(stage, format!("Found {} workflow run(s)", run_ids.len()));

        self.poll_until_complete(ctx, &deadline, &run_ids).await?;

        let succeeded = ctx.succeeded_runs().count();
        let failed = ctx.completed_runs.len() - succeeded;
        tracing::info!(succeeded, failed, elapsed_secs = deadline.elapsed().as_secs(), "builds finished");

        if succeeded > 0 {
            self.success(stage, format!("{succeeded} build(s) completed successfully"));
        }
        if failed > 0 {
            self.warning(
                stage,
                format!(
                    "{failed} build(s) failed, artifacts from successful builds will still be downloaded"
                ),
            );
        }
        Ok(())
    }

    async fn discover_runs(
        &self,
        ctx: &BuildContext,
        deadline: &Deadline,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<RunId>> {
        let stage = Stage::WaitForBuilds;

        loop {
            deadline.check_cancelled()?;
            if deadline.is_expired() {
                return Err(Error::NoRunsDetected {
                    waited: deadline.elapsed(),
                });
            }

            match self
                .client
                .list_runs(&ctx.token, &ctx.owner, ctx.repo_name(), &self.config.push.branch)
                .await
            {
                Ok(runs) => {
                    let recent = runs_created_after(&runs, cutoff);
                    tracing::debug!(listed = runs.len(), recent = recent.len(), "polled workflow runs");
                    if !recent.is_empty() {
                        return Ok(recent);
                    }
                    self.info(stage, "Waiting for builds to start...");
                }
                Err(e) if e.is_retryable() => {
                    self.warning(stage, format!("Listing workflow runs failed, retrying: {e}"));
                }
                Err(e) => return Err(e),
            }

            deadline.sleep(self.config.polling.poll_interval).await?;
        }
    }

    async fn poll_until_complete(
        &self,
        ctx: &mut BuildContext,
        deadline: &Deadline,
        run_ids: &[RunId],
    ) -> Result<()> {
        let stage = Stage::WaitForBuilds;

        loop {
            deadline.check_cancelled()?;
            let pending = run_ids.iter().filter(|id| !ctx.is_recorded(**id)).count();
            if pending == 0 {
                break;
            }
            if deadline.is_expired() {
                return Err(Error::BuildTimeout {
                    elapsed: deadline.elapsed(),
                    pending,
                });
            }

            for &run_id in run_ids {
                if ctx.is_recorded(run_id) {
                    continue;
                }

                let run = match self
                    .client
                    .get_run(&ctx.token, &ctx.owner, ctx.repo_name(), run_id)
                    .await
                {
                    Ok(run) => run,
                    Err(e) if e.is_retryable() => {
                        self.warning(stage, format!("Fetching run {run_id} failed, retrying: {e}"));
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                let name = run.display_name();
                self.emit_event(Event::RunUpdate {
                    run_id,
                    name: name.clone(),
                    status: run.status,
                    conclusion: run.conclusion,
                });

                if run.status.is_completed() {
                    let outcome = match run.conclusion {
                        Some(c) if c.is_success() => "done".to_string(),
                        Some(c) => c.to_string(),
                        None => "completed".to_string(),
                    };
                    tracing::info!(%run_id, %name, %outcome, "workflow run completed");
                    ctx.record_completed(run);
                    self.info(stage, format!("{name}: {outcome}"));
                } else {
                    self.info(stage, format!("{name}: {}...", run.status));
                }
            }

            if run_ids.iter().all(|id| ctx.is_recorded(*id)) {
                break;
            }
            deadline.sleep(self.config.polling.poll_interval).await?;
        }

        // Completion order varies; keep discovery order for the download stage
        ctx.completed_runs
            .sort_by_key(|run| run_ids.iter().position(|id| *id == run.id));
        Ok(())
    }
}
