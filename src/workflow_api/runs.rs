use super::{WorkflowClient, failure_message, segment};
use crate::error::{ApiError, Result};
use crate::types::{RunId, WorkflowRun};
use reqwest::StatusCode;
use secrecy::SecretString;
use serde::Deserialize;

/// Only the most recent runs matter right after a push
const RUNS_PER_PAGE: &str = "5";

#[derive(Deserialize)]
struct RunList {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

impl WorkflowClient {
    /// Most recent push-triggered runs on `branch`, newest first
    pub async fn list_runs(
        &self,
        token: &SecretString,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Vec<WorkflowRun>> {
        let mut url = self.endpoint(&format!(
            "/repos/{}/{}/actions/runs",
            segment(owner),
            segment(repo)
        ))?;
        url.query_pairs_mut()
            .append_pair("event", "push")
            .append_pair("branch", branch)
            .append_pair("per_page", RUNS_PER_PAGE);

        let response = self.get(token, url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let message = failure_message(response, "Failed to list workflow runs").await;
            return Err(ApiError::RunListFailed {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let list: RunList = Self::json(response).await?;
        Ok(list.workflow_runs)
    }

    /// Current state of a single run
    pub async fn get_run(
        &self,
        token: &SecretString,
        owner: &str,
        repo: &str,
        run_id: RunId,
    ) -> Result<WorkflowRun> {
        let url = self.endpoint(&format!(
            "/repos/{}/{}/actions/runs/{}",
            segment(owner),
            segment(repo),
            run_id
        ))?;

        let response = self.get(token, url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let message = failure_message(response, "Failed to fetch workflow run").await;
            return Err(ApiError::RunFetchFailed {
                run_id,
                status: status.as_u16(),
                message,
            }
            .into());
        }

        Self::json(response).await
    }
}
