use super::{WorkflowClient, failure_message, segment};
use crate::error::{ApiError, Result};
use crate::types::{Artifact, ArtifactId, RunId};
use reqwest::StatusCode;
use reqwest::header::LOCATION;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::debug;
use url::Url;

#[derive(Deserialize)]
struct ArtifactList {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

/// Where the artifact endpoint pointed the caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadLocation {
    /// Short-lived signed URL; fetch it without credentials
    Redirect(Url),
    /// The endpoint answered with the content directly
    Body(Vec<u8>),
}

impl WorkflowClient {
    /// Artifacts uploaded by a run, including expired ones
    pub async fn list_artifacts(
        &self,
        token: &SecretString,
        owner: &str,
        repo: &str,
        run_id: RunId,
    ) -> Result<Vec<Artifact>> {
        let url = self.endpoint(&format!(
            "/repos/{}/{}/actions/runs/{}/artifacts",
            segment(owner),
            segment(repo),
            run_id
        ))?;

        let response = self.get(token, url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let message = failure_message(response, "Failed to list artifacts").await;
            return Err(ApiError::ArtifactListFailed {
                run_id,
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let list: ArtifactList = Self::json(response).await?;
        Ok(list.artifacts)
    }

    /// First phase of a download: ask the API where the archive lives
    ///
    /// A `301`/`302` with a `Location` header yields [`DownloadLocation::Redirect`]
    /// (relative locations are resolved against the request URL). A `200` yields
    /// the body. Anything else is [`ApiError::ExpectedRedirect`].
    pub async fn artifact_location(
        &self,
        token: &SecretString,
        owner: &str,
        repo: &str,
        artifact_id: ArtifactId,
    ) -> Result<DownloadLocation> {
        let url = self.endpoint(&format!(
            "/repos/{}/{}/actions/artifacts/{}/zip",
            segment(owner),
            segment(repo),
            artifact_id
        ))?;

        let response = self.get(token, url.clone()).send().await?;
        let status = response.status();

        match status {
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| url.join(v).ok());
                match location {
                    Some(target) => Ok(DownloadLocation::Redirect(target)),
                    None => Err(ApiError::ExpectedRedirect {
                        artifact_id,
                        status: status.as_u16(),
                    }
                    .into()),
                }
            }
            StatusCode::OK => Ok(DownloadLocation::Body(response.bytes().await?.to_vec())),
            _ => {
                let message = failure_message(response, "no redirect").await;
                debug!(%artifact_id, %status, %message, "artifact endpoint did not redirect");
                Err(ApiError::ExpectedRedirect {
                    artifact_id,
                    status: status.as_u16(),
                }
                .into())
            }
        }
    }

    /// Download an artifact's ZIP archive
    ///
    /// Obtains the signed location, then fetches it on the download client with
    /// no `Authorization` header. An endpoint that answers with content instead
    /// of a redirect violates the download contract and is rejected.
    pub async fn download_artifact(
        &self,
        token: &SecretString,
        owner: &str,
        repo: &str,
        artifact_id: ArtifactId,
    ) -> Result<Vec<u8>> {
        let signed_url = match self.artifact_location(token, owner, repo, artifact_id).await? {
            DownloadLocation::Redirect(url) => url,
            DownloadLocation::Body(_) => {
                return Err(ApiError::ExpectedRedirect {
                    artifact_id,
                    status: StatusCode::OK.as_u16(),
                }
                .into());
            }
        };

        debug!(%artifact_id, host = signed_url.host_str().unwrap_or(""), "fetching signed artifact URL");

        let response = self.download.get(signed_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::DownloadFailed {
                artifact_id,
                status: status.as_u16(),
            }
            .into());
        }

        Ok(response.bytes().await?.to_vec())
    }
}
