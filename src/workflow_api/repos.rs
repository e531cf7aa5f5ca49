use super::{WorkflowClient, failure_message, segment};
use crate::error::{ApiError, Result};
use crate::types::{Identity, Repository};
use reqwest::StatusCode;
use secrecy::SecretString;
use serde::Serialize;
use tracing::debug;

#[derive(Serialize)]
struct CreateRepoBody<'a> {
    name: &'a str,
    private: bool,
    auto_init: bool,
}

impl WorkflowClient {
    /// Resolve the account the token belongs to
    pub async fn current_user(&self, token: &SecretString) -> Result<Identity> {
        let url = self.endpoint("/user")?;
        let response = self.get(token, url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let message = failure_message(response, "Invalid token").await;
            return Err(ApiError::AuthenticationFailed {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let identity: Identity = Self::json(response).await?;
        debug!(login = %identity.login, "resolved current user");
        Ok(identity)
    }

    /// Whether `owner/name` exists and is visible to the token
    ///
    /// Only a 404 means absent; any status other than 200 or 404 is an error so
    /// that an auth or server failure is never mistaken for a missing repository.
    pub async fn repo_exists(&self, token: &SecretString, owner: &str, name: &str) -> Result<bool> {
        let url = self.endpoint(&format!("/repos/{}/{}", segment(owner), segment(name)))?;
        let response = self.get(token, url).send().await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let message = failure_message(response, "Repository lookup failed").await;
                Err(ApiError::RepoLookupFailed {
                    repo: format!("{owner}/{name}"),
                    status: status.as_u16(),
                    message,
                }
                .into())
            }
        }
    }

    /// Create a repository owned by the token's account, without an initial commit
    pub async fn create_repo(
        &self,
        token: &SecretString,
        name: &str,
        private: bool,
    ) -> Result<Repository> {
        let url = self.endpoint("/user/repos")?;
        let body = CreateRepoBody {
            name,
            private,
            auto_init: false,
        };
        let response = self.post(token, url).json(&body).send().await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let message = failure_message(response, "Failed to create repository").await;
            return Err(ApiError::RepoCreationFailed {
                name: name.to_string(),
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let repo: Repository = Self::json(response).await?;
        debug!(repo = %repo.full_name, private = repo.private, "created repository");
        Ok(repo)
    }
}
