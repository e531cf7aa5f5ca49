//! HTTP binding to the repository host and its workflow runner API
//!
//! The client is a thin translation layer: one method per endpoint, JSON in and
//! typed records out, non-success statuses mapped to [`ApiError`] variants that
//! carry the status and the server's `message`. It never retries; the
//! orchestrator owns retry and polling policy.
//!
//! Two HTTP clients are kept. Metadata calls go through a client that does not
//! follow redirects, so the artifact endpoint's `302` can be captured. Binary
//! downloads go through a second, unauthenticated client with a longer timeout
//! that is pointed at the signed URL from that redirect.

mod artifacts;
mod repos;
mod runs;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

pub use artifacts::DownloadLocation;

const ACCEPT_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";

/// Client for the workflow runner REST API
#[derive(Clone, Debug)]
pub struct WorkflowClient {
    api: Client,
    download: Client,
    base_url: String,
}

impl WorkflowClient {
    /// Build the metadata and download clients from `config`
    pub fn new(config: &ApiConfig) -> Result<Self> {
        // A malformed base URL fails here rather than on the first request
        Url::parse(&config.api_base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));

        let api = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.metadata_timeout)
            .build()?;

        let download = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.download_timeout)
            .build()?;

        Ok(Self {
            api,
            download,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Absolute URL for `path` (which must start with `/`)
    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}{}", self.base_url, path))?)
    }

    fn get(&self, token: &SecretString, url: Url) -> RequestBuilder {
        self.api.get(url).bearer_auth(token.expose_secret())
    }

    fn post(&self, token: &SecretString, url: Url) -> RequestBuilder {
        self.api.post(url).bearer_auth(token.expose_secret())
    }

    /// Decode a successful JSON response
    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(Error::from)
    }
}

/// Path segment safe for interpolation into an endpoint
fn segment(value: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(value)
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// The server's `message` field, or `default` when the body has none
async fn failure_message(response: Response, default: &str) -> String {
    let status = response.status();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(%status, error = %e, "failed to read error body");
            return default.to_string();
        }
    };

    serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| default.to_string())
}
