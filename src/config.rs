//! Configuration types for storefront2app
//!
//! Two kinds of configuration live here:
//! - [`BuildConfig`]: how the orchestrator talks to the workflow API and how long it
//!   waits. Loaded once by the caller and injected into the builder.
//! - [`AppConfig`]: the project config store (`app.config.json`) written by the
//!   project generator and read by the build.

use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// File name of the project config store
pub const APP_CONFIG_FILE: &str = "app.config.json";

/// Remote endpoint settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// REST API root (default: "https://api.github.com")
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Git host the source is pushed to (default: "https://github.com")
    #[serde(default = "default_git_base_url")]
    pub git_base_url: String,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for JSON metadata calls (default: 30 seconds)
    #[serde(default = "default_metadata_timeout", with = "duration_serde")]
    pub metadata_timeout: Duration,

    /// Timeout for artifact binary downloads (default: 60 seconds)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    pub download_timeout: Duration,

    /// Domain used for commit emails when the account has no public email
    #[serde(default = "default_noreply_domain")]
    pub noreply_domain: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            git_base_url: default_git_base_url(),
            user_agent: default_user_agent(),
            metadata_timeout: default_metadata_timeout(),
            download_timeout: default_download_timeout(),
            noreply_domain: default_noreply_domain(),
        }
    }
}

/// Polling cadence and build deadline
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Interval between polls, shared by run discovery and run completion (default: 15 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Delay after the push before the first poll (default: 5 seconds)
    #[serde(default = "default_settle_delay", with = "duration_serde")]
    pub settle_delay: Duration,

    /// Wall-clock budget for waiting on builds (default: 30 minutes)
    #[serde(default = "default_build_timeout", with = "duration_serde")]
    pub build_timeout: Duration,

    /// Runs created up to this long before the push are still accepted (default: 120 seconds)
    #[serde(default = "default_discovery_grace", with = "duration_serde")]
    pub discovery_grace: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            settle_delay: default_settle_delay(),
            build_timeout: default_build_timeout(),
            discovery_grace: default_discovery_grace(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 2 seconds)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for the cloud builder
///
/// Sub-configs are flattened so the serialized form stays a single flat object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Remote endpoints and request timeouts
    #[serde(flatten)]
    pub api: ApiConfig,

    /// Polling cadence and deadline
    #[serde(flatten)]
    pub polling: PollConfig,

    /// Retry policy for artifact downloads
    #[serde(default)]
    pub retry: RetryConfig,

    /// Settings for the source push
    #[serde(flatten)]
    pub push: PushConfig,
}

/// Source push settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushConfig {
    /// Scratch directory name, created inside the working directory (default: ".build-staging")
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Branch the source is force-pushed to (default: "main")
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Commit message, including the fixed co-author trailer
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            branch: default_branch(),
            commit_message: default_commit_message(),
        }
    }
}

impl BuildConfig {
    /// Check values that would otherwise fail deep inside a build
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("api_base_url", &self.api.api_base_url),
            ("git_base_url", &self.api.git_base_url),
        ] {
            url::Url::parse(value).map_err(|e| Error::Config {
                message: format!("{key} is not a valid URL ({value}): {e}"),
                key: Some(key.to_string()),
            })?;
        }

        if self.polling.poll_interval.is_zero() {
            return Err(Error::Config {
                message: "poll_interval must be greater than zero".to_string(),
                key: Some("poll_interval".to_string()),
            });
        }

        if self.polling.build_timeout.is_zero() {
            return Err(Error::Config {
                message: "build_timeout must be greater than zero".to_string(),
                key: Some("build_timeout".to_string()),
            });
        }

        // The staging directory is deleted before and after every push
        let mut components = self.push.staging_dir.components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(Error::Config {
                message: format!(
                    "staging_dir must be a single directory name inside the working directory, got '{}'",
                    self.push.staging_dir.display()
                ),
                key: Some("staging_dir".to_string()),
            });
        }

        if self.push.branch.trim().is_empty() {
            return Err(Error::Config {
                message: "branch must not be empty".to_string(),
                key: Some("branch".to_string()),
            });
        }

        Ok(())
    }
}

/// Project configuration saved by the generator (`app.config.json`)
///
/// Keys this crate does not know about are preserved when the file is saved back.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Display name of the app
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    /// Storefront URL the app shell wraps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_url: Option<String>,

    /// Android package / iOS bundle identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,

    /// Primary theme color (hex)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,

    /// Access token, only present when the user opted in to saving it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    /// Everything else in the file
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("app_name", &self.app_name)
            .field("store_url", &self.store_url)
            .field("package_name", &self.package_name)
            .field("theme_color", &self.theme_color)
            .field(
                "github_token",
                &self.github_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AppConfig {
    /// Location of the config store inside `dir`
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(APP_CONFIG_FILE)
    }

    /// Load the config store from `dir`, `None` if the file does not exist
    pub async fn load(dir: &Path) -> Result<Option<Self>> {
        let path = Self::path(dir);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to read '{}': {}", path.display(), e),
                )));
            }
        };

        let config = serde_json::from_str(&contents).map_err(|e| Error::Config {
            message: format!("{} is not valid JSON: {}", path.display(), e),
            key: None,
        })?;
        Ok(Some(config))
    }

    /// Write the config store to `dir` (pretty-printed, two-space indent)
    pub async fn save(&self, dir: &Path) -> Result<()> {
        let path = Self::path(dir);
        let mut contents = serde_json::to_string_pretty(self)?;
        contents.push('\n');
        tokio::fs::write(&path, contents).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write '{}': {}", path.display(), e),
            ))
        })
    }

    /// Persist `token` into the config store in `dir`, creating the file if needed
    ///
    /// Only called on explicit user opt-in; the token is otherwise never written to disk.
    pub async fn store_token(dir: &Path, token: &SecretString) -> Result<()> {
        let mut config = Self::load(dir).await?.unwrap_or_default();
        config.github_token = Some(token.expose_secret().to_string());
        config.save(dir).await
    }

    /// App name, if set and not blank
    pub fn app_name(&self) -> Option<&str> {
        self.app_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Pick the access token: explicit flag, then environment, then the saved config
///
/// Blank values are skipped.
pub fn resolve_token(
    flag: Option<String>,
    env: Option<String>,
    saved: Option<&AppConfig>,
) -> Option<SecretString> {
    flag.into_iter()
        .chain(env)
        .chain(saved.and_then(|c| c.github_token.clone()))
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
        .map(SecretString::from)
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_git_base_url() -> String {
    "https://github.com".to_string()
}

fn default_user_agent() -> String {
    "storefront2app-cli".to_string()
}

fn default_metadata_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_noreply_domain() -> String {
    "users.noreply.github.com".to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_settle_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_build_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_discovery_grace() -> Duration {
    Duration::from_secs(120)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from(".build-staging")
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_commit_message() -> String {
    "storefront2app build\n\nCo-Authored-By: storefront2app <build-bot@users.noreply.github.com>"
        .to_string()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
