//! Version control for the source push
//!
//! The orchestrator never shells out directly. It talks to a [`VersionControl`]
//! implementation, which turns a staged directory into a single commit and
//! force-pushes it to the remote.
//!
//! - [`GitCli`]: drives the external `git` binary
//!
//! ```no_run
//! use storefront2app::vcs::{GitCli, PushRequest, VersionControl};
//! use secrecy::SecretString;
//! use std::path::Path;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let git = GitCli::from_path().expect("git not found");
//! git.check_available().await?;
//!
//! let request = PushRequest {
//!     remote_url: SecretString::from("https://TOKEN@github.com/octo/shop.git".to_string()),
//!     author_name: "Octo Cat".to_string(),
//!     author_email: "octo@users.noreply.github.com".to_string(),
//!     message: "build".to_string(),
//!     branch: "main".to_string(),
//! };
//! git.push(Path::new(".build-staging"), &request).await?;
//! # Ok(())
//! # }
//! ```

mod git;
mod traits;

pub use git::GitCli;
pub use traits::{PushRequest, VersionControl};
