//! Stage 6: download, extract and name build outputs

use super::{BuildContext, CloudBuilder};
use crate::error::{Error, Result};
use crate::extraction::{Extraction, extract_first_entry, list_entries};
use crate::retry::download_with_retry;
use crate::types::{Artifact, Event, SavedArtifact, Stage};
use crate::utils::{artifact_filename, file_component, format_size};
use std::path::Path;

async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    tokio::fs::write(path, data).await.map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to write '{}': {}", path.display(), e),
        ))
    })
}

impl CloudBuilder {
    /// Save the artifacts of every successful run
    ///
    /// A failure for one artifact (or one run's listing) is reported as a warning
    /// and the rest continue. Saving nothing at all is also only a warning.
    pub(crate) async fn download_artifacts(&self, ctx: &BuildContext) -> Result<Vec<SavedArtifact>> {
        let stage = Stage::DownloadArtifacts;
        self.start_stage(stage);

        tokio::fs::create_dir_all(&ctx.output_dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create output directory '{}': {}",
                    ctx.output_dir.display(),
                    e
                ),
            ))
        })?;

        let mut saved = Vec::new();

        for run in ctx.succeeded_runs() {
            let artifacts = match self
                .client
                .list_artifacts(&ctx.token, &ctx.owner, ctx.repo_name(), run.id)
                .await
            {
                Ok(artifacts) => artifacts,
                Err(e) => {
                    self.warning(
                        stage,
                        format!("Failed to list artifacts for {}: {e}", run.display_name()),
                    );
                    continue;
                }
            };

            for artifact in artifacts {
                ctx.check_cancelled()?;

                if artifact.expired {
                    tracing::debug!(artifact = %artifact.name, "skipping expired artifact");
                    continue;
                }

                self.info(stage, format!("Downloading {}...", artifact.name));
                match self.save_artifact(ctx, &artifact).await {
                    Ok(file) => {
                        let file_name = file
                            .path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        self.success(
                            stage,
                            format!("Saved: {} ({})", file_name, format_size(file.size_bytes)),
                        );
                        self.emit_event(Event::ArtifactSaved {
                            saved: file.clone(),
                        });
                        saved.push(file);
                    }
                    Err(Error::Cancelled) => return Err(Error::Cancelled),
                    Err(e) => {
                        self.warning(stage, format!("Failed to download {}: {e}", artifact.name));
                    }
                }
            }
        }

        if saved.is_empty() {
            self.warning(
                stage,
                "No artifacts found. Builds may have failed or produced no outputs.",
            );
        } else {
            self.success(
                stage,
                format!(
                    "{} artifact(s) saved to {}",
                    saved.len(),
                    ctx.output_dir.display()
                ),
            );
        }

        Ok(saved)
    }

    /// Download one artifact and write its first file (or the raw archive)
    async fn save_artifact(&self, ctx: &BuildContext, artifact: &Artifact) -> Result<SavedArtifact> {
        let (token, owner, repo, id) = (&ctx.token, ctx.owner.as_str(), ctx.repo_name(), artifact.id);
        let archive = download_with_retry(&self.config.retry, move || {
            self.client.download_artifact(token, owner, repo, id)
        })
        .await?;

        tracing::debug!(
            artifact = %artifact.name,
            reported_size = artifact.size_in_bytes,
            archive_size = archive.len(),
            "artifact downloaded"
        );

        match extract_first_entry(&archive) {
            Extraction::Found(entry) => {
                if let Ok(entries) = list_entries(&archive) {
                    let files = entries.iter().filter(|e| !e.is_directory()).count();
                    if files > 1 {
                        tracing::debug!(
                            artifact = %artifact.name,
                            files,
                            kept = %entry.name,
                            "artifact has several files, keeping the first"
                        );
                    }
                }

                let path = ctx
                    .output_dir
                    .join(artifact_filename(&artifact.name, &ctx.app_name));
                write_file(&path, &entry.data).await?;
                Ok(SavedArtifact {
                    artifact: artifact.name.clone(),
                    path,
                    size_bytes: entry.data.len() as u64,
                    extracted: true,
                })
            }
            Extraction::NotFound(reason) => {
                tracing::warn!(
                    artifact = %artifact.name,
                    %reason,
                    "could not extract artifact, keeping the archive"
                );
                let path = ctx
                    .output_dir
                    .join(format!("{}.zip", file_component(&artifact.name)));
                write_file(&path, &archive).await?;
                Ok(SavedArtifact {
                    artifact: artifact.name.clone(),
                    path,
                    size_bytes: archive.len() as u64,
                    extracted: false,
                })
            }
        }
    }
}
