//! Stage 3: reuse or create the build repository

use super::{BuildContext, CloudBuilder};
use crate::error::Result;
use crate::types::Stage;

impl CloudBuilder {
    /// Never creates a repository that already exists; a new one is private
    /// unless the request asked for public
    pub(crate) async fn ensure_repository(&self, ctx: &mut BuildContext) -> Result<()> {
        let stage = Stage::EnsureRepo;
        self.start_stage(stage);

        let name = ctx.repo_name().to_string();
        let full_name = format!("{}/{}", ctx.owner, name);

        if self.client.repo_exists(&ctx.token, &ctx.owner, &name).await? {
            tracing::info!(repo = %full_name, "reusing existing repository");
            self.info(stage, format!("Repository {full_name} already exists, reusing"));
        } else {
            let private = !ctx.public;
            let repo = self.client.create_repo(&ctx.token, &name, private).await?;
            tracing::info!(repo = %repo.full_name, private, "repository created");
            self.success(
                stage,
                format!(
                    "Created {} repository: {}",
                    if private { "private" } else { "public" },
                    full_name
                ),
            );
        }

        ctx.repo_url = format!(
            "{}/{}",
            self.config.api.git_base_url.trim_end_matches('/'),
            full_name
        );
        ctx.repo_full_name = full_name;
        Ok(())
    }
}
