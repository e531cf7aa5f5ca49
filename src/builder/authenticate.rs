//! Stage 2: resolve the account behind the token

use super::{BuildContext, CloudBuilder};
use crate::error::Result;
use crate::types::Stage;

impl CloudBuilder {
    pub(crate) async fn authenticate(&self, ctx: &mut BuildContext) -> Result<()> {
        let stage = Stage::Authenticate;
        self.start_stage(stage);

        let identity = self.client.current_user(&ctx.token).await?;

        ctx.owner = identity.login.clone();
        ctx.author_name = identity.display_name().to_string();
        ctx.author_email = identity.commit_email(&self.config.api.noreply_domain);

        tracing::info!(login = %ctx.owner, "authenticated");
        self.success(
            stage,
            format!("Authenticated as {} ({})", ctx.author_name, ctx.owner),
        );
        Ok(())
    }
}
