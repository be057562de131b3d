//! Starting point for new modules
//!
//! The leading underscore keeps it out of `load_all`; owners can still load
//! it by name. Copy this file, rename it, and register the copy in
//! [`registry`](super::registry).

use std::sync::Arc;

use async_trait::async_trait;
use basebot_core::prelude::*;
use tracing::debug;

pub const NAME: &str = "_example";

const CATEGORY: &str = "EXAMPLE";
const ASKED: &str = "ASKED";

pub struct Example {
    context: ModuleContext,
}

pub fn construct(context: &ModuleContext) -> Arc<dyn CommandModule> {
    Arc::new(Example {
        context: context.clone(),
    })
}

impl Example {
    /// Bump the persisted counter and return the new value
    fn count_question(&self) -> basebot_core::Result<i64> {
        let mut config = self.context.config.write();
        let mut guard = config.guard();
        let category = guard.ensure_category(CATEGORY)?;
        let asked = category.get(ASKED).and_then(ConfigValue::as_i64).unwrap_or(0) + 1;
        category.set(ASKED, asked)?;
        guard.finish()?;
        Ok(asked)
    }
}

#[async_trait]
impl CommandModule for Example {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Template module"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("ask", "Example Command")
                .guild_only()
                .option(
                    OptionSpec::new("question", "What to ask", OptionKind::String).required(),
                ),
        ]
    }

    async fn setup(&self) -> std::result::Result<(), basebot_core::module::BoxError> {
        self.context.config.write().ensure_category(CATEGORY)?;
        Ok(())
    }

    async fn invoke(
        &self,
        invocation: &Invocation,
        responder: &dyn Responder,
    ) -> std::result::Result<(), CommandFailure> {
        let question = invocation.require_string("question")?;
        let asked = self.count_question().map_err(CommandFailure::unexpected)?;
        debug!("Question number {} asked by {}", asked, invocation.user_id);

        responder
            .reply(Reply::text(format!(
                "You asked: {question}\nThat makes {asked} question(s) so far."
            )))
            .await?;
        Ok(())
    }
}
