use std::sync::Arc;

use async_trait::async_trait;
use basebot_core::prelude::*;

pub const NAME: &str = "ping";

/// Liveness check
pub struct Ping;

pub fn construct(_: &ModuleContext) -> Arc<dyn CommandModule> {
    Arc::new(Ping)
}

#[async_trait]
impl CommandModule for Ping {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Answers with Pong!"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("ping", "Checks if the bot is alive").option(OptionSpec::new(
                "text",
                "Something to say back",
                OptionKind::String,
            )),
        ]
    }

    async fn invoke(
        &self,
        invocation: &Invocation,
        responder: &dyn Responder,
    ) -> std::result::Result<(), CommandFailure> {
        let reply = match invocation.string("text").map(str::trim) {
            Some(text) if !text.is_empty() => format!("Pong! {text}"),
            _ => "Pong!".to_string(),
        };
        responder.reply(Reply::text(reply)).await?;
        Ok(())
    }
}
