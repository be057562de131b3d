use basebot_core::GeneralSettings;
use serenity::all::{Client, GatewayIntents};
use tracing::info;

use crate::error::{DiscordError, Result};
use crate::handler::BotHandler;

/// Gateway intents for the configured privileged flags
pub fn intents(settings: &GeneralSettings) -> GatewayIntents {
    let mut intents = GatewayIntents::non_privileged();
    if settings.members_intent {
        intents |= GatewayIntents::GUILD_MEMBERS;
    }
    if settings.presence_intent {
        intents |= GatewayIntents::GUILD_PRESENCES;
    }
    if settings.message_content_intent {
        intents |= GatewayIntents::MESSAGE_CONTENT;
    }
    intents
}

/// Create the client (without starting it)
pub async fn create_client(token: &str, handler: BotHandler, intents: GatewayIntents) -> Result<Client> {
    Client::builder(token, intents)
        .event_handler(handler)
        .await
        .map_err(|cause| DiscordError::ClientBuildFailed {
            cause,
            config_hint: "GENERAL.json".to_string(),
        })
}

/// Connect and run until the gateway shuts down
pub async fn run(token: &str, handler: BotHandler, intents: GatewayIntents) -> Result<()> {
    let mut client = create_client(token, handler, intents).await?;

    info!("Starting Discord bot...");
    client
        .start()
        .await
        .map_err(|cause| DiscordError::GatewayFailed { cause })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privileged_intents_follow_settings() {
        let mut settings = GeneralSettings::default();
        let base = intents(&settings);
        assert!(!base.contains(GatewayIntents::GUILD_MEMBERS));
        assert!(!base.contains(GatewayIntents::MESSAGE_CONTENT));
        assert!(base.contains(GatewayIntents::GUILDS));

        settings.members_intent = true;
        settings.message_content_intent = true;
        let enabled = intents(&settings);
        assert!(enabled.contains(GatewayIntents::GUILD_MEMBERS));
        assert!(enabled.contains(GatewayIntents::MESSAGE_CONTENT));
        assert!(!enabled.contains(GatewayIntents::GUILD_PRESENCES));
    }
}
