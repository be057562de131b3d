use basebot_core::CoreError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DiscordError {
    #[error("Discord client could not be created")]
    #[diagnostic(
        code(basebot::discord::client_build_failed),
        help("Check that the bot token in {config_hint} is valid and has not been regenerated")
    )]
    ClientBuildFailed {
        #[source]
        cause: serenity::Error,
        config_hint: String,
    },

    #[error("Gateway connection failed")]
    #[diagnostic(
        code(basebot::discord::gateway_failed),
        help("Enable the intents configured in GENERAL.json in the Discord Developer Portal")
    )]
    GatewayFailed {
        #[source]
        cause: serenity::Error,
    },

    #[error("Command registration failed")]
    #[diagnostic(
        code(basebot::discord::command_registration_failed),
        help("Failed to register {count} command(s) for {scope}")
    )]
    CommandRegistrationFailed {
        scope: String,
        count: usize,
        #[source]
        cause: serenity::Error,
    },

    #[error("Could not look up the application owner")]
    #[diagnostic(
        code(basebot::discord::owner_lookup_failed),
        help("Owner commands stay unavailable until the bot reconnects")
    )]
    OwnerLookupFailed {
        #[source]
        cause: serenity::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, DiscordError>;

impl DiscordError {
    pub fn registration(scope: impl Into<String>, count: usize, cause: serenity::Error) -> Self {
        Self::CommandRegistrationFailed {
            scope: scope.into(),
            count,
            cause,
        }
    }
}
