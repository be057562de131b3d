//! Basebot Core - configuration and command plumbing for a slash command bot
//!
//! This crate holds everything that does not need a gateway connection: the
//! JSON config store with typed values, the command module host, the failure
//! handler and error reporting, and the owner commands.

pub mod config;
pub mod error;
pub mod failure;
pub mod interaction;
pub mod module;
pub mod owner;
pub mod report;
pub mod token;

pub use config::{
    Category, ConfigKey, ConfigMap, ConfigStore, ConfigValue, GeneralSettings, IntoConfigKey,
    IntoConfigValue, SaveGuard, SharedConfig,
};
pub use error::{ConversionError, CoreError, Result};
pub use failure::{CommandFailure, ErrorHandler, FailureOutcome, RoleRef};
pub use interaction::{ActivityKind, EmbedContent, PresenceSetter, Reply, Responder, ResponseError};
pub use module::{
    CommandModule, CommandSpec, Invocation, ModuleContext, ModuleHost, ModuleRegistry,
    OptionKind, OptionSpec, OptionValue, SharedHost,
};
pub use owner::{BotStats, OwnerAction, OwnerCommands};
pub use report::{ErrorReporter, ErrorSink, WebhookSink};
pub use token::ensure_token;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        ActivityKind, CommandFailure, CommandModule, CommandSpec, ConfigStore, ConfigValue,
        CoreError, EmbedContent, Invocation, ModuleContext, OptionKind, OptionSpec, OptionValue,
        Reply, Responder, Result, SharedConfig,
    };
}
