//! Command failures and the top-level handler that answers them

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::interaction::{Responder, ResponseError, try_send};
use crate::report::ErrorReporter;

const BOT_CANNOT_SEND: &str =
    "The Bot lacks the Permissions needed to send Messages in the Channel you just tried to use a Command in.";

/// A role requirement, either by id or by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRef {
    Id(u64),
    Name(String),
}

impl fmt::Display for RoleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "<@&{id}>"),
            Self::Name(name) => write!(f, "@{name}"),
        }
    }
}

fn join_roles(roles: &[RoleRef]) -> String {
    roles
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Everything that can go wrong while running a command
///
/// The `Display` text of the classified variants is what the invoker sees.
#[derive(Error, Debug)]
pub enum CommandFailure {
    #[error(
        "Something being used for this Command (like a channel, member, role, etc.) is missing. It was deleted, or the person left. Fix this issue and try again."
    )]
    NotFound,

    #[error(
        "The Bot is missing permissions for something it has to do for this Command. Make sure it has all needed permissions and try again."
    )]
    Forbidden,

    #[error("Something went wrong on Discords side. Please try again later.")]
    ServerError,

    #[error("You are missing the Role that is needed to use this Command. ( {0} )")]
    MissingRole(RoleRef),

    #[error(
        "You are missing a Role that is needed to use this Command. ( You need at least one of these: {} )",
        join_roles(.0)
    )]
    MissingAnyRole(Vec<RoleRef>),

    #[error(
        "You lack the Permissions needed to use this Command.\nYou need all of these Permissions: {}",
        .0.join(", ")
    )]
    MissingPermissions(Vec<String>),

    #[error(
        "The Bot lacks the Permissions needed to use this Command.\nThe Bot needs all of these Permissions: {}",
        .0.join(", ")
    )]
    BotMissingPermissions(Vec<String>),

    #[error("This Command cant be used in DMs. Use it on a Server instead.")]
    NoPrivateMessage,

    #[error("/{0} has been disabled.")]
    DisabledCommand(String),

    #[error("Bad Argument for /{command}: {reason}")]
    BadArgument { command: String, reason: String },

    #[error("Missing Argument for /{command}: `{argument}` is required.")]
    MissingArgument { command: String, argument: String },

    #[error("You are not the Owner of this bot.")]
    NotOwner,

    #[error("You dont have permissions for this Command.")]
    CheckFailed,

    #[error("Unknown command /{0}")]
    CommandNotFound(String),

    #[error("Command raised an unexpected error")]
    Unexpected(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CommandFailure {
    /// Wrap any error that has no canned answer
    pub fn unexpected(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Unexpected(err.into())
    }

    pub fn bad_argument(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BadArgument {
            command: command.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_argument(command: impl Into<String>, argument: impl Into<String>) -> Self {
        Self::MissingArgument {
            command: command.into(),
            argument: argument.into(),
        }
    }

    /// Failures that are dropped without any answer
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::CommandNotFound(_))
    }

    /// Failures with a canned answer for the invoker
    pub fn is_classified(&self) -> bool {
        !matches!(self, Self::CommandNotFound(_) | Self::Unexpected(_))
    }

    /// Text sent by direct message when the channel reply failed
    ///
    /// Only failures caused by the bot lacking permissions have one.
    pub fn direct_message_fallback(&self) -> Option<String> {
        match self {
            Self::Forbidden => Some(BOT_CANNOT_SEND.to_string()),
            Self::BotMissingPermissions(perms) => Some(format!(
                "{BOT_CANNOT_SEND}\nThe Bot needs all of these Permissions: {}",
                perms.join(", ")
            )),
            _ => None,
        }
    }
}

impl From<ResponseError> for CommandFailure {
    fn from(err: ResponseError) -> Self {
        match err {
            ResponseError::Forbidden => Self::Forbidden,
            ResponseError::NotFound => Self::NotFound,
            ResponseError::ServerError => Self::ServerError,
            other => Self::unexpected(other),
        }
    }
}

/// How the handler dealt with a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Silently dropped
    Ignored,
    /// Answered in the channel
    Replied,
    /// Answered by direct message after the channel reply failed
    DirectMessaged,
    /// The channel reply and the direct message both failed
    Dropped,
    /// Logged and handed to the error reporter
    Reported,
}

/// Turns command failures into replies, direct messages or reports
#[derive(Debug, Clone, Default)]
pub struct ErrorHandler {
    reporter: ErrorReporter,
}

impl ErrorHandler {
    pub fn new(reporter: ErrorReporter) -> Self {
        Self { reporter }
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    /// Handle a failure raised by `command`
    pub async fn handle(
        &self,
        command: &str,
        failure: CommandFailure,
        responder: &dyn Responder,
    ) -> FailureOutcome {
        if failure.is_ignored() {
            debug!("Ignoring failure in /{}: {}", command, failure);
            return FailureOutcome::Ignored;
        }

        if failure.is_classified() {
            if try_send(responder, &failure.to_string()).await {
                return FailureOutcome::Replied;
            }

            if let Some(text) = failure.direct_message_fallback() {
                return match responder.direct_message(&text).await {
                    Ok(()) => FailureOutcome::DirectMessaged,
                    Err(e) => {
                        debug!("Could not notify invoker of /{}: {}", command, e);
                        FailureOutcome::Dropped
                    }
                };
            }

            warn!("Could not deliver failure reply for /{}: {}", command, failure);
        }

        self.reporter
            .report_error(Some(&format!("/{command}")), &failure)
            .await;
        FailureOutcome::Reported
    }
}
