//! Command modules: named groups of slash commands that can be loaded,
//! unloaded and reloaded while the bot runs

use async_trait::async_trait;

use crate::config::SharedConfig;
use crate::failure::CommandFailure;
use crate::interaction::Responder;

mod host;
mod registry;

pub use host::{LoadFailure, ModuleHost, SharedHost};
pub use registry::{ModuleConstructor, ModuleRegistry, is_template};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Option types a command can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    String,
    Integer,
    Number,
    Boolean,
    User,
    Channel,
    Role,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    pub required: bool,
    pub autocomplete: bool,
}

impl OptionSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: OptionKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: false,
            autocomplete: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn autocomplete(mut self) -> Self {
        self.autocomplete = true;
        self
    }
}

/// Declaration of one slash command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    pub options: Vec<OptionSpec>,
    pub subcommands: Vec<CommandSpec>,
    /// Hidden from direct messages
    pub guild_only: bool,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
            subcommands: Vec::new(),
            guild_only: false,
        }
    }

    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn subcommand(mut self, subcommand: CommandSpec) -> Self {
        self.subcommands.push(subcommand);
        self
    }

    pub fn guild_only(mut self) -> Self {
        self.guild_only = true;
        self
    }
}

/// A resolved option value
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    User(u64),
    Channel(u64),
    Role(u64),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

/// One command call, stripped of platform types
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Invocation {
    pub command: String,
    pub subcommand: Option<String>,
    pub options: Vec<(String, OptionValue)>,
    pub user_id: u64,
    pub channel_id: u64,
    pub guild_id: Option<u64>,
}

impl Invocation {
    pub fn new(command: impl Into<String>, user_id: u64) -> Self {
        Self {
            command: command.into(),
            user_id,
            ..Default::default()
        }
    }

    pub fn with_subcommand(mut self, subcommand: impl Into<String>) -> Self {
        self.subcommand = Some(subcommand.into());
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.options.push((name.into(), value));
        self
    }

    pub fn in_guild(mut self, guild_id: u64) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    /// `command` or `command subcommand`
    pub fn full_name(&self) -> String {
        match &self.subcommand {
            Some(sub) => format!("{} {}", self.command, sub),
            None => self.command.clone(),
        }
    }

    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options
            .iter()
            .find(|(option, _)| option == name)
            .map(|(_, value)| value)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(OptionValue::as_str)
    }

    /// A string option that must be present
    pub fn require_string(&self, name: &str) -> Result<&str, CommandFailure> {
        match self.option(name) {
            Some(OptionValue::String(s)) => Ok(s),
            Some(other) => Err(CommandFailure::bad_argument(
                self.full_name(),
                format!("`{name}` must be text, got {other:?}"),
            )),
            None => Err(CommandFailure::missing_argument(self.full_name(), name)),
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.option(name).and_then(OptionValue::as_i64)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.option(name).and_then(OptionValue::as_bool)
    }
}

/// What module constructors get to work with
#[derive(Clone)]
pub struct ModuleContext {
    pub config: SharedConfig,
}

impl ModuleContext {
    pub fn new(config: SharedConfig) -> Self {
        Self { config }
    }
}

impl std::fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleContext")
            .field("config_root", &self.config.read().root())
            .finish()
    }
}

/// A loadable group of commands
#[async_trait]
pub trait CommandModule: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Commands this module answers
    fn commands(&self) -> Vec<CommandSpec>;

    /// Runs once after construction, before any command is routed here
    async fn setup(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Runs once before the module is discarded
    async fn teardown(&self) {}

    async fn invoke(
        &self,
        invocation: &Invocation,
        responder: &dyn Responder,
    ) -> Result<(), CommandFailure>;

    /// Suggestions for an option marked `autocomplete`
    async fn autocomplete(&self, _invocation: &Invocation, _option: &str, _partial: &str) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_require_string_reports_missing_and_bad_arguments() {
        let invocation = Invocation::new("owner", 1)
            .with_subcommand("load")
            .with_option("count", OptionValue::Integer(3));

        match invocation.require_string("extension").unwrap_err() {
            CommandFailure::MissingArgument { command, argument } => {
                assert_eq!(command, "owner load");
                assert_eq!(argument, "extension");
            }
            other => panic!("unexpected failure {other:?}"),
        }

        assert!(matches!(
            invocation.require_string("count"),
            Err(CommandFailure::BadArgument { .. })
        ));
        assert_eq!(invocation.integer("count"), Some(3));
    }
}
