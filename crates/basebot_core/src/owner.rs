//! Commands reserved for the bot owner

use std::collections::HashSet;
use std::fmt;

use parking_lot::RwLock;
use tracing::info;

use crate::error::CoreError;
use crate::failure::CommandFailure;
use crate::interaction::{ActivityKind, EmbedContent, PresenceSetter, Reply};
use crate::module::{CommandSpec, Invocation, LoadFailure, OptionKind, OptionSpec, SharedHost};

/// Name of the slash command that groups every owner subcommand
pub const OWNER_COMMAND: &str = "owner";

const STATUS_OPTION: &str = "status";
const MODULE_OPTION: &str = "module";
const MAX_CHOICES: usize = 25;

/// One owner subcommand with its argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerAction {
    Presence(ActivityKind, String),
    Load(String),
    Unload(String),
    Reload(String),
    ReloadAll,
    Info,
}

impl OwnerAction {
    pub fn parse(invocation: &Invocation) -> Result<Self, CommandFailure> {
        let Some(sub) = invocation.subcommand.as_deref() else {
            return Err(CommandFailure::missing_argument(OWNER_COMMAND, "subcommand"));
        };
        let status = || invocation.require_string(STATUS_OPTION).map(str::to_string);
        let module = || invocation.require_string(MODULE_OPTION).map(str::to_string);

        Ok(match sub {
            "play" => Self::Presence(ActivityKind::Playing, status()?),
            "watch" => Self::Presence(ActivityKind::Watching, status()?),
            "listen" => Self::Presence(ActivityKind::Listening, status()?),
            "load" => Self::Load(module()?),
            "unload" => Self::Unload(module()?),
            "reload" => Self::Reload(module()?),
            "reload-all" => Self::ReloadAll,
            "info" => Self::Info,
            other => {
                return Err(CommandFailure::bad_argument(
                    OWNER_COMMAND,
                    format!("unknown subcommand `{other}`"),
                ));
            }
        })
    }

    /// Whether running this action changes the set of registered commands
    pub fn changes_modules(&self) -> bool {
        matches!(
            self,
            Self::Load(_) | Self::Unload(_) | Self::Reload(_) | Self::ReloadAll
        )
    }
}

/// Counts shown by the `info` subcommand
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BotStats {
    pub guilds: usize,
    pub members: u64,
}

/// Reply text for a module operation that failed
pub fn error_reply(error: &CoreError) -> String {
    format!("**`ERROR:`** {} - {}", error.kind(), error)
}

fn failures_reply(failures: &[LoadFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("`{}`: {}", f.module, error_reply(&f.error)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The `owner` command group
pub struct OwnerCommands {
    host: SharedHost,
    owners: RwLock<HashSet<u64>>,
}

impl fmt::Debug for OwnerCommands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerCommands")
            .field("owners", &*self.owners.read())
            .finish()
    }
}

impl OwnerCommands {
    pub fn new(host: SharedHost) -> Self {
        Self {
            host,
            owners: RwLock::new(HashSet::new()),
        }
    }

    /// Replace the set of users allowed to run owner commands
    pub fn set_owners(&self, owners: impl IntoIterator<Item = u64>) {
        let mut guard = self.owners.write();
        *guard = owners.into_iter().collect();
        info!("Owner commands available to {} user(s)", guard.len());
    }

    pub fn is_owner(&self, user_id: u64) -> bool {
        self.owners.read().contains(&user_id)
    }

    pub fn ensure_owner(&self, user_id: u64) -> Result<(), CommandFailure> {
        if self.is_owner(user_id) {
            Ok(())
        } else {
            Err(CommandFailure::NotOwner)
        }
    }

    /// Slash command declaration with every subcommand
    pub fn spec() -> CommandSpec {
        let status = |verb: &str| {
            CommandSpec::new(verb, format!("Sets a '{verb}' Status")).option(
                OptionSpec::new(STATUS_OPTION, "The status text to use", OptionKind::String)
                    .required(),
            )
        };
        let module = |name: &str, description: &str| {
            CommandSpec::new(name, description).option(
                OptionSpec::new(MODULE_OPTION, "Name of the module", OptionKind::String)
                    .required()
                    .autocomplete(),
            )
        };

        CommandSpec::new(OWNER_COMMAND, "Commands for the owner of the bot")
            .guild_only()
            .subcommand(status("play"))
            .subcommand(status("watch"))
            .subcommand(status("listen"))
            .subcommand(module("load", "Loads a module"))
            .subcommand(module("unload", "Unloads a module"))
            .subcommand(module("reload", "Reloads a module"))
            .subcommand(CommandSpec::new("reload-all", "Reloads all modules"))
            .subcommand(CommandSpec::new("info", "Shows info about the Bot and its stats"))
    }

    /// Check ownership, parse and run one invocation
    pub async fn handle(
        &self,
        invocation: &Invocation,
        presence: &dyn PresenceSetter,
        stats: BotStats,
    ) -> Result<Reply, CommandFailure> {
        self.ensure_owner(invocation.user_id)?;
        let action = OwnerAction::parse(invocation)?;
        Ok(self.run(action, presence, stats).await)
    }

    /// Run an already authorised action
    pub async fn run(&self, action: OwnerAction, presence: &dyn PresenceSetter, stats: BotStats) -> Reply {
        match action {
            OwnerAction::Presence(kind, text) => {
                presence.set_activity(kind, &text);
                info!("Status set to {} {}", kind.verb(), text);
                done()
            }
            OwnerAction::Load(name) => module_result(self.host.write().await.load(&name).await),
            OwnerAction::Unload(name) => module_result(self.host.write().await.unload(&name).await),
            OwnerAction::Reload(name) => module_result(self.host.write().await.reload(&name).await),
            OwnerAction::ReloadAll => {
                let failures = self.host.write().await.reload_all().await;
                if failures.is_empty() {
                    done()
                } else {
                    Reply::text(failures_reply(&failures)).ephemeral()
                }
            }
            OwnerAction::Info => self.info(stats).await,
        }
    }

    async fn info(&self, stats: BotStats) -> Reply {
        let host = self.host.read().await;
        let loaded = host.loaded();
        let modules = if loaded.is_empty() {
            "none".to_string()
        } else {
            loaded
                .iter()
                .map(|name| {
                    let count = host.module(name).map_or(0, |m| m.commands().len());
                    format!("{name} ({count})")
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        Reply::embed(
            EmbedContent::new("Stats and Info")
                .field("Server Amount", stats.guilds)
                .field("Approximate User Amount", stats.members)
                .field("Loaded Modules", modules),
        )
    }

    /// Module names starting with `partial`
    pub async fn autocomplete(&self, partial: &str) -> Vec<String> {
        self.host
            .read()
            .await
            .available()
            .into_iter()
            .filter(|name| name.starts_with(partial))
            .take(MAX_CHOICES)
            .collect()
    }
}

fn done() -> Reply {
    Reply::text("Done").ephemeral()
}

fn module_result(result: crate::error::Result<()>) -> Reply {
    match result {
        Ok(()) => done(),
        Err(e) => Reply::text(error_reply(&e)),
    }
}
