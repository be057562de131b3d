use std::sync::Arc;

use basebot_core::owner::OWNER_COMMAND;
use basebot_core::{
    ActivityKind, BotStats, CommandFailure, ErrorHandler, GeneralSettings, Invocation,
    OwnerAction, OwnerCommands, Responder, SharedHost,
};
use serenity::all::{
    Command, CommandInteraction, Context, CreateAutocompleteResponse, CreateCommand,
    CreateInteractionResponse, EventHandler, GuildId, Http, Interaction, Ready,
};
use serenity::async_trait;
use tracing::{debug, info, warn};

use crate::commands::{create_command, invocation_from};
use crate::error::{DiscordError, Result};
use crate::presence::{DEFAULT_STATUS, ShardPresence, activity};
use crate::responder::InteractionResponder;

/// Gateway event handler routing slash commands to the loaded modules
pub struct BotHandler {
    host: SharedHost,
    owner: Arc<OwnerCommands>,
    errors: ErrorHandler,
    settings: GeneralSettings,
}

impl BotHandler {
    pub fn new(host: SharedHost, errors: ErrorHandler, settings: GeneralSettings) -> Self {
        Self {
            owner: Arc::new(OwnerCommands::new(host.clone())),
            host,
            errors,
            settings,
        }
    }

    pub fn owner(&self) -> &Arc<OwnerCommands> {
        &self.owner
    }

    /// Replace the global command list with the loaded modules' commands
    async fn sync_commands(&self, http: &Http) -> Result<usize> {
        let commands: Vec<CreateCommand> = self
            .host
            .read()
            .await
            .commands()
            .iter()
            .map(create_command)
            .collect();
        let count = commands.len();

        Command::set_global_commands(http, commands)
            .await
            .map_err(|e| DiscordError::registration("global commands", count, e))?;
        info!("Synced {} global command(s)", count);
        Ok(count)
    }

    /// Owner commands only exist in the configured owner guilds
    async fn register_owner_commands(&self, http: &Http) -> Vec<DiscordError> {
        if self.settings.owner_guild_ids.is_empty() {
            warn!("No OWNER_GUILD_IDS configured, /{} will not be available", OWNER_COMMAND);
            return Vec::new();
        }

        let mut failures = Vec::new();
        for &guild in &self.settings.owner_guild_ids {
            let commands = vec![create_command(&OwnerCommands::spec())];
            match GuildId::new(guild).set_commands(http, commands).await {
                Ok(_) => debug!("Registered /{} in guild {}", OWNER_COMMAND, guild),
                Err(e) => failures.push(DiscordError::registration(format!("guild {guild}"), 1, e)),
            }
        }
        failures
    }

    async fn report(&self, context: &str, error: &DiscordError) {
        self.errors.reporter().report_error(Some(context), error).await;
    }

    async fn on_command(&self, ctx: Context, command: CommandInteraction) {
        let invocation = invocation_from(&command);
        let name = invocation.full_name();
        info!("/{} from {} ({})", name, command.user.name, invocation.user_id);

        let responder =
            InteractionResponder::new(ctx.http.clone(), command, self.settings.embed_color);
        let result = if invocation.command == OWNER_COMMAND {
            self.run_owner(&ctx, &invocation, &responder).await
        } else {
            self.run_module(&invocation, &responder).await
        };

        if let Err(failure) = result {
            let outcome = self.errors.handle(&name, failure, &responder).await;
            debug!("Failure in /{} handled: {:?}", name, outcome);
        }
    }

    async fn run_owner(
        &self,
        ctx: &Context,
        invocation: &Invocation,
        responder: &dyn Responder,
    ) -> std::result::Result<(), CommandFailure> {
        let presence = ShardPresence::new(ctx.clone());
        let reply = self.owner.handle(invocation, &presence, stats(ctx)).await?;
        responder.reply(reply).await?;

        let changed = OwnerAction::parse(invocation).is_ok_and(|a| a.changes_modules());
        if changed {
            if let Err(e) = self.sync_commands(&ctx.http).await {
                self.report("command sync", &e).await;
            }
        }
        Ok(())
    }

    async fn run_module(
        &self,
        invocation: &Invocation,
        responder: &dyn Responder,
    ) -> std::result::Result<(), CommandFailure> {
        let module = self
            .host
            .read()
            .await
            .find_command(&invocation.command)
            .ok_or_else(|| CommandFailure::CommandNotFound(invocation.command.clone()))?;
        module.invoke(invocation, responder).await
    }

    async fn on_autocomplete(&self, ctx: Context, interaction: CommandInteraction) {
        let Some(focused) = interaction.data.autocomplete() else {
            return;
        };
        let (option, partial) = (focused.name.to_string(), focused.value.to_string());
        let invocation = invocation_from(&interaction);

        let choices = if invocation.command == OWNER_COMMAND {
            if self.owner.is_owner(invocation.user_id) {
                self.owner.autocomplete(&partial).await
            } else {
                Vec::new()
            }
        } else {
            let module = self.host.read().await.find_command(&invocation.command);
            match module {
                Some(module) => module.autocomplete(&invocation, &option, &partial).await,
                None => Vec::new(),
            }
        };

        let response = choices
            .into_iter()
            .fold(CreateAutocompleteResponse::new(), |r, choice| {
                r.add_string_choice(choice.clone(), choice)
            });
        if let Err(e) = interaction
            .create_response(&ctx.http, CreateInteractionResponse::Autocomplete(response))
            .await
        {
            debug!("Autocomplete for /{} not delivered: {}", invocation.command, e);
        }
    }
}

#[async_trait]
impl EventHandler for BotHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        let status = self
            .settings
            .default_status
            .as_deref()
            .unwrap_or(DEFAULT_STATUS);
        ctx.set_activity(Some(activity(ActivityKind::Playing, status)));

        match application_owners(&ctx.http).await {
            Ok(owners) => self.owner.set_owners(owners),
            Err(e) => self.report("owner lookup", &e).await,
        }

        if let Err(e) = self.sync_commands(&ctx.http).await {
            self.report("command sync", &e).await;
        }
        for e in self.register_owner_commands(&ctx.http).await {
            self.report("owner command registration", &e).await;
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => self.on_command(ctx, command).await,
            Interaction::Autocomplete(autocomplete) => {
                self.on_autocomplete(ctx, autocomplete).await
            }
            _ => {}
        }
    }
}

/// The application owner, or every member of the owning team
async fn application_owners(http: &Http) -> Result<Vec<u64>> {
    let info = http
        .get_current_application_info()
        .await
        .map_err(|cause| DiscordError::OwnerLookupFailed { cause })?;

    let mut owners: Vec<u64> = info.owner.iter().map(|user| user.id.get()).collect();
    if let Some(team) = &info.team {
        owners.extend(team.members.iter().map(|member| member.user.id.get()));
    }
    owners.sort_unstable();
    owners.dedup();
    Ok(owners)
}

/// Guild and member counts from the cache
fn stats(ctx: &Context) -> BotStats {
    let guilds = ctx.cache.guilds();
    let members = guilds
        .iter()
        .filter_map(|id| ctx.cache.guild(*id).map(|guild| guild.member_count))
        .sum();
    BotStats {
        guilds: guilds.len(),
        members,
    }
}
