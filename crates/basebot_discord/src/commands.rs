//! Translation between command declarations and Discord's command model

use basebot_core::{CommandSpec, Invocation, OptionKind, OptionSpec, OptionValue};
use serenity::all::{
    CommandInteraction, CommandOptionType, CreateCommand, CreateCommandOption, ResolvedOption,
    ResolvedValue,
};

fn option_type(kind: OptionKind) -> CommandOptionType {
    match kind {
        OptionKind::String => CommandOptionType::String,
        OptionKind::Integer => CommandOptionType::Integer,
        OptionKind::Number => CommandOptionType::Number,
        OptionKind::Boolean => CommandOptionType::Boolean,
        OptionKind::User => CommandOptionType::User,
        OptionKind::Channel => CommandOptionType::Channel,
        OptionKind::Role => CommandOptionType::Role,
    }
}

fn create_option(option: &OptionSpec) -> CreateCommandOption {
    CreateCommandOption::new(option_type(option.kind), &option.name, &option.description)
        .required(option.required)
        .set_autocomplete(option.autocomplete)
}

fn create_subcommand(spec: &CommandSpec) -> CreateCommandOption {
    spec.options.iter().fold(
        CreateCommandOption::new(CommandOptionType::SubCommand, &spec.name, &spec.description),
        |sub, option| sub.add_sub_option(create_option(option)),
    )
}

/// Build the registration payload for one command
pub fn create_command(spec: &CommandSpec) -> CreateCommand {
    let mut command = CreateCommand::new(&spec.name)
        .description(&spec.description)
        .dm_permission(!spec.guild_only);

    for option in &spec.options {
        command = command.add_option(create_option(option));
    }
    for subcommand in &spec.subcommands {
        command = command.add_option(create_subcommand(subcommand));
    }
    command
}

fn option_value(value: &ResolvedValue<'_>) -> Option<OptionValue> {
    Some(match value {
        ResolvedValue::String(s) => OptionValue::String(s.to_string()),
        ResolvedValue::Integer(i) => OptionValue::Integer(*i),
        ResolvedValue::Number(n) => OptionValue::Number(*n),
        ResolvedValue::Boolean(b) => OptionValue::Boolean(*b),
        ResolvedValue::User(user, _) => OptionValue::User(user.id.get()),
        ResolvedValue::Channel(channel) => OptionValue::Channel(channel.id.get()),
        ResolvedValue::Role(role) => OptionValue::Role(role.id.get()),
        ResolvedValue::Autocomplete { value, .. } => OptionValue::String(value.to_string()),
        _ => return None,
    })
}

fn collect_options(options: &[ResolvedOption<'_>], invocation: &mut Invocation) {
    for option in options {
        match &option.value {
            ResolvedValue::SubCommand(nested) => {
                invocation.subcommand = Some(option.name.to_string());
                collect_options(nested, invocation);
            }
            value => {
                if let Some(value) = option_value(value) {
                    invocation.options.push((option.name.to_string(), value));
                }
            }
        }
    }
}

/// Strip a command interaction down to an [`Invocation`]
pub fn invocation_from(command: &CommandInteraction) -> Invocation {
    let mut invocation = Invocation::new(command.data.name.clone(), command.user.id.get());
    invocation.channel_id = command.channel_id.get();
    invocation.guild_id = command.guild_id.map(|g| g.get());
    collect_options(&command.data.options(), &mut invocation);
    invocation
}

#[cfg(test)]
mod tests {
    use super::*;
    use basebot_core::OwnerCommands;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_options_are_declared() {
        let spec = CommandSpec::new("ping", "Checks the bot").option(OptionSpec::new(
            "text",
            "Text to echo",
            OptionKind::String,
        ));
        let json = serde_json::to_value(create_command(&spec)).unwrap();

        assert_eq!(json["name"], "ping");
        assert_eq!(json["description"], "Checks the bot");
        assert_eq!(json["options"][0]["name"], "text");
        assert_eq!(json["options"][0]["required"], false);
    }

    #[test]
    fn test_owner_group_becomes_subcommands() {
        let json = serde_json::to_value(create_command(&OwnerCommands::spec())).unwrap();
        let subcommands = json["options"].as_array().unwrap();

        let names: Vec<&str> = subcommands
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["play", "watch", "listen", "load", "unload", "reload", "reload-all", "info"]
        );

        let load = &subcommands[3];
        assert_eq!(load["options"][0]["name"], "module");
        assert_eq!(load["options"][0]["autocomplete"], true);
        assert_eq!(json["dm_permission"], false);
    }
}
