//! Integration tests for module loading and the owner command group

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use basebot_core::module::BoxError;
use basebot_core::owner::error_reply;
use basebot_core::prelude::*;
use basebot_core::{
    BotStats, ModuleHost, ModuleRegistry, OwnerCommands, PresenceSetter, ResponseError,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

static TEARDOWNS: AtomicUsize = AtomicUsize::new(0);

struct Echo;

#[async_trait]
impl CommandModule for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("echo", "Repeats the text")
                .option(OptionSpec::new("text", "What to repeat", OptionKind::String).required()),
        ]
    }

    async fn teardown(&self) {
        TEARDOWNS.fetch_add(1, Ordering::SeqCst);
    }

    async fn invoke(&self, invocation: &Invocation, responder: &dyn Responder) -> std::result::Result<(), CommandFailure> {
        let text = invocation.require_string("text")?;
        responder
            .reply(Reply::text(text))
            .await
            .map_err(CommandFailure::unexpected)
    }
}

/// Declares the same command as `Echo`
struct EchoClone;

#[async_trait]
impl CommandModule for EchoClone {
    fn name(&self) -> &str {
        "echo_clone"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new("echo", "Also repeats the text")]
    }

    async fn invoke(&self, _: &Invocation, _: &dyn Responder) -> std::result::Result<(), CommandFailure> {
        Ok(())
    }
}

struct Broken;

#[async_trait]
impl CommandModule for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new("broken", "Never loads")]
    }

    async fn setup(&self) -> std::result::Result<(), BoxError> {
        Err("database unreachable".into())
    }

    async fn invoke(&self, _: &Invocation, _: &dyn Responder) -> std::result::Result<(), CommandFailure> {
        Ok(())
    }
}

struct Template;

#[async_trait]
impl CommandModule for Template {
    fn name(&self) -> &str {
        "_template"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new("template", "Example only")]
    }

    async fn invoke(&self, _: &Invocation, _: &dyn Responder) -> std::result::Result<(), CommandFailure> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingResponder {
    replies: Mutex<Vec<Reply>>,
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn reply(&self, reply: Reply) -> std::result::Result<(), ResponseError> {
        self.replies.lock().push(reply);
        Ok(())
    }

    async fn direct_message(&self, _text: &str) -> std::result::Result<(), ResponseError> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingPresence {
    activities: Mutex<Vec<(ActivityKind, String)>>,
}

impl PresenceSetter for RecordingPresence {
    fn set_activity(&self, kind: ActivityKind, text: &str) {
        self.activities.lock().push((kind, text.to_string()));
    }
}

fn context() -> (tempfile::TempDir, ModuleContext) {
    let dir = tempfile::tempdir().unwrap();
    let config = ConfigStore::new(dir.path()).into_shared();
    (dir, ModuleContext::new(config))
}

fn registry() -> ModuleRegistry {
    ModuleRegistry::new()
        .with("echo", |_| Arc::new(Echo))
        .with("broken", |_| Arc::new(Broken))
        .with("_template", |_| Arc::new(Template))
}

#[tokio::test]
async fn load_all_skips_templates_and_collects_failures() {
    let (_dir, context) = context();
    let mut host = ModuleHost::new(registry(), context);

    let failures = host.load_all().await;

    assert_eq!(host.available(), vec!["broken".to_string(), "echo".to_string()]);
    assert_eq!(host.loaded(), vec!["echo".to_string()]);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].module, "broken");
    assert!(matches!(failures[0].error, CoreError::ModuleSetupFailed { .. }));
    assert!(host.find_command("broken").is_none());
}

#[tokio::test]
async fn templates_can_still_be_loaded_by_name() {
    let (_dir, context) = context();
    let mut host = ModuleHost::new(registry(), context);

    host.load("_template").await.unwrap();
    assert!(host.find_command("template").is_some());
}

#[tokio::test]
async fn load_errors_are_specific() {
    let (_dir, context) = context();
    let registry = registry().with("echo_clone", |_| Arc::new(EchoClone));
    let mut host = ModuleHost::new(registry, context);

    host.load("echo").await.unwrap();
    assert!(matches!(
        host.load("echo").await,
        Err(CoreError::ModuleAlreadyLoaded { .. })
    ));
    assert!(matches!(
        host.load("music").await,
        Err(CoreError::ModuleNotFound { .. })
    ));
    assert!(matches!(
        host.unload("broken").await,
        Err(CoreError::ModuleNotLoaded { .. })
    ));

    match host.load("echo_clone").await.unwrap_err() {
        CoreError::DuplicateCommand {
            command,
            existing_module,
            ..
        } => {
            assert_eq!(command, "echo");
            assert_eq!(existing_module, "echo");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!host.is_loaded("echo_clone"));
}

#[tokio::test]
async fn routed_command_reaches_module() {
    let (_dir, context) = context();
    let mut host = ModuleHost::new(registry(), context);
    host.load("echo").await.unwrap();

    let module = host.find_command("echo").unwrap();
    let responder = RecordingResponder::default();
    let invocation = Invocation::new("echo", 1).with_option("text", OptionValue::String("hi".into()));
    module.invoke(&invocation, &responder).await.unwrap();

    assert_eq!(responder.replies.lock()[0].content.as_deref(), Some("hi"));
}

#[tokio::test]
async fn reload_tears_down_and_replaces_instance() {
    let (_dir, context) = context();
    let mut host = ModuleHost::new(registry(), context);
    host.load("echo").await.unwrap();
    let before = host.module("echo").unwrap();

    let teardowns = TEARDOWNS.load(Ordering::SeqCst);
    host.reload("echo").await.unwrap();

    assert!(TEARDOWNS.load(Ordering::SeqCst) > teardowns);
    let after = host.module("echo").unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(matches!(
        host.reload("broken").await,
        Err(CoreError::ModuleNotLoaded { .. })
    ));
}

#[tokio::test]
async fn owner_commands_reject_other_users() {
    let (_dir, context) = context();
    let owner = OwnerCommands::new(ModuleHost::new(registry(), context).into_shared());
    owner.set_owners([10]);
    let presence = RecordingPresence::default();

    let invocation = Invocation::new("owner", 99).with_subcommand("info");
    let result = owner.handle(&invocation, &presence, BotStats::default()).await;

    assert!(matches!(result, Err(CommandFailure::NotOwner)));
}

#[tokio::test]
async fn owner_presence_and_module_commands() {
    let (_dir, context) = context();
    let owner = OwnerCommands::new(ModuleHost::new(registry(), context).into_shared());
    owner.set_owners([10]);
    let presence = RecordingPresence::default();

    let play = Invocation::new("owner", 10)
        .with_subcommand("watch")
        .with_option("status", OptionValue::String("the logs".into()));
    let reply = owner.handle(&play, &presence, BotStats::default()).await.unwrap();
    assert_eq!(reply.content.as_deref(), Some("Done"));
    assert_eq!(
        presence.activities.lock().clone(),
        vec![(ActivityKind::Watching, "the logs".to_string())]
    );

    let load = Invocation::new("owner", 10)
        .with_subcommand("load")
        .with_option("module", OptionValue::String("echo".into()));
    let reply = owner.handle(&load, &presence, BotStats::default()).await.unwrap();
    assert_eq!(reply.content.as_deref(), Some("Done"));

    let again = owner.handle(&load, &presence, BotStats::default()).await.unwrap();
    assert_eq!(
        again.content.as_deref(),
        Some("**`ERROR:`** ModuleAlreadyLoaded - Module 'echo' is already loaded")
    );

    let info = Invocation::new("owner", 10).with_subcommand("info");
    let stats = BotStats { guilds: 2, members: 40 };
    let reply = owner.handle(&info, &presence, stats).await.unwrap();
    let embed = reply.embed.unwrap();
    assert_eq!(embed.title, "Stats and Info");
    assert!(embed.fields.contains(&("Server Amount".to_string(), "2".to_string())));
    assert!(embed.fields.contains(&("Loaded Modules".to_string(), "echo (1)".to_string())));
}

#[tokio::test]
async fn owner_reload_all_reports_each_failure() {
    let (_dir, context) = context();
    let owner = OwnerCommands::new(ModuleHost::new(registry(), context).into_shared());
    owner.set_owners([10]);
    let presence = RecordingPresence::default();

    let invocation = Invocation::new("owner", 10).with_subcommand("reload-all");
    let reply = owner.handle(&invocation, &presence, BotStats::default()).await.unwrap();

    let expected_error = CoreError::ModuleSetupFailed {
        name: "broken".to_string(),
        cause: "database unreachable".into(),
    };
    assert_eq!(
        reply.content.unwrap(),
        format!("`broken`: {}", error_reply(&expected_error))
    );
}

#[tokio::test]
async fn owner_autocomplete_filters_by_prefix() {
    let (_dir, context) = context();
    let owner = OwnerCommands::new(ModuleHost::new(registry(), context).into_shared());

    assert_eq!(owner.autocomplete("ec").await, vec!["echo".to_string()]);
    assert_eq!(
        owner.autocomplete("").await,
        vec!["broken".to_string(), "echo".to_string()]
    );
}
