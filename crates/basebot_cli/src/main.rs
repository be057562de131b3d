use std::fs::File;
use std::path::{Path, PathBuf};

use basebot_core::{
    ConfigStore, CoreError, ErrorHandler, ErrorReporter, GeneralSettings, ModuleContext,
    ModuleHost, ensure_token,
};
use basebot_discord::{BotHandler, intents, registry};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser)]
#[command(name = "basebot")]
#[command(about = "Slash command bot with loadable modules")]
#[command(version)]
struct Cli {
    /// Bot token, used only when none is configured yet
    #[arg(env = "BASEBOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Directory holding the category files and the `default/` seeds
    #[arg(long, short = 'c', default_value = "config")]
    config_dir: PathBuf,

    /// Log file, truncated on every start
    #[arg(long, default_value = "bot.log")]
    log_file: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .rgb_colors(miette::RgbColors::Preferred)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))?;
    miette::set_panic_hook();
    let cli = Cli::parse();

    let _guard = init_logging(&cli.log_file, cli.debug)?;

    let mut store = ConfigStore::bootstrap_with(&cli.config_dir, |path| {
        warn!("Created new config file {}", path.display());
    })?;
    ensure_token(&mut store, cli.token.clone(), prompt_token)?;

    let settings = GeneralSettings::from_store(&store)?;
    let token = settings.token.clone();
    let reporter = ErrorReporter::from_settings(&settings);
    if !reporter.is_enabled() {
        info!("No ERROR_WEBHOOK_URL configured, unexpected errors are only logged");
    }

    let config = store.into_shared();
    let mut host = ModuleHost::new(registry(), ModuleContext::new(config));
    for failure in host.load_all().await {
        let context = format!("loading module {}", failure.module);
        reporter.report_error(Some(&context), &failure.error).await;
    }
    info!("Loaded modules: {}", host.loaded().join(", "));

    let intents = intents(&settings);
    let handler = BotHandler::new(host.into_shared(), ErrorHandler::new(reporter), settings);
    basebot_discord::run(&token, handler, intents).await?;

    Ok(())
}

fn prompt_token() -> basebot_core::Result<String> {
    dialoguer::Password::new()
        .with_prompt("Bot token")
        .interact()
        .map_err(|e| CoreError::TokenPromptFailed { cause: Box::new(e) })
}

fn init_logging(log_file: &Path, debug: bool) -> Result<WorkerGuard> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("basebot_core=debug,basebot_discord=debug,basebot=debug,serenity=info")
        } else {
            EnvFilter::new("basebot_core=info,basebot_discord=info,basebot=info,warn")
        }
    });

    let file = File::create(log_file).into_diagnostic()?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            // Console output
            fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::LocalTime::rfc_3339())
                .compact(),
        )
        .with(
            // File output
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_line_number(true)
                .with_ansi(false),
        )
        .init();

    Ok(guard)
}
