//! Basebot Discord - gateway glue for the basebot command host
//!
//! Turns Discord interactions into [`basebot_core::Invocation`]s, answers them
//! through [`InteractionResponder`], and ships the built-in modules.

pub mod client;
pub mod commands;
pub mod embed;
pub mod error;
pub mod handler;
pub mod modules;
pub mod presence;
pub mod responder;

pub use client::{create_client, intents, run};
pub use error::{DiscordError, Result};
pub use handler::BotHandler;
pub use modules::registry;
pub use responder::InteractionResponder;

pub use serenity;
