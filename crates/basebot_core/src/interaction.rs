//! Seams between command logic and the chat platform
//!
//! Command modules, the owner commands and the error handler only talk to
//! these traits. The Discord crate provides the real implementations.

use async_trait::async_trait;
use thiserror::Error;

/// Why a reply could not be delivered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// The bot lacks permission to post where it was asked to
    #[error("missing permissions to respond")]
    Forbidden,

    /// The interaction, channel or user no longer exists
    #[error("response target no longer exists")]
    NotFound,

    #[error("the platform failed to process the response")]
    ServerError,

    #[error("response failed: {0}")]
    Other(String),
}

/// A titled block of fields, rendered as an embed by the platform
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedContent {
    pub title: String,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub inline: bool,
}

impl EmbedContent {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.fields.push((name.into(), value.to_string()));
        self
    }

    pub fn inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }
}

/// What a command sends back to its invoker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub content: Option<String>,
    pub embed: Option<EmbedContent>,
    pub ephemeral: bool,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn embed(embed: EmbedContent) -> Self {
        Self {
            embed: Some(embed),
            ..Default::default()
        }
    }

    /// Only visible to the invoker
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Plain text form, used for direct messages and logs
    pub fn to_plain_text(&self) -> String {
        let mut parts = Vec::new();
        if let Some(content) = &self.content {
            parts.push(content.clone());
        }
        if let Some(embed) = &self.embed {
            if !embed.title.is_empty() {
                parts.push(format!("**{}**", embed.title));
            }
            if !embed.description.is_empty() {
                parts.push(embed.description.clone());
            }
            for (name, value) in &embed.fields {
                parts.push(format!("{name}: {value}"));
            }
        }
        parts.join("\n")
    }
}

/// Answers one command invocation
#[async_trait]
pub trait Responder: Send + Sync {
    /// Respond in the channel the command was used in
    async fn reply(&self, reply: Reply) -> Result<(), ResponseError>;

    /// Send a direct message to whoever invoked the command
    async fn direct_message(&self, text: &str) -> Result<(), ResponseError>;
}

/// Send an ephemeral text reply, reporting only whether it arrived
pub async fn try_send(responder: &dyn Responder, text: &str) -> bool {
    responder.reply(Reply::text(text).ephemeral()).await.is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Playing,
    Watching,
    Listening,
}

impl ActivityKind {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::Watching => "watching",
            Self::Listening => "listening to",
        }
    }
}

/// Changes the bot's visible status
pub trait PresenceSetter: Send + Sync {
    fn set_activity(&self, kind: ActivityKind, text: &str);
}
