use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use basebot_core::{Reply, Responder, ResponseError};
use serenity::all::{
    CommandInteraction, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, CreateMessage, Http,
};
use tracing::debug;

use crate::embed::fancy_embed;

/// Sort a serenity error into the cases the failure handler cares about
pub fn classify_error(err: &serenity::Error) -> ResponseError {
    if let serenity::Error::Http(http_err) = err {
        match http_err.status_code().map(|s| s.as_u16()) {
            Some(403) => return ResponseError::Forbidden,
            Some(404) => return ResponseError::NotFound,
            Some(status) if status >= 500 => return ResponseError::ServerError,
            _ => {}
        }
    }
    ResponseError::Other(err.to_string())
}

/// Answers a slash command through its interaction
///
/// The first reply becomes the interaction response, later ones are sent as
/// follow-ups.
pub struct InteractionResponder {
    http: Arc<Http>,
    command: CommandInteraction,
    embed_color: u32,
    responded: AtomicBool,
}

impl InteractionResponder {
    pub fn new(http: Arc<Http>, command: CommandInteraction, embed_color: u32) -> Self {
        Self {
            http,
            command,
            embed_color,
            responded: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Responder for InteractionResponder {
    async fn reply(&self, reply: Reply) -> Result<(), ResponseError> {
        let embed = reply.embed.as_ref().map(|e| fancy_embed(e, self.embed_color));

        if !self.responded.load(Ordering::SeqCst) {
            let mut message = CreateInteractionResponseMessage::new().ephemeral(reply.ephemeral);
            if let Some(content) = &reply.content {
                message = message.content(content);
            }
            if let Some(embed) = embed {
                message = message.embed(embed);
            }
            self.command
                .create_response(&self.http, CreateInteractionResponse::Message(message))
                .await
                .map_err(|e| classify_error(&e))?;
            self.responded.store(true, Ordering::SeqCst);
            return Ok(());
        }

        debug!("Interaction {} already answered, sending follow-up", self.command.id);
        let mut followup = CreateInteractionResponseFollowup::new().ephemeral(reply.ephemeral);
        if let Some(content) = &reply.content {
            followup = followup.content(content);
        }
        if let Some(embed) = embed {
            followup = followup.embed(embed);
        }
        self.command
            .create_followup(&self.http, followup)
            .await
            .map(|_| ())
            .map_err(|e| classify_error(&e))
    }

    async fn direct_message(&self, text: &str) -> Result<(), ResponseError> {
        self.command
            .user
            .direct_message(&self.http, CreateMessage::new().content(text))
            .await
            .map(|_| ())
            .map_err(|e| classify_error(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_http_errors_are_other() {
        let err = serenity::Error::Other("gateway closed");
        assert_eq!(
            classify_error(&err),
            ResponseError::Other("gateway closed".to_string())
        );
    }
}
