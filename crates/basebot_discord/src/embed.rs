use basebot_core::EmbedContent;
use serenity::all::{Colour, CreateEmbed, CreateEmbedFooter};

pub const FOOTER: &str = "Powered by basebot";

/// Embed in the bot's colour with the standard footer
pub fn fancy_embed(content: &EmbedContent, color: u32) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .colour(Colour::new(color))
        .footer(CreateEmbedFooter::new(FOOTER));

    if !content.title.is_empty() {
        embed = embed.title(&content.title);
    }
    if !content.description.is_empty() {
        embed = embed.description(&content.description);
    }
    for (name, value) in &content.fields {
        embed = embed.field(name, value, content.inline);
    }
    embed
}
