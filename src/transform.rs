use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::config::MentionPair;
use crate::platform::{Embed, InboundMessage, MessageFetcher, ReferencedMessage};

/// Invisible stand-in for text the webhook API refuses to accept empty.
pub const PLACEHOLDER: &str = "\u{1CBC}";

/// Length of a channel mention, `<#` + 18-digit id + `>`. Shorter content is
/// left alone by mention rewriting.
pub const MENTION_TOKEN_LEN: usize = "<#000000000000000000>".len();

/// What a webhook gets executed with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundPayload {
    pub content: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub embeds: Vec<Embed>,
}

/// Per-guild substring rewrites, applied in configured order.
#[derive(Debug, Clone, Default)]
pub struct MentionRules {
    by_guild: HashMap<String, Vec<MentionPair>>,
}

impl MentionRules {
    pub fn new(by_guild: HashMap<String, Vec<MentionPair>>) -> Self {
        Self { by_guild }
    }

    pub fn apply(&self, guild_id: Option<&str>, content: String) -> String {
        if content.chars().count() <= MENTION_TOKEN_LEN {
            return content;
        }
        let Some(pairs) = guild_id.and_then(|g| self.by_guild.get(g)) else {
            return content;
        };
        pairs.iter().fold(content, |acc, pair| {
            if pair.original.is_empty() {
                acc
            } else {
                acc.replace(&pair.original, &pair.replaced)
            }
        })
    }
}

pub fn reply_quote(replied: &ReferencedMessage) -> String {
    let content = if replied.content.is_empty() {
        "*(No content)*"
    } else {
        replied.content.as_str()
    };
    format!("> **Replying to {}:**\n> {}\n\n", replied.author, content)
}

/// Copy of `embeds` with every empty field name or value swapped for the
/// placeholder.
pub fn sanitize_embeds(embeds: &[Embed]) -> Vec<Embed> {
    embeds
        .iter()
        .map(|embed| {
            let mut embed = embed.clone();
            for field in &mut embed.fields {
                if field.name.is_empty() {
                    field.name = PLACEHOLDER.to_string();
                }
                if field.value.is_empty() {
                    field.value = PLACEHOLDER.to_string();
                }
            }
            embed
        })
        .collect()
}

/// Build the outbound payload from a message and the already fetched reply
/// target, if any.
pub fn render(
    message: &InboundMessage,
    replied: Option<&ReferencedMessage>,
    mentions: &MentionRules,
) -> OutboundPayload {
    let mut content = match replied {
        Some(replied) => reply_quote(replied) + &message.content,
        None => message.content.clone(),
    };

    let embeds = sanitize_embeds(&message.embeds);

    content = mentions.apply(message.guild_id.as_deref(), content);

    if content.is_empty() && !embeds.is_empty() {
        content = PLACEHOLDER.to_string();
    }

    for attachment in &message.attachments {
        content.push('\n');
        content.push_str(&attachment.url);
    }

    OutboundPayload {
        content,
        username: message.author.username.clone(),
        avatar_url: message.author.avatar_url.clone(),
        embeds,
    }
}

/// Fetch the reply target (if any) and render. A failed fetch only drops the
/// quote.
pub async fn transform(
    message: &InboundMessage,
    mentions: &MentionRules,
    fetcher: &dyn MessageFetcher,
) -> OutboundPayload {
    let replied = match &message.reply_to {
        Some(reference) => match fetcher.fetch(reference).await {
            Ok(replied) => Some(replied),
            Err(e) => {
                warn!(
                    channel_id = %message.channel_id,
                    message_id = %reference.message_id,
                    error = %e,
                    "Error fetching replied message, likely deleted"
                );
                None
            }
        },
        None => None,
    };

    render(message, replied.as_ref(), mentions)
}
