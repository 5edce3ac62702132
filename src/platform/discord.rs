//! Discord gateway integration: turns serenity message events into
//! [`InboundMessage`]s for the relay and resolves reply targets over REST.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::all::{
    ChannelId, Context, EventHandler, GatewayIntents, Message, MessageId, OnlineStatus, Ready,
};
use serenity::http::Http;
use serenity::Client;
use tracing::{debug, info, warn};

use super::{
    Attachment, Author, Embed, InboundMessage, MessageFetcher, MessageRef, ReferencedMessage,
};
use crate::config::Status;
use crate::error::FetchError;
use crate::relay::{Ingest, Relay};

pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
}

impl From<Status> for OnlineStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Online => OnlineStatus::Online,
            Status::Idle => OnlineStatus::Idle,
            Status::Dnd => OnlineStatus::DoNotDisturb,
            Status::Invisible => OnlineStatus::Invisible,
            Status::Offline => OnlineStatus::Offline,
        }
    }
}

/// Gateway event handler feeding the relay queue.
pub struct MirrorHandler {
    relay: Relay,
    status: Status,
}

impl MirrorHandler {
    pub fn new(relay: Relay, status: Status) -> Self {
        Self { relay, status }
    }
}

#[async_trait]
impl EventHandler for MirrorHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is now mirroring", ready.user.name);
        ctx.set_presence(None, self.status.into());
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let inbound = inbound_from(&msg);
        match self.relay.ingest(inbound).await {
            Ingest::Queued => {}
            skipped => debug!(channel_id = %msg.channel_id, ?skipped, "Not relaying message"),
        }
    }
}

/// Build a serenity client whose message events feed `relay`.
pub async fn build_client(token: &str, relay: Relay, status: Status) -> Result<Client> {
    Client::builder(token, intents())
        .event_handler(MirrorHandler::new(relay, status))
        .await
        .context("Failed to create Discord client")
}

pub fn inbound_from(msg: &Message) -> InboundMessage {
    let embeds = msg
        .embeds
        .iter()
        .filter_map(|embed| {
            serde_json::to_value(embed)
                .and_then(serde_json::from_value::<Embed>)
                .map_err(|e| warn!(error = %e, "Dropping embed that could not be converted"))
                .ok()
        })
        .collect();

    let reply_to = msg.message_reference.as_ref().and_then(|reference| {
        reference.message_id.map(|message_id| MessageRef {
            channel_id: reference.channel_id.to_string(),
            message_id: message_id.to_string(),
        })
    });

    InboundMessage {
        channel_id: msg.channel_id.to_string(),
        guild_id: msg.guild_id.map(|g| g.to_string()),
        author: Author {
            username: msg.author.name.clone(),
            avatar_url: msg.author.avatar_url(),
        },
        content: msg.content.clone(),
        embeds,
        attachments: msg
            .attachments
            .iter()
            .map(|a| Attachment { url: a.url.clone() })
            .collect(),
        reply_to,
        flags: msg.flags.map(|f| f.bits()).unwrap_or_default(),
        webhook_id: msg.webhook_id.map(|w| w.to_string()),
    }
}

/// Fetches reply targets through its own REST client, independent of the
/// gateway session.
pub struct DiscordFetcher {
    http: Http,
}

impl DiscordFetcher {
    pub fn new(token: &str) -> Self {
        Self {
            http: Http::new(token),
        }
    }
}

fn parse_id(raw: &str) -> Result<u64, FetchError> {
    raw.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| FetchError::InvalidId(raw.to_string()))
}

#[async_trait]
impl MessageFetcher for DiscordFetcher {
    async fn fetch(&self, reference: &MessageRef) -> Result<ReferencedMessage, FetchError> {
        let channel_id = ChannelId::new(parse_id(&reference.channel_id)?);
        let message_id = MessageId::new(parse_id(&reference.message_id)?);

        let msg = self
            .http
            .get_message(channel_id, message_id)
            .await
            .map_err(|e| FetchError::Unavailable {
                message_id: reference.message_id.clone(),
                reason: e.to_string(),
            })?;

        Ok(ReferencedMessage {
            author: msg.author.name,
            content: msg.content,
        })
    }
}
