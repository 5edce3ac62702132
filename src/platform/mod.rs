pub mod discord;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{DeliveryError, FetchError};
use crate::mirror::WebhookTarget;
use crate::transform::OutboundPayload;

/// Message flag bit for messages only visible to their recipient.
pub const EPHEMERAL_FLAG: u64 = 1 << 6;

/// A chat message observed on the gateway, captured at enqueue time.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    pub channel_id: String,
    /// `None` for direct messages
    pub guild_id: Option<String>,
    pub author: Author,
    pub content: String,
    pub embeds: Vec<Embed>,
    pub attachments: Vec<Attachment>,
    pub reply_to: Option<MessageRef>,
    pub flags: u64,
    /// Set when the message itself was posted through a webhook.
    pub webhook_id: Option<String>,
}

impl InboundMessage {
    pub fn is_ephemeral(&self) -> bool {
        self.flags & EPHEMERAL_FLAG != 0
    }

    /// True when there is no text, embed or attachment to relay.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.embeds.is_empty() && self.attachments.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
}

/// Points at the message a reply was written against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub channel_id: String,
    pub message_id: String,
}

/// The bits of a replied-to message needed to build the quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencedMessage {
    pub author: String,
    pub content: String,
}

/// Rich embed. Only `fields` is inspected; every other attribute is carried
/// through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// Looks up a previously posted message by id.
#[async_trait]
pub trait MessageFetcher: Send + Sync {
    async fn fetch(&self, reference: &MessageRef) -> Result<ReferencedMessage, FetchError>;
}

/// Executes a webhook with a prepared payload.
#[async_trait]
pub trait WebhookSender: Send + Sync {
    async fn send(
        &self,
        target: &WebhookTarget,
        payload: &OutboundPayload,
    ) -> Result<(), DeliveryError>;
}
