use thiserror::Error;

/// Fatal problems found while building the relay from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid webhook URL '{url}': {reason}")]
    InvalidWebhookUrl { url: String, reason: String },

    #[error("channel {channel_id} appears in more than one mirror rule")]
    DuplicateChannel { channel_id: String },

    #[error("invalid {name} range: min {min}ms is greater than max {max}ms")]
    InvalidDelayRange { name: &'static str, min: u64, max: u64 },

    #[error("missing gateway token")]
    MissingToken,
}

/// Failure to retrieve the message a reply points at.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid id in message reference: {0}")]
    InvalidId(String),

    #[error("message {message_id} unavailable: {reason}")]
    Unavailable { message_id: String, reason: String },
}

/// Failure of a single webhook send.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Built with `reqwest::Error::without_url` so the webhook token never
    /// reaches the log.
    #[error("HTTP client error: {0}")]
    Http(reqwest::Error),

    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: f64 },

    #[error("webhook rejected payload ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Anything else that went wrong while handling one queued message.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("message handling panicked: {0}")]
    Panicked(String),
}
