use std::collections::HashMap;
use std::sync::Arc;

use url::Url;

use crate::config::MirrorConfig;
use crate::error::ConfigError;

/// A destination webhook. The token is a credential, so it is left out of
/// `Debug` and `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookTarget {
    id: String,
    token: String,
}

impl WebhookTarget {
    pub fn new(id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            token: token.into(),
        }
    }

    /// Parse `.../webhooks/{id}/{token}`: the last path segment is the token,
    /// the one before it is the numeric id.
    pub fn parse(webhook_url: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidWebhookUrl {
            url: redact(webhook_url),
            reason: reason.to_string(),
        };

        let url = Url::parse(webhook_url).map_err(|e| invalid(&e.to_string()))?;
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let [.., id, token] = segments.as_slice() else {
            return Err(invalid("expected at least two path segments"));
        };
        if id.parse::<u64>().is_err() {
            return Err(invalid("webhook id is not numeric"));
        }

        Ok(Self::new(*id, *token))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for WebhookTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookTarget")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl std::fmt::Display for WebhookTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "webhook {}", self.id)
    }
}

/// Drop the final path segment so error messages never echo a token.
fn redact(webhook_url: &str) -> String {
    let trimmed = webhook_url.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => format!("{}/<redacted>", &trimmed[..idx]),
        None => "<redacted>".to_string(),
    }
}

/// Source channel id -> ordered destination webhooks, built once at startup.
#[derive(Debug, Default)]
pub struct MirrorMap {
    routes: HashMap<String, Arc<[WebhookTarget]>>,
}

impl MirrorMap {
    /// Every channel of a rule shares the same target list. A channel listed
    /// in two rules is rejected instead of silently overwritten.
    pub fn build(mirrors: &[MirrorConfig]) -> Result<Self, ConfigError> {
        let mut routes = HashMap::new();

        for mirror in mirrors {
            let targets = mirror
                .webhook_urls
                .iter()
                .map(|url| WebhookTarget::parse(url))
                .collect::<Result<Vec<_>, _>>()?;
            let targets: Arc<[WebhookTarget]> = targets.into();

            for channel_id in &mirror.channel_ids {
                if routes
                    .insert(channel_id.clone(), Arc::clone(&targets))
                    .is_some()
                {
                    return Err(ConfigError::DuplicateChannel {
                        channel_id: channel_id.clone(),
                    });
                }
            }
        }

        Ok(Self { routes })
    }

    /// Destinations for a channel, in configured order. Empty when unmapped.
    pub fn resolve(&self, channel_id: &str) -> &[WebhookTarget] {
        self.routes.get(channel_id).map(|t| &t[..]).unwrap_or(&[])
    }

    pub fn channel_count(&self) -> usize {
        self.routes.len()
    }

    /// True if `webhook_id` is one of the configured destinations.
    pub fn is_destination(&self, webhook_id: &str) -> bool {
        self.routes
            .values()
            .any(|targets| targets.iter().any(|t| t.id == webhook_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mirror(channels: &[&str], urls: &[&str]) -> MirrorConfig {
        MirrorConfig {
            channel_ids: channels.iter().map(|s| s.to_string()).collect(),
            webhook_urls: urls.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_parse_webhook_url() {
        let target =
            WebhookTarget::parse("https://discord.com/api/webhooks/123456789012345678/aBc-DeF_9")
                .unwrap();
        assert_eq!(target.id(), "123456789012345678");
        assert_eq!(target.token(), "aBc-DeF_9");
    }

    #[test]
    fn test_parse_ignores_trailing_slash() {
        let target = WebhookTarget::parse("https://discord.com/api/webhooks/77/tok/").unwrap();
        assert_eq!(target.id(), "77");
        assert_eq!(target.token(), "tok");
    }

    #[test]
    fn test_parse_rejects_short_path() {
        for bad in ["https://discord.com/", "https://discord.com/tok", "not a url"] {
            let err = WebhookTarget::parse(bad).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidWebhookUrl { .. }),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_non_numeric_id() {
        let err = WebhookTarget::parse("https://discord.com/api/webhooks/abc/tok").unwrap_err();
        assert!(err.to_string().contains("not numeric"));
    }

    #[test]
    fn test_errors_and_debug_hide_token() {
        let err = WebhookTarget::parse("https://discord.com/webhooks/xx/supersecret").unwrap_err();
        assert!(!err.to_string().contains("supersecret"));

        let err =
            WebhookTarget::parse("https://discord.com/api/webhooks/abc/supersecret/").unwrap_err();
        assert!(!err.to_string().contains("supersecret"));
        assert!(err.to_string().contains("webhooks/abc/<redacted>"));

        let target = WebhookTarget::new("1", "supersecret");
        assert!(!format!("{target:?}").contains("supersecret"));
        assert_eq!(target.to_string(), "webhook 1");
    }

    #[test]
    fn test_resolve_in_configured_order() {
        let map = MirrorMap::build(&[
            mirror(
                &["10", "11"],
                &[
                    "https://discord.com/api/webhooks/1/a",
                    "https://discord.com/api/webhooks/2/b",
                ],
            ),
            mirror(&["20"], &["https://discord.com/api/webhooks/3/c"]),
        ])
        .unwrap();

        let ids: Vec<&str> = map.resolve("10").iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(map.resolve("11"), map.resolve("10"));
        assert_eq!(map.resolve("20")[0].id(), "3");
        assert_eq!(map.channel_count(), 3);
        assert!(map.is_destination("2"));
        assert!(!map.is_destination("99"));
    }

    #[test]
    fn test_unmapped_channel_resolves_empty() {
        let map = MirrorMap::build(&[mirror(&["10"], &["https://x.test/webhooks/1/a"])]).unwrap();
        assert!(map.resolve("999").is_empty());
        assert!(MirrorMap::default().resolve("10").is_empty());
    }

    #[test]
    fn test_duplicate_channel_rejected() {
        let err = MirrorMap::build(&[
            mirror(&["10"], &["https://x.test/webhooks/1/a"]),
            mirror(&["10"], &["https://x.test/webhooks/2/b"]),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateChannel { channel_id } if channel_id == "10"));
    }

    #[test]
    fn test_malformed_url_fails_build() {
        let err = MirrorMap::build(&[mirror(&["10"], &["https://x.test/"])]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWebhookUrl { .. }));
    }
}
