use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::ProcessingError;
use crate::mirror::MirrorMap;
use crate::pacing::{self, Pacing};
use crate::platform::{InboundMessage, MessageFetcher, WebhookSender};
use crate::transform::{self, MentionRules};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    Idle,
    Draining,
}

/// What the ingestion hook did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    Queued,
    /// No text, embeds or attachments.
    Empty,
    Ephemeral,
    /// Posted by one of our own destination webhooks.
    OwnWebhook,
}

/// Outcome of relaying one message.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// FIFO of pending messages drained by at most one worker task.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

struct RelayInner {
    queue: Mutex<VecDeque<InboundMessage>>,
    draining: AtomicBool,
    mirrors: MirrorMap,
    mentions: MentionRules,
    pacing: Pacing,
    fetcher: Arc<dyn MessageFetcher>,
    sender: Arc<dyn WebhookSender>,
}

impl Relay {
    pub fn new(
        mirrors: MirrorMap,
        mentions: MentionRules,
        pacing: Pacing,
        fetcher: Arc<dyn MessageFetcher>,
        sender: Arc<dyn WebhookSender>,
    ) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                queue: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
                mirrors,
                mentions,
                pacing,
                fetcher,
                sender,
            }),
        }
    }

    /// Entry point for every new gateway message. Queues anything relayable
    /// and makes sure a worker is draining.
    pub async fn ingest(&self, message: InboundMessage) -> Ingest {
        if message.is_empty() {
            return Ingest::Empty;
        }
        if message.is_ephemeral() {
            return Ingest::Ephemeral;
        }
        if let Some(webhook_id) = &message.webhook_id {
            if self.inner.mirrors.is_destination(webhook_id) {
                return Ingest::OwnWebhook;
            }
        }

        debug!(channel_id = %message.channel_id, "Queueing message");
        self.inner.queue.lock().await.push_back(message);

        if self.inner.try_begin_drain() {
            tokio::spawn(Arc::clone(&self.inner).drain());
        }
        Ingest::Queued
    }

    pub fn state(&self) -> DrainState {
        if self.inner.draining.load(Ordering::Acquire) {
            DrainState::Draining
        } else {
            DrainState::Idle
        }
    }

    pub async fn pending(&self) -> usize {
        self.inner.queue.lock().await.len()
    }

    pub fn mirrors(&self) -> &MirrorMap {
        &self.inner.mirrors
    }
}

impl RelayInner {
    /// Idle -> Draining. Only the caller that wins may run `drain`.
    fn try_begin_drain(&self) -> bool {
        self.draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    async fn pop(&self) -> Option<InboundMessage> {
        self.queue.lock().await.pop_front()
    }

    async fn drain(self: Arc<Self>) {
        loop {
            while let Some(message) = self.pop().await {
                self.relay(message).await;

                let delay = self.pacing.next_batch_delay();
                info!(
                    delay_ms = delay,
                    "Finished processing message, waiting before checking for the next one"
                );
                pacing::wait(delay).await;
            }

            self.draining.store(false, Ordering::Release);

            // A push that landed between the last pop and the store above saw
            // Draining and did not spawn a worker.
            if self.queue.lock().await.is_empty() {
                info!("Message queue empty. Waiting for new messages...");
                return;
            }
            if !self.try_begin_drain() {
                return;
            }
        }
    }

    /// Relay one message. Nothing escapes: failures are logged here.
    async fn relay(&self, message: InboundMessage) {
        let result = AssertUnwindSafe(self.deliver(&message))
            .catch_unwind()
            .await
            .map_err(|panic| ProcessingError::Panicked(panic_message(panic.as_ref())));

        match result {
            Ok(report) => debug!(
                channel_id = %message.channel_id,
                delivered = report.delivered,
                failed = report.failed,
                "Message relayed"
            ),
            Err(e) => error!(
                channel_id = %message.channel_id,
                error = %e,
                "Error while processing message"
            ),
        }
    }

    async fn deliver(&self, message: &InboundMessage) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        let targets = self.mirrors.resolve(&message.channel_id);
        if targets.is_empty() {
            return report;
        }

        let payload = transform::transform(message, &self.mentions, self.fetcher.as_ref()).await;

        for target in targets {
            let delay = self.pacing.next_webhook_delay();
            info!(webhook = %target, delay_ms = delay, "Waiting before sending to webhook");
            pacing::wait(delay).await;

            match self.sender.send(target, &payload).await {
                Ok(()) => {
                    info!(webhook = %target, "Message sent via webhook");
                    report.delivered += 1;
                }
                Err(e) => {
                    error!(
                        channel_id = %message.channel_id,
                        webhook = %target,
                        error = %e,
                        "Error sending message via webhook"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
