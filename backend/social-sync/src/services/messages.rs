//! Ordered direct-message streams
//!
//! Each channel's messages live at `chats/{channel}/messages`. Subscribers
//! receive the full ordered message list on every change and replace their
//! local view wholesale; there is no optimistic echo of outgoing messages.

use std::sync::Arc;

use doc_store::{Document, DocumentStore, Fields, OrderBy, Query, Subscription};
use tracing::{debug, info, warn};

use crate::domain::{ChannelId, ChatMessage, SessionContext, User};
use crate::error::{SyncError, SyncResult};
use crate::services::channel::{channel_id, messages_collection};
use crate::services::directory::Directory;

fn decode_messages(channel: &ChannelId, docs: &[Document]) -> Vec<ChatMessage> {
    docs.iter()
        .filter_map(|doc| match doc.decode::<ChatMessage>() {
            Ok(msg) => Some(msg),
            Err(e) => {
                warn!(channel = %channel, message_id = %doc.id(), error = %e, "Skipping malformed message");
                None
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct MessageStream {
    store: Arc<dyn DocumentStore>,
}

impl MessageStream {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn query(channel: &ChannelId) -> SyncResult<Query> {
        Ok(Query::collection(messages_collection(channel)?).order_by(OrderBy::asc("createdAt")))
    }

    /// Subscribe to a channel: the current ordered messages plus a handle
    /// yielding every later snapshot
    pub async fn subscribe(
        &self,
        channel: &ChannelId,
    ) -> SyncResult<(Vec<ChatMessage>, MessageSubscription)> {
        let mut inner = self.store.subscribe(Self::query(channel)?).await?;

        let initial = match inner.next().await {
            Some(Ok(docs)) => decode_messages(channel, &docs),
            Some(Err(e)) => return Err(e.into()),
            None => {
                return Err(SyncError::StoreUnavailable(
                    "subscription closed before the first snapshot".to_string(),
                ))
            }
        };

        debug!(channel = %channel, count = initial.len(), "Message subscription opened");
        Ok((
            initial,
            MessageSubscription {
                channel: channel.clone(),
                inner,
            },
        ))
    }

    /// One-shot read of the ordered message log
    pub async fn history(&self, channel: &ChannelId) -> SyncResult<Vec<ChatMessage>> {
        let docs = self.store.list(&Self::query(channel)?).await?;
        Ok(decode_messages(channel, &docs))
    }

    /// Write a new message with a server-assigned timestamp; returns its id
    pub async fn append(
        &self,
        channel: &ChannelId,
        sender_id: &str,
        sender_name: Option<&str>,
        content: &str,
    ) -> SyncResult<String> {
        if content.trim().is_empty() {
            return Err(SyncError::InvalidArgument(
                "message content must not be empty".to_string(),
            ));
        }
        if sender_id.trim().is_empty() {
            return Err(SyncError::InvalidArgument(
                "sender id must not be empty".to_string(),
            ));
        }

        let mut fields = Fields::new()
            .with("senderId", sender_id)
            .with("content", content)
            .with_server_timestamp("createdAt");
        if let Some(name) = sender_name {
            fields = fields.with("senderName", name);
        }

        let id = self
            .store
            .add(&messages_collection(channel)?, fields)
            .await?;

        info!(channel = %channel, message_id = %id, sender_id = %sender_id, "Message appended");
        Ok(id)
    }
}

/// Live message snapshots for one channel; released on drop
pub struct MessageSubscription {
    channel: ChannelId,
    inner: Subscription,
}

impl MessageSubscription {
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Next full ordered snapshot. `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<SyncResult<Vec<ChatMessage>>> {
        let item = self.inner.next().await?;
        Some(
            item.map(|docs| decode_messages(&self.channel, &docs))
                .map_err(SyncError::from),
        )
    }

    /// Next snapshot if one is already queued
    pub fn try_next(&mut self) -> Option<SyncResult<Vec<ChatMessage>>> {
        let item = self.inner.try_next()?;
        Some(
            item.map(|docs| decode_messages(&self.channel, &docs))
                .map_err(SyncError::from),
        )
    }

    pub fn unsubscribe(self) {
        debug!(channel = %self.channel, "Message subscription closed");
        self.inner.unsubscribe();
    }
}

/// An open chat with one partner: materialized messages plus the draft input
pub struct Conversation {
    ctx: SessionContext,
    channel: ChannelId,
    partner: Option<User>,
    messages: Vec<ChatMessage>,
    draft: String,
    error: Option<SyncError>,
    stream: MessageStream,
    subscription: Option<MessageSubscription>,
}

impl Conversation {
    /// Resolve the channel, load the partner profile and start streaming.
    ///
    /// A missing or unreadable partner profile leaves `partner` empty
    /// instead of failing the conversation.
    pub async fn open(
        stream: MessageStream,
        directory: &Directory,
        ctx: &SessionContext,
        partner_id: &str,
    ) -> SyncResult<Self> {
        let channel = channel_id(&ctx.user_id, partner_id)?;

        let partner = match directory.find(partner_id).await {
            Ok(partner) => partner,
            Err(e) => {
                warn!(partner_id = %partner_id, error = %e, "Partner profile unavailable");
                None
            }
        };

        let (messages, subscription) = stream.subscribe(&channel).await?;

        Ok(Self {
            ctx: ctx.clone(),
            channel,
            partner,
            messages,
            draft: String::new(),
            error: None,
            stream,
            subscription: Some(subscription),
        })
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn partner(&self) -> Option<&User> {
        self.partner.as_ref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Last error delivered by the subscription, if the stream is degraded
    pub fn error(&self) -> Option<&SyncError> {
        self.error.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    fn apply(&mut self, item: SyncResult<Vec<ChatMessage>>) {
        match item {
            Ok(messages) => {
                self.messages = messages;
                self.error = None;
            }
            Err(e) => {
                warn!(channel = %self.channel, error = %e, "Message stream error");
                self.error = Some(e);
            }
        }
    }

    /// Wait for the next snapshot and apply it. Returns `false` once the
    /// stream has ended or the conversation was closed.
    pub async fn sync(&mut self) -> bool {
        let item = match self.subscription.as_mut() {
            Some(sub) => sub.next().await,
            None => return false,
        };
        match item {
            Some(item) => {
                self.apply(item);
                true
            }
            None => {
                self.subscription = None;
                false
            }
        }
    }

    /// Apply every snapshot already queued; returns how many were applied
    pub fn sync_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Some(item) = self.subscription.as_mut().and_then(|sub| sub.try_next()) {
            self.apply(item);
            applied += 1;
        }
        applied
    }

    /// Send the draft. It is cleared only after the store accepts the
    /// message, so a failed send can be retried as-is.
    pub async fn send(&mut self) -> SyncResult<String> {
        let id = self
            .stream
            .append(
                &self.channel,
                &self.ctx.user_id,
                self.ctx.display_name(),
                &self.draft,
            )
            .await?;
        self.draft.clear();
        Ok(id)
    }

    /// Stop streaming; the materialized messages stay readable
    pub fn close(&mut self) {
        if let Some(sub) = self.subscription.take() {
            sub.unsubscribe();
        }
    }
}
