//! Discord-backed channel port using serenity.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{ChannelId, CreateMessage, Http, Message, MessageId};
use tracing::warn;

use crate::relay::message::ChannelMessage;
use crate::relay::thread::{ChannelError, ChannelPort};

/// Channel port bound to the channel a mention arrived in.
pub struct DiscordChannel {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl DiscordChannel {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

/// Detach the fields the pipeline needs from a platform message.
pub fn message_snapshot(msg: &Message) -> ChannelMessage {
    ChannelMessage {
        id: msg.id.get(),
        author_id: msg.author.id.get(),
        content: msg.content.clone(),
        parent_id: msg
            .message_reference
            .as_ref()
            .and_then(|reference| reference.message_id)
            .map(|id| id.get()),
    }
}

#[async_trait]
impl ChannelPort for DiscordChannel {
    async fn fetch_message(&self, message_id: u64) -> Result<ChannelMessage, ChannelError> {
        self.http
            .get_message(self.channel_id, MessageId::new(message_id))
            .await
            .map(|m| message_snapshot(&m))
            .map_err(|e| {
                let msg = format!("failed to fetch message {message_id}: {e}");
                warn!("{}", msg);
                ChannelError(msg)
            })
    }

    async fn send_reply(&self, reply_to: u64, text: &str) -> Result<(), ChannelError> {
        let builder = CreateMessage::new()
            .content(text)
            .reference_message((self.channel_id, MessageId::new(reply_to)));
        self.channel_id
            .send_message(&self.http, builder)
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("failed to send reply: {e}");
                warn!("{}", msg);
                ChannelError(msg)
            })
    }
}
