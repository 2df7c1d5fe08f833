//! Reply-chain reconstruction.
//!
//! Walks a message's reply references back to the root and lays the
//! conversation out oldest-first for the completion request.

use async_trait::async_trait;

use crate::openai::{Role, Turn};
use crate::relay::message::{ChannelMessage, clean_content, role_for};

/// Failure of a channel operation (message fetch or reply send).
#[derive(Debug)]
pub struct ChannelError(pub String);

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ChannelError {}

/// What the pipeline needs from the platform: fetching referenced
/// messages and sending a reply anchored to one.
#[async_trait]
pub trait ChannelPort: Send + Sync {
    async fn fetch_message(&self, message_id: u64) -> Result<ChannelMessage, ChannelError>;
    async fn send_reply(&self, reply_to: u64, text: &str) -> Result<(), ChannelError>;
}

/// Reconstruct the conversation leading up to `trigger`, oldest first.
///
/// Each replied-to message becomes one cleaned turn; the trigger itself
/// contributes a cleaned turn followed by a closing user turn with its
/// verbatim text. A trigger without a parent reference yields a single
/// raw user turn and no fetches.
///
/// A failed fetch aborts the whole walk. A partially reconstructed
/// conversation is never returned.
pub async fn build_thread(
    port: &dyn ChannelPort,
    trigger: &ChannelMessage,
    bot_id: u64,
) -> Result<Vec<Turn>, ChannelError> {
    let Some(parent_id) = trigger.parent_id else {
        return Ok(vec![Turn { role: Role::User, content: trigger.content.clone() }]);
    };

    // Newest to oldest while following the references.
    let mut turns = Vec::new();
    let mut next_id = Some(parent_id);
    while let Some(id) = next_id {
        let message = port.fetch_message(id).await?;
        turns.push(Turn {
            role: role_for(message.author_id, bot_id),
            content: clean_content(&message.content),
        });
        next_id = message.parent_id;
    }
    turns.reverse();

    turns.push(Turn {
        role: role_for(trigger.author_id, bot_id),
        content: clean_content(&trigger.content),
    });
    turns.push(Turn { role: Role::User, content: trigger.content.clone() });

    Ok(turns)
}
