//! Message snapshot and the text/role transforms applied to it.

use regex::Regex;
use std::sync::LazyLock;

use crate::openai::Role;

/// Numeric user-mention token, e.g. `<@123456>`.
static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@\d+>").expect("hardcoded regex"));

/// Owned snapshot of a platform message, detached from the client's types.
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub id: u64,
    pub author_id: u64,
    pub content: String,
    /// Message this one replies to, if any.
    pub parent_id: Option<u64>,
}

/// Remove user-mention tokens and trim the remainder.
pub fn clean_content(text: &str) -> String {
    MENTION.replace_all(text, "").trim().to_string()
}

/// Map a message author to a conversation role. The bot's own messages are
/// the assistant side, everyone else is a user.
pub fn role_for(author_id: u64, bot_id: u64) -> Role {
    if author_id == bot_id {
        Role::Assistant
    } else {
        Role::User
    }
}
