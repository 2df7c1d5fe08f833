//! Discord event handler wiring mentions into the relay pipeline.

use serenity::all::{Context, EventHandler, GatewayIntents, Message, Ready, UserId};
use serenity::async_trait;
use tracing::{info, warn};

use crate::openai;
use crate::relay::discord::{DiscordChannel, message_snapshot};
use crate::relay::gateway::CompletionGateway;
use crate::relay::message::ChannelMessage;
use crate::relay::thread::{ChannelError, ChannelPort, build_thread};

/// Handler for Discord gateway events.
pub struct RelayHandler {
    pub bot_id: UserId,
    pub gateway: CompletionGateway,
}

impl RelayHandler {
    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }
}

#[async_trait]
impl EventHandler for RelayHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 Logged in as {}", ready.user.name);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // Ignore other bots, and our own replies coming back around.
        if msg.author.bot {
            return;
        }
        if !msg.mentions.iter().any(|user| user.id == self.bot_id) {
            return;
        }

        info!(
            "💬 Mention from {} ({}) in channel {}",
            msg.author.name, msg.author.id, msg.channel_id
        );

        let channel = DiscordChannel::new(ctx.http.clone(), msg.channel_id);
        let trigger = message_snapshot(&msg);
        if let Err(e) = relay_mention(&channel, &self.gateway, &trigger, self.bot_id.get()).await {
            warn!("No reply for message {}: {e}", msg.id);
        }
    }
}

/// One pipeline run: rebuild the thread, obtain a completion, reply.
async fn relay_mention(
    port: &dyn ChannelPort,
    gateway: &CompletionGateway,
    trigger: &ChannelMessage,
    bot_id: u64,
) -> Result<(), RunError> {
    let turns = build_thread(port, trigger, bot_id).await.map_err(RunError::Channel)?;
    let reply = gateway.complete(&turns).await.map_err(RunError::Completion)?;
    port.send_reply(trigger.id, &reply).await.map_err(RunError::Channel)?;
    Ok(())
}

#[derive(Debug)]
enum RunError {
    Channel(ChannelError),
    Completion(openai::Error),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Channel(e) => write!(f, "channel error: {e}"),
            RunError::Completion(e) => write!(f, "completion error: {e}"),
        }
    }
}
