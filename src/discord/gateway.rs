//! Gateway event handler forwarding to the console's notification channel.

use super::convert::to_message;
use crate::domain::IncomingMessage;
use crate::service::Notification;
use serenity::all::{Context, EventHandler, Message as DiscordMessage, Ready};
use serenity::async_trait;
use tokio::sync::mpsc::UnboundedSender;

pub struct GatewayHandler {
    notifications: UnboundedSender<Notification>,
}

impl GatewayHandler {
    pub const fn new(notifications: UnboundedSender<Notification>) -> Self {
        Self { notifications }
    }

    fn forward(&self, notification: Notification) {
        if self.notifications.send(notification).is_err() {
            tracing::debug!("notification dropped, console is gone");
        }
    }
}

#[async_trait]
impl EventHandler for GatewayHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        tracing::info!(user = %ready.user.name, guilds = ready.guilds.len(), "gateway ready");
        self.forward(Notification::Ready {
            user_id: ready.user.id.get(),
            user: ready.user.name.clone(),
        });
    }

    async fn message(&self, ctx: Context, message: DiscordMessage) {
        let own = message.author.id == ctx.cache.current_user().id;
        if own {
            return;
        }

        let (guild_name, channel_name) = message
            .guild_id
            .and_then(|id| ctx.cache.guild(id))
            .map_or((None, None), |guild| {
                let channel = guild.channels.get(&message.channel_id).map(|c| c.name.clone());
                (Some(guild.name.clone()), channel)
            });

        let _span = tracing::debug_span!("gateway_message", channel = message.channel_id.get()).entered();
        self.forward(Notification::Message(IncomingMessage {
            message: to_message(&message, &ctx.cache),
            guild_name,
            channel_name,
        }));
    }
}
