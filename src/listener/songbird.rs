use std::sync::Arc;

use serenity::async_trait;
use songbird::{Event, EventContext, EventHandler as VoiceEventHandler, Songbird};
use tokio::sync::Notify;
use tracing::warn;

pub struct DriverDisconnectNotifier {
    pub songbird_manager: Arc<Songbird>,
}

#[async_trait]
impl VoiceEventHandler for DriverDisconnectNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let EventContext::DriverDisconnect(ctx) = ctx else {
            return None;
        };

        // A requested leave has no reason and is already being torn down.
        let Some(reason) = &ctx.reason else {
            return None;
        };

        warn!("Voice driver disconnected in guild {:?}: {reason:?}", ctx.guild_id);

        if self.songbird_manager.get(ctx.guild_id).is_some() {
            if let Err(why) = self.songbird_manager.remove(ctx.guild_id).await {
                warn!("Failed to drop call for guild {:?}: {why:?}", ctx.guild_id);
            }
        }

        None
    }
}

/// Wakes the task waiting on a track once it ends or errors out.
pub struct TrackEndNotifier {
    pub done: Arc<Notify>,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(_) = ctx {
            self.done.notify_one();
        }
        None
    }
}
