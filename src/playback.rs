use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};

/// Pause between stopping a running track and starting the next one.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);
/// Pause after a track has finished, before the guard is released.
pub const COOLDOWN: Duration = Duration::from_millis(200);

#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Channel the bot's live connection in `guild_id` points at.
    async fn current_channel(&self, guild_id: GuildId) -> Option<ChannelId>;

    /// Opens a connection, or moves the existing one.
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()>;

    /// Drops the guild's call, including one left behind by a failed join.
    /// A no-op when no call is held.
    async fn leave(&self, guild_id: GuildId) -> Result<()>;

    /// Stops the running track. Returns whether anything was playing.
    async fn stop(&self, guild_id: GuildId) -> Result<bool>;

    /// Plays `path` and resolves once it has finished or the connection dropped.
    async fn play(&self, guild_id: GuildId, path: &Path) -> Result<()>;
}

/// Process-wide lock serializing every connect/play sequence, across all guilds.
#[derive(Default)]
pub struct PlaybackGuard(Mutex<()>);

impl PlaybackGuard {
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.0.lock().await
    }
}

pub struct VoiceSessions {
    transport: Arc<dyn VoiceTransport>,
    guard: PlaybackGuard,
}

impl VoiceSessions {
    pub fn new(transport: Arc<dyn VoiceTransport>) -> Self {
        Self {
            transport,
            guard: PlaybackGuard::default(),
        }
    }

    pub async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> bool {
        let _guard = self.guard.lock().await;
        self.ensure_connected(guild_id, channel_id).await
    }

    /// Connects first, so the bot joins even when `path` is missing.
    pub async fn connect_and_play(&self, guild_id: GuildId, channel_id: ChannelId, path: &Path) {
        let _guard = self.guard.lock().await;
        self.ensure_connected(guild_id, channel_id).await;
        self.play_file(guild_id, channel_id, path).await;
    }

    pub async fn play(&self, guild_id: GuildId, channel_id: ChannelId, path: &Path) {
        let _guard = self.guard.lock().await;
        self.play_file(guild_id, channel_id, path).await;
    }

    pub async fn disconnect(&self, guild_id: GuildId) {
        let _guard = self.guard.lock().await;

        if let Err(why) = self.transport.leave(guild_id).await {
            error!("Failed to leave voice in guild {guild_id}: {why:?}");
        }
    }

    async fn ensure_connected(&self, guild_id: GuildId, channel_id: ChannelId) -> bool {
        match self.transport.current_channel(guild_id).await {
            Some(current) if current == channel_id => return true,
            Some(_) => info!("Moving bot to voice channel {channel_id} in guild {guild_id}"),
            None => info!("Connecting bot to voice channel {channel_id} in guild {guild_id}"),
        }

        match self.transport.join(guild_id, channel_id).await {
            Ok(()) => true,
            Err(why) => {
                error!("Failed to join voice channel {channel_id}: {why:?}");
                false
            }
        }
    }

    async fn play_file(&self, guild_id: GuildId, channel_id: ChannelId, path: &Path) {
        if !path.exists() {
            warn!("Sound file not found: {}", path.display());
            return;
        }

        if !self.ensure_connected(guild_id, channel_id).await {
            warn!("No active voice connection to play on in guild {guild_id}");
            return;
        }

        if let Err(why) = self.play_connected(guild_id, path).await {
            error!("Failed to play {}: {why:?}", path.display());
        }
    }

    async fn play_connected(&self, guild_id: GuildId, path: &Path) -> Result<()> {
        if self.transport.stop(guild_id).await? {
            tokio::time::sleep(SETTLE_DELAY).await;
        }

        info!("Playing sound: {}", path.display());
        self.transport.play(guild_id, path).await?;

        tokio::time::sleep(COOLDOWN).await;

        Ok(())
    }
}
