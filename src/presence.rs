use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use rand::Rng;
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::playback::{VoiceSessions, VoiceTransport};
use crate::role::RoleMatcher;
use crate::schedule::{SchedulerState, Timing};
use crate::sound_library::SoundLibrary;

/// Read access to guild rosters plus the one write the bot does in text channels.
#[async_trait]
pub trait GuildDirectory: Send + Sync {
    fn guilds(&self) -> Vec<GuildId>;

    /// Voice channel of the first tracked member found in `guild_id`.
    fn tracked_voice_channel(&self, guild_id: GuildId) -> Option<ChannelId>;

    fn is_voice_channel(&self, guild_id: GuildId, channel_id: ChannelId) -> bool;

    async fn post_notice(&self, guild_id: GuildId, channel_id: ChannelId, content: &str)
        -> Result<()>;
}

/// One voice-state update, as seen by the presence handlers.
#[derive(Clone, Debug)]
pub struct VoiceTransition {
    pub guild_id: GuildId,
    pub role_names: Vec<String>,
    pub before: Option<ChannelId>,
    pub after: Option<ChannelId>,
}

impl VoiceTransition {
    /// Channel entered by this update, if any.
    pub fn joined(&self) -> Option<ChannelId> {
        self.after.filter(|after| self.before != Some(*after))
    }

    /// Channel left by this update, if any.
    pub fn left(&self) -> Option<ChannelId> {
        self.before.filter(|before| self.after != Some(*before))
    }
}

pub struct Companion {
    pub(crate) config: Arc<Config>,
    pub(crate) roles: RoleMatcher,
    pub(crate) sounds: SoundLibrary,
    pub(crate) sessions: VoiceSessions,
    pub(crate) schedule: SchedulerState,
    pub(crate) directory: Arc<dyn GuildDirectory>,
    startup_swept: AtomicBool,
}

impl Companion {
    pub fn new(
        config: Arc<Config>,
        transport: Arc<dyn VoiceTransport>,
        directory: Arc<dyn GuildDirectory>,
    ) -> Self {
        Self {
            roles: RoleMatcher::new(&config.role_name),
            sounds: SoundLibrary::new(&config.random_sounds_dir),
            sessions: VoiceSessions::new(transport),
            schedule: SchedulerState::new(Timing {
                base: config.base_interval(),
                jitter_sec: config.jitter_sec,
            }),
            directory,
            config,
            startup_swept: AtomicBool::new(false),
        }
    }

    pub async fn on_voice_state(self: &Arc<Self>, transition: VoiceTransition) {
        if !self
            .roles
            .is_tracked(transition.role_names.iter().map(String::as_str))
        {
            return;
        }

        let guild_id = transition.guild_id;

        if let Some(after) = transition.after {
            self.schedule.remember_channel(guild_id, after);
        }

        if let Some(joined) = transition.joined() {
            info!("Tracked member joined voice channel {joined} in guild {guild_id}");
            self.greet(guild_id, joined).await;
        }

        if let Some(left) = transition.left() {
            info!("Tracked member left voice channel {left} in guild {guild_id}");
            self.spawn_departure_check(guild_id);
            self.spawn_leave_notice(guild_id);
        }
    }

    /// Joins the tracked member wherever they already are. Only the first call does anything.
    pub async fn rejoin_on_startup(&self) {
        if self.startup_swept.swap(true, Ordering::SeqCst) {
            debug!("Startup presence sweep already done, skipping");
            return;
        }

        for guild_id in self.directory.guilds() {
            let Some(channel_id) = self.directory.tracked_voice_channel(guild_id) else {
                continue;
            };

            info!(
                "Tracked member is already in voice channel {channel_id} in guild {guild_id}, joining"
            );
            self.schedule.remember_channel(guild_id, channel_id);
            self.greet(guild_id, channel_id).await;
        }
    }

    async fn greet(&self, guild_id: GuildId, channel_id: ChannelId) {
        self.sessions
            .connect_and_play(guild_id, channel_id, &self.config.join_sound)
            .await;
        self.schedule.schedule_next(guild_id);
    }

    fn spawn_departure_check(self: &Arc<Self>, guild_id: GuildId) {
        let this = Arc::clone(self);
        let grace = self.config.disconnect_grace();

        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            this.check_departure(guild_id).await;
        });
    }

    fn spawn_leave_notice(self: &Arc<Self>, guild_id: GuildId) {
        let this = Arc::clone(self);
        let delay = rand::thread_rng().gen_range(self.config.leave_notice_delay());

        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(delay)).await;
            this.leave_notice(guild_id).await;
        });
    }

    /// A check that finds the member back in voice does nothing.
    async fn check_departure(&self, guild_id: GuildId) {
        if self.directory.tracked_voice_channel(guild_id).is_some() {
            debug!("Tracked member is back in voice in guild {guild_id}, staying");
            return;
        }

        info!("Tracked member is no longer in voice in guild {guild_id}, disconnecting");
        self.sessions.disconnect(guild_id).await;
        self.schedule.disarm(guild_id);
    }

    async fn leave_notice(&self, guild_id: GuildId) {
        if let Some(text_channel) = self.config.notice_channel() {
            if let Err(why) = self
                .directory
                .post_notice(guild_id, text_channel, &self.config.leave_notice_text())
                .await
            {
                warn!("Failed to post leave notice to {text_channel}: {why:?}");
            }
            return;
        }

        let Some(voice_channel) = self.schedule.last_channel(guild_id) else {
            return;
        };

        if !self.directory.is_voice_channel(guild_id, voice_channel) {
            warn!("Last known channel {voice_channel} is no longer a voice channel");
            return;
        }

        self.sessions
            .play(guild_id, voice_channel, &self.config.leave_sound)
            .await;

        if self.directory.tracked_voice_channel(guild_id).is_none() {
            self.sessions.disconnect(guild_id).await;
        }
    }
}
