//! Recording stand-ins for the Discord side, used by unit tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};

use crate::config::Config;
use crate::presence::GuildDirectory;
use crate::playback::VoiceTransport;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportCall {
    Join(GuildId, ChannelId),
    Leave(GuildId),
    Stop(GuildId),
    PlayStart(GuildId, PathBuf),
    PlayEnd(GuildId, PathBuf),
}

impl TransportCall {
    pub fn guild(&self) -> GuildId {
        match self {
            Self::Join(g, _)
            | Self::Leave(g)
            | Self::Stop(g)
            | Self::PlayStart(g, _)
            | Self::PlayEnd(g, _) => *g,
        }
    }
}

#[derive(Default)]
pub struct FakeTransport {
    play_time: Duration,
    fail_joins: Mutex<bool>,
    channels: Mutex<HashMap<GuildId, ChannelId>>,
    /// Guilds with a registered call, connected or not.
    held: Mutex<HashSet<GuildId>>,
    playing: Mutex<HashSet<GuildId>>,
    calls: Mutex<Vec<TransportCall>>,
}

impl FakeTransport {
    pub fn with_play_time(play_time: Duration) -> Self {
        Self {
            play_time,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn played(&self) -> Vec<(GuildId, PathBuf)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TransportCall::PlayStart(g, p) => Some((g, p)),
                _ => None,
            })
            .collect()
    }

    pub fn channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.channels.lock().unwrap().get(&guild_id).copied()
    }

    pub fn fail_joins(&self, fail: bool) {
        *self.fail_joins.lock().unwrap() = fail;
    }

    pub fn set_playing(&self, guild_id: GuildId, playing: bool) {
        let mut set = self.playing.lock().unwrap();
        if playing {
            set.insert(guild_id);
        } else {
            set.remove(&guild_id);
        }
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl VoiceTransport for FakeTransport {
    async fn current_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.channel(guild_id)
    }

    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        self.record(TransportCall::Join(guild_id, channel_id));
        self.held.lock().unwrap().insert(guild_id);

        if *self.fail_joins.lock().unwrap() {
            bail!("join refused");
        }

        self.channels.lock().unwrap().insert(guild_id, channel_id);
        Ok(())
    }

    async fn leave(&self, guild_id: GuildId) -> Result<()> {
        if !self.held.lock().unwrap().remove(&guild_id) {
            return Ok(());
        }

        self.record(TransportCall::Leave(guild_id));
        self.channels.lock().unwrap().remove(&guild_id);
        self.playing.lock().unwrap().remove(&guild_id);
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) -> Result<bool> {
        let was_playing = self.playing.lock().unwrap().remove(&guild_id);
        if was_playing {
            self.record(TransportCall::Stop(guild_id));
        }
        Ok(was_playing)
    }

    async fn play(&self, guild_id: GuildId, path: &Path) -> Result<()> {
        self.record(TransportCall::PlayStart(guild_id, path.to_path_buf()));
        self.set_playing(guild_id, true);

        tokio::time::sleep(self.play_time).await;

        self.set_playing(guild_id, false);
        self.record(TransportCall::PlayEnd(guild_id, path.to_path_buf()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    guilds: Mutex<Vec<GuildId>>,
    tracked: Mutex<HashMap<GuildId, ChannelId>>,
    voice_channels: Mutex<HashSet<ChannelId>>,
    text_channels: Mutex<HashSet<ChannelId>>,
    notices: Mutex<Vec<(ChannelId, String)>>,
}

impl FakeDirectory {
    pub fn add_guild(&self, guild_id: GuildId, voice: &[ChannelId]) {
        self.guilds.lock().unwrap().push(guild_id);
        self.voice_channels.lock().unwrap().extend(voice);
    }

    pub fn add_text_channel(&self, channel_id: ChannelId) {
        self.text_channels.lock().unwrap().insert(channel_id);
    }

    pub fn set_tracked(&self, guild_id: GuildId, channel_id: Option<ChannelId>) {
        let mut tracked = self.tracked.lock().unwrap();
        match channel_id {
            Some(c) => tracked.insert(guild_id, c),
            None => tracked.remove(&guild_id),
        };
    }

    pub fn notices(&self) -> Vec<(ChannelId, String)> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl GuildDirectory for FakeDirectory {
    fn guilds(&self) -> Vec<GuildId> {
        self.guilds.lock().unwrap().clone()
    }

    fn tracked_voice_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.tracked.lock().unwrap().get(&guild_id).copied()
    }

    fn is_voice_channel(&self, _guild_id: GuildId, channel_id: ChannelId) -> bool {
        self.voice_channels.lock().unwrap().contains(&channel_id)
    }

    async fn post_notice(
        &self,
        _guild_id: GuildId,
        channel_id: ChannelId,
        content: &str,
    ) -> Result<()> {
        if !self.text_channels.lock().unwrap().contains(&channel_id) {
            bail!("{channel_id} is not a text channel");
        }

        self.notices
            .lock()
            .unwrap()
            .push((channel_id, content.to_string()));
        Ok(())
    }
}

/// Sound layout under `root`: `join.mp3`, `leave.mp3` and `random/{a.mp3,b.wav,c.txt}`.
pub fn sound_tree(root: &Path) {
    std::fs::write(root.join("join.mp3"), b"").unwrap();
    std::fs::write(root.join("leave.mp3"), b"").unwrap();

    let random = root.join("random");
    std::fs::create_dir_all(&random).unwrap();
    for name in ["a.mp3", "b.wav", "c.txt"] {
        std::fs::write(random.join(name), b"").unwrap();
    }
}

pub fn config(root: &Path, extra: &[(&str, &str)]) -> Config {
    let mut vars = vec![
        ("ROLE_NAME".to_string(), "Tracked".to_string()),
        (
            "JOIN_SOUND".to_string(),
            root.join("join.mp3").display().to_string(),
        ),
        (
            "LEAVE_SOUND".to_string(),
            root.join("leave.mp3").display().to_string(),
        ),
        (
            "RANDOM_SOUNDS_DIR".to_string(),
            root.join("random").display().to_string(),
        ),
    ];

    vars.extend(
        extra
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
    );

    envy::from_iter(vars).unwrap()
}
