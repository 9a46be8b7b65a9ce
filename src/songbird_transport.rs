use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context as _, Result};
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::input::core::io::ReadOnlySource;
use songbird::input::{ChildContainer, Input, RawAdapter};
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::{CoreEvent, Event, Songbird, TrackEvent};
use tokio::sync::Notify;

use crate::listener::songbird::{DriverDisconnectNotifier, TrackEndNotifier};
use crate::playback::VoiceTransport;

const SAMPLE_RATE: u32 = 48_000;
const CHANNELS: u32 = 2;
/// How often a running track re-checks that the connection is still alive.
const POLL_INTERVAL: Duration = Duration::from_millis(300);

pub struct SongbirdTransport {
    manager: Arc<Songbird>,
    ffmpeg_path: String,
    tracks: Mutex<HashMap<GuildId, TrackHandle>>,
}

impl SongbirdTransport {
    pub fn new(manager: Arc<Songbird>, ffmpeg_path: String) -> Self {
        Self {
            manager,
            ffmpeg_path,
            tracks: Mutex::new(HashMap::new()),
        }
    }

    /// Decodes `path` to 48 kHz stereo f32 PCM through the transcoder.
    fn transcode(&self, path: &Path) -> Result<Input> {
        let child = Command::new(&self.ffmpeg_path)
            .arg("-nostdin")
            .arg("-i")
            .arg(path)
            .args(["-vn", "-loglevel", "panic"])
            .args(["-f", "f32le", "-ac", "2", "-ar", "48000", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.ffmpeg_path))?;

        Ok(RawAdapter::new(ReadOnlySource::new(ChildContainer::from(child)), SAMPLE_RATE, CHANNELS).into())
    }

    async fn is_connected(&self, guild_id: GuildId) -> bool {
        let Some(call) = self.manager.get(guild_id) else {
            return false;
        };

        let connected = call.lock().await.current_connection().is_some();
        connected
    }
}

async fn is_running(track: &TrackHandle) -> bool {
    track
        .get_info()
        .await
        .is_ok_and(|state| matches!(state.playing, PlayMode::Play))
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    async fn current_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let call = self.manager.get(guild_id)?;
        let call = call.lock().await;

        call.current_connection()?;
        call.current_channel().map(|c| ChannelId::new(c.0.get()))
    }

    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        if self.manager.get(guild_id).is_none() {
            self.manager.get_or_insert(guild_id).lock().await.add_global_event(
                CoreEvent::DriverDisconnect.into(),
                DriverDisconnectNotifier {
                    songbird_manager: Arc::clone(&self.manager),
                },
            );
        }

        self.manager
            .join(guild_id, channel_id)
            .await
            .with_context(|| format!("Failed to join {channel_id}"))?;

        Ok(())
    }

    async fn leave(&self, guild_id: GuildId) -> Result<()> {
        self.tracks.lock().unwrap().remove(&guild_id);

        if self.manager.get(guild_id).is_some() {
            self.manager
                .remove(guild_id)
                .await
                .context("Failed to remove songbird instance")?;
        }

        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) -> Result<bool> {
        let track = self.tracks.lock().unwrap().remove(&guild_id);
        let Some(track) = track else {
            return Ok(false);
        };

        if !is_running(&track).await {
            return Ok(false);
        }

        let _: Result<_, _> = track.stop();
        Ok(true)
    }

    async fn play(&self, guild_id: GuildId, path: &Path) -> Result<()> {
        let call = self
            .manager
            .get(guild_id)
            .context("Not in a voice channel")?;
        let input = self.transcode(path)?;

        let done = Arc::new(Notify::new());
        let track = call.lock().await.play_input(input);

        for event in [TrackEvent::End, TrackEvent::Error] {
            if track
                .add_event(
                    Event::Track(event),
                    TrackEndNotifier {
                        done: Arc::clone(&done),
                    },
                )
                .is_err()
            {
                done.notify_one();
            }
        }

        self.tracks
            .lock()
            .unwrap()
            .insert(guild_id, track.clone());

        loop {
            tokio::select! {
                () = done.notified() => break,
                () = tokio::time::sleep(POLL_INTERVAL) => {
                    if !self.is_connected(guild_id).await || !is_running(&track).await {
                        break;
                    }
                }
            }
        }

        // Dropping the track's input kills the transcoder.
        let _: Result<_, _> = track.stop();
        self.tracks.lock().unwrap().remove(&guild_id);

        Ok(())
    }
}
