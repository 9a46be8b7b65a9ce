use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use serde::Deserialize;
use serenity::model::id::ChannelId;

#[derive(Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub discord_token: Option<String>,

    #[serde(default = "default_role_name")]
    pub role_name: String,

    #[serde(default = "default_join_sound")]
    pub join_sound: PathBuf,

    #[serde(default = "default_leave_sound")]
    pub leave_sound: PathBuf,

    #[serde(default = "default_random_sounds_dir")]
    pub random_sounds_dir: PathBuf,

    #[serde(default = "default_base_interval_min")]
    pub base_interval_min: u64,

    #[serde(default = "default_jitter_sec")]
    pub jitter_sec: u64,

    #[serde(default)]
    pub text_channel_id: Option<u64>,

    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    #[serde(default = "default_disconnect_grace_sec")]
    pub disconnect_grace_sec: u64,

    #[serde(default = "default_leave_notice_min_sec")]
    pub leave_notice_min_sec: u64,

    #[serde(default = "default_leave_notice_max_sec")]
    pub leave_notice_max_sec: u64,

    #[serde(default = "default_tick_interval_sec")]
    pub tick_interval_sec: u64,
}

fn default_role_name() -> String {
    "tracked".to_string()
}

fn default_join_sound() -> PathBuf {
    "./sounds/join.mp3".into()
}

fn default_leave_sound() -> PathBuf {
    "./sounds/leave.mp3".into()
}

fn default_random_sounds_dir() -> PathBuf {
    "./sounds/random".into()
}

fn default_base_interval_min() -> u64 {
    5
}

fn default_jitter_sec() -> u64 {
    90
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_disconnect_grace_sec() -> u64 {
    10
}

fn default_leave_notice_min_sec() -> u64 {
    20
}

fn default_leave_notice_max_sec() -> u64 {
    60
}

fn default_tick_interval_sec() -> u64 {
    30
}

impl Config {
    /// Reads `.env` (if any) and then the process environment.
    pub fn from_env() -> Result<Self> {
        if let Err(why) = dotenvy::dotenv() {
            if !why.not_found() {
                tracing::warn!("Failed to read .env: {why}");
            }
        }

        envy::from_env().context("Failed to parse configuration from environment")
    }

    pub fn token(&self) -> Option<&str> {
        self.discord_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// `TEXT_CHANNEL_ID=0` is treated the same as an unset variable.
    pub fn notice_channel(&self) -> Option<ChannelId> {
        self.text_channel_id
            .filter(|id| *id != 0)
            .map(ChannelId::new)
    }

    pub fn base_interval(&self) -> Duration {
        Duration::from_secs(self.base_interval_min.saturating_mul(60))
    }

    pub fn disconnect_grace(&self) -> Duration {
        Duration::from_secs(self.disconnect_grace_sec)
    }

    pub fn leave_notice_delay(&self) -> RangeInclusive<u64> {
        let (lo, hi) = if self.leave_notice_min_sec <= self.leave_notice_max_sec {
            (self.leave_notice_min_sec, self.leave_notice_max_sec)
        } else {
            (self.leave_notice_max_sec, self.leave_notice_min_sec)
        };

        lo..=hi
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_sec.max(1))
    }

    pub fn leave_notice_text(&self) -> String {
        format!(
            "🔕 {} left voice. I'll leave soon if they don't come back.",
            self.role_name.trim()
        )
    }
}
