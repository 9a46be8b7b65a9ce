use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use rand::Rng;
use serenity::model::id::{ChannelId, GuildId};
use tokio::time::Instant;
use tracing::debug;

/// Minimum width of the jitter window, whatever `JITTER_SEC` says.
const MIN_JITTER_SEC: u64 = 5;
/// Stand-in deadline for delays too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Clone, Copy, Debug)]
pub struct Timing {
    pub base: Duration,
    pub jitter_sec: u64,
}

impl Timing {
    pub fn jitter_span(&self) -> u64 {
        self.jitter_sec.max(MIN_JITTER_SEC)
    }

    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        self.base
            .saturating_add(Duration::from_secs(rng.gen_range(0..=self.jitter_span())))
    }
}

struct InmemoryStructure {
    next_play_at: HashMap<GuildId, Instant>,
    last_channel: HashMap<GuildId, ChannelId>,
}

/// Per-guild random-play timers and the last channel the tracked member was seen in.
pub struct SchedulerState {
    timing: Timing,
    data: RwLock<InmemoryStructure>,
}

impl SchedulerState {
    pub fn new(timing: Timing) -> Self {
        Self {
            timing,
            data: RwLock::new(InmemoryStructure {
                next_play_at: HashMap::new(),
                last_channel: HashMap::new(),
            }),
        }
    }

    pub fn schedule_next(&self, guild_id: GuildId) -> Instant {
        self.schedule_next_from(guild_id, Instant::now(), &mut rand::thread_rng())
    }

    pub fn schedule_next_from<R: Rng + ?Sized>(
        &self,
        guild_id: GuildId,
        now: Instant,
        rng: &mut R,
    ) -> Instant {
        let delay = self.timing.next_delay(rng);
        let at = now
            .checked_add(delay)
            .unwrap_or_else(|| now + FAR_FUTURE);

        self.data
            .write()
            .unwrap()
            .next_play_at
            .insert(guild_id, at);

        debug!(
            "Scheduled next random sound in guild {guild_id} in {:.1} seconds.",
            delay.as_secs_f64()
        );

        at
    }

    pub fn next_play_at(&self, guild_id: GuildId) -> Option<Instant> {
        self.data
            .read()
            .unwrap()
            .next_play_at
            .get(&guild_id)
            .copied()
    }

    pub fn disarm(&self, guild_id: GuildId) {
        self.data.write().unwrap().next_play_at.remove(&guild_id);
    }

    pub fn remember_channel(&self, guild_id: GuildId, channel_id: ChannelId) {
        self.data
            .write()
            .unwrap()
            .last_channel
            .insert(guild_id, channel_id);
    }

    pub fn last_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.data
            .read()
            .unwrap()
            .last_channel
            .get(&guild_id)
            .copied()
    }
}
