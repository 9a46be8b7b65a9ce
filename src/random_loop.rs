use std::sync::Arc;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::presence::Companion;

/// Ticks forever. Each tick runs in its own task so that a panic only loses that tick.
pub async fn run(companion: Arc<Companion>) {
    let mut interval = tokio::time::interval(companion.config.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Random sound loop started, ticking every {:?}",
        interval.period()
    );

    loop {
        interval.tick().await;

        let this = Arc::clone(&companion);
        if let Err(why) = tokio::spawn(async move { this.tick(Instant::now()).await }).await {
            error!("Random sound loop tick failed: {why:?}");
        }
    }
}

impl Companion {
    pub async fn tick(&self, now: Instant) {
        for guild_id in self.directory.guilds() {
            let Some(channel_id) = self.directory.tracked_voice_channel(guild_id) else {
                continue;
            };

            self.schedule.remember_channel(guild_id, channel_id);
            self.sessions.connect(guild_id, channel_id).await;

            let Some(next) = self.schedule.next_play_at(guild_id) else {
                debug!("No timer set for guild {guild_id}, scheduling first random sound");
                self.schedule.schedule_next(guild_id);
                continue;
            };

            if now < next {
                continue;
            }

            if let Some(pick) = self.sounds.pick_random() {
                info!("Playing random sound in guild {guild_id}: {}", pick.display());
                self.sessions.play(guild_id, channel_id, &pick).await;
            } else {
                warn!("No random sounds available to play in guild {guild_id}");
            }

            self.schedule.schedule_next(guild_id);
        }
    }
}
