use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serenity::async_trait;
use serenity::client::{Context, EventHandler};
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::model::voice::VoiceState;
use tracing::{debug, info};

use crate::config::Config;
use crate::directory::{voice_transition, SerenityDirectory};
use crate::playback::VoiceTransport;
use crate::presence::Companion;
use crate::random_loop;
use crate::role::RoleMatcher;

pub struct Handler {
    config: Arc<Config>,
    transport: Arc<dyn VoiceTransport>,
    companion: OnceCell<Arc<Companion>>,
    loop_started: AtomicBool,
}

impl Handler {
    pub fn new(config: Arc<Config>, transport: Arc<dyn VoiceTransport>) -> Self {
        Self {
            config,
            transport,
            companion: OnceCell::new(),
            loop_started: AtomicBool::new(false),
        }
    }

    fn companion(&self, ctx: &Context) -> Arc<Companion> {
        let companion = self.companion.get_or_init(|| {
            let directory = SerenityDirectory::new(
                Arc::clone(&ctx.cache),
                Arc::clone(&ctx.http),
                RoleMatcher::new(&self.config.role_name),
            );

            Arc::new(Companion::new(
                Arc::clone(&self.config),
                Arc::clone(&self.transport),
                Arc::new(directory),
            ))
        });

        Arc::clone(companion)
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);
        self.companion(&ctx);
    }

    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        info!("Cache is ready for {} guild(s)", guilds.len());

        let companion = self.companion(&ctx);
        companion.rejoin_on_startup().await;

        if !self.loop_started.swap(true, Ordering::SeqCst) {
            tokio::spawn(random_loop::run(companion));
        }
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            debug!("Non-guild voice state update received. Ignoring.");
            return;
        };

        let bot = ctx.cache.current_user().id;

        let transition = {
            let Some(guild) = ctx.cache.guild(guild_id) else {
                debug!("Guild {guild_id} is not cached yet. Ignoring.");
                return;
            };

            voice_transition(&guild, bot, old.as_ref(), &new)
        };

        let Some(transition) = transition else {
            return;
        };

        self.companion(&ctx).on_voice_state(transition).await;
    }
}
