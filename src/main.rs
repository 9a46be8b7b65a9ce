#![warn(clippy::pedantic)]

mod config;
mod directory;
#[cfg(test)]
mod fake;
mod listener;
mod playback;
mod presence;
mod random_loop;
mod role;
mod schedule;
mod songbird_transport;
mod sound_library;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use serenity::{client::Client, model::prelude::GatewayIntents};
use songbird::{SerenityInit, Songbird};
use tracing::{error, info};

use crate::config::Config;
use crate::listener::serenity::Handler;
use crate::songbird_transport::SongbirdTransport;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Arc::new(Config::from_env()?);

    let token = config
        .token()
        .context("Please set DISCORD_TOKEN in environment")?
        .to_string();

    info!(
        "Tracking role '{}', random sounds from {}, every {} min + up to {} s",
        config.role_name.trim(),
        config.random_sounds_dir.display(),
        config.base_interval_min,
        config.jitter_sec,
    );

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MEMBERS;

    let manager = Songbird::serenity();
    let transport = Arc::new(SongbirdTransport::new(
        Arc::clone(&manager),
        config.ffmpeg_path.clone(),
    ));

    let mut client = Client::builder(&token, intents)
        .event_handler(Handler::new(Arc::clone(&config), transport))
        .register_songbird_with(manager)
        .await
        .context("Failed to create client")?;

    tokio::select! {
        result = client.start() => {
            if let Err(why) = result {
                error!("Client ended: {why:?}");
                return Err(why.into());
            }
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to wait Ctrl+C")?;
            info!("Received Ctrl+C, shutting down.");
        }
    }

    Ok(())
}
