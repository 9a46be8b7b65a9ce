use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use serenity::async_trait;
use serenity::cache::Cache;
use serenity::http::Http;
use serenity::model::channel::ChannelType;
use serenity::model::guild::Guild;
use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};
use serenity::model::voice::VoiceState;

use crate::presence::{GuildDirectory, VoiceTransition};
use crate::role::RoleMatcher;

/// Names of `roles` that exist in the guild's role table.
pub fn role_names<'a>(guild: &'a Guild, roles: &'a [RoleId]) -> impl Iterator<Item = &'a str> {
    roles
        .iter()
        .filter_map(|id| guild.roles.get(id))
        .map(|role| role.name.as_str())
}

/// Maps a voice-state update to a presence transition. The bot's own updates yield `None`.
///
/// The member snapshot carried by the update wins over the cached member.
pub fn voice_transition(
    guild: &Guild,
    bot: UserId,
    old: Option<&VoiceState>,
    new: &VoiceState,
) -> Option<VoiceTransition> {
    if new.user_id == bot {
        return None;
    }

    let role_names = new
        .member
        .as_ref()
        .or_else(|| guild.members.get(&new.user_id))
        .map(|m| role_names(guild, &m.roles).map(str::to_owned).collect())
        .unwrap_or_default();

    Some(VoiceTransition {
        guild_id: guild.id,
        role_names,
        before: old.and_then(|o| o.channel_id),
        after: new.channel_id,
    })
}

/// Voice channel of the first tracked member in `guild`, never the bot itself.
pub fn tracked_channel(guild: &Guild, bot: UserId, roles: &RoleMatcher) -> Option<ChannelId> {
    guild
        .voice_states
        .values()
        .filter(|vs| vs.user_id != bot)
        .find_map(|vs| {
            let channel_id = vs.channel_id?;
            let member = guild
                .members
                .get(&vs.user_id)
                .or(vs.member.as_ref())?;

            roles
                .is_tracked(role_names(guild, &member.roles))
                .then_some(channel_id)
        })
}

pub fn is_voice_kind(kind: ChannelType) -> bool {
    kind == ChannelType::Voice
}

pub fn is_text_kind(kind: ChannelType) -> bool {
    matches!(kind, ChannelType::Text | ChannelType::News)
}

/// Guild rosters as seen through the serenity cache.
pub struct SerenityDirectory {
    cache: Arc<Cache>,
    http: Arc<Http>,
    roles: RoleMatcher,
}

impl SerenityDirectory {
    pub fn new(cache: Arc<Cache>, http: Arc<Http>, roles: RoleMatcher) -> Self {
        Self { cache, http, roles }
    }

    fn channel_kind(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<ChannelType> {
        let guild = self.cache.guild(guild_id)?;
        guild.channels.get(&channel_id).map(|c| c.kind)
    }
}

#[async_trait]
impl GuildDirectory for SerenityDirectory {
    fn guilds(&self) -> Vec<GuildId> {
        self.cache.guilds()
    }

    fn tracked_voice_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let bot = self.cache.current_user().id;
        let guild = self.cache.guild(guild_id)?;

        tracked_channel(&guild, bot, &self.roles)
    }

    fn is_voice_channel(&self, guild_id: GuildId, channel_id: ChannelId) -> bool {
        self.channel_kind(guild_id, channel_id)
            .is_some_and(is_voice_kind)
    }

    async fn post_notice(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        content: &str,
    ) -> Result<()> {
        if !self
            .channel_kind(guild_id, channel_id)
            .is_some_and(is_text_kind)
        {
            bail!("{channel_id} is not a text channel in guild {guild_id}");
        }

        channel_id
            .say(self.http.as_ref(), content)
            .await
            .context("Failed to send message")?;

        Ok(())
    }
}
