//! Handlers answering the dashboard from the gateway cache

use super::{parse_id, HandlerResult, Router, RtwsError};
use crate::states::DiscordHandle;
use poise::serenity_prelude::{
	Cache, ChannelId, ChannelType, Guild, GuildChannel, GuildId, User, UserId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A user as seen by the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct UserView {
	/// Snowflake as a string
	pub(crate) id: String,
	/// Username
	pub(crate) name: String,
	/// Avatar or default avatar
	pub(crate) avatar_url: String,
	/// Username with the discriminator when there is one
	pub(crate) full_name: String,
}

impl From<&User> for UserView {
	fn from(user: &User) -> Self {
		Self {
			id: user.id.to_string(),
			name: user.name.clone(),
			avatar_url: user.face(),
			full_name: user.tag(),
		}
	}
}

/// A member of a guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct MemberView {
	/// The member user
	#[serde(flatten)]
	pub(crate) user: UserView,
	/// The guild of the member
	pub(crate) guild_id: String,
}

/// A guild channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ChannelView {
	/// Snowflake as a string
	pub(crate) id: String,
	/// Channel name
	pub(crate) name: String,
	/// `text` or `voice`
	#[serde(rename = "type")]
	pub(crate) kind: &'static str,
	/// The guild of the channel
	pub(crate) guild_id: String,
}

impl ChannelView {
	/// Channels people can talk in, categories are skipped
	fn from_channel(channel: &GuildChannel) -> Option<Self> {
		let kind = match channel.kind {
			ChannelType::Voice | ChannelType::Stage => "voice",
			ChannelType::Category => return None,
			_ => "text",
		};

		Some(Self {
			id: channel.id.to_string(),
			name: channel.name.clone(),
			kind,
			guild_id: channel.guild_id.to_string(),
		})
	}
}

/// A guild with its members and channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct GuildView {
	/// Snowflake as a string
	pub(crate) id: String,
	/// Guild name
	pub(crate) name: String,
	/// Guild icon
	pub(crate) avatar_url: Option<String>,
	/// Cached members
	pub(crate) members: Vec<UserView>,
	/// Text channels
	pub(crate) text_channels: Vec<ChannelView>,
	/// Voice and stage channels
	pub(crate) voice_channels: Vec<ChannelView>,
	/// Text channels then voice channels
	pub(crate) channels: Vec<ChannelView>,
}

impl From<&Guild> for GuildView {
	fn from(guild: &Guild) -> Self {
		let mut channels = guild
			.channels
			.values()
			.filter_map(ChannelView::from_channel)
			.collect::<Vec<_>>();
		channels.sort_by(|a, b| a.kind.cmp(b.kind).then_with(|| a.name.cmp(&b.name)));

		let (voice_channels, text_channels): (Vec<_>, Vec<_>) = channels
			.iter()
			.cloned()
			.partition(|channel| channel.kind == "voice");

		Self {
			id: guild.id.to_string(),
			name: guild.name.clone(),
			avatar_url: guild.icon_url(),
			members: guild
				.members
				.values()
				.map(|member| UserView::from(&member.user))
				.collect(),
			text_channels,
			voice_channels,
			channels,
		}
	}
}

/// Payload of the member and channel lookups
#[derive(Debug, Deserialize)]
struct GuildChildRequest {
	/// The guild to look in
	guild_id: Value,
	/// The member or channel id
	id: Value,
}

/// Parse the payload of a member or channel lookup
fn guild_child_request(
	event_type: &'static str,
	data: Value,
) -> Result<(GuildId, u64), RtwsError> {
	let request = serde_json::from_value::<GuildChildRequest>(data)?;

	let guild_id = parse_id(&request.guild_id).ok_or(RtwsError::MalformedPayload {
		event_type,
		reason: "`guild_id` is not a snowflake",
	})?;
	let id = parse_id(&request.id).ok_or(RtwsError::MalformedPayload {
		event_type,
		reason: "`id` is not a snowflake",
	})?;

	Ok((GuildId::new(guild_id), id))
}

/// Parse a payload made of a single id
fn single_id(event_type: &'static str, data: &Value) -> Result<u64, RtwsError> {
	parse_id(data).ok_or(RtwsError::MalformedPayload {
		event_type,
		reason: "payload is not a snowflake",
	})
}

/// Guilds a user shares with the bot
#[must_use]
pub(crate) fn guilds_of(cache: &Cache, user_id: UserId) -> Vec<GuildView> {
	cache
		.guilds()
		.into_iter()
		.filter_map(|guild_id| {
			let guild = cache.guild(guild_id)?;
			guild
				.members
				.contains_key(&user_id)
				.then(|| GuildView::from(&*guild))
		})
		.collect()
}

/// A cached user
fn user(cache: &Cache, user_id: UserId) -> Option<UserView> {
	cache.user(user_id).map(|user| UserView::from(&*user))
}

/// A cached guild
fn guild(cache: &Cache, guild_id: GuildId) -> Option<GuildView> {
	cache.guild(guild_id).map(|guild| GuildView::from(&*guild))
}

/// A cached member
fn member(cache: &Cache, guild_id: GuildId, user_id: UserId) -> Option<MemberView> {
	let guild = cache.guild(guild_id)?;
	let member = guild.members.get(&user_id)?;

	Some(MemberView {
		user: UserView::from(&member.user),
		guild_id: guild_id.to_string(),
	})
}

/// A cached guild channel
fn channel(cache: &Cache, guild_id: GuildId, channel_id: ChannelId) -> Option<ChannelView> {
	let guild = cache.guild(guild_id)?;
	guild
		.channels
		.get(&channel_id)
		.and_then(ChannelView::from_channel)
}

/// Serialize a lookup, `null` when nothing was found
fn answer<T: Serialize>(found: Option<T>) -> HandlerResult {
	Ok(Some(serde_json::to_value(found)?))
}

/// Every handler the bot registers on the bridge
pub(crate) fn router() -> Router<DiscordHandle> {
	Router::default()
		.on("get_user", |discord: DiscordHandle, data| async move {
			let user_id = UserId::new(single_id("get_user", &data)?);
			answer(user(&discord.cache, user_id))
		})
		.on("get_guild", |discord: DiscordHandle, data| async move {
			let guild_id = GuildId::new(single_id("get_guild", &data)?);
			answer(guild(&discord.cache, guild_id))
		})
		.on("get_guilds", |discord: DiscordHandle, data| async move {
			let user_id = UserId::new(single_id("get_guilds", &data)?);
			Ok(Some(serde_json::to_value(guilds_of(&discord.cache, user_id))?))
		})
		.on("get_member", |discord: DiscordHandle, data| async move {
			let (guild_id, user_id) = guild_child_request("get_member", data)?;
			answer(member(&discord.cache, guild_id, UserId::new(user_id)))
		})
		.on("get_channel", |discord: DiscordHandle, data| async move {
			let (guild_id, channel_id) = guild_child_request("get_channel", data)?;
			answer(channel(&discord.cache, guild_id, ChannelId::new(channel_id)))
		})
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn child_requests_accept_string_ids() {
		let (guild_id, id) =
			guild_child_request("get_member", json!({ "guild_id": "10", "id": 20 })).unwrap();

		assert_eq!(guild_id, GuildId::new(10));
		assert_eq!(id, 20);
	}

	#[test]
	fn child_requests_reject_bad_ids() {
		assert!(matches!(
			guild_child_request("get_channel", json!({ "guild_id": "abc", "id": 1 })),
			Err(RtwsError::MalformedPayload { event_type: "get_channel", .. })
		));
		assert!(matches!(
			guild_child_request("get_channel", json!({ "guild_id": 1 })),
			Err(RtwsError::Json(_))
		));
		assert!(single_id("get_user", &json!(null)).is_err());
	}

	#[test]
	fn lookups_are_registered() {
		let router = router();

		for event in ["get_user", "get_guild", "get_guilds", "get_member", "get_channel"] {
			assert!(router.handles(event), "{event} is not handled");
		}
	}

	#[test]
	fn missing_lookups_answer_null() {
		assert_eq!(answer::<UserView>(None).unwrap(), Some(Value::Null));
	}
}
