//! Relay of messages between the channels of a global chat

use crate::{
	cacher::{Cacher, CacherPool},
	constants::{emojis, globalchat, WEBHOOK_NAME},
	database::{models::GlobalChat, DatabasePooledConnection},
	states::{Data, InteractionResult},
};
use poise::serenity_prelude::{
	self as serenity, ChannelId, ChannelType, CreateAllowedMentions, CreateEmbed,
	CreateEmbedAuthor, CreateEmbedFooter, CreateMessage, CreateWebhook, ExecuteWebhook, GuildId,
	Message, ReactionType, UserId, Webhook,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, sync::Arc};
use tokio::time::Instant;

/// What is remembered about the last message of an author
#[derive(Debug, Clone)]
pub(crate) struct SpamRecord {
	/// Content of the previous message
	last: String,
	/// Similar messages in a row
	count: u32,
	/// The author is ignored until then
	muted_until: Option<Instant>,
}

impl SpamRecord {
	/// Record of a first message
	fn new(content: &str) -> Self {
		Self {
			last: content.to_owned(),
			count: 0,
			muted_until: None,
		}
	}

	/// Account a new message, returns whether it may be relayed
	fn check(&mut self, content: &str, now: Instant) -> bool {
		if matches!(self.muted_until, Some(until) if until >= now) {
			return false;
		}

		if is_similar(&self.last, content) {
			self.count += 1;
			if self.count > globalchat::SPAM_THRESHOLD {
				self.muted_until = Some(now + globalchat::SPAM_MUTE);
			}
		} else if self.count > globalchat::SPAM_THRESHOLD {
			self.count = 0;
		}

		content.clone_into(&mut self.last);
		true
	}
}

/// Whether two messages look like a copy of each other
///
/// They are similar when a window of the new message is found in the previous one.
/// The window is five characters long, or the whole previous message if shorter.
/// The window ending the new message is not compared.
pub(crate) fn is_similar(before: &str, after: &str) -> bool {
	let before_len = before.chars().count();
	if before_len == 0 {
		return false;
	}

	let window = before_len.min(globalchat::SIMILARITY_WINDOW);
	let after = after.chars().collect::<Vec<_>>();
	let compared = after.len().saturating_sub(window);

	after
		.windows(window)
		.take(compared)
		.any(|slice| before.contains(&slice.iter().collect::<String>()))
}

/// Whether a message advertises another server
pub(crate) fn contains_invite(content: &str) -> bool {
	globalchat::BLOCKED_WORDS
		.iter()
		.any(|word| content.contains(word))
}

/// Username shown by the webhook relaying a message
pub(crate) fn webhook_username(
	name: &str,
	user_id: impl fmt::Display,
	message_id: impl fmt::Display,
) -> String {
	format!("{name} {user_id} (mID:{message_id})")
		.chars()
		.take(globalchat::WEBHOOK_USERNAME_LENGTH)
		.collect()
}

/// Caches used by the relay
#[derive(Debug)]
pub(crate) struct GlobalChatState {
	/// Spam guard records per author
	spam: Arc<Cacher<UserId, SpamRecord>>,
	/// Banned users per guild
	bans: Arc<Cacher<GuildId, Arc<HashSet<UserId>>>>,
	/// Webhook owned by the bot per channel
	webhooks: Arc<Cacher<ChannelId, Webhook>>,
}

impl GlobalChatState {
	/// Acquire the caches from the pool
	pub(crate) fn new(cachers: &CacherPool) -> Self {
		Self {
			spam: cachers.acquire(globalchat::SPAM_MEMORY),
			bans: cachers.acquire(globalchat::BAN_CACHE_LIFETIME),
			webhooks: cachers.acquire(globalchat::WEBHOOK_CACHE_LIFETIME),
		}
	}

	/// Run the spam guard for a message of `author`
	pub(crate) fn admit(&self, author: UserId, content: &str, now: Instant) -> bool {
		let mut admitted = true;

		let known = self.spam.update(&author, |record| {
			admitted = record.check(content, now);
		});

		if !known {
			self.spam.set(author, SpamRecord::new(content));
		}

		admitted
	}

	/// Forget the ban list of a guild
	pub(crate) fn forget_bans(&self, guild_id: GuildId) {
		self.bans.remove(&guild_id);
	}
}

/// A message ready to be sent to every channel of a global chat
#[derive(Debug, Clone)]
pub(crate) struct RelayMessage {
	/// Username of the webhook
	pub(crate) username: String,
	/// Avatar of the webhook
	pub(crate) avatar_url: Option<String>,
	/// Sanitized content, followed by the attachment links
	pub(crate) content: String,
	/// Reply quote and stickers
	pub(crate) embeds: Vec<CreateEmbed>,
	/// Author of the message, used to honour the bans of every guild
	pub(crate) author: Option<UserId>,
}

impl RelayMessage {
	/// Build the relayed version of a guild message
	pub(crate) fn from_message(discord: &serenity::Context, message: &Message) -> Self {
		let mut embeds = Vec::new();

		if let Some(original) = &message.referenced_message {
			embeds.push(
				CreateEmbed::new()
					.description(original.content_safe(&discord.cache))
					.author(
						CreateEmbedAuthor::new(original.author.name.clone())
							.icon_url(original.author.face()),
					),
			);
		}

		for sticker in &message.sticker_items {
			if let Some(url) = sticker.image_url() {
				embeds.push(
					CreateEmbed::new()
						.image(url)
						.footer(CreateEmbedFooter::new(sticker.name.clone())),
				);
			}
		}

		let mut content = message.content_safe(&discord.cache);
		for attachment in &message.attachments {
			if !content.is_empty() {
				content.push('\n');
			}
			content.push_str(&attachment.url);
		}

		Self {
			username: webhook_username(&message.author.name, message.author.id, message.id),
			avatar_url: Some(message.author.face()),
			content,
			embeds,
			author: Some(message.author.id),
		}
	}
}

/// A message exchanged with other bots through the share channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SharePacket {
	/// `message` for the main chat, `frt-message-<name>` otherwise
	#[serde(rename = "type")]
	pub(crate) kind: String,
	/// Author id
	pub(crate) user_id: String,
	/// Author name
	pub(crate) user_name: String,
	/// Author avatar url
	#[serde(default)]
	pub(crate) user_avatar: Option<String>,
	/// Message content
	#[serde(default)]
	pub(crate) content: String,
	/// Source message id
	pub(crate) message_id: String,
	/// Source guild id
	pub(crate) guild_id: String,
	/// Source channel id
	pub(crate) channel_id: String,
	/// Links to the attachments
	#[serde(default)]
	pub(crate) attachments_url: Vec<String>,
	/// Id of the message this one replies to
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub(crate) reference: Option<String>,
}

impl SharePacket {
	/// Packet type announcing a message of the given global chat
	pub(crate) fn kind_for(name: &str) -> String {
		if name == globalchat::DEFAULT_NAME {
			"message".into()
		} else {
			format!("frt-message-{name}")
		}
	}

	/// The global chat a packet is meant for, `None` for non message packets
	pub(crate) fn chat_name(&self) -> Option<&str> {
		if !self.kind.contains("message") {
			return None;
		}

		Some(
			self.kind
				.split_once("-message-")
				.map_or(globalchat::DEFAULT_NAME, |(_, name)| name),
		)
	}

	/// Describe a relayed guild message
	pub(crate) fn from_message(name: &str, message: &Message, content: String) -> Self {
		Self {
			kind: Self::kind_for(name),
			user_id: message.author.id.to_string(),
			user_name: message.author.name.clone(),
			user_avatar: Some(message.author.face()),
			content,
			message_id: message.id.to_string(),
			guild_id: message.guild_id.map(|id| id.to_string()).unwrap_or_default(),
			channel_id: message.channel_id.to_string(),
			attachments_url: message
				.attachments
				.iter()
				.map(|attachment| attachment.url.clone())
				.collect(),
			reference: message
				.referenced_message
				.as_ref()
				.map(|reference| reference.id.to_string()),
		}
	}

	/// The relayed version of a packet
	pub(crate) fn to_relay(&self) -> RelayMessage {
		let mut content = self.content.clone();
		for url in &self.attachments_url {
			if !content.is_empty() {
				content.push('\n');
			}
			content.push_str(url);
		}

		RelayMessage {
			username: webhook_username(&self.user_name, &self.user_id, &self.message_id),
			avatar_url: self.user_avatar.clone(),
			content,
			embeds: Vec::new(),
			author: self.user_id.parse::<u64>().ok().filter(|id| *id != 0).map(UserId::new),
		}
	}
}

/// Reaction built from an unicode emoji
pub(crate) fn unicode_reaction(emoji: &str) -> ReactionType {
	ReactionType::Unicode(emoji.to_owned())
}

/// Whether a channel takes part in a global chat according to its topic
fn is_connected_channel(channel: &serenity::GuildChannel) -> bool {
	!matches!(
		channel.kind,
		ChannelType::PublicThread | ChannelType::PrivateThread | ChannelType::NewsThread
	) && channel
		.topic
		.as_deref()
		.is_some_and(|topic| topic.contains(globalchat::TOPIC_MARKER))
}

/// Relay a guild message if it was sent in a global chat
#[tracing::instrument(skip_all, fields(message_id = %message.id, channel_id = %message.channel_id))]
pub(crate) async fn on_message(
	discord: &serenity::Context,
	data: &Data,
	message: &Message,
) -> InteractionResult {
	if data.config.globalchat_share_channel == Some(message.channel_id) {
		if message.author.id != discord.cache.current_user().id {
			return on_share_packet(discord, data, message).await;
		}
		return Ok(());
	}

	if message.guild_id.is_none() || message.author.bot {
		return Ok(());
	}

	let Some(channel) = message.channel(discord).await?.guild() else {
		return Ok(());
	};
	if !is_connected_channel(&channel) {
		return Ok(());
	}

	if contains_invite(&message.content) {
		message
			.react(discord, unicode_reaction(emojis::CROSS))
			.await?;
		return Ok(());
	}

	let mut connection = data.database.get().await?;
	let Some(chat) = GlobalChat::from_channel(&mut connection, message.channel_id).await? else {
		return Ok(());
	};

	let relay = RelayMessage::from_message(discord, message);

	if !data
		.globalchat
		.admit(message.author.id, &relay.content, Instant::now())
	{
		message
			.react(discord, unicode_reaction(emojis::CROSS))
			.await?;
		return Ok(());
	}

	if let Some(share) = data.config.globalchat_share_channel {
		let packet = SharePacket::from_message(
			&chat.name,
			message,
			message.content_safe(&discord.cache),
		);

		if let Err(error) = share
			.send_message(discord, CreateMessage::new().content(serde_json::to_string(&packet)?))
			.await
		{
			tracing::warn!(error = ?error, "could not post to the share channel");
		}
	}

	relay_to(
		discord,
		data,
		&mut connection,
		&chat.name,
		&relay,
		Some(message.channel_id),
	)
	.await?;

	message
		.react(discord, unicode_reaction(emojis::CHECK))
		.await?;

	Ok(())
}

/// Relay a message received from another bot
async fn on_share_packet(
	discord: &serenity::Context,
	data: &Data,
	message: &Message,
) -> InteractionResult {
	let packet = match serde_json::from_str::<SharePacket>(&message.content) {
		Ok(packet) => packet,
		Err(error) => {
			tracing::trace!(error = ?error, "ignored a share channel message");
			return Ok(());
		}
	};

	let Some(name) = packet.chat_name() else {
		return Ok(());
	};

	let relay = packet.to_relay();
	if let Some(author) = relay.author {
		if !data.globalchat.admit(author, &relay.content, Instant::now()) {
			message
				.react(discord, unicode_reaction(emojis::CROSS))
				.await?;
			return Ok(());
		}
	}

	let mut connection = data.database.get().await?;
	relay_to(discord, data, &mut connection, name, &relay, None).await?;

	message
		.react(discord, unicode_reaction(emojis::CHECK))
		.await?;

	Ok(())
}

/// Send a message to every channel of a global chat but `source`
pub(crate) async fn relay_to(
	discord: &serenity::Context,
	data: &Data,
	connection: &mut DatabasePooledConnection,
	name: &str,
	relay: &RelayMessage,
	source: Option<ChannelId>,
) -> InteractionResult {
	let channels = GlobalChat::all_with_name(connection, name).await?;

	for chat in channels {
		let channel_id = chat.channel();
		if Some(channel_id) == source {
			continue;
		}

		if let Some(author) = relay.author {
			let bans = banned_users(discord, data, GuildId::new(chat.guild_id)).await;
			if bans.contains(&author) {
				continue;
			}
		}

		if let Err(error) = send_through_webhook(discord, data, channel_id, relay).await {
			data.globalchat.webhooks.remove(&channel_id);
			tracing::warn!(
				error = ?error,
				channel_id = channel_id.get(),
				"could not relay a global chat message",
			);
		}
	}

	Ok(())
}

/// Ban list of a guild, cached
async fn banned_users(
	discord: &serenity::Context,
	data: &Data,
	guild_id: GuildId,
) -> Arc<HashSet<UserId>> {
	if let Some(bans) = data.globalchat.bans.get(&guild_id) {
		return bans;
	}

	let bans = match guild_id.bans(discord, None, None).await {
		Ok(bans) => bans.into_iter().map(|ban| ban.user.id).collect(),
		Err(error) => {
			tracing::debug!(error = ?error, guild_id = guild_id.get(), "could not fetch bans");
			HashSet::new()
		}
	};

	let bans = Arc::new(bans);
	data.globalchat.bans.set(guild_id, Arc::clone(&bans));
	bans
}

/// Find or create the webhook of the bot in a channel
pub(crate) async fn channel_webhook(
	discord: &serenity::Context,
	data: &Data,
	channel_id: ChannelId,
) -> serenity::Result<Webhook> {
	if let Some(webhook) = data.globalchat.webhooks.get(&channel_id) {
		return Ok(webhook);
	}

	let existing = channel_id
		.webhooks(discord)
		.await?
		.into_iter()
		.find(|webhook| {
			webhook.name.as_deref() == Some(WEBHOOK_NAME) && webhook.token.is_some()
		});

	let webhook = match existing {
		Some(webhook) => webhook,
		None => {
			channel_id
				.create_webhook(discord, CreateWebhook::new(WEBHOOK_NAME))
				.await?
		}
	};

	data.globalchat.webhooks.set(channel_id, webhook.clone());
	Ok(webhook)
}

/// Post a relayed message in one channel
async fn send_through_webhook(
	discord: &serenity::Context,
	data: &Data,
	channel_id: ChannelId,
	relay: &RelayMessage,
) -> serenity::Result<()> {
	let webhook = channel_webhook(discord, data, channel_id).await?;

	let mut builder = ExecuteWebhook::new()
		.username(relay.username.clone())
		.content(relay.content.clone())
		.embeds(relay.embeds.clone())
		.allowed_mentions(CreateAllowedMentions::new());
	if let Some(avatar_url) = &relay.avatar_url {
		builder = builder.avatar_url(avatar_url.clone());
	}

	webhook.execute(discord, false, builder).await?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::time::{advance, Duration};

	#[test]
	fn similar_messages_share_a_window() {
		assert!(is_similar("hello world", "world peace"));
		assert!(is_similar("hi", "oh hi there"));
		assert!(!is_similar("hello world", "goodbye"));
		assert!(!is_similar("", "anything"));
		assert!(!is_similar("hello", "hel"));
	}

	#[test]
	fn the_last_window_is_not_compared() {
		assert!(!is_similar("world", "hello world"));
		assert!(is_similar("world", "hello world!"));
		assert!(!is_similar("hello", "hello"));
	}

	#[test]
	fn invites_are_detected() {
		assert!(contains_invite("join https://discord.gg/abc"));
		assert!(contains_invite("discord.com/invite/xyz"));
		assert!(!contains_invite("discord is nice"));
	}

	#[test]
	fn webhook_username_carries_ids() {
		assert_eq!(webhook_username("tasuren", 1, 2), "tasuren 1 (mID:2)");
		assert_eq!(
			webhook_username(&"a".repeat(100), 1, 2).chars().count(),
			globalchat::WEBHOOK_USERNAME_LENGTH
		);
	}

	#[tokio::test(start_paused = true)]
	async fn spammers_are_muted_then_forgiven() {
		let state = GlobalChatState::new(&CacherPool::default());
		let author = UserId::new(42);

		assert!(state.admit(author, "buy my stuff", Instant::now()));
		for _ in 0..globalchat::SPAM_THRESHOLD {
			assert!(state.admit(author, "buy my stuff", Instant::now()));
		}

		// The fifth similar message in a row triggers the mute
		assert!(state.admit(author, "buy my stuff", Instant::now()));
		assert!(!state.admit(author, "something else", Instant::now()));

		advance(globalchat::SPAM_MUTE + Duration::from_secs(1)).await;

		assert!(state.admit(author, "a different topic", Instant::now()));
		assert!(state.admit(author, "nothing in common", Instant::now()));
	}

	#[test]
	fn share_packets_name_their_chat() {
		let packet = SharePacket {
			kind: SharePacket::kind_for("main"),
			user_id: "1".into(),
			user_name: "someone".into(),
			user_avatar: None,
			content: "hi".into(),
			message_id: "2".into(),
			guild_id: "3".into(),
			channel_id: "4".into(),
			attachments_url: vec!["https://cdn/a.png".into()],
			reference: None,
		};
		assert_eq!(packet.chat_name(), Some("main"));

		let custom = SharePacket {
			kind: SharePacket::kind_for("anime"),
			..packet.clone()
		};
		assert_eq!(custom.kind, "frt-message-anime");
		assert_eq!(custom.chat_name(), Some("anime"));

		let other = SharePacket {
			kind: "edit".into(),
			..packet.clone()
		};
		assert_eq!(other.chat_name(), None);

		let relay = packet.to_relay();
		assert_eq!(relay.username, "someone 1 (mID:2)");
		assert_eq!(relay.content, "hi\nhttps://cdn/a.png");
		assert_eq!(relay.author, Some(UserId::new(1)));
	}

	#[test]
	fn share_packets_use_camel_case() {
		let packet: SharePacket = serde_json::from_str(
			r#"{"type":"message","userId":"1","userName":"n","userAvatar":"a","content":"c","messageId":"2","guildId":"3","channelId":"4","attachmentsUrl":[]}"#,
		)
		.unwrap();
		assert_eq!(packet.reference, None);

		let json = serde_json::to_value(&packet).unwrap();
		assert!(json.get("reference").is_none());
		assert_eq!(json["userName"], "n");
	}
}
