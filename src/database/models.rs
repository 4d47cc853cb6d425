//! Rows of every table and the data managers operating on them

use super::{
	prelude::*,
	schema::{
		afk_users, captchas, delay_deletes, delay_lotteries, delay_roles, global_chats,
		global_levels, level_guilds, level_members, level_rewards, short_urls,
	},
	DatabasePooledConnection,
};
use crate::constants::limits;
use diesel::{dsl, QueryResult};
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};

/// A channel connected to a global chat
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = global_chats)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub(crate) struct GlobalChat {
	/// Row id
	pub(crate) id: i32,
	/// Name of the global chat
	pub(crate) name: String,
	/// Guild of the connected channel
	pub(crate) guild_id: u64,
	/// The connected channel
	pub(crate) channel_id: u64,
	/// The user who created the global chat
	pub(crate) author_id: u64,
}

/// See [`GlobalChat`]
#[derive(Debug, Insertable)]
#[diesel(table_name = global_chats)]
pub(crate) struct NewGlobalChat<'a> {
	/// See [`GlobalChat::name`]
	pub(crate) name: &'a str,
	/// See [`GlobalChat::guild_id`]
	pub(crate) guild_id: u64,
	/// See [`GlobalChat::channel_id`]
	pub(crate) channel_id: u64,
	/// See [`GlobalChat::author_id`]
	pub(crate) author_id: u64,
}

impl GlobalChat {
	/// The global chat the channel is connected to, if any
	pub(crate) async fn from_channel(
		connection: &mut DatabasePooledConnection,
		channel_id: ChannelId,
	) -> QueryResult<Option<Self>> {
		global_chats::table
			.filter(global_chats::channel_id.eq(channel_id.get()))
			.first::<Self>(connection)
			.await
			.optional()
	}

	/// Every channel connected to a global chat
	pub(crate) async fn all_with_name(
		connection: &mut DatabasePooledConnection,
		name: &str,
	) -> QueryResult<Vec<Self>> {
		global_chats::table
			.filter(global_chats::name.eq(name))
			.order(global_chats::id.asc())
			.load::<Self>(connection)
			.await
	}

	/// Whether a global chat with this name exists
	pub(crate) async fn exists(
		connection: &mut DatabasePooledConnection,
		name: &str,
	) -> QueryResult<bool> {
		dsl::select(dsl::exists(
			global_chats::table.filter(global_chats::name.eq(name)),
		))
		.get_result(connection)
		.await
	}

	/// Disconnect every channel of a global chat
	pub(crate) async fn delete_named(
		connection: &mut DatabasePooledConnection,
		name: &str,
	) -> QueryResult<usize> {
		diesel::delete(global_chats::table.filter(global_chats::name.eq(name)))
			.execute(connection)
			.await
	}

	/// Disconnect one channel
	pub(crate) async fn delete_channel(
		connection: &mut DatabasePooledConnection,
		channel_id: ChannelId,
	) -> QueryResult<usize> {
		diesel::delete(global_chats::table.filter(global_chats::channel_id.eq(channel_id.get())))
			.execute(connection)
			.await
	}

	/// Typed channel id
	#[must_use]
	pub(crate) const fn channel(&self) -> ChannelId {
		ChannelId::new(self.channel_id)
	}
}

impl NewGlobalChat<'_> {
	/// Store the connection
	pub(crate) async fn insert(&self, connection: &mut DatabasePooledConnection) -> QueryResult<usize> {
		diesel::insert_into(global_chats::table)
			.values(self)
			.execute(connection)
			.await
	}
}

/// A role given to members some time after they joined
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = delay_roles)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub(crate) struct DelayRole {
	/// The role to give
	pub(crate) role_id: u64,
	/// Guild of the role
	pub(crate) guild_id: u64,
	/// Seconds to wait after the member joined
	pub(crate) delay: u64,
}

impl DelayRole {
	/// Settings of a guild
	pub(crate) async fn all_from_guild(
		connection: &mut DatabasePooledConnection,
		guild_id: GuildId,
	) -> QueryResult<Vec<Self>> {
		delay_roles::table
			.filter(delay_roles::guild_id.eq(guild_id.get()))
			.load::<Self>(connection)
			.await
	}

	/// Settings of every guild
	pub(crate) async fn all(connection: &mut DatabasePooledConnection) -> QueryResult<Vec<Self>> {
		delay_roles::table.load::<Self>(connection).await
	}

	/// Number of settings in a guild
	pub(crate) async fn count_in_guild(
		connection: &mut DatabasePooledConnection,
		guild_id: GuildId,
	) -> QueryResult<i64> {
		delay_roles::table
			.filter(delay_roles::guild_id.eq(guild_id.get()))
			.count()
			.get_result(connection)
			.await
	}

	/// Insert or replace the setting of this role
	pub(crate) async fn upsert(&self, connection: &mut DatabasePooledConnection) -> QueryResult<usize> {
		diesel::replace_into(delay_roles::table)
			.values(self)
			.execute(connection)
			.await
	}

	/// Remove the setting of a role
	pub(crate) async fn delete(
		connection: &mut DatabasePooledConnection,
		role_id: RoleId,
	) -> QueryResult<usize> {
		diesel::delete(delay_roles::table.filter(delay_roles::role_id.eq(role_id.get())))
			.execute(connection)
			.await
	}

	/// Remove every setting of a guild
	pub(crate) async fn delete_guild(
		connection: &mut DatabasePooledConnection,
		guild_id: GuildId,
	) -> QueryResult<usize> {
		diesel::delete(delay_roles::table.filter(delay_roles::guild_id.eq(guild_id.get())))
			.execute(connection)
			.await
	}
}

/// A message scheduled for deletion
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = delay_deletes)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub(crate) struct DelayDelete {
	/// Row id
	pub(crate) id: i32,
	/// Channel of the message
	pub(crate) channel_id: u64,
	/// The message to delete
	pub(crate) message_id: u64,
	/// Unix timestamp after which the message is deleted
	pub(crate) delete_at: i64,
}

/// See [`DelayDelete`]
#[derive(Debug, Insertable)]
#[diesel(table_name = delay_deletes)]
pub(crate) struct NewDelayDelete {
	/// See [`DelayDelete::channel_id`]
	pub(crate) channel_id: u64,
	/// See [`DelayDelete::message_id`]
	pub(crate) message_id: u64,
	/// See [`DelayDelete::delete_at`]
	pub(crate) delete_at: i64,
}

impl DelayDelete {
	/// Deletions whose time has come
	pub(crate) async fn due(
		connection: &mut DatabasePooledConnection,
		now: i64,
	) -> QueryResult<Vec<Self>> {
		delay_deletes::table
			.filter(delay_deletes::delete_at.le(now))
			.load::<Self>(connection)
			.await
	}

	/// Forget a scheduled deletion
	pub(crate) async fn delete(
		connection: &mut DatabasePooledConnection,
		id: i32,
	) -> QueryResult<usize> {
		diesel::delete(delay_deletes::table.filter(delay_deletes::id.eq(id)))
			.execute(connection)
			.await
	}

	/// Typed ids of the message
	#[must_use]
	pub(crate) const fn message(&self) -> (ChannelId, MessageId) {
		(ChannelId::new(self.channel_id), MessageId::new(self.message_id))
	}
}

impl NewDelayDelete {
	/// Store the deletion, evicting the oldest one of the channel when it is full
	///
	/// Returns `true` when a deletion was evicted
	pub(crate) async fn schedule(&self, connection: &mut DatabasePooledConnection) -> QueryResult<bool> {
		let scheduled: i64 = delay_deletes::table
			.filter(delay_deletes::channel_id.eq(self.channel_id))
			.count()
			.get_result(connection)
			.await?;

		let evicted = if scheduled >= limits::MAX_DELAY_DELETES_PER_CHANNEL {
			let oldest = delay_deletes::table
				.filter(delay_deletes::channel_id.eq(self.channel_id))
				.order(delay_deletes::message_id.asc())
				.select(delay_deletes::id)
				.first::<i32>(connection)
				.await?;

			DelayDelete::delete(connection, oldest).await?;
			true
		} else {
			false
		};

		diesel::insert_into(delay_deletes::table)
			.values(self)
			.execute(connection)
			.await?;

		Ok(evicted)
	}
}

/// A lottery drawn among the users who reacted to a panel
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = delay_lotteries)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub(crate) struct DelayLottery {
	/// Row id
	pub(crate) id: i32,
	/// Guild of the panel
	pub(crate) guild_id: u64,
	/// Channel of the panel
	pub(crate) channel_id: u64,
	/// The panel message
	pub(crate) message_id: u64,
	/// The user who created the lottery
	pub(crate) author_id: u64,
	/// Number of winners
	pub(crate) winners: u32,
	/// Unix timestamp of the draw
	pub(crate) draw_at: i64,
}

/// See [`DelayLottery`]
#[derive(Debug, Insertable)]
#[diesel(table_name = delay_lotteries)]
pub(crate) struct NewDelayLottery {
	/// See [`DelayLottery::guild_id`]
	pub(crate) guild_id: u64,
	/// See [`DelayLottery::channel_id`]
	pub(crate) channel_id: u64,
	/// See [`DelayLottery::message_id`]
	pub(crate) message_id: u64,
	/// See [`DelayLottery::author_id`]
	pub(crate) author_id: u64,
	/// See [`DelayLottery::winners`]
	pub(crate) winners: u32,
	/// See [`DelayLottery::draw_at`]
	pub(crate) draw_at: i64,
}

impl DelayLottery {
	/// Pending lotteries of a guild
	pub(crate) async fn count_in_guild(
		connection: &mut DatabasePooledConnection,
		guild_id: GuildId,
	) -> QueryResult<i64> {
		delay_lotteries::table
			.filter(delay_lotteries::guild_id.eq(guild_id.get()))
			.count()
			.get_result(connection)
			.await
	}

	/// Lotteries to draw
	pub(crate) async fn due(
		connection: &mut DatabasePooledConnection,
		now: i64,
	) -> QueryResult<Vec<Self>> {
		delay_lotteries::table
			.filter(delay_lotteries::draw_at.le(now))
			.load::<Self>(connection)
			.await
	}

	/// The lottery of a panel
	pub(crate) async fn from_message(
		connection: &mut DatabasePooledConnection,
		message_id: MessageId,
	) -> QueryResult<Option<Self>> {
		delay_lotteries::table
			.filter(delay_lotteries::message_id.eq(message_id.get()))
			.first::<Self>(connection)
			.await
			.optional()
	}

	/// Forget a lottery
	pub(crate) async fn delete(
		connection: &mut DatabasePooledConnection,
		id: i32,
	) -> QueryResult<usize> {
		diesel::delete(delay_lotteries::table.filter(delay_lotteries::id.eq(id)))
			.execute(connection)
			.await
	}

	/// Forget every lottery of a guild
	pub(crate) async fn delete_guild(
		connection: &mut DatabasePooledConnection,
		guild_id: GuildId,
	) -> QueryResult<usize> {
		diesel::delete(delay_lotteries::table.filter(delay_lotteries::guild_id.eq(guild_id.get())))
			.execute(connection)
			.await
	}
}

impl NewDelayLottery {
	/// Store the lottery
	pub(crate) async fn insert(&self, connection: &mut DatabasePooledConnection) -> QueryResult<usize> {
		diesel::insert_into(delay_lotteries::table)
			.values(self)
			.execute(connection)
			.await
	}
}

/// A short url pointing to a long one
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = short_urls)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub(crate) struct ShortUrl {
	/// Row id
	pub(crate) id: i32,
	/// Owner of the short url
	pub(crate) user_id: u64,
	/// The target
	pub(crate) url: String,
	/// The path of the short url
	pub(crate) custom: String,
	/// Unix timestamp of the registration
	pub(crate) registered_at: i64,
}

/// See [`ShortUrl`]
#[derive(Debug, Insertable)]
#[diesel(table_name = short_urls)]
pub(crate) struct NewShortUrl<'a> {
	/// See [`ShortUrl::user_id`]
	pub(crate) user_id: u64,
	/// See [`ShortUrl::url`]
	pub(crate) url: &'a str,
	/// See [`ShortUrl::custom`]
	pub(crate) custom: &'a str,
	/// See [`ShortUrl::registered_at`]
	pub(crate) registered_at: i64,
}

impl ShortUrl {
	/// Short urls owned by a user, oldest first
	pub(crate) async fn all_from_user(
		connection: &mut DatabasePooledConnection,
		user_id: UserId,
	) -> QueryResult<Vec<Self>> {
		short_urls::table
			.filter(short_urls::user_id.eq(user_id.get()))
			.order(short_urls::registered_at.asc())
			.load::<Self>(connection)
			.await
	}

	/// Number of short urls owned by a user
	pub(crate) async fn count_from_user(
		connection: &mut DatabasePooledConnection,
		user_id: UserId,
	) -> QueryResult<i64> {
		short_urls::table
			.filter(short_urls::user_id.eq(user_id.get()))
			.count()
			.get_result(connection)
			.await
	}

	/// Resolve a short url path
	pub(crate) async fn find(
		connection: &mut DatabasePooledConnection,
		custom: &str,
	) -> QueryResult<Option<Self>> {
		short_urls::table
			.filter(short_urls::custom.eq(custom))
			.first::<Self>(connection)
			.await
			.optional()
	}

	/// Remove the oldest short url of a user
	pub(crate) async fn remove_oldest(
		connection: &mut DatabasePooledConnection,
		user_id: UserId,
	) -> QueryResult<usize> {
		let oldest = short_urls::table
			.filter(short_urls::user_id.eq(user_id.get()))
			.order((short_urls::registered_at.asc(), short_urls::id.asc()))
			.select(short_urls::id)
			.first::<i32>(connection)
			.await
			.optional()?;

		match oldest {
			Some(id) => {
				diesel::delete(short_urls::table.filter(short_urls::id.eq(id)))
					.execute(connection)
					.await
			}
			None => Ok(0),
		}
	}

	/// Remove a short url if it belongs to the user
	pub(crate) async fn delete_owned(
		connection: &mut DatabasePooledConnection,
		user_id: UserId,
		custom: &str,
	) -> QueryResult<usize> {
		diesel::delete(
			short_urls::table
				.filter(short_urls::user_id.eq(user_id.get()))
				.filter(short_urls::custom.eq(custom)),
		)
		.execute(connection)
		.await
	}
}

impl NewShortUrl<'_> {
	/// Store the short url
	pub(crate) async fn insert(&self, connection: &mut DatabasePooledConnection) -> QueryResult<usize> {
		diesel::insert_into(short_urls::table)
			.values(self)
			.execute(connection)
			.await
	}
}

/// Level settings of a guild
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = level_guilds)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub(crate) struct LevelGuild {
	/// The guild
	pub(crate) guild_id: u64,
	/// Whether local levels are counted
	pub(crate) enabled: bool,
	/// Whether level ups are notified with a reaction
	pub(crate) notify: bool,
}

impl LevelGuild {
	/// Settings of a guild, defaults when never configured
	pub(crate) async fn get_or_default(
		connection: &mut DatabasePooledConnection,
		guild_id: GuildId,
	) -> QueryResult<Self> {
		let settings = level_guilds::table
			.filter(level_guilds::guild_id.eq(guild_id.get()))
			.first::<Self>(connection)
			.await
			.optional()?;

		Ok(settings.unwrap_or(Self {
			guild_id: guild_id.get(),
			enabled: true,
			notify: false,
		}))
	}

	/// Insert or replace the settings
	pub(crate) async fn upsert(&self, connection: &mut DatabasePooledConnection) -> QueryResult<usize> {
		diesel::replace_into(level_guilds::table)
			.values(self)
			.execute(connection)
			.await
	}
}

/// Local level of a member
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = level_members)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub(crate) struct LevelMember {
	/// The guild
	pub(crate) guild_id: u64,
	/// The member
	pub(crate) user_id: u64,
	/// Accumulated experience
	pub(crate) exp: u64,
	/// Current level
	pub(crate) level: u64,
}

impl LevelMember {
	/// Level of a member, a fresh one when unknown
	pub(crate) async fn get_or_default(
		connection: &mut DatabasePooledConnection,
		guild_id: GuildId,
		user_id: UserId,
	) -> QueryResult<Self> {
		let member = level_members::table
			.filter(level_members::guild_id.eq(guild_id.get()))
			.filter(level_members::user_id.eq(user_id.get()))
			.first::<Self>(connection)
			.await
			.optional()?;

		Ok(member.unwrap_or(Self {
			guild_id: guild_id.get(),
			user_id: user_id.get(),
			exp: 0,
			level: 0,
		}))
	}

	/// Best members of a guild
	pub(crate) async fn top(
		connection: &mut DatabasePooledConnection,
		guild_id: GuildId,
		limit: i64,
	) -> QueryResult<Vec<Self>> {
		level_members::table
			.filter(level_members::guild_id.eq(guild_id.get()))
			.order((level_members::level.desc(), level_members::exp.desc()))
			.limit(limit)
			.load::<Self>(connection)
			.await
	}

	/// Insert or replace the level
	pub(crate) async fn upsert(&self, connection: &mut DatabasePooledConnection) -> QueryResult<usize> {
		diesel::replace_into(level_members::table)
			.values(self)
			.execute(connection)
			.await
	}
}

/// Level of a user across every guild
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = global_levels)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub(crate) struct GlobalLevel {
	/// The user
	pub(crate) user_id: u64,
	/// Accumulated experience
	pub(crate) exp: u64,
	/// Current level
	pub(crate) level: u64,
	/// Whether the user wants level up reactions
	pub(crate) notify: bool,
}

impl GlobalLevel {
	/// Level of a user, a fresh one when unknown
	pub(crate) async fn get_or_default(
		connection: &mut DatabasePooledConnection,
		user_id: UserId,
	) -> QueryResult<Self> {
		let level = global_levels::table
			.filter(global_levels::user_id.eq(user_id.get()))
			.first::<Self>(connection)
			.await
			.optional()?;

		Ok(level.unwrap_or(Self {
			user_id: user_id.get(),
			exp: 0,
			level: 0,
			notify: false,
		}))
	}

	/// Best users
	pub(crate) async fn top(
		connection: &mut DatabasePooledConnection,
		limit: i64,
	) -> QueryResult<Vec<Self>> {
		global_levels::table
			.order((global_levels::level.desc(), global_levels::exp.desc()))
			.limit(limit)
			.load::<Self>(connection)
			.await
	}

	/// Insert or replace the level
	pub(crate) async fn upsert(&self, connection: &mut DatabasePooledConnection) -> QueryResult<usize> {
		diesel::replace_into(global_levels::table)
			.values(self)
			.execute(connection)
			.await
	}
}

/// Roles given when reaching a local level
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = level_rewards)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub(crate) struct LevelReward {
	/// The guild
	pub(crate) guild_id: u64,
	/// The level to reach
	pub(crate) level: u64,
	/// The role to give
	pub(crate) role_id: u64,
	/// The role to take back at the same time
	pub(crate) replace_role_id: Option<u64>,
}

impl LevelReward {
	/// Rewards of a guild, by level
	pub(crate) async fn all_from_guild(
		connection: &mut DatabasePooledConnection,
		guild_id: GuildId,
	) -> QueryResult<Vec<Self>> {
		level_rewards::table
			.filter(level_rewards::guild_id.eq(guild_id.get()))
			.order(level_rewards::level.asc())
			.load::<Self>(connection)
			.await
	}

	/// Reward of one level
	pub(crate) async fn get(
		connection: &mut DatabasePooledConnection,
		guild_id: GuildId,
		level: u64,
	) -> QueryResult<Option<Self>> {
		level_rewards::table
			.filter(level_rewards::guild_id.eq(guild_id.get()))
			.filter(level_rewards::level.eq(level))
			.first::<Self>(connection)
			.await
			.optional()
	}

	/// Insert or replace the reward
	pub(crate) async fn upsert(&self, connection: &mut DatabasePooledConnection) -> QueryResult<usize> {
		diesel::replace_into(level_rewards::table)
			.values(self)
			.execute(connection)
			.await
	}

	/// Remove the reward of one level
	pub(crate) async fn delete(
		connection: &mut DatabasePooledConnection,
		guild_id: GuildId,
		level: u64,
	) -> QueryResult<usize> {
		diesel::delete(
			level_rewards::table
				.filter(level_rewards::guild_id.eq(guild_id.get()))
				.filter(level_rewards::level.eq(level)),
		)
		.execute(connection)
		.await
	}
}

/// Captcha settings of a guild
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = captchas)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub(crate) struct Captcha {
	/// The guild
	pub(crate) guild_id: u64,
	/// `word` or `click`
	pub(crate) mode: String,
	/// Role given on success
	pub(crate) role_id: u64,
	/// Channel where the captcha was configured
	pub(crate) channel_id: u64,
	/// The password of the word captcha
	pub(crate) word: Option<String>,
	/// Minutes before an unverified member leaves the queue
	pub(crate) timeout_minutes: u32,
	/// Whether expired members are kicked
	pub(crate) kick: bool,
}

impl Captcha {
	/// Settings of a guild
	pub(crate) async fn get(
		connection: &mut DatabasePooledConnection,
		guild_id: GuildId,
	) -> QueryResult<Option<Self>> {
		captchas::table
			.filter(captchas::guild_id.eq(guild_id.get()))
			.first::<Self>(connection)
			.await
			.optional()
	}

	/// Insert or replace the settings
	pub(crate) async fn upsert(&self, connection: &mut DatabasePooledConnection) -> QueryResult<usize> {
		diesel::replace_into(captchas::table)
			.values(self)
			.execute(connection)
			.await
	}

	/// Remove the settings
	pub(crate) async fn delete(
		connection: &mut DatabasePooledConnection,
		guild_id: GuildId,
	) -> QueryResult<usize> {
		diesel::delete(captchas::table.filter(captchas::guild_id.eq(guild_id.get())))
			.execute(connection)
			.await
	}
}

/// Away message of a user
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = afk_users)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub(crate) struct AfkUser {
	/// The user
	pub(crate) user_id: u64,
	/// Why the user is away
	pub(crate) reason: String,
}

impl AfkUser {
	/// Away message of a user
	pub(crate) async fn get(
		connection: &mut DatabasePooledConnection,
		user_id: UserId,
	) -> QueryResult<Option<Self>> {
		afk_users::table
			.filter(afk_users::user_id.eq(user_id.get()))
			.first::<Self>(connection)
			.await
			.optional()
	}

	/// Insert or replace the away message
	pub(crate) async fn upsert(&self, connection: &mut DatabasePooledConnection) -> QueryResult<usize> {
		diesel::replace_into(afk_users::table)
			.values(self)
			.execute(connection)
			.await
	}

	/// Remove the away message
	pub(crate) async fn delete(
		connection: &mut DatabasePooledConnection,
		user_id: UserId,
	) -> QueryResult<usize> {
		diesel::delete(afk_users::table.filter(afk_users::user_id.eq(user_id.get())))
			.execute(connection)
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use diesel::{debug_query, mysql::Mysql, SelectableHelper};

	#[test]
	fn rows_select_their_own_columns() {
		let query = captchas::table
			.select(Captcha::as_select())
			.filter(captchas::guild_id.eq(1_u64));
		let sql = debug_query::<Mysql, _>(&query).to_string();

		assert!(sql.starts_with("SELECT `captchas`.`guild_id`, `captchas`.`mode`"));
		assert!(sql.contains("`captchas`.`kick` FROM `captchas`"));
	}

	#[test]
	fn settings_are_replaced_on_their_primary_key() {
		let captcha = Captcha {
			guild_id: 1,
			mode: "word".to_owned(),
			role_id: 2,
			channel_id: 3,
			word: Some("rt".to_owned()),
			timeout_minutes: 60,
			kick: false,
		};
		let sql = debug_query::<Mysql, _>(&diesel::replace_into(captchas::table).values(&captcha))
			.to_string();

		assert!(sql.starts_with(
			"REPLACE INTO `captchas` (`guild_id`, `mode`, `role_id`, `channel_id`, `word`, \
			 `timeout_minutes`, `kick`)"
		));
	}
}
