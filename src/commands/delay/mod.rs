//! Actions run some time after they were requested

mod delete;
mod lottery;
mod role;

pub(crate) use delete::{delaydelete, delete_due_messages, on_message};
pub(crate) use lottery::{cancel_lottery, delaylottery, draw};
pub(crate) use role::{delayrole, grant_delayed_roles};

use poise::serenity_prelude::{Cache, GuildId};

/// Current unix timestamp
pub(crate) fn now_timestamp() -> i64 {
	chrono::Utc::now().timestamp()
}

/// Whether the rows of a guild can be worked on
///
/// A guild missing from the cache is not loaded yet or unavailable, its rows are kept.
/// Rows of left guilds are purged on `GuildDelete`.
pub(crate) fn guild_is_cached(cache: &Cache, guild_id: GuildId) -> bool {
	cache.guild(guild_id).is_some()
}

#[cfg(test)]
mod tests {
	use super::guild_is_cached;
	use poise::serenity_prelude::{Cache, GuildId};

	#[test]
	fn guilds_not_cached_yet_are_skipped() {
		let cache = Cache::new();

		assert!(!guild_is_cached(&cache, GuildId::new(1)));
	}
}
