//! Away messages shown to people mentioning you

use crate::{
	cacher::{Cacher, CacherPool},
	database::{models::AfkUser, DatabasePooledConnection},
	events::guild_locale,
	states::{ApplicationContext, ApplicationContextPolyfill, Data, InteractionResult},
	translation::Translate,
};
use fluent::fluent_args;
use poise::{
	command,
	serenity_prelude::{self as serenity, CreateAllowedMentions, CreateMessage, Message, UserId},
};
use std::sync::Arc;
use tokio::time::Duration;

/// How long a known away message is trusted
const AFK_CACHE_LIFETIME: Duration = Duration::from_secs(60 * 10);

/// Known away messages, `None` for users known to be present
#[derive(Debug)]
pub(crate) struct AfkCache {
	/// Reasons keyed by user
	reasons: Arc<Cacher<UserId, Option<String>>>,
}

impl AfkCache {
	/// Acquire the cache from the pool
	pub(crate) fn new(cachers: &CacherPool) -> Self {
		Self {
			reasons: cachers.acquire(AFK_CACHE_LIFETIME),
		}
	}

	/// The away message of a user, read from the database when unknown
	pub(crate) async fn reason(
		&self,
		connection: &mut DatabasePooledConnection,
		user_id: UserId,
	) -> diesel::QueryResult<Option<String>> {
		if let Some(reason) = self.reasons.get(&user_id) {
			return Ok(reason);
		}

		let reason = AfkUser::get(connection, user_id)
			.await?
			.map(|afk| afk.reason);
		self.reasons.set(user_id, reason.clone());

		Ok(reason)
	}

	/// Remember a change made to the database
	pub(crate) fn remember(&self, user_id: UserId, reason: Option<String>) {
		self.reasons.set(user_id, reason);
	}
}

/// Leave an away message
#[allow(clippy::unused_async)]
#[command(
	slash_command,
	category = "Individual",
	subcommands("afk_set", "afk_remove", "afk_show")
)]
pub(crate) async fn afk(_: ApplicationContext<'_>) -> InteractionResult {
	Ok(())
}

/// Tell people who mention you that you are away
#[command(slash_command, rename = "set")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn afk_set(
	ctx: ApplicationContext<'_>,
	#[max_length = 1000] reason: Option<String>,
) -> InteractionResult {
	let user_id = ctx.interaction.user.id;
	let reason = reason.unwrap_or_else(|| ctx.translate("afk-default-reason", None));

	AfkUser {
		user_id: user_id.get(),
		reason: reason.clone(),
	}
	.upsert(&mut ctx.data.database.get().await?)
	.await?;
	ctx.data.afk.remember(user_id, Some(reason.clone()));

	ctx.shout(ctx.translate("afk_set-success", Some(fluent_args!["reason" => reason])))
		.await?;

	Ok(())
}

/// Remove your away message
#[command(slash_command, rename = "remove")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn afk_remove(ctx: ApplicationContext<'_>) -> InteractionResult {
	let user_id = ctx.interaction.user.id;

	let removed = AfkUser::delete(&mut ctx.data.database.get().await?, user_id).await?;
	ctx.data.afk.remember(user_id, None);

	let key = if removed == 0 {
		"afk-not-set"
	} else {
		"afk_remove-success"
	};
	ctx.shout(ctx.translate(key, None)).await?;

	Ok(())
}

/// Show your away message
#[command(slash_command, rename = "show")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn afk_show(ctx: ApplicationContext<'_>) -> InteractionResult {
	let reason = ctx
		.data
		.afk
		.reason(&mut ctx.data.database.get().await?, ctx.interaction.user.id)
		.await?;

	let text = match reason {
		Some(reason) => ctx.translate("afk_show-reason", Some(fluent_args!["reason" => reason])),
		None => ctx.translate("afk-not-set", None),
	};
	ctx.shout(text).await?;

	Ok(())
}

/// Clear the away message of returning users and answer mentions of away users
pub(crate) async fn on_message(
	discord: &serenity::Context,
	data: &Data,
	message: &Message,
) -> InteractionResult {
	if message.author.bot || message.guild_id.is_none() {
		return Ok(());
	}

	let mut connection = data.database.get().await?;
	let locale = guild_locale(discord, message.guild_id);

	if data
		.afk
		.reason(&mut connection, message.author.id)
		.await?
		.is_some()
	{
		AfkUser::delete(&mut connection, message.author.id).await?;
		data.afk.remember(message.author.id, None);

		let notice = data.translations.translate(
			&locale,
			"afk-welcome-back",
			Some(fluent_args!["user" => message.author.name.clone()]),
		);
		message
			.channel_id
			.send_message(
				discord,
				CreateMessage::new()
					.content(notice)
					.allowed_mentions(CreateAllowedMentions::new()),
			)
			.await?;
	}

	let mut lines = Vec::new();
	for user in &message.mentions {
		if user.id == message.author.id || user.bot {
			continue;
		}

		if let Some(reason) = data.afk.reason(&mut connection, user.id).await? {
			lines.push(data.translations.translate(
				&locale,
				"afk-mentioned",
				Some(fluent_args!["user" => user.name.clone(), "reason" => reason]),
			));
		}
	}

	if !lines.is_empty() {
		message
			.channel_id
			.send_message(
				discord,
				CreateMessage::new()
					.content(lines.join("\n"))
					.reference_message(message)
					.allowed_mentions(CreateAllowedMentions::new()),
			)
			.await?;
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn remembered_reasons_expire() {
		let cache = AfkCache::new(&CacherPool::default());
		let user_id = UserId::new(1);

		cache.remember(user_id, Some("sleeping".into()));
		assert_eq!(cache.reasons.get(&user_id), Some(Some("sleeping".into())));

		cache.remember(user_id, None);
		assert_eq!(cache.reasons.get(&user_id), Some(None));

		tokio::time::advance(AFK_CACHE_LIFETIME + Duration::from_secs(1)).await;
		assert_eq!(cache.reasons.get(&user_id), None);
	}
}
