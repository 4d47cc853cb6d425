//! `Discord` client events handlers

use crate::{
	commands::{afk, captcha, delay, helpers::register_, level},
	constants::events,
	database::purge_guild,
	globalchat, rtws,
	states::{ArcData, DiscordHandle, FrameworkContext, InteractionResult, MessageComponentContext},
	tasks,
};
use anyhow::Context;
use poise::serenity_prelude::{self as serenity, FullEvent, GuildId, Interaction, Message};
use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc, OnceLock,
};

/// Locale used when the guild is unknown
const DEFAULT_GUILD_LOCALE: &str = "en-US";

/// The preferred locale of a guild, used for messages not answering an interaction
pub(crate) fn guild_locale(discord: &serenity::Context, guild_id: Option<GuildId>) -> String {
	guild_id
		.and_then(|guild_id| {
			discord
				.cache
				.guild(guild_id)
				.map(|guild| guild.preferred_locale.clone())
		})
		.unwrap_or_else(|| DEFAULT_GUILD_LOCALE.to_owned())
}

/// Fill a cell set once, a second value is dropped with a warning
fn set_once<T>(cell: &OnceLock<T>, value: T, name: &str) {
	if cell.set(value).is_err() {
		tracing::warn!(cell = name, "already set, keeping the first value");
	}
}

/// Start what needs the filled gateway cache, once
fn on_first_cache_ready(ctx: &serenity::Context, data: &ArcData) {
	if data.workers_started.swap(true, Ordering::SeqCst) {
		return;
	}

	let discord = DiscordHandle {
		cache: Arc::clone(&ctx.cache),
		http: Arc::clone(&ctx.http),
	};
	set_once(&data.discord, discord.clone(), "discord");

	tasks::start_workers(data, discord.clone());

	match &data.config.rtws_url {
		Some(url) => {
			let handle = rtws::start(url.clone(), rtws::features::router(), discord);
			set_once(&data.rtws, handle, "rtws");
		}
		None => tracing::info!("no dashboard url configured, the bridge is disabled"),
	}
}

/// Run every message hook, a failing hook does not stop the others
async fn on_message(ctx: &serenity::Context, data: &ArcData, message: &Message) {
	let results = [
		("globalchat", globalchat::on_message(ctx, data, message).await),
		("delay_delete", delay::on_message(ctx, data, message).await),
		("level", level::on_message(ctx, data, message).await),
		("afk", afk::on_message(ctx, data, message).await),
		("captcha", captcha::on_message(ctx, data, message).await),
	];

	for (hook, result) in results {
		if let Err(error) = result {
			tracing::error!(
				hook = hook,
				error = ?error,
				message_id = message.id.get(),
				"message hook failed",
			);
		}
	}
}

/// Serenity listener to react to `Discord` events
pub(crate) async fn event_handler(
	ctx: &serenity::Context,
	event: &FullEvent,
	framework: FrameworkContext<'_>,
	data: &ArcData,
) -> InteractionResult {
	match event {
		FullEvent::Ready { data_about_bot } => {
			register_(
				&ctx.http,
				&data.config.discord_development_guild,
				&framework.options.commands,
			)
			.await
			.context("Could not register guild commands")?;

			tracing::info!("`{}` is ready!", data_about_bot.user.name);

			Ok(())
		}

		// Guilds only reach the cache after `Ready`
		FullEvent::CacheReady { guilds } => {
			tracing::info!(guilds = guilds.len(), "cache is ready");
			on_first_cache_ready(ctx, data);

			Ok(())
		}

		FullEvent::Message { new_message } => {
			on_message(ctx, data, new_message).await;

			Ok(())
		}

		FullEvent::GuildMemberAddition { new_member } => {
			captcha::on_member_join(data, new_member).await
		}

		FullEvent::GuildMemberRemoval { guild_id, user, .. } => {
			captcha::on_member_leave(data, *guild_id, user.id);

			Ok(())
		}

		FullEvent::GuildBanAddition { guild_id, .. }
		| FullEvent::GuildBanRemoval { guild_id, .. } => {
			data.globalchat.forget_bans(*guild_id);

			Ok(())
		}

		FullEvent::GuildDelete { incomplete, .. } => {
			// Outages only make the guild unavailable
			if incomplete.unavailable {
				return Ok(());
			}

			tracing::warn!(guild_id = incomplete.id.get(), "left a guild, purging its settings");

			purge_guild(&mut data.database.get().await?, incomplete.id).await?;
			data.globalchat.forget_bans(incomplete.id);

			Ok(())
		}

		FullEvent::InteractionCreate {
			interaction: Interaction::Component(interaction),
		} => {
			let ctx = MessageComponentContext {
				interaction,
				data,
				discord: ctx,
				has_sent_initial_response: &AtomicBool::new(false),
			};

			tracing::info!(
				user_id = ctx.interaction.user.id.get(),
				custom_id = ctx.interaction.data.custom_id,
				"`{}` interacted with a component",
				ctx.interaction.user.name,
			);

			match interaction.data.custom_id.as_str() {
				events::CAPTCHA_BUTTON_INTERACTION => captcha::on_button(ctx).await,
				events::LOTTERY_CANCEL_BUTTON_INTERACTION => delay::cancel_lottery(ctx).await,

				_ => Ok(()),
			}
		}

		_ => {
			tracing::trace!(event = ?event, "missed event");

			Ok(())
		}
	}
}

#[cfg(test)]
mod tests {
	use super::set_once;
	use std::sync::OnceLock;

	#[test]
	fn cells_keep_their_first_value() {
		let cell = OnceLock::new();

		set_once(&cell, 1, "test");
		set_once(&cell, 2, "test");

		assert_eq!(cell.get(), Some(&1));
	}
}
