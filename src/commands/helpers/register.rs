//! Re-register the command tree

use super::{register_, register_globally_};
use crate::{
	states::{ApplicationContext, ApplicationContextPolyfill, InteractionResult},
	translation::Translate,
};
use fluent::fluent_args;
use poise::command;

/// Register the commands in this guild, or globally
#[command(slash_command, owners_only, hide_in_help, rename = "register")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(super) async fn debug_register(
	ctx: ApplicationContext<'_>,
	global: Option<bool>,
) -> InteractionResult {
	let http = &ctx.serenity_context.http;
	let commands = &ctx.framework.options.commands;

	let (count, key) = if global.unwrap_or(false) {
		(
			register_globally_(http, commands).await?,
			"debug_register-global",
		)
	} else {
		let guild_id = ctx
			.interaction
			.guild_id
			.unwrap_or(ctx.data.config.discord_development_guild);

		(
			register_(http, &guild_id, commands).await?,
			"debug_register-guild",
		)
	};

	tracing::info!(count = count, global = ?global, "registered commands");

	ctx.shout(ctx.translate(key, Some(fluent_args!["count" => count])))
		.await?;

	Ok(())
}
