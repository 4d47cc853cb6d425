//! Runtime figures of the bot

use crate::{
	constants::NORMAL_COLOUR,
	states::{ApplicationContext, ApplicationContextPolyfill, InteractionResult},
	translation::Translate,
};
use fluent::fluent_args;
use poise::{
	command,
	serenity_prelude::{CreateEmbed, CreateEmbedFooter},
	CreateReply,
};

/// Show the size of the caches and the state of the bridge
#[command(slash_command, owners_only, hide_in_help, rename = "stats")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(super) async fn debug_stats(ctx: ApplicationContext<'_>) -> InteractionResult {
	let data = ctx.data;

	let guilds = ctx.serenity_context.cache.guild_count();
	let bridge_key = if data.rtws.get().is_some() {
		"debug_stats-bridge-on"
	} else {
		"debug_stats-bridge-off"
	};

	let fields = [
		(
			ctx.translate("debug_stats-guilds", None),
			guilds.to_string(),
		),
		(
			ctx.translate("debug_stats-cachers", None),
			data.cachers.len().to_string(),
		),
		(
			ctx.translate("debug_stats-sessions", None),
			data.auth.sessions.len().to_string(),
		),
		(
			ctx.translate("debug_stats-captcha-queue", None),
			data.captcha_queue.len().to_string(),
		),
		(
			ctx.translate("debug_stats-bridge", None),
			ctx.translate(bridge_key, None),
		),
	];

	let embed = CreateEmbed::new()
		.title(ctx.translate("debug_stats-title", None))
		.colour(NORMAL_COLOUR)
		.fields(fields.into_iter().map(|(name, value)| (name, value, true)))
		.footer(CreateEmbedFooter::new(ctx.translate(
			"debug_stats-footer",
			Some(fluent_args!["version" => env!("CARGO_PKG_VERSION")]),
		)));

	ctx.send(CreateReply::default().embed(embed).ephemeral(true))
		.await?;

	Ok(())
}
