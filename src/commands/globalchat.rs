//! Create and join global chats

use crate::{
	constants::globalchat,
	database::models::{GlobalChat, NewGlobalChat},
	globalchat::{relay_to, RelayMessage},
	states::{ApplicationContext, ApplicationContextPolyfill, InteractionResult},
	translation::Translate,
};
use fluent::fluent_args;
use poise::{
	command,
	serenity_prelude::{ChannelId, EditChannel},
};

/// Connect channels of many servers together
#[allow(clippy::unused_async)]
#[command(
	slash_command,
	category = "ServerUseful",
	subcommands(
		"globalchat_make",
		"globalchat_delete",
		"globalchat_connect",
		"globalchat_disconnect",
		"globalchat_list"
	),
	default_member_permissions = "MANAGE_CHANNELS",
	required_bot_permissions = "MANAGE_WEBHOOKS | MANAGE_CHANNELS"
)]
pub(crate) async fn globalchat(_: ApplicationContext<'_>) -> InteractionResult {
	Ok(())
}

/// Mark or unmark a channel as part of a global chat
async fn set_marker(ctx: ApplicationContext<'_>, channel_id: ChannelId, connected: bool) {
	let topic = if connected {
		globalchat::TOPIC_MARKER
	} else {
		""
	};

	if let Err(error) = channel_id
		.edit(ctx.serenity_context, EditChannel::new().topic(topic))
		.await
	{
		tracing::warn!(error = ?error, channel_id = channel_id.get(), "could not edit the topic");
	}
}

/// Create a new global chat in this channel
#[command(
	slash_command,
	guild_only,
	rename = "make",
	required_permissions = "ADMINISTRATOR"
)]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn globalchat_make(ctx: ApplicationContext<'_>, name: String) -> InteractionResult {
	let guild_id = ctx.guild_only_id();
	let channel_id = ctx.interaction.channel_id;
	let mut connection = ctx.data.database.get().await?;

	if GlobalChat::exists(&mut connection, &name).await? {
		ctx.shout(ctx.translate(
			"globalchat_make-already-exists",
			Some(fluent_args!["name" => name]),
		))
		.await?;

		return Ok(());
	}

	if GlobalChat::from_channel(&mut connection, channel_id)
		.await?
		.is_some()
	{
		ctx.shout(ctx.translate("globalchat_connect-already-connected", None))
			.await?;

		return Ok(());
	}

	NewGlobalChat {
		name: &name,
		guild_id: guild_id.get(),
		channel_id: channel_id.get(),
		author_id: ctx.interaction.user.id.get(),
	}
	.insert(&mut connection)
	.await?;

	set_marker(ctx, channel_id, true).await;

	ctx.shout(ctx.translate(
		"globalchat_make-success",
		Some(fluent_args!["name" => name]),
	))
	.await?;

	Ok(())
}

/// Delete the global chat of this channel
#[command(slash_command, guild_only, rename = "delete")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn globalchat_delete(ctx: ApplicationContext<'_>) -> InteractionResult {
	let mut connection = ctx.data.database.get().await?;

	let Some(chat) = GlobalChat::from_channel(&mut connection, ctx.interaction.channel_id).await?
	else {
		ctx.shout(ctx.translate("globalchat-not-connected", None))
			.await?;

		return Ok(());
	};

	if chat.author_id != ctx.interaction.user.id.get() {
		ctx.shout(ctx.translate("globalchat_delete-not-author", None))
			.await?;

		return Ok(());
	}

	let channels = GlobalChat::all_with_name(&mut connection, &chat.name).await?;
	GlobalChat::delete_named(&mut connection, &chat.name).await?;

	for channel in channels {
		set_marker(ctx, channel.channel(), false).await;
	}

	ctx.shout(ctx.translate(
		"globalchat_delete-success",
		Some(fluent_args!["name" => chat.name]),
	))
	.await?;

	Ok(())
}

/// Connect this channel to a global chat
#[command(slash_command, guild_only, rename = "connect")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn globalchat_connect(
	ctx: ApplicationContext<'_>,
	name: Option<String>,
) -> InteractionResult {
	let name = name.unwrap_or_else(|| globalchat::DEFAULT_NAME.into());
	let guild_id = ctx.guild_only_id();
	let channel_id = ctx.interaction.channel_id;
	let mut connection = ctx.data.database.get().await?;

	if !GlobalChat::exists(&mut connection, &name).await? {
		ctx.shout(ctx.translate(
			"globalchat_connect-not-found",
			Some(fluent_args!["name" => name]),
		))
		.await?;

		return Ok(());
	}

	if GlobalChat::from_channel(&mut connection, channel_id)
		.await?
		.is_some()
	{
		ctx.shout(ctx.translate("globalchat_connect-already-connected", None))
			.await?;

		return Ok(());
	}

	NewGlobalChat {
		name: &name,
		guild_id: guild_id.get(),
		channel_id: channel_id.get(),
		author_id: ctx.interaction.user.id.get(),
	}
	.insert(&mut connection)
	.await?;

	set_marker(ctx, channel_id, true).await;

	let guild_name = guild_id
		.name(&ctx.serenity_context.cache)
		.unwrap_or_else(|| guild_id.to_string());
	let (bot_name, bot_avatar) = {
		let bot = ctx.serenity_context.cache.current_user();
		(bot.name.clone(), bot.face())
	};

	let announcement = RelayMessage {
		username: bot_name,
		avatar_url: Some(bot_avatar),
		content: ctx.translate(
			"globalchat-joined",
			Some(fluent_args!["guild" => guild_name]),
		),
		embeds: Vec::new(),
		author: None,
	};
	relay_to(
		ctx.serenity_context,
		ctx.data,
		&mut connection,
		&name,
		&announcement,
		Some(channel_id),
	)
	.await?;

	ctx.shout(ctx.translate(
		"globalchat_connect-success",
		Some(fluent_args!["name" => name]),
	))
	.await?;

	Ok(())
}

/// Disconnect this channel from its global chat
#[command(slash_command, guild_only, rename = "disconnect")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn globalchat_disconnect(ctx: ApplicationContext<'_>) -> InteractionResult {
	let channel_id = ctx.interaction.channel_id;
	let mut connection = ctx.data.database.get().await?;

	if GlobalChat::delete_channel(&mut connection, channel_id).await? == 0 {
		ctx.shout(ctx.translate("globalchat-not-connected", None))
			.await?;

		return Ok(());
	}

	set_marker(ctx, channel_id, false).await;

	ctx.shout(ctx.translate("globalchat_disconnect-success", None))
		.await?;

	Ok(())
}

/// List the channels connected to this global chat
#[command(slash_command, guild_only, rename = "list")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn globalchat_list(ctx: ApplicationContext<'_>) -> InteractionResult {
	let mut connection = ctx.data.database.get().await?;

	let Some(chat) = GlobalChat::from_channel(&mut connection, ctx.interaction.channel_id).await?
	else {
		ctx.shout(ctx.translate("globalchat-not-connected", None))
			.await?;

		return Ok(());
	};

	let channels = GlobalChat::all_with_name(&mut connection, &chat.name)
		.await?
		.iter()
		.map(|chat| format!("<#{}> (`{}`)", chat.channel_id, chat.guild_id))
		.collect::<Vec<_>>()
		.join("\n");

	let message = format!(
		"**{}**\n{}",
		ctx.translate(
			"globalchat_list-title",
			Some(fluent_args!["name" => chat.name]),
		),
		channels
	);
	ctx.shout(message).await?;

	Ok(())
}
