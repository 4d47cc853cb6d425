//! Delete messages some time after they were sent

use super::now_timestamp;
use crate::{
	database::{
		models::{DelayDelete, NewDelayDelete},
		DatabasePooledConnection,
	},
	events::guild_locale,
	globalchat::channel_webhook,
	states::{ApplicationContext, ApplicationContextPolyfill, Data, DiscordHandle, InteractionResult},
	translation::Translate,
};
use fluent::fluent_args;
use poise::{
	command,
	serenity_prelude::{self as serenity, CreateAllowedMentions, CreateMessage, ExecuteWebhook, Message},
};

/// Prefix of the topic line enabling deletion of every message
const TOPIC_PREFIX: &str = "rt>delaydelete ";

/// Send a message that deletes itself after some minutes
///
/// Parameters
/// ----------
/// minutes : int
///     Minutes before the message is deleted
/// content : str
///     The message to send
///
/// Notes
/// -----
/// Put a line `rt>delaydelete <minutes>` in a channel topic to delete every message sent there.
#[command(
	slash_command,
	guild_only,
	category = "ServerTool",
	required_bot_permissions = "MANAGE_WEBHOOKS | MANAGE_MESSAGES"
)]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn delaydelete(
	ctx: ApplicationContext<'_>,
	#[min = 1] minutes: u32,
	content: String,
) -> InteractionResult {
	let channel_id = ctx.interaction.channel_id;
	let author = &ctx.interaction.user;

	let webhook = channel_webhook(ctx.serenity_context, ctx.data, channel_id).await?;
	let Some(sent) = webhook
		.execute(
			ctx.serenity_context,
			true,
			ExecuteWebhook::new()
				.username(author.name.clone())
				.avatar_url(author.face())
				.content(content)
				.allowed_mentions(CreateAllowedMentions::new()),
		)
		.await?
	else {
		return Err(anyhow::anyhow!("webhook did not return the sent message").into());
	};

	let evicted = schedule(
		&mut ctx.data.database.get().await?,
		&sent,
		i64::from(minutes) * 60,
	)
	.await?;

	if evicted {
		tracing::debug!(channel_id = channel_id.get(), "evicted the oldest delayed deletion");
	}

	ctx.shout(ctx.translate(
		"delaydelete-success",
		Some(fluent_args!["minutes" => minutes]),
	))
	.await?;

	Ok(())
}

/// Minutes configured by a `rt>delaydelete <minutes>` topic line
///
/// `Some(Err(()))` when the line exists but is malformed
pub(crate) fn parse_topic_delay(topic: &str) -> Option<Result<u32, ()>> {
	topic
		.lines()
		.find_map(|line| line.strip_prefix(TOPIC_PREFIX))
		.map(|minutes| minutes.trim().parse::<u32>().map_err(|_| ()))
}

/// Store a deletion `seconds` from now
async fn schedule(
	connection: &mut DatabasePooledConnection,
	message: &Message,
	seconds: i64,
) -> diesel::QueryResult<bool> {
	NewDelayDelete {
		channel_id: message.channel_id.get(),
		message_id: message.id.get(),
		delete_at: now_timestamp() + seconds,
	}
	.schedule(connection)
	.await
}

/// Schedule the messages of channels configured through their topic
pub(crate) async fn on_message(
	discord: &serenity::Context,
	data: &Data,
	message: &Message,
) -> InteractionResult {
	if message.guild_id.is_none() || message.author.bot {
		return Ok(());
	}

	let topic = message.guild_id.and_then(|guild_id| {
		discord
			.cache
			.guild(guild_id)?
			.channels
			.get(&message.channel_id)?
			.topic
			.clone()
	});
	let Some(delay) = topic.as_deref().and_then(parse_topic_delay) else {
		return Ok(());
	};

	match delay {
		Ok(minutes) => {
			schedule(
				&mut data.database.get().await?,
				message,
				i64::from(minutes) * 60,
			)
			.await?;
		}
		Err(()) => {
			let locale = guild_locale(discord, message.guild_id);
			let text = data
				.translations
				.translate(&locale, "delaydelete-invalid-topic", None);

			message
				.channel_id
				.send_message(discord, CreateMessage::new().content(text))
				.await?;
		}
	}

	Ok(())
}

/// Delete every message whose time has come
pub(crate) async fn delete_due_messages(
	discord: &DiscordHandle,
	connection: &mut DatabasePooledConnection,
) -> anyhow::Result<()> {
	for scheduled in DelayDelete::due(connection, now_timestamp()).await? {
		let (channel_id, message_id) = scheduled.message();

		match channel_id.delete_message(discord, message_id).await {
			Ok(()) | Err(serenity::Error::Http(_)) => {}
			Err(error) => {
				tracing::warn!(error = ?error, "could not delete a delayed message");
			}
		}

		DelayDelete::delete(connection, scheduled.id).await?;
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::parse_topic_delay;

	#[test]
	fn topic_lines_configure_the_delay() {
		assert_eq!(parse_topic_delay("rules\nrt>delaydelete 5"), Some(Ok(5)));
		assert_eq!(parse_topic_delay("rt>delaydelete soon"), Some(Err(())));
		assert_eq!(parse_topic_delay("just a topic"), None);
		assert_eq!(parse_topic_delay("  rt>delaydelete 5"), None);
	}
}
