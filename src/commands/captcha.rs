//! Verify new members before giving them a role

use crate::{
	cacher::Cacher,
	constants::{emojis, events},
	database::models::Captcha,
	globalchat::unicode_reaction,
	states::{
		ApplicationContext, ApplicationContextPolyfill, Data, DiscordHandle, InteractionResult,
		MessageComponentContext,
	},
	translation::Translate,
};
use fluent::fluent_args;
use poise::{
	command,
	serenity_prelude::{
		self as serenity, ButtonStyle, ChannelId, CreateActionRow, CreateButton, CreateMessage,
		GuildId, Member, Message, Role, RoleId, UserId,
	},
};
use tokio::time::{Duration, Instant};

/// Captcha solved by typing a word
pub(crate) const WORD_MODE: &str = "word";
/// Captcha solved by pressing a button
pub(crate) const CLICK_MODE: &str = "click";
/// Minutes given to new members when not configured
pub(crate) const DEFAULT_TIMEOUT_MINUTES: u32 = 60;

/// Members waiting to solve the captcha of a guild
pub(crate) type CaptchaQueue = Cacher<(GuildId, UserId), ()>;

/// What a member did to solve the captcha
#[derive(Debug, Clone, Copy)]
pub(crate) enum Attempt<'a> {
	/// Typed a message
	Word {
		/// Where the message was sent
		channel_id: ChannelId,
		/// What was typed
		content: &'a str,
	},
	/// Pressed the panel button
	Click,
}

/// Whether the attempt solves the captcha of the guild
pub(crate) fn solves(captcha: &Captcha, attempt: Attempt<'_>) -> bool {
	match (captcha.mode.as_str(), attempt) {
		(WORD_MODE, Attempt::Word { channel_id, content }) => {
			captcha.channel_id == channel_id.get() && captcha.word.as_deref() == Some(content.trim())
		}
		(CLICK_MODE, Attempt::Click) => true,
		_ => false,
	}
}

/// Whether a member still in the queue solves the captcha
pub(crate) fn accepts(
	queue: &CaptchaQueue,
	member: (GuildId, UserId),
	captcha: &Captcha,
	attempt: Attempt<'_>,
) -> bool {
	queue.contains_key(&member) && solves(captcha, attempt)
}

/// Verify new members
#[allow(clippy::unused_async)]
#[command(
	slash_command,
	category = "ServerSafety",
	subcommands("captcha_set", "captcha_delete", "captcha_timeout", "captcha_panel"),
	default_member_permissions = "ADMINISTRATOR",
	required_bot_permissions = "MANAGE_ROLES"
)]
pub(crate) async fn captcha(_: ApplicationContext<'_>) -> InteractionResult {
	Ok(())
}

/// Choose how members are verified
#[allow(clippy::unused_async)]
#[command(
	slash_command,
	rename = "set",
	subcommands("captcha_set_word", "captcha_set_click")
)]
pub(crate) async fn captcha_set(_: ApplicationContext<'_>) -> InteractionResult {
	Ok(())
}

/// Store the settings of the guild, keeping the timeout already configured
async fn save(
	ctx: ApplicationContext<'_>,
	mode: &str,
	role: &Role,
	word: Option<String>,
) -> InteractionResult {
	let guild_id = ctx.guild_only_id();
	let mut connection = ctx.data.database.get().await?;

	let (timeout_minutes, kick) = Captcha::get(&mut connection, guild_id)
		.await?
		.map_or((DEFAULT_TIMEOUT_MINUTES, false), |captcha| {
			(captcha.timeout_minutes, captcha.kick)
		});

	Captcha {
		guild_id: guild_id.get(),
		mode: mode.to_owned(),
		role_id: role.id.get(),
		channel_id: ctx.interaction.channel_id.get(),
		word,
		timeout_minutes,
		kick,
	}
	.upsert(&mut connection)
	.await?;

	ctx.shout(ctx.translate(
		"captcha_set-success",
		Some(fluent_args!["role" => role.name.clone(), "mode" => mode.to_owned()]),
	))
	.await?;

	Ok(())
}

/// Members type a word in this channel
///
/// Parameters
/// ----------
/// role : role
///     Role given to verified members
/// word : str
///     The word to type
#[command(slash_command, guild_only, rename = "word")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn captcha_set_word(
	ctx: ApplicationContext<'_>,
	role: Role,
	word: String,
) -> InteractionResult {
	save(ctx, WORD_MODE, &role, Some(word)).await
}

/// Members press the button of the panel
#[command(slash_command, guild_only, rename = "click")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn captcha_set_click(ctx: ApplicationContext<'_>, role: Role) -> InteractionResult {
	save(ctx, CLICK_MODE, &role, None).await
}

/// Stop verifying members
#[command(slash_command, guild_only, rename = "delete")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn captcha_delete(ctx: ApplicationContext<'_>) -> InteractionResult {
	let guild_id = ctx.guild_only_id();
	let removed = Captcha::delete(&mut ctx.data.database.get().await?, guild_id).await?;

	for key in ctx.data.captcha_queue.keys() {
		if key.0 == guild_id {
			ctx.data.captcha_queue.remove(&key);
		}
	}

	let key = if removed == 0 {
		"captcha-not-configured"
	} else {
		"captcha_delete-success"
	};
	ctx.shout(ctx.translate(key, None)).await?;

	Ok(())
}

/// How long new members have to solve the captcha
///
/// Parameters
/// ----------
/// minutes : int
///     Minutes given to new members
/// kick : bool
///     Whether members who ran out of time are kicked
#[command(slash_command, guild_only, rename = "timeout")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn captcha_timeout(
	ctx: ApplicationContext<'_>,
	#[min = 1] minutes: u32,
	kick: bool,
) -> InteractionResult {
	let mut connection = ctx.data.database.get().await?;

	let Some(mut captcha) = Captcha::get(&mut connection, ctx.guild_only_id()).await? else {
		ctx.shout(ctx.translate("captcha-not-configured", None))
			.await?;

		return Ok(());
	};

	captcha.timeout_minutes = minutes;
	captcha.kick = kick;
	captcha.upsert(&mut connection).await?;

	ctx.shout(ctx.translate(
		"captcha_timeout-success",
		Some(fluent_args!["minutes" => minutes]),
	))
	.await?;

	Ok(())
}

/// Post the button starting the captcha
#[command(slash_command, guild_only, rename = "panel")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn captcha_panel(ctx: ApplicationContext<'_>) -> InteractionResult {
	if Captcha::get(&mut ctx.data.database.get().await?, ctx.guild_only_id())
		.await?
		.is_none()
	{
		ctx.shout(ctx.translate("captcha-not-configured", None))
			.await?;

		return Ok(());
	}

	ctx.interaction
		.channel_id
		.send_message(
			ctx.serenity_context,
			CreateMessage::new()
				.content(ctx.translate("captcha_panel-content", None))
				.components(vec![CreateActionRow::Buttons(vec![CreateButton::new(
					events::CAPTCHA_BUTTON_INTERACTION,
				)
				.style(ButtonStyle::Primary)
				.label(ctx.translate("captcha_panel-button", None))])]),
		)
		.await?;

	ctx.shout(ctx.translate("captcha_panel-success", None))
		.await?;

	Ok(())
}

/// Queue a member who just joined
pub(crate) async fn on_member_join(data: &Data, member: &Member) -> InteractionResult {
	if member.user.bot {
		return Ok(());
	}

	let Some(captcha) = Captcha::get(&mut data.database.get().await?, member.guild_id).await?
	else {
		return Ok(());
	};

	data.captcha_queue.set_with_lifetime(
		(member.guild_id, member.user.id),
		(),
		Duration::from_secs(u64::from(captcha.timeout_minutes) * 60),
	);

	tracing::debug!(
		guild_id = member.guild_id.get(),
		user_id = member.user.id.get(),
		"queued a member for the captcha",
	);

	Ok(())
}

/// Forget a member who left
pub(crate) fn on_member_leave(data: &Data, guild_id: GuildId, user_id: UserId) {
	data.captcha_queue.remove(&(guild_id, user_id));
}

/// Give the role and dequeue the member
async fn verify(
	http: &serenity::Http,
	data: &Data,
	captcha: &Captcha,
	guild_id: GuildId,
	user_id: UserId,
) -> serenity::Result<()> {
	http.add_member_role(guild_id, user_id, RoleId::new(captcha.role_id), Some("Captcha"))
		.await?;
	data.captcha_queue.remove(&(guild_id, user_id));

	tracing::info!(guild_id = guild_id.get(), user_id = user_id.get(), "member solved the captcha");

	Ok(())
}

/// Check the word typed by a queued member
pub(crate) async fn on_message(
	discord: &serenity::Context,
	data: &Data,
	message: &Message,
) -> InteractionResult {
	let Some(guild_id) = message.guild_id else {
		return Ok(());
	};
	if !data.captcha_queue.contains_key(&(guild_id, message.author.id)) {
		return Ok(());
	}

	let Some(captcha) = Captcha::get(&mut data.database.get().await?, guild_id).await? else {
		return Ok(());
	};

	let attempt = Attempt::Word {
		channel_id: message.channel_id,
		content: &message.content,
	};
	if !accepts(&data.captcha_queue, (guild_id, message.author.id), &captcha, attempt) {
		return Ok(());
	}

	verify(&discord.http, data, &captcha, guild_id, message.author.id).await?;
	message
		.react(discord, unicode_reaction(emojis::CHECK))
		.await?;

	Ok(())
}

/// Handle a press on the captcha panel
#[tracing::instrument(skip_all, fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn on_button(ctx: MessageComponentContext<'_>) -> InteractionResult {
	let Some(guild_id) = ctx.interaction.guild_id else {
		return Ok(());
	};
	let user_id = ctx.interaction.user.id;

	if !ctx.data.captcha_queue.contains_key(&(guild_id, user_id)) {
		ctx.shout(ctx.translate("captcha-not-queued", None))
			.await?;

		return Ok(());
	}

	let Some(captcha) = Captcha::get(&mut ctx.data.database.get().await?, guild_id).await? else {
		ctx.shout(ctx.translate("captcha-not-configured", None))
			.await?;

		return Ok(());
	};

	if !solves(&captcha, Attempt::Click) {
		ctx.shout(ctx.translate(
			"captcha-type-the-word",
			Some(fluent_args!["channel" => format!("<#{}>", captcha.channel_id)]),
		))
		.await?;

		return Ok(());
	}

	verify(&ctx.discord.http, ctx.data, &captcha, guild_id, user_id).await?;
	ctx.shout(ctx.translate("captcha-success", None)).await?;

	Ok(())
}

/// Kick a member who ran out of time, when the guild asked for it
async fn expire_member(
	discord: &DiscordHandle,
	data: &Data,
	guild_id: GuildId,
	user_id: UserId,
) -> anyhow::Result<()> {
	let Some(captcha) = Captcha::get(&mut data.database.get().await?, guild_id).await? else {
		return Ok(());
	};

	if captcha.kick {
		discord
			.http
			.kick_member(guild_id, user_id, Some("Captcha timeout"))
			.await?;
	}

	Ok(())
}

/// Drop the members who ran out of time, kicking them when asked to
pub(crate) async fn expire_queue(discord: &DiscordHandle, data: &Data) -> anyhow::Result<()> {
	for ((guild_id, user_id), ()) in data.captcha_queue.take_expired(Instant::now()) {
		if let Err(error) = expire_member(discord, data, guild_id, user_id).await {
			tracing::warn!(
				error = ?error,
				guild_id = guild_id.get(),
				user_id = user_id.get(),
				"could not expire a member who ignored the captcha",
			);
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::time::advance;

	fn captcha(mode: &str, word: Option<&str>) -> Captcha {
		Captcha {
			guild_id: 1,
			mode: mode.to_owned(),
			role_id: 2,
			channel_id: 3,
			word: word.map(ToOwned::to_owned),
			timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
			kick: false,
		}
	}

	fn typed(channel_id: u64, content: &str) -> Attempt<'_> {
		Attempt::Word {
			channel_id: ChannelId::new(channel_id),
			content,
		}
	}

	#[test]
	fn the_word_must_be_typed_in_the_captcha_channel() {
		let word = captcha(WORD_MODE, Some("ringo"));

		assert!(solves(&word, typed(3, "ringo")));
		assert!(solves(&word, typed(3, "  ringo\n")));
		assert!(!solves(&word, typed(3, "banana")));
		assert!(!solves(&word, typed(4, "ringo")));
		assert!(!solves(&word, Attempt::Click));
	}

	#[test]
	fn clicks_only_solve_click_captchas() {
		assert!(solves(&captcha(CLICK_MODE, None), Attempt::Click));
		assert!(!solves(&captcha(CLICK_MODE, None), typed(3, "ringo")));
		assert!(!solves(&captcha(WORD_MODE, None), typed(3, "")));
	}

	#[tokio::test(start_paused = true)]
	async fn expired_members_cannot_solve_the_captcha() {
		let queue = CaptchaQueue::new(Duration::from_secs(3600));
		let member = (GuildId::new(1), UserId::new(5));
		let click = captcha(CLICK_MODE, None);

		assert!(!accepts(&queue, member, &click, Attempt::Click));

		queue.set_with_lifetime(member, (), Duration::from_secs(60));
		assert!(accepts(&queue, member, &click, Attempt::Click));

		advance(Duration::from_secs(61)).await;
		assert!(!accepts(&queue, member, &click, Attempt::Click));
	}

	#[tokio::test(start_paused = true)]
	async fn members_leave_the_queue_after_their_timeout() {
		let queue = CaptchaQueue::new(Duration::from_secs(3600));
		let slow = (GuildId::new(1), UserId::new(2));
		let fast = (GuildId::new(1), UserId::new(3));

		queue.set_with_lifetime(slow, (), Duration::from_secs(60));
		queue.set_with_lifetime(fast, (), Duration::from_secs(600));

		advance(Duration::from_secs(61)).await;

		let expired = queue.take_expired(Instant::now());
		assert_eq!(expired, vec![(slow, ())]);
		assert!(!queue.contains_key(&slow));
		assert!(queue.contains_key(&fast));
	}
}
