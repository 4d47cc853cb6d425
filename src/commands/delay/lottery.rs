//! Lotteries drawn among the users who reacted to a panel

use super::{guild_is_cached, now_timestamp};
use crate::{
	constants::{emojis, events, limits, NORMAL_COLOUR},
	database::{
		models::{DelayLottery, NewDelayLottery},
		DatabasePooledConnection,
	},
	globalchat::unicode_reaction,
	states::{
		ApplicationContext, ApplicationContextPolyfill, DiscordHandle, InteractionResult,
		MessageComponentContext,
	},
	translation::Translate,
};
use fluent::fluent_args;
use poise::{
	command,
	serenity_prelude::{
		self as serenity, ButtonStyle, CreateActionRow, CreateButton, CreateEmbed,
		CreateEmbedFooter, CreateMessage, GuildId, Message, Timestamp, User, UserId,
	},
};
use rand::{seq::SliceRandom, Rng};

/// Users fetched per reaction page
const REACTION_PAGE: u8 = 100;

/// Create a panel drawing winners among the users who react
///
/// Parameters
/// ----------
/// winners : int
///     Number of users to pick
/// minutes : int
///     Minutes before the draw
/// title : str
///     Title of the panel
/// details : str
///     Explanation shown on the panel
///
/// Notes
/// -----
/// Up to 30 panels can wait in a server. Only the author can cancel a panel.
#[command(
	slash_command,
	guild_only,
	category = "ServerTool",
	default_member_permissions = "MANAGE_MESSAGES",
	required_bot_permissions = "ADD_REACTIONS | SEND_MESSAGES"
)]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn delaylottery(
	ctx: ApplicationContext<'_>,
	#[min = 1] winners: u32,
	#[min = 1] minutes: u32,
	title: String,
	details: Option<String>,
) -> InteractionResult {
	let guild_id = ctx.guild_only_id();
	let mut connection = ctx.data.database.get().await?;

	if DelayLottery::count_in_guild(&mut connection, guild_id).await?
		>= limits::MAX_DELAY_LOTTERIES_PER_GUILD
	{
		ctx.shout(ctx.translate(
			"delaylottery-too-many",
			Some(fluent_args!["max" => limits::MAX_DELAY_LOTTERIES_PER_GUILD]),
		))
		.await?;

		return Ok(());
	}

	let draw_at = now_timestamp() + i64::from(minutes) * 60;
	let footer = ctx.translate(
		"delaylottery-panel-footer",
		Some(fluent_args!["winners" => winners]),
	);

	let mut embed = CreateEmbed::new()
		.title(title)
		.colour(NORMAL_COLOUR)
		.footer(CreateEmbedFooter::new(footer))
		.timestamp(Timestamp::from_unix_timestamp(draw_at).unwrap_or_else(|_| Timestamp::now()));
	if let Some(details) = details {
		embed = embed.description(details);
	}

	let panel = ctx
		.interaction
		.channel_id
		.send_message(
			ctx.serenity_context,
			CreateMessage::new()
				.embed(embed)
				.components(vec![CreateActionRow::Buttons(vec![CreateButton::new(
					events::LOTTERY_CANCEL_BUTTON_INTERACTION,
				)
				.style(ButtonStyle::Danger)
				.label(ctx.translate("delaylottery-cancel-button", None))])]),
		)
		.await?;

	panel
		.react(ctx.serenity_context, unicode_reaction(emojis::CHECK))
		.await?;

	NewDelayLottery {
		guild_id: guild_id.get(),
		channel_id: panel.channel_id.get(),
		message_id: panel.id.get(),
		author_id: ctx.interaction.user.id.get(),
		winners,
		draw_at,
	}
	.insert(&mut connection)
	.await?;

	ctx.shout(ctx.translate("delaylottery-success", None))
		.await?;

	Ok(())
}

/// Cancel a lottery from its panel button
#[tracing::instrument(skip_all, fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn cancel_lottery(ctx: MessageComponentContext<'_>) -> InteractionResult {
	let mut connection = ctx.data.database.get().await?;
	let panel = &ctx.interaction.message;

	let Some(lottery) = DelayLottery::from_message(&mut connection, panel.id).await? else {
		ctx.shout(ctx.translate("delaylottery-unknown", None))
			.await?;

		return Ok(());
	};

	if lottery.author_id != ctx.interaction.user.id.get() {
		ctx.shout(ctx.translate("delaylottery-not-author", None))
			.await?;

		return Ok(());
	}

	DelayLottery::delete(&mut connection, lottery.id).await?;
	panel.delete(&ctx).await?;

	ctx.send(
		poise::CreateReply::default().content(ctx.translate("delaylottery-cancelled", None)),
	)
	.await?;

	Ok(())
}

/// Pick `winners` participants, or all of them when there are not enough
pub(crate) fn draw_winners<T: Clone>(
	participants: &[T],
	winners: usize,
	rng: &mut impl Rng,
) -> Vec<T> {
	participants
		.choose_multiple(rng, winners.min(participants.len()))
		.cloned()
		.collect()
}

/// Every non bot user who reacted with the check mark
async fn participants(discord: &DiscordHandle, panel: &Message) -> serenity::Result<Vec<UserId>> {
	let mut participants = Vec::new();
	let mut after = None;

	loop {
		let page: Vec<User> = panel
			.reaction_users(
				discord,
				unicode_reaction(emojis::CHECK),
				Some(REACTION_PAGE),
				after,
			)
			.await?;

		let len = page.len();
		after = page.last().map(|user| user.id);
		participants.extend(page.into_iter().filter(|user| !user.bot).map(|user| user.id));

		if len < usize::from(REACTION_PAGE) {
			break;
		}
	}

	Ok(participants)
}

/// Draw one lottery and announce the winners, the row is dropped once announced
async fn draw_one(
	discord: &DiscordHandle,
	connection: &mut DatabasePooledConnection,
	lottery: &DelayLottery,
) -> anyhow::Result<()> {
	let channel_id = serenity::ChannelId::new(lottery.channel_id);
	let panel = match channel_id
		.message(discord, serenity::MessageId::new(lottery.message_id))
		.await
	{
		Ok(panel) => panel,
		Err(error) => {
			tracing::debug!(error = ?error, "lottery panel is gone");
			DelayLottery::delete(connection, lottery.id).await?;
			return Ok(());
		}
	};

	let participants = participants(discord, &panel).await?;
	let winners = draw_winners(
		&participants,
		usize::try_from(lottery.winners).unwrap_or(usize::MAX),
		&mut rand::thread_rng(),
	);

	let mentions = if winners.is_empty() {
		"-".to_owned()
	} else {
		winners
			.iter()
			.map(|user_id| format!("<@{user_id}>"))
			.collect::<Vec<_>>()
			.join(" ")
	};

	let title = panel
		.embeds
		.first()
		.and_then(|embed| embed.title.clone())
		.unwrap_or_default();

	channel_id
		.send_message(
			discord,
			CreateMessage::new()
				.reference_message(&panel)
				.embed(
					CreateEmbed::new()
						.title(format!("{} {title}", emojis::CHECK))
						.description(mentions)
						.colour(NORMAL_COLOUR),
				),
		)
		.await?;

	DelayLottery::delete(connection, lottery.id).await?;

	Ok(())
}

/// Whether a lottery that failed to be drawn is dropped
///
/// Discord refusing the request will not change on the next run, other failures are retried.
fn drops_failed_lottery(error: &anyhow::Error) -> bool {
	matches!(
		error.downcast_ref::<serenity::Error>(),
		Some(serenity::Error::Http(_))
	)
}

/// Draw every lottery whose time has come
pub(crate) async fn draw(
	discord: &DiscordHandle,
	connection: &mut DatabasePooledConnection,
) -> anyhow::Result<()> {
	for lottery in DelayLottery::due(connection, now_timestamp()).await? {
		let guild_id = GuildId::new(lottery.guild_id);
		if !guild_is_cached(&discord.cache, guild_id) {
			tracing::debug!(guild_id = guild_id.get(), "guild is not cached, keeping its lottery");
			continue;
		}

		if let Err(error) = draw_one(discord, connection, &lottery).await {
			let dropped = drops_failed_lottery(&error);
			tracing::warn!(
				error = ?error,
				lottery_id = lottery.id,
				dropped = dropped,
				"could not draw a lottery",
			);

			if dropped {
				DelayLottery::delete(connection, lottery.id).await?;
			}
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::{draw_winners, drops_failed_lottery};
	use poise::serenity_prelude as serenity;
	use rand::{rngs::StdRng, SeedableRng};
	use std::collections::HashSet;

	#[test]
	fn draws_distinct_winners() {
		let mut rng = StdRng::seed_from_u64(7);
		let participants = (0..20).collect::<Vec<u32>>();

		let winners = draw_winners(&participants, 5, &mut rng);

		assert_eq!(winners.len(), 5);
		assert_eq!(winners.iter().collect::<HashSet<_>>().len(), 5);
		assert!(winners.iter().all(|winner| participants.contains(winner)));
	}

	#[test]
	fn draws_everyone_when_short_of_participants() {
		let mut rng = StdRng::seed_from_u64(7);

		assert_eq!(draw_winners(&[1, 2], 5, &mut rng).len(), 2);
		assert!(draw_winners::<u8>(&[], 3, &mut rng).is_empty());
	}

	#[test]
	fn failed_lotteries_are_retried_unless_discord_refused() {
		let other = anyhow::Error::from(serenity::Error::Other("gateway hiccup"));
		let database = anyhow::Error::from(diesel::result::Error::NotFound);

		assert!(!drops_failed_lottery(&other));
		assert!(!drops_failed_lottery(&database));
	}
}
