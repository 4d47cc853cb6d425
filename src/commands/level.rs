//! Levels earned by talking, per server and across every server

use crate::{
	constants::{emojis, limits, NORMAL_COLOUR},
	database::models::{GlobalLevel, LevelGuild, LevelMember, LevelReward},
	globalchat::unicode_reaction,
	states::{ApplicationContext, ApplicationContextPolyfill, Data, InteractionResult},
	translation::Translate,
};
use fluent::fluent_args;
use poise::{
	command,
	serenity_prelude::{self as serenity, CreateEmbed, Message, Role, RoleId, User},
	ChoiceParameter, CreateReply,
};

/// Experience needed to leave `level`
#[must_use]
pub(crate) fn required_exp(level: u64) -> u64 {
	u128::from(level)
		.checked_pow(3)
		.and_then(|cube| cube.checked_mul(4))
		.and_then(|exp| u64::try_from((exp + 2) / 5).ok())
		.unwrap_or(u64::MAX)
}

/// Count one message, returns whether the level went up
pub(crate) fn gain(exp: &mut u64, level: &mut u64) -> bool {
	*exp = exp.saturating_add(1);

	if *exp >= required_exp(*level) {
		*level += 1;
		true
	} else {
		false
	}
}

/// Which ranking to show
#[derive(Debug, Clone, Copy, ChoiceParameter)]
pub(crate) enum RankingScope {
	/// Members of this server
	#[name = "server"]
	Server,
	/// Every user
	#[name = "global"]
	Global,
}

/// Level and level rewards
#[allow(clippy::unused_async)]
#[command(
	slash_command,
	category = "Individual",
	subcommands(
		"level_show",
		"level_ranking",
		"level_reward",
		"level_notification",
		"level_toggle"
	)
)]
pub(crate) async fn level(_: ApplicationContext<'_>) -> InteractionResult {
	Ok(())
}

/// Show the level of a user
#[command(slash_command, guild_only, rename = "show")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn level_show(ctx: ApplicationContext<'_>, user: Option<User>) -> InteractionResult {
	let guild_id = ctx.guild_only_id();
	let user = user.unwrap_or_else(|| ctx.interaction.user.clone());
	let mut connection = ctx.data.database.get().await?;

	let local = LevelMember::get_or_default(&mut connection, guild_id, user.id).await?;
	let global = GlobalLevel::get_or_default(&mut connection, user.id).await?;

	let embed = CreateEmbed::new()
		.title(ctx.translate(
			"level_show-title",
			Some(fluent_args!["user" => user.name.clone()]),
		))
		.thumbnail(user.face())
		.colour(NORMAL_COLOUR)
		.field(
			ctx.translate("level_show-server", None),
			format!("Level:`{}`, Exp:`{}`", local.level, local.exp),
			false,
		)
		.field(
			ctx.translate("level_show-global", None),
			format!("Level:`{}`, Exp:`{}`", global.level, global.exp),
			false,
		);

	ctx.send(CreateReply::default().embed(embed)).await?;

	Ok(())
}

/// Show the best members of this server, or the best users
#[command(slash_command, guild_only, rename = "ranking")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn level_ranking(
	ctx: ApplicationContext<'_>,
	scope: RankingScope,
	#[min = 1] page: Option<u32>,
) -> InteractionResult {
	let guild_id = ctx.guild_only_id();
	let mut connection = ctx.data.database.get().await?;

	let page_size = limits::RANKING_PAGE_SIZE;
	let offset = match scope {
		RankingScope::Server => {
			(usize::try_from(page.unwrap_or(1)).unwrap_or(1).max(1) - 1) * page_size
		}
		RankingScope::Global => 0,
	};

	let entries: Vec<(u64, u64, u64)> = match scope {
		RankingScope::Server => {
			let limit = i64::try_from(offset + page_size).unwrap_or(i64::MAX);

			LevelMember::top(&mut connection, guild_id, limit)
				.await?
				.into_iter()
				.skip(offset)
				.map(|member| (member.user_id, member.level, member.exp))
				.collect()
		}
		RankingScope::Global => GlobalLevel::top(
			&mut connection,
			i64::try_from(page_size).unwrap_or(i64::MAX),
		)
		.await?
		.into_iter()
		.map(|user| (user.user_id, user.level, user.exp))
		.collect(),
	};

	if entries.is_empty() {
		ctx.shout(ctx.translate("level_ranking-none", None))
			.await?;

		return Ok(());
	}

	let lines = entries
		.iter()
		.enumerate()
		.map(|(index, (user_id, level, exp))| {
			format!("{}. <@{user_id}> Level:`{level}`, Exp:`{exp}`", offset + index + 1)
		})
		.collect::<Vec<_>>()
		.join("\n");

	let title = match scope {
		RankingScope::Server => ctx.translate("level_ranking-server", None),
		RankingScope::Global => ctx.translate("level_ranking-global", None),
	};

	ctx.send(
		CreateReply::default().embed(
			CreateEmbed::new()
				.title(title)
				.description(lines)
				.colour(NORMAL_COLOUR),
		),
	)
	.await?;

	Ok(())
}

/// Roles given when reaching a level
#[allow(clippy::unused_async)]
#[command(
	slash_command,
	rename = "reward",
	subcommands("level_reward_set", "level_reward_delete", "level_reward_list")
)]
pub(crate) async fn level_reward(_: ApplicationContext<'_>) -> InteractionResult {
	Ok(())
}

/// Give a role when a member reaches a level
///
/// Parameters
/// ----------
/// level : int
///     The level to reach
/// role : role
///     The role to give
/// replace_role : role, optional
///     A role to take back at the same time
#[command(
	slash_command,
	guild_only,
	rename = "set",
	required_permissions = "MANAGE_ROLES",
	required_bot_permissions = "MANAGE_ROLES"
)]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn level_reward_set(
	ctx: ApplicationContext<'_>,
	#[min = 1] level: u64,
	role: Role,
	replace_role: Option<Role>,
) -> InteractionResult {
	LevelReward {
		guild_id: ctx.guild_only_id().get(),
		level,
		role_id: role.id.get(),
		replace_role_id: replace_role.map(|role| role.id.get()),
	}
	.upsert(&mut ctx.data.database.get().await?)
	.await?;

	ctx.shout(ctx.translate(
		"level_reward_set-success",
		Some(fluent_args!["level" => level, "role" => role.name]),
	))
	.await?;

	Ok(())
}

/// Stop rewarding a level
#[command(
	slash_command,
	guild_only,
	rename = "delete",
	required_permissions = "MANAGE_ROLES"
)]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn level_reward_delete(ctx: ApplicationContext<'_>, level: u64) -> InteractionResult {
	let removed = LevelReward::delete(
		&mut ctx.data.database.get().await?,
		ctx.guild_only_id(),
		level,
	)
	.await?;

	let key = if removed == 0 {
		"level_reward_delete-not-found"
	} else {
		"level_reward_delete-success"
	};
	ctx.shout(ctx.translate(key, Some(fluent_args!["level" => level])))
		.await?;

	Ok(())
}

/// List the level rewards of this server
#[command(slash_command, guild_only, rename = "list")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn level_reward_list(ctx: ApplicationContext<'_>) -> InteractionResult {
	let rewards =
		LevelReward::all_from_guild(&mut ctx.data.database.get().await?, ctx.guild_only_id())
			.await?;

	if rewards.is_empty() {
		ctx.shout(ctx.translate("level_reward_list-none", None))
			.await?;

		return Ok(());
	}

	let lines = rewards
		.iter()
		.map(|reward| {
			let replace = reward
				.replace_role_id
				.map(|role_id| format!(" (-<@&{role_id}>)"))
				.unwrap_or_default();

			format!("`{}`: <@&{}>{replace}", reward.level, reward.role_id)
		})
		.collect::<Vec<_>>()
		.join("\n");

	ctx.shout(format!(
		"**{}**\n{}",
		ctx.translate("level_reward_list-title", None),
		lines
	))
	.await?;

	Ok(())
}

/// Level up reactions
#[allow(clippy::unused_async)]
#[command(
	slash_command,
	rename = "notification",
	subcommands("level_notification_global", "level_notification_server")
)]
pub(crate) async fn level_notification(_: ApplicationContext<'_>) -> InteractionResult {
	Ok(())
}

/// React to your messages when you level up
#[command(slash_command, rename = "global")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn level_notification_global(
	ctx: ApplicationContext<'_>,
	enabled: bool,
) -> InteractionResult {
	let mut connection = ctx.data.database.get().await?;

	let mut global = GlobalLevel::get_or_default(&mut connection, ctx.interaction.user.id).await?;
	global.notify = enabled;
	global.upsert(&mut connection).await?;

	ctx.shout(ctx.translate(
		"level_notification-success",
		Some(fluent_args!["enabled" => enabled.to_string()]),
	))
	.await?;

	Ok(())
}

/// React to the messages of every member leveling up in this server
#[command(
	slash_command,
	guild_only,
	rename = "server",
	required_permissions = "MANAGE_GUILD"
)]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn level_notification_server(
	ctx: ApplicationContext<'_>,
	enabled: bool,
) -> InteractionResult {
	let mut connection = ctx.data.database.get().await?;

	let mut settings = LevelGuild::get_or_default(&mut connection, ctx.guild_only_id()).await?;
	settings.notify = enabled;
	settings.upsert(&mut connection).await?;

	ctx.shout(ctx.translate(
		"level_notification-success",
		Some(fluent_args!["enabled" => enabled.to_string()]),
	))
	.await?;

	Ok(())
}

/// Count levels in this server or not
#[command(
	slash_command,
	guild_only,
	rename = "toggle",
	required_permissions = "MANAGE_GUILD"
)]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn level_toggle(ctx: ApplicationContext<'_>, enabled: bool) -> InteractionResult {
	let mut connection = ctx.data.database.get().await?;

	let mut settings = LevelGuild::get_or_default(&mut connection, ctx.guild_only_id()).await?;
	settings.enabled = enabled;
	settings.upsert(&mut connection).await?;

	ctx.shout(ctx.translate(
		"level_toggle-success",
		Some(fluent_args!["enabled" => enabled.to_string()]),
	))
	.await?;

	Ok(())
}

/// Give the reward of a local level
async fn apply_reward(discord: &serenity::Context, message: &Message, reward: &LevelReward) {
	let Some(guild_id) = message.guild_id else {
		return;
	};
	let user_id = message.author.id;

	let added = discord
		.http
		.add_member_role(guild_id, user_id, RoleId::new(reward.role_id), Some("Level reward"))
		.await;
	let removed = match reward.replace_role_id {
		Some(role_id) => {
			discord
				.http
				.remove_member_role(guild_id, user_id, RoleId::new(role_id), Some("Level reward"))
				.await
		}
		None => Ok(()),
	};

	if let Err(error) = added.and(removed) {
		tracing::warn!(
			error = ?error,
			guild_id = guild_id.get(),
			user_id = user_id.get(),
			"could not apply a level reward",
		);
	}
}

/// Levels reached with one message
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct LevelUps {
	/// The new local level
	local: Option<u64>,
	/// Whether the global level went up
	global: bool,
}

/// Count a message for the local level, when the guild counts them, and for the global one
pub(crate) fn count_message(local: Option<&mut LevelMember>, global: &mut GlobalLevel) -> LevelUps {
	LevelUps {
		local: local.and_then(|local| gain(&mut local.exp, &mut local.level).then_some(local.level)),
		global: gain(&mut global.exp, &mut global.level),
	}
}

/// React to a message which leveled its author up
async fn react_level_up(discord: &serenity::Context, message: &Message, emoji: &str) {
	if let Err(error) = message.react(discord, unicode_reaction(emoji)).await {
		tracing::warn!(
			error = ?error,
			message_id = message.id.get(),
			"could not react to a level up",
		);
	}
}

/// Count a guild message
pub(crate) async fn on_message(
	discord: &serenity::Context,
	data: &Data,
	message: &Message,
) -> InteractionResult {
	let Some(guild_id) = message.guild_id else {
		return Ok(());
	};
	if message.author.bot {
		return Ok(());
	}

	let mut connection = data.database.get().await?;
	let settings = LevelGuild::get_or_default(&mut connection, guild_id).await?;
	let mut global = GlobalLevel::get_or_default(&mut connection, message.author.id).await?;
	let mut local = if settings.enabled {
		Some(LevelMember::get_or_default(&mut connection, guild_id, message.author.id).await?)
	} else {
		None
	};

	let ups = count_message(local.as_mut(), &mut global);

	if let Some(local) = &local {
		local.upsert(&mut connection).await?;
	}
	global.upsert(&mut connection).await?;

	let notify = settings.notify || global.notify;

	if let Some(level) = ups.local {
		if notify {
			react_level_up(discord, message, emojis::LEVEL_UP_LOCAL).await;
		}

		if let Some(reward) = LevelReward::get(&mut connection, guild_id, level).await? {
			apply_reward(discord, message, &reward).await;
		}
	}

	if ups.global && notify {
		react_level_up(discord, message, emojis::LEVEL_UP_GLOBAL).await;
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn required_exp_follows_the_cubic_curve() {
		assert_eq!(required_exp(0), 0);
		assert_eq!(required_exp(1), 1);
		assert_eq!(required_exp(2), 6);
		assert_eq!(required_exp(3), 22);
		assert_eq!(required_exp(10), 800);
		assert_eq!(required_exp(u64::MAX), u64::MAX);
	}

	#[test]
	fn levels_go_up_one_at_a_time() {
		let (mut exp, mut level) = (0, 0);

		assert!(gain(&mut exp, &mut level));
		assert_eq!((exp, level), (1, 1));
		assert!(gain(&mut exp, &mut level));
		assert_eq!((exp, level), (2, 2));

		let ups = (0..3).filter(|_| gain(&mut exp, &mut level)).count();
		assert_eq!((exp, level, ups), (5, 2, 0));

		assert!(gain(&mut exp, &mut level));
		assert_eq!((exp, level), (6, 3));
	}

	fn member(exp: u64, level: u64) -> LevelMember {
		LevelMember {
			guild_id: 1,
			user_id: 2,
			exp,
			level,
		}
	}

	fn global(exp: u64, level: u64) -> GlobalLevel {
		GlobalLevel {
			user_id: 2,
			exp,
			level,
			notify: false,
		}
	}

	#[test]
	fn messages_count_locally_and_globally() {
		let mut local = member(5, 2);
		let mut user = global(10, 5);

		let ups = count_message(Some(&mut local), &mut user);

		assert_eq!(ups, LevelUps { local: Some(3), global: false });
		assert_eq!((local.exp, local.level), (6, 3));
		assert_eq!((user.exp, user.level), (11, 5));
	}

	#[test]
	fn disabled_guilds_only_count_globally() {
		let mut user = global(0, 0);

		let ups = count_message(None, &mut user);

		assert_eq!(ups, LevelUps { local: None, global: true });
		assert_eq!((user.exp, user.level), (1, 1));
	}
}
