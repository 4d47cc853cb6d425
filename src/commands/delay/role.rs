//! Give a role to members some time after they joined

use super::now_timestamp;
use crate::{
	constants::limits,
	database::{models::DelayRole, DatabasePooledConnection},
	states::{ApplicationContext, ApplicationContextPolyfill, DiscordHandle, InteractionResult},
	translation::Translate,
};
use fluent::fluent_args;
use poise::{
	command,
	serenity_prelude::{Guild, GuildId, Role, RoleId, UserId},
};
use std::collections::HashMap;

/// Give a role some time after members joined
#[allow(clippy::unused_async)]
#[command(
	slash_command,
	category = "ServerTool",
	subcommands("delayrole_set", "delayrole_delete", "delayrole_list"),
	default_member_permissions = "MANAGE_ROLES",
	required_bot_permissions = "MANAGE_ROLES"
)]
pub(crate) async fn delayrole(_: ApplicationContext<'_>) -> InteractionResult {
	Ok(())
}

/// Give a role to members once they stayed long enough
///
/// Parameters
/// ----------
/// delay : int
///     Seconds a member has to stay before getting the role
/// role : role
///     The role to give
#[command(slash_command, guild_only, rename = "set")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn delayrole_set(
	ctx: ApplicationContext<'_>,
	#[min = 1] delay: u64,
	role: Role,
) -> InteractionResult {
	let guild_id = ctx.guild_only_id();
	let mut connection = ctx.data.database.get().await?;

	let settings = DelayRole::all_from_guild(&mut connection, guild_id).await?;
	let replaces = settings.iter().any(|setting| setting.role_id == role.id.get());

	let count = i64::try_from(settings.len()).unwrap_or(i64::MAX);
	if !replaces && count >= limits::MAX_DELAY_ROLES_PER_GUILD {
		ctx.shout(ctx.translate(
			"delayrole_set-too-many",
			Some(fluent_args!["max" => limits::MAX_DELAY_ROLES_PER_GUILD]),
		))
		.await?;

		return Ok(());
	}

	DelayRole {
		role_id: role.id.get(),
		guild_id: guild_id.get(),
		delay,
	}
	.upsert(&mut connection)
	.await?;

	ctx.shout(ctx.translate(
		"delayrole_set-success",
		Some(fluent_args!["role" => role.name, "delay" => delay]),
	))
	.await?;

	Ok(())
}

/// Stop giving a role
#[command(slash_command, guild_only, rename = "delete")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn delayrole_delete(ctx: ApplicationContext<'_>, role: Role) -> InteractionResult {
	let removed = DelayRole::delete(&mut ctx.data.database.get().await?, role.id).await?;

	let key = if removed == 0 {
		"delayrole_delete-not-found"
	} else {
		"delayrole_delete-success"
	};
	ctx.shout(ctx.translate(key, Some(fluent_args!["role" => role.name])))
		.await?;

	Ok(())
}

/// List the delayed roles of this server
#[command(slash_command, guild_only, rename = "list")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn delayrole_list(ctx: ApplicationContext<'_>) -> InteractionResult {
	let guild_id = ctx.guild_only_id();
	let settings = DelayRole::all_from_guild(&mut ctx.data.database.get().await?, guild_id).await?;

	if settings.is_empty() {
		ctx.shout(ctx.translate("delayrole_list-none", None)).await?;

		return Ok(());
	}

	let lines = settings
		.iter()
		.map(|setting| format!("<@&{}>: {}s", setting.role_id, setting.delay))
		.collect::<Vec<_>>()
		.join("\n");

	ctx.shout(format!(
		"**{}**\n{}",
		ctx.translate("delayrole_list-title", None),
		lines
	))
	.await?;

	Ok(())
}

/// Whether a member who joined at `joined_at` waited `delay` seconds
fn waited_enough(joined_at: i64, delay: u64, now: i64) -> bool {
	now.saturating_sub(joined_at) >= i64::try_from(delay).unwrap_or(i64::MAX)
}

/// Members to give a role to, and the roles that no longer exist
fn plan_grants(
	guild: &Guild,
	settings: &[DelayRole],
	now: i64,
) -> (Vec<(UserId, RoleId)>, Vec<RoleId>) {
	let mut grants = Vec::new();
	let mut missing_roles = Vec::new();

	for setting in settings {
		let role_id = RoleId::new(setting.role_id);
		if !guild.roles.contains_key(&role_id) {
			missing_roles.push(role_id);
			continue;
		}

		for member in guild.members.values() {
			let Some(joined_at) = member.joined_at else {
				continue;
			};

			if !member.user.bot
				&& !member.roles.contains(&role_id)
				&& waited_enough(joined_at.unix_timestamp(), setting.delay, now)
			{
				grants.push((member.user.id, role_id));
			}
		}
	}

	(grants, missing_roles)
}

/// Give every delayed role that became due
pub(crate) async fn grant_delayed_roles(
	discord: &DiscordHandle,
	connection: &mut DatabasePooledConnection,
) -> anyhow::Result<()> {
	let mut per_guild: HashMap<GuildId, Vec<DelayRole>> = HashMap::new();
	for setting in DelayRole::all(connection).await? {
		per_guild
			.entry(GuildId::new(setting.guild_id))
			.or_default()
			.push(setting);
	}

	let now = now_timestamp();

	for (guild_id, settings) in per_guild {
		let plan = discord
			.cache
			.guild(guild_id)
			.map(|guild| plan_grants(&guild, &settings, now));

		let Some((grants, missing_roles)) = plan else {
			tracing::debug!(guild_id = guild_id.get(), "guild is not cached, keeping its delayed roles");
			continue;
		};

		for role_id in missing_roles {
			DelayRole::delete(connection, role_id).await?;
		}

		for (user_id, role_id) in grants {
			if let Err(error) = discord
				.http
				.add_member_role(guild_id, user_id, role_id, Some("Delay role"))
				.await
			{
				tracing::warn!(
					error = ?error,
					guild_id = guild_id.get(),
					user_id = user_id.get(),
					"could not give a delayed role",
				);
			}
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::waited_enough;

	#[test]
	fn members_wait_the_whole_delay() {
		assert!(waited_enough(1_000, 60, 1_060));
		assert!(waited_enough(1_000, 0, 1_000));
		assert!(!waited_enough(1_000, 60, 1_059));
		assert!(!waited_enough(1_000, u64::MAX, i64::MAX));
	}
}
