//! Act on discord client metadata

use crate::states::{ApplicationContext, Command, InteractionResult};
use poise::{
	command,
	serenity_prelude::{self as serenity, CreateCommand, GuildId, Http},
};

mod register;
mod stats;

use register::debug_register;
use stats::debug_stats;

/// A set of commands restricted to owners
#[allow(clippy::unused_async)]
#[command(
	slash_command,
	owners_only,
	hide_in_help,
	subcommands("debug_register", "debug_stats")
)]
pub(crate) async fn debug(_: ApplicationContext<'_>) -> InteractionResult {
	Ok(())
}

/// Builders of every slash and context menu command
fn command_builders(commands: &[Command]) -> Vec<CreateCommand> {
	let mut commands_collector = Vec::new();

	for command in commands {
		if let Some(slash_command) = command.create_as_slash_command() {
			commands_collector.push(slash_command);
		}

		if let Some(context_menu_command) = command.create_as_context_menu_command() {
			commands_collector.push(context_menu_command);
		}
	}

	commands_collector
}

/// Register all development slash commands
pub(crate) async fn register_(
	http: &Http,
	guild_id: &GuildId,
	commands: &[Command],
) -> Result<usize, serenity::Error> {
	let builders = command_builders(commands);
	let count = builders.len();

	guild_id.set_commands(http, builders).await?;

	Ok(count)
}

/// Register every slash command for all guilds
///
/// Discord can take up to an hour to propagate global commands.
pub(crate) async fn register_globally_(
	http: &Http,
	commands: &[Command],
) -> Result<usize, serenity::Error> {
	let builders = command_builders(commands);
	let count = builders.len();

	serenity::Command::set_global_commands(http, builders).await?;

	Ok(count)
}
