//! Browse the commands of the bot

use crate::{
	constants::NORMAL_COLOUR,
	help::{DocLanguage, HelpCommand, HelpIndex},
	states::{ApplicationContext, ApplicationContextPolyfill, InteractionResult},
	translation::Translate,
};
use fluent::fluent_args;
use poise::{
	command,
	serenity_prelude::{CreateEmbed, CreateEmbedFooter},
	CreateReply,
};

/// Maximum suggestions Discord shows
const AUTOCOMPLETE_LIMIT: usize = 25;

/// Suggest the commands starting with the typed text
#[allow(clippy::unused_async)]
async fn autocomplete_command(ctx: ApplicationContext<'_>, partial: &str) -> Vec<String> {
	let partial = partial.trim_start_matches('/').to_lowercase();

	ctx.data
		.help
		.get()
		.map(HelpIndex::qualified_names)
		.unwrap_or_default()
		.into_iter()
		.filter(|name| name.starts_with(&partial))
		.take(AUTOCOMPLETE_LIMIT)
		.map(ToOwned::to_owned)
		.collect()
}

/// List a group of commands, one line each
fn list_commands(commands: &[HelpCommand], locale: &str) -> String {
	commands
		.iter()
		.map(|command| {
			format!(
				"`/{}` {}\n",
				command.qualified_name,
				command.description_in(locale).unwrap_or("-")
			)
		})
		.collect()
}

/// Show the commands of the bot
///
/// Parameters
/// ----------
/// command : str, optional
///     A command or group to show the details of
#[command(slash_command, category = "RT")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn help(
	ctx: ApplicationContext<'_>,
	#[autocomplete = "autocomplete_command"] command: Option<String>,
) -> InteractionResult {
	let Some(index) = ctx.data.help.get() else {
		ctx.shout(ctx.translate("help-not-ready", None)).await?;

		return Ok(());
	};
	let locale = ctx.interaction.locale.as_str();

	let embed = match command.as_deref() {
		None => {
			let mut embed = CreateEmbed::new()
				.title(ctx.translate("help-title", None))
				.description(ctx.translate(
					"help-root-description",
					Some(fluent_args!["url" => ctx.data.config.public_url("help")]),
				));

			for (category, commands) in index.categories() {
				embed = embed.field(category, list_commands(commands, locale), false);
			}

			embed.footer(CreateEmbedFooter::new(ctx.translate("help-footer", None)))
		}
		Some(name) => {
			let Some(command) = index.find(name) else {
				ctx.shout(ctx.translate(
					"help-not-found",
					Some(fluent_args!["command" => name.to_owned()]),
				))
				.await?;

				return Ok(());
			};

			let mut description = format!(
				"{}\n```\n{}\n```",
				command.description_in(locale).unwrap_or("-"),
				command.usage()
			);

			if command.subcommands.is_empty() {
				if let Some(docs) = command.render_docs(DocLanguage::from_locale(locale)) {
					description.push('\n');
					description.push_str(&docs);
				}
			} else {
				description.push('\n');
				description.push_str(&list_commands(&command.subcommands, locale));
			}

			CreateEmbed::new()
				.title(format!("/{}", command.qualified_name))
				.description(description)
		}
	};

	ctx.send(CreateReply::default().embed(embed.colour(NORMAL_COLOUR)).ephemeral(true))
		.await?;

	Ok(())
}
