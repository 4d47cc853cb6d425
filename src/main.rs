//! RT, a multi-feature Discord bot and its backend

mod auth;
mod cacher;
mod commands;
mod constants;
mod database;
mod events;
mod globalchat;
mod help;
mod logging;
mod minesweeper;
mod polyfill;
mod rtws;
mod server;
mod states;
mod tasks;
mod translation;

use crate::{
	commands::{command_on_error, post_command, pre_command},
	database::run_migrations,
	events::event_handler,
	help::HelpIndex,
	logging::setup_logging,
	server::start_server,
	states::{ArcData, Data, Framework},
};
use anyhow::{anyhow, Context};
use poise::serenity_prelude::{ClientBuilder, GatewayIntents};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::instrument;

/// Build the `poise` [framework](poise::Framework)
#[instrument]
fn build_framework(data: ArcData) -> Framework {
	Framework::builder()
		.setup({
			let data = Arc::clone(&data);
			move |_ctx, _ready, _framework| Box::pin(async move { Ok(data) })
		})
		.options(poise::FrameworkOptions {
			pre_command,
			on_error: command_on_error,
			post_command,
			event_handler: |ctx, event, fw, data| Box::pin(event_handler(ctx, event, fw, data)),
			commands: {
				use commands::{
					afk::afk, captcha::captcha, delay, globalchat::globalchat, help::help, helpers,
					level::level, minesweeper::minesweeper, short_url::url,
				};

				#[rustfmt::skip]
				let mut commands = vec![
					globalchat(),
					delay::delayrole(),
					delay::delaydelete(),
					delay::delaylottery(),
					captcha(),
					level(),
					afk(),
					url(),
					minesweeper(),
					help(),
					helpers::debug(),
				];

				data.translations
					.apply_translations_to_interactions(&mut commands, None);

				if data.help.set(HelpIndex::from_commands(&commands)).is_err() {
					tracing::warn!("help index was already built");
				}

				commands
			},
			..Default::default()
		})
		.initialize_owners(true)
		.build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let data = Arc::new(Data::new()?);

	setup_logging(&data)?;

	run_migrations(data.config.database_url.expose_secret()).context("failed to run migrations")?;

	let framework = build_framework(Arc::clone(&data));
	let _handle = start_server(Arc::clone(&data))
		.await
		.context("failed to start the backend")?;

	let mut client = ClientBuilder::new(
		data.config.discord_token.expose_secret(),
		GatewayIntents::GUILDS
			| GatewayIntents::GUILD_MEMBERS
			| GatewayIntents::GUILD_MODERATION
			| GatewayIntents::GUILD_MESSAGES
			| GatewayIntents::GUILD_MESSAGE_REACTIONS
			| GatewayIntents::DIRECT_MESSAGES
			| GatewayIntents::MESSAGE_CONTENT,
	)
	.framework(framework)
	.await?;

	if let Err(error) = client.start().await {
		return Err(anyhow!("Client exited with error: {}", error));
	}

	Ok(())
}
