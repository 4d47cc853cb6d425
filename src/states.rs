//! Handles all the states of the bot and initial configuration

use crate::{
	auth::DiscordAuthentification,
	cacher::{Cacher, CacherPool},
	commands::afk::AfkCache,
	database::DatabasePool,
	globalchat::GlobalChatState,
	help::HelpIndex,
	polyfill,
	rtws::RtwsHandle,
	translation::Translations,
};
use anyhow::{anyhow, Context as _};
use diesel_async::{
	pooled_connection::{
		deadpool::{Pool, PoolError},
		AsyncDieselConnectionManager,
	},
	AsyncMysqlConnection,
};
use dotenvy::dotenv;
use oauth2::{ClientId, ClientSecret};
use poise::{
	async_trait, send_application_reply,
	serenity_prelude::{self as serenity, ChannelId, GuildId, UserId},
	CreateReply, ReplyHandle,
};
use secrecy::{ExposeSecret, SecretString};
use std::{
	env::{self, VarError},
	fmt,
	sync::{atomic::AtomicBool, Arc, OnceLock},
};
use tokio::time::Duration;
use unic_langid::LanguageIdentifier;

/// App global configuration
#[derive(Debug)]
pub(crate) struct Config {
	/// The token needed to access the `Discord` Api
	pub(crate) discord_token: SecretString,
	/// The guild on witch you can access development commands
	pub(crate) discord_development_guild: GuildId,
	/// The `MySQL` connection uri
	pub(crate) database_url: SecretString,
	/// The `Discord` application `OAuth2` client id and secret pair
	pub(crate) discord_client: (ClientId, ClientSecret),
	/// The public host of the backend
	///
	/// Example: `rt.some.domain`
	pub(crate) server_url: String,
	/// The dashboard `WebSocket` endpoint, the bridge is disabled without it
	pub(crate) rtws_url: Option<String>,
	/// Channel where global chat messages are exchanged with other bots
	pub(crate) globalchat_share_channel: Option<ChannelId>,

	/// The default locale to use
	pub(crate) default_locale: LanguageIdentifier,
	/// Whether or not to use production defaults
	///
	/// Currently only affects logging
	pub(crate) production: bool,
	/// Whether to expose the runtime to `tokio-console`
	pub(crate) tokio_console: bool,
}

/// Resolve an environment variable or return an appropriate error
fn required_env_var(name: &str) -> anyhow::Result<String> {
	match env::var(name) {
		Ok(val) => Ok(val),
		Err(VarError::NotPresent) => Err(anyhow!("{} must be set in the environnement", name)),
		Err(VarError::NotUnicode(_)) => {
			Err(anyhow!("{} does not contains Unicode valid text", name))
		}
	}
}

/// Resolve an environment variable that may be missing
fn optional_env_var(name: &str) -> anyhow::Result<Option<String>> {
	match env::var(name) {
		Ok(val) if val.is_empty() => Ok(None),
		Ok(val) => Ok(Some(val)),
		Err(VarError::NotPresent) => Ok(None),
		Err(VarError::NotUnicode(_)) => {
			Err(anyhow!("{} does not contains Unicode valid text", name))
		}
	}
}

/// Parse a boolean flag, `false` when missing
fn flag_env_var(name: &str) -> anyhow::Result<bool> {
	optional_env_var(name)?.map_or(Ok(false), |value| {
		value
			.parse::<bool>()
			.map_err(|_| anyhow!("{} environnement variable must be a `bool`", name))
	})
}

impl Config {
	/// Parse the config from `.env` file
	fn from_dotenv() -> anyhow::Result<Self> {
		// A missing `.env` is fine when the variables come from the environment
		if let Err(error) = dotenv() {
			if !error.not_found() {
				return Err(error.into());
			}
		}

		let discord_development_guild = required_env_var("DISCORD_DEV_GUILD")?
			.parse::<u64>()
			.map_err(|_| anyhow!("DISCORD_DEV_GUILD environnement variable must be a `u64`"))?;

		let globalchat_share_channel = optional_env_var("GLOBALCHAT_SHARE_CHANNEL")?
			.map(|id| {
				id.parse::<u64>().map_err(|_| {
					anyhow!("GLOBALCHAT_SHARE_CHANNEL environnement variable must be a `u64`")
				})
			})
			.transpose()?
			.map(ChannelId::new);

		let default_locale = required_env_var("DEFAULT_LOCALE")?
			.parse::<LanguageIdentifier>()
			.map_err(|_| {
				anyhow!("DEFAULT_LOCALE environnement variable must be a `LanguageIdentifier`")
			})?;

		Ok(Self {
			discord_token: SecretString::from(required_env_var("DISCORD_TOKEN")?),
			discord_development_guild: GuildId::new(discord_development_guild),
			database_url: SecretString::from(required_env_var("DATABASE_URL")?),
			discord_client: (
				ClientId::new(required_env_var("DISCORD_CLIENT_ID")?),
				ClientSecret::new(required_env_var("DISCORD_CLIENT_SECRET")?),
			),
			server_url: required_env_var("SERVER_URL")?,
			rtws_url: optional_env_var("RTWS_URL")?,
			globalchat_share_channel,

			default_locale,
			production: flag_env_var("PRODUCTION")?,
			tokio_console: flag_env_var("TOKIO_CONSOLE")?,
		})
	}

	/// Public address of a backend path
	#[must_use]
	pub(crate) fn public_url(&self, path: &str) -> String {
		format!("https://{}/{}", self.server_url, path.trim_start_matches('/'))
	}
}

/// The gateway cache and the REST client, available once the bot is ready
#[derive(Clone)]
pub(crate) struct DiscordHandle {
	/// The gateway cache
	pub(crate) cache: Arc<serenity::Cache>,
	/// The REST client
	pub(crate) http: Arc<serenity::Http>,
}

impl fmt::Debug for DiscordHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DiscordHandle").finish_non_exhaustive()
	}
}

impl AsRef<serenity::Http> for DiscordHandle {
	fn as_ref(&self) -> &serenity::Http {
		&self.http
	}
}

impl serenity::CacheHttp for DiscordHandle {
	fn http(&self) -> &serenity::Http {
		&self.http
	}

	fn cache(&self) -> Option<&Arc<serenity::Cache>> {
		Some(&self.cache)
	}
}

/// App global data
pub(crate) struct Data {
	/// An access to the database
	pub(crate) database: DatabasePool,
	/// A instance of the auth provider
	pub(crate) auth: DiscordAuthentification,
	/// An instance of the parsed initial config
	pub(crate) config: Config,
	/// The translations for the client
	pub(crate) translations: Translations,

	/// Every swept cache
	pub(crate) cachers: Arc<CacherPool>,
	/// Relay caches of the global chat
	pub(crate) globalchat: GlobalChatState,
	/// Members waiting to solve the captcha, keyed by guild and user
	///
	/// Not part of the pool, expired entries are taken by the captcha worker
	pub(crate) captcha_queue: Cacher<(GuildId, UserId), ()>,
	/// Known away messages
	pub(crate) afk: AfkCache,

	/// Set once the gateway is ready
	pub(crate) discord: OnceLock<DiscordHandle>,
	/// Set once connected to the dashboard
	pub(crate) rtws: OnceLock<RtwsHandle>,
	/// Built with the command tree
	pub(crate) help: OnceLock<HelpIndex>,
	/// Whether the background workers were spawned
	pub(crate) workers_started: AtomicBool,
}

impl fmt::Debug for Data {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Data")
			.field("auth", &&self.auth)
			.field("config", &&self.config)
			.field("translations", &&self.translations)
			.field("cachers", &&self.cachers)
			.finish_non_exhaustive()
	}
}

impl Data {
	/// Parse the bot data from
	pub(crate) fn new() -> anyhow::Result<Self> {
		let config = Config::from_dotenv()?;

		let manager = AsyncDieselConnectionManager::<AsyncMysqlConnection>::new(
			config.database_url.expose_secret(),
		);
		let database = Pool::builder(manager)
			.build()
			.context("failed to create database pool")?;

		let translations = Translations::from_folder("translations", config.default_locale.clone())
			.context("failed to load translations")?;

		let cachers = Arc::new(CacherPool::default());

		Ok(Self {
			database,
			auth: DiscordAuthentification::new(&config, &cachers)?,
			globalchat: GlobalChatState::new(&cachers),
			captcha_queue: Cacher::new(Duration::from_secs(60 * 60)),
			afk: AfkCache::new(&cachers),
			cachers,
			config,
			translations,

			discord: OnceLock::new(),
			rtws: OnceLock::new(),
			help: OnceLock::new(),
			workers_started: AtomicBool::new(false),
		})
	}

	/// The gateway cache and REST client
	///
	/// # Errors
	/// Before the bot received the `Ready` event
	pub(crate) fn discord(&self) -> Result<&DiscordHandle, Error> {
		self.discord
			.get()
			.ok_or_else(|| Error::Other(anyhow!("the gateway is not ready yet")))
	}
}

/// Trait for sending ephemeral messages
#[async_trait]
pub(crate) trait ApplicationContextPolyfill<'a>: Send + Sync {
	/// Send a message to the user
	async fn send(self, reply: CreateReply) -> Result<ReplyHandle<'a>, serenity::Error>;

	/// Send an ephemeral message to the user
	async fn shout(
		&self,
		content: impl Into<String> + Send,
	) -> Result<ReplyHandle<'_>, serenity::Error>;

	/// Get a [`GuildId`] in a `guild_only` interaction context
	///
	/// # Panics
	/// If used in a non `guild_only` interaction context
	fn guild_only_id(&self) -> GuildId;
}

#[async_trait]
impl<'a> ApplicationContextPolyfill<'a> for ApplicationContext<'a> {
	#[inline]
	async fn send(self, builder: CreateReply) -> Result<ReplyHandle<'a>, serenity::Error> {
		send_application_reply(self, builder).await
	}

	#[inline]
	async fn shout(
		&self,
		content: impl Into<String> + Send,
	) -> Result<ReplyHandle<'_>, serenity::Error> {
		self.send(CreateReply::default().content(content).ephemeral(true))
			.await
	}

	#[inline]
	fn guild_only_id(&self) -> GuildId {
		if self.command.guild_only {
			self.interaction.guild_id.expect("guild_only interactions")
		} else {
			panic!("Should be used only in guild_only interactions")
		}
	}
}

/// Trait for sending ephemeral messages
#[async_trait]
pub(crate) trait ContextPolyfill: Send + Sync {
	/// Send an ephemeral message to the user
	async fn shout(
		&self,
		content: impl Into<String> + Send,
	) -> Result<ReplyHandle<'_>, serenity::Error>;
}

#[async_trait]
impl ContextPolyfill for Context<'_> {
	#[inline]
	async fn shout(
		&self,
		content: impl Into<String> + Send,
	) -> Result<ReplyHandle<'_>, serenity::Error> {
		self.send(CreateReply::default().content(content).ephemeral(true))
			.await
	}
}

/// Common wrapper for the [`Data`]
pub(crate) type ArcData = Arc<Data>;
/// Common interaction or event error type
pub(crate) type InteractionError = Error;
/// Common interaction or event return type
pub(crate) type InteractionResult = Result<(), InteractionError>;

/// A [`poise::Command`] type alias with our common types
pub(crate) type Command = poise::Command<ArcData, InteractionError>;
/// A [`poise::Context`] type alias with our common types, provided to each command
pub(crate) type Context<'a> = poise::Context<'a, ArcData, InteractionError>;
/// A [`poise::ApplicationContext`] type alias with our common types, provided to each command, provided to each slash command
pub(crate) type ApplicationContext<'a> = poise::ApplicationContext<'a, ArcData, InteractionError>;
/// A [`polyfill::MessageComponentContext`] type alias with our common types, provided to each message component interaction
pub(crate) type MessageComponentContext<'a> = polyfill::MessageComponentContext<'a, ArcData>;

/// A [`poise::Framework`] type alias with our common types
pub(crate) type Framework = poise::Framework<ArcData, InteractionError>;
/// A [`poise::FrameworkContext`] type alias with our common types
pub(crate) type FrameworkContext<'a> = poise::FrameworkContext<'a, ArcData, InteractionError>;
/// A [`poise::FrameworkError`] type alias with our common types
pub(crate) type FrameworkError<'a> = poise::FrameworkError<'a, ArcData, InteractionError>;

/// An error in an interaction or an event
#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
	/// A serenity error
	#[error(transparent)]
	Serenity(#[from] serenity::Error),
	/// A database error
	#[error(transparent)]
	Pool(#[from] PoolError),
	/// A diesel error
	#[error(transparent)]
	Diesel(#[from] diesel::result::Error),
	/// A malformed or unserializable `JSON` payload
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	/// Collects any other general purpose error
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}
