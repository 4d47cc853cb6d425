//! Database pool, embedded migrations and the rows of every feature

pub(crate) mod models;
pub(crate) mod schema;

use diesel::{Connection, MysqlConnection};
use diesel_async::{pooled_connection::deadpool, AsyncMysqlConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use poise::serenity_prelude::GuildId;

/// The pool shared by the bot and the backend
pub(crate) type DatabasePool = deadpool::Pool<AsyncMysqlConnection>;
/// A connection taken from the [`DatabasePool`]
pub(crate) type DatabasePooledConnection = deadpool::Object<AsyncMysqlConnection>;

/// Migrations compiled into the binary
pub(crate) const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run every pending migration with a short lived synchronous connection
pub(crate) fn run_migrations(database_url: &str) -> anyhow::Result<()> {
	let mut connection = MysqlConnection::establish(database_url)?;

	let applied = connection
		.run_pending_migrations(MIGRATIONS)
		.map_err(|error| anyhow::anyhow!(error))?;

	tracing::info!(migrations = applied.len(), "database is up to date");

	Ok(())
}

/// Remove every setting bound to a guild the bot left
pub(crate) async fn purge_guild(
	connection: &mut DatabasePooledConnection,
	guild_id: GuildId,
) -> diesel::QueryResult<()> {
	use self::{
		models::{DelayLottery, DelayRole},
		prelude::*,
		schema::{captchas, global_chats, level_guilds, level_members, level_rewards},
	};

	DelayRole::delete_guild(connection, guild_id).await?;
	DelayLottery::delete_guild(connection, guild_id).await?;

	diesel::delete(global_chats::table.filter(global_chats::guild_id.eq(guild_id.get())))
		.execute(connection)
		.await?;
	diesel::delete(captchas::table.filter(captchas::guild_id.eq(guild_id.get())))
		.execute(connection)
		.await?;
	diesel::delete(level_guilds::table.filter(level_guilds::guild_id.eq(guild_id.get())))
		.execute(connection)
		.await?;
	diesel::delete(level_members::table.filter(level_members::guild_id.eq(guild_id.get())))
		.execute(connection)
		.await?;
	diesel::delete(level_rewards::table.filter(level_rewards::guild_id.eq(guild_id.get())))
		.execute(connection)
		.await?;

	Ok(())
}

/// Common imports to write queries and derive rows
pub(crate) mod prelude {
	pub(crate) use diesel::prelude::{
		ExpressionMethods, Identifiable, Insertable, OptionalExtension, QueryDsl, Queryable,
		Selectable,
	};
	pub(crate) use diesel_async::RunQueryDsl;
}
