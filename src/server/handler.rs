//! The request handlers that serves content

use super::{AcceptLanguage, ServerError, SessionUser, SESSION_COOKIE};
use crate::{
	auth::DiscordUserMetadata,
	database::models::ShortUrl,
	help::{DocLanguage, HelpCommand, HelpIndex},
	rtws::features::{guilds_of, GuildView},
	states::ArcData,
};
use rocket::{
	http::{Cookie, CookieJar, SameSite},
	response::Redirect,
	serde::json::Json,
	Request, State,
};
use rocket_dyn_templates::{context, Template};
use serde::Serialize;

/// A command of the help page, with its docs rendered
#[derive(Debug, Serialize)]
struct HelpPageCommand {
	/// Name including the parent groups
	qualified_name: String,
	/// Short description in the page language
	description: Option<String>,
	/// Usage line
	usage: String,
	/// Rendered docs
	docs: Option<String>,
}

/// A category of the help page
#[derive(Debug, Serialize)]
struct HelpPageCategory {
	/// Category name
	name: String,
	/// Commands and subcommands, flattened
	commands: Vec<HelpPageCommand>,
}

/// Flatten a command tree in display order
fn flatten_help(
	command: &HelpCommand,
	language: &str,
	out: &mut Vec<HelpPageCommand>,
) {
	out.push(HelpPageCommand {
		qualified_name: command.qualified_name.clone(),
		description: command.description_in(language).map(ToOwned::to_owned),
		usage: command.usage(),
		docs: command.render_docs(DocLanguage::from_locale(language)),
	});

	for subcommand in &command.subcommands {
		flatten_help(subcommand, language, out);
	}
}

/// The help index, once the command tree is built
fn help_of(data: &ArcData) -> Result<&HelpIndex, ServerError> {
	data.help.get().ok_or(ServerError::Unavailable)
}

/// Check the backend is alive
#[rocket::get("/hello")]
pub(super) fn hello(data: &State<ArcData>) -> String {
	let name = data.discord().map_or_else(
		|_| "RT".to_owned(),
		|discord| discord.cache.current_user().name.clone(),
	);

	format!("Hi, I'm {name}.")
}

/// Redirect a short url to its target
#[rocket::get("/<custom>")]
pub(super) async fn short_url_redirect(
	data: &State<ArcData>,
	custom: &str,
) -> Result<Redirect, ServerError> {
	let mut connection = data.database.get().await?;

	let short_url = ShortUrl::find(&mut connection, custom)
		.await?
		.ok_or(ServerError::NotFound)?;

	tracing::debug!(custom = custom, url = short_url.url, "short url hit");

	Ok(Redirect::to(short_url.url))
}

/// Serve the help page
#[rocket::get("/help")]
pub(super) fn help_page(
	data: &State<ArcData>,
	lang: AcceptLanguage,
) -> Result<Template, ServerError> {
	let help = help_of(data)?;

	let categories = help
		.categories()
		.map(|(name, commands)| {
			let mut flattened = Vec::new();
			for command in commands {
				flatten_help(command, &lang.0, &mut flattened);
			}

			HelpPageCategory {
				name: name.to_owned(),
				commands: flattened,
			}
		})
		.collect::<Vec<_>>();

	Ok(Template::render(
		"help",
		context! { lang: lang.0, categories },
	))
}

/// Every category of the help
#[rocket::get("/api/help")]
pub(super) fn help_index(data: &State<ArcData>) -> Result<Json<HelpIndex>, ServerError> {
	Ok(Json(help_of(data)?.clone()))
}

/// The commands of a help category
#[rocket::get("/api/help/<category>")]
pub(super) fn help_category(
	data: &State<ArcData>,
	category: &str,
) -> Result<Json<Vec<HelpCommand>>, ServerError> {
	help_of(data)?
		.category(category)
		.map(|commands| Json(commands.to_vec()))
		.ok_or(ServerError::NotFound)
}

/// Send the user to the `Discord` consent page
#[rocket::get("/account/login")]
pub(super) fn account_login(data: &State<ArcData>) -> Redirect {
	Redirect::to(data.auth.authorize_url().to_string())
}

/// Finish the `OAuth2` flow and open a session
#[rocket::get("/account/callback?<code>&<state>")]
pub(super) async fn account_callback(
	data: &State<ArcData>,
	cookies: &CookieJar<'_>,
	code: String,
	state: &str,
) -> Result<Redirect, ServerError> {
	let (session, user) = data.auth.complete(code, state).await?;

	tracing::info!(user_id = user.id, username = user.username, "dashboard login");

	cookies.add(
		Cookie::build((SESSION_COOKIE, session))
			.path("/")
			.http_only(true)
			.secure(data.config.production)
			.same_site(SameSite::Lax),
	);

	Ok(Redirect::to(rocket::uri!(account)))
}

/// The logged in user
#[rocket::get("/account")]
pub(super) fn account(session: SessionUser) -> Json<DiscordUserMetadata> {
	Json(session.user)
}

/// Close the current session
#[rocket::get("/account/logout")]
pub(super) fn account_logout(
	data: &State<ArcData>,
	cookies: &CookieJar<'_>,
	session: Option<SessionUser>,
) -> Redirect {
	if let Some(session) = session {
		data.auth.logout(&session.session);
	}

	cookies.remove(Cookie::from(SESSION_COOKIE));

	Redirect::to(rocket::uri!(hello))
}

/// Guilds the logged in user shares with the bot
#[rocket::get("/api/guilds")]
pub(super) fn guilds(
	data: &State<ArcData>,
	session: SessionUser,
) -> Result<Json<Vec<GuildView>>, ServerError> {
	let user_id = session
		.user
		.user_id()
		.ok_or_else(|| ServerError::User("the session user has no valid id".into()))?;
	let discord = data.discord().map_err(|_| ServerError::Unavailable)?;

	Ok(Json(guilds_of(&discord.cache, user_id)))
}

/// Catch the `401` status code
#[rocket::catch(401)]
pub(super) fn catch_401() -> Json<serde_json::Value> {
	Json(serde_json::json!({ "error": "not logged in" }))
}

/// Catch the `404` status code
#[rocket::catch(404)]
pub(super) fn catch_404(req: &Request<'_>) -> Template {
	Template::render(
		"404",
		context! { ressource_path: req.uri().path().to_string() },
	)
}

/// Catch the `500` status code
#[rocket::catch(500)]
pub(super) fn catch_500() -> Template {
	Template::render("500", context! { message: "Internal Server Error" })
}
