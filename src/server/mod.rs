//! Embedded backend serving short urls, the help pages and the dashboard login

use crate::{
	auth::{DiscordAuthentificationError, DiscordUserMetadata},
	states::ArcData,
};
use diesel_async::pooled_connection::deadpool::PoolError;
use rocket::{
	http::Status,
	request::{FromRequest, Outcome},
	response::{self, Responder},
	serde::json::Json,
	Request,
};
use rocket_dyn_templates::Template;
use serde_json::json;
use std::convert::Infallible;
use tokio::task::JoinHandle;

mod handler;

/// Name of the cookie holding the dashboard session key
pub(crate) const SESSION_COOKIE: &str = "rt_session";

/// First path segments of the backend routes, never served as short urls
pub(crate) const RESERVED_PATHS: [&str; 4] = ["account", "api", "hello", "help"];

/// Locale used when the browser sends none
const DEFAULT_LANGUAGE: &str = "en-US";

/// Errors returned by the request handlers
#[derive(Debug, thiserror::Error)]
pub(crate) enum ServerError {
	/// The request is malformed, the message is shown to the user
	#[error("{0}")]
	User(String),
	/// Nothing lives at this address
	#[error("not found")]
	NotFound,
	/// A dashboard session is required
	#[error("not logged in")]
	Unauthorized,
	/// The bot is not connected to the gateway yet
	#[error("the bot is not ready yet")]
	Unavailable,

	/// The login flow failed
	#[error(transparent)]
	Auth(#[from] DiscordAuthentificationError),
	/// No database connection is available
	#[error(transparent)]
	Pool(#[from] PoolError),
	/// A query failed
	#[error(transparent)]
	Diesel(#[from] diesel::result::Error),
	/// Collects any other general purpose error
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl ServerError {
	/// Status code answered for this error
	fn status(&self) -> Status {
		match self {
			Self::User(_) | Self::Auth(DiscordAuthentificationError::UnknownState) => {
				Status::BadRequest
			}
			Self::NotFound => Status::NotFound,
			Self::Unauthorized => Status::Unauthorized,
			Self::Unavailable => Status::ServiceUnavailable,
			Self::Auth(_) | Self::Pool(_) | Self::Diesel(_) | Self::Other(_) => {
				Status::InternalServerError
			}
		}
	}
}

impl<'r> Responder<'r, 'static> for ServerError {
	fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
		let status = self.status();

		// Internal details never leave the server, the `500` catcher answers instead
		if status == Status::InternalServerError {
			tracing::error!(error = ?self, path = %request.uri(), "backend request failed");
			return Err(status);
		}

		(status, Json(json!({ "error": self.to_string() }))).respond_to(request)
	}
}

/// The first language of the `Accept-Language` header
#[derive(Debug)]
pub(crate) struct AcceptLanguage(pub(crate) String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AcceptLanguage {
	type Error = Infallible;

	async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
		let language = request
			.headers()
			.get_one("Accept-Language")
			.and_then(first_language)
			.unwrap_or(DEFAULT_LANGUAGE);

		Outcome::Success(Self(language.to_owned()))
	}
}

/// Extract the preferred language of an `Accept-Language` header value
fn first_language(header: &str) -> Option<&str> {
	header
		.split(',')
		.next()
		.and_then(|tag| tag.split(';').next())
		.map(str::trim)
		.filter(|tag| !tag.is_empty() && *tag != "*")
}

/// The user of the session cookie
#[derive(Debug)]
pub(crate) struct SessionUser {
	/// Key of the session
	pub(crate) session: String,
	/// The logged in user
	pub(crate) user: DiscordUserMetadata,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionUser {
	type Error = ServerError;

	async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
		let Some(data) = request.rocket().state::<ArcData>() else {
			return Outcome::Error((
				Status::InternalServerError,
				ServerError::Other(anyhow::anyhow!("bot data is not managed")),
			));
		};

		let session = request
			.cookies()
			.get(SESSION_COOKIE)
			.map(|cookie| cookie.value().to_owned());

		match session.and_then(|session| Some((data.auth.session(&session)?, session))) {
			Some((user, session)) => Outcome::Success(Self { session, user }),
			None => Outcome::Error((Status::Unauthorized, ServerError::Unauthorized)),
		}
	}
}

/// Start the backend next to the bot
///
/// The configuration is read from `Rocket.toml` and `ROCKET_*` variables.
pub(crate) async fn start_server(data: ArcData) -> anyhow::Result<JoinHandle<()>> {
	let rocket = rocket::build()
		.manage(data)
		.attach(Template::fairing())
		.mount(
			"/",
			rocket::routes![
				handler::hello,
				handler::short_url_redirect,
				handler::help_page,
				handler::help_index,
				handler::help_category,
				handler::account_login,
				handler::account_callback,
				handler::account,
				handler::account_logout,
				handler::guilds,
			],
		)
		.register(
			"/",
			rocket::catchers![handler::catch_401, handler::catch_404, handler::catch_500],
		)
		.ignite()
		.await?;

	Ok(tokio::spawn(async move {
		if let Err(error) = rocket.launch().await {
			tracing::error!(error = ?error, "backend stopped");
		}
	}))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn languages_are_read_from_the_header() {
		assert_eq!(first_language("ja,en-US;q=0.9"), Some("ja"));
		assert_eq!(first_language("en-GB;q=0.8, fr"), Some("en-GB"));
		assert_eq!(first_language("*"), None);
		assert_eq!(first_language(""), None);
	}

	#[test]
	fn only_internal_errors_hide_their_message() {
		assert_eq!(ServerError::NotFound.status(), Status::NotFound);
		assert_eq!(
			ServerError::Auth(DiscordAuthentificationError::UnknownState).status(),
			Status::BadRequest
		);
		assert_eq!(
			ServerError::Auth(DiscordAuthentificationError::NonOkResponse).status(),
			Status::InternalServerError
		);
	}
}
