//! `OAuth2` flow with dashboard users

use crate::{
	cacher::{Cacher, CacherPool},
	constants::{self, scopes, urls},
	states::Config,
};
use anyhow::Context as _;
use oauth2::{
	basic::{BasicClient, BasicTokenType},
	url::Url,
	AuthUrl, AuthorizationCode, CsrfToken, EmptyExtraTokenFields, EndpointNotSet, EndpointSet,
	RedirectUrl, RevocationUrl, Scope, StandardTokenResponse, TokenResponse, TokenUrl,
};
use poise::serenity_prelude::UserId;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// The type of the `OAuth2` response
pub(crate) type BasicTokenResponse = StandardTokenResponse<EmptyExtraTokenFields, BasicTokenType>;

/// The information returned by `Discord` about the logged in user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DiscordUserMetadata {
	/// The user snowflake, as a string like every `Discord` id
	pub(crate) id: String,
	/// The unique username
	pub(crate) username: String,
	/// The display name, if the user chose one
	#[serde(default)]
	pub(crate) global_name: Option<String>,
	/// The avatar hash
	#[serde(default)]
	pub(crate) avatar: Option<String>,
}

impl DiscordUserMetadata {
	/// Typed user id
	pub(crate) fn user_id(&self) -> Option<UserId> {
		self.id.parse::<u64>().ok().filter(|id| *id != 0).map(UserId::new)
	}

	/// Url of the avatar, if any
	pub(crate) fn avatar_url(&self) -> Option<String> {
		self.avatar.as_ref().map(|hash| {
			format!(
				"https://cdn.discordapp.com/avatars/{}/{}.png",
				self.id, hash
			)
		})
	}
}

/// A manager to get redirect urls, tokens and sessions
#[derive(Debug)]
pub(crate) struct DiscordAuthentification {
	/// The inner client used to manage the flow
	pub(crate) client:
		BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointSet, EndpointSet>,
	/// Sent `state` parameters waiting for the callback
	pub(crate) pending: Arc<Cacher<String, ()>>,
	/// Opened dashboard sessions, keyed by the session cookie
	pub(crate) sessions: Arc<Cacher<String, DiscordUserMetadata>>,
	/// A Reqwest HTTPS client to query the `Discord` API
	pub(crate) http: Client,
}

impl DiscordAuthentification {
	/// Create a new [`DiscordAuthentification`]
	pub(crate) fn new(config: &Config, cachers: &CacherPool) -> anyhow::Result<Self> {
		let auth_url = AuthUrl::new(urls::DISCORD_AUTH_ENDPOINT.into())?;
		let token_url = TokenUrl::new(urls::DISCORD_TOKEN_ENDPOINT.into())?;

		let redirect_url = RedirectUrl::new(config.public_url("account/callback"))?;
		let revocation_url = RevocationUrl::new(urls::DISCORD_REVOKE_ENDPOINT.into())?;

		let (client_id, client_secret) = config.discord_client.clone();
		let oauth_client = BasicClient::new(client_id)
			.set_client_secret(client_secret)
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_redirect_uri(redirect_url)
			.set_revocation_url(revocation_url);

		let http = reqwest::ClientBuilder::new()
			// Following redirects opens the client up to SSRF vulnerabilities.
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.context("could not build http client")?;

		Ok(Self {
			client: oauth_client,
			pending: cachers.acquire(constants::AUTHENTICATION_TIMEOUT),
			sessions: cachers.acquire(constants::SESSION_LIFETIME),
			http,
		})
	}

	/// Gets a url to send the user to and remember its `state`
	pub(crate) fn authorize_url(&self) -> Url {
		let (authorize_url, csrf_state) = self
			.client
			.authorize_url(CsrfToken::new_random)
			.add_scope(Scope::new(scopes::IDENTIFY.into()))
			.url();

		self.pending.set(csrf_state.secret().clone(), ());

		authorize_url
	}

	/// Finish the flow started by [`Self::authorize_url`] and open a session
	///
	/// Returns the session key and the user
	pub(crate) async fn complete(
		&self,
		code: String,
		state: &str,
	) -> Result<(String, DiscordUserMetadata), DiscordAuthentificationError> {
		if self.pending.remove(&state.to_owned()).is_none() {
			return Err(DiscordAuthentificationError::UnknownState);
		}

		let token_response = self
			.client
			.exchange_code(AuthorizationCode::new(code))
			.request_async(&self.http)
			.await
			.context("could not get oauth2 token")?;

		let user = self.query_discord_user_metadata(&token_response).await?;

		let session = uuid::Uuid::new_v4().simple().to_string();
		self.sessions.set(session.clone(), user.clone());

		Ok((session, user))
	}

	/// The user behind a session cookie
	pub(crate) fn session(&self, session: &str) -> Option<DiscordUserMetadata> {
		self.sessions.get(&session.to_owned())
	}

	/// Close a session
	pub(crate) fn logout(&self, session: &str) -> Option<DiscordUserMetadata> {
		self.sessions.remove(&session.to_owned())
	}

	/// Query discord for the user's identity
	pub(crate) async fn query_discord_user_metadata(
		&self,
		token_res: &BasicTokenResponse,
	) -> Result<DiscordUserMetadata, DiscordAuthentificationError> {
		let response = self
			.http
			.get(urls::DISCORD_CURRENT_USER_ENDPOINT)
			.bearer_auth(token_res.access_token().secret())
			.send()
			.await
			.map_err(DiscordAuthentificationError::Fetch)?;

		if response.status() != StatusCode::OK {
			return Err(DiscordAuthentificationError::NonOkResponse);
		}

		let body = response
			.bytes()
			.await
			.context("could not get response bytes")?;

		serde_json::from_slice::<DiscordUserMetadata>(&body)
			.map_err(DiscordAuthentificationError::MalformedResponse)
	}
}

/// Errors that can happen during the authentification process
#[derive(Error, Debug)]
pub(crate) enum DiscordAuthentificationError {
	/// The `state` was never sent or expired
	#[error("The given 'state' wasn't queued anymore")]
	UnknownState,

	/// An error while fetching `Discord`
	#[error("Could not fetch the Discord API: {0}")]
	Fetch(reqwest::Error),
	/// An error while fetching `Discord`
	#[error("Discord answered with a non Ok status code")]
	NonOkResponse,
	/// The API response from `Discord` does not contain required data
	#[error("The returned response could not be parsed")]
	MalformedResponse(serde_json::Error),

	/// Other miscellaneous errors
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_metadata_parses_discord_payload() {
		let user: DiscordUserMetadata = serde_json::from_str(
			r#"{"id":"80351110224678912","username":"nelly","discriminator":"0","avatar":"8342729096ea3675442027381ff50dfe"}"#,
		)
		.unwrap();

		assert_eq!(user.user_id(), Some(UserId::new(80_351_110_224_678_912)));
		assert_eq!(user.global_name, None);
		assert_eq!(
			user.avatar_url().as_deref(),
			Some("https://cdn.discordapp.com/avatars/80351110224678912/8342729096ea3675442027381ff50dfe.png")
		);
	}

	#[test]
	fn invalid_ids_are_rejected() {
		let user = DiscordUserMetadata {
			id: "not-a-snowflake".into(),
			username: "x".into(),
			global_name: None,
			avatar: None,
		};

		assert_eq!(user.user_id(), None);
		assert_eq!(user.avatar_url(), None);
	}
}
