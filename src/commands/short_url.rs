//! Shorten urls served by the backend

use crate::{
	constants::limits,
	database::models::{NewShortUrl, ShortUrl},
	server::RESERVED_PATHS,
	states::{ApplicationContext, ApplicationContextPolyfill, InteractionResult},
	translation::Translate,
};
use fluent::fluent_args;
use poise::command;
use rand::{distributions::Alphanumeric, Rng};
use url::Url;

/// Manage your short urls
#[allow(clippy::unused_async)]
#[command(
	slash_command,
	category = "Individual",
	subcommands("url_short", "url_list", "url_remove")
)]
pub(crate) async fn url(_: ApplicationContext<'_>) -> InteractionResult {
	Ok(())
}

/// Whether a custom path is accepted
pub(crate) fn is_valid_custom(custom: &str) -> bool {
	(1..=limits::SHORT_URL_MAX_LENGTH).contains(&custom.len())
		&& custom.chars().all(|char| char.is_ascii_alphanumeric())
}

/// Whether a path is already served by a backend route
pub(crate) fn is_reserved(custom: &str) -> bool {
	RESERVED_PATHS
		.iter()
		.any(|reserved| reserved.eq_ignore_ascii_case(custom))
}

/// Parse a target url, only `http` and `https` are accepted
pub(crate) fn parse_target(url: &str) -> Option<Url> {
	Url::parse(url)
		.ok()
		.filter(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
}

/// A random short url path
pub(crate) fn random_custom(rng: &mut impl Rng) -> String {
	rng.sample_iter(&Alphanumeric)
		.take(limits::SHORT_URL_RANDOM_LENGTH)
		.map(char::from)
		.collect()
}

/// The path of a short url given either as the path or as the full url
pub(crate) fn custom_from_input<'a>(input: &'a str, server_url: &str) -> &'a str {
	let input = input.trim().trim_end_matches('/');

	["https://", "http://"]
		.iter()
		.find_map(|scheme| {
			input
				.strip_prefix(scheme)
				.and_then(|rest| rest.strip_prefix(server_url))
				.and_then(|rest| rest.strip_prefix('/'))
		})
		.unwrap_or(input)
}

/// Create a short url
///
/// Parameters
/// ----------
/// url : str
///     The url to shorten, starting with `http://` or `https://`
/// custom : str
///     The path of the short url, random when omitted
///
/// Notes
/// -----
/// You can own up to 15 short urls, the oldest one is removed when you create more.
#[command(slash_command, rename = "short")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn url_short(
	ctx: ApplicationContext<'_>,
	url: String,
	custom: Option<String>,
) -> InteractionResult {
	let user_id = ctx.interaction.user.id;

	let Some(target) = parse_target(&url) else {
		ctx.shout(ctx.translate("url_short-invalid-url", None))
			.await?;

		return Ok(());
	};

	let mut connection = ctx.data.database.get().await?;

	let custom = match custom {
		Some(custom) => {
			if !is_valid_custom(&custom) {
				ctx.shout(ctx.translate(
					"url_short-invalid-custom",
					Some(fluent_args!["max" => limits::SHORT_URL_MAX_LENGTH]),
				))
				.await?;

				return Ok(());
			}

			if is_reserved(&custom) || ShortUrl::find(&mut connection, &custom).await?.is_some() {
				ctx.shout(ctx.translate(
					"url_short-already-exists",
					Some(fluent_args!["custom" => custom]),
				))
				.await?;

				return Ok(());
			}

			custom
		}
		None => {
			let mut found = None;
			for _ in 0..limits::SHORT_URL_ATTEMPTS {
				let candidate = random_custom(&mut rand::thread_rng());
				if ShortUrl::find(&mut connection, &candidate).await?.is_none() {
					found = Some(candidate);
					break;
				}
			}

			let Some(custom) = found else {
				ctx.shout(ctx.translate("url_short-no-free-custom", None))
					.await?;

				return Ok(());
			};

			custom
		}
	};

	if ShortUrl::count_from_user(&mut connection, user_id).await?
		>= limits::MAX_SHORT_URLS_PER_USER
	{
		ShortUrl::remove_oldest(&mut connection, user_id).await?;
	}

	NewShortUrl {
		user_id: user_id.get(),
		url: target.as_str(),
		custom: &custom,
		registered_at: chrono::Utc::now().timestamp(),
	}
	.insert(&mut connection)
	.await?;

	ctx.shout(ctx.translate(
		"url_short-success",
		Some(fluent_args!["url" => ctx.data.config.public_url(&custom)]),
	))
	.await?;

	Ok(())
}

/// List your short urls
#[command(slash_command, rename = "list")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn url_list(ctx: ApplicationContext<'_>) -> InteractionResult {
	let urls = ShortUrl::all_from_user(
		&mut ctx.data.database.get().await?,
		ctx.interaction.user.id,
	)
	.await?;

	if urls.is_empty() {
		ctx.shout(ctx.translate("url_list-none", None)).await?;

		return Ok(());
	}

	let lines = urls
		.iter()
		.map(|url| format!("<{}> → <{}>", ctx.data.config.public_url(&url.custom), url.url))
		.collect::<Vec<_>>()
		.join("\n");

	ctx.shout(format!("**{}**\n{}", ctx.translate("url_list-title", None), lines))
		.await?;

	Ok(())
}

/// Remove one of your short urls
#[command(slash_command, rename = "remove")]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn url_remove(ctx: ApplicationContext<'_>, custom: String) -> InteractionResult {
	let custom = custom_from_input(&custom, &ctx.data.config.server_url);

	let removed = ShortUrl::delete_owned(
		&mut ctx.data.database.get().await?,
		ctx.interaction.user.id,
		custom,
	)
	.await?;

	let key = if removed == 0 {
		"url_remove-not-found"
	} else {
		"url_remove-success"
	};
	ctx.shout(ctx.translate(key, Some(fluent_args!["custom" => custom.to_owned()])))
		.await?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::{rngs::StdRng, SeedableRng};

	#[test]
	fn custom_paths_are_short_and_alphanumeric() {
		assert!(is_valid_custom("rt"));
		assert!(is_valid_custom(&"a".repeat(32)));
		assert!(!is_valid_custom(&"a".repeat(33)));
		assert!(!is_valid_custom(""));
		assert!(!is_valid_custom("with space"));
		assert!(!is_valid_custom("ハロー"));
	}

	#[test]
	fn backend_routes_are_not_short_urls() {
		for custom in ["hello", "help", "account", "api", "Help"] {
			assert!(is_reserved(custom), "{custom} should be reserved");
		}
		assert!(!is_reserved("helpme"));
		assert!(!is_reserved("rt"));
	}

	#[test]
	fn only_web_urls_are_shortened() {
		assert!(parse_target("https://rt-bot.com/help").is_some());
		assert!(parse_target("http://example.com").is_some());
		assert!(parse_target("ftp://example.com").is_none());
		assert!(parse_target("javascript:alert(1)").is_none());
		assert!(parse_target("not a url").is_none());
	}

	#[test]
	fn random_paths_have_the_expected_shape() {
		let custom = random_custom(&mut StdRng::seed_from_u64(1));

		assert_eq!(custom.len(), limits::SHORT_URL_RANDOM_LENGTH);
		assert!(is_valid_custom(&custom));
	}

	#[test]
	fn full_short_urls_are_reduced_to_their_path() {
		assert_eq!(custom_from_input("https://rt.dev/abc", "rt.dev"), "abc");
		assert_eq!(custom_from_input("http://rt.dev/abc/", "rt.dev"), "abc");
		assert_eq!(custom_from_input("abc", "rt.dev"), "abc");
		assert_eq!(custom_from_input("https://other.dev/abc", "rt.dev"), "https://other.dev/abc");
	}
}
