//! Constants shared across the bot and the backend

use std::time::Duration;

/// How long the backend keeps an unanswered `OAuth2` state
pub(crate) const AUTHENTICATION_TIMEOUT: Duration = Duration::from_secs(60 * 10);

/// How long a dashboard session stays valid
pub(crate) const SESSION_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// Name given to the webhooks the bot creates to speak on behalf of users
pub(crate) const WEBHOOK_NAME: &str = "RT-Tool";

/// Colour used for informative embeds
pub(crate) const NORMAL_COLOUR: u32 = 0x0066_ff;

/// Limits applied to the user data stored in the database
pub(crate) mod limits {
	/// Maximum delayed roles configured in one guild
	pub(crate) const MAX_DELAY_ROLES_PER_GUILD: i64 = 10;
	/// Maximum pending delayed deletions in one channel, the oldest is evicted
	pub(crate) const MAX_DELAY_DELETES_PER_CHANNEL: i64 = 160;
	/// Maximum pending lotteries in one guild
	pub(crate) const MAX_DELAY_LOTTERIES_PER_GUILD: i64 = 30;
	/// Maximum short urls owned by one user, the oldest is evicted
	pub(crate) const MAX_SHORT_URLS_PER_USER: i64 = 15;
	/// Length of a generated short url
	pub(crate) const SHORT_URL_RANDOM_LENGTH: usize = 6;
	/// Maximum length of a custom short url
	pub(crate) const SHORT_URL_MAX_LENGTH: usize = 32;
	/// Attempts to find a free random short url
	pub(crate) const SHORT_URL_ATTEMPTS: usize = 10;
	/// Maximum side of a minesweeper board started from a command
	pub(crate) const MINESWEEPER_MAX_SIDE: usize = 25;
	/// Ranking entries shown per page
	pub(crate) const RANKING_PAGE_SIZE: usize = 10;
}

/// Global chat relay tuning
pub(crate) mod globalchat {
	use std::time::Duration;

	/// Marker put in the topic of every connected channel
	pub(crate) const TOPIC_MARKER: &str = "RT-GlobalChat";
	/// Name of the global chat used when none is given
	pub(crate) const DEFAULT_NAME: &str = "main";
	/// Messages containing one of these are never relayed
	pub(crate) const BLOCKED_WORDS: [&str; 3] =
		["discord.gg", "discord.com/invite", "discordapp.net/invite"];
	/// Similar messages tolerated before muting the author
	pub(crate) const SPAM_THRESHOLD: u32 = 4;
	/// How long a spamming author is muted
	pub(crate) const SPAM_MUTE: Duration = Duration::from_secs(60);
	/// How long the last message of an author is remembered
	pub(crate) const SPAM_MEMORY: Duration = Duration::from_secs(60 * 10);
	/// Longest username a webhook accepts
	pub(crate) const WEBHOOK_USERNAME_LENGTH: usize = 80;
	/// Length of the window used to compare two messages
	pub(crate) const SIMILARITY_WINDOW: usize = 5;
	/// How long the ban list of a guild is trusted
	pub(crate) const BAN_CACHE_LIFETIME: Duration = Duration::from_secs(60 * 10);
	/// How long a webhook lookup is trusted
	pub(crate) const WEBHOOK_CACHE_LIFETIME: Duration = Duration::from_secs(60 * 30);
}

/// Periodic workers intervals
pub(crate) mod intervals {
	use std::time::Duration;

	/// Dead cache entries removal
	pub(crate) const CACHER_SWEEP: Duration = Duration::from_secs(5);
	/// Delayed roles check
	pub(crate) const DELAY_ROLE: Duration = Duration::from_secs(30);
	/// Delayed deletions check
	pub(crate) const DELAY_DELETE: Duration = Duration::from_secs(30);
	/// Lotteries draw check
	pub(crate) const DELAY_LOTTERY: Duration = Duration::from_secs(31);
	/// Captcha queue expiry check
	pub(crate) const CAPTCHA_TIMEOUT: Duration = Duration::from_secs(30);
	/// Delay before reconnecting to the dashboard
	pub(crate) const RTWS_RECONNECT: Duration = Duration::from_secs(3);
}

/// Custom ids of the message components
pub(crate) mod events {
	/// Button starting the captcha
	pub(crate) const CAPTCHA_BUTTON_INTERACTION: &str = "captcha";
	/// Button cancelling a lottery
	pub(crate) const LOTTERY_CANCEL_BUTTON_INTERACTION: &str = "delay_lottery-cancel";
}

/// Emojis used as reactions
pub(crate) mod emojis {
	/// Accepted message
	pub(crate) const CHECK: &str = "✅";
	/// Refused message
	pub(crate) const CROSS: &str = "❎";
	/// Local level up
	pub(crate) const LEVEL_UP_LOCAL: &str = "🆙";
	/// Global level up
	pub(crate) const LEVEL_UP_GLOBAL: &str = "🌏";
}

/// Discord `OAuth2` endpoints
pub(crate) mod urls {
	/// Authorization page
	pub(crate) const DISCORD_AUTH_ENDPOINT: &str = "https://discord.com/oauth2/authorize";
	/// Token exchange
	pub(crate) const DISCORD_TOKEN_ENDPOINT: &str = "https://discord.com/api/oauth2/token";
	/// Token revocation
	pub(crate) const DISCORD_REVOKE_ENDPOINT: &str = "https://discord.com/api/oauth2/token/revoke";
	/// Current user information
	pub(crate) const DISCORD_CURRENT_USER_ENDPOINT: &str = "https://discord.com/api/v10/users/@me";
}

/// `OAuth2` scopes requested to Discord
pub(crate) mod scopes {
	/// Read the user identity
	pub(crate) const IDENTIFY: &str = "identify";
}
