//! Context given to the handlers of message components, the buttons of panels posted by the bot

use poise::{
	serenity_prelude::{
		self as serenity, ComponentInteraction, CreateInteractionResponse,
		CreateInteractionResponseFollowup, CreateInteractionResponseMessage,
	},
	CreateReply,
};
use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};

/// The [`poise::Context`] like for message components interactions
#[derive(Copy, Clone)]
pub(crate) struct MessageComponentContext<'a, U: Send + Sync> {
	/// The underlying interaction
	pub(crate) interaction: &'a ComponentInteraction,
	/// The custom user data
	pub(crate) data: &'a U,
	/// The underlying serenity context
	pub(crate) discord: &'a serenity::Context,
	/// Whether the interaction was already answered
	///
	/// Discord requires different endpoints for the first and the next responses.
	pub(crate) has_sent_initial_response: &'a AtomicBool,
}

impl<U: Send + Sync> AsRef<serenity::Http> for MessageComponentContext<'_, U> {
	fn as_ref(&self) -> &serenity::Http {
		&self.discord.http
	}
}

impl<U: Send + Sync> serenity::CacheHttp for MessageComponentContext<'_, U> {
	fn http(&self) -> &serenity::Http {
		&self.discord.http
	}

	fn cache(&self) -> Option<&Arc<serenity::Cache>> {
		Some(&self.discord.cache)
	}
}

impl<U: Send + Sync> MessageComponentContext<'_, U> {
	/// Answer the interaction, or follow up when it was already answered
	pub(crate) async fn send(&self, reply: CreateReply) -> Result<(), serenity::Error> {
		if self.has_sent_initial_response.load(Ordering::SeqCst) {
			self.interaction
				.create_followup(
					self.discord,
					reply.to_slash_followup_response(CreateInteractionResponseFollowup::default()),
				)
				.await?;
		} else {
			self.interaction
				.create_response(
					self.discord,
					CreateInteractionResponse::Message(
						reply.to_slash_initial_response(CreateInteractionResponseMessage::default()),
					),
				)
				.await?;
			self.has_sent_initial_response.store(true, Ordering::SeqCst);
		}

		Ok(())
	}

	/// Send an ephemeral message to the user
	#[inline]
	pub(crate) async fn shout(&self, content: impl Into<String> + Send) -> Result<(), serenity::Error> {
		self.send(
			CreateReply::default()
				.content(content.into())
				.ephemeral(true),
		)
		.await
	}
}
