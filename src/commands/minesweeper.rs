//! Play minesweeper in a channel

use crate::{
	constants::{limits, NORMAL_COLOUR},
	minesweeper::{Board, OpenOutcome},
	states::{ApplicationContext, ApplicationContextPolyfill, InteractionResult},
	translation::Translate,
};
use fluent::fluent_args;
use poise::{
	command,
	serenity_prelude::{CreateEmbed, CreateEmbedFooter, MessageCollector},
	CreateReply,
};
use std::time::Duration;

/// How long the game waits for the next move
const MOVE_TIMEOUT: Duration = Duration::from_secs(120);

/// A message sent by the player
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Move {
	/// Open a cell, zero based
	Open(usize, usize),
	/// Show the solution and stop
	Answer,
	/// Stop
	Exit,
}

/// Read a move from a message, coordinates are typed starting at one
pub(crate) fn parse_move(content: &str) -> Option<Move> {
	let content = content.trim();

	match content.to_lowercase().as_str() {
		"answer" => return Some(Move::Answer),
		"exit" => return Some(Move::Exit),
		_ => {}
	}

	let mut parts = content.split_whitespace();
	let x = parts.next()?.parse::<usize>().ok()?.checked_sub(1)?;
	let y = parts.next()?.parse::<usize>().ok()?.checked_sub(1)?;

	parts.next().is_none().then_some(Move::Open(x, y))
}

/// Play minesweeper
///
/// Parameters
/// ----------
/// x : int
///     Width of the board
/// y : int
///     Height of the board
/// bombs : int
///     Number of bombs
///
/// Notes
/// -----
/// Send `x y` in the channel to open a cell, `answer` to see the solution and `exit` to stop.
/// The game stops after two minutes without a move.
#[command(
	slash_command,
	category = "Entertainment",
	required_bot_permissions = "SEND_MESSAGES | EMBED_LINKS"
)]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn minesweeper(
	ctx: ApplicationContext<'_>,
	#[min = 1]
	#[max = 25]
	x: Option<u8>,
	#[min = 1]
	#[max = 25]
	y: Option<u8>,
	#[min = 1] bombs: Option<u16>,
) -> InteractionResult {
	let width = x.map_or(9, usize::from).min(limits::MINESWEEPER_MAX_SIDE);
	let height = y.map_or(9, usize::from).min(limits::MINESWEEPER_MAX_SIDE);
	let bombs = bombs.map_or(12, usize::from);

	let board_result = Board::new(width, height, bombs, &mut rand::thread_rng());
	let mut board = match board_result {
		Ok(board) => board,
		Err(error) => {
			tracing::debug!(error = %error, "refused a minesweeper board");
			ctx.shout(ctx.translate(
				"minesweeper-invalid-board",
				Some(fluent_args!["cells" => width * height]),
			))
			.await?;

			return Ok(());
		}
	};

	let title = ctx.translate(
		"minesweeper-title",
		Some(fluent_args!["bombs" => board.bombs()]),
	);
	let embed = |description: String, footer: String| {
		CreateReply::default().embed(
			CreateEmbed::new()
				.title(title.clone())
				.description(description)
				.footer(CreateEmbedFooter::new(footer))
				.colour(NORMAL_COLOUR),
		)
	};

	let handle = ctx
		.send(embed(board.render(), ctx.translate("minesweeper-how-to", None)))
		.await?;

	loop {
		let Some(message) = MessageCollector::new(ctx.serenity_context)
			.channel_id(ctx.interaction.channel_id)
			.author_id(ctx.interaction.user.id)
			.timeout(MOVE_TIMEOUT)
			.await
		else {
			handle
				.edit(
					poise::Context::Application(ctx),
					embed(board.render(), ctx.translate("minesweeper-timeout", None)),
				)
				.await?;
			break;
		};

		let Some(played) = parse_move(&message.content) else {
			continue;
		};

		let (description, footer, finished) = match played {
			Move::Answer => (
				board.render_answer(),
				ctx.translate("minesweeper-answer", None),
				true,
			),
			Move::Exit => (board.render(), ctx.translate("minesweeper-exit", None), true),
			Move::Open(x, y) => match board.open(x, y) {
				Err(_) => (
					board.render(),
					ctx.translate(
						"minesweeper-out-of-bounds",
						Some(fluent_args!["width" => board.width(), "height" => board.height()]),
					),
					false,
				),
				Ok(OpenOutcome::AlreadyOpened) => (
					board.render(),
					ctx.translate("minesweeper-already-opened", None),
					false,
				),
				Ok(OpenOutcome::Opened) => (
					board.render(),
					ctx.translate("minesweeper-how-to", None),
					false,
				),
				Ok(OpenOutcome::GameOver) => (
					board.render_answer(),
					ctx.translate("minesweeper-game-over", None),
					true,
				),
				Ok(OpenOutcome::Cleared) => (
					board.render_answer(),
					ctx.translate("minesweeper-cleared", None),
					true,
				),
			},
		};

		// Consume the move
		if let Err(error) = message.delete(ctx.serenity_context).await {
			tracing::debug!(error = ?error, "could not delete a minesweeper move");
		}

		handle
			.edit(poise::Context::Application(ctx), embed(description, footer))
			.await?;

		if finished {
			break;
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::{parse_move, Move};

	#[test]
	fn moves_are_one_based() {
		assert_eq!(parse_move("1 1"), Some(Move::Open(0, 0)));
		assert_eq!(parse_move("  9   3 "), Some(Move::Open(8, 2)));
		assert_eq!(parse_move("0 1"), None);
		assert_eq!(parse_move("1 2 3"), None);
		assert_eq!(parse_move("1"), None);
	}

	#[test]
	fn keywords_end_the_game() {
		assert_eq!(parse_move("answer"), Some(Move::Answer));
		assert_eq!(parse_move("EXIT"), Some(Move::Exit));
		assert_eq!(parse_move("hello"), None);
	}
}
