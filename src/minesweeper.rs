//! Minesweeper game engine

use rand::{seq::index, Rng};

/// Longest side of a board
pub(crate) const MAX_SIDE: usize = 100;

/// Hidden cell
const HIDDEN: &str = "■";
/// Bomb cell
const BOMB: &str = "💣";

/// Errors raised when creating or playing a board
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum BoardError {
	/// A side is zero or longer than [`MAX_SIDE`]
	#[error("board sides must be between 1 and {MAX_SIDE}, got {width}x{height}")]
	InvalidSize { width: usize, height: usize },
	/// Every cell would be a bomb
	#[error("a board of {cells} cells cannot hold {bombs} bombs")]
	TooManyBombs { cells: usize, bombs: usize },
	/// The coordinates are outside of the board
	#[error("({x}, {y}) is outside of the board")]
	OutOfBounds { x: usize, y: usize },
}

/// The content of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cell {
	/// Number of bombs around the cell
	Number(u8),
	/// A bomb
	Bomb,
}

/// What happened when opening a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpenOutcome {
	/// The cell was already open, nothing changed
	AlreadyOpened,
	/// A bomb was opened
	GameOver,
	/// Every cell without a bomb is open
	Cleared,
	/// The game goes on
	Opened,
}

/// A minesweeper board
#[derive(Debug, Clone)]
pub(crate) struct Board {
	width: usize,
	height: usize,
	bombs: usize,
	/// Row major cells
	cells: Vec<Cell>,
	/// Row major opened flags
	opened: Vec<bool>,
	/// Number of open cells
	opened_count: usize,
}

impl Board {
	/// Create a board with randomly placed bombs
	pub(crate) fn new(
		width: usize,
		height: usize,
		bombs: usize,
		rng: &mut impl Rng,
	) -> Result<Self, BoardError> {
		Self::check_size(width, height, bombs)?;

		let positions = index::sample(rng, width * height, bombs)
			.into_iter()
			.map(|index| (index % width, index / width))
			.collect::<Vec<_>>();

		Self::with_bombs(width, height, &positions)
	}

	/// Create a board with bombs at the given positions
	pub(crate) fn with_bombs(
		width: usize,
		height: usize,
		positions: &[(usize, usize)],
	) -> Result<Self, BoardError> {
		let mut board = Self {
			width,
			height,
			bombs: 0,
			cells: vec![Cell::Number(0); width * height],
			opened: vec![false; width * height],
			opened_count: 0,
		};

		for &(x, y) in positions {
			let index = board.index(x, y)?;
			if board.cells[index] != Cell::Bomb {
				board.cells[index] = Cell::Bomb;
				board.bombs += 1;
			}
		}
		Self::check_size(width, height, board.bombs)?;

		for y in 0..height {
			for x in 0..width {
				let index = y * width + x;
				if board.cells[index] == Cell::Bomb {
					continue;
				}

				let count = board
					.neighbours(x, y)
					.filter(|&(nx, ny)| board.cells[ny * width + nx] == Cell::Bomb)
					.count();
				board.cells[index] = Cell::Number(u8::try_from(count).unwrap_or(u8::MAX));
			}
		}

		Ok(board)
	}

	fn check_size(width: usize, height: usize, bombs: usize) -> Result<(), BoardError> {
		if !(1..=MAX_SIDE).contains(&width) || !(1..=MAX_SIDE).contains(&height) {
			return Err(BoardError::InvalidSize { width, height });
		}

		let cells = width * height;
		if bombs >= cells {
			return Err(BoardError::TooManyBombs { cells, bombs });
		}

		Ok(())
	}

	fn index(&self, x: usize, y: usize) -> Result<usize, BoardError> {
		if x < self.width && y < self.height {
			Ok(y * self.width + x)
		} else {
			Err(BoardError::OutOfBounds { x, y })
		}
	}

	/// Coordinates around a cell, inside the board
	fn neighbours(&self, x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> {
		let (width, height) = (self.width, self.height);

		(-1_isize..=1)
			.flat_map(|dy| (-1_isize..=1).map(move |dx| (dx, dy)))
			.filter(|&offset| offset != (0, 0))
			.filter_map(move |(dx, dy)| {
				let nx = x.checked_add_signed(dx)?;
				let ny = y.checked_add_signed(dy)?;
				(nx < width && ny < height).then_some((nx, ny))
			})
	}

	#[must_use]
	pub(crate) fn width(&self) -> usize {
		self.width
	}

	#[must_use]
	pub(crate) fn height(&self) -> usize {
		self.height
	}

	#[must_use]
	pub(crate) fn bombs(&self) -> usize {
		self.bombs
	}

	/// The content of a cell, open or not
	pub(crate) fn cell(&self, x: usize, y: usize) -> Result<Cell, BoardError> {
		Ok(self.cells[self.index(x, y)?])
	}

	/// Whether a cell is open
	pub(crate) fn is_opened(&self, x: usize, y: usize) -> Result<bool, BoardError> {
		Ok(self.opened[self.index(x, y)?])
	}

	/// Whether every cell without a bomb is open
	#[must_use]
	pub(crate) fn is_cleared(&self) -> bool {
		self.opened_count == self.cells.len() - self.bombs
	}

	/// Open a cell, zero cells open their neighbours too
	///
	/// Coordinates start at zero.
	pub(crate) fn open(&mut self, x: usize, y: usize) -> Result<OpenOutcome, BoardError> {
		let index = self.index(x, y)?;

		if self.opened[index] {
			return Ok(OpenOutcome::AlreadyOpened);
		}

		if self.cells[index] == Cell::Bomb {
			self.opened[index] = true;
			return Ok(OpenOutcome::GameOver);
		}

		let mut pending = vec![(x, y)];
		while let Some((x, y)) = pending.pop() {
			let index = y * self.width + x;
			if self.opened[index] {
				continue;
			}

			self.opened[index] = true;
			self.opened_count += 1;

			if self.cells[index] == Cell::Number(0) {
				pending.extend(
					self.neighbours(x, y)
						.filter(|&(nx, ny)| !self.opened[ny * self.width + nx]),
				);
			}
		}

		if self.is_cleared() {
			Ok(OpenOutcome::Cleared)
		} else {
			Ok(OpenOutcome::Opened)
		}
	}

	fn render_with(&self, reveal: bool) -> String {
		let mut out = String::new();

		for (y, row) in self.cells.chunks(self.width).enumerate() {
			if y != 0 {
				out.push('\n');
			}

			for (x, cell) in row.iter().enumerate() {
				if x != 0 {
					out.push(' ');
				}

				let shown = reveal || self.opened[y * self.width + x];
				out.push('`');
				match (shown, cell) {
					(false, _) => out.push_str(HIDDEN),
					(true, Cell::Bomb) => out.push_str(BOMB),
					(true, Cell::Number(count)) => out.push_str(&count.to_string()),
				}
				out.push('`');
			}
		}

		out
	}

	/// The board as the player sees it
	#[must_use]
	pub(crate) fn render(&self) -> String {
		self.render_with(false)
	}

	/// The board with every cell revealed
	#[must_use]
	pub(crate) fn render_answer(&self) -> String {
		self.render_with(true)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::{rngs::StdRng, SeedableRng};

	#[test]
	fn random_boards_hold_the_requested_bombs() {
		let board = Board::new(9, 9, 12, &mut StdRng::seed_from_u64(42)).unwrap();

		let bombs = (0..9)
			.flat_map(|y| (0..9).map(move |x| (x, y)))
			.filter(|&(x, y)| board.cell(x, y).unwrap() == Cell::Bomb)
			.count();
		assert_eq!(bombs, 12);
		assert_eq!(board.bombs(), 12);
	}

	#[test]
	fn invalid_boards_are_refused() {
		let mut rng = StdRng::seed_from_u64(0);

		assert_eq!(
			Board::new(0, 5, 1, &mut rng).unwrap_err(),
			BoardError::InvalidSize { width: 0, height: 5 }
		);
		assert_eq!(
			Board::new(101, 5, 1, &mut rng).unwrap_err(),
			BoardError::InvalidSize { width: 101, height: 5 }
		);
		assert_eq!(
			Board::new(2, 2, 4, &mut rng).unwrap_err(),
			BoardError::TooManyBombs { cells: 4, bombs: 4 }
		);
	}

	#[test]
	fn numbers_count_adjacent_bombs() {
		let board = Board::with_bombs(3, 3, &[(0, 0), (2, 2)]).unwrap();

		assert_eq!(board.cell(1, 1).unwrap(), Cell::Number(2));
		assert_eq!(board.cell(1, 0).unwrap(), Cell::Number(1));
		assert_eq!(board.cell(2, 0).unwrap(), Cell::Number(0));
		assert_eq!(board.cell(0, 0).unwrap(), Cell::Bomb);
	}

	#[test]
	fn zero_cells_open_their_neighbours() {
		let mut board = Board::with_bombs(4, 4, &[(3, 3)]).unwrap();

		assert_eq!(board.open(0, 0).unwrap(), OpenOutcome::Cleared);
		assert!(!board.is_opened(3, 3).unwrap());
	}

	#[test]
	fn opening_twice_or_a_bomb() {
		let mut board = Board::with_bombs(3, 1, &[(0, 0)]).unwrap();

		assert_eq!(board.open(1, 0).unwrap(), OpenOutcome::Opened);
		assert_eq!(board.open(1, 0).unwrap(), OpenOutcome::AlreadyOpened);
		assert_eq!(board.open(0, 0).unwrap(), OpenOutcome::GameOver);
		assert_eq!(board.open(5, 0).unwrap_err(), BoardError::OutOfBounds { x: 5, y: 0 });
	}

	#[test]
	fn rendering_hides_closed_cells() {
		let mut board = Board::with_bombs(2, 2, &[(0, 0)]).unwrap();
		board.open(1, 1).unwrap();

		assert_eq!(board.render(), "`■` `■`\n`■` `1`");
		assert_eq!(board.render_answer(), "`💣` `1`\n`1` `1`");
	}
}
