//! Board model and the capture rule shared by the authority and by renderers
//!
//! Everything in here is pure: the server uses it to validate and commit moves,
//! clients use the same functions to highlight legal targets, so the two can
//! never disagree about which cells are playable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_BOARD_SIZE: usize = 32;
pub const MIN_BOARD_SIZE: usize = 4;
pub const MAX_BOARD_SIZE: usize = 64;

/// The eight compass directions as (row, col) steps
pub const DIRECTIONS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerNumber {
    One,
    Two,
}

impl PlayerNumber {
    pub fn opponent(self) -> Self {
        match self {
            PlayerNumber::One => PlayerNumber::Two,
            PlayerNumber::Two => PlayerNumber::One,
        }
    }

    /// Numeric form used in human-facing output (1 or 2)
    pub fn as_u8(self) -> u8 {
        match self {
            PlayerNumber::One => 1,
            PlayerNumber::Two => 2,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Player1,
    Player2,
}

impl Cell {
    pub fn owner(self) -> Option<PlayerNumber> {
        match self {
            Cell::Empty => None,
            Cell::Player1 => Some(PlayerNumber::One),
            Cell::Player2 => Some(PlayerNumber::Two),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

impl From<PlayerNumber> for Cell {
    fn from(player: PlayerNumber) -> Self {
        match player {
            PlayerNumber::One => Cell::Player1,
            PlayerNumber::Two => Cell::Player2,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Piece counts per player
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scores {
    pub player1: usize,
    pub player2: usize,
}

impl Scores {
    pub fn get(&self, player: PlayerNumber) -> usize {
        match player {
            PlayerNumber::One => self.player1,
            PlayerNumber::Two => self.player2,
        }
    }

    /// The player holding strictly more pieces, None on a tie
    pub fn leader(&self) -> Option<PlayerNumber> {
        if self.player1 > self.player2 {
            Some(PlayerNumber::One)
        } else if self.player2 > self.player1 {
            Some(PlayerNumber::Two)
        } else {
            None
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("Board size {0} must be even and between 4 and 64")]
    InvalidSize(usize),

    #[error("Malformed board text: {0}")]
    Malformed(String),
}

/// Square grid stored row-major
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Creates a board with the four center cells set up diagonally
    ///
    /// Player 2 owns the top-left and bottom-right center cells, player 1 the
    /// other two.
    pub fn new(size: usize) -> Result<Self, BoardError> {
        if size % 2 != 0 || !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) {
            return Err(BoardError::InvalidSize(size));
        }

        let mut board = Self {
            size,
            cells: vec![Cell::Empty; size * size],
        };

        let center = size / 2;
        board.set(Position::new(center - 1, center - 1), Cell::Player2);
        board.set(Position::new(center - 1, center), Cell::Player1);
        board.set(Position::new(center, center - 1), Cell::Player1);
        board.set(Position::new(center, center), Cell::Player2);

        Ok(board)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn in_bounds(&self, row: i64, col: i64) -> bool {
        let size = self.size as i64;
        (0..size).contains(&row) && (0..size).contains(&col)
    }

    /// Returns the cell at `pos`, or None when it lies off the board
    pub fn get(&self, pos: Position) -> Option<Cell> {
        if pos.row < self.size && pos.col < self.size {
            Some(self.cells[pos.row * self.size + pos.col])
        } else {
            None
        }
    }

    fn set(&mut self, pos: Position, cell: Cell) {
        let index = pos.row * self.size + pos.col;
        self.cells[index] = cell;
    }

    fn step(&self, pos: Position, (dr, dc): (isize, isize)) -> Option<Position> {
        let row = pos.row.checked_add_signed(dr)?;
        let col = pos.col.checked_add_signed(dc)?;
        (row < self.size && col < self.size).then_some(Position { row, col })
    }

    /// Computes every opponent cell flipped by `player` placing at `pos`
    ///
    /// Walks each direction collecting consecutive opponent cells; the run only
    /// counts when it is closed by one of the mover's own pieces. An empty cell
    /// or the board edge discards it. Occupied or off-board targets capture
    /// nothing.
    pub fn captures(&self, pos: Position, player: PlayerNumber) -> Vec<Position> {
        if self.get(pos) != Some(Cell::Empty) {
            return Vec::new();
        }

        let opponent = Cell::from(player.opponent());
        let mine = Cell::from(player);
        let mut captured = Vec::new();

        for direction in DIRECTIONS {
            let mut run = Vec::new();
            let mut cursor = self.step(pos, direction);

            while let Some(next) = cursor {
                let cell = self.cells[next.row * self.size + next.col];
                if cell == opponent {
                    run.push(next);
                    cursor = self.step(next, direction);
                } else {
                    if cell == mine {
                        captured.extend(run.drain(..));
                    }
                    break;
                }
            }
        }

        captured
    }

    /// Places `player` at `pos` and flips a capture set previously computed by
    /// [`Board::captures`] against this same board
    pub fn place(&mut self, pos: Position, player: PlayerNumber, captures: &[Position]) {
        let cell = Cell::from(player);
        self.set(pos, cell);
        for captured in captures {
            self.set(*captured, cell);
        }
    }

    pub fn count(&self, player: PlayerNumber) -> usize {
        let cell = Cell::from(player);
        self.cells.iter().filter(|c| **c == cell).count()
    }

    pub fn scores(&self) -> Scores {
        Scores {
            player1: self.count(PlayerNumber::One),
            player2: self.count(PlayerNumber::Two),
        }
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = Position> + '_ {
        let size = self.size;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_empty())
            .map(move |(index, _)| Position::new(index / size, index % size))
    }

    /// Iterates rows as slices, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.size)
    }
}

/// One line per row: `.` empty, `1` and `2` for the owning player
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for cell in row {
                let symbol = match cell {
                    Cell::Empty => '.',
                    Cell::Player1 => '1',
                    Cell::Player2 => '2',
                };
                write!(f, "{}", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Parses the [`Display`](fmt::Display) form; whitespace inside a row is ignored
impl FromStr for Board {
    type Err = BoardError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let rows: Vec<Vec<char>> = text
            .lines()
            .map(|line| line.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>())
            .filter(|row| !row.is_empty())
            .collect();

        let size = rows.len();
        if size % 2 != 0 || !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) {
            return Err(BoardError::InvalidSize(size));
        }

        let mut cells = Vec::with_capacity(size * size);
        for (index, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(BoardError::Malformed(format!(
                    "row {} has {} cells, expected {}",
                    index,
                    row.len(),
                    size
                )));
            }
            for symbol in row {
                cells.push(match symbol {
                    '.' => Cell::Empty,
                    '1' => Cell::Player1,
                    '2' => Cell::Player2,
                    other => {
                        return Err(BoardError::Malformed(format!(
                            "unexpected symbol '{}' in row {}",
                            other, index
                        )))
                    }
                });
            }
        }

        Ok(Self { size, cells })
    }
}

/// All cells where `player` could legally move, in row-major order
pub fn legal_moves(board: &Board, player: PlayerNumber) -> Vec<Position> {
    board
        .empty_cells()
        .filter(|pos| !board.captures(*pos, player).is_empty())
        .collect()
}

/// Whether `player` has at least one legal move; stops at the first one found
pub fn has_legal_move(board: &Board, player: PlayerNumber) -> bool {
    board
        .empty_cells()
        .any(|pos| !board.captures(pos, player).is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_creation() {
        let board = Board::new(8).unwrap();
        assert_eq!(board.size(), 8);
        assert_eq!(board.get(Position::new(3, 3)), Some(Cell::Player2));
        assert_eq!(board.get(Position::new(3, 4)), Some(Cell::Player1));
        assert_eq!(board.get(Position::new(4, 3)), Some(Cell::Player1));
        assert_eq!(board.get(Position::new(4, 4)), Some(Cell::Player2));
        assert_eq!(board.empty_cells().count(), 60);
    }

    #[test]
    fn test_board_invalid_sizes() {
        assert_eq!(Board::new(7), Err(BoardError::InvalidSize(7)));
        assert_eq!(Board::new(2), Err(BoardError::InvalidSize(2)));
        assert_eq!(
            Board::new(MAX_BOARD_SIZE + 2),
            Err(BoardError::InvalidSize(MAX_BOARD_SIZE + 2))
        );
        assert!(Board::new(MIN_BOARD_SIZE).is_ok());
        assert!(Board::new(MAX_BOARD_SIZE).is_ok());
    }

    #[test]
    fn test_default_board_center() {
        let board = Board::new(DEFAULT_BOARD_SIZE).unwrap();
        assert_eq!(board.get(Position::new(15, 15)), Some(Cell::Player2));
        assert_eq!(board.get(Position::new(16, 15)), Some(Cell::Player1));
        assert_eq!(board.scores(), Scores { player1: 2, player2: 2 });
    }

    #[test]
    fn test_get_out_of_bounds() {
        let board = Board::new(8).unwrap();
        assert_eq!(board.get(Position::new(8, 0)), None);
        assert_eq!(board.get(Position::new(0, 8)), None);
        assert!(!board.in_bounds(-1, 0));
        assert!(board.in_bounds(7, 7));
    }

    #[test]
    fn test_opening_legal_moves() {
        let board = Board::new(8).unwrap();
        let moves = legal_moves(&board, PlayerNumber::One);
        assert_eq!(
            moves,
            vec![
                Position::new(2, 3),
                Position::new(3, 2),
                Position::new(4, 5),
                Position::new(5, 4),
            ]
        );

        let moves = legal_moves(&board, PlayerNumber::Two);
        assert_eq!(
            moves,
            vec![
                Position::new(2, 4),
                Position::new(3, 5),
                Position::new(4, 2),
                Position::new(5, 3),
            ]
        );
    }

    #[test]
    fn test_captures_single_direction() {
        let board = Board::new(8).unwrap();
        let captured = board.captures(Position::new(2, 3), PlayerNumber::One);
        assert_eq!(captured, vec![Position::new(3, 3)]);
    }

    #[test]
    fn test_captures_on_occupied_cell_is_empty() {
        let board = Board::new(8).unwrap();
        assert!(board.captures(Position::new(3, 3), PlayerNumber::One).is_empty());
        assert!(board.captures(Position::new(9, 9), PlayerNumber::One).is_empty());
    }

    #[test]
    fn test_run_ending_at_edge_captures_nothing() {
        let mut board = Board::new(4).unwrap();
        // Row 1 becomes: _ P2 P2 P2, so the run from (1,0) reaches the edge
        board.place(Position::new(1, 3), PlayerNumber::Two, &[]);
        board.place(Position::new(1, 2), PlayerNumber::Two, &[]);

        let captured = board.captures(Position::new(1, 0), PlayerNumber::One);
        assert!(!captured.contains(&Position::new(1, 1)));
    }

    #[test]
    fn test_captures_multiple_directions() {
        let mut board = Board::new(8).unwrap();
        // Surround (2,2) so that it flanks in two directions at once
        board.place(Position::new(3, 2), PlayerNumber::Two, &[]);
        board.place(Position::new(4, 2), PlayerNumber::One, &[]);
        board.place(Position::new(4, 4), PlayerNumber::One, &[]);

        let mut captured = board.captures(Position::new(2, 2), PlayerNumber::One);
        captured.sort();
        assert_eq!(captured, vec![Position::new(3, 2), Position::new(3, 3)]);
    }

    #[test]
    fn test_place_flips_captures() {
        let mut board = Board::new(8).unwrap();
        let target = Position::new(2, 3);
        let captured = board.captures(target, PlayerNumber::One);
        board.place(target, PlayerNumber::One, &captured);

        assert_eq!(board.get(target), Some(Cell::Player1));
        assert_eq!(board.get(Position::new(3, 3)), Some(Cell::Player1));
        assert_eq!(board.scores(), Scores { player1: 4, player2: 1 });
    }

    #[test]
    fn test_has_legal_move_on_full_board() {
        let mut board = Board::new(4).unwrap();
        for row in 0..4 {
            for col in 0..4 {
                board.set(Position::new(row, col), Cell::Player1);
            }
        }
        assert!(!has_legal_move(&board, PlayerNumber::One));
        assert!(!has_legal_move(&board, PlayerNumber::Two));
        assert!(legal_moves(&board, PlayerNumber::Two).is_empty());
    }

    #[test]
    fn test_text_form_roundtrip() {
        let board = Board::new(4).unwrap();
        let text = board.to_string();
        assert_eq!(text, "....\n.21.\n.12.\n....\n");
        assert_eq!(text.parse::<Board>().unwrap(), board);
    }

    #[test]
    fn test_text_form_rejects_bad_input() {
        assert!(matches!(
            "1.\n..".parse::<Board>(),
            Err(BoardError::InvalidSize(2))
        ));
        assert!(matches!(
            "....\n....\n...\n....".parse::<Board>(),
            Err(BoardError::Malformed(_))
        ));
        assert!(matches!(
            "....\n..x.\n....\n....".parse::<Board>(),
            Err(BoardError::Malformed(_))
        ));
    }

    #[test]
    fn test_scores_leader() {
        assert_eq!(Scores { player1: 3, player2: 1 }.leader(), Some(PlayerNumber::One));
        assert_eq!(Scores { player1: 3, player2: 7 }.leader(), Some(PlayerNumber::Two));
        assert_eq!(Scores { player1: 5, player2: 5 }.leader(), None);
    }

    #[test]
    fn test_player_number_opponent() {
        assert_eq!(PlayerNumber::One.opponent(), PlayerNumber::Two);
        assert_eq!(PlayerNumber::Two.opponent(), PlayerNumber::One);
        assert_eq!(PlayerNumber::Two.as_u8(), 2);
        assert_eq!(Cell::from(PlayerNumber::One).owner(), Some(PlayerNumber::One));
    }
}
