//! Authoritative rules engine for a single match
//!
//! A `MatchEngine` owns one board and up to two seated players. It validates
//! each proposed move, commits captures, advances the turn (skipping a player
//! who cannot move) and detects the end of the game. It never talks to the
//! network; callers turn its results into packets.

use crate::error::MoveError;
use log::{debug, info};
use shared::{
    has_legal_move, Board, BoardError, Cell, ConnectionId, GameOutcome, MatchSnapshot,
    PlayerInfo, PlayerNumber, Position,
};

/// Result of an accepted move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub placed: Position,
    pub captured: Vec<Position>,
    /// Set when neither player can move after this one
    pub game_over: Option<GameOutcome>,
}

#[derive(Debug, Clone)]
pub struct MatchEngine {
    id: String,
    board: Board,
    /// Seated players, always ordered by player number
    players: Vec<PlayerInfo>,
    /// Index into `players` of the player to move; only meaningful with two seated
    current_player: usize,
    started: bool,
    outcome: Option<GameOutcome>,
}

impl MatchEngine {
    pub fn new(match_id: impl Into<String>, board_size: usize) -> Result<Self, BoardError> {
        Ok(Self::with_board(match_id, Board::new(board_size)?))
    }

    /// Starts a match from an arbitrary position
    ///
    /// Player 1 moves first unless the position leaves them without a legal
    /// move, in which case the turn is settled once both seats fill.
    pub fn with_board(match_id: impl Into<String>, board: Board) -> Self {
        Self {
            id: match_id.into(),
            board,
            players: Vec::with_capacity(2),
            current_player: 0,
            started: false,
            outcome: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn players(&self) -> &[PlayerInfo] {
        &self.players
    }

    pub fn player(&self, connection_id: ConnectionId) -> Option<&PlayerInfo> {
        self.players
            .iter()
            .find(|player| player.connection_id == connection_id)
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.players.iter().map(|player| player.connection_id).collect()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= 2
    }

    pub fn outcome(&self) -> Option<&GameOutcome> {
        self.outcome.as_ref()
    }

    /// The player whose turn it is, None until both seats are filled
    pub fn player_to_move(&self) -> Option<&PlayerInfo> {
        if self.players.len() == 2 {
            self.players.get(self.current_player)
        } else {
            None
        }
    }

    /// Seats a player and returns their number
    ///
    /// Returns None without changing anything when both seats are taken. A
    /// connection that is already seated keeps its seat. A seat vacated
    /// mid-match is refilled with the same player number, so numbers stay
    /// unique.
    pub fn join(&mut self, connection_id: ConnectionId, name: impl Into<String>) -> Option<PlayerNumber> {
        if let Some(existing) = self.player(connection_id) {
            return Some(existing.number);
        }
        if self.is_full() {
            return None;
        }

        let number = if self.players.iter().any(|p| p.number == PlayerNumber::One) {
            PlayerNumber::Two
        } else {
            PlayerNumber::One
        };

        let player = PlayerInfo {
            connection_id,
            name: name.into(),
            number,
        };
        info!(
            "Match {}: {} joined as player {}",
            self.id,
            player.name,
            number.as_u8()
        );

        match number {
            PlayerNumber::One => self.players.insert(0, player),
            PlayerNumber::Two => self.players.push(player),
        }

        if self.players.len() == 2 && !self.started {
            self.started = true;
            info!("Match {} started", self.id);
            self.settle_opening_turn();
        }

        Some(number)
    }

    /// Unseats a connection if present and returns who left
    pub fn leave(&mut self, connection_id: ConnectionId) -> Option<PlayerInfo> {
        let index = self
            .players
            .iter()
            .position(|player| player.connection_id == connection_id)?;
        let player = self.players.remove(index);
        info!("Match {}: {} left", self.id, player.name);

        if self.players.is_empty() {
            self.started = false;
        }

        Some(player)
    }

    /// Validates and applies a move for `connection_id` at (`row`, `col`)
    ///
    /// Checks run in a fixed order and the board is untouched on any error.
    /// The capture set is computed once and the same set is committed.
    pub fn attempt_move(
        &mut self,
        connection_id: ConnectionId,
        row: i64,
        col: i64,
    ) -> Result<MoveOutcome, MoveError> {
        if !self.started || self.players.len() != 2 {
            return Err(MoveError::NotReady);
        }

        let mover = self.players[self.current_player].clone();
        if mover.connection_id != connection_id {
            return Err(MoveError::OutOfTurn);
        }

        if !self.board.in_bounds(row, col) {
            return Err(MoveError::OutOfBounds);
        }
        let target = Position::new(row as usize, col as usize);

        if self.board.get(target) != Some(Cell::Empty) {
            return Err(MoveError::CellOccupied);
        }

        let captured = self.board.captures(target, mover.number);
        if captured.is_empty() {
            return Err(MoveError::NoCapture);
        }

        self.board.place(target, mover.number, &captured);
        debug!(
            "Match {}: player {} placed at ({}, {}) capturing {}",
            self.id,
            mover.number.as_u8(),
            row,
            col,
            captured.len()
        );

        let game_over = self.advance_turn(mover.number);

        Ok(MoveOutcome {
            placed: target,
            captured,
            game_over,
        })
    }

    /// Makes sure the first player to move can actually move
    fn settle_opening_turn(&mut self) {
        let first = self.players[self.current_player].number;
        if self.outcome.is_some() || has_legal_move(&self.board, first) {
            return;
        }

        if has_legal_move(&self.board, first.opponent()) {
            debug!(
                "Match {}: player {} has no opening move and passes",
                self.id,
                first.as_u8()
            );
            self.current_player = 1 - self.current_player;
        } else {
            self.finish();
        }
    }

    /// Hands the turn to the opponent, back to the mover when the opponent is
    /// stuck, or ends the match when nobody can move
    fn advance_turn(&mut self, mover: PlayerNumber) -> Option<GameOutcome> {
        let other = 1 - self.current_player;

        if has_legal_move(&self.board, self.players[other].number) {
            self.current_player = other;
            return None;
        }

        if has_legal_move(&self.board, mover) {
            debug!(
                "Match {}: player {} has no legal move and passes",
                self.id,
                mover.opponent().as_u8()
            );
            return None;
        }

        Some(self.finish())
    }

    fn finish(&mut self) -> GameOutcome {
        let outcome = self.final_outcome();
        info!(
            "Match {} over: {} ({} - {})",
            self.id,
            outcome
                .winner
                .as_ref()
                .map(|winner| winner.name.as_str())
                .unwrap_or("draw"),
            outcome.scores.player1,
            outcome.scores.player2
        );
        self.outcome = Some(outcome.clone());
        outcome
    }

    fn final_outcome(&self) -> GameOutcome {
        let scores = self.board.scores();
        let winner = scores.leader().and_then(|number| {
            self.players
                .iter()
                .find(|player| player.number == number)
                .cloned()
        });
        GameOutcome { winner, scores }
    }

    /// Read-only projection with piece counts recomputed from the board
    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            match_id: self.id.clone(),
            board: self.board.clone(),
            players: self.players.clone(),
            current_player: (self.players.len() == 2).then_some(self.current_player),
            started: self.started,
            scores: self.board.scores(),
            outcome: self.outcome.clone(),
        }
    }
}
