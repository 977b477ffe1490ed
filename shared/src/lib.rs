pub mod board;

pub use board::{
    has_legal_move, legal_moves, Board, BoardError, Cell, PlayerNumber, Position, Scores,
    DEFAULT_BOARD_SIZE, DIRECTIONS, MAX_BOARD_SIZE, MIN_BOARD_SIZE,
};

use serde::{Deserialize, Serialize};

/// Server-assigned identifier of one client connection
pub type ConnectionId = u32;

pub const PROTOCOL_VERSION: u32 = 1;

/// Largest UDP payload either side will send; a full-size board snapshot fits
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Longest match identifier the server accepts, in characters
pub const MAX_MATCH_ID_CHARS: usize = 64;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    pub connection_id: ConnectionId,
    pub name: String,
    pub number: PlayerNumber,
}

/// Final result of a match; `winner` is None on a draw
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GameOutcome {
    pub winner: Option<PlayerInfo>,
    pub scores: Scores,
}

/// Everything a renderer needs to draw one match at one instant
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MatchSnapshot {
    pub match_id: String,
    pub board: Board,
    pub players: Vec<PlayerInfo>,
    /// Index into `players` of the player to move, None with fewer than two seated
    pub current_player: Option<usize>,
    pub started: bool,
    pub scores: Scores,
    pub outcome: Option<GameOutcome>,
}

impl MatchSnapshot {
    pub fn player_to_move(&self) -> Option<&PlayerInfo> {
        self.current_player.and_then(|index| self.players.get(index))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    Heartbeat,
    JoinMatch {
        match_id: String,
        player_name: String,
        board_size: Option<usize>,
    },
    MakeMove {
        match_id: String,
        row: i64,
        col: i64,
    },
    LeaveMatch,
    Chat {
        match_id: String,
        message: String,
    },
    CursorMove {
        match_id: String,
        x: f32,
        y: f32,
        board_x: i64,
        board_y: i64,
    },
    Disconnect,

    Connected {
        client_id: ConnectionId,
    },
    MatchState(MatchSnapshot),
    GameOver(GameOutcome),
    Error {
        reason: String,
    },
    ChatBroadcast {
        player_name: String,
        message: String,
        timestamp: u64,
    },
    OpponentCursor {
        player_name: String,
        player_number: PlayerNumber,
        x: f32,
        y: f32,
        board_x: i64,
        board_y: i64,
    },
    Disconnected {
        reason: String,
    },
}
