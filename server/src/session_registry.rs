//! Registry of live matches and of which connection sits in which match
//!
//! Matches are created lazily by the first join for an unknown identifier and
//! dropped, board and all, as soon as their last player leaves. The registry
//! is an ordinary owned value; the network layer keeps exactly one and is its
//! only writer, which serializes every mutation of every match.

use crate::error::{JoinError, MoveError};
use crate::match_engine::{MatchEngine, MoveOutcome};
use log::info;
use shared::{ConnectionId, PlayerInfo, MAX_MATCH_ID_CHARS};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// What happened when a connection left its match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub match_id: String,
    pub player: Option<PlayerInfo>,
    /// True when the match had no players left and was removed
    pub dissolved: bool,
}

#[derive(Debug)]
pub struct SessionRegistry {
    matches: HashMap<String, MatchEngine>,
    connections: HashMap<ConnectionId, String>,
    default_board_size: usize,
}

impl SessionRegistry {
    pub fn new(default_board_size: usize) -> Self {
        Self {
            matches: HashMap::new(),
            connections: HashMap::new(),
            default_board_size,
        }
    }

    /// Seats `connection_id` in `match_id`, creating the match if needed
    ///
    /// `board_size` only applies when this join creates the match. Joining the
    /// match a connection already sits in is a no-op; joining any other match
    /// while seated is refused, as is joining a full match. Identifiers that
    /// are empty or longer than `MAX_MATCH_ID_CHARS` never create a match.
    pub fn handle_join(
        &mut self,
        match_id: &str,
        connection_id: ConnectionId,
        display_name: &str,
        board_size: Option<usize>,
    ) -> Result<&MatchEngine, JoinError> {
        let id_chars = match_id.chars().count();
        if id_chars == 0 || id_chars > MAX_MATCH_ID_CHARS {
            return Err(JoinError::InvalidMatchId);
        }

        if let Some(current) = self.connections.get(&connection_id) {
            if current != match_id {
                return Err(JoinError::AlreadyInMatch(current.clone()));
            }
        }

        let engine = match self.matches.entry(match_id.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let size = board_size.unwrap_or(self.default_board_size);
                let engine = MatchEngine::new(match_id, size)?;
                info!("Created match {} ({}x{})", match_id, size, size);
                entry.insert(engine)
            }
        };

        if engine.join(connection_id, display_name).is_none() {
            return Err(JoinError::MatchFull);
        }
        self.connections.insert(connection_id, match_id.to_string());

        Ok(engine)
    }

    /// Unseats a connection from whatever match it is in
    ///
    /// The connection mapping is always cleared. Returns None when the
    /// connection was not in a match.
    pub fn handle_disconnect_or_leave(&mut self, connection_id: ConnectionId) -> Option<LeaveOutcome> {
        let match_id = self.connections.remove(&connection_id)?;
        let engine = self.matches.get_mut(&match_id)?;

        let player = engine.leave(connection_id);
        let dissolved = engine.is_empty();
        if dissolved {
            self.matches.remove(&match_id);
            info!("Match {} dissolved", match_id);
        }

        Some(LeaveOutcome {
            match_id,
            player,
            dissolved,
        })
    }

    pub fn handle_move(
        &mut self,
        match_id: &str,
        connection_id: ConnectionId,
        row: i64,
        col: i64,
    ) -> Result<MoveOutcome, MoveError> {
        self.matches
            .get_mut(match_id)
            .ok_or(MoveError::MatchNotFound)?
            .attempt_move(connection_id, row, col)
    }

    pub fn lookup(&self, match_id: &str) -> Option<&MatchEngine> {
        self.matches.get(match_id)
    }

    /// The match a connection is currently seated in
    pub fn match_of(&self, connection_id: ConnectionId) -> Option<&str> {
        self.connections.get(&connection_id).map(String::as_str)
    }

    /// Number of live matches
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}
