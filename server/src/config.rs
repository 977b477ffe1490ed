//! Command-line configuration for the match server

use clap::Parser;
use shared::{Board, BoardError, DEFAULT_BOARD_SIZE};
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Authoritative server for two-player Reversi matches")]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "5001")]
    pub port: u16,

    /// Maximum number of simultaneously connected clients
    #[arg(short, long, default_value = "256")]
    pub max_clients: usize,

    /// Board side length for matches whose creator does not pick one
    #[arg(short, long, default_value_t = DEFAULT_BOARD_SIZE)]
    pub board_size: usize,

    /// Seconds of silence before a client is dropped and its seat released
    #[arg(short = 't', long, default_value = "10")]
    pub client_timeout_secs: u64,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }

    /// Rejects settings that would make every match creation fail
    pub fn validate(&self) -> Result<(), BoardError> {
        Board::new(self.board_size).map(|_| ())
    }
}
