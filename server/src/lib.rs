//! # Match Server Library
//!
//! This library provides the authoritative server for two-player Reversi
//! matches. It owns the canonical state of every live match, referees each
//! proposed move, and sends the resulting state to the players involved.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Rules
//! Clients only ever propose moves. The server checks each one against the
//! capture rule, flips the captured pieces, decides whose turn is next
//! (skipping a player with no legal move), and declares the end of the game
//! when neither player can move.
//!
//! ### Match Lifecycle
//! A match is created by the first join for an unknown identifier and
//! dropped as soon as its last player leaves or disconnects. Nothing about a
//! match survives it being emptied.
//!
//! ### Client Management
//! Remote addresses are mapped to connection ids, silent clients are timed
//! out, and their seats are released.
//!
//! ## Architecture Design
//!
//! ### Single-Writer Event Loop
//! One event loop owns the [`session_registry::SessionRegistry`] and handles
//! every inbound packet in arrival order. Moves within a match therefore never
//! interleave, and each accepted move sees the effects of all earlier ones.
//! Separate tasks receive datagrams, send datagrams and watch for timeouts;
//! they talk to the loop over channels.
//!
//! ### UDP-Based Communication
//! Packets are `bincode`-encoded [`shared::Packet`] values, one per datagram.
//!
//! ## Module Organization
//!
//! - [`match_engine`]: one match's board, seats, turn and result
//! - [`session_registry`]: match identifier to engine, connection to match
//! - [`client_manager`]: connected clients, capacity and liveness
//! - [`network`]: sockets, packet routing and the event loop
//! - [`config`]: command-line settings
//! - [`error`]: move and join rejections
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use clap::Parser;
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::parse();
//!     let mut server = Server::new(&config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod error;
pub mod match_engine;
pub mod network;
pub mod session_registry;
pub mod utils;
