//! Headless scripted player: connects, joins a match and plays random legal
//! moves until the game ends

use bincode::{deserialize, serialize};
use clap::Parser;
use log::{info, warn};
use rand::seq::SliceRandom;
use shared::{legal_moves, MatchSnapshot, Packet, MAX_DATAGRAM_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep};

#[derive(Parser, Debug)]
#[command(author, version, about = "Scripted Reversi player for exercising a match server")]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:5001")]
    server: String,

    /// Match to join
    #[arg(short = 'm', long, default_value = "test-match")]
    match_id: String,

    /// Display name
    #[arg(short = 'n', long, default_value = "bot")]
    name: String,

    /// Board size requested if this client creates the match
    #[arg(short = 'b', long)]
    board_size: Option<usize>,

    /// Delay before each move in milliseconds
    #[arg(short = 'd', long, default_value = "200")]
    move_delay: u64,
}

async fn send(
    socket: &UdpSocket,
    packet: &Packet,
    server_addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = serialize(packet)?;
    socket.send_to(&data, server_addr).await?;
    Ok(())
}

/// Picks a random legal cell if the snapshot says it is our turn
fn choose_move(snapshot: &MatchSnapshot, client_id: u32) -> Option<(i64, i64)> {
    if snapshot.outcome.is_some() {
        return None;
    }
    let me = snapshot.player_to_move()?;
    if me.connection_id != client_id {
        return None;
    }

    let moves = legal_moves(&snapshot.board, me.number);
    moves
        .choose(&mut rand::thread_rng())
        .map(|pos| (pos.row as i64, pos.col as i64))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    let server_addr = args.server.parse::<SocketAddr>()?;
    info!("Client socket bound to {}", socket.local_addr()?);

    send(
        &socket,
        &Packet::Connect {
            client_version: PROTOCOL_VERSION,
        },
        server_addr,
    )
    .await?;

    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut heartbeat = interval(Duration::from_secs(2));
    let mut client_id = None;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if client_id.is_some() {
                    send(&socket, &Packet::Heartbeat, server_addr).await?;
                }
            }
            received = socket.recv_from(&mut buf) => {
                let (len, _) = received?;
                let packet = match deserialize::<Packet>(&buf[0..len]) {
                    Ok(packet) => packet,
                    Err(e) => {
                        warn!("Failed to deserialize packet: {}", e);
                        continue;
                    }
                };

                match packet {
                    Packet::Connected { client_id: id } => {
                        info!("Connection accepted with client ID: {}", id);
                        client_id = Some(id);
                        let join = Packet::JoinMatch {
                            match_id: args.match_id.clone(),
                            player_name: args.name.clone(),
                            board_size: args.board_size,
                        };
                        send(&socket, &join, server_addr).await?;
                    }
                    Packet::MatchState(snapshot) => {
                        println!(
                            "{} | player 1: {}  player 2: {}",
                            snapshot.match_id, snapshot.scores.player1, snapshot.scores.player2
                        );
                        print!("{}", snapshot.board);

                        let Some(id) = client_id else { continue };
                        if let Some((row, col)) = choose_move(&snapshot, id) {
                            sleep(Duration::from_millis(args.move_delay)).await;
                            let packet = Packet::MakeMove {
                                match_id: args.match_id.clone(),
                                row,
                                col,
                            };
                            send(&socket, &packet, server_addr).await?;
                        }
                    }
                    Packet::GameOver(outcome) => {
                        match outcome.winner {
                            Some(winner) => println!(
                                "Game over: {} wins {} - {}",
                                winner.name, outcome.scores.player1, outcome.scores.player2
                            ),
                            None => println!("Game over: draw"),
                        }
                        break;
                    }
                    Packet::Error { reason } => warn!("Server rejected request: {}", reason),
                    Packet::ChatBroadcast { player_name, message, .. } => {
                        println!("[{}] {}", player_name, message);
                    }
                    Packet::Disconnected { reason } => {
                        warn!("Disconnected: {}", reason);
                        return Ok(());
                    }
                    other => info!("Ignoring packet: {:?}", other),
                }
            }
        }
    }

    send(&socket, &Packet::Disconnect, server_addr).await?;
    info!("Test client finished");
    Ok(())
}
