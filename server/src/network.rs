//! Server network layer handling UDP communications and match event routing

use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::session_registry::SessionRegistry;
use crate::utils::{get_timestamp, normalize_player_name, truncate_chat};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{ConnectionId, Packet, MAX_DATAGRAM_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: ConnectionId,
    },
}

/// Messages sent from the event loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    SendToClients {
        packet: Packet,
        recipients: Vec<ConnectionId>,
    },
}

/// Main server: one event loop owning every match
///
/// The loop is the registry's only writer, so moves within a match are
/// applied one at a time in arrival order.
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    registry: SessionRegistry,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: Option<mpsc::UnboundedReceiver<GameMessage>>,
}

impl Server {
    pub async fn new(config: &ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;

        let socket = Arc::new(UdpSocket::bind(config.bind_address()).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(
                config.max_clients,
                config.client_timeout(),
            ))),
            registry: SessionRegistry::new(config.board_size),
            server_tx,
            server_rx,
            game_tx,
            game_rx: Some(game_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let Some(mut game_rx) = self.game_rx.take() else {
            return;
        };

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::SendToClients { packet, recipients } => {
                        let client_addrs: Vec<(ConnectionId, SocketAddr)> = {
                            let clients_guard = clients.read().await;
                            recipients
                                .iter()
                                .filter_map(|id| clients_guard.addr_of(*id).map(|addr| (*id, addr)))
                                .collect()
                        };

                        for (client_id, addr) in client_addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn send_to_clients(&self, packet: Packet, recipients: Vec<ConnectionId>) {
        if recipients.is_empty() {
            return;
        }
        if let Err(e) = self
            .game_tx
            .send(GameMessage::SendToClients { packet, recipients })
        {
            error!("Failed to queue packet for clients: {}", e);
        }
    }

    /// Sends the current state of a match to everyone seated in it
    fn broadcast_match_state(&self, match_id: &str) {
        if let Some(engine) = self.registry.lookup(match_id) {
            self.send_to_clients(Packet::MatchState(engine.snapshot()), engine.connection_ids());
        }
    }

    /// Releases the client's seat and updates whoever is left in the match
    fn leave_match(&mut self, client_id: ConnectionId) {
        if let Some(outcome) = self.registry.handle_disconnect_or_leave(client_id) {
            if !outcome.dissolved {
                self.broadcast_match_state(&outcome.match_id);
            }
        }
    }

    /// Processes incoming packets and updates match state
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        if let Packet::Connect { client_version } = packet {
            self.handle_connect(client_version, addr).await;
            return;
        }

        let client_id = {
            let mut clients = self.clients.write().await;
            clients.touch(addr)
        };
        let Some(client_id) = client_id else {
            warn!("Packet from unknown client at {}", addr);
            return;
        };

        match packet {
            Packet::Heartbeat => {}

            Packet::JoinMatch {
                match_id,
                player_name,
                board_size,
            } => {
                let name = normalize_player_name(&player_name, client_id);
                let joined = self
                    .registry
                    .handle_join(&match_id, client_id, &name, board_size)
                    .map(|_| ());
                match joined {
                    Ok(()) => self.broadcast_match_state(&match_id),
                    Err(e) => {
                        warn!("Client {} could not join {}: {}", client_id, match_id, e);
                        self.send_packet(
                            Packet::Error {
                                reason: e.to_string(),
                            },
                            addr,
                        );
                    }
                }
            }

            Packet::MakeMove { match_id, row, col } => {
                match self.registry.handle_move(&match_id, client_id, row, col) {
                    Ok(outcome) => {
                        self.broadcast_match_state(&match_id);
                        if let Some(result) = outcome.game_over {
                            if let Some(engine) = self.registry.lookup(&match_id) {
                                self.send_to_clients(Packet::GameOver(result), engine.connection_ids());
                            }
                        }
                    }
                    Err(e) => {
                        debug!(
                            "Rejected move ({}, {}) from client {} in {}: {}",
                            row, col, client_id, match_id, e
                        );
                        self.send_packet(
                            Packet::Error {
                                reason: e.to_string(),
                            },
                            addr,
                        );
                    }
                }
            }

            Packet::LeaveMatch => self.leave_match(client_id),

            Packet::Chat { match_id, message } => {
                let Some(engine) = self.registry.lookup(&match_id) else {
                    return;
                };
                let Some(sender) = engine.player(client_id) else {
                    return;
                };
                let packet = Packet::ChatBroadcast {
                    player_name: sender.name.clone(),
                    message: truncate_chat(&message),
                    timestamp: get_timestamp(),
                };
                self.send_to_clients(packet, engine.connection_ids());
            }

            Packet::CursorMove {
                match_id,
                x,
                y,
                board_x,
                board_y,
            } => {
                let Some(engine) = self.registry.lookup(&match_id) else {
                    return;
                };
                let Some(sender) = engine.player(client_id) else {
                    return;
                };
                let packet = Packet::OpponentCursor {
                    player_name: sender.name.clone(),
                    player_number: sender.number,
                    x,
                    y,
                    board_x,
                    board_y,
                };
                let others = engine
                    .connection_ids()
                    .into_iter()
                    .filter(|id| *id != client_id)
                    .collect();
                self.send_to_clients(packet, others);
            }

            Packet::Disconnect => {
                {
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&client_id);
                }
                self.leave_match(client_id);
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    async fn handle_connect(&mut self, client_version: u32, addr: SocketAddr) {
        info!(
            "Client connecting from {} (version: {})",
            addr, client_version
        );

        if client_version != PROTOCOL_VERSION {
            self.send_packet(
                Packet::Disconnected {
                    reason: "Protocol version mismatch".to_string(),
                },
                addr,
            );
            return;
        }

        // Remove existing connection if present
        let existing_client_id = {
            let mut clients = self.clients.write().await;
            let existing = clients.find_client_by_addr(addr);
            if let Some(existing_id) = existing {
                info!("Removing existing client {} from {}", existing_id, addr);
                clients.remove_client(&existing_id);
            }
            existing
        };
        if let Some(existing_id) = existing_client_id {
            self.leave_match(existing_id);
        }

        let client_id = {
            let mut clients = self.clients.write().await;
            clients.add_client(addr)
        };

        let response = match client_id {
            Some(client_id) => Packet::Connected { client_id },
            None => Packet::Disconnected {
                reason: "Server full".to_string(),
            },
        };
        self.send_packet(response, addr);
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::PacketReceived { packet, addr } => {
                    self.handle_packet(packet, addr).await;
                }
                ServerMessage::ClientTimeout { client_id } => {
                    info!("Client {} timed out", client_id);
                    self.leave_match(client_id);
                }
            }
        }

        info!("Server shutting down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::net::{IpAddr, Ipv4Addr};

    fn test_config() -> ServerConfig {
        ServerConfig::parse_from(["server", "--port", "0", "--board-size", "8"])
    }

    #[test]
    fn test_server_message_creation() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080);
        let msg = ServerMessage::PacketReceived {
            packet: Packet::Connect { client_version: 1 },
            addr,
        };

        match msg {
            ServerMessage::PacketReceived { packet: p, addr: a } => {
                assert_eq!(a, addr);
                assert!(matches!(p, Packet::Connect { client_version: 1 }));
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[tokio::test]
    async fn test_server_binds_ephemeral_port() {
        let server = Server::new(&test_config()).await.unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_server_rejects_invalid_board_size() {
        let config = ServerConfig::parse_from(["server", "--port", "0", "--board-size", "3"]);
        assert!(Server::new(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_join_and_move_queue_packets() {
        let mut server = Server::new(&test_config()).await.unwrap();
        let mut outbound = server.game_rx.take().unwrap();
        let alice: SocketAddr = "127.0.0.1:40001".parse().unwrap();
        let bob: SocketAddr = "127.0.0.1:40002".parse().unwrap();

        server
            .handle_packet(Packet::Connect { client_version: PROTOCOL_VERSION }, alice)
            .await;
        server
            .handle_packet(Packet::Connect { client_version: PROTOCOL_VERSION }, bob)
            .await;
        for (addr, name) in [(alice, "alice"), (bob, "bob")] {
            server
                .handle_packet(
                    Packet::JoinMatch {
                        match_id: "room".to_string(),
                        player_name: name.to_string(),
                        board_size: None,
                    },
                    addr,
                )
                .await;
        }

        server
            .handle_packet(
                Packet::MakeMove {
                    match_id: "room".to_string(),
                    row: 0,
                    col: 0,
                },
                alice,
            )
            .await;

        let mut messages = Vec::new();
        while let Ok(message) = outbound.try_recv() {
            messages.push(message);
        }

        // Two Connected replies, two state broadcasts, one error
        assert_eq!(messages.len(), 5);
        match messages.last().unwrap() {
            GameMessage::SendPacket {
                packet: Packet::Error { reason },
                addr,
            } => {
                assert_eq!(*addr, alice);
                assert_eq!(reason, "Invalid move");
            }
            other => panic!("Unexpected message {:?}", other),
        }
        match &messages[3] {
            GameMessage::SendToClients {
                packet: Packet::MatchState(snapshot),
                recipients,
            } => {
                assert!(snapshot.started);
                assert_eq!(recipients.len(), 2);
            }
            other => panic!("Unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_version_mismatch_is_refused() {
        let mut server = Server::new(&test_config()).await.unwrap();
        let mut outbound = server.game_rx.take().unwrap();
        let addr: SocketAddr = "127.0.0.1:40003".parse().unwrap();

        server
            .handle_packet(Packet::Connect { client_version: 99 }, addr)
            .await;

        match outbound.try_recv().unwrap() {
            GameMessage::SendPacket {
                packet: Packet::Disconnected { reason },
                ..
            } => assert_eq!(reason, "Protocol version mismatch"),
            other => panic!("Unexpected message {:?}", other),
        }
        assert!(server.clients.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_match_id_is_refused_to_sender() {
        let mut server = Server::new(&test_config()).await.unwrap();
        let mut outbound = server.game_rx.take().unwrap();
        let addr: SocketAddr = "127.0.0.1:40005".parse().unwrap();

        server
            .handle_packet(Packet::Connect { client_version: PROTOCOL_VERSION }, addr)
            .await;
        server
            .handle_packet(
                Packet::JoinMatch {
                    match_id: "x".repeat(60_000),
                    player_name: "alice".to_string(),
                    board_size: Some(64),
                },
                addr,
            )
            .await;

        assert!(matches!(
            outbound.try_recv().unwrap(),
            GameMessage::SendPacket { packet: Packet::Connected { .. }, .. }
        ));
        match outbound.try_recv().unwrap() {
            GameMessage::SendPacket {
                packet: Packet::Error { reason },
                addr: to,
            } => {
                assert_eq!(to, addr);
                assert_eq!(reason, "Match id must be 1 to 64 characters");
            }
            other => panic!("Unexpected message {:?}", other),
        }
        assert!(outbound.try_recv().is_err());
        assert!(server.registry.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_dissolves_match() {
        let mut server = Server::new(&test_config()).await.unwrap();
        let _outbound = server.game_rx.take().unwrap();
        let addr: SocketAddr = "127.0.0.1:40004".parse().unwrap();

        server
            .handle_packet(Packet::Connect { client_version: PROTOCOL_VERSION }, addr)
            .await;
        server
            .handle_packet(
                Packet::JoinMatch {
                    match_id: "solo".to_string(),
                    player_name: "alice".to_string(),
                    board_size: Some(4),
                },
                addr,
            )
            .await;
        assert!(server.registry.lookup("solo").is_some());

        server.handle_packet(Packet::Disconnect, addr).await;
        assert!(server.registry.lookup("solo").is_none());
        assert!(server.clients.read().await.is_empty());
    }
}
