//! TCP server for AI adapter
//!
//! Handles incoming connections and manages client lifecycle.
//! Uses tokio for async networking.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::core::GameState;
use crate::protocol::*;
use crate::runtime::{ClientCommand, InboundCommand, InboundPayload, OutboundMessage};

/// Stable 64-bit FNV-1a hasher for deterministic `state_hash`.
///
/// `DefaultHasher` output is not guaranteed stable across Rust versions.
#[derive(Debug, Clone)]
struct Fnv1aHasher {
    state: u64,
}

impl Fnv1aHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl std::hash::Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let rest = &s[start + 5..];
    let rest = rest[rest.find(':')? + 1..].trim_start();
    let end = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    if end == 0 {
        return None;
    }
    rest[..end].parse::<u64>().ok()
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub protocol_version: String,
    pub max_pending_commands: usize,
    pub log_path: Option<String>,
}

pub const DEFAULT_PORT: u16 = 7878;

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            protocol_version: PROTOCOL_VERSION.to_string(),
            max_pending_commands: 10,
            log_path: None,
        }
    }
}

impl ServerConfig {
    /// Create from `TWENTY48_AI_*` environment variables
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();

        let host = env::var("TWENTY48_AI_HOST")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.host);

        let port = match env::var("TWENTY48_AI_PORT") {
            Ok(s) => s.trim().parse().unwrap_or_else(|_| {
                warn!("ignoring invalid TWENTY48_AI_PORT={:?}", s);
                defaults.port
            }),
            Err(_) => defaults.port,
        };

        let max_pending_commands = env::var("TWENTY48_AI_MAX_PENDING")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.max_pending_commands);

        let log_path = env::var("TWENTY48_AI_LOG_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            host,
            port,
            protocol_version: defaults.protocol_version,
            max_pending_commands,
            log_path,
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid socket address {}:{}", self.host, self.port))
    }
}

/// Fail fast if `host:port` cannot be bound (e.g. another host already runs).
///
/// Port 0 always succeeds.
pub fn check_tcp_listen_available(host: &str, port: u16) -> std::io::Result<()> {
    if port == 0 {
        return Ok(());
    }
    let listener = std::net::TcpListener::bind((host, port))?;
    drop(listener);
    Ok(())
}

/// Shared server state
pub struct ServerState {
    config: ServerConfig,
    clients: RwLock<Vec<ClientHandle>>,
    controller: RwLock<Option<u64>>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            clients: RwLock::new(Vec::new()),
            controller: RwLock::new(None),
        }
    }

    /// Check if AI is disabled via `TWENTY48_AI_DISABLED`
    pub fn is_disabled() -> bool {
        std::env::var("TWENTY48_AI_DISABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    async fn is_handshaken(&self, client_id: u64) -> bool {
        let clients = self.clients.read().await;
        clients
            .iter()
            .find(|c| c.id == client_id)
            .map(|c| c.handshaken)
            .unwrap_or(false)
    }

    async fn is_controller(&self, client_id: u64) -> bool {
        *self.controller.read().await == Some(client_id)
    }

    /// Record `seq` for the client; false if it does not increase.
    async fn check_and_update_seq(&self, client_id: u64, seq: u64) -> bool {
        let mut clients = self.clients.write().await;
        let Some(client) = clients.iter_mut().find(|c| c.id == client_id) else {
            return true;
        };

        match client.last_seq {
            Some(prev) if seq <= prev => false,
            _ => {
                client.last_seq = Some(seq);
                true
            }
        }
    }
}

/// Handle to a connected client
pub struct ClientHandle {
    pub id: u64,
    pub addr: SocketAddr,
    pub stream_observations: bool,
    pub handshaken: bool,
    pub last_seq: Option<u64>,
    pub tx: mpsc::UnboundedSender<ClientOutbound>,
}

#[derive(Debug, Clone)]
pub enum ClientOutbound {
    Ack(AckMessage),
    Error(ErrorMessage),
    Welcome(WelcomeMessage),
    Observation(ObservationMessage),
}

impl ClientOutbound {
    fn encode(&self, buf: &mut Vec<u8>) -> serde_json::Result<()> {
        fn put<T: Serialize>(buf: &mut Vec<u8>, v: &T) -> serde_json::Result<()> {
            serde_json::to_writer(&mut *buf, v)
        }

        buf.clear();
        match self {
            ClientOutbound::Ack(v) => put(buf, v),
            ClientOutbound::Error(v) => put(buf, v),
            ClientOutbound::Welcome(v) => put(buf, v),
            ClientOutbound::Observation(v) => put(buf, v),
        }
    }
}

/// Start the TCP server
pub async fn run_server(
    config: ServerConfig,
    command_tx: mpsc::Sender<InboundCommand>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    if ServerState::is_disabled() {
        info!("AI control disabled via TWENTY48_AI_DISABLED");
        return Ok(());
    }

    let wire_log_tx = config.log_path.clone().map(spawn_wire_log);

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    let bound = listener.local_addr()?;
    info!("TCP server listening on {}", bound);
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(ServerState::new(config));
    let mut client_id_counter = 0u64;

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                dispatch(&state, msg).await;
            }
        });
    }

    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;

        info!("client {} connected from {}", client_id, addr);

        let state = Arc::clone(&state);
        let command_tx = command_tx.clone();
        let wire_log_tx = wire_log_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, addr, client_id, state, command_tx, wire_log_tx).await
            {
                warn!("client {} error: {}", client_id, e);
            }
            info!("client {} disconnected", client_id);
        });
    }
}

/// Append every wire line (inbound and outbound) to `path`.
fn spawn_wire_log(path: String) -> mpsc::UnboundedSender<Vec<u8>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    tokio::spawn(async move {
        use tokio::fs::OpenOptions;

        let mut file = match OpenOptions::new().create(true).append(true).open(&path).await {
            Ok(f) => f,
            Err(e) => {
                warn!("cannot open wire log {}: {}", path, e);
                return;
            }
        };

        while let Some(bytes) = rx.recv().await {
            if file.write_all(&bytes).await.is_err() || file.write_all(b"\n").await.is_err() {
                break;
            }
        }

        let _ = file.flush().await;
    });
    tx
}

async fn dispatch(state: &ServerState, msg: OutboundMessage) {
    let clients = state.clients.read().await;
    let to_client = |client_id: u64, out: ClientOutbound| {
        if let Some(c) = clients.iter().find(|c| c.id == client_id) {
            let _ = c.tx.send(out);
        }
    };

    match msg {
        OutboundMessage::ToClientAck { client_id, ack } => to_client(client_id, ClientOutbound::Ack(ack)),
        OutboundMessage::ToClientError { client_id, err } => {
            to_client(client_id, ClientOutbound::Error(err))
        }
        OutboundMessage::ToClientObservation { client_id, obs } => {
            to_client(client_id, ClientOutbound::Observation(obs))
        }
        OutboundMessage::BroadcastObservation { obs } => {
            for c in clients.iter().filter(|c| c.stream_observations) {
                let _ = c.tx.send(ClientOutbound::Observation(obs.clone()));
            }
        }
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    client_id: u64,
    state: Arc<ServerState>,
    command_tx: mpsc::Sender<InboundCommand>,
    wire_log_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(socket);
    let mut reader = BufReader::new(reader);

    let (tx, mut rx) = mpsc::unbounded_channel::<ClientOutbound>();

    state.clients.write().await.push(ClientHandle {
        id: client_id,
        addr,
        stream_observations: false,
        handshaken: false,
        last_seq: None,
        tx: tx.clone(),
    });

    let wire_log_tx_out = wire_log_tx.clone();
    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(msg) = rx.recv().await {
            if msg.encode(&mut buf).is_err() {
                continue;
            }
            if writer.write_all(&buf).await.is_err()
                || writer.write_all(b"\n").await.is_err()
                || writer.flush().await.is_err()
            {
                break;
            }
            if let Some(log) = wire_log_tx_out.as_ref() {
                let _ = log.send(buf.clone());
            }
        }
    });

    let send_error = |seq: u64, code: ErrorCode, message: &str| {
        let _ = tx.send(ClientOutbound::Error(create_error(seq, code, message)));
    };

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }

        let raw_line = line.trim_end_matches(['\n', '\r']);
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(log) = wire_log_tx.as_ref() {
            let _ = log.send(raw_line.as_bytes().to_vec());
        }

        let parsed = match parse_message(trimmed) {
            Ok(m) => m,
            Err(e) => {
                let seq = extract_seq_best_effort(trimmed).unwrap_or(0);
                send_error(seq, ErrorCode::InvalidCommand, &format!("JSON parse error: {}", e));
                continue;
            }
        };

        let seq = match &parsed {
            ParsedMessage::Hello(m) => m.seq,
            ParsedMessage::Command(m) => m.seq,
            ParsedMessage::Control(m) => m.seq,
            ParsedMessage::Unknown(m) => m.seq,
        };
        let handshaken = state.is_handshaken(client_id).await;

        if !handshaken && !matches!(parsed, ParsedMessage::Hello(_)) {
            send_error(seq, ErrorCode::HandshakeRequired, "Send hello first");
            continue;
        }
        if handshaken && !state.check_and_update_seq(client_id, seq).await {
            send_error(seq, ErrorCode::InvalidCommand, "seq must be strictly increasing");
            continue;
        }

        match parsed {
            ParsedMessage::Hello(hello) => {
                let major = state.config.protocol_version.split('.').next().unwrap_or("");
                if hello.protocol_version.split('.').next() != Some(major) {
                    send_error(
                        hello.seq,
                        ErrorCode::ProtocolMismatch,
                        &format!("Protocol version {} not supported", hello.protocol_version),
                    );
                    break;
                }

                let wants_control = hello.requested.role != Some(RequestedRole::Observer);
                let controller_id = {
                    let mut controller = state.controller.write().await;
                    if controller.is_none() && wants_control {
                        *controller = Some(client_id);
                        info!("client {} is now controller", client_id);
                    }
                    *controller
                };

                {
                    let mut clients = state.clients.write().await;
                    if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                        client.handshaken = true;
                        client.last_seq = Some(hello.seq);
                        client.stream_observations = hello.requested.stream_observations;
                    }
                }

                let role = if controller_id == Some(client_id) {
                    AssignedRole::Controller
                } else {
                    AssignedRole::Observer
                };
                debug!("client {} hello from {} as {:?}", client_id, hello.client.name, role);
                let welcome = create_welcome(
                    hello.seq,
                    &state.config.protocol_version,
                    client_id,
                    role,
                    controller_id,
                );
                let _ = tx.send(ClientOutbound::Welcome(welcome));

                if hello.requested.stream_observations {
                    let _ = command_tx.try_send(InboundCommand {
                        client_id,
                        seq: hello.seq,
                        payload: InboundPayload::SnapshotRequest,
                    });
                }
            }

            ParsedMessage::Command(cmd) => {
                if !state.is_controller(client_id).await {
                    send_error(cmd.seq, ErrorCode::NotController, "Only controller may send commands");
                    continue;
                }

                if cmd.actions.0.is_empty() {
                    send_error(cmd.seq, ErrorCode::InvalidCommand, "Missing actions");
                    continue;
                }

                // Ack is sent by the game loop once the command is applied.
                let inbound = InboundCommand {
                    client_id,
                    seq: cmd.seq,
                    payload: InboundPayload::Command(ClientCommand::Actions(cmd.actions.0)),
                };
                if command_tx.try_send(inbound).is_err() {
                    send_error(cmd.seq, ErrorCode::Backpressure, "Command queue is full");
                }
            }

            ParsedMessage::Control(ctrl) => {
                let mut controller = state.controller.write().await;
                match ctrl.action {
                    ControlAction::Claim => match *controller {
                        None => {
                            *controller = Some(client_id);
                            info!("client {} claimed control", client_id);
                            let _ = tx.send(ClientOutbound::Ack(create_control_ack(ctrl.seq)));
                        }
                        Some(id) if id == client_id => {
                            let _ = tx.send(ClientOutbound::Ack(create_control_ack(ctrl.seq)));
                        }
                        Some(_) => {
                            send_error(ctrl.seq, ErrorCode::ControllerActive, "Controller already assigned")
                        }
                    },
                    ControlAction::Release => {
                        if *controller == Some(client_id) {
                            *controller = None;
                            info!("client {} released control", client_id);
                            let _ = tx.send(ClientOutbound::Ack(create_control_ack(ctrl.seq)));
                        } else {
                            send_error(ctrl.seq, ErrorCode::NotController, "Only controller may release");
                        }
                    }
                }
            }

            ParsedMessage::Unknown(unknown) => {
                send_error(unknown.seq, ErrorCode::InvalidCommand, "Unknown message type");
            }
        }
    }

    // Remove client; promote the lowest remaining handshaken client if it held control.
    {
        let mut controller = state.controller.write().await;
        let mut clients = state.clients.write().await;
        clients.retain(|c| c.id != client_id);

        if *controller == Some(client_id) {
            *controller = clients.iter().filter(|c| c.handshaken).map(|c| c.id).min();
            match *controller {
                Some(new_id) => info!("client {} promoted to controller", new_id),
                None => info!("controller {} released", client_id),
            }
        }
    }

    drop(send_error);
    drop(tx);
    let _ = write_task.await;

    Ok(())
}

/// Hash of everything an observation reports about the game.
pub fn state_hash(game_state: &GameState, last_event: Option<&LastEvent>) -> StateHash {
    use std::hash::{Hash, Hasher};

    let snap = game_state.snapshot();
    let mut hasher = Fnv1aHasher::new();
    snap.board_hash.hash(&mut hasher);
    snap.size.hash(&mut hasher);
    snap.score.hash(&mut hasher);
    snap.best_score.hash(&mut hasher);
    snap.game_over.hash(&mut hasher);
    snap.mode.hash(&mut hasher);
    snap.undo_remaining.hash(&mut hasher);
    snap.time_left_ms.hash(&mut hasher);
    snap.episode_id.hash(&mut hasher);
    snap.move_count.hash(&mut hasher);
    snap.seed.hash(&mut hasher);
    for tile in game_state.board().tiles() {
        tile.id.0.hash(&mut hasher);
        tile.merged.hash(&mut hasher);
    }
    last_event.is_some().hash(&mut hasher);
    if let Some(ev) = last_event {
        (ev.direction as u8).hash(&mut hasher);
        ev.merges.hash(&mut hasher);
        ev.reward.hash(&mut hasher);
        ev.spawned_id.hash(&mut hasher);
    }
    StateHash(hasher.finish())
}

/// Build observation message from game state
pub fn build_observation(
    seq: u64,
    game_state: &GameState,
    last_event: Option<LastEvent>,
) -> ObservationMessage {
    let snap = game_state.snapshot();
    let board = game_state.board();

    let mut tiles: Vec<TileSnapshot> = board
        .tiles()
        .iter()
        .map(|t| TileSnapshot {
            id: t.id.0,
            value: t.value,
            row: t.row,
            col: t.col,
            merged: t.merged,
        })
        .collect();
    tiles.sort_unstable_by_key(|t| (t.row, t.col));

    ObservationMessage {
        msg_type: ObservationType::Observation,
        seq,
        ts: current_timestamp_ms(),
        playable: snap.playable(),
        game_over: snap.game_over,
        episode_id: snap.episode_id,
        seed: snap.seed,
        move_count: snap.move_count,
        board: BoardSnapshot {
            size: snap.size,
            cells: board.to_rows(),
        },
        tiles,
        score: snap.score,
        best_score: snap.best_score,
        max_tile: snap.max_tile(),
        undo_remaining: snap.undo_remaining,
        mode: snap.mode.into(),
        time_left_ms: snap.time_left_ms,
        legal_moves: snap.legal_moves.into(),
        state_hash: state_hash(game_state, last_event.as_ref()),
        last_event,
    }
}
