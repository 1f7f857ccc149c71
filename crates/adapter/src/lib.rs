//! Adapter module - AI control via TCP socket with JSON protocol
//!
//! Lets external agents play the game over a TCP socket.
//!
//! # Protocol Overview
//!
//! The adapter implements a **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: Client connects to TCP socket (default: 127.0.0.1:7878)
//! 2. **Handshake**: Client sends `hello`, server responds with `welcome`
//! 3. **Controller Assignment**: First client to hello becomes the controller,
//!    unless it asked for the `observer` role
//! 4. **Observation Streaming**: Every applied command is followed by a full
//!    observation for streaming clients
//! 5. **Commanding**: Controller sends a list of actions per command
//!
//! # Message Types
//!
//! ## Client → Server
//!
//! - **hello**: Initial handshake with client info and requested capabilities
//! - **command**: Apply actions (`up`, `moveLeft`, `undo`, `restart`, `toggleMode`, ...)
//! - **control**: Claim or release controller status
//!
//! ## Server → Client
//!
//! - **welcome**: Response to hello with assigned role and capabilities
//! - **observation**: Board, tiles with ids, score, best score, undo budget,
//!   mode, countdown, legal moves, last move and a stable `state_hash`
//! - **ack**: Command acknowledgment with the number of applied actions
//! - **error**: Error response with code and message
//!
//! # Environment Variables
//!
//! - `TWENTY48_AI_HOST`: Bind address (default: "127.0.0.1")
//! - `TWENTY48_AI_PORT`: Port number (default: 7878, 0 picks a free port)
//! - `TWENTY48_AI_MAX_PENDING`: Bounded command queue size (default: 10)
//! - `TWENTY48_AI_LOG_PATH`: Append every wire line to this file
//! - `TWENTY48_AI_DISABLED`: Set to "1" or "true" to disable adapter entirely
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"hello","seq":1,"ts":1,"client":{"name":"bot","version":"1.0"},"protocol_version":"1.0.0","requested":{"stream_observations":true}}
//! Server -> Client: {"type":"welcome","seq":1,"ts":2,"protocol_version":"1.0.0","client_id":1,"role":"controller",...}
//! Server -> Client: {"type":"observation","seq":1,"ts":2,"board":{"size":4,"cells":[[0,2,0,0],...]},...}
//! Client -> Server: {"type":"command","seq":2,"ts":3,"actions":["left","up"]}
//! Server -> Client: {"type":"ack","seq":2,"ts":3,"status":"ok","applied":2}
//! Server -> Client: {"type":"observation","seq":2,...}
//! ```

pub mod protocol;
pub mod runtime;
pub mod server;
pub mod session;

pub use tui_2048_core as core;
pub use tui_2048_types as types;

pub use protocol::*;
pub use runtime::{Adapter, ClientCommand, InboundCommand, InboundPayload, OutboundMessage};
pub use server::{build_observation, run_server, state_hash, ServerConfig, ServerState};
pub use session::Session;
