//! Protocol module - JSON message types for the AI adapter
//!
//! Line-delimited JSON. All messages have: type, seq (sequence number),
//! ts (timestamp in ms).

use serde::{Deserialize, Serialize};

use crate::types::{Direction, GameAction, GameMode, MoveOutcome};

use arrayvec::ArrayVec;

/// Protocol version spoken by this adapter; clients must share the major.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Maximum actions accepted in one command
pub const MAX_ACTIONS: usize = 32;

// ============== Client -> Game Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HelloType {
    #[serde(rename = "hello")]
    #[default]
    Hello,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CommandType {
    #[serde(rename = "command")]
    #[default]
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ControlType {
    #[serde(rename = "control")]
    #[default]
    Control,
}

/// Client hello message (first message to establish connection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: HelloType,
    pub seq: u64,
    pub ts: u64,
    pub client: ClientInfo,
    pub protocol_version: String,
    pub requested: RequestedCapabilities,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestedCapabilities {
    pub stream_observations: bool,
    /// Optional role request; `observer` never becomes controller on hello.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RequestedRole>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestedRole {
    Auto,
    Controller,
    Observer,
}

/// Command message (controller only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: CommandType,
    pub seq: u64,
    pub ts: u64,
    pub actions: ActionList,
}

/// Action names as sent on the wire ("up", "moveLeft", "undo", ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionList(pub ArrayVec<GameAction, MAX_ACTIONS>);

impl<'de> Deserialize<'de> for ActionList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'a> serde::de::Visitor<'a> for V {
            type Value = ActionList;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "an array of action strings")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'a>,
            {
                let mut out = ArrayVec::<GameAction, MAX_ACTIONS>::new();
                while let Some(name) = seq.next_element::<std::borrow::Cow<'a, str>>()? {
                    let action = GameAction::from_str(&name).ok_or_else(|| {
                        serde::de::Error::custom(format!("unknown action: {}", name))
                    })?;
                    out.try_push(action)
                        .map_err(|_| serde::de::Error::custom("too many actions"))?;
                }
                Ok(ActionList(out))
            }
        }

        deserializer.deserialize_seq(V)
    }
}

impl Serialize for ActionList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for action in &self.0 {
            seq.serialize_element(action.as_str())?;
        }
        seq.end()
    }
}

/// Control message (claim/release controller status)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: ControlType,
    pub seq: u64,
    pub ts: u64,
    pub action: ControlAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Claim,
    Release,
}

// ============== Game -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WelcomeType {
    #[serde(rename = "welcome")]
    Welcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckType {
    #[serde(rename = "ack")]
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckStatus {
    #[serde(rename = "ok")]
    Ok,
    /// Command applied but no action changed the game
    #[serde(rename = "noop")]
    Noop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    HandshakeRequired,
    ProtocolMismatch,
    NotController,
    ControllerActive,
    InvalidCommand,
    GameOver,
    Backpressure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignedRole {
    Controller,
    Observer,
}

/// Welcome message (response to hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub client_id: u64,
    pub role: AssignedRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<u64>,
    pub game_id: String,
    pub capabilities: ServerCapabilities,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub formats: Vec<String>,
    /// Action names accepted in `command.actions`
    pub actions: Vec<String>,
    pub max_actions: usize,
    pub features: Vec<CapabilityFeature>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityFeature {
    Tiles,
    LegalMoves,
    LastEvent,
    StateHash,
    BestScore,
    Undo,
    TimeAttack,
}

/// Acknowledgment sent once a command was applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: AckType,
    pub seq: u64,
    pub ts: u64,
    pub status: AckStatus,
    /// Number of actions that changed the game
    pub applied: u32,
}

/// Error message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationType {
    #[serde(rename = "observation")]
    Observation,
}

/// Game state observation (sent to streaming clients)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationMessage {
    #[serde(rename = "type")]
    pub msg_type: ObservationType,
    pub seq: u64,
    pub ts: u64,
    pub playable: bool,
    pub game_over: bool,
    pub episode_id: u32,
    pub seed: u32,
    pub move_count: u32,
    pub board: BoardSnapshot,
    pub tiles: Vec<TileSnapshot>,
    pub score: u64,
    pub best_score: u64,
    pub max_tile: u32,
    pub undo_remaining: u8,
    pub mode: ModeLower,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left_ms: Option<u32>,
    pub legal_moves: LegalMoves,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event: Option<LastEvent>,
    pub state_hash: StateHash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub size: u8,
    /// Row-major values, 0 = empty
    pub cells: Vec<Vec<u32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSnapshot {
    pub id: u32,
    pub value: u32,
    pub row: u8,
    pub col: u8,
    pub merged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalMoves {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl From<[bool; 4]> for LegalMoves {
    fn from(value: [bool; 4]) -> Self {
        Self {
            up: value[Direction::Up.index()],
            down: value[Direction::Down.index()],
            left: value[Direction::Left.index()],
            right: value[Direction::Right.index()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionLower {
    Up,
    Down,
    Left,
    Right,
}

impl From<Direction> for DirectionLower {
    fn from(value: Direction) -> Self {
        match value {
            Direction::Up => DirectionLower::Up,
            Direction::Down => DirectionLower::Down,
            Direction::Left => DirectionLower::Left,
            Direction::Right => DirectionLower::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModeLower {
    Normal,
    TimeAttack,
}

impl From<GameMode> for ModeLower {
    fn from(value: GameMode) -> Self {
        match value {
            GameMode::Normal => ModeLower::Normal,
            GameMode::TimeAttack => ModeLower::TimeAttack,
        }
    }
}

/// Hash serialized as a fixed-width hex string (JSON numbers lose u64 precision)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHash(pub u64);

impl Serialize for StateHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&format!("{:016x}", self.0))
    }
}

impl<'de> Deserialize<'de> for StateHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = std::borrow::Cow::<'de, str>::deserialize(deserializer)?;
        u64::from_str_radix(&s, 16)
            .map(StateHash)
            .map_err(|_| serde::de::Error::custom("invalid state hash"))
    }
}

/// Summary of the last applied move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastEvent {
    pub direction: DirectionLower,
    pub merges: u32,
    pub reward: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawned_id: Option<u32>,
}

impl From<MoveOutcome> for LastEvent {
    fn from(value: MoveOutcome) -> Self {
        Self {
            direction: value.direction.into(),
            merges: value.merges,
            reward: value.reward,
            spawned_id: value.spawned.map(|id| id.0),
        }
    }
}

// ============== Message Parsing ==============

/// Parse a JSON message from a string
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundMessage {
        #[serde(rename = "hello")]
        Hello(HelloMessage),
        #[serde(rename = "command")]
        Command(CommandMessage),
        #[serde(rename = "control")]
        Control(ControlMessage),
    }

    match serde_json::from_str::<InboundMessage>(json) {
        Ok(InboundMessage::Hello(m)) => Ok(ParsedMessage::Hello(m)),
        Ok(InboundMessage::Command(m)) => Ok(ParsedMessage::Command(m)),
        Ok(InboundMessage::Control(m)) => Ok(ParsedMessage::Control(m)),
        Err(e) => {
            // Unknown message type is not a hard parse error for the protocol.
            #[derive(Debug, Deserialize)]
            struct Envelope {
                #[serde(rename = "type")]
                msg_type: Option<String>,
                seq: Option<u64>,
            }
            let envelope = serde_json::from_str::<Envelope>(json)?;
            match envelope.msg_type.as_deref() {
                Some("hello") | Some("command") | Some("control") => Err(e),
                _ => Ok(ParsedMessage::Unknown(UnknownMessage {
                    seq: envelope.seq.unwrap_or(0),
                })),
            }
        }
    }
}

/// Parsed incoming message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Hello(HelloMessage),
    Command(CommandMessage),
    Control(ControlMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

// ============== Utility Functions ==============

/// Create a hello message
pub fn create_hello(seq: u64, client_name: &str, protocol_version: &str) -> HelloMessage {
    HelloMessage {
        msg_type: HelloType::Hello,
        seq,
        ts: current_timestamp_ms(),
        client: ClientInfo {
            name: client_name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        protocol_version: protocol_version.to_string(),
        requested: RequestedCapabilities {
            stream_observations: true,
            role: Some(RequestedRole::Auto),
        },
    }
}

/// Create a welcome message
pub fn create_welcome(
    seq: u64,
    protocol_version: &str,
    client_id: u64,
    role: AssignedRole,
    controller_id: Option<u64>,
) -> WelcomeMessage {
    let actions = [
        GameAction::MoveUp,
        GameAction::MoveDown,
        GameAction::MoveLeft,
        GameAction::MoveRight,
        GameAction::Undo,
        GameAction::Restart,
        GameAction::ToggleMode,
    ];

    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: protocol_version.to_string(),
        client_id,
        role,
        controller_id,
        game_id: "tui-2048".to_string(),
        capabilities: ServerCapabilities {
            formats: vec!["json".to_string()],
            actions: actions.iter().map(|a| a.as_str().to_string()).collect(),
            max_actions: MAX_ACTIONS,
            features: vec![
                CapabilityFeature::Tiles,
                CapabilityFeature::LegalMoves,
                CapabilityFeature::LastEvent,
                CapabilityFeature::StateHash,
                CapabilityFeature::BestScore,
                CapabilityFeature::Undo,
                CapabilityFeature::TimeAttack,
            ],
        },
    }
}

/// Create an acknowledgment for an applied command
pub fn create_ack(seq: u64, applied: u32) -> AckMessage {
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        ts: current_timestamp_ms(),
        status: if applied > 0 { AckStatus::Ok } else { AckStatus::Noop },
        applied,
    }
}

/// Create an acknowledgment for a control request
pub fn create_control_ack(seq: u64) -> AckMessage {
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        ts: current_timestamp_ms(),
        status: AckStatus::Ok,
        applied: 0,
    }
}

/// Create an error message
pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        code,
        message: message.to_string(),
    }
}

/// Get current timestamp in milliseconds
pub(crate) fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hello() {
        let json = r#"{"type":"hello","seq":1,"ts":1,"client":{"name":"bot","version":"0.1"},"protocol_version":"1.0.0","requested":{"stream_observations":true}}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Hello(h) => {
                assert_eq!(h.seq, 1);
                assert_eq!(h.client.name, "bot");
                assert!(h.requested.stream_observations);
                assert_eq!(h.requested.role, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_command_actions() {
        let json = r#"{"type":"command","seq":2,"ts":1,"actions":["left","moveUp","undo"]}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Command(c) => {
                assert_eq!(
                    c.actions.0.as_slice(),
                    &[GameAction::MoveLeft, GameAction::MoveUp, GameAction::Undo]
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_command_rejects_unknown_action() {
        let json = r#"{"type":"command","seq":2,"ts":1,"actions":["hardDrop"]}"#;
        assert!(parse_message(json).is_err());
    }

    #[test]
    fn test_parse_command_rejects_too_many_actions() {
        let actions = vec!["\"up\""; MAX_ACTIONS + 1].join(",");
        let json = format!(r#"{{"type":"command","seq":2,"ts":1,"actions":[{}]}}"#, actions);
        assert!(parse_message(&json).is_err());
    }

    #[test]
    fn test_parse_control() {
        let json = r#"{"type":"control","seq":3,"ts":1,"action":"release"}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Control(c) => assert_eq!(c.action, ControlAction::Release),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_unknown_type() {
        let json = r#"{"type":"ping","seq":9}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Unknown(u) => assert_eq!(u.seq, 9),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_create_ack_status() {
        let v = serde_json::to_value(create_ack(4, 2)).unwrap();
        assert_eq!(v["type"], "ack");
        assert_eq!(v["status"], "ok");
        assert_eq!(v["applied"], 2);

        let v = serde_json::to_value(create_ack(5, 0)).unwrap();
        assert_eq!(v["status"], "noop");
    }

    #[test]
    fn test_create_error() {
        let v = serde_json::to_value(create_error(7, ErrorCode::NotController, "nope")).unwrap();
        assert_eq!(v["type"], "error");
        assert_eq!(v["code"], "not_controller");
        assert_eq!(v["message"], "nope");
    }

    #[test]
    fn test_create_welcome_lists_actions() {
        let v = serde_json::to_value(create_welcome(1, PROTOCOL_VERSION, 3, AssignedRole::Controller, Some(3)))
            .unwrap();
        assert_eq!(v["role"], "controller");
        assert_eq!(v["client_id"], 3);
        let actions = v["capabilities"]["actions"].as_array().unwrap();
        assert!(actions.iter().any(|a| a == "moveLeft"));
        assert!(actions.iter().any(|a| a == "undo"));
    }

    #[test]
    fn test_state_hash_hex_roundtrip() {
        let h = StateHash(0xdead_beef_0000_0001);
        let s = serde_json::to_string(&h).unwrap();
        assert_eq!(s, "\"deadbeef00000001\"");
        let back: StateHash = serde_json::from_str(&s).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(
            serde_json::to_value(ModeLower::from(GameMode::TimeAttack)).unwrap(),
            "time-attack"
        );
    }
}
