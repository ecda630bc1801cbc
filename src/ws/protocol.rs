//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Steering input sent with `turn`. Encoded on the wire as -1, 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum TurnDirection {
    Left,
    #[default]
    Straight,
    Right,
}

impl TurnDirection {
    /// Signed multiplier applied to the turn rate
    pub fn factor(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Straight => 0.0,
            Self::Right => 1.0,
        }
    }
}

impl TryFrom<i8> for TurnDirection {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Left),
            0 => Ok(Self::Straight),
            1 => Ok(Self::Right),
            other => Err(format!("turn direction must be -1, 0 or 1, got {}", other)),
        }
    }
}

impl From<TurnDirection> for i8 {
    fn from(direction: TurnDirection) -> Self {
        match direction {
            TurnDirection::Left => -1,
            TurnDirection::Straight => 0,
            TurnDirection::Right => 1,
        }
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    /// Allocate a room; the sender becomes host
    CreateRoom,

    /// Join an existing room by code
    JoinRoom { room_code: String },

    /// Host only: begin the first round
    StartGame { room_code: String },

    /// Host only: begin the next round after one ended
    StartNewRound { room_code: String },

    /// Set turning intent
    Turn {
        room_code: String,
        direction: TurnDirection,
    },

    /// Fire one bullet if a charge is available
    Shoot { room_code: String },

    /// Client-computed trail collision signal
    PixelState {
        room_code: String,
        is_about_to_hit: bool,
    },

    /// Leave the current room without disconnecting
    LeaveRoom,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

impl ClientMsg {
    /// Room code carried by room-scoped commands
    pub fn room_code(&self) -> Option<&str> {
        match self {
            Self::JoinRoom { room_code }
            | Self::StartGame { room_code }
            | Self::StartNewRound { room_code }
            | Self::Turn { room_code, .. }
            | Self::Shoot { room_code }
            | Self::PixelState { room_code, .. } => Some(room_code),
            Self::CreateRoom | Self::LeaveRoom | Self::Ping { .. } => None,
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    /// Sent once after the socket is upgraded
    Welcome {
        connection_id: Uuid,
        server_time: u64,
    },

    /// Reply to `createRoom`
    RoomCreated { room_code: String },

    /// Reply to a successful `joinRoom`
    RoomJoined { room_code: String, host: Uuid },

    /// Current roster, broadcast on every change
    PlayerList { players: Vec<Uuid> },

    /// The host started the game (or a rematch)
    GameStarted,

    /// A new round began
    RoundStarted { round: u32 },

    /// Round ended without reaching the win score
    RoundOver {
        winner: Option<Uuid>,
        scores: Vec<ScoreEntry>,
    },

    /// A player reached the win score
    GameOver {
        winner: Option<Uuid>,
        scores: Vec<ScoreEntry>,
    },

    PowerUpSpawned { power_up: PowerUpSnapshot },

    PowerUpCollected {
        player_id: Uuid,
        power_up_id: u64,
        kind: PowerUpKind,
    },

    /// Host left or the room emptied
    RoomClosed { room_code: String },

    /// Full snapshot: replaces all client state
    GameState {
        seq: u64,
        tick: u64,
        players: Vec<PlayerSnapshot>,
        power_ups: Vec<PowerUpSnapshot>,
    },

    /// Delta snapshot: overwrite listed players, replace power-ups when present
    GameStatePartial {
        seq: u64,
        tick: u64,
        players: Vec<PlayerSnapshot>,
        power_ups: Option<Vec<PowerUpSnapshot>>,
    },

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Per-player score line in round and game results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub player_id: Uuid,
    pub score: u32,
}

/// Player state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    /// Heading in radians
    pub heading: f32,
    pub alive: bool,
    pub ghost: bool,
    pub bullet_charges: u32,
    pub bullets: Vec<BulletSnapshot>,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletSnapshot {
    pub x: f32,
    pub y: f32,
    pub heading: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerUpKind {
    /// Grants extra bullet charges
    BulletRefill,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerUpSnapshot {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub kind: PowerUpKind,
    pub size: f32,
    /// Room clock at spawn, milliseconds since round start
    pub spawn_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_commands() {
        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"turn","roomCode":"AB12","direction":-1}"#).unwrap();
        assert_eq!(
            msg,
            ClientMsg::Turn {
                room_code: "AB12".to_string(),
                direction: TurnDirection::Left,
            }
        );

        let msg: ClientMsg = serde_json::from_str(
            r#"{"type":"pixelState","roomCode":"AB12","isAboutToHit":true}"#,
        )
        .unwrap();
        assert_eq!(msg.room_code(), Some("AB12"));
    }

    #[test]
    fn rejects_out_of_range_direction() {
        let parsed =
            serde_json::from_str::<ClientMsg>(r#"{"type":"turn","roomCode":"AB12","direction":2}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn server_events_use_wire_names() {
        let json = serde_json::to_value(ServerMsg::PlayerList { players: vec![] }).unwrap();
        assert_eq!(json["type"], "playerList");

        let json = serde_json::to_value(ServerMsg::GameStatePartial {
            seq: 3,
            tick: 9,
            players: vec![],
            power_ups: None,
        })
        .unwrap();
        assert_eq!(json["type"], "gameStatePartial");
        assert!(json["powerUps"].is_null());
    }
}
