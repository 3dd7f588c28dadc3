//! JSON packet model exchanged with the game server.
//!
//! Field names follow the server's `Paquete` class; absent optional fields are
//! omitted on output the same way Gson drops nulls, and unknown fields are
//! ignored on input.

use crate::get_timestamp;
use cesu8::from_java_cesu8;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("malformed packet: {0}")]
    Malformed(String),

    #[error("failed to serialize packet: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The `tipo` tag of a packet. Unrecognised tags are kept rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PacketType {
    Welcome,
    Movement,
    FullState,
    SpawnEnemy,
    SpawnFruit,
    Disconnect,
    Error,
    Unknown(String),
}

impl PacketType {
    pub fn as_wire(&self) -> &str {
        match self {
            PacketType::Welcome => "BIENVENIDA",
            PacketType::Movement => "MOVIMIENTO",
            PacketType::FullState => "ESTADO_JUEGO",
            PacketType::SpawnEnemy => "CREAR_ENEMIGO",
            PacketType::SpawnFruit => "CREAR_FRUTA",
            PacketType::Disconnect => "DESCONEXION",
            PacketType::Error => "ERROR",
            PacketType::Unknown(tag) => tag,
        }
    }
}

impl From<String> for PacketType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "BIENVENIDA" => PacketType::Welcome,
            "MOVIMIENTO" => PacketType::Movement,
            "ESTADO_JUEGO" => PacketType::FullState,
            "CREAR_ENEMIGO" => PacketType::SpawnEnemy,
            "CREAR_FRUTA" => PacketType::SpawnFruit,
            "DESCONEXION" => PacketType::Disconnect,
            "ERROR" => PacketType::Error,
            _ => PacketType::Unknown(tag),
        }
    }
}

impl From<PacketType> for String {
    fn from(kind: PacketType) -> Self {
        match kind {
            PacketType::Unknown(tag) => tag,
            known => known.as_wire().to_string(),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Idle,
}

impl Direction {
    pub fn as_wire(self) -> &'static str {
        match self {
            Direction::Up => "ARRIBA",
            Direction::Down => "ABAJO",
            Direction::Left => "IZQUIERDA",
            Direction::Right => "DERECHA",
            Direction::Idle => "QUIETO",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Packet {
    #[serde(rename = "tipo")]
    pub kind: PacketType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,

    #[serde(
        rename = "movimiento",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub movement: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,

    #[serde(rename = "puntos", default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enemy_tipo: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// Free-form `datos` field: a message string, or a nested state document.
    #[serde(rename = "datos", default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Packet {
    pub fn new(kind: PacketType) -> Self {
        Self {
            kind,
            player_name: None,
            movement: None,
            x: None,
            y: None,
            points: None,
            enemy_tipo: None,
            timestamp: None,
            payload: None,
        }
    }

    /// Builds a client packet stamped with the sender's name and the current time.
    /// Position is always included, even for kinds that do not use it.
    pub fn outbound(
        kind: PacketType,
        player_name: &str,
        direction: Option<Direction>,
        x: f32,
        y: f32,
    ) -> Self {
        Self {
            player_name: Some(player_name.to_string()),
            movement: direction.map(|d| d.as_wire().to_string()),
            x: Some(x),
            y: Some(y),
            timestamp: Some(get_timestamp()),
            ..Self::new(kind)
        }
    }

    /// Parses a frame payload. Standard UTF-8 is tried first; otherwise the bytes
    /// are read as Java modified UTF-8, which encodes NUL as `C0 80` and
    /// characters outside the BMP as surrogate pairs.
    pub fn parse(bytes: &[u8]) -> Result<Self, PacketError> {
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => Cow::Borrowed(text),
            Err(_) => from_java_cesu8(bytes).map_err(|e| {
                PacketError::Malformed(format!("payload is not modified UTF-8: {}", e))
            })?,
        };
        serde_json::from_str(&text).map_err(|e| PacketError::Malformed(e.to_string()))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PacketError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// The `datos` field when it is a plain string.
    pub fn payload_str(&self) -> Option<&str> {
        self.payload.as_ref().and_then(Value::as_str)
    }

    pub fn position(&self) -> Option<(f32, f32)> {
        Some((self.x?, self.y?))
    }
}
