pub mod framing;
pub mod packet;

pub use framing::{encode, read_frame, write_frame, FrameError, MAX_PAYLOAD_LEN};
pub use packet::{Direction, Packet, PacketError, PacketType};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 600.0;
pub const PLAYER_SPEED: f32 = 5.0;

/// Where the local player starts before any input has been applied.
pub const SPAWN_X: f32 = WORLD_WIDTH / 2.0;
pub const SPAWN_Y: f32 = WORLD_HEIGHT - 50.0;

pub const MAX_PLAYER_NAME_LEN: usize = 63;
pub const MAX_EVENT_LEN: usize = 31;

/// Health assigned to players whose snapshot entry carries none.
pub const DEFAULT_HEALTH: i32 = 3;

/// Milliseconds since the Unix epoch.
pub fn get_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as i64
}

/// Cuts `value` to at most `max_bytes` bytes without splitting a UTF-8 character.
pub fn truncate_utf8(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }

    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
