//! Applies decoded server packets to the shared store.
//!
//! Nothing here returns an error: packets that cannot be applied are logged
//! and dropped so the receiver loop keeps running.

use crate::game::{Enemy, Fruit, GameState, Player, SharedGameState};
use log::{debug, info, warn};
use serde::{de, Deserialize};
use serde_json::{Map, Value};
use shared::{truncate_utf8, Packet, PacketType, DEFAULT_HEALTH, MAX_PLAYER_NAME_LEN};

/// Session tokens the server embeds in its welcome text, checked in order.
// The welcome message is display text, so this couples the protocol to its
// wording. A dedicated field would be better if the server ever adds one.
pub const KNOWN_EVENTS: [&str; 2] = ["JUEGO_1", "JUEGO_2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The store was changed.
    Applied,
    /// Reported in the log only; the store is unchanged.
    Logged,
    /// Dropped without touching the store.
    Ignored,
}

pub fn dispatch(packet: &Packet, store: &SharedGameState) -> Outcome {
    match &packet.kind {
        PacketType::Welcome => apply_welcome(packet, store),
        PacketType::Movement => apply_movement(packet, store),
        PacketType::FullState => apply_full_state(packet, store),
        PacketType::SpawnEnemy | PacketType::SpawnFruit => {
            // Spawns are announced but not inserted; enemies and fruits only
            // change through snapshots that carry them.
            match packet.position() {
                Some((x, y)) => info!(
                    "[{}] {} at ({:.1}, {:.1})",
                    packet.kind,
                    packet.enemy_tipo.as_deref().unwrap_or("-"),
                    x,
                    y
                ),
                None => info!("[{}] without position", packet.kind),
            }
            Outcome::Logged
        }
        PacketType::Disconnect => {
            // The player stays in the store until the next snapshot drops it.
            info!(
                "[RECV] {}: {} left",
                packet.kind,
                packet.player_name.as_deref().unwrap_or("unknown player")
            );
            Outcome::Logged
        }
        PacketType::Error => {
            let message = packet.payload_str().unwrap_or("unspecified error");
            warn!("[RECV] server error: {}", message);
            store.with_write(|state| state.last_error = Some(message.to_string()));
            Outcome::Applied
        }
        PacketType::Unknown(tag) => {
            debug!("Ignoring packet with unknown type {:?}", tag);
            Outcome::Ignored
        }
    }
}

/// Finds the first known session token in a welcome message.
pub fn extract_event_token(message: &str) -> Option<&'static str> {
    KNOWN_EVENTS
        .iter()
        .copied()
        .find(|token| message.contains(token))
}

fn apply_welcome(packet: &Packet, store: &SharedGameState) -> Outcome {
    let Some(message) = packet.payload_str() else {
        info!("[RECV] {} without message", packet.kind);
        return Outcome::Logged;
    };
    info!("[RECV] {}: {}", packet.kind, message);

    match extract_event_token(message) {
        Some(event) => {
            info!("Assigned to {}", event);
            store.with_write(|state| state.set_assigned_event(event));
            Outcome::Applied
        }
        None => {
            warn!("No event token in welcome message");
            Outcome::Logged
        }
    }
}

fn apply_movement(packet: &Packet, store: &SharedGameState) -> Outcome {
    let (Some(name), Some((x, y))) = (packet.player_name.as_deref(), packet.position()) else {
        debug!("Movement packet without player or position");
        return Outcome::Ignored;
    };
    debug!("[MOVEMENT] {} -> ({:.1}, {:.1})", name, x, y);

    let updated = store.with_write(|state| match state.player_mut(name) {
        Some(player) => {
            player.x = x;
            player.y = y;
            true
        }
        None => false,
    });

    if updated {
        Outcome::Applied
    } else {
        Outcome::Ignored
    }
}

fn apply_full_state(packet: &Packet, store: &SharedGameState) -> Outcome {
    let snapshot = match packet.payload.as_ref().map(decode_snapshot) {
        Some(Ok(snapshot)) => snapshot,
        Some(Err(e)) => {
            warn!("Dropping undecodable game state: {}", e);
            return Outcome::Ignored;
        }
        None => {
            warn!("Game state packet without data");
            return Outcome::Ignored;
        }
    };

    let player_count = snapshot.players.as_ref().map(Vec::len);
    let event = snapshot.event.clone();
    let replaced = store.with_write(|state| snapshot.apply(state));
    // Old collections are freed after the lock is released.
    drop(replaced);

    if let Some(count) = player_count {
        debug!(
            "[STATE] {} players in {}",
            count,
            event.as_deref().unwrap_or("-")
        );
    }
    Outcome::Applied
}

#[derive(Debug, Deserialize)]
struct PlayerEntry {
    x: Option<f32>,
    y: Option<f32>,
    #[serde(rename = "vida")]
    health: Option<i32>,
}

/// A decoded state document, built entirely outside the store lock.
#[derive(Debug)]
struct Snapshot {
    event: Option<String>,
    timestamp: Option<i64>,
    players: Option<Vec<Player>>,
    enemies: Option<Vec<Enemy>>,
    fruits: Option<Vec<Fruit>>,
}

type Replaced = (Option<Vec<Player>>, Option<Vec<Enemy>>, Option<Vec<Fruit>>);

impl Snapshot {
    /// Writes every carried section into `state` and hands back what it replaced.
    fn apply(self, state: &mut GameState) -> Replaced {
        if let Some(event) = &self.event {
            state.set_event(event);
        }
        if let Some(timestamp) = self.timestamp {
            state.timestamp = timestamp;
        }
        (
            self.players.map(|players| state.replace_players(players)),
            self.enemies.map(|enemies| state.replace_enemies(enemies)),
            self.fruits.map(|fruits| state.replace_fruits(fruits)),
        )
    }
}

// `datos` arrives as a JSON string from the server, but an inline object is
// accepted too. Each section is read on its own: a mistyped one is skipped
// and the rest of the document still applies.
fn decode_snapshot(payload: &Value) -> Result<Snapshot, serde_json::Error> {
    let parsed;
    let document = match payload {
        Value::String(text) => {
            parsed = serde_json::from_str::<Value>(text)?;
            &parsed
        }
        other => other,
    };
    let Some(document) = document.as_object() else {
        return Err(de::Error::custom("game state is not a JSON object"));
    };

    Ok(Snapshot {
        event: section(document, "evento", Value::as_str).map(str::to_string),
        timestamp: section(document, "timestamp", Value::as_f64).map(|t| t as i64),
        players: section(document, "jugadores", Value::as_object).map(decode_players),
        enemies: section(document, "enemigos", Value::as_array).map(|v| collect_valid(v)),
        fruits: section(document, "frutas", Value::as_array).map(|v| collect_valid(v)),
    })
}

fn section<'a, T>(
    document: &'a Map<String, Value>,
    key: &str,
    read: impl FnOnce(&'a Value) -> Option<T>,
) -> Option<T> {
    let value = document.get(key)?;
    let section = read(value);
    if section.is_none() {
        debug!("Skipping mistyped game state section {:?}", key);
    }
    section
}

fn decode_players(entries: &Map<String, Value>) -> Vec<Player> {
    entries
        .iter()
        .filter_map(|(name, entry)| {
            let entry = PlayerEntry::deserialize(entry).ok()?;
            Some(Player {
                name: truncate_utf8(name, MAX_PLAYER_NAME_LEN).to_string(),
                x: entry.x?,
                y: entry.y?,
                health: entry.health.unwrap_or(DEFAULT_HEALTH),
            })
        })
        .collect()
}

fn collect_valid<'a, T: Deserialize<'a>>(values: &'a [Value]) -> Vec<T> {
    values
        .iter()
        .filter_map(|value| T::deserialize(value).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use serde_json::json;

    fn full_state(players: Value) -> Packet {
        let document = json!({
            "evento": "JUEGO_1",
            "jugadores": players,
            "timestamp": 1_700_000_000_000i64,
        });
        Packet {
            payload: Some(Value::String(document.to_string())),
            ..Packet::new(PacketType::FullState)
        }
    }

    fn text_packet(kind: PacketType, text: &str) -> Packet {
        Packet {
            payload: Some(Value::String(text.to_string())),
            ..Packet::new(kind)
        }
    }

    #[test]
    fn test_full_state_replaces_players_wholesale() {
        let store = SharedGameState::new();

        let first = full_state(json!({ "A": { "tipo": "POSICION", "x": 1.0, "y": 2.0 } }));
        assert_eq!(dispatch(&first, &store), Outcome::Applied);

        let second = full_state(json!({ "B": { "x": 3.0, "y": 4.0 } }));
        assert_eq!(dispatch(&second, &store), Outcome::Applied);

        let state = store.snapshot();
        assert_eq!(state.players, vec![Player::new("B", 3.0, 4.0)]);
        assert_eq!(state.event, "JUEGO_1");
        assert_eq!(state.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_full_state_keeps_server_order_and_skips_entries_without_position() {
        let store = SharedGameState::new();
        let packet = full_state(json!({
            "Zoe": { "x": 10.0, "y": 20.0 },
            "Broken": { "x": 5.0 },
            "Ana": { "x": 30.0, "y": 40.0, "vida": 1 },
        }));

        dispatch(&packet, &store);

        let state = store.snapshot();
        let names: Vec<_> = state.players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Zoe", "Ana"]);
        assert_eq!(state.players[0].health, DEFAULT_HEALTH);
        assert_eq!(state.players[1].health, 1);
    }

    #[test]
    fn test_full_state_accepts_inline_object() {
        let store = SharedGameState::new();
        let packet = Packet {
            payload: Some(json!({ "jugadores": { "Ana": { "x": 1.5, "y": 2.5 } } })),
            ..Packet::new(PacketType::FullState)
        };

        assert_eq!(dispatch(&packet, &store), Outcome::Applied);
        let ana = store.player("Ana").unwrap();
        assert_approx_eq!(ana.x, 1.5);
        assert_approx_eq!(ana.y, 2.5);
    }

    #[test]
    fn test_full_state_without_players_leaves_them_alone() {
        let store = SharedGameState::new();
        store.replace_players(vec![Player::new("Ana", 1.0, 1.0)]);

        let packet = text_packet(PacketType::FullState, r#"{"evento":"JUEGO_2"}"#);
        assert_eq!(dispatch(&packet, &store), Outcome::Applied);

        let state = store.snapshot();
        assert_eq!(state.players.len(), 1);
        assert_eq!(state.event, "JUEGO_2");
    }

    #[test]
    fn test_full_state_with_enemies_and_fruits() {
        let store = SharedGameState::new();
        let document = json!({
            "jugadores": {},
            "enemigos": [
                { "id": "e1", "tipo": "BASICO", "x": 300.0, "y": 400.0, "velocidad": 2.0, "direccion": "IZQUIERDA" },
                { "id": "bad" }
            ],
            "frutas": [ { "id": "f1", "x": 200.0, "y": 300.0, "puntos": 10 } ]
        });
        let packet = text_packet(PacketType::FullState, &document.to_string());

        dispatch(&packet, &store);

        let state = store.snapshot();
        assert!(state.players.is_empty());
        assert_eq!(state.enemies.len(), 1);
        assert_eq!(state.enemies[0].kind, "BASICO");
        assert_eq!(state.enemies[0].direction, "IZQUIERDA");
        assert_eq!(state.fruits.len(), 1);
        assert_eq!(state.fruits[0].points, 10);
        assert!(!state.fruits[0].collected);
    }

    #[test]
    fn test_full_state_truncates_long_player_names() {
        let store = SharedGameState::new();
        let long_name = "N".repeat(100);
        let packet = full_state(json!({ long_name: { "x": 1.0, "y": 2.0 } }));

        assert_eq!(dispatch(&packet, &store), Outcome::Applied);

        let state = store.snapshot();
        assert_eq!(state.players.len(), 1);
        assert_eq!(state.players[0].name.len(), MAX_PLAYER_NAME_LEN);
        assert!(store.player(&"N".repeat(MAX_PLAYER_NAME_LEN)).is_some());
    }

    #[test]
    fn test_mistyped_section_does_not_block_the_rest() {
        let store = SharedGameState::new();
        store.replace_players(vec![Player::new("Ana", 1.0, 1.0)]);

        let document = json!({
            "evento": "JUEGO_2",
            "timestamp": 42,
            "jugadores": "not an object",
            "frutas": [ { "id": "f1", "x": 200.0, "y": 300.0, "puntos": 5 } ],
        });
        let packet = text_packet(PacketType::FullState, &document.to_string());
        assert_eq!(dispatch(&packet, &store), Outcome::Applied);

        let state = store.snapshot();
        assert_eq!(state.event, "JUEGO_2");
        assert_eq!(state.timestamp, 42);
        assert_eq!(state.players, vec![Player::new("Ana", 1.0, 1.0)]);
        assert_eq!(state.fruits.len(), 1);
    }

    #[test]
    fn test_undecodable_full_state_is_ignored() {
        let store = SharedGameState::new();
        store.replace_players(vec![Player::new("Ana", 1.0, 1.0)]);

        let packet = text_packet(PacketType::FullState, "not json");
        assert_eq!(dispatch(&packet, &store), Outcome::Ignored);
        let packet = text_packet(PacketType::FullState, "[1, 2]");
        assert_eq!(dispatch(&packet, &store), Outcome::Ignored);
        assert_eq!(dispatch(&Packet::new(PacketType::FullState), &store), Outcome::Ignored);
        assert_eq!(store.player_count(), 1);
    }

    #[test]
    fn test_welcome_extracts_event_token() {
        let store = SharedGameState::new();
        let packet = text_packet(PacketType::Welcome, "Bienvenido ClienteC al JUEGO_2");

        assert_eq!(dispatch(&packet, &store), Outcome::Applied);
        assert_eq!(
            store.with_read(|s| s.assigned_event.clone()),
            Some("JUEGO_2".to_string())
        );
    }

    #[test]
    fn test_welcome_without_token_is_not_fatal() {
        let store = SharedGameState::new();
        let packet = text_packet(PacketType::Welcome, "Bienvenido");

        assert_eq!(dispatch(&packet, &store), Outcome::Logged);
        assert!(store.with_read(|s| s.assigned_event.is_none()));
    }

    #[test]
    fn test_extract_prefers_first_known_token() {
        assert_eq!(extract_event_token("JUEGO_2 y JUEGO_1"), Some("JUEGO_1"));
        assert_eq!(extract_event_token("sala libre"), None);
    }

    #[test]
    fn test_movement_updates_known_player_only() {
        let store = SharedGameState::new();
        store.replace_players(vec![Player::new("Ana", 0.0, 0.0)]);

        let mut moved = Packet::outbound(PacketType::Movement, "Ana", None, 50.0, 60.0);
        assert_eq!(dispatch(&moved, &store), Outcome::Applied);
        let ana = store.player("Ana").unwrap();
        assert_approx_eq!(ana.x, 50.0);
        assert_approx_eq!(ana.y, 60.0);

        moved.player_name = Some("Stranger".to_string());
        assert_eq!(dispatch(&moved, &store), Outcome::Ignored);
        assert_eq!(store.player_count(), 1);
    }

    #[test]
    fn test_spawn_and_disconnect_only_log() {
        let store = SharedGameState::new();
        store.replace_players(vec![Player::new("Ana", 0.0, 0.0)]);

        let enemy = Packet::outbound(PacketType::SpawnEnemy, "Ana", None, 300.0, 400.0);
        let fruit = Packet::outbound(PacketType::SpawnFruit, "Ana", None, 200.0, 300.0);
        let leave = Packet {
            player_name: Some("Ana".to_string()),
            ..Packet::new(PacketType::Disconnect)
        };

        assert_eq!(dispatch(&enemy, &store), Outcome::Logged);
        assert_eq!(dispatch(&fruit, &store), Outcome::Logged);
        assert_eq!(dispatch(&leave, &store), Outcome::Logged);

        let state = store.snapshot();
        assert!(state.enemies.is_empty());
        assert!(state.fruits.is_empty());
        assert_eq!(state.players.len(), 1);
    }

    #[test]
    fn test_error_is_recorded_for_display() {
        let store = SharedGameState::new();
        let packet = text_packet(PacketType::Error, "Sala llena");

        assert_eq!(dispatch(&packet, &store), Outcome::Applied);
        assert_eq!(
            store.with_read(|s| s.last_error.clone()),
            Some("Sala llena".to_string())
        );
    }

    #[test]
    fn test_unknown_type_does_not_mutate() {
        let store = SharedGameState::new();
        store.replace_players(vec![Player::new("Ana", 1.0, 2.0)]);
        let before = store.snapshot();

        let packet = Packet {
            payload: Some(json!({ "jugadores": {} })),
            ..Packet::new(PacketType::Unknown("POSICION".to_string()))
        };
        assert_eq!(dispatch(&packet, &store), Outcome::Ignored);

        let after = store.snapshot();
        assert_eq!(after.players, before.players);
        assert_eq!(after.event, before.event);
        assert!(after.last_error.is_none());
    }
}
