//! Local input sampling and the packets it produces each tick.

use crate::network::{PacketSender, SendError};
use log::{debug, info};
use macroquad::prelude::{is_key_down, KeyCode};
use shared::{
    Direction, Packet, PacketType, PLAYER_SPEED, SPAWN_X, SPAWN_Y, WORLD_HEIGHT, WORLD_WIDTH,
};
use std::io::Write;

pub const ENEMY_SPAWN_POINT: (f32, f32) = (300.0, 400.0);
pub const FRUIT_SPAWN_POINT: (f32, f32) = (200.0, 300.0);

/// Raw key states for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub spawn_enemy: bool,
    pub spawn_fruit: bool,
}

impl KeyState {
    /// Reads the keyboard through macroquad. Must run on the window thread.
    pub fn sample() -> Self {
        Self {
            up: is_key_down(KeyCode::Up),
            down: is_key_down(KeyCode::Down),
            left: is_key_down(KeyCode::Left),
            right: is_key_down(KeyCode::Right),
            spawn_enemy: is_key_down(KeyCode::E),
            spawn_fruit: is_key_down(KeyCode::F),
        }
    }
}

/// Turns key states into outbound packets, tracking the local position.
pub struct InputSender {
    player_name: String,
    x: f32,
    y: f32,

    // Previous tick's debug keys for press-edge detection
    prev_spawn_enemy: bool,
    prev_spawn_fruit: bool,
}

impl InputSender {
    pub fn new(player_name: &str) -> Self {
        Self::with_position(player_name, SPAWN_X, SPAWN_Y)
    }

    pub fn with_position(player_name: &str, x: f32, y: f32) -> Self {
        Self {
            player_name: player_name.to_string(),
            x,
            y,
            prev_spawn_enemy: false,
            prev_spawn_fruit: false,
        }
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Applies one tick of input and returns the packets to send: at most one
    /// movement, plus a spawn request per debug key that was just pressed.
    pub fn update(&mut self, keys: KeyState) -> Vec<Packet> {
        let mut packets = Vec::new();

        // Later keys win the reported direction, as the server expects.
        let mut direction = None;
        if keys.right {
            self.x += PLAYER_SPEED;
            direction = Some(Direction::Right);
        }
        if keys.left {
            self.x -= PLAYER_SPEED;
            direction = Some(Direction::Left);
        }
        if keys.up {
            self.y -= PLAYER_SPEED;
            direction = Some(Direction::Up);
        }
        if keys.down {
            self.y += PLAYER_SPEED;
            direction = Some(Direction::Down);
        }

        self.x = self.x.clamp(0.0, WORLD_WIDTH);
        self.y = self.y.clamp(0.0, WORLD_HEIGHT);

        if direction.is_some() {
            packets.push(Packet::outbound(
                PacketType::Movement,
                &self.player_name,
                direction,
                self.x,
                self.y,
            ));
        }

        if keys.spawn_enemy && !self.prev_spawn_enemy {
            let (x, y) = ENEMY_SPAWN_POINT;
            packets.push(Packet::outbound(
                PacketType::SpawnEnemy,
                &self.player_name,
                None,
                x,
                y,
            ));
        }
        if keys.spawn_fruit && !self.prev_spawn_fruit {
            let (x, y) = FRUIT_SPAWN_POINT;
            packets.push(Packet::outbound(
                PacketType::SpawnFruit,
                &self.player_name,
                None,
                x,
                y,
            ));
        }

        self.prev_spawn_enemy = keys.spawn_enemy;
        self.prev_spawn_fruit = keys.spawn_fruit;

        packets
    }

    /// Runs [`update`](Self::update) and sends the result. Returns how many
    /// packets went out; the first failure stops the tick.
    pub fn tick<W: Write>(
        &mut self,
        keys: KeyState,
        sender: &PacketSender<W>,
        event: Option<&str>,
    ) -> Result<usize, SendError> {
        let packets = self.update(keys);
        for packet in &packets {
            match packet.kind {
                PacketType::SpawnEnemy | PacketType::SpawnFruit => {
                    info!("[SEND] {} ({})", packet.kind, event.unwrap_or("no event"))
                }
                _ => debug!(
                    "[SEND] {} {:?} ({})",
                    packet.kind,
                    packet.movement,
                    event.unwrap_or("no event")
                ),
            }
            sender.send(packet)?;
        }
        Ok(packets.len())
    }
}
