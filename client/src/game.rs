//! Lock-guarded copy of the server-authoritative world.
//!
//! The receiver thread is the only writer. The render and input paths read it
//! through [`SharedGameState::with_read`]. Each collection is swapped in whole
//! so readers only ever see a complete snapshot.

use parking_lot::RwLock;
use serde::Deserialize;
use shared::{truncate_utf8, DEFAULT_HEALTH, MAX_EVENT_LEN};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub health: i32,
}

impl Player {
    pub fn new(name: &str, x: f32, y: f32) -> Self {
        Self {
            name: name.to_string(),
            x,
            y,
            health: DEFAULT_HEALTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Enemy {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "tipo", default)]
    pub kind: String,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "velocidad", default)]
    pub speed: f32,
    #[serde(rename = "direccion", default)]
    pub direction: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Fruit {
    #[serde(default)]
    pub id: String,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "puntos", default)]
    pub points: i32,
    #[serde(rename = "recolectada", default)]
    pub collected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GameState {
    /// Event named by the latest snapshot.
    pub event: String,
    pub timestamp: i64,
    pub players: Vec<Player>,
    pub enemies: Vec<Enemy>,
    pub fruits: Vec<Fruit>,

    /// Event token taken from the server's welcome message.
    pub assigned_event: Option<String>,
    /// Most recent error reported by the server, kept for display.
    pub last_error: Option<String>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn player_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    /// The only way the player list changes size: the caller builds the new
    /// list first and it is swapped in whole. Returns the old list.
    pub fn replace_players(&mut self, players: Vec<Player>) -> Vec<Player> {
        std::mem::replace(&mut self.players, players)
    }

    pub fn replace_enemies(&mut self, enemies: Vec<Enemy>) -> Vec<Enemy> {
        std::mem::replace(&mut self.enemies, enemies)
    }

    pub fn replace_fruits(&mut self, fruits: Vec<Fruit>) -> Vec<Fruit> {
        std::mem::replace(&mut self.fruits, fruits)
    }

    pub fn set_event(&mut self, event: &str) {
        self.event = truncate_utf8(event, MAX_EVENT_LEN).to_string();
    }

    pub fn set_assigned_event(&mut self, event: &str) {
        self.assigned_event = Some(truncate_utf8(event, MAX_EVENT_LEN).to_string());
    }

    /// Event shown to the user: the welcome assignment, else the snapshot's.
    pub fn display_event(&self) -> &str {
        match &self.assigned_event {
            Some(event) => event,
            None => &self.event,
        }
    }
}

/// Cloneable handle to the one [`GameState`] shared by both loops.
#[derive(Debug, Clone, Default)]
pub struct SharedGameState {
    inner: Arc<RwLock<GameState>>,
}

impl SharedGameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` under the read lock. The lock is released when `f` returns or unwinds.
    pub fn with_read<T>(&self, f: impl FnOnce(&GameState) -> T) -> T {
        let guard = self.inner.read();
        f(&guard)
    }

    /// Runs `f` under the write lock. The lock is released when `f` returns or unwinds.
    pub fn with_write<T>(&self, f: impl FnOnce(&mut GameState) -> T) -> T {
        let mut guard = self.inner.write();
        f(&mut guard)
    }

    /// Swaps in a fully built player list and returns the new count.
    pub fn replace_players(&self, players: Vec<Player>) -> usize {
        let count = players.len();
        let previous = self.with_write(|state| state.replace_players(players));
        // Freed outside the lock.
        drop(previous);
        count
    }

    pub fn player(&self, name: &str) -> Option<Player> {
        self.with_read(|state| state.player(name).cloned())
    }

    pub fn player_count(&self) -> usize {
        self.with_read(|state| state.players.len())
    }

    pub fn snapshot(&self) -> GameState {
        self.with_read(GameState::clone)
    }
}
