//! Client configuration resolved from the command line.

use shared::{truncate_utf8, MAX_PLAYER_NAME_LEN, WORLD_HEIGHT, WORLD_WIDTH};

pub const DEFAULT_PLAYER_NAME: &str = "ClienteC";
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_WIDTH: u32 = WORLD_WIDTH as u32;
pub const DEFAULT_HEIGHT: u32 = WORLD_HEIGHT as u32;
pub const TARGET_FPS: u32 = 60;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub player_name: String,
    pub server_addr: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

impl ClientConfig {
    pub fn new(player_name: &str, server_addr: &str) -> Self {
        let name = truncate_utf8(player_name.trim(), MAX_PLAYER_NAME_LEN);
        let player_name = if name.is_empty() {
            DEFAULT_PLAYER_NAME.to_string()
        } else {
            name.to_string()
        };

        Self {
            player_name,
            server_addr: server_addr.to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            target_fps: TARGET_FPS,
        }
    }

    pub fn with_window(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps.max(1);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PLAYER_NAME, DEFAULT_SERVER_ADDR)
    }
}
