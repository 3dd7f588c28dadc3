use crate::game::{GameState, SharedGameState};
use macroquad::prelude::*;

const GRID_STEP: usize = 32;
const PLAYER_RADIUS: f32 = 15.0;
const ENEMY_RADIUS: f32 = 10.0;
const FRUIT_RADIUS: f32 = 8.0;
const HELP_TEXT: &str = "Arrows: move | E: enemy | F: fruit";

#[derive(Debug, Clone, PartialEq)]
struct UiConfig {
    event: String,
    player_count: usize,
    last_error: Option<String>,
}

impl UiConfig {
    fn from_state(state: &GameState) -> Self {
        UiConfig {
            event: state.display_event().to_string(),
            player_count: state.players.len(),
            last_error: state.last_error.clone(),
        }
    }

    fn event_label(&self) -> &str {
        if self.event.is_empty() {
            "-"
        } else {
            &self.event
        }
    }
}

pub struct Renderer {
    width: f32,
    height: f32,
    local_name: String,
}

impl Renderer {
    pub fn new(width: u32, height: u32, local_name: &str) -> Self {
        Renderer {
            width: width as f32,
            height: height as f32,
            local_name: local_name.to_string(),
        }
    }

    /// Draws one frame. The world is drawn while holding the store's read lock.
    pub fn render(&self, store: &SharedGameState) {
        clear_background(Color::from_rgba(245, 245, 245, 255));

        let ui_config = store.with_read(|state| {
            self.draw_world(state);
            UiConfig::from_state(state)
        });

        self.draw_grid();
        self.draw_ui(ui_config);
    }

    fn draw_world(&self, state: &GameState) {
        for player in &state.players {
            let color = if player.name == self.local_name {
                BLUE
            } else {
                GREEN
            };

            draw_circle(player.x, player.y, PLAYER_RADIUS, color);
            draw_text(&player.name, player.x - 20.0, player.y - 30.0, 14.0, BLACK);
        }

        for enemy in &state.enemies {
            draw_circle(enemy.x, enemy.y, ENEMY_RADIUS, RED);
        }

        for fruit in state.fruits.iter().filter(|f| !f.collected) {
            draw_circle(fruit.x, fruit.y, FRUIT_RADIUS, YELLOW);
        }
    }

    fn draw_grid(&self) {
        let color = Color::new(GREEN.r, GREEN.g, GREEN.b, 0.15);

        for x in (0..self.width as usize).step_by(GRID_STEP) {
            draw_line(x as f32, 0.0, x as f32, self.height, 1.0, color);
        }
        for y in (0..self.height as usize).step_by(GRID_STEP) {
            draw_line(0.0, y as f32, self.width, y as f32, 1.0, color);
        }
    }

    fn draw_ui(&self, config: UiConfig) {
        draw_text(
            &format!("Event: {}", config.event_label()),
            10.0,
            24.0,
            24.0,
            DARKGREEN,
        );
        draw_text(
            &format!("Players: {}", config.player_count),
            10.0,
            49.0,
            24.0,
            DARKGREEN,
        );

        if let Some(error) = &config.last_error {
            draw_text(&format!("Server: {}", error), 10.0, 74.0, 20.0, MAROON);
        }

        draw_text(HELP_TEXT, 10.0, self.height - 12.0, 18.0, DARKGRAY);
    }
}
