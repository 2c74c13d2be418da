mod demo_map;
mod settings;
#[cfg(test)]
mod tests;

pub use demo_map::build_demo_map;
pub use settings::{load_settings, ViewerSettings};

use engine::{
    DrawableId, InputAction, InputSnapshot, Scene, SceneCommand, SceneWorld, Vec2, ViewMode,
};
use tracing::info;

const PLAYER_SPEED_TILES_PER_SECOND: f32 = 4.0;
const PLAYER_SPAWN: Vec2 = Vec2 { x: 12.0, y: 12.0 };

/// Walkabout scene: one player the view anchors on, a couple of bystanders,
/// click-to-select, and movement steered in screen space so "up" walks
/// toward the top of the window whatever the projection does.
pub struct WalkScene {
    player_id: Option<DrawableId>,
    selected: Option<DrawableId>,
}

impl WalkScene {
    pub fn new() -> Self {
        Self {
            player_id: None,
            selected: None,
        }
    }
}

impl Default for WalkScene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene for WalkScene {
    fn load(&mut self, world: &mut SceneWorld) {
        let player_id =
            world.spawn_character(PLAYER_SPAWN, Some("hero".to_string()), "player");
        world.spawn_character(
            Vec2 {
                x: PLAYER_SPAWN.x + 3.0,
                y: PLAYER_SPAWN.y - 1.0,
            },
            None,
            "bystander_a",
        );
        world.spawn_character(
            Vec2 {
                x: PLAYER_SPAWN.x - 2.0,
                y: PLAYER_SPAWN.y + 2.0,
            },
            None,
            "bystander_b",
        );
        world.set_anchor(player_id);
        self.player_id = Some(player_id);
        self.selected = None;
        info!(character_count = world.character_count(), "walk_scene_loaded");
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        if input.quit_requested() {
            return SceneCommand::Quit;
        }

        if input.left_click_pressed() {
            if let Some(cursor_px) = input.cursor_position_px() {
                self.selected = world.pick_character_at_cursor(cursor_px, input.window_size());
                info!(selected = ?self.selected, "character_picked");
            }
        }

        if let Some(player_id) = self.player_id {
            let delta = movement_delta(
                input,
                world,
                fixed_dt_seconds,
                PLAYER_SPEED_TILES_PER_SECOND,
            );
            if let Some(map) = world.map() {
                let max_x = map.width() as f32 - 1.0;
                let max_y = map.height() as f32 - 1.0;
                if let Some(player) = world.find_character_mut(player_id) {
                    player.position.x = (player.position.x + delta.x).clamp(0.0, max_x);
                    player.position.y = (player.position.y + delta.y).clamp(0.0, max_y);
                }
            }
        }

        SceneCommand::None
    }

    fn unload(&mut self, world: &mut SceneWorld) {
        info!(character_count = world.character_count(), "walk_scene_unload");
        self.player_id = None;
        self.selected = None;
    }

    fn debug_title(&self, world: &SceneWorld) -> Option<String> {
        let player = self.player_id.and_then(|id| world.find_character(id))?;
        Some(format!(
            "IsoView | {} | Player ({:.2}, {:.2}) | Selected {} | Drawables {}",
            mode_label(world.view_mode()),
            player.position.x,
            player.position.y,
            self.selected
                .map(|id| id.0.to_string())
                .unwrap_or_else(|| "-".to_string()),
            world.character_count() + world.composer().raised().len(),
        ))
    }
}

fn mode_label(mode: ViewMode) -> &'static str {
    match mode {
        ViewMode::FixedOrigin => "fixed",
        ViewMode::AnchorCentered => "anchor",
    }
}

/// Movement intent is expressed in screen space and pushed back through the
/// projection's inverse, so the key directions stay intuitive under any
/// skew. A degenerate matrix degrades to plain map-space movement.
fn movement_delta(
    input: &InputSnapshot,
    world: &SceneWorld,
    fixed_dt_seconds: f32,
    speed_tiles_per_second: f32,
) -> Vec2 {
    let mut screen_x = 0.0f32;
    let mut screen_y = 0.0f32;

    if input.is_down(InputAction::MoveRight) {
        screen_x += 1.0;
    }
    if input.is_down(InputAction::MoveLeft) {
        screen_x -= 1.0;
    }
    if input.is_down(InputAction::MoveUp) {
        screen_y -= 1.0;
    }
    if input.is_down(InputAction::MoveDown) {
        screen_y += 1.0;
    }
    if screen_x == 0.0 && screen_y == 0.0 {
        return Vec2::default();
    }

    let intent = Vec2 {
        x: screen_x,
        y: screen_y,
    };
    let heading = world.projection().unproject_delta(intent).unwrap_or(intent);

    let len_sq = heading.x * heading.x + heading.y * heading.y;
    if len_sq <= f32::EPSILON {
        return Vec2::default();
    }
    let inv_len = len_sq.sqrt().recip();
    let step = speed_tiles_per_second * fixed_dt_seconds;
    Vec2 {
        x: heading.x * inv_len * step,
        y: heading.y * inv_len * step,
    }
}
