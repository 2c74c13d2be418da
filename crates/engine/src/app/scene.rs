use super::input::{ActionStates, InputAction};
use super::rendering::{
    AffineCoefficients, DrawableId, DrawableIdAllocator, FrameComposer, Projection, ViewFrame,
    ViewMode, VisibleRegion, DEFAULT_CHARACTER_SHIFT_PX, DEFAULT_VISIBLE_SPAN_TILES,
};
use crate::map::{MapGrid, HEIGHT_MAX};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

/// How far from a clicked tile a character may stand and still be picked.
const PICK_RADIUS_TILES: f32 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    cursor_position_px: Option<Vec2>,
    left_click_pressed: bool,
    toggle_view_pressed: bool,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        cursor_position_px: Option<Vec2>,
        left_click_pressed: bool,
        toggle_view_pressed: bool,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            cursor_position_px,
            left_click_pressed,
            toggle_view_pressed,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<Vec2>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn with_left_click_pressed(mut self, left_click_pressed: bool) -> Self {
        self.left_click_pressed = left_click_pressed;
        self
    }

    pub fn with_toggle_view_pressed(mut self, toggle_view_pressed: bool) -> Self {
        self.toggle_view_pressed = toggle_view_pressed;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn cursor_position_px(&self) -> Option<Vec2> {
        self.cursor_position_px
    }

    pub fn left_click_pressed(&self) -> bool {
        self.left_click_pressed
    }

    pub fn toggle_view_pressed(&self) -> bool {
        self.toggle_view_pressed
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

/// Everything tunable about depth sorting and scanning, with the documented
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTuning {
    /// How far a character's sort anchor sits above its tile bottom.
    pub character_shift_px: i32,
    /// Half side length of the scanned region, in tiles.
    pub visible_span_tiles: i32,
    /// Optional per-height bias override; None keeps the formula.
    pub bias_table: Option<[i32; (HEIGHT_MAX as usize) + 1]>,
}

impl Default for ViewTuning {
    fn default() -> Self {
        Self {
            character_shift_px: DEFAULT_CHARACTER_SHIFT_PX,
            visible_span_tiles: DEFAULT_VISIBLE_SPAN_TILES,
            bias_table: None,
        }
    }
}

/// A moving drawable on the map. Positions are fractional tile coordinates;
/// the id doubles as the draw-order tie-breaker and never changes after
/// spawn.
#[derive(Debug, Clone)]
pub struct Character {
    pub id: DrawableId,
    pub position: Vec2,
    pub sprite_key: Option<String>,
    pub debug_name: &'static str,
}

/// The per-session world: one map, its characters, the tracked anchor and
/// the projection settings. Owns the drawable id allocator so characters and
/// promoted tiles share one creation-order sequence.
#[derive(Debug, Default)]
pub struct SceneWorld {
    map: Option<MapGrid>,
    characters: Vec<Character>,
    anchor: Option<DrawableId>,
    display: Vec2,
    coefficients: AffineCoefficients,
    mode: ViewMode,
    tuning: ViewTuning,
    ids: DrawableIdAllocator,
    composer: FrameComposer,
}

impl SceneWorld {
    pub fn set_map(&mut self, map: MapGrid) {
        self.map = Some(map);
        self.composer.invalidate();
    }

    pub fn map(&self) -> Option<&MapGrid> {
        self.map.as_ref()
    }

    pub fn set_view(&mut self, coefficients: AffineCoefficients, mode: ViewMode) {
        self.coefficients = coefficients.sanitized();
        self.mode = mode;
    }

    pub fn view_mode(&self) -> ViewMode {
        self.mode
    }

    pub fn toggle_view_mode(&mut self) -> ViewMode {
        self.mode = match self.mode {
            ViewMode::FixedOrigin => ViewMode::AnchorCentered,
            ViewMode::AnchorCentered => ViewMode::FixedOrigin,
        };
        self.mode
    }

    pub fn set_tuning(&mut self, tuning: ViewTuning) {
        self.tuning = tuning;
    }

    pub fn tuning(&self) -> &ViewTuning {
        &self.tuning
    }

    pub fn spawn_character(
        &mut self,
        position: Vec2,
        sprite_key: Option<String>,
        debug_name: &'static str,
    ) -> DrawableId {
        let id = self.ids.allocate();
        self.characters.push(Character {
            id,
            position,
            sprite_key,
            debug_name,
        });
        id
    }

    pub fn despawn_character(&mut self, id: DrawableId) -> bool {
        let before = self.characters.len();
        self.characters.retain(|character| character.id != id);
        if self.anchor == Some(id) {
            self.anchor = None;
        }
        self.characters.len() != before
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    pub fn find_character(&self, id: DrawableId) -> Option<&Character> {
        self.characters.iter().find(|character| character.id == id)
    }

    pub fn find_character_mut(&mut self, id: DrawableId) -> Option<&mut Character> {
        self.characters
            .iter_mut()
            .find(|character| character.id == id)
    }

    pub fn set_anchor(&mut self, id: DrawableId) {
        self.anchor = Some(id);
    }

    pub fn anchor(&self) -> Option<DrawableId> {
        self.anchor
    }

    pub fn anchor_position(&self) -> Option<Vec2> {
        self.anchor
            .and_then(|id| self.find_character(id))
            .map(|character| character.position)
    }

    /// Display origin (top-left of the viewport) in tile coordinates.
    pub fn display(&self) -> Vec2 {
        self.display
    }

    pub fn set_display(&mut self, display: Vec2) {
        self.display = display;
    }

    pub fn projection(&self) -> Projection {
        Projection::new(self.coefficients, self.mode)
    }

    /// Per-frame projection inputs for a window of the given size. The anchor
    /// pixel position floors like every other screen coordinate so the tiles
    /// and the anchor never disagree by a sub-pixel.
    pub fn view_frame(&self, window_size: (u32, u32)) -> ViewFrame {
        let screen_center_px = Vec2 {
            x: (window_size.0 / 2) as f32,
            y: (window_size.1 / 2) as f32,
        };
        let anchor_view_px = match (self.map.as_ref(), self.anchor_position()) {
            (Some(map), Some(anchor)) => {
                let tile_width = map.tile_width() as f32;
                let tile_height = map.tile_height() as f32;
                Vec2 {
                    x: (map.adjust_x(anchor.x, self.display.x) * tile_width + tile_width / 2.0)
                        .floor(),
                    y: (map.adjust_y(anchor.y, self.display.y) * tile_height + tile_height / 2.0)
                        .floor(),
                }
            }
            _ => Vec2::default(),
        };
        ViewFrame {
            anchor_view_px,
            screen_center_px,
        }
    }

    /// Keep the display locked to the anchor, one-to-one, no easing. Runs
    /// every tick so the anchor-centered projection never lags a frame.
    pub fn sync_display_to_anchor(&mut self, window_size: (u32, u32)) {
        let Some(map) = self.map.as_ref() else {
            return;
        };
        let Some(anchor) = self.anchor_position() else {
            return;
        };
        let half_screen_tiles_x = window_size.0 as f32 / map.tile_width() as f32 / 2.0;
        let half_screen_tiles_y = window_size.1 as f32 / map.tile_height() as f32 / 2.0;
        self.display = Vec2 {
            x: anchor.x + 0.5 - half_screen_tiles_x,
            y: anchor.y + 0.5 - half_screen_tiles_y,
        };
    }

    /// Rescan the visible region if it moved. Returns true on a rebuild.
    pub fn compose_frame(&mut self) -> bool {
        let Some(map) = self.map.as_ref() else {
            return false;
        };
        let center = self.anchor_position().unwrap_or(Vec2 {
            x: self.display.x,
            y: self.display.y,
        });
        let region = VisibleRegion::around(
            center.x.floor() as i32,
            center.y.floor() as i32,
            self.tuning.visible_span_tiles,
            map.width(),
            map.height(),
        );
        self.composer.refresh(map, region, &mut self.ids)
    }

    pub fn composer(&self) -> &FrameComposer {
        &self.composer
    }

    /// Hit-test a cursor position against the characters. A degenerate
    /// projection falls back to treating screen pixels as view pixels.
    pub fn pick_character_at_cursor(
        &self,
        cursor_px: Vec2,
        window_size: (u32, u32),
    ) -> Option<DrawableId> {
        let map = self.map.as_ref()?;
        let frame = self.view_frame(window_size);
        let view_px = self
            .projection()
            .unproject_px(cursor_px, &frame)
            .unwrap_or(cursor_px);
        let tile = Vec2 {
            x: view_px.x / map.tile_width() as f32 + self.display.x,
            y: view_px.y / map.tile_height() as f32 + self.display.y,
        };

        let mut best: Option<(DrawableId, f32)> = None;
        for character in &self.characters {
            let center_x = character.position.x + 0.5;
            let center_y = character.position.y + 0.5;
            let dx = tile.x - center_x;
            let dy = tile.y - center_y;
            let distance_sq = dx * dx + dy * dy;
            if distance_sq > PICK_RADIUS_TILES * PICK_RADIUS_TILES {
                continue;
            }
            let closer = match best {
                Some((best_id, best_distance_sq)) => {
                    distance_sq < best_distance_sq
                        || (distance_sq == best_distance_sq && character.id > best_id)
                }
                None => true,
            };
            if closer {
                best = Some((character.id, distance_sq));
            }
        }
        best.map(|(id, _)| id)
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn unload(&mut self, world: &mut SceneWorld);

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::LAYER_COUNT;

    fn flat_map(width: u32, height: u32) -> MapGrid {
        let cells = vec![1u16; LAYER_COUNT * (width * height) as usize];
        MapGrid::new(width, height, 48, 48, cells, vec![0x0000, 0x0000]).expect("grid")
    }

    #[test]
    fn characters_and_promoted_tiles_share_one_id_sequence() {
        let mut world = SceneWorld::default();
        world.set_map(flat_map(4, 4));
        let first = world.spawn_character(Vec2 { x: 1.0, y: 1.0 }, None, "first");
        world.compose_frame();
        let second = world.spawn_character(Vec2 { x: 2.0, y: 2.0 }, None, "second");

        let max_composed = world
            .composer()
            .lower()
            .iter()
            .map(|flat| flat.id)
            .max()
            .expect("composed tiles");
        assert!(first < max_composed);
        assert!(max_composed < second);
    }

    #[test]
    fn despawn_clears_anchor_when_it_was_the_anchor() {
        let mut world = SceneWorld::default();
        let id = world.spawn_character(Vec2::default(), None, "anchor");
        world.set_anchor(id);
        assert!(world.despawn_character(id));
        assert_eq!(world.anchor(), None);
        assert!(!world.despawn_character(id));
    }

    #[test]
    fn view_frame_floors_the_anchor_pixel_position() {
        let mut world = SceneWorld::default();
        world.set_map(flat_map(8, 8));
        let id = world.spawn_character(Vec2 { x: 3.3, y: 2.7 }, None, "anchor");
        world.set_anchor(id);

        let frame = world.view_frame((816, 624));
        assert_eq!(frame.screen_center_px, Vec2 { x: 408.0, y: 312.0 });
        assert_eq!(frame.anchor_view_px.x, frame.anchor_view_px.x.floor());
        assert_eq!(frame.anchor_view_px.y, frame.anchor_view_px.y.floor());
    }

    #[test]
    fn sync_display_centers_the_anchor() {
        let mut world = SceneWorld::default();
        world.set_map(flat_map(20, 20));
        let id = world.spawn_character(Vec2 { x: 10.0, y: 10.0 }, None, "anchor");
        world.set_anchor(id);
        world.sync_display_to_anchor((480, 480));

        // 480 px / 48 px per tile = 10 tiles; anchor center minus 5.
        assert_eq!(world.display(), Vec2 { x: 5.5, y: 5.5 });
    }

    #[test]
    fn compose_frame_rebuilds_only_when_the_region_moves() {
        let mut world = SceneWorld::default();
        world.set_map(flat_map(50, 50));
        world.set_tuning(ViewTuning {
            visible_span_tiles: 3,
            ..ViewTuning::default()
        });
        let id = world.spawn_character(Vec2 { x: 25.0, y: 25.0 }, None, "anchor");
        world.set_anchor(id);

        assert!(world.compose_frame());
        assert!(!world.compose_frame());

        // Sub-tile movement stays in the same region.
        world.find_character_mut(id).expect("anchor").position.x = 25.4;
        assert!(!world.compose_frame());

        // Crossing into the next tile rescans.
        world.find_character_mut(id).expect("anchor").position.x = 26.1;
        assert!(world.compose_frame());
    }

    #[test]
    fn pick_finds_the_nearest_character_within_radius() {
        let mut world = SceneWorld::default();
        world.set_map(flat_map(10, 10));
        // An identity matrix keeps the cursor math easy to follow.
        world.set_view(
            AffineCoefficients {
                a: 1.0,
                b: 0.0,
                c: 0.0,
                d: 1.0,
                tx: 0.0,
                ty: 0.0,
            },
            ViewMode::FixedOrigin,
        );
        let near = world.spawn_character(Vec2 { x: 2.0, y: 2.0 }, None, "near");
        world.spawn_character(Vec2 { x: 7.0, y: 7.0 }, None, "far");

        // Cursor on the center of tile (2, 2): 2.5 * 48 = 120.
        let picked = world.pick_character_at_cursor(Vec2 { x: 120.0, y: 120.0 }, (480, 480));
        assert_eq!(picked, Some(near));

        let missed = world.pick_character_at_cursor(Vec2 { x: 240.0, y: 240.0 }, (480, 480));
        assert_eq!(missed, None);
    }

    #[test]
    fn pick_survives_a_degenerate_projection() {
        let mut world = SceneWorld::default();
        world.set_map(flat_map(10, 10));
        world.set_view(
            AffineCoefficients {
                a: 1.0,
                b: 2.0,
                c: 2.0,
                d: 4.0,
                tx: 0.0,
                ty: 0.0,
            },
            ViewMode::FixedOrigin,
        );
        let id = world.spawn_character(Vec2 { x: 2.0, y: 2.0 }, None, "only");

        // Identity fallback: screen pixels read as view pixels.
        let picked = world.pick_character_at_cursor(Vec2 { x: 120.0, y: 120.0 }, (480, 480));
        assert_eq!(picked, Some(id));
    }

    #[test]
    fn toggle_view_mode_flips_between_the_two_modes() {
        let mut world = SceneWorld::default();
        assert_eq!(world.view_mode(), ViewMode::AnchorCentered);
        assert_eq!(world.toggle_view_mode(), ViewMode::FixedOrigin);
        assert_eq!(world.toggle_view_mode(), ViewMode::AnchorCentered);
    }
}
