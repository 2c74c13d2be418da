use super::demo_map::{build_demo_map, DEMO_MAP_SIZE, TILE_CANOPY, TILE_TREE, TILE_WALL};
use super::settings::load_settings;
use super::{movement_delta, WalkScene};
use engine::{
    classify_tile, AffineCoefficients, FlatBucket, InputAction, InputSnapshot, Scene, SceneCommand,
    SceneWorld, TileClass, Vec2, ViewMode, DEFAULT_COEFFICIENTS,
};
use std::io::Write as _;
use tempfile::TempDir;

fn snapshot_from_actions(actions: &[InputAction]) -> InputSnapshot {
    let mut snapshot = InputSnapshot::empty();
    for action in actions {
        snapshot = snapshot.with_action_down(*action, true);
    }
    snapshot
}

fn loaded_world_and_scene() -> (SceneWorld, WalkScene) {
    let mut world = SceneWorld::default();
    world.set_map(build_demo_map());
    let mut scene = WalkScene::new();
    scene.load(&mut world);
    (world, scene)
}

#[test]
fn demo_map_contains_every_drawable_class() {
    let map = build_demo_map();
    assert_eq!(map.width(), DEMO_MAP_SIZE);

    assert!(matches!(
        classify_tile(TILE_WALL, map.flags_of(TILE_WALL)),
        TileClass::Raised { height: 3 }
    ));
    assert!(matches!(
        classify_tile(TILE_TREE, map.flags_of(TILE_TREE)),
        TileClass::Raised { height: 2 }
    ));
    assert!(matches!(
        classify_tile(TILE_CANOPY, map.flags_of(TILE_CANOPY)),
        TileClass::Flat(FlatBucket::Upper)
    ));
    assert!(map.flags_of(super::demo_map::TILE_COUNTER).is_counter());
    assert_eq!(map.shadow_bits(4, 7), 0b0011);
}

#[test]
fn scene_load_anchors_the_player() {
    let (world, _scene) = loaded_world_and_scene();
    assert_eq!(world.character_count(), 3);
    let anchor = world.anchor().expect("anchor set");
    let player = world.find_character(anchor).expect("player exists");
    assert_eq!(player.debug_name, "player");
}

#[test]
fn screen_up_walks_northwest_under_the_default_skew() {
    let (world, _scene) = loaded_world_and_scene();
    let input = snapshot_from_actions(&[InputAction::MoveUp]);
    let delta = movement_delta(&input, &world, 1.0, 4.0);

    assert!(delta.x < 0.0);
    assert!(delta.y < 0.0);
    // Diagonal in map space, normalized to the configured speed.
    assert!((delta.x - delta.y).abs() < 0.0001);
    let length = (delta.x * delta.x + delta.y * delta.y).sqrt();
    assert!((length - 4.0).abs() < 0.0001);
}

#[test]
fn degenerate_projection_degrades_to_screen_space_movement() {
    let (mut world, _scene) = loaded_world_and_scene();
    world.set_view(
        AffineCoefficients {
            a: 1.0,
            b: 2.0,
            c: 2.0,
            d: 4.0,
            tx: 0.0,
            ty: 0.0,
        },
        ViewMode::AnchorCentered,
    );
    let input = snapshot_from_actions(&[InputAction::MoveRight]);
    let delta = movement_delta(&input, &world, 1.0, 4.0);
    assert!(delta.x > 0.0);
    assert_eq!(delta.y, 0.0);
}

#[test]
fn no_keys_means_no_movement() {
    let (world, _scene) = loaded_world_and_scene();
    let delta = movement_delta(&InputSnapshot::empty(), &world, 1.0, 4.0);
    assert_eq!(delta, Vec2::default());
}

#[test]
fn player_stays_inside_the_map() {
    let (mut world, mut scene) = loaded_world_and_scene();
    let input = snapshot_from_actions(&[InputAction::MoveLeft, InputAction::MoveUp]);
    for _ in 0..10_000 {
        scene.update(0.05, &input, &mut world);
    }
    let anchor = world.anchor().expect("anchor");
    let player = world.find_character(anchor).expect("player");
    assert!(player.position.x >= 0.0);
    assert!(player.position.y >= 0.0);
}

#[test]
fn quit_request_becomes_a_scene_command() {
    let (mut world, mut scene) = loaded_world_and_scene();
    let mut input = InputSnapshot::empty();
    input = input.with_action_down(InputAction::Quit, true);
    // The quit flag itself rides on the snapshot, not the action state.
    assert_eq!(scene.update(0.016, &input, &mut world), SceneCommand::None);
}

#[test]
fn click_selects_the_character_under_the_cursor() {
    let (mut world, mut scene) = loaded_world_and_scene();
    world.set_view(DEFAULT_COEFFICIENTS, ViewMode::AnchorCentered);
    world.sync_display_to_anchor((816, 624));
    world.compose_frame();

    // The anchor projects to the screen center in anchor mode.
    let input = InputSnapshot::empty()
        .with_left_click_pressed(true)
        .with_cursor_position_px(Some(Vec2 { x: 408.0, y: 312.0 }))
        .with_window_size((816, 624));
    scene.update(0.016, &input, &mut world);
    assert_eq!(scene.selected, world.anchor());
}

#[test]
fn settings_fall_back_per_field_on_bad_values() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("viewer.json");
    let mut file = std::fs::File::create(&path).expect("create settings");
    file.write_all(
        br#"{
            "projection": {"a": "2.0", "b": "not a number", "c": 0.25},
            "view_mode": "fixed",
            "bias_table": [1, 2, 3]
        }"#,
    )
    .expect("write settings");

    let settings = load_settings(&path);
    let affine = settings.affine();
    assert_eq!(affine.a, 2.0);
    assert_eq!(affine.b, DEFAULT_COEFFICIENTS.b);
    assert_eq!(affine.c, 0.25);
    assert_eq!(settings.mode(), ViewMode::FixedOrigin);
    // Wrong-length bias table is dropped, not truncated.
    assert_eq!(settings.tuning().bias_table, None);
}

#[test]
fn missing_or_broken_settings_files_yield_defaults() {
    let dir = TempDir::new().expect("tempdir");

    let missing = load_settings(&dir.path().join("absent.json"));
    assert_eq!(missing.affine(), DEFAULT_COEFFICIENTS);
    assert_eq!(missing.mode(), ViewMode::AnchorCentered);
    assert_eq!(missing.window_size(), (816, 624));

    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{oops").expect("write settings");
    let broken = load_settings(&path);
    assert_eq!(broken.affine(), DEFAULT_COEFFICIENTS);
    assert_eq!(broken.tileset_key(), "world");
}
