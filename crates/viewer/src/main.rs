mod app;

use engine::{load_map_grid, resolve_app_paths, LoopConfig, SceneWorld};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use app::{build_demo_map, load_settings, WalkScene};

fn main() {
    init_tracing();
    info!("=== IsoView Startup ===");

    let paths = match resolve_app_paths() {
        Ok(paths) => paths,
        Err(err) => {
            error!(error = %err, "startup_failed");
            std::process::exit(1);
        }
    };

    let settings = load_settings(&paths.assets_dir.join("viewer.json"));
    let (window_width, window_height) = settings.window_size();

    let mut world = SceneWorld::default();
    world.set_view(settings.affine(), settings.mode());
    world.set_tuning(settings.tuning());

    let map = settings
        .map
        .as_deref()
        .and_then(|map_key| {
            let path = paths.maps_dir.join(format!("{map_key}.json"));
            match load_map_grid(&path) {
                Ok(map) => Some(map),
                Err(err) => {
                    warn!(map_key, error = %err, "map unavailable; using the built-in demo map");
                    None
                }
            }
        })
        .unwrap_or_else(build_demo_map);
    world.set_map(map);

    let config = LoopConfig {
        window_width,
        window_height,
        tileset_key: settings.tileset_key().to_string(),
        ..LoopConfig::default()
    };

    if let Err(err) = engine::run_app(config, Box::new(WalkScene::new()), world) {
        error!(error = %err, "startup_failed");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
