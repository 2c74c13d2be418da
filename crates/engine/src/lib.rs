use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
mod asset_keys;
pub mod map;

pub use app::{
    character_sort_y, classify_tile, compare_draw_order, raised_bias, raised_sort_y, run_app,
    run_app_with_metrics, tile_bottom_screen_y, AffineCoefficients, AppError, Character,
    DrawOrderKey, DrawableId, DrawableIdAllocator, FlatBucket, FlatTileDraw, FramePaintStats,
    FrameComposer, InputAction, InputSnapshot, LoopConfig, LoopMetricsSnapshot, MetricsHandle,
    PaintBand, Projection, ProjectionError, RaisedTileDrawable, Renderer, Scene, SceneCommand,
    SceneWorld, ShadowDraw, TableEdgeDraw, TileClass, TileQuad, Vec2, ViewFrame, ViewMode,
    ViewTuning, Viewport, VisibleRegion, DEFAULT_CHARACTER_SHIFT_PX, DEFAULT_COEFFICIENTS,
    DEFAULT_VISIBLE_SPAN_TILES, SLOW_FRAME_ENV_VAR,
};
pub use asset_keys::AssetKeyError;
pub use map::{
    clamp_height, load_map_grid, MapGrid, MapGridError, MapLoadError, TileFlags,
    DEFAULT_TILE_SIZE_PX, EMPTY_TILE_ID, HEIGHT_MAX, LAYER_COUNT, SHADOW_LAYER, TILE_LAYER_COUNT,
};

pub const ROOT_ENV_VAR: &str = "ISOVIEW_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub maps_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "ISOVIEW_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/isoview\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let assets_dir = root.join("assets");
    let maps_dir = assets_dir.join("maps");

    Ok(AppPaths {
        root,
        assets_dir,
        maps_dir,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let cwd = env::current_dir().expect("cwd");
        assert!(!is_repo_marker(&cwd.join("definitely_not_a_marker")));
    }
}
