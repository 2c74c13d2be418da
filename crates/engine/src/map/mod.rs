mod flags;
mod grid;
mod loader;

pub use flags::{clamp_height, TileFlags, EMPTY_TILE_ID, HEIGHT_MAX};
pub use grid::{
    MapGrid, MapGridError, DEFAULT_TILE_SIZE_PX, LAYER_COUNT, SHADOW_LAYER, TILE_LAYER_COUNT,
};
pub use loader::{load_map_grid, MapLoadError};
