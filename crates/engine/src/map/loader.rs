use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::grid::{MapGrid, MapGridError, DEFAULT_TILE_SIZE_PX, LAYER_COUNT};

/// On-disk map document. Cell data is layer-major like `MapGrid`; tile size
/// and looping are optional and default to the engine conventions.
#[derive(Debug, Clone, Deserialize)]
struct MapFile {
    width: u32,
    height: u32,
    #[serde(default = "default_tile_size")]
    tile_width: u32,
    #[serde(default = "default_tile_size")]
    tile_height: u32,
    #[serde(default)]
    loop_horizontal: bool,
    #[serde(default)]
    loop_vertical: bool,
    data: Vec<u16>,
    flags: Vec<u16>,
}

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE_PX
}

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("failed to read map file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse map file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("map file '{path}' is malformed: {source}")]
    Shape {
        path: PathBuf,
        #[source]
        source: MapGridError,
    },
}

pub fn load_map_grid(path: &Path) -> Result<MapGrid, MapLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| MapLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: MapFile = serde_json::from_str(&raw).map_err(|source| MapLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let grid = MapGrid::new(
        file.width,
        file.height,
        file.tile_width,
        file.tile_height,
        file.data,
        file.flags,
    )
    .map_err(|source| MapLoadError::Shape {
        path: path.to_path_buf(),
        source,
    })?
    .with_looping(file.loop_horizontal, file.loop_vertical);

    info!(
        path = %path.display(),
        width = grid.width(),
        height = grid.height(),
        tile_width = grid.tile_width(),
        tile_height = grid.tile_height(),
        "map_loaded"
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::TempDir;

    fn write_map(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).expect("create map file");
        file.write_all(contents.as_bytes()).expect("write map file");
        path
    }

    #[test]
    fn loads_a_minimal_map() {
        let dir = TempDir::new().expect("tempdir");
        let cell_count = LAYER_COUNT * 4;
        let data: Vec<String> = (0..cell_count).map(|_| "0".to_string()).collect();
        let json = format!(
            r#"{{"width":2,"height":2,"data":[{}],"flags":[0,15]}}"#,
            data.join(",")
        );
        let path = write_map(&dir, "plains.json", &json);

        let grid = load_map_grid(&path).expect("map should load");
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.tile_width(), DEFAULT_TILE_SIZE_PX);
        assert!(!grid.loops_horizontally());
        assert!(!grid.flags_of(1).is_passable());
    }

    #[test]
    fn honors_explicit_tile_size_and_looping() {
        let dir = TempDir::new().expect("tempdir");
        let data: Vec<String> = (0..LAYER_COUNT).map(|_| "0".to_string()).collect();
        let json = format!(
            concat!(
                r#"{{"width":1,"height":1,"tile_width":32,"tile_height":32,"#,
                r#""loop_horizontal":true,"loop_vertical":true,"data":[{}],"flags":[]}}"#
            ),
            data.join(",")
        );
        let path = write_map(&dir, "tower.json", &json);

        let grid = load_map_grid(&path).expect("map should load");
        assert_eq!(grid.tile_width(), 32);
        assert!(grid.loops_horizontally());
        assert!(grid.loops_vertically());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = TempDir::new().expect("tempdir");
        let error = load_map_grid(&dir.path().join("absent.json")).expect_err("should fail");
        assert!(matches!(error, MapLoadError::Read { .. }));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_map(&dir, "broken.json", "{not json");
        let error = load_map_grid(&path).expect_err("should fail");
        assert!(matches!(error, MapLoadError::Parse { .. }));
    }

    #[test]
    fn wrong_cell_count_is_a_shape_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_map(
            &dir,
            "short.json",
            r#"{"width":2,"height":2,"data":[0,0,0],"flags":[]}"#,
        );
        let error = load_map_grid(&path).expect_err("should fail");
        assert!(matches!(error, MapLoadError::Shape { .. }));
    }
}
