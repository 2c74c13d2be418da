use tracing::debug;

use crate::map::{MapGrid, EMPTY_TILE_ID, TILE_LAYER_COUNT};

use super::draw_order::{
    classify_tile, DrawableId, DrawableIdAllocator, FlatBucket, TileClass,
};

/// Half the side length of the scanned square, in tiles.
pub const DEFAULT_VISIBLE_SPAN_TILES: i32 = 20;

/// Half-open tile rectangle `[left, right) x [top, bottom)` the composer
/// scans, clamped to the map bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRegion {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl VisibleRegion {
    pub fn around(
        center_x: i32,
        center_y: i32,
        span_tiles: i32,
        map_width: u32,
        map_height: u32,
    ) -> Self {
        let span = span_tiles.max(1);
        Self {
            left: (center_x - span).max(0),
            right: (center_x + span).min(map_width as i32),
            top: (center_y - span).max(0),
            bottom: (center_y + span).min(map_height as i32),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }
}

/// A flat tile parked in one of the fixed buckets. Keeps its creation-order
/// id so in-bucket paint order stays deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatTileDraw {
    pub id: DrawableId,
    pub tile_id: u16,
    pub map_x: i32,
    pub map_y: i32,
}

/// Quadrant shadow bits for one cell, painted with the lower bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowDraw {
    pub bits: u8,
    pub map_x: i32,
    pub map_y: i32,
}

/// Edge strip drawn south of a counter tile, lower bucket only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableEdgeDraw {
    pub tile_id: u16,
    pub map_x: i32,
    pub map_y: i32,
}

/// A height-flagged tile promoted out of its layer into the sorted band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaisedTileDrawable {
    pub id: DrawableId,
    pub tile_id: u16,
    pub map_x: i32,
    pub map_y: i32,
    pub height: u8,
}

/// Walks the visible region and splits every occupied cell into flat-bucket
/// quads, shadows, table edges and raised drawables.
///
/// The scan result is cached per region: scrolling within the same tile
/// rectangle reuses it, crossing into a new rectangle discards the raised
/// drawables and rebuilds with fresh ids from the shared allocator. Ids are
/// never reissued, so survivors elsewhere (characters) keep their order.
#[derive(Debug, Default)]
pub struct FrameComposer {
    region: Option<VisibleRegion>,
    lower: Vec<FlatTileDraw>,
    upper: Vec<FlatTileDraw>,
    shadows: Vec<ShadowDraw>,
    edges: Vec<TableEdgeDraw>,
    raised: Vec<RaisedTileDrawable>,
    rebuilds: u64,
}

impl FrameComposer {
    /// Ensure the scan matches `region`. Returns true when a rebuild ran.
    pub fn refresh(
        &mut self,
        map: &MapGrid,
        region: VisibleRegion,
        ids: &mut DrawableIdAllocator,
    ) -> bool {
        if self.region == Some(region) {
            return false;
        }
        self.lower.clear();
        self.upper.clear();
        self.shadows.clear();
        self.edges.clear();
        self.raised.clear();

        for y in region.top..region.bottom {
            for x in region.left..region.right {
                self.scan_spot(map, x, y, ids);
            }
        }

        self.region = Some(region);
        self.rebuilds = self.rebuilds.saturating_add(1);
        debug!(
            left = region.left,
            top = region.top,
            right = region.right,
            bottom = region.bottom,
            lower = self.lower.len(),
            upper = self.upper.len(),
            raised = self.raised.len(),
            "visible_region_rebuilt"
        );
        true
    }

    /// Forget the cached region so the next refresh rescans (map swapped or
    /// edited in place).
    pub fn invalidate(&mut self) {
        self.region = None;
    }

    fn scan_spot(&mut self, map: &MapGrid, x: i32, y: i32, ids: &mut DrawableIdAllocator) {
        for layer in 0..TILE_LAYER_COUNT {
            let tile_id = map.read_cell(x, y, layer);
            match classify_tile(tile_id, map.flags_of(tile_id)) {
                TileClass::Empty => {}
                TileClass::Flat(FlatBucket::Lower) => self.lower.push(FlatTileDraw {
                    id: ids.allocate(),
                    tile_id,
                    map_x: x,
                    map_y: y,
                }),
                TileClass::Flat(FlatBucket::Upper) => self.upper.push(FlatTileDraw {
                    id: ids.allocate(),
                    tile_id,
                    map_x: x,
                    map_y: y,
                }),
                TileClass::Raised { height } => self.raised.push(RaisedTileDrawable {
                    id: ids.allocate(),
                    tile_id,
                    map_x: x,
                    map_y: y,
                    height,
                }),
            }
        }

        let shadow_bits = map.shadow_bits(x, y);
        if shadow_bits != 0 {
            self.shadows.push(ShadowDraw {
                bits: shadow_bits,
                map_x: x,
                map_y: y,
            });
        }

        // Counter tiles project an edge strip one row south, onto cells that
        // are not counters themselves.
        let north_id = map.read_cell(x, y - 1, 1);
        let here_id = map.read_cell(x, y, 1);
        if north_id != EMPTY_TILE_ID
            && map.flags_of(north_id).is_counter()
            && !map.flags_of(here_id).is_counter()
        {
            self.edges.push(TableEdgeDraw {
                tile_id: north_id,
                map_x: x,
                map_y: y,
            });
        }
    }

    pub fn region(&self) -> Option<VisibleRegion> {
        self.region
    }

    pub fn lower(&self) -> &[FlatTileDraw] {
        &self.lower
    }

    pub fn upper(&self) -> &[FlatTileDraw] {
        &self.upper
    }

    pub fn shadows(&self) -> &[ShadowDraw] {
        &self.shadows
    }

    pub fn edges(&self) -> &[TableEdgeDraw] {
        &self.edges
    }

    pub fn raised(&self) -> &[RaisedTileDrawable] {
        &self.raised
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }
}
