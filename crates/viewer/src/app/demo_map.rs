use engine::{MapGrid, TileFlags, LAYER_COUNT, SHADOW_LAYER};

pub const DEMO_MAP_SIZE: u32 = 24;
pub const DEMO_TILE_SIZE_PX: u32 = 48;

// Tile ids used by the built-in map.
pub const TILE_GRASS: u16 = 1;
pub const TILE_PATH: u16 = 2;
pub const TILE_FLOWERS: u16 = 7;
pub const TILE_TREE: u16 = 8;
pub const TILE_WALL: u16 = 9;
pub const TILE_COUNTER: u16 = 10;
pub const TILE_CANOPY: u16 = 11;

/// A small showcase map: an east-west path, a walled yard with a counter,
/// tree lines and flower patches, plus shadows south of the walls. Enough
/// variety that every paint band and height value shows up on screen.
pub fn build_demo_map() -> MapGrid {
    let size = DEMO_MAP_SIZE;
    let per_layer = (size * size) as usize;
    let mut cells = vec![0u16; LAYER_COUNT * per_layer];

    let index = |layer: usize, x: u32, y: u32| layer * per_layer + (y * size + x) as usize;

    for y in 0..size {
        for x in 0..size {
            cells[index(0, x, y)] = if y == 11 || y == 12 {
                TILE_PATH
            } else {
                TILE_GRASS
            };
        }
    }

    // Walled yard in the north-west corner, open to the south.
    for x in 3..9 {
        cells[index(1, x, 3)] = TILE_WALL;
    }
    for y in 3..7 {
        cells[index(1, 3, y)] = TILE_WALL;
        cells[index(1, 8, y)] = TILE_WALL;
    }
    cells[index(1, 5, 5)] = TILE_COUNTER;

    // Tree line along the path and a small grove in the south-east.
    for x in (2..size - 2).step_by(4) {
        cells[index(1, x, 14)] = TILE_TREE;
    }
    for (x, y) in [(16, 18), (18, 17), (19, 19), (15, 20)] {
        cells[index(1, x, y)] = TILE_TREE;
    }

    // Flower patches: ground decoration that characters walk in front of.
    for (x, y) in [(11, 9), (12, 16), (6, 10), (17, 8), (10, 20)] {
        cells[index(1, x, y)] = TILE_FLOWERS;
    }

    // Canopy over the grove: flat-drawn above everything.
    for (x, y) in [(17, 17), (18, 18)] {
        cells[index(2, x, y)] = TILE_CANOPY;
    }

    // Shadows hug the south side of the yard walls.
    for x in 3..9 {
        cells[index(SHADOW_LAYER, x, 7)] = 0b0011;
    }

    // Flag table by tile id. Walls span three rows, trees two, flowers one.
    let solid = TileFlags::new(0x000F);
    let mut flag_table = vec![0u16; TILE_CANOPY as usize + 1];
    flag_table[TILE_FLOWERS as usize] = TileFlags::default().with_height(1).raw();
    flag_table[TILE_TREE as usize] = solid.with_height(2).raw();
    flag_table[TILE_WALL as usize] = solid.with_height(3).raw();
    flag_table[TILE_COUNTER as usize] = TileFlags::new(0x008F).raw();
    flag_table[TILE_CANOPY as usize] = TileFlags::new(0x0010).raw();

    MapGrid::new(size, size, DEMO_TILE_SIZE_PX, DEMO_TILE_SIZE_PX, cells, flag_table)
        .expect("demo map dimensions are static")
}
