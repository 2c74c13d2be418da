use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::app::{SceneWorld, Vec2};
use crate::asset_keys::validate_asset_key;
use crate::map::MapGrid;

use super::draw_order::{
    character_sort_y, compare_draw_order, raised_sort_y, tile_bottom_screen_y, DrawOrderKey,
    PaintBand,
};
use super::projection::{Projection, TileQuad, ViewFrame};
use super::Viewport;

const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];
const CHARACTER_PLACEHOLDER_COLOR: [u8; 4] = [220, 220, 240, 255];
const SHADOW_SHADE_NUMERATOR: u16 = 1;
const SHADOW_SHADE_DENOMINATOR: u16 = 2;

// Fallback palette when the tileset is missing; keyed off the tile id so
// adjacent different tiles stay distinguishable.
const FALLBACK_TILE_COLORS: [[u8; 4]; 6] = [
    [74, 112, 56, 255],
    [112, 83, 58, 255],
    [96, 96, 110, 255],
    [70, 90, 120, 255],
    [120, 104, 64, 255],
    [88, 70, 96, 255],
];

/// What one frame actually painted; the loop logs these with its metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramePaintStats {
    pub lower_quads: usize,
    pub sorted_drawables: usize,
    pub upper_quads: usize,
}

struct LoadedTexture {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

/// Grid-layout tileset image: tile id n sits at column `n % columns`,
/// row `n / columns`.
struct TilesetAtlas {
    columns: u32,
    rows: u32,
    tile_width: u32,
    tile_height: u32,
    texture: LoadedTexture,
}

impl TilesetAtlas {
    fn load(path: &Path, tile_width: u32, tile_height: u32) -> Result<Self, String> {
        if tile_width == 0 || tile_height == 0 {
            return Err("tile size must be non-zero".to_string());
        }
        let texture = load_texture_rgba(path)?;
        let columns = texture.width / tile_width;
        let rows = texture.height / tile_height;
        if columns == 0 || rows == 0 {
            return Err(format!(
                "atlas {}x{} is smaller than one {}x{} tile",
                texture.width, texture.height, tile_width, tile_height
            ));
        }
        Ok(Self {
            columns,
            rows,
            tile_width,
            tile_height,
            texture,
        })
    }

    fn source_origin(&self, tile_id: u16) -> Option<(u32, u32)> {
        let index = tile_id as u32;
        let column = index % self.columns;
        let row = index / self.columns;
        if row >= self.rows {
            return None;
        }
        Some((column * self.tile_width, row * self.tile_height))
    }

    fn texel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        sample_texture(&self.texture, x, y)
    }
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    assets_root: PathBuf,
    tileset: Option<TilesetAtlas>,
    sprite_cache: HashMap<String, Option<LoadedTexture>>,
    warned_missing_sprite_keys: HashSet<String>,
    degenerate_warned: bool,
    band_scratch: Vec<BandEntry>,
}

#[derive(Debug, Clone, Copy)]
struct BandEntry {
    key: DrawOrderKey,
    body: BandBody,
}

#[derive(Debug, Clone, Copy)]
enum BandBody {
    RaisedTile { tile_id: u16, map_x: i32, map_y: i32 },
    Character { index: usize },
}

impl Renderer {
    pub fn new(
        window: Arc<Window>,
        assets_root: PathBuf,
        tileset_key: &str,
        tile_width: u32,
        tile_height: u32,
    ) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        let tileset = resolve_tileset(&assets_root, tileset_key, tile_width, tile_height);
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
            assets_root,
            tileset,
            sprite_cache: HashMap::new(),
            warned_missing_sprite_keys: HashSet::new(),
            degenerate_warned: false,
            band_scratch: Vec::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render_world(&mut self, world: &SceneWorld) -> Result<FramePaintStats, Error> {
        let width = self.viewport.width;
        let height = self.viewport.height;
        if width == 0 || height == 0 {
            return Ok(FramePaintStats::default());
        }

        {
            let frame = self.pixels.frame_mut();
            for chunk in frame.chunks_exact_mut(4) {
                chunk.copy_from_slice(&CLEAR_COLOR);
            }
        }

        let Some(map) = world.map() else {
            self.pixels.render()?;
            return Ok(FramePaintStats::default());
        };

        let projection = world.projection();
        let view_frame = world.view_frame((width, height));
        let display = world.display();
        let tile_width = map.tile_width();
        let tile_height = map.tile_height();

        // The rasterizer maps screen pixels back through the linear part; a
        // degenerate matrix falls back to the identity mapping.
        let inverse_linear = match projection.inverse_linear() {
            Ok(matrix) => matrix,
            Err(error) => {
                if !self.degenerate_warned {
                    warn!(error = %error, "projection not invertible; painting with identity mapping");
                    self.degenerate_warned = true;
                }
                [1.0, 0.0, 0.0, 1.0]
            }
        };

        let cell_quad = |x: i32, y: i32, quad_height_px: f32| -> TileQuad {
            let view_px = Vec2 {
                x: map.adjust_x(x as f32, display.x) * tile_width as f32,
                y: map.adjust_y(y as f32, display.y) * tile_height as f32,
            };
            projection.project_quad(view_px, tile_width as f32, quad_height_px, &view_frame)
        };

        self.assemble_band(world, map, tile_height);
        let mut stats = FramePaintStats {
            sorted_drawables: self.band_scratch.len(),
            ..FramePaintStats::default()
        };
        let composer = world.composer();

        for flat in composer.lower() {
            let quad = cell_quad(flat.map_x, flat.map_y, tile_height as f32);
            self.paint_tile(&quad, inverse_linear, flat.tile_id, tile_width, tile_height);
            stats.lower_quads += 1;
        }

        for shadow in composer.shadows() {
            self.paint_shadow_quadrants(
                shadow.bits,
                shadow.map_x,
                shadow.map_y,
                map,
                display,
                &projection,
                &view_frame,
                inverse_linear,
            );
        }

        for edge in composer.edges() {
            // The strip reuses the counter tile's bottom half, drawn over the
            // top half of the cell south of it.
            let strip_height = (tile_height / 2).max(1);
            let quad = cell_quad(edge.map_x, edge.map_y, strip_height as f32);
            let source = self.tileset.as_ref().and_then(|atlas| {
                atlas
                    .source_origin(edge.tile_id)
                    .map(|(sx, sy)| (sx, sy + tile_height - strip_height))
            });
            self.paint_quad_with_source(
                &quad,
                inverse_linear,
                tile_width,
                strip_height,
                source,
                edge.tile_id,
            );
        }

        let band = std::mem::take(&mut self.band_scratch);
        for entry in &band {
            match entry.body {
                BandBody::RaisedTile {
                    tile_id,
                    map_x,
                    map_y,
                } => {
                    let quad = cell_quad(map_x, map_y, tile_height as f32);
                    self.paint_tile(&quad, inverse_linear, tile_id, tile_width, tile_height);
                }
                BandBody::Character { index } => {
                    let Some(character) = world.characters().get(index) else {
                        continue;
                    };
                    let anchor_view_px = Vec2 {
                        x: (map.adjust_x(character.position.x, display.x) + 0.5)
                            * tile_width as f32,
                        y: (map.adjust_y(character.position.y, display.y) + 1.0)
                            * tile_height as f32,
                    };
                    let (anchor_x, anchor_y) = projection.project_px(anchor_view_px, &view_frame);
                    self.paint_character(
                        anchor_x,
                        anchor_y,
                        character.sprite_key.clone(),
                        tile_height,
                    );
                }
            }
        }
        self.band_scratch = band;

        for flat in composer.upper() {
            let quad = cell_quad(flat.map_x, flat.map_y, tile_height as f32);
            self.paint_tile(&quad, inverse_linear, flat.tile_id, tile_width, tile_height);
            stats.upper_quads += 1;
        }

        self.pixels.render()?;
        Ok(stats)
    }

    /// Collect raised tiles and characters into one list ordered by the
    /// draw-order comparator. Keys are rebuilt from scratch every frame;
    /// nothing stale survives from the previous one.
    fn assemble_band(&mut self, world: &SceneWorld, map: &MapGrid, tile_height: u32) {
        let display = world.display();
        let tuning = world.tuning();
        self.band_scratch.clear();

        for raised in world.composer().raised() {
            let bottom =
                tile_bottom_screen_y(map.adjust_y(raised.map_y as f32, display.y), tile_height);
            self.band_scratch.push(BandEntry {
                key: DrawOrderKey {
                    band: PaintBand::Actors,
                    sort_y: raised_sort_y(
                        bottom,
                        raised.height,
                        tile_height,
                        tuning.bias_table.as_ref(),
                    ),
                    stable_id: raised.id,
                },
                body: BandBody::RaisedTile {
                    tile_id: raised.tile_id,
                    map_x: raised.map_x,
                    map_y: raised.map_y,
                },
            });
        }

        for (index, character) in world.characters().iter().enumerate() {
            let bottom =
                tile_bottom_screen_y(map.adjust_y(character.position.y, display.y), tile_height);
            self.band_scratch.push(BandEntry {
                key: DrawOrderKey {
                    band: PaintBand::Actors,
                    sort_y: character_sort_y(bottom, tuning.character_shift_px),
                    stable_id: character.id,
                },
                body: BandBody::Character { index },
            });
        }

        self.band_scratch
            .sort_by(|left, right| compare_draw_order(&left.key, &right.key));
    }

    fn paint_tile(
        &mut self,
        quad: &TileQuad,
        inverse_linear: [f32; 4],
        tile_id: u16,
        tile_width: u32,
        tile_height: u32,
    ) {
        let source = self
            .tileset
            .as_ref()
            .and_then(|atlas| atlas.source_origin(tile_id));
        self.paint_quad_with_source(quad, inverse_linear, tile_width, tile_height, source, tile_id);
    }

    fn paint_quad_with_source(
        &mut self,
        quad: &TileQuad,
        inverse_linear: [f32; 4],
        local_width: u32,
        local_height: u32,
        source_origin: Option<(u32, u32)>,
        tile_id: u16,
    ) {
        let width = self.viewport.width;
        let height = self.viewport.height;
        match (self.tileset.as_ref(), source_origin) {
            (Some(atlas), Some((sx, sy))) => paint_quad(
                self.pixels.frame_mut(),
                width,
                height,
                quad,
                inverse_linear,
                local_width,
                local_height,
                |lx, ly| atlas.texel(sx + lx, sy + ly),
            ),
            _ => {
                let color = fallback_tile_color(tile_id);
                paint_quad(
                    self.pixels.frame_mut(),
                    width,
                    height,
                    quad,
                    inverse_linear,
                    local_width,
                    local_height,
                    |_, _| Some(color),
                )
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn paint_shadow_quadrants(
        &mut self,
        bits: u8,
        map_x: i32,
        map_y: i32,
        map: &MapGrid,
        display: Vec2,
        projection: &Projection,
        view_frame: &ViewFrame,
        inverse_linear: [f32; 4],
    ) {
        let tile_width = map.tile_width() as f32;
        let tile_height = map.tile_height() as f32;
        let base = Vec2 {
            x: map.adjust_x(map_x as f32, display.x) * tile_width,
            y: map.adjust_y(map_y as f32, display.y) * tile_height,
        };
        let half_w = tile_width / 2.0;
        let half_h = tile_height / 2.0;
        // Bit 0 top-left, bit 1 top-right, bit 2 bottom-left, bit 3
        // bottom-right.
        for (bit, dx, dy) in [
            (0u8, 0.0, 0.0),
            (1, half_w, 0.0),
            (2, 0.0, half_h),
            (3, half_w, half_h),
        ] {
            if bits & (1 << bit) == 0 {
                continue;
            }
            let quad = projection.project_quad(
                Vec2 {
                    x: base.x + dx,
                    y: base.y + dy,
                },
                half_w,
                half_h,
                view_frame,
            );
            shade_quad(
                self.pixels.frame_mut(),
                self.viewport.width,
                self.viewport.height,
                &quad,
                inverse_linear,
                half_w as u32,
                half_h as u32,
            );
        }
    }

    fn paint_character(
        &mut self,
        anchor_x: i32,
        anchor_y: i32,
        sprite_key: Option<String>,
        tile_height: u32,
    ) {
        let width = self.viewport.width;
        let height = self.viewport.height;
        if let Some(key) = sprite_key.as_deref() {
            if let Some(sprite) = resolve_cached_sprite(
                &mut self.sprite_cache,
                &mut self.warned_missing_sprite_keys,
                &self.assets_root,
                key,
            ) {
                draw_texture_bottom_centered(
                    self.pixels.frame_mut(),
                    width,
                    anchor_x,
                    anchor_y,
                    sprite,
                );
                return;
            }
        }
        let half = (tile_height / 3).max(4) as i32;
        draw_square_bottom_anchored(
            self.pixels.frame_mut(),
            width,
            height,
            anchor_x,
            anchor_y,
            half,
            CHARACTER_PLACEHOLDER_COLOR,
        );
    }
}

fn resolve_tileset(
    assets_root: &Path,
    tileset_key: &str,
    tile_width: u32,
    tile_height: u32,
) -> Option<TilesetAtlas> {
    if let Err(error) = validate_asset_key(tileset_key) {
        warn!(tileset_key, error = %error, "invalid tileset key; using fallback colors");
        return None;
    }
    let path = assets_root
        .join("tilesets")
        .join(format!("{tileset_key}.png"));
    match TilesetAtlas::load(&path, tile_width, tile_height) {
        Ok(atlas) => Some(atlas),
        Err(reason) => {
            warn!(
                tileset_key,
                path = %path.display(),
                reason = reason.as_str(),
                "tileset unavailable; using fallback colors"
            );
            None
        }
    }
}

fn load_texture_rgba(path: &Path) -> Result<LoadedTexture, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedTexture {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn sample_texture(texture: &LoadedTexture, x: u32, y: u32) -> Option<[u8; 4]> {
    if x >= texture.width || y >= texture.height {
        return None;
    }
    let offset = (y as usize * texture.width as usize + x as usize) * 4;
    let texel = texture.rgba.get(offset..offset + 4)?;
    if texel[3] == 0 {
        return None;
    }
    Some([texel[0], texel[1], texel[2], texel[3]])
}

fn resolve_cached_sprite<'a>(
    cache: &'a mut HashMap<String, Option<LoadedTexture>>,
    warned_missing_keys: &mut HashSet<String>,
    assets_root: &Path,
    key: &str,
) -> Option<&'a LoadedTexture> {
    if !cache.contains_key(key) {
        let loaded = match validate_asset_key(key) {
            Ok(()) => {
                let path = assets_root.join("sprites").join(format!("{key}.png"));
                match load_texture_rgba(&path) {
                    Ok(texture) => Some(texture),
                    Err(reason) => {
                        warn_sprite_load_once(warned_missing_keys, key, reason.as_str());
                        None
                    }
                }
            }
            Err(error) => {
                warn_sprite_load_once(warned_missing_keys, key, &format!("invalid_key:{error}"));
                None
            }
        };
        cache.insert(key.to_string(), loaded);
    }
    cache.get(key).and_then(Option::as_ref)
}

fn warn_sprite_load_once(warned_keys: &mut HashSet<String>, key: &str, reason: &str) {
    if !warned_keys.insert(key.to_string()) {
        return;
    }
    warn!(
        sprite_key = key,
        reason, "character sprite unavailable; drawing placeholder"
    );
}

fn fallback_tile_color(tile_id: u16) -> [u8; 4] {
    FALLBACK_TILE_COLORS[tile_id as usize % FALLBACK_TILE_COLORS.len()]
}

/// Rasterize one projected parallelogram. Pixels inside the quad map back to
/// local tile coordinates through the inverse linear part; `texel` decides
/// the color (None = transparent).
#[allow(clippy::too_many_arguments)]
fn paint_quad(
    frame: &mut [u8],
    width: u32,
    height: u32,
    quad: &TileQuad,
    inverse_linear: [f32; 4],
    local_width: u32,
    local_height: u32,
    mut texel: impl FnMut(u32, u32) -> Option<[u8; 4]>,
) {
    let Some((min_x, max_x, min_y, max_y)) = clipped_quad_bounds(quad, width, height) else {
        return;
    };

    let origin = quad.corners[0];
    let local_width_f = local_width as f32;
    let local_height_f = local_height as f32;
    for py in min_y..=max_y {
        for px in min_x..=max_x {
            let rel_x = (px - origin.0) as f32 + 0.5;
            let rel_y = (py - origin.1) as f32 + 0.5;
            let local_x = inverse_linear[0] * rel_x + inverse_linear[1] * rel_y;
            let local_y = inverse_linear[2] * rel_x + inverse_linear[3] * rel_y;
            if local_x < 0.0
                || local_x >= local_width_f
                || local_y < 0.0
                || local_y >= local_height_f
            {
                continue;
            }
            if let Some(color) = texel(local_x as u32, local_y as u32) {
                write_pixel_rgba_clipped(frame, width as usize, px, py, color);
            }
        }
    }
}

/// Like `paint_quad`, but darkens the covered pixels instead of replacing
/// them.
fn shade_quad(
    frame: &mut [u8],
    width: u32,
    height: u32,
    quad: &TileQuad,
    inverse_linear: [f32; 4],
    local_width: u32,
    local_height: u32,
) {
    let Some((min_x, max_x, min_y, max_y)) = clipped_quad_bounds(quad, width, height) else {
        return;
    };

    let origin = quad.corners[0];
    for py in min_y..=max_y {
        for px in min_x..=max_x {
            let rel_x = (px - origin.0) as f32 + 0.5;
            let rel_y = (py - origin.1) as f32 + 0.5;
            let local_x = inverse_linear[0] * rel_x + inverse_linear[1] * rel_y;
            let local_y = inverse_linear[2] * rel_x + inverse_linear[3] * rel_y;
            if local_x < 0.0
                || local_x >= local_width as f32
                || local_y < 0.0
                || local_y >= local_height as f32
            {
                continue;
            }
            darken_pixel(frame, width as usize, px, py);
        }
    }
}

fn clipped_quad_bounds(quad: &TileQuad, width: u32, height: u32) -> Option<(i32, i32, i32, i32)> {
    let min_x = quad.corners.iter().map(|c| c.0).min()?.max(0);
    let max_x = quad.corners.iter().map(|c| c.0).max()?.min(width as i32 - 1);
    let min_y = quad.corners.iter().map(|c| c.1).min()?.max(0);
    let max_y = quad
        .corners
        .iter()
        .map(|c| c.1)
        .max()?
        .min(height as i32 - 1);
    if min_x > max_x || min_y > max_y {
        return None;
    }
    Some((min_x, max_x, min_y, max_y))
}

fn draw_square_bottom_anchored(
    frame: &mut [u8],
    width: u32,
    height: u32,
    anchor_x: i32,
    anchor_y: i32,
    half_size: i32,
    color: [u8; 4],
) {
    for y in (anchor_y - half_size * 2)..anchor_y {
        for x in (anchor_x - half_size)..=(anchor_x + half_size) {
            if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
                continue;
            }
            write_pixel_rgba_clipped(frame, width as usize, x, y, color);
        }
    }
}

fn draw_texture_bottom_centered(
    frame: &mut [u8],
    width: u32,
    anchor_x: i32,
    anchor_y: i32,
    texture: &LoadedTexture,
) {
    let left = anchor_x - texture.width as i32 / 2;
    let top = anchor_y - texture.height as i32;
    for sy in 0..texture.height {
        for sx in 0..texture.width {
            let Some(color) = sample_texture(texture, sx, sy) else {
                continue;
            };
            write_pixel_rgba_clipped(
                frame,
                width as usize,
                left + sx as i32,
                top + sy as i32,
                color,
            );
        }
    }
}

fn darken_pixel(frame: &mut [u8], width: usize, x: i32, y: i32) {
    if x < 0 || y < 0 {
        return;
    }
    let Some(offset) = pixel_byte_offset(frame.len(), width, x as usize, y as usize) else {
        return;
    };
    for channel in 0..3 {
        let value = frame[offset + channel] as u16;
        frame[offset + channel] = (value * SHADOW_SHADE_NUMERATOR / SHADOW_SHADE_DENOMINATOR) as u8;
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let Some(offset) = pixel_byte_offset(frame.len(), width, x as usize, y as usize) else {
        return;
    };
    frame[offset..offset + 4].copy_from_slice(&color);
}

fn pixel_byte_offset(frame_len: usize, width: usize, x: usize, y: usize) -> Option<usize> {
    if x >= width {
        return None;
    }
    let pixel_offset = y.checked_mul(width)?.checked_add(x)?;
    let byte_offset = pixel_offset.checked_mul(4)?;
    if byte_offset.checked_add(4)? > frame_len {
        return None;
    }
    Some(byte_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

    fn blank_frame(width: u32, height: u32) -> Vec<u8> {
        vec![0u8; (width * height * 4) as usize]
    }

    fn pixel(frame: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * width + x) * 4) as usize;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    fn axis_aligned_quad(x: i32, y: i32, w: i32, h: i32) -> TileQuad {
        TileQuad {
            corners: [(x, y), (x + w, y), (x + w, y + h), (x, y + h)],
        }
    }

    #[test]
    fn paint_quad_fills_exactly_the_local_rect() {
        let mut frame = blank_frame(8, 8);
        let quad = axis_aligned_quad(2, 2, 4, 4);
        paint_quad(&mut frame, 8, 8, &quad, IDENTITY, 4, 4, |_, _| {
            Some([9, 9, 9, 255])
        });

        assert_eq!(pixel(&frame, 8, 2, 2), [9, 9, 9, 255]);
        assert_eq!(pixel(&frame, 8, 5, 5), [9, 9, 9, 255]);
        assert_eq!(pixel(&frame, 8, 1, 2), [0, 0, 0, 0]);
        assert_eq!(pixel(&frame, 8, 6, 5), [0, 0, 0, 0]);
    }

    #[test]
    fn paint_quad_clips_to_the_frame() {
        let mut frame = blank_frame(4, 4);
        let quad = axis_aligned_quad(-2, -2, 4, 4);
        paint_quad(&mut frame, 4, 4, &quad, IDENTITY, 4, 4, |_, _| {
            Some([7, 7, 7, 255])
        });
        assert_eq!(pixel(&frame, 4, 0, 0), [7, 7, 7, 255]);
        assert_eq!(pixel(&frame, 4, 2, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn paint_quad_skips_transparent_texels() {
        let mut frame = blank_frame(4, 4);
        let quad = axis_aligned_quad(0, 0, 4, 4);
        paint_quad(&mut frame, 4, 4, &quad, IDENTITY, 4, 4, |lx, _| {
            if lx < 2 {
                None
            } else {
                Some([5, 5, 5, 255])
            }
        });
        assert_eq!(pixel(&frame, 4, 0, 0), [0, 0, 0, 0]);
        assert_eq!(pixel(&frame, 4, 3, 0), [5, 5, 5, 255]);
    }

    #[test]
    fn skewed_quad_maps_pixels_through_the_inverse() {
        // Shear x by y: forward [1 1; 0 1], inverse [1 -1; 0 1].
        let mut frame = blank_frame(8, 4);
        let quad = TileQuad {
            corners: [(0, 0), (2, 0), (4, 2), (2, 2)],
        };
        paint_quad(
            &mut frame,
            8,
            4,
            &quad,
            [1.0, -1.0, 0.0, 1.0],
            2,
            2,
            |_, _| Some([3, 3, 3, 255]),
        );
        // Row 1 is shifted right by one pixel relative to row 0.
        assert_eq!(pixel(&frame, 8, 0, 0), [3, 3, 3, 255]);
        assert_eq!(pixel(&frame, 8, 1, 1), [3, 3, 3, 255]);
        assert_eq!(pixel(&frame, 8, 0, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn shade_quad_halves_covered_pixels() {
        let mut frame = vec![200u8; 4 * 4 * 4];
        let quad = axis_aligned_quad(0, 0, 2, 2);
        shade_quad(&mut frame, 4, 4, &quad, IDENTITY, 2, 2);
        assert_eq!(pixel(&frame, 4, 0, 0), [100, 100, 100, 200]);
        assert_eq!(pixel(&frame, 4, 3, 3), [200, 200, 200, 200]);
    }

    #[test]
    fn atlas_addresses_tiles_in_grid_order() {
        let atlas = TilesetAtlas {
            columns: 4,
            rows: 2,
            tile_width: 8,
            tile_height: 8,
            texture: LoadedTexture {
                width: 32,
                height: 16,
                rgba: vec![255u8; 32 * 16 * 4],
            },
        };
        assert_eq!(atlas.source_origin(0), Some((0, 0)));
        assert_eq!(atlas.source_origin(5), Some((8, 8)));
        assert_eq!(atlas.source_origin(8), None);
    }

    #[test]
    fn fallback_colors_are_stable_per_tile_id() {
        assert_eq!(fallback_tile_color(3), fallback_tile_color(3));
        assert_ne!(fallback_tile_color(1), fallback_tile_color(2));
    }

    #[test]
    fn sample_texture_rejects_out_of_bounds_and_transparent() {
        let texture = LoadedTexture {
            width: 2,
            height: 1,
            rgba: vec![10, 20, 30, 255, 1, 2, 3, 0],
        };
        assert_eq!(sample_texture(&texture, 0, 0), Some([10, 20, 30, 255]));
        assert_eq!(sample_texture(&texture, 1, 0), None);
        assert_eq!(sample_texture(&texture, 2, 0), None);
    }

    #[test]
    fn bottom_anchored_square_sits_above_the_anchor() {
        let mut frame = blank_frame(16, 16);
        draw_square_bottom_anchored(&mut frame, 16, 16, 8, 12, 2, [1, 1, 1, 255]);
        assert_eq!(pixel(&frame, 16, 8, 11), [1, 1, 1, 255]);
        assert_eq!(pixel(&frame, 16, 8, 8), [1, 1, 1, 255]);
        assert_eq!(pixel(&frame, 16, 8, 12), [0, 0, 0, 0]);
    }
}
