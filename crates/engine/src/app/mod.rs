mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{
    character_sort_y, classify_tile, compare_draw_order, raised_bias, raised_sort_y,
    tile_bottom_screen_y, AffineCoefficients, DrawOrderKey, DrawableId, DrawableIdAllocator,
    FlatBucket, FlatTileDraw, FramePaintStats, FrameComposer, PaintBand, Projection,
    ProjectionError, RaisedTileDrawable, Renderer, ShadowDraw, TableEdgeDraw, TileClass, TileQuad,
    ViewFrame, ViewMode, Viewport, VisibleRegion, DEFAULT_CHARACTER_SHIFT_PX,
    DEFAULT_COEFFICIENTS, DEFAULT_VISIBLE_SPAN_TILES,
};
pub use scene::{
    Character, InputSnapshot, Scene, SceneCommand, SceneWorld, Vec2, ViewTuning,
};
