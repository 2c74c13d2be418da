use thiserror::Error;
use tracing::warn;

use crate::app::Vec2;

/// The classic 45-degree skew: one tile step east moves a full tile right and
/// half a tile down, one step south moves a full tile left and half down.
pub const DEFAULT_COEFFICIENTS: AffineCoefficients = AffineCoefficients {
    a: 1.0,
    b: -1.0,
    c: 0.5,
    d: 0.5,
    tx: 0.0,
    ty: 0.0,
};

/// 2-D affine map from view-space pixels to screen pixels:
/// `screen_x = a*x + b*y + tx`, `screen_y = c*x + d*y + ty`.
///
/// `tx`/`ty` only apply in fixed-origin mode; anchor-centered projection
/// derives its translation from the anchor and screen center instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineCoefficients {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for AffineCoefficients {
    fn default() -> Self {
        DEFAULT_COEFFICIENTS
    }
}

impl AffineCoefficients {
    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    /// Replace every non-finite coefficient with its documented default.
    /// A broken projection is a visual bug, never a startup failure.
    pub fn sanitized(self) -> Self {
        Self {
            a: sanitize_coefficient("a", self.a, DEFAULT_COEFFICIENTS.a),
            b: sanitize_coefficient("b", self.b, DEFAULT_COEFFICIENTS.b),
            c: sanitize_coefficient("c", self.c, DEFAULT_COEFFICIENTS.c),
            d: sanitize_coefficient("d", self.d, DEFAULT_COEFFICIENTS.d),
            tx: sanitize_coefficient("tx", self.tx, DEFAULT_COEFFICIENTS.tx),
            ty: sanitize_coefficient("ty", self.ty, DEFAULT_COEFFICIENTS.ty),
        }
    }
}

fn sanitize_coefficient(name: &'static str, value: f32, default: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        warn!(
            coefficient = name,
            value = %value,
            default,
            "invalid projection coefficient; using default"
        );
        default
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    /// `tx`/`ty` are a constant screen offset; scrolling is the caller's job.
    FixedOrigin,
    /// The tracked anchor always lands on the screen center; everything else
    /// is projected relative to it. Recomputed every frame the anchor moves.
    #[default]
    AnchorCentered,
}

/// Per-frame inputs the projection needs besides the point itself.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewFrame {
    /// View-space pixel position of the tracked anchor (anchor mode only).
    pub anchor_view_px: Vec2,
    pub screen_center_px: Vec2,
}

/// Screen-space corners of a projected tile cell, floored to integer pixels:
/// top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileQuad {
    pub corners: [(i32, i32); 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ProjectionError {
    #[error("affine matrix is degenerate (determinant {determinant})")]
    DegenerateTransform { determinant: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    coefficients: AffineCoefficients,
    mode: ViewMode,
}

impl Projection {
    pub fn new(coefficients: AffineCoefficients, mode: ViewMode) -> Self {
        Self {
            coefficients: coefficients.sanitized(),
            mode,
        }
    }

    pub fn coefficients(&self) -> AffineCoefficients {
        self.coefficients
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    fn linear(&self, v: Vec2) -> Vec2 {
        let m = &self.coefficients;
        Vec2 {
            x: m.a * v.x + m.b * v.y,
            y: m.c * v.x + m.d * v.y,
        }
    }

    fn project_f32(&self, view_px: Vec2, frame: &ViewFrame) -> Vec2 {
        match self.mode {
            ViewMode::FixedOrigin => {
                let p = self.linear(view_px);
                Vec2 {
                    x: p.x + self.coefficients.tx,
                    y: p.y + self.coefficients.ty,
                }
            }
            ViewMode::AnchorCentered => {
                let p = self.linear(Vec2 {
                    x: view_px.x - frame.anchor_view_px.x,
                    y: view_px.y - frame.anchor_view_px.y,
                });
                Vec2 {
                    x: p.x + frame.screen_center_px.x,
                    y: p.y + frame.screen_center_px.y,
                }
            }
        }
    }

    /// Project a view-space pixel position to integer screen pixels.
    ///
    /// Coordinates floor-truncate so independently projected drawables agree
    /// on shared edges instead of drifting a sub-pixel apart.
    pub fn project_px(&self, view_px: Vec2, frame: &ViewFrame) -> (i32, i32) {
        let p = self.project_f32(view_px, frame);
        (p.x.floor() as i32, p.y.floor() as i32)
    }

    /// Project the four corners of an axis-aligned view-space rectangle
    /// (a tile cell, before the skew).
    pub fn project_quad(
        &self,
        top_left_view_px: Vec2,
        width_px: f32,
        height_px: f32,
        frame: &ViewFrame,
    ) -> TileQuad {
        let Vec2 { x, y } = top_left_view_px;
        let corners = [
            Vec2 { x, y },
            Vec2 { x: x + width_px, y },
            Vec2 {
                x: x + width_px,
                y: y + height_px,
            },
            Vec2 {
                x,
                y: y + height_px,
            },
        ]
        .map(|corner| {
            let p = self.project_f32(corner, frame);
            (p.x.floor() as i32, p.y.floor() as i32)
        });
        TileQuad { corners }
    }

    /// Inverse of the linear part as `[a, b, c, d]` row-major, for callers
    /// that map many screen pixels back to view space (rasterizer, input).
    pub fn inverse_linear(&self) -> Result<[f32; 4], ProjectionError> {
        let m = &self.coefficients;
        let determinant = m.determinant();
        if determinant.abs() <= f32::EPSILON {
            return Err(ProjectionError::DegenerateTransform { determinant });
        }
        Ok([
            m.d / determinant,
            -m.b / determinant,
            -m.c / determinant,
            m.a / determinant,
        ])
    }

    /// Map a screen pixel back to view-space pixels. Fails on a degenerate
    /// matrix; callers fall back to treating screen space as view space.
    pub fn unproject_px(&self, screen_px: Vec2, frame: &ViewFrame) -> Result<Vec2, ProjectionError> {
        let inv = self.inverse_linear()?;
        let relative = match self.mode {
            ViewMode::FixedOrigin => Vec2 {
                x: screen_px.x - self.coefficients.tx,
                y: screen_px.y - self.coefficients.ty,
            },
            ViewMode::AnchorCentered => Vec2 {
                x: screen_px.x - frame.screen_center_px.x,
                y: screen_px.y - frame.screen_center_px.y,
            },
        };
        let v = apply_matrix(inv, relative);
        Ok(match self.mode {
            ViewMode::FixedOrigin => v,
            ViewMode::AnchorCentered => Vec2 {
                x: v.x + frame.anchor_view_px.x,
                y: v.y + frame.anchor_view_px.y,
            },
        })
    }

    /// Map a screen-space direction to a view-space direction (no
    /// translation). Used to turn "up was pressed" into a map-space heading.
    pub fn unproject_delta(&self, screen_delta: Vec2) -> Result<Vec2, ProjectionError> {
        let inv = self.inverse_linear()?;
        Ok(apply_matrix(inv, screen_delta))
    }
}

fn apply_matrix(m: [f32; 4], v: Vec2) -> Vec2 {
    Vec2 {
        x: m[0] * v.x + m[1] * v.y,
        y: m[2] * v.x + m[3] * v.y,
    }
}
