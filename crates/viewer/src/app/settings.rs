use std::fs;
use std::path::Path;

use engine::{AffineCoefficients, ViewMode, ViewTuning, DEFAULT_COEFFICIENTS, HEIGHT_MAX};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

/// Optional settings file next to the assets. Anything missing or broken
/// falls back to the documented defaults; a bad file never stops the viewer.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerSettings {
    pub projection: ProjectionSettings,
    pub view_mode: Option<String>,
    pub character_shift_px: Option<i32>,
    pub visible_span_tiles: Option<i32>,
    pub bias_table: Option<Vec<i32>>,
    pub map: Option<String>,
    pub tileset: Option<String>,
    pub window_width: Option<u32>,
    pub window_height: Option<u32>,
}

/// Coefficients arrive as raw JSON values: numbers, or strings carried over
/// from engine-style parameter lists. Anything else falls back per field.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectionSettings {
    pub a: Value,
    pub b: Value,
    pub c: Value,
    pub d: Value,
    pub tx: Value,
    pub ty: Value,
}

pub fn load_settings(path: &Path) -> ViewerSettings {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            info!(
                path = %path.display(),
                error = %error,
                "no settings file; using defaults"
            );
            return ViewerSettings::default();
        }
    };

    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    match serde_path_to_error::deserialize::<_, ViewerSettings>(&mut deserializer) {
        Ok(settings) => settings,
        Err(error) => {
            let field_path = error.path().to_string();
            let source = error.into_inner();
            if field_path.is_empty() || field_path == "." {
                warn!(path = %path.display(), error = %source, "settings parse failed; using defaults");
            } else {
                warn!(
                    path = %path.display(),
                    field = field_path.as_str(),
                    error = %source,
                    "settings parse failed; using defaults"
                );
            }
            ViewerSettings::default()
        }
    }
}

impl ViewerSettings {
    pub fn affine(&self) -> AffineCoefficients {
        AffineCoefficients {
            a: coefficient("a", &self.projection.a, DEFAULT_COEFFICIENTS.a),
            b: coefficient("b", &self.projection.b, DEFAULT_COEFFICIENTS.b),
            c: coefficient("c", &self.projection.c, DEFAULT_COEFFICIENTS.c),
            d: coefficient("d", &self.projection.d, DEFAULT_COEFFICIENTS.d),
            tx: coefficient("tx", &self.projection.tx, DEFAULT_COEFFICIENTS.tx),
            ty: coefficient("ty", &self.projection.ty, DEFAULT_COEFFICIENTS.ty),
        }
        .sanitized()
    }

    pub fn mode(&self) -> ViewMode {
        match self.view_mode.as_deref() {
            None => ViewMode::default(),
            Some("anchor") => ViewMode::AnchorCentered,
            Some("fixed") => ViewMode::FixedOrigin,
            Some(other) => {
                warn!(view_mode = other, "unknown view mode; using anchor");
                ViewMode::AnchorCentered
            }
        }
    }

    pub fn tuning(&self) -> ViewTuning {
        let defaults = ViewTuning::default();
        ViewTuning {
            character_shift_px: self.character_shift_px.unwrap_or(defaults.character_shift_px),
            visible_span_tiles: self
                .visible_span_tiles
                .filter(|span| *span > 0)
                .unwrap_or(defaults.visible_span_tiles),
            bias_table: self.bias_table.as_ref().and_then(|table| {
                let expected = HEIGHT_MAX as usize + 1;
                match <[i32; 16]>::try_from(table.as_slice()) {
                    Ok(table) => Some(table),
                    Err(_) => {
                        warn!(
                            entries = table.len(),
                            expected, "bias table has wrong length; using the formula"
                        );
                        None
                    }
                }
            }),
        }
    }

    pub fn tileset_key(&self) -> &str {
        self.tileset.as_deref().unwrap_or("world")
    }

    pub fn window_size(&self) -> (u32, u32) {
        (
            self.window_width.filter(|w| *w > 0).unwrap_or(816),
            self.window_height.filter(|h| *h > 0).unwrap_or(624),
        )
    }
}

fn coefficient(name: &'static str, value: &Value, default: f32) -> f32 {
    match value {
        Value::Null => default,
        Value::Number(number) => number.as_f64().map(|v| v as f32).unwrap_or_else(|| {
            warn!(coefficient = name, "coefficient is not representable; using default");
            default
        }),
        Value::String(text) => match text.trim().parse::<f32>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    coefficient = name,
                    value = text.as_str(),
                    "non-numeric coefficient; using default"
                );
                default
            }
        },
        other => {
            warn!(
                coefficient = name,
                value = %other,
                "non-numeric coefficient; using default"
            );
            default
        }
    }
}
