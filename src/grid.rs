//! Metric grid laid over the image once a scale is known.

use egui::{Rect, Vec2};

/// Grids denser than this many screen pixels are not drawn.
pub const MIN_SPACING_PX: f32 = 4.0;

pub const DEFAULT_SPACING_M: f32 = 0.5;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GridLines {
    /// Screen x of each vertical line.
    pub vertical: Vec<f32>,
    /// Screen y of each horizontal line.
    pub horizontal: Vec<f32>,
}

/// On-screen spacing of a grid of `spacing_m` meters.
pub fn spacing_px(pixels_per_meter: f32, zoom: f32, spacing_m: f32) -> f32 {
    pixels_per_meter * zoom * spacing_m
}

/// Line positions covering `image_rect`, shifted by `offset` screen pixels.
/// `None` when the spacing is too dense to be useful.
pub fn grid_lines(image_rect: Rect, spacing: f32, offset: Vec2) -> Option<GridLines> {
    if !spacing.is_finite() || spacing < MIN_SPACING_PX {
        return None;
    }
    Some(GridLines {
        vertical: positions(image_rect.min.x, image_rect.max.x, spacing, offset.x),
        horizontal: positions(image_rect.min.y, image_rect.max.y, spacing, offset.y),
    })
}

fn positions(min: f32, max: f32, step: f32, offset: f32) -> Vec<f32> {
    let mut out = Vec::new();
    let mut v = min + offset.rem_euclid(step) - step;
    while v < max {
        if v >= min {
            out.push(v);
        }
        v += step;
    }
    out
}
