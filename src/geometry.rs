//! Conversions between original-image pixel space and screen space.
//!
//! Everything persisted lives in original-image coordinates; screen
//! coordinates are derived on demand from a [`Viewport`] and never cached.

use egui::{Pos2, Rect, Vec2};

pub const MIN_ZOOM: f32 = 0.05;
pub const MAX_ZOOM: f32 = 10.0;

/// Zoom factor applied per wheel step.
pub const ZOOM_STEP: f32 = 1.1;

pub fn to_screen(point: Pos2, origin: Pos2, scale: f32) -> Pos2 {
    origin + point.to_vec2() * scale
}

/// Inverse of [`to_screen`]. A zero scale falls back to a scale of one.
pub fn to_original(screen: Pos2, origin: Pos2, scale: f32) -> Pos2 {
    let rel = screen - origin;
    if scale == 0.0 {
        return rel.to_pos2();
    }
    (rel / scale).to_pos2()
}

/// Where the image sits on screen and how large it is drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Screen position of the image's top-left pixel.
    pub origin: Pos2,
    pub scale: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            origin: Pos2::ZERO,
            scale: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(origin: Pos2, scale: f32) -> Self {
        Self { origin, scale }
    }

    /// Fit an image into `area`, never enlarging it past 1:1.
    pub fn fit(area: Rect, image_size: Vec2) -> Self {
        let scale = if image_size.x > 0.0 && image_size.y > 0.0 {
            (area.width() / image_size.x)
                .min(area.height() / image_size.y)
                .min(1.0)
        } else {
            1.0
        };
        Self {
            origin: area.min,
            scale: scale.max(MIN_ZOOM),
        }
    }

    pub fn to_screen(&self, point: Pos2) -> Pos2 {
        to_screen(point, self.origin, self.scale)
    }

    pub fn to_original(&self, screen: Pos2) -> Pos2 {
        to_original(screen, self.origin, self.scale)
    }

    /// Screen-space delta to original-space delta, `None` when the scale is zero.
    pub fn delta_to_original(&self, delta: Vec2) -> Option<Vec2> {
        if self.scale == 0.0 {
            None
        } else {
            Some(delta / self.scale)
        }
    }

    pub fn image_rect(&self, image_size: Vec2) -> Rect {
        Rect::from_min_size(self.origin, image_size * self.scale)
    }

    /// Zoom by `ZOOM_STEP^steps`, keeping the point under `cursor` fixed.
    /// Returns whether the scale changed.
    pub fn zoom_at(&mut self, cursor: Pos2, steps: f32) -> bool {
        let new_scale = (self.scale * ZOOM_STEP.powf(steps)).clamp(MIN_ZOOM, MAX_ZOOM);
        if (new_scale - self.scale).abs() <= 1e-6 || self.scale == 0.0 {
            return false;
        }
        let ratio = new_scale / self.scale;
        self.origin = cursor - (cursor - self.origin) * ratio;
        self.scale = new_scale;
        true
    }
}

/// Distance from `p` to the segment `a`-`b`.
pub fn point_to_segment_dist(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let ap = p - a;
    let len2 = ab.dot(ab);
    if len2 == 0.0 {
        return ap.length();
    }
    let t = (ap.dot(ab) / len2).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p - closest).length()
}

/// Snap `target` onto the horizontal or vertical through `anchor`,
/// whichever axis carries the larger delta.
pub fn snap_to_axis(anchor: Pos2, target: Pos2) -> Pos2 {
    let d = target - anchor;
    if d.x.abs() > d.y.abs() {
        Pos2::new(target.x, anchor.y)
    } else {
        Pos2::new(anchor.x, target.y)
    }
}

/// Force the box spanned by `anchor` and `target` into a square, keeping
/// the direction of each axis.
pub fn constrain_square(anchor: Pos2, target: Pos2) -> Pos2 {
    let d = target - anchor;
    let size = d.x.abs().max(d.y.abs());
    let sx = if d.x >= 0.0 { size } else { -size };
    let sy = if d.y >= 0.0 { size } else { -size };
    anchor + Vec2::new(sx, sy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_and_original_are_inverse() {
        let view = Viewport::new(Pos2::new(300.0, 20.0), 0.5);
        let p = Pos2::new(123.0, 456.0);
        let back = view.to_original(view.to_screen(p));
        assert!((back - p).length() < 1e-4);
        assert_eq!(view.to_screen(p), Pos2::new(361.5, 248.0));
    }

    #[test]
    fn zero_scale_does_not_divide() {
        let origin = Pos2::new(10.0, 10.0);
        assert_eq!(to_original(Pos2::new(15.0, 20.0), origin, 0.0), Pos2::new(5.0, 10.0));
        let view = Viewport::new(origin, 0.0);
        assert_eq!(view.delta_to_original(Vec2::new(3.0, 4.0)), None);
    }

    #[test]
    fn fit_never_enlarges() {
        let area = Rect::from_min_size(Pos2::new(300.0, 0.0), Vec2::new(900.0, 800.0));
        let small = Viewport::fit(area, Vec2::new(100.0, 100.0));
        assert_eq!(small.scale, 1.0);
        assert_eq!(small.origin, Pos2::new(300.0, 0.0));
        let large = Viewport::fit(area, Vec2::new(1800.0, 800.0));
        assert!((large.scale - 0.5).abs() < 1e-6);
    }

    #[test]
    fn zoom_keeps_cursor_point_fixed() {
        let mut view = Viewport::new(Pos2::new(100.0, 50.0), 1.0);
        let cursor = Pos2::new(400.0, 300.0);
        let under_cursor = view.to_original(cursor);
        assert!(view.zoom_at(cursor, 3.0));
        let after = view.to_original(cursor);
        assert!((after - under_cursor).length() < 1e-3);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut view = Viewport::new(Pos2::ZERO, MAX_ZOOM);
        assert!(!view.zoom_at(Pos2::ZERO, 2.0));
        assert_eq!(view.scale, MAX_ZOOM);
        view.scale = MIN_ZOOM * 1.01;
        view.zoom_at(Pos2::ZERO, -5.0);
        assert_eq!(view.scale, MIN_ZOOM);
    }

    #[test]
    fn segment_distance() {
        let a = Pos2::new(0.0, 0.0);
        let b = Pos2::new(10.0, 0.0);
        assert_eq!(point_to_segment_dist(Pos2::new(5.0, 0.0), a, b), 0.0);
        assert_eq!(point_to_segment_dist(Pos2::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(point_to_segment_dist(Pos2::new(13.0, 4.0), a, b), 5.0);
        assert_eq!(point_to_segment_dist(Pos2::new(3.0, 4.0), a, a), 5.0);
    }

    #[test]
    fn axis_snap_picks_dominant_axis() {
        let anchor = Pos2::new(10.0, 10.0);
        assert_eq!(snap_to_axis(anchor, Pos2::new(50.0, 20.0)), Pos2::new(50.0, 10.0));
        assert_eq!(snap_to_axis(anchor, Pos2::new(12.0, -30.0)), Pos2::new(10.0, -30.0));
    }

    #[test]
    fn square_preserves_signs() {
        let anchor = Pos2::new(0.0, 0.0);
        assert_eq!(constrain_square(anchor, Pos2::new(-10.0, 4.0)), Pos2::new(-10.0, 10.0));
        assert_eq!(constrain_square(anchor, Pos2::new(3.0, -7.0)), Pos2::new(7.0, -7.0));
    }
}
