//! Painter helpers shared by the entity renderers and the canvas previews.

use egui::{Color32, Pos2, Stroke, Vec2};

pub const HIGHLIGHT: Color32 = Color32::from_rgb(255, 220, 80);
pub const PREVIEW: Color32 = Color32::from_rgb(255, 150, 50);
pub const LABEL_TEXT: Color32 = Color32::from_rgb(255, 220, 80);
pub const LABEL_SHADOW: Color32 = Color32::from_rgb(10, 10, 10);

/// Font size of a label at text scale 1.0.
pub const LABEL_BASE_SIZE: f32 = 14.0;
const LABEL_PADDING: f32 = 4.0;
const HANDLE_HALF: f32 = 4.0;

pub fn line(painter: &egui::Painter, a: Pos2, b: Pos2, width: f32, color: Color32) {
    painter.line_segment([a, b], Stroke::new(width.max(1.0), color));
}

/// Unit normal of `a`-`b`, pointing "up" for a degenerate segment.
pub fn normal(a: Pos2, b: Pos2) -> Vec2 {
    let d = b - a;
    let len = d.length();
    if len == 0.0 {
        Vec2::new(0.0, -1.0)
    } else {
        Vec2::new(-d.y / len, d.x / len)
    }
}

/// Filled arrowhead at `tip`, pointing away from `from`.
pub fn arrow_head(painter: &egui::Painter, from: Pos2, tip: Pos2, size: f32, color: Color32) {
    let d = tip - from;
    if d.length() == 0.0 {
        return;
    }
    let angle = d.y.atan2(d.x);
    let spread = std::f32::consts::PI / 6.0;
    let left = tip - Vec2::angled(angle - spread) * size;
    let right = tip - Vec2::angled(angle + spread) * size;
    painter.add(egui::Shape::convex_polygon(
        vec![tip, left, right],
        color,
        Stroke::NONE,
    ));
}

/// Short cap across the segment at `at`.
pub fn perp_cap(
    painter: &egui::Painter,
    at: Pos2,
    other: Pos2,
    length: f32,
    width: f32,
    color: Color32,
) {
    if at == other {
        return;
    }
    let n = normal(at, other) * (length / 2.0);
    line(painter, at + n, at - n, width, color);
}

pub fn handle(painter: &egui::Painter, center: Pos2, color: Color32) {
    let rect = egui::Rect::from_center_size(center, Vec2::splat(HANDLE_HALF * 2.0));
    painter.rect_filled(rect, 0.0, color);
}

fn label_galley(
    painter: &egui::Painter,
    text: &str,
    text_scale: f32,
    color: Color32,
) -> std::sync::Arc<egui::Galley> {
    let size = (LABEL_BASE_SIZE * text_scale).max(1.0);
    painter.layout_no_wrap(text.to_owned(), egui::FontId::monospace(size), color)
}

/// Shadowed label centred on `center`.
pub fn label_at(painter: &egui::Painter, center: Pos2, text: &str, text_scale: f32) {
    let shadow = label_galley(painter, text, text_scale, LABEL_SHADOW);
    let galley = label_galley(painter, text, text_scale, LABEL_TEXT);
    let top_left = center - galley.size() / 2.0;
    painter.galley(top_left + Vec2::splat(1.0), shadow, LABEL_SHADOW);
    painter.galley(top_left, galley, LABEL_TEXT);
}

/// Label beside the segment `a`-`b`, its nearest edge `gap` pixels off the line.
pub fn label_beside_line(
    painter: &egui::Painter,
    a: Pos2,
    b: Pos2,
    gap: f32,
    text: &str,
    text_scale: f32,
) {
    let height = label_galley(painter, text, text_scale, LABEL_TEXT).size().y;
    let mid = a + (b - a) / 2.0;
    let offset = gap + height / 2.0 + LABEL_PADDING;
    label_at(painter, mid + normal(a, b) * offset, text, text_scale);
}

/// Width label above the rectangle's top edge, height label left of its left edge.
pub fn rect_labels(
    painter: &egui::Painter,
    rect: egui::Rect,
    gap: f32,
    width_text: &str,
    height_text: &str,
    text_scale: f32,
) {
    let w_size = label_galley(painter, width_text, text_scale, LABEL_TEXT).size();
    let top = Pos2::new(
        rect.center().x,
        rect.min.y - (w_size.y / 2.0 + gap + LABEL_PADDING),
    );
    label_at(painter, top, width_text, text_scale);

    let h_size = label_galley(painter, height_text, text_scale, LABEL_TEXT).size();
    let left = Pos2::new(
        rect.min.x - (h_size.x / 2.0 + gap + LABEL_PADDING),
        rect.center().y,
    );
    label_at(painter, left, height_text, text_scale);
}
