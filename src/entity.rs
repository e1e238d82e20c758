//! Drawable entities: the scale line, measurement lines and rectangles.
//!
//! Geometry is kept in original-image pixels. Every screen-space operation
//! (drawing, hit-testing, handle lookup) converts through a [`Viewport`] at
//! call time.

use egui::{Color32, Pos2, Stroke, Vec2};
use serde::{Deserialize, Serialize};

use crate::draw;
use crate::geometry::{point_to_segment_dist, Viewport};

/// Default hit tolerance in screen pixels.
pub const HIT_TOLERANCE: f32 = 8.0;
pub const DEFAULT_WIDTH: u32 = 2;

pub const SCALE_COLOR: Rgb = Rgb::new(255, 100, 100);
pub const MEASURE_COLOR: Rgb = Rgb::new(0, 200, 200);
pub const RECT_COLOR: Rgb = Rgb::new(255, 200, 50);

// ── Primitives ──────────────────────────────────────────────────────────────

/// A point in original-image pixel space. Serialized as `[x, y]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn to_pos2(self) -> Pos2 {
        Pos2::new(self.x, self.y)
    }

    pub fn from_pos2(value: Pos2) -> Self {
        Self::new(value.x, value.y)
    }

    pub fn distance(self, other: Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn translated(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<Point> for [f32; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Display color, serialized as `[r, g, b]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_egui(self) -> Color32 {
        Color32::from_rgb(self.r, self.g, self.b)
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(c: Rgb) -> Self {
        [c.r, c.g, c.b]
    }
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

// ── Labels ──────────────────────────────────────────────────────────────────

pub fn format_meters(meters: f32) -> String {
    format!("{meters:.2} m")
}

pub fn format_pixels(pixels: f32) -> String {
    format!("{} px", pixels.round() as i64)
}

/// Real-world length when a scale is known, raw pixels otherwise.
pub fn length_label(pixels: f32, pixels_per_meter: Option<f32>) -> String {
    match pixels_per_meter.filter(|ppm| *ppm > 0.0) {
        Some(ppm) => format_meters(pixels / ppm),
        None => format_pixels(pixels),
    }
}

// ── Capability set ──────────────────────────────────────────────────────────

/// Everything an entity needs to render itself for one frame.
pub struct DrawContext<'a> {
    pub painter: &'a egui::Painter,
    pub view: Viewport,
    /// Label size multiplier (zoom times the user's label scale).
    pub text_scale: f32,
    pub pixels_per_meter: Option<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Line,
    Rect,
}

pub trait Drawable {
    fn shape(&self) -> ShapeKind;

    fn draw(&self, ctx: &DrawContext<'_>);

    /// Selection outline and handles. `moving` is set while the entity is
    /// being dragged as a whole.
    fn draw_highlight(&self, ctx: &DrawContext<'_>, moving: bool);

    fn hit_test(&self, screen: Pos2, view: &Viewport, tolerance: f32) -> bool;

    fn hit_test_handle(&self, screen: Pos2, view: &Viewport, tolerance: f32) -> Option<usize>;

    /// Translate by an original-space delta.
    fn move_by(&mut self, dx: f32, dy: f32);

    /// Move a single handle by an original-space delta.
    fn move_handle(&mut self, handle: usize, dx: f32, dy: f32);

    /// Current original-space position of `handle`.
    fn handle_point(&self, handle: usize) -> Option<Point>;

    /// The point that stays fixed while `handle` is dragged.
    fn anchor_point(&self, handle: usize) -> Option<Point>;

    fn width(&self) -> u32;

    fn set_width(&mut self, width: u32);
}

// ── Shared line behaviour ───────────────────────────────────────────────────

fn line_hit(p1: Point, p2: Point, screen: Pos2, view: &Viewport, tolerance: f32) -> bool {
    let a = view.to_screen(p1.to_pos2());
    let b = view.to_screen(p2.to_pos2());
    point_to_segment_dist(screen, a, b) <= tolerance
}

fn endpoint_handle(
    p1: Point,
    p2: Point,
    screen: Pos2,
    view: &Viewport,
    tolerance: f32,
) -> Option<usize> {
    [p1, p2]
        .iter()
        .position(|p| (view.to_screen(p.to_pos2()) - screen).length() <= tolerance)
}

fn endpoint(p1: Point, p2: Point, handle: usize) -> Option<Point> {
    match handle {
        0 => Some(p1),
        1 => Some(p2),
        _ => None,
    }
}

fn label_gap(width: u32) -> f32 {
    (width as f32 * 3.0).max(4.0)
}

fn draw_line_highlight(ctx: &DrawContext<'_>, p1: Point, p2: Point, width: u32) -> (Pos2, Pos2) {
    let a = ctx.view.to_screen(p1.to_pos2());
    let b = ctx.view.to_screen(p2.to_pos2());
    draw::line(ctx.painter, a, b, (width + 2).max(2) as f32, draw::HIGHLIGHT);
    (a, b)
}

// ── ScaleLine ───────────────────────────────────────────────────────────────

/// The reference line that defines pixels-per-meter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleLine {
    pub p1: Point,
    pub p2: Point,
    pub meters: f32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(skip, default = "ScaleLine::default_color")]
    pub color: Rgb,
}

impl ScaleLine {
    pub fn new(p1: Point, p2: Point, meters: f32, width: u32) -> Self {
        Self {
            p1,
            p2,
            meters,
            width,
            color: SCALE_COLOR,
        }
    }

    fn default_color() -> Rgb {
        SCALE_COLOR
    }

    pub fn length_px(&self) -> f32 {
        self.p1.distance(self.p2)
    }

    /// `None` unless both the real-world length and the pixel length are positive.
    pub fn pixels_per_meter(&self) -> Option<f32> {
        if self.meters <= 0.0 || !self.meters.is_finite() {
            return None;
        }
        let ppm = self.length_px() / self.meters;
        (ppm > 0.0).then_some(ppm)
    }
}

impl Drawable for ScaleLine {
    fn shape(&self) -> ShapeKind {
        ShapeKind::Line
    }

    fn draw(&self, ctx: &DrawContext<'_>) {
        let a = ctx.view.to_screen(self.p1.to_pos2());
        let b = ctx.view.to_screen(self.p2.to_pos2());
        let w = self.width as f32;
        let color = self.color.to_egui();
        draw::line(ctx.painter, a, b, w, color);
        draw::perp_cap(ctx.painter, a, b, 12.0, w, color);
        draw::perp_cap(ctx.painter, b, a, 12.0, w, color);
        draw::label_beside_line(
            ctx.painter,
            a,
            b,
            label_gap(self.width),
            &format_meters(self.meters),
            ctx.text_scale,
        );
    }

    fn draw_highlight(&self, ctx: &DrawContext<'_>, moving: bool) {
        let (a, b) = draw_line_highlight(ctx, self.p1, self.p2, self.width);
        if moving {
            let w = self.width.max(1) as f32;
            draw::perp_cap(ctx.painter, a, b, 12.0, w, draw::HIGHLIGHT);
            draw::perp_cap(ctx.painter, b, a, 12.0, w, draw::HIGHLIGHT);
        } else {
            draw::handle(ctx.painter, a, draw::HIGHLIGHT);
            draw::handle(ctx.painter, b, draw::HIGHLIGHT);
        }
    }

    fn hit_test(&self, screen: Pos2, view: &Viewport, tolerance: f32) -> bool {
        line_hit(self.p1, self.p2, screen, view, tolerance)
    }

    fn hit_test_handle(&self, screen: Pos2, view: &Viewport, tolerance: f32) -> Option<usize> {
        endpoint_handle(self.p1, self.p2, screen, view, tolerance)
    }

    fn move_by(&mut self, dx: f32, dy: f32) {
        self.p1 = self.p1.translated(dx, dy);
        self.p2 = self.p2.translated(dx, dy);
    }

    fn move_handle(&mut self, handle: usize, dx: f32, dy: f32) {
        match handle {
            0 => self.p1 = self.p1.translated(dx, dy),
            1 => self.p2 = self.p2.translated(dx, dy),
            _ => {}
        }
    }

    fn handle_point(&self, handle: usize) -> Option<Point> {
        endpoint(self.p1, self.p2, handle)
    }

    fn anchor_point(&self, handle: usize) -> Option<Point> {
        endpoint(self.p1, self.p2, 1usize.checked_sub(handle)?)
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn set_width(&mut self, width: u32) {
        self.width = width;
    }
}

// ── MeasureLine ─────────────────────────────────────────────────────────────

/// A distance annotation with arrowheads at both ends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasureLine {
    pub p1: Point,
    pub p2: Point,
    /// Real-world length recorded at creation; `None` when no scale existed.
    #[serde(default)]
    pub meters: Option<f32>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(skip, default = "MeasureLine::default_color")]
    pub color: Rgb,
}

impl MeasureLine {
    pub fn new(p1: Point, p2: Point, meters: Option<f32>, width: u32) -> Self {
        Self {
            p1,
            p2,
            meters,
            width,
            color: MEASURE_COLOR,
        }
    }

    fn default_color() -> Rgb {
        MEASURE_COLOR
    }

    pub fn length_px(&self) -> f32 {
        self.p1.distance(self.p2)
    }

    /// Live scale wins, then the length recorded at creation, then pixels.
    pub fn label(&self, pixels_per_meter: Option<f32>) -> String {
        match (pixels_per_meter.filter(|ppm| *ppm > 0.0), self.meters) {
            (Some(ppm), _) => format_meters(self.length_px() / ppm),
            (None, Some(meters)) => format_meters(meters),
            (None, None) => format_pixels(self.length_px()),
        }
    }
}

impl Drawable for MeasureLine {
    fn shape(&self) -> ShapeKind {
        ShapeKind::Line
    }

    fn draw(&self, ctx: &DrawContext<'_>) {
        let a = ctx.view.to_screen(self.p1.to_pos2());
        let b = ctx.view.to_screen(self.p2.to_pos2());
        let color = self.color.to_egui();
        let arrow = (self.width as f32 * 3.0).max(6.0);
        draw::line(ctx.painter, a, b, self.width as f32, color);
        draw::arrow_head(ctx.painter, b, a, arrow, color);
        draw::arrow_head(ctx.painter, a, b, arrow, color);
        draw::label_beside_line(
            ctx.painter,
            a,
            b,
            label_gap(self.width),
            &self.label(ctx.pixels_per_meter),
            ctx.text_scale,
        );
    }

    fn draw_highlight(&self, ctx: &DrawContext<'_>, moving: bool) {
        let (a, b) = draw_line_highlight(ctx, self.p1, self.p2, self.width);
        if moving {
            let arrow = (self.width as f32 * 3.0).max(6.0);
            draw::arrow_head(ctx.painter, b, a, arrow, draw::HIGHLIGHT);
            draw::arrow_head(ctx.painter, a, b, arrow, draw::HIGHLIGHT);
        } else {
            draw::handle(ctx.painter, a, draw::HIGHLIGHT);
            draw::handle(ctx.painter, b, draw::HIGHLIGHT);
        }
    }

    fn hit_test(&self, screen: Pos2, view: &Viewport, tolerance: f32) -> bool {
        line_hit(self.p1, self.p2, screen, view, tolerance)
    }

    fn hit_test_handle(&self, screen: Pos2, view: &Viewport, tolerance: f32) -> Option<usize> {
        endpoint_handle(self.p1, self.p2, screen, view, tolerance)
    }

    fn move_by(&mut self, dx: f32, dy: f32) {
        self.p1 = self.p1.translated(dx, dy);
        self.p2 = self.p2.translated(dx, dy);
    }

    fn move_handle(&mut self, handle: usize, dx: f32, dy: f32) {
        match handle {
            0 => self.p1 = self.p1.translated(dx, dy),
            1 => self.p2 = self.p2.translated(dx, dy),
            _ => {}
        }
    }

    fn handle_point(&self, handle: usize) -> Option<Point> {
        endpoint(self.p1, self.p2, handle)
    }

    fn anchor_point(&self, handle: usize) -> Option<Point> {
        endpoint(self.p1, self.p2, 1usize.checked_sub(handle)?)
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn set_width(&mut self, width: u32) {
        self.width = width;
    }
}

// ── Rectangle ───────────────────────────────────────────────────────────────

/// An axis-aligned area annotation.
///
/// Corners are always stored canonically: `p1` holds the minimum x/y and
/// `p2` the maximum, so handle indices (0 top-left, 1 top-right,
/// 2 bottom-left, 3 bottom-right) never depend on how the rectangle was drawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RectangleFields")]
pub struct Rectangle {
    p1: Point,
    p2: Point,
    color: Rgb,
    width: u32,
}

#[derive(Deserialize)]
struct RectangleFields {
    #[serde(default)]
    p1: Point,
    #[serde(default)]
    p2: Point,
    #[serde(default = "Rectangle::default_color")]
    color: Rgb,
    #[serde(default = "default_width")]
    width: u32,
}

impl From<RectangleFields> for Rectangle {
    fn from(f: RectangleFields) -> Self {
        Rectangle::new(f.p1, f.p2, f.color, f.width)
    }
}

impl Rectangle {
    /// Build from any two opposite corners.
    pub fn new(a: Point, b: Point, color: Rgb, width: u32) -> Self {
        let mut rect = Self {
            p1: a,
            p2: b,
            color,
            width,
        };
        rect.set_bounds(a.x, a.y, b.x, b.y);
        rect
    }

    fn default_color() -> Rgb {
        RECT_COLOR
    }

    fn set_bounds(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.p1 = Point::new(x1.min(x2), y1.min(y2));
        self.p2 = Point::new(x1.max(x2), y1.max(y2));
    }

    /// Top-left corner.
    pub fn p1(&self) -> Point {
        self.p1
    }

    /// Bottom-right corner.
    pub fn p2(&self) -> Point {
        self.p2
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.p2.x - self.p1.x, self.p2.y - self.p1.y)
    }

    pub fn corner(&self, index: usize) -> Option<Point> {
        let (min, max) = (self.p1, self.p2);
        match index {
            0 => Some(Point::new(min.x, min.y)),
            1 => Some(Point::new(max.x, min.y)),
            2 => Some(Point::new(min.x, max.y)),
            3 => Some(Point::new(max.x, max.y)),
            _ => None,
        }
    }

    /// Index of the corner that lies on `target`'s side of `anchor`.
    pub fn corner_toward(anchor: Point, target: Point) -> usize {
        let right = target.x >= anchor.x;
        let bottom = target.y >= anchor.y;
        usize::from(right) | (usize::from(bottom) << 1)
    }

    pub fn labels(&self, pixels_per_meter: Option<f32>) -> (String, String) {
        let size = self.size();
        (
            length_label(size.x, pixels_per_meter),
            length_label(size.y, pixels_per_meter),
        )
    }

    fn screen_rect(&self, view: &Viewport) -> egui::Rect {
        egui::Rect::from_two_pos(
            view.to_screen(self.p1.to_pos2()),
            view.to_screen(self.p2.to_pos2()),
        )
    }
}

impl Drawable for Rectangle {
    fn shape(&self) -> ShapeKind {
        ShapeKind::Rect
    }

    fn draw(&self, ctx: &DrawContext<'_>) {
        let rect = self.screen_rect(&ctx.view);
        ctx.painter.rect_stroke(
            rect,
            0.0,
            Stroke::new(self.width.max(1) as f32, self.color.to_egui()),
            egui::StrokeKind::Middle,
        );
        let (w, h) = self.labels(ctx.pixels_per_meter);
        draw::rect_labels(ctx.painter, rect, label_gap(self.width), &w, &h, ctx.text_scale);
    }

    fn draw_highlight(&self, ctx: &DrawContext<'_>, _moving: bool) {
        let rect = self.screen_rect(&ctx.view);
        ctx.painter.rect_stroke(
            rect,
            0.0,
            Stroke::new((self.width + 1).max(2) as f32, draw::HIGHLIGHT),
            egui::StrokeKind::Middle,
        );
        for corner in [
            rect.left_top(),
            rect.right_top(),
            rect.left_bottom(),
            rect.right_bottom(),
        ] {
            draw::handle(ctx.painter, corner, draw::HIGHLIGHT);
        }
    }

    fn hit_test(&self, screen: Pos2, view: &Viewport, tolerance: f32) -> bool {
        self.screen_rect(view).expand(tolerance).contains(screen)
    }

    fn hit_test_handle(&self, screen: Pos2, view: &Viewport, tolerance: f32) -> Option<usize> {
        (0..4).find(|&i| {
            self.corner(i)
                .map(|c| (view.to_screen(c.to_pos2()) - screen).length() <= tolerance)
                .unwrap_or(false)
        })
    }

    fn move_by(&mut self, dx: f32, dy: f32) {
        self.p1 = self.p1.translated(dx, dy);
        self.p2 = self.p2.translated(dx, dy);
    }

    fn move_handle(&mut self, handle: usize, dx: f32, dy: f32) {
        if handle > 3 {
            return;
        }
        let (mut xmin, mut ymin) = (self.p1.x, self.p1.y);
        let (mut xmax, mut ymax) = (self.p2.x, self.p2.y);
        if handle & 1 == 0 {
            xmin += dx;
        } else {
            xmax += dx;
        }
        if handle & 2 == 0 {
            ymin += dy;
        } else {
            ymax += dy;
        }
        self.set_bounds(xmin, ymin, xmax, ymax);
    }

    fn handle_point(&self, handle: usize) -> Option<Point> {
        self.corner(handle)
    }

    fn anchor_point(&self, handle: usize) -> Option<Point> {
        self.corner(3usize.checked_sub(handle)?)
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn set_width(&mut self, width: u32) {
        self.width = width;
    }
}

// ── Variants ────────────────────────────────────────────────────────────────

/// Entities that live in the ordered object list (everything but the scale).
#[derive(Clone, Debug, PartialEq)]
pub enum Annotation {
    Measure(MeasureLine),
    Rect(Rectangle),
}

impl Annotation {
    pub fn as_drawable(&self) -> &dyn Drawable {
        match self {
            Annotation::Measure(m) => m,
            Annotation::Rect(r) => r,
        }
    }

    pub fn as_drawable_mut(&mut self) -> &mut dyn Drawable {
        match self {
            Annotation::Measure(m) => m,
            Annotation::Rect(r) => r,
        }
    }
}

impl From<MeasureLine> for Annotation {
    fn from(m: MeasureLine) -> Self {
        Annotation::Measure(m)
    }
}

impl From<Rectangle> for Annotation {
    fn from(r: Rectangle) -> Self {
        Annotation::Rect(r)
    }
}

/// One record of the project file's `objects` array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Entity {
    #[serde(rename = "scale")]
    Scale(ScaleLine),
    #[serde(rename = "measure")]
    Measure(MeasureLine),
    #[serde(rename = "rect")]
    Rect(Rectangle),
}

impl Entity {
    pub fn to_json(&self) -> serde_json::Value {
        // Every field is a plain number, array or null, so this cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Fails on an unknown `type` or a malformed field.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

impl From<Annotation> for Entity {
    fn from(a: Annotation) -> Self {
        match a {
            Annotation::Measure(m) => Entity::Measure(m),
            Annotation::Rect(r) => Entity::Rect(r),
        }
    }
}
