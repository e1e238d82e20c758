//! Interaction controller: turns pointer and command input into scene edits.
//!
//! Gestures are explicit begin/update/end state carried between events. A
//! history snapshot is recorded once per gesture, right before its first
//! mutation.

use egui::{Pos2, Rect, Vec2};

use crate::config::{Config, LABEL_SCALE_RANGE, LINE_WIDTH_RANGE};
use crate::entity::{Drawable, MeasureLine, Point, Rectangle, ScaleLine, ShapeKind, RECT_COLOR};
use crate::geometry::{constrain_square, snap_to_axis, Viewport};
use crate::grid::{self, GridLines};
use crate::history::History;
use crate::scene::{Scene, Selection};

/// Draw gestures shorter than this (screen pixels) are discarded.
pub const MIN_DRAG_PX: f32 = 5.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    SettingScale,
    AddMeasurement,
    AddRectangle,
}

impl Mode {
    pub fn is_drawing(self) -> bool {
        self != Mode::Normal
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Normal => "Normal",
            Mode::SettingScale => "Adding scale",
            Mode::AddMeasurement => "Adding line",
            Mode::AddRectangle => "Adding rectangle",
        }
    }
}

/// Commands the shell can issue independently of pointer input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    BeginSetScale,
    BeginMeasurement,
    BeginRectangle,
    Cancel,
    ToggleGrid,
    SetGridSpacingCm(f32),
    DeleteSelection,
    ResetScale,
    Undo,
    Redo,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Gesture {
    Idle,
    Drawing { start: Pos2, current: Pos2 },
    Moving { last: Pos2, recorded: bool },
    Resizing { handle: usize, anchor: Point, recorded: bool },
    Panning { start: Pos2, origin_start: Pos2 },
    GridDrag { start: Pos2, offset_start: Vec2 },
}

/// A drawn scale line waiting for its real-world length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingScale {
    pub p1: Point,
    pub p2: Point,
}

/// In-progress draw gesture, in screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Draft {
    pub mode: Mode,
    pub start: Pos2,
    pub end: Pos2,
}

pub struct Editor {
    scene: Scene,
    history: History<Scene>,
    mode: Mode,
    selection: Option<Selection>,
    gesture: Gesture,
    view: Viewport,
    canvas: Rect,
    image_size: Option<Vec2>,
    user_zoomed: bool,
    pending_scale: Option<PendingScale>,
    line_width: u32,
    label_scale: f32,
    grid_visible: bool,
    grid_spacing_m: f32,
    grid_offset: Vec2,
    tolerance: f32,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Editor {
    pub fn new(config: &Config) -> Self {
        Self {
            scene: Scene::new(),
            history: History::new(config.undo_limit),
            mode: Mode::Normal,
            selection: None,
            gesture: Gesture::Idle,
            view: Viewport::default(),
            canvas: Rect::NOTHING,
            image_size: None,
            user_zoomed: false,
            pending_scale: None,
            line_width: config.line_width,
            label_scale: config.label_scale,
            grid_visible: config.grid_visible,
            grid_spacing_m: config.grid_spacing_m,
            grid_offset: Vec2::ZERO,
            tolerance: config.hit_tolerance,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn history(&self) -> &History<Scene> {
        &self.history
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn view(&self) -> Viewport {
        self.view
    }

    pub fn image_size(&self) -> Option<Vec2> {
        self.image_size
    }

    pub fn has_image(&self) -> bool {
        self.image_size.is_some()
    }

    pub fn image_rect(&self) -> Option<Rect> {
        self.image_size.map(|size| self.view.image_rect(size))
    }

    pub fn pending_scale(&self) -> Option<PendingScale> {
        self.pending_scale
    }

    pub fn line_width(&self) -> u32 {
        self.line_width
    }

    pub fn label_scale(&self) -> f32 {
        self.label_scale
    }

    /// Label size multiplier for the current zoom.
    pub fn text_scale(&self) -> f32 {
        self.view.scale * self.label_scale
    }

    pub fn grid_visible(&self) -> bool {
        self.grid_visible
    }

    pub fn grid_spacing_m(&self) -> f32 {
        self.grid_spacing_m
    }

    /// Whether the selected entity is being dragged as a whole.
    pub fn is_moving(&self) -> bool {
        matches!(self.gesture, Gesture::Moving { .. })
    }

    /// No image, no scale and no objects.
    pub fn is_blank(&self) -> bool {
        !self.has_image() && self.scene.is_empty()
    }

    pub fn draft(&self) -> Option<Draft> {
        match self.gesture {
            Gesture::Drawing { start, current } if self.mode.is_drawing() => Some(Draft {
                mode: self.mode,
                start,
                end: current,
            }),
            _ => None,
        }
    }

    pub fn grid_lines(&self) -> Option<GridLines> {
        if !self.grid_visible {
            return None;
        }
        let ppm = self.scene.pixels_per_meter()?;
        let rect = self.image_rect()?;
        let spacing = grid::spacing_px(ppm, self.view.scale, self.grid_spacing_m);
        grid::grid_lines(rect, spacing, self.grid_offset)
    }

    // ── Document lifecycle ──────────────────────────────────────────────────

    /// A new background image of `size` original pixels; the scene is kept.
    pub fn set_image(&mut self, size: Vec2) {
        self.image_size = Some(size);
        self.user_zoomed = false;
        self.fit_view();
    }

    pub fn clear_image(&mut self) {
        self.image_size = None;
        self.reset_interaction();
    }

    /// Swap in a loaded scene; history and selection start fresh.
    pub fn replace_scene(&mut self, scene: Scene) {
        self.scene = scene;
        self.history.clear();
        self.reset_interaction();
    }

    fn reset_interaction(&mut self) {
        self.selection = None;
        self.gesture = Gesture::Idle;
        self.mode = Mode::Normal;
        self.pending_scale = None;
    }

    /// The drawing area changed. Re-fits the image until the user zooms.
    pub fn set_canvas(&mut self, canvas: Rect) {
        if canvas == self.canvas {
            return;
        }
        self.canvas = canvas;
        if !self.user_zoomed {
            self.fit_view();
        }
    }

    fn fit_view(&mut self) {
        if let Some(size) = self.image_size {
            if self.canvas.is_positive() {
                self.view = Viewport::fit(self.canvas, size);
            }
        }
    }

    pub fn set_line_width(&mut self, width: u32) {
        let width = width.clamp(*LINE_WIDTH_RANGE.start(), *LINE_WIDTH_RANGE.end());
        if width != self.line_width {
            self.line_width = width;
            self.scene.set_line_width(width);
        }
    }

    pub fn set_label_scale(&mut self, scale: f32) {
        self.label_scale = scale.clamp(*LABEL_SCALE_RANGE.start(), *LABEL_SCALE_RANGE.end());
    }

    // ── Commands ────────────────────────────────────────────────────────────

    pub fn command(&mut self, command: Command) {
        match command {
            Command::BeginSetScale => self.begin_mode(Mode::SettingScale),
            Command::BeginMeasurement => self.begin_mode(Mode::AddMeasurement),
            Command::BeginRectangle => self.begin_mode(Mode::AddRectangle),
            Command::Cancel => self.cancel(),
            Command::ToggleGrid => self.grid_visible = !self.grid_visible,
            Command::SetGridSpacingCm(cm) => {
                if cm.is_finite() && cm > 0.0 {
                    self.grid_spacing_m = cm / 100.0;
                }
            }
            Command::DeleteSelection => self.delete_selection(),
            Command::ResetScale => self.reset_scale(),
            Command::Undo => self.undo(),
            Command::Redo => self.redo(),
        }
    }

    fn begin_mode(&mut self, mode: Mode) {
        if !self.has_image() || self.pending_scale.is_some() {
            return;
        }
        self.mode = mode;
        self.gesture = Gesture::Idle;
    }

    /// Abandon the current draw mode and any uncommitted draft.
    pub fn cancel(&mut self) {
        if self.mode.is_drawing() {
            self.mode = Mode::Normal;
            self.gesture = Gesture::Idle;
        }
        self.pending_scale = None;
    }

    pub fn delete_selection(&mut self) {
        let Some(selection) = self.selection.take() else {
            return;
        };
        if self.scene.get(selection).is_some() {
            self.history.push(&self.scene);
            self.scene.remove(selection);
        }
        self.gesture = Gesture::Idle;
    }

    pub fn reset_scale(&mut self) {
        if self.scene.scale().is_none() {
            return;
        }
        self.history.push(&self.scene);
        self.scene.clear_scale();
        if self.selection == Some(Selection::Scale) {
            self.selection = None;
        }
    }

    pub fn undo(&mut self) {
        if self.history.undo(&mut self.scene) {
            self.selection = None;
            self.gesture = Gesture::Idle;
        }
    }

    pub fn redo(&mut self) {
        if self.history.redo(&mut self.scene) {
            self.selection = None;
            self.gesture = Gesture::Idle;
        }
    }

    /// Resolve the scale prompt. Anything but a positive finite length
    /// discards the drawn line.
    pub fn confirm_scale(&mut self, meters: Option<f32>) -> bool {
        let Some(pending) = self.pending_scale.take() else {
            return false;
        };
        self.mode = Mode::Normal;
        let Some(meters) = meters.filter(|m| m.is_finite() && *m > 0.0) else {
            log::debug!("Scale prompt declined");
            return false;
        };
        let scale = ScaleLine::new(pending.p1, pending.p2, meters, self.line_width);
        if scale.pixels_per_meter().is_none() {
            return false;
        }
        self.history.push(&self.scene);
        if self.selection == Some(Selection::Scale) {
            self.selection = None;
        }
        self.scene.set_scale(scale);
        true
    }

    // ── Pointer input ───────────────────────────────────────────────────────

    fn accepts_press(&self, pos: Pos2) -> bool {
        self.pending_scale.is_none()
            && self
                .image_rect()
                .is_some_and(|rect| rect.expand(1.0).contains(pos))
    }

    /// Primary button pressed at `pos`.
    pub fn pointer_down(&mut self, pos: Pos2) {
        if !self.accepts_press(pos) {
            return;
        }
        if self.mode.is_drawing() {
            self.gesture = Gesture::Drawing {
                start: pos,
                current: pos,
            };
            return;
        }

        let Some(hit) = self.scene.hit_test(pos, &self.view, self.tolerance) else {
            self.selection = None;
            self.gesture = Gesture::Panning {
                start: pos,
                origin_start: self.view.origin,
            };
            return;
        };
        self.selection = Some(hit);
        let Some(entity) = self.scene.get(hit) else {
            return;
        };
        let handle = entity.hit_test_handle(pos, &self.view, self.tolerance);
        self.gesture = match handle.and_then(|h| Some((h, entity.anchor_point(h)?))) {
            Some((handle, anchor)) => Gesture::Resizing {
                handle,
                anchor,
                recorded: false,
            },
            None => Gesture::Moving {
                last: pos,
                recorded: false,
            },
        };
    }

    /// Pointer moved to `pos`; `constrain` is the snap/square modifier.
    pub fn pointer_move(&mut self, pos: Pos2, constrain: bool) {
        match self.gesture {
            Gesture::Idle => {}
            Gesture::Drawing { start, .. } => {
                self.gesture = Gesture::Drawing {
                    start,
                    current: self.constrained_end(start, pos, constrain),
                };
            }
            Gesture::Moving { last, recorded } => {
                let recorded = self.move_selected(pos - last, recorded);
                self.gesture = Gesture::Moving {
                    last: pos,
                    recorded,
                };
            }
            Gesture::Resizing {
                handle,
                anchor,
                recorded,
            } => {
                let (handle, recorded) = self.resize_selected(handle, anchor, pos, constrain, recorded);
                self.gesture = Gesture::Resizing {
                    handle,
                    anchor,
                    recorded,
                };
            }
            Gesture::Panning {
                start,
                origin_start,
            } => {
                self.view.origin = origin_start + (pos - start);
            }
            Gesture::GridDrag {
                start,
                offset_start,
            } => {
                self.grid_offset = offset_start + (pos - start);
            }
        }
    }

    /// Primary button released at `pos`. Commits a draw gesture.
    pub fn pointer_up(&mut self, pos: Pos2, constrain: bool) {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        if let Gesture::Drawing { start, .. } = gesture {
            let end = self.constrained_end(start, pos, constrain);
            self.commit_draft(start, end);
        }
    }

    /// Secondary click clears the selection.
    pub fn secondary_click(&mut self, pos: Pos2) {
        if self.mode == Mode::Normal && self.accepts_press(pos) {
            self.selection = None;
        }
    }

    pub fn grid_drag_begin(&mut self, pos: Pos2) {
        if self.has_image() && self.grid_visible && self.gesture == Gesture::Idle {
            self.gesture = Gesture::GridDrag {
                start: pos,
                offset_start: self.grid_offset,
            };
        }
    }

    pub fn grid_drag_end(&mut self) {
        if matches!(self.gesture, Gesture::GridDrag { .. }) {
            self.gesture = Gesture::Idle;
        }
    }

    /// Wheel zoom around `cursor`. Ignored while drawing.
    pub fn zoom(&mut self, cursor: Pos2, steps: f32) {
        if !self.has_image() || matches!(self.gesture, Gesture::Drawing { .. }) {
            return;
        }
        if self.view.zoom_at(cursor, steps) {
            self.user_zoomed = true;
        }
    }

    // ── Gesture helpers ─────────────────────────────────────────────────────

    fn constrained_end(&self, start: Pos2, pos: Pos2, constrain: bool) -> Pos2 {
        match (constrain, self.mode) {
            (false, _) => pos,
            (true, Mode::AddRectangle) => constrain_square(start, pos),
            (true, _) => snap_to_axis(start, pos),
        }
    }

    fn record_once(&mut self, recorded: bool) -> bool {
        if !recorded {
            self.history.push(&self.scene);
        }
        true
    }

    fn move_selected(&mut self, screen_delta: Vec2, recorded: bool) -> bool {
        let Some(selection) = self.selection else {
            return recorded;
        };
        let Some(delta) = self.view.delta_to_original(screen_delta) else {
            return recorded;
        };
        if delta == Vec2::ZERO || self.scene.get(selection).is_none() {
            return recorded;
        }
        let recorded = self.record_once(recorded);
        if let Some(entity) = self.scene.get_mut(selection) {
            entity.move_by(delta.x, delta.y);
        }
        recorded
    }

    fn resize_selected(
        &mut self,
        handle: usize,
        anchor: Point,
        pos: Pos2,
        constrain: bool,
        recorded: bool,
    ) -> (usize, bool) {
        let Some(selection) = self.selection else {
            return (handle, recorded);
        };
        if self.view.scale == 0.0 {
            return (handle, recorded);
        }
        let Some(entity) = self.scene.get(selection) else {
            return (handle, recorded);
        };
        let shape = entity.shape();
        let Some(current) = entity.handle_point(handle) else {
            return (handle, recorded);
        };

        let anchor_screen = self.view.to_screen(anchor.to_pos2());
        let target_screen = match (constrain, shape) {
            (false, _) => pos,
            (true, ShapeKind::Line) => snap_to_axis(anchor_screen, pos),
            (true, ShapeKind::Rect) => constrain_square(anchor_screen, pos),
        };
        let target = Point::from_pos2(self.view.to_original(target_screen));
        let (dx, dy) = (target.x - current.x, target.y - current.y);
        if dx == 0.0 && dy == 0.0 {
            return (handle, recorded);
        }

        let recorded = self.record_once(recorded);
        if let Some(entity) = self.scene.get_mut(selection) {
            entity.move_handle(handle, dx, dy);
        }
        // A rectangle corner dragged across its anchor becomes a different corner.
        let handle = match shape {
            ShapeKind::Rect => Rectangle::corner_toward(anchor, target),
            ShapeKind::Line => handle,
        };
        (handle, recorded)
    }

    fn commit_draft(&mut self, start: Pos2, end: Pos2) {
        let mode = self.mode;
        if !mode.is_drawing() {
            return;
        }
        let valid = (end - start).length() >= MIN_DRAG_PX
            && self.image_rect().is_some_and(|rect| rect.contains(end));
        if !valid {
            self.mode = Mode::Normal;
            return;
        }

        let p1 = Point::from_pos2(self.view.to_original(start));
        let p2 = Point::from_pos2(self.view.to_original(end));
        match mode {
            Mode::SettingScale => {
                // Stays in scale mode until the length prompt is answered.
                self.pending_scale = Some(PendingScale { p1, p2 });
                return;
            }
            Mode::AddMeasurement => {
                let meters = self
                    .scene
                    .pixels_per_meter()
                    .map(|ppm| (p1.distance(p2) / ppm * 100.0).round() / 100.0);
                self.history.push(&self.scene);
                self.scene.push(MeasureLine::new(p1, p2, meters, self.line_width));
            }
            Mode::AddRectangle => {
                self.history.push(&self.scene);
                self.scene
                    .push(Rectangle::new(p1, p2, RECT_COLOR, self.line_width));
            }
            Mode::Normal => {}
        }
        self.mode = Mode::Normal;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Annotation;

    /// 1000x1000 image drawn at 1:1 with its origin at the canvas corner.
    fn editor() -> Editor {
        let mut editor = Editor::default();
        editor.set_canvas(Rect::from_min_size(Pos2::ZERO, Vec2::splat(1000.0)));
        editor.set_image(Vec2::splat(1000.0));
        editor
    }

    fn drag(editor: &mut Editor, from: Pos2, to: Pos2, constrain: bool) {
        editor.pointer_down(from);
        editor.pointer_move(to, constrain);
        editor.pointer_up(to, constrain);
    }

    fn add_rect(editor: &mut Editor, from: Pos2, to: Pos2) {
        editor.command(Command::BeginRectangle);
        drag(editor, from, to, false);
    }

    fn set_scale(editor: &mut Editor, meters: f32) {
        editor.command(Command::BeginSetScale);
        drag(editor, Pos2::new(0.0, 500.0), Pos2::new(100.0, 500.0), false);
        assert!(editor.confirm_scale(Some(meters)));
    }

    #[test]
    fn modes_require_an_image() {
        let mut editor = Editor::default();
        editor.command(Command::BeginMeasurement);
        assert_eq!(editor.mode(), Mode::Normal);

        let mut editor = self::editor();
        editor.command(Command::BeginMeasurement);
        assert_eq!(editor.mode(), Mode::AddMeasurement);
        editor.command(Command::Cancel);
        assert_eq!(editor.mode(), Mode::Normal);
    }

    #[test]
    fn scale_prompt_commits_or_discards() {
        let mut editor = editor();
        editor.command(Command::BeginSetScale);
        drag(&mut editor, Pos2::new(0.0, 0.0), Pos2::new(100.0, 0.0), false);
        assert!(editor.pending_scale().is_some());
        assert!(editor.scene().scale().is_none());

        assert!(!editor.confirm_scale(Some(-2.0)));
        assert!(editor.scene().scale().is_none());
        assert_eq!(editor.mode(), Mode::Normal);
        assert!(!editor.history().can_undo());

        set_scale(&mut editor, 2.0);
        assert_eq!(editor.scene().pixels_per_meter(), Some(50.0));
        assert_eq!(editor.mode(), Mode::Normal);
    }

    #[test]
    fn pointer_input_is_ignored_while_prompt_is_open() {
        let mut editor = editor();
        editor.command(Command::BeginSetScale);
        drag(&mut editor, Pos2::new(0.0, 0.0), Pos2::new(100.0, 0.0), false);
        editor.pointer_down(Pos2::new(300.0, 300.0));
        assert!(editor.draft().is_none());
        editor.command(Command::BeginRectangle);
        assert_eq!(editor.mode(), Mode::SettingScale);
    }

    #[test]
    fn measurement_uses_current_scale() {
        let mut editor = editor();
        set_scale(&mut editor, 2.0);
        editor.command(Command::BeginMeasurement);
        drag(&mut editor, Pos2::new(100.0, 100.0), Pos2::new(300.0, 100.0), false);

        let Annotation::Measure(line) = &editor.scene().objects()[0] else {
            panic!("expected a measurement");
        };
        assert_eq!(line.meters, Some(4.0));
        assert_eq!(line.label(editor.scene().pixels_per_meter()), "4.00 m");
        assert_eq!(editor.mode(), Mode::Normal);
    }

    #[test]
    fn unscaled_measurement_has_no_meters() {
        let mut editor = editor();
        editor.command(Command::BeginMeasurement);
        drag(&mut editor, Pos2::new(100.0, 100.0), Pos2::new(300.0, 100.0), false);
        let Annotation::Measure(line) = &editor.scene().objects()[0] else {
            panic!("expected a measurement");
        };
        assert_eq!(line.meters, None);
    }

    #[test]
    fn constrained_line_snaps_to_dominant_axis() {
        let mut editor = editor();
        editor.command(Command::BeginMeasurement);
        drag(&mut editor, Pos2::new(100.0, 100.0), Pos2::new(300.0, 130.0), true);
        let Annotation::Measure(line) = &editor.scene().objects()[0] else {
            panic!("expected a measurement");
        };
        assert_eq!(line.p2, Point::new(300.0, 100.0));
    }

    #[test]
    fn constrained_rectangle_is_square() {
        let mut editor = editor();
        editor.command(Command::BeginRectangle);
        drag(&mut editor, Pos2::new(200.0, 200.0), Pos2::new(150.0, 280.0), true);
        let Annotation::Rect(rect) = &editor.scene().objects()[0] else {
            panic!("expected a rectangle");
        };
        assert_eq!(rect.p1(), Point::new(120.0, 200.0));
        assert_eq!(rect.p2(), Point::new(200.0, 280.0));
    }

    #[test]
    fn short_or_outside_drafts_are_discarded() {
        let mut editor = editor();
        add_rect(&mut editor, Pos2::new(10.0, 10.0), Pos2::new(12.0, 12.0));
        assert!(editor.scene().is_empty());
        assert_eq!(editor.mode(), Mode::Normal);

        add_rect(&mut editor, Pos2::new(10.0, 10.0), Pos2::new(1200.0, 50.0));
        assert!(editor.scene().is_empty());
        assert!(!editor.history().can_undo());
    }

    #[test]
    fn undo_all_creations_then_noop() {
        let mut editor = editor();
        for i in 0..5 {
            let x = 10.0 + i as f32 * 100.0;
            add_rect(&mut editor, Pos2::new(x, 10.0), Pos2::new(x + 50.0, 60.0));
        }
        assert_eq!(editor.scene().objects().len(), 5);
        for _ in 0..5 {
            editor.command(Command::Undo);
        }
        assert!(editor.scene().is_empty());
        editor.command(Command::Undo);
        assert!(editor.scene().is_empty());

        editor.command(Command::Redo);
        assert_eq!(editor.scene().objects().len(), 1);
    }

    #[test]
    fn new_edit_after_undo_discards_redo() {
        let mut editor = editor();
        add_rect(&mut editor, Pos2::new(10.0, 10.0), Pos2::new(60.0, 60.0));
        editor.command(Command::Undo);
        assert!(editor.history().can_redo());
        add_rect(&mut editor, Pos2::new(100.0, 100.0), Pos2::new(160.0, 160.0));
        assert!(!editor.history().can_redo());
        editor.command(Command::Redo);
        assert_eq!(editor.scene().objects().len(), 1);
    }

    #[test]
    fn click_selects_top_most_and_empty_click_pans() {
        let mut editor = editor();
        add_rect(&mut editor, Pos2::new(100.0, 100.0), Pos2::new(400.0, 400.0));
        add_rect(&mut editor, Pos2::new(200.0, 200.0), Pos2::new(300.0, 300.0));

        editor.pointer_down(Pos2::new(250.0, 250.0));
        editor.pointer_up(Pos2::new(250.0, 250.0), false);
        assert_eq!(editor.selection(), Some(Selection::Object(1)));

        editor.pointer_down(Pos2::new(700.0, 700.0));
        assert_eq!(editor.selection(), None);
        editor.pointer_move(Pos2::new(720.0, 690.0), false);
        editor.pointer_up(Pos2::new(720.0, 690.0), false);
        assert_eq!(editor.view().origin, Pos2::new(20.0, -10.0));
        assert_eq!(editor.history().undo_len(), 2);
    }

    #[test]
    fn drag_move_records_one_snapshot() {
        let mut editor = editor();
        add_rect(&mut editor, Pos2::new(100.0, 100.0), Pos2::new(200.0, 200.0));
        let before = editor.history().undo_len();

        editor.pointer_down(Pos2::new(150.0, 150.0));
        for step in 1..=10 {
            editor.pointer_move(Pos2::new(150.0 + step as f32, 150.0), false);
        }
        editor.pointer_up(Pos2::new(160.0, 150.0), false);

        assert_eq!(editor.history().undo_len(), before + 1);
        let Annotation::Rect(rect) = &editor.scene().objects()[0] else {
            panic!("expected a rectangle");
        };
        assert_eq!(rect.p1(), Point::new(110.0, 100.0));

        editor.command(Command::Undo);
        let Annotation::Rect(rect) = &editor.scene().objects()[0] else {
            panic!("expected a rectangle");
        };
        assert_eq!(rect.p1(), Point::new(100.0, 100.0));
        assert_eq!(editor.selection(), None);
    }

    #[test]
    fn click_without_motion_records_nothing() {
        let mut editor = editor();
        add_rect(&mut editor, Pos2::new(100.0, 100.0), Pos2::new(200.0, 200.0));
        let before = editor.history().undo_len();
        editor.pointer_down(Pos2::new(150.0, 150.0));
        editor.pointer_up(Pos2::new(150.0, 150.0), false);
        assert_eq!(editor.history().undo_len(), before);
    }

    #[test]
    fn resize_rectangle_corner() {
        let mut editor = editor();
        add_rect(&mut editor, Pos2::new(300.0, 300.0), Pos2::new(100.0, 100.0));
        editor.pointer_down(Pos2::new(301.0, 299.0));
        editor.pointer_move(Pos2::new(350.0, 320.0), false);
        editor.pointer_up(Pos2::new(350.0, 320.0), false);
        let Annotation::Rect(rect) = &editor.scene().objects()[0] else {
            panic!("expected a rectangle");
        };
        assert_eq!(rect.p1(), Point::new(100.0, 100.0));
        assert_eq!(rect.p2(), Point::new(350.0, 320.0));
    }

    #[test]
    fn resize_across_anchor_keeps_tracking_pointer() {
        let mut editor = editor();
        add_rect(&mut editor, Pos2::new(100.0, 100.0), Pos2::new(200.0, 200.0));
        editor.pointer_down(Pos2::new(200.0, 200.0));
        editor.pointer_move(Pos2::new(50.0, 150.0), false);
        editor.pointer_move(Pos2::new(40.0, 160.0), false);
        editor.pointer_up(Pos2::new(40.0, 160.0), false);
        let Annotation::Rect(rect) = &editor.scene().objects()[0] else {
            panic!("expected a rectangle");
        };
        assert_eq!(rect.p1(), Point::new(40.0, 100.0));
        assert_eq!(rect.p2(), Point::new(100.0, 160.0));
    }

    #[test]
    fn constrained_resize_squares_rectangle_from_anchor() {
        let mut editor = editor();
        add_rect(&mut editor, Pos2::new(100.0, 100.0), Pos2::new(200.0, 200.0));
        editor.pointer_down(Pos2::new(200.0, 200.0));
        editor.pointer_move(Pos2::new(260.0, 210.0), true);
        editor.pointer_up(Pos2::new(260.0, 210.0), true);
        let Annotation::Rect(rect) = &editor.scene().objects()[0] else {
            panic!("expected a rectangle");
        };
        assert_eq!(rect.p1(), Point::new(100.0, 100.0));
        assert_eq!(rect.p2(), Point::new(260.0, 260.0));
    }

    #[test]
    fn constrained_line_resize_snaps_to_axis() {
        let mut editor = editor();
        editor.command(Command::BeginMeasurement);
        drag(&mut editor, Pos2::new(100.0, 100.0), Pos2::new(200.0, 100.0), false);
        editor.pointer_down(Pos2::new(200.0, 100.0));
        editor.pointer_move(Pos2::new(180.0, 250.0), true);
        editor.pointer_up(Pos2::new(180.0, 250.0), true);
        let line = editor.scene().get(Selection::Object(0)).unwrap();
        assert_eq!(line.handle_point(0), Some(Point::new(100.0, 100.0)));
        assert_eq!(line.handle_point(1), Some(Point::new(100.0, 250.0)));
    }

    #[test]
    fn delete_and_reset_scale_are_undoable() {
        let mut editor = editor();
        set_scale(&mut editor, 1.0);
        add_rect(&mut editor, Pos2::new(100.0, 100.0), Pos2::new(200.0, 200.0));

        editor.pointer_down(Pos2::new(150.0, 150.0));
        editor.pointer_up(Pos2::new(150.0, 150.0), false);
        editor.command(Command::DeleteSelection);
        assert!(editor.scene().objects().is_empty());
        assert_eq!(editor.selection(), None);

        editor.command(Command::ResetScale);
        assert!(editor.scene().is_empty());

        editor.command(Command::Undo);
        assert!(editor.scene().scale().is_some());
        editor.command(Command::Undo);
        assert_eq!(editor.scene().objects().len(), 1);
    }

    #[test]
    fn replacing_scene_clears_history_and_selection() {
        let mut editor = editor();
        add_rect(&mut editor, Pos2::new(100.0, 100.0), Pos2::new(200.0, 200.0));
        editor.pointer_down(Pos2::new(150.0, 150.0));
        editor.pointer_up(Pos2::new(150.0, 150.0), false);
        editor.replace_scene(Scene::new());
        assert_eq!(editor.selection(), None);
        assert!(!editor.history().can_undo());
    }

    #[test]
    fn zoom_is_ignored_while_drawing() {
        let mut editor = editor();
        editor.command(Command::BeginRectangle);
        editor.pointer_down(Pos2::new(10.0, 10.0));
        editor.zoom(Pos2::new(10.0, 10.0), 1.0);
        assert_eq!(editor.view().scale, 1.0);
        editor.command(Command::Cancel);
        editor.zoom(Pos2::new(10.0, 10.0), -1.0);
        assert!(editor.view().scale < 1.0);
        editor.set_canvas(Rect::from_min_size(Pos2::ZERO, Vec2::splat(500.0)));
        assert!(editor.view().scale < 1.0 && editor.view().scale > 0.5);
    }

    #[test]
    fn canvas_resize_refits_until_zoomed() {
        let mut editor = editor();
        editor.set_canvas(Rect::from_min_size(Pos2::ZERO, Vec2::splat(500.0)));
        assert_eq!(editor.view().scale, 0.5);
    }

    #[test]
    fn line_width_applies_to_existing_objects() {
        let mut editor = editor();
        add_rect(&mut editor, Pos2::new(100.0, 100.0), Pos2::new(200.0, 200.0));
        editor.set_line_width(40);
        assert_eq!(editor.line_width(), 12);
        assert_eq!(editor.scene().objects()[0].as_drawable().width(), 12);
    }

    #[test]
    fn grid_needs_scale_and_visibility() {
        let mut editor = editor();
        assert!(editor.grid_lines().is_none());
        set_scale(&mut editor, 1.0);
        editor.command(Command::SetGridSpacingCm(50.0));
        let lines = editor.grid_lines().unwrap();
        assert_eq!(lines.vertical.len(), 20);
        editor.command(Command::ToggleGrid);
        assert!(editor.grid_lines().is_none());
    }
}
