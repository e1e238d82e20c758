use eframe::egui;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flaner::config::{Config, LABEL_SCALE_RANGE, LINE_WIDTH_RANGE};
use flaner::draw;
use flaner::editor::{Command, Draft, Editor, Mode};
use flaner::entity::{length_label, DrawContext, Drawable, Point};
use flaner::project::{self, PROJECT_FILE};

pub const TITLE: &str = "flaner";

const SIDEBAR_WIDTH: f32 = 230.0;
const TOAST_SECONDS: f64 = 2.0;
/// Scroll distance that counts as one wheel notch.
const SCROLL_PER_STEP: f32 = 50.0;
const GRID_COLOR: egui::Color32 = egui::Color32::from_rgba_premultiplied(90, 90, 90, 90);

// ── Shell actions ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
enum Action {
    Edit(Command),
    OpenImage,
    SaveProject,
    QuickSaveOrLoad,
    LoadProject,
    OpenProjectsFolder,
    AskGridSpacing,
}

const KEY_BINDINGS: [(egui::Key, Action); 14] = [
    (egui::Key::O, Action::OpenImage),
    (egui::Key::S, Action::Edit(Command::BeginSetScale)),
    (egui::Key::L, Action::Edit(Command::BeginMeasurement)),
    (egui::Key::D, Action::Edit(Command::BeginRectangle)),
    (egui::Key::C, Action::Edit(Command::Cancel)),
    (egui::Key::Escape, Action::Edit(Command::Cancel)),
    (egui::Key::G, Action::AskGridSpacing),
    (egui::Key::V, Action::Edit(Command::ToggleGrid)),
    (egui::Key::R, Action::Edit(Command::ResetScale)),
    (egui::Key::P, Action::SaveProject),
    (egui::Key::Q, Action::QuickSaveOrLoad),
    (egui::Key::J, Action::LoadProject),
    (egui::Key::K, Action::OpenProjectsFolder),
    (egui::Key::Delete, Action::Edit(Command::DeleteSelection)),
];

fn shortcuts(input: &egui::InputState) -> Vec<Action> {
    let mut actions = Vec::new();
    if input.modifiers.command {
        if input.key_pressed(egui::Key::Z) {
            actions.push(Action::Edit(if input.modifiers.shift {
                Command::Redo
            } else {
                Command::Undo
            }));
        }
        if input.key_pressed(egui::Key::Y) {
            actions.push(Action::Edit(Command::Redo));
        }
        return actions;
    }
    for (key, action) in KEY_BINDINGS {
        if input.key_pressed(key) {
            actions.push(action);
        }
    }
    if input.key_pressed(egui::Key::Backspace) {
        actions.push(Action::Edit(Command::DeleteSelection));
    }
    actions
}

// ── Prompts ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Prompt {
    ScaleLength,
    ProjectName,
    GridSpacing,
}

impl Prompt {
    fn title(self) -> &'static str {
        match self {
            Prompt::ScaleLength => "Set scale",
            Prompt::ProjectName => "Save project",
            Prompt::GridSpacing => "Grid spacing",
        }
    }

    fn question(self) -> &'static str {
        match self {
            Prompt::ScaleLength => "Real length of the line in meters:",
            Prompt::ProjectName => "Project name:",
            Prompt::GridSpacing => "Grid spacing in centimeters:",
        }
    }
}

struct Dialog {
    prompt: Prompt,
    text: String,
}

/// Accepts a decimal comma as well as a point.
fn parse_number(text: &str) -> Option<f32> {
    text.trim().replace(',', ".").parse().ok()
}

struct Toast {
    text: String,
    until: f64,
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct FlanerApp {
    editor: Editor,
    projects_root: PathBuf,

    image_path: Option<PathBuf>,
    raw_image: Option<DynamicImage>,
    texture: Option<egui::TextureHandle>,

    dialog: Option<Dialog>,
    toast: Option<Toast>,
    now: f64,
    title_dirty: bool,
}

impl FlanerApp {
    pub fn new(config: Config, image_path: Option<PathBuf>) -> Self {
        let projects_root = project::projects_root(config.projects_override().as_deref());
        log::info!("Projects folder: {}", projects_root.display());

        let mut app = Self {
            editor: Editor::new(&config),
            projects_root,
            image_path: None,
            raw_image: None,
            texture: None,
            dialog: None,
            toast: None,
            now: 0.0,
            title_dirty: true,
        };
        if let Some(path) = image_path {
            app.open_image(&path);
        }
        app
    }

    fn notify(&mut self, text: impl Into<String>) {
        self.toast = Some(Toast {
            text: text.into(),
            until: self.now + TOAST_SECONDS,
        });
    }

    // ── Image ───────────────────────────────────────────────────────────────

    fn open_image(&mut self, path: &Path) -> bool {
        match image::open(path) {
            Ok(img) => {
                let size = egui::vec2(img.width() as f32, img.height() as f32);
                self.raw_image = Some(img);
                self.texture = None;
                self.image_path = Some(path.to_path_buf());
                self.editor.set_image(size);
                self.title_dirty = true;
                log::info!("Opened image {}", path.display());
                true
            }
            Err(e) => {
                log::error!("Failed to load image {}: {}", path.display(), e);
                self.notify(format!("Failed to load image: {e}"));
                false
            }
        }
    }

    fn clear_image(&mut self) {
        self.raw_image = None;
        self.texture = None;
        self.image_path = None;
        self.editor.clear_image();
        self.title_dirty = true;
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_some() {
            return;
        }
        if let Some(ref img) = self.raw_image {
            let rgba = img.to_rgba8();
            let size = [rgba.width() as usize, rgba.height() as usize];
            let pixels = rgba.as_flat_samples();
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
            self.texture = Some(ctx.load_texture("plan", color_image, egui::TextureOptions::LINEAR));
        }
    }

    fn pick_image(&mut self) {
        let file = rfd::FileDialog::new()
            .set_title("Open image")
            .add_filter("Image files", &["png", "jpg", "jpeg", "bmp", "gif"])
            .pick_file();
        if let Some(path) = file {
            self.open_image(&path);
        }
    }

    // ── Projects ────────────────────────────────────────────────────────────

    fn save_to(&mut self, dir: &Path, done: &str) {
        let Some(image) = self.image_path.clone() else {
            self.notify(project::ProjectError::NoImage.to_string());
            return;
        };
        match project::save_project(dir, &image, self.editor.scene()) {
            Ok(report) => match report.image_error {
                None => self.notify(format!("{done} to {}", dir.display())),
                Some(e) => self.notify(format!("Saved, but the image could not be copied: {e}")),
            },
            Err(e) => {
                log::error!("Failed to save project to {}: {}", dir.display(), e);
                self.notify(format!("Save failed: {e}"));
            }
        }
    }

    fn save_named(&mut self, name: &str) {
        match project::project_dir(&self.projects_root, name) {
            Ok(dir) => self.save_to(&dir, "Saved"),
            Err(e) => self.notify(e.to_string()),
        }
    }

    fn load_from(&mut self, dir: &Path) {
        let loaded = match project::load_project(dir) {
            Ok(loaded) => loaded,
            Err(e) => {
                log::error!("Failed to load project {}: {}", dir.display(), e);
                self.notify(format!("Failed to load project: {e}"));
                return;
            }
        };
        match &loaded.image_path {
            Some(path) => {
                if !self.open_image(path) {
                    self.clear_image();
                }
            }
            None => self.clear_image(),
        }
        self.editor.replace_scene(loaded.scene);
        if loaded.skipped > 0 {
            self.notify(format!("Loaded, {} unreadable objects skipped", loaded.skipped));
        } else {
            self.notify(format!("Loaded {}", dir.display()));
        }
    }

    fn quick_save_or_load(&mut self) {
        let dir = project::quicksave_dir(&self.projects_root);
        if !self.editor.is_blank() {
            self.save_to(&dir, "Quicksaved");
        } else if dir.join(PROJECT_FILE).is_file() {
            self.load_from(&dir);
        } else {
            self.notify("No quicksave found");
        }
    }

    fn pick_project(&mut self) {
        let folder = rfd::FileDialog::new()
            .set_title("Open project folder")
            .set_directory(&self.projects_root)
            .pick_folder();
        if let Some(dir) = folder {
            self.load_from(&dir);
        }
    }

    fn open_projects_folder(&mut self) {
        if let Err(e) = project::open_in_file_browser(&self.projects_root) {
            log::error!(
                "Failed to open projects folder {}: {}",
                self.projects_root.display(),
                e
            );
            self.notify(format!("Cannot open {}", self.projects_root.display()));
        }
    }

    // ── Dispatch ────────────────────────────────────────────────────────────

    fn run(&mut self, action: Action) {
        match action {
            Action::Edit(command) => self.editor.command(command),
            Action::OpenImage => self.pick_image(),
            Action::SaveProject => {
                if self.image_path.is_some() {
                    self.open_dialog(Prompt::ProjectName, String::new());
                } else {
                    self.notify(project::ProjectError::NoImage.to_string());
                }
            }
            Action::QuickSaveOrLoad => self.quick_save_or_load(),
            Action::LoadProject => self.pick_project(),
            Action::OpenProjectsFolder => self.open_projects_folder(),
            Action::AskGridSpacing => {
                let current = format!("{}", self.editor.grid_spacing_m() * 100.0);
                self.open_dialog(Prompt::GridSpacing, current);
            }
        }
    }

    fn open_dialog(&mut self, prompt: Prompt, text: String) {
        if self.dialog.is_none() {
            self.dialog = Some(Dialog { prompt, text });
        }
    }

    fn answer(&mut self, prompt: Prompt, text: Option<String>) {
        match prompt {
            Prompt::ScaleLength => {
                let meters = text.as_deref().and_then(parse_number);
                if !self.editor.confirm_scale(meters) && text.is_some() {
                    self.notify("Scale must be a positive length");
                }
            }
            Prompt::ProjectName => {
                if let Some(name) = text {
                    self.save_named(&name);
                }
            }
            Prompt::GridSpacing => match text.as_deref().map(parse_number) {
                Some(Some(cm)) if cm.is_finite() && cm > 0.0 => {
                    self.editor.command(Command::SetGridSpacingCm(cm));
                }
                Some(_) => self.notify("Grid spacing must be positive"),
                None => {}
            },
        }
    }

    /// Modal prompt window. Returns the prompt and its answer once closed.
    fn show_dialog(&mut self, ctx: &egui::Context) -> Option<(Prompt, Option<String>)> {
        let dialog = self.dialog.as_mut()?;
        let prompt = dialog.prompt;
        let mut outcome = None;
        egui::Window::new(prompt.title())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(prompt.question());
                let te = ui.text_edit_singleline(&mut dialog.text);
                let enter = ui.input(|i| i.key_pressed(egui::Key::Enter));
                let escape = ui.input(|i| i.key_pressed(egui::Key::Escape));
                if !te.has_focus() && !te.lost_focus() {
                    te.request_focus();
                }
                ui.horizontal(|ui| {
                    if ui.button("OK").clicked() || (te.lost_focus() && enter) {
                        outcome = Some(Some(dialog.text.clone()));
                    }
                    if ui.button("Cancel").clicked() || escape {
                        outcome = Some(None);
                    }
                });
            });
        let answer = outcome?;
        self.dialog = None;
        Some((prompt, answer))
    }

    // ── Panels ──────────────────────────────────────────────────────────────

    fn sidebar(&mut self, ui: &mut egui::Ui) -> Vec<Action> {
        let mut actions = Vec::new();
        let mode = self.editor.mode();

        ui.heading(TITLE);
        ui.label(format!("Mode: {}", mode.label()));
        if mode.is_drawing() && ui.button("Cancel (C)").clicked() {
            actions.push(Action::Edit(Command::Cancel));
        }
        ui.separator();

        for (target, text, command) in [
            (Mode::SettingScale, "Set scale (S)", Command::BeginSetScale),
            (Mode::AddMeasurement, "Measure line (L)", Command::BeginMeasurement),
            (Mode::AddRectangle, "Rectangle (D)", Command::BeginRectangle),
        ] {
            if ui.selectable_label(mode == target, text).clicked() {
                actions.push(Action::Edit(command));
            }
        }
        match self.editor.scene().pixels_per_meter() {
            Some(ppm) => ui.label(format!("Scale: {ppm:.2} px/m")),
            None => ui.label("Scale: not set"),
        };
        if ui.button("Reset scale (R)").clicked() {
            actions.push(Action::Edit(Command::ResetScale));
        }
        ui.separator();

        let mut width = self.editor.line_width();
        ui.label("Line width");
        if ui.add(egui::Slider::new(&mut width, LINE_WIDTH_RANGE)).changed() {
            self.editor.set_line_width(width);
        }
        let mut label_scale = self.editor.label_scale();
        ui.label("Label size");
        if ui
            .add(egui::Slider::new(&mut label_scale, LABEL_SCALE_RANGE))
            .changed()
        {
            self.editor.set_label_scale(label_scale);
        }

        let mut grid = self.editor.grid_visible();
        if ui.checkbox(&mut grid, "Grid (V)").changed() {
            actions.push(Action::Edit(Command::ToggleGrid));
        }
        if ui
            .button(format!("Grid spacing: {:.0} cm (G)", self.editor.grid_spacing_m() * 100.0))
            .clicked()
        {
            actions.push(Action::AskGridSpacing);
        }
        ui.separator();

        ui.horizontal(|ui| {
            let history = self.editor.history();
            if ui.add_enabled(history.can_undo(), egui::Button::new("Undo")).clicked() {
                actions.push(Action::Edit(Command::Undo));
            }
            if ui.add_enabled(history.can_redo(), egui::Button::new("Redo")).clicked() {
                actions.push(Action::Edit(Command::Redo));
            }
        });
        if ui
            .add_enabled(self.editor.selection().is_some(), egui::Button::new("Delete (Del)"))
            .clicked()
        {
            actions.push(Action::Edit(Command::DeleteSelection));
        }
        ui.separator();

        for (text, action) in [
            ("Open image (O)", Action::OpenImage),
            ("Save project (P)", Action::SaveProject),
            ("Quicksave / load (Q)", Action::QuickSaveOrLoad),
            ("Load project (J)", Action::LoadProject),
            ("Projects folder (K)", Action::OpenProjectsFolder),
        ] {
            if ui.button(text).clicked() {
                actions.push(action);
            }
        }
        ui.separator();
        ui.small("Shift: snap lines to an axis, keep rectangles square");
        ui.small("Wheel: zoom, middle drag: move grid");
        ui.label(format!("Zoom: {:.0}%", self.editor.view().scale * 100.0));
        actions
    }

    fn canvas(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let canvas_rect = response.rect;
        self.editor.set_canvas(canvas_rect);

        if self.dialog.is_none() {
            self.handle_pointer(ctx, &response);
        }

        painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));
        if let (Some(tex), Some(img_rect)) = (&self.texture, self.editor.image_rect()) {
            painter.image(
                tex.id(),
                img_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        } else {
            painter.text(
                canvas_rect.center(),
                egui::Align2::CENTER_CENTER,
                "Press O to open a floor plan",
                egui::FontId::proportional(18.0),
                egui::Color32::from_gray(160),
            );
        }

        if let (Some(lines), Some(img_rect)) = (self.editor.grid_lines(), self.editor.image_rect()) {
            let stroke = egui::Stroke::new(1.0, GRID_COLOR);
            for x in lines.vertical {
                painter.line_segment([egui::pos2(x, img_rect.min.y), egui::pos2(x, img_rect.max.y)], stroke);
            }
            for y in lines.horizontal {
                painter.line_segment([egui::pos2(img_rect.min.x, y), egui::pos2(img_rect.max.x, y)], stroke);
            }
        }

        let dctx = DrawContext {
            painter: &painter,
            view: self.editor.view(),
            text_scale: self.editor.text_scale(),
            pixels_per_meter: self.editor.scene().pixels_per_meter(),
        };
        self.editor.scene().draw(&dctx);
        if let Some(entity) = self.editor.selection().and_then(|s| self.editor.scene().get(s)) {
            entity.draw_highlight(&dctx, self.editor.is_moving());
        }
        let width = self.editor.line_width() as f32;
        if let Some(draft) = self.editor.draft() {
            draw_draft(&dctx, draft, width);
        }
        if let Some(pending) = self.editor.pending_scale() {
            let a = dctx.view.to_screen(pending.p1.to_pos2());
            let b = dctx.view.to_screen(pending.p2.to_pos2());
            draw_scale_preview(&dctx, a, b, width, pending.p1.distance(pending.p2));
        }
    }

    fn handle_pointer(&mut self, ctx: &egui::Context, response: &egui::Response) {
        let (pos, pressed, released, middle_pressed, middle_released, constrain, scroll) =
            ctx.input(|i| {
                (
                    i.pointer.interact_pos(),
                    i.pointer.primary_pressed(),
                    i.pointer.primary_released(),
                    i.pointer.button_pressed(egui::PointerButton::Middle),
                    i.pointer.button_released(egui::PointerButton::Middle),
                    i.modifiers.shift,
                    i.raw_scroll_delta.y,
                )
            });
        let Some(pos) = pos else {
            return;
        };

        if pressed && response.hovered() {
            self.editor.pointer_down(pos);
        }
        self.editor.pointer_move(pos, constrain);
        if released {
            self.editor.pointer_up(pos, constrain);
        }
        if response.secondary_clicked() {
            self.editor.secondary_click(pos);
        }
        if middle_pressed && response.hovered() {
            self.editor.grid_drag_begin(pos);
        }
        if middle_released {
            self.editor.grid_drag_end();
        }
        if scroll != 0.0 && response.hovered() {
            self.editor.zoom(pos, scroll / SCROLL_PER_STEP);
        }
    }

    fn show_toast(&mut self, ctx: &egui::Context) {
        let Some(toast) = &self.toast else {
            return;
        };
        if self.now >= toast.until {
            self.toast = None;
            return;
        }
        egui::Area::new(egui::Id::new("toast"))
            .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -24.0))
            .order(egui::Order::Foreground)
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label(toast.text.as_str());
                });
            });
        ctx.request_repaint_after(Duration::from_secs_f64(toast.until - self.now));
    }

    fn update_title(&mut self, ctx: &egui::Context) {
        if !self.title_dirty {
            return;
        }
        self.title_dirty = false;
        let title = match self.image_path.as_ref().and_then(|p| p.file_name()) {
            Some(name) => format!("{TITLE} - {}", name.to_string_lossy()),
            None => TITLE.to_owned(),
        };
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(title));
    }
}

// ── Previews ────────────────────────────────────────────────────────────────

fn draw_scale_preview(dctx: &DrawContext<'_>, a: egui::Pos2, b: egui::Pos2, width: f32, length_px: f32) {
    draw::line(dctx.painter, a, b, width, draw::PREVIEW);
    draw::perp_cap(dctx.painter, a, b, 12.0, width, draw::PREVIEW);
    draw::perp_cap(dctx.painter, b, a, 12.0, width, draw::PREVIEW);
    let gap = (width * 3.0).max(4.0);
    draw::label_beside_line(dctx.painter, a, b, gap, &length_label(length_px, None), dctx.text_scale);
}

fn draw_draft(dctx: &DrawContext<'_>, draft: Draft, width: f32) {
    let p1 = Point::from_pos2(dctx.view.to_original(draft.start));
    let p2 = Point::from_pos2(dctx.view.to_original(draft.end));
    let (a, b) = (draft.start, draft.end);
    let gap = (width * 3.0).max(4.0);
    match draft.mode {
        Mode::SettingScale => draw_scale_preview(dctx, a, b, width, p1.distance(p2)),
        Mode::AddMeasurement => {
            let arrow = (width * 3.0).max(6.0);
            draw::line(dctx.painter, a, b, width, draw::PREVIEW);
            draw::arrow_head(dctx.painter, b, a, arrow, draw::PREVIEW);
            draw::arrow_head(dctx.painter, a, b, arrow, draw::PREVIEW);
            let text = length_label(p1.distance(p2), dctx.pixels_per_meter);
            draw::label_beside_line(dctx.painter, a, b, gap, &text, dctx.text_scale);
        }
        Mode::AddRectangle => {
            let rect = egui::Rect::from_two_pos(a, b);
            dctx.painter.rect_stroke(
                rect,
                0.0,
                egui::Stroke::new(width, draw::PREVIEW),
                egui::StrokeKind::Middle,
            );
            let w = length_label((p2.x - p1.x).abs(), dctx.pixels_per_meter);
            let h = length_label((p2.y - p1.y).abs(), dctx.pixels_per_meter);
            draw::rect_labels(dctx.painter, rect, gap, &w, &h, dctx.text_scale);
        }
        Mode::Normal => {}
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for FlanerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.now = ctx.input(|i| i.time);
        self.ensure_texture(ctx);
        self.update_title(ctx);

        if self.editor.pending_scale().is_some() {
            self.open_dialog(Prompt::ScaleLength, String::new());
        } else if self
            .dialog
            .as_ref()
            .is_some_and(|d| d.prompt == Prompt::ScaleLength)
        {
            self.dialog = None;
        }

        let mut actions = Vec::new();
        if self.dialog.is_none() && !ctx.wants_keyboard_input() {
            actions = ctx.input(shortcuts);
        }

        egui::SidePanel::left("sidebar")
            .resizable(false)
            .exact_width(SIDEBAR_WIDTH)
            .show(ctx, |ui| {
                ui.add_enabled_ui(self.dialog.is_none(), |ui| {
                    actions.extend(self.sidebar(ui));
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| self.canvas(ctx, ui));

        if let Some((prompt, answer)) = self.show_dialog(ctx) {
            self.answer(prompt, answer);
        }
        for action in actions {
            self.run(action);
        }
        self.show_toast(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_accept_decimal_comma() {
        assert_eq!(parse_number(" 2,5 "), Some(2.5));
        assert_eq!(parse_number("3.25"), Some(3.25));
        assert_eq!(parse_number("three"), None);
    }
}
