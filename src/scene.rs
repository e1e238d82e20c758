//! The document: an optional scale line plus an ordered list of annotations.

use egui::Pos2;

use crate::entity::{Annotation, DrawContext, Drawable, Entity, ScaleLine};
use crate::geometry::Viewport;

/// Reference to one entity of a [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    Scale,
    Object(usize),
}

/// Objects are kept in paint order: later entries draw on top and are hit first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    scale: Option<ScaleLine>,
    objects: Vec<Annotation>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from project records. A later scale record replaces an earlier one.
    pub fn from_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let mut scene = Self::new();
        for entity in entities {
            match entity {
                Entity::Scale(scale) => scene.scale = Some(scale),
                Entity::Measure(m) => scene.objects.push(Annotation::Measure(m)),
                Entity::Rect(r) => scene.objects.push(Annotation::Rect(r)),
            }
        }
        scene
    }

    /// Project records: the scale line first, then objects in paint order.
    pub fn to_entities(&self) -> Vec<Entity> {
        self.scale
            .iter()
            .cloned()
            .map(Entity::Scale)
            .chain(self.objects.iter().cloned().map(Entity::from))
            .collect()
    }

    pub fn scale(&self) -> Option<&ScaleLine> {
        self.scale.as_ref()
    }

    pub fn objects(&self) -> &[Annotation] {
        &self.objects
    }

    pub fn is_empty(&self) -> bool {
        self.scale.is_none() && self.objects.is_empty()
    }

    /// Derived on every call so it can never go stale.
    pub fn pixels_per_meter(&self) -> Option<f32> {
        self.scale.as_ref().and_then(ScaleLine::pixels_per_meter)
    }

    /// Install a new scale line, returning the one it replaces.
    pub fn set_scale(&mut self, scale: ScaleLine) -> Option<ScaleLine> {
        self.scale.replace(scale)
    }

    pub fn clear_scale(&mut self) -> Option<ScaleLine> {
        self.scale.take()
    }

    pub fn push(&mut self, annotation: impl Into<Annotation>) {
        self.objects.push(annotation.into());
    }

    pub fn remove(&mut self, selection: Selection) -> bool {
        match selection {
            Selection::Scale => self.scale.take().is_some(),
            Selection::Object(i) if i < self.objects.len() => {
                self.objects.remove(i);
                true
            }
            Selection::Object(_) => false,
        }
    }

    pub fn get(&self, selection: Selection) -> Option<&dyn Drawable> {
        match selection {
            Selection::Scale => self.scale.as_ref().map(|s| s as &dyn Drawable),
            Selection::Object(i) => self.objects.get(i).map(Annotation::as_drawable),
        }
    }

    pub fn get_mut(&mut self, selection: Selection) -> Option<&mut dyn Drawable> {
        match selection {
            Selection::Scale => self.scale.as_mut().map(|s| s as &mut dyn Drawable),
            Selection::Object(i) => self.objects.get_mut(i).map(Annotation::as_drawable_mut),
        }
    }

    /// Top-most entity under `screen`: the scale line first, then objects
    /// from the top of the stack down.
    pub fn hit_test(&self, screen: Pos2, view: &Viewport, tolerance: f32) -> Option<Selection> {
        if let Some(scale) = &self.scale {
            if scale.hit_test(screen, view, tolerance) {
                return Some(Selection::Scale);
            }
        }
        self.objects
            .iter()
            .enumerate()
            .rev()
            .find(|(_, o)| o.as_drawable().hit_test(screen, view, tolerance))
            .map(|(i, _)| Selection::Object(i))
    }

    pub fn set_line_width(&mut self, width: u32) {
        if let Some(scale) = &mut self.scale {
            scale.set_width(width);
        }
        for object in &mut self.objects {
            object.as_drawable_mut().set_width(width);
        }
    }

    pub fn draw(&self, ctx: &DrawContext<'_>) {
        if let Some(scale) = &self.scale {
            scale.draw(ctx);
        }
        for object in &self.objects {
            object.as_drawable().draw(ctx);
        }
    }
}
