//! Pointer gestures over the canvas.
//!
//! Gestures only compute positions. Nothing touches the store until the
//! caller commits the result of `finish`.

use crate::annotation::{Annotation, AnnotationDraft, AnnotationId, AnnotationPatch, Color, LineDraft, Point};
use crate::transform::{self, ViewAnnotation};

/// Line drags of this length or shorter, in view pixels, are discarded.
pub const MIN_LINE_LENGTH: f64 = 5.0;

/// Visual position of a dragged annotation, in view space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragPosition {
    Text { anchor: Point },
    Line { start: Point, end: Point },
}

impl DragPosition {
    fn offset(self, dx: f64, dy: f64) -> Self {
        let shift = |p: Point| Point::new(p.x + dx, p.y + dy);
        match self {
            Self::Text { anchor } => Self::Text { anchor: shift(anchor) },
            Self::Line { start, end } => Self::Line { start: shift(start), end: shift(end) },
        }
    }
}

/// Move of an existing annotation, committed once on release.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationDrag {
    id: AnnotationId,
    pointer_start: Point,
    origin: DragPosition,
    current_scale: f64,
    stored_scale: f64,
}

impl AnnotationDrag {
    pub fn start(annotation: &Annotation, pointer: Point, current_scale: f64) -> Self {
        let origin = match transform::to_view(annotation, current_scale) {
            ViewAnnotation::Text(text) => DragPosition::Text { anchor: Point::new(text.x, text.y) },
            ViewAnnotation::Line(line) => DragPosition::Line {
                start: Point::new(line.x1, line.y1),
                end: Point::new(line.x2, line.y2),
            },
        };

        Self {
            id: annotation.id(),
            pointer_start: pointer,
            origin,
            current_scale,
            stored_scale: annotation.scale(),
        }
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    /// Where the annotation should be drawn while the pointer is at `pointer`.
    pub fn move_to(&self, pointer: Point) -> DragPosition {
        self.origin.offset(pointer.x - self.pointer_start.x, pointer.y - self.pointer_start.y)
    }

    /// Final position converted back into the annotation's stored scale.
    pub fn finish(self, pointer: Point) -> (AnnotationId, AnnotationPatch) {
        let stored = |value: f64| transform::to_stored(value, self.current_scale, self.stored_scale);

        let patch = match self.move_to(pointer) {
            DragPosition::Text { anchor } => AnnotationPatch {
                x: Some(stored(anchor.x)),
                y: Some(stored(anchor.y)),
                ..AnnotationPatch::default()
            },
            DragPosition::Line { start, end } => AnnotationPatch {
                x1: Some(stored(start.x)),
                y1: Some(stored(start.y)),
                x2: Some(stored(end.x)),
                y2: Some(stored(end.y)),
                ..AnnotationPatch::default()
            },
        };
        (self.id, patch)
    }
}

/// Press, drag and release that draws a new line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineGesture {
    start: Point,
    current: Point,
    scale: f64,
}

impl LineGesture {
    pub fn begin(point: Point, current_scale: f64) -> Self {
        Self { start: point, current: point, scale: current_scale }
    }

    pub fn update(&mut self, point: Point) {
        self.current = point;
    }

    /// In-progress segment in view space.
    pub fn preview(&self) -> (Point, Point) {
        (self.start, self.current)
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(self.current)
    }

    /// Draft for the finished line, or `None` when the drag was too short.
    pub fn finish(
        mut self,
        point: Point,
        page: u32,
        thickness: f64,
        color: Color,
    ) -> Option<AnnotationDraft> {
        self.update(point);
        if self.length() <= MIN_LINE_LENGTH {
            return None;
        }

        Some(AnnotationDraft::Line(LineDraft {
            page,
            x1: self.start.x,
            y1: self.start.y,
            x2: self.current.x,
            y2: self.current.y,
            scale: self.scale,
            thickness,
            color,
        }))
    }
}
