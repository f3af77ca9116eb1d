//! Conversions between view space, stored space and PDF page space.
//!
//! View space is canvas pixels at the current zoom. Stored space is canvas
//! pixels at the zoom active when an annotation was captured. PDF page space
//! has its origin at the bottom-left corner, in points.

use crate::annotation::{Annotation, AnnotationId, Color, Point};
use serde::Serialize;

/// Estimated glyph advance for hit testing, as a fraction of the font size.
pub const TEXT_CHAR_WIDTH_EM: f64 = 0.6;
pub const TEXT_LINE_HEIGHT_EM: f64 = 1.2;

/// A point tagged with the zoom it was captured at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Captured {
    pub point: Point,
    pub scale: f64,
}

/// Record a view-space point as stored coordinates. No conversion happens.
pub fn capture(point: Point, current_scale: f64) -> Captured {
    Captured { point, scale: current_scale }
}

/// Stored value as displayed at `current_scale`.
pub fn to_view_value(value: f64, stored_scale: f64, current_scale: f64) -> f64 {
    value * (current_scale / stored_scale)
}

/// View value at `current_scale` expressed in the `stored_scale` space.
pub fn to_stored(value: f64, current_scale: f64, stored_scale: f64) -> f64 {
    value * (stored_scale / current_scale)
}

pub fn to_view_point(point: Point, stored_scale: f64, current_scale: f64) -> Point {
    Point::new(
        to_view_value(point.x, stored_scale, current_scale),
        to_view_value(point.y, stored_scale, current_scale),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewText {
    pub id: AnnotationId,
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub font_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewLine {
    pub id: AnnotationId,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub thickness: f64,
    pub color: Color,
}

/// An annotation resolved for drawing at the current zoom.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ViewAnnotation {
    Text(ViewText),
    Line(ViewLine),
}

impl ViewAnnotation {
    pub fn id(&self) -> AnnotationId {
        match self {
            Self::Text(text) => text.id,
            Self::Line(line) => line.id,
        }
    }
}

/// Rescale every coordinate and size attribute from the stored value.
pub fn to_view(annotation: &Annotation, current_scale: f64) -> ViewAnnotation {
    let view = |value: f64| to_view_value(value, annotation.scale(), current_scale);

    match annotation {
        Annotation::Text(text) => ViewAnnotation::Text(ViewText {
            id: text.id,
            x: view(text.x),
            y: view(text.y),
            text: text.text.clone(),
            font_size: view(text.font_size),
        }),
        Annotation::Line(line) => ViewAnnotation::Line(ViewLine {
            id: line.id,
            x1: view(line.x1),
            y1: view(line.y1),
            x2: view(line.x2),
            y2: view(line.y2),
            thickness: view(line.thickness),
            color: line.color,
        }),
    }
}

/// Page size in points alongside the unscaled raster size of the same page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width_pt: f64,
    pub height_pt: f64,
    pub raster_width_px: f64,
    pub raster_height_px: f64,
}

impl PageGeometry {
    pub fn to_pdf_x(&self, x: f64, stored_scale: f64) -> f64 {
        (x / stored_scale) * (self.width_pt / self.raster_width_px)
    }

    /// Flip to a bottom-left origin, then drop by `baseline_offset` points.
    pub fn to_pdf_y(&self, y: f64, stored_scale: f64, baseline_offset: f64) -> f64 {
        self.height_pt - (y / stored_scale) * (self.height_pt / self.raster_height_px)
            - baseline_offset
    }

    /// Font sizes and stroke widths, measured along the page width.
    pub fn to_pdf_len(&self, len: f64, stored_scale: f64) -> f64 {
        (len / stored_scale) * (self.width_pt / self.raster_width_px)
    }
}

/// Shortest distance from `point` to the segment `a`-`b`.
pub fn point_segment_distance(point: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_squared = dx * dx + dy * dy;
    if length_squared == 0.0 {
        return point.distance_to(a);
    }

    let t = (((point.x - a.x) * dx + (point.y - a.y) * dy) / length_squared).clamp(0.0, 1.0);
    point.distance_to(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Whether a view-space `point` touches `annotation` drawn at `current_scale`.
pub fn hit_test(annotation: &Annotation, point: Point, current_scale: f64, tolerance: f64) -> bool {
    match to_view(annotation, current_scale) {
        ViewAnnotation::Text(text) => {
            let width = text.text.chars().count() as f64 * TEXT_CHAR_WIDTH_EM * text.font_size;
            let height = TEXT_LINE_HEIGHT_EM * text.font_size;
            point.x >= text.x - tolerance
                && point.x <= text.x + width + tolerance
                && point.y >= text.y - tolerance
                && point.y <= text.y + height + tolerance
        }
        ViewAnnotation::Line(line) => {
            let reach = tolerance.max(line.thickness / 2.0);
            point_segment_distance(
                point,
                Point::new(line.x1, line.y1),
                Point::new(line.x2, line.y2),
            ) <= reach
        }
    }
}
