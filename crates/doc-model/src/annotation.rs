use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AnnotationId(pub u64);

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An attribute value that failed validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid {field}: {reason}")]
pub struct InvalidAttribute {
    pub field: &'static str,
    pub reason: String,
}

impl InvalidAttribute {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self { field, reason: reason.into() }
    }
}

pub(crate) fn check_finite(field: &'static str, value: f64) -> Result<(), InvalidAttribute> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(InvalidAttribute::new(field, format!("{value} is not finite")))
    }
}

pub(crate) fn check_positive(field: &'static str, value: f64) -> Result<(), InvalidAttribute> {
    check_finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(InvalidAttribute::new(field, format!("{value} must be greater than zero")))
    }
}

fn check_page(page: u32) -> Result<(), InvalidAttribute> {
    if page == 0 {
        Err(InvalidAttribute::new("page", "pages are numbered from 1"))
    } else {
        Ok(())
    }
}

fn normalize_text(text: &str) -> Result<String, InvalidAttribute> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(InvalidAttribute::new("text", "label must not be blank"))
    } else {
        Ok(trimmed.to_owned())
    }
}

/// RGB color, written as CSS hex (`#rrggbb`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Components in `0.0..=1.0`, as PDF color operators expect.
    pub fn to_normalized(self) -> [f32; 3] {
        [self.r as f32 / 255.0, self.g as f32 / 255.0, self.b as f32 / 255.0]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color {0:?}: expected #rrggbb or #rgb")]
pub struct ColorParseError(String);

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || ColorParseError(s.to_owned());
        let hex = s.trim().strip_prefix('#').ok_or_else(error)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(error());
        }

        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| error());
        match hex.len() {
            6 => Ok(Self::rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            3 => {
                let short = |i: usize| channel(&hex[i..=i]).map(|v| v * 17);
                Ok(Self::rgb(short(0)?, short(1)?, short(2)?))
            }
            _ => Err(error()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnnotation {
    pub id: AnnotationId,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub text: String,
    pub font_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAnnotation {
    pub id: AnnotationId,
    pub page: u32,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub scale: f64,
    pub thickness: f64,
    pub color: Color,
}

/// A text label or a straight line placed on one page.
///
/// Coordinates are canvas pixels at `scale`, the zoom active when the
/// annotation was captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Annotation {
    Text(TextAnnotation),
    Line(LineAnnotation),
}

impl Annotation {
    pub fn id(&self) -> AnnotationId {
        match self {
            Self::Text(text) => text.id,
            Self::Line(line) => line.id,
        }
    }

    pub fn page(&self) -> u32 {
        match self {
            Self::Text(text) => text.page,
            Self::Line(line) => line.page,
        }
    }

    pub fn scale(&self) -> f64 {
        match self {
            Self::Text(text) => text.scale,
            Self::Line(line) => line.scale,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Line(_) => "line",
        }
    }

    pub(crate) fn validate(&self) -> Result<(), InvalidAttribute> {
        match self {
            Self::Text(text) => {
                check_page(text.page)?;
                check_finite("x", text.x)?;
                check_finite("y", text.y)?;
                check_positive("scale", text.scale)?;
                check_positive("font_size", text.font_size)?;
                normalize_text(&text.text).map(|_| ())
            }
            Self::Line(line) => {
                check_page(line.page)?;
                check_finite("x1", line.x1)?;
                check_finite("y1", line.y1)?;
                check_finite("x2", line.x2)?;
                check_finite("y2", line.y2)?;
                check_positive("scale", line.scale)?;
                check_positive("thickness", line.thickness)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDraft {
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub text: String,
    pub font_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDraft {
    pub page: u32,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub scale: f64,
    pub thickness: f64,
    pub color: Color,
}

/// An annotation that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationDraft {
    Text(TextDraft),
    Line(LineDraft),
}

impl AnnotationDraft {
    pub fn page(&self) -> u32 {
        match self {
            Self::Text(text) => text.page,
            Self::Line(line) => line.page,
        }
    }

    /// Validate and attach `id`. Label text is stored trimmed.
    pub(crate) fn into_annotation(self, id: AnnotationId) -> Result<Annotation, InvalidAttribute> {
        let annotation = match self {
            Self::Text(draft) => Annotation::Text(TextAnnotation {
                id,
                page: draft.page,
                x: draft.x,
                y: draft.y,
                scale: draft.scale,
                text: normalize_text(&draft.text)?,
                font_size: draft.font_size,
            }),
            Self::Line(draft) => Annotation::Line(LineAnnotation {
                id,
                page: draft.page,
                x1: draft.x1,
                y1: draft.y1,
                x2: draft.x2,
                y2: draft.y2,
                scale: draft.scale,
                thickness: draft.thickness,
                color: draft.color,
            }),
        };
        annotation.validate()?;
        Ok(annotation)
    }
}

/// Partial update of an annotation.
///
/// Capture metadata (`page`, `scale`) is fixed once an annotation exists.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub x1: Option<f64>,
    pub y1: Option<f64>,
    pub x2: Option<f64>,
    pub y2: Option<f64>,
    pub text: Option<String>,
    pub font_size: Option<f64>,
    pub thickness: Option<f64>,
    pub color: Option<Color>,
}

impl AnnotationPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// First field set on the patch that `annotation` does not have.
    pub(crate) fn incompatible_field(&self, annotation: &Annotation) -> Option<&'static str> {
        let fields: &[(&'static str, bool)] = match annotation {
            Annotation::Text(_) => &[
                ("x1", self.x1.is_some()),
                ("y1", self.y1.is_some()),
                ("x2", self.x2.is_some()),
                ("y2", self.y2.is_some()),
                ("thickness", self.thickness.is_some()),
                ("color", self.color.is_some()),
            ],
            Annotation::Line(_) => &[
                ("x", self.x.is_some()),
                ("y", self.y.is_some()),
                ("text", self.text.is_some()),
                ("font_size", self.font_size.is_some()),
            ],
        };
        fields.iter().find(|(_, set)| *set).map(|(name, _)| *name)
    }

    /// Apply onto a copy of `annotation`; the caller swaps it in on success.
    pub(crate) fn applied_to(&self, annotation: &Annotation) -> Result<Annotation, InvalidAttribute> {
        let mut patched = annotation.clone();
        match &mut patched {
            Annotation::Text(text) => {
                set(&mut text.x, self.x);
                set(&mut text.y, self.y);
                set(&mut text.font_size, self.font_size);
                if let Some(label) = &self.text {
                    text.text = normalize_text(label)?;
                }
            }
            Annotation::Line(line) => {
                set(&mut line.x1, self.x1);
                set(&mut line.y1, self.y1);
                set(&mut line.x2, self.x2);
                set(&mut line.y2, self.y2);
                set(&mut line.thickness, self.thickness);
                set(&mut line.color, self.color);
            }
        }
        patched.validate()?;
        Ok(patched)
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}
