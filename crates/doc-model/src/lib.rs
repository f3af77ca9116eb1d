use serde::{Deserialize, Serialize};

pub mod annotation;
pub mod gesture;
pub mod store;
pub mod transform;

pub use annotation::{
    Annotation, AnnotationDraft, AnnotationId, AnnotationPatch, Color, ColorParseError,
    InvalidAttribute, LineAnnotation, LineDraft, Point, TextAnnotation, TextDraft,
};
pub use gesture::{AnnotationDrag, DragPosition, LineGesture};
pub use store::{AnnotationStore, StoreError};
pub use transform::{PageGeometry, ViewAnnotation};

pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 3.0;
pub const ZOOM_STEP: f64 = 1.2;
pub const DEFAULT_SCALE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum RangeError {
    #[error("page {page} is outside 1..={total_pages}")]
    PageOutOfBounds { page: u32, total_pages: u32 },
    #[error("scale {scale} is outside 0.5..=3.0")]
    ScaleOutOfBounds { scale: f64 },
}

/// Page and zoom of the open document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub current_page: u32,
    pub total_pages: u32,
    pub scale: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self { current_page: 1, total_pages: 0, scale: DEFAULT_SCALE }
    }
}

impl ViewState {
    /// First page at the default zoom.
    pub fn new(total_pages: u32) -> Self {
        Self { total_pages, ..Self::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewAction {
    SetPage(u32),
    SetScale(f64),
    NextPage,
    PreviousPage,
    ZoomIn,
    ZoomOut,
}

/// `SetPage` and `SetScale` reject out-of-range values and leave the state
/// untouched. The stepping actions clamp instead.
pub fn apply_view_action(state: &mut ViewState, action: ViewAction) -> Result<(), RangeError> {
    match action {
        ViewAction::SetPage(page) => {
            if page == 0 || page > state.total_pages {
                return Err(RangeError::PageOutOfBounds { page, total_pages: state.total_pages });
            }
            state.current_page = page;
        }
        ViewAction::SetScale(scale) => {
            if !scale.is_finite() || !(MIN_SCALE..=MAX_SCALE).contains(&scale) {
                return Err(RangeError::ScaleOutOfBounds { scale });
            }
            state.scale = scale;
        }
        ViewAction::NextPage => {
            if state.current_page < state.total_pages {
                state.current_page += 1;
            }
        }
        ViewAction::PreviousPage => {
            if state.current_page > 1 {
                state.current_page -= 1;
            }
        }
        ViewAction::ZoomIn => {
            state.scale = (state.scale * ZOOM_STEP).min(MAX_SCALE);
        }
        ViewAction::ZoomOut => {
            state.scale = (state.scale / ZOOM_STEP).max(MIN_SCALE);
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingMode {
    #[default]
    Text,
    Line,
}

/// Current drawing tool and the attributes new annotations get.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub mode: DrawingMode,
    pub font_size: f64,
    pub line_thickness: f64,
    pub line_color: Color,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self { mode: DrawingMode::Text, font_size: 12.0, line_thickness: 2.0, line_color: Color::RED }
    }
}

impl ToolSettings {
    pub fn set_font_size(&mut self, font_size: f64) -> Result<(), InvalidAttribute> {
        annotation::check_positive("font_size", font_size)?;
        self.font_size = font_size;
        Ok(())
    }

    pub fn set_line_thickness(&mut self, thickness: f64) -> Result<(), InvalidAttribute> {
        annotation::check_positive("thickness", thickness)?;
        self.line_thickness = thickness;
        Ok(())
    }

    pub fn set_line_color(&mut self, color: Color) {
        self.line_color = color;
    }

    pub fn set_mode(&mut self, mode: DrawingMode) {
        self.mode = mode;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub tools: ToolSettings,
    /// Upper bound on pixels per rendered page.
    pub max_raster_pixels: u64,
    /// Fixed baseline drop for exported text labels, in points. When unset
    /// the converted font size is used.
    pub text_baseline: Option<f64>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self { tools: ToolSettings::default(), max_raster_pixels: 40_000_000, text_baseline: None }
    }
}

impl Preferences {
    /// Check values that arrived without going through the setters, such as
    /// a hand-edited config file.
    pub fn validate(&self) -> Result<(), InvalidAttribute> {
        let mut tools = ToolSettings::default();
        tools.set_font_size(self.tools.font_size)?;
        tools.set_line_thickness(self.tools.line_thickness)?;

        annotation::check_positive("max_raster_pixels", self.max_raster_pixels as f64)?;
        if let Some(baseline) = self.text_baseline {
            annotation::check_finite("text_baseline", baseline)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_validation_rejects_bad_tool_values() {
        assert!(Preferences::default().validate().is_ok());

        let mut prefs = Preferences::default();
        prefs.tools.font_size = 0.0;
        assert_eq!(prefs.validate().map_err(|err| err.field), Err("font_size"));

        let mut prefs = Preferences::default();
        prefs.tools.line_thickness = f64::NAN;
        assert_eq!(prefs.validate().map_err(|err| err.field), Err("thickness"));

        let prefs = Preferences { max_raster_pixels: 0, ..Preferences::default() };
        assert_eq!(prefs.validate().map_err(|err| err.field), Err("max_raster_pixels"));
    }

    fn three_pages() -> ViewState {
        ViewState::new(3)
    }

    #[test]
    fn set_page_rejects_out_of_range() {
        let mut state = three_pages();

        assert_eq!(
            apply_view_action(&mut state, ViewAction::SetPage(0)),
            Err(RangeError::PageOutOfBounds { page: 0, total_pages: 3 })
        );
        assert_eq!(
            apply_view_action(&mut state, ViewAction::SetPage(4)),
            Err(RangeError::PageOutOfBounds { page: 4, total_pages: 3 })
        );
        assert_eq!(state.current_page, 1);

        apply_view_action(&mut state, ViewAction::SetPage(3)).unwrap();
        assert_eq!(state.current_page, 3);
    }

    #[test]
    fn set_scale_rejects_out_of_range() {
        let mut state = three_pages();

        for scale in [0.49, 3.01, f64::NAN, f64::INFINITY] {
            assert!(apply_view_action(&mut state, ViewAction::SetScale(scale)).is_err());
        }
        assert_eq!(state.scale, DEFAULT_SCALE);

        apply_view_action(&mut state, ViewAction::SetScale(3.0)).unwrap();
        assert_eq!(state.scale, 3.0);
    }

    #[test]
    fn page_stepping_is_clamped() {
        let mut state = three_pages();

        apply_view_action(&mut state, ViewAction::PreviousPage).unwrap();
        assert_eq!(state.current_page, 1);

        for _ in 0..5 {
            apply_view_action(&mut state, ViewAction::NextPage).unwrap();
        }
        assert_eq!(state.current_page, 3);
    }

    #[test]
    fn zoom_steps_are_clamped() {
        let mut state = three_pages();

        apply_view_action(&mut state, ViewAction::ZoomIn).unwrap();
        assert!((state.scale - 1.2).abs() < 1e-9);

        for _ in 0..20 {
            apply_view_action(&mut state, ViewAction::ZoomIn).unwrap();
        }
        assert_eq!(state.scale, MAX_SCALE);

        for _ in 0..20 {
            apply_view_action(&mut state, ViewAction::ZoomOut).unwrap();
        }
        assert_eq!(state.scale, MIN_SCALE);
    }

    #[test]
    fn tool_setters_validate() {
        let mut tools = ToolSettings::default();

        assert!(tools.set_font_size(0.0).is_err());
        assert!(tools.set_line_thickness(f64::NAN).is_err());
        tools.set_font_size(18.0).unwrap();
        assert_eq!(tools.font_size, 18.0);
        assert_eq!(tools.line_color, Color::RED);
    }

    #[test]
    fn preferences_fill_missing_fields_with_defaults() {
        let prefs: Preferences =
            serde_json::from_str(r#"{"tools":{"font_size":16}}"#).expect("deserialize");

        assert_eq!(prefs.tools.font_size, 16.0);
        assert_eq!(prefs.tools.line_thickness, 2.0);
        assert_eq!(prefs.max_raster_pixels, Preferences::default().max_raster_pixels);
        assert_eq!(prefs.text_baseline, None);
    }
}
