//! Burn annotations into a copy of the original PDF.

use crate::error::ExportError;
use doc_model::{Annotation, PageGeometry, Preferences};
use pdf_engine::{
    is_win_ansi_lossless, EditableDocument, EditablePage, PdfEngineError, RasterSize, RgbColor,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const EXPORT_FILE_NAME: &str = "annotated-document.pdf";

/// Distance from a label's anchor down to its text baseline.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TextBaseline {
    /// One converted font size below the anchor, so the label's top edge
    /// sits at the anchor.
    #[default]
    FontSize,
    /// A fixed drop in points.
    Fixed(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExportOptions {
    pub text_baseline: TextBaseline,
}

impl ExportOptions {
    pub fn from_preferences(preferences: &Preferences) -> Self {
        let text_baseline =
            preferences.text_baseline.map_or(TextBaseline::FontSize, TextBaseline::Fixed);
        Self { text_baseline }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Everything an export needs, detached from the session so it can run on
/// another thread.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub(crate) original_bytes: Arc<[u8]>,
    pub(crate) annotations: Vec<Annotation>,
    pub(crate) raster_sizes: BTreeMap<u32, RasterSize>,
    pub(crate) options: ExportOptions,
}

impl ExportJob {
    pub fn annotation_count(&self) -> usize {
        self.annotations.len()
    }

    pub fn run(&self) -> Result<ExportedFile, ExportError> {
        let bytes = export_annotated(
            &self.original_bytes,
            &self.annotations,
            &self.raster_sizes,
            &self.options,
        )?;
        Ok(ExportedFile { file_name: EXPORT_FILE_NAME.to_owned(), bytes })
    }
}

/// Draw `annotations` onto a fresh parse of `original_bytes`.
///
/// `raster_sizes` maps 1-based page numbers to the unscaled raster size of
/// that page, which anchors the pixel to point ratio.
pub fn export_annotated(
    original_bytes: &[u8],
    annotations: &[Annotation],
    raster_sizes: &BTreeMap<u32, RasterSize>,
    options: &ExportOptions,
) -> Result<Vec<u8>, ExportError> {
    if original_bytes.is_empty() {
        return Err(ExportError::NoDocument);
    }
    if annotations.is_empty() {
        return Err(ExportError::NoAnnotations);
    }

    let mut by_page: BTreeMap<u32, Vec<&Annotation>> = BTreeMap::new();
    for annotation in annotations {
        by_page.entry(annotation.page()).or_default().push(annotation);
    }

    let mut document = EditableDocument::open(original_bytes)?;
    for (&page, page_annotations) in &by_page {
        let raster = raster_sizes.get(&page).ok_or(ExportError::MissingRasterSize { page })?;
        let page_index = page.checked_sub(1).ok_or(PdfEngineError::PageOutOfRange {
            page,
            page_count: document.page_count(),
        })?;

        let mut target = document.page(page_index)?;
        let size = target.size();
        let geometry = PageGeometry {
            width_pt: f64::from(size.width_pt),
            height_pt: f64::from(size.height_pt),
            raster_width_px: f64::from(raster.width_px),
            raster_height_px: f64::from(raster.height_px),
        };

        debug!(page, annotations = page_annotations.len(), "drawing page annotations");
        for annotation in page_annotations {
            draw(&mut target, &geometry, annotation, options)?;
        }
    }

    let bytes = document.serialize()?;
    info!(
        pages = by_page.len(),
        annotations = annotations.len(),
        bytes = bytes.len(),
        "exported annotated document"
    );
    Ok(bytes)
}

fn draw(
    target: &mut EditablePage<'_>,
    geometry: &PageGeometry,
    annotation: &Annotation,
    options: &ExportOptions,
) -> Result<(), PdfEngineError> {
    match annotation {
        Annotation::Text(text) => {
            if !is_win_ansi_lossless(&text.text) {
                warn!(id = %text.id, "label has characters outside WinAnsi; they export as '?'");
            }

            let font_size = geometry.to_pdf_len(text.font_size, text.scale);
            let baseline = match options.text_baseline {
                TextBaseline::FontSize => font_size,
                TextBaseline::Fixed(offset) => offset,
            };
            target.draw_text(
                &text.text,
                geometry.to_pdf_x(text.x, text.scale) as f32,
                geometry.to_pdf_y(text.y, text.scale, baseline) as f32,
                font_size as f32,
                RgbColor::BLACK,
            )
        }
        Annotation::Line(line) => {
            let [r, g, b] = line.color.to_normalized();
            target.draw_line(
                geometry.to_pdf_x(line.x1, line.scale) as f32,
                geometry.to_pdf_y(line.y1, line.scale, 0.0) as f32,
                geometry.to_pdf_x(line.x2, line.scale) as f32,
                geometry.to_pdf_y(line.y2, line.scale, 0.0) as f32,
                geometry.to_pdf_len(line.thickness, line.scale) as f32,
                RgbColor::new(r, g, b),
            )
        }
    }
}
