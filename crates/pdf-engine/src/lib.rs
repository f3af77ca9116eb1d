use annotator_scheduler::CancellationToken;
use image::{ImageBuffer, Rgba};
use lopdf::Document;
use std::collections::HashMap;
use tracing::debug;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
mod page_tree;
pub mod writer;

pub use writer::{is_win_ansi_lossless, EditableDocument, EditablePage, RgbColor};

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Rows rendered between cancellation checks.
const CANCEL_CHECK_ROWS: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl Default for PageSize {
    fn default() -> Self {
        Self { width_pt: 612.0, height_pt: 792.0 }
    }
}

/// Pixel dimensions of a page raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterSize {
    pub width_px: u32,
    pub height_px: u32,
}

impl RasterSize {
    /// Raster dimensions of `page` rendered at `scale`.
    pub fn of(page: PageSize, scale: f32) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };

        Self {
            width_px: (page.width_pt * scale).round().max(1.0) as u32,
            height_px: (page.height_pt * scale).round().max(1.0) as u32,
        }
    }

    pub fn pixel_count(self) -> u64 {
        u64::from(self.width_px) * u64::from(self.height_px)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub page_index: u32,
    pub scale: f32,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self { page_index: 0, scale: 1.0 }
    }
}

/// Rasterizer settings supplied once by the process entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterConfig {
    /// Upper bound on pixels per rendered page.
    pub max_pixels: u64,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self { max_pixels: 40_000_000 }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse PDF: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("no open document with handle {0}")]
    InvalidHandle(u64),
    #[error("page index {page} is outside a {page_count}-page document")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("raster of {width}x{height} exceeds the limit of {max_pixels} pixels")]
    RasterTooLarge { width: u32, height: u32, max_pixels: u64 },
    #[error("invalid drawing command: {0}")]
    InvalidDrawing(String),
    #[error("render cancelled")]
    Cancelled,
    #[error("{0}")]
    Backend(String),
}

/// Rasterizer contract consumed by the document session.
///
/// Page indices are zero-based.
pub trait PdfEngine {
    /// Parse `bytes` and register the document under a fresh handle.
    fn open(&mut self, bytes: &[u8]) -> Result<DocumentHandle, PdfEngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;
    fn page_size(&self, handle: DocumentHandle, page: u32) -> Result<PageSize, PdfEngineError>;

    /// Unscaled (scale 1.0) raster dimensions of a page.
    fn raster_size(&self, handle: DocumentHandle, page: u32) -> Result<RasterSize, PdfEngineError> {
        Ok(RasterSize::of(self.page_size(handle, page)?, 1.0))
    }

    /// Render a page, polling `cancel` and returning
    /// [`PdfEngineError::Cancelled`] once it fires.
    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
        cancel: &CancellationToken,
    ) -> Result<RgbaImage, PdfEngineError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;
}

/// Built-in backend: page geometry from lopdf, blank page rasters.
#[derive(Debug, Default)]
pub struct LopdfEngine {
    config: RasterConfig,
    last_handle: u64,
    documents: HashMap<DocumentHandle, Vec<PageSize>>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RasterConfig) -> Self {
        Self { config, ..Self::default() }
    }

    fn pages(&self, handle: DocumentHandle) -> Result<&[PageSize], PdfEngineError> {
        self.documents
            .get(&handle)
            .map(Vec::as_slice)
            .ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

/// MediaBox size of every page, in page-tree order.
fn read_page_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, PdfEngineError> {
    if is_encrypted(bytes) {
        return Err(PdfEngineError::EncryptedUnsupported);
    }

    let doc = Document::load_mem(bytes)?;
    let sizes: Vec<PageSize> =
        doc.get_pages().into_values().map(|id| page_tree::page_size(&doc, id)).collect();

    if sizes.is_empty() {
        return Err(PdfEngineError::Backend("document has no pages".to_owned()));
    }
    Ok(sizes)
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, bytes: &[u8]) -> Result<DocumentHandle, PdfEngineError> {
        let sizes = read_page_sizes(bytes)?;

        self.last_handle += 1;
        let handle = DocumentHandle(self.last_handle);
        debug!(handle = handle.raw(), pages = sizes.len(), "opened document");
        self.documents.insert(handle, sizes);

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.pages(handle)?.len() as u32)
    }

    fn page_size(&self, handle: DocumentHandle, page: u32) -> Result<PageSize, PdfEngineError> {
        let pages = self.pages(handle)?;
        pages
            .get(page as usize)
            .copied()
            .ok_or(PdfEngineError::PageOutOfRange { page, page_count: pages.len() as u32 })
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
        cancel: &CancellationToken,
    ) -> Result<RgbaImage, PdfEngineError> {
        let page_size = self.page_size(handle, request.page_index)?;
        let size = RasterSize::of(page_size, request.scale);

        if size.pixel_count() > self.config.max_pixels {
            return Err(PdfEngineError::RasterTooLarge {
                width: size.width_px,
                height: size.height_px,
                max_pixels: self.config.max_pixels,
            });
        }

        let (width, height) = (size.width_px, size.height_px);
        let mut image = RgbaImage::new(width, height);
        let border = Rgba([220, 220, 220, 255]);
        let paper = Rgba([255, 255, 255, 255]);
        let framed = width >= 4 && height >= 4;

        for y in 0..height {
            if y % CANCEL_CHECK_ROWS == 0 && cancel.is_cancelled() {
                return Err(PdfEngineError::Cancelled);
            }

            let edge_row = y == 0 || y == height - 1;
            for x in 0..width {
                let on_border = framed && (edge_row || x == 0 || x == width - 1);
                image.put_pixel(x, y, if on_border { border } else { paper });
            }
        }

        if cancel.is_cancelled() {
            return Err(PdfEngineError::Cancelled);
        }

        Ok(image)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        match self.documents.remove(&handle) {
            Some(_) => Ok(()),
            None => Err(PdfEngineError::InvalidHandle(handle.raw())),
        }
    }
}

fn is_encrypted(bytes: &[u8]) -> bool {
    bytes.windows(b"/Encrypt".len()).any(|window| window == b"/Encrypt")
}
