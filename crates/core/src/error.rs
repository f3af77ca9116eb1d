use doc_model::{RangeError, StoreError};
use pdf_engine::PdfEngineError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("no bytes to load")]
    Empty,
    #[error("not a PDF file (missing %PDF- header)")]
    InvalidFormat,
    #[error("failed to parse PDF: {0}")]
    ParseFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("render cancelled")]
    Cancelled,
    #[error("failed to rasterize page: {0}")]
    RasterFailure(String),
}

impl From<PdfEngineError> for RenderError {
    fn from(value: PdfEngineError) -> Self {
        match value {
            PdfEngineError::Cancelled => Self::Cancelled,
            other => Self::RasterFailure(other.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no document loaded")]
    NoDocument,
    #[error("no annotations to export")]
    NoAnnotations,
    #[error("no raster size known for page {page}")]
    MissingRasterSize { page: u32 },
    #[error("failed to write annotated PDF: {0}")]
    WriteFailure(#[from] PdfEngineError),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no document loaded")]
    NoDocument,
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Render(#[from] RenderError),
}
