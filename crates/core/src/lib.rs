//! PDF annotator core
//!
//! Document session, page render jobs and the export pipeline that burns
//! annotations into a copy of the original PDF.

pub mod error;
pub mod export;
pub mod session;

pub use error::{ExportError, LoadError, RenderError, SessionError};
pub use export::{
    export_annotated, ExportJob, ExportOptions, ExportedFile, TextBaseline, EXPORT_FILE_NAME,
};
pub use session::{
    DocumentInfo, DocumentSession, RenderJob, RenderOutcome, RenderedPage,
};
