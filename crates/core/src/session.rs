//! Document session: one open PDF, its view state and its annotations.
//!
//! All state changes happen on the thread that owns the session. Renders
//! and exports are split out as `Send` jobs so a caller can run them on a
//! worker thread and hand the outcome back.

use crate::error::{ExportError, LoadError, RenderError, SessionError};
use crate::export::{ExportJob, ExportOptions, ExportedFile};
use annotator_scheduler::{FlightTicket, SingleFlight};
use doc_model::gesture::{AnnotationDrag, LineGesture};
use doc_model::transform::{self, ViewAnnotation};
use doc_model::{
    apply_view_action, AnnotationDraft, AnnotationId, AnnotationPatch, AnnotationStore, Color,
    LineDraft, Point, Preferences, RangeError, StoreError, TextDraft, ToolSettings, ViewAction,
    ViewState,
};
use pdf_engine::{
    DocumentHandle, PageSize, PdfEngine, PdfEngineError, RasterSize, RenderRequest,
    RgbaImage,
};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub total_pages: u32,
    pub page_sizes: Vec<PageSize>,
}

#[derive(Debug)]
struct OpenDocument {
    handle: DocumentHandle,
    original_bytes: Arc<[u8]>,
    /// Unscaled raster size per 1-based page, filled in by renders.
    raster_sizes: BTreeMap<u32, RasterSize>,
}

/// A page render detached from the session.
#[derive(Debug)]
pub struct RenderJob<E> {
    engine: Arc<RwLock<E>>,
    handle: DocumentHandle,
    page: u32,
    scale: f64,
    ticket: FlightTicket,
}

impl<E: PdfEngine> RenderJob<E> {
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn generation(&self) -> u64 {
        self.ticket.generation()
    }

    /// Rasterize the page. Safe to call from a worker thread.
    pub fn run(self) -> RenderOutcome {
        let result = self.rasterize();
        RenderOutcome { page: self.page, scale: self.scale, ticket: self.ticket, result }
    }

    fn rasterize(&self) -> Result<(RgbaImage, RasterSize), RenderError> {
        let engine = self
            .engine
            .read()
            .map_err(|_| RenderError::RasterFailure("engine lock poisoned".to_owned()))?;
        let page_index = self.page - 1;

        let raster_size = engine.raster_size(self.handle, page_index)?;
        let request = RenderRequest { page_index, scale: self.scale as f32 };
        let image = engine.render_page(self.handle, request, self.ticket.token())?;
        Ok((image, raster_size))
    }
}

/// Result of [`RenderJob::run`], applied with [`DocumentSession::apply_render`].
#[derive(Debug)]
pub struct RenderOutcome {
    page: u32,
    scale: f64,
    ticket: FlightTicket,
    result: Result<(RgbaImage, RasterSize), RenderError>,
}

#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub page: u32,
    pub scale: f64,
    pub image: RgbaImage,
    /// Size of the same page rendered at scale 1.0.
    pub raster_size: RasterSize,
}

pub struct DocumentSession<E> {
    engine: Arc<RwLock<E>>,
    preferences: Preferences,
    document: Option<OpenDocument>,
    view: ViewState,
    store: AnnotationStore,
    tools: ToolSettings,
    renders: SingleFlight,
}

impl<E: PdfEngine> DocumentSession<E> {
    pub fn new(engine: E, preferences: Preferences) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
            tools: preferences.tools.clone(),
            preferences,
            document: None,
            view: ViewState::default(),
            store: AnnotationStore::new(),
            renders: SingleFlight::new(),
        }
    }

    /// Open `bytes`, replacing whatever was loaded before.
    ///
    /// The rasterizer receives its own copy; a second copy is kept untouched
    /// for export. On failure the current document and its annotations stay
    /// as they were.
    pub fn load(&mut self, bytes: &[u8]) -> Result<DocumentInfo, LoadError> {
        if bytes.is_empty() {
            return Err(LoadError::Empty);
        }
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(LoadError::InvalidFormat);
        }

        let mut engine = self
            .engine
            .write()
            .map_err(|_| LoadError::ParseFailure("engine lock poisoned".to_owned()))?;
        let handle =
            engine.open(bytes).map_err(|error| LoadError::ParseFailure(error.to_string()))?;

        let described = describe(&*engine, handle);
        let info = match described {
            Ok(info) if info.total_pages > 0 => info,
            outcome => {
                if let Err(error) = engine.close(handle) {
                    warn!(%error, "failed to close rejected document");
                }
                let reason = match outcome {
                    Err(error) => error.to_string(),
                    Ok(_) => "document has no pages".to_owned(),
                };
                return Err(LoadError::ParseFailure(reason));
            }
        };
        drop(engine);

        self.reset();
        let original_bytes: Arc<[u8]> = Arc::from(bytes);
        info!(pages = info.total_pages, bytes = original_bytes.len(), "loaded document");
        self.document =
            Some(OpenDocument { handle, original_bytes, raster_sizes: BTreeMap::new() });
        self.view = ViewState::new(info.total_pages);
        Ok(info)
    }

    /// Close the document and drop its annotations. Tool settings survive.
    pub fn reset(&mut self) {
        if self.renders.cancel() {
            debug!("cancelled in-flight render on reset");
        }
        self.store.clear();
        self.view = ViewState::default();

        if let Some(document) = self.document.take() {
            match self.engine.write() {
                Ok(mut engine) => {
                    if let Err(error) = engine.close(document.handle) {
                        warn!(%error, "failed to close document");
                    }
                }
                Err(_) => warn!("engine lock poisoned; document handle leaked"),
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    pub fn original_bytes(&self) -> Option<&[u8]> {
        self.document.as_ref().map(|document| &*document.original_bytes)
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn current_page(&self) -> u32 {
        self.view.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.view.total_pages
    }

    pub fn scale(&self) -> f64 {
        self.view.scale
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn tools(&self) -> &ToolSettings {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolSettings {
        &mut self.tools
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.store
    }

    /// Unscaled raster size recorded for a 1-based page.
    pub fn raster_size(&self, page: u32) -> Option<RasterSize> {
        self.document.as_ref()?.raster_sizes.get(&page).copied()
    }

    pub fn set_page(&mut self, page: u32) -> Result<(), RangeError> {
        apply_view_action(&mut self.view, ViewAction::SetPage(page))
    }

    pub fn set_scale(&mut self, scale: f64) -> Result<(), RangeError> {
        apply_view_action(&mut self.view, ViewAction::SetScale(scale))
    }

    pub fn next_page(&mut self) -> u32 {
        self.step(ViewAction::NextPage);
        self.view.current_page
    }

    pub fn previous_page(&mut self) -> u32 {
        self.step(ViewAction::PreviousPage);
        self.view.current_page
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.step(ViewAction::ZoomIn);
        self.view.scale
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.step(ViewAction::ZoomOut);
        self.view.scale
    }

    fn step(&mut self, action: ViewAction) {
        // stepping actions clamp and cannot fail
        let _ = apply_view_action(&mut self.view, action);
    }

    /// Issue a render, superseding the one in flight.
    pub fn request_render(&mut self, page: u32, scale: f64) -> Result<RenderJob<E>, SessionError> {
        let document = self.document.as_ref().ok_or(SessionError::NoDocument)?;
        let mut target = self.view;
        apply_view_action(&mut target, ViewAction::SetPage(page))?;
        apply_view_action(&mut target, ViewAction::SetScale(scale))?;

        let ticket = self.renders.begin();
        debug!(page, scale, generation = ticket.generation(), "render requested");
        Ok(RenderJob {
            engine: Arc::clone(&self.engine),
            handle: document.handle,
            page,
            scale,
            ticket,
        })
    }

    /// Accept a finished render if it is still the latest one.
    ///
    /// Superseded and cancelled renders yield `Ok(None)`.
    pub fn apply_render(
        &mut self,
        outcome: RenderOutcome,
    ) -> Result<Option<RenderedPage>, RenderError> {
        let generation = outcome.ticket.generation();
        if !self.renders.finish(&outcome.ticket) {
            debug!(generation, page = outcome.page, "discarding superseded render");
            return Ok(None);
        }

        match outcome.result {
            Ok((image, raster_size)) => {
                if let Some(document) = self.document.as_mut() {
                    document.raster_sizes.insert(outcome.page, raster_size);
                }
                Ok(Some(RenderedPage {
                    page: outcome.page,
                    scale: outcome.scale,
                    image,
                    raster_size,
                }))
            }
            Err(RenderError::Cancelled) => {
                debug!(generation, page = outcome.page, "render cancelled");
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    /// Request, run and apply a render on the calling thread.
    pub fn render_page(
        &mut self,
        page: u32,
        scale: f64,
    ) -> Result<Option<RenderedPage>, SessionError> {
        let job = self.request_render(page, scale)?;
        let outcome = job.run();
        Ok(self.apply_render(outcome)?)
    }

    pub fn add_text_annotation(
        &mut self,
        x: f64,
        y: f64,
        text: &str,
        font_size: f64,
    ) -> Result<AnnotationId, SessionError> {
        self.require_document()?;
        let captured = transform::capture(Point::new(x, y), self.view.scale);
        let draft = AnnotationDraft::Text(TextDraft {
            page: self.view.current_page,
            x: captured.point.x,
            y: captured.point.y,
            scale: captured.scale,
            text: text.to_owned(),
            font_size,
        });
        Ok(self.store.add(draft)?)
    }

    /// Text label with the current tool font size.
    pub fn add_text_with_tools(
        &mut self,
        point: Point,
        text: &str,
    ) -> Result<AnnotationId, SessionError> {
        self.add_text_annotation(point.x, point.y, text, self.tools.font_size)
    }

    pub fn add_line_annotation(
        &mut self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        thickness: f64,
        color: Color,
    ) -> Result<AnnotationId, SessionError> {
        self.require_document()?;
        let draft = AnnotationDraft::Line(LineDraft {
            page: self.view.current_page,
            x1,
            y1,
            x2,
            y2,
            scale: self.view.scale,
            thickness,
            color,
        });
        Ok(self.store.add(draft)?)
    }

    /// Add a pre-built draft, checking its page against the open document.
    pub fn add_draft(&mut self, draft: AnnotationDraft) -> Result<AnnotationId, SessionError> {
        self.require_document()?;
        let page = draft.page();
        if page == 0 || page > self.view.total_pages {
            return Err(RangeError::PageOutOfBounds { page, total_pages: self.view.total_pages }
                .into());
        }
        Ok(self.store.add(draft)?)
    }

    pub fn begin_line_gesture(&self, point: Point) -> LineGesture {
        LineGesture::begin(point, self.view.scale)
    }

    /// Commit a line gesture with the current tool settings. Short drags
    /// add nothing.
    pub fn finish_line_gesture(
        &mut self,
        gesture: LineGesture,
        point: Point,
    ) -> Result<Option<AnnotationId>, SessionError> {
        self.require_document()?;
        let Some(draft) = gesture.finish(
            point,
            self.view.current_page,
            self.tools.line_thickness,
            self.tools.line_color,
        ) else {
            debug!("discarding short line gesture");
            return Ok(None);
        };
        Ok(Some(self.store.add(draft)?))
    }

    /// The single entry point for changing an existing annotation.
    pub fn update_annotation(
        &mut self,
        id: AnnotationId,
        patch: &AnnotationPatch,
    ) -> Result<(), SessionError> {
        Ok(self.store.update(id, patch)?)
    }

    pub fn delete_annotation(&mut self, id: AnnotationId) -> bool {
        self.store.delete(id)
    }

    pub fn clear_annotations(&mut self) {
        self.store.clear();
    }

    /// Annotations of the current page, rescaled to the current zoom.
    pub fn visible_annotations(&self) -> Vec<ViewAnnotation> {
        self.store
            .list_for_page(self.view.current_page)
            .into_iter()
            .map(|annotation| transform::to_view(annotation, self.view.scale))
            .collect()
    }

    pub fn annotation_at(&self, point: Point, tolerance: f64) -> Option<AnnotationId> {
        self.store.hit_test(self.view.current_page, point, self.view.scale, tolerance)
    }

    pub fn begin_drag(
        &self,
        id: AnnotationId,
        pointer: Point,
    ) -> Result<AnnotationDrag, SessionError> {
        let annotation = self.store.get(id).ok_or(StoreError::NotFound(id))?;
        Ok(AnnotationDrag::start(annotation, pointer, self.view.scale))
    }

    /// Write the drag's final position through [`Self::update_annotation`].
    pub fn commit_drag(&mut self, drag: AnnotationDrag, pointer: Point) -> Result<(), SessionError> {
        let (id, patch) = drag.finish(pointer);
        self.update_annotation(id, &patch)
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions::from_preferences(&self.preferences)
    }

    /// Snapshot everything an export needs.
    ///
    /// Pages that were never rendered get their raster size from the engine.
    pub fn export_job(&self) -> Result<ExportJob, ExportError> {
        let document = self.document.as_ref().ok_or(ExportError::NoDocument)?;
        if self.store.is_empty() {
            return Err(ExportError::NoAnnotations);
        }

        let mut raster_sizes = BTreeMap::new();
        for page in self.store.pages() {
            let size = match document.raster_sizes.get(&page) {
                Some(size) => *size,
                None => self.query_raster_size(document.handle, page)?,
            };
            raster_sizes.insert(page, size);
        }

        Ok(ExportJob {
            original_bytes: Arc::clone(&document.original_bytes),
            annotations: self.store.list_all().to_vec(),
            raster_sizes,
            options: self.export_options(),
        })
    }

    pub fn export_document(&self) -> Result<ExportedFile, ExportError> {
        self.export_job()?.run()
    }

    fn query_raster_size(
        &self,
        handle: DocumentHandle,
        page: u32,
    ) -> Result<RasterSize, ExportError> {
        let engine = self
            .engine
            .read()
            .map_err(|_| PdfEngineError::Backend("engine lock poisoned".to_owned()))?;
        Ok(engine.raster_size(handle, page.saturating_sub(1))?)
    }

    fn require_document(&self) -> Result<(), SessionError> {
        if self.document.is_some() {
            Ok(())
        } else {
            Err(SessionError::NoDocument)
        }
    }
}

fn describe<E: PdfEngine>(engine: &E, handle: DocumentHandle) -> Result<DocumentInfo, PdfEngineError> {
    let total_pages = engine.page_count(handle)?;
    let page_sizes =
        (0..total_pages).map(|index| engine.page_size(handle, index)).collect::<Result<_, _>>()?;
    Ok(DocumentInfo { total_pages, page_sizes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::EXPORT_FILE_NAME;
    use doc_model::Annotation;
    use lopdf::content::Content;
    use lopdf::{Document, Object};
    use pdf_engine::{fixtures, LopdfEngine};

    fn session() -> DocumentSession<LopdfEngine> {
        DocumentSession::new(LopdfEngine::new(), Preferences::default())
    }

    fn loaded(pages: usize) -> DocumentSession<LopdfEngine> {
        let mut session = session();
        session.load(&fixtures::sample_pdf(pages)).expect("load should succeed");
        session
    }

    #[test]
    fn load_rejects_empty_and_non_pdf_bytes() {
        let mut session = session();

        assert_eq!(session.load(&[]), Err(LoadError::Empty));
        assert_eq!(session.load(b"hello world"), Err(LoadError::InvalidFormat));
        assert!(matches!(
            session.load(b"%PDF-1.7\ngarbage"),
            Err(LoadError::ParseFailure(_))
        ));
        assert!(!session.is_loaded());
    }

    #[test]
    fn load_starts_on_first_page_at_default_scale() {
        let mut session = session();
        let bytes = fixtures::sample_pdf(3);

        let info = session.load(&bytes).expect("load should succeed");

        assert_eq!(info.total_pages, 3);
        assert_eq!(info.page_sizes.len(), 3);
        assert_eq!(session.current_page(), 1);
        assert_eq!(session.scale(), 1.0);
        assert_eq!(session.original_bytes(), Some(bytes.as_slice()));
    }

    #[test]
    fn navigation_guards_keep_page_in_range() {
        let mut session = loaded(3);

        assert!(session.set_page(0).is_err());
        assert!(session.set_page(4).is_err());
        assert_eq!(session.current_page(), 1);

        assert_eq!(session.previous_page(), 1);
        assert_eq!(session.next_page(), 2);
        assert_eq!(session.next_page(), 3);
        assert_eq!(session.next_page(), 3);

        assert!(session.set_scale(0.4).is_err());
        assert_eq!(session.scale(), 1.0);
        assert!((session.zoom_in() - 1.2).abs() < 1e-9);
    }

    #[test]
    fn text_annotation_follows_zoom_and_page() {
        let mut session = loaded(3);
        session.set_page(2).unwrap();
        let id = session.add_text_annotation(100.0, 50.0, "Hi", 12.0).unwrap();

        session.set_page(1).unwrap();
        assert!(session.visible_annotations().is_empty());

        session.set_page(2).unwrap();
        session.set_scale(2.0).unwrap();
        let visible = session.visible_annotations();
        let [ViewAnnotation::Text(text)] = visible.as_slice() else {
            panic!("expected one text annotation, got {visible:?}");
        };
        assert_eq!((text.x, text.y), (200.0, 100.0));
        assert_eq!(text.font_size, 24.0);

        assert!(session.delete_annotation(id));
        assert!(session.annotations().list_for_page(2).is_empty());
    }

    #[test]
    fn annotations_require_a_document() {
        let mut session = session();

        assert!(matches!(
            session.add_text_annotation(1.0, 1.0, "x", 12.0),
            Err(SessionError::NoDocument)
        ));
        assert!(matches!(session.export_document(), Err(ExportError::NoDocument)));
    }

    #[test]
    fn render_records_unscaled_raster_size() {
        let mut session = loaded(1);

        let rendered = session
            .render_page(1, 2.0)
            .expect("render should succeed")
            .expect("latest render should apply");

        assert_eq!((rendered.image.width(), rendered.image.height()), (1224, 1584));
        assert_eq!(rendered.raster_size, RasterSize { width_px: 612, height_px: 792 });
        assert_eq!(session.raster_size(1), Some(rendered.raster_size));
    }

    #[test]
    fn render_rejects_out_of_range_requests() {
        let mut session = loaded(2);

        assert!(matches!(
            session.request_render(3, 1.0),
            Err(SessionError::Range(RangeError::PageOutOfBounds { page: 3, .. }))
        ));
        assert!(matches!(
            session.request_render(1, 5.0),
            Err(SessionError::Range(RangeError::ScaleOutOfBounds { .. }))
        ));
    }

    #[test]
    fn superseded_render_on_worker_is_discarded() {
        let mut session = loaded(2);

        let first = session.request_render(1, 1.0).unwrap();
        let second = session.request_render(2, 1.5).unwrap();

        let first_outcome = std::thread::spawn(move || first.run()).join().unwrap();
        let second_outcome = std::thread::spawn(move || second.run()).join().unwrap();

        assert!(session.apply_render(first_outcome).unwrap().is_none());
        let applied = session.apply_render(second_outcome).unwrap().expect("latest applies");
        assert_eq!(applied.page, 2);
        assert_eq!(session.raster_size(1), None);
    }

    #[test]
    fn completed_but_stale_render_is_discarded() {
        let mut session = loaded(1);

        let stale = session.request_render(1, 1.0).unwrap().run();
        let fresh = session.request_render(1, 2.0).unwrap();

        assert!(session.apply_render(stale).unwrap().is_none());
        let applied = session.apply_render(fresh.run()).unwrap().expect("latest applies");
        assert_eq!(applied.scale, 2.0);
    }

    #[test]
    fn reset_cancels_render_and_keeps_tools() {
        let mut session = loaded(1);
        session.tools_mut().set_font_size(20.0).unwrap();
        session.add_text_annotation(10.0, 10.0, "x", 12.0).unwrap();
        let job = session.request_render(1, 1.0).unwrap();

        session.reset();

        assert!(session.apply_render(job.run()).unwrap().is_none());
        assert!(session.annotations().is_empty());
        assert!(!session.is_loaded());
        assert_eq!(session.tools().font_size, 20.0);
    }

    #[test]
    fn loading_new_document_clears_annotations() {
        let mut session = loaded(1);
        session.add_text_annotation(10.0, 10.0, "x", 12.0).unwrap();

        session.load(&fixtures::sample_pdf(2)).unwrap();

        assert!(session.annotations().is_empty());
        assert_eq!(session.total_pages(), 2);
    }

    #[test]
    fn failed_load_keeps_current_document() {
        let mut session = loaded(2);
        session.set_page(2).unwrap();
        let id = session.add_text_annotation(10.0, 10.0, "keep", 12.0).unwrap();
        let before = session.original_bytes().map(<[u8]>::to_vec);

        let err = session.load(b"%PDF-1.7 garbage").expect_err("garbage should not parse");

        assert!(matches!(err, LoadError::ParseFailure(_)));
        assert!(session.is_loaded());
        assert_eq!(session.total_pages(), 2);
        assert_eq!(session.current_page(), 2);
        assert!(session.annotations().get(id).is_some());
        assert_eq!(session.original_bytes().map(<[u8]>::to_vec), before);
        assert!(session.render_page(1, 1.0).unwrap().is_some());
    }

    #[test]
    fn drag_commits_in_stored_scale() {
        let mut session = loaded(1);
        let id = session.add_text_annotation(100.0, 50.0, "Hi", 12.0).unwrap();
        session.set_scale(2.0).unwrap();

        let pointer = Point::new(205.0, 105.0);
        assert_eq!(session.annotation_at(pointer, 0.0), Some(id));
        let drag = session.begin_drag(id, pointer).unwrap();
        session.commit_drag(drag, Point::new(225.0, 145.0)).unwrap();

        let Some(Annotation::Text(text)) = session.annotations().get(id) else {
            panic!("expected text annotation");
        };
        assert_eq!((text.x, text.y, text.scale), (110.0, 70.0, 1.0));
    }

    #[test]
    fn line_gesture_uses_tool_settings() {
        let mut session = loaded(1);
        session.tools_mut().set_line_thickness(4.0).unwrap();

        let short = session.begin_line_gesture(Point::new(0.0, 0.0));
        assert_eq!(session.finish_line_gesture(short, Point::new(3.0, 3.0)).unwrap(), None);

        let gesture = session.begin_line_gesture(Point::new(0.0, 0.0));
        let id = session
            .finish_line_gesture(gesture, Point::new(50.0, 0.0))
            .unwrap()
            .expect("long drag adds a line");
        let Some(Annotation::Line(line)) = session.annotations().get(id) else {
            panic!("expected line annotation");
        };
        assert_eq!(line.thickness, 4.0);
        assert_eq!(line.color, Color::RED);
    }

    #[test]
    fn update_of_unknown_annotation_fails() {
        let mut session = loaded(1);

        assert!(matches!(
            session.update_annotation(AnnotationId(99), &AnnotationPatch::default()),
            Err(SessionError::Store(StoreError::NotFound(AnnotationId(99))))
        ));
    }

    #[test]
    fn export_runs_on_worker_thread() {
        let mut session = loaded(2);
        session.render_page(1, 1.0).unwrap();
        session.add_line_annotation(0.0, 0.0, 100.0, 0.0, 2.0, Color::RED).unwrap();
        session.set_page(2).unwrap();
        session.add_text_annotation(100.0, 50.0, "Hi", 12.0).unwrap();

        let job = session.export_job().expect("job should build");
        assert_eq!(job.annotation_count(), 2);
        let exported = std::thread::spawn(move || job.run()).join().unwrap().unwrap();

        assert_eq!(exported.file_name, EXPORT_FILE_NAME);
        let doc = Document::load_mem(&exported.bytes).expect("export should parse");
        let page_two = doc.get_pages()[&2];
        let content = doc.get_page_content(page_two).unwrap();
        let operations = Content::decode(&content).unwrap().operations;
        assert!(operations.iter().any(|op| {
            op.operator == "Tj"
                && matches!(&op.operands[0], Object::String(text, _) if text.as_slice() == b"Hi")
        }));

        assert_eq!(session.original_bytes(), Some(fixtures::sample_pdf(2).as_slice()));
    }

    #[test]
    fn export_without_annotations_is_rejected() {
        let session = loaded(1);
        assert!(matches!(session.export_document(), Err(ExportError::NoAnnotations)));
    }

    #[test]
    fn add_draft_checks_page_against_document() {
        let mut session = loaded(2);
        let draft: AnnotationDraft = serde_json::from_str(
            r##"{"type":"line","page":3,"x1":0,"y1":0,"x2":10,"y2":10,"scale":1,"thickness":2,"color":"#ff0000"}"##,
        )
        .unwrap();

        assert!(matches!(
            session.add_draft(draft),
            Err(SessionError::Range(RangeError::PageOutOfBounds { page: 3, total_pages: 2 }))
        ));
    }
}
