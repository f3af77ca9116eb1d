//! Editable view of a PDF for drawing vector annotations.
//!
//! Drawing commands are buffered per page and written out on
//! [`EditableDocument::serialize`]. Each touched page gets its original
//! content wrapped in `q`/`Q` and one appended content stream, so the
//! annotations never inherit graphics state left over by the page.

use crate::page_tree;
use crate::{PageSize, PdfEngineError};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;
use tracing::debug;

/// Resource name of the font added for text annotations.
const ANNOTATION_FONT: &str = "AnnotHelv";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl RgbColor {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    fn operands(self) -> Vec<Object> {
        vec![real(self.r), real(self.g), real(self.b)]
    }
}

#[derive(Debug, Default)]
struct PageDrawing {
    operations: Vec<Operation>,
    uses_font: bool,
}

/// A parsed PDF plus the drawing commands queued against its pages.
#[derive(Debug)]
pub struct EditableDocument {
    doc: Document,
    pages: Vec<ObjectId>,
    drawings: BTreeMap<u32, PageDrawing>,
}

impl EditableDocument {
    pub fn open(bytes: &[u8]) -> Result<Self, PdfEngineError> {
        let doc = Document::load_mem(bytes)?;
        if doc.trailer.get(b"Encrypt").is_ok() {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(PdfEngineError::Backend("document has no pages".to_owned()));
        }

        Ok(Self { doc, pages, drawings: BTreeMap::new() })
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Drawing surface for a zero-based page.
    pub fn page(&mut self, page_index: u32) -> Result<EditablePage<'_>, PdfEngineError> {
        let page_id = *self.pages.get(page_index as usize).ok_or(
            PdfEngineError::PageOutOfRange { page: page_index, page_count: self.page_count() },
        )?;
        let media_box = page_tree::media_box(&self.doc, page_id);
        let drawing = self.drawings.entry(page_index).or_default();

        Ok(EditablePage { media_box, drawing })
    }

    /// Write every queued drawing into the document and save it.
    pub fn serialize(mut self) -> Result<Vec<u8>, PdfEngineError> {
        let drawings = std::mem::take(&mut self.drawings);
        let mut font_id = None;

        for (page_index, drawing) in drawings {
            if drawing.operations.is_empty() {
                continue;
            }
            let page_id = self.pages[page_index as usize];

            if drawing.uses_font {
                let font = *font_id.get_or_insert_with(|| self.add_font());
                self.install_font(page_id, font)?;
            }

            debug!(page_index, operations = drawing.operations.len(), "appending annotation content");
            self.append_operations(page_id, drawing.operations)?;
        }

        let mut output = Vec::new();
        self.doc.save_to(&mut output)?;
        Ok(output)
    }

    fn add_font(&mut self) -> ObjectId {
        self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ]))
    }

    /// Give the page its own resource dictionary carrying the annotation font.
    ///
    /// Resources may be inherited or shared with other pages, so the page
    /// receives an inline copy rather than a mutation of the shared object.
    fn install_font(&mut self, page_id: ObjectId, font_id: ObjectId) -> Result<(), PdfEngineError> {
        let mut resources = page_tree::inherited(&self.doc, page_id, b"Resources")
            .and_then(|object| object.as_dict().ok())
            .cloned()
            .unwrap_or_else(Dictionary::new);

        let mut fonts = resources
            .get(b"Font")
            .ok()
            .and_then(|object| page_tree::resolve(&self.doc, object))
            .and_then(|object| object.as_dict().ok())
            .cloned()
            .unwrap_or_else(Dictionary::new);
        fonts.set(ANNOTATION_FONT, Object::Reference(font_id));
        resources.set("Font", Object::Dictionary(fonts));

        self.page_dictionary_mut(page_id)?.set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    fn append_operations(
        &mut self,
        page_id: ObjectId,
        operations: Vec<Operation>,
    ) -> Result<(), PdfEngineError> {
        let mut wrapped = Vec::with_capacity(operations.len() + 3);
        wrapped.push(Operation::new("Q", vec![]));
        wrapped.push(Operation::new("q", vec![]));
        wrapped.extend(operations);
        wrapped.push(Operation::new("Q", vec![]));
        let encoded = Content { operations: wrapped }.encode()?;

        let mut contents = self.existing_contents(page_id)?;
        let prefix_id = self.doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let suffix_id = self.doc.add_object(Stream::new(Dictionary::new(), encoded));
        contents.insert(0, Object::Reference(prefix_id));
        contents.push(Object::Reference(suffix_id));

        self.page_dictionary_mut(page_id)?.set("Contents", Object::Array(contents));
        Ok(())
    }

    /// Content stream references of a page, flattening an indirect array.
    fn existing_contents(&self, page_id: ObjectId) -> Result<Vec<Object>, PdfEngineError> {
        let page = self.doc.get_dictionary(page_id)?;
        let contents = match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match self.doc.get_object(*id)? {
                Object::Array(items) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        Ok(contents)
    }

    fn page_dictionary_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary, PdfEngineError> {
        Ok(self.doc.get_object_mut(page_id)?.as_dict_mut()?)
    }
}

/// Drawing surface for one page, in PDF user space relative to the
/// lower-left corner of the page's media box.
#[derive(Debug)]
pub struct EditablePage<'a> {
    media_box: [f32; 4],
    drawing: &'a mut PageDrawing,
}

impl EditablePage<'_> {
    pub fn size(&self) -> PageSize {
        let [x0, y0, x1, y1] = self.media_box;
        PageSize { width_pt: x1 - x0, height_pt: y1 - y0 }
    }

    /// Draw a single line of Helvetica text with its baseline at `(x, y)`.
    pub fn draw_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        size: f32,
        color: RgbColor,
    ) -> Result<(), PdfEngineError> {
        if !(x.is_finite() && y.is_finite()) {
            return Err(PdfEngineError::InvalidDrawing(format!("text origin ({x}, {y})")));
        }
        if !(size.is_finite() && size > 0.0) {
            return Err(PdfEngineError::InvalidDrawing(format!("font size {size}")));
        }

        let [x0, y0, ..] = self.media_box;
        self.drawing.uses_font = true;
        self.drawing.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("rg", color.operands()),
            Operation::new("Tf", vec![Object::Name(ANNOTATION_FONT.as_bytes().to_vec()), real(size)]),
            Operation::new("Td", vec![real(x + x0), real(y + y0)]),
            Operation::new("Tj", vec![Object::String(win_ansi(text), StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ]);
        Ok(())
    }

    pub fn draw_line(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
        color: RgbColor,
    ) -> Result<(), PdfEngineError> {
        if ![x1, y1, x2, y2].iter().all(|value| value.is_finite()) {
            return Err(PdfEngineError::InvalidDrawing(format!(
                "line ({x1}, {y1}) -> ({x2}, {y2})"
            )));
        }
        if !(width.is_finite() && width > 0.0) {
            return Err(PdfEngineError::InvalidDrawing(format!("line width {width}")));
        }

        let [x0, y0, ..] = self.media_box;
        self.drawing.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("RG", color.operands()),
            Operation::new("w", vec![real(width)]),
            Operation::new("J", vec![Object::Integer(1)]),
            Operation::new("m", vec![real(x1 + x0), real(y1 + y0)]),
            Operation::new("l", vec![real(x2 + x0), real(y2 + y0)]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }
}

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

/// WinAnsi byte for a character, `None` when it has no printable mapping.
fn win_ansi_byte(ch: char) -> Option<u8> {
    match u32::from(ch) {
        code @ (0x20..=0x7e | 0xa0..=0xff) => Some(code as u8),
        0x00..=0x1f | 0x7f => Some(b' '),
        _ => None,
    }
}

/// Encode text for the standard WinAnsi Helvetica font.
///
/// Characters outside printable Latin-1 (including the C1 range) become
/// `?`; control characters become spaces.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(|ch| win_ansi_byte(ch).unwrap_or(b'?')).collect()
}

/// True when [`EditablePage::draw_text`] writes `text` without substituting `?`.
pub fn is_win_ansi_lossless(text: &str) -> bool {
    text.chars().all(|ch| win_ansi_byte(ch).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn page_operations(bytes: &[u8], page_index: usize) -> Vec<Operation> {
        let doc = Document::load_mem(bytes).expect("output should parse");
        let page_id = doc.get_pages().into_values().nth(page_index).expect("page should exist");
        let content = doc.get_page_content(page_id).expect("content should decode");
        Content::decode(&content).expect("content should parse").operations
    }

    fn number(object: &Object) -> f32 {
        match object {
            Object::Integer(value) => *value as f32,
            Object::Real(value) => *value as f32,
            other => panic!("expected a number, got {other:?}"),
        }
    }

    fn operators(operations: &[Operation]) -> Vec<&str> {
        operations.iter().map(|op| op.operator.as_str()).collect()
    }

    #[test]
    fn draw_text_appends_text_object_with_font() {
        let mut doc = EditableDocument::open(&fixtures::sample_pdf(1)).expect("open should succeed");
        doc.page(0)
            .expect("page should exist")
            .draw_text("Hello", 50.0, 700.0, 12.0, RgbColor::BLACK)
            .expect("draw should succeed");
        let bytes = doc.serialize().expect("serialize should succeed");

        let operations = page_operations(&bytes, 0);
        let ops = operators(&operations);
        assert_eq!(ops.first(), Some(&"q"));
        assert_eq!(ops.last(), Some(&"Q"));
        assert!(ops.contains(&"Tj"));

        let tj = operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .last()
            .expect("annotation Tj should exist");
        assert!(matches!(&tj.operands[0], Object::String(text, _) if text == b"Hello"));

        let reloaded = Document::load_mem(&bytes).expect("output should parse");
        let page_id = reloaded.get_pages()[&1];
        let fonts = page_tree::inherited(&reloaded, page_id, b"Resources")
            .and_then(|resources| resources.as_dict().ok())
            .and_then(|resources| resources.get(b"Font").ok())
            .and_then(|fonts| page_tree::resolve(&reloaded, fonts))
            .and_then(|fonts| fonts.as_dict().ok())
            .expect("page should have fonts");
        assert!(fonts.has(ANNOTATION_FONT.as_bytes()));
        assert!(fonts.has(b"F1"), "existing fonts are kept");
    }

    #[test]
    fn draw_line_appends_stroke() {
        let mut doc = EditableDocument::open(&fixtures::sample_pdf(2)).expect("open should succeed");
        doc.page(1)
            .expect("page should exist")
            .draw_line(10.0, 20.0, 110.0, 20.0, 3.0, RgbColor::new(1.0, 0.0, 0.0))
            .expect("draw should succeed");
        let bytes = doc.serialize().expect("serialize should succeed");

        let operations = page_operations(&bytes, 1);
        let ops = operators(&operations);
        assert!(ops.contains(&"RG"));
        assert!(ops.contains(&"S"));

        let untouched = page_operations(&bytes, 0);
        assert!(!operators(&untouched).contains(&"RG"));
    }

    #[test]
    fn coordinates_are_offset_by_media_box_origin() {
        let bytes = fixtures::sample_pdf_with_origin([100.0, 50.0], crate::PageSize::default());
        let mut doc = EditableDocument::open(&bytes).expect("open should succeed");
        let mut page = doc.page(0).expect("page should exist");
        assert_eq!(page.size(), crate::PageSize::default());
        page.draw_line(0.0, 0.0, 10.0, 10.0, 1.0, RgbColor::BLACK).expect("draw should succeed");
        let bytes = doc.serialize().expect("serialize should succeed");

        let operations = page_operations(&bytes, 0);
        let move_to = operations.iter().find(|op| op.operator == "m").expect("m should exist");
        let origin: Vec<f32> = move_to.operands.iter().map(number).collect();
        assert_eq!(origin, vec![100.0, 50.0]);
    }

    #[test]
    fn page_out_of_range_is_rejected() {
        let mut doc = EditableDocument::open(&fixtures::sample_pdf(1)).expect("open should succeed");
        let err = doc.page(1).expect_err("page 1 does not exist");

        assert!(matches!(err, PdfEngineError::PageOutOfRange { page: 1, page_count: 1 }));
    }

    #[test]
    fn invalid_drawing_is_rejected() {
        let mut doc = EditableDocument::open(&fixtures::sample_pdf(1)).expect("open should succeed");
        let mut page = doc.page(0).expect("page should exist");

        assert!(page.draw_text("x", f32::NAN, 0.0, 12.0, RgbColor::BLACK).is_err());
        assert!(page.draw_text("x", 0.0, 0.0, 0.0, RgbColor::BLACK).is_err());
        assert!(page.draw_line(0.0, 0.0, 1.0, 1.0, -1.0, RgbColor::BLACK).is_err());
    }

    #[test]
    fn serialize_without_drawings_keeps_page_count() {
        let doc = EditableDocument::open(&fixtures::sample_pdf(3)).expect("open should succeed");
        let bytes = doc.serialize().expect("serialize should succeed");

        let reloaded = Document::load_mem(&bytes).expect("output should parse");
        assert_eq!(reloaded.get_pages().len(), 3);
    }

    #[test]
    fn win_ansi_replaces_unmappable_characters() {
        assert_eq!(win_ansi("café"), b"caf\xe9".to_vec());
        assert_eq!(win_ansi("a\tb"), b"a b".to_vec());
        assert_eq!(win_ansi("日本"), b"??".to_vec());
        assert_eq!(win_ansi("a\u{85}b"), b"a?b".to_vec());
    }

    #[test]
    fn lossless_check_matches_encoder() {
        assert!(is_win_ansi_lossless("café au lait"));
        assert!(is_win_ansi_lossless("tab\there"));
        assert!(!is_win_ansi_lossless("日本"));
        assert!(!is_win_ansi_lossless("next\u{85}line"));
        assert!(!is_win_ansi_lossless("\u{9f}"));
    }
}
