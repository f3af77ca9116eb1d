//! Small generated PDFs for tests.
//!
//! Every page carries a "Page N" label. The font resources live on the
//! Pages node so pages inherit them, which is the layout writers must cope
//! with when adding their own fonts.

use crate::PageSize;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};

/// `page_count` US Letter pages.
pub fn sample_pdf(page_count: usize) -> Vec<u8> {
    sample_pdf_with_sizes(&vec![PageSize::default(); page_count])
}

/// One page per entry of `sizes`, each with its own media box at the origin.
pub fn sample_pdf_with_sizes(sizes: &[PageSize]) -> Vec<u8> {
    let boxes: Vec<[f32; 4]> =
        sizes.iter().map(|size| [0.0, 0.0, size.width_pt, size.height_pt]).collect();
    build(&boxes)
}

/// A single page whose media box starts at `origin`.
pub fn sample_pdf_with_origin(origin: [f32; 2], size: PageSize) -> Vec<u8> {
    let [x, y] = origin;
    build(&[[x, y, x + size.width_pt, y + size.height_pt]])
}

fn build(media_boxes: &[[f32; 4]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
    )]));

    let mut kids = Vec::with_capacity(media_boxes.len());
    for (index, media_box) in media_boxes.iter().enumerate() {
        let [x0, _, _, y1] = *media_box;
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 18.into()]),
                Operation::new("Td", vec![Object::Real((x0 + 72.0).into()), Object::Real((y1 - 72.0).into())]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("Page {}", index + 1))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_bytes = content.encode().expect("fixture content should encode");
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content_bytes));

        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("MediaBox", Object::Array(media_box.iter().map(|v| Object::Real((*v).into())).collect())),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
            ("Resources", Object::Reference(resources_id)),
        ])),
    );

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).expect("fixture PDF should serialize");
    output
}
