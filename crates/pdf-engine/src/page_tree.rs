//! Page tree lookups shared by the rasterizer and the writer.

use crate::PageSize;
use lopdf::{Document, Object, ObjectId};

const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Guards against reference and Parent cycles in malformed files.
const MAX_DEPTH: usize = 32;

/// Follow indirect references until a direct object is reached.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    let mut current = object;
    for _ in 0..MAX_DEPTH {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            direct => return Some(direct),
        }
    }
    None
}

/// Look up a page attribute, walking up the Parent chain for inheritable keys.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;
    for _ in 0..MAX_DEPTH {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// Normalized `[x0, y0, x1, y1]` media box, defaulting to US Letter.
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    inherited(doc, page_id, b"MediaBox")
        .and_then(|object| rectangle(doc, object))
        .unwrap_or(DEFAULT_MEDIA_BOX)
}

pub(crate) fn page_size(doc: &Document, page_id: ObjectId) -> PageSize {
    let [x0, y0, x1, y1] = media_box(doc, page_id);
    PageSize { width_pt: x1 - x0, height_pt: y1 - y0 }
}

fn rectangle(doc: &Document, object: &Object) -> Option<[f32; 4]> {
    let items = object.as_array().ok()?;
    if items.len() != 4 {
        return None;
    }

    let mut values = [0.0_f32; 4];
    for (slot, item) in values.iter_mut().zip(items) {
        *slot = number(resolve(doc, item)?)?;
    }

    let [a, b, c, d] = values;
    let rect = [a.min(c), b.min(d), a.max(c), b.max(d)];
    (rect[2] > rect[0] && rect[3] > rect[1]).then_some(rect)
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}
