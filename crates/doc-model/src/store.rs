use crate::annotation::{Annotation, AnnotationDraft, AnnotationId, AnnotationPatch, InvalidAttribute, Point};
use crate::transform;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("annotation {0} not found")]
    NotFound(AnnotationId),
    #[error("field `{field}` does not apply to {kind} annotation {id}")]
    IncompatibleField { id: AnnotationId, kind: &'static str, field: &'static str },
    #[error(transparent)]
    InvalidAttribute(#[from] InvalidAttribute),
}

/// Annotations of one document in insertion order, which is also z-order.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
    next_id: u64,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids are never reused, not even after [`clear`](Self::clear).
    pub fn add(&mut self, draft: AnnotationDraft) -> Result<AnnotationId, StoreError> {
        let id = AnnotationId(self.next_id + 1);
        let annotation = draft.into_annotation(id)?;

        self.next_id = id.0;
        self.annotations.push(annotation);
        Ok(id)
    }

    /// Apply `patch` entirely or not at all.
    pub fn update(&mut self, id: AnnotationId, patch: &AnnotationPatch) -> Result<(), StoreError> {
        let slot = self
            .annotations
            .iter_mut()
            .find(|annotation| annotation.id() == id)
            .ok_or(StoreError::NotFound(id))?;

        if let Some(field) = patch.incompatible_field(slot) {
            return Err(StoreError::IncompatibleField { id, kind: slot.kind(), field });
        }

        *slot = patch.applied_to(slot)?;
        Ok(())
    }

    pub fn delete(&mut self, id: AnnotationId) -> bool {
        let before = self.annotations.len();
        self.annotations.retain(|annotation| annotation.id() != id);
        self.annotations.len() != before
    }

    pub fn clear(&mut self) {
        self.annotations.clear();
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|annotation| annotation.id() == id)
    }

    pub fn list_for_page(&self, page: u32) -> Vec<&Annotation> {
        self.annotations.iter().filter(|annotation| annotation.page() == page).collect()
    }

    pub fn list_all(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Pages carrying at least one annotation, ascending.
    pub fn pages(&self) -> Vec<u32> {
        self.annotations.iter().map(Annotation::page).collect::<BTreeSet<_>>().into_iter().collect()
    }

    /// Topmost annotation on `page` under a view-space `point`.
    pub fn hit_test(
        &self,
        page: u32,
        point: Point,
        current_scale: f64,
        tolerance: f64,
    ) -> Option<AnnotationId> {
        self.annotations
            .iter()
            .rev()
            .filter(|annotation| annotation.page() == page)
            .find(|annotation| transform::hit_test(annotation, point, current_scale, tolerance))
            .map(Annotation::id)
    }
}
