//! Ordered storage for committed strokes and shapes.
//!
//! Insertion order is z-order: later elements are drawn on top. Every element
//! carries its bounding box, computed once when it is added, which the eraser
//! tests against.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::element::{Element, ElementId, ElementKind, ShapeDescriptor, Stroke};
use crate::error::{CanvasError, CanvasResult};
use crate::input::DeviceType;
use crate::outline::Outline;

/// Ordered collection of drawing elements with a monotonic id counter.
///
/// # Example
///
/// ```
/// use sketchbook_core::store::StrokeStore;
/// use sketchbook_core::{DeviceType, Outline};
///
/// let mut store = StrokeStore::new();
/// let outline: Outline = "M0 0 L10 10 Z".parse().unwrap();
/// let id = store.append(outline, "#000000", 3.0, DeviceType::Mouse, false).id;
///
/// assert_eq!(id.get(), 0);
/// assert!(store.undo());
/// assert!(!store.undo());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StrokeStore {
    elements: Vec<Element>,
    next_id: u64,
}

impl StrokeStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> ElementId {
        if let Some(next) = self.next_id.checked_add(1) {
            let id = ElementId(self.next_id);
            self.next_id = next;
            return id;
        }
        // Counter exhausted; hand out the lowest id not in use.
        let used: BTreeSet<u64> = self.elements.iter().map(|e| e.id.get()).collect();
        let mut free = 0;
        for id in used {
            if id != free {
                break;
            }
            free += 1;
        }
        warn!(id = free, "id counter exhausted, reusing a free id");
        ElementId(free)
    }

    fn push(&mut self, kind: ElementKind) -> &Element {
        let id = self.allocate_id();
        let index = self.elements.len();
        self.elements.push(Element::new(id, kind));
        &self.elements[index]
    }

    /// Commit a stroke outline and return the stored element.
    pub fn append(
        &mut self,
        outline: Outline,
        color: impl Into<String>,
        stroke_width: f32,
        device_type: DeviceType,
        is_single_point: bool,
    ) -> &Element {
        let element = self.push(ElementKind::Stroke(Stroke {
            outline,
            color: color.into(),
            stroke_width,
            device_type,
            is_single_point,
        }));
        debug!(id = %element.id, single_point = is_single_point, "stroke appended");
        element
    }

    /// Add a shape.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidShape`] when the descriptor has unusable
    /// geometry; no id is consumed in that case.
    pub fn add_shape(&mut self, descriptor: ShapeDescriptor) -> CanvasResult<&Element> {
        let kind = descriptor.into_kind()?;
        let element = self.push(kind);
        debug!(id = %element.id, kind = element.kind().tag(), "shape added");
        Ok(element)
    }

    /// Remove the most recently added element.
    ///
    /// Returns `false` when the store is empty.
    pub fn undo(&mut self) -> bool {
        match self.elements.pop() {
            Some(element) => {
                debug!(id = %element.id, "undo");
                true
            }
            None => false,
        }
    }

    /// Remove every element whose id is in `ids`. Unknown ids are ignored.
    ///
    /// Returns the ids that were actually removed.
    pub fn erase_matching(&mut self, ids: &BTreeSet<ElementId>) -> BTreeSet<ElementId> {
        let mut removed = BTreeSet::new();
        self.elements.retain(|element| {
            if ids.contains(&element.id) {
                removed.insert(element.id);
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            debug!(count = removed.len(), "elements erased");
        }
        removed
    }

    /// Remove everything and restart ids at 0.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.next_id = 0;
    }

    /// Replace the contents wholesale.
    ///
    /// The id counter continues after the largest id present.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::DuplicateId`] if two elements share an id, or
    /// [`CanvasError::InvalidDocument`] if the largest id leaves no room for
    /// new ones; the store is left untouched.
    pub fn replace(&mut self, elements: Vec<Element>) -> CanvasResult<()> {
        let mut seen = BTreeSet::new();
        for element in &elements {
            if !seen.insert(element.id) {
                return Err(CanvasError::DuplicateId(element.id.get()));
            }
        }
        let next_id = match seen.last() {
            None => 0,
            Some(max) => max.get().checked_add(1).ok_or_else(|| {
                CanvasError::InvalidDocument(format!("id {max} leaves no room for new ids"))
            })?,
        };
        self.next_id = next_id;
        self.elements = elements;
        Ok(())
    }

    /// Ids of elements whose bounds, grown by `radius`, contain `(x, y)`.
    pub fn hit_test(&self, x: f32, y: f32, radius: f32) -> impl Iterator<Item = ElementId> + '_ {
        self.elements
            .iter()
            .filter(move |element| element.is_hit_by_disc(x, y, radius))
            .map(|element| element.id)
    }

    /// Elements in z-order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Look up an element by id.
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|element| element.id == id)
    }

    /// The id the next element will receive.
    #[must_use]
    pub const fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the store holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ShapeKind, ShapeStyle};
    use crate::geometry::BoundingBox;

    fn outline(data: &str) -> Outline {
        data.parse().expect("valid path")
    }

    fn append(store: &mut StrokeStore, data: &str) -> ElementId {
        store
            .append(outline(data), "#000000", 5.0, DeviceType::Mouse, false)
            .id
    }

    #[test]
    fn test_ids_increase_from_zero() {
        let mut store = StrokeStore::new();
        let a = append(&mut store, "M0 0 L1 1 Z");
        let b = append(&mut store, "M2 2 L3 3 Z");
        assert_eq!(a, ElementId(0));
        assert_eq!(b, ElementId(1));
        assert_eq!(store.next_id(), 2);
    }

    #[test]
    fn test_undo_keeps_earlier_ids() {
        let mut store = StrokeStore::new();
        let a = append(&mut store, "M0 0 L10 0 L10 10 Z");
        append(&mut store, "M20 20 L30 30 Z");

        assert!(store.undo());
        assert_eq!(store.len(), 1);
        assert_eq!(store.elements()[0].id, a);
        // Undo does not rewind the counter.
        assert_eq!(append(&mut store, "M5 5 L6 6 Z"), ElementId(2));
    }

    #[test]
    fn test_undo_on_empty_store() {
        let mut store = StrokeStore::new();
        assert!(!store.undo());
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_resets_counter() {
        let mut store = StrokeStore::new();
        append(&mut store, "M0 0 L1 1 Z");
        append(&mut store, "M0 0 L1 1 Z");
        store.clear();
        assert!(store.is_empty());
        assert_eq!(append(&mut store, "M0 0 L1 1 Z"), ElementId(0));
    }

    #[test]
    fn test_bounds_cached_on_append() {
        let mut store = StrokeStore::new();
        let id = append(&mut store, "M1 2 Q5 -3 7 4 L2 9 Z");
        let element = store.get(id).expect("present");
        assert_eq!(element.bounds(), Some(BoundingBox::new(1.0, -3.0, 6.0, 12.0)));
    }

    #[test]
    fn test_erase_matching_ignores_missing_ids() {
        let mut store = StrokeStore::new();
        let a = append(&mut store, "M0 0 L1 1 Z");
        let b = append(&mut store, "M0 0 L1 1 Z");
        let c = append(&mut store, "M0 0 L1 1 Z");

        let removed = store.erase_matching(&BTreeSet::from([a, c, ElementId(42)]));
        assert_eq!(removed, BTreeSet::from([a, c]));
        let left: Vec<_> = store.elements().iter().map(|e| e.id).collect();
        assert_eq!(left, vec![b]);
    }

    #[test]
    fn test_hit_test_uses_expanded_bounds() {
        let mut store = StrokeStore::new();
        let near = append(&mut store, "M0 0 L10 0 L10 10 L0 10 Z");
        append(&mut store, "M100 100 L110 110 Z");

        let hits: Vec<_> = store.hit_test(14.0, 5.0, 5.0).collect();
        assert_eq!(hits, vec![near]);
        assert_eq!(store.hit_test(16.0, 5.0, 5.0).count(), 0);
    }

    #[test]
    fn test_add_shape_rejects_invalid_without_consuming_id() {
        let mut store = StrokeStore::new();
        let bad = ShapeDescriptor::boxed(
            ShapeKind::Rectangle,
            0.0,
            0.0,
            -4.0,
            10.0,
            ShapeStyle::new("#000", 2.0),
        );
        assert!(store.add_shape(bad).is_err());

        let good = ShapeDescriptor::boxed(
            ShapeKind::Triangle,
            0.0,
            0.0,
            4.0,
            10.0,
            ShapeStyle::new("#000", 2.0),
        );
        let element = store.add_shape(good).expect("valid shape");
        assert_eq!(element.id, ElementId(0));
        assert_eq!(element.kind().shape_kind(), Some(ShapeKind::Triangle));
    }

    #[test]
    fn test_replace_rejects_duplicate_ids() {
        let mut store = StrokeStore::new();
        append(&mut store, "M0 0 L1 1 Z");

        let kind = store.elements()[0].kind().clone();
        let dupes = vec![
            Element::new(ElementId(4), kind.clone()),
            Element::new(ElementId(4), kind.clone()),
        ];
        assert!(matches!(
            store.replace(dupes),
            Err(CanvasError::DuplicateId(4))
        ));
        assert_eq!(store.len(), 1);

        store
            .replace(vec![
                Element::new(ElementId(7), kind.clone()),
                Element::new(ElementId(2), kind),
            ])
            .expect("unique ids");
        assert_eq!(store.next_id(), 8);
    }

    #[test]
    fn test_replace_rejects_largest_id() {
        let mut store = StrokeStore::new();
        append(&mut store, "M0 0 L1 1 Z");

        let kind = store.elements()[0].kind().clone();
        let result = store.replace(vec![Element::new(ElementId(u64::MAX), kind)]);
        assert!(matches!(result, Err(CanvasError::InvalidDocument(_))));
        assert_eq!(store.len(), 1);
        assert_eq!(store.next_id(), 1);
    }

    #[test]
    fn test_exhausted_counter_never_reuses_live_ids() {
        let mut store = StrokeStore::new();
        append(&mut store, "M0 0 L1 1 Z");
        let kind = store.elements()[0].kind().clone();
        store
            .replace(vec![
                Element::new(ElementId(0), kind.clone()),
                Element::new(ElementId(u64::MAX - 1), kind),
            ])
            .expect("room for one more id");

        let first = append(&mut store, "M2 2 L3 3 Z");
        let second = append(&mut store, "M4 4 L5 5 Z");
        assert_eq!(first, ElementId(1));
        assert_eq!(second, ElementId(2));
        let ids: BTreeSet<ElementId> = store.elements().iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), store.len());
    }
}
