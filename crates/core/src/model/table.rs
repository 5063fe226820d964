//! Indirect object table and reference resolution.

use crate::model::objects::{PDFObjRef, PDFObject};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;

/// Maximum number of indirect hops followed before giving up.
pub const MAX_REFERENCE_HOPS: usize = 32;

/// Looks up indirect objects by reference.
///
/// Returns `None` for references that are unknown, free, not loaded or
/// released.
pub trait Resolver {
    fn resolve(&self, reference: &PDFObjRef) -> Option<&PDFObject>;
}

/// Resolver for values that live outside any document.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl Resolver for NoResolver {
    fn resolve(&self, _reference: &PDFObjRef) -> Option<&PDFObject> {
        None
    }
}

/// Follow `obj` through indirect references to a direct value.
///
/// Dangling references, cycles and chains longer than
/// [`MAX_REFERENCE_HOPS`] all yield `None`.
pub fn resolve_direct<'a, R: Resolver + ?Sized>(
    obj: &'a PDFObject,
    resolver: &'a R,
) -> Option<&'a PDFObject> {
    let mut current = obj;
    let mut seen = FxHashSet::default();
    for _ in 0..MAX_REFERENCE_HOPS {
        let Some(reference) = current.as_reference() else {
            return Some(current);
        };
        if !seen.insert(reference) {
            tracing::debug!(%reference, "reference cycle");
            return None;
        }
        current = resolver.resolve(&reference)?;
    }
    if current.as_reference().is_some() {
        tracing::debug!("reference chain exceeds {MAX_REFERENCE_HOPS} hops");
        return None;
    }
    Some(current)
}

#[derive(Debug)]
struct Slot {
    genno: u16,
    object: PDFObject,
}

/// Arena of indirect objects keyed by object number.
///
/// Insertion order doubles as recency order; with a capacity set, the
/// least recently touched entry is evicted first.
#[derive(Debug, Default)]
pub struct ObjectTable {
    capacity: Option<usize>,
    map: IndexMap<u32, Slot>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            map: IndexMap::new(),
        }
    }

    /// Store `object` under `reference`, returning the previous occupant.
    pub fn insert(&mut self, reference: PDFObjRef, object: PDFObject) -> Option<PDFObject> {
        let previous = self.map.shift_remove(&reference.objid).map(|s| s.object);
        self.map.insert(
            reference.objid,
            Slot {
                genno: reference.genno,
                object,
            },
        );
        if let Some(capacity) = self.capacity {
            while self.map.len() > capacity.max(1) {
                if let Some((objid, _)) = self.map.shift_remove_index(0) {
                    tracing::trace!(objid, "evicted from object table");
                }
            }
        }
        previous
    }

    pub fn get(&self, reference: &PDFObjRef) -> Option<&PDFObject> {
        self.map
            .get(&reference.objid)
            .filter(|slot| slot.genno == reference.genno)
            .map(|slot| &slot.object)
    }

    pub fn get_mut(&mut self, reference: &PDFObjRef) -> Option<&mut PDFObject> {
        self.map
            .get_mut(&reference.objid)
            .filter(|slot| slot.genno == reference.genno)
            .map(|slot| &mut slot.object)
    }

    /// Mark `reference` as most recently used.
    pub fn touch(&mut self, reference: &PDFObjRef) {
        if let Some(index) = self.map.get_index_of(&reference.objid) {
            let last = self.map.len() - 1;
            if index != last {
                self.map.move_index(index, last);
            }
        }
    }

    /// Remove and return the object; later lookups yield `None`.
    pub fn release(&mut self, reference: &PDFObjRef) -> Option<PDFObject> {
        if self.get(reference).is_none() {
            return None;
        }
        self.map.shift_remove(&reference.objid).map(|s| s.object)
    }

    pub fn contains(&self, reference: &PDFObjRef) -> bool {
        self.get(reference).is_some()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Smallest object number above every stored one.
    pub fn next_object_number(&self) -> u32 {
        self.map.keys().max().map_or(1, |n| n + 1)
    }

    /// Entries sorted by object number.
    pub fn iter(&self) -> impl Iterator<Item = (PDFObjRef, &PDFObject)> {
        let mut entries: Vec<_> = self
            .map
            .iter()
            .map(|(objid, slot)| (PDFObjRef::new(*objid, slot.genno), &slot.object))
            .collect();
        entries.sort_by_key(|(r, _)| *r);
        entries.into_iter()
    }
}

impl Resolver for ObjectTable {
    fn resolve(&self, reference: &PDFObjRef) -> Option<&PDFObject> {
        self.get(reference)
    }
}
