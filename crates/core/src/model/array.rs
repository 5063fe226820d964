//! PDF array: an ordered list of values.

use crate::error::Result;
use crate::model::dictionary::PDFDictionary;
use crate::model::objects::{IdAllocator, PDFObject};
use crate::model::stream::PDFStream;
use crate::model::string::PDFString;
use crate::model::table::{Resolver, resolve_direct};

/// Ordered values; duplicates and nulls are kept as given.
#[derive(Debug, Default)]
pub struct PDFArray {
    items: Vec<PDFObject>,
}

impl PDFArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: PDFObject) {
        self.items.push(value);
    }

    pub fn insert(&mut self, index: usize, value: PDFObject) {
        self.items.insert(index.min(self.items.len()), value);
    }

    /// Replace the element at `index`, returning the old one.
    pub fn set(&mut self, index: usize, value: PDFObject) -> Option<PDFObject> {
        let slot = self.items.get_mut(index)?;
        Some(std::mem::replace(slot, value))
    }

    pub fn remove(&mut self, index: usize) -> Option<PDFObject> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&PDFObject> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut PDFObject> {
        self.items.get_mut(index)
    }

    pub fn get_direct<'a, R: Resolver + ?Sized>(
        &'a self,
        index: usize,
        resolver: &'a R,
    ) -> Option<&'a PDFObject> {
        resolve_direct(self.items.get(index)?, resolver)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PDFObject> {
        self.items.iter()
    }

    /// True when this very object (by identity) is an element.
    pub fn contains(&self, value: &PDFObject) -> bool {
        self.items.contains(value)
    }

    /// True when a Name element equals `name`.
    pub fn contains_name(&self, name: &str) -> bool {
        self.items.iter().any(|o| o.as_name() == Some(name))
    }

    pub fn get_number<R: Resolver + ?Sized>(&self, index: usize, resolver: &R) -> Option<f64> {
        self.get_direct(index, resolver)?.as_number()
    }

    pub fn get_int<R: Resolver + ?Sized>(&self, index: usize, resolver: &R) -> Option<i64> {
        self.get_direct(index, resolver)?.as_int()
    }

    pub fn get_name<'a, R: Resolver + ?Sized>(
        &'a self,
        index: usize,
        resolver: &'a R,
    ) -> Option<&'a str> {
        self.get_direct(index, resolver)?.as_name()
    }

    pub fn get_string<'a, R: Resolver + ?Sized>(
        &'a self,
        index: usize,
        resolver: &'a R,
    ) -> Option<&'a PDFString> {
        self.get_direct(index, resolver)?.as_string()
    }

    pub fn get_array<'a, R: Resolver + ?Sized>(
        &'a self,
        index: usize,
        resolver: &'a R,
    ) -> Option<&'a PDFArray> {
        self.get_direct(index, resolver)?.as_array()
    }

    pub fn get_dict<'a, R: Resolver + ?Sized>(
        &'a self,
        index: usize,
        resolver: &'a R,
    ) -> Option<&'a PDFDictionary> {
        self.get_direct(index, resolver)?.as_dict()
    }

    pub fn get_stream<'a, R: Resolver + ?Sized>(
        &'a self,
        index: usize,
        resolver: &'a R,
    ) -> Option<&'a PDFStream> {
        self.get_direct(index, resolver)?.as_stream()
    }

    pub fn duplicate(&self, ids: &IdAllocator) -> Result<Self> {
        let items = self
            .items
            .iter()
            .map(|item| item.duplicate(ids))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { items })
    }
}

impl From<Vec<PDFObject>> for PDFArray {
    fn from(items: Vec<PDFObject>) -> Self {
        Self { items }
    }
}

impl FromIterator<PDFObject> for PDFArray {
    fn from_iter<I: IntoIterator<Item = PDFObject>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PDFArray {
    type Item = PDFObject;
    type IntoIter = std::vec::IntoIter<PDFObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a PDFArray {
    type Item = &'a PDFObject;
    type IntoIter = std::slice::Iter<'a, PDFObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
