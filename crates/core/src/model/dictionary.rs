//! PDF dictionary: an insertion-ordered map from names to values.

use crate::error::Result;
use crate::model::array::PDFArray;
use crate::model::objects::{IdAllocator, PDFObjRef, PDFObject};
use crate::model::stream::PDFStream;
use crate::model::string::PDFString;
use crate::model::table::{Resolver, resolve_direct};
use indexmap::IndexMap;

/// Map of name keys (without the leading slash) to values.
///
/// Null is never stored: putting a null value removes the key.
#[derive(Debug, Default)]
pub struct PDFDictionary {
    entries: IndexMap<String, PDFObject>,
}

impl PDFDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored value, verbatim (references are not followed).
    pub fn get(&self, key: &str) -> Option<&PDFObject> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut PDFObject> {
        self.entries.get_mut(key)
    }

    /// Get attribute, trying multiple names (e.g. `["DecodeParms", "DP"]`).
    pub fn get_any(&self, keys: &[&str]) -> Option<&PDFObject> {
        keys.iter().find_map(|k| self.entries.get(*k))
    }

    /// Value with indirect references followed.
    pub fn get_direct<'a, R: Resolver + ?Sized>(
        &'a self,
        key: &str,
        resolver: &'a R,
    ) -> Option<&'a PDFObject> {
        resolve_direct(self.entries.get(key)?, resolver)
    }

    /// Insert or replace `key`. A null value removes the key instead.
    ///
    /// Returns the previous value, if any.
    pub fn put(&mut self, key: impl Into<String>, value: PDFObject) -> Option<PDFObject> {
        let key = key.into();
        if value.is_null() {
            return self.entries.shift_remove(&key);
        }
        self.entries.insert(key, value)
    }

    pub fn remove(&mut self, key: &str) -> Option<PDFObject> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PDFObject)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut PDFObject)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_bool<R: Resolver + ?Sized>(&self, key: &str, resolver: &R) -> Option<bool> {
        self.get_direct(key, resolver)?.as_bool()
    }

    pub fn get_number<R: Resolver + ?Sized>(&self, key: &str, resolver: &R) -> Option<f64> {
        self.get_direct(key, resolver)?.as_number()
    }

    pub fn get_int<R: Resolver + ?Sized>(&self, key: &str, resolver: &R) -> Option<i64> {
        self.get_direct(key, resolver)?.as_int()
    }

    pub fn get_name<'a, R: Resolver + ?Sized>(
        &'a self,
        key: &str,
        resolver: &'a R,
    ) -> Option<&'a str> {
        self.get_direct(key, resolver)?.as_name()
    }

    pub fn get_string<'a, R: Resolver + ?Sized>(
        &'a self,
        key: &str,
        resolver: &'a R,
    ) -> Option<&'a PDFString> {
        self.get_direct(key, resolver)?.as_string()
    }

    pub fn get_array<'a, R: Resolver + ?Sized>(
        &'a self,
        key: &str,
        resolver: &'a R,
    ) -> Option<&'a PDFArray> {
        self.get_direct(key, resolver)?.as_array()
    }

    pub fn get_dict<'a, R: Resolver + ?Sized>(
        &'a self,
        key: &str,
        resolver: &'a R,
    ) -> Option<&'a PDFDictionary> {
        self.get_direct(key, resolver)?.as_dict()
    }

    pub fn get_stream<'a, R: Resolver + ?Sized>(
        &'a self,
        key: &str,
        resolver: &'a R,
    ) -> Option<&'a PDFStream> {
        self.get_direct(key, resolver)?.as_stream()
    }

    /// Stored reference, without following it.
    pub fn get_reference(&self, key: &str) -> Option<PDFObjRef> {
        self.entries.get(key)?.as_reference()
    }

    /// Deep copy with fresh identities.
    pub fn duplicate(&self, ids: &IdAllocator) -> Result<Self> {
        let mut entries = IndexMap::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            entries.insert(key.clone(), value.duplicate(ids)?);
        }
        Ok(Self { entries })
    }
}

impl FromIterator<(String, PDFObject)> for PDFDictionary {
    fn from_iter<I: IntoIterator<Item = (String, PDFObject)>>(iter: I) -> Self {
        let mut dict = Self::new();
        for (key, value) in iter {
            dict.put(key, value);
        }
        dict
    }
}

impl IntoIterator for PDFDictionary {
    type Item = (String, PDFObject);
    type IntoIter = indexmap::map::IntoIter<String, PDFObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
