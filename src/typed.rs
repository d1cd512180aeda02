//! Typed dictionary views with default-value semantics. Each wrapper
//! borrows a [`Dictionary`] and exposes typed getters/setters with
//! PDF-specified defaults; none of them own the data they read.

use crate::dictionary::Dictionary;
use crate::error::Result;
use crate::object::{Object, ObjectId};

/// A borrowed typed view over `/Type /Catalog`.
pub struct Catalog<'a>(pub &'a Dictionary);

impl<'a> Catalog<'a> {
    pub fn new(dict: &'a Dictionary) -> Self {
        Catalog(dict)
    }

    pub fn pages(&self) -> Result<ObjectId> {
        self.0.get(b"Pages")?.as_reference()
    }

    pub fn version(&self) -> Option<&str> {
        self.0.get(b"Version").ok().and_then(|v| v.as_name_str().ok())
    }
}

pub struct CatalogMut<'a>(pub &'a mut Dictionary);

impl<'a> CatalogMut<'a> {
    pub fn new(dict: &'a mut Dictionary) -> Self {
        CatalogMut(dict)
    }

    pub fn set_pages(&mut self, pages: ObjectId) -> &mut Self {
        self.0.set("Pages", Object::Reference(pages));
        self
    }
}

/// A borrowed typed view over a `/Type /Pages` or `/Type /Page` node.
/// `/Rotate`, `/Resources`, and `/MediaBox` are inheritable: a missing
/// entry on a leaf falls back to a PDF-specified or supplied default
/// rather than erroring, matching the reader's inheritance rule.
pub struct PageTreeNode<'a>(pub &'a Dictionary);

impl<'a> PageTreeNode<'a> {
    pub fn new(dict: &'a Dictionary) -> Self {
        PageTreeNode(dict)
    }

    pub fn is_leaf(&self) -> bool {
        self.0.has_type(b"Page")
    }

    pub fn kids(&self) -> Result<&[Object]> {
        self.0.get(b"Kids")?.as_array()
    }

    pub fn count(&self) -> i64 {
        self.0.get(b"Count").and_then(Object::as_i64).unwrap_or(1)
    }

    /// `/Rotate` defaults to `0` when absent (PDF 1.7 §7.7.3.3).
    pub fn rotate(&self) -> i64 {
        self.0.get(b"Rotate").and_then(Object::as_i64).unwrap_or(0)
    }

    pub fn media_box(&self) -> Option<[f64; 4]> {
        let arr = self.0.get(b"MediaBox").ok()?.as_array().ok()?;
        if arr.len() != 4 {
            return None;
        }
        let mut box_values = [0.0; 4];
        for (slot, value) in box_values.iter_mut().zip(arr) {
            *slot = value.as_f64().ok()?;
        }
        Some(box_values)
    }
}

pub struct PageTreeNodeMut<'a>(pub &'a mut Dictionary);

impl<'a> PageTreeNodeMut<'a> {
    pub fn new(dict: &'a mut Dictionary) -> Self {
        PageTreeNodeMut(dict)
    }

    pub fn set_rotate(&mut self, degrees: i64) -> &mut Self {
        self.0.set("Rotate", degrees);
        self
    }

    pub fn set_media_box(&mut self, box_values: [f64; 4]) -> &mut Self {
        self.0.set("MediaBox", Object::Array(box_values.into_iter().map(Object::Real).collect()));
        self
    }
}

/// A borrowed typed view over the document information dictionary
/// (`/Info`). Date fields are parsed lazily through [`crate::pdf_date`];
/// an unparseable or absent date yields `None` rather than an error.
pub struct InfoDict<'a>(pub &'a Dictionary);

impl<'a> InfoDict<'a> {
    pub fn new(dict: &'a Dictionary) -> Self {
        InfoDict(dict)
    }

    pub fn title(&self) -> Option<String> {
        self.text_field(b"Title")
    }

    pub fn author(&self) -> Option<String> {
        self.text_field(b"Author")
    }

    pub fn producer(&self) -> Option<String> {
        self.text_field(b"Producer")
    }

    pub fn creation_date(&self) -> Option<crate::pdf_date::PdfDate> {
        self.text_field(b"CreationDate").and_then(|s| crate::pdf_date::parse(s.as_bytes()).ok())
    }

    pub fn mod_date(&self) -> Option<crate::pdf_date::PdfDate> {
        self.text_field(b"ModDate").and_then(|s| crate::pdf_date::parse(s.as_bytes()).ok())
    }

    fn text_field(&self, key: &[u8]) -> Option<String> {
        let bytes = self.0.get(key).ok()?.as_str().ok()?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }
}

pub struct InfoDictMut<'a>(pub &'a mut Dictionary);

impl<'a> InfoDictMut<'a> {
    pub fn new(dict: &'a mut Dictionary) -> Self {
        InfoDictMut(dict)
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.0.set("Title", Object::string_literal(title));
        self
    }

    pub fn set_producer(&mut self, producer: &str) -> &mut Self {
        self.0.set("Producer", Object::string_literal(producer));
        self
    }

    pub fn set_creation_date(&mut self, date: &crate::pdf_date::PdfDate) -> &mut Self {
        self.0.set("CreationDate", Object::string_literal(crate::pdf_date::format(date)));
        self
    }
}

/// A borrowed typed view over the `/Encrypt` dictionary (read-only: the
/// encryption dictionary is rebuilt from [`crate::encryption::EncryptionState`]
/// on write, not mutated in place).
pub struct EncryptDict<'a>(pub &'a Dictionary);

impl<'a> EncryptDict<'a> {
    pub fn new(dict: &'a Dictionary) -> Self {
        EncryptDict(dict)
    }

    pub fn filter_name(&self) -> Result<&str> {
        self.0.get(b"Filter")?.as_name_str()
    }

    pub fn v(&self) -> Result<i64> {
        self.0.get(b"V")?.as_i64()
    }

    pub fn r(&self) -> Result<i64> {
        self.0.get(b"R")?.as_i64()
    }

    /// `/P`, the permission bits. See [`crate::permissions::Permissions`]
    /// for the named flags this field packs.
    pub fn permissions(&self) -> Result<i64> {
        self.0.get(b"P")?.as_i64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_tree_node_rotate_defaults_to_zero() {
        let dict = Dictionary::new();
        assert_eq!(PageTreeNode::new(&dict).rotate(), 0);
    }

    #[test]
    fn page_tree_node_reads_media_box() {
        let mut dict = Dictionary::new();
        PageTreeNodeMut::new(&mut dict).set_media_box([0.0, 0.0, 612.0, 792.0]);
        assert_eq!(PageTreeNode::new(&dict).media_box(), Some([0.0, 0.0, 612.0, 792.0]));
    }

    #[test]
    fn info_dict_round_trips_title() {
        let mut dict = Dictionary::new();
        InfoDictMut::new(&mut dict).set_title("Report");
        assert_eq!(InfoDict::new(&dict).title(), Some("Report".to_string()));
    }
}
