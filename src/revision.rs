//! A single self-consistent snapshot of the document. `Document`
//! (src/document.rs) owns a stack of these, oldest first.

use std::collections::HashMap;

use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectId};
use crate::parser;
use crate::xref::{Xref, XrefEntry};

/// One revision: a trailer, a cross-reference section, and the objects
/// materialized from it so far. `source` is an index into the owning
/// Document's byte buffer rather than a literal borrow, which sidesteps
/// self-referential lifetimes while keeping to a "one reader at a time"
/// contract — only `Document::deref` touches both at once.
#[derive(Debug, Clone, Default)]
pub struct Revision {
    pub trailer: Dictionary,
    pub xref: Xref,
    objects: HashMap<u32, (u16, Object)>,
    /// `true` for the synthetic revision produced by `reconstruct()`.
    pub reconstructed: bool,
}

impl Revision {
    pub fn new(trailer: Dictionary, xref: Xref) -> Self {
        Revision { trailer, xref, objects: HashMap::new(), reconstructed: false }
    }

    pub fn max_oid(&self) -> u32 {
        self.xref.max_oid().max(self.objects.keys().copied().max().unwrap_or(0))
    }

    /// A materialized object at `oid`, if this revision has loaded or
    /// been given one, regardless of generation.
    pub fn object(&self, oid: u32) -> Option<&Object> {
        self.objects.get(&oid).map(|(_, obj)| obj)
    }

    pub fn object_mut(&mut self, oid: u32) -> Option<&mut Object> {
        self.objects.get_mut(&oid).map(|(_, obj)| obj)
    }

    /// A materialized object at the exact `(oid, gen)` pair.
    pub fn object_with_gen(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id.0).filter(|(gen, _)| *gen == id.1).map(|(_, obj)| obj)
    }

    pub fn insert(&mut self, id: ObjectId, value: Object) {
        self.objects.insert(id.0, (id.1, value));
    }

    pub fn remove(&mut self, oid: u32) -> Option<Object> {
        self.objects.remove(&oid).map(|(_, obj)| obj)
    }

    pub fn each(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects.iter().map(|(&oid, (gen, obj))| ((oid, *gen), obj))
    }

    pub fn contains(&self, oid: u32) -> bool {
        self.objects.contains_key(&oid) || self.xref.get(oid).is_some()
    }

    /// Parse and cache the object at `oid` from `source`, following a
    /// `Compressed` xref entry into its object stream when needed.
    /// Streams belonging to object streams are handled by the caller
    /// (`Document::deref`) since decompressing one needs mutable access
    /// to sibling revisions' object-stream cache.
    pub fn load(&mut self, oid: u32, source: &[u8]) -> Result<Option<Object>> {
        if let Some((_, obj)) = self.objects.get(&oid) {
            return Ok(Some(obj.clone()));
        }
        let Some(entry) = self.xref.get(oid) else {
            return Ok(None);
        };
        match entry {
            XrefEntry::InUse { offset, gen } => {
                let (id, value) = parser::parse_indirect_object(source, offset as usize)?;
                if id.0 != oid {
                    return Err(Error::ValidationError(format!(
                        "xref pointed to object {oid} but found object {}",
                        id.0
                    )));
                }
                self.objects.insert(oid, (gen, value.clone()));
                Ok(Some(value))
            }
            XrefEntry::Free { .. } => Ok(None),
            XrefEntry::Compressed { .. } => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_fetch_roundtrip() {
        let mut rev = Revision::new(Dictionary::new(), Xref::new());
        rev.insert((5, 0), Object::Integer(42));
        assert_eq!(rev.object(5), Some(&Object::Integer(42)));
        assert_eq!(rev.object_with_gen((5, 1)), None);
        assert_eq!(rev.object_with_gen((5, 0)), Some(&Object::Integer(42)));
    }

    #[test]
    fn max_oid_considers_both_xref_and_objects() {
        let mut rev = Revision::new(Dictionary::new(), Xref::new());
        rev.xref.add_in_use(3, 0, 10);
        rev.insert((9, 0), Object::Null);
        assert_eq!(rev.max_oid(), 9);
    }
}
