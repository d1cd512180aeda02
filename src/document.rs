//! A document as a stack of revisions. The newest revision is consulted
//! first; a lookup that misses falls through to older revisions, so
//! incremental updates shadow rather than replace.

use std::collections::HashSet;

use crate::dictionary::Dictionary;
use crate::encryption::{EncryptionState, SecurityHandler};
use crate::error::{Error, Result};
use crate::filters::FilterRegistry;
use crate::object::{Object, ObjectId};
use crate::object_stream;
use crate::parser;
use crate::revision::Revision;
use crate::xref::XrefEntry;

/// A complete in-memory PDF document: every revision it was built or
/// loaded from, the byte source those revisions lazily parse against,
/// and the registries that customize filtering and decryption.
pub struct Document {
    pub(crate) revisions: Vec<Revision>,
    source: Vec<u8>,
    pub(crate) version: (u8, u8),
    pub filters: FilterRegistry,
    pub encryption: Option<EncryptionState>,
    security_handlers: Vec<(Vec<u8>, Box<dyn SecurityHandler>)>,
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl Document {
    /// A fresh, empty document: one revision, no objects, PDF 1.7.
    pub fn new() -> Self {
        Document {
            revisions: vec![Revision::default()],
            source: Vec::new(),
            version: (1, 7),
            filters: FilterRegistry::with_builtins(),
            encryption: None,
            security_handlers: Vec::new(),
        }
    }

    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Document::from_bytes(bytes, None)
    }

    pub fn open_with_password(path: impl AsRef<std::path::Path>, password: &str) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Document::from_bytes(bytes, Some(password))
    }

    pub fn load_mem(data: &[u8]) -> Result<Self> {
        Document::from_bytes(data.to_vec(), None)
    }

    /// Walk the `/Prev` (and hybrid `/XRefStm`) chain from `startxref`,
    /// building one [`Revision`] per link, oldest last in the chain but
    /// pushed so `self.revisions` ends up oldest-first.
    fn from_bytes(source: Vec<u8>, password: Option<&str>) -> Result<Self> {
        let version = parser::parse_header(&source)?;

        let mut revisions = Vec::new();
        let mut already_seen = HashSet::new();
        let mut cursor = parser::find_xref_start(&source).ok();

        while let Some(offset) = cursor {
            if !already_seen.insert(offset) {
                log::warn!("cross-reference chain cycles back to offset {offset}; stopping");
                break;
            }
            let (mut xref, trailer) = match parser::parse_xref_and_trailer(&source, offset) {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("failed to parse cross-reference section at {offset}: {e}; reconstructing");
                    break;
                }
            };

            if let Ok(hybrid) = trailer.get(b"XRefStm").and_then(Object::as_i64) {
                if let Ok((hybrid_xref, _)) = parser::parse_xref_and_trailer(&source, hybrid as usize) {
                    xref.merge_older(&hybrid_xref);
                }
            }

            cursor = trailer.get(b"Prev").and_then(Object::as_i64).ok().map(|p| p as usize);
            revisions.push(Revision::new(trailer, xref));
        }

        if revisions.is_empty() {
            let (xref, trailer) = parser::reconstruct(&source)?;
            revisions.push(Revision::new(trailer, xref));
        }
        revisions.reverse(); // oldest first

        let mut document = Document {
            revisions,
            source,
            version,
            filters: FilterRegistry::with_builtins(),
            encryption: None,
            security_handlers: Vec::new(),
        };

        if let Ok(encrypt_ref) = document.trailer().get(b"Encrypt").map(|o| o.clone()) {
            let encrypt_dict = match &encrypt_ref {
                Object::Reference(id) => document.get_object(*id)?.as_dict()?.clone(),
                Object::Dictionary(d) => d.clone(),
                _ => return Err(Error::ValidationError("/Encrypt is neither a dictionary nor a reference".into())),
            };
            let id0 = document.first_id_component()?;
            let filter_name = encrypt_dict.get(b"Filter").and_then(Object::as_name_str).unwrap_or("Standard");
            let custom_handler =
                document.security_handlers.iter().find(|(name, _)| name == filter_name.as_bytes());
            document.encryption = Some(match custom_handler {
                Some((_, handler)) => handler.open(&encrypt_dict, &id0, password)?,
                None => EncryptionState::open(&encrypt_dict, &id0, password)?,
            });
        }

        Ok(document)
    }

    fn first_id_component(&self) -> Result<Vec<u8>> {
        match self.trailer().get(b"ID") {
            Ok(Object::Array(arr)) if !arr.is_empty() => Ok(arr[0].as_str()?.to_vec()),
            _ => Ok(Vec::new()),
        }
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.revisions.last().expect("at least one revision").trailer
    }

    pub fn trailer_mut(&mut self) -> &mut Dictionary {
        &mut self.revisions.last_mut().expect("at least one revision").trailer
    }

    pub fn max_oid(&self) -> u32 {
        self.revisions.iter().map(Revision::max_oid).max().unwrap_or(0)
    }

    /// Materialize the object at `id.0`, searching revisions newest
    /// first and following `/ObjStm` membership through its container.
    /// An absent target (a free entry, an unresolvable compressed entry,
    /// or no entry at all) yields `Null` rather than an error — a
    /// dangling reference is not malformed input. The returned value may
    /// itself contain unresolved `Reference`s; use
    /// [`Document::dereference`] to chase those too.
    pub fn get_object(&mut self, id: ObjectId) -> Result<Object> {
        for rev_index in (0..self.revisions.len()).rev() {
            if let Some(value) = self.revisions[rev_index].object(id.0) {
                return Ok(value.clone());
            }
            let Some(entry) = self.revisions[rev_index].xref.get(id.0) else {
                continue;
            };
            match entry {
                XrefEntry::Free { .. } => return Ok(Object::Null),
                XrefEntry::InUse { .. } => {
                    let loaded = self.revisions[rev_index].load(id.0, &self.source)?;
                    let Some(mut value) = loaded else { continue };
                    if let Some(enc) = &self.encryption {
                        if !matches!(self.trailer().get(b"Encrypt"), Ok(Object::Reference(e)) if *e == id) {
                            decrypt_in_place(&mut value, id, enc, &self.filters);
                        }
                    }
                    self.revisions[rev_index].insert(id, value.clone());
                    return Ok(value);
                }
                XrefEntry::Compressed { objstm_oid, index } => {
                    let container = self.get_object((objstm_oid, 0))?;
                    let stream = container.as_stream()?;
                    let members = object_stream::unpack(stream)?;
                    for (member_oid, member_value) in &members {
                        self.revisions[rev_index].insert((*member_oid, 0), member_value.clone());
                    }
                    let _ = index;
                    if let Some(value) = self.revisions[rev_index].object(id.0) {
                        return Ok(value.clone());
                    }
                    return Ok(Object::Null);
                }
            }
        }
        Ok(Object::Null)
    }

    /// Resolve `value` down to a non-`Reference`, following chains of
    /// indirection with cycle detection.
    pub fn dereference(&mut self, value: &Object) -> Result<Object> {
        let mut current = value.clone();
        let mut seen = HashSet::new();
        while let Object::Reference(id) = current {
            if !seen.insert(id) {
                return Err(Error::RecursiveReference(id));
            }
            current = self.get_object(id)?;
        }
        Ok(current)
    }

    pub fn catalog(&mut self) -> Result<Dictionary> {
        let root = self.trailer().get(b"Root")?.clone();
        Ok(self.dereference(&root)?.as_dict()?.clone())
    }

    pub fn info(&mut self) -> Result<Option<Dictionary>> {
        let Ok(info_ref) = self.trailer().get(b"Info").map(|o| o.clone()) else {
            return Ok(None);
        };
        Ok(Some(self.dereference(&info_ref)?.as_dict()?.clone()))
    }

    /// Allocate a fresh object id and insert `value` under it in the
    /// current (newest) revision.
    pub fn add_object(&mut self, value: Object) -> ObjectId {
        let oid = self.max_oid() + 1;
        let id = (oid, 0);
        self.set_object(id, value);
        id
    }

    pub fn set_object(&mut self, id: ObjectId, value: Object) {
        let current = self.revisions.last_mut().expect("at least one revision");
        current.xref.add_in_use(id.0, id.1, 0);
        current.insert(id, value);
    }

    pub fn delete_object(&mut self, id: ObjectId) {
        let current = self.revisions.last_mut().expect("at least one revision");
        current.xref.add_free(id.0, 0, id.1);
        current.remove(id.0);
    }

    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    pub fn set_min_version(&mut self, major: u8, minor: u8) {
        if (major, minor) > self.version {
            self.version = (major, minor);
        }
    }

    /// Alias for [`Document::get_object`] under the shorter name callers
    /// outside this crate reach for; Rust has no overloading, so a single
    /// `ObjectId` parameter covers both "by number" and "by number and
    /// generation" lookups.
    pub fn object(&mut self, id: ObjectId) -> Result<Object> {
        self.get_object(id)
    }

    /// Alias for [`Document::add_object`] returning a `Reference` to the
    /// new object rather than the bare id.
    pub fn add(&mut self, value: Object) -> Object {
        Object::Reference(self.add_object(value))
    }

    /// Alias for [`Document::delete_object`] with a choice of mode: when
    /// `mark_as_free` is false, only the current revision's entry is
    /// dropped, leaving older revisions' copies of the object reachable
    /// (an implicit tombstone rather than a hard removal).
    pub fn delete(&mut self, id: ObjectId, mark_as_free: bool) {
        if mark_as_free {
            self.delete_object(id);
        } else {
            self.revisions.last_mut().expect("at least one revision").remove(id.0);
        }
    }

    /// Attach `type_hint` (a `/Type` name) to `value` before adding it,
    /// so a later typed view (`crate::typed`) recognizes it without the
    /// caller having had to set `/Type` by hand. Returns the new
    /// reference.
    pub fn wrap(&mut self, mut value: Object, type_hint: Option<&str>) -> Object {
        if let (Some(type_hint), Ok(dict)) = (type_hint, value.as_dict_mut()) {
            dict.set("Type", type_hint);
        }
        self.add(value)
    }

    /// Render this document through [`crate::writer`]. `Full` ignores
    /// `original`; `Incremental` requires it (the bytes this document
    /// was loaded from, or any prior `Full` write's output).
    pub fn write(
        &mut self,
        sink: &mut impl std::io::Write,
        mode: crate::writer::WriteMode,
        options: &crate::writer::WriterOptions,
    ) -> Result<()> {
        let bytes = match mode {
            crate::writer::WriteMode::Full => crate::writer::write_full(self, options)?,
            crate::writer::WriteMode::Incremental(original) => {
                crate::writer::write_incremental(self, original, options)?
            }
        };
        sink.write_all(&bytes)?;
        Ok(())
    }

    /// Register a custom filter, keyed by its `/Filter` name.
    pub fn register_filter(
        &mut self,
        name: impl Into<Vec<u8>>,
        decoder: crate::filters::DecoderFn,
        encoder: crate::filters::EncoderFn,
    ) {
        self.filters.register(name, decoder, encoder);
    }

    /// Register a non-standard security handler, keyed by the
    /// `/Encrypt` dictionary's `/Filter` name. Only consulted on the
    /// next [`Document::open`]/[`Document::load_mem`];
    /// an already-open document's encryption state is unaffected.
    pub fn register_security_handler(&mut self, filter_name: impl Into<Vec<u8>>, handler: Box<dyn SecurityHandler>) {
        self.security_handlers.push((filter_name.into(), handler));
    }

    /// Re-encode every loaded stream's content with `FlateDecode`,
    /// replacing whatever filter chain it previously used.
    pub fn compress_streams(&mut self) -> Result<()> {
        self.rewrite_streams(|content, dict| {
            let plain = content.to_vec();
            let mut stream = crate::stream::Stream::new(dict.clone(), plain.clone());
            stream.set_compressed_content(&plain, &[(b"FlateDecode".to_vec(), Object::Null)])?;
            Ok(stream)
        })
    }

    /// Decode every loaded stream's content and drop its filter chain.
    pub fn decompress_streams(&mut self) -> Result<()> {
        self.rewrite_streams(|content, dict| {
            let stream = crate::stream::Stream { dict: dict.clone(), content: content.to_vec(), start_position: None };
            let plain = stream.decompressed_content()?;
            Ok(crate::stream::Stream::new(dict.clone(), plain))
        })
    }

    fn rewrite_streams(
        &mut self,
        mut transform: impl FnMut(&[u8], &Dictionary) -> Result<crate::stream::Stream>,
    ) -> Result<()> {
        let ids: Vec<ObjectId> = (1..=self.max_oid())
            .filter_map(|oid| {
                let id = (oid, 0);
                matches!(self.get_object(id), Ok(Object::Stream(_))).then_some(id)
            })
            .collect();
        for id in ids {
            if let Object::Stream(stream) = self.get_object(id)? {
                let rewritten = transform(&stream.content, &stream.dict)?;
                self.set_object(id, Object::Stream(rewritten));
            }
        }
        Ok(())
    }
}

/// Whether `id` is the object the trailer's `/Encrypt` entry points at —
/// that dictionary is never itself encrypted.
pub(crate) fn is_encrypt_dict(document: &Document, id: ObjectId) -> bool {
    matches!(document.trailer().get(b"Encrypt"), Ok(Object::Reference(e)) if *e == id)
}

/// Encrypt every string leaf and the stream body (if any) in `value`
/// with a fresh IV per call, mirroring [`decrypt_in_place`] in reverse.
/// Used by the writer just before serializing an object, never stored.
pub(crate) fn encrypt_in_place(value: &mut Object, id: ObjectId, enc: &EncryptionState) -> Result<()> {
    match value {
        Object::String(s, _) => {
            *s = enc.encrypt_for_object(id, s, enc.string_method, crate::encryption::random_iv())?;
        }
        Object::Array(items) => {
            for item in items {
                encrypt_in_place(item, id, enc)?;
            }
        }
        Object::Dictionary(dict) => {
            for (_, v) in dict.iter_mut() {
                encrypt_in_place(v, id, enc)?;
            }
        }
        Object::Stream(stream) => {
            for (_, v) in stream.dict.iter_mut() {
                encrypt_in_place(v, id, enc)?;
            }
            stream.content = enc.encrypt_for_object(id, &stream.content, enc.stream_method, crate::encryption::random_iv())?;
            stream.fix_length();
        }
        _ => {}
    }
    Ok(())
}

fn decrypt_in_place(value: &mut Object, id: ObjectId, enc: &EncryptionState, _filters: &FilterRegistry) {
    match value {
        Object::String(s, _) => {
            if let Ok(plain) = enc.decrypt_for_object(id, s, enc.string_method) {
                *s = plain;
            }
        }
        Object::Array(items) => {
            for item in items {
                decrypt_in_place(item, id, enc, _filters);
            }
        }
        Object::Dictionary(dict) => {
            for (_, v) in dict.iter_mut() {
                decrypt_in_place(v, id, enc, _filters);
            }
        }
        Object::Stream(stream) => {
            for (_, v) in stream.dict.iter_mut() {
                decrypt_in_place(v, id, enc, _filters);
            }
            if let Ok(plain) = enc.decrypt_for_object(id, &stream.content, enc.stream_method) {
                stream.content = plain;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_has_one_empty_revision() {
        let doc = Document::new();
        assert_eq!(doc.revisions.len(), 1);
        assert_eq!(doc.max_oid(), 0);
    }

    #[test]
    fn add_object_allocates_ascending_oids() {
        let mut doc = Document::new();
        let a = doc.add_object(Object::Integer(1));
        let b = doc.add_object(Object::Integer(2));
        assert_eq!(a, (1, 0));
        assert_eq!(b, (2, 0));
    }

    #[test]
    fn dereference_detects_cycles() {
        let mut doc = Document::new();
        doc.set_object((1, 0), Object::Reference((2, 0)));
        doc.set_object((2, 0), Object::Reference((1, 0)));
        let err = doc.dereference(&Object::Reference((1, 0))).unwrap_err();
        assert!(matches!(err, Error::RecursiveReference(_)));
    }

    #[test]
    fn get_object_yields_null_for_an_absent_target() {
        let mut doc = Document::new();
        assert_eq!(doc.get_object((99, 0)).unwrap(), Object::Null);
    }

    #[test]
    fn dereference_of_a_dangling_reference_yields_null() {
        let mut doc = Document::new();
        assert_eq!(doc.dereference(&Object::Reference((99, 0))).unwrap(), Object::Null);
    }

    #[test]
    fn dereference_follows_a_chain_to_its_value() {
        let mut doc = Document::new();
        doc.set_object((1, 0), Object::Reference((2, 0)));
        doc.set_object((2, 0), Object::Integer(7));
        assert_eq!(doc.dereference(&Object::Reference((1, 0))).unwrap(), Object::Integer(7));
    }
}
