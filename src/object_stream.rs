//! Object streams (`/Type /ObjStm`): a compacted container for indirect
//! objects that are neither streams themselves, nor gen != 0, nor the
//! `/Encrypt` dictionary, nor the document catalog (trailer `/Root`) —
//! packing any of those would break the invariants that make them
//! addressable before the container that holds them is even known.

use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectId};
use crate::parser::parse_value;
use crate::stream::Stream;
use crate::tokenizer::{Token, Tokenizer};

/// Unpack every object stored in `stream`, returning `(oid, value)`
/// pairs in the order the `/N`/`/First` header lists them.
pub fn unpack(stream: &Stream) -> Result<Vec<(u32, Object)>> {
    let n = stream.dict.get(b"N")?.as_i64()? as usize;
    let first = stream.dict.get(b"First")?.as_i64()? as usize;
    let payload = stream.decompressed_content()?;

    let mut header = Tokenizer::new(&payload);
    let mut offsets = Vec::with_capacity(n);
    for _ in 0..n {
        let oid = match header.next_token()? {
            Token::Integer(i) if i >= 0 => i as u32,
            other => return Err(Error::ValidationError(format!("ObjStm header expected oid, found {other:?}"))),
        };
        let rel_offset = match header.next_token()? {
            Token::Integer(i) if i >= 0 => i as usize,
            other => return Err(Error::ValidationError(format!("ObjStm header expected offset, found {other:?}"))),
        };
        offsets.push((oid, rel_offset));
    }

    let mut out = Vec::with_capacity(n);
    for (oid, rel_offset) in offsets {
        let mut body = Tokenizer::new(&payload);
        body.seek(first + rel_offset);
        let value = parse_value(&mut body)?;
        out.push((oid, value));
    }
    Ok(out)
}

/// Whether `value` is eligible to be packed into an object stream: not
/// a stream, not generation != 0, not the object referenced by
/// `/Encrypt` in the trailer, and not the document catalog (the
/// trailer's `/Root`) — a reader must be able to resolve the catalog
/// before it has any ObjStm locations to look inside.
pub fn is_packable(id: ObjectId, value: &Object, encrypt_ref: Option<ObjectId>, root_ref: Option<ObjectId>) -> bool {
    if id.1 != 0 {
        return false;
    }
    if matches!(value, Object::Stream(_)) {
        return false;
    }
    if Some(id) == encrypt_ref {
        return false;
    }
    if Some(id) == root_ref {
        return false;
    }
    true
}

/// Serialize `members` (in the order they should appear) into a new
/// `/Type /ObjStm` stream, with the caller supplying a function to
/// render one object's body bytes (normally `crate::serializer::write_object`).
pub fn pack(members: &[(u32, Object)], mut write_object: impl FnMut(&Object) -> Result<Vec<u8>>) -> Result<Stream> {
    let mut header = Vec::new();
    let mut bodies = Vec::new();
    let mut offset = 0usize;
    for (oid, value) in members {
        let body = write_object(value)?;
        header.extend_from_slice(format!("{oid} {offset} ").as_bytes());
        offset += body.len() + 1;
        bodies.push(body);
    }
    let first = header.len();
    let mut payload = header;
    for body in &bodies {
        payload.extend_from_slice(body);
        payload.push(b' ');
    }

    let mut dict = Dictionary::new();
    dict.set("Type", "ObjStm");
    dict.set("N", members.len() as i64);
    dict.set("First", first as i64);
    Ok(Stream::new(dict, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::write_object;

    #[test]
    fn pack_then_unpack_round_trips() {
        let members = vec![(5u32, Object::Integer(42)), (6u32, Object::string_literal("hi"))];
        let stream = pack(&members, write_object).unwrap();
        assert!(stream.dict.has_type(b"ObjStm"));
        let unpacked = unpack(&stream).unwrap();
        assert_eq!(unpacked.len(), 2);
        assert_eq!(unpacked[0], (5, Object::Integer(42)));
        assert_eq!(unpacked[1].0, 6);
    }

    #[test]
    fn stream_objects_are_never_packable() {
        let stream_value = Object::Stream(Stream::new(Dictionary::new(), b"x".to_vec()));
        assert!(!is_packable((1, 0), &stream_value, None, None));
    }

    #[test]
    fn encrypt_dictionary_is_never_packable() {
        assert!(!is_packable((9, 0), &Object::Integer(1), Some((9, 0)), None));
    }

    #[test]
    fn nonzero_generation_is_never_packable() {
        assert!(!is_packable((9, 1), &Object::Integer(1), None, None));
    }

    #[test]
    fn catalog_is_never_packable() {
        assert!(!is_packable((3, 0), &Object::Integer(1), None, Some((3, 0))));
    }
}
