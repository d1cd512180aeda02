use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::filters;
use crate::object::Object;

/// A Stream: a Dictionary plus an opaque, possibly-deferred byte payload
/// and a filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    /// Raw (fully-encoded) payload bytes, once materialized.
    pub content: Vec<u8>,
    /// Byte offset in the owning revision's source where `content` begins,
    /// for streams whose body hasn't been read yet (lazy loading).
    pub start_position: Option<usize>,
}

impl Stream {
    pub fn new(dict: Dictionary, content: Vec<u8>) -> Self {
        let mut stream = Stream { dict, content, start_position: None };
        stream.fix_length();
        stream
    }

    /// Construct a stream whose raw bytes live at `start_position` in the
    /// source and have not been read yet.
    pub fn deferred(dict: Dictionary, start_position: usize) -> Self {
        Stream { dict, content: Vec::new(), start_position: Some(start_position) }
    }

    pub fn set_content(&mut self, content: Vec<u8>) {
        self.content = content;
        self.start_position = None;
        self.fix_length();
    }

    /// `/Length` must equal the byte length of the raw payload; the
    /// writer and any direct content mutation keep this in sync rather
    /// than trusting the stored dictionary value.
    pub fn fix_length(&mut self) {
        self.dict.set("Length", self.content.len() as i64);
    }

    /// Names from `/Filter`, paired with their `/DecodeParms` entry (or
    /// `Null` when absent), in declaration order.
    pub fn filter_chain(&self) -> Result<Vec<(Vec<u8>, Object)>> {
        let filter_obj = match self.dict.get(b"Filter") {
            Ok(obj) => obj,
            Err(_) => return Ok(Vec::new()),
        };
        let parms_obj = self.dict.get(b"DecodeParms").ok();

        let names: Vec<Vec<u8>> = match filter_obj {
            Object::Name(name) => vec![name.clone()],
            Object::Array(arr) => arr.iter().map(|o| o.as_name().map(|n| n.to_vec())).collect::<Result<_>>()?,
            other => return Err(Error::TypeMismatch { expected: "Name or Array", found: other.type_name() }),
        };

        let parms: Vec<Object> = match parms_obj {
            None => vec![Object::Null; names.len()],
            Some(Object::Null) => vec![Object::Null; names.len()],
            Some(Object::Dictionary(_)) => {
                let mut v = vec![Object::Null; names.len()];
                if let Some(first) = v.first_mut() {
                    *first = parms_obj.unwrap().clone();
                }
                v
            }
            Some(Object::Array(arr)) => {
                let mut v: Vec<Object> = arr.clone();
                v.resize(names.len(), Object::Null);
                v
            }
            Some(other) => return Err(Error::TypeMismatch { expected: "DecodeParms", found: other.type_name() }),
        };

        Ok(names.into_iter().zip(parms).collect())
    }

    /// Decode the raw payload through the full filter chain.
    pub fn decompressed_content(&self) -> Result<Vec<u8>> {
        let chain = self.filter_chain()?;
        filters::decode_chain(&self.content, &chain)
    }

    /// Replace the content with `plain` encoded through `chain`, updating
    /// `/Filter`, `/DecodeParms`, and `/Length` to match.
    pub fn set_compressed_content(&mut self, plain: &[u8], chain: &[(Vec<u8>, Object)]) -> Result<()> {
        let encoded = filters::encode_chain(plain, chain)?;
        if chain.len() == 1 {
            self.dict.set("Filter", Object::Name(chain[0].0.clone()));
            if !matches!(chain[0].1, Object::Null) {
                self.dict.set("DecodeParms", chain[0].1.clone());
            } else {
                self.dict.remove(b"DecodeParms");
            }
        } else if !chain.is_empty() {
            self.dict
                .set("Filter", Object::Array(chain.iter().map(|(n, _)| Object::Name(n.clone())).collect()));
            self.dict
                .set("DecodeParms", Object::Array(chain.iter().map(|(_, p)| p.clone()).collect()));
        } else {
            self.dict.remove(b"Filter");
            self.dict.remove(b"DecodeParms");
        }
        self.set_content(encoded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_length_tracks_content() {
        let mut stream = Stream::new(Dictionary::new(), b"hello".to_vec());
        assert_eq!(stream.dict.get(b"Length").unwrap().as_i64().unwrap(), 5);
        stream.set_content(b"hello world".to_vec());
        assert_eq!(stream.dict.get(b"Length").unwrap().as_i64().unwrap(), 11);
    }

    #[test]
    fn filter_chain_defaults_to_empty() {
        let stream = Stream::new(Dictionary::new(), Vec::new());
        assert!(stream.filter_chain().unwrap().is_empty());
    }
}
