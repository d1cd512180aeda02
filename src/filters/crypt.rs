//! The `Crypt` filter name marks a stream's bytes as
//! already encrypted under a named crypt filter rather than applying
//! any transform itself; decryption happens once, document-wide, in
//! `crate::encryption`. Anything other than the `Identity` crypt
//! filter name reaching this stage means a stream asked for a crypt
//! filter this crate doesn't implement.

use crate::error::{Error, Result};

pub fn decode(data: &[u8], name: &str) -> Result<Vec<u8>> {
    if name == "Identity" {
        Ok(data.to_vec())
    } else {
        Err(Error::Unsupported("non-Identity Crypt filter"))
    }
}

pub fn encode(data: &[u8], name: &str) -> Result<Vec<u8>> {
    decode(data, name)
}
