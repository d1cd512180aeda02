//! The standard security handler. Decryption is driven entirely from
//! the `/Encrypt` dictionary plus the file's first
//! `/ID` element; every indirect object's strings and stream bytes are
//! decrypted with a key derived from the file key and that object's
//! `(oid, gen)` pair (R2-R4) or the file key directly (R6).

mod key_derivation;
mod rc4;

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptMethod {
    /// Bytes pass through unchanged — the `/StmF` or `/StrF` crypt
    /// filter named `Identity`, or its absence.
    Identity,
    Rc4,
    AesV2,
    AesV3,
}

/// A pluggable alternative to the standard security handler, keyed by
/// the `/Filter` name in `/Encrypt` and registered through
/// [`crate::document::Document::register_security_handler`]. The
/// standard handler (this module) is always tried first; a registered
/// handler only runs when `/Filter` names something other than
/// `Standard`.
pub trait SecurityHandler {
    fn open(&self, encrypt: &Dictionary, id0: &[u8], password: Option<&str>) -> Result<EncryptionState>;
}

/// Everything derived from `/Encrypt` once a password has checked out:
/// the file key and which cipher protects streams and strings.
#[derive(Debug, Clone)]
pub struct EncryptionState {
    file_key: Vec<u8>,
    pub stream_method: CryptMethod,
    pub string_method: CryptMethod,
    pub encrypt_metadata: bool,
    pub r: u8,
}

impl EncryptionState {
    /// Parse `/Encrypt` and authenticate against it, trying the empty
    /// password first (the common "open with no password" case) and
    /// then `password` if supplied.
    pub fn open(encrypt: &Dictionary, id0: &[u8], password: Option<&str>) -> Result<Self> {
        let filter = encrypt.get(b"Filter").and_then(Object::as_name_str).unwrap_or("Standard");
        if filter != "Standard" {
            return Err(Error::UnsupportedEncryption { v: 0, r: 0 });
        }
        let v = encrypt.get(b"V").and_then(Object::as_i64).unwrap_or(0) as u8;
        let r = encrypt.get(b"R").and_then(Object::as_i64).unwrap_or(2) as u8;
        let o_entry = encrypt.get(b"O").and_then(Object::as_str)?.to_vec();
        let u_entry = encrypt.get(b"U").and_then(Object::as_str)?.to_vec();
        let p = encrypt.get(b"P").and_then(Object::as_i64).unwrap_or(0) as i32;
        let encrypt_metadata = encrypt.get(b"EncryptMetadata").and_then(Object::as_bool).unwrap_or(true);
        let key_len_bits = encrypt.get(b"Length").and_then(Object::as_i64).unwrap_or(40);
        let key_len = (key_len_bits as usize) / 8;

        let (stream_method, string_method) = crypt_methods(encrypt, v)?;

        let candidates = match password {
            Some(p) => vec![String::new(), p.to_string()],
            None => vec![String::new()],
        };

        for candidate in candidates {
            let key_result = if r <= 4 {
                authenticate_legacy(candidate.as_bytes(), &o_entry, &u_entry, p, id0, key_len, r, encrypt_metadata)
            } else {
                let normalized = normalize_password_r6(&candidate);
                authenticate_r6(&normalized, encrypt, &u_entry)
            };
            if let Some(file_key) = key_result {
                return Ok(EncryptionState { file_key, stream_method, string_method, encrypt_metadata, r });
            }
        }
        let _ = v;
        Err(Error::InvalidPassword)
    }

    pub fn decrypt_for_object(&self, id: ObjectId, data: &[u8], method: CryptMethod) -> Result<Vec<u8>> {
        match method {
            CryptMethod::Identity => Ok(data.to_vec()),
            CryptMethod::Rc4 => {
                let key = key_derivation::compute_object_key(&self.file_key, id.0, id.1, false);
                Ok(rc4::apply(&key, data))
            }
            CryptMethod::AesV2 => {
                let key = key_derivation::compute_object_key(&self.file_key, id.0, id.1, true);
                aes_cbc_decrypt(&key, data)
            }
            CryptMethod::AesV3 => aes_cbc_decrypt(&self.file_key, data),
        }
    }

    pub fn encrypt_for_object(&self, id: ObjectId, data: &[u8], method: CryptMethod, iv: [u8; 16]) -> Result<Vec<u8>> {
        match method {
            CryptMethod::Identity => Ok(data.to_vec()),
            CryptMethod::Rc4 => {
                let key = key_derivation::compute_object_key(&self.file_key, id.0, id.1, false);
                Ok(rc4::apply(&key, data))
            }
            CryptMethod::AesV2 => {
                let key = key_derivation::compute_object_key(&self.file_key, id.0, id.1, true);
                aes_cbc_encrypt(&key, data, iv)
            }
            CryptMethod::AesV3 => aes_cbc_encrypt(&self.file_key, data, iv),
        }
    }
}

fn crypt_methods(encrypt: &Dictionary, v: u8) -> Result<(CryptMethod, CryptMethod)> {
    if v < 4 {
        return Ok((CryptMethod::Rc4, CryptMethod::Rc4));
    }
    let cf = encrypt.get(b"CF").and_then(Object::as_dict).ok();
    let resolve = |name: &str| -> Result<CryptMethod> {
        if name == "Identity" {
            return Ok(CryptMethod::Identity);
        }
        let Some(cf) = cf else {
            return Ok(CryptMethod::Rc4);
        };
        let entry = cf.get(name.as_bytes()).and_then(Object::as_dict)?;
        match entry.get(b"CFM").and_then(Object::as_name_str).unwrap_or("V2") {
            "AESV2" => Ok(CryptMethod::AesV2),
            "AESV3" => Ok(CryptMethod::AesV3),
            _ => Ok(CryptMethod::Rc4),
        }
    };
    let stm_f = encrypt.get(b"StmF").and_then(Object::as_name_str).unwrap_or("Identity").to_string();
    let str_f = encrypt.get(b"StrF").and_then(Object::as_name_str).unwrap_or("Identity").to_string();
    Ok((resolve(&stm_f)?, resolve(&str_f)?))
}

fn authenticate_legacy(
    password: &[u8],
    o_entry: &[u8],
    u_entry: &[u8],
    p: i32,
    id0: &[u8],
    key_len: usize,
    r: u8,
    encrypt_metadata: bool,
) -> Option<Vec<u8>> {
    let key = key_derivation::compute_file_key_legacy(password, o_entry, p, id0, key_len, r, encrypt_metadata);
    let expected_u = expected_u_entry(&key, id0, r);
    let matches = if r == 2 { expected_u == u_entry } else { expected_u[..16] == u_entry[..16.min(u_entry.len())] };
    matches.then_some(key)
}

fn expected_u_entry(file_key: &[u8], id0: &[u8], r: u8) -> Vec<u8> {
    const PAD: [u8; 32] = [
        0x28, 0xbf, 0x4e, 0x5e, 0x4e, 0x75, 0x8a, 0x41, 0x64, 0x00, 0x4e, 0x56, 0xff, 0xfa, 0x01, 0x08, 0x2e, 0x2e,
        0x00, 0xb6, 0xd0, 0x68, 0x3e, 0x80, 0x2f, 0x0c, 0xa9, 0xfe, 0x64, 0x53, 0x69, 0x7a,
    ];
    if r == 2 {
        rc4::apply(file_key, &PAD)
    } else {
        use md5::{Digest, Md5};
        let mut hasher = Md5::new();
        hasher.update(PAD);
        hasher.update(id0);
        let digest = hasher.finalize();
        let mut result = rc4::apply(file_key, &digest);
        for round in 1..=19u8 {
            let round_key: Vec<u8> = file_key.iter().map(|&b| b ^ round).collect();
            result = rc4::apply(&round_key, &result);
        }
        result.resize(32, 0);
        result
    }
}

/// R6 passwords are SASLprepped (RFC 4013) before hashing, per the
/// standard security handler's Algorithm 2.A. A password containing
/// characters SASLprep prohibits is hashed as given rather than
/// rejected outright — Acrobat's own reader is lenient here.
fn normalize_password_r6(password: &str) -> Vec<u8> {
    let mut bytes = match stringprep::saslprep(password) {
        Ok(normalized) => normalized.as_bytes().to_vec(),
        Err(_) => password.as_bytes().to_vec(),
    };
    bytes.truncate(127);
    bytes
}

fn authenticate_r6(password: &[u8], encrypt: &Dictionary, u_entry: &[u8]) -> Option<Vec<u8>> {
    if u_entry.len() < 48 {
        return None;
    }
    let validation_salt = &u_entry[32..40];
    let key_salt = &u_entry[40..48];
    let hash = key_derivation::hash_r6(password, validation_salt, &[]).ok()?;
    if hash != u_entry[0..32] {
        return None;
    }
    let intermediate = key_derivation::hash_r6(password, key_salt, &[]).ok()?;
    let ue = encrypt.get(b"UE").and_then(Object::as_str).ok()?;
    let file_key = key_derivation::unwrap_file_key_r6(&intermediate, ue).ok()?;
    Some(file_key)
}

/// A fresh IV for one AES-CBC encryption call. Each string/stream gets
/// its own; the leading 16 bytes of ciphertext are the IV, as
/// `aes_cbc_decrypt` expects.
pub fn random_iv() -> [u8; 16] {
    let mut iv = [0u8; 16];
    rand::rng().fill_bytes(&mut iv);
    iv
}

fn aes_cbc_decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < 16 {
        return Ok(Vec::new());
    }
    let (iv, ciphertext) = data.split_at(16);
    if ciphertext.is_empty() {
        return Ok(Vec::new());
    }
    if key.len() == 16 {
        use aes::Aes128;
        use cbc::cipher::block_padding::Pkcs7;
        cbc::Decryptor::<Aes128>::new(key.into(), iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| Error::FilterError("AES-CBC padding invalid".into()))
    } else {
        use aes::Aes256;
        use cbc::cipher::block_padding::Pkcs7;
        cbc::Decryptor::<Aes256>::new(key.into(), iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| Error::FilterError("AES-CBC padding invalid".into()))
    }
}

fn aes_cbc_encrypt(key: &[u8], data: &[u8], iv: [u8; 16]) -> Result<Vec<u8>> {
    let mut out = iv.to_vec();
    if key.len() == 16 {
        use aes::Aes128;
        use cbc::cipher::block_padding::Pkcs7;
        out.extend(cbc::Encryptor::<Aes128>::new(key.into(), (&iv).into()).encrypt_padded_vec_mut::<Pkcs7>(data));
    } else {
        use aes::Aes256;
        use cbc::cipher::block_padding::Pkcs7;
        out.extend(cbc::Encryptor::<Aes256>::new(key.into(), (&iv).into()).encrypt_padded_vec_mut::<Pkcs7>(data));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_for_object_then_decrypt_recovers_plaintext() {
        let state = EncryptionState {
            file_key: vec![9u8; 16],
            stream_method: CryptMethod::AesV2,
            string_method: CryptMethod::Rc4,
            encrypt_metadata: true,
            r: 4,
        };
        let id = (3, 0);
        let stream_plain = b"stream content, not block-aligned".to_vec();
        let encrypted = state.encrypt_for_object(id, &stream_plain, state.stream_method, random_iv()).unwrap();
        let decrypted = state.decrypt_for_object(id, &encrypted, state.stream_method).unwrap();
        assert_eq!(decrypted, stream_plain);

        let string_plain = b"a short string".to_vec();
        let encrypted = state.encrypt_for_object(id, &string_plain, state.string_method, random_iv()).unwrap();
        let decrypted = state.decrypt_for_object(id, &encrypted, state.string_method).unwrap();
        assert_eq!(decrypted, string_plain);
    }

    #[test]
    fn aes_cbc_round_trip() {
        let key = vec![7u8; 16];
        let iv = [3u8; 16];
        let plaintext = b"a stream's plaintext bytes, not block aligned".to_vec();
        let encrypted = aes_cbc_encrypt(&key, &plaintext, iv).unwrap();
        let decrypted = aes_cbc_decrypt(&key, &encrypted).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn normalize_password_r6_truncates_to_127_bytes() {
        let long = "a".repeat(200);
        assert_eq!(normalize_password_r6(&long).len(), 127);
    }

    #[test]
    fn crypt_methods_default_to_rc4_below_v4() {
        let dict = Dictionary::new();
        let (stm, str_) = crypt_methods(&dict, 2).unwrap();
        assert_eq!(stm, CryptMethod::Rc4);
        assert_eq!(str_, CryptMethod::Rc4);
    }

    #[test]
    fn crypt_methods_map_identity_name_to_identity_method() {
        let dict = Dictionary::new();
        let (stm, str_) = crypt_methods(&dict, 4).unwrap();
        assert_eq!(stm, CryptMethod::Identity);
        assert_eq!(str_, CryptMethod::Identity);
    }

    #[test]
    fn identity_method_passes_bytes_through_unencrypted() {
        let state = EncryptionState {
            file_key: vec![9u8; 16],
            stream_method: CryptMethod::Identity,
            string_method: CryptMethod::Identity,
            encrypt_metadata: true,
            r: 4,
        };
        let id = (3, 0);
        let plain = b"never touched by a cipher".to_vec();
        let encrypted = state.encrypt_for_object(id, &plain, CryptMethod::Identity, random_iv()).unwrap();
        assert_eq!(encrypted, plain);
        let decrypted = state.decrypt_for_object(id, &encrypted, CryptMethod::Identity).unwrap();
        assert_eq!(decrypted, plain);
    }
}
