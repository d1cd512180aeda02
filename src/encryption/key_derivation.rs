//! Standard security handler key derivation: Algorithm 2 (file key,
//! R2-R4), Algorithm 2.A/2.B (R6), and Algorithm 1 (per-object key for
//! R2-R4's RC4/AES-128).

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::{Digest as _, Md5};
use sha2::{Digest as _, Sha256, Sha384, Sha512};

use crate::error::{Error, Result};

/// §7.6.3.3 "Algorithm 2", step (a): the fixed padding string, used to
/// extend or truncate the supplied password to exactly 32 bytes.
const PAD: [u8; 32] = [
    0x28, 0xbf, 0x4e, 0x5e, 0x4e, 0x75, 0x8a, 0x41, 0x64, 0x00, 0x4e, 0x56, 0xff, 0xfa, 0x01, 0x08, 0x2e, 0x2e, 0x00,
    0xb6, 0xd0, 0x68, 0x3e, 0x80, 0x2f, 0x0c, 0xa9, 0xfe, 0x64, 0x53, 0x69, 0x7a,
];

fn padded_password(password: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let n = password.len().min(32);
    out[..n].copy_from_slice(&password[..n]);
    out[n..].copy_from_slice(&PAD[..32 - n]);
    out
}

/// Algorithm 2: derive the file encryption key for R2-R4 from the
/// (padded) user password and the document's `/O`, `/P`, and first `/ID`
/// element. `key_len` is the key length in bytes (5 for R2, up to 16
/// for R4).
pub fn compute_file_key_legacy(
    password: &[u8],
    o_entry: &[u8],
    p: i32,
    id0: &[u8],
    key_len: usize,
    r: u8,
    encrypt_metadata: bool,
) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(padded_password(password));
    hasher.update(&o_entry[..o_entry.len().min(32)]);
    hasher.update(p.to_le_bytes());
    hasher.update(id0);
    if r >= 4 && !encrypt_metadata {
        hasher.update([0xff, 0xff, 0xff, 0xff]);
    }
    let mut digest = hasher.finalize().to_vec();

    if r >= 3 {
        for _ in 0..50 {
            let mut h = Md5::new();
            h.update(&digest[..key_len]);
            digest = h.finalize().to_vec();
        }
    }
    digest.truncate(key_len);
    digest
}

/// Algorithm 1: the per-object key used when R <= 4. `is_aes` appends
/// the "sAlT" constant per §7.6.2, step (f).
pub fn compute_object_key(file_key: &[u8], oid: u32, gen: u16, is_aes: bool) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(file_key);
    hasher.update(&oid.to_le_bytes()[..3]);
    hasher.update(&gen.to_le_bytes()[..2]);
    if is_aes {
        hasher.update(b"sAlT");
    }
    let digest = hasher.finalize();
    let len = (file_key.len() + 5).min(16);
    digest[..len].to_vec()
}

/// Algorithm 2.B: the R6 iterative hash used to validate passwords and
/// to wrap/unwrap the file key inside `/UE` and `/OE`. `udata` is empty
/// for the user-password hash and the already-validated `/U` string (48
/// bytes) for the owner-password hash.
pub fn hash_r6(password: &[u8], salt: &[u8], udata: &[u8]) -> Result<[u8; 32]> {
    let mut k: Vec<u8> = {
        let mut hasher = Sha256::new();
        hasher.update(password);
        hasher.update(salt);
        hasher.update(udata);
        hasher.finalize().to_vec()
    };

    let mut round = 0usize;
    loop {
        let mut k1 = Vec::with_capacity(64 * (password.len() + k.len() + udata.len()));
        for _ in 0..64 {
            k1.extend_from_slice(password);
            k1.extend_from_slice(&k);
            k1.extend_from_slice(udata);
        }

        let key = &k[0..16];
        let iv = &k[16..32];
        let e = aes128_cbc_encrypt_no_pad(key, iv, &k1)?;

        let remainder = {
            let sum: u32 = e[0..16].iter().map(|&b| b as u32).sum();
            sum % 3
        };
        k = match remainder {
            0 => Sha256::digest(&e).to_vec(),
            1 => Sha384::digest(&e).to_vec(),
            _ => Sha512::digest(&e).to_vec(),
        };

        round += 1;
        if round >= 64 && (*e.last().unwrap() as usize) <= round - 32 {
            break;
        }
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(&k[0..32]);
    Ok(out)
}

fn aes128_cbc_encrypt_no_pad(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    use aes::Aes128;
    type Encryptor = cbc::Encryptor<Aes128>;
    let mut enc = Encryptor::new(key.into(), iv.into());
    let mut buf = data.to_vec();
    for chunk in buf.chunks_mut(16) {
        let block = aes::cipher::generic_array::GenericArray::from_mut_slice(chunk);
        enc.encrypt_block_mut(block);
    }
    Ok(buf)
}

/// Decrypt `/UE` or `/OE` with the intermediate key from Algorithm 2.B
/// (zero IV, no padding) to recover the 32-byte file encryption key,
/// per §7.6.4.3.3 Algorithm 2.A steps (h)-(i).
pub fn unwrap_file_key_r6(intermediate_key: &[u8; 32], wrapped: &[u8]) -> Result<Vec<u8>> {
    if wrapped.len() != 32 {
        return Err(Error::ValidationError("UE/OE must be 32 bytes".into()));
    }
    use aes::Aes256;
    type Decryptor = cbc::Decryptor<Aes256>;
    let iv = [0u8; 16];
    let mut dec = Decryptor::new(intermediate_key.into(), (&iv).into());
    let mut buf = wrapped.to_vec();
    for chunk in buf.chunks_mut(16) {
        let block = aes::cipher::generic_array::GenericArray::from_mut_slice(chunk);
        dec.decrypt_block_mut(block);
    }
    Ok(buf)
}

/// Inverse of [`unwrap_file_key_r6`], used when writing a new R6
/// `/UE`/`/OE` pair.
pub fn wrap_file_key_r6(intermediate_key: &[u8; 32], file_key: &[u8; 32]) -> Result<Vec<u8>> {
    use aes::Aes256;
    type Encryptor = cbc::Encryptor<Aes256>;
    let iv = [0u8; 16];
    let mut enc = Encryptor::new(intermediate_key.into(), (&iv).into());
    let mut buf = file_key.to_vec();
    for chunk in buf.chunks_mut(16) {
        let block = aes::cipher::generic_array::GenericArray::from_mut_slice(chunk);
        enc.encrypt_block_mut(block);
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_password_extends_short_input() {
        let padded = padded_password(b"abc");
        assert_eq!(&padded[0..3], b"abc");
        assert_eq!(&padded[3..], &PAD[..29]);
    }

    #[test]
    fn padded_password_truncates_long_input() {
        let long = [b'x'; 40];
        let padded = padded_password(&long);
        assert_eq!(padded, [b'x'; 32]);
    }

    #[test]
    fn file_key_is_deterministic_for_same_inputs() {
        let k1 = compute_file_key_legacy(b"", b"owner-hash-placeholder-32-bytes", -1, b"docid", 16, 4, true);
        let k2 = compute_file_key_legacy(b"", b"owner-hash-placeholder-32-bytes", -1, b"docid", 16, 4, true);
        assert_eq!(k1, k2);
        assert_eq!(k1.len(), 16);
    }

    #[test]
    fn object_key_depends_on_object_id() {
        let file_key = vec![1u8; 16];
        let k1 = compute_object_key(&file_key, 3, 0, false);
        let k2 = compute_object_key(&file_key, 4, 0, false);
        assert_ne!(k1, k2);
        assert_eq!(k1.len(), 16.min(file_key.len() + 5));
    }
}
