//! ASCII85 filter: Adobe's base-85 variant, `z` shorthand for an
//! all-zero 4-byte group, `~>` terminator.

use crate::error::{Error, Result};

const TERMINATOR: &[u8] = b"~>";

pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut group = [0u8; 5];
    let mut count = 0usize;

    let mut i = 0usize;
    while i < data.len() {
        let b = data[i];
        if b == b'~' {
            break;
        }
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if b == b'z' {
            if count != 0 {
                return Err(Error::FilterError("ascii85: 'z' inside a group".into()));
            }
            out.extend_from_slice(&[0, 0, 0, 0]);
            i += 1;
            continue;
        }
        if !(b'!'..=b'u').contains(&b) {
            return Err(Error::FilterError(format!("ascii85: byte out of range: 0x{b:02x}")));
        }
        group[count] = b - b'!';
        count += 1;
        if count == 5 {
            out.extend_from_slice(&decode_group(&group, 5)?);
            count = 0;
        }
        i += 1;
    }

    if count == 1 {
        return Err(Error::FilterError("ascii85: trailing group of one byte".into()));
    }
    if count > 0 {
        let mut padded = group;
        for slot in padded.iter_mut().take(5).skip(count) {
            *slot = 84;
        }
        let full = decode_group(&padded, 5)?;
        out.extend_from_slice(&full[..count - 1]);
    }
    Ok(out)
}

fn decode_group(digits: &[u8; 5], _len: usize) -> Result<[u8; 4]> {
    let mut value: u64 = 0;
    for &d in digits {
        value = value * 85 + d as u64;
    }
    if value > u32::MAX as u64 {
        return Err(Error::FilterError("ascii85: group overflows 32 bits".into()));
    }
    Ok((value as u32).to_be_bytes())
}

pub fn encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for chunk in data.chunks(4) {
        if chunk.len() == 4 && chunk == [0, 0, 0, 0] {
            out.push(b'z');
            continue;
        }
        let mut buf = [0u8; 4];
        buf[..chunk.len()].copy_from_slice(chunk);
        let mut value = u32::from_be_bytes(buf) as u64;
        let mut digits = [0u8; 5];
        for slot in digits.iter_mut().rev() {
            *slot = (value % 85) as u8;
            value /= 85;
        }
        let keep = chunk.len() + 1;
        for &d in digits.iter().take(keep) {
            out.push(d + b'!');
        }
    }
    out.extend_from_slice(TERMINATOR);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_vector() {
        let encoded = encode(b"Man ").unwrap();
        assert_eq!(&encoded, b"9jqo^~>");
    }

    #[test]
    fn round_trip_with_zero_group_shorthand() {
        let data = vec![0u8; 4].into_iter().chain(*b"hello").collect::<Vec<u8>>();
        let encoded = encode(&data).unwrap();
        assert!(encoded.contains(&b'z'));
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn rejects_out_of_range_byte() {
        assert!(decode(b"v~>").is_err());
    }
}
