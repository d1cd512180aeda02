//! RunLength filter: the PackBits
//! variant. A length byte `n < 128` copies the following `n + 1` literal
//! bytes; `n > 128` repeats the single following byte `257 - n` times;
//! `n == 128` is EOD.

use crate::error::{Error, Result};

const EOD: u8 = 128;

pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < data.len() {
        let n = data[i];
        i += 1;
        if n == EOD {
            break;
        } else if n < EOD {
            let count = n as usize + 1;
            let end = i + count;
            if end > data.len() {
                return Err(Error::FilterError("runlength: literal run truncated".into()));
            }
            out.extend_from_slice(&data[i..end]);
            i = end;
        } else {
            let Some(&byte) = data.get(i) else {
                return Err(Error::FilterError("runlength: repeat run truncated".into()));
            };
            let count = 257 - n as usize;
            out.extend(std::iter::repeat_n(byte, count));
            i += 1;
        }
    }
    Ok(out)
}

pub fn encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < data.len() {
        let run_len = run_length_at(data, i);
        if run_len >= 2 {
            out.push((257 - run_len) as u8);
            out.push(data[i]);
            i += run_len;
        } else {
            let lit_len = literal_length_at(data, i);
            out.push((lit_len - 1) as u8);
            out.extend_from_slice(&data[i..i + lit_len]);
            i += lit_len;
        }
    }
    out.push(EOD);
    Ok(out)
}

fn run_length_at(data: &[u8], start: usize) -> usize {
    let b = data[start];
    let mut len = 1;
    while start + len < data.len() && data[start + len] == b && len < 128 {
        len += 1;
    }
    len
}

fn literal_length_at(data: &[u8], start: usize) -> usize {
    let mut len = 1;
    while start + len < data.len() && len < 128 {
        if run_length_at(data, start + len) >= 2 {
            break;
        }
        len += 1;
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_literal_and_repeat_runs() {
        let encoded = [2, b'a', b'b', b'c', 254, b'x', EOD];
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, b"abcxxx");
    }

    #[test]
    fn round_trip() {
        let data = b"aaaaaaaaaaabcdefgggggggggggggg".to_vec();
        let encoded = encode(&data).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }
}
