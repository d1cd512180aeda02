//! LZW filter: early-change variant, MSB bit order,
//! 9-to-12 bit codes, CLEAR=256/EOD=257. `weezl` implements the
//! variable-width codec itself; this module only wires PDF's fixed
//! parameters into it.

use weezl::{decode::Decoder, encode::Encoder, BitOrder};

use crate::error::{Error, Result};

const MIN_CODE_SIZE: u8 = 8;

pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = Decoder::new(BitOrder::Msb, MIN_CODE_SIZE);
    decoder.decode(data).map_err(|e| Error::FilterError(format!("lzw: {e}")))
}

pub fn encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(BitOrder::Msb, MIN_CODE_SIZE);
    encoder.encode(data).map_err(|e| Error::FilterError(format!("lzw: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let data = b"aaaaaaaaaabbbbbbbbbbccccccccccaaaaaaaaaa".to_vec();
        let encoded = encode(&data).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }
}
