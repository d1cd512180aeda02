//! Predictor pre/post-processing applied adjacent to Flate/LZW. TIFF
//! mode 2 and PNG modes 10-15.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct PredictorParams {
    pub predictor: i64,
    pub colors: i64,
    pub bits_per_component: i64,
    pub columns: i64,
}

impl Default for PredictorParams {
    fn default() -> Self {
        PredictorParams { predictor: 1, colors: 1, bits_per_component: 8, columns: 1 }
    }
}

impl PredictorParams {
    fn bytes_per_pixel(&self) -> usize {
        (((self.colors * self.bits_per_component) + 7) / 8).max(1) as usize
    }

    fn row_bytes(&self) -> usize {
        (((self.colors * self.bits_per_component * self.columns) + 7) / 8) as usize
    }
}

/// Reverse whatever predictor transform was applied before Flate/LZW
/// encoding. A no-op when `predictor < 2`.
pub fn unpredict(data: &[u8], params: PredictorParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => Ok(tiff_unpredict(data, params)),
        10..=15 => png_unpredict(data, params),
        other => Err(Error::FilterError(format!("unsupported predictor {other}"))),
    }
}

/// Apply the predictor transform before Flate/LZW encoding. PNG
/// "optimum" (15) always selects Paeth on encode.
pub fn predict(data: &[u8], params: PredictorParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => Ok(tiff_predict(data, params)),
        10 => Ok(png_predict_fixed(data, params, 0)),
        11 => Ok(png_predict_fixed(data, params, 1)),
        12 => Ok(png_predict_fixed(data, params, 2)),
        13 => Ok(png_predict_fixed(data, params, 3)),
        14 | 15 => Ok(png_predict_fixed(data, params, 4)),
        other => Err(Error::FilterError(format!("unsupported predictor {other}"))),
    }
}

fn tiff_unpredict(data: &[u8], params: PredictorParams) -> Vec<u8> {
    if params.bits_per_component != 8 {
        // Sub-byte sample widths aren't exercised by this crate's callers;
        // pass through unchanged rather than guess at bit packing.
        return data.to_vec();
    }
    let row_len = params.row_bytes();
    let colors = params.colors as usize;
    let mut out = data.to_vec();
    for row in out.chunks_mut(row_len) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }
    out
}

fn tiff_predict(data: &[u8], params: PredictorParams) -> Vec<u8> {
    if params.bits_per_component != 8 {
        return data.to_vec();
    }
    let row_len = params.row_bytes();
    let colors = params.colors as usize;
    let mut out = data.to_vec();
    for row in out.chunks_mut(row_len) {
        for i in (colors..row.len()).rev() {
            row[i] = row[i].wrapping_sub(row[i - colors]);
        }
    }
    out
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let (a, b, c) = (a as i32, b as i32, c as i32);
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}

fn png_unpredict(data: &[u8], params: PredictorParams) -> Result<Vec<u8>> {
    let bpp = params.bytes_per_pixel();
    let row_len = params.row_bytes();
    let stride = row_len + 1;
    if row_len == 0 || data.len() % stride != 0 {
        return Err(Error::FilterError("PNG predictor row length mismatch".into()));
    }
    let rows = data.len() / stride;
    let mut out = vec![0u8; rows * row_len];
    let mut prev_row = vec![0u8; row_len];
    for r in 0..rows {
        let chunk = &data[r * stride..(r + 1) * stride];
        let filter_type = chunk[0];
        let raw = &chunk[1..];
        let out_row = &mut out[r * row_len..(r + 1) * row_len];
        for i in 0..row_len {
            let a = if i >= bpp { out_row[i - bpp] } else { 0 };
            let b = prev_row[i];
            let c = if i >= bpp { prev_row[i - bpp] } else { 0 };
            out_row[i] = match filter_type {
                0 => raw[i],
                1 => raw[i].wrapping_add(a),
                2 => raw[i].wrapping_add(b),
                3 => raw[i].wrapping_add(((a as u16 + b as u16) / 2) as u8),
                4 => raw[i].wrapping_add(paeth(a, b, c)),
                other => return Err(Error::FilterError(format!("unknown PNG filter type {other}"))),
            };
        }
        prev_row.copy_from_slice(out_row);
    }
    Ok(out)
}

fn png_predict_fixed(data: &[u8], params: PredictorParams, filter_type: u8) -> Vec<u8> {
    let bpp = params.bytes_per_pixel();
    let row_len = params.row_bytes();
    if row_len == 0 {
        return Vec::new();
    }
    let rows = data.len().div_ceil(row_len);
    let mut out = Vec::with_capacity(rows * (row_len + 1));
    let mut prev_row = vec![0u8; row_len];
    for r in 0..rows {
        let start = r * row_len;
        let end = (start + row_len).min(data.len());
        let mut row = vec![0u8; row_len];
        row[..end - start].copy_from_slice(&data[start..end]);

        out.push(filter_type);
        for i in 0..row_len {
            let a = if i >= bpp { row[i - bpp] } else { 0 };
            let b = prev_row[i];
            let c = if i >= bpp { prev_row[i - bpp] } else { 0 };
            let byte = match filter_type {
                0 => row[i],
                1 => row[i].wrapping_sub(a),
                2 => row[i].wrapping_sub(b),
                3 => row[i].wrapping_sub(((a as u16 + b as u16) / 2) as u8),
                4 => row[i].wrapping_sub(paeth(a, b, c)),
                _ => row[i],
            };
            out.push(byte);
        }
        prev_row = row;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_up_predictor_round_trip() {
        // 5x5 greyscale raster, rows increasing by 10 down each column.
        let rows: Vec<Vec<u8>> =
            (0..5).map(|r| (0..5).map(|c| 10 + 10 * c as u8 + 10 * r as u8).collect()).collect();
        let flat: Vec<u8> = rows.iter().flatten().copied().collect();
        let params = PredictorParams { predictor: 12, colors: 1, bits_per_component: 8, columns: 5 };

        let encoded = png_predict_fixed(&flat, params, 2);
        // First row: filter byte 2 (Up), deltas against an all-zero previous row.
        assert_eq!(&encoded[0..6], &[2, 10, 20, 30, 40, 50]);

        let decoded = unpredict(&encoded, params).unwrap();
        assert_eq!(decoded, flat);
    }

    #[test]
    fn tiff_predictor_round_trip() {
        let data = vec![10u8, 20, 30, 5, 15, 25];
        let params = PredictorParams { predictor: 2, colors: 3, bits_per_component: 8, columns: 1 };
        let predicted = predict(&data, params).unwrap();
        let restored = unpredict(&predicted, params).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn optimum_predictor_always_paeth_on_encode() {
        let data = vec![1u8, 2, 3, 4];
        let params = PredictorParams { predictor: 15, colors: 1, bits_per_component: 8, columns: 4 };
        let encoded = predict(&data, params).unwrap();
        assert_eq!(encoded[0], 4);
    }
}
