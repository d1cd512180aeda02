//! Parses and formats the `D:YYYYMMDDHHmmSSOHH'mm'` date string used by
//! `/CreationDate` and `/ModDate`. These fields are opaque metadata to
//! the core; no calendar crate is pulled in just to carry them around.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Offset from UTC in minutes; `None` means the relationship to UTC
    /// is unspecified (a bare `D:YYYYMMDDHHmmSS` with no trailing `O`).
    pub tz_offset_minutes: Option<i16>,
}

/// Parse a PDF date string, tolerating the optional leading `D:` and a
/// string shorter than the full 23-character form (every field after
/// the year is individually optional, per PDF 1.7 §7.9.4).
pub fn parse(text: &[u8]) -> Result<PdfDate> {
    let text = text.strip_prefix(b"D:").unwrap_or(text);
    if text.len() < 4 {
        return Err(Error::ValidationError("PDF date string shorter than a year".into()));
    }

    let year = digits(&text[0..4])?;
    let month = optional_field(text, 4, 2)?.unwrap_or(1).clamp(1, 12);
    let day = optional_field(text, 6, 2)?.unwrap_or(1).clamp(1, 31);
    let hour = optional_field(text, 8, 2)?.unwrap_or(0);
    let minute = optional_field(text, 10, 2)?.unwrap_or(0);
    let second = optional_field(text, 12, 2)?.unwrap_or(0);

    let tz_offset_minutes = match text.get(14).copied() {
        Some(b'Z') | None => None,
        Some(sign @ (b'+' | b'-')) => {
            let hours = optional_field(text, 15, 2)?.unwrap_or(0) as i16;
            let minutes = if text.get(17) == Some(&b'\'') {
                optional_field(text, 18, 2)?.unwrap_or(0) as i16
            } else {
                0
            };
            let magnitude = hours * 60 + minutes;
            Some(if sign == b'-' { -magnitude } else { magnitude })
        }
        Some(_) => None,
    };

    Ok(PdfDate { year: year as u16, month: month as u8, day: day as u8, hour, minute, second, tz_offset_minutes })
}

fn digits(field: &[u8]) -> Result<u32> {
    std::str::from_utf8(field)
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(|| Error::ValidationError("non-numeric field in PDF date string".into()))
}

fn optional_field(text: &[u8], offset: usize, width: usize) -> Result<Option<u8>> {
    let Some(field) = text.get(offset..offset + width) else {
        return Ok(None);
    };
    Ok(Some(digits(field)? as u8))
}

/// Render `date` as the canonical `D:YYYYMMDDHHmmSSOHH'mm'` form (always
/// the fully-qualified form, even when `tz_offset_minutes` is `None` —
/// rendered as `Z` in that case).
pub fn format(date: &PdfDate) -> String {
    let mut out = format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}",
        date.year, date.month, date.day, date.hour, date.minute, date.second
    );
    match date.tz_offset_minutes {
        None => out.push('Z'),
        Some(offset) => {
            let sign = if offset < 0 { '-' } else { '+' };
            let magnitude = offset.unsigned_abs();
            out.push_str(&format!("{sign}{:02}'{:02}'", magnitude / 60, magnitude % 60));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_form_with_offset() {
        let date = parse(b"D:20231231235959+05'30'").unwrap();
        assert_eq!(date, PdfDate {
            year: 2023,
            month: 12,
            day: 31,
            hour: 23,
            minute: 59,
            second: 59,
            tz_offset_minutes: Some(5 * 60 + 30),
        });
    }

    #[test]
    fn parses_year_only_form() {
        let date = parse(b"D:2023").unwrap();
        assert_eq!(date.year, 2023);
        assert_eq!(date.month, 1);
        assert_eq!(date.tz_offset_minutes, None);
    }

    #[test]
    fn format_then_parse_round_trips() {
        let date = PdfDate { year: 2024, month: 6, day: 15, hour: 8, minute: 5, second: 0, tz_offset_minutes: Some(-300) };
        let text = format(&date);
        assert_eq!(parse(text.as_bytes()).unwrap(), date);
    }
}
