//! Builds values from the tokenizer and resolves indirect-object and
//! cross-reference file structure.

use std::collections::HashMap;

use crate::dictionary::Dictionary;
use crate::error::{ParseError, Result, XrefError};
use crate::object::{Object, ObjectId};
use crate::stream::Stream;
use crate::tokenizer::{Token, Tokenizer};
use crate::xref::Xref;

/// `%PDF-M.m` header, returning `(major, minor)`.
pub fn parse_header(source: &[u8]) -> Result<(u8, u8)> {
    let marker_pos = source
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or_else(|| ParseError::MalformedInput { offset: 0, reason: "missing %PDF- header".into() })?;
    let rest = &source[marker_pos + 5..];
    let end = rest.iter().position(|&b| b == b'\n' || b == b'\r').unwrap_or(rest.len());
    let text = std::str::from_utf8(&rest[..end])
        .map_err(|_| ParseError::MalformedInput { offset: marker_pos, reason: "non-UTF8 header".into() })?;
    let mut parts = text.trim().splitn(2, '.');
    let major: u8 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ParseError::UnsupportedVersion(text.to_string()))?;
    let minor: u8 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ParseError::UnsupportedVersion(text.to_string()))?;
    if !matches!((major, minor), (1, 0..=7) | (2, 0)) {
        return Err(ParseError::UnsupportedVersion(format!("{major}.{minor}")).into());
    }
    Ok((major, minor))
}

/// Parse a single PDF value at the tokenizer's current position.
pub fn parse_value(tok: &mut Tokenizer) -> Result<Object> {
    let start = tok.position();
    match tok.next_token()? {
        Token::Keyword(k) if k == b"true" => Ok(Object::Boolean(true)),
        Token::Keyword(k) if k == b"false" => Ok(Object::Boolean(false)),
        Token::Keyword(k) if k == b"null" => Ok(Object::Null),
        Token::Keyword(k) => {
            Err(ParseError::UnexpectedToken { offset: start, found: String::from_utf8_lossy(&k).into_owned() }.into())
        }
        Token::Name(n) => Ok(Object::Name(n)),
        Token::String(s, f) => Ok(Object::String(s, f)),
        Token::Real(r) => Ok(Object::Real(r)),
        Token::Integer(i) => Ok(resolve_reference_lookahead(tok, i)),
        Token::ArrayStart => {
            let mut items = Vec::new();
            loop {
                let save = tok.position();
                match tok.next_token()? {
                    Token::ArrayEnd => break,
                    _ => {
                        tok.seek(save);
                        items.push(parse_value(tok)?);
                    }
                }
            }
            Ok(Object::Array(items))
        }
        Token::DictStart => {
            let dict = parse_dictionary_body(tok)?;
            parse_optional_stream_body(tok, dict)
        }
        other => Err(ParseError::UnexpectedToken { offset: start, found: format!("{other:?}") }.into()),
    }
}

/// An `Integer` may be the start of an `oid gen R` reference; look ahead
/// up to two tokens and rewind if it isn't.
fn resolve_reference_lookahead(tok: &mut Tokenizer, first: i64) -> Object {
    if first < 0 {
        return Object::Integer(first);
    }
    let after_first = tok.position();
    if let Ok(Token::Integer(gen)) = tok.next_token() {
        if gen >= 0 {
            let after_gen = tok.position();
            if let Ok(Token::Keyword(k)) = tok.next_token() {
                if k == b"R" {
                    return Object::Reference((first as u32, gen as u16));
                }
            }
            tok.seek(after_gen);
        }
    }
    tok.seek(after_first);
    Object::Integer(first)
}

fn parse_dictionary_body(tok: &mut Tokenizer) -> Result<Dictionary> {
    let mut dict = Dictionary::new();
    loop {
        let save = tok.position();
        match tok.next_token()? {
            Token::DictEnd => break,
            Token::Name(key) => {
                let value = parse_value(tok)?;
                dict.set(key, value);
            }
            _ => {
                tok.seek(save);
                return Err(ParseError::UnexpectedToken { offset: save, found: "expected Name or '>>'".into() }.into());
            }
        }
    }
    Ok(dict)
}

/// After a dictionary, check whether `stream ... endstream` follows; if
/// so, extract the raw payload (strip the leading EOL, honor `/Length`
/// when direct, recover by scanning for `endstream` otherwise).
fn parse_optional_stream_body(tok: &mut Tokenizer, dict: Dictionary) -> Result<Object> {
    let save = tok.position();
    match tok.next_token() {
        Ok(Token::StreamKeyword) => {}
        _ => {
            tok.seek(save);
            return Ok(Object::Dictionary(dict));
        }
    }
    let source = tok.source();
    let mut body_start = tok.position();
    if source.get(body_start) == Some(&b'\r') && source.get(body_start + 1) == Some(&b'\n') {
        body_start += 2;
    } else if source.get(body_start) == Some(&b'\n') {
        body_start += 1;
    }

    let direct_length = dict.get(b"Length").ok().and_then(|o| o.as_i64().ok()).filter(|&n| n >= 0).map(|n| n as usize);

    let content_end = match direct_length {
        Some(len) if body_start + len <= source.len() && ends_with_endstream(source, body_start + len) => {
            body_start + len
        }
        _ => find_endstream(source, body_start)?,
    };

    tok.seek(content_end);
    match tok.next_token() {
        Ok(Token::Keyword(k)) if k == b"endstream" => {}
        _ => return Err(ParseError::MalformedInput { offset: content_end, reason: "missing endstream".into() }.into()),
    }

    Ok(Object::Stream(Stream::new(dict, source[body_start..content_end].to_vec())))
}

fn ends_with_endstream(source: &[u8], mut pos: usize) -> bool {
    while matches!(source.get(pos), Some(b) if b.is_ascii_whitespace()) {
        pos += 1;
    }
    source[pos..].starts_with(b"endstream")
}

fn find_endstream(source: &[u8], from: usize) -> Result<usize> {
    let needle = b"endstream";
    let pos = source[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .ok_or_else(|| ParseError::MalformedInput { offset: from, reason: "endstream not found".into() })?;
    let mut end = from + pos;
    // Trim the single EOL that precedes `endstream` (not counted in the payload).
    if end >= from + 2 && &source[end - 2..end] == b"\r\n" {
        end -= 2;
    } else if end >= from + 1 && matches!(source[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    Ok(end)
}

/// Parse `oid gen obj ... endobj` at `offset`.
pub fn parse_indirect_object(source: &[u8], offset: usize) -> Result<(ObjectId, Object)> {
    let mut tok = Tokenizer::at(source, offset);
    let oid = match tok.next_token()? {
        Token::Integer(i) if i >= 0 => i as u32,
        other => return Err(ParseError::UnexpectedToken { offset, found: format!("{other:?}") }.into()),
    };
    let gen = match tok.next_token()? {
        Token::Integer(i) if i >= 0 => i as u16,
        other => return Err(ParseError::UnexpectedToken { offset, found: format!("{other:?}") }.into()),
    };
    match tok.next_token()? {
        Token::Keyword(k) if k == b"obj" => {}
        other => return Err(ParseError::UnexpectedToken { offset, found: format!("{other:?}") }.into()),
    }
    let value = parse_value(&mut tok)?;
    let save = tok.position();
    match tok.next_token() {
        Ok(Token::Keyword(k)) if k == b"endobj" => {}
        _ => tok.seek(save), // permissive: tolerate a missing endobj
    }
    Ok(((oid, gen), value))
}

/// Read a classic `xref` table or an xref-stream object at `offset`,
/// returning its entries and the trailer dictionary that follows (or, for
/// a stream, the stream's own dictionary).
pub fn parse_xref_and_trailer(source: &[u8], offset: usize) -> Result<(Xref, Dictionary)> {
    let mut probe = Tokenizer::at(source, offset);
    if let Ok(Token::Keyword(k)) = probe.next_token() {
        if k == b"xref" {
            return parse_classic_xref(source, probe.position());
        }
    }
    parse_xref_stream(source, offset)
}

fn parse_classic_xref(source: &[u8], mut pos: usize) -> Result<(Xref, Dictionary)> {
    let mut xref = Xref::new();
    loop {
        let mut tok = Tokenizer::at(source, pos);
        let save = tok.position();
        match tok.next_token()? {
            Token::Keyword(k) if k == b"trailer" => {
                pos = tok.position();
                break;
            }
            Token::Integer(first) if first >= 0 => {
                let count = match tok.next_token()? {
                    Token::Integer(c) if c >= 0 => c as u32,
                    other => return Err(ParseError::UnexpectedToken { offset: save, found: format!("{other:?}") }.into()),
                };
                pos = tok.position();
                for i in 0..count {
                    let (offset_val, gen, ty, next_pos) = scan_xref_entry(source, pos)?;
                    pos = next_pos;
                    let oid = first as u32 + i;
                    match ty {
                        b'n' => xref.add_in_use(oid, gen, offset_val),
                        _ => xref.add_free(oid, offset_val as u32, gen),
                    }
                }
            }
            other => return Err(ParseError::UnexpectedToken { offset: save, found: format!("{other:?}") }.into()),
        }
    }
    let mut tok = Tokenizer::at(source, pos);
    match tok.next_token()? {
        Token::DictStart => {
            let trailer = parse_dictionary_body(&mut tok)?;
            Ok((xref, trailer))
        }
        other => Err(ParseError::UnexpectedToken { offset: pos, found: format!("{other:?}") }.into()),
    }
}

/// Scan one fixed-ish xref entry: `<offset> <gen> <n|f>`, tolerant of
/// the exact two-byte EOL PDF allows to vary.
fn scan_xref_entry(source: &[u8], mut pos: usize) -> Result<(u64, u16, u8, usize)> {
    pos = skip_ascii_whitespace(source, pos);
    let (offset_val, next) = scan_digits(source, pos)?;
    pos = skip_ascii_whitespace(source, next);
    let (gen, next) = scan_digits(source, pos)?;
    pos = skip_ascii_whitespace(source, next);
    let ty = *source.get(pos).ok_or(XrefError::InconsistentSize)?;
    pos += 1;
    while matches!(source.get(pos), Some(b) if b.is_ascii_whitespace()) {
        pos += 1;
    }
    Ok((offset_val, gen as u16, ty, pos))
}

fn skip_ascii_whitespace(source: &[u8], mut pos: usize) -> usize {
    while matches!(source.get(pos), Some(b) if b.is_ascii_whitespace()) {
        pos += 1;
    }
    pos
}

fn scan_digits(source: &[u8], pos: usize) -> Result<(u64, usize)> {
    let start = pos;
    let mut end = pos;
    while matches!(source.get(end), Some(b) if b.is_ascii_digit()) {
        end += 1;
    }
    if end == start {
        return Err(ParseError::InvalidXref.into());
    }
    let text = std::str::from_utf8(&source[start..end]).unwrap();
    Ok((text.parse().map_err(|_| ParseError::InvalidXref)?, end))
}

fn parse_xref_stream(source: &[u8], offset: usize) -> Result<(Xref, Dictionary)> {
    let (_, object) = parse_indirect_object(source, offset)?;
    let stream = object.as_stream()?;
    if !stream.dict.has_type(b"XRef") {
        return Err(ParseError::InvalidXref.into());
    }
    let decoded = stream.decompressed_content()?;

    let widths: Vec<usize> = stream
        .dict
        .get(b"W")?
        .as_array()?
        .iter()
        .map(|o| o.as_i64().map(|i| i as usize))
        .collect::<Result<_>>()?;
    if widths.len() != 3 {
        return Err(ParseError::InvalidXref.into());
    }
    let size = stream.dict.get(b"Size")?.as_i64()? as u32;
    let index: Vec<(u32, u32)> = match stream.dict.get(b"Index") {
        Ok(Object::Array(arr)) => arr
            .chunks(2)
            .map(|c| Ok((c[0].as_i64()? as u32, c[1].as_i64()? as u32)))
            .collect::<Result<_>>()?,
        _ => vec![(0, size)],
    };

    let mut xref = Xref::new();
    let entry_width: usize = widths.iter().sum();
    if entry_width == 0 {
        return Err(ParseError::InvalidXref.into());
    }
    let mut cursor = 0usize;
    for (first, count) in index {
        for i in 0..count {
            if cursor + entry_width > decoded.len() {
                break;
            }
            let oid = first + i;
            let field = |start: usize, width: usize| -> u64 {
                decoded[start..start + width].iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
            };
            let ty = if widths[0] == 0 { 1 } else { field(cursor, widths[0]) };
            let f2 = field(cursor + widths[0], widths[1]);
            let f3 = if widths[2] == 0 { 0 } else { field(cursor + widths[0] + widths[1], widths[2]) };
            match ty {
                0 => xref.add_free(oid, f2 as u32, f3 as u16),
                1 => xref.add_in_use(oid, f3 as u16, f2),
                2 => xref.add_compressed(oid, f2 as u32, f3 as u32),
                _ => {}
            }
            cursor += entry_width;
        }
    }

    let mut trailer = stream.dict.clone();
    for key in [b"Length".as_slice(), b"Filter", b"DecodeParms", b"W", b"Index", b"Type"] {
        trailer.remove(key);
    }
    Ok((xref, trailer))
}

/// Locate `startxref`'s target offset by scanning backward from EOF, the
/// way a permissive reader tolerates trailing garbage after `%%EOF`.
pub fn find_xref_start(source: &[u8]) -> Result<usize> {
    let tail_from = source.len().saturating_sub(2048);
    let eof_pos = rfind(source, b"%%EOF", tail_from).ok_or(XrefError::Start)?;
    let startxref_pos = rfind(source, b"startxref", tail_from.min(eof_pos)).ok_or(XrefError::Start)?;
    let mut tok = Tokenizer::at(source, startxref_pos + b"startxref".len());
    match tok.next_token() {
        Ok(Token::Integer(offset)) if offset >= 0 => Ok(offset as usize),
        _ => Err(XrefError::Start.into()),
    }
}

fn rfind(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack.get(from..)?.windows(needle.len()).rposition(|w| w == needle).map(|p| from + p)
}

/// Scan the whole file for `oid gen obj` occurrences and build a
/// synthetic xref from the last (newest) occurrence of each oid — the
/// fallback when the classic/stream xref can't be located or is
/// inconsistent.
pub fn reconstruct(source: &[u8]) -> Result<(Xref, Dictionary)> {
    let mut found: HashMap<u32, (u16, usize)> = HashMap::new();
    let mut trailer = Dictionary::new();
    let mut pos = 0usize;
    while pos < source.len() {
        let mut tok = Tokenizer::at(source, pos);
        let start = tok.position();
        match tok.next_token() {
            Ok(Token::Integer(first)) if first >= 0 => {
                let after_first = tok.position();
                match tok.next_token() {
                    Ok(Token::Integer(second)) if second >= 0 => {
                        let after_second = tok.position();
                        match tok.next_token() {
                            Ok(Token::Keyword(k)) if k == b"obj" => {
                                found.insert(first as u32, (second as u16, start));
                                pos = tok.position();
                                continue;
                            }
                            _ => {
                                pos = after_second;
                            }
                        }
                    }
                    _ => pos = after_first,
                }
            }
            Ok(Token::Keyword(k)) if k == b"trailer" => {
                if let Ok(Token::DictStart) = tok.next_token() {
                    if let Ok(dict) = parse_dictionary_body(&mut tok) {
                        for (key, value) in dict.iter() {
                            trailer.set(key.clone(), value.clone());
                        }
                    }
                }
                pos = tok.position();
                continue;
            }
            _ => {}
        }
        pos = start + 1;
    }

    let mut xref = Xref::new();
    let mut root_candidate = None;
    for (&oid, &(gen, offset)) in &found {
        xref.add_in_use(oid, gen, offset as u64);
        if !trailer.has(b"Root") {
            if let Ok((_, Object::Dictionary(d))) = parse_indirect_object(source, offset) {
                if d.has_type(b"Catalog") {
                    root_candidate = Some((oid, gen));
                }
            }
        }
    }
    if !trailer.has(b"Root") {
        if let Some(id) = root_candidate {
            trailer.set("Root", Object::Reference(id));
        }
    }
    trailer.set("Size", (xref.max_oid() + 1) as i64);
    Ok((xref, trailer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_version() {
        assert_eq!(parse_header(b"%PDF-1.5\n...").unwrap(), (1, 5));
        assert_eq!(parse_header(b"garbage\n%PDF-2.0\n").unwrap(), (2, 0));
    }

    #[test]
    fn rejects_unknown_version() {
        assert!(parse_header(b"%PDF-9.9\n").is_err());
    }

    #[test]
    fn parses_reference_vs_two_integers() {
        let mut tok = Tokenizer::new(b"5 0 R");
        assert_eq!(parse_value(&mut tok).unwrap(), Object::Reference((5, 0)));

        let mut tok = Tokenizer::new(b"5 0 obj");
        assert_eq!(parse_value(&mut tok).unwrap(), Object::Integer(5));
    }

    #[test]
    fn parses_nested_dictionary_and_array() {
        let mut tok = Tokenizer::new(b"<< /Type /Catalog /Kids [1 0 R 2 0 R] /Count 2 >>");
        let value = parse_value(&mut tok).unwrap();
        let dict = value.as_dict().unwrap();
        assert!(dict.has_type(b"Catalog"));
        assert_eq!(dict.get(b"Kids").unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn parses_stream_with_direct_length() {
        let mut tok = Tokenizer::new(b"<< /Length 5 >>\nstream\nhello\nendstream");
        let value = parse_value(&mut tok).unwrap();
        let stream = value.as_stream().unwrap();
        assert_eq!(stream.content, b"hello");
    }

    #[test]
    fn recovers_stream_length_by_scanning() {
        let mut tok = Tokenizer::new(b"<< /Length 999 >>\nstream\nhello\nendstream");
        let value = parse_value(&mut tok).unwrap();
        let stream = value.as_stream().unwrap();
        assert_eq!(stream.content, b"hello");
    }

    #[test]
    fn parses_classic_xref_table() {
        let body = b"xref\n0 3\n0000000000 65535 f \n0000000010 00000 n \n0000000020 00000 n \ntrailer\n<< /Root 2 0 R /Size 3 >>";
        let (xref, trailer) = parse_xref_and_trailer(body, 0).unwrap();
        assert_eq!(xref.get(1), Some(crate::xref::XrefEntry::InUse { offset: 10, gen: 0 }));
        assert_eq!(trailer.get(b"Size").unwrap().as_i64().unwrap(), 3);
    }

    #[test]
    fn reconstruct_finds_objects_by_scanning() {
        let body = b"%PDF-1.4\n1 0 obj<< /Type /Catalog /Pages 2 0 R >>endobj\n2 0 obj<< /Type /Pages /Kids [] /Count 0 >>endobj\n";
        let (xref, trailer) = reconstruct(body).unwrap();
        assert!(xref.get(1).is_some());
        assert!(xref.get(2).is_some());
        assert_eq!(trailer.get(b"Root").unwrap().as_reference().unwrap(), (1, 0));
    }

    #[test]
    fn find_xref_start_scans_tail() {
        let body = b"%PDF-1.4\n...\nstartxref\n1234\n%%EOF";
        assert_eq!(find_xref_start(body).unwrap(), 1234);
    }
}
