//! ToUnicode CMap codec — a restricted PostScript dialect mapping a
//! big-endian input code to a UTF-8 string.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::object::StringFormat;
use crate::tokenizer::{Token, Tokenizer};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToUnicodeCMap {
    pub mapping: BTreeMap<u32, String>,
    pub registry: Option<String>,
    pub ordering: Option<String>,
    pub supplement: Option<i64>,
    pub name: Option<String>,
}

impl ToUnicodeCMap {
    pub fn new() -> Self {
        ToUnicodeCMap::default()
    }

    pub fn insert(&mut self, code: u32, text: impl Into<String>) {
        self.mapping.insert(code, text.into());
    }
}

fn code_from_hex(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

fn utf16be_to_string(bytes: &[u8]) -> Result<String> {
    let units: Vec<u16> = bytes.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|_| Error::ValidationError("invalid UTF-16BE in ToUnicode CMap".into()))
}

fn string_to_utf16be(text: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

fn expect_hex_string(tok: &mut Tokenizer) -> Result<Vec<u8>> {
    match tok.next_token()? {
        Token::String(bytes, StringFormat::Hexadecimal) => Ok(bytes),
        other => Err(Error::ValidationError(format!("expected hex string in CMap, found {other:?}"))),
    }
}

/// Parse a ToUnicode CMap's decoded stream content.
pub fn parse(data: &[u8]) -> Result<ToUnicodeCMap> {
    let mut cmap = ToUnicodeCMap::new();
    let mut tok = Tokenizer::new(data);
    let mut pending_name: Option<Vec<u8>> = None;

    loop {
        match tok.next_token()? {
            Token::EndOfInput => break,
            Token::Name(name) => pending_name = Some(name),
            Token::String(s, StringFormat::Literal) => {
                if let Some(name) = pending_name.take() {
                    let text = String::from_utf8_lossy(&s).into_owned();
                    assign_cmap_info(&mut cmap, &name, text);
                }
            }
            Token::Integer(n) => {
                if let Ok(Token::Keyword(k)) = peek_keyword(&mut tok) {
                    if let Some(name_text) = std::str::from_utf8(&k).ok().map(str::to_string) {
                        if name_text == "beginbfchar" {
                            read_bfchar_section(&mut tok, &mut cmap)?;
                            continue;
                        } else if name_text == "beginbfrange" {
                            read_bfrange_section(&mut tok, &mut cmap)?;
                            continue;
                        } else if name_text == "begincodespacerange" {
                            skip_codespacerange_section(&mut tok)?;
                            continue;
                        }
                    }
                }
                let _ = n;
            }
            Token::Keyword(k) if k == b"CIDSystemInfo" || k == b"findresource" => {}
            Token::DictStart | Token::DictEnd | Token::ArrayStart | Token::ArrayEnd => {}
            _ => {}
        }
    }
    Ok(cmap)
}

fn peek_keyword(tok: &mut Tokenizer) -> Result<Token> {
    let save = tok.position();
    let token = tok.next_token();
    if !matches!(token, Ok(Token::Keyword(_))) {
        tok.seek(save);
    }
    token
}

fn assign_cmap_info(cmap: &mut ToUnicodeCMap, name: &[u8], text: String) {
    match name {
        b"Registry" => cmap.registry = Some(text),
        b"Ordering" => cmap.ordering = Some(text),
        b"CMapName" => cmap.name = Some(text),
        _ => {}
    }
}

fn read_bfchar_section(tok: &mut Tokenizer, cmap: &mut ToUnicodeCMap) -> Result<()> {
    loop {
        let save = tok.position();
        match tok.next_token()? {
            Token::Keyword(k) if k == b"endbfchar" => break,
            _ => {
                tok.seek(save);
                let src = expect_hex_string(tok)?;
                let dst = expect_hex_string(tok)?;
                cmap.insert(code_from_hex(&src), utf16be_to_string(&dst)?);
            }
        }
    }
    Ok(())
}

fn read_bfrange_section(tok: &mut Tokenizer, cmap: &mut ToUnicodeCMap) -> Result<()> {
    loop {
        let save = tok.position();
        match tok.next_token()? {
            Token::Keyword(k) if k == b"endbfrange" => break,
            _ => {
                tok.seek(save);
                let lo = code_from_hex(&expect_hex_string(tok)?);
                let hi = code_from_hex(&expect_hex_string(tok)?);
                let dst_start = expect_hex_string(tok)?;
                let base = code_from_hex(&dst_start);
                for (offset, code) in (lo..=hi).enumerate() {
                    let codepoint = base + offset as u32;
                    let bytes = if dst_start.len() == 2 {
                        (codepoint as u16).to_be_bytes().to_vec()
                    } else {
                        let mut b = dst_start.clone();
                        let tail_len = b.len().min(4);
                        let adjusted = (code_from_hex(&b[b.len() - tail_len..]) + offset as u32).to_be_bytes();
                        b.splice(b.len() - tail_len.., adjusted[4 - tail_len..].iter().copied());
                        b
                    };
                    cmap.insert(code, utf16be_to_string(&bytes)?);
                }
            }
        }
    }
    Ok(())
}

fn skip_codespacerange_section(tok: &mut Tokenizer) -> Result<()> {
    loop {
        match tok.next_token()? {
            Token::Keyword(k) if k == b"endcodespacerange" => break,
            Token::EndOfInput => break,
            _ => {}
        }
    }
    Ok(())
}

/// A run of consecutive codes eligible to be written as one `bfrange`:
/// `code+1 == next_code`, the destination codepoint also increments by
/// one, and the run never crosses a `code % 256 == 0` boundary.
fn grouped_runs(mapping: &BTreeMap<u32, String>) -> Vec<(u32, u32, String)> {
    let mut runs = Vec::new();
    let entries: Vec<(u32, &String)> = mapping.iter().map(|(&c, s)| (c, s)).collect();
    let mut i = 0;
    while i < entries.len() {
        let (start_code, start_text) = entries[i];
        let mut end = i;
        while end + 1 < entries.len() {
            let (code, text) = entries[end + 1];
            let (prev_code, prev_text) = entries[end];
            if code != prev_code + 1 || code % 256 == 0 {
                break;
            }
            if !increments_by_one(prev_text, text) {
                break;
            }
            end += 1;
        }
        runs.push((start_code, entries[end].0, start_text.clone()));
        i = end + 1;
    }
    runs
}

fn increments_by_one(prev: &str, next: &str) -> bool {
    let (mut pc, mut nc) = (prev.chars(), next.chars());
    match (pc.next(), nc.next()) {
        (Some(p), Some(n)) => pc.next().is_none() && nc.next().is_none() && (n as u32) == (p as u32) + 1,
        _ => false,
    }
}

/// Render a canonical ToUnicode CMap, grouping consecutive runs into
/// `bfrange` entries (at most one codepoint-increment grouping per
/// run) and isolated mappings into `bfchar`, at most 100 entries per
/// section.
pub fn write(cmap: &ToUnicodeCMap) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    out.extend_from_slice(b"/CMapName /Adobe-Identity-UCS def\n");
    out.extend_from_slice(b"1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    let runs = grouped_runs(&cmap.mapping);
    let mut bfchars: Vec<(u32, &str)> = Vec::new();
    let mut bfranges: Vec<(u32, u32, &str)> = Vec::new();
    for (start, end, text) in &runs {
        if start == end {
            bfchars.push((*start, text));
        } else {
            bfranges.push((*start, *end, text));
        }
    }

    for chunk in bfchars.chunks(100) {
        out.extend_from_slice(format!("{} beginbfchar\n", chunk.len()).as_bytes());
        for (code, text) in chunk {
            write_hex_code(&mut out, *code);
            out.push(b' ');
            write_hex_bytes(&mut out, &string_to_utf16be(text));
            out.push(b'\n');
        }
        out.extend_from_slice(b"endbfchar\n");
    }

    for chunk in bfranges.chunks(100) {
        out.extend_from_slice(format!("{} beginbfrange\n", chunk.len()).as_bytes());
        for (start, end, text) in chunk {
            write_hex_code(&mut out, *start);
            out.push(b' ');
            write_hex_code(&mut out, *end);
            out.push(b' ');
            write_hex_bytes(&mut out, &string_to_utf16be(text));
            out.push(b'\n');
        }
        out.extend_from_slice(b"endbfrange\n");
    }
    out
}

fn write_hex_code(out: &mut Vec<u8>, code: u32) {
    write_hex_bytes(out, &(code as u16).to_be_bytes());
}

fn write_hex_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'<');
    for &b in bytes {
        out.extend_from_slice(format!("{b:02X}").as_bytes());
    }
    out.push(b'>');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_consecutive_run_and_isolated_entry() {
        let mut cmap = ToUnicodeCMap::new();
        cmap.insert(0x41, "A");
        cmap.insert(0x42, "B");
        cmap.insert(0x43, "C");
        cmap.insert(0x50, "P");
        let runs = grouped_runs(&cmap.mapping);
        assert_eq!(runs, vec![(0x41, 0x43, "A".to_string()), (0x50, 0x50, "P".to_string())]);
    }

    #[test]
    fn write_then_parse_round_trips() {
        let mut cmap = ToUnicodeCMap::new();
        cmap.insert(0x41, "A");
        cmap.insert(0x42, "B");
        cmap.insert(0x43, "C");
        cmap.insert(0x50, "P");
        let bytes = write(&cmap);
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.mapping, cmap.mapping);
    }

    #[test]
    fn run_never_crosses_a_256_boundary() {
        let mut cmap = ToUnicodeCMap::new();
        cmap.insert(0xFF, "\u{00FF}");
        cmap.insert(0x100, "\u{0100}");
        let runs = grouped_runs(&cmap.mapping);
        assert_eq!(runs.len(), 2);
    }
}
