//! Render an [`Object`] back to PDF syntax bytes, the inverse of
//! [`crate::parser::parse_value`]: `parse(serialize(v)) == v` for any
//! value that round-trips.

use crate::dictionary::Dictionary;
use crate::object::{Object, StringFormat};

/// Render one value (not an indirect object wrapper — see
/// [`write_indirect_object`] for that).
pub fn write_object(value: &Object) -> crate::error::Result<Vec<u8>> {
    let mut out = Vec::new();
    write_into(value, &mut out);
    Ok(out)
}

fn write_into(value: &Object, out: &mut Vec<u8>) {
    match value {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(true) => out.extend_from_slice(b"true"),
        Object::Boolean(false) => out.extend_from_slice(b"false"),
        Object::Integer(i) => {
            let mut buf = itoa::Buffer::new();
            out.extend_from_slice(buf.format(*i).as_bytes());
        }
        Object::Real(f) => write_real(*f, out),
        Object::Name(name) => write_name(name, out),
        Object::String(s, format) => write_string(s, *format, out),
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_into(item, out);
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => write_dictionary(dict, out),
        Object::Stream(stream) => {
            write_dictionary(&stream.dict, out);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(&stream.content);
            out.extend_from_slice(b"\nendstream");
        }
        Object::Reference((oid, gen)) => {
            out.extend_from_slice(format!("{oid} {gen} R").as_bytes());
        }
    }
}

fn write_real(f: f64, out: &mut Vec<u8>) {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        out.extend_from_slice(format!("{f:.0}", f = f).as_bytes());
    } else {
        let text = format!("{f}");
        out.extend_from_slice(text.as_bytes());
    }
}

fn write_name(name: &[u8], out: &mut Vec<u8>) {
    out.push(b'/');
    for &b in name {
        if crate::tokenizer::is_whitespace(b) || crate::tokenizer::is_delimiter(b) || b == b'#' || !b.is_ascii_graphic()
        {
            out.push(b'#');
            out.extend_from_slice(format!("{b:02X}").as_bytes());
        } else {
            out.push(b);
        }
    }
}

fn write_string(s: &[u8], format: StringFormat, out: &mut Vec<u8>) {
    match format {
        StringFormat::Hexadecimal => {
            out.push(b'<');
            for &b in s {
                out.extend_from_slice(format!("{b:02X}").as_bytes());
            }
            out.push(b'>');
        }
        StringFormat::Literal => {
            out.push(b'(');
            for &b in s {
                match b {
                    b'(' | b')' | b'\\' => {
                        out.push(b'\\');
                        out.push(b);
                    }
                    b'\n' => out.extend_from_slice(b"\\n"),
                    b'\r' => out.extend_from_slice(b"\\r"),
                    _ => out.push(b),
                }
            }
            out.push(b')');
        }
    }
}

pub fn write_dictionary(dict: &Dictionary, out: &mut Vec<u8>) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict.iter() {
        out.push(b' ');
        write_name(key, out);
        out.push(b' ');
        write_into(value, out);
    }
    out.extend_from_slice(b" >>");
}

/// Render a full `oid gen obj ... endobj` block.
pub fn write_indirect_object(oid: u32, gen: u16, value: &Object) -> Vec<u8> {
    let mut out = format!("{oid} {gen} obj\n").into_bytes();
    write_into(value, &mut out);
    out.extend_from_slice(b"\nendobj\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_value;
    use crate::tokenizer::Tokenizer;

    fn round_trip(value: Object) {
        let bytes = write_object(&value).unwrap();
        let mut tok = Tokenizer::new(&bytes);
        let parsed = parse_value(&mut tok).unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn round_trips_scalars() {
        round_trip(Object::Integer(-42));
        round_trip(Object::Real(3.25));
        round_trip(Object::Boolean(true));
        round_trip(Object::Null);
        round_trip(Object::Name(b"My Name".to_vec()));
        round_trip(Object::string_literal("a (nested) string"));
        round_trip(Object::Reference((5, 2)));
    }

    #[test]
    fn round_trips_array_and_dictionary() {
        let mut dict = Dictionary::new();
        dict.set("Type", "Catalog");
        dict.set("Count", 3i64);
        round_trip(Object::Array(vec![Object::Integer(1), Object::Reference((2, 0))]));
        round_trip(Object::Dictionary(dict));
    }

    #[test]
    fn escapes_delimiters_in_names() {
        let bytes = write_object(&Object::Name(b"A Name/With#Stuff".to_vec())).unwrap();
        assert_eq!(bytes, b"/A#20Name#2FWith#23Stuff");
    }
}
