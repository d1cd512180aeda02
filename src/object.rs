use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::stream::Stream;

/// `(object number, generation number)` — identifies an indirect object
/// by position, independent of its current value.
pub type ObjectId = (u32, u16);

/// Literal strings are written as balanced-paren text, hexadecimal
/// strings as `<...>`. The hint only affects serialization; a `String`
/// compares equal regardless of format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Literal,
    Hexadecimal,
}

/// The PDF value sum type.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Name(Vec<u8>),
    String(Vec<u8>, StringFormat),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
}

impl Object {
    pub fn string_literal<S: Into<Vec<u8>>>(s: S) -> Self {
        Object::String(s.into(), StringFormat::Literal)
    }

    pub fn name<S: Into<Vec<u8>>>(s: S) -> Self {
        Object::Name(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::Name(_) => "Name",
            Object::String(..) => "String",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream(_) => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Object::Boolean(b) => Ok(*b),
            other => Err(Error::TypeMismatch { expected: "Boolean", found: other.type_name() }),
        }
    }

    /// Real values truncate toward zero; integers pass through.
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Object::Integer(i) => Ok(*i),
            Object::Real(f) => Ok(*f as i64),
            other => Err(Error::TypeMismatch { expected: "Integer", found: other.type_name() }),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Object::Integer(i) => Ok(*i as f64),
            Object::Real(f) => Ok(*f),
            other => Err(Error::TypeMismatch { expected: "Real", found: other.type_name() }),
        }
    }

    pub fn as_name(&self) -> Result<&[u8]> {
        match self {
            Object::Name(name) => Ok(name),
            other => Err(Error::TypeMismatch { expected: "Name", found: other.type_name() }),
        }
    }

    pub fn as_name_str(&self) -> Result<&str> {
        self.as_name()
            .and_then(|n| std::str::from_utf8(n).map_err(|_| Error::ValidationError("name is not valid UTF-8".into())))
    }

    pub fn as_str(&self) -> Result<&[u8]> {
        match self {
            Object::String(s, _) => Ok(s),
            other => Err(Error::TypeMismatch { expected: "String", found: other.type_name() }),
        }
    }

    pub fn as_array(&self) -> Result<&[Object]> {
        match self {
            Object::Array(a) => Ok(a),
            other => Err(Error::TypeMismatch { expected: "Array", found: other.type_name() }),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Object>> {
        match self {
            Object::Array(a) => Ok(a),
            other => Err(Error::TypeMismatch { expected: "Array", found: other.type_name() }),
        }
    }

    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&s.dict),
            other => Err(Error::TypeMismatch { expected: "Dictionary", found: other.type_name() }),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&mut s.dict),
            other => Err(Error::TypeMismatch { expected: "Dictionary", found: other.type_name() }),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            other => Err(Error::TypeMismatch { expected: "Stream", found: other.type_name() }),
        }
    }

    pub fn as_stream_mut(&mut self) -> Result<&mut Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            other => Err(Error::TypeMismatch { expected: "Stream", found: other.type_name() }),
        }
    }

    pub fn as_reference(&self) -> Result<ObjectId> {
        match self {
            Object::Reference(id) => Ok(*id),
            other => Err(Error::TypeMismatch { expected: "Reference", found: other.type_name() }),
        }
    }
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Object::Boolean(b)
    }
}

impl From<i64> for Object {
    fn from(i: i64) -> Self {
        Object::Integer(i)
    }
}

impl From<f64> for Object {
    fn from(f: f64) -> Self {
        Object::Real(f)
    }
}

impl From<Dictionary> for Object {
    fn from(d: Dictionary) -> Self {
        Object::Dictionary(d)
    }
}

impl From<Stream> for Object {
    fn from(s: Stream) -> Self {
        Object::Stream(s)
    }
}

impl From<Vec<Object>> for Object {
    fn from(a: Vec<Object>) -> Self {
        Object::Array(a)
    }
}

impl From<ObjectId> for Object {
    fn from(id: ObjectId) -> Self {
        Object::Reference(id)
    }
}

/// String-like literals default to `Name`, so a plain
/// `dict.set("Type", "Page")` call site works without spelling out the
/// variant; use
/// [`Object::string_literal`] when a PDF string is intended.
impl From<&str> for Object {
    fn from(s: &str) -> Self {
        Object::Name(s.as_bytes().to_vec())
    }
}

impl From<String> for Object {
    fn from(s: String) -> Self {
        Object::Name(s.into_bytes())
    }
}
