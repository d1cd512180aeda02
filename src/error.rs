use thiserror::Error;

use crate::object::ObjectId;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures local to the tokenizer/object parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed input at offset {offset}: {reason}")]
    MalformedInput { offset: usize, reason: String },

    #[error("unexpected token at offset {offset}: {found}")]
    UnexpectedToken { offset: usize, found: String },

    #[error("unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    #[error("invalid or inconsistent cross-reference data")]
    InvalidXref,

    #[error("unknown keyword at offset {offset}: {keyword}")]
    UnknownKeyword { offset: usize, keyword: String },
}

/// Failures locating or chaining cross-reference sections.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XrefError {
    #[error("could not locate startxref")]
    Start,
    #[error("/Prev offset is out of range")]
    PrevStart,
    #[error("/XRefStm offset is out of range")]
    StreamStart,
    #[error("/Size does not match the highest object id in the cross-reference section")]
    InconsistentSize,
}

/// Top-level error type surfaced to callers.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Xref(#[from] XrefError),

    #[error("dereference cycle detected while resolving {0:?}")]
    RecursiveReference(ObjectId),

    #[error("filter error: {0}")]
    FilterError(String),

    #[error("document is encrypted; a password is required")]
    EncryptionRequired,

    #[error("the supplied password does not unlock this document")]
    InvalidPassword,

    #[error("unsupported encryption V={v} R={r}")]
    UnsupportedEncryption { v: u8, r: u8 },

    #[error("derived encryption key does not match the stored /U or /O entry")]
    EncryptionKeyMismatch,

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("no object found for {0:?}")]
    ObjectNotFound(ObjectId),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: &'static str },

    #[error("dictionary is missing required key /{0}")]
    MissingKey(String),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        format!("{self}") == format!("{other}")
    }
}
