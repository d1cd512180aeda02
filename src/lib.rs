//! Read, manipulate, and write PDF documents.
//!
//! `Document` is the entry point: [`Document::open`] loads a file from
//! disk (or [`Document::load_mem`] from an in-memory buffer), resolving
//! the cross-reference chain and, if the document is encrypted,
//! authenticating against an optional password. Objects are reached
//! through [`Document::object`]/[`Document::dereference`]; new ones are
//! added with [`Document::add`] or [`Document::wrap`] when a `/Type`
//! hint should come along for the ride. [`Document::write`] renders the
//! document back out, either as a standalone file or as an incremental
//! update appended to its original bytes.

pub mod cmap;
pub mod dictionary;
pub mod document;
pub mod encryption;
pub mod error;
pub mod filters;
pub mod object;
pub mod object_stream;
pub mod parser;
pub mod pdf_date;
pub mod permissions;
pub mod revision;
pub mod serializer;
pub mod stream;
pub mod tokenizer;
pub mod typed;
pub mod writer;
pub mod xref;

pub use dictionary::Dictionary;
pub use document::Document;
pub use error::{Error, ParseError, Result, XrefError};
pub use object::{Object, ObjectId, StringFormat};
pub use stream::Stream;
pub use writer::{WriteMode, WriterOptions};

#[cfg(test)]
mod tests;
