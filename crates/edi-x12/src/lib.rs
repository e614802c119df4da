//! # edi-x12
//!
//! X12 translator: flat transaction text to a schema-guided loop tree and
//! back.
//!
//! The wire delimiters are discovered at fixed byte offsets of the ISA
//! header; loop boundaries carry no wire marker and are recovered from a
//! caller-built [`LoopSchema`] describing which segment-and-qualifier
//! combinations open which named loop.

pub mod document;
pub mod parser;
pub mod schema;
pub mod simple;

pub use document::X12Document;
pub use parser::X12Parser;
pub use schema::{LoopSchema, SchemaId};
pub use simple::{X12Simple, X12SimpleParser};

use thiserror::Error;

/// Errors that can occur when parsing X12
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed interchange header: need {expected} bytes for the ISA segment, got {len}")]
    MalformedHeader { len: usize, expected: usize },

    #[error(transparent)]
    Model(#[from] edi_model::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
