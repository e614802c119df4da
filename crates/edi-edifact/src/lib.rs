//! # edi-edifact
//!
//! EDIFACT translator between flat interchange text and the EDIFACT-XML
//! vocabulary of ISO TS 20625 (`S_` segments, `C_` composites, `D_` data
//! elements, `G_`/`M_` groups).
//!
//! Going flat-to-XML is schema driven: a [`MessageSchema`] loaded from an
//! EDIFACT-XML XSD tells the [`TreeBuilder`] how raw segments nest into
//! groups and how segment bodies split into named fields. Going the other
//! way, the [`Flattener`] needs no schema at all: the XML element prefixes
//! carry enough structure to re-emit separators.

pub mod flatten;
pub mod schema;
pub mod syntax;
pub mod tree;

pub use flatten::Flattener;
pub use schema::{message_identity, xsd_file_name, MessageSchema, SchemaRole, UNBOUNDED};
pub use syntax::detect_delimiters;
pub use tree::{EventSink, Field, SegmentNode, TreeBuilder, XmlWriterSink};

use thiserror::Error;

/// Errors that can occur when translating EDIFACT
#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing interchange header: no UNB segment found")]
    MissingInterchangeHeader,

    #[error("Missing message header: no UNH segment found")]
    MissingMessageHeader,

    #[error("Schema reference to undefined element: {name}")]
    UnresolvedReference { name: String },

    #[error("Unexpected document structure: {0}")]
    UnexpectedStructure(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Model(#[from] edi_model::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
