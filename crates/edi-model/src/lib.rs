#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # edi-model
//!
//! Shared data model for EDI documents.
//!
//! This crate provides the wire-level delimiter context, the segment type and
//! an arena-based loop tree that the X12 and EDIFACT translators build their
//! documents from. All types are plain data: parsing and serialization
//! policies live in the dialect crates.

/// Wire-level separator characters for one document instance.
pub mod delimiters;
/// Ordered-element segment type.
pub mod segment;
/// Arena-based loop tree.
pub mod tree;

/// Delimiter set bound to one EDI document.
pub use delimiters::DelimiterContext;
/// One structural unit of an EDI message.
pub use segment::Segment;
/// Loop tree primitives.
pub use tree::{LoopId, LoopTree};

use thiserror::Error;

/// Errors that can occur when working with the model
#[derive(Error, Debug)]
pub enum Error {
    #[error("Delimiter characters must be distinct: {a:?} used twice")]
    DelimiterClash { a: char },

    #[error("Element index {index} out of range (segment has {len} elements)")]
    ElementIndex { index: usize, len: usize },

    #[error("Segment index {index} out of range (loop has {len} segments)")]
    SegmentIndex { index: usize, len: usize },
}

/// Crate-local result type for model operations.
pub type Result<T> = std::result::Result<T, Error>;
