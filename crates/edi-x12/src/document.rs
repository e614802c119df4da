//! Parsed X12 document
//!
//! Binds the delimiter context discovered from the ISA header to the
//! assembled loop tree, and carries the serialization and search surface.

use edi_model::{DelimiterContext, LoopId, LoopTree, Segment};
use serde::{Deserialize, Serialize};

/// One parsed X12 interchange: an immutable delimiter context plus the loop
/// tree assembled under schema guidance. Editing goes through
/// [`tree_mut`](Self::tree_mut); the delimiters stay fixed for the document's
/// lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct X12Document {
    context: DelimiterContext,
    tree: LoopTree,
}

impl X12Document {
    /// Bind a context and an assembled tree together.
    pub fn new(context: DelimiterContext, tree: LoopTree) -> Self {
        Self { context, tree }
    }

    /// The delimiters this document was parsed with.
    pub fn context(&self) -> &DelimiterContext {
        &self.context
    }

    /// The loop tree.
    pub fn tree(&self) -> &LoopTree {
        &self.tree
    }

    /// Mutable access to the loop tree for explicit editing.
    pub fn tree_mut(&mut self) -> &mut LoopTree {
        &mut self.tree
    }

    /// Find all loops with the given name.
    pub fn find_loops(&self, name: &str) -> Vec<LoopId> {
        self.tree.find_loops(name)
    }

    /// Find all segments with the given identifier.
    pub fn find_segments(&self, id: &str) -> Vec<&Segment> {
        self.tree.find_segments(id)
    }

    /// Serialize back to flat X12 text.
    pub fn to_flat(&self, trim_trailing_empty: bool) -> String {
        self.tree.to_flat(&self.context, trim_trailing_empty)
    }

    /// Serialize to the X12 XML representation.
    pub fn to_xml(&self, trim_trailing_empty: bool) -> String {
        self.tree.to_xml(trim_trailing_empty)
    }
}
