//! Arena-based loop tree
//!
//! Loops are stored in a flat arena and addressed by [`LoopId`]; each node
//! records its parent index and an ordered child index vector. This keeps
//! upward walks O(1) without reference cycles. Ids are only minted by the
//! tree that owns them and must not be used against another tree.

use crate::delimiters::DelimiterContext;
use crate::segment::Segment;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to one loop inside a [`LoopTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoopId(usize);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoopNode {
    name: String,
    segments: Vec<Segment>,
    parent: Option<LoopId>,
    children: Vec<LoopId>,
    depth: usize,
}

/// Tree of named loops, each holding an ordered list of segments and an
/// ordered list of child loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopTree {
    nodes: Vec<LoopNode>,
}

impl LoopTree {
    /// Create a tree with a single root loop of the given name.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![LoopNode {
                name: root_name.into(),
                segments: Vec::new(),
                parent: None,
                children: Vec::new(),
                depth: 0,
            }],
        }
    }

    /// The root loop.
    pub fn root(&self) -> LoopId {
        LoopId(0)
    }

    /// Append a new empty child loop under `parent`.
    pub fn add_child(&mut self, parent: LoopId, name: impl Into<String>) -> LoopId {
        let id = LoopId(self.nodes.len());
        let depth = self.nodes[parent.0].depth + 1;
        self.nodes.push(LoopNode {
            name: name.into(),
            segments: Vec::new(),
            parent: Some(parent),
            children: Vec::new(),
            depth,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Insert a new empty child loop at `index` among `parent`'s children.
    pub fn insert_child(
        &mut self,
        parent: LoopId,
        index: usize,
        name: impl Into<String>,
    ) -> Result<LoopId> {
        let len = self.nodes[parent.0].children.len();
        if index > len {
            return Err(Error::SegmentIndex { index, len });
        }
        let id = LoopId(self.nodes.len());
        let depth = self.nodes[parent.0].depth + 1;
        self.nodes.push(LoopNode {
            name: name.into(),
            segments: Vec::new(),
            parent: Some(parent),
            children: Vec::new(),
            depth,
        });
        self.nodes[parent.0].children.insert(index, id);
        Ok(id)
    }

    /// Loop name.
    pub fn name(&self, id: LoopId) -> &str {
        &self.nodes[id.0].name
    }

    /// Rename a loop.
    pub fn rename(&mut self, id: LoopId, name: impl Into<String>) {
        self.nodes[id.0].name = name.into();
    }

    /// Parent loop; `None` for the root.
    pub fn parent(&self, id: LoopId) -> Option<LoopId> {
        self.nodes[id.0].parent
    }

    /// Child loops in declaration order.
    pub fn children(&self, id: LoopId) -> &[LoopId] {
        &self.nodes[id.0].children
    }

    /// Nesting depth; 0 for the root. Diagnostic only.
    pub fn depth(&self, id: LoopId) -> usize {
        self.nodes[id.0].depth
    }

    /// Segments held directly by this loop.
    pub fn segments(&self, id: LoopId) -> &[Segment] {
        &self.nodes[id.0].segments
    }

    /// Append a segment to a loop.
    pub fn add_segment(&mut self, id: LoopId, segment: Segment) {
        self.nodes[id.0].segments.push(segment);
    }

    /// Insert a segment at `index` within a loop.
    pub fn insert_segment(&mut self, id: LoopId, index: usize, segment: Segment) -> Result<()> {
        let len = self.nodes[id.0].segments.len();
        if index > len {
            return Err(Error::SegmentIndex { index, len });
        }
        self.nodes[id.0].segments.insert(index, segment);
        Ok(())
    }

    /// Replace the segment at `index` within a loop.
    pub fn set_segment(&mut self, id: LoopId, index: usize, segment: Segment) -> Result<()> {
        let len = self.nodes[id.0].segments.len();
        match self.nodes[id.0].segments.get_mut(index) {
            Some(slot) => {
                *slot = segment;
                Ok(())
            }
            None => Err(Error::SegmentIndex { index, len }),
        }
    }

    /// Remove and return the segment at `index` within a loop.
    pub fn remove_segment(&mut self, id: LoopId, index: usize) -> Result<Segment> {
        let len = self.nodes[id.0].segments.len();
        if index >= len {
            return Err(Error::SegmentIndex { index, len });
        }
        Ok(self.nodes[id.0].segments.remove(index))
    }

    /// Find all loops with the given name, preorder from the root.
    pub fn find_loops(&self, name: &str) -> Vec<LoopId> {
        self.find_loops_under(self.root(), name)
    }

    /// Find all loops with the given name in the subtree rooted at `id`
    /// (inclusive), preorder.
    pub fn find_loops_under(&self, id: LoopId, name: &str) -> Vec<LoopId> {
        let mut found = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if self.nodes[current.0].name == name {
                found.push(current);
            }
            // Push in reverse so children pop in declaration order
            for &child in self.nodes[current.0].children.iter().rev() {
                stack.push(child);
            }
        }
        found
    }

    /// Find all segments with the given identifier anywhere in the tree,
    /// preorder.
    pub fn find_segments(&self, id: &str) -> Vec<&Segment> {
        let mut found = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(current) = stack.pop() {
            for segment in &self.nodes[current.0].segments {
                if segment.id() == Some(id) {
                    found.push(segment);
                }
            }
            for &child in self.nodes[current.0].children.iter().rev() {
                stack.push(child);
            }
        }
        found
    }

    /// Total number of loops in the tree.
    pub fn loop_count(&self) -> usize {
        self.nodes.len()
    }

    /// Serialize the whole tree back to flat form: for each loop, its
    /// segments (each followed by the segment separator), then its child
    /// loops.
    pub fn to_flat(&self, ctx: &DelimiterContext, trim_trailing_empty: bool) -> String {
        let mut out = String::new();
        self.write_flat(self.root(), ctx, trim_trailing_empty, &mut out);
        out
    }

    fn write_flat(
        &self,
        id: LoopId,
        ctx: &DelimiterContext,
        trim: bool,
        out: &mut String,
    ) {
        for segment in &self.nodes[id.0].segments {
            if trim {
                out.push_str(&segment.to_flat_trimmed(ctx));
            } else {
                out.push_str(&segment.to_flat(ctx));
            }
            out.push(ctx.segment);
        }
        for &child in &self.nodes[id.0].children {
            self.write_flat(child, ctx, trim, out);
        }
    }

    /// Serialize the whole tree to XML: `<LOOP NAME="..">` wrappers around
    /// segment XML.
    pub fn to_xml(&self, trim_trailing_empty: bool) -> String {
        let mut out = String::new();
        self.write_xml(self.root(), trim_trailing_empty, &mut out);
        out
    }

    fn write_xml(&self, id: LoopId, trim: bool, out: &mut String) {
        out.push_str("<LOOP NAME=\"");
        out.push_str(&self.nodes[id.0].name);
        out.push_str("\">");
        for segment in &self.nodes[id.0].segments {
            out.push_str(&segment.to_xml(trim));
        }
        for &child in &self.nodes[id.0].children {
            self.write_xml(child, trim, out);
        }
        out.push_str("</LOOP>");
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: LoopId) -> fmt::Result {
        let node = &self.nodes[id.0];
        for _ in 0..node.depth {
            write!(f, "|  ")?;
        }
        write!(f, "+--{}", node.name)?;
        if !node.segments.is_empty() {
            let ids: Vec<&str> = node.segments.iter().filter_map(|s| s.id()).collect();
            write!(f, " [{}]", ids.join(","))?;
        }
        writeln!(f)?;
        for &child in &node.children {
            self.fmt_node(f, child)?;
        }
        Ok(())
    }
}

/// Diagnostic hierarchy dump, one loop per line.
impl fmt::Display for LoopTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, self.root())
    }
}
