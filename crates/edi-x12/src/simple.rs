//! Loop-less X12 representation
//!
//! Some callers only need the ordered segment list and do not care about
//! loop boundaries. [`X12SimpleParser`] skips schema guidance entirely and
//! produces an [`X12Simple`], which serializes the same way as the loop tree
//! but wraps its XML in a single `<X12>` element.

use crate::parser::{detect_delimiters, split_segments};
use crate::Result;
use edi_model::{DelimiterContext, Segment};
use serde::{Deserialize, Serialize};

/// One parsed X12 interchange as a flat ordered list of segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct X12Simple {
    context: DelimiterContext,
    segments: Vec<Segment>,
}

impl X12Simple {
    /// Create an empty document with the given delimiters.
    pub fn new(context: DelimiterContext) -> Self {
        Self {
            context,
            segments: Vec::new(),
        }
    }

    /// The delimiters this document was parsed with.
    pub fn context(&self) -> &DelimiterContext {
        &self.context
    }

    /// Segments in wire order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Append a segment.
    pub fn add_segment(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// Find all segments with the given identifier.
    pub fn find_segments(&self, id: &str) -> Vec<&Segment> {
        self.segments
            .iter()
            .filter(|s| s.id() == Some(id))
            .collect()
    }

    /// Serialize back to flat X12 text.
    pub fn to_flat(&self, trim_trailing_empty: bool) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            if trim_trailing_empty {
                out.push_str(&segment.to_flat_trimmed(&self.context));
            } else {
                out.push_str(&segment.to_flat(&self.context));
            }
            out.push(self.context.segment);
        }
        out
    }

    /// Serialize to XML, all segments under a single `<X12>` element.
    pub fn to_xml(&self, trim_trailing_empty: bool) -> String {
        let mut out = String::from("<X12>");
        for segment in &self.segments {
            out.push_str(&segment.to_xml(trim_trailing_empty));
        }
        out.push_str("</X12>");
        out
    }
}

/// Parser producing the loop-less representation.
pub struct X12SimpleParser;

impl X12SimpleParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a complete interchange; the ISA header supplies the delimiters.
    pub fn parse(&self, source: &str) -> Result<X12Simple> {
        let ctx = detect_delimiters(source)?;
        Ok(self.parse_with_context(source, ctx))
    }

    /// Parse with a caller-supplied delimiter context.
    pub fn parse_with_context(&self, source: &str, ctx: DelimiterContext) -> X12Simple {
        let mut doc = X12Simple::new(ctx);
        for raw in split_segments(source, &ctx) {
            let elements = raw.split(ctx.element).map(String::from).collect();
            doc.add_segment(Segment::from_elements(elements));
        }
        doc
    }
}

impl Default for X12SimpleParser {
    fn default() -> Self {
        Self::new()
    }
}
