//! X12 parser
//!
//! Delimiters are discovered at fixed byte offsets of the 106-byte ISA
//! segment, then the flat token stream is assembled into a loop tree under
//! the guidance of a [`LoopSchema`]. For each incoming segment the parser
//! applies a three-tier precedence: does it open a child loop of the current
//! loop, does it open a sibling loop at some ancestor level, or is it a plain
//! continuation of the current loop. The schema tree itself encodes the
//! legal nesting, so no explicit stack machine is needed.

use crate::document::X12Document;
use crate::schema::{LoopSchema, SchemaId};
use crate::{Error, Result};
use edi_model::{DelimiterContext, LoopId, LoopTree, Segment};
use tracing::{debug, trace};

/// Minimum interchange size: the fixed-width ISA segment.
pub const HEADER_SIZE: usize = 106;
/// Byte offset of the element separator within the ISA segment.
pub const POS_ELEMENT: usize = 3;
/// Byte offset of the composite sub-element separator.
pub const POS_COMPOSITE: usize = 104;
/// Byte offset of the segment separator.
pub const POS_SEGMENT: usize = 105;

/// Read the three separators from the fixed offsets of the ISA header.
///
/// Fails with [`Error::MalformedHeader`] when fewer than 106 bytes are
/// available.
pub fn detect_delimiters(source: &str) -> Result<DelimiterContext> {
    let bytes = source.as_bytes();
    if bytes.len() < HEADER_SIZE {
        return Err(Error::MalformedHeader {
            len: bytes.len(),
            expected: HEADER_SIZE,
        });
    }
    let ctx = DelimiterContext::x12(
        bytes[POS_SEGMENT] as char,
        bytes[POS_ELEMENT] as char,
        bytes[POS_COMPOSITE] as char,
    )?;
    debug!(
        segment = %ctx.segment,
        element = %ctx.element,
        composite = %ctx.composite,
        "detected X12 delimiters"
    );
    Ok(ctx)
}

/// Split the source into raw segment strings: split on the segment
/// separator, trim surrounding whitespace and line breaks, drop empty
/// remainders. X12 has no release character, so a plain split is exact.
pub fn split_segments<'a>(source: &'a str, ctx: &DelimiterContext) -> Vec<&'a str> {
    source
        .split(ctx.segment)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Translates flat X12 transaction text into an [`X12Document`] loop tree.
pub struct X12Parser<'a> {
    schema: &'a LoopSchema,
}

impl<'a> X12Parser<'a> {
    /// Create a parser bound to a loop schema. The schema is read-only and
    /// one parser may serve many documents.
    pub fn new(schema: &'a LoopSchema) -> Self {
        Self { schema }
    }

    /// Parse a complete interchange. The first 106 bytes must be the ISA
    /// segment carrying the separators.
    pub fn parse(&self, source: &str) -> Result<X12Document> {
        let ctx = detect_delimiters(source)?;
        Ok(self.assemble(source, ctx))
    }

    /// Parse with a caller-supplied delimiter context, skipping header
    /// detection. Useful for fragments that do not start with ISA.
    pub fn parse_with_context(&self, source: &str, ctx: DelimiterContext) -> X12Document {
        self.assemble(source, ctx)
    }

    fn assemble(&self, source: &str, ctx: DelimiterContext) -> X12Document {
        let schema = self.schema;
        let mut tree = LoopTree::new(schema.name(schema.root()));
        let mut cur_schema = schema.root();
        let mut cur_loop = tree.root();

        for raw in split_segments(source, &ctx) {
            let tokens: Vec<&str> = raw.split(ctx.element).collect();

            if let Some(child) = schema.match_child(cur_schema, &tokens) {
                // Opens a child loop of the current loop
                let opened = tree.add_child(cur_loop, schema.name(child));
                tree.add_segment(opened, Segment::from_elements(to_owned(&tokens)));
                trace!(loop_name = schema.name(child), "opened child loop");
                cur_schema = child;
                cur_loop = opened;
            } else if let Some((child, attach)) =
                self.match_ancestor(cur_schema, &tree, cur_loop, &tokens)
            {
                // Pops back to an ancestor level and opens a sibling loop
                let opened = tree.add_child(attach, schema.name(child));
                tree.add_segment(opened, Segment::from_elements(to_owned(&tokens)));
                trace!(loop_name = schema.name(child), "opened loop at ancestor level");
                cur_schema = child;
                cur_loop = opened;
            } else {
                // Plain continuation of the current loop
                tree.add_segment(cur_loop, Segment::from_elements(to_owned(&tokens)));
            }
        }

        debug!(loops = tree.loop_count(), "assembled X12 loop tree");
        X12Document::new(ctx, tree)
    }

    /// Walk schema and loop ancestors in lockstep; at each level re-run the
    /// child-loop test against that schema ancestor's children. The first
    /// level that matches yields the schema child to open and the loop node
    /// to attach it under.
    fn match_ancestor(
        &self,
        cur_schema: SchemaId,
        tree: &LoopTree,
        cur_loop: LoopId,
        tokens: &[&str],
    ) -> Option<(SchemaId, LoopId)> {
        let schema = self.schema;
        let mut schema_anc = schema.parent(cur_schema);
        let mut loop_anc = tree.parent(cur_loop);
        while let (Some(s), Some(l)) = (schema_anc, loop_anc) {
            if let Some(child) = schema.match_child(s, tokens) {
                return Some((child, l));
            }
            schema_anc = schema.parent(s);
            loop_anc = tree.parent(l);
        }
        None
    }
}

fn to_owned(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| (*t).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A well-formed 106-byte ISA segment with `*` `:` `~` separators.
    pub(crate) const ISA: &str = "ISA*00*          *00*          *ZZ*SENDER         *ZZ*RECEIVER       *240101*1200*U*00401*000000001*0*P*:~";

    fn schema_835() -> LoopSchema {
        let mut cf = LoopSchema::new("X12");
        let isa = cf.add_child(cf.root(), "ISA", "ISA");
        let gs = cf.add_child(isa, "GS", "GS");
        let st = cf.add_child_qualified(gs, "ST", "ST", "835", 1);
        cf.add_child_qualified(st, "1000A", "N1", "PR", 1);
        cf.add_child_qualified(st, "1000B", "N1", "PE", 1);
        let l2000 = cf.add_child(st, "2000", "LX");
        let l2100 = cf.add_child(l2000, "2100", "CLP");
        cf.add_child(l2100, "2110", "SVC");
        cf.add_child(gs, "SE", "SE");
        cf.add_child(isa, "GE", "GE");
        cf.add_child(cf.root(), "IEA", "IEA");
        cf
    }

    #[test]
    fn test_isa_sample_is_header_sized() {
        assert_eq!(ISA.len(), HEADER_SIZE);
    }

    #[test]
    fn test_detect_delimiters() {
        let ctx = detect_delimiters(ISA).unwrap();
        assert_eq!(ctx.element, '*');
        assert_eq!(ctx.composite, ':');
        assert_eq!(ctx.segment, '~');
    }

    #[test]
    fn test_short_input_is_malformed() {
        let err = detect_delimiters("ISA*00*").unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedHeader {
                len: 7,
                expected: HEADER_SIZE
            }
        ));
    }

    #[test]
    fn test_split_segments_trims_line_breaks() {
        let ctx = DelimiterContext::x12_default();
        let segments = split_segments("ST*835*0001~\r\nN1*PR*PAYER~\nSE*2*0001~\n", &ctx);
        assert_eq!(segments, vec!["ST*835*0001", "N1*PR*PAYER", "SE*2*0001"]);
    }

    #[test]
    fn test_empty_elements_preserved() {
        let ctx = DelimiterContext::x12_default();
        let schema = LoopSchema::new("X12");
        let parser = X12Parser::new(&schema);
        let doc = parser.parse_with_context("REF*EV**~", ctx);
        let segments = doc.tree().segments(doc.tree().root());
        assert_eq!(segments[0].elements(), &["REF", "EV", "", ""]);
    }

    #[test]
    fn test_loop_disambiguation_by_qualifier() {
        let schema = schema_835();
        let parser = X12Parser::new(&schema);
        let source = format!("{ISA}GS*HP~ST*835*0001~N1*PR*PAYER~N1*PE*PAYEE~SE*2*0001~GE*1*1~IEA*1*000000001~");
        let doc = parser.parse(&source).unwrap();

        let st = doc.tree().find_loops("ST");
        assert_eq!(st.len(), 1);
        let children = doc.tree().children(st[0]);
        // Two sibling loops under ST, each with exactly one N1 segment
        assert_eq!(children.len(), 2);
        assert_eq!(doc.tree().name(children[0]), "1000A");
        assert_eq!(doc.tree().name(children[1]), "1000B");
        assert_eq!(doc.tree().segments(children[0]).len(), 1);
        assert_eq!(doc.tree().segments(children[1]).len(), 1);
        assert_eq!(
            doc.tree().segments(children[0])[0].element(2),
            Some("PAYER")
        );
    }

    #[test]
    fn test_continuation_segments_stay_in_loop() {
        let schema = schema_835();
        let parser = X12Parser::new(&schema);
        let source = format!("{ISA}GS*HP~ST*835*0001~N1*PR*PAYER~PER*CX*JOHN~SE*2*0001~GE*1*1~IEA*1*1~");
        let doc = parser.parse(&source).unwrap();

        let a = doc.tree().find_loops("1000A")[0];
        // N1 opened the loop, PER continued it
        assert_eq!(doc.tree().segments(a).len(), 2);
        assert_eq!(doc.tree().segments(a)[1].id(), Some("PER"));
    }

    #[test]
    fn test_repeated_nested_loops() {
        let schema = schema_835();
        let parser = X12Parser::new(&schema);
        let source = format!(
            "{ISA}GS*HP~ST*835*0001~LX*1~CLP*A~SVC*X~CLP*B~SVC*Y~LX*2~CLP*C~SE*2*0001~GE*1*1~IEA*1*1~"
        );
        let doc = parser.parse(&source).unwrap();

        assert_eq!(doc.tree().find_loops("2000").len(), 2);
        assert_eq!(doc.tree().find_loops("2100").len(), 3);
        assert_eq!(doc.tree().find_loops("2110").len(), 2);

        // Second LX loop holds the third CLP
        let lx2 = doc.tree().find_loops("2000")[1];
        let clp = doc.tree().children(lx2);
        assert_eq!(clp.len(), 1);
        assert_eq!(doc.tree().segments(clp[0])[0].element(1), Some("C"));
    }

    #[test]
    fn test_round_trip() {
        let schema = schema_835();
        let parser = X12Parser::new(&schema);
        let source = format!("{ISA}GS*HP~ST*835*0001~N1*PR*PAYER~N1*PE*PAYEE~SE*2*0001~GE*1*1~IEA*1*1~");
        let doc = parser.parse(&source).unwrap();
        assert_eq!(doc.to_flat(false), source);
    }
}
