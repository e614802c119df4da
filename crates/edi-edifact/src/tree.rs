//! Schema-guided assembly of flat EDIFACT into an EDIFACT-XML tree
//!
//! Assembly runs in two passes over a queue of raw segments. The structural
//! pass walks the schema recursively: group references try to open a group
//! instance whenever the queue head matches the group's first expected
//! segment, and segment references consume a run of same-named raw
//! segments. Matching is greedy and never backtracks; the queue running out
//! in the middle of a group is a normal end condition, not an error. The
//! refinement pass then splits each consumed segment body into the named
//! fields its schema declaration lists, position by position; an empty token
//! becomes a present-but-empty field so its separator survives flattening.

use crate::schema::{ElementDef, MessageSchema, SchemaRole};
use crate::syntax::{detect_delimiters, split_preserving_release, unescape};
use crate::Result;
use edi_model::DelimiterContext;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::VecDeque;

/// One field of a refined segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// A simple data element with its unescaped value.
    Simple { name: String, value: String },
    /// A composite with its components in declaration order; an empty
    /// component marks a position that was present but carried no value.
    Composite {
        name: String,
        components: Vec<(String, String)>,
    },
}

/// A node of the assembled tree: either a group (interchange root, `G_`,
/// `M_`) holding child nodes, or a leaf segment holding fields.
#[derive(Debug, Clone)]
pub struct SegmentNode {
    name: String,
    /// Raw element tokens, still escaped; drained by the refinement pass.
    elements: Vec<String>,
    fields: Vec<Field>,
    children: Vec<SegmentNode>,
}

impl SegmentNode {
    fn group(name: &str) -> Self {
        Self {
            name: name.to_string(),
            elements: Vec::new(),
            fields: Vec::new(),
            children: Vec::new(),
        }
    }

    fn leaf(name: String, elements: Vec<String>) -> Self {
        Self {
            name,
            elements,
            fields: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn children(&self) -> &[SegmentNode] {
        &self.children
    }

    /// Direct children with the given element name.
    pub fn find(&self, name: &str) -> Vec<&SegmentNode> {
        self.children.iter().filter(|c| c.name == name).collect()
    }

    /// Depth-first search over the whole subtree.
    pub fn find_all(&self, name: &str) -> Vec<&SegmentNode> {
        let mut found = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.name == name {
                found.push(node);
            }
            for child in node.children.iter().rev() {
                stack.push(child);
            }
        }
        found
    }

    /// Value of a simple field, if present.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|f| match f {
            Field::Simple { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// Replay the subtree into an event sink, document order.
    pub fn emit(&self, sink: &mut dyn EventSink) -> Result<()> {
        sink.start_element(&self.name)?;
        for field in &self.fields {
            match field {
                Field::Simple { name, value } => {
                    sink.start_element(name)?;
                    sink.characters(value)?;
                    sink.end_element(name)?;
                }
                Field::Composite { name, components } => {
                    sink.start_element(name)?;
                    for (component, value) in components {
                        sink.start_element(component)?;
                        sink.characters(value)?;
                        sink.end_element(component)?;
                    }
                    sink.end_element(name)?;
                }
            }
        }
        for child in &self.children {
            child.emit(sink)?;
        }
        sink.end_element(&self.name)
    }

    /// Serialize the subtree as EDIFACT-XML text.
    pub fn to_xml(&self) -> Result<String> {
        let mut sink = XmlWriterSink::new(Vec::new());
        self.emit(&mut sink)?;
        Ok(String::from_utf8_lossy(&sink.into_inner()).into_owned())
    }
}

/// Receiver for the replay of an assembled tree.
pub trait EventSink {
    fn start_element(&mut self, name: &str) -> Result<()>;
    fn characters(&mut self, text: &str) -> Result<()>;
    fn end_element(&mut self, name: &str) -> Result<()>;
}

/// Event sink writing XML through `quick_xml`.
pub struct XmlWriterSink<W: std::io::Write> {
    writer: Writer<W>,
}

impl<W: std::io::Write> XmlWriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new(inner),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: std::io::Write> EventSink for XmlWriterSink<W> {
    fn start_element(&mut self, name: &str) -> Result<()> {
        self.writer.write_event(Event::Start(BytesStart::new(name)))?;
        Ok(())
    }

    fn characters(&mut self, text: &str) -> Result<()> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    fn end_element(&mut self, name: &str) -> Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }
}

/// One raw segment awaiting structural placement.
#[derive(Debug)]
struct RawSegment {
    /// Prefixed element name, e.g. `S_UNB`.
    name: String,
    /// Element tokens after the tag, escapes intact.
    elements: Vec<String>,
}

/// Builds an EDIFACT-XML tree from flat interchange text.
pub struct TreeBuilder<'a> {
    schema: &'a MessageSchema,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(schema: &'a MessageSchema) -> Self {
        Self { schema }
    }

    /// Parse a flat interchange; delimiters come from the UNA segment or
    /// the defaults.
    pub fn build(&self, source: &str) -> Result<SegmentNode> {
        let ctx = detect_delimiters(source)?;
        self.build_with_context(source, &ctx)
    }

    /// Parse with a caller-supplied delimiter context.
    pub fn build_with_context(
        &self,
        source: &str,
        ctx: &DelimiterContext,
    ) -> Result<SegmentNode> {
        let mut queue = raw_segments(source, ctx);
        tracing::debug!(segments = queue.len(), "assembling interchange");

        let root_def = self.schema.root()?;
        let mut root = SegmentNode::group(&root_def.name);
        self.populate(root_def, &mut root, &mut queue)?;
        if !queue.is_empty() {
            tracing::debug!(
                remaining = queue.len(),
                next = queue.front().map(|s| s.name.as_str()),
                "segments left unplaced after schema walk"
            );
        }
        self.refine(&mut root, ctx)?;
        Ok(root)
    }

    /// Parse and serialize in one step.
    pub fn to_xml(&self, source: &str) -> Result<String> {
        self.build(source)?.to_xml()
    }

    /// Structural pass: place raw segments under one schema declaration.
    fn populate(
        &self,
        def: &ElementDef,
        node: &mut SegmentNode,
        queue: &mut VecDeque<RawSegment>,
    ) -> Result<()> {
        for child_ref in &def.children {
            let child = self.schema.get(&child_ref.name)?;
            if child.role.is_group() {
                // A group opens only when the queue head is the group's
                // first expected segment; repetition is bounded by the
                // reference's maxOccurs.
                let Some(first) = child.children.first() else {
                    continue;
                };
                for _ in 0..child_ref.max_occurs {
                    let matches = queue
                        .front()
                        .is_some_and(|head| head.name == first.name);
                    if !matches {
                        break;
                    }
                    let mut group = SegmentNode::group(&child.name);
                    self.populate(child, &mut group, queue)?;
                    if group.children.is_empty() {
                        break;
                    }
                    node.children.push(group);
                }
            } else if child.role == SchemaRole::Segment {
                // Consume the run of same-named segments. maxOccurs of one
                // stops after the first; anything larger takes the whole
                // run.
                while queue
                    .front()
                    .is_some_and(|head| head.name == child_ref.name)
                {
                    if let Some(raw) = queue.pop_front() {
                        node.children.push(SegmentNode::leaf(raw.name, raw.elements));
                    }
                    if child_ref.max_occurs <= 1 {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Refinement pass: split leaf bodies into named fields.
    fn refine(&self, node: &mut SegmentNode, ctx: &DelimiterContext) -> Result<()> {
        if node.children.is_empty() && node.name.starts_with("S_") {
            let fields = if node.name == "S_UNA" {
                service_advice_fields(ctx)
            } else {
                self.split_fields(&node.name, &node.elements, ctx)?
            };
            node.fields = fields;
            node.elements.clear();
        }
        for child in &mut node.children {
            self.refine(child, ctx)?;
        }
        Ok(())
    }

    /// Pair element tokens with the segment's declared fields, position by
    /// position. An empty token becomes a present-but-empty field so that
    /// flattening can re-emit its separator; only positions beyond the
    /// supplied run are absent. A composite token splits once more on the
    /// component separator.
    fn split_fields(
        &self,
        name: &str,
        elements: &[String],
        ctx: &DelimiterContext,
    ) -> Result<Vec<Field>> {
        let def = self.schema.get(name)?;
        let mut fields = Vec::new();
        for (child_ref, token) in def.children.iter().zip(elements) {
            let child = self.schema.get(&child_ref.name)?;
            match child.role {
                SchemaRole::DataElement => fields.push(Field::Simple {
                    name: child.name.clone(),
                    value: unescape(token, ctx.release),
                }),
                SchemaRole::Composite => {
                    let tokens = split_preserving_release(token, ctx.composite, ctx.release);
                    let mut components = Vec::new();
                    for (sub_ref, sub) in child.children.iter().zip(&tokens) {
                        let sub_def = self.schema.get(&sub_ref.name)?;
                        components.push((sub_def.name.clone(), unescape(sub, ctx.release)));
                    }
                    fields.push(Field::Composite {
                        name: child.name.clone(),
                        components,
                    });
                }
                _ => {}
            }
        }
        Ok(fields)
    }
}

/// Split the interchange into a segment queue, escapes intact.
fn raw_segments(source: &str, ctx: &DelimiterContext) -> VecDeque<RawSegment> {
    let mut queue = VecDeque::new();
    for raw in split_preserving_release(source, ctx.segment, ctx.release) {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        if raw.starts_with("UNA") {
            queue.push_back(RawSegment {
                name: "S_UNA".to_string(),
                elements: Vec::new(),
            });
            continue;
        }
        let mut tokens = split_preserving_release(raw, ctx.element, ctx.release).into_iter();
        let tag = tokens.next().unwrap_or_default();
        queue.push_back(RawSegment {
            name: format!("S_{tag}"),
            elements: tokens.collect(),
        });
    }
    queue
}

/// The six fixed fields of the service string advice.
fn service_advice_fields(ctx: &DelimiterContext) -> Vec<Field> {
    let simple = |name: &str, value: String| Field::Simple {
        name: name.to_string(),
        value,
    };
    vec![
        simple("D_UNA1", ctx.composite.to_string()),
        simple("D_UNA2", ctx.element.to_string()),
        simple("D_UNA3", ctx.decimal.map(String::from).unwrap_or_default()),
        simple("D_UNA4", ctx.release.map(String::from).unwrap_or_default()),
        simple("D_UNA5", String::new()),
        simple("D_UNA6", ctx.segment.to_string()),
    ]
}
