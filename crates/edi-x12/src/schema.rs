//! Loop schema configuration
//!
//! A [`LoopSchema`] is a configuration tree, independent of any parsed data,
//! describing for each named loop which segment identifier opens it and, when
//! the identifier alone is ambiguous, which qualifier values at which element
//! position disambiguate it. In X12 835 for instance, loops 1000A and 1000B
//! both open on `N1` and are told apart by `PR` vs `PE` at element 1.
//!
//! Nodes live in an arena addressed by [`SchemaId`]; sibling nodes sharing a
//! segment id must be distinguished by qualifier, otherwise the first
//! declared sibling wins (the overlap is not detected).

use std::fmt;

/// Handle to one node inside a [`LoopSchema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaId(usize);

#[derive(Debug, Clone)]
struct SchemaNode {
    name: String,
    /// Segment identifier opening this loop; `None` for pure grouping nodes
    /// such as the transaction root.
    segment_id: Option<String>,
    qualifiers: Vec<String>,
    qualifier_pos: Option<usize>,
    parent: Option<SchemaId>,
    children: Vec<SchemaId>,
    depth: usize,
}

/// Configuration tree describing the legal loop nesting of one transaction
/// type. Built programmatically by the caller; read-only afterwards and
/// safely shareable across concurrent parses.
#[derive(Debug, Clone)]
pub struct LoopSchema {
    nodes: Vec<SchemaNode>,
}

impl LoopSchema {
    /// Create a schema whose root is a pure grouping node (no segment id).
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![SchemaNode {
                name: root_name.into(),
                segment_id: None,
                qualifiers: Vec::new(),
                qualifier_pos: None,
                parent: None,
                children: Vec::new(),
                depth: 0,
            }],
        }
    }

    /// The root node.
    pub fn root(&self) -> SchemaId {
        SchemaId(0)
    }

    /// Add a loop identified by segment id alone.
    pub fn add_child(
        &mut self,
        parent: SchemaId,
        name: impl Into<String>,
        segment_id: impl Into<String>,
    ) -> SchemaId {
        self.push_node(parent, name.into(), Some(segment_id.into()), Vec::new(), None)
    }

    /// Add a loop identified by segment id plus qualifier values at a
    /// zero-based element position. `qualifiers_csv` holds one or more
    /// comma-separated values, e.g. `"PR"` or `"PR,PE"`.
    pub fn add_child_qualified(
        &mut self,
        parent: SchemaId,
        name: impl Into<String>,
        segment_id: impl Into<String>,
        qualifiers_csv: &str,
        qualifier_pos: usize,
    ) -> SchemaId {
        let qualifiers = qualifiers_csv
            .split(',')
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(String::from)
            .collect();
        self.push_node(
            parent,
            name.into(),
            Some(segment_id.into()),
            qualifiers,
            Some(qualifier_pos),
        )
    }

    /// Add a pure grouping node (no segment id).
    pub fn add_group(&mut self, parent: SchemaId, name: impl Into<String>) -> SchemaId {
        self.push_node(parent, name.into(), None, Vec::new(), None)
    }

    fn push_node(
        &mut self,
        parent: SchemaId,
        name: String,
        segment_id: Option<String>,
        qualifiers: Vec<String>,
        qualifier_pos: Option<usize>,
    ) -> SchemaId {
        let id = SchemaId(self.nodes.len());
        let depth = self.nodes[parent.0].depth + 1;
        self.nodes.push(SchemaNode {
            name,
            segment_id,
            qualifiers,
            qualifier_pos,
            parent: Some(parent),
            children: Vec::new(),
            depth,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Loop name for a node.
    pub fn name(&self, id: SchemaId) -> &str {
        &self.nodes[id.0].name
    }

    /// Segment identifier for a node, if it has one.
    pub fn segment_id(&self, id: SchemaId) -> Option<&str> {
        self.nodes[id.0].segment_id.as_deref()
    }

    /// Parent node; `None` for the root.
    pub fn parent(&self, id: SchemaId) -> Option<SchemaId> {
        self.nodes[id.0].parent
    }

    /// Children in declaration order.
    pub fn children(&self, id: SchemaId) -> &[SchemaId] {
        &self.nodes[id.0].children
    }

    /// Check whether a tokenized segment matches the loop configuration at
    /// `id`: the segment identifier must equal the configured one, and when a
    /// qualifier position is set, the element at that position must equal one
    /// of the configured qualifier values. A position beyond the segment's
    /// length never matches.
    pub fn matches(&self, id: SchemaId, tokens: &[&str]) -> bool {
        let node = &self.nodes[id.0];
        let Some(segment_id) = node.segment_id.as_deref() else {
            return false;
        };
        if tokens.first().copied() != Some(segment_id) {
            return false;
        }
        match node.qualifier_pos {
            None => true,
            Some(pos) => tokens
                .get(pos)
                .is_some_and(|t| node.qualifiers.iter().any(|q| q == t)),
        }
    }

    /// Find the first child of `parent` (declaration order) matching the
    /// tokenized segment. First match wins when sibling qualifiers overlap.
    pub fn match_child(&self, parent: SchemaId, tokens: &[&str]) -> Option<SchemaId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|&child| self.matches(child, tokens))
    }
}

impl fmt::Display for LoopSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, self.root())
    }
}

impl LoopSchema {
    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: SchemaId) -> fmt::Result {
        let node = &self.nodes[id.0];
        for _ in 0..node.depth {
            write!(f, "|  ")?;
        }
        write!(f, "+--{}", node.name)?;
        if let Some(segment_id) = &node.segment_id {
            write!(f, " - {segment_id}")?;
        }
        if !node.qualifiers.is_empty() {
            write!(f, " - {}", node.qualifiers.join(","))?;
        }
        if let Some(pos) = node.qualifier_pos {
            write!(f, " - {pos}")?;
        }
        writeln!(f)?;
        for &child in &node.children {
            self.fmt_node(f, child)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The canonical 835-style hierarchy.
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
    fn test_match_by_segment_id() {
        let cf = schema_835();
        let isa = cf.children(cf.root())[0];
        assert!(cf.matches(isa, &["ISA", "00"]));
        assert!(!cf.matches(isa, &["GS"]));
    }

    #[test]
    fn test_match_by_qualifier() {
        let cf = schema_835();
        let st = cf.find_by_name("ST");
        let a = cf.children(st)[0];
        let b = cf.children(st)[1];
        assert!(cf.matches(a, &["N1", "PR", "PAYER"]));
        assert!(!cf.matches(a, &["N1", "PE", "PAYEE"]));
        assert!(cf.matches(b, &["N1", "PE", "PAYEE"]));
    }

    #[test]
    fn test_qualifier_position_out_of_range() {
        let cf = schema_835();
        let st = cf.find_by_name("ST");
        let a = cf.children(st)[0];
        // Segment too short to carry the qualifier
        assert!(!cf.matches(a, &["N1"]));
    }

    #[test]
    fn test_match_child_first_declared_wins() {
        let mut cf = LoopSchema::new("ROOT");
        let first = cf.add_child_qualified(cf.root(), "A", "N1", "PR,PE", 1);
        cf.add_child_qualified(cf.root(), "B", "N1", "PE", 1);
        // Overlapping qualifiers: first declared sibling wins
        assert_eq!(cf.match_child(cf.root(), &["N1", "PE"]), Some(first));
    }

    #[test]
    fn test_csv_qualifiers() {
        let mut cf = LoopSchema::new("ROOT");
        let id = cf.add_child_qualified(cf.root(), "L", "REF", "EV, F8", 1);
        assert!(cf.matches(id, &["REF", "EV"]));
        assert!(cf.matches(id, &["REF", "F8"]));
        assert!(!cf.matches(id, &["REF", "XX"]));
    }

    #[test]
    fn test_grouping_node_never_matches() {
        let cf = LoopSchema::new("X12");
        assert!(!cf.matches(cf.root(), &["X12"]));
    }

    #[test]
    fn test_display_hierarchy() {
        let cf = schema_835();
        let dump = cf.to_string();
        assert!(dump.starts_with("+--X12\n"));
        assert!(dump.contains("|  |  |  |  +--1000A - N1 - PR - 1\n"));
        assert!(dump.contains("|  |  |  |  +--1000B - N1 - PE - 1\n"));
    }

    impl LoopSchema {
        fn find_by_name(&self, name: &str) -> SchemaId {
            SchemaId(
                self.nodes
                    .iter()
                    .position(|n| n.name == name)
                    .expect("node not found"),
            )
        }
    }
}
