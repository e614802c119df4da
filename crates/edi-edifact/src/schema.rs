//! EDIFACT-XML message schemas
//!
//! A [`MessageSchema`] is loaded from an EDIFACT-XML XSD (ISO TS 20625
//! style). Element names carry their role in a prefix: `S_` segment, `C_`
//! composite, `D_` data element, `G_` segment group, `M_` mandatory group;
//! the unprefixed `EDIFACT...` element is the interchange root. Only
//! `xsd:element` declarations matter here: a named declaration defines an
//! element, a `ref` declaration records an ordered child with its
//! `maxOccurs`, and everything else in the XSD is skipped.
//!
//! Schemas are conventionally stored one message type per file, named
//! `<root>_<message>_<version>.xsd`, e.g. `EDIFACTINTERCHANGE_ORDERS_96A.xsd`.

use crate::syntax::split_preserving_release;
use crate::{Error, Result};
use edi_model::DelimiterContext;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::Path;

/// Effective `maxOccurs` for `maxOccurs="unbounded"`.
pub const UNBOUNDED: u64 = 9_999_999;

/// Structural role of a schema element, decided once from its name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaRole {
    /// The unprefixed interchange root element
    Interchange,
    /// `G_` segment group
    Group,
    /// `M_` mandatory group (messages inside an interchange)
    MandatoryGroup,
    /// `S_` segment
    Segment,
    /// `C_` composite data element
    Composite,
    /// `D_` simple data element
    DataElement,
}

impl SchemaRole {
    /// Classify an element name; `None` for names outside the vocabulary.
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(prefix) = name.get(..2) {
            match prefix {
                "S_" => return Some(Self::Segment),
                "C_" => return Some(Self::Composite),
                "D_" => return Some(Self::DataElement),
                "G_" => return Some(Self::Group),
                "M_" => return Some(Self::MandatoryGroup),
                _ => {}
            }
        }
        if name.starts_with("EDIFACT") {
            return Some(Self::Interchange);
        }
        None
    }

    /// Whether this role nests other segments (rather than fields).
    pub fn is_group(self) -> bool {
        matches!(self, Self::Interchange | Self::Group | Self::MandatoryGroup)
    }
}

/// One ordered child reference inside an element declaration.
#[derive(Debug, Clone)]
pub struct ElementRef {
    pub name: String,
    pub max_occurs: u64,
}

/// One named element declaration.
#[derive(Debug, Clone)]
pub struct ElementDef {
    pub name: String,
    pub role: SchemaRole,
    pub children: Vec<ElementRef>,
}

/// Structure of one message type, indexed by element name.
#[derive(Debug, Clone)]
pub struct MessageSchema {
    root: String,
    elements: HashMap<String, ElementDef>,
}

impl MessageSchema {
    /// Parse a schema from XSD text.
    pub fn parse(xsd: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xsd);
        // A stack entry per open xsd:element; named declarations collect
        // the refs that appear anywhere inside them.
        let mut open: Vec<Option<ElementDef>> = Vec::new();
        let mut elements = HashMap::new();
        let mut root = None;

        fn close(
            entry: Option<ElementDef>,
            elements: &mut HashMap<String, ElementDef>,
            root: &mut Option<String>,
        ) {
            if let Some(def) = entry {
                if def.role == SchemaRole::Interchange && root.is_none() {
                    *root = Some(def.name.clone());
                }
                elements.insert(def.name.clone(), def);
            }
        }

        loop {
            match reader.read_event()? {
                Event::Start(e) if is_element_tag(e.name().local_name().as_ref()) => {
                    let entry = read_declaration(&e, &mut open)?;
                    open.push(entry);
                }
                Event::Empty(e) if is_element_tag(e.name().local_name().as_ref()) => {
                    let entry = read_declaration(&e, &mut open)?;
                    close(entry, &mut elements, &mut root);
                }
                Event::End(e) if is_element_tag(e.name().local_name().as_ref()) => {
                    if let Some(entry) = open.pop() {
                        close(entry, &mut elements, &mut root);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let root = root.ok_or_else(|| {
            Error::UnexpectedStructure("schema declares no interchange root element".into())
        })?;
        tracing::debug!(root, elements = elements.len(), "schema loaded");
        Ok(Self { root, elements })
    }

    /// Load a schema from an XSD file on disk.
    pub fn load(path: &Path) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Name of the interchange root element.
    pub fn root_name(&self) -> &str {
        &self.root
    }

    /// The root element declaration.
    pub fn root(&self) -> Result<&ElementDef> {
        self.get(&self.root)
    }

    /// Look up a declaration; a dangling name is a fatal schema error.
    pub fn get(&self, name: &str) -> Result<&ElementDef> {
        self.elements.get(name).ok_or_else(|| Error::UnresolvedReference {
            name: name.to_string(),
        })
    }

    /// Number of element declarations.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Conventional XSD file name for a message type and version.
pub fn xsd_file_name(root: &str, message: &str, version: &str) -> String {
    format!("{root}_{message}_{version}.xsd")
}

/// Read the message type and version out of the UNH header of a flat
/// interchange. Both live in the last element of UNH: the type is the first
/// component, the version the third (the release identifier).
pub fn message_identity(source: &str, ctx: &DelimiterContext) -> Result<(String, String)> {
    let unh = split_preserving_release(source, ctx.segment, ctx.release)
        .into_iter()
        .map(|s| s.trim().to_string())
        .find(|s| s.starts_with("UNH"))
        .ok_or(Error::MissingMessageHeader)?;

    let elements = split_preserving_release(&unh, ctx.element, ctx.release);
    let last = elements.last().ok_or(Error::MissingMessageHeader)?;
    let components = split_preserving_release(last, ctx.composite, ctx.release);
    let name = components
        .first()
        .filter(|c| !c.is_empty())
        .ok_or(Error::MissingMessageHeader)?;
    let version = components.get(2).ok_or(Error::MissingMessageHeader)?;
    Ok((name.clone(), version.clone()))
}

fn is_element_tag(local: &[u8]) -> bool {
    local == b"element"
}

/// Interpret one `xsd:element` event: a `name` attribute opens a new
/// declaration, a `ref` attribute adds a child to the innermost open one.
fn read_declaration(
    e: &quick_xml::events::BytesStart<'_>,
    open: &mut [Option<ElementDef>],
) -> Result<Option<ElementDef>> {
    let mut name = None;
    let mut reference = None;
    let mut max_occurs = 1u64;

    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        match attr.key.local_name().as_ref() {
            b"name" => name = Some(value.into_owned()),
            b"ref" => reference = Some(value.into_owned()),
            b"maxOccurs" => {
                max_occurs = if value.as_ref() == "unbounded" {
                    UNBOUNDED
                } else {
                    value.parse().unwrap_or(1)
                };
            }
            _ => {}
        }
    }

    if let Some(name) = name {
        let Some(role) = SchemaRole::from_name(&name) else {
            return Ok(None);
        };
        return Ok(Some(ElementDef {
            name,
            role,
            children: Vec::new(),
        }));
    }

    if let Some(reference) = reference {
        if let Some(def) = open.iter_mut().rev().flatten().next() {
            def.children.push(ElementRef {
                name: reference,
                max_occurs,
            });
        }
    }
    Ok(None)
}
