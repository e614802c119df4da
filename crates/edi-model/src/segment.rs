//! Segment model
//!
//! A segment is an ordered, mutable sequence of string elements. Element 0
//! is conventionally the segment identifier (`ISA`, `N1`, `UNH`, ...). A
//! composite element is stored pre-joined by the composite separator;
//! splitting into sub-elements is done on demand against a
//! [`DelimiterContext`], never stored structurally.

use crate::delimiters::DelimiterContext;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// One structural unit of an EDI message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    elements: Vec<String>,
}

impl Segment {
    /// Create a segment with the given identifier as element 0.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            elements: vec![id.into()],
        }
    }

    /// Create a segment from pre-split element tokens.
    pub fn from_elements(elements: Vec<String>) -> Self {
        Self { elements }
    }

    /// The segment identifier (element 0), if any.
    pub fn id(&self) -> Option<&str> {
        self.elements.first().map(String::as_str)
    }

    /// All elements in insertion order.
    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Element at `index`, if present.
    pub fn element(&self, index: usize) -> Option<&str> {
        self.elements.get(index).map(String::as_str)
    }

    /// Number of elements, including the identifier.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True when the segment holds no elements at all.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Append an element.
    pub fn add_element(&mut self, value: impl Into<String>) -> &mut Self {
        self.elements.push(value.into());
        self
    }

    /// Append a composite element by joining sub-elements with the context's
    /// composite separator.
    pub fn add_composite(&mut self, ctx: &DelimiterContext, parts: &[&str]) -> &mut Self {
        self.elements
            .push(parts.join(&ctx.composite.to_string()));
        self
    }

    /// Insert an element at `index`, shifting later elements right.
    pub fn insert_element(&mut self, index: usize, value: impl Into<String>) -> Result<()> {
        if index > self.elements.len() {
            return Err(Error::ElementIndex {
                index,
                len: self.elements.len(),
            });
        }
        self.elements.insert(index, value.into());
        Ok(())
    }

    /// Replace the element at `index`.
    pub fn set_element(&mut self, index: usize, value: impl Into<String>) -> Result<()> {
        let len = self.elements.len();
        match self.elements.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(Error::ElementIndex { index, len }),
        }
    }

    /// Remove and return the element at `index`.
    pub fn remove_element(&mut self, index: usize) -> Result<String> {
        if index >= self.elements.len() {
            return Err(Error::ElementIndex {
                index,
                len: self.elements.len(),
            });
        }
        Ok(self.elements.remove(index))
    }

    /// Split the element at `index` into its composite sub-elements.
    ///
    /// A simple element comes back as a single-entry vector; empty
    /// sub-elements are preserved.
    pub fn components<'a>(
        &'a self,
        index: usize,
        ctx: &DelimiterContext,
    ) -> Option<Vec<&'a str>> {
        self.elements
            .get(index)
            .map(|e| e.split(ctx.composite).collect())
    }

    /// Serialize to flat form: elements joined by the element separator.
    pub fn to_flat(&self, ctx: &DelimiterContext) -> String {
        self.elements.join(&ctx.element.to_string())
    }

    /// Serialize to flat form, dropping trailing empty elements first.
    ///
    /// Trimming is a serialization mode only; the stored elements are
    /// untouched.
    pub fn to_flat_trimmed(&self, ctx: &DelimiterContext) -> String {
        let trimmed = self.trimmed_elements();
        trimmed.join(&ctx.element.to_string())
    }

    /// Serialize to the X12 XML form.
    ///
    /// The identifier becomes the wrapping tag and each element gets a tag
    /// of identifier plus two-digit position: `<N1><N101><![CDATA[PR]]></N101></N1>`.
    pub fn to_xml(&self, trim_trailing_empty: bool) -> String {
        let trimmed;
        let elements: &[String] = if trim_trailing_empty {
            trimmed = self.trimmed_elements();
            &trimmed
        } else {
            &self.elements
        };
        let Some(id) = elements.first() else {
            return String::new();
        };
        let mut xml = String::new();
        xml.push('<');
        xml.push_str(id);
        xml.push('>');
        for (i, value) in elements.iter().enumerate().skip(1) {
            let tag = format!("{id}{i:02}");
            xml.push('<');
            xml.push_str(&tag);
            xml.push_str("><![CDATA[");
            xml.push_str(value);
            xml.push_str("]]></");
            xml.push_str(&tag);
            xml.push('>');
        }
        xml.push_str("</");
        xml.push_str(id);
        xml.push('>');
        xml
    }

    fn trimmed_elements(&self) -> Vec<String> {
        let keep = self
            .elements
            .iter()
            .rposition(|e| !e.is_empty())
            .map_or(0, |p| p + 1);
        self.elements[..keep].to_vec()
    }
}
