//! Flattening EDIFACT-XML back to wire format
//!
//! No schema is needed in this direction: the element name prefixes carry
//! the structure. An `S_` element opens a segment and its end emits the
//! terminator; each `D_` element emits the separator its position calls
//! for before its text. The only state is whether we are inside a
//! composite, whether the current field is the segment's first, and
//! whether the previous sibling was a composite.
//!
//! The `D_UNA1`..`D_UNA6` fields of a service string advice are handled
//! out of band: their single-character values reconfigure the separators
//! for the rest of the document and are re-emitted as the nine-character
//! UNA segment.

use crate::schema::SchemaRole;
use crate::syntax::escape;
use crate::{Error, Result};
use edi_model::DelimiterContext;
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;

/// Converts an EDIFACT-XML document to flat interchange text.
#[derive(Debug, Default)]
pub struct Flattener;

impl Flattener {
    pub fn new() -> Self {
        Self
    }

    pub fn flatten(&self, xml: &str) -> Result<String> {
        let mut reader = Reader::from_str(xml);
        let mut state = FlattenState::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => state.open(&local_name(e.name()))?,
                Event::Empty(e) => {
                    let name = local_name(e.name());
                    state.open(&name)?;
                    state.close(&name);
                }
                Event::Text(e) => state.text(&e.unescape()?),
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    state.text(&text);
                }
                Event::End(e) => state.close(&local_name(e.name())),
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(state.out)
    }
}

struct FlattenState {
    ctx: DelimiterContext,
    out: String,
    in_composite: bool,
    /// No field separator has been emitted yet for the open segment.
    start_segment: bool,
    /// The previous sibling field was a composite.
    last_composite: bool,
    /// Which `D_UNAn` field is open, if any.
    una_field: Option<u8>,
    una_buf: String,
}

impl FlattenState {
    fn new() -> Self {
        Self {
            ctx: DelimiterContext::edifact_default(),
            out: String::new(),
            in_composite: false,
            start_segment: false,
            last_composite: false,
            una_field: None,
            una_buf: String::new(),
        }
    }

    fn open(&mut self, name: &str) -> Result<()> {
        if let Some(index) = service_advice_index(name) {
            if !(1..=6).contains(&index) {
                return Err(Error::UnexpectedStructure(format!(
                    "unknown service advice field {name}"
                )));
            }
            self.una_field = Some(index);
            return Ok(());
        }
        match SchemaRole::from_name(name) {
            Some(SchemaRole::Segment) => {
                self.out.push_str(&name[2..]);
                self.start_segment = true;
                self.last_composite = false;
                self.in_composite = false;
            }
            Some(SchemaRole::Composite) => self.in_composite = true,
            Some(SchemaRole::DataElement) => {
                if self.in_composite {
                    if self.start_segment {
                        self.start_segment = false;
                        self.out.push(self.ctx.element);
                    } else if self.last_composite {
                        self.last_composite = false;
                        self.out.push(self.ctx.element);
                    } else {
                        self.out.push(self.ctx.composite);
                    }
                } else {
                    self.out.push(self.ctx.element);
                }
            }
            _ => self.last_composite = false,
        }
        Ok(())
    }

    fn text(&mut self, raw: &str) {
        if let Some(index) = self.una_field {
            if let Some(c) = raw.chars().next() {
                match index {
                    1 => self.ctx.composite = c,
                    2 => self.ctx.element = c,
                    3 => self.ctx.decimal = Some(c),
                    4 => self.ctx.release = Some(c),
                    // Reserved position; re-emitted as a space on close
                    5 => {}
                    _ => self.ctx.segment = c,
                }
                if index <= 4 {
                    self.una_buf.push(c);
                }
            }
            return;
        }
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let escaped = escape(trimmed, &self.ctx);
            self.out.push_str(&escaped);
        }
    }

    fn close(&mut self, name: &str) {
        if let Some(index) = service_advice_index(name) {
            if index == 5 {
                self.una_buf.push(' ');
            } else if index == 6 {
                let advice = std::mem::take(&mut self.una_buf);
                self.out.push_str(&advice);
            }
            self.una_field = None;
            return;
        }
        match SchemaRole::from_name(name) {
            Some(SchemaRole::Segment) => {
                self.out.push(self.ctx.segment);
                self.in_composite = false;
            }
            Some(SchemaRole::Composite) => {
                self.in_composite = false;
                self.last_composite = true;
            }
            _ => {}
        }
    }
}

fn service_advice_index(name: &str) -> Option<u8> {
    name.strip_prefix("D_UNA")?.parse().ok()
}

fn local_name(qname: QName<'_>) -> String {
    String::from_utf8_lossy(qname.local_name().as_ref()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_simple_segment() {
        let xml = "<EDIFACTINTERCHANGE><S_UNB>\
<C_S001><D_0001>UNOC</D_0001><D_0002>3</D_0002></C_S001>\
<D_0004>SENDER</D_0004></S_UNB></EDIFACTINTERCHANGE>";
        let flat = Flattener::new().flatten(xml).unwrap();
        assert_eq!(flat, "UNB+UNOC:3+SENDER'");
    }

    #[test]
    fn test_composite_after_simple_field() {
        let xml = "<S_NAD><D_3035>BY</D_3035>\
<C_C082><D_3039>123</D_3039><D_3055>9</D_3055></C_C082></S_NAD>";
        let flat = Flattener::new().flatten(xml).unwrap();
        assert_eq!(flat, "NAD+BY+123:9'");
    }

    #[test]
    fn test_adjacent_composites() {
        let xml = "<S_DTM>\
<C_C507><D_2005>137</D_2005><D_2380>20240101</D_2380></C_C507>\
<C_C507><D_2005>2</D_2005><D_2380>20240301</D_2380></C_C507></S_DTM>";
        let flat = Flattener::new().flatten(xml).unwrap();
        assert_eq!(flat, "DTM+137:20240101+2:20240301'");
    }

    #[test]
    fn test_groups_leave_no_trace() {
        let xml = "<EDIFACTINTERCHANGE><M_ORDERS><G_SG2>\
<S_NAD><D_3035>BY</D_3035></S_NAD></G_SG2></M_ORDERS></EDIFACTINTERCHANGE>";
        let flat = Flattener::new().flatten(xml).unwrap();
        assert_eq!(flat, "NAD+BY'");
    }

    #[test]
    fn test_separators_escaped_in_content() {
        let xml = "<S_FTX><D_4440>A+B:C?D 'E</D_4440></S_FTX>";
        let flat = Flattener::new().flatten(xml).unwrap();
        assert_eq!(flat, "FTX+A?+B?:C??D ?'E'");
    }

    #[test]
    fn test_xml_entities_decoded_before_escaping() {
        let xml = "<S_FTX><D_4440>A &amp; B&apos;s</D_4440></S_FTX>";
        let flat = Flattener::new().flatten(xml).unwrap();
        assert_eq!(flat, "FTX+A & B?'s'");
    }

    #[test]
    fn test_service_advice_reconfigures_separators() {
        let xml = "<EDIFACTINTERCHANGE><S_UNA>\
<D_UNA1>*</D_UNA1><D_UNA2>=</D_UNA2><D_UNA3>.</D_UNA3>\
<D_UNA4>#</D_UNA4><D_UNA5> </D_UNA5><D_UNA6>~</D_UNA6></S_UNA>\
<S_UNB><C_S001><D_0001>UNOC</D_0001><D_0002>3</D_0002></C_S001>\
<D_0004>S=CO</D_0004></S_UNB></EDIFACTINTERCHANGE>";
        let flat = Flattener::new().flatten(xml).unwrap();
        assert_eq!(flat, "UNA*=.# ~UNB=UNOC*3=S#=CO~");
    }

    #[test]
    fn test_default_advice_round_trips() {
        let xml = "<S_UNA>\
<D_UNA1>:</D_UNA1><D_UNA2>+</D_UNA2><D_UNA3>.</D_UNA3>\
<D_UNA4>?</D_UNA4><D_UNA5> </D_UNA5><D_UNA6>'</D_UNA6></S_UNA>";
        let flat = Flattener::new().flatten(xml).unwrap();
        assert_eq!(flat, "UNA:+.? '");
    }

    #[test]
    fn test_empty_data_element_keeps_position() {
        let xml = "<S_BGM><C_C002><D_1001>220</D_1001></C_C002>\
<D_1004></D_1004><D_1225>9</D_1225></S_BGM>";
        let flat = Flattener::new().flatten(xml).unwrap();
        assert_eq!(flat, "BGM+220++9'");
    }

    #[test]
    fn test_unknown_service_field_rejected() {
        let xml = "<S_UNA><D_UNA9>x</D_UNA9></S_UNA>";
        let err = Flattener::new().flatten(xml).unwrap_err();
        assert!(matches!(err, Error::UnexpectedStructure(_)));
    }
}
