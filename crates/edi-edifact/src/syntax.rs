//! EDIFACT wire syntax: UNA handling and release-aware tokenization
//!
//! The UNA service string advice, when present, carries six characters
//! immediately after the `UNA` tag:
//!
//! ```text
//! UNA:+.? '
//!    ^^^^^^
//!    345678   3 composite, 4 element, 5 decimal, 6 release,
//!             7 reserved (space), 8 segment terminator
//! ```
//!
//! Without a UNA the defaults `'` `+` `:` `?` `.` apply. The release
//! character escapes the separator that follows it, so splitting has to be
//! a left-to-right scan rather than a plain `str::split`.

use crate::{Error, Result};
use edi_model::DelimiterContext;

/// Index of the composite separator inside a UNA segment.
const UNA_POS_COMPOSITE: usize = 3;
/// Index of the element separator.
const UNA_POS_ELEMENT: usize = 4;
/// Index of the decimal sign.
const UNA_POS_DECIMAL: usize = 5;
/// Index of the release character.
const UNA_POS_RELEASE: usize = 6;
/// Index of the segment terminator (index 7 is the reserved space).
const UNA_POS_SEGMENT: usize = 8;

/// Discover the delimiters of a flat EDIFACT interchange.
///
/// The interchange must contain a `UNB+` header; without one the input is
/// not EDIFACT and parsing stops here. If a UNA service string advice opens
/// the interchange its six characters override the defaults.
pub fn detect_delimiters(source: &str) -> Result<DelimiterContext> {
    if !source.contains("UNB+") {
        return Err(Error::MissingInterchangeHeader);
    }

    let trimmed = source.trim_start();
    if trimmed.starts_with("UNA") {
        let chars: Vec<char> = trimmed.chars().take(UNA_POS_SEGMENT + 1).collect();
        if chars.len() > UNA_POS_SEGMENT {
            let ctx = DelimiterContext::edifact(
                chars[UNA_POS_SEGMENT],
                chars[UNA_POS_ELEMENT],
                chars[UNA_POS_COMPOSITE],
                chars[UNA_POS_RELEASE],
                chars[UNA_POS_DECIMAL],
            )?;
            tracing::debug!(?ctx, "delimiters from UNA service string advice");
            return Ok(ctx);
        }
    }
    Ok(DelimiterContext::edifact_default())
}

/// Render the nine-character UNA segment for a delimiter context.
pub fn una_segment(ctx: &DelimiterContext) -> String {
    let mut una = String::from("UNA");
    una.push(ctx.composite);
    una.push(ctx.element);
    una.push(ctx.decimal.unwrap_or('.'));
    una.push(ctx.release.unwrap_or('?'));
    una.push(' ');
    una.push(ctx.segment);
    una
}

/// Split on a delimiter, honoring the release character.
///
/// A release character protects the character after it from acting as a
/// delimiter. The release sequences are kept verbatim in the returned
/// tokens so the same input can be split again at a finer level; call
/// [`unescape`] once a token is a leaf value. Empty tokens are preserved.
pub fn split_preserving_release(
    input: &str,
    delimiter: char,
    release: Option<char>,
) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if release == Some(c) {
            current.push(c);
            if let Some(escaped) = chars.next() {
                current.push(escaped);
            }
        } else if c == delimiter {
            tokens.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    tokens.push(current);
    tokens
}

/// Drop release characters, keeping the characters they protected.
pub fn unescape(value: &str, release: Option<char>) -> String {
    let Some(release) = release else {
        return value.to_string();
    };
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == release {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Insert release characters in front of every structural separator.
///
/// The decimal sign is data, not structure, and is never escaped.
pub fn escape(value: &str, ctx: &DelimiterContext) -> String {
    let Some(release) = ctx.release else {
        return value.to_string();
    };
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == ctx.segment || c == ctx.element || c == ctx.composite || c == release {
            out.push(release);
        }
        out.push(c);
    }
    out
}
