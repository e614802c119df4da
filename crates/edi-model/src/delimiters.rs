//! Delimiter context for one EDI document instance
//!
//! X12 uses three separators (segment, element, composite) discovered at
//! fixed byte offsets of the ISA header. EDIFACT adds a release (escape)
//! character and a decimal sign, both overridable through the UNA service
//! string advice.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default X12 segment separator.
pub const X12_SEGMENT_SEPARATOR: char = '~';
/// Default X12 element separator.
pub const X12_ELEMENT_SEPARATOR: char = '*';
/// Default X12 composite sub-element separator.
pub const X12_COMPOSITE_SEPARATOR: char = ':';

/// Default EDIFACT segment terminator.
pub const EDIFACT_SEGMENT_SEPARATOR: char = '\'';
/// Default EDIFACT element separator.
pub const EDIFACT_ELEMENT_SEPARATOR: char = '+';
/// Default EDIFACT composite sub-element separator.
pub const EDIFACT_COMPOSITE_SEPARATOR: char = ':';
/// Default EDIFACT release (escape) character.
pub const EDIFACT_RELEASE_CHARACTER: char = '?';
/// Default EDIFACT decimal sign.
pub const EDIFACT_DECIMAL_SIGN: char = '.';

/// The separator characters of one EDI document.
///
/// Immutable once bound to a document instance; the invariant that all
/// configured characters are pairwise distinct is checked at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelimiterContext {
    /// Segment separator/terminator
    pub segment: char,
    /// Element (field) separator
    pub element: char,
    /// Composite sub-element separator
    pub composite: char,
    /// Release (escape) character; EDIFACT only
    pub release: Option<char>,
    /// Decimal sign; EDIFACT only
    pub decimal: Option<char>,
}

impl DelimiterContext {
    /// Build an X12 context from the three separators of the ISA header.
    pub fn x12(segment: char, element: char, composite: char) -> Result<Self> {
        let ctx = Self {
            segment,
            element,
            composite,
            release: None,
            decimal: None,
        };
        ctx.check_distinct()?;
        Ok(ctx)
    }

    /// X12 defaults: `~` `*` `:`.
    pub fn x12_default() -> Self {
        Self {
            segment: X12_SEGMENT_SEPARATOR,
            element: X12_ELEMENT_SEPARATOR,
            composite: X12_COMPOSITE_SEPARATOR,
            release: None,
            decimal: None,
        }
    }

    /// Build an EDIFACT context from an explicit five-character set.
    pub fn edifact(
        segment: char,
        element: char,
        composite: char,
        release: char,
        decimal: char,
    ) -> Result<Self> {
        let ctx = Self {
            segment,
            element,
            composite,
            release: Some(release),
            decimal: Some(decimal),
        };
        ctx.check_distinct()?;
        Ok(ctx)
    }

    /// EDIFACT defaults: `'` `+` `:` `?` `.` (used when no UNA is present).
    pub fn edifact_default() -> Self {
        Self {
            segment: EDIFACT_SEGMENT_SEPARATOR,
            element: EDIFACT_ELEMENT_SEPARATOR,
            composite: EDIFACT_COMPOSITE_SEPARATOR,
            release: Some(EDIFACT_RELEASE_CHARACTER),
            decimal: Some(EDIFACT_DECIMAL_SIGN),
        }
    }

    /// Check whether a character is one of the structural separators.
    pub fn is_structural(&self, c: char) -> bool {
        c == self.segment
            || c == self.element
            || c == self.composite
            || self.release == Some(c)
    }

    fn check_distinct(&self) -> Result<()> {
        let mut seen = Vec::with_capacity(5);
        let all = [
            Some(self.segment),
            Some(self.element),
            Some(self.composite),
            self.release,
            self.decimal,
        ];
        for c in all.into_iter().flatten() {
            if seen.contains(&c) {
                return Err(Error::DelimiterClash { a: c });
            }
            seen.push(c);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x12_defaults() {
        let ctx = DelimiterContext::x12_default();
        assert_eq!(ctx.segment, '~');
        assert_eq!(ctx.element, '*');
        assert_eq!(ctx.composite, ':');
        assert!(ctx.release.is_none());
        assert!(ctx.decimal.is_none());
    }

    #[test]
    fn test_edifact_defaults() {
        let ctx = DelimiterContext::edifact_default();
        assert_eq!(ctx.segment, '\'');
        assert_eq!(ctx.element, '+');
        assert_eq!(ctx.composite, ':');
        assert_eq!(ctx.release, Some('?'));
        assert_eq!(ctx.decimal, Some('.'));
    }

    #[test]
    fn test_clashing_delimiters_rejected() {
        let err = DelimiterContext::x12('*', '*', ':').unwrap_err();
        assert!(matches!(err, Error::DelimiterClash { a: '*' }));

        let err = DelimiterContext::edifact('\'', '+', ':', '+', '.').unwrap_err();
        assert!(matches!(err, Error::DelimiterClash { a: '+' }));
    }

    #[test]
    fn test_is_structural() {
        let ctx = DelimiterContext::edifact_default();
        assert!(ctx.is_structural('\''));
        assert!(ctx.is_structural('+'));
        assert!(ctx.is_structural(':'));
        assert!(ctx.is_structural('?'));
        // Decimal sign is not structural
        assert!(!ctx.is_structural('.'));
        assert!(!ctx.is_structural('A'));
    }

    #[test]
    fn test_custom_x12_context() {
        let ctx = DelimiterContext::x12('\n', '|', '^').unwrap();
        assert_eq!(ctx.segment, '\n');
        assert_eq!(ctx.element, '|');
    }
}
