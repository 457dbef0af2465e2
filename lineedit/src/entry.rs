use std::num::{ParseFloatError, ParseIntError};

/// Settled outcome of a [`LineEditor`](crate::LineEditor) session.
///
/// `Cancelled` and `Empty` both mean "leave the value alone"; they are kept
/// apart so yes/no prompts can fall back to a default on a bare Enter while
/// Escape still backs out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Cancelled,
    Empty,
    Text(String),
}

impl Entry {
    pub fn text(&self) -> Option<&str> {
        match self {
            Entry::Text(text) => Some(text),
            Entry::Cancelled | Entry::Empty => None,
        }
    }

    /// `Ok(None)` when no change was requested, `Err` when the digits do not
    /// fit in a `u32`.
    pub fn as_unsigned(&self) -> Result<Option<u32>, ParseIntError> {
        self.text().map(str::parse).transpose()
    }

    /// A buffer holding only a sign and/or a point counts as empty.
    pub fn as_decimal(&self) -> Result<Option<f32>, ParseFloatError> {
        match self.text() {
            Some(text) if text.chars().any(|c| c.is_ascii_digit()) => text.parse().map(Some),
            _ => Ok(None),
        }
    }

    /// Yes/no answer; a bare Enter yields `default`, Escape yields `None`.
    pub fn as_answer(&self, default: bool) -> Option<bool> {
        match self {
            Entry::Cancelled => None,
            Entry::Empty => Some(default),
            Entry::Text(text) => Some(text.starts_with(['Y', 'y'])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_overflow_is_an_error() {
        let entry = Entry::Text("99999999999".into());
        assert!(entry.as_unsigned().is_err());
    }

    #[test]
    fn unsigned_zero_is_a_value() {
        assert_eq!(Entry::Text("0".into()).as_unsigned(), Ok(Some(0)));
        assert_eq!(Entry::Empty.as_unsigned(), Ok(None));
    }

    #[test]
    fn sign_or_point_alone_is_no_change() {
        for text in ["-", ".", "-."] {
            assert_eq!(Entry::Text(text.into()).as_decimal(), Ok(None), "{text}");
        }
    }

    #[test]
    fn bare_point_forms_parse() {
        assert_eq!(Entry::Text(".5".into()).as_decimal(), Ok(Some(0.5)));
        assert_eq!(Entry::Text("5.".into()).as_decimal(), Ok(Some(5.0)));
        assert_eq!(Entry::Text("-.25".into()).as_decimal(), Ok(Some(-0.25)));
    }

    #[test]
    fn cancelled_answer_has_no_default() {
        assert_eq!(Entry::Cancelled.as_answer(true), None);
    }
}
