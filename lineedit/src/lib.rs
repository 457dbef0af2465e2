//! Character-at-a-time line entry for plain serial-style terminals.
//!
//! A [`LineEditor`] is fed one character at a time, filters what it accepts
//! according to its [`Mode`], and tells the caller what to echo back. Once
//! Enter or Escape arrives (or the buffer is full) it settles into an
//! [`Entry`].

pub mod editor;
pub mod entry;

pub use editor::{LineEditor, Mode, State};
pub use entry::Entry;

/// Escape: cancels the current entry.
pub const ESC: char = '\x1b';

/// Backspace as sent by most serial terminals.
pub const BACKSPACE: char = '\x08';

/// Delete as sent by terminals configured for DEL-on-backspace.
pub const DELETE: char = '\x7f';

/// Echo sequence that visually removes the last character.
pub const ERASE: &str = "\x08 \x08";
