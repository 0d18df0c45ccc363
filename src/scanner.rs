// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Accumulating the bytes of the atom currently being read. The
//! buffer lives in the continuation, so an atom (or an escape
//! sequence inside it) may be split across input chunks.

use crate::parse::{ParseError, ParseWarning};
use crate::pos::Pos;
use crate::value::{Atom, AtomKind};
use kstring::KString;

/// The byte a backslash escape stands for, if `c` may follow a
/// backslash.
pub fn decode_escape(c: u8) -> Option<u8> {
    match c {
        b'n' => Some(b'\n'),
        b't' => Some(b'\t'),
        b'r' => Some(b'\r'),
        b'v' => Some(0x0B),
        b'f' => Some(0x0C),
        b'b' => Some(0x08),
        b'a' => Some(0x07),
        b')' | b'(' | b'\'' | b'"' | b'\\' | b' ' => Some(c),
        _ => None
    }
}

// Decode UTF-8, replacing invalid sequences with U+FFFD. Returns
// whether anything had to be replaced.
fn decode_lossy(mut input: &[u8]) -> (KString, bool) {
    let mut out = String::new();
    loop {
        match utf8::decode(input) {
            Ok(s) => {
                if out.is_empty() {
                    return (KString::from_ref(s), false)
                }
                out.push_str(s);
                return (KString::from_string(out), true)
            }
            Err(utf8::DecodeError::Invalid {
                valid_prefix, remaining_input, ..
            }) => {
                out.push_str(valid_prefix);
                out.push_str(utf8::REPLACEMENT_CHARACTER);
                input = remaining_input;
            }
            Err(utf8::DecodeError::Incomplete { valid_prefix, .. }) => {
                out.push_str(valid_prefix);
                out.push_str(utf8::REPLACEMENT_CHARACTER);
                return (KString::from_string(out), true)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AtomScanner {
    buf: Vec<u8>,
    kind: AtomKind,
    /// A backslash was seen and the byte after it is still to come.
    escaped: bool,
    start: Pos,
}

impl AtomScanner {
    pub fn with_capacity(capacity: usize) -> Self {
        AtomScanner {
            buf: Vec::with_capacity(capacity),
            kind: AtomKind::Basic,
            escaped: false,
            start: Pos::default(),
        }
    }

    /// Reset the buffer for a new atom of `kind` starting at `start`.
    pub fn begin(&mut self, kind: AtomKind, start: Pos) {
        self.buf.clear();
        self.kind = kind;
        self.escaped = false;
        self.start = start;
    }

    pub fn kind(&self) -> AtomKind {
        self.kind
    }

    pub fn start(&self) -> Pos {
        self.start
    }

    /// Write position in the buffer.
    pub fn cursor(&self) -> usize {
        self.buf.len()
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    pub fn is_escaped(&self) -> bool {
        self.escaped
    }

    pub fn set_escaped(&mut self) {
        self.escaped = true;
    }

    pub fn clear_escaped(&mut self) {
        self.escaped = false;
    }

    /// Append a byte, growing the buffer as needed. Nothing changes
    /// on error.
    pub fn push(&mut self, b: u8, max_len: Option<usize>)
                -> Result<(), ParseError> {
        if let Some(max) = max_len {
            if self.buf.len() >= max {
                return Err(ParseError::AtomTooLong(max))
            }
        }
        self.buf.try_reserve(1).map_err(ParseError::AtomBufferOverflow)?;
        self.buf.push(b);
        Ok(())
    }

    /// Append the byte following a backslash, decoded. An unknown
    /// escape keeps the byte and drops the backslash, and is
    /// reported as a warning.
    pub fn push_escaped(&mut self, c: u8, max_len: Option<usize>)
                        -> Result<Option<ParseWarning>, ParseError> {
        let (b, warning) = match decode_escape(c) {
            Some(b) => (b, None),
            None => (c, Some(ParseWarning::InvalidEscapeSequence(c)))
        };
        self.push(b, max_len)?;
        self.escaped = false;
        Ok(warning)
    }

    /// Turn the collected bytes into an atom and empty the buffer
    /// (keeping its capacity).
    pub fn take(&mut self) -> (Atom, Option<ParseWarning>) {
        let (s, lossy) = decode_lossy(&self.buf);
        self.buf.clear();
        self.escaped = false;
        (Atom::with_kind(self.kind, s),
         if lossy { Some(ParseWarning::InvalidUtf8) } else { None })
    }

    /// Forget the current atom and release the buffer's memory.
    pub fn clear(&mut self) {
        self.buf = Vec::new();
        self.escaped = false;
    }
}
