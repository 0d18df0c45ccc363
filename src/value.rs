// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Runtime data types representing an S-expression tree.

//! [Atom](Atom) is a leaf; [Node](Node) adds lists implemented using
//! Rust vectors. Every node is owned by exactly one parent (or by
//! the caller, for a root), so there is no sharing and there are no
//! cycles.

use std::fmt::Write;
use kstring::KString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AtomKind {
    Basic,
    DoubleQuoted,
    SingleQuotedRaw,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Atom {
    /// Unquoted symbol or number text, escapes decoded. Printed
    /// with delimiters backslash-escaped; an empty one prints as
    /// nothing and does not read back.
    Basic(KString),
    /// Contents of a `"..."` string, escapes decoded.
    DoubleQuoted(KString),
    /// Text after a `'`. For `'(...)` this is the verbatim captured
    /// text including the outer parens, not parsed any further.
    SingleQuotedRaw(KString),
    /// Opaque bytes; never produced by the parser.
    Binary(Box<[u8]>),
}

impl Atom {
    pub fn kind(&self) -> AtomKind {
        match self {
            Atom::Basic(_) => AtomKind::Basic,
            Atom::DoubleQuoted(_) => AtomKind::DoubleQuoted,
            Atom::SingleQuotedRaw(_) => AtomKind::SingleQuotedRaw,
            Atom::Binary(_) => AtomKind::Binary,
        }
    }

    /// The text of all but binary atoms.
    pub fn text(&self) -> Option<&str> {
        match self {
            Atom::Basic(s) | Atom::DoubleQuoted(s) | Atom::SingleQuotedRaw(s)
                => Some(s.as_str()),
            Atom::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Atom::Basic(s) | Atom::DoubleQuoted(s) | Atom::SingleQuotedRaw(s)
                => s.as_bytes(),
            Atom::Binary(b) => b,
        }
    }

    /// Build a textual atom of the given kind. `AtomKind::Binary`
    /// stores the UTF-8 bytes of `s`.
    pub fn with_kind(kind: AtomKind, s: KString) -> Atom {
        match kind {
            AtomKind::Basic => Atom::Basic(s),
            AtomKind::DoubleQuoted => Atom::DoubleQuoted(s),
            AtomKind::SingleQuotedRaw => Atom::SingleQuotedRaw(s),
            AtomKind::Binary => Atom::Binary(s.as_bytes().into()),
        }
    }
}

// Which escape letter to write for c, if c needs escaping. Inside
// double quotes, parens and single quotes are harmless.
fn escape_letter(c: char, delimited: bool) -> Option<char> {
    match c {
        '\n' => Some('n'),
        '\t' => Some('t'),
        '\r' => Some('r'),
        '\x0B' => Some('v'),
        '\x0C' => Some('f'),
        '\x08' => Some('b'),
        '\x07' => Some('a'),
        '\\' | '"' => Some(c),
        '(' | ')' | '\'' | ' ' if ! delimited => Some(c),
        _ => None
    }
}

fn fmt_escaped(f: &mut std::fmt::Formatter<'_>,
               s: &str,
               delimited: bool)
               -> Result<(), std::fmt::Error> {
    for c in s.chars() {
        if let Some(e) = escape_letter(c, delimited) {
            f.write_char('\\')?;
            f.write_char(e)?;
        } else {
            f.write_char(c)?;
        }
    }
    Ok(())
}

// True if s is exactly one balanced `(...)` as the raw capture scan
// would delimit it, i.e. it can be written back verbatim after `'`.
fn is_raw_capture(s: &str) -> bool {
    let b = s.as_bytes();
    if b.first() != Some(&b'(') {
        return false
    }
    let mut depth: usize = 0;
    let mut escaped = false;
    for (i, c) in b.iter().enumerate() {
        if escaped {
            escaped = false;
            continue
        }
        match c {
            b'\\' => escaped = true,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1 == b.len()
                }
            }
            _ => {}
        }
    }
    false
}

impl std::fmt::Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
           -> Result<(), std::fmt::Error> {
        match self {
            Atom::Basic(s) => fmt_escaped(f, s, false),
            Atom::DoubleQuoted(s) => {
                f.write_char('"')?;
                fmt_escaped(f, s, true)?;
                f.write_char('"')
            }
            Atom::SingleQuotedRaw(s) => {
                f.write_char('\'')?;
                if is_raw_capture(s) {
                    f.write_str(s)
                } else {
                    fmt_escaped(f, s, false)
                }
            }
            Atom::Binary(b) => {
                // Can't be read back.
                f.write_fmt(format_args!("#b#{}#", b.len()))?;
                f.write_str(&String::from_utf8_lossy(b))
            }
        }
    }
}

/// A parsed S-expression: a list owning its children, or a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Node {
    List(Vec<Node>),
    Value(Atom),
}

impl Node {
    pub fn is_list(&self) -> bool {
        matches!(self, Node::List(_))
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Node::Value(_))
    }

    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::List(v) => Some(v),
            Node::Value(_) => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::List(v) => Some(v),
            Node::Value(_) => None,
        }
    }

    pub fn atom(&self) -> Option<&Atom> {
        match self {
            Node::Value(a) => Some(a),
            Node::List(_) => None,
        }
    }

    pub fn atom_kind(&self) -> Option<AtomKind> {
        self.atom().map(Atom::kind)
    }

    pub fn text(&self) -> Option<&str> {
        self.atom().and_then(Atom::text)
    }

    /// Give up the node and keep its children (`None` for values).
    pub fn into_children(mut self) -> Option<Vec<Node>> {
        self.children_mut().map(std::mem::take)
    }

    /// Give up the node and keep its atom (`None` for lists).
    pub fn into_atom(mut self) -> Option<Atom> {
        match &mut self {
            Node::Value(a) => Some(std::mem::replace(
                a, Atom::Basic(KString::from_static("")))),
            Node::List(_) => None,
        }
    }

    fn has_children(&self) -> bool {
        matches!(self, Node::List(v) if ! v.is_empty())
    }
}

// The default drop glue would recurse once per nesting level; tear
// down iteratively instead so deep trees can't overflow the stack.
impl Drop for Node {
    fn drop(&mut self) {
        let Node::List(children) = self else { return };
        if ! children.iter().any(Node::has_children) {
            return
        }
        let mut pending = std::mem::take(children);
        while let Some(mut node) = pending.pop() {
            if let Node::List(grandchildren) = &mut node {
                pending.append(grandchildren);
            }
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
           -> Result<(), std::fmt::Error> {
        match self {
            Node::Value(a) => std::fmt::Display::fmt(a, f),
            Node::List(v) => {
                f.write_char('(')?;
                for (i, item) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_char(' ')?;
                    }
                    std::fmt::Display::fmt(item, f)?;
                }
                f.write_char(')')
            }
        }
    }
}

impl From<Atom> for Node {
    fn from(a: Atom) -> Node {
        Node::Value(a)
    }
}

/// Easily create an unquoted atom
pub fn basic(s: &str) -> Node {
    Node::Value(Atom::Basic(KString::from_ref(s)))
}

/// Easily create a double-quoted string atom
pub fn dquoted(s: &str) -> Node {
    Node::Value(Atom::DoubleQuoted(KString::from_ref(s)))
}

/// Easily create a single-quoted raw atom
pub fn raw(s: &str) -> Node {
    Node::Value(Atom::SingleQuotedRaw(KString::from_ref(s)))
}

pub fn binary(b: &[u8]) -> Node {
    Node::Value(Atom::Binary(b.into()))
}

/// Easily create a list
pub fn list(items: impl IntoIterator<Item = Node>) -> Node {
    Node::List(items.into_iter().collect())
}
