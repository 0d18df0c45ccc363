// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Guessing what an atom's text stands for. The parser never looks
//! at this; it is for consumers of the tree.

use crate::value::{Atom, Node};
use num::BigInt;

#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Integer(BigInt),
    Real(f64),
    Text,
    List,
}

impl std::fmt::Display for Classified {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
           -> Result<(), std::fmt::Error> {
        match self {
            Classified::Integer(n) => f.write_fmt(format_args!("integer {}", n)),
            Classified::Real(x) => f.write_fmt(format_args!("real {}", x)),
            Classified::Text => f.write_str("text"),
            Classified::List => f.write_str("list"),
        }
    }
}

/// Classify the text of an unquoted atom: an optional `-` followed
/// by decimal digits is an integer, with a single `.` among them a
/// real; `0x` followed by hex digits (no sign) is an integer too.
/// Everything else is text.
pub fn classify_str(s: &str) -> Classified {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return
            if ! hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                BigInt::parse_bytes(hex.as_bytes(), 16)
                    .map_or(Classified::Text, Classified::Integer)
            } else {
                Classified::Text
            };
    }
    let digits = s.strip_prefix('-').unwrap_or(s);
    let mut seen_dot = false;
    let mut seen_digit = false;
    for b in digits.bytes() {
        if b == b'.' {
            if seen_dot {
                return Classified::Text
            }
            seen_dot = true;
        } else if b.is_ascii_digit() {
            seen_digit = true;
        } else {
            return Classified::Text
        }
    }
    if ! seen_digit {
        Classified::Text
    } else if seen_dot {
        s.parse::<f64>().map_or(Classified::Text, Classified::Real)
    } else {
        BigInt::parse_bytes(s.as_bytes(), 10)
            .map_or(Classified::Text, Classified::Integer)
    }
}

/// Only unquoted atoms can be numbers; quoted strings stay text.
pub fn classify(node: &Node) -> Classified {
    match node {
        Node::List(_) => Classified::List,
        Node::Value(Atom::Basic(s)) => classify_str(s),
        Node::Value(_) => Classified::Text,
    }
}
