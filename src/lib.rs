// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! This is an S-Expression parser that can be fed its input in
//! pieces, with the following goals:
//!
//! * Incremental: `contsexp::parse` (or `Continuation::feed`) takes
//!   whatever bytes are available and either returns a complete
//!   tree or a continuation to be fed the next bytes. Lists, strings,
//!   escape sequences and quoted sub-expressions may be split at any
//!   byte. Nothing needs to be buffered by the caller.
//!
//! * No recursion while parsing: open lists live on an explicit
//!   stack in the continuation, so a parse can stop at any depth.
//!   Trees are also dropped iteratively.
//!
//! * Explicit results: every call returns a status or an error with
//!   its position; warnings (like unknown escapes) are collected and
//!   logged via the `log` crate, not printed.
//!
//! * Streaming from file handles via `contsexp::read`, which feeds
//!   chunks from any `Read` into a continuation and yields the trees
//!   lazily.
//!
//! The grammar is small: lists `( ... )`, unquoted atoms, `"..."`
//! strings, and `'` quoting, where `'(...)` captures the text of the
//! sub-expression verbatim instead of parsing it. What atoms mean is
//! up to the consumer; `contsexp::number` has a helper for guessing
//! numbers.

pub mod frame;
pub mod number;
pub mod parse;
pub mod pos;
pub mod read;
pub mod scanner;
pub mod settings;
pub mod value;

pub use parse::{parse, Continuation, ParseError, ParseErrorWithPos,
                ParseOutcome, ParseWarning, Status};
pub use value::{Atom, AtomKind, Node};
