// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Turning bytes into trees, a chunk at a time. A [Continuation]
//! holds everything the state machine needs to stop when its input
//! runs out and to go on when handed the next chunk: the machine
//! state, the stack of open lists, and the partially read atom.
//! Running out of input in the middle of an expression is not an
//! error, just [Status::Suspended]. See [read](../read/index.html)
//! for reading from file handles.

use crate::frame::{Closed, FrameStack};
use crate::pos::Pos;
use crate::scanner::AtomScanner;
use crate::settings::Settings;
use crate::value::{AtomKind, Node};
use std::collections::TryReserveError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unmatched closing paren ')'")]
    UnmatchedCloseParen,
    #[error("lists nested deeper than {0}")]
    NestingTooDeep(usize),
    #[error("atom longer than {0} bytes")]
    AtomTooLong(usize),
    #[error("could not grow the atom buffer ({0})")]
    AtomBufferOverflow(TryReserveError),
    #[error("unexpected end of stream in string starting")]
    UnexpectedEofInString,
    #[error("unexpected end of stream in quoted expression starting")]
    UnexpectedEofInRawCapture,
    #[error("premature end of stream while expecting ')' for '('")]
    PrematureEof,
    #[error("completed expression was not taken before feeding more input")]
    UnclaimedExpression,
    #[error("continuation unusable after an earlier error")]
    Unusable,
}

impl ParseError {
    /// Fatal errors discard the partial tree and leave the
    /// continuation unusable; after the others, the same
    /// continuation can be fed again.
    pub fn is_fatal(&self) -> bool {
        ! matches!(self,
                   ParseError::AtomBufferOverflow(_)
                   | ParseError::UnclaimedExpression)
    }

    pub fn at(self, p: Pos) -> ParseErrorWithPos {
        ParseErrorWithPos {
            err: self,
            pos: p
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{err} {pos}")]
pub struct ParseErrorWithPos {
    pub err: ParseError,
    pub pos: Pos
}

/// Conditions that don't stop parsing.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParseWarning {
    #[error("invalid escape sequence '\\{}', backslash dropped",
            .0.escape_ascii())]
    InvalidEscapeSequence(u8),
    #[error("backslash at end of stream dropped")]
    DanglingEscape,
    #[error("invalid UTF-8 in atom replaced")]
    InvalidUtf8,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("warning: {warning} {pos}")]
pub struct ParseWarningWithPos {
    pub warning: ParseWarning,
    pub pos: Pos
}

/// The state machine's states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum State {
    /// Between tokens.
    Start,
    /// Reading an unquoted atom (or the atom after a `'`).
    InAtom,
    /// Inside `"..."`.
    InDQuote,
    /// Just after a `'`.
    AfterSingleQuote,
    /// Inside `'(...)`, copying text verbatim.
    InRawCapture,
}

/// Outcome of feeding a chunk that didn't end in an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// An expression is complete and can be taken; `consumed` bytes
    /// of the chunk were used, the rest has not been looked at.
    Complete { consumed: usize },
    /// The whole chunk was used without completing an expression.
    Suspended,
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C)
}

// Bytes that end an unquoted atom (and are then processed in the
// Start state).
fn is_atom_terminator(b: u8) -> bool {
    is_whitespace(b) || matches!(b, b'(' | b')' | b'"' | b'\'')
}

// Whether the current byte was used up, or has to be seen again by
// the next state.
enum Step {
    Consumed,
    Again,
}

/// The suspended state of one parse in progress. Create one per
/// stream, feed it the stream's bytes in order, and take the
/// expressions out as they complete.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Continuation {
    settings: Settings,
    state: State,
    quote_depth: usize,
    frames: FrameStack,
    scanner: AtomScanner,
    /// Position of the next byte.
    pos: Pos,
    pending_input_offset: Option<usize>,
    last_expression: Option<Node>,
    warnings: Vec<ParseWarningWithPos>,
    unusable: bool,
}

impl Default for Continuation {
    fn default() -> Self {
        Continuation::new()
    }
}

impl Continuation {
    pub fn new() -> Self {
        Continuation::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Continuation {
            settings,
            state: State::Start,
            quote_depth: 0,
            frames: FrameStack::new(),
            scanner: AtomScanner::with_capacity(settings.initial_atom_capacity),
            pos: Pos::default(),
            pending_input_offset: None,
            last_expression: None,
            warnings: Vec::new(),
            unusable: false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Number of open lists.
    pub fn depth(&self) -> usize {
        self.frames.depth()
    }

    pub fn quote_depth(&self) -> usize {
        self.quote_depth
    }

    pub fn frames(&self) -> &FrameStack {
        &self.frames
    }

    /// Write position in the atom buffer.
    pub fn cursor(&self) -> usize {
        self.scanner.cursor()
    }

    pub fn atom_capacity(&self) -> usize {
        self.scanner.capacity()
    }

    /// Position of the next byte to be fed.
    pub fn pos(&self) -> Pos {
        self.pos
    }

    /// Offset into the last chunk of the first byte that was not
    /// looked at, if any were left over.
    pub fn pending_input_offset(&self) -> Option<usize> {
        self.pending_input_offset
    }

    pub fn has_expression(&self) -> bool {
        self.last_expression.is_some()
    }

    /// True when nothing is in flight: no open list, no partial atom.
    pub fn is_idle(&self) -> bool {
        self.state == State::Start && self.frames.is_empty()
    }

    pub fn is_usable(&self) -> bool {
        ! self.unusable
    }

    /// Take the completed expression; it is handed out only once.
    pub fn take_expression(&mut self) -> Option<Node> {
        self.last_expression.take()
    }

    /// Take the warnings collected so far.
    pub fn take_warnings(&mut self) -> Vec<ParseWarningWithPos> {
        std::mem::take(&mut self.warnings)
    }

    fn warn(&mut self, warning: ParseWarning, pos: Pos) {
        let w = ParseWarningWithPos { warning, pos };
        log::warn!("{}", w);
        self.warnings.push(w);
    }

    // Forget all work in progress and refuse further input.
    fn poison(&mut self) {
        self.unusable = true;
        self.frames.clear();
        self.scanner.clear();
        self.last_expression = None;
        self.pending_input_offset = None;
    }

    // Put a finished value into the innermost open list, or make it
    // the completed expression if there is none.
    fn emit(&mut self) {
        let (atom, warning) = self.scanner.take();
        if let Some(w) = warning {
            let start = self.scanner.start();
            self.warn(w, start);
        }
        if let Err(node) = self.frames.append(Node::Value(atom)) {
            self.last_expression = Some(node);
        }
    }

    fn push_atom_byte(&mut self, b: u8) -> Result<(), ParseError> {
        self.scanner.push(b, self.settings.max_atom_len)
    }

    fn push_escaped_byte(&mut self, b: u8) -> Result<(), ParseError> {
        if let Some(w) = self.scanner.push_escaped(b, self.settings.max_atom_len)? {
            let pos = self.pos;
            self.warn(w, pos);
        }
        Ok(())
    }

    // Process byte b in the current state.
    fn step(&mut self, b: u8) -> Result<Step, ParseError> {
        match self.state {
            State::Start => {
                match b {
                    b'(' => {
                        self.frames.open(self.pos, self.settings.max_depth)
                            .map_err(ParseError::NestingTooDeep)?;
                    }
                    b')' => {
                        match self.frames.close() {
                            None => return Err(ParseError::UnmatchedCloseParen),
                            Some(Closed::Nested) => {}
                            Some(Closed::Root(node)) => {
                                self.last_expression = Some(node);
                            }
                        }
                    }
                    b'"' => {
                        self.scanner.begin(AtomKind::DoubleQuoted, self.pos);
                        self.state = State::InDQuote;
                    }
                    b'\'' => {
                        self.state = State::AfterSingleQuote;
                    }
                    _ if is_whitespace(b) => {}
                    _ => {
                        self.scanner.begin(AtomKind::Basic, self.pos);
                        self.state = State::InAtom;
                        return Ok(Step::Again)
                    }
                }
                Ok(Step::Consumed)
            }
            State::InAtom => {
                if self.scanner.is_escaped() {
                    self.push_escaped_byte(b)?;
                } else if is_atom_terminator(b) {
                    self.emit();
                    self.state = State::Start;
                    return Ok(Step::Again)
                } else if b == b'\\' {
                    self.scanner.set_escaped();
                } else {
                    self.push_atom_byte(b)?;
                }
                Ok(Step::Consumed)
            }
            State::InDQuote => {
                if self.scanner.is_escaped() {
                    self.push_escaped_byte(b)?;
                } else if b == b'"' {
                    self.emit();
                    self.state = State::Start;
                } else if b == b'\\' {
                    self.scanner.set_escaped();
                } else {
                    self.push_atom_byte(b)?;
                }
                Ok(Step::Consumed)
            }
            State::AfterSingleQuote => {
                // The atom starts at the quote.
                let mut start = self.pos;
                start.col = start.col.saturating_sub(1);
                start.offset = start.offset.saturating_sub(1);
                match b {
                    b'"' => {
                        self.scanner.begin(AtomKind::DoubleQuoted, start);
                        self.state = State::InDQuote;
                        Ok(Step::Consumed)
                    }
                    b'(' => {
                        self.scanner.begin(AtomKind::SingleQuotedRaw, start);
                        self.push_atom_byte(b)?;
                        self.quote_depth = 1;
                        self.state = State::InRawCapture;
                        Ok(Step::Consumed)
                    }
                    _ => {
                        self.scanner.begin(AtomKind::SingleQuotedRaw, start);
                        self.state = State::InAtom;
                        Ok(Step::Again)
                    }
                }
            }
            State::InRawCapture => {
                self.push_atom_byte(b)?;
                if self.scanner.is_escaped() {
                    // escaped bytes are kept verbatim and not counted
                    self.scanner.clear_escaped();
                } else {
                    match b {
                        b'\\' => self.scanner.set_escaped(),
                        b'(' => self.quote_depth += 1,
                        b')' => {
                            // 0 only in a continuation restored from
                            // outside; treat as the closing paren
                            self.quote_depth = self.quote_depth.saturating_sub(1);
                            if self.quote_depth == 0 {
                                self.emit();
                                self.state = State::Start;
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Step::Consumed)
            }
        }
    }

    /// Feed the next chunk of the stream. Stops right after an
    /// expression completes (see [Status::Complete]); the caller
    /// takes the expression and feeds the rest of the chunk again.
    /// A chunk ending mid-expression is [Status::Suspended]. On a
    /// fatal error the continuation becomes unusable.
    pub fn feed(&mut self, input: &[u8]) -> Result<Status, ParseErrorWithPos> {
        if self.unusable {
            return Err(ParseError::Unusable.at(self.pos))
        }
        if self.last_expression.is_some() {
            return Err(ParseError::UnclaimedExpression.at(self.pos))
        }
        self.pending_input_offset = None;
        let mut i = 0;
        while i < input.len() {
            let b = input[i];
            match self.step(b) {
                Ok(Step::Consumed) => {
                    self.pos.advance(b);
                    i += 1;
                }
                Ok(Step::Again) => {}
                Err(e) => {
                    let pos = self.pos;
                    if e.is_fatal() {
                        self.poison();
                    } else {
                        self.pending_input_offset = Some(i);
                    }
                    return Err(e.at(pos))
                }
            }
            if self.last_expression.is_some() {
                log::debug!("expression complete {}", self.pos);
                if i < input.len() {
                    self.pending_input_offset = Some(i);
                }
                return Ok(Status::Complete { consumed: i })
            }
        }
        log::debug!("suspended in {:?} at depth {} {}",
                    self.state, self.depth(), self.pos);
        Ok(Status::Suspended)
    }

    /// Signal the end of the stream: an unquoted atom that was still
    /// being read is complete now. Returns the last expression, if
    /// one is left; anything still open is an error. Afterwards the
    /// continuation takes no more input, but its warnings can still
    /// be taken.
    pub fn finish(&mut self) -> Result<Option<Node>, ParseErrorWithPos> {
        if self.unusable {
            return Err(ParseError::Unusable.at(self.pos))
        }
        let result = self.finish_stream();
        self.poison();
        result
    }

    fn finish_stream(&mut self) -> Result<Option<Node>, ParseErrorWithPos> {
        if let Some(node) = self.last_expression.take() {
            return Ok(Some(node))
        }
        match self.state {
            State::Start => {}
            State::InAtom | State::AfterSingleQuote => {
                if self.state == State::AfterSingleQuote {
                    let mut start = self.pos;
                    start.col = start.col.saturating_sub(1);
                    start.offset = start.offset.saturating_sub(1);
                    self.scanner.begin(AtomKind::SingleQuotedRaw, start);
                }
                if self.scanner.is_escaped() {
                    let pos = self.pos;
                    self.warn(ParseWarning::DanglingEscape, pos);
                }
                self.emit();
                self.state = State::Start;
            }
            State::InDQuote => {
                return Err(ParseError::UnexpectedEofInString
                           .at(self.scanner.start()))
            }
            State::InRawCapture => {
                return Err(ParseError::UnexpectedEofInRawCapture
                           .at(self.scanner.start()))
            }
        }
        if let Some(open_pos) = self.frames.innermost_open_pos() {
            return Err(ParseError::PrematureEof.at(open_pos))
        }
        Ok(self.last_expression.take())
    }
}

/// What a call to [parse] produced.
#[derive(Debug)]
pub struct ParseOutcome {
    /// Pass this to the next call for the same stream.
    pub continuation: Continuation,
    /// The completed expression, now owned by the caller.
    pub expression: Option<Node>,
    pub status: Status,
    pub warnings: Vec<ParseWarningWithPos>,
}

/// Parse `input`, continuing from `continuation` if given, else from
/// scratch. On error the continuation is dropped; use
/// [Continuation::feed] directly to recover from non-fatal errors.
pub fn parse(
    input: &[u8],
    continuation: Option<Continuation>,
) -> Result<ParseOutcome, ParseErrorWithPos>
{
    let mut continuation = continuation.unwrap_or_default();
    let status = continuation.feed(input)?;
    let expression = continuation.take_expression();
    let warnings = continuation.take_warnings();
    Ok(ParseOutcome { continuation, expression, status, warnings })
}
