// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The explicit stack of lists that are open but not yet closed.
//! This takes the place of the call stack a recursive reader would
//! use, so that a parse can stop at any depth and continue later.

use crate::pos::Pos;
use crate::value::Node;

/// One open list: the children appended so far, and where its
/// opening paren was.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    pub children: Vec<Node>,
    pub open_pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameStack {
    frames: Vec<Frame>,
}

/// What closing a frame produced.
#[derive(Debug)]
pub enum Closed {
    /// The list was appended to its parent frame.
    Nested,
    /// The outermost list was closed; here it is.
    Root(Node),
}

impl FrameStack {
    pub fn new() -> Self {
        FrameStack { frames: Vec::new() }
    }

    /// Number of open lists.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Start a new list at `pos`. Fails with the current depth if
    /// that is already `max_depth`.
    pub fn open(&mut self, pos: Pos, max_depth: Option<usize>)
                -> Result<(), usize> {
        if let Some(max) = max_depth {
            if self.frames.len() >= max {
                return Err(max)
            }
        }
        self.frames.push(Frame { children: Vec::new(), open_pos: pos });
        log::trace!("frame push, depth {}", self.frames.len());
        Ok(())
    }

    /// Close the innermost list; `None` if there is none open.
    pub fn close(&mut self) -> Option<Closed> {
        let frame = self.frames.pop()?;
        log::trace!("frame pop, depth {}", self.frames.len());
        let node = Node::List(frame.children);
        Some(
            match self.frames.last_mut() {
                Some(parent) => {
                    parent.children.push(node);
                    Closed::Nested
                }
                None => Closed::Root(node)
            })
    }

    /// Append a finished node to the innermost open list. Gives the
    /// node back if no list is open.
    pub fn append(&mut self, node: Node) -> Result<(), Node> {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.children.push(node);
                Ok(())
            }
            None => Err(node)
        }
    }

    /// Position of the innermost open paren.
    pub fn innermost_open_pos(&self) -> Option<Pos> {
        self.frames.last().map(|f| f.open_pos)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Drop all open lists and their partial contents.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
