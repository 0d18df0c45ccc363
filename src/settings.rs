// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Limits applied while parsing.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Settings {
    /// Maximum list nesting depth, `None` for no limit. Parsing
    /// itself does not recurse, but printing and comparing trees
    /// does.
    pub max_depth: Option<usize>,
    /// Maximum length of a single atom in bytes (after escape
    /// decoding), `None` for no limit.
    pub max_atom_len: Option<usize>,
    /// Bytes reserved for the atom buffer when a continuation is
    /// created.
    pub initial_atom_capacity: usize,
}

pub const DEFAULT_SETTINGS : Settings = Settings {
    max_depth: Some(500),
    // ^ the printer recurses; with default thread stacks on Linux
    //   this keeps well clear of the limit
    max_atom_len: None,
    initial_atom_capacity: 64,
};

pub const UNLIMITED : Settings = Settings {
    max_depth: None,
    max_atom_len: None,
    initial_atom_capacity: 64,
};

impl Default for Settings {
    fn default() -> Self {
        DEFAULT_SETTINGS
    }
}
