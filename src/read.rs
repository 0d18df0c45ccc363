// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Reading trees from anything implementing `Read`, a chunk at a
//! time, and writing them back out.

use crate::parse::{Continuation, ParseErrorWithPos, Status};
use crate::settings::{Settings, DEFAULT_SETTINGS};
use crate::value::Node;
use anyhow::Context;
use genawaiter::rc::Gen;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("{0}")]
    PE(#[from] ParseErrorWithPos),
    #[error("{0}")]
    IO(#[from] io::Error),
}

/// Something that hands out a stream's bytes in order, each byte
/// once.
pub trait ChunkSource {
    /// The next bytes, or `None` at the end of the stream. Never
    /// returns an empty chunk.
    fn next_chunk(&mut self) -> io::Result<Option<&[u8]>>;
}

/// Reads chunks of up to a fixed size from a `Read`.
pub struct ChunkReader<R> {
    inner: R,
    buf: Vec<u8>,
}

/// An in-memory buffer, handed out as a single chunk.
pub struct InMemory<'a>(Option<&'a [u8]>);

impl<'a> InMemory<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        InMemory(Some(bytes))
    }
}

impl<'a> ChunkSource for InMemory<'a> {
    fn next_chunk(&mut self) -> io::Result<Option<&[u8]>> {
        Ok(self.0.take().filter(|b| ! b.is_empty()))
    }
}

pub const DEFAULT_CHUNK_SIZE: usize = 8192;

impl<R: Read> ChunkReader<R> {
    pub fn new(inner: R) -> Self {
        ChunkReader::with_chunk_size(inner, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(inner: R, chunk_size: usize) -> Self {
        ChunkReader { inner, buf: vec![0; chunk_size.max(1)] }
    }
}

impl<R: Read> ChunkSource for ChunkReader<R> {
    fn next_chunk(&mut self) -> io::Result<Option<&[u8]>> {
        loop {
            match self.inner.read(&mut self.buf) {
                Ok(0) => return Ok(None),
                Ok(n) => return Ok(Some(&self.buf[..n])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}

/// Lazily yield the top-level expressions from the chunks of
/// `source`. Stops after the first error.
pub fn read_exprs_from<'s>(
    source: impl ChunkSource + 's,
    settings: Settings,
) -> impl Iterator<Item = Result<Node, ReadError>> + 's
{
    Gen::new(|co| async move {
        let mut source = source;
        let mut cont = Continuation::with_settings(settings);
        loop {
            let chunk = match source.next_chunk() {
                Err(e) => {
                    co.yield_(Err(ReadError::IO(e))).await;
                    return;
                }
                Ok(None) => {
                    match cont.finish() {
                        Ok(Some(node)) => co.yield_(Ok(node)).await,
                        Ok(None) => {}
                        Err(e) => co.yield_(Err(e.into())).await,
                    }
                    return;
                }
                Ok(Some(chunk)) => chunk,
            };
            let mut rest = chunk;
            while ! rest.is_empty() {
                match cont.feed(rest) {
                    Ok(Status::Suspended) => break,
                    Ok(Status::Complete { consumed }) => {
                        rest = &rest[consumed..];
                        if let Some(node) = cont.take_expression() {
                            co.yield_(Ok(node)).await;
                        }
                    }
                    Err(e) => {
                        co.yield_(Err(e.into())).await;
                        return;
                    }
                }
            }
            // they have been logged
            cont.take_warnings();
        }
    }).into_iter()
}

pub fn read_exprs<'s>(
    fh: impl Read + 's,
) -> impl Iterator<Item = Result<Node, ReadError>> + 's
{
    read_exprs_from(ChunkReader::new(fh), DEFAULT_SETTINGS)
}

/// The expressions in `input`, parsed without copying it.
pub fn exprs<'s>(
    input: &'s [u8],
) -> impl Iterator<Item = Result<Node, ReadError>> + 's
{
    read_exprs_from(InMemory::new(input), DEFAULT_SETTINGS)
}

pub fn read_all(
    fh: impl Read,
) -> Result<Vec<Node>, ReadError>
{
    read_exprs(fh).collect()
}

pub fn read_file(path: &Path) -> anyhow::Result<Vec<Node>> {
    let fh = File::open(path)
        .with_context(|| format!("opening {:?}", path))?;
    let v = read_all(fh)
        .with_context(|| format!("reading {:?}", path))?;
    Ok(v)
}

pub fn write_all<'t>(
    out: impl Write,
    vals: impl IntoIterator<Item = &'t Node>
) -> Result<(), std::io::Error> {
    let mut out = out; // for `File`
    for v in vals.into_iter() {
        writeln!(out, "{}", v)?;
    }
    Ok(())
}

pub fn write_file<'t>(path: &Path, vals: impl IntoIterator<Item = &'t Node>)
                      -> Result<(), std::io::Error> {
    write_all(File::create(path)?, vals)
}
