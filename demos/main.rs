// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use contsexp::number::classify;
use contsexp::parse::{Continuation, Status};
use contsexp::read::{ChunkReader, ChunkSource};
use contsexp::settings::{Settings, DEFAULT_SETTINGS};
use contsexp::value::Node;
use clap::Parser as ClapParser;
use std::path::PathBuf;
use anyhow::{Result, bail};


fn indentstr(i: usize) -> Option<&'static str> {
    "                                                                  ".get(0..i)
}

// Print the tree one node per line, indented by depth.
fn dump(node: &Node, indent: usize, classified: bool) -> Result<()> {
    let Some(ind) = indentstr(indent) else {
        bail!("lists nested too deeply to show")
    };
    match node.children() {
        Some(children) => {
            println!("{ind}(");
            for c in children {
                dump(c, indent + 1, classified)?;
            }
            println!("{ind})");
        }
        None => {
            if classified {
                println!("{ind}{node}  ; {}", classify(node));
            } else {
                println!("{ind}{node}");
            }
        }
    }
    Ok(())
}

#[derive(clap::Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Feed the parser chunks of this many bytes
    #[clap(short = 's', long, value_parser, default_value_t = 4096)]
    chunk_size: usize,
    /// Show each expression as an indented tree
    #[clap(short, long, value_parser)]
    tree: bool,
    /// Show what each atom looks like (number or text), with --tree
    #[clap(short, long, value_parser)]
    classify: bool,
    /// Maximum list nesting depth (0: unlimited)
    #[clap(long, value_parser)]
    max_depth: Option<usize>,
    /// Path to the input file
    #[clap(value_parser, required(true))]
    input_path: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let settings = Settings {
        max_depth: match args.max_depth {
            Some(0) => None,
            Some(n) => Some(n),
            None => DEFAULT_SETTINGS.max_depth,
        },
        ..DEFAULT_SETTINGS
    };

    // Drive the continuation by hand to show how many times parsing
    // was suspended at a chunk boundary.
    let fh = std::fs::File::open(&args.input_path)?;
    let mut chunks = ChunkReader::with_chunk_size(fh, args.chunk_size);
    let mut cont = Continuation::with_settings(settings);
    let mut count_toplevel = 0;
    let mut count_suspended = 0;
    let mut show = |node: Node| -> Result<()> {
        count_toplevel += 1;
        if args.tree {
            dump(&node, 0, args.classify)
        } else {
            println!("{node}");
            Ok(())
        }
    };
    while let Some(chunk) = chunks.next_chunk()? {
        let mut rest = chunk;
        while ! rest.is_empty() {
            match cont.feed(rest) {
                Ok(Status::Complete { consumed }) => {
                    rest = &rest[consumed..];
                    if let Some(node) = cont.take_expression() {
                        show(node)?;
                    }
                }
                Ok(Status::Suspended) => {
                    if ! cont.is_idle() {
                        count_suspended += 1;
                    }
                    break;
                }
                Err(e) => bail!("{} in {:?}", e, args.input_path),
            }
        }
    }
    match cont.finish() {
        Ok(Some(node)) => show(node)?,
        Ok(None) => {}
        Err(e) => bail!("{} in {:?}", e, args.input_path),
    }
    for w in cont.take_warnings() {
        eprintln!("{} in {:?}", w, args.input_path);
    }
    println!(";; count_toplevel = {count_toplevel}, count_suspended = {count_suspended}");
    Ok(())
}
