use anyhow::Result;
use contsexp::parse::{parse, Continuation, ParseError, ParseErrorWithPos,
                      ParseWarning, State, Status};
use contsexp::settings::{Settings, DEFAULT_SETTINGS, UNLIMITED};
use contsexp::value::{basic, dquoted, list, raw, AtomKind, Node};
use quickcheck::{Arbitrary, Gen, QuickCheck};

// Feed the chunks in order and collect every expression, including
// one completed by the end of the stream.
fn feed_chunks(chunks: &[&[u8]]) -> Result<Vec<Node>, ParseErrorWithPos> {
    let mut cont = Continuation::new();
    let mut out = Vec::new();
    for chunk in chunks {
        let mut rest = *chunk;
        while ! rest.is_empty() {
            match cont.feed(rest)? {
                Status::Complete { consumed } => {
                    out.extend(cont.take_expression());
                    rest = &rest[consumed..];
                }
                Status::Suspended => break,
            }
        }
    }
    out.extend(cont.finish()?);
    Ok(out)
}

fn feed_strs(parts: &[&str]) -> Result<Vec<Node>, ParseErrorWithPos> {
    let chunks: Vec<&[u8]> = parts.iter().map(|s| s.as_bytes()).collect();
    feed_chunks(&chunks)
}

fn parse_one(input: &str) -> Result<Node> {
    let outcome = parse(input.as_bytes(), None)?;
    assert!(matches!(outcome.status, Status::Complete { .. }));
    Ok(outcome.expression.expect("expression"))
}

#[test]
fn flat_list() -> Result<()> {
    let v = parse_one("(a b c)")?;
    assert_eq!(v, list([basic("a"), basic("b"), basic("c")]));
    for c in v.children().unwrap() {
        assert_eq!(c.atom_kind(), Some(AtomKind::Basic));
    }
    Ok(())
}

#[test]
fn nested_list() -> Result<()> {
    assert_eq!(parse_one("(a (b c) d)")?,
               list([basic("a"), list([basic("b"), basic("c")]), basic("d")]));
    Ok(())
}

#[test]
fn split_across_two_calls() -> Result<()> {
    let first = parse(b"(a b", None)?;
    assert_eq!(first.status, Status::Suspended);
    assert!(first.expression.is_none());
    let cont = first.continuation;
    assert_eq!(cont.depth(), 1);
    assert_eq!(cont.state(), State::InAtom);
    assert_eq!(cont.cursor(), 1);
    assert!(cont.cursor() <= cont.atom_capacity());

    let second = parse(b" c)", Some(cont))?;
    assert_eq!(second.status, Status::Complete { consumed: 3 });
    assert_eq!(second.expression,
               Some(list([basic("a"), basic("b"), basic("c")])));
    assert!(second.continuation.is_idle());
    assert_eq!(second.continuation.pending_input_offset(), None);
    Ok(())
}

#[test]
fn double_quoted_string() -> Result<()> {
    let v = parse_one(r#"(say "hi there")"#)?;
    assert_eq!(v, list([basic("say"), dquoted("hi there")]));
    assert_eq!(v.children().unwrap()[1].atom_kind(),
               Some(AtomKind::DoubleQuoted));
    Ok(())
}

#[test]
fn single_quoted() -> Result<()> {
    assert_eq!(parse_one("(x 'y)")?, list([basic("x"), raw("y")]));
    // captured verbatim, not parsed
    assert_eq!(parse_one(r#"(x '(y (z "s") \ w))"#)?,
               list([basic("x"), raw(r#"(y (z "s") \ w)"#)]));
    // a quoted string is just a string
    assert_eq!(parse_one(r#"('"a b")"#)?, list([dquoted("a b")]));
    Ok(())
}

#[test]
fn extra_close_paren() -> Result<()> {
    let input = b"(a b))";
    let first = parse(input, None)?;
    assert_eq!(first.status, Status::Complete { consumed: 5 });
    assert_eq!(first.expression, Some(list([basic("a"), basic("b")])));
    assert_eq!(first.continuation.pending_input_offset(), Some(5));
    let err = parse(&input[5..], Some(first.continuation)).unwrap_err();
    assert_eq!(err.err, ParseError::UnmatchedCloseParen);
    assert_eq!(err.pos.col, 5);
    Ok(())
}

#[test]
fn expression_handed_out_once() -> Result<()> {
    let mut cont = Continuation::new();
    assert_eq!(cont.feed(b"(a) (b)")?, Status::Complete { consumed: 3 });
    assert!(cont.has_expression());
    // must be taken before feeding on
    let e = cont.feed(b" (b)").unwrap_err();
    assert_eq!(e.err, ParseError::UnclaimedExpression);
    assert!(cont.is_usable());
    assert_eq!(cont.take_expression(), Some(list([basic("a")])));
    assert_eq!(cont.take_expression(), None);
    assert_eq!(cont.feed(b" (b)")?, Status::Complete { consumed: 4 });
    assert_eq!(cont.take_expression(), Some(list([basic("b")])));
    assert_eq!(cont.take_expression(), None);
    Ok(())
}

#[test]
fn top_level_atoms() -> Result<()> {
    let mut cont = Continuation::new();
    // the atom ends at the space, which is left over
    assert_eq!(cont.feed(b"foo bar")?, Status::Complete { consumed: 3 });
    assert_eq!(cont.pending_input_offset(), Some(3));
    assert_eq!(cont.take_expression(), Some(basic("foo")));
    // "bar" could go on in the next chunk
    assert_eq!(cont.feed(b" bar")?, Status::Suspended);
    assert_eq!(cont.finish()?, Some(basic("bar")));
    assert_eq!(feed_strs(&["\"s\" 'q"])?, vec![dquoted("s"), raw("q")]);
    assert!(feed_strs(&[" \n\t "])?.is_empty());
    Ok(())
}

#[test]
fn escapes_straddle_chunks() -> Result<()> {
    assert_eq!(feed_strs(&["(a\\", "nb \"x\\", "\"y\")"])?,
               vec![list([basic("a\nb"), dquoted("x\"y")])]);
    assert_eq!(feed_strs(&["(q '(a", " \\)", " b))"])?,
               vec![list([basic("q"), raw("(a \\) b)")])]);
    Ok(())
}

#[test]
fn suspended_state_is_kept() -> Result<()> {
    let mut cont = Continuation::new();
    assert_eq!(cont.feed(b"((x \"ab\\")?, Status::Suspended);
    assert_eq!(cont.state(), State::InDQuote);
    assert_eq!(cont.depth(), 2);
    assert_eq!(cont.cursor(), 2);
    assert_eq!(cont.frames().innermost_open_pos().map(|p| p.col), Some(1));

    let mut cont = Continuation::new();
    assert_eq!(cont.feed(b"(a '((b)")?, Status::Suspended);
    assert_eq!(cont.state(), State::InRawCapture);
    assert_eq!(cont.quote_depth(), 1);
    assert_eq!(cont.feed(b")")?, Status::Suspended);
    assert_eq!(cont.state(), State::Start);
    assert_eq!(cont.feed(b")")?, Status::Complete { consumed: 1 });
    assert_eq!(cont.take_expression(),
               Some(list([basic("a"), raw("((b))")])));
    Ok(())
}

#[test]
fn quote_ends_an_atom() -> Result<()> {
    let expected = vec![list([basic("a"), raw("b"), basic("c")])];
    assert_eq!(feed_strs(&["(a'b c)"])?, expected);
    assert_eq!(feed_strs(&["(a", "'b c)"])?, expected);
    assert_eq!(feed_strs(&["(a'", "b c)"])?, expected);
    // a quote with nothing after it
    assert_eq!(feed_strs(&["(a' b)"])?,
               vec![list([basic("a"), raw(""), basic("b")])]);
    // escaped, it is part of the atom
    assert_eq!(feed_strs(&[r"(a\'b)"])?, vec![list([basic("a'b")])]);
    Ok(())
}

#[test]
fn escaped_spaces_read_back() -> Result<()> {
    let v = list([basic("a b"), raw("c d"), dquoted("e f")]);
    let text = v.to_string();
    assert_eq!(text, r#"(a\ b 'c\ d "e f")"#);
    let outcome = parse(text.as_bytes(), None)?;
    assert_eq!(outcome.expression, Some(v));
    assert!(outcome.warnings.is_empty());
    Ok(())
}

#[test]
fn checkpoint_and_restore() -> Result<()> {
    let mut cont = Continuation::new();
    cont.feed(b"(a (b")?;
    let checkpoint = cont.clone();
    cont.feed(b"))")?;
    assert_eq!(cont.take_expression(),
               Some(list([basic("a"), list([basic("b")])])));
    let mut other = checkpoint;
    other.feed(b"c) d)")?;
    assert_eq!(other.take_expression(),
               Some(list([basic("a"), list([basic("bc")]), basic("d")])));
    Ok(())
}

#[test]
fn invalid_escape_is_a_warning() -> Result<()> {
    let outcome = parse(br"(a\qb)", None)?;
    assert_eq!(outcome.expression, Some(list([basic("aqb")])));
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].warning,
               ParseWarning::InvalidEscapeSequence(b'q'));
    assert_eq!(outcome.warnings[0].pos.col, 3);
    Ok(())
}

#[test]
fn invalid_utf8_is_a_warning() -> Result<()> {
    let mut cont = Continuation::new();
    assert_eq!(cont.feed(b"(a\xFFb \"\xC3")?, Status::Suspended);
    assert_eq!(cont.feed(b"\")")?, Status::Complete { consumed: 2 });
    assert_eq!(cont.take_expression(),
               Some(list([basic("a\u{FFFD}b"), dquoted("\u{FFFD}")])));
    let warnings = cont.take_warnings();
    assert_eq!(warnings.iter().map(|w| (w.warning, w.pos.col))
               .collect::<Vec<_>>(),
               vec![(ParseWarning::InvalidUtf8, 1),
                    (ParseWarning::InvalidUtf8, 5)]);
    assert!(cont.is_usable());
    Ok(())
}

#[test]
fn fatal_error_makes_continuation_unusable() {
    let mut cont = Continuation::new();
    assert_eq!(cont.feed(b"(a))").unwrap(), Status::Complete { consumed: 3 });
    assert_eq!(cont.take_expression(), Some(list([basic("a")])));
    let e = cont.feed(b")").unwrap_err();
    assert_eq!(e.err, ParseError::UnmatchedCloseParen);
    assert!(! cont.is_usable());
    assert_eq!(cont.feed(b"(b)").unwrap_err().err, ParseError::Unusable);
    assert_eq!(cont.take_expression(), None);
}

#[test]
fn limits() {
    let settings = Settings { max_depth: Some(3), ..DEFAULT_SETTINGS };
    let mut cont = Continuation::with_settings(settings);
    let e = cont.feed(b"(((()))))").unwrap_err();
    assert_eq!(e.err, ParseError::NestingTooDeep(3));
    assert_eq!(e.pos.col, 3);

    let settings = Settings { max_atom_len: Some(4), ..DEFAULT_SETTINGS };
    let mut cont = Continuation::with_settings(settings);
    assert_eq!(cont.feed(b"(abcd ").unwrap(), Status::Suspended);
    let e = cont.feed(b"abcde)").unwrap_err();
    assert_eq!(e.err, ParseError::AtomTooLong(4));
    assert!(! cont.is_usable());
}

#[test]
fn end_of_stream_errors() {
    let finish = |input: &[u8]| {
        let mut cont = Continuation::new();
        assert_eq!(cont.feed(input).unwrap(), Status::Suspended);
        cont.finish()
    };
    let e = finish(b"(a \"bc").unwrap_err();
    assert_eq!((e.err, e.pos.col), (ParseError::UnexpectedEofInString, 3));
    let e = finish(b"(a '(bc").unwrap_err();
    assert_eq!((e.err, e.pos.col), (ParseError::UnexpectedEofInRawCapture, 3));
    let e = finish(b"(a (b) (c").unwrap_err();
    assert_eq!((e.err, e.pos.col), (ParseError::PrematureEof, 7));

    let mut cont = Continuation::new();
    cont.feed(b"ab\\").unwrap();
    assert_eq!(cont.finish().unwrap(), Some(basic("ab")));
    assert_eq!(cont.take_warnings()[0].warning, ParseWarning::DanglingEscape);
    assert_eq!(cont.finish().unwrap_err().err, ParseError::Unusable);
}

#[test]
fn every_split_point() -> Result<()> {
    let samples: &[&str] = &[
        "(a b c)",
        "(a (b c) d)",
        r#"(say "hi there")"#,
        "(x 'y)",
        r#"(i am the test '(expression) "with" 'weird atoms)"#,
        r#"("esc\"aped" a\(b "t\tab" '(r \) (s)))"#,
        "(a) b \"c\" '(d)",
    ];
    for s in samples {
        let b = s.as_bytes();
        let whole = feed_chunks(&[b])?;
        for i in 0..=b.len() {
            assert_eq!(feed_chunks(&[&b[..i], &b[i..]])?, whole,
                       "{:?} split at {}", s, i);
        }
        let bytes: Vec<&[u8]> = b.chunks(1).collect();
        assert_eq!(feed_chunks(&bytes)?, whole, "{:?} byte by byte", s);
    }
    Ok(())
}


#[derive(Clone, Debug)]
struct Tree(Node);

const BASIC_CHARS: &[u8] = b"abxyz019!-+*.";
const QUOTED_CHARS: &[u8] = b"ab (')\"\\\n\t";

fn gen_text(g: &mut Gen, alphabet: &[u8], min_len: usize) -> String {
    let len = min_len + usize::arbitrary(g) % 5;
    (0..len).map(|_| *g.choose(alphabet).unwrap() as char).collect()
}

fn gen_list(g: &mut Gen, depth: usize) -> Node {
    let n = usize::arbitrary(g) % 4;
    list((0..n).map(|_| gen_node(g, depth)).collect::<Vec<_>>())
}

fn gen_node(g: &mut Gen, depth: usize) -> Node {
    let choices = if depth == 0 { 4 } else { 6 };
    match u8::arbitrary(g) % choices {
        0 => basic(&gen_text(g, BASIC_CHARS, 1)),
        1 => dquoted(&gen_text(g, QUOTED_CHARS, 0)),
        2 => raw(&gen_text(g, b"abc19", 1)),
        3 => {
            let inner = list([basic(&gen_text(g, BASIC_CHARS, 1)),
                              list([basic(&gen_text(g, b"xyz", 1))])]);
            raw(&inner.to_string())
        }
        _ => gen_list(g, depth - 1),
    }
}

impl Arbitrary for Tree {
    fn arbitrary(g: &mut Gen) -> Self {
        Tree(gen_list(g, 3))
    }
}

fn split_by<'a>(mut bytes: &'a [u8], splits: &[usize]) -> Vec<&'a [u8]> {
    let mut out = Vec::new();
    for s in splits {
        if bytes.is_empty() {
            break
        }
        let n = 1 + s % bytes.len();
        out.push(&bytes[..n]);
        bytes = &bytes[n..];
    }
    if ! bytes.is_empty() {
        out.push(bytes);
    }
    out
}

/// Printing a tree and parsing the text back, whole or in arbitrary
/// pieces, gives the same tree.
#[test]
fn roundtrip_in_any_chunks_quickcheck() {
    fn prop(tree: Tree, splits: Vec<usize>) -> bool {
        let text = tree.0.to_string();
        let bytes = text.as_bytes();
        let whole = feed_chunks(&[bytes]).unwrap();
        let pieces = feed_chunks(&split_by(bytes, &splits)).unwrap();
        whole == vec![tree.0] && pieces == whole
    }
    QuickCheck::new()
        .tests(1000)
        .quickcheck(prop as fn(Tree, Vec<usize>) -> bool);
}

/// The parser fails with UnmatchedCloseParen exactly where a counter
/// of open parens would go negative, and nowhere else.
#[test]
fn close_paren_never_below_zero_quickcheck() {
    fn prop(parens: Vec<bool>) -> bool {
        let input: Vec<u8> =
            parens.iter().map(|&p| if p { b'(' } else { b')' }).collect();
        let mut depth: i64 = 0;
        let mut negative_at = None;
        for (i, b) in input.iter().enumerate() {
            depth += if *b == b'(' { 1 } else { -1 };
            if depth < 0 {
                negative_at = Some(i);
                break
            }
        }
        let mut cont = Continuation::with_settings(UNLIMITED);
        let mut rest = &input[..];
        while ! rest.is_empty() {
            match cont.feed(rest) {
                Ok(Status::Complete { consumed }) => {
                    cont.take_expression();
                    rest = &rest[consumed..];
                }
                Ok(Status::Suspended) => break,
                Err(e) => {
                    return e.err == ParseError::UnmatchedCloseParen
                        && negative_at == Some(e.pos.offset as usize)
                }
            }
        }
        negative_at.is_none()
    }
    QuickCheck::new()
        .tests(1000)
        .quickcheck(prop as fn(Vec<bool>) -> bool);
}

#[cfg(feature = "serde")]
#[test]
fn restored_raw_capture_without_depth() -> Result<()> {
    let mut cont = Continuation::new();
    cont.feed(b"(a '(b")?;
    let mut json = serde_json::to_value(&cont)?;
    json["quote_depth"] = 0.into();
    let mut restored: Continuation = serde_json::from_value(json)?;
    assert_eq!(restored.feed(b")")?, Status::Suspended);
    assert_eq!(restored.state(), State::Start);
    assert_eq!(restored.feed(b")")?, Status::Complete { consumed: 1 });
    assert_eq!(restored.take_expression(),
               Some(list([basic("a"), raw("(b)")])));
    Ok(())
}

#[cfg(feature = "serde")]
#[test]
fn continuation_survives_serialization() -> Result<()> {
    let mut cont = Continuation::new();
    cont.feed(b"(a \"b c")?;
    let json = serde_json::to_string(&cont)?;
    let mut restored: Continuation = serde_json::from_str(&json)?;
    restored.feed(b"\" d)")?;
    assert_eq!(restored.take_expression(),
               Some(list([basic("a"), dquoted("b c"), basic("d")])));
    Ok(())
}
