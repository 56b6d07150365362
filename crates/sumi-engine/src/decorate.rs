//! Decoration: leaf text → highlight spans for rendering.
//!
//! Pure and stateless. Uses pulldown-cmark (the same parser as rustdoc) as
//! the lexical grammar: each non-trivial token becomes one span over the
//! leaf's text, with char offsets for the renderer. Spans never enter the
//! document tree or the replication stream.

use std::ops::Range;

use pulldown_cmark::{Event, Parser, Tag};
use serde::{Deserialize, Serialize};
use strum::EnumString;

/// What a decorated range is, for the renderer's style table.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum SpanTag {
    Heading,
    Blockquote,
    ListMarker,
    Emphasis,
    Strong,
    CodeSpan,
    Link,
}

impl SpanTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanTag::Heading => "heading",
            SpanTag::Blockquote => "blockquote",
            SpanTag::ListMarker => "list-marker",
            SpanTag::Emphasis => "emphasis",
            SpanTag::Strong => "strong",
            SpanTag::CodeSpan => "code-span",
            SpanTag::Link => "link",
        }
    }
}

impl std::fmt::Display for SpanTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One highlight range over a leaf's text. Offsets are char-based and
/// half-open.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub tag: SpanTag,
    pub start: usize,
    pub end: usize,
}

/// Tokenize leaf text into ordered, non-overlapping highlight spans.
///
/// Walks pulldown-cmark's offset iterator. Only non-trivial tokens produce
/// spans; plain text produces nothing. When constructs nest, the outermost
/// one wins, which is what keeps the output non-overlapping.
pub fn decorate(text: &str) -> Vec<Span> {
    let events: Vec<(Event, Range<usize>)> = Parser::new(text).into_offset_iter().collect();
    let mut spans = Vec::new();
    let mut covered = 0usize;

    for (i, (event, range)) in events.iter().enumerate() {
        if range.start < covered {
            continue;
        }
        let hit = match event {
            Event::Start(Tag::Heading { .. }) => Some((SpanTag::Heading, range.end)),
            Event::Start(Tag::BlockQuote(_)) => Some((SpanTag::Blockquote, range.end)),
            Event::Start(Tag::Emphasis) => Some((SpanTag::Emphasis, range.end)),
            Event::Start(Tag::Strong) => Some((SpanTag::Strong, range.end)),
            Event::Start(Tag::Link { .. }) => Some((SpanTag::Link, range.end)),
            Event::Code(_) => Some((SpanTag::CodeSpan, range.end)),
            // The item marker runs from the item start to its first content
            // token; the content itself stays decoratable.
            Event::Start(Tag::Item) => {
                let content_start = events
                    .get(i + 1)
                    .map(|(_, r)| r.start)
                    .unwrap_or(range.end);
                (content_start > range.start).then_some((SpanTag::ListMarker, content_start))
            }
            _ => None,
        };

        if let Some((tag, end)) = hit {
            spans.push(Span {
                tag,
                start: char_offset(text, range.start),
                end: char_offset(text, end),
            });
            covered = end;
        }
    }
    spans
}

/// Char offset of a byte position. `byte` always falls on a char boundary
/// because it comes from the parser.
fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

// ── Tests ────────────────────────────────────────────────────────────────
