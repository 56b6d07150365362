//! Document tree nodes.
//!
//! A node is either a text leaf (content, marks, optional author) or an
//! element (block type, children, cached dominant-author label). The author
//! tally used by normalization's arbitration lives here because it is a pure
//! fold over tree content — the policy that acts on it lives in the engine.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sumi_types::{ActorId, BlockType, Mark};

/// A run of text with uniform marks and a single author.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextLeaf {
    /// The text content.
    pub text: String,
    /// Inline formatting applied to the whole run.
    #[serde(default)]
    pub marks: BTreeSet<Mark>,
    /// The actor who typed this run. None for engine-seeded leaves.
    #[serde(default)]
    pub author: Option<ActorId>,
}

impl TextLeaf {
    /// New unformatted leaf.
    pub fn new(text: impl Into<String>, author: Option<ActorId>) -> Self {
        TextLeaf {
            text: text.into(),
            marks: BTreeSet::new(),
            author,
        }
    }

    /// New leaf with marks.
    pub fn with_marks(
        text: impl Into<String>,
        author: Option<ActorId>,
        marks: BTreeSet<Mark>,
    ) -> Self {
        TextLeaf {
            text: text.into(),
            marks,
            author,
        }
    }

    /// Content length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether this leaf can merge with `other` (identical marks and author).
    pub fn mergeable_with(&self, other: &TextLeaf) -> bool {
        self.marks == other.marks && self.author == other.author
    }
}

/// A block element with ordered children.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// What this block is.
    pub block_type: BlockType,
    /// Ordered children (leaves and/or nested elements).
    pub children: Vec<Node>,
    /// Cached dominant-author label. Maintained by normalization on
    /// top-level blocks only; purely a presentation hint.
    #[serde(default)]
    pub dominant_author: Option<ActorId>,
}

impl Element {
    /// New element with children.
    pub fn new(block_type: BlockType, children: Vec<Node>) -> Self {
        Element {
            block_type,
            children,
            dominant_author: None,
        }
    }

    /// The default block: a paragraph holding one empty unauthored leaf.
    pub fn empty_paragraph() -> Self {
        Element::new(
            BlockType::Paragraph,
            vec![Node::Text(TextLeaf::new("", None))],
        )
    }

    /// Total descendant leaf text length in characters.
    pub fn text_len(&self) -> usize {
        self.children.iter().map(Node::text_len).sum()
    }

    /// Concatenated descendant leaf text, in document order.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }

    /// Per-actor total of descendant leaf text length.
    ///
    /// Unauthored or empty leaves contribute nothing. Nested elements fold
    /// their own tallies into the parent's.
    pub fn author_tally(&self) -> BTreeMap<ActorId, usize> {
        let mut tally = BTreeMap::new();
        for child in &self.children {
            child.tally_into(&mut tally);
        }
        tally
    }
}

/// A tree node: text leaf or element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Text(TextLeaf),
    Element(Element),
}

impl Node {
    /// Convenience leaf constructor.
    pub fn text(text: impl Into<String>, author: Option<ActorId>) -> Self {
        Node::Text(TextLeaf::new(text, author))
    }

    /// Convenience element constructor.
    pub fn element(block_type: BlockType, children: Vec<Node>) -> Self {
        Node::Element(Element::new(block_type, children))
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&TextLeaf> {
        match self {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut TextLeaf> {
        match self {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }
    }

    /// Total descendant leaf text length in characters.
    pub fn text_len(&self) -> usize {
        match self {
            Node::Text(t) => t.char_len(),
            Node::Element(e) => e.text_len(),
        }
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(t) => out.push_str(&t.text),
            Node::Element(e) => {
                for child in &e.children {
                    child.collect_text(out);
                }
            }
        }
    }

    fn tally_into(&self, tally: &mut BTreeMap<ActorId, usize>) {
        match self {
            Node::Text(t) => {
                let len = t.char_len();
                if len > 0
                    && let Some(author) = t.author
                {
                    *tally.entry(author).or_insert(0) += len;
                }
            }
            Node::Element(e) => {
                for child in &e.children {
                    child.tally_into(tally);
                }
            }
        }
    }

    /// The actor this subtree's text is attributable to, if any.
    ///
    /// A leaf is attributable to its author when it has nonzero text. An
    /// element is attributable to the dominant actor of its own tally.
    /// Subtrees contributing no authored text attribute to nobody — they are
    /// never treated as conflicting.
    pub fn attributable_author(&self) -> Option<ActorId> {
        match self {
            Node::Text(t) => {
                if t.text.is_empty() {
                    None
                } else {
                    t.author
                }
            }
            Node::Element(e) => dominant_of(&e.author_tally()),
        }
    }
}

/// The actor with the greatest tallied length. Ties break to the lowest
/// `ActorId` so every replica picks the same winner.
pub fn dominant_of(tally: &BTreeMap<ActorId, usize>) -> Option<ActorId> {
    let mut best: Option<(ActorId, usize)> = None;
    // BTreeMap iterates in ascending ActorId order; strict greater-than keeps
    // the lowest id on equal lengths.
    for (&actor, &len) in tally {
        if len > 0 && best.map_or(true, |(_, l)| len > l) {
            best = Some((actor, len));
        }
    }
    best.map(|(actor, _)| actor)
}

// ============================================================================
// Tests
// ============================================================================
