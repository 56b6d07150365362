//! The document tree and operation application.
//!
//! A `Document` is a root element whose children are the top-level blocks.
//! All mutation goes through [`Document::apply`], so local keystrokes,
//! autoformat rewrites, normalization repairs, and replicated remote edits
//! share one code path.

use crate::{DocError, Element, Node, Op, Path, Point, TextLeaf};
use serde::{Deserialize, Serialize};
use sumi_types::ActorId;

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocError>;

/// The in-memory document: an implicit root whose children are the top-level
/// blocks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Top-level blocks, in document order.
    pub children: Vec<Node>,
}

impl Document {
    /// An empty document. Note this violates the at-least-one-block
    /// invariant until normalization runs.
    pub fn new() -> Self {
        Document::default()
    }

    /// A document seeded with the default empty paragraph.
    pub fn with_default_paragraph() -> Self {
        Document {
            children: vec![Node::Element(Element::empty_paragraph())],
        }
    }

    /// Build from explicit top-level blocks.
    pub fn from_blocks(children: Vec<Node>) -> Self {
        Document { children }
    }

    // ── Structural queries ──────────────────────────────────────────────

    /// Number of top-level blocks.
    pub fn block_count(&self) -> usize {
        self.children.len()
    }

    /// The node at a path. The root itself is not a node.
    pub fn node_at(&self, path: &Path) -> Result<&Node> {
        let mut nodes = &self.children;
        let mut found: Option<&Node> = None;
        for (depth, &idx) in path.indices().iter().enumerate() {
            let n = nodes
                .get(idx)
                .ok_or_else(|| DocError::PathNotFound(path.clone()))?;
            if depth + 1 < path.depth() {
                nodes = &n
                    .as_element()
                    .ok_or_else(|| DocError::PathNotFound(path.clone()))?
                    .children;
            }
            found = Some(n);
        }
        found.ok_or(DocError::RootTarget)
    }

    /// Mutable access to the node at a path.
    pub fn node_at_mut(&mut self, path: &Path) -> Result<&mut Node> {
        if path.is_root() {
            return Err(DocError::RootTarget);
        }
        let mut nodes = &mut self.children;
        let indices = path.indices();
        for (depth, &idx) in indices.iter().enumerate() {
            if depth + 1 == indices.len() {
                return nodes
                    .get_mut(idx)
                    .ok_or_else(|| DocError::PathNotFound(path.clone()));
            }
            let n = nodes
                .get_mut(idx)
                .ok_or_else(|| DocError::PathNotFound(path.clone()))?;
            nodes = &mut n
                .as_element_mut()
                .ok_or_else(|| DocError::PathNotFound(path.clone()))?
                .children;
        }
        Err(DocError::PathNotFound(path.clone()))
    }

    /// The element at a path.
    pub fn element_at(&self, path: &Path) -> Result<&Element> {
        self.node_at(path)?
            .as_element()
            .ok_or_else(|| DocError::NotAnElement(path.clone()))
    }

    /// Mutable element access.
    pub fn element_at_mut(&mut self, path: &Path) -> Result<&mut Element> {
        self.node_at_mut(path)?
            .as_element_mut()
            .ok_or_else(|| DocError::NotAnElement(path.clone()))
    }

    /// The text leaf at a path.
    pub fn leaf_at(&self, path: &Path) -> Result<&TextLeaf> {
        self.node_at(path)?
            .as_leaf()
            .ok_or_else(|| DocError::NotALeaf(path.clone()))
    }

    /// Mutable leaf access.
    pub fn leaf_at_mut(&mut self, path: &Path) -> Result<&mut TextLeaf> {
        self.node_at_mut(path)?
            .as_leaf_mut()
            .ok_or_else(|| DocError::NotALeaf(path.clone()))
    }

    /// Children of the container at `path` (the root's children for the
    /// empty path).
    pub fn children_at(&self, path: &Path) -> Result<&Vec<Node>> {
        if path.is_root() {
            Ok(&self.children)
        } else {
            Ok(&self.element_at(path)?.children)
        }
    }

    /// Mutable container children.
    pub fn children_at_mut(&mut self, path: &Path) -> Result<&mut Vec<Node>> {
        if path.is_root() {
            Ok(&mut self.children)
        } else {
            Ok(&mut self.element_at_mut(path)?.children)
        }
    }

    /// Concatenated descendant leaf text of the node at `path`.
    pub fn text_of(&self, path: &Path) -> Result<String> {
        Ok(match self.node_at(path)? {
            Node::Text(t) => t.text.clone(),
            Node::Element(e) => e.text(),
        })
    }

    /// All leaves under `container` in document order, with their paths.
    pub fn leaves_of(&self, container: &Path) -> Result<Vec<(Path, &TextLeaf)>> {
        let mut out = Vec::new();
        collect_leaves(self.children_at(container)?, container, &mut out);
        Ok(out)
    }

    /// Text from the start of `block` up to `point` (exclusive of the rest
    /// of the point's leaf).
    pub fn text_before(&self, block: &Path, point: &Point) -> Result<String> {
        let mut out = String::new();
        for (path, leaf) in self.leaves_of(block)? {
            if path == point.path {
                if point.offset > leaf.char_len() {
                    return Err(DocError::OffsetOutOfBounds {
                        pos: point.offset,
                        len: leaf.char_len(),
                    });
                }
                out.extend(leaf.text.chars().take(point.offset));
                return Ok(out);
            }
            out.push_str(&leaf.text);
        }
        Err(DocError::PathNotFound(point.path.clone()))
    }

    /// The dominant-author label of a top-level block, for display.
    pub fn block_author(&self, index: usize) -> Option<ActorId> {
        self.children
            .get(index)
            .and_then(Node::as_element)
            .and_then(|e| e.dominant_author)
    }

    // ── Mutation ────────────────────────────────────────────────────────

    /// Apply one atomic operation.
    pub fn apply(&mut self, op: &Op) -> Result<()> {
        match op {
            Op::InsertNode { at, node } => {
                let parent = at.parent().ok_or(DocError::RootTarget)?;
                let idx = at.last().ok_or(DocError::RootTarget)?;
                let children = self.children_at_mut(&parent)?;
                if idx > children.len() {
                    return Err(DocError::PathNotFound(at.clone()));
                }
                children.insert(idx, node.clone());
            }

            Op::RemoveNode { at } => {
                let parent = at.parent().ok_or(DocError::RootTarget)?;
                let idx = at.last().ok_or(DocError::RootTarget)?;
                let children = self.children_at_mut(&parent)?;
                if idx >= children.len() {
                    return Err(DocError::PathNotFound(at.clone()));
                }
                children.remove(idx);
            }

            Op::SetBlockType { at, block_type } => {
                self.element_at_mut(at)?.block_type = *block_type;
            }

            Op::SetDominantAuthor { at, author } => {
                self.element_at_mut(at)?.dominant_author = *author;
            }

            Op::InsertText {
                at,
                text,
                marks,
                author,
            } => {
                self.insert_text(at, text, marks, *author)?;
            }

            Op::RemoveText { at, len } => {
                let leaf = self.leaf_at_mut(&at.path)?;
                let char_len = leaf.char_len();
                if at.offset + len > char_len {
                    return Err(DocError::OffsetOutOfBounds {
                        pos: at.offset + len,
                        len: char_len,
                    });
                }
                let start = byte_for_char(&leaf.text, at.offset);
                let end = byte_for_char(&leaf.text, at.offset + len);
                leaf.text.replace_range(start..end, "");
            }

            Op::SplitBlock { at } => {
                let top = at.top_level().ok_or(DocError::RootTarget)?;
                if top >= self.children.len() {
                    return Err(DocError::PathNotFound(at.clone()));
                }
                self.children
                    .insert(top + 1, Node::Element(Element::empty_paragraph()));
            }

            Op::Wrap { at, block_type } => {
                let parent = at.parent().ok_or(DocError::RootTarget)?;
                let idx = at.last().ok_or(DocError::RootTarget)?;
                let children = self.children_at_mut(&parent)?;
                if idx >= children.len() {
                    return Err(DocError::PathNotFound(at.clone()));
                }
                let inner = children.remove(idx);
                children.insert(idx, Node::Element(Element::new(*block_type, vec![inner])));
            }

            Op::Unwrap { at, arity } => {
                if !self.node_at(at)?.is_element() {
                    return Err(DocError::InvalidUnwrap(at.clone()));
                }
                let parent = at.parent().ok_or(DocError::RootTarget)?;
                let idx = at.last().ok_or(DocError::RootTarget)?;
                let children = self.children_at_mut(&parent)?;
                let removed = children.remove(idx);
                if let Node::Element(e) = removed {
                    debug_assert_eq!(e.children.len(), *arity, "unwrap arity mismatch");
                    children.splice(idx..idx, e.children);
                }
            }

            Op::MergeNode { at, position: _ } => {
                let prev_path = at
                    .previous_sibling()
                    .ok_or_else(|| DocError::InvalidMerge(at.clone()))?;
                let mergeable = match (self.node_at(&prev_path)?, self.node_at(at)?) {
                    (Node::Element(_), Node::Element(_)) => true,
                    (Node::Text(a), Node::Text(b)) => a.mergeable_with(b),
                    _ => false,
                };
                if !mergeable {
                    return Err(DocError::InvalidMerge(at.clone()));
                }
                let parent = at.parent().ok_or(DocError::RootTarget)?;
                let idx = at.last().ok_or(DocError::RootTarget)?;
                let children = self.children_at_mut(&parent)?;
                let removed = children.remove(idx);
                match (&mut children[idx - 1], removed) {
                    (Node::Element(prev), Node::Element(e)) => {
                        prev.children.extend(e.children);
                    }
                    (Node::Text(prev), Node::Text(t)) => {
                        prev.text.push_str(&t.text);
                    }
                    // Ruled out by the mergeable check above.
                    _ => unreachable!(),
                }
            }
        }
        Ok(())
    }

    /// Apply a sequence of operations, stopping at the first failure.
    pub fn apply_all(&mut self, ops: &[Op]) -> Result<()> {
        for op in ops {
            self.apply(op)?;
        }
        Ok(())
    }

    fn insert_text(
        &mut self,
        at: &Point,
        text: &str,
        marks: &std::collections::BTreeSet<sumi_types::Mark>,
        author: Option<ActorId>,
    ) -> Result<()> {
        let leaf = self.leaf_at(&at.path)?;
        let char_len = leaf.char_len();
        if at.offset > char_len {
            return Err(DocError::OffsetOutOfBounds {
                pos: at.offset,
                len: char_len,
            });
        }

        if leaf.author == author && leaf.marks == *marks {
            // Same run attributes: splice in place.
            let leaf = self.leaf_at_mut(&at.path)?;
            let byte = byte_for_char(&leaf.text, at.offset);
            leaf.text.insert_str(byte, text);
            return Ok(());
        }

        // Different attributes: split the leaf and give the inserted run its
        // own leaf so authorship stays attributable per run.
        let original = leaf.clone();
        let byte = byte_for_char(&original.text, at.offset);
        let (left, right) = original.text.split_at(byte);

        let mut replacement = Vec::with_capacity(3);
        if !left.is_empty() {
            replacement.push(Node::Text(TextLeaf::with_marks(
                left,
                original.author,
                original.marks.clone(),
            )));
        }
        replacement.push(Node::Text(TextLeaf::with_marks(
            text,
            author,
            marks.clone(),
        )));
        if !right.is_empty() {
            replacement.push(Node::Text(TextLeaf::with_marks(
                right,
                original.author,
                original.marks,
            )));
        }

        let parent = at.path.parent().ok_or(DocError::RootTarget)?;
        let idx = at.path.last().ok_or(DocError::RootTarget)?;
        let children = self.children_at_mut(&parent)?;
        children.splice(idx..=idx, replacement);
        Ok(())
    }
}

fn collect_leaves<'a>(nodes: &'a [Node], base: &Path, out: &mut Vec<(Path, &'a TextLeaf)>) {
    for (i, node) in nodes.iter().enumerate() {
        let path = base.child(i);
        match node {
            Node::Text(t) => out.push((path, t)),
            Node::Element(e) => collect_leaves(&e.children, &path, out),
        }
    }
}

/// Byte index of a char offset. `ch` must be at most the char count.
fn byte_for_char(s: &str, ch: usize) -> usize {
    s.char_indices()
        .map(|(b, _)| b)
        .chain(std::iter::once(s.len()))
        .nth(ch)
        .unwrap_or(s.len())
}

// ============================================================================
// Tests
// ============================================================================
