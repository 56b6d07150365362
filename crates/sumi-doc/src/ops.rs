//! Atomic document operations.
//!
//! Every mutation — a local keystroke, an autoformat rewrite, a remote
//! replicated edit, a normalization repair — is expressed as a sequence of
//! these operations and applied through `Document::apply`. One code path for
//! every origin means the normalizer always observes a uniform operation
//! stream.
//!
//! Operations are serializable (JSON and postcard) because the replication
//! substrate transports them verbatim.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sumi_types::{ActorId, BlockType, Mark};

use crate::{Node, Path, Point};

/// An atomic operation on the document tree.
///
/// `Unwrap` carries the container's child count and `MergeNode` the merge
/// position so that [`Op::transform_path`] stays a pure function of the
/// operation, without consulting document state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Op {
    /// Insert a node at a path (siblings at and after the index shift right).
    InsertNode { at: Path, node: Node },

    /// Remove the node at a path, including its whole subtree.
    RemoveNode { at: Path },

    /// Change an element's block type.
    SetBlockType { at: Path, block_type: BlockType },

    /// Update an element's cached dominant-author label.
    SetDominantAuthor {
        at: Path,
        author: Option<ActorId>,
    },

    /// Insert text into a leaf. If author or marks differ from the target
    /// leaf, the leaf is split and a new leaf carries the inserted run.
    InsertText {
        at: Point,
        text: String,
        #[serde(default)]
        marks: BTreeSet<Mark>,
        #[serde(default)]
        author: Option<ActorId>,
    },

    /// Remove `len` characters from a leaf starting at a point.
    RemoveText { at: Point, len: usize },

    /// Insert a fresh empty paragraph immediately after the top-level block
    /// enclosing `at`. Line breaks always split at the top level.
    SplitBlock { at: Path },

    /// Replace the node at `at` with a new container element holding it as
    /// the sole child.
    Wrap { at: Path, block_type: BlockType },

    /// Replace the container element at `at` with its children, spliced into
    /// the parent at the container's position. `arity` is the child count.
    Unwrap { at: Path, arity: usize },

    /// Merge the node at `at` into its previous sibling. `position` is the
    /// previous sibling's child count (elements) or character length
    /// (leaves) before the merge.
    MergeNode { at: Path, position: usize },
}

impl Op {
    /// The path this operation targets.
    pub fn target_path(&self) -> &Path {
        match self {
            Op::InsertNode { at, .. }
            | Op::RemoveNode { at }
            | Op::SetBlockType { at, .. }
            | Op::SetDominantAuthor { at, .. }
            | Op::SplitBlock { at }
            | Op::Wrap { at, .. }
            | Op::Unwrap { at, .. }
            | Op::MergeNode { at, .. } => at,
            Op::InsertText { at, .. } | Op::RemoveText { at, .. } => &at.path,
        }
    }

    /// Check if this operation changes tree shape (as opposed to text or
    /// properties).
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Op::InsertNode { .. }
                | Op::RemoveNode { .. }
                | Op::SplitBlock { .. }
                | Op::Wrap { .. }
                | Op::Unwrap { .. }
                | Op::MergeNode { .. }
        )
    }

    /// Check if this operation edits leaf text.
    pub fn is_text_edit(&self) -> bool {
        matches!(self, Op::InsertText { .. } | Op::RemoveText { .. })
    }

    /// Where the node addressed by `path` lives after this operation applies.
    ///
    /// Returns None when the node is destroyed by the operation (removed, or
    /// inside a removed subtree, or it was an unwrapped container).
    pub fn transform_path(&self, path: &Path) -> Option<Path> {
        match self {
            Op::SetBlockType { .. }
            | Op::SetDominantAuthor { .. }
            | Op::InsertText { .. }
            | Op::RemoveText { .. } => Some(path.clone()),

            Op::InsertNode { at, .. } => Some(shift_for_insert(at, path)),

            Op::SplitBlock { at } => {
                let insert_at = Path::from(vec![at.top_level()? + 1]);
                Some(shift_for_insert(&insert_at, path))
            }

            Op::RemoveNode { at } => {
                if at.is_or_contains(path) {
                    None
                } else {
                    Some(shift_for_remove(at, path))
                }
            }

            Op::Wrap { at, .. } => {
                if at.is_or_contains(path) {
                    // The node slides one level down, under the new container.
                    let mut v = at.indices().to_vec();
                    v.push(0);
                    v.extend(&path.indices()[at.depth()..]);
                    Some(v.into())
                } else {
                    Some(path.clone())
                }
            }

            Op::Unwrap { at, arity } => {
                if path == at {
                    return None;
                }
                let d = at.depth();
                if at.is_ancestor_of(path) {
                    // Children splice into the parent at the container's slot.
                    let mut v = at.indices()[..d - 1].to_vec();
                    v.push(at.last()? + path.indices()[d]);
                    v.extend(&path.indices()[d + 1..]);
                    return Some(v.into());
                }
                if path.depth() >= d
                    && path.indices()[..d - 1] == at.indices()[..d - 1]
                    && path.indices()[d - 1] > at.indices()[d - 1]
                {
                    let mut v = path.indices().to_vec();
                    v[d - 1] += arity - 1;
                    return Some(v.into());
                }
                Some(path.clone())
            }

            Op::MergeNode { at, position } => {
                if path == at {
                    return at.previous_sibling();
                }
                if at.is_ancestor_of(path) {
                    let prev = at.previous_sibling()?;
                    let d = at.depth();
                    let mut v = prev.indices().to_vec();
                    v.push(position + path.indices()[d]);
                    v.extend(&path.indices()[d + 1..]);
                    return Some(v.into());
                }
                Some(shift_for_remove(at, path))
            }
        }
    }
}

/// Shift `q` for a node inserted at `at`: same-parent siblings at or after
/// the insertion index move right.
fn shift_for_insert(at: &Path, q: &Path) -> Path {
    let d = at.depth();
    if d == 0 {
        return q.clone();
    }
    if q.depth() >= d
        && q.indices()[..d - 1] == at.indices()[..d - 1]
        && q.indices()[d - 1] >= at.indices()[d - 1]
    {
        let mut v = q.indices().to_vec();
        v[d - 1] += 1;
        return v.into();
    }
    q.clone()
}

/// Shift `q` for a node removed at `at`: same-parent siblings after the
/// removal index move left. The removed subtree itself is the caller's
/// concern.
fn shift_for_remove(at: &Path, q: &Path) -> Path {
    let d = at.depth();
    if d == 0 {
        return q.clone();
    }
    if q.depth() >= d
        && q.indices()[..d - 1] == at.indices()[..d - 1]
        && q.indices()[d - 1] > at.indices()[d - 1]
    {
        let mut v = q.indices().to_vec();
        v[d - 1] -= 1;
        return v.into();
    }
    q.clone()
}

// ============================================================================
// Tests
// ============================================================================
