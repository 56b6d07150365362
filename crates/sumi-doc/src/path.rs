//! Tree addressing: paths and points.
//!
//! A `Path` is the index trail from the document root to a node. The empty
//! path addresses the root itself; a single index addresses a top-level
//! block. A `Point` adds a character offset into the text leaf a path
//! addresses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index trail from the document root to a node.
///
/// Lexicographic ordering over the indices matches document order for
/// non-overlapping paths, which is what repair worklists rely on.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<usize>);

impl Path {
    /// The document root (empty path).
    pub fn root() -> Self {
        Path(Vec::new())
    }

    /// Build from explicit indices.
    pub fn new(indices: impl Into<Vec<usize>>) -> Self {
        Path(indices.into())
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of indices (0 for the root).
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The indices as a slice.
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// First index — the enclosing top-level block. None for the root.
    pub fn top_level(&self) -> Option<usize> {
        self.0.first().copied()
    }

    /// Last index — position among siblings. None for the root.
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// The parent path. None for the root.
    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            None
        } else {
            Some(Path(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Proper ancestors, nearest first, ending with the root.
    pub fn ancestors(&self) -> Vec<Path> {
        let mut out = Vec::with_capacity(self.depth());
        let mut current = self.clone();
        while let Some(p) = current.parent() {
            out.push(p.clone());
            current = p;
        }
        out
    }

    /// Extend with a child index.
    pub fn child(&self, index: usize) -> Path {
        let mut v = self.0.clone();
        v.push(index);
        Path(v)
    }

    /// The path of the sibling immediately after this node.
    pub fn next_sibling(&self) -> Option<Path> {
        let last = self.last()?;
        let mut v = self.0.clone();
        *v.last_mut()? = last + 1;
        Some(Path(v))
    }

    /// The path of the sibling immediately before this node, if any.
    pub fn previous_sibling(&self) -> Option<Path> {
        let last = self.last()?;
        if last == 0 {
            return None;
        }
        let mut v = self.0.clone();
        *v.last_mut()? = last - 1;
        Some(Path(v))
    }

    /// Whether this path is a proper ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.depth() < other.depth() && other.0[..self.depth()] == self.0[..]
    }

    /// Whether this path equals or is an ancestor of `other`.
    pub fn is_or_contains(&self, other: &Path) -> bool {
        self == other || self.is_ancestor_of(other)
    }

    /// Whether this path and `other` share a parent.
    pub fn is_sibling_of(&self, other: &Path) -> bool {
        !self.is_root() && self.parent() == other.parent()
    }
}

impl From<Vec<usize>> for Path {
    fn from(v: Vec<usize>) -> Self {
        Path(v)
    }
}

impl From<&[usize]> for Path {
    fn from(s: &[usize]) -> Self {
        Path(s.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Path {
    fn from(a: [usize; N]) -> Self {
        Path(a.to_vec())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, idx) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{idx}")?;
        }
        write!(f, "]")
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path{self}")
    }
}

/// A character position inside a text leaf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    /// Path of the text leaf.
    pub path: Path,
    /// Character offset into the leaf (chars, not bytes).
    pub offset: usize,
}

impl Point {
    pub fn new(path: impl Into<Path>, offset: usize) -> Self {
        Point {
            path: path.into(),
            offset,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
