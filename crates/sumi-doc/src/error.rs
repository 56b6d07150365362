//! Error types for document operations.

use thiserror::Error;

use crate::Path;

/// Errors that can occur while querying or mutating the document tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocError {
    /// No node exists at the given path.
    #[error("path not found: {0}")]
    PathNotFound(Path),

    /// A text offset fell outside the leaf it addresses.
    #[error("offset {pos} out of bounds for leaf with length {len}")]
    OffsetOutOfBounds { pos: usize, len: usize },

    /// The node at the path is a text leaf, but an element was required.
    #[error("node at {0} is not an element")]
    NotAnElement(Path),

    /// The node at the path is an element, but a text leaf was required.
    #[error("node at {0} is not a text leaf")]
    NotALeaf(Path),

    /// The operation targets the document root, which is not a removable,
    /// wrappable, or retypable node.
    #[error("operation targets the document root")]
    RootTarget,

    /// Unwrap requires an element target.
    #[error("cannot unwrap non-element node at {0}")]
    InvalidUnwrap(Path),

    /// Merge requires a previous sibling of the same shape (element into
    /// element, or leaf into a leaf with identical author and marks).
    #[error("cannot merge node at {0}")]
    InvalidMerge(Path),
}
