//! Tree document model for Sumi.
//!
//! A document is a tree: top-level blocks under an implicit root, elements
//! containing child elements or text leaves, and text leaves carrying marks
//! and an authorship label. Every mutation is an [`Op`] applied through
//! [`Document::apply`], so local edits, autoformat rewrites, and
//! normalization repairs all travel the same path.
//!
//! # Paths and points
//!
//! Nodes are addressed by [`Path`], a sequence of child indices from the
//! root. A [`Point`] is a path to a text leaf plus a character offset into
//! it. Paths are transient: each structural op invalidates paths after its
//! target, and [`Op::transform_path`] maps a stale path across one op.
//!
//! # Authorship
//!
//! A leaf's `author` is who typed it; an element's `dominant_author` is a
//! derived label maintained by the normalization engine. [`dominant_of`]
//! picks the author with the greatest attributed text length, breaking ties
//! toward the lowest actor id so every replica agrees.

mod document;
mod error;
mod node;
mod ops;
mod path;

pub use document::Document;
pub use error::DocError;
pub use node::{Element, Node, TextLeaf, dominant_of};
pub use ops::Op;
pub use path::{Path, Point};

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocError>;
