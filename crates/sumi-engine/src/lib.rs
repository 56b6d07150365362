//! Policy engines for sumi documents.
//!
//! Three engines sit above the tree model in `sumi-doc`:
//!
//! - **Normalization** ([`normalize`]): repairs structural invariants and
//!   arbitrates per-line authorship to a fixed point after every mutation.
//! - **Autoformat** ([`autoformat_insert`], [`autoformat_delete_backward`]):
//!   recognizes markdown shortcut prefixes on the live input stream and
//!   rewrites block types instead of committing the keystroke.
//! - **Decoration** ([`decorate`]): pure leaf-text → highlight-span
//!   tokenization for rendering, never persisted.
//!
//! [`DocumentContext`] is the mutation pipeline tying them together: it owns
//! the tree, serializes edits (autoformat → commit → normalize), gates local
//! input on replication connectivity, and exposes the outbound op log.

mod autoformat;
mod decorate;
mod error;
mod normalize;
mod pipeline;

pub use autoformat::{autoformat_delete_backward, autoformat_insert, break_ops, shortcut_for};
pub use decorate::{Span, SpanTag, decorate};
pub use error::EngineError;
pub use normalize::{NormalizeReport, normalize, verify};
pub use pipeline::DocumentContext;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
