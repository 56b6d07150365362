//! Shared identity and block vocabulary for sumi.
//!
//! This crate holds the plain-data types every other sumi crate speaks:
//! typed actor/document identifiers and the closed block/mark enums. It has
//! no tree logic and no engine logic — those live in `sumi-doc` and
//! `sumi-engine`.

mod block;
mod ids;

pub use block::{BlockType, Mark};
pub use ids::{ActorId, DocId};
