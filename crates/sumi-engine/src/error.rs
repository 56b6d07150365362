//! Error types for the engine layer.

use sumi_doc::{DocError, Path};
use thiserror::Error;

/// Errors surfaced by normalization and the mutation pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A document operation failed while the engine was applying it.
    #[error(transparent)]
    Doc(#[from] DocError),

    /// A block reports nonzero text but the authorship tally resolved no
    /// dominant author. Indicates leaves lost their author attribution.
    #[error("block at {path} has text but no attributable author")]
    InconsistentAuthorship { path: Path },

    /// Normalization failed to reach a fixed point within the repair limit.
    /// A correct repair set always terminates, so this is a latent bug
    /// surfaced as an error instead of a hang.
    #[error("normalization applied {passes} repairs without converging")]
    RepairLimitExceeded { passes: usize },

    /// A local edit arrived before the replication substrate reported the
    /// document as synced.
    #[error("document is not connected for interactive editing")]
    NotConnected,
}
