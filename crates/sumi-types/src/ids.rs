//! Typed identifiers for actors and documents.
//!
//! Both ID types wrap UUIDv7 (time-ordered, globally unique). They're opaque
//! on the wire (16 bytes) and display as standard UUID text for logging. The
//! `short()` form (first 8 hex chars) is for human-facing UI — never used as
//! a lookup key.
//!
//! `ActorId` is totally ordered. That ordering is load-bearing: authorship
//! arbitration breaks dominant-author ties by lowest `ActorId`, so every
//! replica resolves the same winner. `ActorId` also has a deterministic
//! sentinel via `ActorId::system()` for engine-generated content.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An editing participant's stable identity (UUIDv7, or UUIDv5 for sentinels).
///
/// Attached to every text leaf a participant inserts.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(uuid::Uuid);

/// A document identifier (UUIDv7).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(uuid::Uuid);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Create a new time-ordered ID (UUIDv7).
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// First 8 hex characters — for human display only, not lookup.
            pub fn short(&self) -> String {
                self.0.as_simple().to_string()[..8].to_string()
            }

            /// Full 32-character hex string (no hyphens).
            pub fn to_hex(&self) -> String {
                self.0.as_simple().to_string()
            }

            /// The raw 16 bytes.
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }

            /// Reconstruct from 16 bytes.
            pub fn from_bytes(b: [u8; 16]) -> Self {
                Self(uuid::Uuid::from_bytes(b))
            }

            /// Parse from a hex string (32 chars, no hyphens) or standard UUID format.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                uuid::Uuid::parse_str(s).map(Self)
            }

            /// Prefer a label for display; fall back to short hex.
            pub fn display_or(&self, label: Option<&str>) -> String {
                match label {
                    Some(l) if !l.is_empty() => l.to_string(),
                    _ => self.short(),
                }
            }

            /// A nil / zero ID — for sentinel values only.
            pub fn nil() -> Self {
                Self(uuid::Uuid::nil())
            }

            /// Check if this is the nil ID.
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $T {
            fn from(u: uuid::Uuid) -> Self {
                Self(u)
            }
        }

        impl From<$T> for uuid::Uuid {
            fn from(id: $T) -> uuid::Uuid {
                id.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                // Full UUID with hyphens for log readability
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_typed_id!(ActorId, "ActorId");
impl_typed_id!(DocId, "DocId");

// ── ActorId sentinels ───────────────────────────────────────────────────────

/// Fixed namespace for deriving deterministic ActorIds via UUIDv5.
const SUMI_ACTOR_NS: uuid::Uuid = uuid::uuid!("3f8c1b44-9a72-4d05-bf1e-62d90ac4e711");

impl ActorId {
    /// The well-known "system" actor.
    ///
    /// Used for engine-generated content (structural repairs, seeded blocks).
    /// Deterministic: same value every time (UUIDv5 derived from `b"system"`).
    pub fn system() -> Self {
        Self(uuid::Uuid::new_v5(&SUMI_ACTOR_NS, b"system"))
    }
}

// ============================================================================
// Tests
// ============================================================================
