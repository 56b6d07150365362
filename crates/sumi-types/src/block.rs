//! Block and mark vocabulary.
//!
//! `BlockType` is the closed set of element types a document tree may
//! contain. Every engine operation matches on it exhaustively — autoformat
//! mapping, invariant checks, rendering — so adding a block type is a
//! compile-time-checked change rather than a stringly-typed one.
//!
//! `Mark` is the inline formatting attribute set carried by text leaves.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// What a block element *is*.
///
/// String forms match the wire vocabulary (`"heading-one"`, `"list-item"`,
/// ...), which is also what the autoformat shortcut table maps into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum BlockType {
    /// Plain paragraph — the default block, and what non-paragraph blocks
    /// revert to on backspace-at-start.
    #[default]
    #[serde(rename = "paragraph")]
    #[strum(serialize = "paragraph")]
    Paragraph,
    #[serde(rename = "heading-one")]
    #[strum(serialize = "heading-one")]
    HeadingOne,
    #[serde(rename = "heading-two")]
    #[strum(serialize = "heading-two")]
    HeadingTwo,
    #[serde(rename = "heading-three")]
    #[strum(serialize = "heading-three")]
    HeadingThree,
    #[serde(rename = "heading-four")]
    #[strum(serialize = "heading-four")]
    HeadingFour,
    #[serde(rename = "heading-five")]
    #[strum(serialize = "heading-five")]
    HeadingFive,
    #[serde(rename = "heading-six")]
    #[strum(serialize = "heading-six")]
    HeadingSix,
    /// A single list row. Always lives inside a `BulletedList` container —
    /// an unwrapped `ListItem` is a structural violation the normalizer
    /// repairs.
    #[serde(rename = "list-item")]
    #[strum(serialize = "list-item")]
    ListItem,
    /// Container wrapping one or more `ListItem` children.
    #[serde(rename = "bulleted-list")]
    #[strum(serialize = "bulleted-list")]
    BulletedList,
    #[serde(rename = "block-quote")]
    #[strum(serialize = "block-quote")]
    BlockQuote,
}

impl BlockType {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::HeadingOne => "heading-one",
            BlockType::HeadingTwo => "heading-two",
            BlockType::HeadingThree => "heading-three",
            BlockType::HeadingFour => "heading-four",
            BlockType::HeadingFive => "heading-five",
            BlockType::HeadingSix => "heading-six",
            BlockType::ListItem => "list-item",
            BlockType::BulletedList => "bulleted-list",
            BlockType::BlockQuote => "block-quote",
        }
    }

    /// Heading block for a 1-based level, if in range.
    pub fn heading(level: u8) -> Option<Self> {
        match level {
            1 => Some(BlockType::HeadingOne),
            2 => Some(BlockType::HeadingTwo),
            3 => Some(BlockType::HeadingThree),
            4 => Some(BlockType::HeadingFour),
            5 => Some(BlockType::HeadingFive),
            6 => Some(BlockType::HeadingSix),
            _ => None,
        }
    }

    /// Check if this is any heading level.
    pub fn is_heading(&self) -> bool {
        matches!(
            self,
            BlockType::HeadingOne
                | BlockType::HeadingTwo
                | BlockType::HeadingThree
                | BlockType::HeadingFour
                | BlockType::HeadingFive
                | BlockType::HeadingSix
        )
    }

    /// Check if this is a container that wraps list items.
    pub fn is_list_container(&self) -> bool {
        matches!(self, BlockType::BulletedList)
    }

    /// Check if this is a list row.
    pub fn is_list_item(&self) -> bool {
        matches!(self, BlockType::ListItem)
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inline formatting attribute on a text leaf.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Code,
}

impl Mark {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mark::Bold => "bold",
            Mark::Italic => "italic",
            Mark::Underline => "underline",
            Mark::Code => "code",
        }
    }
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
