//! Autoformat: markdown shortcut recognition on the live input stream.
//!
//! Intercepts a text insertion before it commits. When the text from the
//! start of the enclosing block to the cursor, plus the newly typed text
//! minus its trailing space, exactly matches the shortcut table, the
//! insertion is replaced by ops that strip the prefix and retype the block.
//! Anything that does not match falls through to plain insertion.

use sumi_doc::{Document, Node, Op, Path, Point};
use sumi_types::BlockType;
use tracing::debug;

use crate::EngineError;

/// The shortcut grammar. Exact match only; partial prefixes are plain text.
pub fn shortcut_for(prefix: &str) -> Option<BlockType> {
    Some(match prefix {
        "*" | "-" | "+" => BlockType::ListItem,
        ">" => BlockType::BlockQuote,
        "#" => BlockType::HeadingOne,
        "##" => BlockType::HeadingTwo,
        "###" => BlockType::HeadingThree,
        "####" => BlockType::HeadingFour,
        "#####" => BlockType::HeadingFive,
        "######" => BlockType::HeadingSix,
        _ => return None,
    })
}

/// Check a pending text insertion against the shortcut table.
///
/// Returns the replacement ops on a match; `None` means the insertion should
/// commit as typed. Fires only when the typed text ends with a space, so a
/// shortcut completes on the space keystroke.
pub fn autoformat_insert(
    doc: &Document,
    at: &Point,
    text: &str,
) -> Result<Option<Vec<Op>>, EngineError> {
    let Some(typed) = text.strip_suffix(' ') else {
        return Ok(None);
    };

    let block = enclosing_block(at);
    let before = doc.text_before(&block, at)?;
    let candidate = format!("{before}{typed}");
    let Some(block_type) = shortcut_for(&candidate) else {
        return Ok(None);
    };
    debug!(block = %block, shortcut = %candidate, ?block_type, "autoformat shortcut");

    // Strip the matched prefix leaf by leaf. RemoveText never shifts paths,
    // so the removals can all address the pre-edit tree.
    let mut ops = Vec::new();
    for (leaf_path, leaf) in doc.leaves_of(&block)? {
        if leaf_path == at.path {
            if at.offset > 0 {
                ops.push(Op::RemoveText {
                    at: Point::new(leaf_path, 0),
                    len: at.offset,
                });
            }
            break;
        }
        if leaf.char_len() > 0 {
            ops.push(Op::RemoveText {
                at: Point::new(leaf_path, 0),
                len: leaf.char_len(),
            });
        }
    }

    ops.push(Op::SetBlockType {
        at: block.clone(),
        block_type,
    });
    if block_type == BlockType::ListItem {
        // Merging with a neighbouring list is normalization's job.
        ops.push(Op::Wrap {
            at: block,
            block_type: BlockType::BulletedList,
        });
    }
    Ok(Some(ops))
}

/// Check a pending backspace against the revert rule.
///
/// At the very start of a non-paragraph block, backspace reverts the block
/// type instead of deleting a character. A reverted list item additionally
/// leaves its `BulletedList`, splitting the list when the item is interior.
pub fn autoformat_delete_backward(
    doc: &Document,
    at: &Point,
) -> Result<Option<Vec<Op>>, EngineError> {
    let block = enclosing_block(at);
    let element = doc.element_at(&block)?;
    if element.block_type == BlockType::Paragraph {
        return Ok(None);
    }
    if !doc.text_before(&block, at)?.is_empty() {
        return Ok(None);
    }
    debug!(block = %block, from = ?element.block_type, "autoformat revert to paragraph");

    if element.block_type != BlockType::ListItem {
        return Ok(Some(vec![Op::SetBlockType {
            at: block,
            block_type: BlockType::Paragraph,
        }]));
    }

    // List items also leave their list container.
    let list_path = block.parent().unwrap_or_else(Path::root);
    let in_list = !list_path.is_root()
        && doc
            .element_at(&list_path)
            .map(|l| l.block_type == BlockType::BulletedList)
            .unwrap_or(false);
    if !in_list {
        // Unwrapped list item: normalization will re-wrap it, so just revert.
        return Ok(Some(vec![Op::SetBlockType {
            at: block,
            block_type: BlockType::Paragraph,
        }]));
    }

    let list = doc.element_at(&list_path)?;
    let item_index = block.last().unwrap_or(0);
    let item_count = list.children.len();

    let mut freed = element.clone();
    freed.block_type = BlockType::Paragraph;
    let freed = Node::Element(freed);

    let ops = if item_count == 1 {
        // Sole item: the list ceases to exist.
        vec![
            Op::SetBlockType {
                at: block,
                block_type: BlockType::Paragraph,
            },
            Op::Unwrap {
                at: list_path,
                arity: 1,
            },
        ]
    } else if item_index == 0 {
        // First item: paragraph lands before the surviving list.
        vec![
            Op::RemoveNode { at: block },
            Op::InsertNode {
                at: list_path,
                node: freed,
            },
        ]
    } else if item_index == item_count - 1 {
        // Last item: paragraph lands after the surviving list.
        vec![
            Op::RemoveNode { at: block },
            Op::InsertNode {
                at: after(&list_path, 1),
                node: freed,
            },
        ]
    } else {
        // Interior item: split the list around the freed paragraph.
        let tail: Vec<Node> = list.children[item_index + 1..].to_vec();
        let mut ops: Vec<Op> =
            std::iter::repeat_with(|| Op::RemoveNode { at: block.clone() })
                .take(item_count - item_index)
                .collect();
        ops.push(Op::InsertNode {
            at: after(&list_path, 1),
            node: freed,
        });
        ops.push(Op::InsertNode {
            at: after(&list_path, 2),
            node: Node::element(BlockType::BulletedList, tail),
        });
        ops
    };
    Ok(Some(ops))
}

/// A line break always opens a fresh top-level paragraph below the current
/// row, regardless of how deeply the cursor sits.
pub fn break_ops(at: &Point) -> Vec<Op> {
    vec![Op::SplitBlock {
        at: at.path.clone(),
    }]
}

/// The element directly containing the leaf at `at`.
fn enclosing_block(at: &Point) -> Path {
    at.path.parent().unwrap_or_else(Path::root)
}

/// Sibling path `n` places after `path`.
fn after(path: &Path, n: usize) -> Path {
    let mut indices = path.indices().to_vec();
    if let Some(last) = indices.last_mut() {
        *last += n;
    }
    Path::new(indices)
}

// ============================================================================
// Tests
// ============================================================================
