//! Normalization: structural and authorship repair to a fixed point.
//!
//! Runs after every committed operation. Repairs are themselves ordinary
//! [`Op`]s applied through [`Document::apply`], so they join the committed
//! stream and replicate like any other edit. Instead of restarting recursion
//! from the root after each repair, a worklist of dirty paths is drained;
//! every repair remaps the remaining queue through [`Op::transform_path`]
//! and re-enqueues the affected region.
//!
//! Invariants enforced:
//! - every element has at least one child; an empty root gains a default
//!   empty paragraph
//! - top-level children are elements (a stray leaf is wrapped in a paragraph)
//! - a `ListItem` block is always inside a `BulletedList`; adjacent
//!   `BulletedList` siblings merge
//! - within a top-level block, only the dominant author's text survives, and
//!   the block's `dominant_author` cache matches the tally

use std::collections::{HashSet, VecDeque};

use sumi_doc::{DocError, Document, Element, Node, Op, Path, dominant_of};
use sumi_types::BlockType;
use tracing::{debug, warn};

use crate::EngineError;

/// Upper bound on repairs applied in a single run. Every repair strictly
/// shrinks or settles the tree, so hitting this means a repair loop bug.
/// Clean worklist visits are free; an already-normal document of any size
/// drains its queue without charging the limit.
const MAX_REPAIRS: usize = 10_000;

/// What a normalization run did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NormalizeReport {
    /// Repair operations applied, in commit order.
    pub repairs: Vec<Op>,
    /// Worklist entries processed before reaching the fixed point.
    pub steps: usize,
}

impl NormalizeReport {
    /// True if the tree was already normal.
    pub fn is_clean(&self) -> bool {
        self.repairs.is_empty()
    }
}

/// Drive the document to its normalization fixed point.
pub fn normalize(doc: &mut Document) -> Result<NormalizeReport, EngineError> {
    let mut queue = seed_worklist(doc);
    let mut queued: HashSet<Path> = queue.iter().cloned().collect();
    let mut report = NormalizeReport::default();

    while let Some(path) = queue.pop_front() {
        queued.remove(&path);
        report.steps += 1;

        let Some(repair) = check_once(doc, &path)? else {
            continue;
        };
        if report.repairs.len() >= MAX_REPAIRS {
            return Err(EngineError::RepairLimitExceeded {
                passes: MAX_REPAIRS,
            });
        }
        debug!(path = %path, repair = ?repair, "normalization repair");
        doc.apply(&repair)?;

        // Queued paths may now point at moved or destroyed nodes.
        queue = queue
            .into_iter()
            .filter_map(|p| repair.transform_path(&p))
            .collect();
        queued = queue.iter().cloned().collect();
        enqueue_affected(doc, &repair, &mut queue, &mut queued);
        report.repairs.push(repair);
    }

    Ok(report)
}

/// Validate the node at `path` once. Returns at most one repair op.
fn check_once(doc: &Document, path: &Path) -> Result<Option<Op>, EngineError> {
    if path.is_root() {
        if doc.children.is_empty() {
            return Ok(Some(Op::InsertNode {
                at: Path::from([0]),
                node: Node::Element(Element::empty_paragraph()),
            }));
        }
        return Ok(None);
    }

    // A queued path can go stale between repairs; stale means nothing left
    // to validate there.
    let node = match doc.node_at(path) {
        Ok(n) => n,
        Err(DocError::PathNotFound(_)) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    match node {
        Node::Text(leaf) => {
            // Top-level children must be blocks.
            if path.depth() == 1 {
                return Ok(Some(Op::Wrap {
                    at: path.clone(),
                    block_type: BlockType::Paragraph,
                }));
            }
            // Adjacent leaves with identical attribution collapse into one.
            if let Some(prev_path) = path.previous_sibling()
                && let Ok(Node::Text(prev)) = doc.node_at(&prev_path)
                && prev.mergeable_with(leaf)
            {
                return Ok(Some(Op::MergeNode {
                    at: path.clone(),
                    position: prev.char_len(),
                }));
            }
            Ok(None)
        }
        Node::Element(element) => check_element(doc, path, element),
    }
}

fn check_element(doc: &Document, path: &Path, element: &Element) -> Result<Option<Op>, EngineError> {
    // Empty containers: an emptied list disappears, anything else regains an
    // empty leaf so the line survives.
    if element.children.is_empty() {
        if element.block_type == BlockType::BulletedList {
            return Ok(Some(Op::RemoveNode { at: path.clone() }));
        }
        return Ok(Some(Op::InsertNode {
            at: path.child(0),
            node: Node::text("", None),
        }));
    }

    // ListItem must live inside a BulletedList.
    if element.block_type == BlockType::ListItem {
        let parent = path.parent().unwrap_or_else(Path::root);
        let wrapped = !parent.is_root()
            && doc
                .element_at(&parent)
                .map(|p| p.block_type == BlockType::BulletedList)
                .unwrap_or(false);
        if !wrapped {
            return Ok(Some(Op::Wrap {
                at: path.clone(),
                block_type: BlockType::BulletedList,
            }));
        }
    }

    // Adjacent sibling lists merge into one container.
    if element.block_type == BlockType::BulletedList
        && let Some(prev_path) = path.previous_sibling()
        && let Ok(prev) = doc.element_at(&prev_path)
        && prev.block_type == BlockType::BulletedList
    {
        return Ok(Some(Op::MergeNode {
            at: path.clone(),
            position: prev.children.len(),
        }));
    }

    if path.depth() == 1 {
        return arbitrate_authorship(path, element);
    }
    Ok(None)
}

/// Per-line ownership: the author with the most attributed text owns the
/// block; direct children attributable to anyone else are removed whole.
fn arbitrate_authorship(path: &Path, block: &Element) -> Result<Option<Op>, EngineError> {
    if block.text_len() == 0 {
        if block.dominant_author.is_some() {
            return Ok(Some(Op::SetDominantAuthor {
                at: path.clone(),
                author: None,
            }));
        }
        return Ok(None);
    }

    let Some(dominant) = dominant_of(&block.author_tally()) else {
        // Nonzero text with an empty tally: leaves lost attribution.
        debug_assert!(false, "block {path} has text but an empty author tally");
        warn!(path = %path, "authorship tally inconsistent, leaving block untouched");
        return Ok(None);
    };

    for (i, child) in block.children.iter().enumerate() {
        if let Some(author) = child.attributable_author()
            && author != dominant
        {
            debug!(path = %path, child = i, purged = %author, owner = %dominant,
                   "purging non-dominant author");
            return Ok(Some(Op::RemoveNode {
                at: path.child(i),
            }));
        }
    }

    if block.dominant_author != Some(dominant) {
        return Ok(Some(Op::SetDominantAuthor {
            at: path.clone(),
            author: Some(dominant),
        }));
    }
    Ok(None)
}

/// Every element path, children before parents, then the root.
fn seed_worklist(doc: &Document) -> VecDeque<Path> {
    fn walk(nodes: &[Node], base: &Path, out: &mut VecDeque<Path>) {
        for (i, node) in nodes.iter().enumerate() {
            let path = base.child(i);
            if let Node::Element(e) = node {
                walk(&e.children, &path, out);
            }
            out.push_back(path);
        }
    }
    let mut queue = VecDeque::new();
    walk(&doc.children, &Path::root(), &mut queue);
    queue.push_back(Path::root());
    queue
}

/// After a repair, re-validate the surrounding region: the repair target's
/// parent, that parent's children, the ancestor chain, and the root. Paths
/// already in the queue are not enqueued again.
fn enqueue_affected(
    doc: &Document,
    repair: &Op,
    queue: &mut VecDeque<Path>,
    queued: &mut HashSet<Path>,
) {
    let target = repair.target_path();
    let parent = target.parent().unwrap_or_else(Path::root);

    let mut push = |p: Path| {
        if queued.insert(p.clone()) {
            queue.push_back(p);
        }
    };
    if let Ok(children) = doc.children_at(&parent) {
        for i in 0..children.len() {
            push(parent.child(i));
        }
    }
    for ancestor in parent.ancestors() {
        push(ancestor);
    }
    push(parent);
    push(Path::root());
}

/// Check every invariant without repairing. Used by callers that want to
/// assert a tree is already normal; unlike [`normalize`] this surfaces an
/// authorship-tally inconsistency as an error.
pub fn verify(doc: &Document) -> Result<(), EngineError> {
    if doc.children.is_empty() {
        return Err(DocError::PathNotFound(Path::root()).into());
    }
    for (i, node) in doc.children.iter().enumerate() {
        let path = Path::from([i]);
        let Node::Element(block) = node else {
            return Err(DocError::NotAnElement(path).into());
        };
        verify_element(doc, &path, block)?;
        if block.text_len() > 0 {
            let tally = block.author_tally();
            if dominant_of(&tally).is_none() {
                return Err(EngineError::InconsistentAuthorship { path });
            }
        }
    }
    Ok(())
}

fn verify_element(doc: &Document, path: &Path, element: &Element) -> Result<(), EngineError> {
    if element.children.is_empty() {
        return Err(DocError::PathNotFound(path.child(0)).into());
    }
    if element.block_type == BlockType::ListItem {
        let parent = path.parent().unwrap_or_else(Path::root);
        let wrapped = !parent.is_root()
            && doc.element_at(&parent)?.block_type == BlockType::BulletedList;
        if !wrapped {
            return Err(DocError::InvalidUnwrap(path.clone()).into());
        }
    }
    for (i, child) in element.children.iter().enumerate() {
        if let Node::Element(e) = child {
            verify_element(doc, &path.child(i), e)?;
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sumi_types::ActorId;

    fn para(text: &str, author: Option<ActorId>) -> Node {
        Node::element(BlockType::Paragraph, vec![Node::text(text, author)])
    }

    #[test]
    fn test_empty_root_gains_default_paragraph() {
        let mut doc = Document::new();
        let report = normalize(&mut doc).unwrap();
        assert!(!report.is_clean());
        assert_eq!(doc.block_count(), 1);
        assert_eq!(
            doc.element_at(&Path::from([0])).unwrap().block_type,
            BlockType::Paragraph
        );
        verify(&doc).unwrap();
    }

    #[test]
    fn test_normal_tree_is_untouched() {
        let author = ActorId::new();
        let mut doc = Document::from_blocks(vec![{
            let mut e = Element::new(BlockType::Paragraph, vec![Node::text("hi", Some(author))]);
            e.dominant_author = Some(author);
            Node::Element(e)
        }]);
        let before = doc.clone();
        let report = normalize(&mut doc).unwrap();
        assert!(report.is_clean());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_idempotent() {
        let alice = ActorId::new();
        let bob = ActorId::new();
        let mut doc = Document::from_blocks(vec![Node::element(
            BlockType::Paragraph,
            vec![
                Node::text("aaaaaaaaaa", Some(alice)),
                Node::text("bb", Some(bob)),
            ],
        )]);
        normalize(&mut doc).unwrap();
        let once = doc.clone();
        let report = normalize(&mut doc).unwrap();
        assert!(report.is_clean());
        assert_eq!(doc, once);
    }

    #[test]
    fn test_conflict_purge_scenario() {
        // alice has 10 chars, bob has 2: bob's leaf is removed whole and
        // alice becomes the labelled owner.
        let alice = ActorId::new();
        let bob = ActorId::new();
        let mut doc = Document::from_blocks(vec![Node::element(
            BlockType::Paragraph,
            vec![
                Node::text("aaaaaaaaaa", Some(alice)),
                Node::text("bb", Some(bob)),
            ],
        )]);
        normalize(&mut doc).unwrap();

        let block = doc.element_at(&Path::from([0])).unwrap();
        assert_eq!(block.text(), "aaaaaaaaaa");
        assert_eq!(block.dominant_author, Some(alice));
        verify(&doc).unwrap();
    }

    #[test]
    fn test_purge_removes_whole_subtree_not_just_text() {
        let alice = ActorId::new();
        let bob = ActorId::new();
        let mut doc = Document::from_blocks(vec![Node::element(
            BlockType::Paragraph,
            vec![
                Node::text("alice wrote this line", Some(alice)),
                Node::element(
                    BlockType::BlockQuote,
                    vec![Node::text("bob", Some(bob)), Node::text("!", Some(bob))],
                ),
            ],
        )]);
        normalize(&mut doc).unwrap();

        let block = doc.element_at(&Path::from([0])).unwrap();
        assert_eq!(block.children.len(), 1);
        assert_eq!(block.text(), "alice wrote this line");
    }

    #[test]
    fn test_tie_break_lowest_actor_id() {
        let a = ActorId::new();
        let b = ActorId::new();
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let mut doc = Document::from_blocks(vec![Node::element(
            BlockType::Paragraph,
            vec![Node::text("xx", Some(hi)), Node::text("yy", Some(lo))],
        )]);
        normalize(&mut doc).unwrap();

        let block = doc.element_at(&Path::from([0])).unwrap();
        assert_eq!(block.dominant_author, Some(lo));
        assert_eq!(block.text(), "yy");
    }

    #[test]
    fn test_unauthored_leaves_are_never_purged() {
        let alice = ActorId::new();
        let mut doc = Document::from_blocks(vec![Node::element(
            BlockType::Paragraph,
            vec![Node::text("", None), Node::text("hi", Some(alice))],
        )]);
        normalize(&mut doc).unwrap();
        let block = doc.element_at(&Path::from([0])).unwrap();
        assert_eq!(block.dominant_author, Some(alice));
        assert_eq!(block.text(), "hi");
    }

    #[test]
    fn test_zero_text_block_clears_stale_author_cache() {
        let alice = ActorId::new();
        let mut doc = Document::from_blocks(vec![{
            let mut e = Element::new(BlockType::Paragraph, vec![Node::text("", None)]);
            e.dominant_author = Some(alice);
            Node::Element(e)
        }]);
        normalize(&mut doc).unwrap();
        assert_eq!(doc.block_author(0), None);
    }

    #[test]
    fn test_unwrapped_list_item_gets_wrapped() {
        let mut doc = Document::from_blocks(vec![Node::element(
            BlockType::ListItem,
            vec![Node::text("item", None)],
        )]);
        normalize(&mut doc).unwrap();

        let list = doc.element_at(&Path::from([0])).unwrap();
        assert_eq!(list.block_type, BlockType::BulletedList);
        assert_eq!(
            doc.element_at(&Path::from([0, 0])).unwrap().block_type,
            BlockType::ListItem
        );
        verify(&doc).unwrap();
    }

    #[test]
    fn test_adjacent_lists_merge() {
        let item = |t: &str| Node::element(BlockType::ListItem, vec![Node::text(t, None)]);
        let mut doc = Document::from_blocks(vec![
            Node::element(BlockType::BulletedList, vec![item("a")]),
            Node::element(BlockType::BulletedList, vec![item("b")]),
        ]);
        normalize(&mut doc).unwrap();

        assert_eq!(doc.block_count(), 1);
        let list = doc.element_at(&Path::from([0])).unwrap();
        assert_eq!(list.block_type, BlockType::BulletedList);
        assert_eq!(list.children.len(), 2);
    }

    #[test]
    fn test_emptied_list_is_removed() {
        let mut doc = Document::from_blocks(vec![
            para("keep", None),
            Node::element(BlockType::BulletedList, vec![]),
        ]);
        normalize(&mut doc).unwrap();
        assert_eq!(doc.block_count(), 1);
        assert_eq!(doc.text_of(&Path::from([0])).unwrap(), "keep");
    }

    #[test]
    fn test_emptied_paragraph_regains_leaf() {
        let mut doc = Document::from_blocks(vec![Node::Element(Element::new(
            BlockType::Paragraph,
            vec![],
        ))]);
        normalize(&mut doc).unwrap();
        let block = doc.element_at(&Path::from([0])).unwrap();
        assert_eq!(block.children.len(), 1);
        assert_eq!(block.text(), "");
    }

    #[test]
    fn test_stray_top_level_leaf_is_wrapped() {
        let alice = ActorId::new();
        let mut doc = Document::from_blocks(vec![Node::text("loose", Some(alice))]);
        normalize(&mut doc).unwrap();
        verify(&doc).unwrap();
        assert_eq!(doc.text_of(&Path::from([0])).unwrap(), "loose");
    }

    #[test]
    fn test_adjacent_identical_leaves_merge() {
        let alice = ActorId::new();
        let mut doc = Document::from_blocks(vec![Node::element(
            BlockType::Paragraph,
            vec![
                Node::text("he", Some(alice)),
                Node::text("llo", Some(alice)),
            ],
        )]);
        normalize(&mut doc).unwrap();
        let block = doc.element_at(&Path::from([0])).unwrap();
        assert_eq!(block.children.len(), 1);
        assert_eq!(block.text(), "hello");
    }

    #[test]
    fn test_cascading_repair_reaches_fixed_point() {
        // Purging bob's only leaf empties the quote, which then regains an
        // empty leaf; the block still ends single-owner and well-formed.
        let alice = ActorId::new();
        let bob = ActorId::new();
        let mut doc = Document::from_blocks(vec![Node::element(
            BlockType::Paragraph,
            vec![
                Node::text("alice's long contribution", Some(alice)),
                Node::element(BlockType::BlockQuote, vec![Node::text("b", Some(bob))]),
            ],
        )]);
        normalize(&mut doc).unwrap();
        verify(&doc).unwrap();

        let block = doc.element_at(&Path::from([0])).unwrap();
        assert_eq!(block.dominant_author, Some(alice));
        for leaf in block.children.iter().filter_map(Node::as_leaf) {
            assert!(leaf.author.is_none() || leaf.author == Some(alice));
        }
    }

    #[test]
    fn test_large_clean_document_normalizes() {
        // Clean visits must not count against the repair limit: a document
        // with more nodes than the limit still reaches its fixed point.
        let author = ActorId::new();
        let blocks = (0..6_000)
            .map(|i| {
                let mut e = Element::new(
                    BlockType::Paragraph,
                    vec![Node::text(format!("line {i}"), Some(author))],
                );
                e.dominant_author = Some(author);
                Node::Element(e)
            })
            .collect();
        let mut doc = Document::from_blocks(blocks);
        let report = normalize(&mut doc).unwrap();
        assert!(report.is_clean());
        assert_eq!(doc.block_count(), 6_000);
        verify(&doc).unwrap();
    }

    #[test]
    fn test_wide_block_purge_chain_terminates() {
        // A wide block repaired many times over: each repair re-enqueues its
        // region, so the worklist must stay deduplicated for the run to
        // finish well under the repair limit.
        let alice = ActorId::new();
        let bob = ActorId::new();
        let mut children: Vec<Node> = (0..500).map(|_| Node::text("b", Some(bob))).collect();
        children.push(Node::text("a".repeat(600), Some(alice)));
        let mut doc = Document::from_blocks(vec![Node::element(BlockType::Paragraph, children)]);

        let report = normalize(&mut doc).unwrap();
        assert!(!report.is_clean());

        let block = doc.element_at(&Path::from([0])).unwrap();
        assert_eq!(block.dominant_author, Some(alice));
        assert_eq!(block.children.len(), 1);
        assert_eq!(block.text(), "a".repeat(600));
        verify(&doc).unwrap();
    }

    #[test]
    fn test_verify_flags_lost_attribution() {
        let doc = Document::from_blocks(vec![Node::element(
            BlockType::Paragraph,
            vec![Node::text("orphaned text", None)],
        )]);
        assert_eq!(
            verify(&doc),
            Err(EngineError::InconsistentAuthorship {
                path: Path::from([0])
            })
        );
    }
}
