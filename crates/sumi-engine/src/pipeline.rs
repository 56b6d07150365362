//! The mutation pipeline: one operation at a time, to completion.
//!
//! `DocumentContext` owns the tree and is its only writer. Every edit runs
//! autoformat interception, commits through `Document::apply`, then drives
//! normalization to its fixed point before control returns, so readers only
//! ever observe a fully-normalized tree.
//!
//! Locally produced ops, repairs included, accumulate in a commit log that
//! the replication substrate drains with [`DocumentContext::take_committed`].
//! Repairs triggered by remote deltas are not logged: the originating
//! replica already recorded its own, and normalization is a pure function
//! of tree content, so every replica converges on the same repairs.

use std::collections::BTreeSet;

use sumi_doc::{Document, Node, Op, Path, Point};
use sumi_types::{ActorId, BlockType, DocId};
use tracing::debug;

use crate::{
    EngineError, NormalizeReport, Span, autoformat_delete_backward, autoformat_insert, break_ops,
    decorate, normalize,
};

/// Explicit editing context: the tree, who is typing, the outbound op log,
/// and the replication gate.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    doc_id: DocId,
    document: Document,
    local_actor: ActorId,
    committed: Vec<Op>,
    connected: bool,
}

impl DocumentContext {
    /// A fresh context seeded with one empty paragraph. Starts disconnected;
    /// local editing unlocks once the substrate reports sync.
    pub fn new(local_actor: ActorId) -> Self {
        DocumentContext {
            doc_id: DocId::new(),
            document: Document::with_default_paragraph(),
            local_actor,
            committed: Vec::new(),
            connected: false,
        }
    }

    /// Adopt an already-converged tree under a known document identity,
    /// normalizing it on the way in.
    pub fn with_document(
        doc_id: DocId,
        local_actor: ActorId,
        mut document: Document,
    ) -> Result<Self, EngineError> {
        normalize(&mut document)?;
        Ok(DocumentContext {
            doc_id,
            document,
            local_actor,
            committed: Vec::new(),
            connected: false,
        })
    }

    /// The shared document this context replicates.
    pub fn doc_id(&self) -> DocId {
        self.doc_id
    }

    // ── Replication gate ────────────────────────────────────────────────

    /// Connection notification from the replication substrate.
    pub fn set_connected(&mut self, connected: bool) {
        debug!(doc = %self.doc_id.short(), connected, "replication connection state changed");
        self.connected = connected;
    }

    /// Whether the document accepts interactive edits.
    pub fn is_ready(&self) -> bool {
        self.connected
    }

    // ── Local edits ─────────────────────────────────────────────────────

    /// Type `text` at `at`. The inserted run is attributed to the local
    /// actor; a recognized shortcut rewrites the block instead.
    pub fn insert_text(&mut self, at: &Point, text: &str) -> Result<(), EngineError> {
        self.check_ready()?;
        if let Some(ops) = autoformat_insert(&self.document, at, text)? {
            return self.commit_local(&ops);
        }
        self.commit_local(&[Op::InsertText {
            at: at.clone(),
            text: text.to_owned(),
            marks: BTreeSet::new(),
            author: Some(self.local_actor),
        }])
    }

    /// Backspace at `at`. At the start of a non-paragraph block this reverts
    /// the block type; otherwise it deletes one character, merging with the
    /// previous top-level block at a paragraph boundary.
    pub fn delete_backward(&mut self, at: &Point) -> Result<(), EngineError> {
        self.check_ready()?;
        if let Some(ops) = autoformat_delete_backward(&self.document, at)? {
            return self.commit_local(&ops);
        }

        if at.offset > 0 {
            return self.commit_local(&[Op::RemoveText {
                at: Point::new(at.path.clone(), at.offset - 1),
                len: 1,
            }]);
        }

        // Offset 0: step back into the previous leaf of the same block.
        let block = at.path.parent().unwrap_or_else(Path::root);
        let step_back = {
            let leaves = self.document.leaves_of(&block)?;
            leaves
                .iter()
                .position(|(p, _)| *p == at.path)
                .and_then(|i| {
                    leaves[..i].iter().rev().find(|(_, l)| l.char_len() > 0)
                })
                .map(|(prev_path, prev)| Op::RemoveText {
                    at: Point::new(prev_path.clone(), prev.char_len() - 1),
                    len: 1,
                })
        };
        if let Some(op) = step_back {
            return self.commit_local(&[op]);
        }

        // Start of a paragraph: fold it into the previous block, unless that
        // block is a list container.
        let mut merge = None;
        if let Some(top) = block.top_level()
            && top > 0
            && let Some(Node::Element(prev)) = self.document.children.get(top - 1)
            && prev.block_type != BlockType::BulletedList
        {
            merge = Some(Op::MergeNode {
                at: Path::from([top]),
                position: prev.children.len(),
            });
        }
        if let Some(op) = merge {
            return self.commit_local(&[op]);
        }

        // Start of the document: nothing to delete.
        Ok(())
    }

    /// Line break: a new empty top-level paragraph below the current row.
    pub fn insert_break(&mut self, at: &Point) -> Result<(), EngineError> {
        self.check_ready()?;
        self.commit_local(&break_ops(at))
    }

    // ── Remote edits ────────────────────────────────────────────────────

    /// Apply a converged remote delta. Ops already carry the remote actor's
    /// attribution; the gate does not apply to them.
    pub fn apply_remote(&mut self, ops: &[Op]) -> Result<NormalizeReport, EngineError> {
        self.document.apply_all(ops)?;
        normalize(&mut self.document)
    }

    // ── Read-only views ─────────────────────────────────────────────────

    /// The fully-normalized tree.
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn local_actor(&self) -> ActorId {
        self.local_actor
    }

    /// Highlight spans for the leaf at `path`.
    pub fn decorations(&self, path: &Path) -> Result<Vec<Span>, EngineError> {
        Ok(decorate(&self.document.leaf_at(path)?.text))
    }

    /// The display owner of a top-level block.
    pub fn block_author(&self, index: usize) -> Option<ActorId> {
        self.document.block_author(index)
    }

    /// Drain locally produced ops, in commit order, for the substrate.
    pub fn take_committed(&mut self) -> Vec<Op> {
        std::mem::take(&mut self.committed)
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn check_ready(&self) -> Result<(), EngineError> {
        if self.connected {
            Ok(())
        } else {
            Err(EngineError::NotConnected)
        }
    }

    fn commit_local(&mut self, ops: &[Op]) -> Result<(), EngineError> {
        for op in ops {
            self.document.apply(op)?;
            self.committed.push(op.clone());
        }
        let report = normalize(&mut self.document)?;
        self.committed.extend(report.repairs);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_context() -> DocumentContext {
        let mut ctx = DocumentContext::new(ActorId::new());
        ctx.set_connected(true);
        ctx
    }

    #[test]
    fn test_edits_gated_until_connected() {
        let mut ctx = DocumentContext::new(ActorId::new());
        assert!(!ctx.is_ready());
        assert_eq!(
            ctx.insert_text(&Point::new([0, 0], 0), "x"),
            Err(EngineError::NotConnected)
        );
        assert_eq!(
            ctx.delete_backward(&Point::new([0, 0], 0)),
            Err(EngineError::NotConnected)
        );
        assert_eq!(
            ctx.insert_break(&Point::new([0, 0], 0)),
            Err(EngineError::NotConnected)
        );

        ctx.set_connected(true);
        assert!(ctx.is_ready());
        ctx.insert_text(&Point::new([0, 0], 0), "x").unwrap();
    }

    #[test]
    fn test_typed_text_carries_local_attribution() {
        let mut ctx = ready_context();
        ctx.insert_text(&Point::new([0, 0], 0), "hello").unwrap();

        let doc = ctx.document();
        assert_eq!(doc.text_of(&Path::from([0])).unwrap(), "hello");
        let leaf = doc.leaf_at(&Path::from([0, 0])).unwrap();
        assert_eq!(leaf.author, Some(ctx.local_actor()));
        // Normalization already labelled the row.
        assert_eq!(ctx.block_author(0), Some(ctx.local_actor()));
    }

    #[test]
    fn test_heading_shortcut_end_to_end() {
        let mut ctx = ready_context();
        ctx.insert_text(&Point::new([0, 0], 0), "#").unwrap();
        ctx.insert_text(&Point::new([0, 0], 1), " ").unwrap();

        let block = ctx.document().element_at(&Path::from([0])).unwrap();
        assert_eq!(block.block_type, BlockType::HeadingOne);
        assert_eq!(block.text(), "");

        ctx.insert_text(&Point::new([0, 0], 0), "Title").unwrap();
        assert_eq!(
            ctx.document().text_of(&Path::from([0])).unwrap(),
            "Title"
        );
    }

    #[test]
    fn test_list_round_trip() {
        let mut ctx = ready_context();
        ctx.insert_text(&Point::new([0, 0], 0), "- ").unwrap();

        let list = ctx.document().element_at(&Path::from([0])).unwrap();
        assert_eq!(list.block_type, BlockType::BulletedList);
        assert_eq!(
            ctx.document()
                .element_at(&Path::from([0, 0]))
                .unwrap()
                .block_type,
            BlockType::ListItem
        );

        ctx.delete_backward(&Point::new([0, 0, 0], 0)).unwrap();
        let block = ctx.document().element_at(&Path::from([0])).unwrap();
        assert_eq!(block.block_type, BlockType::Paragraph);
        assert_eq!(ctx.document().block_count(), 1);
    }

    #[test]
    fn test_break_opens_fresh_paragraph() {
        let mut ctx = ready_context();
        ctx.insert_text(&Point::new([0, 0], 0), "first").unwrap();
        ctx.insert_break(&Point::new([0, 0], 5)).unwrap();
        ctx.insert_text(&Point::new([1, 0], 0), "second").unwrap();

        let doc = ctx.document();
        assert_eq!(doc.block_count(), 2);
        assert_eq!(doc.text_of(&Path::from([0])).unwrap(), "first");
        assert_eq!(doc.text_of(&Path::from([1])).unwrap(), "second");
    }

    #[test]
    fn test_plain_backspace_deletes_one_char() {
        let mut ctx = ready_context();
        ctx.insert_text(&Point::new([0, 0], 0), "abc").unwrap();
        ctx.delete_backward(&Point::new([0, 0], 3)).unwrap();
        assert_eq!(ctx.document().text_of(&Path::from([0])).unwrap(), "ab");
    }

    #[test]
    fn test_backspace_at_paragraph_start_merges_blocks() {
        let mut ctx = ready_context();
        ctx.insert_text(&Point::new([0, 0], 0), "one").unwrap();
        ctx.insert_break(&Point::new([0, 0], 3)).unwrap();
        ctx.insert_text(&Point::new([1, 0], 0), "two").unwrap();

        ctx.delete_backward(&Point::new([1, 0], 0)).unwrap();
        let doc = ctx.document();
        assert_eq!(doc.block_count(), 1);
        assert_eq!(doc.text_of(&Path::from([0])).unwrap(), "onetwo");
    }

    #[test]
    fn test_backspace_at_document_start_is_a_no_op() {
        let mut ctx = ready_context();
        ctx.insert_text(&Point::new([0, 0], 0), "x").unwrap();
        let before = ctx.document().clone();
        ctx.delete_backward(&Point::new([0, 0], 0)).unwrap();
        // Offset 0 of a paragraph with nothing before it.
        assert_eq!(ctx.document(), &before);
    }

    #[test]
    fn test_committed_stream_in_commit_order() {
        let mut ctx = ready_context();
        ctx.insert_text(&Point::new([0, 0], 0), "hi").unwrap();

        let ops = ctx.take_committed();
        assert!(!ops.is_empty());
        assert!(matches!(ops[0], Op::InsertText { .. }));
        // Normalization's author-label repair follows the insertion.
        assert!(
            ops.iter()
                .any(|op| matches!(op, Op::SetDominantAuthor { .. }))
        );
        // Drained.
        assert!(ctx.take_committed().is_empty());
    }

    #[test]
    fn test_shortcut_replaces_the_insertion_in_the_stream() {
        let mut ctx = ready_context();
        ctx.insert_text(&Point::new([0, 0], 0), "# ").unwrap();
        let ops = ctx.take_committed();
        // The "# " never committed as text.
        assert!(!ops.iter().any(|op| matches!(op, Op::InsertText { .. })));
        assert!(
            ops.iter()
                .any(|op| matches!(op, Op::SetBlockType { .. }))
        );
    }

    #[test]
    fn test_remote_conflict_purged_and_not_relogged() {
        let mut ctx = ready_context();
        ctx.insert_text(&Point::new([0, 0], 0), "aaaaaaaaaa").unwrap();
        ctx.take_committed();

        // A concurrent remote edit by a different actor lands in our row.
        let bob = ActorId::new();
        let report = ctx
            .apply_remote(&[Op::InsertText {
                at: Point::new([0, 0], 10),
                text: "bb".into(),
                marks: BTreeSet::new(),
                author: Some(bob),
            }])
            .unwrap();

        assert!(!report.is_clean());
        let doc = ctx.document();
        assert_eq!(doc.text_of(&Path::from([0])).unwrap(), "aaaaaaaaaa");
        assert_eq!(ctx.block_author(0), Some(ctx.local_actor()));
        // Remote-triggered repairs stay out of the outbound log.
        assert!(ctx.take_committed().is_empty());
    }

    #[test]
    fn test_remote_ops_apply_while_disconnected() {
        let mut ctx = DocumentContext::new(ActorId::new());
        let bob = ActorId::new();
        ctx.apply_remote(&[Op::InsertText {
            at: Point::new([0, 0], 0),
            text: "from bob".into(),
            marks: BTreeSet::new(),
            author: Some(bob),
        }])
        .unwrap();
        assert_eq!(
            ctx.document().text_of(&Path::from([0])).unwrap(),
            "from bob"
        );
        assert_eq!(ctx.block_author(0), Some(bob));
    }

    #[test]
    fn test_decorations_view() {
        let mut ctx = ready_context();
        ctx.insert_text(&Point::new([0, 0], 0), "see `code`").unwrap();
        let spans = ctx.decorations(&Path::from([0, 0])).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].tag, crate::SpanTag::CodeSpan);
        // Reading decorations never changes the tree.
        let before = ctx.document().clone();
        ctx.decorations(&Path::from([0, 0])).unwrap();
        assert_eq!(ctx.document(), &before);
    }

    #[test]
    fn test_with_document_normalizes_on_adoption() {
        let alice = ActorId::new();
        let bob = ActorId::new();
        let doc = Document::from_blocks(vec![Node::element(
            BlockType::Paragraph,
            vec![
                Node::text("aaaaaaaaaa", Some(alice)),
                Node::text("bb", Some(bob)),
            ],
        )]);
        let ctx = DocumentContext::with_document(DocId::new(), ActorId::new(), doc).unwrap();
        assert_eq!(
            ctx.document().text_of(&Path::from([0])).unwrap(),
            "aaaaaaaaaa"
        );
        assert_eq!(ctx.block_author(0), Some(alice));
    }
}
