mod common;

use common::{document, synced, Call, FakeClient, FakeClock, RecordingNotifier};
use opdocs_core::materialize::AbandonReason;
use opdocs_core::{
    build_hierarchy, convert_outline_to_tasks, BlockId, BlockKind, BlockSnapshot, BlockSpec,
    ConversionError, EditingSurface, MemoryDocument, OutlineItem, PollPolicy, SurfaceError,
    TaskProps, TaskTreeMaterializer,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use opdocs_core::BlockKind::BulletListItem as B;

fn id_at(doc: &impl EditingSurface, index: usize) -> BlockId {
    doc.document_blocks()[index].id
}

#[test]
fn parent_is_confirmed_before_children_are_created() {
    let client = FakeClient::new();
    let notifier = RecordingNotifier::default();
    let doc = synced(
        document(&[
            (B, 0, "Root"),
            (B, 1, "A"),
            (B, 2, "A1"),
            (B, 1, "B"),
        ]),
        &client,
        &notifier,
    );
    let clock = FakeClock::default();
    let root = id_at(&doc, 0);

    let report = convert_outline_to_tasks(&doc, &clock, PollPolicy::default(), root).unwrap();

    assert_eq!(
        client.created_subjects(),
        vec![
            ("Root".to_string(), None),
            ("A".to_string(), Some("100".to_string())),
            ("A1".to_string(), Some("101".to_string())),
            ("B".to_string(), Some("100".to_string())),
        ]
    );
    for call in client.calls.borrow().iter() {
        if let Call::Create {
            parent_id: Some(_),
            parent_existed,
            ..
        } = call
        {
            assert!(*parent_existed, "child created before parent: {call:?}");
        }
    }

    assert!(report.is_complete());
    assert_eq!(report.created_count(), 4);
    assert_eq!(report.work_package_id(root), Some("100"));
    assert!(clock.sleeps.borrow().is_empty());

    let blocks = doc.inner().snapshots();
    assert!(blocks.iter().all(|block| block.kind == BlockKind::Task));
    let a1 = blocks[2].task.as_ref().unwrap();
    assert_eq!(a1.parent_id.as_deref(), Some("101"));
    assert_eq!(a1.lock_version, Some(0));
    assert_eq!(a1.url.as_deref(), Some("https://op.example.org/wp/102"));
}

#[test]
fn blank_items_are_skipped_with_their_descendants() {
    let client = FakeClient::new();
    let notifier = RecordingNotifier::default();
    let doc = synced(
        document(&[
            (B, 0, "Root"),
            (B, 1, "   "),
            (B, 2, "orphan"),
            (B, 1, "Kept"),
        ]),
        &client,
        &notifier,
    );
    let clock = FakeClock::default();
    let blank = id_at(&doc, 1);

    let report =
        convert_outline_to_tasks(&doc, &clock, PollPolicy::default(), id_at(&doc, 0)).unwrap();

    assert_eq!(
        client.created_subjects(),
        vec![
            ("Root".to_string(), None),
            ("Kept".to_string(), Some("100".to_string())),
        ]
    );
    assert_eq!(report.skipped_blank, vec![blank]);
    assert!(report.abandoned.is_empty());

    let orphan = doc.inner().snapshots()[2].clone();
    assert_eq!(orphan.kind, BlockKind::BulletListItem);
    assert_eq!(orphan.text, "orphan");
}

#[test]
fn confirmation_timeout_abandons_only_that_branch() {
    let client = FakeClient::new();
    client.fail_subject("A");
    let notifier = RecordingNotifier::default();
    let doc = synced(
        document(&[
            (B, 0, "Root"),
            (B, 1, "A"),
            (B, 2, "A1"),
            (B, 1, "B"),
        ]),
        &client,
        &notifier,
    );
    let clock = FakeClock::default();
    let a = id_at(&doc, 1);

    let report =
        convert_outline_to_tasks(&doc, &clock, PollPolicy::default(), id_at(&doc, 0)).unwrap();

    assert_eq!(
        client.created_subjects(),
        vec![
            ("Root".to_string(), None),
            ("A".to_string(), Some("100".to_string())),
            ("B".to_string(), Some("100".to_string())),
        ]
    );
    assert_eq!(report.created_count(), 2);
    assert_eq!(report.abandoned.len(), 1);
    assert_eq!(report.abandoned[0].block_id, a);
    assert_eq!(
        report.abandoned[0].reason,
        AbandonReason::ConfirmationTimeout { attempts: 10 }
    );
    assert_eq!(report.abandoned[0].skipped_descendants, 1);

    assert_eq!(
        clock.sleeps.borrow().as_slice(),
        &[Duration::from_millis(500); 9]
    );
    assert_eq!(clock.total(), Duration::from_millis(4500));

    let messages = notifier.messages.borrow();
    assert!(messages
        .iter()
        .any(|(message, _)| message == "Failed to save task: HTTP error 500: internal error"));
}

#[test]
fn unknown_root_is_rejected() {
    let client = FakeClient::new();
    let notifier = RecordingNotifier::default();
    let doc = synced(document(&[(B, 0, "Root")]), &client, &notifier);
    let missing = Uuid::new_v4();

    let err = convert_outline_to_tasks(&doc, &FakeClock::default(), PollPolicy::default(), missing)
        .unwrap_err();

    assert_eq!(err, ConversionError::RootNotFound(missing));
    assert_eq!(client.request_count(), 0);
}

/// Surface that links a task only after it has been read a few times.
struct LaggingSurface {
    doc: MemoryDocument,
    reads_before_link: u32,
    reads: RefCell<HashMap<BlockId, u32>>,
    next_id: Cell<u32>,
    placed: RefCell<Vec<(String, Option<String>)>>,
    reject: Option<BlockId>,
}

impl LaggingSurface {
    fn new(doc: MemoryDocument, reads_before_link: u32) -> Self {
        Self {
            doc,
            reads_before_link,
            reads: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
            placed: RefCell::new(Vec::new()),
            reject: None,
        }
    }
}

impl EditingSurface for LaggingSurface {
    fn document_blocks(&self) -> Vec<OutlineItem> {
        self.doc.document_blocks()
    }

    fn replace_block(&self, id: BlockId, spec: BlockSpec) -> Result<(), SurfaceError> {
        if self.reject == Some(id) {
            return Err(SurfaceError::Rejected("read-only block".to_string()));
        }
        if let BlockSpec::Task(props) = &spec {
            self.placed
                .borrow_mut()
                .push((props.subject.clone(), props.parent_id.clone()));
        }
        self.doc.replace_block(id, spec)
    }

    fn insert_block_after(&self, after: BlockId, spec: BlockSpec) -> Result<BlockId, SurfaceError> {
        self.doc.insert_block_after(after, spec)
    }

    fn block(&self, id: BlockId) -> Option<BlockSnapshot> {
        let reads = {
            let mut reads = self.reads.borrow_mut();
            let count = reads.entry(id).or_insert(0);
            *count += 1;
            *count
        };
        let block = self.doc.block(id)?;
        if reads < self.reads_before_link || block.work_package_id().is_some() {
            return Some(block);
        }
        let props = block.task.clone()?;
        let wp_id = self.next_id.get();
        self.next_id.set(wp_id + 1);
        let linked = TaskProps {
            work_package_id: Some(wp_id.to_string()),
            lock_version: Some(0),
            ..props
        };
        self.doc.replace_block(id, BlockSpec::Task(linked)).ok()?;
        self.doc.block(id)
    }
}

#[test]
fn polls_until_surface_reports_the_link() {
    let surface = LaggingSurface::new(
        document(&[(B, 0, "Root"), (B, 1, "Child")]),
        3,
    );
    let clock = FakeClock::default();
    let items = surface.document_blocks();
    let tree = build_hierarchy(&items, 0).unwrap();

    let report = TaskTreeMaterializer::new(&surface, &clock, PollPolicy::default())
        .materialize(&tree, Some("7"));

    assert_eq!(
        surface.placed.borrow().as_slice(),
        &[
            ("Root".to_string(), Some("7".to_string())),
            ("Child".to_string(), Some("1".to_string())),
        ]
    );
    assert_eq!(
        report.creation_map,
        vec![(items[0].id, "1".to_string()), (items[1].id, "2".to_string())]
    );
    assert_eq!(clock.sleeps.borrow().len(), 4);
}

#[test]
fn surface_rejection_abandons_subtree_and_continues_with_siblings() {
    let doc = document(&[(B, 0, "Root"), (B, 1, "Locked"), (B, 2, "Inner"), (B, 1, "Open")]);
    let locked = doc.document_blocks()[1].id;
    let mut surface = LaggingSurface::new(doc, 1);
    surface.reject = Some(locked);
    let clock = FakeClock::default();

    let report =
        convert_outline_to_tasks(&surface, &clock, PollPolicy::default(), id_at(&surface, 0))
            .unwrap();

    assert_eq!(report.created_count(), 2);
    assert_eq!(report.abandoned.len(), 1);
    assert!(matches!(
        report.abandoned[0].reason,
        AbandonReason::Surface(SurfaceError::Rejected(_))
    ));
    assert!(clock.sleeps.borrow().is_empty());
}
