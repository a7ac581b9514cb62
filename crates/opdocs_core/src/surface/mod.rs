//! Editing-surface contract.
//!
//! # Responsibility
//! - Expose the four operations core needs from a block editor.
//! - Provide an in-memory document and a decorator that links task blocks to work packages.
//!
//! # Invariants
//! - `replace_block` keeps the block id and indent level.
//! - `document_blocks` reports blocks in document order with `order_index` set to position.

mod memory;
mod synced;

pub use memory::MemoryDocument;
pub use synced::{SyncedDocument, TaskBlockError};

use crate::model::block::{BlockId, BlockKind, OutlineItem, TaskProps, WorkPackageProps};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Replacement content for one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSpec {
    Paragraph(String),
    Heading(String),
    /// Outline list item of the given list kind; `checked` applies to check list items.
    ListItem {
        kind: BlockKind,
        text: String,
        checked: bool,
    },
    Task(TaskProps),
    WorkPackage(WorkPackageProps),
}

impl BlockSpec {
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Paragraph(_) => BlockKind::Paragraph,
            Self::Heading(_) => BlockKind::Heading,
            Self::ListItem { kind, .. } => *kind,
            Self::Task(_) => BlockKind::Task,
            Self::WorkPackage(_) => BlockKind::WorkPackage,
        }
    }

    /// Plain text the block shows; tasks and references show their subject.
    pub fn text(&self) -> &str {
        match self {
            Self::Paragraph(text) | Self::Heading(text) | Self::ListItem { text, .. } => text,
            Self::Task(props) => &props.subject,
            Self::WorkPackage(props) => &props.subject,
        }
    }

    pub fn checked(&self) -> bool {
        matches!(self, Self::ListItem { checked: true, .. })
    }
}

/// Current state of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSnapshot {
    pub id: BlockId,
    pub kind: BlockKind,
    pub indent_level: u32,
    pub text: String,
    /// Ticked state of a check list item.
    pub checked: bool,
    /// Present for task blocks only.
    pub task: Option<TaskProps>,
    /// Present for work-package reference blocks only.
    pub work_package: Option<WorkPackageProps>,
}

impl BlockSnapshot {
    pub fn new(kind: BlockKind, indent_level: u32, text: impl Into<String>) -> Self {
        Self {
            id: BlockId::new_v4(),
            kind,
            indent_level,
            text: text.into(),
            checked: false,
            task: None,
            work_package: None,
        }
    }

    /// Check list item with an explicit ticked state.
    pub fn check_item(indent_level: u32, text: impl Into<String>, checked: bool) -> Self {
        Self {
            checked,
            ..Self::new(BlockKind::CheckListItem, indent_level, text)
        }
    }

    pub fn task(indent_level: u32, props: TaskProps) -> Self {
        Self {
            text: props.subject.clone(),
            task: Some(props),
            ..Self::new(BlockKind::Task, indent_level, "")
        }
    }

    pub fn work_package(indent_level: u32, props: WorkPackageProps) -> Self {
        Self {
            text: props.subject.clone(),
            work_package: Some(props),
            ..Self::new(BlockKind::WorkPackage, indent_level, "")
        }
    }

    /// Builds a block from replacement content.
    pub fn from_spec(indent_level: u32, spec: BlockSpec) -> Self {
        let checked = spec.checked();
        match spec {
            BlockSpec::Task(props) => Self::task(indent_level, props),
            BlockSpec::WorkPackage(props) => Self::work_package(indent_level, props),
            other => Self {
                checked,
                ..Self::new(other.kind(), indent_level, other.text())
            },
        }
    }

    pub fn to_outline_item(&self, order_index: usize) -> OutlineItem {
        OutlineItem {
            id: self.id,
            kind: self.kind,
            indent_level: self.indent_level,
            text: self.text.clone(),
            order_index,
        }
    }

    /// Work-package id of a linked task block or of a reference block.
    pub fn work_package_id(&self) -> Option<&str> {
        let task = self
            .task
            .as_ref()
            .filter(|props| props.is_linked())
            .and_then(|props| props.work_package_id.as_deref());
        task.or_else(|| {
            self.work_package
                .as_ref()
                .filter(|props| props.is_linked())
                .and_then(|props| props.work_package_id.as_deref())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    BlockNotFound(BlockId),
    /// Surface refused the edit.
    Rejected(String),
}

impl Display for SurfaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlockNotFound(id) => write!(f, "block not found: {id}"),
            Self::Rejected(reason) => write!(f, "edit rejected: {reason}"),
        }
    }
}

impl Error for SurfaceError {}

/// Block editor operations consumed by core.
pub trait EditingSurface {
    /// Snapshot of all blocks in document order.
    fn document_blocks(&self) -> Vec<OutlineItem>;
    fn replace_block(&self, id: BlockId, spec: BlockSpec) -> Result<(), SurfaceError>;
    /// Inserts a block after `after` at the same indent level, returning the new id.
    fn insert_block_after(&self, after: BlockId, spec: BlockSpec) -> Result<BlockId, SurfaceError>;
    fn block(&self, id: BlockId) -> Option<BlockSnapshot>;
}
