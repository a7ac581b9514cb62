//! Sequential outline-to-task materialization.
//!
//! # Responsibility
//! - Replace each outline node with a task block, parent before children.
//! - Confirm creation by polling the block's props for a work-package id.
//!
//! # Invariants
//! - At most one creation is pending at any time; siblings follow document order.
//! - A child is placed only after its parent's id is confirmed.
//! - Blank nodes drop with their whole subtree.
//! - A confirmation timeout abandons that subtree only; it is logged and reported, not raised.

use crate::hierarchy::{build_hierarchy, HierarchyError, HierarchyNode};
use crate::model::block::{BlockId, TaskProps};
use crate::poll::{poll_until, Clock, PollPolicy};
use crate::surface::{BlockSpec, EditingSurface, SurfaceError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Why a subtree was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbandonReason {
    /// No work-package id appeared within the poll budget.
    ConfirmationTimeout { attempts: u32 },
    Surface(SurfaceError),
}

/// Subtree that was not materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbandonedNode {
    pub block_id: BlockId,
    pub reason: AbandonReason,
    /// Descendants that were never visited.
    pub skipped_descendants: usize,
}

/// Outcome of one materialization run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Confirmed creations, in creation order.
    pub creation_map: Vec<(BlockId, String)>,
    /// Blank nodes whose subtree was skipped.
    pub skipped_blank: Vec<BlockId>,
    pub abandoned: Vec<AbandonedNode>,
}

impl MaterializeReport {
    pub fn work_package_id(&self, block_id: BlockId) -> Option<&str> {
        self.creation_map
            .iter()
            .find(|(id, _)| *id == block_id)
            .map(|(_, wp_id)| wp_id.as_str())
    }

    pub fn created_count(&self) -> usize {
        self.creation_map.len()
    }

    pub fn is_complete(&self) -> bool {
        self.abandoned.is_empty()
    }
}

/// Drives task creation for one hierarchy through an editing surface.
pub struct TaskTreeMaterializer<'a, S: EditingSurface + ?Sized, K: Clock + ?Sized> {
    surface: &'a S,
    clock: &'a K,
    policy: PollPolicy,
}

impl<'a, S: EditingSurface + ?Sized, K: Clock + ?Sized> TaskTreeMaterializer<'a, S, K> {
    pub fn new(surface: &'a S, clock: &'a K, policy: PollPolicy) -> Self {
        Self {
            surface,
            clock,
            policy,
        }
    }

    /// Materializes `tree` under an optional existing parent work package.
    pub fn materialize(&self, tree: &HierarchyNode, parent_id: Option<&str>) -> MaterializeReport {
        let mut report = MaterializeReport::default();
        self.materialize_node(tree, parent_id, &mut report);
        report
    }

    fn materialize_node(
        &self,
        node: &HierarchyNode,
        parent_id: Option<&str>,
        report: &mut MaterializeReport,
    ) {
        let block_id = node.item.id;
        let Some(subject) = node.item.subject() else {
            report.skipped_blank.push(block_id);
            return;
        };

        let wp_id = match self.place_and_confirm(block_id, subject, parent_id) {
            Ok(wp_id) => wp_id,
            Err(reason) => {
                let skipped_descendants = node.node_count() - 1;
                warn!(
                    "event=task_materialize module=materialize status=abandoned block_id={} reason={} skipped_descendants={}",
                    block_id,
                    reason_code(&reason),
                    skipped_descendants
                );
                report.abandoned.push(AbandonedNode {
                    block_id,
                    reason,
                    skipped_descendants,
                });
                return;
            }
        };

        report.creation_map.push((block_id, wp_id.clone()));
        for child in &node.children {
            self.materialize_node(child, Some(&wp_id), report);
        }
    }

    fn place_and_confirm(
        &self,
        block_id: BlockId,
        subject: &str,
        parent_id: Option<&str>,
    ) -> Result<String, AbandonReason> {
        self.surface
            .replace_block(block_id, BlockSpec::Task(TaskProps::draft(subject, parent_id)))
            .map_err(AbandonReason::Surface)?;

        poll_until(self.clock, self.policy, || {
            self.surface
                .block(block_id)
                .and_then(|block| block.work_package_id().map(str::to_string))
        })
        .map_err(|timeout| AbandonReason::ConfirmationTimeout {
            attempts: timeout.attempts,
        })
    }
}

/// Failure before materialization could start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    RootNotFound(BlockId),
    Hierarchy(HierarchyError),
}

impl Display for ConversionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RootNotFound(id) => write!(f, "root block not found: {id}"),
            Self::Hierarchy(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConversionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Hierarchy(err) => Some(err),
            Self::RootNotFound(_) => None,
        }
    }
}

impl From<HierarchyError> for ConversionError {
    fn from(value: HierarchyError) -> Self {
        Self::Hierarchy(value)
    }
}

/// Converts the outline rooted at `root_block_id` into tasks.
pub fn convert_outline_to_tasks<S, K>(
    surface: &S,
    clock: &K,
    policy: PollPolicy,
    root_block_id: BlockId,
) -> Result<MaterializeReport, ConversionError>
where
    S: EditingSurface + ?Sized,
    K: Clock + ?Sized,
{
    let started_at = Instant::now();
    let items = surface.document_blocks();
    let root_index = items
        .iter()
        .position(|item| item.id == root_block_id)
        .ok_or(ConversionError::RootNotFound(root_block_id))?;
    let tree = build_hierarchy(&items, root_index)?;

    let report = TaskTreeMaterializer::new(surface, clock, policy).materialize(&tree, None);
    info!(
        "event=outline_convert module=materialize status={} nodes={} created={} skipped_blank={} abandoned={} duration_ms={}",
        if report.is_complete() { "ok" } else { "partial" },
        tree.node_count(),
        report.created_count(),
        report.skipped_blank.len(),
        report.abandoned.len(),
        started_at.elapsed().as_millis()
    );
    Ok(report)
}

fn reason_code(reason: &AbandonReason) -> &'static str {
    match reason {
        AbandonReason::ConfirmationTimeout { .. } => "confirmation_timeout",
        AbandonReason::Surface(SurfaceError::BlockNotFound(_)) => "block_not_found",
        AbandonReason::Surface(SurfaceError::Rejected(_)) => "surface_rejected",
    }
}
