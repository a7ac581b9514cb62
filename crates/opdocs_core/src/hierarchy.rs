//! Outline hierarchy extraction.
//!
//! # Responsibility
//! - Turn a flat, indented outline into a tree rooted at one chosen item.
//!
//! # Invariants
//! - The input slice is never modified; repeated builds are structurally equal.
//! - Only outline kinds become nodes; other blocks are skipped without ending the scan.
//! - The first outline item at or above the root's indent level ends the subtree.
//! - A node's parent is the most recent node found walking `L-1` down to the root level,
//!   falling back to the root. Only the slot of the node's own level is overwritten, so
//!   deeper slots can stay pointed at an earlier branch.

use crate::model::block::OutlineItem;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One node of an extracted outline tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyNode {
    pub item: OutlineItem,
    /// Copy of `item.indent_level`.
    pub level: u32,
    /// Children in document order.
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    fn leaf(item: OutlineItem) -> Self {
        Self {
            level: item.indent_level,
            item,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(HierarchyNode::node_count)
            .sum::<usize>()
    }

    /// Depth of this subtree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(HierarchyNode::depth)
            .max()
            .unwrap_or(0)
    }
}

/// Rejected hierarchy input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    RootOutOfRange { root_index: usize, len: usize },
    RootNotOutline { root_index: usize },
}

impl Display for HierarchyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RootOutOfRange { root_index, len } => {
                write!(f, "root index {root_index} out of range for {len} items")
            }
            Self::RootNotOutline { root_index } => {
                write!(f, "item at index {root_index} is not an outline item")
            }
        }
    }
}

impl Error for HierarchyError {}

struct ArenaNode {
    item_index: usize,
    children: Vec<usize>,
}

/// Builds the subtree rooted at `items[root_index]`.
pub fn build_hierarchy(
    items: &[OutlineItem],
    root_index: usize,
) -> Result<HierarchyNode, HierarchyError> {
    let root = items.get(root_index).ok_or(HierarchyError::RootOutOfRange {
        root_index,
        len: items.len(),
    })?;
    if !root.is_outline() {
        return Err(HierarchyError::RootNotOutline { root_index });
    }

    let root_level = root.indent_level;
    let mut arena = vec![ArenaNode {
        item_index: root_index,
        children: Vec::new(),
    }];
    let mut last_at_level: HashMap<u32, usize> = HashMap::from([(root_level, 0)]);

    for (index, item) in items.iter().enumerate().skip(root_index + 1) {
        if !item.is_outline() {
            continue;
        }
        let level = item.indent_level;
        if level <= root_level {
            break;
        }

        let parent = (root_level..level)
            .rev()
            .find_map(|candidate| last_at_level.get(&candidate).copied())
            .unwrap_or(0);

        let node = arena.len();
        arena.push(ArenaNode {
            item_index: index,
            children: Vec::new(),
        });
        arena[parent].children.push(node);
        last_at_level.insert(level, node);
    }

    Ok(assemble(&arena, items, 0))
}

fn assemble(arena: &[ArenaNode], items: &[OutlineItem], node: usize) -> HierarchyNode {
    let entry = &arena[node];
    let mut built = HierarchyNode::leaf(items[entry.item_index].clone());
    built.children = entry
        .children
        .iter()
        .map(|child| assemble(arena, items, *child))
        .collect();
    built
}
