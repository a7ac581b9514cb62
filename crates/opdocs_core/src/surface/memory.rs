use super::{BlockSnapshot, BlockSpec, EditingSurface, SurfaceError};
use crate::model::block::{BlockId, OutlineItem};
use std::cell::RefCell;

/// Single-threaded in-memory document.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    blocks: RefCell<Vec<BlockSnapshot>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: Vec<BlockSnapshot>) -> Self {
        Self {
            blocks: RefCell::new(blocks),
        }
    }

    /// Appends a block at the end of the document.
    pub fn push(&self, block: BlockSnapshot) -> BlockId {
        let id = block.id;
        self.blocks.borrow_mut().push(block);
        id
    }

    /// Copy of every block in document order.
    pub fn snapshots(&self) -> Vec<BlockSnapshot> {
        self.blocks.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.blocks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.borrow().is_empty()
    }

    fn position(&self, id: BlockId) -> Result<usize, SurfaceError> {
        self.blocks
            .borrow()
            .iter()
            .position(|block| block.id == id)
            .ok_or(SurfaceError::BlockNotFound(id))
    }
}

impl EditingSurface for MemoryDocument {
    fn document_blocks(&self) -> Vec<OutlineItem> {
        self.blocks
            .borrow()
            .iter()
            .enumerate()
            .map(|(index, block)| block.to_outline_item(index))
            .collect()
    }

    fn replace_block(&self, id: BlockId, spec: BlockSpec) -> Result<(), SurfaceError> {
        let index = self.position(id)?;
        let mut blocks = self.blocks.borrow_mut();
        let target = &mut blocks[index];
        let replacement = BlockSnapshot::from_spec(target.indent_level, spec);
        *target = BlockSnapshot { id, ..replacement };
        Ok(())
    }

    fn insert_block_after(&self, after: BlockId, spec: BlockSpec) -> Result<BlockId, SurfaceError> {
        let index = self.position(after)?;
        let mut blocks = self.blocks.borrow_mut();
        let indent_level = blocks[index].indent_level;
        let block = BlockSnapshot::from_spec(indent_level, spec);
        let id = block.id;
        blocks.insert(index + 1, block);
        Ok(id)
    }

    fn block(&self, id: BlockId) -> Option<BlockSnapshot> {
        self.blocks
            .borrow()
            .iter()
            .find(|block| block.id == id)
            .cloned()
    }
}
