use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::block_id::{BlockHash, BlockId};
use crate::buffer::Buffer;
use crate::buffer_manager::{BufferError, BufferManager};

/// BufferList is a transaction's private ledger of pinned buffers: which
/// buffer holds each block and how many times this transaction pinned it.
pub struct BufferList {
    bm: Arc<BufferManager>,
    buffers: HashMap<BlockHash, Arc<RwLock<Buffer>>>,
    pins: HashMap<BlockHash, usize>,
}

impl BufferList {
    pub fn new(bm: Arc<BufferManager>) -> Self {
        Self {
            bm,
            buffers: HashMap::new(),
            pins: HashMap::new(),
        }
    }

    /// The buffer holding `blk`, if this transaction has it pinned.
    pub fn buffer(&self, blk: BlockHash) -> Option<Arc<RwLock<Buffer>>> {
        self.buffers.get(&blk).cloned()
    }

    pub fn pin(&mut self, blk: &BlockId) -> Result<(), BufferError> {
        let buf = self.bm.pin(blk)?;
        self.buffers.insert(blk.hash(), buf);
        *self.pins.entry(blk.hash()).or_insert(0) += 1;
        Ok(())
    }

    /// Release one local pin; the block-to-buffer mapping is dropped when
    /// the last local pin goes away. Returns false when the block was not
    /// pinned by this transaction.
    pub fn unpin(&mut self, blk: &BlockId) -> Result<bool, BufferError> {
        let buf = match self.buffers.get(&blk.hash()) {
            Some(buf) => Arc::clone(buf),
            None => return Ok(false),
        };
        self.bm.unpin(&buf)?;

        let count = self.pins.get_mut(&blk.hash()).unwrap();
        *count -= 1;
        if *count == 0 {
            self.pins.remove(&blk.hash());
            self.buffers.remove(&blk.hash());
        }
        Ok(true)
    }

    /// Release every pin this transaction holds. Runs at commit and
    /// rollback.
    pub fn unpin_all(&mut self) -> Result<(), BufferError> {
        for (blk, count) in self.pins.drain() {
            let buf = self.buffers.get(&blk).unwrap();
            for _ in 0..count {
                self.bm.unpin(buf)?;
            }
        }
        self.buffers.clear();
        Ok(())
    }

    #[cfg(test)]
    pub fn pin_count(&self, blk: &BlockId) -> usize {
        self.pins.get(&blk.hash()).copied().unwrap_or(0)
    }
}
