use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::block_id::BlockId;
use crate::file_manager::FileManager;
use crate::log_manager::{LogError, LogManager, Lsn, LSN_NIL};
use crate::log_record::{TxNum, TX_NUM_NIL};
use crate::page::{Page, PageError};

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("buffer is unassigned")]
    Unassigned,
    #[error("the current pin count is less than or equal to 0")]
    NegativePinCounter,
    #[error("a transaction number must be a non-nil value")]
    NilTxNum,
    #[error("pinning timed out")]
    PinTimeout,
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A buffer is a page frame paired with at most one block at a time. Frames
/// are allocated once at pool construction and reassigned over their life.
pub struct Buffer {
    fm: Arc<FileManager>,
    lm: Arc<LogManager>,
    pub(crate) page: Page,
    blk: Option<BlockId>,
    modified: bool,
    tx_num: TxNum,
    lsn: Lsn,
    pins: u32,
}

impl Buffer {
    pub(crate) fn new(fm: Arc<FileManager>, lm: Arc<LogManager>) -> Result<Self, BufferError> {
        let page = Page::new(fm.blk_size())?;
        Ok(Self {
            fm,
            lm,
            page,
            blk: None,
            modified: false,
            tx_num: TX_NUM_NIL,
            lsn: LSN_NIL,
            pins: 0,
        })
    }

    pub fn blk(&self) -> Option<&BlockId> {
        self.blk.as_ref()
    }

    pub(crate) fn tx_num(&self) -> TxNum {
        self.tx_num
    }

    /// Mark the buffer dirty on behalf of a transaction. An `lsn` of
    /// [`LSN_NIL`] means the change produced no log record; the previously
    /// tracked LSN is kept so an earlier logged change stays covered.
    pub(crate) fn modify(&mut self, tx_num: TxNum, lsn: Lsn) -> Result<(), BufferError> {
        if tx_num <= TX_NUM_NIL {
            return Err(BufferError::NilTxNum);
        }
        self.modified = true;
        self.tx_num = tx_num;
        if lsn > LSN_NIL {
            self.lsn = lsn;
        }
        Ok(())
    }

    pub(crate) fn pinned(&self) -> bool {
        self.pins > 0
    }

    /// Load a different block into this frame, flushing the old contents if
    /// they were modified.
    pub(crate) fn assign(&mut self, blk: BlockId) -> Result<(), BufferError> {
        self.flush()?;
        self.fm.read(&blk, &mut self.page)?;
        self.blk = Some(blk);
        self.pins = 0;
        Ok(())
    }

    /// Write the buffer back to disk if it is dirty, flushing the log up to
    /// the buffer's LSN first (the write-ahead rule).
    pub(crate) fn flush(&mut self) -> Result<(), BufferError> {
        if !self.modified {
            return Ok(());
        }
        let blk = self.blk.as_ref().ok_or(BufferError::Unassigned)?;
        self.lm.flush(self.lsn)?;
        self.fm.write(blk, &self.page)?;
        self.modified = false;
        self.tx_num = TX_NUM_NIL;
        Ok(())
    }

    pub(crate) fn pin(&mut self) -> Result<(), BufferError> {
        if self.blk.is_none() {
            return Err(BufferError::Unassigned);
        }
        self.pins += 1;
        Ok(())
    }

    pub(crate) fn unpin(&mut self) -> Result<(), BufferError> {
        if self.blk.is_none() {
            return Err(BufferError::Unassigned);
        }
        if self.pins == 0 {
            return Err(BufferError::NegativePinCounter);
        }
        self.pins -= 1;
        Ok(())
    }
}
