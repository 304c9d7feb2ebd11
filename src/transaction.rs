use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::block_id::BlockId;
use crate::buffer_list::BufferList;
use crate::buffer_manager::{BufferError, BufferManager};
use crate::concurrency_manager::ConcurrencyManager;
use crate::file_manager::FileManager;
use crate::lock_table::{LockError, LockTable};
use crate::log_manager::{LogError, LogManager, LSN_NIL};
use crate::log_record::TxNum;
use crate::page::PageError;
use crate::recovery_manager::RecoveryManager;

/// The deadline every lock acquisition gets by default.
const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// The synthetic block number transactions lock to serialise extension of a
/// file.
const END_OF_FILE: i64 = -1;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("failed to encode a log record: {0}")]
    Encode(#[from] bincode::Error),
    #[error("buffer was not found: block: {0}")]
    BufferNotFound(BlockId),
}

/// Transaction is the user-facing handle over the storage engine. All data
/// access goes through it: every read takes a shared lock, every write an
/// exclusive lock, and locks are only released at commit or rollback.
///
/// A transaction is used by one thread at a time; the managers it shares
/// with other transactions synchronise internally.
// TODO: roll back on drop so an abandoned transaction releases its locks
pub struct Transaction {
    tx_num: TxNum,
    fm: Arc<FileManager>,
    bm: Arc<BufferManager>,
    cm: ConcurrencyManager,
    rm: RecoveryManager,
    bl: BufferList,
    lock_timeout: Duration,
}

impl Transaction {
    pub(crate) fn new(
        tx_num: TxNum,
        fm: Arc<FileManager>,
        lm: Arc<LogManager>,
        bm: Arc<BufferManager>,
        lock_tbl: Arc<LockTable>,
    ) -> Result<Self, TransactionError> {
        let rm = RecoveryManager::new(lm, Arc::clone(&bm), tx_num)?;
        log::trace!("transaction #{} started", tx_num);

        Ok(Self {
            tx_num,
            fm,
            bm: Arc::clone(&bm),
            cm: ConcurrencyManager::new(lock_tbl),
            rm,
            bl: BufferList::new(bm),
            lock_timeout: LOCK_TIMEOUT,
        })
    }

    pub fn tx_num(&self) -> TxNum {
        self.tx_num
    }

    /// Shorten or lengthen the deadline applied to this transaction's lock
    /// waits.
    pub fn set_lock_timeout(&mut self, timeout: Duration) {
        self.lock_timeout = timeout;
    }

    pub fn commit(&mut self) -> Result<(), TransactionError> {
        self.rm.commit()?;
        self.cm.release();
        self.bl.unpin_all()?;
        log::trace!("transaction #{} committed", self.tx_num);
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<(), TransactionError> {
        let rm = self.rm.clone();
        rm.rollback(self)?;
        self.cm.release();
        self.bl.unpin_all()?;
        log::trace!("transaction #{} rolled back", self.tx_num);
        Ok(())
    }

    /// Run crash recovery. Call on a fresh transaction before normal work
    /// resumes.
    pub fn recover(&mut self) -> Result<(), TransactionError> {
        self.bm.flush_all(self.tx_num)?;
        let rm = self.rm.clone();
        rm.recover(self)
    }

    pub fn pin(&mut self, blk: &BlockId) -> Result<(), TransactionError> {
        self.bl.pin(blk)?;
        Ok(())
    }

    pub fn unpin(&mut self, blk: &BlockId) -> Result<(), TransactionError> {
        if !self.bl.unpin(blk)? {
            return Err(TransactionError::BufferNotFound(blk.clone()));
        }
        Ok(())
    }

    pub fn read_i64(&mut self, blk: &BlockId, offset: usize) -> Result<i64, TransactionError> {
        self.cm.s_lock(blk.hash(), self.deadline())?;
        let buf = self.buffer(blk)?;
        let guard = buf.read().unwrap();
        let (v, _) = guard.page.read_i64(offset)?;
        Ok(v)
    }

    pub fn read_u64(&mut self, blk: &BlockId, offset: usize) -> Result<u64, TransactionError> {
        self.cm.s_lock(blk.hash(), self.deadline())?;
        let buf = self.buffer(blk)?;
        let guard = buf.read().unwrap();
        let (v, _) = guard.page.read_u64(offset)?;
        Ok(v)
    }

    pub fn read_string(&mut self, blk: &BlockId, offset: usize) -> Result<String, TransactionError> {
        self.cm.s_lock(blk.hash(), self.deadline())?;
        let buf = self.buffer(blk)?;
        let guard = buf.read().unwrap();
        let (v, _) = guard.page.read_string(offset)?;
        Ok(v)
    }

    /// Write an int64 at `offset` of a pinned block. When `log` is true the
    /// pre-image is appended to the log first so the change can be undone.
    pub fn write_i64(
        &mut self,
        blk: &BlockId,
        offset: usize,
        val: i64,
        log: bool,
    ) -> Result<(), TransactionError> {
        self.cm.x_lock(blk.hash(), self.deadline())?;
        let buf = self.buffer(blk)?;
        let mut guard = buf.write().unwrap();
        let lsn = if log {
            self.rm.log_set_i64(&guard, offset)?
        } else {
            LSN_NIL
        };
        guard.page.write_i64(offset, val)?;
        guard.modify(self.tx_num, lsn)?;
        Ok(())
    }

    pub fn write_u64(
        &mut self,
        blk: &BlockId,
        offset: usize,
        val: u64,
        log: bool,
    ) -> Result<(), TransactionError> {
        self.cm.x_lock(blk.hash(), self.deadline())?;
        let buf = self.buffer(blk)?;
        let mut guard = buf.write().unwrap();
        let lsn = if log {
            self.rm.log_set_u64(&guard, offset)?
        } else {
            LSN_NIL
        };
        guard.page.write_u64(offset, val)?;
        guard.modify(self.tx_num, lsn)?;
        Ok(())
    }

    pub fn write_string(
        &mut self,
        blk: &BlockId,
        offset: usize,
        val: &str,
        log: bool,
    ) -> Result<(), TransactionError> {
        self.cm.x_lock(blk.hash(), self.deadline())?;
        let buf = self.buffer(blk)?;
        let mut guard = buf.write().unwrap();
        let lsn = if log {
            self.rm.log_set_string(&guard, offset)?
        } else {
            LSN_NIL
        };
        guard.page.write_string(offset, val)?;
        guard.modify(self.tx_num, lsn)?;
        Ok(())
    }

    /// The number of blocks in a file, under a shared lock on the file's
    /// end-of-file marker.
    pub fn block_count(&mut self, file_name: &str) -> Result<i64, TransactionError> {
        let eof = BlockId::new(file_name, END_OF_FILE);
        self.cm.s_lock(eof.hash(), self.deadline())?;
        Ok(self.fm.block_count(file_name)?)
    }

    /// Extend a file by one zeroed block, under an exclusive lock on the
    /// file's end-of-file marker so concurrent extensions cannot race.
    pub fn alloc_block(&mut self, file_name: &str) -> Result<BlockId, TransactionError> {
        let eof = BlockId::new(file_name, END_OF_FILE);
        self.cm.x_lock(eof.hash(), self.deadline())?;
        Ok(self.fm.alloc(file_name)?)
    }

    pub fn block_size(&self) -> usize {
        self.fm.blk_size()
    }

    fn buffer(
        &self,
        blk: &BlockId,
    ) -> Result<Arc<std::sync::RwLock<crate::buffer::Buffer>>, TransactionError> {
        self.bl
            .buffer(blk.hash())
            .ok_or_else(|| TransactionError::BufferNotFound(blk.clone()))
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.lock_timeout
    }
}
