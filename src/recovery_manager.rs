use std::collections::HashSet;
use std::sync::Arc;

use crate::block_id::BlockId;
use crate::buffer::Buffer;
use crate::buffer_manager::BufferManager;
use crate::log_manager::{LogManager, Lsn, LSN_NIL};
use crate::log_record::{LogRecord, TxNum};
use crate::page::PageError;
use crate::transaction::{Transaction, TransactionError};

/// RecoveryManager drives the undo protocol for one transaction: it logs
/// pre-images ahead of every change and replays them backwards on rollback
/// or crash recovery.
///
/// The methods that undo changes re-enter the transaction's own typed
/// writes, so they take the transaction as a parameter instead of owning a
/// back-pointer.
#[derive(Clone)]
pub struct RecoveryManager {
    lm: Arc<LogManager>,
    bm: Arc<BufferManager>,
    tx_num: TxNum,
}

impl RecoveryManager {
    /// Create the manager for a fresh transaction, appending and flushing
    /// its `Start` record.
    pub fn new(
        lm: Arc<LogManager>,
        bm: Arc<BufferManager>,
        tx_num: TxNum,
    ) -> Result<Self, TransactionError> {
        let rm = Self { lm, bm, tx_num };
        rm.append_and_flush(&LogRecord::Start { tx_num })?;
        Ok(rm)
    }

    /// Make the transaction durable: flush its buffers, then log `Commit`
    /// and force the log.
    pub fn commit(&self) -> Result<(), TransactionError> {
        self.bm.flush_all(self.tx_num)?;
        self.append_and_flush(&LogRecord::Commit {
            tx_num: self.tx_num,
        })
    }

    /// Undo every change of this transaction, newest first, then log
    /// `Rollback`.
    pub fn rollback(&self, tx: &mut Transaction) -> Result<(), TransactionError> {
        for rec in self.lm.iter()? {
            let rec = LogRecord::decode(&rec?)?;
            if rec.tx_num() != Some(self.tx_num) {
                continue;
            }
            if matches!(rec, LogRecord::Start { .. }) {
                break;
            }
            self.undo(tx, &rec)?;
        }

        self.bm.flush_all(self.tx_num)?;
        self.append_and_flush(&LogRecord::Rollback {
            tx_num: self.tx_num,
        })
    }

    /// Crash recovery: scan backwards to the last `Checkpoint`, undoing the
    /// changes of every transaction that never logged `Commit` or
    /// `Rollback`, then write a fresh `Checkpoint`.
    pub fn recover(&self, tx: &mut Transaction) -> Result<(), TransactionError> {
        let mut finished: HashSet<TxNum> = HashSet::new();
        for rec in self.lm.iter()? {
            let rec = LogRecord::decode(&rec?)?;
            match rec {
                LogRecord::Checkpoint => break,
                LogRecord::Commit { tx_num } | LogRecord::Rollback { tx_num } => {
                    finished.insert(tx_num);
                }
                LogRecord::Start { .. } => {}
                LogRecord::SetInt64 { tx_num, .. }
                | LogRecord::SetUint64 { tx_num, .. }
                | LogRecord::SetString { tx_num, .. } => {
                    if !finished.contains(&tx_num) {
                        self.undo(tx, &rec)?;
                    }
                }
            }
        }

        self.bm.flush_all(self.tx_num)?;
        self.append_and_flush(&LogRecord::Checkpoint)
    }

    /// Restore the pre-image carried by a `Set*` record. Undo writes are not
    /// themselves logged.
    fn undo(&self, tx: &mut Transaction, rec: &LogRecord) -> Result<(), TransactionError> {
        match rec {
            LogRecord::SetInt64 {
                file_name,
                blk_num,
                offset,
                old_val,
                ..
            } => {
                let blk = BlockId::new(file_name, *blk_num);
                tx.pin(&blk)?;
                tx.write_i64(&blk, *offset, *old_val, false)?;
                tx.unpin(&blk)?;
            }
            LogRecord::SetUint64 {
                file_name,
                blk_num,
                offset,
                old_val,
                ..
            } => {
                let blk = BlockId::new(file_name, *blk_num);
                tx.pin(&blk)?;
                tx.write_u64(&blk, *offset, *old_val, false)?;
                tx.unpin(&blk)?;
            }
            LogRecord::SetString {
                file_name,
                blk_num,
                offset,
                old_val,
                ..
            } => {
                let blk = BlockId::new(file_name, *blk_num);
                tx.pin(&blk)?;
                tx.write_string(&blk, *offset, old_val, false)?;
                tx.unpin(&blk)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Log the pre-image of an int64 write. Returns [`LSN_NIL`] when the
    /// offset holds no data yet, meaning there is nothing to undo.
    pub(crate) fn log_set_i64(&self, buf: &Buffer, offset: usize) -> Result<Lsn, TransactionError> {
        let old_val = match buf.page.read_i64(offset) {
            Ok((v, _)) => v,
            Err(PageError::NoData) => return Ok(LSN_NIL),
            Err(e) => return Err(e.into()),
        };
        let blk = buf.blk().ok_or(crate::buffer::BufferError::Unassigned)?;
        let rec = LogRecord::SetInt64 {
            tx_num: self.tx_num,
            file_name: blk.file_name().to_string(),
            blk_num: blk.blk_num(),
            offset,
            old_val,
        };
        Ok(self.lm.append(&rec.encode()?)?)
    }

    /// Log the pre-image of a uint64 write.
    pub(crate) fn log_set_u64(&self, buf: &Buffer, offset: usize) -> Result<Lsn, TransactionError> {
        let old_val = match buf.page.read_u64(offset) {
            Ok((v, _)) => v,
            Err(PageError::NoData) => return Ok(LSN_NIL),
            Err(e) => return Err(e.into()),
        };
        let blk = buf.blk().ok_or(crate::buffer::BufferError::Unassigned)?;
        let rec = LogRecord::SetUint64 {
            tx_num: self.tx_num,
            file_name: blk.file_name().to_string(),
            blk_num: blk.blk_num(),
            offset,
            old_val,
        };
        Ok(self.lm.append(&rec.encode()?)?)
    }

    /// Log the pre-image of a string write.
    pub(crate) fn log_set_string(
        &self,
        buf: &Buffer,
        offset: usize,
    ) -> Result<Lsn, TransactionError> {
        let old_val = match buf.page.read_string(offset) {
            Ok((v, _)) => v,
            Err(PageError::NoData) => return Ok(LSN_NIL),
            Err(e) => return Err(e.into()),
        };
        let blk = buf.blk().ok_or(crate::buffer::BufferError::Unassigned)?;
        let rec = LogRecord::SetString {
            tx_num: self.tx_num,
            file_name: blk.file_name().to_string(),
            blk_num: blk.blk_num(),
            offset,
            old_val,
        };
        Ok(self.lm.append(&rec.encode()?)?)
    }

    fn append_and_flush(&self, rec: &LogRecord) -> Result<(), TransactionError> {
        let lsn = self.lm.append(&rec.encode()?)?;
        self.lm.flush(lsn)?;
        Ok(())
    }
}
