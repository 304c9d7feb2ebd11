use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::block_id::BlockHash;
use crate::lock_table::{LockError, LockTable};

#[derive(Clone, Copy, PartialEq, Eq)]
enum LockMode {
    Shared,
    Exclusive,
}

/// ConcurrencyManager tracks the locks held by a single transaction so that
/// repeated requests are idempotent and everything is released together at
/// commit or rollback (two-phase locking).
///
/// Only the owning transaction touches it, so it needs no synchronisation of
/// its own.
pub struct ConcurrencyManager {
    lock_tbl: Arc<LockTable>,
    locks: HashMap<BlockHash, LockMode>,
}

impl ConcurrencyManager {
    pub fn new(lock_tbl: Arc<LockTable>) -> Self {
        Self {
            lock_tbl,
            locks: HashMap::new(),
        }
    }

    /// Take a shared lock on a block. A no-op if this transaction already
    /// holds any lock on it.
    pub fn s_lock(&mut self, blk: BlockHash, deadline: Instant) -> Result<(), LockError> {
        if self.locks.contains_key(&blk) {
            return Ok(());
        }
        self.lock_tbl.s_lock(blk, deadline)?;
        self.locks.insert(blk, LockMode::Shared);
        Ok(())
    }

    /// Take an exclusive lock on a block, acquiring the shared lock first if
    /// this transaction does not hold it yet.
    pub fn x_lock(&mut self, blk: BlockHash, deadline: Instant) -> Result<(), LockError> {
        if self.locks.get(&blk) == Some(&LockMode::Exclusive) {
            return Ok(());
        }
        self.s_lock(blk, deadline)?;
        self.lock_tbl.x_lock(blk, deadline)?;
        self.locks.insert(blk, LockMode::Exclusive);
        Ok(())
    }

    /// Release every lock this transaction holds.
    pub fn release(&mut self) {
        for (blk, mode) in self.locks.drain() {
            match mode {
                LockMode::Shared => self.lock_tbl.s_unlock(blk),
                LockMode::Exclusive => {
                    // An upgraded lock holds both the shared and the
                    // exclusive lease.
                    self.lock_tbl.s_unlock(blk);
                    self.lock_tbl.x_unlock(blk);
                }
            }
        }
    }
}
