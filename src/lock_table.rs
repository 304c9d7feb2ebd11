use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

use thiserror::Error;

use crate::block_id::BlockHash;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockError {
    #[error("lock wait timed out")]
    Timeout,
}

struct LockState {
    shared: usize,
    exclusive: bool,
    waiters: usize,
    // Set when the entry is dropped from the table. A requester that looked
    // the entry up before it was dropped must start over on the live entry.
    retired: bool,
}

struct LockEntry {
    state: Mutex<LockState>,
    cond: Condvar,
}

impl LockEntry {
    fn new() -> Self {
        Self {
            state: Mutex::new(LockState {
                shared: 0,
                exclusive: false,
                waiters: 0,
                retired: false,
            }),
            cond: Condvar::new(),
        }
    }
}

/// LockTable grants shared and exclusive locks at block granularity, keyed
/// by the block's content hash.
///
/// There is no deadlock detection: a request that cannot be granted before
/// the caller's deadline fails with [`LockError::Timeout`] and the caller is
/// expected to roll back.
pub struct LockTable {
    locks: Mutex<HashMap<BlockHash, Arc<LockEntry>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Take a shared lock, waiting until no exclusive holder remains or the
    /// deadline fires.
    pub fn s_lock(&self, blk: BlockHash, deadline: Instant) -> Result<(), LockError> {
        loop {
            let entry = self.entry(blk);
            let mut state = entry.state.lock().unwrap();
            if state.retired {
                continue;
            }
            while state.exclusive {
                log::trace!("waiting for slock on {:#x}", blk);
                state = self.wait(&entry, state, deadline)?;
            }
            state.shared += 1;
            return Ok(());
        }
    }

    /// Take an exclusive lock, waiting until no other holder remains. The
    /// caller must already hold the shared lock (the mode-upgrade protocol),
    /// which is the one shared holder tolerated here.
    pub fn x_lock(&self, blk: BlockHash, deadline: Instant) -> Result<(), LockError> {
        loop {
            let entry = self.entry(blk);
            let mut state = entry.state.lock().unwrap();
            if state.retired {
                continue;
            }
            while state.exclusive || state.shared > 1 {
                log::trace!("waiting for xlock on {:#x}", blk);
                state = self.wait(&entry, state, deadline)?;
            }
            state.exclusive = true;
            return Ok(());
        }
    }

    /// Release one shared hold.
    pub fn s_unlock(&self, blk: BlockHash) {
        let mut locks = self.locks.lock().unwrap();
        let entry = match locks.get(&blk) {
            Some(entry) => Arc::clone(entry),
            None => return,
        };
        let mut state = entry.state.lock().unwrap();
        if state.shared > 0 {
            state.shared -= 1;
        }
        if state.shared == 0 && !state.exclusive && state.waiters == 0 {
            state.retired = true;
            locks.remove(&blk);
        }
        entry.cond.notify_all();
    }

    /// Release the exclusive hold.
    pub fn x_unlock(&self, blk: BlockHash) {
        let mut locks = self.locks.lock().unwrap();
        let entry = match locks.get(&blk) {
            Some(entry) => Arc::clone(entry),
            None => return,
        };
        let mut state = entry.state.lock().unwrap();
        state.exclusive = false;
        if state.shared == 0 && state.waiters == 0 {
            state.retired = true;
            locks.remove(&blk);
        }
        entry.cond.notify_all();
    }

    fn entry(&self, blk: BlockHash) -> Arc<LockEntry> {
        let mut locks = self.locks.lock().unwrap();
        Arc::clone(locks.entry(blk).or_insert_with(|| Arc::new(LockEntry::new())))
    }

    fn wait<'a>(
        &self,
        entry: &'a LockEntry,
        mut state: std::sync::MutexGuard<'a, LockState>,
        deadline: Instant,
    ) -> Result<std::sync::MutexGuard<'a, LockState>, LockError> {
        let now = Instant::now();
        if now >= deadline {
            return Err(LockError::Timeout);
        }
        state.waiters += 1;
        let (mut state, _) = entry.cond.wait_timeout(state, deadline - now).unwrap();
        state.waiters -= 1;
        Ok(state)
    }
}
