use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::buffer_manager::BufferManager;
use crate::file_manager::FileManager;
use crate::lock_table::LockTable;
use crate::log_manager::LogManager;
use crate::transaction::{Transaction, TransactionError};

/// Configuration of a storage root.
pub struct DbConfig {
    pub dir_path: PathBuf,
    pub log_file_name: String,
    pub blk_size: usize,
    pub buf_size: usize,
}

/// Db is the storage root: it owns the managers shared by every transaction
/// and issues transaction numbers.
pub struct Db {
    fm: Arc<FileManager>,
    lm: Arc<LogManager>,
    bm: Arc<BufferManager>,
    lock_tbl: Arc<LockTable>,
    next_tx_num: AtomicI64,
}

impl Db {
    pub fn new(config: DbConfig) -> Result<Self, TransactionError> {
        let fm = Arc::new(FileManager::new(config.dir_path, config.blk_size)?);
        let lm = Arc::new(LogManager::new(Arc::clone(&fm), &config.log_file_name)?);
        let bm = Arc::new(BufferManager::new(
            Arc::clone(&fm),
            Arc::clone(&lm),
            config.buf_size,
        )?);

        Ok(Self {
            fm,
            lm,
            bm,
            lock_tbl: Arc::new(LockTable::new()),
            next_tx_num: AtomicI64::new(0),
        })
    }

    pub fn new_transaction(&self) -> Result<Transaction, TransactionError> {
        let tx_num = self.next_tx_num.fetch_add(1, Ordering::SeqCst) + 1;
        Transaction::new(
            tx_num,
            Arc::clone(&self.fm),
            Arc::clone(&self.lm),
            Arc::clone(&self.bm),
            Arc::clone(&self.lock_tbl),
        )
    }

    pub fn blk_size(&self) -> usize {
        self.fm.blk_size()
    }
}
