use tempfile::TempDir;

use crate::db::{Db, DbConfig};

/// Build a database over a fresh temp directory with a small block size so
/// tests exercise block boundaries quickly.
pub fn test_db(td: &TempDir) -> Db {
    Db::new(DbConfig {
        dir_path: td.path().join("data"),
        log_file_name: "wal.log".to_string(),
        blk_size: 400,
        buf_size: 8,
    })
    .unwrap()
}

/// Like [`test_db`] but with blocks big enough for the catalog tables,
/// whose slots outgrow a 400-byte block.
pub fn catalog_test_db(td: &TempDir) -> Db {
    Db::new(DbConfig {
        dir_path: td.path().join("data"),
        log_file_name: "wal.log".to_string(),
        blk_size: 1000,
        buf_size: 10,
    })
    .unwrap()
}
