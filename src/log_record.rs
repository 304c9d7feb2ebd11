use serde::{Deserialize, Serialize};

/// Transaction number. Issued by the storage root, monotonically from 1.
pub type TxNum = i64;

/// The reserved "no transaction" number.
pub const TX_NUM_NIL: TxNum = 0;

/// A single entry in the write-ahead log.
///
/// The `Set*` variants carry the value the field held *before* the change:
/// the log is an undo log, so recovery only ever needs the pre-image.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub enum LogRecord {
    Checkpoint,
    Start {
        tx_num: TxNum,
    },
    Commit {
        tx_num: TxNum,
    },
    Rollback {
        tx_num: TxNum,
    },
    SetInt64 {
        tx_num: TxNum,
        file_name: String,
        blk_num: i64,
        offset: usize,
        old_val: i64,
    },
    SetUint64 {
        tx_num: TxNum,
        file_name: String,
        blk_num: i64,
        offset: usize,
        old_val: u64,
    },
    SetString {
        tx_num: TxNum,
        file_name: String,
        blk_num: i64,
        offset: usize,
        old_val: String,
    },
}

impl LogRecord {
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(b: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(b)
    }

    /// The transaction the record belongs to, if any. `Checkpoint` belongs
    /// to none.
    pub fn tx_num(&self) -> Option<TxNum> {
        match self {
            LogRecord::Checkpoint => None,
            LogRecord::Start { tx_num }
            | LogRecord::Commit { tx_num }
            | LogRecord::Rollback { tx_num }
            | LogRecord::SetInt64 { tx_num, .. }
            | LogRecord::SetUint64 { tx_num, .. }
            | LogRecord::SetString { tx_num, .. } => Some(*tx_num),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LogRecord;

    #[test]
    fn test_encode_roundtrip() {
        let records = vec![
            LogRecord::Checkpoint,
            LogRecord::Start { tx_num: 7 },
            LogRecord::Commit { tx_num: 7 },
            LogRecord::Rollback { tx_num: 8 },
            LogRecord::SetInt64 {
                tx_num: 7,
                file_name: "data".to_string(),
                blk_num: 3,
                offset: 100,
                old_val: -1900,
            },
            LogRecord::SetUint64 {
                tx_num: 7,
                file_name: "data".to_string(),
                blk_num: 3,
                offset: 150,
                old_val: 2022,
            },
            LogRecord::SetString {
                tx_num: 7,
                file_name: "data".to_string(),
                blk_num: 3,
                offset: 200,
                old_val: "Hello".to_string(),
            },
        ];

        for rec in records {
            let encoded = rec.encode().unwrap();
            assert_eq!(LogRecord::decode(&encoded).unwrap(), rec);
        }
    }
}
