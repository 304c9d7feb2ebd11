use core::fmt;

use xxhash_rust::xxh3::xxh3_64;

/// Stable content hash of a block identity, used as the key of the lock
/// table and of per-transaction buffer lists.
pub type BlockHash = u64;

/// BlockId points to a block's location on disk.
///
/// `blk_num` is `-1` for the synthetic end-of-file block that transactions
/// lock to serialise file extension.
#[derive(Clone, Debug)]
pub struct BlockId {
    file_name: String,
    blk_num: i64,
    hash: BlockHash,
}

impl BlockId {
    pub fn new(file_name: &str, blk_num: i64) -> Self {
        let mut b = Vec::with_capacity(file_name.len() + 8);
        b.extend_from_slice(file_name.as_bytes());
        b.extend_from_slice(&blk_num.to_le_bytes());
        let hash = xxh3_64(&b);

        BlockId {
            file_name: file_name.to_string(),
            blk_num,
            hash,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn blk_num(&self) -> i64 {
        self.blk_num
    }

    pub fn hash(&self) -> BlockHash {
        self.hash
    }

    pub fn previous(&self) -> Option<BlockId> {
        match self.blk_num {
            0 => None,
            _ => Some(BlockId::new(&self.file_name, self.blk_num - 1)),
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}]", self.file_name, self.blk_num)
    }
}

impl PartialEq for BlockId {
    fn eq(&self, other: &Self) -> bool {
        self.file_name == other.file_name && self.blk_num == other.blk_num
    }
}

impl Eq for BlockId {}

impl std::hash::Hash for BlockId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

#[cfg(test)]
mod tests {
    use super::BlockId;

    #[test]
    fn test_hash_is_stable() {
        let a = BlockId::new("student.tbl", 3);
        let b = BlockId::new("student.tbl", 3);
        assert_eq!(a, b);
        assert_eq!(a.hash(), b.hash());

        assert_ne!(a.hash(), BlockId::new("student.tbl", 4).hash());
        assert_ne!(a.hash(), BlockId::new("course.tbl", 3).hash());
    }

    #[test]
    fn test_previous() {
        let blk = BlockId::new("test", 2);
        assert_eq!(blk.previous(), Some(BlockId::new("test", 1)));
        assert_eq!(BlockId::new("test", 0).previous(), None);
    }
}
