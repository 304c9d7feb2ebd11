use core::fmt;

/// Rid identifies a record by the block it lives in and its slot there.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rid {
    blk_num: i64,
    slot: i64,
}

impl Rid {
    pub fn new(blk_num: i64, slot: i64) -> Self {
        Self { blk_num, slot }
    }

    pub fn blk_num(&self) -> i64 {
        self.blk_num
    }

    pub fn slot(&self) -> i64 {
        self.slot
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.blk_num, self.slot)
    }
}
