use std::sync::{Arc, Mutex};

use crate::block_id::BlockId;
use crate::layout::Layout;
use crate::query::ScanError;
use crate::schema::FieldType;
use crate::transaction::Transaction;

const SLOT_EMPTY: i64 = 0;
const SLOT_USED: i64 = 1;

/// RecordPage views one block as an array of fixed-size slots laid out by a
/// [`Layout`]: a used/free flag followed by one framed value per field.
///
/// The block stays pinned for the life of the record page; the owner unpins
/// it through the transaction when it moves on.
pub struct RecordPage {
    tx: Arc<Mutex<Transaction>>,
    blk: BlockId,
    layout: Layout,
}

impl RecordPage {
    pub fn new(
        tx: Arc<Mutex<Transaction>>,
        blk: BlockId,
        layout: Layout,
    ) -> Result<Self, ScanError> {
        tx.lock().unwrap().pin(&blk)?;
        Ok(Self { tx, blk, layout })
    }

    pub fn blk(&self) -> &BlockId {
        &self.blk
    }

    pub fn read_i64(&self, slot: i64, field_name: &str) -> Result<i64, ScanError> {
        let offset = self.field_offset(slot, field_name)?;
        Ok(self.tx.lock().unwrap().read_i64(&self.blk, offset)?)
    }

    pub fn read_u64(&self, slot: i64, field_name: &str) -> Result<u64, ScanError> {
        let offset = self.field_offset(slot, field_name)?;
        Ok(self.tx.lock().unwrap().read_u64(&self.blk, offset)?)
    }

    pub fn read_string(&self, slot: i64, field_name: &str) -> Result<String, ScanError> {
        let offset = self.field_offset(slot, field_name)?;
        Ok(self.tx.lock().unwrap().read_string(&self.blk, offset)?)
    }

    pub fn write_i64(&mut self, slot: i64, field_name: &str, val: i64) -> Result<(), ScanError> {
        let offset = self.field_offset(slot, field_name)?;
        Ok(self
            .tx
            .lock()
            .unwrap()
            .write_i64(&self.blk, offset, val, true)?)
    }

    pub fn write_u64(&mut self, slot: i64, field_name: &str, val: u64) -> Result<(), ScanError> {
        let offset = self.field_offset(slot, field_name)?;
        Ok(self
            .tx
            .lock()
            .unwrap()
            .write_u64(&self.blk, offset, val, true)?)
    }

    pub fn write_string(&mut self, slot: i64, field_name: &str, val: &str) -> Result<(), ScanError> {
        let offset = self.field_offset(slot, field_name)?;
        Ok(self
            .tx
            .lock()
            .unwrap()
            .write_string(&self.blk, offset, val, true)?)
    }

    /// Mark the slot free. The deletion is logged so it rolls back.
    pub fn delete(&mut self, slot: i64) -> Result<(), ScanError> {
        let offset = self.slot_offset(slot);
        self.tx
            .lock()
            .unwrap()
            .write_i64(&self.blk, offset, SLOT_EMPTY, true)?;
        Ok(())
    }

    /// Reset every slot to free with zeroed fields. Formatting is not
    /// logged: it only ever runs on a freshly allocated block.
    pub fn format(&mut self) -> Result<(), ScanError> {
        let schema = self.layout.schema().clone();
        let mut slot = 0;
        while self.is_valid_slot(slot) {
            let mut tx = self.tx.lock().unwrap();
            tx.write_i64(&self.blk, self.slot_offset(slot), SLOT_EMPTY, false)?;
            for (name, ty) in schema.fields() {
                let offset = self.slot_offset(slot) + self.layout.offset(name).unwrap();
                match ty {
                    FieldType::Int64 => tx.write_i64(&self.blk, offset, 0, false)?,
                    FieldType::Uint64 => tx.write_u64(&self.blk, offset, 0, false)?,
                    FieldType::String(_) => tx.write_string(&self.blk, offset, "", false)?,
                }
            }
            slot += 1;
        }
        Ok(())
    }

    /// Claim the first free slot after `slot`, marking it used. Returns
    /// `None` when the block has no free slot left.
    pub fn insert_after(&mut self, slot: i64) -> Result<Option<i64>, ScanError> {
        match self.search_after(slot, SLOT_EMPTY)? {
            Some(new_slot) => {
                let offset = self.slot_offset(new_slot);
                self.tx
                    .lock()
                    .unwrap()
                    .write_i64(&self.blk, offset, SLOT_USED, true)?;
                Ok(Some(new_slot))
            }
            None => Ok(None),
        }
    }

    /// The next used slot after `slot`, or `None` when the block holds no
    /// more records.
    pub fn next_used_after(&self, slot: i64) -> Result<Option<i64>, ScanError> {
        self.search_after(slot, SLOT_USED)
    }

    fn search_after(&self, slot: i64, flag: i64) -> Result<Option<i64>, ScanError> {
        let mut s = slot + 1;
        while self.is_valid_slot(s) {
            let v = self
                .tx
                .lock()
                .unwrap()
                .read_i64(&self.blk, self.slot_offset(s))?;
            if v == flag {
                return Ok(Some(s));
            }
            s += 1;
        }
        Ok(None)
    }

    fn slot_offset(&self, slot: i64) -> usize {
        slot as usize * self.layout.slot_size()
    }

    fn field_offset(&self, slot: i64, field_name: &str) -> Result<usize, ScanError> {
        let field = self
            .layout
            .offset(field_name)
            .ok_or_else(|| ScanError::UnknownField(field_name.to_string()))?;
        Ok(self.slot_offset(slot) + field)
    }

    fn is_valid_slot(&self, slot: i64) -> bool {
        self.slot_offset(slot + 1) <= self.tx.lock().unwrap().block_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::schema::Schema;
    use crate::tests::test_utils::test_db;

    fn student_layout() -> Layout {
        let mut schema = Schema::new();
        schema
            .add_i64_field("sid")
            .add_string_field("sname", 10)
            .add_u64_field("grad_year");
        Layout::new(schema)
    }

    #[test]
    fn test_insert_read_delete() {
        let td = tempdir().unwrap();
        let db = test_db(&td);
        let tx = Arc::new(Mutex::new(db.new_transaction().unwrap()));

        let blk = tx.lock().unwrap().alloc_block("student.tbl").unwrap();
        let mut rp = RecordPage::new(Arc::clone(&tx), blk.clone(), student_layout()).unwrap();
        rp.format().unwrap();

        // Fill every slot.
        let mut slots = vec![];
        let mut prev = -1;
        while let Some(slot) = rp.insert_after(prev).unwrap() {
            rp.write_i64(slot, "sid", slot).unwrap();
            rp.write_string(slot, "sname", &format!("name{}", slot)).unwrap();
            rp.write_u64(slot, "grad_year", 2000 + slot as u64).unwrap();
            slots.push(slot);
            prev = slot;
        }
        // 400-byte blocks hold three 110-byte slots.
        assert_eq!(slots, vec![0, 1, 2]);

        for slot in &slots {
            assert_eq!(rp.read_i64(*slot, "sid").unwrap(), *slot);
            assert_eq!(rp.read_string(*slot, "sname").unwrap(), format!("name{}", slot));
            assert_eq!(rp.read_u64(*slot, "grad_year").unwrap(), 2000 + *slot as u64);
        }

        // Delete the middle record; iteration skips it, insertion reuses it.
        rp.delete(1).unwrap();
        assert_eq!(rp.next_used_after(-1).unwrap(), Some(0));
        assert_eq!(rp.next_used_after(0).unwrap(), Some(2));
        assert_eq!(rp.next_used_after(2).unwrap(), None);
        assert_eq!(rp.insert_after(-1).unwrap(), Some(1));

        tx.lock().unwrap().commit().unwrap();
    }

    #[test]
    fn test_unknown_field() {
        let td = tempdir().unwrap();
        let db = test_db(&td);
        let tx = Arc::new(Mutex::new(db.new_transaction().unwrap()));

        let blk = tx.lock().unwrap().alloc_block("student.tbl").unwrap();
        let mut rp = RecordPage::new(Arc::clone(&tx), blk, student_layout()).unwrap();
        rp.format().unwrap();

        assert!(matches!(
            rp.read_i64(0, "nope"),
            Err(ScanError::UnknownField(_))
        ));
        tx.lock().unwrap().commit().unwrap();
    }
}
