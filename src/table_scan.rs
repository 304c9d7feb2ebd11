use std::sync::{Arc, Mutex};

use crate::block_id::BlockId;
use crate::layout::Layout;
use crate::query::{Constant, ScanError, Scannable, UpdateScannable};
use crate::record_page::RecordPage;
use crate::rid::Rid;
use crate::schema::FieldType;
use crate::transaction::Transaction;

/// TableScan is a cursor over all records of one table, visiting its blocks
/// in order and extending the table file when an insert finds no free slot.
///
/// The table's data lives in `<table_name>.tbl`.
pub struct TableScan {
    tx: Arc<Mutex<Transaction>>,
    layout: Layout,
    record_page: RecordPage,
    file_name: String,
    current_slot: i64,
    is_closed: bool,
}

impl TableScan {
    pub fn new(
        tx: Arc<Mutex<Transaction>>,
        table_name: &str,
        layout: Layout,
    ) -> Result<Self, ScanError> {
        let file_name = format!("{}.tbl", table_name);

        let blk_count = tx.lock().unwrap().block_count(&file_name)?;
        let record_page = if blk_count == 0 {
            // A brand-new table: give it a first, formatted block.
            let blk = tx.lock().unwrap().alloc_block(&file_name)?;
            let mut rp = RecordPage::new(Arc::clone(&tx), blk, layout.clone())?;
            rp.format()?;
            rp
        } else {
            let blk = BlockId::new(&file_name, 0);
            RecordPage::new(Arc::clone(&tx), blk, layout.clone())?
        };

        Ok(Self {
            tx,
            layout,
            record_page,
            file_name,
            current_slot: -1,
            is_closed: false,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    fn at_last_block(&self) -> Result<bool, ScanError> {
        let blk_count = self.tx.lock().unwrap().block_count(&self.file_name)?;
        Ok(self.record_page.blk().blk_num() == blk_count - 1)
    }

    fn move_to_block(&mut self, blk_num: i64) -> Result<(), ScanError> {
        self.close()?;
        let blk = BlockId::new(&self.file_name, blk_num);
        self.record_page = RecordPage::new(Arc::clone(&self.tx), blk, self.layout.clone())?;
        self.is_closed = false;
        self.current_slot = -1;
        Ok(())
    }

    fn move_to_new_block(&mut self) -> Result<(), ScanError> {
        self.close()?;
        let blk = self.tx.lock().unwrap().alloc_block(&self.file_name)?;
        self.record_page = RecordPage::new(Arc::clone(&self.tx), blk, self.layout.clone())?;
        self.record_page.format()?;
        self.is_closed = false;
        self.current_slot = -1;
        Ok(())
    }

    fn current_slot(&self) -> Result<i64, ScanError> {
        if self.current_slot < 0 {
            return Err(ScanError::NoCurrentRecord);
        }
        Ok(self.current_slot)
    }
}

impl Scannable for TableScan {
    fn before_first(&mut self) -> Result<(), ScanError> {
        self.move_to_block(0)
    }

    fn next(&mut self) -> Result<bool, ScanError> {
        loop {
            if let Some(slot) = self.record_page.next_used_after(self.current_slot)? {
                self.current_slot = slot;
                return Ok(true);
            }
            if self.at_last_block()? {
                return Ok(false);
            }
            let next = self.record_page.blk().blk_num() + 1;
            self.move_to_block(next)?;
        }
    }

    fn read_i64(&self, field_name: &str) -> Result<i64, ScanError> {
        self.record_page.read_i64(self.current_slot()?, field_name)
    }

    fn read_u64(&self, field_name: &str) -> Result<u64, ScanError> {
        self.record_page.read_u64(self.current_slot()?, field_name)
    }

    fn read_string(&self, field_name: &str) -> Result<String, ScanError> {
        self.record_page
            .read_string(self.current_slot()?, field_name)
    }

    fn read(&self, field_name: &str) -> Result<Constant, ScanError> {
        match self.layout.schema().field_type(field_name) {
            Some(FieldType::Int64) => self.read_i64(field_name).map(Constant::Int64),
            Some(FieldType::Uint64) => self.read_u64(field_name).map(Constant::Uint64),
            Some(FieldType::String(_)) => self.read_string(field_name).map(Constant::String),
            None => Err(ScanError::UnknownField(field_name.to_string())),
        }
    }

    fn contains(&self, field_name: &str) -> bool {
        self.layout.schema().has_field(field_name)
    }

    fn close(&mut self) -> Result<(), ScanError> {
        if !self.is_closed {
            self.tx.lock().unwrap().unpin(self.record_page.blk())?;
            self.is_closed = true;
        }
        Ok(())
    }
}

impl UpdateScannable for TableScan {
    fn write_i64(&mut self, field_name: &str, val: i64) -> Result<(), ScanError> {
        self.record_page
            .write_i64(self.current_slot()?, field_name, val)
    }

    fn write_u64(&mut self, field_name: &str, val: u64) -> Result<(), ScanError> {
        self.record_page
            .write_u64(self.current_slot()?, field_name, val)
    }

    fn write_string(&mut self, field_name: &str, val: &str) -> Result<(), ScanError> {
        self.record_page
            .write_string(self.current_slot()?, field_name, val)
    }

    fn write(&mut self, field_name: &str, val: &Constant) -> Result<(), ScanError> {
        match val {
            Constant::Int64(v) => self.write_i64(field_name, *v),
            Constant::Uint64(v) => self.write_u64(field_name, *v),
            Constant::String(v) => self.write_string(field_name, v),
        }
    }

    fn insert(&mut self) -> Result<(), ScanError> {
        loop {
            if let Some(slot) = self.record_page.insert_after(self.current_slot)? {
                self.current_slot = slot;
                return Ok(());
            }
            if self.at_last_block()? {
                self.move_to_new_block()?;
            } else {
                let next = self.record_page.blk().blk_num() + 1;
                self.move_to_block(next)?;
            }
        }
    }

    fn delete(&mut self) -> Result<(), ScanError> {
        let slot = self.current_slot()?;
        self.record_page.delete(slot)
    }

    fn rid(&self) -> Result<Rid, ScanError> {
        Ok(Rid::new(self.record_page.blk().blk_num(), self.current_slot()?))
    }

    fn move_to_rid(&mut self, rid: Rid) -> Result<(), ScanError> {
        self.close()?;
        let blk = BlockId::new(&self.file_name, rid.blk_num());
        self.record_page = RecordPage::new(Arc::clone(&self.tx), blk, self.layout.clone())?;
        self.is_closed = false;
        self.current_slot = rid.slot();
        Ok(())
    }
}

impl Drop for TableScan {
    fn drop(&mut self) {
        let _ = self.close();
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
    fn test_insert_scan_delete() {
        let td = tempdir().unwrap();
        let db = test_db(&td);
        let tx = Arc::new(Mutex::new(db.new_transaction().unwrap()));

        let mut ts = TableScan::new(Arc::clone(&tx), "student", student_layout()).unwrap();

        // Enough records to spill over several blocks (3 slots per block).
        for i in 0..20i64 {
            ts.insert().unwrap();
            ts.write_i64("sid", i).unwrap();
            ts.write_string("sname", &format!("name{}", i)).unwrap();
            ts.write_u64("grad_year", 2000 + i as u64).unwrap();
        }

        ts.before_first().unwrap();
        let mut seen = 0;
        while ts.next().unwrap() {
            assert_eq!(ts.read_i64("sid").unwrap(), seen);
            assert_eq!(ts.read_string("sname").unwrap(), format!("name{}", seen));
            assert_eq!(ts.read_u64("grad_year").unwrap(), 2000 + seen as u64);
            seen += 1;
        }
        assert_eq!(seen, 20);

        // Delete the even records.
        ts.before_first().unwrap();
        while ts.next().unwrap() {
            if ts.read_i64("sid").unwrap() % 2 == 0 {
                ts.delete().unwrap();
            }
        }

        ts.before_first().unwrap();
        let mut remaining = vec![];
        while ts.next().unwrap() {
            remaining.push(ts.read_i64("sid").unwrap());
        }
        assert_eq!(remaining, (0..20).filter(|i| i % 2 == 1).collect::<Vec<i64>>());

        ts.close().unwrap();
        tx.lock().unwrap().commit().unwrap();
    }

    #[test]
    fn test_rid_roundtrip() {
        let td = tempdir().unwrap();
        let db = test_db(&td);
        let tx = Arc::new(Mutex::new(db.new_transaction().unwrap()));

        let mut ts = TableScan::new(Arc::clone(&tx), "student", student_layout()).unwrap();
        let mut rids = vec![];
        for i in 0..10i64 {
            ts.insert().unwrap();
            ts.write_i64("sid", i).unwrap();
            rids.push(ts.rid().unwrap());
        }

        for (i, rid) in rids.iter().enumerate().rev() {
            ts.move_to_rid(*rid).unwrap();
            assert_eq!(ts.read_i64("sid").unwrap(), i as i64);
        }

        ts.close().unwrap();
        tx.lock().unwrap().commit().unwrap();
    }

    #[test]
    fn test_read_without_record_fails() {
        let td = tempdir().unwrap();
        let db = test_db(&td);
        let tx = Arc::new(Mutex::new(db.new_transaction().unwrap()));

        let ts = TableScan::new(Arc::clone(&tx), "student", student_layout()).unwrap();
        assert!(matches!(
            ts.read_i64("sid"),
            Err(ScanError::NoCurrentRecord)
        ));
        tx.lock().unwrap().commit().unwrap();
    }
}
