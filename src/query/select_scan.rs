use super::constant::Constant;
use super::predicate::Predicate;
use super::scan::{Scan, ScanError, Scannable, UpdateScannable};
use crate::rid::Rid;

/// SelectScan filters an underlying scan down to the records satisfying a
/// predicate. Writes pass through, so an update plan can modify the records
/// a predicate picked out.
pub struct SelectScan {
    scan: Box<Scan>,
    predicate: Predicate,
}

impl SelectScan {
    pub fn new(scan: Box<Scan>, predicate: Predicate) -> Self {
        Self { scan, predicate }
    }
}

impl Scannable for SelectScan {
    fn before_first(&mut self) -> Result<(), ScanError> {
        self.scan.before_first()
    }

    fn next(&mut self) -> Result<bool, ScanError> {
        while self.scan.next()? {
            if self.predicate.is_satisfied(&self.scan)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn read_i64(&self, field_name: &str) -> Result<i64, ScanError> {
        self.scan.read_i64(field_name)
    }

    fn read_u64(&self, field_name: &str) -> Result<u64, ScanError> {
        self.scan.read_u64(field_name)
    }

    fn read_string(&self, field_name: &str) -> Result<String, ScanError> {
        self.scan.read_string(field_name)
    }

    fn read(&self, field_name: &str) -> Result<Constant, ScanError> {
        self.scan.read(field_name)
    }

    fn contains(&self, field_name: &str) -> bool {
        self.scan.contains(field_name)
    }

    fn close(&mut self) -> Result<(), ScanError> {
        self.scan.close()
    }
}

impl UpdateScannable for SelectScan {
    fn write_i64(&mut self, field_name: &str, val: i64) -> Result<(), ScanError> {
        self.scan.write_i64(field_name, val)
    }

    fn write_u64(&mut self, field_name: &str, val: u64) -> Result<(), ScanError> {
        self.scan.write_u64(field_name, val)
    }

    fn write_string(&mut self, field_name: &str, val: &str) -> Result<(), ScanError> {
        self.scan.write_string(field_name, val)
    }

    fn write(&mut self, field_name: &str, val: &Constant) -> Result<(), ScanError> {
        self.scan.write(field_name, val)
    }

    fn insert(&mut self) -> Result<(), ScanError> {
        self.scan.insert()
    }

    fn delete(&mut self) -> Result<(), ScanError> {
        self.scan.delete()
    }

    fn rid(&self) -> Result<Rid, ScanError> {
        self.scan.rid()
    }

    fn move_to_rid(&mut self, rid: Rid) -> Result<(), ScanError> {
        self.scan.move_to_rid(rid)
    }
}
