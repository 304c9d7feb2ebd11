use super::constant::Constant;
use super::scan::{Scan, ScanError, Scannable};

/// ProductScan is the cartesian product of two scans: for every record of
/// the left scan it yields every record of the right one.
pub struct ProductScan {
    lhs: Box<Scan>,
    rhs: Box<Scan>,
}

impl ProductScan {
    pub fn new(lhs: Box<Scan>, rhs: Box<Scan>) -> Result<Self, ScanError> {
        let mut scan = Self { lhs, rhs };
        scan.before_first()?;
        Ok(scan)
    }
}

impl Scannable for ProductScan {
    fn before_first(&mut self) -> Result<(), ScanError> {
        self.lhs.before_first()?;
        self.lhs.next()?;
        self.rhs.before_first()
    }

    fn next(&mut self) -> Result<bool, ScanError> {
        if self.rhs.next()? {
            return Ok(true);
        }
        // The right side is exhausted: rewind it and advance the left side.
        self.rhs.before_first()?;
        Ok(self.rhs.next()? && self.lhs.next()?)
    }

    fn read_i64(&self, field_name: &str) -> Result<i64, ScanError> {
        if self.lhs.contains(field_name) {
            self.lhs.read_i64(field_name)
        } else {
            self.rhs.read_i64(field_name)
        }
    }

    fn read_u64(&self, field_name: &str) -> Result<u64, ScanError> {
        if self.lhs.contains(field_name) {
            self.lhs.read_u64(field_name)
        } else {
            self.rhs.read_u64(field_name)
        }
    }

    fn read_string(&self, field_name: &str) -> Result<String, ScanError> {
        if self.lhs.contains(field_name) {
            self.lhs.read_string(field_name)
        } else {
            self.rhs.read_string(field_name)
        }
    }

    fn read(&self, field_name: &str) -> Result<Constant, ScanError> {
        if self.lhs.contains(field_name) {
            self.lhs.read(field_name)
        } else {
            self.rhs.read(field_name)
        }
    }

    fn contains(&self, field_name: &str) -> bool {
        self.lhs.contains(field_name) || self.rhs.contains(field_name)
    }

    fn close(&mut self) -> Result<(), ScanError> {
        self.lhs.close()?;
        self.rhs.close()
    }
}
