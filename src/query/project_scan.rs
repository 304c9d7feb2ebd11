use std::collections::HashSet;

use super::constant::Constant;
use super::scan::{Scan, ScanError, Scannable};

/// ProjectScan narrows an underlying scan to a subset of its fields.
pub struct ProjectScan {
    scan: Box<Scan>,
    fields: HashSet<String>,
}

impl ProjectScan {
    pub fn new(scan: Box<Scan>, fields: Vec<String>) -> Self {
        Self {
            scan,
            fields: fields.into_iter().collect(),
        }
    }

    fn check(&self, field_name: &str) -> Result<(), ScanError> {
        if !self.contains(field_name) {
            return Err(ScanError::UnknownField(field_name.to_string()));
        }
        Ok(())
    }
}

impl Scannable for ProjectScan {
    fn before_first(&mut self) -> Result<(), ScanError> {
        self.scan.before_first()
    }

    fn next(&mut self) -> Result<bool, ScanError> {
        self.scan.next()
    }

    fn read_i64(&self, field_name: &str) -> Result<i64, ScanError> {
        self.check(field_name)?;
        self.scan.read_i64(field_name)
    }

    fn read_u64(&self, field_name: &str) -> Result<u64, ScanError> {
        self.check(field_name)?;
        self.scan.read_u64(field_name)
    }

    fn read_string(&self, field_name: &str) -> Result<String, ScanError> {
        self.check(field_name)?;
        self.scan.read_string(field_name)
    }

    fn read(&self, field_name: &str) -> Result<Constant, ScanError> {
        self.check(field_name)?;
        self.scan.read(field_name)
    }

    fn contains(&self, field_name: &str) -> bool {
        self.fields.contains(field_name)
    }

    fn close(&mut self) -> Result<(), ScanError> {
        self.scan.close()
    }
}
