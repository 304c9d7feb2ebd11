use thiserror::Error;

use super::constant::Constant;
use super::product_scan::ProductScan;
use super::project_scan::ProjectScan;
use super::select_scan::SelectScan;
use crate::rid::Rid;
use crate::table_scan::TableScan;
use crate::transaction::TransactionError;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Tx(#[from] TransactionError),
    #[error("a scan does not contain a field: {0}")]
    UnknownField(String),
    #[error("a scan is not updatable")]
    NotUpdatable,
    #[error("a scan has no current record")]
    NoCurrentRecord,
}

/// The relational operators, as one variant per operator. Plans build trees
/// of these; the leaves are table scans.
pub enum Scan {
    Table(TableScan),
    Select(SelectScan),
    Project(ProjectScan),
    Product(ProductScan),
}

/// A cursor over a stream of records.
pub trait Scannable {
    /// Position before the first record, so `next` moves onto it.
    fn before_first(&mut self) -> Result<(), ScanError>;

    /// Move to the next record, returning false when the stream is done.
    fn next(&mut self) -> Result<bool, ScanError>;

    fn read_i64(&self, field_name: &str) -> Result<i64, ScanError>;
    fn read_u64(&self, field_name: &str) -> Result<u64, ScanError>;
    fn read_string(&self, field_name: &str) -> Result<String, ScanError>;
    fn read(&self, field_name: &str) -> Result<Constant, ScanError>;
    fn contains(&self, field_name: &str) -> bool;

    /// Release the scan's pins. Scans also close on drop; call this to see
    /// errors.
    fn close(&mut self) -> Result<(), ScanError>;
}

/// A scan whose current record can be changed. Only table scans and the
/// select scans above them are updatable.
pub trait UpdateScannable: Scannable {
    fn write_i64(&mut self, field_name: &str, val: i64) -> Result<(), ScanError>;
    fn write_u64(&mut self, field_name: &str, val: u64) -> Result<(), ScanError>;
    fn write_string(&mut self, field_name: &str, val: &str) -> Result<(), ScanError>;
    fn write(&mut self, field_name: &str, val: &Constant) -> Result<(), ScanError>;
    fn insert(&mut self) -> Result<(), ScanError>;
    fn delete(&mut self) -> Result<(), ScanError>;
    fn rid(&self) -> Result<Rid, ScanError>;
    fn move_to_rid(&mut self, rid: Rid) -> Result<(), ScanError>;
}

impl Scannable for Scan {
    fn before_first(&mut self) -> Result<(), ScanError> {
        match self {
            Scan::Table(scan) => scan.before_first(),
            Scan::Select(scan) => scan.before_first(),
            Scan::Project(scan) => scan.before_first(),
            Scan::Product(scan) => scan.before_first(),
        }
    }

    fn next(&mut self) -> Result<bool, ScanError> {
        match self {
            Scan::Table(scan) => scan.next(),
            Scan::Select(scan) => scan.next(),
            Scan::Project(scan) => scan.next(),
            Scan::Product(scan) => scan.next(),
        }
    }

    fn read_i64(&self, field_name: &str) -> Result<i64, ScanError> {
        match self {
            Scan::Table(scan) => scan.read_i64(field_name),
            Scan::Select(scan) => scan.read_i64(field_name),
            Scan::Project(scan) => scan.read_i64(field_name),
            Scan::Product(scan) => scan.read_i64(field_name),
        }
    }

    fn read_u64(&self, field_name: &str) -> Result<u64, ScanError> {
        match self {
            Scan::Table(scan) => scan.read_u64(field_name),
            Scan::Select(scan) => scan.read_u64(field_name),
            Scan::Project(scan) => scan.read_u64(field_name),
            Scan::Product(scan) => scan.read_u64(field_name),
        }
    }

    fn read_string(&self, field_name: &str) -> Result<String, ScanError> {
        match self {
            Scan::Table(scan) => scan.read_string(field_name),
            Scan::Select(scan) => scan.read_string(field_name),
            Scan::Project(scan) => scan.read_string(field_name),
            Scan::Product(scan) => scan.read_string(field_name),
        }
    }

    fn read(&self, field_name: &str) -> Result<Constant, ScanError> {
        match self {
            Scan::Table(scan) => scan.read(field_name),
            Scan::Select(scan) => scan.read(field_name),
            Scan::Project(scan) => scan.read(field_name),
            Scan::Product(scan) => scan.read(field_name),
        }
    }

    fn contains(&self, field_name: &str) -> bool {
        match self {
            Scan::Table(scan) => scan.contains(field_name),
            Scan::Select(scan) => scan.contains(field_name),
            Scan::Project(scan) => scan.contains(field_name),
            Scan::Product(scan) => scan.contains(field_name),
        }
    }

    fn close(&mut self) -> Result<(), ScanError> {
        match self {
            Scan::Table(scan) => scan.close(),
            Scan::Select(scan) => scan.close(),
            Scan::Project(scan) => scan.close(),
            Scan::Product(scan) => scan.close(),
        }
    }
}

impl UpdateScannable for Scan {
    fn write_i64(&mut self, field_name: &str, val: i64) -> Result<(), ScanError> {
        match self {
            Scan::Table(scan) => scan.write_i64(field_name, val),
            Scan::Select(scan) => scan.write_i64(field_name, val),
            _ => Err(ScanError::NotUpdatable),
        }
    }

    fn write_u64(&mut self, field_name: &str, val: u64) -> Result<(), ScanError> {
        match self {
            Scan::Table(scan) => scan.write_u64(field_name, val),
            Scan::Select(scan) => scan.write_u64(field_name, val),
            _ => Err(ScanError::NotUpdatable),
        }
    }

    fn write_string(&mut self, field_name: &str, val: &str) -> Result<(), ScanError> {
        match self {
            Scan::Table(scan) => scan.write_string(field_name, val),
            Scan::Select(scan) => scan.write_string(field_name, val),
            _ => Err(ScanError::NotUpdatable),
        }
    }

    fn write(&mut self, field_name: &str, val: &Constant) -> Result<(), ScanError> {
        match self {
            Scan::Table(scan) => scan.write(field_name, val),
            Scan::Select(scan) => scan.write(field_name, val),
            _ => Err(ScanError::NotUpdatable),
        }
    }

    fn insert(&mut self) -> Result<(), ScanError> {
        match self {
            Scan::Table(scan) => scan.insert(),
            Scan::Select(scan) => scan.insert(),
            _ => Err(ScanError::NotUpdatable),
        }
    }

    fn delete(&mut self) -> Result<(), ScanError> {
        match self {
            Scan::Table(scan) => scan.delete(),
            Scan::Select(scan) => scan.delete(),
            _ => Err(ScanError::NotUpdatable),
        }
    }

    fn rid(&self) -> Result<Rid, ScanError> {
        match self {
            Scan::Table(scan) => scan.rid(),
            Scan::Select(scan) => scan.rid(),
            _ => Err(ScanError::NotUpdatable),
        }
    }

    fn move_to_rid(&mut self, rid: Rid) -> Result<(), ScanError> {
        match self {
            Scan::Table(scan) => scan.move_to_rid(rid),
            Scan::Select(scan) => scan.move_to_rid(rid),
            _ => Err(ScanError::NotUpdatable),
        }
    }
}
