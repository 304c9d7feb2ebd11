use std::sync::{Arc, Mutex};

use super::stats_manager::{StatManager, TableStat};
use super::table_manager::TableManager;
use super::view_manager::ViewManager;
use super::MetadataError;
use crate::layout::Layout;
use crate::schema::Schema;
use crate::transaction::Transaction;

/// MetadataManager is the single entry point to the catalogs: tables, views,
/// and statistics.
pub struct MetadataManager {
    tm: TableManager,
    vm: ViewManager,
    sm: StatManager,
}

impl MetadataManager {
    pub fn new(is_new: bool, tx: &Arc<Mutex<Transaction>>) -> Result<Self, MetadataError> {
        let tm = TableManager::new(is_new, tx)?;
        let vm = ViewManager::new(is_new, tx, tm.clone())?;
        let sm = StatManager::new(tm.clone());

        Ok(Self { tm, vm, sm })
    }

    pub fn create_table(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        table_name: &str,
        schema: &Schema,
    ) -> Result<(), MetadataError> {
        self.tm.create_table(tx, table_name, schema)
    }

    pub fn layout(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        table_name: &str,
    ) -> Result<Layout, MetadataError> {
        self.tm.layout(tx, table_name)
    }

    pub fn create_view(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        view_name: &str,
        view_def: &str,
    ) -> Result<(), MetadataError> {
        self.vm.create_view(tx, view_name, view_def)
    }

    pub fn view_def(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        view_name: &str,
    ) -> Result<Option<String>, MetadataError> {
        self.vm.view_def(tx, view_name)
    }

    pub fn table_stat(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        table_name: &str,
    ) -> Result<TableStat, MetadataError> {
        self.sm.table_stat(tx, table_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::query::{Scannable, UpdateScannable};
    use crate::table_scan::TableScan;
    use crate::tests::test_utils::catalog_test_db;

    #[test]
    fn test_metadata_roundtrip() {
        let td = tempdir().unwrap();
        let db = catalog_test_db(&td);
        let tx = Arc::new(Mutex::new(db.new_transaction().unwrap()));
        let mm = MetadataManager::new(true, &tx).unwrap();

        let mut schema = Schema::new();
        schema.add_i64_field("sid").add_string_field("sname", 10);
        mm.create_table(&tx, "student", &schema).unwrap();

        let layout = mm.layout(&tx, "student").unwrap();
        let mut scan = TableScan::new(Arc::clone(&tx), "student", layout).unwrap();
        for i in 0..5i64 {
            scan.insert().unwrap();
            scan.write_i64("sid", i).unwrap();
            scan.write_string("sname", &format!("name{}", i)).unwrap();
        }
        scan.close().unwrap();

        let stat = mm.table_stat(&tx, "student").unwrap();
        assert_eq!(stat.records, 5);

        mm.create_view(&tx, "all_students", "SELECT sid FROM student")
            .unwrap();
        assert_eq!(
            mm.view_def(&tx, "all_students").unwrap().as_deref(),
            Some("SELECT sid FROM student")
        );

        tx.lock().unwrap().commit().unwrap();
    }
}
