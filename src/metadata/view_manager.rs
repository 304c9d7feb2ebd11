use std::sync::{Arc, Mutex};

use super::table_manager::{TableManager, MAX_NAME_LEN};
use super::MetadataError;
use crate::query::{Scannable, UpdateScannable};
use crate::schema::Schema;
use crate::table_scan::TableScan;
use crate::transaction::Transaction;

const VIEW_CATALOG: &str = "view_catalog";

/// The longest view definition the catalog can store.
const MAX_VIEW_DEF_LEN: usize = 100;

/// ViewManager stores view definitions as rows of the view catalog.
pub struct ViewManager {
    tm: TableManager,
}

impl ViewManager {
    pub fn new(
        is_new: bool,
        tx: &Arc<Mutex<Transaction>>,
        tm: TableManager,
    ) -> Result<Self, MetadataError> {
        if is_new {
            let mut schema = Schema::new();
            schema
                .add_string_field("view_name", MAX_NAME_LEN)
                .add_string_field("view_def", MAX_VIEW_DEF_LEN);
            tm.create_table(tx, VIEW_CATALOG, &schema)?;
        }

        Ok(Self { tm })
    }

    pub fn create_view(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        view_name: &str,
        view_def: &str,
    ) -> Result<(), MetadataError> {
        let layout = self.tm.layout(tx, VIEW_CATALOG)?;
        let mut view_cat = TableScan::new(Arc::clone(tx), VIEW_CATALOG, layout)?;
        view_cat.insert()?;
        view_cat.write_string("view_name", view_name)?;
        view_cat.write_string("view_def", view_def)?;
        view_cat.close()?;
        Ok(())
    }

    /// The definition recorded for a view, or `None` when no such view
    /// exists.
    pub fn view_def(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        view_name: &str,
    ) -> Result<Option<String>, MetadataError> {
        let layout = self.tm.layout(tx, VIEW_CATALOG)?;
        let mut view_cat = TableScan::new(Arc::clone(tx), VIEW_CATALOG, layout)?;
        let mut def = None;
        while def.is_none() && view_cat.next()? {
            if view_cat.read_string("view_name")? == view_name {
                def = Some(view_cat.read_string("view_def")?);
            }
        }
        view_cat.close()?;
        Ok(def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::tests::test_utils::catalog_test_db;

    #[test]
    fn test_create_and_find_view() {
        let td = tempdir().unwrap();
        let db = catalog_test_db(&td);
        let tx = Arc::new(Mutex::new(db.new_transaction().unwrap()));
        let tm = TableManager::new(true, &tx).unwrap();
        let vm = ViewManager::new(true, &tx, tm).unwrap();

        vm.create_view(&tx, "grads", "SELECT sname FROM student WHERE grad_year = 2021")
            .unwrap();

        assert_eq!(
            vm.view_def(&tx, "grads").unwrap().as_deref(),
            Some("SELECT sname FROM student WHERE grad_year = 2021")
        );
        assert_eq!(vm.view_def(&tx, "nope").unwrap(), None);

        tx.lock().unwrap().commit().unwrap();
    }
}
