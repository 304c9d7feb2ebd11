use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::MetadataError;
use crate::layout::Layout;
use crate::query::{Scannable, UpdateScannable};
use crate::schema::{FieldType, Schema};
use crate::table_scan::TableScan;
use crate::transaction::Transaction;

/// The longest table or field name the catalogs can store.
pub const MAX_NAME_LEN: usize = 64;

const TABLE_CATALOG: &str = "table_catalog";
const FIELD_CATALOG: &str = "field_catalog";

/// TableManager keeps the table and field catalogs: ordinary tables whose
/// records describe every table's layout, including the catalogs' own.
#[derive(Clone)]
pub struct TableManager {
    tab_cat_layout: Layout,
    fld_cat_layout: Layout,
}

impl TableManager {
    /// `is_new` is true when the database is being created; the catalogs
    /// then describe themselves as the first two tables.
    pub fn new(is_new: bool, tx: &Arc<Mutex<Transaction>>) -> Result<Self, MetadataError> {
        let mut tab_cat_schema = Schema::new();
        tab_cat_schema
            .add_string_field("table_name", MAX_NAME_LEN)
            .add_i64_field("slot_size");

        let mut fld_cat_schema = Schema::new();
        fld_cat_schema
            .add_string_field("table_name", MAX_NAME_LEN)
            .add_string_field("field_name", MAX_NAME_LEN)
            .add_i64_field("type")
            .add_i64_field("length")
            .add_i64_field("offset");

        let m = Self {
            tab_cat_layout: Layout::new(tab_cat_schema.clone()),
            fld_cat_layout: Layout::new(fld_cat_schema.clone()),
        };

        if is_new {
            m.create_table(tx, TABLE_CATALOG, &tab_cat_schema)?;
            m.create_table(tx, FIELD_CATALOG, &fld_cat_schema)?;
        }

        Ok(m)
    }

    /// Record a new table and its fields in the catalogs.
    pub fn create_table(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        table_name: &str,
        schema: &Schema,
    ) -> Result<(), MetadataError> {
        let layout = Layout::new(schema.clone());

        let mut tab_cat = TableScan::new(Arc::clone(tx), TABLE_CATALOG, self.tab_cat_layout.clone())?;
        tab_cat.insert()?;
        tab_cat.write_string("table_name", table_name)?;
        tab_cat.write_i64("slot_size", layout.slot_size() as i64)?;
        tab_cat.close()?;

        let mut fld_cat = TableScan::new(Arc::clone(tx), FIELD_CATALOG, self.fld_cat_layout.clone())?;
        for (name, ty) in schema.fields() {
            fld_cat.insert()?;
            fld_cat.write_string("table_name", table_name)?;
            fld_cat.write_string("field_name", name)?;
            fld_cat.write_i64("type", ty.code())?;
            fld_cat.write_i64("length", ty.length() as i64)?;
            fld_cat.write_i64("offset", layout.offset(name).unwrap() as i64)?;
        }
        fld_cat.close()?;

        Ok(())
    }

    /// Reconstruct a table's layout from the catalogs.
    pub fn layout(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        table_name: &str,
    ) -> Result<Layout, MetadataError> {
        let slot_size = {
            let mut tab_cat =
                TableScan::new(Arc::clone(tx), TABLE_CATALOG, self.tab_cat_layout.clone())?;
            let mut found = None;
            while found.is_none() && tab_cat.next()? {
                if tab_cat.read_string("table_name")? == table_name {
                    found = Some(tab_cat.read_i64("slot_size")? as usize);
                }
            }
            tab_cat.close()?;
            found.ok_or_else(|| MetadataError::TableNotFound(table_name.to_string()))?
        };

        let mut schema = Schema::new();
        let mut offsets = HashMap::new();
        {
            let mut fld_cat =
                TableScan::new(Arc::clone(tx), FIELD_CATALOG, self.fld_cat_layout.clone())?;
            while fld_cat.next()? {
                if fld_cat.read_string("table_name")? != table_name {
                    continue;
                }
                let name = fld_cat.read_string("field_name")?;
                let code = fld_cat.read_i64("type")?;
                let length = fld_cat.read_i64("length")? as usize;
                let offset = fld_cat.read_i64("offset")? as usize;

                let ty = FieldType::from_code(code, length)
                    .ok_or(MetadataError::InvalidFieldType(code))?;
                schema.add_field(&name, ty);
                offsets.insert(name, offset);
            }
            fld_cat.close()?;
        }

        Ok(Layout::from_parts(schema, offsets, slot_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::tests::test_utils::catalog_test_db;

    #[test]
    fn test_create_and_find_layout() {
        let td = tempdir().unwrap();
        let db = catalog_test_db(&td);
        let tx = Arc::new(Mutex::new(db.new_transaction().unwrap()));
        let tm = TableManager::new(true, &tx).unwrap();

        let mut schema = Schema::new();
        schema
            .add_i64_field("sid")
            .add_string_field("sname", 10)
            .add_u64_field("grad_year");
        tm.create_table(&tx, "student", &schema).unwrap();

        let layout = tm.layout(&tx, "student").unwrap();
        assert_eq!(layout.schema(), &schema);
        assert_eq!(layout, Layout::new(schema));

        // The catalogs describe themselves.
        let tab_cat_layout = tm.layout(&tx, "table_catalog").unwrap();
        assert!(tab_cat_layout.schema().has_field("slot_size"));

        tx.lock().unwrap().commit().unwrap();
    }

    #[test]
    fn test_unknown_table() {
        let td = tempdir().unwrap();
        let db = catalog_test_db(&td);
        let tx = Arc::new(Mutex::new(db.new_transaction().unwrap()));
        let tm = TableManager::new(true, &tx).unwrap();

        assert!(matches!(
            tm.layout(&tx, "nope"),
            Err(MetadataError::TableNotFound(_))
        ));
        tx.lock().unwrap().commit().unwrap();
    }
}
