use std::sync::{Arc, Mutex};

use super::plan::Plan;
use super::PlanError;
use crate::layout::Layout;
use crate::metadata::{MetadataManager, TableStat};
use crate::query::Scan;
use crate::schema::Schema;
use crate::table_scan::TableScan;
use crate::transaction::Transaction;

/// The leaf plan: a full scan of one table.
pub struct TablePlan {
    tx: Arc<Mutex<Transaction>>,
    table_name: String,
    layout: Layout,
    stat: TableStat,
}

impl TablePlan {
    pub fn new(
        tx: Arc<Mutex<Transaction>>,
        table_name: &str,
        mm: &MetadataManager,
    ) -> Result<Self, PlanError> {
        let layout = mm.layout(&tx, table_name)?;
        let stat = mm.table_stat(&tx, table_name)?;

        Ok(Self {
            tx,
            table_name: table_name.to_string(),
            layout,
            stat,
        })
    }
}

impl Plan for TablePlan {
    fn open(&mut self) -> Result<Scan, PlanError> {
        let scan = TableScan::new(Arc::clone(&self.tx), &self.table_name, self.layout.clone())?;
        Ok(Scan::Table(scan))
    }

    fn block_count(&self) -> i64 {
        self.stat.blocks
    }

    fn record_count(&self) -> i64 {
        self.stat.records
    }

    fn distinct_values(&self, field_name: &str) -> i64 {
        self.stat.distinct_values(field_name)
    }

    fn schema(&self) -> &Schema {
        self.layout.schema()
    }
}
