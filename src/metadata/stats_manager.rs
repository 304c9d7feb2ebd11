use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::table_manager::TableManager;
use super::MetadataError;
use crate::query::{Scannable, UpdateScannable};
use crate::table_scan::TableScan;
use crate::transaction::Transaction;

/// How many lookups may reuse cached statistics before a full refresh.
const REFRESH_INTERVAL: usize = 100;

/// Coarse statistics about one table, used by the planner's cost estimates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableStat {
    pub blocks: i64,
    pub records: i64,
    distinct: i64,
}

impl TableStat {
    /// An estimate, not a measurement: distinct-value tracking is not
    /// implemented, so every field gets the same guess.
    pub fn distinct_values(&self, _field_name: &str) -> i64 {
        self.distinct
    }
}

/// StatManager keeps table statistics in memory, recomputing them after
/// every [`REFRESH_INTERVAL`] lookups.
pub struct StatManager {
    tm: TableManager,
    inner: Mutex<StatsCache>,
}

struct StatsCache {
    stats: HashMap<String, TableStat>,
    call_count: usize,
}

impl StatManager {
    pub fn new(tm: TableManager) -> Self {
        Self {
            tm,
            inner: Mutex::new(StatsCache {
                stats: HashMap::new(),
                call_count: 0,
            }),
        }
    }

    pub fn table_stat(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        table_name: &str,
    ) -> Result<TableStat, MetadataError> {
        let mut cache = self.inner.lock().unwrap();

        cache.call_count += 1;
        if cache.call_count > REFRESH_INTERVAL {
            self.refresh(tx, &mut cache)?;
        }

        if let Some(stat) = cache.stats.get(table_name) {
            return Ok(*stat);
        }
        let stat = self.calc_table_stat(tx, table_name)?;
        cache.stats.insert(table_name.to_string(), stat);
        Ok(stat)
    }

    fn refresh(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        cache: &mut StatsCache,
    ) -> Result<(), MetadataError> {
        log::debug!("refreshing table statistics");

        let tab_cat_layout = self.tm.layout(tx, "table_catalog")?;
        let mut tab_cat = TableScan::new(Arc::clone(tx), "table_catalog", tab_cat_layout)?;

        let mut stats = HashMap::new();
        while tab_cat.next()? {
            let table_name = tab_cat.read_string("table_name")?;
            let stat = self.calc_table_stat(tx, &table_name)?;
            stats.insert(table_name, stat);
        }
        tab_cat.close()?;

        cache.stats = stats;
        cache.call_count = 0;
        Ok(())
    }

    fn calc_table_stat(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        table_name: &str,
    ) -> Result<TableStat, MetadataError> {
        let layout = self.tm.layout(tx, table_name)?;
        let mut scan = TableScan::new(Arc::clone(tx), table_name, layout)?;

        let mut blocks = 0;
        let mut records = 0;
        while scan.next()? {
            records += 1;
            blocks = scan.rid()?.blk_num() + 1;
        }
        scan.close()?;

        Ok(TableStat {
            blocks,
            records,
            distinct: 1 + records / 3,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::schema::Schema;
    use crate::tests::test_utils::catalog_test_db;

    #[test]
    fn test_table_stat_counts() {
        let td = tempdir().unwrap();
        let db = catalog_test_db(&td);
        let tx = Arc::new(Mutex::new(db.new_transaction().unwrap()));
        let tm = TableManager::new(true, &tx).unwrap();

        let mut schema = Schema::new();
        schema.add_i64_field("sid").add_string_field("sname", 10);
        tm.create_table(&tx, "student", &schema).unwrap();

        let layout = tm.layout(&tx, "student").unwrap();
        let mut scan = TableScan::new(Arc::clone(&tx), "student", layout).unwrap();
        for i in 0..12i64 {
            scan.insert().unwrap();
            scan.write_i64("sid", i).unwrap();
            scan.write_string("sname", &format!("name{}", i)).unwrap();
        }
        scan.close().unwrap();

        let sm = StatManager::new(tm);
        let stat = sm.table_stat(&tx, "student").unwrap();
        assert_eq!(stat.records, 12);
        assert!(stat.blocks > 0);
        assert_eq!(stat.distinct_values("sid"), 1 + 12 / 3);

        // A second lookup hits the cache.
        assert_eq!(sm.table_stat(&tx, "student").unwrap(), stat);

        tx.lock().unwrap().commit().unwrap();
    }
}
