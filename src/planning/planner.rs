use std::sync::{Arc, Mutex};

use super::basic_query_planner::BasicQueryPlanner;
use super::basic_update_planner::BasicUpdatePlanner;
use super::plan::Plan;
use super::PlanError;
use crate::metadata::MetadataManager;
use crate::parser::{parse, Statement};
use crate::transaction::Transaction;

/// Planner turns SQL text into an executable plan (queries) or runs it to
/// completion (updates), dispatching on the parsed statement tree.
pub struct Planner {
    qp: BasicQueryPlanner,
    up: BasicUpdatePlanner,
}

impl Planner {
    pub fn new(mm: Arc<MetadataManager>) -> Self {
        Self {
            qp: BasicQueryPlanner::new(Arc::clone(&mm)),
            up: BasicUpdatePlanner::new(mm),
        }
    }

    /// Plan a SELECT statement. The caller opens the returned plan and
    /// drives the scan.
    pub fn create_query_plan(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        query: &str,
    ) -> Result<Box<dyn Plan>, PlanError> {
        match parse(query)? {
            Statement::Select(stmt) => self.qp.create_plan(tx, &stmt),
            stmt => Err(PlanError::NotAQuery(format!("{:?}", stmt))),
        }
    }

    /// Execute an update statement, returning the number of affected
    /// records.
    pub fn execute_update(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        cmd: &str,
    ) -> Result<usize, PlanError> {
        let stmt = parse(cmd)?;
        self.up.execute(tx, &stmt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::query::Scannable;
    use crate::tests::test_utils::catalog_test_db;

    fn setup() -> (tempfile::TempDir, Arc<Mutex<Transaction>>, Planner) {
        let td = tempdir().unwrap();
        let db = catalog_test_db(&td);
        let tx = Arc::new(Mutex::new(db.new_transaction().unwrap()));
        let mm = Arc::new(MetadataManager::new(true, &tx).unwrap());
        (td, tx, Planner::new(mm))
    }

    #[test]
    fn test_create_insert_select() {
        let (_td, tx, planner) = setup();

        planner
            .execute_update(
                &tx,
                "CREATE TABLE student (sid int, sname varchar(10), grad_year uint)",
            )
            .unwrap();

        for (sid, sname, year) in [(1, "joe", 2021u64), (2, "amy", 2020), (3, "max", 2021)] {
            let n = planner
                .execute_update(
                    &tx,
                    &format!(
                        "INSERT INTO student (sid, sname, grad_year) VALUES ({}, '{}', {})",
                        sid, sname, year
                    ),
                )
                .unwrap();
            assert_eq!(n, 1);
        }

        // The uint column reads back as written.
        let mut plan = planner
            .create_query_plan(&tx, "SELECT sname, grad_year FROM student")
            .unwrap();
        let mut scan = plan.open().unwrap();
        let mut rows = vec![];
        while scan.next().unwrap() {
            rows.push((
                scan.read_string("sname").unwrap(),
                scan.read_u64("grad_year").unwrap(),
            ));
        }
        scan.close().unwrap();
        assert_eq!(
            rows,
            vec![
                ("joe".to_string(), 2021),
                ("amy".to_string(), 2020),
                ("max".to_string(), 2021),
            ]
        );

        let mut plan = planner
            .create_query_plan(&tx, "SELECT sname FROM student WHERE sid = 1")
            .unwrap();
        let mut scan = plan.open().unwrap();
        let mut names = vec![];
        while scan.next().unwrap() {
            names.push(scan.read_string("sname").unwrap());
        }
        scan.close().unwrap();
        assert_eq!(names, vec!["joe"]);

        // Projected-out fields are not readable.
        let mut plan = planner
            .create_query_plan(&tx, "SELECT sname FROM student")
            .unwrap();
        let mut scan = plan.open().unwrap();
        assert!(scan.next().unwrap());
        assert!(scan.read_i64("sid").is_err());
        scan.close().unwrap();

        tx.lock().unwrap().commit().unwrap();
    }

    #[test]
    fn test_delete_and_update() {
        let (_td, tx, planner) = setup();

        planner
            .execute_update(&tx, "CREATE TABLE student (sid int, sname varchar(10))")
            .unwrap();
        for sid in 0..6 {
            planner
                .execute_update(
                    &tx,
                    &format!("INSERT INTO student (sid, sname) VALUES ({}, 'name')", sid),
                )
                .unwrap();
        }

        let n = planner
            .execute_update(&tx, "UPDATE student SET sname = 'bob' WHERE sid = 3")
            .unwrap();
        assert_eq!(n, 1);

        let n = planner
            .execute_update(&tx, "DELETE FROM student WHERE sid = 0")
            .unwrap();
        assert_eq!(n, 1);

        let mut plan = planner
            .create_query_plan(&tx, "SELECT sid, sname FROM student")
            .unwrap();
        let mut scan = plan.open().unwrap();
        let mut rows = vec![];
        while scan.next().unwrap() {
            rows.push((
                scan.read_i64("sid").unwrap(),
                scan.read_string("sname").unwrap(),
            ));
        }
        scan.close().unwrap();
        assert_eq!(
            rows,
            vec![
                (1, "name".to_string()),
                (2, "name".to_string()),
                (3, "bob".to_string()),
                (4, "name".to_string()),
                (5, "name".to_string()),
            ]
        );

        tx.lock().unwrap().commit().unwrap();
    }

    #[test]
    fn test_view_is_expanded() {
        let (_td, tx, planner) = setup();

        planner
            .execute_update(&tx, "CREATE TABLE student (sid int, grad_year int)")
            .unwrap();
        for (sid, year) in [(1, 2021), (2, 2020), (3, 2021)] {
            planner
                .execute_update(
                    &tx,
                    &format!(
                        "INSERT INTO student (sid, grad_year) VALUES ({}, {})",
                        sid, year
                    ),
                )
                .unwrap();
        }
        planner
            .execute_update(
                &tx,
                "CREATE VIEW grads AS SELECT sid FROM student WHERE grad_year = 2021",
            )
            .unwrap();

        let mut plan = planner
            .create_query_plan(&tx, "SELECT sid FROM grads")
            .unwrap();
        let mut scan = plan.open().unwrap();
        let mut sids = vec![];
        while scan.next().unwrap() {
            sids.push(scan.read_i64("sid").unwrap());
        }
        scan.close().unwrap();
        assert_eq!(sids, vec![1, 3]);

        tx.lock().unwrap().commit().unwrap();
    }

    #[test]
    fn test_product_query() {
        let (_td, tx, planner) = setup();

        planner
            .execute_update(&tx, "CREATE TABLE dept (did int, dname varchar(8))")
            .unwrap();
        planner
            .execute_update(&tx, "CREATE TABLE emp (eid int, dept_id int)")
            .unwrap();
        for (did, dname) in [(1, "math"), (2, "cs")] {
            planner
                .execute_update(
                    &tx,
                    &format!("INSERT INTO dept (did, dname) VALUES ({}, '{}')", did, dname),
                )
                .unwrap();
        }
        for (eid, dept_id) in [(10, 1), (11, 2)] {
            planner
                .execute_update(
                    &tx,
                    &format!(
                        "INSERT INTO emp (eid, dept_id) VALUES ({}, {})",
                        eid, dept_id
                    ),
                )
                .unwrap();
        }

        let mut plan = planner
            .create_query_plan(
                &tx,
                "SELECT eid, dname FROM emp, dept WHERE dept_id = did",
            )
            .unwrap();
        let mut scan = plan.open().unwrap();
        let mut rows = vec![];
        while scan.next().unwrap() {
            rows.push((
                scan.read_i64("eid").unwrap(),
                scan.read_string("dname").unwrap(),
            ));
        }
        scan.close().unwrap();
        rows.sort();
        assert_eq!(rows, vec![(10, "math".to_string()), (11, "cs".to_string())]);

        tx.lock().unwrap().commit().unwrap();
    }
}
