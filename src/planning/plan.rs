use super::PlanError;
use crate::query::Scan;
use crate::schema::Schema;

/// A node of a query plan tree. Opening a plan materialises the operator
/// pipeline; the remaining methods are the cost estimates the planner uses
/// to pick between equivalent trees.
pub trait Plan {
    fn open(&mut self) -> Result<Scan, PlanError>;

    /// The number of block reads one pass over the scan costs.
    fn block_count(&self) -> i64;

    /// The estimated number of records the scan yields.
    fn record_count(&self) -> i64;

    /// The estimated number of distinct values of a field.
    fn distinct_values(&self, field_name: &str) -> i64;

    fn schema(&self) -> &Schema;
}
