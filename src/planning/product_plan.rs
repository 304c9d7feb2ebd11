use super::plan::Plan;
use super::PlanError;
use crate::query::{ProductScan, Scan};
use crate::schema::Schema;

/// ProductPlan is the cartesian product of two children. The left child is
/// scanned once, the right child once per left record.
pub struct ProductPlan {
    lhs: Box<dyn Plan>,
    rhs: Box<dyn Plan>,
    schema: Schema,
}

impl ProductPlan {
    pub fn new(lhs: Box<dyn Plan>, rhs: Box<dyn Plan>) -> Self {
        let mut schema = Schema::new();
        schema.add_all(lhs.schema());
        schema.add_all(rhs.schema());

        Self { lhs, rhs, schema }
    }
}

impl Plan for ProductPlan {
    fn open(&mut self) -> Result<Scan, PlanError> {
        let lhs = self.lhs.open()?;
        let rhs = self.rhs.open()?;
        let scan = ProductScan::new(Box::new(lhs), Box::new(rhs))?;
        Ok(Scan::Product(scan))
    }

    fn block_count(&self) -> i64 {
        self.lhs.block_count() + self.lhs.record_count() * self.rhs.block_count()
    }

    fn record_count(&self) -> i64 {
        self.lhs.record_count() * self.rhs.record_count()
    }

    fn distinct_values(&self, field_name: &str) -> i64 {
        if self.lhs.schema().has_field(field_name) {
            self.lhs.distinct_values(field_name)
        } else {
            self.rhs.distinct_values(field_name)
        }
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}
