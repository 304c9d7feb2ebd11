use super::plan::Plan;
use super::PlanError;
use crate::query::{ProjectScan, Scan};
use crate::schema::Schema;

/// ProjectPlan narrows its child to a subset of fields.
pub struct ProjectPlan {
    plan: Box<dyn Plan>,
    schema: Schema,
}

impl ProjectPlan {
    pub fn new(plan: Box<dyn Plan>, fields: Vec<String>) -> Result<Self, PlanError> {
        let mut schema = Schema::new();
        for name in &fields {
            if !plan.schema().has_field(name) {
                return Err(PlanError::UnknownField(name.clone()));
            }
            schema.add_from(name, plan.schema());
        }

        Ok(Self { plan, schema })
    }
}

impl Plan for ProjectPlan {
    fn open(&mut self) -> Result<Scan, PlanError> {
        let scan = self.plan.open()?;
        Ok(Scan::Project(ProjectScan::new(
            Box::new(scan),
            self.schema.field_names(),
        )))
    }

    fn block_count(&self) -> i64 {
        self.plan.block_count()
    }

    fn record_count(&self) -> i64 {
        self.plan.record_count()
    }

    fn distinct_values(&self, field_name: &str) -> i64 {
        self.plan.distinct_values(field_name)
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}
