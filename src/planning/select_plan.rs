use super::plan::Plan;
use super::PlanError;
use crate::query::{Predicate, Scan, SelectScan};
use crate::schema::Schema;

/// SelectPlan filters its child by a predicate. Its record estimate divides
/// the child's by the predicate's reduction factor.
pub struct SelectPlan {
    plan: Box<dyn Plan>,
    predicate: Predicate,
}

impl SelectPlan {
    pub fn new(plan: Box<dyn Plan>, predicate: Predicate) -> Self {
        Self { plan, predicate }
    }

    fn reduction_factor(&self) -> i64 {
        let mut factor: i64 = 1;
        for term in self.predicate.terms() {
            let f = match (
                term.lhs().as_field_name(),
                term.rhs().as_field_name(),
            ) {
                (Some(l), Some(r)) => self
                    .plan
                    .distinct_values(l)
                    .max(self.plan.distinct_values(r)),
                (Some(l), None) => self.plan.distinct_values(l),
                (None, Some(r)) => self.plan.distinct_values(r),
                (None, None) => {
                    let same = match (term.lhs().as_constant(), term.rhs().as_constant()) {
                        (Some(l), Some(r)) => l == r,
                        _ => false,
                    };
                    if same {
                        1
                    } else {
                        i64::MAX
                    }
                }
            };
            factor = factor.saturating_mul(f.max(1));
        }
        factor
    }
}

impl Plan for SelectPlan {
    fn open(&mut self) -> Result<Scan, PlanError> {
        let scan = self.plan.open()?;
        Ok(Scan::Select(SelectScan::new(
            Box::new(scan),
            self.predicate.clone(),
        )))
    }

    fn block_count(&self) -> i64 {
        self.plan.block_count()
    }

    fn record_count(&self) -> i64 {
        self.plan.record_count() / self.reduction_factor().max(1)
    }

    fn distinct_values(&self, field_name: &str) -> i64 {
        if self.predicate.equates_with_constant(field_name).is_some() {
            return 1;
        }
        if let Some(other) = self.predicate.equates_with_field(field_name) {
            return self
                .plan
                .distinct_values(field_name)
                .max(self.plan.distinct_values(other));
        }
        self.plan.distinct_values(field_name)
    }

    fn schema(&self) -> &Schema {
        self.plan.schema()
    }
}
