use std::sync::{Arc, Mutex};

use super::plan::Plan;
use super::product_plan::ProductPlan;
use super::project_plan::ProjectPlan;
use super::select_plan::SelectPlan;
use super::table_plan::TablePlan;
use super::PlanError;
use crate::metadata::MetadataManager;
use crate::parser::{parse, SelectStatement, Statement};
use crate::transaction::Transaction;

/// BasicQueryPlanner builds the straightforward plan: one table plan per
/// mentioned table (views expanded by parsing their definition), products
/// ordered by estimated block count, then select and project on top.
pub struct BasicQueryPlanner {
    mm: Arc<MetadataManager>,
}

impl BasicQueryPlanner {
    pub fn new(mm: Arc<MetadataManager>) -> Self {
        Self { mm }
    }

    pub fn create_plan(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        stmt: &SelectStatement,
    ) -> Result<Box<dyn Plan>, PlanError> {
        let mut table_plans: Vec<Box<dyn Plan>> = Vec::with_capacity(stmt.tables.len());
        for table in &stmt.tables {
            match self.mm.view_def(tx, table)? {
                Some(def) => {
                    let view_query = match parse(&def)? {
                        Statement::Select(sel) => sel,
                        _ => return Err(PlanError::InvalidViewDef(table.clone())),
                    };
                    table_plans.push(self.create_plan(tx, &view_query)?);
                }
                None => {
                    table_plans.push(Box::new(TablePlan::new(Arc::clone(tx), table, &self.mm)?));
                }
            }
        }

        let mut plan = table_plans.remove(0);
        for next in table_plans {
            // Try both orders and keep the cheaper one.
            let cost_forward = product_cost(&*plan, &*next);
            let cost_backward = product_cost(&*next, &*plan);
            plan = if cost_forward <= cost_backward {
                Box::new(ProductPlan::new(plan, next))
            } else {
                Box::new(ProductPlan::new(next, plan))
            };
        }

        if let Some(pred) = &stmt.predicate {
            plan = Box::new(SelectPlan::new(plan, pred.clone()));
        }

        Ok(Box::new(ProjectPlan::new(plan, stmt.fields.clone())?))
    }
}

fn product_cost(lhs: &dyn Plan, rhs: &dyn Plan) -> i64 {
    lhs.block_count() + lhs.record_count() * rhs.block_count()
}
