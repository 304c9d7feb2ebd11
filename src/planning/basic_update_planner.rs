use std::sync::{Arc, Mutex};

use super::plan::Plan;
use super::select_plan::SelectPlan;
use super::table_plan::TablePlan;
use super::PlanError;
use crate::metadata::MetadataManager;
use crate::parser::{
    CreateTableStatement, CreateViewStatement, DeleteStatement, InsertStatement, Statement,
    UpdateStatement,
};
use crate::query::{Constant, Scannable, UpdateScannable};
use crate::schema::FieldType;
use crate::transaction::Transaction;

/// BasicUpdatePlanner executes the data- and schema-changing statements
/// directly against table scans.
pub struct BasicUpdatePlanner {
    mm: Arc<MetadataManager>,
}

impl BasicUpdatePlanner {
    pub fn new(mm: Arc<MetadataManager>) -> Self {
        Self { mm }
    }

    pub fn execute_create_table(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        stmt: &CreateTableStatement,
    ) -> Result<usize, PlanError> {
        self.mm.create_table(tx, &stmt.table, &stmt.schema)?;
        Ok(0)
    }

    pub fn execute_create_view(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        stmt: &CreateViewStatement,
    ) -> Result<usize, PlanError> {
        self.mm
            .create_view(tx, &stmt.view, &stmt.query.to_string())?;
        Ok(0)
    }

    pub fn execute_insert(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        stmt: &InsertStatement,
    ) -> Result<usize, PlanError> {
        let mut plan = TablePlan::new(Arc::clone(tx), &stmt.table, &self.mm)?;
        let schema = plan.schema().clone();
        let mut scan = plan.open()?;

        scan.insert()?;
        for (field, value) in stmt.fields.iter().zip(stmt.values.iter()) {
            let value = coerce(value, schema.field_type(field));
            scan.write(field, &value)?;
        }
        scan.close()?;
        Ok(1)
    }

    pub fn execute_delete(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        stmt: &DeleteStatement,
    ) -> Result<usize, PlanError> {
        let plan = TablePlan::new(Arc::clone(tx), &stmt.table, &self.mm)?;
        let predicate = stmt.predicate.clone().unwrap_or_default();
        let mut scan = SelectPlan::new(Box::new(plan), predicate).open()?;

        let mut count = 0;
        while scan.next()? {
            scan.delete()?;
            count += 1;
        }
        scan.close()?;
        Ok(count)
    }

    pub fn execute_update(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        stmt: &UpdateStatement,
    ) -> Result<usize, PlanError> {
        let plan = TablePlan::new(Arc::clone(tx), &stmt.table, &self.mm)?;
        let field_type = plan.schema().field_type(&stmt.field);
        let predicate = stmt.predicate.clone().unwrap_or_default();
        let mut scan = SelectPlan::new(Box::new(plan), predicate).open()?;

        let mut count = 0;
        while scan.next()? {
            let value = stmt.value.evaluate(&scan)?;
            let value = coerce(&value, field_type);
            scan.write(&stmt.field, &value)?;
            count += 1;
        }
        scan.close()?;
        Ok(count)
    }

    pub fn execute(
        &self,
        tx: &Arc<Mutex<Transaction>>,
        stmt: &Statement,
    ) -> Result<usize, PlanError> {
        match stmt {
            Statement::Insert(s) => self.execute_insert(tx, s),
            Statement::Delete(s) => self.execute_delete(tx, s),
            Statement::Update(s) => self.execute_update(tx, s),
            Statement::CreateTable(s) => self.execute_create_table(tx, s),
            Statement::CreateView(s) => self.execute_create_view(tx, s),
            Statement::Select(_) => Err(PlanError::NotAnUpdate("SELECT".to_string())),
        }
    }
}

/// The parser produces signed integer constants; widen them for unsigned
/// fields so `VALUES (2022)` lands in a uint column.
fn coerce(value: &Constant, ty: Option<FieldType>) -> Constant {
    match (value, ty) {
        (Constant::Int64(v), Some(FieldType::Uint64)) if *v >= 0 => Constant::Uint64(*v as u64),
        _ => value.clone(),
    }
}
