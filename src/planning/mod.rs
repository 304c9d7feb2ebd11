mod basic_query_planner;
mod basic_update_planner;
mod plan;
mod planner;
mod product_plan;
mod project_plan;
mod select_plan;
mod table_plan;

use thiserror::Error;

use crate::metadata::MetadataError;
use crate::parser::ParseError;
use crate::query::ScanError;

pub use basic_query_planner::BasicQueryPlanner;
pub use basic_update_planner::BasicUpdatePlanner;
pub use plan::Plan;
pub use planner::Planner;
pub use product_plan::ProductPlan;
pub use project_plan::ProjectPlan;
pub use select_plan::SelectPlan;
pub use table_plan::TablePlan;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("a field was not found: {0}")]
    UnknownField(String),
    #[error("a view must be defined by a select statement: {0}")]
    InvalidViewDef(String),
    #[error("not a query: {0}")]
    NotAQuery(String),
    #[error("not an update statement: {0}")]
    NotAnUpdate(String),
}
