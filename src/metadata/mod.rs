mod metadata_manager;
mod stats_manager;
mod table_manager;
mod view_manager;

use thiserror::Error;

use crate::query::ScanError;

pub use metadata_manager::MetadataManager;
pub use stats_manager::TableStat;
pub use table_manager::TableManager;
pub use view_manager::ViewManager;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("a table was not found in the table_catalog: {0}")]
    TableNotFound(String),
    #[error("invalid field type code: {0}")]
    InvalidFieldType(i64),
}
