use thiserror::Error;

use crate::types::{PageId, RecordId};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage not open")]
    StorageNotOpen,

    #[error("Table '{name}' already exists")]
    TableAlreadyExists { name: String },

    #[error("Table '{name}' does not exist")]
    TableNotFound { name: String },

    #[error("Catalog is full ({max} tables)")]
    CatalogFull { max: usize },

    #[error("Invalid table definition: {reason}")]
    InvalidTableDefinition { reason: String },

    #[error("Column count mismatch: expected {expected}, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("Column '{name}' not found in table '{table}'")]
    ColumnNotFound { name: String, table: String },

    #[error("Column index {index} out of bounds")]
    ColumnIndexOutOfBounds { index: usize },

    #[error("Record {record_id} not found in table '{table}'")]
    RecordNotFound { table: String, record_id: RecordId },

    #[error("Record {record_id} in table '{table}' not found or already deleted")]
    RecordNotFoundOrDeleted { table: String, record_id: RecordId },

    #[error("Record of {size} bytes does not fit in an empty page")]
    RecordTooLarge { size: usize },

    #[error("Invalid integer value '{value}'")]
    InvalidIntValue { value: String },

    #[error("Invalid column index for aggregation: {index}")]
    InvalidAggregateColumn { index: usize },

    #[error("Unsupported aggregate operation '{op}'")]
    UnsupportedAggregate { op: String },

    #[error("Invalid page size: expected {expected} bytes, got {actual} bytes")]
    InvalidPageSize { expected: usize, actual: usize },

    #[error("Corrupt page: page_id={page_id}, reason={reason}")]
    CorruptPage { page_id: PageId, reason: String },

    #[error("Corrupt catalog: {reason}")]
    CorruptCatalog { reason: String },

    #[error("Catalog overflow: {count} tables do not fit in the catalog page")]
    CatalogOverflow { count: usize },
}

pub type Result<T> = std::result::Result<T, StorageError>;
