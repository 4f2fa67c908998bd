use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{
    INT_SIZE, MAX_COLUMN_NAME_LEN, MAX_COLUMNS, MAX_TABLE_NAME_LEN, PageId,
    error::{Result, StorageError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Int,
    Text,
}

impl ColumnType {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ColumnType::Int),
            1 => Ok(ColumnType::Text),
            _ => Err(StorageError::CorruptCatalog {
                reason: format!("Unknown column type tag {}", value),
            }),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            ColumnType::Int => 0,
            ColumnType::Text => 1,
        }
    }

    /// Parse a type keyword as written in CLI schemas and SQL.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "INT" => Some(ColumnType::Int),
            "TEXT" => Some(ColumnType::Text),
            _ => None,
        }
    }

    /// On-disk payload size for fixed-width types; 0 for variable-width.
    pub fn fixed_size(&self) -> u32 {
        match self {
            ColumnType::Int => INT_SIZE as u32,
            ColumnType::Text => 0,
        }
    }
}

/// Represents a column definition in a table schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
    pub size: u32,
}

impl ColumnSchema {
    pub fn new(name: String, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            size: column_type.fixed_size(),
        }
    }

    pub fn int(name: &str) -> Self {
        Self::new(name.to_string(), ColumnType::Int)
    }

    pub fn text(name: &str) -> Self {
        Self::new(name.to_string(), ColumnType::Text)
    }
}

/// Per-table catalog record: schema plus the table's data page chain and
/// record-id allocation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    pub first_data_page: Option<PageId>,
    pub last_data_page: Option<PageId>,
    pub record_count: u32,
    pub free_space_head: Option<PageId>, // reserved in the layout, not chained yet
    pub columns: Vec<ColumnSchema>,
    pub next_id_block: u32,
}

impl TableMetadata {
    /// Validate a table definition. Names must fit their fixed on-disk
    /// fields, so oversized names are rejected here instead of silently
    /// truncated at serialization time.
    pub fn new(name: String, columns: Vec<ColumnSchema>) -> Result<Self> {
        if name.is_empty() {
            return Err(StorageError::InvalidTableDefinition {
                reason: "Table name cannot be empty".to_string(),
            });
        }
        if name.len() > MAX_TABLE_NAME_LEN {
            return Err(StorageError::InvalidTableDefinition {
                reason: format!(
                    "Table name '{}' exceeds {} bytes",
                    name, MAX_TABLE_NAME_LEN
                ),
            });
        }
        if name.contains('\0') {
            return Err(StorageError::InvalidTableDefinition {
                reason: "Table name contains a NUL byte".to_string(),
            });
        }
        if columns.is_empty() {
            return Err(StorageError::InvalidTableDefinition {
                reason: "Table needs at least one column".to_string(),
            });
        }
        if columns.len() > MAX_COLUMNS {
            return Err(StorageError::InvalidTableDefinition {
                reason: format!(
                    "Table has {} columns, maximum is {}",
                    columns.len(),
                    MAX_COLUMNS
                ),
            });
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if column.name.is_empty() {
                return Err(StorageError::InvalidTableDefinition {
                    reason: "Column name cannot be empty".to_string(),
                });
            }
            if column.name.len() > MAX_COLUMN_NAME_LEN {
                return Err(StorageError::InvalidTableDefinition {
                    reason: format!(
                        "Column name '{}' exceeds {} bytes",
                        column.name, MAX_COLUMN_NAME_LEN
                    ),
                });
            }
            if column.name.contains('\0') {
                return Err(StorageError::InvalidTableDefinition {
                    reason: format!("Column name '{}' contains a NUL byte", column.name),
                });
            }
            if !seen.insert(column.name.clone()) {
                return Err(StorageError::InvalidTableDefinition {
                    reason: format!("Duplicate column name '{}'", column.name),
                });
            }
        }

        Ok(Self {
            name,
            first_data_page: None,
            last_data_page: None,
            record_count: 0,
            free_space_head: None,
            columns,
            next_id_block: 0,
        })
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }
}
