use crate::storage::schema::{ColumnSchema, ColumnType};
use crate::types::{
    INT_SIZE, MAX_COLUMNS, TUPLE_HEADER_SIZE,
    error::{Result, StorageError},
};

/// A decoded row: one text value per column, in schema order.
pub type Row = Vec<String>;

/// Encode a row of text values against a schema.
///
/// Record layout: a tuple header (field count + one offset slot per column)
/// followed by the field payloads. INT fields store a 4-byte little-endian
/// i32; TEXT fields store a 4-byte length followed by the raw bytes. Offsets
/// are absolute within the record so fields can be reached without walking
/// their predecessors.
pub fn serialize_row(schema: &[ColumnSchema], values: &[String]) -> Result<Vec<u8>> {
    if schema.len() > MAX_COLUMNS {
        return Err(StorageError::InvalidTableDefinition {
            reason: format!("Schema has {} columns, maximum is {}", schema.len(), MAX_COLUMNS),
        });
    }
    if values.len() != schema.len() {
        return Err(StorageError::ColumnCountMismatch {
            expected: schema.len(),
            actual: values.len(),
        });
    }

    let mut offsets = [0usize; MAX_COLUMNS];
    let mut data = vec![0u8; TUPLE_HEADER_SIZE];

    for (i, (column, value)) in schema.iter().zip(values).enumerate() {
        offsets[i] = data.len();
        match column.column_type {
            ColumnType::Int => {
                let parsed: i32 = value.trim().parse().map_err(|_| {
                    StorageError::InvalidIntValue {
                        value: value.clone(),
                    }
                })?;
                data.extend_from_slice(&parsed.to_le_bytes());
            }
            ColumnType::Text => {
                data.extend_from_slice(&(value.len() as u32).to_le_bytes());
                data.extend_from_slice(value.as_bytes());
            }
        }
    }

    // Offsets are stored as u16; anything wider could never fit in a page.
    if data.len() > u16::MAX as usize {
        return Err(StorageError::RecordTooLarge { size: data.len() });
    }

    data[0..2].copy_from_slice(&(schema.len() as u16).to_le_bytes());
    for (i, field_offset) in offsets.iter().take(schema.len()).enumerate() {
        let at = 2 + i * 2;
        data[at..at + 2].copy_from_slice(&(*field_offset as u16).to_le_bytes());
    }

    Ok(data)
}

/// Decode a record back into text values.
///
/// Designed to fail safely on malformed input: a short buffer, a field count
/// that disagrees with the schema, or an offset past the end all stop the
/// decode and yield whatever was read so far rather than reading out of
/// bounds.
pub fn deserialize_row(schema: &[ColumnSchema], data: &[u8]) -> Row {
    let mut values = Vec::with_capacity(schema.len());
    if data.len() < TUPLE_HEADER_SIZE {
        return values;
    }

    let field_count = u16::from_le_bytes([data[0], data[1]]) as usize;
    if field_count != schema.len() || field_count > MAX_COLUMNS {
        return values;
    }

    for (i, column) in schema.iter().enumerate() {
        let at = 2 + i * 2;
        let field_offset = u16::from_le_bytes([data[at], data[at + 1]]) as usize;
        match column.column_type {
            ColumnType::Int => {
                let Some(bytes) = data.get(field_offset..field_offset + INT_SIZE) else {
                    return values;
                };
                let value = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                values.push(value.to_string());
            }
            ColumnType::Text => {
                let Some(len_bytes) = data.get(field_offset..field_offset + INT_SIZE) else {
                    return values;
                };
                let length =
                    u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
                        as usize;
                let text_start = field_offset + INT_SIZE;
                let Some(text) = data.get(text_start..text_start + length) else {
                    return values;
                };
                values.push(String::from_utf8_lossy(text).into_owned());
            }
        }
    }

    values
}
