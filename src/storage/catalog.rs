use crate::storage::schema::{ColumnSchema, ColumnType, TableMetadata};
use crate::types::{
    CATALOG_CLEAN, CATALOG_HEADER_SIZE, COLUMN_SCHEMA_SIZE, INVALID_PAGE_ID, MAX_COLUMN_NAME_LEN,
    MAX_COLUMNS, MAX_TABLE_NAME_LEN, MAX_TABLES, PAGE_SIZE, PageId, TABLE_METADATA_SIZE,
    error::{Result, StorageError},
};

/*
 * Catalog Layout on Disk (always page 0)
 * ┌─────────────────────────────────────────────────────────────────┐
 * │                  CATALOG HEADER (20 bytes)                      │
 * │  table_count(4) | free_page_id(4) | system_page_count(4) |      │
 * │  flags(1) | lsn(4) | reserved(3)                                │
 * ├─────────────────────────────────────────────────────────────────┤
 * │              TABLE METADATA RECORDS (680 bytes each)            │
 * │  name[64] | first_page(4) | last_page(4) | record_count(4) |    │
 * │  free_space_head(4) | column_count(4) |                         │
 * │  columns[16 x (name[32]|type(1)|size(4))] | next_id_block(4)    │
 * └─────────────────────────────────────────────────────────────────┘
 */

/// The single catalog page. Owns the table registry and the page-id
/// allocator state for the whole storage directory.
pub struct CatalogPage {
    pub free_page_id: Option<PageId>,
    pub system_page_count: u32,
    pub is_dirty: bool,
    pub lsn: u32,
    tables: Vec<TableMetadata>,
}

impl CatalogPage {
    pub fn new() -> Self {
        Self {
            free_page_id: None,
            system_page_count: 1, // the catalog page itself
            is_dirty: false,
            lsn: 0,
            tables: Vec::new(),
        }
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn get_table(&self, name: &str) -> Option<&TableMetadata> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// Register a table. Returns false at capacity or when the name is taken.
    pub fn add_table(&mut self, metadata: TableMetadata) -> bool {
        if self.tables.len() >= MAX_TABLES {
            return false;
        }
        if self.get_table(&metadata.name).is_some() {
            return false;
        }
        self.tables.push(metadata);
        self.is_dirty = true;
        self.lsn += 1;
        true
    }

    /// Replace a table's metadata wholesale, matched by name.
    pub fn update_table(&mut self, metadata: &TableMetadata) -> bool {
        let Some(existing) = self
            .tables
            .iter_mut()
            .find(|table| table.name == metadata.name)
        else {
            return false;
        };
        *existing = metadata.clone();
        self.is_dirty = true;
        self.lsn += 1;
        true
    }

    pub fn remove_table(&mut self, name: &str) -> bool {
        let Some(index) = self.tables.iter().position(|table| table.name == name) else {
            return false;
        };
        self.tables.remove(index);
        self.is_dirty = true;
        self.lsn += 1;
        true
    }

    /// Hand out the next page id. Page ids only ever move forward; freed
    /// pages are not recycled.
    pub fn allocate_page_id(&mut self) -> PageId {
        if let Some(page_id) = self.free_page_id {
            self.free_page_id = Some(page_id + 1);
            if page_id >= self.system_page_count {
                self.system_page_count = page_id + 1;
            }
            self.is_dirty = true;
            self.lsn += 1;
            return page_id;
        }

        self.system_page_count += 1;
        self.is_dirty = true;
        self.lsn += 1;
        self.system_page_count
    }

    /// Serialize the catalog to a full page image.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if CATALOG_HEADER_SIZE + self.tables.len() * TABLE_METADATA_SIZE > PAGE_SIZE {
            return Err(StorageError::CatalogOverflow {
                count: self.tables.len(),
            });
        }

        let mut buffer = vec![0u8; PAGE_SIZE];
        let mut offset = 0;

        // Write CATALOG HEADER (20 bytes total)
        // table_count (4 bytes)
        buffer[offset..offset + 4].copy_from_slice(&(self.tables.len() as u32).to_le_bytes());
        offset += 4;

        // free_page_id (4 bytes) - u32::MAX represents None
        let free_page_id = self.free_page_id.unwrap_or(INVALID_PAGE_ID);
        buffer[offset..offset + 4].copy_from_slice(&free_page_id.to_le_bytes());
        offset += 4;

        // system_page_count (4 bytes)
        buffer[offset..offset + 4].copy_from_slice(&self.system_page_count.to_le_bytes());
        offset += 4;

        // flags (1 byte) - the dirty bit never reaches disk
        buffer[offset] = CATALOG_CLEAN;
        offset += 1;

        // lsn (4 bytes)
        buffer[offset..offset + 4].copy_from_slice(&self.lsn.to_le_bytes());
        offset += 4;

        // reserved space (3 bytes) - pad to CATALOG_HEADER_SIZE
        offset = CATALOG_HEADER_SIZE;

        for table in &self.tables {
            write_table_metadata(&mut buffer[offset..offset + TABLE_METADATA_SIZE], table);
            offset += TABLE_METADATA_SIZE;
        }

        Ok(buffer)
    }

    /// Deserialize a catalog page, validating counts, bounds and name fields.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < CATALOG_HEADER_SIZE {
            return Err(StorageError::CorruptCatalog {
                reason: format!("Catalog of {} bytes is smaller than its header", bytes.len()),
            });
        }

        let mut offset = 0;

        // table_count (4 bytes)
        let table_count = u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]) as usize;
        offset += 4;

        // free_page_id (4 bytes)
        let free_page_id_raw = u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]);
        let free_page_id = if free_page_id_raw == INVALID_PAGE_ID {
            None
        } else {
            Some(free_page_id_raw)
        };
        offset += 4;

        // system_page_count (4 bytes)
        let system_page_count = u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]);
        offset += 4;

        // flags (1 byte) - a stale dirty bit on disk is not resurrected
        offset += 1;

        // lsn (4 bytes)
        let lsn = u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]);
        offset += 4;

        // Skip reserved space to reach end of header
        offset = CATALOG_HEADER_SIZE;

        if table_count > MAX_TABLES {
            return Err(StorageError::CorruptCatalog {
                reason: format!("Table count {} exceeds maximum {}", table_count, MAX_TABLES),
            });
        }

        let mut tables = Vec::with_capacity(table_count);
        for _ in 0..table_count {
            if offset + TABLE_METADATA_SIZE > bytes.len() {
                return Err(StorageError::CorruptCatalog {
                    reason: "Table record extends beyond the catalog page".to_string(),
                });
            }
            tables.push(read_table_metadata(
                &bytes[offset..offset + TABLE_METADATA_SIZE],
            )?);
            offset += TABLE_METADATA_SIZE;
        }

        Ok(Self {
            free_page_id,
            system_page_count,
            is_dirty: false, // Freshly loaded catalog is not dirty
            lsn,
            tables,
        })
    }
}

impl Default for CatalogPage {
    fn default() -> Self {
        Self::new()
    }
}

fn write_name_field(buffer: &mut [u8], name: &str) {
    // Validated at construction to fit with a trailing NUL
    let bytes = name.as_bytes();
    buffer[..bytes.len()].copy_from_slice(bytes);
}

fn read_name_field(buffer: &[u8], what: &str) -> Result<String> {
    let end = buffer
        .iter()
        .position(|&byte| byte == 0)
        .unwrap_or(buffer.len());
    String::from_utf8(buffer[..end].to_vec()).map_err(|_| StorageError::CorruptCatalog {
        reason: format!("{} is not valid UTF-8", what),
    })
}

fn write_table_metadata(buffer: &mut [u8], table: &TableMetadata) {
    // name (64 bytes, NUL padded)
    write_name_field(&mut buffer[0..MAX_TABLE_NAME_LEN + 1], &table.name);
    let mut offset = MAX_TABLE_NAME_LEN + 1;

    // first_data_page (4 bytes)
    let first = table.first_data_page.unwrap_or(INVALID_PAGE_ID);
    buffer[offset..offset + 4].copy_from_slice(&first.to_le_bytes());
    offset += 4;

    // last_data_page (4 bytes)
    let last = table.last_data_page.unwrap_or(INVALID_PAGE_ID);
    buffer[offset..offset + 4].copy_from_slice(&last.to_le_bytes());
    offset += 4;

    // record_count (4 bytes)
    buffer[offset..offset + 4].copy_from_slice(&table.record_count.to_le_bytes());
    offset += 4;

    // free_space_head (4 bytes)
    let free_space_head = table.free_space_head.unwrap_or(INVALID_PAGE_ID);
    buffer[offset..offset + 4].copy_from_slice(&free_space_head.to_le_bytes());
    offset += 4;

    // column_count (4 bytes)
    buffer[offset..offset + 4].copy_from_slice(&(table.columns.len() as u32).to_le_bytes());
    offset += 4;

    // columns (16 fixed entries; unused entries stay zeroed)
    for column in &table.columns {
        write_name_field(&mut buffer[offset..offset + MAX_COLUMN_NAME_LEN + 1], &column.name);
        buffer[offset + MAX_COLUMN_NAME_LEN + 1] = column.column_type.as_u8();
        buffer[offset + MAX_COLUMN_NAME_LEN + 2..offset + MAX_COLUMN_NAME_LEN + 6]
            .copy_from_slice(&column.size.to_le_bytes());
        offset += COLUMN_SCHEMA_SIZE;
    }
    offset = MAX_TABLE_NAME_LEN + 1 + 20 + MAX_COLUMNS * COLUMN_SCHEMA_SIZE;

    // next_id_block (4 bytes)
    buffer[offset..offset + 4].copy_from_slice(&table.next_id_block.to_le_bytes());
}

fn read_table_metadata(buffer: &[u8]) -> Result<TableMetadata> {
    let name = read_name_field(&buffer[0..MAX_TABLE_NAME_LEN + 1], "Table name")?;
    let mut offset = MAX_TABLE_NAME_LEN + 1;

    let first_raw = u32::from_le_bytes([
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    ]);
    offset += 4;
    let last_raw = u32::from_le_bytes([
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    ]);
    offset += 4;
    let record_count = u32::from_le_bytes([
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    ]);
    offset += 4;
    let free_space_head_raw = u32::from_le_bytes([
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    ]);
    offset += 4;
    let column_count = u32::from_le_bytes([
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    ]) as usize;
    offset += 4;

    if column_count > MAX_COLUMNS {
        return Err(StorageError::CorruptCatalog {
            reason: format!(
                "Table '{}' claims {} columns, maximum is {}",
                name, column_count, MAX_COLUMNS
            ),
        });
    }

    let mut columns = Vec::with_capacity(column_count);
    for _ in 0..column_count {
        let column_name =
            read_name_field(&buffer[offset..offset + MAX_COLUMN_NAME_LEN + 1], "Column name")?;
        let column_type = ColumnType::from_u8(buffer[offset + MAX_COLUMN_NAME_LEN + 1])?;
        let size = u32::from_le_bytes([
            buffer[offset + MAX_COLUMN_NAME_LEN + 2],
            buffer[offset + MAX_COLUMN_NAME_LEN + 3],
            buffer[offset + MAX_COLUMN_NAME_LEN + 4],
            buffer[offset + MAX_COLUMN_NAME_LEN + 5],
        ]);
        columns.push(ColumnSchema {
            name: column_name,
            column_type,
            size,
        });
        offset += COLUMN_SCHEMA_SIZE;
    }
    offset = MAX_TABLE_NAME_LEN + 1 + 20 + MAX_COLUMNS * COLUMN_SCHEMA_SIZE;

    let next_id_block = u32::from_le_bytes([
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    ]);

    let mut table = TableMetadata::new(name, columns).map_err(|err| match err {
        StorageError::InvalidTableDefinition { reason } => StorageError::CorruptCatalog { reason },
        other => other,
    })?;
    table.first_data_page = if first_raw == INVALID_PAGE_ID {
        None
    } else {
        Some(first_raw)
    };
    table.last_data_page = if last_raw == INVALID_PAGE_ID {
        None
    } else {
        Some(last_raw)
    };
    table.record_count = record_count;
    table.free_space_head = if free_space_head_raw == INVALID_PAGE_ID {
        None
    } else {
        Some(free_space_head_raw)
    };
    table.next_id_block = next_id_block;

    Ok(table)
}
