use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::path::{Path, PathBuf};

use crate::executor::predicate::Predicate;
use crate::executor::scan::{self, ScanOptions};
use crate::storage::catalog::CatalogPage;
use crate::storage::schema::{ColumnSchema, TableMetadata};
use crate::types::{
    CATALOG_PAGE_ID, IDS_PER_PAGE, MAX_TABLES, PAGE_FILE_EXTENSION, PAGE_FILE_PREFIX, PageId,
    RecordId,
    error::{Result, StorageError},
    page::Page,
    row::{Row, deserialize_row, serialize_row},
};

/// File-backed storage engine. Every page lives in its own file inside a
/// single directory; the catalog occupies page 0. Pages and table metadata
/// are cached in memory and written back on [`FileStorage::flush`].
pub struct FileStorage {
    path: Option<PathBuf>,
    is_open: bool,
    catalog: CatalogPage,
    page_cache: HashMap<PageId, Page>,
    table_cache: HashMap<String, TableMetadata>,
}

impl FileStorage {
    pub fn new() -> Self {
        Self {
            path: None,
            is_open: false,
            catalog: CatalogPage::new(),
            page_cache: HashMap::new(),
            table_cache: HashMap::new(),
        }
    }

    /// Opens the storage directory, creating it when absent. An existing
    /// catalog file is loaded; otherwise a fresh catalog is staged and
    /// persisted on the next flush. Reopening drops all cached state.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;

        self.page_cache.clear();
        self.table_cache.clear();

        let catalog_path = page_file_path(&path, CATALOG_PAGE_ID);
        self.catalog = if catalog_path.exists() {
            let bytes = fs::read(&catalog_path)?;
            CatalogPage::from_bytes(&bytes)?
        } else {
            let mut catalog = CatalogPage::new();
            catalog.is_dirty = true;
            catalog
        };

        self.path = Some(path);
        self.is_open = true;
        Ok(())
    }

    /// Flushes dirty state and marks the storage closed. Closing an
    /// already-closed storage is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if !self.is_open {
            return Ok(());
        }
        self.flush()?;
        self.page_cache.clear();
        self.table_cache.clear();
        self.is_open = false;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn catalog(&self) -> &CatalogPage {
        &self.catalog
    }

    /// Writes every dirty page and, when dirty, the catalog back to disk.
    /// Returns the number of files written; a closed storage flushes
    /// nothing and reports zero.
    pub fn flush(&mut self) -> Result<usize> {
        if !self.is_open {
            return Ok(0);
        }
        let dir = self.storage_dir()?.to_path_buf();

        let mut written = 0;
        for page in self.page_cache.values_mut() {
            if !page.is_dirty {
                continue;
            }
            let bytes = page.to_bytes()?;
            fs::write(page_file_path(&dir, page.page_id), bytes)?;
            page.is_dirty = false;
            written += 1;
        }
        if self.catalog.is_dirty {
            let bytes = self.catalog.to_bytes()?;
            fs::write(page_file_path(&dir, CATALOG_PAGE_ID), bytes)?;
            self.catalog.is_dirty = false;
            written += 1;
        }
        Ok(written)
    }

    /// Registers a new table in the catalog.
    pub fn create(&mut self, table: &str, columns: Vec<ColumnSchema>) -> Result<()> {
        self.ensure_open()?;
        if self.catalog.get_table(table).is_some() {
            return Err(StorageError::TableAlreadyExists {
                name: table.to_string(),
            });
        }
        let metadata = TableMetadata::new(table.to_string(), columns)?;
        if !self.catalog.add_table(metadata.clone()) {
            return Err(StorageError::CatalogFull { max: MAX_TABLES });
        }
        self.table_cache.insert(table.to_string(), metadata);
        Ok(())
    }

    /// Inserts a row and returns its record id. Ids are handed out from the
    /// page that stores the record, so the id also locates the record later.
    pub fn insert(&mut self, table: &str, values: &[String]) -> Result<RecordId> {
        self.ensure_open()?;
        let mut metadata = self.table_metadata(table)?;
        if values.len() != metadata.columns.len() {
            return Err(StorageError::ColumnCountMismatch {
                expected: metadata.columns.len(),
                actual: values.len(),
            });
        }
        let record = serialize_row(&metadata.columns, values)?;
        if record.len() > Page::max_record_len() {
            return Err(StorageError::RecordTooLarge { size: record.len() });
        }

        // Walk the existing chain looking for a page with both an unused id
        // and enough space.
        let mut current = metadata.first_data_page;
        while let Some(page_id) = current {
            let page = self.load_page(page_id)?;
            let inserted = match page.next_available_id() {
                Some(record_id) => page.insert_record(record_id, &record),
                None => None,
            };
            if let Some(record_id) = inserted {
                page.mark_id_used(record_id);
                metadata.record_count += 1;
                self.store_table_metadata(metadata);
                return Ok(record_id);
            }
            current = page.next_page_id;
        }

        // No page in the chain can take the record; extend the chain with a
        // fresh page owning the table's next id block.
        let new_page_id = self.catalog.allocate_page_id();
        let id_range_start = metadata.next_id_block * IDS_PER_PAGE + 1;
        let page = self.get_or_create_page(new_page_id, id_range_start)?;
        let record_id = match page
            .next_available_id()
            .and_then(|record_id| page.insert_record(record_id, &record))
        {
            Some(record_id) => record_id,
            None => return Err(StorageError::RecordTooLarge { size: record.len() }),
        };
        page.mark_id_used(record_id);

        if let Some(last_page_id) = metadata.last_data_page {
            let previous = self.load_page(last_page_id)?;
            previous.next_page_id = Some(new_page_id);
            previous.is_dirty = true;
        } else {
            metadata.first_data_page = Some(new_page_id);
        }
        metadata.last_data_page = Some(new_page_id);
        metadata.next_id_block += 1;
        metadata.record_count += 1;
        self.store_table_metadata(metadata);
        Ok(record_id)
    }

    /// Fetches a single row by record id.
    pub fn get(&mut self, table: &str, record_id: RecordId) -> Result<Row> {
        self.ensure_open()?;
        let metadata = self.table_metadata(table)?;
        let mut current = metadata.first_data_page;
        while let Some(page_id) = current {
            let page = self.load_page(page_id)?;
            if let Some(bytes) = page.get_record(record_id) {
                return Ok(deserialize_row(&metadata.columns, bytes));
            }
            current = page.next_page_id;
        }
        Err(StorageError::RecordNotFound {
            table: table.to_string(),
            record_id,
        })
    }

    /// Replaces a row in place. The record keeps its id and its page.
    pub fn update(&mut self, table: &str, record_id: RecordId, values: &[String]) -> Result<()> {
        self.ensure_open()?;
        let metadata = self.table_metadata(table)?;
        if values.len() != metadata.columns.len() {
            return Err(StorageError::ColumnCountMismatch {
                expected: metadata.columns.len(),
                actual: values.len(),
            });
        }
        let record = serialize_row(&metadata.columns, values)?;
        let mut current = metadata.first_data_page;
        while let Some(page_id) = current {
            let page = self.load_page(page_id)?;
            if page.update_record(record_id, &record) {
                return Ok(());
            }
            current = page.next_page_id;
        }
        Err(StorageError::RecordNotFound {
            table: table.to_string(),
            record_id,
        })
    }

    /// Deletes a row by record id. The id is retired, never reissued.
    pub fn delete_record(&mut self, table: &str, record_id: RecordId) -> Result<()> {
        self.ensure_open()?;
        let mut metadata = self.table_metadata(table)?;
        let mut current = metadata.first_data_page;
        while let Some(page_id) = current {
            let page = self.load_page(page_id)?;
            if page.contains_id(record_id) {
                if !page.delete_record(record_id) {
                    return Err(StorageError::RecordNotFoundOrDeleted {
                        table: table.to_string(),
                        record_id,
                    });
                }
                page.clear_id(record_id);
                metadata.record_count = metadata.record_count.saturating_sub(1);
                self.store_table_metadata(metadata);
                return Ok(());
            }
            current = page.next_page_id;
        }
        Err(StorageError::RecordNotFoundOrDeleted {
            table: table.to_string(),
            record_id,
        })
    }

    /// Deletes every row matching the predicate, returning how many went.
    pub fn delete_where(&mut self, table: &str, predicate: &Predicate) -> Result<usize> {
        self.ensure_open()?;
        let metadata = self.table_metadata(table)?;

        let mut matched = Vec::new();
        let mut current = metadata.first_data_page;
        while let Some(page_id) = current {
            let page = self.load_page(page_id)?;
            for slot in &page.slots {
                if !slot.is_occupied() {
                    continue;
                }
                if let Some(bytes) = page.get_record(slot.record_id) {
                    let row = deserialize_row(&metadata.columns, bytes);
                    if predicate.matches(&row) {
                        matched.push(slot.record_id);
                    }
                }
            }
            current = page.next_page_id;
        }

        for record_id in &matched {
            self.delete_record(table, *record_id)?;
        }
        Ok(matched.len())
    }

    /// Scans a table and runs the result through the pipeline described by
    /// `options`. Rows come back in page chain order, slot order within a
    /// page, unless an ordering is requested.
    pub fn scan(&mut self, table: &str, options: &ScanOptions) -> Result<Vec<Row>> {
        self.ensure_open()?;
        let metadata = self.table_metadata(table)?;
        let rows = self.collect_rows(&metadata)?;
        scan::apply_pipeline(rows, options, metadata.columns.len())
    }

    /// Column names of a table, in schema order.
    pub fn column_names(&mut self, table: &str) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.table_metadata(table)?.column_names())
    }

    fn collect_rows(&mut self, metadata: &TableMetadata) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        let mut current = metadata.first_data_page;
        while let Some(page_id) = current {
            let page = self.load_page(page_id)?;
            for slot in &page.slots {
                if !slot.is_occupied() {
                    continue;
                }
                if let Some(bytes) = page.get_record(slot.record_id) {
                    rows.push(deserialize_row(&metadata.columns, bytes));
                }
            }
            current = page.next_page_id;
        }
        Ok(rows)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open {
            Ok(())
        } else {
            Err(StorageError::StorageNotOpen)
        }
    }

    fn storage_dir(&self) -> Result<&Path> {
        match &self.path {
            Some(path) if self.is_open => Ok(path),
            _ => Err(StorageError::StorageNotOpen),
        }
    }

    /// Returns the cached page, reading its file on first access. A data
    /// page referenced by the catalog or a page chain must exist on disk.
    fn load_page(&mut self, page_id: PageId) -> Result<&mut Page> {
        let path = page_file_path(self.storage_dir()?, page_id);
        match self.page_cache.entry(page_id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let bytes = fs::read(path)?;
                let page = Page::from_bytes(&bytes)?;
                if page.page_id != page_id {
                    return Err(StorageError::CorruptPage {
                        page_id,
                        reason: format!("File contains page {}", page.page_id),
                    });
                }
                Ok(entry.insert(page))
            }
        }
    }

    /// Like [`FileStorage::load_page`], but a missing file yields a fresh
    /// empty page instead of an error. An existing file is read as-is.
    fn get_or_create_page(&mut self, page_id: PageId, id_range_start: RecordId) -> Result<&mut Page> {
        let path = page_file_path(self.storage_dir()?, page_id);
        match self.page_cache.entry(page_id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let page = if path.exists() {
                    Page::from_bytes(&fs::read(path)?)?
                } else {
                    Page::new(page_id, id_range_start)
                };
                Ok(entry.insert(page))
            }
        }
    }

    fn table_metadata(&mut self, table: &str) -> Result<TableMetadata> {
        if let Some(metadata) = self.table_cache.get(table) {
            return Ok(metadata.clone());
        }
        let Some(metadata) = self.catalog.get_table(table) else {
            return Err(StorageError::TableNotFound {
                name: table.to_string(),
            });
        };
        let metadata = metadata.clone();
        self.table_cache.insert(table.to_string(), metadata.clone());
        Ok(metadata)
    }

    fn store_table_metadata(&mut self, metadata: TableMetadata) {
        self.catalog.update_table(&metadata);
        self.table_cache.insert(metadata.name.clone(), metadata);
    }
}

impl Default for FileStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FileStorage {
    fn drop(&mut self) {
        // Errors have nowhere to go from a destructor.
        let _ = self.close();
    }
}

fn page_file_path(dir: &Path, page_id: PageId) -> PathBuf {
    dir.join(format!("{PAGE_FILE_PREFIX}{page_id}{PAGE_FILE_EXTENSION}"))
}
