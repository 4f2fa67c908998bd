use slotdb::storage::catalog::CatalogPage;
use slotdb::storage::schema::{ColumnSchema, TableMetadata};
use slotdb::types::{
    CATALOG_CLEAN, CATALOG_HEADER_SIZE, MAX_COLUMN_NAME_LEN, MAX_TABLE_NAME_LEN, MAX_TABLES,
    PAGE_SIZE, TABLE_METADATA_SIZE,
    error::StorageError,
};

// Test utilities
fn users_table() -> TableMetadata {
    TableMetadata::new(
        "users".to_string(),
        vec![ColumnSchema::text("name"), ColumnSchema::int("age")],
    )
    .unwrap()
}

fn numbered_table(index: usize) -> TableMetadata {
    TableMetadata::new(format!("table_{}", index), vec![ColumnSchema::int("value")]).unwrap()
}

#[test]
fn test_catalog_creation() {
    let catalog = CatalogPage::new();

    assert_eq!(catalog.table_count(), 0);
    assert_eq!(catalog.free_page_id, None);
    assert_eq!(catalog.system_page_count, 1);
    assert!(!catalog.is_dirty);
    assert_eq!(catalog.lsn, 0);
    assert!(catalog.get_table("users").is_none());
}

#[test]
fn test_add_and_get_table() {
    let mut catalog = CatalogPage::new();

    assert!(catalog.add_table(users_table()));
    assert!(catalog.is_dirty);
    assert_eq!(catalog.lsn, 1);
    assert_eq!(catalog.table_count(), 1);

    // Duplicate names are rejected
    assert!(!catalog.add_table(users_table()));
    assert_eq!(catalog.table_count(), 1);

    let table = catalog.get_table("users").unwrap();
    assert_eq!(table.name, "users");
    assert_eq!(table.columns.len(), 2);
    assert_eq!(table.columns[0].name, "name");
    assert_eq!(table.columns[1].name, "age");
    assert_eq!(table.record_count, 0);
    assert_eq!(table.first_data_page, None);
    assert_eq!(table.last_data_page, None);
    assert_eq!(table.next_id_block, 0);

    assert!(catalog.get_table("orders").is_none());
}

#[test]
fn test_update_table_replaces_metadata() {
    let mut catalog = CatalogPage::new();
    assert!(catalog.add_table(users_table()));

    let mut updated = users_table();
    updated.first_data_page = Some(2);
    updated.last_data_page = Some(5);
    updated.record_count = 42;
    updated.next_id_block = 3;

    assert!(catalog.update_table(&updated));
    let stored = catalog.get_table("users").unwrap();
    assert_eq!(stored.first_data_page, Some(2));
    assert_eq!(stored.last_data_page, Some(5));
    assert_eq!(stored.record_count, 42);
    assert_eq!(stored.next_id_block, 3);

    // Unknown tables cannot be updated
    let stray = numbered_table(1);
    assert!(!catalog.update_table(&stray));
}

#[test]
fn test_remove_table() {
    let mut catalog = CatalogPage::new();
    assert!(catalog.add_table(users_table()));
    assert!(catalog.add_table(numbered_table(1)));

    assert!(catalog.remove_table("users"));
    assert!(catalog.get_table("users").is_none());
    assert_eq!(catalog.table_count(), 1);

    assert!(!catalog.remove_table("users"));
    assert!(catalog.get_table("table_1").is_some());
}

#[test]
fn test_allocate_page_id_monotonic() {
    let mut catalog = CatalogPage::new();

    // Page 0 is the catalog, page 1 stays reserved, data pages start at 2
    assert_eq!(catalog.allocate_page_id(), 2);
    assert_eq!(catalog.allocate_page_id(), 3);
    assert_eq!(catalog.allocate_page_id(), 4);
    assert_eq!(catalog.system_page_count, 4);
    assert!(catalog.is_dirty);
}

#[test]
fn test_allocate_page_id_from_free_list() {
    let mut catalog = CatalogPage::new();
    catalog.system_page_count = 10;
    catalog.free_page_id = Some(7);

    assert_eq!(catalog.allocate_page_id(), 7);
    assert_eq!(catalog.free_page_id, Some(8));
    assert_eq!(catalog.system_page_count, 10);

    // A free id past the high-water mark drags system_page_count along
    catalog.free_page_id = Some(12);
    assert_eq!(catalog.allocate_page_id(), 12);
    assert_eq!(catalog.free_page_id, Some(13));
    assert_eq!(catalog.system_page_count, 13);
}

#[test]
fn test_serialization_roundtrip() {
    let mut catalog = CatalogPage::new();
    let mut users = users_table();
    users.first_data_page = Some(2);
    users.last_data_page = Some(6);
    users.record_count = 128;
    users.next_id_block = 2;
    assert!(catalog.add_table(users));
    assert!(catalog.add_table(numbered_table(1)));
    catalog.free_page_id = Some(9);
    catalog.system_page_count = 7;
    catalog.lsn = 33;
    catalog.is_dirty = true;

    let bytes = catalog.to_bytes().unwrap();
    assert_eq!(bytes.len(), PAGE_SIZE);

    let loaded = CatalogPage::from_bytes(&bytes).unwrap();
    assert_eq!(loaded.table_count(), 2);
    assert_eq!(loaded.free_page_id, Some(9));
    assert_eq!(loaded.system_page_count, 7);
    assert_eq!(loaded.lsn, 33);
    assert!(!loaded.is_dirty);

    let users = loaded.get_table("users").unwrap();
    assert_eq!(users.first_data_page, Some(2));
    assert_eq!(users.last_data_page, Some(6));
    assert_eq!(users.record_count, 128);
    assert_eq!(users.next_id_block, 2);
    assert_eq!(users.columns, users_table().columns);

    let other = loaded.get_table("table_1").unwrap();
    assert_eq!(other.columns.len(), 1);
    assert_eq!(other.columns[0].name, "value");
}

#[test]
fn test_header_layout_on_disk() {
    let mut catalog = CatalogPage::new();
    assert!(catalog.add_table(users_table()));
    catalog.system_page_count = 4;
    catalog.lsn = 5;

    let bytes = catalog.to_bytes().unwrap();

    assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), 1);
    // No free page: the slot holds the u32::MAX sentinel
    assert_eq!(
        u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
        u32::MAX
    );
    assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 4);
    assert_eq!(bytes[12], CATALOG_CLEAN);
    assert_eq!(u32::from_le_bytes(bytes[13..17].try_into().unwrap()), 5);

    // First table record starts right after the header
    let name_field = &bytes[CATALOG_HEADER_SIZE..CATALOG_HEADER_SIZE + 5];
    assert_eq!(name_field, b"users");
    assert_eq!(bytes[CATALOG_HEADER_SIZE + 5], 0);
}

#[test]
fn test_dirty_flag_never_persisted() {
    let mut catalog = CatalogPage::new();
    assert!(catalog.add_table(users_table()));
    assert!(catalog.is_dirty);

    let bytes = catalog.to_bytes().unwrap();
    assert_eq!(bytes[12], CATALOG_CLEAN);
    assert!(!CatalogPage::from_bytes(&bytes).unwrap().is_dirty);
}

#[test]
fn test_twelve_tables_fit_thirteenth_overflows() {
    let mut catalog = CatalogPage::new();
    for index in 0..12 {
        assert!(catalog.add_table(numbered_table(index)));
    }
    assert!(CATALOG_HEADER_SIZE + 12 * TABLE_METADATA_SIZE <= PAGE_SIZE);
    assert!(catalog.to_bytes().is_ok());

    // The registry accepts the 13th table; the page image cannot hold it
    assert!(catalog.add_table(numbered_table(12)));
    match catalog.to_bytes() {
        Err(StorageError::CatalogOverflow { count }) => assert_eq!(count, 13),
        other => panic!("Expected CatalogOverflow, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_registry_capacity() {
    let mut catalog = CatalogPage::new();
    for index in 0..MAX_TABLES {
        assert!(catalog.add_table(numbered_table(index)));
    }
    assert_eq!(catalog.table_count(), MAX_TABLES);
    assert!(!catalog.add_table(numbered_table(MAX_TABLES)));
}

#[test]
fn test_from_bytes_rejects_short_buffer() {
    let result = CatalogPage::from_bytes(&[0u8; 10]);
    assert!(matches!(result, Err(StorageError::CorruptCatalog { .. })));
}

#[test]
fn test_from_bytes_rejects_corrupt_header() {
    let mut catalog = CatalogPage::new();
    for index in 0..12 {
        assert!(catalog.add_table(numbered_table(index)));
    }
    let mut bytes = catalog.to_bytes().unwrap();

    // A table count past the registry limit
    bytes[0..4].copy_from_slice(&300u32.to_le_bytes());
    match CatalogPage::from_bytes(&bytes) {
        Err(StorageError::CorruptCatalog { reason }) => {
            assert!(reason.contains("exceeds maximum"));
        }
        other => panic!("Expected CorruptCatalog, got {:?}", other.map(|_| ())),
    }

    // A table count whose records run off the end of the page
    bytes[0..4].copy_from_slice(&13u32.to_le_bytes());
    match CatalogPage::from_bytes(&bytes) {
        Err(StorageError::CorruptCatalog { reason }) => {
            assert!(reason.contains("beyond the catalog page"));
        }
        other => panic!("Expected CorruptCatalog, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_from_bytes_rejects_corrupt_table_record() {
    let mut catalog = CatalogPage::new();
    assert!(catalog.add_table(users_table()));
    let bytes = catalog.to_bytes().unwrap();

    // Claiming a second table exposes a zeroed record with an empty name
    let mut stomped = bytes.clone();
    stomped[0..4].copy_from_slice(&2u32.to_le_bytes());
    match CatalogPage::from_bytes(&stomped) {
        Err(StorageError::CorruptCatalog { reason }) => {
            assert!(reason.contains("cannot be empty"));
        }
        other => panic!("Expected CorruptCatalog, got {:?}", other.map(|_| ())),
    }

    // An unknown column type tag
    let type_tag_offset =
        CATALOG_HEADER_SIZE + (MAX_TABLE_NAME_LEN + 1) + 20 + (MAX_COLUMN_NAME_LEN + 1);
    let mut stomped = bytes.clone();
    stomped[type_tag_offset] = 9;
    match CatalogPage::from_bytes(&stomped) {
        Err(StorageError::CorruptCatalog { reason }) => {
            assert!(reason.contains("column type tag 9"));
        }
        other => panic!("Expected CorruptCatalog, got {:?}", other.map(|_| ())),
    }

    // A table name that is not valid UTF-8
    let mut stomped = bytes;
    stomped[CATALOG_HEADER_SIZE + 1] = 0xFF;
    match CatalogPage::from_bytes(&stomped) {
        Err(StorageError::CorruptCatalog { reason }) => {
            assert!(reason.contains("not valid UTF-8"));
        }
        other => panic!("Expected CorruptCatalog, got {:?}", other.map(|_| ())),
    }
}
