use slotdb::storage::schema::{ColumnSchema, ColumnType, TableMetadata};
use slotdb::types::error::StorageError;

// Test utilities
fn definition_error(name: &str, columns: Vec<ColumnSchema>) -> String {
    match TableMetadata::new(name.to_string(), columns) {
        Err(StorageError::InvalidTableDefinition { reason }) => reason,
        other => panic!("Expected InvalidTableDefinition, got {:?}", other),
    }
}

#[test]
fn test_column_type_tags() {
    assert_eq!(ColumnType::from_u8(0).unwrap(), ColumnType::Int);
    assert_eq!(ColumnType::from_u8(1).unwrap(), ColumnType::Text);
    assert!(matches!(
        ColumnType::from_u8(2),
        Err(StorageError::CorruptCatalog { .. })
    ));

    assert_eq!(ColumnType::from_u8(ColumnType::Int.as_u8()).unwrap(), ColumnType::Int);
    assert_eq!(ColumnType::from_u8(ColumnType::Text.as_u8()).unwrap(), ColumnType::Text);
}

#[test]
fn test_column_type_keywords() {
    assert_eq!(ColumnType::from_keyword("INT"), Some(ColumnType::Int));
    assert_eq!(ColumnType::from_keyword("int"), Some(ColumnType::Int));
    assert_eq!(ColumnType::from_keyword("Text"), Some(ColumnType::Text));
    assert_eq!(ColumnType::from_keyword("TEXT"), Some(ColumnType::Text));
    assert_eq!(ColumnType::from_keyword("FLOAT"), None);
    assert_eq!(ColumnType::from_keyword("VARCHAR"), None);
    assert_eq!(ColumnType::from_keyword(""), None);
}

#[test]
fn test_column_schema_constructors() {
    let age = ColumnSchema::int("age");
    assert_eq!(age.name, "age");
    assert_eq!(age.column_type, ColumnType::Int);
    assert_eq!(age.size, 4);

    let name = ColumnSchema::text("name");
    assert_eq!(name.column_type, ColumnType::Text);
    assert_eq!(name.size, 0);

    let explicit = ColumnSchema::new("city".to_string(), ColumnType::Text);
    assert_eq!(explicit, ColumnSchema::text("city"));
}

#[test]
fn test_valid_table_definition() {
    let table = TableMetadata::new(
        "people".to_string(),
        vec![ColumnSchema::text("name"), ColumnSchema::int("age")],
    )
    .unwrap();

    assert_eq!(table.name, "people");
    assert_eq!(table.first_data_page, None);
    assert_eq!(table.last_data_page, None);
    assert_eq!(table.record_count, 0);
    assert_eq!(table.free_space_head, None);
    assert_eq!(table.next_id_block, 0);
}

#[test]
fn test_table_name_validation() {
    let reason = definition_error("", vec![ColumnSchema::int("value")]);
    assert!(reason.contains("cannot be empty"));

    // 63 bytes fits the fixed name field, 64 does not
    let longest = "t".repeat(63);
    assert!(TableMetadata::new(longest, vec![ColumnSchema::int("value")]).is_ok());
    let reason = definition_error(&"t".repeat(64), vec![ColumnSchema::int("value")]);
    assert!(reason.contains("exceeds 63 bytes"));

    let reason = definition_error("bad\0name", vec![ColumnSchema::int("value")]);
    assert!(reason.contains("NUL"));
}

#[test]
fn test_column_validation() {
    let reason = definition_error("empty", vec![]);
    assert!(reason.contains("at least one column"));

    let too_many: Vec<ColumnSchema> = (0..17)
        .map(|index| ColumnSchema::int(&format!("col_{}", index)))
        .collect();
    let reason = definition_error("wide", too_many);
    assert!(reason.contains("maximum is 16"));

    let reason = definition_error("blank", vec![ColumnSchema::int("")]);
    assert!(reason.contains("Column name cannot be empty"));

    let longest = ColumnSchema::int(&"c".repeat(31));
    assert!(TableMetadata::new("edge".to_string(), vec![longest]).is_ok());
    let reason = definition_error("edge", vec![ColumnSchema::int(&"c".repeat(32))]);
    assert!(reason.contains("exceeds 31 bytes"));

    let reason = definition_error("nul", vec![ColumnSchema::int("a\0b")]);
    assert!(reason.contains("NUL"));

    let reason = definition_error(
        "dup",
        vec![ColumnSchema::int("value"), ColumnSchema::text("value")],
    );
    assert!(reason.contains("Duplicate column name 'value'"));
}

#[test]
fn test_column_lookup() {
    let table = TableMetadata::new(
        "people".to_string(),
        vec![
            ColumnSchema::text("name"),
            ColumnSchema::int("age"),
            ColumnSchema::text("city"),
        ],
    )
    .unwrap();

    assert_eq!(table.column_names(), vec!["name", "age", "city"]);
    assert_eq!(table.column_index("age"), Some(1));
    assert_eq!(table.column_index("city"), Some(2));
    assert_eq!(table.column_index("salary"), None);
}
