pub mod error;
pub mod page;
pub mod row;

// Common type aliases
pub type PageId = u32;
pub type RecordId = u32;

// Page geometry
pub const PAGE_SIZE: usize = 8192;
pub const PAGE_HEADER_SIZE: usize = 32; // 27 bytes of fields + 5 reserved
pub const SLOT_SIZE: usize = 9; // offset (2) + length (2) + flags (1) + record_id (4)

// Record-id allocation
pub const IDS_PER_PAGE: u32 = 1024; // id-range block width per page
pub const ID_BITMAP_SIZE: usize = (IDS_PER_PAGE as usize) / 8; // trailing occupancy bitmap
pub const RECORD_REGION_END: usize = PAGE_SIZE - ID_BITMAP_SIZE;

// Reserved ids
pub const CATALOG_PAGE_ID: PageId = 0;
pub const INVALID_PAGE_ID: PageId = u32::MAX; // on-disk sentinel for "no page"

// Catalog limits
pub const MAX_TABLES: usize = 256;
pub const MAX_TABLE_NAME_LEN: usize = 63; // stored in a 64-byte null-terminated field
pub const MAX_COLUMNS: usize = 16;
pub const MAX_COLUMN_NAME_LEN: usize = 31; // stored in a 32-byte null-terminated field

// Catalog record geometry
pub const CATALOG_HEADER_SIZE: usize = 20; // 17 bytes of fields + 3 reserved
pub const COLUMN_SCHEMA_SIZE: usize = 37; // name[32] + type (1) + size (4)
pub const TABLE_METADATA_SIZE: usize = 88 + MAX_COLUMNS * COLUMN_SCHEMA_SIZE;

// Row codec geometry
pub const INT_SIZE: usize = 4;
pub const TUPLE_HEADER_SIZE: usize = 2 + 2 * MAX_COLUMNS; // field_count + offsets[16]

// Page flag bits
pub const PAGE_CLEAN: u8 = 0x00;
pub const PAGE_DIRTY: u8 = 0x01;

// Slot flag bits
pub const SLOT_OCCUPIED: u8 = 0x01;
pub const SLOT_DELETED: u8 = 0x02;

// Catalog flag bits
pub const CATALOG_CLEAN: u8 = 0x00;
pub const CATALOG_DIRTY: u8 = 0x01;

// Page file naming: page_<id>.dat inside the storage directory
pub const PAGE_FILE_PREFIX: &str = "page_";
pub const PAGE_FILE_EXTENSION: &str = ".dat";
