pub mod catalog;
pub mod file_storage;
pub mod schema;
