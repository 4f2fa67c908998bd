pub mod predicate;
pub mod scan;
pub mod statement;
