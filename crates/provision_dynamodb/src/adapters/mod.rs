pub mod dynamodb;
pub mod table_store;
