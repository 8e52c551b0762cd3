use provision_core::record::Item;
use provision_core::table::{TableDescriptor, TableState};
use thiserror::Error;

/// Failures surfaced by a [`TableStore`].
///
/// `TableNotFound` is the only variant callers are expected to recover from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("table '{table}' does not exist")]
    TableNotFound { table: String },
    #[error("store is unreachable: {0}")]
    Unreachable(String),
    #[error("store rejected the request ({code}): {message}")]
    Service { code: String, message: String },
    #[error("request could not be built: {0}")]
    InvalidRequest(String),
    #[error("store returned an unexpected attribute shape: {0}")]
    UnexpectedShape(String),
}

pub trait TableStore {
    fn describe_table(&self, table_name: &str) -> Result<TableState, StoreError>;

    fn create_table(&self, descriptor: &TableDescriptor) -> Result<(), StoreError>;

    /// Upserts `item` and returns the consumed capacity units when the store
    /// reports them.
    fn put_item(&self, table_name: &str, item: &Item) -> Result<Option<f64>, StoreError>;

    fn get_item(
        &self,
        table_name: &str,
        key_attribute: &str,
        key: &str,
    ) -> Result<Option<Item>, StoreError>;
}
