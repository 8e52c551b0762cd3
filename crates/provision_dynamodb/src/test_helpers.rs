//! In-memory [`TableStore`] for exercising the provisioner without a network.

use std::collections::BTreeMap;
use std::sync::Mutex;

use provision_core::record::Item;
use provision_core::table::{TableDescriptor, TableState};

use crate::adapters::table_store::{StoreError, TableStore};

/// Capacity reported for every successful write.
pub const REPORTED_WRITE_CAPACITY: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    DescribeTable(String),
    CreateTable(String),
    PutItem(String),
    GetItem(String),
}

#[derive(Debug, Default)]
struct StoreState {
    tables: BTreeMap<String, StoredTable>,
    calls: Vec<StoreCall>,
}

#[derive(Debug)]
struct StoredTable {
    descriptor: TableDescriptor,
    pending_describes: u32,
    items: BTreeMap<String, Item>,
}

/// Table store that keeps tables and items in memory and records every call.
#[derive(Debug, Default)]
pub struct InMemoryTableStore {
    state: Mutex<StoreState>,
    unreachable: bool,
    describe_failure: Option<StoreError>,
    create_failure: Option<StoreError>,
    put_failure: Option<StoreError>,
    creating_describes: u32,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails as if the endpoint refused connections.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn with_describe_failure(mut self, error: StoreError) -> Self {
        self.describe_failure = Some(error);
        self
    }

    pub fn with_create_failure(mut self, error: StoreError) -> Self {
        self.create_failure = Some(error);
        self
    }

    pub fn with_put_failure(mut self, error: StoreError) -> Self {
        self.put_failure = Some(error);
        self
    }

    /// Newly created tables report `CREATING` for this many describe calls.
    pub fn with_creating_describes(mut self, count: u32) -> Self {
        self.creating_describes = count;
        self
    }

    /// Adds an existing table that reports `CREATING` for `describes` calls.
    pub fn with_creating_table(self, descriptor: &TableDescriptor, describes: u32) -> Self {
        self.state.lock().expect("poisoned mutex").tables.insert(
            descriptor.name.clone(),
            StoredTable {
                descriptor: descriptor.clone(),
                pending_describes: describes,
                items: BTreeMap::new(),
            },
        );
        self
    }

    pub fn with_item(self, descriptor: &TableDescriptor, key: &str, item: Item) -> Self {
        {
            let mut state = self.state.lock().expect("poisoned mutex");
            state
                .tables
                .entry(descriptor.name.clone())
                .or_insert_with(|| StoredTable {
                    descriptor: descriptor.clone(),
                    pending_describes: 0,
                    items: BTreeMap::new(),
                })
                .items
                .insert(key.to_string(), item);
        }
        self
    }

    pub fn tables(&self) -> Vec<TableDescriptor> {
        self.state
            .lock()
            .expect("poisoned mutex")
            .tables
            .values()
            .map(|table| table.descriptor.clone())
            .collect()
    }

    pub fn item(&self, table_name: &str, key: &str) -> Option<Item> {
        self.state
            .lock()
            .expect("poisoned mutex")
            .tables
            .get(table_name)
            .and_then(|table| table.items.get(key).cloned())
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().expect("poisoned mutex").calls.clone()
    }

    pub fn count_calls(&self, matches: impl Fn(&StoreCall) -> bool) -> usize {
        self.calls().iter().filter(|call| matches(call)).count()
    }

    fn record(&self, call: StoreCall) -> Result<(), StoreError> {
        self.state.lock().expect("poisoned mutex").calls.push(call);
        if self.unreachable {
            return Err(StoreError::Unreachable(
                "dispatch failure: connection refused".to_string(),
            ));
        }
        Ok(())
    }
}

impl TableStore for InMemoryTableStore {
    fn describe_table(&self, table_name: &str) -> Result<TableState, StoreError> {
        self.record(StoreCall::DescribeTable(table_name.to_string()))?;
        if let Some(error) = &self.describe_failure {
            return Err(error.clone());
        }

        let mut state = self.state.lock().expect("poisoned mutex");
        let table = state
            .tables
            .get_mut(table_name)
            .ok_or_else(|| StoreError::TableNotFound {
                table: table_name.to_string(),
            })?;

        if table.pending_describes > 0 {
            table.pending_describes -= 1;
            return Ok(TableState::Creating);
        }
        Ok(TableState::Active)
    }

    fn create_table(&self, descriptor: &TableDescriptor) -> Result<(), StoreError> {
        self.record(StoreCall::CreateTable(descriptor.name.clone()))?;
        if let Some(error) = &self.create_failure {
            return Err(error.clone());
        }

        let mut state = self.state.lock().expect("poisoned mutex");
        if state.tables.contains_key(&descriptor.name) {
            return Err(StoreError::Service {
                code: "ResourceInUseException".to_string(),
                message: format!("Table already exists: {}", descriptor.name),
            });
        }

        state.tables.insert(
            descriptor.name.clone(),
            StoredTable {
                descriptor: descriptor.clone(),
                pending_describes: self.creating_describes,
                items: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn put_item(&self, table_name: &str, item: &Item) -> Result<Option<f64>, StoreError> {
        self.record(StoreCall::PutItem(table_name.to_string()))?;
        if let Some(error) = &self.put_failure {
            return Err(error.clone());
        }

        let mut state = self.state.lock().expect("poisoned mutex");
        let table = state
            .tables
            .get_mut(table_name)
            .ok_or_else(|| StoreError::TableNotFound {
                table: table_name.to_string(),
            })?;

        let key_attribute = &table.descriptor.hash_key.name;
        let key = item
            .get(key_attribute)
            .and_then(|value| value.as_s())
            .ok_or_else(|| StoreError::Service {
                code: "ValidationException".to_string(),
                message: format!("item is missing string key attribute '{key_attribute}'"),
            })?
            .to_string();

        table.items.insert(key, item.clone());
        Ok(Some(REPORTED_WRITE_CAPACITY))
    }

    fn get_item(
        &self,
        table_name: &str,
        key_attribute: &str,
        key: &str,
    ) -> Result<Option<Item>, StoreError> {
        self.record(StoreCall::GetItem(table_name.to_string()))?;

        let state = self.state.lock().expect("poisoned mutex");
        let table = state
            .tables
            .get(table_name)
            .ok_or_else(|| StoreError::TableNotFound {
                table: table_name.to_string(),
            })?;

        if table.descriptor.hash_key.name != key_attribute {
            return Err(StoreError::Service {
                code: "ValidationException".to_string(),
                message: format!("'{key_attribute}' is not the key of '{table_name}'"),
            });
        }
        Ok(table.items.get(key).cloned())
    }
}
