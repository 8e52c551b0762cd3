use serde::{Deserialize, Serialize};

pub const USERS_TABLE_NAME: &str = "users";
pub const USERS_HASH_KEY: &str = "Id";
pub const DEFAULT_READ_CAPACITY_UNITS: i64 = 5;
pub const DEFAULT_WRITE_CAPACITY_UNITS: i64 = 5;

/// Scalar attribute types usable as table keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    String,
}

impl ScalarType {
    /// Wire tag used by the table service (`S`).
    pub fn wire_tag(self) -> &'static str {
        match self {
            Self::String => "S",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttribute {
    pub name: String,
    pub attribute_type: ScalarType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedThroughput {
    pub read_capacity_units: i64,
    pub write_capacity_units: i64,
}

/// Everything needed to issue a create-table request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub hash_key: KeyAttribute,
    pub throughput: ProvisionedThroughput,
}

/// Lifecycle state reported by a table lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableState {
    Creating,
    Active,
    Other(String),
}

impl TableState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Returns the descriptor of the `users` table. Pure, no I/O.
pub fn users_table() -> TableDescriptor {
    TableDescriptor {
        name: USERS_TABLE_NAME.to_string(),
        hash_key: KeyAttribute {
            name: USERS_HASH_KEY.to_string(),
            attribute_type: ScalarType::String,
        },
        throughput: ProvisionedThroughput {
            read_capacity_units: DEFAULT_READ_CAPACITY_UNITS,
            write_capacity_units: DEFAULT_WRITE_CAPACITY_UNITS,
        },
    }
}
