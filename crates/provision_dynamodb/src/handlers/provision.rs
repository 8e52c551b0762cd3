use std::thread;
use std::time::Duration;

use chrono::Utc;
use provision_core::config::ProvisionerConfig;
use provision_core::record::{admin_user, UserRecord};
use provision_core::table::{users_table, TableDescriptor};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::adapters::table_store::{StoreError, TableStore};

pub const DEFAULT_ACTIVE_POLL_ATTEMPTS: u32 = 20;
pub const DEFAULT_ACTIVE_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOptions {
    pub wait_for_active: bool,
    pub verify: bool,
    pub active_poll_attempts: u32,
    pub active_poll_interval: Duration,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            wait_for_active: false,
            verify: false,
            active_poll_attempts: DEFAULT_ACTIVE_POLL_ATTEMPTS,
            active_poll_interval: DEFAULT_ACTIVE_POLL_INTERVAL,
        }
    }
}

impl From<&ProvisionerConfig> for ProvisionOptions {
    fn from(config: &ProvisionerConfig) -> Self {
        Self {
            wait_for_active: config.wait_for_active,
            verify: config.verify,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOutcome {
    AlreadyPresent,
    Created,
}

/// Summary of a completed run, printed by the binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvisionReport {
    pub table_name: String,
    pub table_created: bool,
    pub record_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_capacity_units: Option<f64>,
    pub verified: bool,
    pub completed_at: String,
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to look up table '{table}'")]
    DescribeTable {
        table: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to create table '{table}'")]
    CreateTable {
        table: String,
        #[source]
        source: StoreError,
    },
    #[error("table '{table}' was not active after {attempts} checks")]
    TableNotActive { table: String, attempts: u32 },
    #[error("failed to seed record '{record_id}' into '{table}'")]
    SeedRecord {
        table: String,
        record_id: String,
        #[source]
        source: StoreError,
    },
    #[error("seeded record verification failed: {0}")]
    Verify(String),
}

/// Creates the table unless a lookup finds it.
///
/// Only `TableNotFound` leads to creation; any other lookup failure is
/// returned without touching the store further.
pub fn ensure_table(
    store: &impl TableStore,
    descriptor: &TableDescriptor,
) -> Result<TableOutcome, ProvisionError> {
    match store.describe_table(&descriptor.name) {
        Ok(state) => {
            info!(
                component = "provisioner",
                event = "table_present",
                table = %descriptor.name,
                state = ?state,
                "table already exists"
            );
            Ok(TableOutcome::AlreadyPresent)
        }
        Err(StoreError::TableNotFound { .. }) => {
            store
                .create_table(descriptor)
                .map_err(|source| ProvisionError::CreateTable {
                    table: descriptor.name.clone(),
                    source,
                })?;
            info!(
                component = "provisioner",
                event = "table_created",
                table = %descriptor.name,
                hash_key = %descriptor.hash_key.name,
                read_capacity_units = descriptor.throughput.read_capacity_units,
                write_capacity_units = descriptor.throughput.write_capacity_units,
                "created table"
            );
            Ok(TableOutcome::Created)
        }
        Err(source) => Err(ProvisionError::DescribeTable {
            table: descriptor.name.clone(),
            source,
        }),
    }
}

pub fn wait_for_active(
    store: &impl TableStore,
    table_name: &str,
    attempts: u32,
    interval: Duration,
) -> Result<(), ProvisionError> {
    for attempt in 1..=attempts {
        let state = store
            .describe_table(table_name)
            .map_err(|source| ProvisionError::DescribeTable {
                table: table_name.to_string(),
                source,
            })?;
        if state.is_active() {
            return Ok(());
        }

        info!(
            component = "provisioner",
            event = "table_pending",
            table = %table_name,
            state = ?state,
            attempt,
            "waiting for table to become active"
        );
        if attempt < attempts {
            thread::sleep(interval);
        }
    }

    Err(ProvisionError::TableNotActive {
        table: table_name.to_string(),
        attempts,
    })
}

/// Upserts `record`, overwriting any previous version.
pub fn seed_record(
    store: &impl TableStore,
    table_name: &str,
    record: &UserRecord,
) -> Result<Option<f64>, ProvisionError> {
    let consumed = store
        .put_item(table_name, &record.to_item())
        .map_err(|source| ProvisionError::SeedRecord {
            table: table_name.to_string(),
            record_id: record.id.clone(),
            source,
        })?;

    info!(
        component = "provisioner",
        event = "record_seeded",
        table = %table_name,
        record_id = %record.id,
        consumed_capacity_units = ?consumed,
        "seeded record"
    );
    Ok(consumed)
}

pub fn verify_record(
    store: &impl TableStore,
    descriptor: &TableDescriptor,
    expected: &UserRecord,
) -> Result<(), ProvisionError> {
    let item = store
        .get_item(&descriptor.name, &descriptor.hash_key.name, &expected.id)
        .map_err(|error| ProvisionError::Verify(error.to_string()))?
        .ok_or_else(|| {
            ProvisionError::Verify(format!(
                "record '{}' is missing from '{}'",
                expected.id, descriptor.name
            ))
        })?;

    let stored =
        UserRecord::from_item(&item).map_err(|error| ProvisionError::Verify(error.to_string()))?;
    if stored != *expected {
        warn!(
            component = "provisioner",
            event = "record_mismatch",
            table = %descriptor.name,
            record_id = %expected.id,
            stored = ?stored,
            "stored record differs from seeded record"
        );
        return Err(ProvisionError::Verify(format!(
            "record '{}' in '{}' does not match the seeded content",
            expected.id, descriptor.name
        )));
    }
    Ok(())
}

/// Ensures `descriptor` exists and upserts `record` into it.
pub fn provision(
    store: &impl TableStore,
    descriptor: &TableDescriptor,
    record: &UserRecord,
    options: &ProvisionOptions,
) -> Result<ProvisionReport, ProvisionError> {
    let outcome = ensure_table(store, descriptor)?;
    // A table found mid-creation by another run needs the same wait as ours.
    if options.wait_for_active {
        wait_for_active(
            store,
            &descriptor.name,
            options.active_poll_attempts,
            options.active_poll_interval,
        )?;
    }

    let consumed_capacity_units = seed_record(store, &descriptor.name, record)?;
    if options.verify {
        verify_record(store, descriptor, record)?;
    }

    Ok(ProvisionReport {
        table_name: descriptor.name.clone(),
        table_created: outcome == TableOutcome::Created,
        record_id: record.id.clone(),
        consumed_capacity_units,
        verified: options.verify,
        completed_at: Utc::now().to_rfc3339(),
    })
}

/// Provisions the `users` table and the admin account.
pub fn run_provisioning(
    store: &impl TableStore,
    options: &ProvisionOptions,
) -> Result<ProvisionReport, ProvisionError> {
    provision(store, &users_table(), &admin_user(), options)
}

#[cfg(test)]
mod tests {
    use provision_core::record::AccountKind;

    use super::*;
    use crate::test_helpers::{InMemoryTableStore, StoreCall};

    fn fast_options() -> ProvisionOptions {
        ProvisionOptions {
            active_poll_interval: Duration::ZERO,
            ..ProvisionOptions::default()
        }
    }

    #[test]
    fn ensure_table_skips_creation_when_present() {
        let store = InMemoryTableStore::new();
        store
            .create_table(&users_table())
            .expect("seed table should be created");

        let outcome = ensure_table(&store, &users_table()).expect("lookup should succeed");

        assert_eq!(outcome, TableOutcome::AlreadyPresent);
        assert_eq!(
            store.count_calls(|call| matches!(call, StoreCall::CreateTable(_))),
            1
        );
    }

    #[test]
    fn ensure_table_propagates_non_missing_lookup_failures() {
        let store = InMemoryTableStore::new().with_describe_failure(StoreError::Service {
            code: "AccessDeniedException".to_string(),
            message: "not authorized".to_string(),
        });

        let error = ensure_table(&store, &users_table()).expect_err("lookup should fail");

        assert!(matches!(
            error,
            ProvisionError::DescribeTable {
                source: StoreError::Service { .. },
                ..
            }
        ));
        assert!(store.tables().is_empty());
    }

    #[test]
    fn creation_failure_is_reported() {
        let store = InMemoryTableStore::new().with_create_failure(StoreError::Service {
            code: "LimitExceededException".to_string(),
            message: "too many tables".to_string(),
        });

        let error = run_provisioning(&store, &fast_options()).expect_err("creation should fail");

        assert!(matches!(error, ProvisionError::CreateTable { .. }));
        assert_eq!(
            store.count_calls(|call| matches!(call, StoreCall::PutItem(_))),
            0
        );
    }

    #[test]
    fn waits_until_new_table_is_active() {
        let store = InMemoryTableStore::new().with_creating_describes(2);
        let options = ProvisionOptions {
            wait_for_active: true,
            ..fast_options()
        };

        let report = run_provisioning(&store, &options).expect("provisioning should succeed");

        assert!(report.table_created);
        assert_eq!(
            store.count_calls(|call| matches!(call, StoreCall::DescribeTable(_))),
            4
        );
    }

    #[test]
    fn waits_for_table_another_run_is_still_creating() {
        let store = InMemoryTableStore::new().with_creating_table(&users_table(), 2);
        let options = ProvisionOptions {
            wait_for_active: true,
            ..fast_options()
        };

        let report = run_provisioning(&store, &options).expect("provisioning should succeed");

        assert!(!report.table_created);
        assert_eq!(
            store.count_calls(|call| matches!(call, StoreCall::CreateTable(_))),
            0
        );
        assert_eq!(
            store.count_calls(|call| matches!(call, StoreCall::DescribeTable(_))),
            3
        );
        let calls = store.calls();
        assert_eq!(calls.last(), Some(&StoreCall::PutItem("users".to_string())));
    }

    #[test]
    fn gives_up_when_table_never_becomes_active() {
        let store = InMemoryTableStore::new().with_creating_describes(10);
        let options = ProvisionOptions {
            wait_for_active: true,
            active_poll_attempts: 3,
            ..fast_options()
        };

        let error = run_provisioning(&store, &options).expect_err("wait should time out");

        assert!(matches!(
            error,
            ProvisionError::TableNotActive { attempts: 3, .. }
        ));
        assert!(store.item("users", "admin").is_none());
    }

    #[test]
    fn verify_detects_tampered_record() {
        let mut tampered = admin_user();
        tampered.name = "someone-else".to_string();
        let store =
            InMemoryTableStore::new().with_item(&users_table(), "admin", tampered.to_item());

        let error = verify_record(&store, &users_table(), &admin_user())
            .expect_err("mismatch should be detected");

        assert!(error.to_string().contains("does not match"));
    }

    #[test]
    fn verify_passes_after_seeding() {
        let store = InMemoryTableStore::new();
        let options = ProvisionOptions {
            verify: true,
            ..fast_options()
        };

        let report = run_provisioning(&store, &options).expect("provisioning should succeed");

        assert!(report.verified);
        let stored = store.item("users", "admin").expect("admin should be stored");
        let decoded = UserRecord::from_item(&stored).expect("admin should decode");
        assert_eq!(decoded.kind, AccountKind::Person);
    }

    #[test]
    fn report_serializes_consumed_capacity() {
        let store = InMemoryTableStore::new();

        let report =
            run_provisioning(&store, &fast_options()).expect("provisioning should succeed");
        let json: serde_json::Value =
            serde_json::to_value(&report).expect("report should serialize");

        assert_eq!(json["table_name"], "users");
        assert_eq!(json["record_id"], "admin");
        assert_eq!(json["table_created"], true);
        assert_eq!(json["consumed_capacity_units"], 1.0);
        assert_eq!(json["verified"], false);
    }
}
