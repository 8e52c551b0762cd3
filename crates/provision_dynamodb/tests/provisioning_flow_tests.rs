use provision_dynamodb::adapters::table_store::{StoreError, TableStore};
use provision_dynamodb::domain::record::{
    admin_user, AccountKind, AttributeValue, UserRecord, ATTR_KIND, ATTR_NAME,
};
use provision_dynamodb::domain::table::{users_table, ScalarType};
use provision_dynamodb::handlers::provision::{run_provisioning, ProvisionError, ProvisionOptions};
use provision_dynamodb::test_helpers::{InMemoryTableStore, StoreCall};

fn options() -> ProvisionOptions {
    ProvisionOptions {
        active_poll_interval: std::time::Duration::ZERO,
        ..ProvisionOptions::default()
    }
}

fn create_calls(store: &InMemoryTableStore) -> usize {
    store.count_calls(|call| matches!(call, StoreCall::CreateTable(_)))
}

fn put_calls(store: &InMemoryTableStore) -> usize {
    store.count_calls(|call| matches!(call, StoreCall::PutItem(_)))
}

#[test]
fn empty_store_gets_exactly_one_users_table() {
    let store = InMemoryTableStore::new();

    let report = run_provisioning(&store, &options()).expect("provisioning should succeed");

    assert!(report.table_created);
    let tables = store.tables();
    assert_eq!(tables.len(), 1);
    let table = &tables[0];
    assert_eq!(table.name, "users");
    assert_eq!(table.hash_key.name, "Id");
    assert_eq!(table.hash_key.attribute_type, ScalarType::String);
    assert_eq!(table.throughput.read_capacity_units, 5);
    assert_eq!(table.throughput.write_capacity_units, 5);
    assert_eq!(create_calls(&store), 1);
    assert_eq!(put_calls(&store), 1);
}

#[test]
fn second_run_reuses_existing_table() {
    let store = InMemoryTableStore::new();

    let first = run_provisioning(&store, &options()).expect("first run should succeed");
    let second = run_provisioning(&store, &options()).expect("second run should succeed");

    assert!(first.table_created);
    assert!(!second.table_created);
    assert_eq!(store.tables().len(), 1);
    assert_eq!(create_calls(&store), 1);
    assert_eq!(put_calls(&store), 2);
}

#[test]
fn admin_record_is_present_after_run() {
    let store = InMemoryTableStore::new();

    run_provisioning(&store, &options()).expect("provisioning should succeed");

    let item = store.item("users", "admin").expect("admin record should exist");
    assert_eq!(item[ATTR_NAME], AttributeValue::S("namachan10777".to_string()));
    assert_eq!(item[ATTR_KIND], AttributeValue::S("Person".to_string()));

    let record = UserRecord::from_item(&item).expect("admin record should decode");
    assert_eq!(record.id, "admin");
    assert_eq!(record.kind, AccountKind::Person);
    assert_eq!(record.icon, vec!["https://www.namachan10777.dev/icon.webp"]);
}

#[test]
fn rerun_overwrites_drifted_record() {
    let mut drifted = admin_user();
    drifted.summary = "edited by hand".to_string();
    let store = InMemoryTableStore::new().with_item(&users_table(), "admin", drifted.to_item());

    run_provisioning(&store, &options()).expect("provisioning should succeed");

    let record = UserRecord::from_item(&store.item("users", "admin").expect("admin should exist"))
        .expect("admin should decode");
    assert_eq!(record.summary, "Administrator on this server");
    assert_eq!(create_calls(&store), 0);
}

#[test]
fn unreachable_store_fails_before_any_write() {
    let store = InMemoryTableStore::unreachable();

    let error = run_provisioning(&store, &options()).expect_err("provisioning should fail");

    assert!(matches!(
        error,
        ProvisionError::DescribeTable {
            source: StoreError::Unreachable(_),
            ..
        }
    ));
    assert_eq!(store.calls(), vec![StoreCall::DescribeTable("users".to_string())]);
}

#[test]
fn access_denied_lookup_does_not_create_or_write() {
    let store = InMemoryTableStore::new().with_describe_failure(StoreError::Service {
        code: "UnrecognizedClientException".to_string(),
        message: "The security token included in the request is invalid".to_string(),
    });

    let error = run_provisioning(&store, &options()).expect_err("provisioning should fail");

    assert!(error.to_string().contains("failed to look up table 'users'"));
    assert_eq!(create_calls(&store), 0);
    assert_eq!(put_calls(&store), 0);
}

#[test]
fn seed_failure_is_fatal() {
    let store = InMemoryTableStore::new().with_put_failure(StoreError::Service {
        code: "ProvisionedThroughputExceededException".to_string(),
        message: "slow down".to_string(),
    });

    let error = run_provisioning(&store, &options()).expect_err("seeding should fail");

    assert!(matches!(
        error,
        ProvisionError::SeedRecord { ref record_id, .. } if record_id == "admin"
    ));
    assert!(store.item("users", "admin").is_none());
}

#[test]
fn verification_reads_back_the_seeded_record() {
    let store = InMemoryTableStore::new();
    let options = ProvisionOptions {
        verify: true,
        ..options()
    };

    let report = run_provisioning(&store, &options).expect("provisioning should succeed");

    assert!(report.verified);
    assert_eq!(
        store.calls().last(),
        Some(&StoreCall::GetItem("users".to_string()))
    );
    assert!(store
        .get_item("users", "Id", "admin")
        .expect("lookup should succeed")
        .is_some());
}
