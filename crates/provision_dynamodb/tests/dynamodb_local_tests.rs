//! Runs the provisioner against a live DynamoDB Local instance.
//!
//! Start one with `cargo run -p xtask -- local-store` and run
//! `cargo run -p xtask -- ci integration`.

use aws_sdk_dynamodb::types::{KeyType, ScalarAttributeType};
use provision_dynamodb::adapters::dynamodb::DynamoDbTableStore;
use provision_dynamodb::adapters::table_store::TableStore;
use provision_dynamodb::domain::config::{ConfigLayer, DEFAULT_ENDPOINT};
use provision_dynamodb::domain::record::UserRecord;
use provision_dynamodb::handlers::provision::{run_provisioning, ProvisionOptions};

fn local_config() -> provision_dynamodb::domain::config::ProvisionerConfig {
    let endpoint =
        std::env::var("PROVISION_TEST_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
    ConfigLayer::defaults()
        .overlay(ConfigLayer {
            endpoint: Some(endpoint),
            access_key_id: Some("local".to_string()),
            secret_access_key: Some("local".to_string()),
            ..ConfigLayer::default()
        })
        .resolve()
        .expect("local config should resolve")
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires DynamoDB Local"]
async fn provisions_twice_against_dynamodb_local() {
    let store = DynamoDbTableStore::connect(&local_config().connection).await;
    let options = ProvisionOptions {
        wait_for_active: true,
        verify: true,
        ..ProvisionOptions::default()
    };

    run_provisioning(&store, &options).expect("first run should succeed");
    let second = run_provisioning(&store, &options).expect("second run should succeed");
    assert!(!second.table_created);

    let description = store
        .client()
        .describe_table()
        .table_name("users")
        .send()
        .await
        .expect("describe should succeed");
    let table = description.table().expect("description should include the table");
    let key = &table.key_schema()[0];
    assert_eq!(key.attribute_name(), "Id");
    assert_eq!(key.key_type(), &KeyType::Hash);
    assert_eq!(
        table.attribute_definitions()[0].attribute_type(),
        &ScalarAttributeType::S
    );
    let throughput = table
        .provisioned_throughput()
        .expect("table should report provisioned throughput");
    assert_eq!(throughput.read_capacity_units(), Some(5));
    assert_eq!(throughput.write_capacity_units(), Some(5));

    let item = store
        .get_item("users", "Id", "admin")
        .expect("lookup should succeed")
        .expect("admin should exist");
    let record = UserRecord::from_item(&item).expect("admin should decode");
    assert_eq!(record.name, "namachan10777");
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a closed local port"]
async fn unreachable_endpoint_fails() {
    let mut config = local_config();
    config.connection.endpoint = "http://127.0.0.1:9".to_string();
    let store = DynamoDbTableStore::connect(&config.connection).await;

    let error = run_provisioning(&store, &ProvisionOptions::default())
        .expect_err("closed port should fail");
    assert!(error.to_string().contains("failed to look up table"));
}
