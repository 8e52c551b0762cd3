use std::collections::HashMap;
use std::future::Future;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::config::Credentials;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue as SdkAttributeValue, KeySchemaElement, KeyType,
    ProvisionedThroughput as SdkProvisionedThroughput, ReturnConsumedCapacity,
    ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client;
use provision_core::config::StoreConnection;
use provision_core::record::{AttributeValue, Item};
use provision_core::table::{ScalarType, TableDescriptor, TableState};

use crate::adapters::table_store::{StoreError, TableStore};

const CREDENTIALS_PROVIDER_NAME: &str = "provision_local_env";

/// [`TableStore`] backed by the AWS SDK DynamoDB client.
///
/// Calls block the current worker thread, so the store must be used from a
/// multi-threaded Tokio runtime.
#[derive(Clone)]
pub struct DynamoDbTableStore {
    client: Client,
}

impl std::fmt::Debug for DynamoDbTableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoDbTableStore").finish_non_exhaustive()
    }
}

impl DynamoDbTableStore {
    pub async fn connect(connection: &StoreConnection) -> Self {
        let credentials = Credentials::new(
            connection.access_key_id.clone(),
            connection.secret_access_key.clone(),
            None,
            None,
            CREDENTIALS_PROVIDER_NAME,
        );
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(connection.region.clone()))
            .endpoint_url(connection.endpoint.clone())
            .credentials_provider(credentials)
            .load()
            .await;

        Self::from_client(Client::new(&shared_config))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl TableStore for DynamoDbTableStore {
    fn describe_table(&self, table_name: &str) -> Result<TableState, StoreError> {
        let client = self.client.clone();
        let table = table_name.to_string();

        block_on(async move {
            let result = client.describe_table().table_name(&table).send().await;
            match result {
                Ok(output) => Ok(table_state(
                    output.table().and_then(|description| description.table_status()),
                )),
                Err(error) if is_table_not_found(&error) => {
                    Err(StoreError::TableNotFound { table })
                }
                Err(error) => Err(classify_sdk_error(&error)),
            }
        })
    }

    fn create_table(&self, descriptor: &TableDescriptor) -> Result<(), StoreError> {
        let attribute = AttributeDefinition::builder()
            .attribute_name(&descriptor.hash_key.name)
            .attribute_type(scalar_attribute_type(descriptor.hash_key.attribute_type))
            .build()
            .map_err(|error| StoreError::InvalidRequest(error.to_string()))?;
        let key = KeySchemaElement::builder()
            .attribute_name(&descriptor.hash_key.name)
            .key_type(KeyType::Hash)
            .build()
            .map_err(|error| StoreError::InvalidRequest(error.to_string()))?;
        let throughput = SdkProvisionedThroughput::builder()
            .read_capacity_units(descriptor.throughput.read_capacity_units)
            .write_capacity_units(descriptor.throughput.write_capacity_units)
            .build()
            .map_err(|error| StoreError::InvalidRequest(error.to_string()))?;

        let client = self.client.clone();
        let table = descriptor.name.clone();

        block_on(async move {
            client
                .create_table()
                .table_name(table)
                .attribute_definitions(attribute)
                .key_schema(key)
                .provisioned_throughput(throughput)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| classify_sdk_error(&error))
        })
    }

    fn put_item(&self, table_name: &str, item: &Item) -> Result<Option<f64>, StoreError> {
        let client = self.client.clone();
        let table = table_name.to_string();
        let sdk_item = to_sdk_item(item);

        block_on(async move {
            client
                .put_item()
                .table_name(table)
                .set_item(Some(sdk_item))
                .return_consumed_capacity(ReturnConsumedCapacity::Total)
                .send()
                .await
                .map(|output| {
                    output
                        .consumed_capacity()
                        .and_then(|capacity| capacity.capacity_units())
                })
                .map_err(|error| classify_sdk_error(&error))
        })
    }

    fn get_item(
        &self,
        table_name: &str,
        key_attribute: &str,
        key: &str,
    ) -> Result<Option<Item>, StoreError> {
        let client = self.client.clone();
        let table = table_name.to_string();
        let key_attribute = key_attribute.to_string();
        let key = SdkAttributeValue::S(key.to_string());

        let output = block_on(async move {
            client
                .get_item()
                .table_name(table)
                .key(key_attribute, key)
                .consistent_read(true)
                .send()
                .await
                .map_err(|error| classify_sdk_error(&error))
        })?;

        output.item().map(from_sdk_item).transpose()
    }
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

fn is_table_not_found<R>(error: &SdkError<DescribeTableError, R>) -> bool {
    match error {
        SdkError::ServiceError(service_error) => matches!(
            service_error.err(),
            DescribeTableError::ResourceNotFoundException(_)
        ),
        _ => false,
    }
}

/// Maps an SDK failure onto the store taxonomy. Transport-level failures
/// become `Unreachable`; everything else keeps the service error code.
fn classify_sdk_error<E, R>(error: &SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match error {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            StoreError::Unreachable(DisplayErrorContext(error).to_string())
        }
        SdkError::ServiceError(service_error) => {
            let inner = service_error.err();
            StoreError::Service {
                code: inner.code().unwrap_or("Unknown").to_string(),
                message: inner
                    .message()
                    .map(str::to_string)
                    .unwrap_or_else(|| DisplayErrorContext(error).to_string()),
            }
        }
        _ => StoreError::Service {
            code: "Unknown".to_string(),
            message: DisplayErrorContext(error).to_string(),
        },
    }
}

fn table_state(status: Option<&TableStatus>) -> TableState {
    match status {
        Some(TableStatus::Active) => TableState::Active,
        Some(TableStatus::Creating) => TableState::Creating,
        Some(other) => TableState::Other(other.as_str().to_string()),
        None => TableState::Other("UNKNOWN".to_string()),
    }
}

fn scalar_attribute_type(value: ScalarType) -> ScalarAttributeType {
    match value {
        ScalarType::String => ScalarAttributeType::S,
    }
}

fn to_sdk_value(value: &AttributeValue) -> SdkAttributeValue {
    match value {
        AttributeValue::S(text) => SdkAttributeValue::S(text.clone()),
        AttributeValue::L(values) => {
            SdkAttributeValue::L(values.iter().map(to_sdk_value).collect())
        }
    }
}

fn to_sdk_item(item: &Item) -> HashMap<String, SdkAttributeValue> {
    item.iter()
        .map(|(name, value)| (name.clone(), to_sdk_value(value)))
        .collect()
}

fn from_sdk_value(name: &str, value: &SdkAttributeValue) -> Result<AttributeValue, StoreError> {
    match value {
        SdkAttributeValue::S(text) => Ok(AttributeValue::S(text.clone())),
        SdkAttributeValue::L(values) => values
            .iter()
            .map(|value| from_sdk_value(name, value))
            .collect::<Result<Vec<_>, _>>()
            .map(AttributeValue::L),
        _ => Err(StoreError::UnexpectedShape(format!(
            "attribute '{name}' is neither a string nor a list"
        ))),
    }
}

fn from_sdk_item(item: &HashMap<String, SdkAttributeValue>) -> Result<Item, StoreError> {
    item.iter()
        .map(|(name, value)| Ok((name.clone(), from_sdk_value(name, value)?)))
        .collect()
}
