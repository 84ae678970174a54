use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, GlobalSecondaryIndex, KeySchemaElement, KeyType, Projection,
    ProjectionType, ProvisionedThroughput, ScalarAttributeType, StreamSpecification,
    StreamViewType,
};
use tracing::info;

use watify_state::error::StateError;

use crate::item::{CREATED_AT_DATE, CREATED_AT_TIME, URL};

const CAPACITY_UNITS: i64 = 5;

fn build_err(err: BuildError) -> StateError {
    StateError::Backend(format!("invalid table definition: {err}"))
}

fn key(name: &str, key_type: KeyType) -> Result<KeySchemaElement, StateError> {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .map_err(build_err)
}

fn attribute(name: &str, kind: ScalarAttributeType) -> Result<AttributeDefinition, StateError> {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(kind)
        .build()
        .map_err(build_err)
}

fn throughput() -> Result<ProvisionedThroughput, StateError> {
    ProvisionedThroughput::builder()
        .read_capacity_units(CAPACITY_UNITS)
        .write_capacity_units(CAPACITY_UNITS)
        .build()
        .map_err(build_err)
}

/// Create the wats table programmatically.
///
/// The table is keyed by `url` (String) and carries a global secondary index
/// named `index_name` with `created_at_date` (String) as partition key and
/// `created_at_time` (Number) as sort key, projecting all attributes. The
/// table stream is enabled with new and old images so that status changes
/// reach the download stage.
///
/// Succeeds without changes when the table already exists.
pub async fn create_table(
    client: &Client,
    table_name: &str,
    index_name: &str,
) -> Result<(), StateError> {
    let index = GlobalSecondaryIndex::builder()
        .index_name(index_name)
        .key_schema(key(CREATED_AT_DATE, KeyType::Hash)?)
        .key_schema(key(CREATED_AT_TIME, KeyType::Range)?)
        .projection(
            Projection::builder()
                .projection_type(ProjectionType::All)
                .build(),
        )
        .provisioned_throughput(throughput()?)
        .build()
        .map_err(build_err)?;

    let stream = StreamSpecification::builder()
        .stream_enabled(true)
        .stream_view_type(StreamViewType::NewAndOldImages)
        .build()
        .map_err(build_err)?;

    let result = client
        .create_table()
        .table_name(table_name)
        .key_schema(key(URL, KeyType::Hash)?)
        .attribute_definitions(attribute(URL, ScalarAttributeType::S)?)
        .attribute_definitions(attribute(CREATED_AT_DATE, ScalarAttributeType::S)?)
        .attribute_definitions(attribute(CREATED_AT_TIME, ScalarAttributeType::N)?)
        .global_secondary_indexes(index)
        .provisioned_throughput(throughput()?)
        .stream_specification(stream)
        .send()
        .await;

    match result {
        Ok(_) => {
            info!(table = table_name, index = index_name, "created wats table");
            Ok(())
        }
        Err(err) => {
            let service_err = err.into_service_error();
            if service_err.is_resource_in_use_exception() {
                info!(table = table_name, "wats table already exists");
                Ok(())
            } else {
                Err(StateError::Backend(service_err.to_string()))
            }
        }
    }
}
