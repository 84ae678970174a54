use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::NaiveDate;
use tracing::debug;

use watify_core::{WatRecord, WatStatus};
use watify_state::error::StateError;
use watify_state::store::RecordStore;

use crate::config::DynamoConfig;
use crate::item::{
    CREATED_AT_DATE, Item, STATUS, URL, WATIFIED_URL, from_item, status_of, to_item,
    transition_condition,
};

/// Attempts made by a conditional update before giving up on a record whose
/// status keeps changing underneath it.
const MAX_UPDATE_ATTEMPTS: usize = 3;

/// DynamoDB-backed implementation of [`RecordStore`].
///
/// Uses a single table keyed by `url` with a global secondary index whose
/// partition key is `created_at_date` and sort key `created_at_time`.
/// Status updates are conditional writes, so a record never moves to a
/// status that its current status does not allow.
pub struct DynamoRecordStore {
    client: Client,
    table_name: String,
    index_name: String,
}

impl DynamoRecordStore {
    /// Create a new `DynamoRecordStore` from the provided configuration.
    ///
    /// Loads AWS credentials and configuration from the environment and
    /// optionally overrides the endpoint URL for local development.
    pub async fn new(config: &DynamoConfig) -> Result<Self, StateError> {
        let client = build_client(config).await;
        Ok(Self::from_client(client, config))
    }

    /// Create a new `DynamoRecordStore` from an existing `DynamoDB` client.
    pub fn from_client(client: Client, config: &DynamoConfig) -> Self {
        Self {
            client,
            table_name: config.table_name.clone(),
            index_name: config.index_name.clone(),
        }
    }

    /// The underlying `DynamoDB` client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Name of the table this store reads and writes.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn get_item(&self, url: &str) -> Result<Option<Item>, StateError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(URL, AttributeValue::S(url.to_owned()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StateError::Backend(e.to_string()))?;
        Ok(result.item().cloned())
    }

    /// Set `status` (and optionally `watified_url`) under a transition
    /// condition.
    ///
    /// When the condition fails the record is re-read to tell a missing
    /// record apart from a disallowed transition. If the re-read shows the
    /// transition is allowed after all, the status changed between the two
    /// calls and the write is retried.
    async fn conditional_update(
        &self,
        url: &str,
        status: WatStatus,
        watified_url: Option<&str>,
    ) -> Result<(), StateError> {
        let (condition, condition_values) = transition_condition(status);
        let update_expression = if watified_url.is_some() {
            "SET #status = :status, #watified_url = :watified_url"
        } else {
            "SET #status = :status"
        };

        let mut last_seen = status;
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let mut update = self
                .client
                .update_item()
                .table_name(&self.table_name)
                .key(URL, AttributeValue::S(url.to_owned()))
                .update_expression(update_expression)
                .condition_expression(&condition)
                .expression_attribute_names("#url", URL)
                .expression_attribute_names("#status", STATUS)
                .expression_attribute_values(
                    ":status",
                    AttributeValue::S(status.as_str().to_owned()),
                );
            if let Some(watified) = watified_url {
                update = update
                    .expression_attribute_names("#watified_url", WATIFIED_URL)
                    .expression_attribute_values(
                        ":watified_url",
                        AttributeValue::S(watified.to_owned()),
                    );
            }
            for (name, value) in &condition_values {
                update = update.expression_attribute_values(name, value.clone());
            }

            let err = match update.send().await {
                Ok(_) => return Ok(()),
                Err(err) => err.into_service_error(),
            };
            if !err.is_conditional_check_failed_exception() {
                return Err(StateError::Backend(err.to_string()));
            }

            let Some(item) = self.get_item(url).await? else {
                return Err(StateError::NotFound(url.to_owned()));
            };
            let current = status_of(&item)?;
            if !current.can_transition_to(status) {
                return Err(StateError::InvalidTransition {
                    from: current,
                    to: status,
                });
            }
            debug!(url, %current, %status, attempt, "status changed during update, retrying");
            last_seen = current;
        }

        Err(StateError::InvalidTransition {
            from: last_seen,
            to: status,
        })
    }
}

#[async_trait]
impl RecordStore for DynamoRecordStore {
    async fn put(&self, record: &WatRecord) -> Result<(), StateError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_item(record)))
            .send()
            .await
            .map_err(|e| StateError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<Option<WatRecord>, StateError> {
        self.get_item(url)
            .await?
            .map(|item| from_item(&item))
            .transpose()
    }

    async fn update_status(&self, url: &str, status: WatStatus) -> Result<(), StateError> {
        self.conditional_update(url, status, None).await
    }

    async fn complete(&self, url: &str, watified_url: &str) -> Result<(), StateError> {
        self.conditional_update(url, WatStatus::Completed, Some(watified_url))
            .await
    }

    async fn query_by_date(
        &self,
        date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<WatRecord>, StateError> {
        let mut records = Vec::new();
        let mut start_key: Option<Item> = None;

        while records.len() < limit {
            let remaining = i32::try_from(limit - records.len()).unwrap_or(i32::MAX);
            let result = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(&self.index_name)
                .key_condition_expression("#date = :date")
                .expression_attribute_names("#date", CREATED_AT_DATE)
                .expression_attribute_values(
                    ":date",
                    AttributeValue::S(date.format("%Y-%m-%d").to_string()),
                )
                .scan_index_forward(false)
                .limit(remaining)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| StateError::Backend(e.to_string()))?;

            for item in result.items() {
                records.push(from_item(item)?);
            }

            match result.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        records.truncate(limit);
        Ok(records)
    }
}

/// Build a `DynamoDB` client from the given configuration.
pub async fn build_client(config: &DynamoConfig) -> Client {
    let mut aws_config =
        aws_config::from_env().region(aws_config::Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint_url {
        aws_config = aws_config.endpoint_url(endpoint);
    }

    let sdk_config = aws_config.load().await;
    Client::new(&sdk_config)
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use super::*;
    use crate::config::DynamoConfig;
    use crate::table::create_table;

    fn test_config() -> DynamoConfig {
        DynamoConfig {
            table_name: std::env::var("DYNAMODB_TABLE")
                .unwrap_or_else(|_| format!("wats_test_{}", chrono::Utc::now().timestamp_millis())),
            endpoint_url: Some(
                std::env::var("DYNAMODB_ENDPOINT")
                    .unwrap_or_else(|_| "http://localhost:8000".to_owned()),
            ),
            ..DynamoConfig::default()
        }
    }

    #[tokio::test]
    async fn store_conformance() {
        let config = test_config();
        let store = DynamoRecordStore::new(&config)
            .await
            .expect("client creation should succeed");
        create_table(store.client(), &config.table_name, &config.index_name)
            .await
            .expect("table creation should succeed");
        watify_state::testing::run_store_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }
}
