use serde::Deserialize;

/// Configuration for the record store backend.
#[derive(Debug, Deserialize)]
pub struct StateConfig {
    /// Which backend to use: `"memory"` or `"dynamodb"`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// AWS region for the `DynamoDB` backend.
    pub region: Option<String>,

    /// `DynamoDB` table name.
    pub table_name: Option<String>,

    /// Name of the creation-date index.
    pub index_name: Option<String>,

    /// Endpoint override, e.g. `DynamoDB` Local.
    pub endpoint_url: Option<String>,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            region: None,
            table_name: None,
            index_name: None,
            endpoint_url: None,
        }
    }
}

fn default_backend() -> String {
    "memory".to_owned()
}
