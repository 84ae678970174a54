/// Configuration for the `DynamoDB` record store backend.
#[derive(Debug, Clone)]
pub struct DynamoConfig {
    /// `DynamoDB` table name.
    pub table_name: String,

    /// AWS region (e.g. `"us-east-1"`).
    pub region: String,

    /// Optional endpoint URL for local development (e.g. `DynamoDB` Local).
    pub endpoint_url: Option<String>,

    /// Name of the global secondary index keyed by creation date and time.
    pub index_name: String,
}

impl Default for DynamoConfig {
    fn default() -> Self {
        Self {
            table_name: String::from("wats"),
            region: String::from("us-east-1"),
            endpoint_url: None,
            index_name: String::from("created_at-index"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = DynamoConfig::default();
        assert_eq!(cfg.table_name, "wats");
        assert_eq!(cfg.region, "us-east-1");
        assert!(cfg.endpoint_url.is_none());
        assert_eq!(cfg.index_name, "created_at-index");
    }
}
