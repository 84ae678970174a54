//! Conversion between [`WatRecord`] and `DynamoDB` items.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::NaiveDate;

use watify_core::{WatRecord, WatStatus};
use watify_state::error::StateError;

pub(crate) const URL: &str = "url";
pub(crate) const STATUS: &str = "status";
pub(crate) const CREATED_AT_DATE: &str = "created_at_date";
pub(crate) const CREATED_AT_TIME: &str = "created_at_time";
pub(crate) const WATIFIED_URL: &str = "watified_url";

pub(crate) type Item = HashMap<String, AttributeValue>;

/// Render a record as a `DynamoDB` item.
pub(crate) fn to_item(record: &WatRecord) -> Item {
    let mut item = HashMap::from([
        (URL.to_owned(), AttributeValue::S(record.url.clone())),
        (
            STATUS.to_owned(),
            AttributeValue::S(record.status.as_str().to_owned()),
        ),
        (
            CREATED_AT_DATE.to_owned(),
            AttributeValue::S(record.created_at_date_iso()),
        ),
        (
            CREATED_AT_TIME.to_owned(),
            AttributeValue::N(record.created_at_time.to_string()),
        ),
    ]);
    if let Some(watified) = &record.watified_url {
        item.insert(WATIFIED_URL.to_owned(), AttributeValue::S(watified.clone()));
    }
    item
}

fn string_attr<'a>(item: &'a Item, name: &str) -> Result<&'a str, StateError> {
    match item.get(name) {
        Some(AttributeValue::S(s)) => Ok(s),
        Some(_) => Err(StateError::Serialization(format!(
            "attribute {name} is not a string"
        ))),
        None => Err(StateError::Serialization(format!(
            "missing attribute {name}"
        ))),
    }
}

/// Parse the `status` attribute of an item.
pub(crate) fn status_of(item: &Item) -> Result<WatStatus, StateError> {
    string_attr(item, STATUS)?
        .parse()
        .map_err(|e: watify_core::EventParseError| StateError::Serialization(e.to_string()))
}

/// Parse a `DynamoDB` item back into a record.
pub(crate) fn from_item(item: &Item) -> Result<WatRecord, StateError> {
    let url = string_attr(item, URL)?.to_owned();
    let status = status_of(item)?;

    let date = string_attr(item, CREATED_AT_DATE)?;
    let created_at_date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| StateError::Serialization(format!("invalid {CREATED_AT_DATE}: {e}")))?;

    let created_at_time = match item.get(CREATED_AT_TIME) {
        Some(AttributeValue::N(n)) => n
            .parse::<i64>()
            .map_err(|e| StateError::Serialization(format!("invalid {CREATED_AT_TIME}: {e}")))?,
        _ => {
            return Err(StateError::Serialization(format!(
                "missing attribute {CREATED_AT_TIME}"
            )));
        }
    };

    let watified_url = match item.get(WATIFIED_URL) {
        Some(AttributeValue::S(s)) => Some(s.clone()),
        _ => None,
    };

    Ok(WatRecord {
        url,
        status,
        created_at_date,
        created_at_time,
        watified_url,
    })
}

/// Condition expression admitting an update to `next`.
///
/// Returns the expression together with the value placeholders it binds.
/// The record must exist and currently hold one of the statuses from which
/// `next` is reachable.
pub(crate) fn transition_condition(next: WatStatus) -> (String, Vec<(String, AttributeValue)>) {
    let values: Vec<(String, AttributeValue)> = WatStatus::allowed_predecessors(next)
        .into_iter()
        .enumerate()
        .map(|(i, status)| {
            (
                format!(":from{i}"),
                AttributeValue::S(status.as_str().to_owned()),
            )
        })
        .collect();
    let placeholders: Vec<&str> = values.iter().map(|(name, _)| name.as_str()).collect();
    let expression = format!(
        "attribute_exists(#url) AND #status IN ({})",
        placeholders.join(", ")
    );
    (expression, values)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn sample() -> WatRecord {
        let now = Utc.with_ymd_and_hms(2017, 7, 4, 12, 30, 0).unwrap();
        WatRecord::queued("http://x/cat.jpg", now)
    }

    #[test]
    fn item_carries_index_attributes() {
        let item = to_item(&sample());
        assert_eq!(
            item.get(CREATED_AT_DATE),
            Some(&AttributeValue::S("2017-07-04".into()))
        );
        assert!(matches!(item.get(CREATED_AT_TIME), Some(AttributeValue::N(_))));
        assert_eq!(item.get(STATUS), Some(&AttributeValue::S("queued".into())));
        assert!(!item.contains_key(WATIFIED_URL));
    }

    #[test]
    fn item_parses_back() {
        let mut record = sample();
        record.status = WatStatus::Completed;
        record.watified_url = Some("http://public/watified/x.jpg".into());
        assert_eq!(from_item(&to_item(&record)).unwrap(), record);
    }

    #[test]
    fn rejects_unknown_status() {
        let mut item = to_item(&sample());
        item.insert(STATUS.into(), AttributeValue::S("pending".into()));
        assert!(matches!(
            from_item(&item),
            Err(StateError::Serialization(_))
        ));
    }

    #[test]
    fn rejects_missing_time() {
        let mut item = to_item(&sample());
        item.remove(CREATED_AT_TIME);
        assert!(from_item(&item).is_err());
    }

    #[test]
    fn downloaded_condition_lists_queued_and_downloaded() {
        let (expr, values) = transition_condition(WatStatus::Downloaded);
        assert_eq!(
            expr,
            "attribute_exists(#url) AND #status IN (:from0, :from1)"
        );
        assert_eq!(values[0].1, AttributeValue::S("queued".into()));
        assert_eq!(values[1].1, AttributeValue::S("downloaded".into()));
    }

    #[test]
    fn error_condition_excludes_completed() {
        let (_, values) = transition_condition(WatStatus::Error);
        let statuses: Vec<_> = values.iter().map(|(_, v)| v.clone()).collect();
        assert!(!statuses.contains(&AttributeValue::S("completed".into())));
        assert!(statuses.contains(&AttributeValue::S("error".into())));
    }
}
