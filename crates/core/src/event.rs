//! Typed change notifications consumed by the pipeline stages.
//!
//! Two payload shapes are supported:
//!
//! - **Record stream** (DynamoDB Streams JSON): one entry per record
//!   mutation, carrying the record key and its new image.
//! - **Object notification** (S3 event JSON): one entry per created object.
//!
//! A missing or malformed `Records` envelope fails the whole batch. Each entry
//! is parsed on its own, so a malformed entry only fails that item and the
//! stage can still process its siblings.

use std::collections::HashMap;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde_json::Value;

use crate::error::EventParseError;
use crate::record::WatStatus;

/// Per-item parse results of one notification batch, in delivery order.
pub type ParsedBatch<T> = Vec<Result<T, EventParseError>>;

/// Kind of mutation reported by the record stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Modify,
    Remove,
}

impl FromStr for ChangeKind {
    type Err = EventParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INSERT" => Ok(Self::Insert),
            "MODIFY" => Ok(Self::Modify),
            "REMOVE" => Ok(Self::Remove),
            other => Err(EventParseError::UnsupportedEvent(other.to_owned())),
        }
    }
}

/// One record mutation from the record stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordChange {
    /// Stream-assigned event identifier, when present.
    pub event_id: Option<String>,
    pub kind: ChangeKind,
    /// Key of the changed record.
    pub url: String,
    /// New value of the `status` attribute. Absent for removals.
    pub new_status: Option<WatStatus>,
}

impl RecordChange {
    /// Build a change event without a stream identifier.
    #[must_use]
    pub fn new(kind: ChangeKind, url: impl Into<String>, new_status: Option<WatStatus>) -> Self {
        Self {
            event_id: None,
            kind,
            url: url.into(),
            new_status,
        }
    }

    /// Whether this change leaves the record queued.
    ///
    /// The download stage only acts on these. Its own `downloaded` and `error`
    /// writes show up on the same stream, and this guard is what keeps them
    /// from feeding back into the stage.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        self.kind != ChangeKind::Remove && self.new_status == Some(WatStatus::Queued)
    }
}

/// One object creation from the blob store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectCreated {
    /// Notification event name, e.g. `ObjectCreated:Put`.
    pub event_name: String,
    /// Bucket the object was written to, when reported.
    pub bucket: Option<String>,
    /// Decoded object key.
    pub key: String,
    /// Object size in bytes, when reported.
    pub size: Option<u64>,
}

impl ObjectCreated {
    /// Build a creation event for `key`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            event_name: "ObjectCreated:Put".to_owned(),
            bucket: None,
            key: key.into(),
            size: None,
        }
    }
}

/// A DynamoDB attribute value in stream JSON form (`{"S": "..."}` and friends).
///
/// Only string values are read. Other type descriptors are skipped, so a
/// non-string attribute deserializes with `string` unset.
#[derive(Debug, Clone, Deserialize)]
struct AttributeValue {
    #[serde(rename = "S")]
    string: Option<String>,
}

type Image = HashMap<String, AttributeValue>;

#[derive(Debug, Deserialize)]
struct StreamRecord {
    #[serde(rename = "eventID")]
    event_id: Option<String>,
    #[serde(rename = "eventName")]
    event_name: String,
    dynamodb: StreamImages,
}

#[derive(Debug, Deserialize)]
struct StreamImages {
    #[serde(rename = "Keys")]
    keys: Image,
    #[serde(rename = "NewImage", default)]
    new_image: Option<Image>,
}

#[derive(Debug, Deserialize)]
struct S3Record {
    #[serde(rename = "eventName")]
    event_name: String,
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    #[serde(default)]
    bucket: Option<S3Bucket>,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
    #[serde(default)]
    size: Option<u64>,
}

fn records(payload: &Value) -> Result<&[Value], EventParseError> {
    match payload.get("Records") {
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(EventParseError::InvalidField {
            field: "Records".to_owned(),
            expected: "array",
        }),
        None => Err(EventParseError::MissingField("Records".to_owned())),
    }
}

fn string_attr<'a>(
    image: &'a Image,
    name: &str,
    path: &str,
) -> Result<&'a str, EventParseError> {
    match image.get(name) {
        Some(AttributeValue {
            string: Some(value),
        }) => Ok(value),
        Some(_) => Err(EventParseError::InvalidField {
            field: format!("{path}.{name}"),
            expected: "string attribute",
        }),
        None => Err(EventParseError::MissingField(format!("{path}.{name}"))),
    }
}

fn parse_stream_record(entry: &Value) -> Result<RecordChange, EventParseError> {
    let record = StreamRecord::deserialize(entry)
        .map_err(|e| EventParseError::Malformed(e.to_string()))?;
    let kind = record.event_name.parse::<ChangeKind>()?;
    let url = string_attr(&record.dynamodb.keys, "url", "dynamodb.Keys")?.to_owned();

    let new_status = match (kind, &record.dynamodb.new_image) {
        (ChangeKind::Remove, _) => None,
        (_, Some(image)) => Some(string_attr(image, "status", "dynamodb.NewImage")?.parse()?),
        (_, None) => {
            return Err(EventParseError::MissingField(
                "dynamodb.NewImage".to_owned(),
            ));
        }
    };

    Ok(RecordChange {
        event_id: record.event_id,
        kind,
        url,
        new_status,
    })
}

/// Decode an object key as delivered in object notifications, where spaces
/// arrive as `+` and other bytes are percent-encoded.
fn decode_object_key(raw: &str) -> Result<String, EventParseError> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| EventParseError::InvalidKey(raw.to_owned()))
}

fn parse_s3_record(entry: &Value) -> Result<ObjectCreated, EventParseError> {
    let record =
        S3Record::deserialize(entry).map_err(|e| EventParseError::Malformed(e.to_string()))?;
    if !record.event_name.starts_with("ObjectCreated:") {
        return Err(EventParseError::UnsupportedEvent(record.event_name));
    }
    let key = decode_object_key(&record.s3.object.key)?;
    if key.is_empty() {
        return Err(EventParseError::MissingField("s3.object.key".to_owned()));
    }
    Ok(ObjectCreated {
        event_name: record.event_name,
        bucket: record.s3.bucket.map(|b| b.name),
        key,
        size: record.s3.object.size,
    })
}

/// Parse a record-stream batch.
pub fn parse_record_stream(payload: &Value) -> Result<ParsedBatch<RecordChange>, EventParseError> {
    Ok(records(payload)?.iter().map(parse_stream_record).collect())
}

/// Parse an object-notification batch.
pub fn parse_object_notification(
    payload: &Value,
) -> Result<ParsedBatch<ObjectCreated>, EventParseError> {
    Ok(records(payload)?.iter().map(parse_s3_record).collect())
}
