pub mod error;
pub mod event;
pub mod key;
pub mod record;

pub use error::EventParseError;
pub use event::{
    ChangeKind, ObjectCreated, ParsedBatch, RecordChange, parse_object_notification,
    parse_record_stream,
};
pub use key::{
    ORIGINAL_PREFIX, SOURCE_URL_METADATA, WATIFIED_PREFIX, basename, filename_for_url,
    is_original_key, original_key, watified_key,
};
pub use record::{WatRecord, WatStatus};
